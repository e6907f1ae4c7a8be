// SPDX-License-Identifier: GPL-3.0-or-later

pub mod aoe;
pub mod blend;
pub mod color;
pub mod convert;
pub mod mask;
pub mod rasterop;
pub mod rect;
pub mod rectiter;
pub mod region;

mod buffer;
mod format;
mod idgenerator;
mod layer;
mod layermode;

pub type LayerID = u16;

// Re-export types most commonly used from the outside
pub use aoe::{AoE, TileMap};
pub use buffer::PixelBuffer;
pub use format::{BaseType, Colormap, ImageType};
pub use idgenerator::IDGenerator;
pub use layer::{Layer, LayerMetadata, OpacityScaling, ResizePolicy};
pub use layermode::{CompositeMode, CompositeSpace, LayerMode};
pub use mask::{LayerMask, Selection};
pub use rasterop::{ActiveChannels, CompositeParams};
pub use rect::{Rectangle, Size};
pub use region::{PixelRegion, PixelRegionMut};
