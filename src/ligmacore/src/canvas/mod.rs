// SPDX-License-Identifier: GPL-3.0-or-later

pub mod context;
pub mod floating;
pub mod graph;
pub mod observable;

mod image;
mod projection;

pub use context::{ApplicationContext, ProjectionOptions};
pub use floating::FloatingFilter;
pub use graph::{Graph, NodeId, NodeKind};
pub use image::Image;
pub use observable::{ImageEvent, ImageObserver, LayerChange, Subscription};
