// SPDX-License-Identifier: GPL-3.0-or-later

//! Layer compositing engine.
//!
//! A stack of raster layers, each with an optional mask, opacity, blend
//! mode and offset, is flattened into a single projection. Only the parts
//! of the canvas that changed are recomposited.

pub mod canvas;
pub mod error;
pub mod logging;
pub mod paint;

pub use error::{CompositeError, Result};
