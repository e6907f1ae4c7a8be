// SPDX-License-Identifier: GPL-3.0-or-later

use crate::paint::{ImageType, LayerID};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompositeError {
    #[error("region {x},{y} {width}x{height} exceeds {buffer_width}x{buffer_height} buffer")]
    OutOfBounds {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        buffer_width: usize,
        buffer_height: usize,
    },

    #[error("{} source has no colormap", .format.name())]
    MissingColormap { format: ImageType },

    #[error("precondition violated: {0}")]
    PreconditionViolation(&'static str),

    #[error("pixel data length {actual} does not match expected {expected}")]
    InvalidBuffer { expected: usize, actual: usize },

    #[error("no such layer: {0}")]
    UnknownLayer(LayerID),
}

pub type Result<T> = std::result::Result<T, CompositeError>;
