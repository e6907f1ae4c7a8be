// SPDX-License-Identifier: GPL-3.0-or-later

use super::color::u8_mult;
use super::{ImageType, PixelBuffer, Rectangle};
use crate::error::{CompositeError, Result};

use kurbo::{BezPath, Point, Shape};

/// Rasterize a vector path into a new single channel buffer.
///
/// A pixel is fully selected if its center is inside the path
/// (non-zero winding rule.)
pub fn rasterize_path(path: &BezPath, width: usize, height: usize) -> PixelBuffer {
    let mut buffer = PixelBuffer::new(width, height, ImageType::Gray);
    if width == 0 || height == 0 {
        return buffer;
    }

    let bb = path.bounding_box();
    let x0 = (bb.x0.floor().max(0.0) as usize).min(width);
    let x1 = (bb.x1.ceil().max(0.0) as usize).min(width);
    let y0 = (bb.y0.floor().max(0.0) as usize).min(height);
    let y1 = (bb.y1.ceil().max(0.0) as usize).min(height);

    for y in y0..y1 {
        for x in x0..x1 {
            if path.winding(Point::new(x as f64 + 0.5, y as f64 + 0.5)) != 0 {
                buffer.put_pixel(x, y, &[255]);
            }
        }
    }
    buffer
}

/// Copy a rectangle of a single channel buffer into a new buffer.
/// Parts of the rectangle outside the source read as `outside`.
pub fn mask_area(mask: &PixelBuffer, rect: &Rectangle, outside: u8) -> PixelBuffer {
    debug_assert_eq!(mask.format(), ImageType::Gray);
    let mut out = PixelBuffer::filled(rect.w as usize, rect.h as usize, ImageType::Gray, &[outside]);
    if let Some(inside) = rect.cropped(mask.size()) {
        out.paste(&mask.cropped(&inside), inside.x - rect.x, inside.y - rect.y);
    }
    out
}

/// Combine two optional masks of the same size
pub fn multiply_masks(a: Option<PixelBuffer>, b: Option<PixelBuffer>) -> Option<PixelBuffer> {
    match (a, b) {
        (Some(mut a), Some(b)) => {
            debug_assert_eq!(a.size(), b.size());
            for (x, y) in a.pixels_mut().iter_mut().zip(b.pixels()) {
                *x = u8_mult(*x as u32, *y as u32) as u8;
            }
            Some(a)
        }
        (a, None) => a,
        (None, b) => b,
    }
}

/// A layer mask.
///
/// The mask is the same size as its layer. Value 255 means the layer
/// pixel is fully visible and 0 fully hidden.
#[derive(Clone, Debug)]
pub struct LayerMask {
    buffer: PixelBuffer,
    path: Option<BezPath>,

    /// Show the mask itself instead of the layer content
    pub show_masked: bool,

    /// Apply the mask when compositing
    pub apply: bool,
}

impl LayerMask {
    /// Create a new mask where every pixel has the given value
    pub fn new(width: usize, height: usize, value: u8) -> LayerMask {
        LayerMask {
            buffer: PixelBuffer::filled(width, height, ImageType::Gray, &[value]),
            path: None,
            show_masked: false,
            apply: true,
        }
    }

    pub fn from_buffer(buffer: PixelBuffer) -> Result<LayerMask> {
        if buffer.format() != ImageType::Gray {
            return Err(CompositeError::PreconditionViolation(
                "layer mask must be a single channel buffer",
            ));
        }
        Ok(LayerMask {
            buffer,
            path: None,
            show_masked: false,
            apply: true,
        })
    }

    /// Create a mask from a vector path in layer coordinates
    pub fn from_path(width: usize, height: usize, path: BezPath) -> LayerMask {
        LayerMask {
            buffer: rasterize_path(&path, width, height),
            path: Some(path),
            show_masked: false,
            apply: true,
        }
    }

    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    /// Direct access to the mask pixels.
    /// Editing the pixels detaches the mask from its source path.
    pub fn buffer_mut(&mut self) -> &mut PixelBuffer {
        self.path = None;
        &mut self.buffer
    }

    pub fn path(&self) -> Option<&BezPath> {
        self.path.as_ref()
    }

    /// Replace the source path and regenerate the mask from it
    pub fn set_path(&mut self, path: BezPath) {
        self.buffer = rasterize_path(&path, self.buffer.width(), self.buffer.height());
        self.path = Some(path);
    }

    pub fn width(&self) -> usize {
        self.buffer.width()
    }

    pub fn height(&self) -> usize {
        self.buffer.height()
    }
}

/// The image's selection mask
#[derive(Clone, Debug)]
pub struct Selection {
    buffer: PixelBuffer,
    empty: bool,
}

impl Selection {
    pub fn new(width: usize, height: usize) -> Selection {
        Selection {
            buffer: PixelBuffer::new(width, height, ImageType::Gray),
            empty: true,
        }
    }

    /// An empty selection places no constraint on compositing
    pub fn is_empty(&self) -> bool {
        self.empty
    }

    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    /// Clear the selection. Returns the area that changed.
    pub fn clear(&mut self) -> Option<Rectangle> {
        let changed = self.bounds();
        self.buffer.fill(&[0]);
        self.empty = true;
        changed
    }

    /// Set every pixel in the rectangle to `value`.
    /// Returns the area that changed.
    pub fn select_rect(&mut self, rect: &Rectangle, value: u8) -> Option<Rectangle> {
        let rect = rect.cropped(self.buffer.size())?;
        self.buffer.fill_rect(&rect, &[value]);
        self.empty = self.buffer.is_blank();
        Some(rect)
    }

    /// Add the inside of a path (in canvas coordinates) to the selection
    pub fn select_path(&mut self, path: &BezPath) -> Option<Rectangle> {
        let shape = rasterize_path(path, self.buffer.width(), self.buffer.height());
        for (d, s) in self.buffer.pixels_mut().iter_mut().zip(shape.pixels()) {
            *d = (*d).max(*s);
        }
        self.empty = self.buffer.is_blank();

        let bb = path.bounding_box();
        Rectangle::try_new(
            bb.x0.floor() as i32,
            bb.y0.floor() as i32,
            (bb.x1.ceil() - bb.x0.floor()) as i32,
            (bb.y1.ceil() - bb.y0.floor()) as i32,
        )
        .and_then(|r| r.cropped(self.buffer.size()))
    }

    /// Replace the whole selection
    pub fn replace(&mut self, buffer: PixelBuffer) -> Result<Option<Rectangle>> {
        if buffer.format() != ImageType::Gray
            || buffer.width() != self.buffer.width()
            || buffer.height() != self.buffer.height()
        {
            return Err(CompositeError::PreconditionViolation(
                "selection must be a canvas sized single channel buffer",
            ));
        }
        let old = self.bounds();
        self.buffer = buffer;
        self.empty = self.buffer.is_blank();
        Ok(super::rect::union_opt(old, self.bounds()))
    }

    /// Bounding rectangle of the selected pixels
    pub fn bounds(&self) -> Option<Rectangle> {
        if self.empty {
            return None;
        }
        let w = self.buffer.width();
        let (mut left, mut right, mut top, mut btm) = (w, 0, self.buffer.height(), 0);
        for (i, &v) in self.buffer.pixels().iter().enumerate() {
            if v != 0 {
                let (x, y) = (i % w, i / w);
                left = left.min(x);
                right = right.max(x);
                top = top.min(y);
                btm = btm.max(y);
            }
        }
        Rectangle::try_new(
            left as i32,
            top as i32,
            right as i32 - left as i32 + 1,
            btm as i32 - top as i32 + 1,
        )
    }
}
