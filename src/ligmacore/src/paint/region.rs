// SPDX-License-Identifier: GPL-3.0-or-later

use super::rectiter::{MutableRectIterator, RectIterator, Window};
use super::{ImageType, PixelBuffer, Rectangle};
use crate::error::{CompositeError, Result};

/// A bounds checked rectangular view into a pixel buffer.
///
/// Regions are cheap to create and are rebuilt for every compositing pass.
/// A region with zero width or height is valid and has no rows.
pub struct PixelRegion<'a> {
    buffer: &'a PixelBuffer,
    x: usize,
    y: usize,
    width: usize,
    height: usize,
}

/// A mutable rectangular view into a pixel buffer
pub struct PixelRegionMut<'a> {
    buffer: &'a mut PixelBuffer,
    x: usize,
    y: usize,
    width: usize,
    height: usize,
}

fn check_bounds(buffer: &PixelBuffer, x: i32, y: i32, width: i32, height: i32) -> Result<()> {
    let inside = x >= 0
        && y >= 0
        && width >= 0
        && height >= 0
        && (x as usize + width as usize) <= buffer.width()
        && (y as usize + height as usize) <= buffer.height();

    if inside {
        Ok(())
    } else {
        Err(CompositeError::OutOfBounds {
            x,
            y,
            width,
            height,
            buffer_width: buffer.width(),
            buffer_height: buffer.height(),
        })
    }
}

impl<'a> PixelRegion<'a> {
    pub fn new(buffer: &'a PixelBuffer, x: i32, y: i32, width: i32, height: i32) -> Result<Self> {
        check_bounds(buffer, x, y, width, height)?;
        Ok(PixelRegion {
            buffer,
            x: x as usize,
            y: y as usize,
            width: width as usize,
            height: height as usize,
        })
    }

    pub fn from_rectangle(buffer: &'a PixelBuffer, r: &Rectangle) -> Result<Self> {
        Self::new(buffer, r.x, r.y, r.w, r.h)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn format(&self) -> ImageType {
        self.buffer.format()
    }

    pub fn bytes(&self) -> usize {
        self.buffer.bytes()
    }

    /// Distance in bytes between the starts of two consecutive rows
    pub fn stride(&self) -> usize {
        self.buffer.stride()
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Iterate the rows of the region.
    /// Each row is `width * bytes` long.
    pub fn rows(&self) -> RectIterator<'a> {
        RectIterator::new(
            self.buffer.pixels(),
            Window::new(self.stride(), self.bytes(), self.x, self.y, self.width, self.height),
        )
    }

    /// Get a single row of the region
    pub fn row(&self, y: usize) -> &'a [u8] {
        assert!(y < self.height);
        let bpp = self.bytes();
        let start = (self.y + y) * self.stride() + self.x * bpp;
        &self.buffer.pixels()[start..start + self.width * bpp]
    }
}

impl<'a> PixelRegionMut<'a> {
    pub fn new(
        buffer: &'a mut PixelBuffer,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    ) -> Result<Self> {
        check_bounds(buffer, x, y, width, height)?;
        Ok(PixelRegionMut {
            buffer,
            x: x as usize,
            y: y as usize,
            width: width as usize,
            height: height as usize,
        })
    }

    pub fn from_rectangle(buffer: &'a mut PixelBuffer, r: &Rectangle) -> Result<Self> {
        Self::new(buffer, r.x, r.y, r.w, r.h)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn format(&self) -> ImageType {
        self.buffer.format()
    }

    pub fn bytes(&self) -> usize {
        self.buffer.bytes()
    }

    pub fn rows_mut(&mut self) -> MutableRectIterator<'_> {
        let window = Window::new(
            self.buffer.stride(),
            self.bytes(),
            self.x,
            self.y,
            self.width,
            self.height,
        );
        MutableRectIterator::new(self.buffer.pixels_mut(), window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(w: usize, h: usize) -> PixelBuffer {
        let pixels = (0..(w * h * 2) as u8).collect();
        PixelBuffer::from_pixels(w, h, ImageType::GrayA, pixels).unwrap()
    }

    #[test]
    fn test_region_rows() {
        let buf = numbered(3, 3);
        let region = PixelRegion::new(&buf, 1, 1, 2, 2).unwrap();
        assert_eq!(region.stride(), 6);
        let rows: Vec<&[u8]> = region.rows().collect();
        assert_eq!(rows, vec![&[8u8, 9, 10, 11][..], &[14, 15, 16, 17][..]]);
        assert_eq!(region.row(1), &[14, 15, 16, 17]);
    }

    #[test]
    fn test_out_of_bounds() {
        let buf = numbered(3, 3);
        assert!(matches!(
            PixelRegion::new(&buf, 2, 0, 2, 1),
            Err(CompositeError::OutOfBounds { .. })
        ));
        assert!(PixelRegion::new(&buf, -1, 0, 1, 1).is_err());
        assert!(PixelRegion::new(&buf, 0, 0, 3, 4).is_err());
    }

    #[test]
    fn test_zero_size() {
        let buf = numbered(3, 3);
        let region = PixelRegion::new(&buf, 3, 3, 0, 0).unwrap();
        assert!(region.is_empty());
        assert_eq!(region.rows().count(), 0);
    }

    #[test]
    fn test_mutable_region() {
        let mut buf = PixelBuffer::new(2, 2, ImageType::Gray);
        let mut region = PixelRegionMut::new(&mut buf, 1, 0, 1, 2).unwrap();
        for row in region.rows_mut() {
            row[0] = 5;
        }
        assert_eq!(buf.pixels(), &[0, 5, 0, 5]);
    }
}
