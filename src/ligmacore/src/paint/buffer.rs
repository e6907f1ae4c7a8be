// SPDX-License-Identifier: GPL-3.0-or-later

use super::rectiter::{MutableRectIterator, RectIterator, Window};
use super::{ImageType, Rectangle, Size};
use crate::error::{CompositeError, Result};

/// A flat pixel buffer in one of the storage formats.
///
/// Pixels are stored row by row with no padding, `format.bytes()`
/// bytes per pixel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    pixels: Vec<u8>,
    width: usize,
    height: usize,
    format: ImageType,
}

impl PixelBuffer {
    /// Create a new buffer with every byte cleared
    pub fn new(width: usize, height: usize, format: ImageType) -> PixelBuffer {
        PixelBuffer {
            pixels: vec![0; width * height * format.bytes()],
            width,
            height,
            format,
        }
    }

    /// Create a new buffer where every pixel is `pixel`
    pub fn filled(width: usize, height: usize, format: ImageType, pixel: &[u8]) -> PixelBuffer {
        assert_eq!(pixel.len(), format.bytes());
        let mut buffer = PixelBuffer::new(width, height, format);
        buffer
            .pixels
            .chunks_exact_mut(format.bytes())
            .for_each(|p| p.copy_from_slice(pixel));
        buffer
    }

    /// Wrap existing pixel data
    pub fn from_pixels(
        width: usize,
        height: usize,
        format: ImageType,
        pixels: Vec<u8>,
    ) -> Result<PixelBuffer> {
        let expected = width * height * format.bytes();
        if pixels.len() != expected {
            return Err(CompositeError::InvalidBuffer {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(PixelBuffer {
            pixels,
            width,
            height,
            format,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn format(&self) -> ImageType {
        self.format
    }

    pub fn bytes(&self) -> usize {
        self.format.bytes()
    }

    /// Length of a row in bytes
    pub fn stride(&self) -> usize {
        self.width * self.format.bytes()
    }

    pub fn size(&self) -> Size {
        Size::new(self.width as i32, self.height as i32)
    }

    pub fn is_null(&self) -> bool {
        self.pixels.is_empty()
    }

    /// The buffer's extent, or None if it is empty
    pub fn bounds(&self) -> Option<Rectangle> {
        Rectangle::from_size(self.size())
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    pub fn pixel_at(&self, x: usize, y: usize) -> &[u8] {
        let bpp = self.bytes();
        let i = (y * self.width + x) * bpp;
        &self.pixels[i..i + bpp]
    }

    pub fn put_pixel(&mut self, x: usize, y: usize, pixel: &[u8]) {
        let bpp = self.bytes();
        let i = (y * self.width + x) * bpp;
        self.pixels[i..i + bpp].copy_from_slice(pixel);
    }

    /// Return true if every byte of the buffer is zero
    pub fn is_blank(&self) -> bool {
        self.pixels.iter().all(|&b| b == 0)
    }

    /// Iterate the rows of a rectangle that must lie inside the buffer
    pub fn rect_iter(&self, rect: &Rectangle) -> RectIterator {
        RectIterator::new(&self.pixels, self.window(rect))
    }

    pub fn rect_iter_mut(&mut self, rect: &Rectangle) -> MutableRectIterator {
        let window = self.window(rect);
        MutableRectIterator::new(&mut self.pixels, window)
    }

    fn window(&self, rect: &Rectangle) -> Window {
        Window::new(
            self.stride(),
            self.bytes(),
            rect.x as usize,
            rect.y as usize,
            rect.w as usize,
            rect.h as usize,
        )
    }

    /// Set every pixel inside the rectangle (clipped to the buffer)
    pub fn fill_rect(&mut self, rect: &Rectangle, pixel: &[u8]) {
        assert_eq!(pixel.len(), self.bytes());
        if let Some(r) = rect.cropped(self.size()) {
            let bpp = self.bytes();
            self.rect_iter_mut(&r)
                .for_each(|row| row.chunks_exact_mut(bpp).for_each(|p| p.copy_from_slice(pixel)));
        }
    }

    pub fn fill(&mut self, pixel: &[u8]) {
        assert_eq!(pixel.len(), self.bytes());
        let bpp = self.bytes();
        self.pixels
            .chunks_exact_mut(bpp)
            .for_each(|p| p.copy_from_slice(pixel));
    }

    /// Return a cropped copy of the buffer
    pub fn cropped(&self, rect: &Rectangle) -> PixelBuffer {
        let rect = match rect.cropped(self.size()) {
            Some(r) => r,
            None => return PixelBuffer::new(0, 0, self.format),
        };

        let mut pixels = Vec::with_capacity(rect.w as usize * rect.h as usize * self.bytes());
        self.rect_iter(&rect)
            .for_each(|row| pixels.extend_from_slice(row));

        PixelBuffer {
            pixels,
            width: rect.w as usize,
            height: rect.h as usize,
            format: self.format,
        }
    }

    /// Return a copy of this buffer with an opaque alpha channel added.
    /// A buffer that already has alpha is returned as is.
    pub fn with_alpha(&self) -> PixelBuffer {
        if self.format.has_alpha() {
            return self.clone();
        }
        let format = self.format.with_alpha();
        let bpp = self.bytes();
        let mut pixels = Vec::with_capacity(self.width * self.height * format.bytes());
        for p in self.pixels.chunks_exact(bpp) {
            pixels.extend_from_slice(p);
            pixels.push(255);
        }
        PixelBuffer {
            pixels,
            width: self.width,
            height: self.height,
            format,
        }
    }

    /// Return a copy of this buffer with the alpha channel dropped
    pub fn without_alpha(&self) -> PixelBuffer {
        if !self.format.has_alpha() {
            return self.clone();
        }
        let format = self.format.without_alpha();
        let bpp = self.bytes();
        let mut pixels = Vec::with_capacity(self.width * self.height * format.bytes());
        for p in self.pixels.chunks_exact(bpp) {
            pixels.extend_from_slice(&p[..bpp - 1]);
        }
        PixelBuffer {
            pixels,
            width: self.width,
            height: self.height,
            format,
        }
    }

    /// Copy another buffer of the same format into this one at the given position.
    /// Parts falling outside this buffer are clipped.
    pub fn paste(&mut self, src: &PixelBuffer, x: i32, y: i32) {
        assert_eq!(src.format, self.format);
        let src_rect = match src.bounds() {
            Some(r) => r.offset(x, y),
            None => return,
        };
        let target = match src_rect.cropped(self.size()) {
            Some(r) => r,
            None => return,
        };
        let from = target.relative_to(x, y);
        let rows = src.rect_iter(&from);
        for (d, s) in self.rect_iter_mut(&target).zip(rows) {
            d.copy_from_slice(s);
        }
    }
}
