// SPDX-License-Identifier: GPL-3.0-or-later

//! Row iterators over a rectangular window of a byte raster.
//!
//! Windows are given in pixels; each yielded row is `width * bpp` bytes.
//! An empty window yields no rows.

use std::iter::Take;
use std::slice::{Chunks, ChunksMut};

/// Byte layout of a window into a raster of `stride` bytes per row
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Window {
    pub stride: usize,
    /// First byte of the window in each row
    pub start: usize,
    /// Bytes per row
    pub len: usize,
    /// Index of the first row
    pub top: usize,
    pub rows: usize,
}

impl Window {
    pub fn new(stride: usize, bpp: usize, x: usize, y: usize, w: usize, h: usize) -> Window {
        let rows = if w == 0 || stride == 0 { 0 } else { h };
        Window {
            stride,
            start: x * bpp,
            len: w * bpp,
            top: y,
            rows,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Bytes needed in the underlying buffer
    fn required_len(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            (self.top + self.rows - 1) * self.stride + self.start + self.len
        }
    }

    fn check(&self, buflen: usize) {
        assert!(self.start + self.len <= self.stride || self.is_empty());
        assert!(self.required_len() <= buflen, "window exceeds the buffer");
    }

    fn tail<'a>(&self, buf: &'a [u8]) -> &'a [u8] {
        if self.is_empty() {
            &[]
        } else {
            &buf[self.top * self.stride..]
        }
    }
}

pub struct RectIterator<'a> {
    rows: Take<Chunks<'a, u8>>,
    start: usize,
    len: usize,
}

impl<'a> RectIterator<'a> {
    pub fn new(buf: &'a [u8], window: Window) -> RectIterator<'a> {
        window.check(buf.len());
        RectIterator {
            rows: window
                .tail(buf)
                .chunks(window.stride.max(1))
                .take(window.rows),
            start: window.start,
            len: window.len,
        }
    }
}

impl<'a> Iterator for RectIterator<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        self.rows
            .next()
            .map(|row| &row[self.start..self.start + self.len])
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

pub struct MutableRectIterator<'a> {
    rows: Take<ChunksMut<'a, u8>>,
    start: usize,
    len: usize,
}

impl<'a> MutableRectIterator<'a> {
    pub fn new(buf: &'a mut [u8], window: Window) -> MutableRectIterator<'a> {
        window.check(buf.len());
        let tail: &mut [u8] = if window.is_empty() {
            &mut []
        } else {
            &mut buf[window.top * window.stride..]
        };
        MutableRectIterator {
            rows: tail.chunks_mut(window.stride.max(1)).take(window.rows),
            start: window.start,
            len: window.len,
        }
    }
}

impl<'a> Iterator for MutableRectIterator<'a> {
    type Item = &'a mut [u8];

    fn next(&mut self) -> Option<Self::Item> {
        let (start, len) = (self.start, self.len);
        self.rows.next().map(|row| &mut row[start..start + len])
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}
