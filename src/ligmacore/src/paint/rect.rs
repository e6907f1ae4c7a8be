// SPDX-License-Identifier: GPL-3.0-or-later

use core::cmp::{max, min};

#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub fn new(width: i32, height: i32) -> Size {
        Size { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

/// A rectangle with a non-zero area
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct Rectangle {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rectangle {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Rectangle {
        assert!(w > 0 && h > 0);
        Rectangle { x, y, w, h }
    }

    /// Like `new`, but an empty rectangle is returned as None
    /// instead of panicking.
    pub fn try_new(x: i32, y: i32, w: i32, h: i32) -> Option<Rectangle> {
        if w > 0 && h > 0 {
            Some(Rectangle { x, y, w, h })
        } else {
            None
        }
    }

    pub fn from_size(size: Size) -> Option<Rectangle> {
        Rectangle::try_new(0, 0, size.width, size.height)
    }

    pub fn size(&self) -> Size {
        Size::new(self.w, self.h)
    }

    /// Build a rectangle from its edges. `x1` and `y1` are exclusive.
    fn from_edges(x0: i64, y0: i64, x1: i64, y1: i64) -> Option<Rectangle> {
        Rectangle::try_new(clamp(x0), clamp(y0), clamp(x1 - x0), clamp(y1 - y0))
    }

    /// Exclusive right and bottom edges
    fn end(&self) -> (i64, i64) {
        (self.x as i64 + self.w as i64, self.y as i64 + self.h as i64)
    }

    pub fn contains(&self, other: &Rectangle) -> bool {
        let (x1, y1) = self.end();
        let (ox1, oy1) = other.end();
        other.x >= self.x && other.y >= self.y && ox1 <= x1 && oy1 <= y1
    }

    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        let (x1, y1) = self.end();
        (self.x as i64..x1).contains(&(x as i64)) && (self.y as i64..y1).contains(&(y as i64))
    }

    pub fn intersected(&self, other: &Rectangle) -> Option<Rectangle> {
        let (x1, y1) = self.end();
        let (ox1, oy1) = other.end();
        Rectangle::from_edges(
            max(self.x, other.x) as i64,
            max(self.y, other.y) as i64,
            min(x1, ox1),
            min(y1, oy1),
        )
    }

    /// The smallest rectangle containing both.
    /// Extents past the coordinate range are clamped.
    pub fn union(&self, other: &Rectangle) -> Rectangle {
        let (x1, y1) = self.end();
        let (ox1, oy1) = other.end();
        let x = min(self.x, other.x);
        let y = min(self.y, other.y);
        Rectangle {
            x,
            y,
            w: clamp(max(x1, ox1) - x as i64),
            h: clamp(max(y1, oy1) - y as i64),
        }
    }

    /// Clip this rectangle to the bounds of a raster of the given size
    pub fn cropped(&self, size: Size) -> Option<Rectangle> {
        if size.is_empty() {
            return None;
        }
        self.intersected(&Rectangle::new(0, 0, size.width, size.height))
    }

    pub fn right(&self) -> i32 {
        clamp(self.end().0 - 1)
    }

    pub fn bottom(&self) -> i32 {
        clamp(self.end().1 - 1)
    }

    /// Move the rectangle. Positions past the coordinate range are clamped.
    pub fn offset(&self, x: i32, y: i32) -> Rectangle {
        Rectangle {
            x: clamp(self.x as i64 + x as i64),
            y: clamp(self.y as i64 + y as i64),
            w: self.w,
            h: self.h,
        }
    }

    /// This rectangle in a coordinate system whose origin is at (x, y)
    pub fn relative_to(&self, x: i32, y: i32) -> Rectangle {
        Rectangle {
            x: clamp(self.x as i64 - x as i64),
            y: clamp(self.y as i64 - y as i64),
            w: self.w,
            h: self.h,
        }
    }
}

fn clamp(v: i64) -> i32 {
    v.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

/// Union of two optional rectangles
pub fn union_opt(a: Option<Rectangle>, b: Option<Rectangle>) -> Option<Rectangle> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.union(&b)),
        (a, None) => a,
        (None, b) => b,
    }
}
