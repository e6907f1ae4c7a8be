// SPDX-License-Identifier: GPL-3.0-or-later

use super::{Rectangle, Size};

use bitvec::prelude::*;

/// The area of the canvas waiting to be recomposited.
///
/// Damage is not tied to any layer: the whole stack is recomposited
/// for a dirty area.
#[derive(Debug, PartialEq, Clone, Default)]
pub enum AoE {
    /// The entire canvas
    Everything,

    /// A set of dirty tiles
    Bitmap(TileMap),

    /// A single rectangle
    Bounds(Rectangle),

    #[default]
    Nothing,
}

impl AoE {
    pub fn merge(self, other: AoE) -> Self {
        use AoE::*;
        match (self, other) {
            (Nothing, o) | (o, Nothing) => o,
            (Everything, _) | (_, Everything) => Everything,
            (Bitmap(mut a), Bitmap(b)) => {
                if a.same_grid(&b) {
                    a.tiles |= b.tiles;
                    a.into()
                } else {
                    Everything
                }
            }
            (Bitmap(mut map), Bounds(r)) | (Bounds(r), Bitmap(mut map)) => {
                map.mark(&r);
                map.into()
            }
            (Bounds(a), Bounds(b)) => Bounds(a.union(&b)),
        }
    }

    pub fn is_nothing(&self) -> bool {
        matches!(self, AoE::Nothing)
    }
}

impl From<TileMap> for AoE {
    /// A map with every tile set collapses into Everything
    fn from(map: TileMap) -> AoE {
        if map.tiles.not_any() {
            AoE::Nothing
        } else if map.tiles.all() {
            AoE::Everything
        } else {
            AoE::Bitmap(map)
        }
    }
}

impl From<Rectangle> for AoE {
    fn from(r: Rectangle) -> AoE {
        AoE::Bounds(r)
    }
}

impl From<Option<Rectangle>> for AoE {
    fn from(r: Option<Rectangle>) -> AoE {
        r.map_or(AoE::Nothing, AoE::Bounds)
    }
}

/// Dirty flags for a grid of square tiles covering a canvas
#[derive(Debug, PartialEq, Clone)]
pub struct TileMap {
    pub tiles: BitVec,
    canvas: Size,
    tile_size: i32,
    /// Grid width in tiles
    columns: usize,
}

impl TileMap {
    pub fn new(canvas: Size, tile_size: u32) -> TileMap {
        assert!(tile_size > 0);
        let ts = tile_size as i32;
        let (columns, rows) = if canvas.is_empty() {
            (0, 0)
        } else {
            (
                ((canvas.width + ts - 1) / ts) as usize,
                ((canvas.height + ts - 1) / ts) as usize,
            )
        };
        TileMap {
            tiles: bitvec![0; columns * rows],
            canvas,
            tile_size: ts,
            columns,
        }
    }

    fn same_grid(&self, other: &TileMap) -> bool {
        self.canvas == other.canvas && self.tile_size == other.tile_size
    }

    /// Mark every tile touched by the rectangle. Parts outside the canvas
    /// are ignored.
    pub fn mark(&mut self, r: &Rectangle) {
        let r = match r.cropped(self.canvas) {
            Some(r) => r,
            None => return,
        };
        let ts = self.tile_size;
        let (x0, x1) = ((r.x / ts) as usize, (r.right() / ts) as usize);
        for ty in (r.y / ts) as usize..=(r.bottom() / ts) as usize {
            let row = ty * self.columns;
            self.tiles[row + x0..=row + x1].fill(true);
        }
    }

    /// Builder style `mark`
    pub fn with(mut self, r: &Rectangle) -> TileMap {
        self.mark(r);
        self
    }

    /// The dirty area as rectangles clipped to the canvas.
    /// Horizontally adjacent dirty tiles are joined into one rectangle.
    pub fn dirty_rects(&self) -> Vec<Rectangle> {
        let mut rects = Vec::new();
        if self.columns == 0 {
            return rects;
        }
        let ts = self.tile_size;
        for (ty, row) in self.tiles.chunks(self.columns).enumerate() {
            let mut tx = 0;
            while let Some(start) = row[tx..].first_one().map(|s| tx + s) {
                let end = row[start..].first_zero().map_or(row.len(), |e| start + e);
                let run = Rectangle::new(
                    start as i32 * ts,
                    ty as i32 * ts,
                    (end - start) as i32 * ts,
                    ts,
                );
                rects.extend(run.cropped(self.canvas));
                tx = end;
            }
        }
        rects
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(w: i32, h: i32) -> TileMap {
        TileMap::new(Size::new(w, h), 64)
    }

    #[test]
    fn test_mark() {
        let mut a = map(192, 192).with(&Rectangle::new(-70, -70, 140, 140));

        #[rustfmt::skip]
        assert_eq!(a.tiles, bitvec![
            1, 1, 0,
            1, 1, 0,
            0, 0, 0,
        ]);

        a.mark(&Rectangle::new(120, 120, 200, 20));
        #[rustfmt::skip]
        assert_eq!(a.tiles, bitvec![
            1, 1, 0,
            1, 1, 1,
            0, 1, 1,
        ]);
    }

    #[test]
    fn test_outside_is_ignored() {
        let m = map(100, 100).with(&Rectangle::new(-50, 0, 10, 10));
        assert_eq!(AoE::from(m), AoE::Nothing);
        assert_eq!(AoE::from(map(100, 100).with(&Rectangle::new(0, 0, 100, 100))), AoE::Everything);
    }

    #[test]
    fn test_dirty_rects() {
        let m = map(150, 130)
            .with(&Rectangle::new(0, 0, 1, 1))
            .with(&Rectangle::new(70, 0, 1, 1))
            .with(&Rectangle::new(140, 70, 1, 1));

        assert_eq!(
            m.dirty_rects(),
            vec![Rectangle::new(0, 0, 128, 64), Rectangle::new(128, 64, 22, 64)]
        );
        assert!(map(0, 10).dirty_rects().is_empty());
    }

    #[test]
    fn test_merge() {
        let m = map(128, 128);
        let a = AoE::Bitmap(m.clone()).merge(Rectangle::new(0, 0, 10, 10).into());
        assert_eq!(a, AoE::Bitmap(m.clone().with(&Rectangle::new(0, 0, 1, 1))));

        let b = AoE::Bounds(Rectangle::new(0, 0, 1, 1)).merge(Rectangle::new(5, 5, 1, 1).into());
        assert_eq!(b, AoE::Bounds(Rectangle::new(0, 0, 6, 6)));

        let other_grid = TileMap::new(Size::new(128, 128), 32).with(&Rectangle::new(0, 0, 1, 1));
        assert_eq!(
            AoE::Bitmap(m.with(&Rectangle::new(0, 0, 1, 1))).merge(AoE::Bitmap(other_grid)),
            AoE::Everything
        );

        assert_eq!(AoE::Nothing.merge(AoE::Everything), AoE::Everything);
        assert_eq!(AoE::from(None), AoE::Nothing);
    }
}
