// SPDX-License-Identifier: GPL-3.0-or-later

//! Recompositing of the projection.
//!
//! A pass builds the new content of a dirty rectangle in a scratch buffer
//! by visiting the layers bottom to top, and only replaces the projection
//! once every layer has been composited.

use super::image::Image;
use super::observable::ImageEvent;
use crate::error::{CompositeError, Result};
use crate::paint::convert::{check_colormap, convert_region};
use crate::paint::mask::{mask_area, multiply_masks};
use crate::paint::rasterop::{combine_region, combine_row, initial_region, initial_row};
use crate::paint::region::{PixelRegion, PixelRegionMut};
use crate::paint::{AoE, PixelBuffer, Rectangle};

use bitvec::prelude::*;
use tracing::{debug, warn};

use std::mem;

impl Image {
    /// Recomposite an area of the canvas.
    ///
    /// The area is clipped to the canvas. An empty area is a no-op.
    pub fn request_recomposite(&mut self, x: i32, y: i32, w: i32, h: i32) -> Result<()> {
        match Rectangle::try_new(x, y, w, h).and_then(|r| r.cropped(self.size())) {
            Some(r) => self.recomposite(&r),
            None => Ok(()),
        }
    }

    /// Are there changes not yet composited
    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_nothing()
    }

    /// The area waiting to be recomposited
    pub fn dirty_area(&self) -> &AoE {
        &self.dirty
    }

    /// Recomposite everything that has changed since the last flush.
    ///
    /// If a pass fails, the area not yet recomposited stays dirty.
    pub fn flush(&mut self) -> Result<()> {
        let pending = match mem::take(&mut self.dirty) {
            AoE::Nothing => Vec::new(),
            AoE::Everything => self.bounds().into_iter().collect(),
            AoE::Bounds(r) => r.cropped(self.size()).into_iter().collect(),
            AoE::Bitmap(map) => map.dirty_rects(),
        };

        for (i, r) in pending.iter().enumerate() {
            if let Err(e) = self.recomposite(r) {
                let rest = pending[i..]
                    .iter()
                    .fold(AoE::Nothing, |aoe, r| aoe.merge((*r).into()));
                self.dirty = mem::take(&mut self.dirty).merge(rest);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Index of the first layer a pass over `rect` must visit.
    /// Layers beneath a visible layer that excludes its backdrop and
    /// covers the whole rectangle cannot show through.
    fn first_visited(&self, rect: &Rectangle) -> usize {
        self.layers
            .iter()
            .enumerate()
            .rev()
            .find(|(_, l)| {
                l.metadata.excludes_backdrop
                    && l.metadata.is_visible()
                    && self.is_rendered(l.id())
                    && self.layer_area(l.id()).map_or(false, |a| a.contains(rect))
            })
            .map_or(0, |(i, _)| i)
    }

    /// Recomposite a rectangle that lies inside the canvas
    fn recomposite(&mut self, rect: &Rectangle) -> Result<()> {
        debug!("Recompositing {:?}", rect);
        let mut scratch = PixelBuffer::new(rect.w as usize, rect.h as usize, self.projection.format());
        let mut covered = bitvec![0; rect.w as usize * rect.h as usize];

        for index in self.first_visited(rect)..self.layers.len() {
            let layer = &self.layers[index];
            if !layer.metadata.is_visible() || !self.is_rendered(layer.id()) {
                continue;
            }
            match self.composite_layer(index, rect, &mut scratch, &mut covered) {
                Ok(()) => {}
                Err(e @ CompositeError::MissingColormap { .. }) => {
                    warn!("Skipping layer {}: {}", layer.id(), e);
                }
                Err(e) => return Err(e),
            }
        }

        self.projection.paste(&scratch, rect.x, rect.y);
        self.observers
            .notify(&ImageEvent::ProjectionUpdated(*rect));
        Ok(())
    }

    /// Composite one layer into the scratch buffer holding `dirty`.
    ///
    /// Pixels no lower layer has covered yet are painted with the initial
    /// compositor, the rest are combined with what is beneath.
    fn composite_layer(
        &self,
        index: usize,
        dirty: &Rectangle,
        scratch: &mut PixelBuffer,
        covered: &mut BitVec,
    ) -> Result<()> {
        let layer = &self.layers[index];
        let r = match self.layer_area(layer.id()).and_then(|a| a.intersected(dirty)) {
            Some(r) => r,
            None => return Ok(()),
        };

        let source = layer.composite_source();
        check_colormap(source.format(), self.colormap.as_ref())?;

        // Layer content in the working format
        let (lx, ly) = layer.offset();
        let mut src = PixelBuffer::new(r.w as usize, r.h as usize, scratch.format());
        if let Some(lr) = layer.bounds().and_then(|b| b.intersected(&r)) {
            convert_region(
                &PixelRegion::from_rectangle(source, &lr.relative_to(lx, ly))?,
                &mut PixelRegionMut::from_rectangle(&mut src, &lr.relative_to(r.x, r.y))?,
                self.colormap.as_ref(),
            )?;
        }

        if let Some(filter) = self.filters.get(&layer.id()) {
            if !layer.shows_mask() {
                if let Some(fs) = self.layer(filter.floating()) {
                    let applied = filter.apply(
                        &mut src,
                        &r.relative_to(lx, ly),
                        fs,
                        &self.selection,
                        self.colormap.as_ref(),
                        (lx, ly),
                    );
                    if let Err(e) = applied {
                        warn!("Skipping floating selection {}: {}", fs.id(), e);
                    }
                }
            }
        }

        let layer_mask = layer
            .compositing_mask()
            .map(|m| mask_area(m, &r.relative_to(lx, ly), 255));
        let selection_mask =
            if self.options.selection_masks_layers && !self.selection.is_empty() {
                Some(mask_area(self.selection.buffer(), &r, 0))
            } else {
                None
            };
        let mask = multiply_masks(layer_mask, selection_mask);

        let params = layer.composite_params(self.options.opacity_scaling);
        let kind = layer.source_kind();
        let rel = r.relative_to(dirty.x, dirty.y);

        if layer.metadata.excludes_backdrop {
            scratch.fill_rect(&rel, &[0; 4][..scratch.bytes()]);
            for y in rel.y..=rel.bottom() {
                let row = y as usize * dirty.w as usize;
                covered[row + rel.x as usize..=row + rel.right() as usize].fill(false);
            }
        }

        let (mut none, mut all) = (true, true);
        for y in rel.y..=rel.bottom() {
            let row = y as usize * dirty.w as usize;
            let bits = &covered[row + rel.x as usize..=row + rel.right() as usize];
            none &= bits.not_any();
            all &= bits.all();
        }

        let mask_region = match &mask {
            Some(m) => Some(PixelRegion::new(m, 0, 0, r.w, r.h)?),
            None => None,
        };
        let src_region = PixelRegion::new(&src, 0, 0, r.w, r.h)?;

        if none || all {
            let mut dest = PixelRegionMut::from_rectangle(scratch, &rel)?;
            if none {
                initial_region(&mut dest, &src_region, mask_region.as_ref(), kind, &params, (r.x, r.y));
            } else {
                combine_region(&mut dest, &src_region, mask_region.as_ref(), kind, &params, (r.x, r.y));
            }
        } else {
            // Partially covered: split each row into runs
            let bytes = scratch.bytes();
            let mut mask_rows = mask_region.as_ref().map(|m| m.rows());
            for (y, (d, s)) in scratch
                .rect_iter_mut(&rel)
                .zip(src_region.rows())
                .enumerate()
            {
                let m = mask_rows.as_mut().and_then(|m| m.next());
                let row = (rel.y as usize + y) * dirty.w as usize + rel.x as usize;
                let bits = &covered[row..row + r.w as usize];
                let cy = r.y + y as i32;

                let mut start = 0;
                while start < bits.len() {
                    let state = bits[start];
                    let end = bits[start..]
                        .iter()
                        .position(|b| *b != state)
                        .map_or(bits.len(), |p| start + p);

                    let ds = &mut d[start * bytes..end * bytes];
                    let ss = &s[start * bytes..end * bytes];
                    let ms = m.map(|m| &m[start..end]);
                    let cx = r.x + start as i32;
                    if state {
                        combine_row(ds, ss, ms, kind, &params, bytes, cx, cy);
                    } else {
                        initial_row(ds, ss, ms, kind, &params, bytes, cx, cy);
                    }
                    start = end;
                }
            }
        }

        for y in rel.y..=rel.bottom() {
            let row = y as usize * dirty.w as usize;
            covered[row + rel.x as usize..=row + rel.right() as usize].fill(true);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{ApplicationContext, ProjectionOptions};
    use crate::paint::{BaseType, ImageType, Layer, LayerMask};

    #[test]
    fn test_failed_flush_keeps_rest_dirty() {
        let mut ctx = ApplicationContext::new(ProjectionOptions {
            dirty_tile_size: 4,
            ..ProjectionOptions::default()
        });
        let mut image = Image::new(&ctx, 16, 4, BaseType::Rgb);
        let bg = ctx.next_layer_id().unwrap();
        let fg = ctx.next_layer_id().unwrap();
        image
            .add_layer(Layer::from_buffer(
                bg,
                "bg",
                PixelBuffer::filled(16, 4, ImageType::Rgba, &[255, 0, 0, 255]),
            ))
            .unwrap();
        image.add_layer(Layer::new(fg, "fg", 4, 4, ImageType::Rgba)).unwrap();
        image.set_layer_mask(fg, Some(LayerMask::new(4, 4, 200))).unwrap();
        image.set_layer_mask_show(fg, true).unwrap();
        image.flush().unwrap();

        // Layer content no longer matching its mask makes the second tile fail
        image.layers[1].replace_buffer(PixelBuffer::new(16, 4, ImageType::Rgba));
        image.damage(Some(Rectangle::new(0, 0, 4, 4)));
        image.damage(Some(Rectangle::new(8, 0, 4, 4)));

        assert!(matches!(
            image.flush(),
            Err(CompositeError::OutOfBounds { .. })
        ));
        assert_eq!(image.dirty_area(), &AoE::Bounds(Rectangle::new(8, 0, 4, 4)));
        assert_eq!(image.projection().pixel_at(0, 0), &[200, 200, 200, 255]);

        image.layers[1].replace_buffer(PixelBuffer::new(4, 4, ImageType::Rgba));
        image.flush().unwrap();
        assert!(!image.is_dirty());
    }
}
