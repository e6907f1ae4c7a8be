// SPDX-License-Identifier: GPL-3.0-or-later

//! The floating selection filter.
//!
//! While a floating selection is attached to a target layer, its pixels
//! are composited onto the target's content before the target itself is
//! composited into the projection. The filter holds the state that
//! connects the two, and must be resynchronized whenever a property of
//! either layer or the image selection changes.

use super::graph::NodeId;
use crate::error::Result;
use crate::paint::convert::{convert_region, SourceKind};
use crate::paint::mask::{mask_area, multiply_masks, Selection};
use crate::paint::rasterop::{combine_region, CompositeParams};
use crate::paint::region::{PixelRegion, PixelRegionMut};
use crate::paint::{Colormap, Layer, LayerID, OpacityScaling, PixelBuffer, Rectangle, ResizePolicy};

#[derive(Clone, Debug)]
pub struct FloatingFilter {
    floating: LayerID,
    node: NodeId,

    /// Is the floating selection clipped to the target
    clip: bool,
    /// Visible part of the floating selection (in its own coordinates)
    crop: Option<Rectangle>,
    /// Floating selection position relative to the target
    offset: (i32, i32),

    use_selection: bool,
    /// Selection mask position relative to the target
    mask_offset: (i32, i32),

    params: CompositeParams,
    active: bool,
}

impl FloatingFilter {
    pub(crate) fn new(floating: LayerID, node: NodeId) -> FloatingFilter {
        FloatingFilter {
            floating,
            node,
            clip: false,
            crop: None,
            offset: (0, 0),
            use_selection: false,
            mask_offset: (0, 0),
            params: CompositeParams::default(),
            active: true,
        }
    }

    /// Recompute the filter state from the current properties
    pub fn sync(
        &mut self,
        target: &Layer,
        floating: &Layer,
        selection: &Selection,
        scaling: OpacityScaling,
    ) {
        let (tx, ty) = target.offset();
        let (fx, fy) = floating.offset();
        let (dx, dy) = (fx.saturating_sub(tx), fy.saturating_sub(ty));

        self.offset = (dx, dy);
        self.clip = target.metadata.resize_policy == ResizePolicy::Clip || !target.has_alpha();
        self.crop = if self.clip {
            Rectangle::try_new(
                dx.saturating_neg(),
                dy.saturating_neg(),
                target.width() as i32,
                target.height() as i32,
            )
        } else {
            None
        };

        self.use_selection = !selection.is_empty();
        self.mask_offset = (tx.saturating_neg(), ty.saturating_neg());

        let md = &floating.metadata;
        self.params = CompositeParams {
            opacity: scaling.scale(md.opacity),
            mode: md.mode,
            space: md.composite_space,
            composite: md.composite_mode,
            affect: target
                .metadata
                .active_channels
                .intersected(md.active_channels),
        };
        self.active = md.visible;
    }

    pub fn floating(&self) -> LayerID {
        self.floating
    }

    pub(crate) fn node(&self) -> NodeId {
        self.node
    }

    /// Is the contribution limited to the target's bounds
    pub fn is_cropped(&self) -> bool {
        self.clip
    }

    /// The crop rectangle in floating selection coordinates.
    /// None when the filter passes everything through.
    pub fn crop(&self) -> Option<Rectangle> {
        self.crop
    }

    pub fn offset(&self) -> (i32, i32) {
        self.offset
    }

    pub fn uses_selection(&self) -> bool {
        self.use_selection
    }

    pub fn mask_offset(&self) -> (i32, i32) {
        self.mask_offset
    }

    pub fn params(&self) -> &CompositeParams {
        &self.params
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// The part of the floating selection that is composited, in its own coordinates
    fn visible_part(&self, floating: &Layer) -> Option<Rectangle> {
        let local = floating.local_bounds()?;
        if self.clip {
            local.intersected(&self.crop?)
        } else {
            Some(local)
        }
    }

    /// Area of the target covered by the floating selection (target coordinates)
    pub fn extent(&self, floating: &Layer) -> Option<Rectangle> {
        if !self.active {
            return None;
        }
        self.visible_part(floating)
            .map(|r| r.offset(self.offset.0, self.offset.1))
    }

    /// Translate a pixel update of the floating selection into the
    /// damaged area of the target
    pub fn damage_for(&self, floating: &Layer, update: &Rectangle) -> Option<Rectangle> {
        self.visible_part(floating)?
            .intersected(update)
            .map(|r| r.offset(self.offset.0, self.offset.1))
    }

    /// Composite the floating selection onto target content.
    ///
    /// `dest` holds the `area` of the target (in target coordinates) in a
    /// working format. `target_offset` is where the target is on the canvas.
    #[allow(clippy::too_many_arguments)]
    pub fn apply(
        &self,
        dest: &mut PixelBuffer,
        area: &Rectangle,
        floating: &Layer,
        selection: &Selection,
        colormap: Option<&Colormap>,
        target_offset: (i32, i32),
    ) -> Result<()> {
        let r = match self.extent(floating).and_then(|e| e.intersected(area)) {
            Some(r) => r,
            None => return Ok(()),
        };
        let fs_rect = r.relative_to(self.offset.0, self.offset.1);

        let mut src = PixelBuffer::new(r.w as usize, r.h as usize, dest.format());
        convert_region(
            &PixelRegion::from_rectangle(floating.buffer(), &fs_rect)?,
            &mut PixelRegionMut::new(&mut src, 0, 0, r.w, r.h)?,
            colormap,
        )?;

        let own_mask = floating
            .compositing_mask()
            .map(|m| mask_area(m, &fs_rect, 255));
        let sel_mask = if self.use_selection {
            let canvas_rect = r.relative_to(self.mask_offset.0, self.mask_offset.1);
            Some(mask_area(selection.buffer(), &canvas_rect, 0))
        } else {
            None
        };
        let mask = multiply_masks(own_mask, sel_mask);
        let mask_region = match &mask {
            Some(m) => Some(PixelRegion::new(m, 0, 0, r.w, r.h)?),
            None => None,
        };

        combine_region(
            &mut PixelRegionMut::from_rectangle(dest, &r.relative_to(area.x, area.y))?,
            &PixelRegion::new(&src, 0, 0, r.w, r.h)?,
            mask_region.as_ref(),
            SourceKind::of(floating.format()),
            &self.params,
            (
                r.x.saturating_add(target_offset.0),
                r.y.saturating_add(target_offset.1),
            ),
        );
        Ok(())
    }
}
