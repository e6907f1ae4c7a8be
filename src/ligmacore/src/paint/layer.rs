// SPDX-License-Identifier: GPL-3.0-or-later

use super::convert::SourceKind;
use super::mask::LayerMask;
use super::rasterop::{ActiveChannels, CompositeParams};
use super::{CompositeMode, CompositeSpace, ImageType, LayerID, LayerMode, PixelBuffer, Rectangle};
use crate::error::{CompositeError, Result};

/// How a float opacity is turned into the 8 bit value used by the compositors
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum OpacityScaling {
    /// `opacity * 255.999`, truncated. Matches legacy renders bit for bit.
    #[default]
    Legacy,
    /// `opacity * 255`, rounded to nearest
    Rounded,
}

impl OpacityScaling {
    pub fn scale(self, opacity: f32) -> u8 {
        let o = opacity.clamp(0.0, 1.0);
        match self {
            OpacityScaling::Legacy => (o * 255.999) as u8,
            OpacityScaling::Rounded => (o * 255.0).round() as u8,
        }
    }
}

/// What happens to a layer's extent when content is transformed onto it
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum ResizePolicy {
    /// The layer keeps its size and content outside it is clipped
    Clip,
    /// The layer grows to fit
    #[default]
    Grow,
}

/// Common layer properties
#[derive(Clone, Debug, PartialEq)]
pub struct LayerMetadata {
    pub id: LayerID,
    pub title: String,
    pub opacity: f32,
    pub visible: bool,
    pub mode: LayerMode,
    pub composite_space: CompositeSpace,
    pub composite_mode: CompositeMode,
    pub excludes_backdrop: bool,
    pub active_channels: ActiveChannels,
    pub resize_policy: ResizePolicy,
}

impl LayerMetadata {
    pub fn new(id: LayerID, title: &str) -> LayerMetadata {
        LayerMetadata {
            id,
            title: title.to_string(),
            opacity: 1.0,
            visible: true,
            mode: LayerMode::Normal,
            composite_space: CompositeSpace::Auto,
            composite_mode: CompositeMode::Auto,
            excludes_backdrop: false,
            active_channels: ActiveChannels::ALL,
            resize_policy: ResizePolicy::Grow,
        }
    }

    /// A layer is visible when it's not hidden and its opacity is greater than zero
    pub fn is_visible(&self) -> bool {
        self.visible && self.opacity > 0.0
    }
}

/// A raster layer
#[derive(Clone, Debug)]
pub struct Layer {
    pub metadata: LayerMetadata,
    x: i32,
    y: i32,
    buffer: PixelBuffer,
    mask: Option<LayerMask>,
}

impl Layer {
    /// Create a new layer with all pixels cleared
    pub fn new(id: LayerID, title: &str, width: usize, height: usize, format: ImageType) -> Layer {
        Layer::from_buffer(id, title, PixelBuffer::new(width, height, format))
    }

    pub fn from_buffer(id: LayerID, title: &str, buffer: PixelBuffer) -> Layer {
        Layer {
            metadata: LayerMetadata::new(id, title),
            x: 0,
            y: 0,
            buffer,
            mask: None,
        }
    }

    /// Builder style offset setter for layers not yet in an image
    pub fn at(mut self, x: i32, y: i32) -> Layer {
        self.x = x;
        self.y = y;
        self
    }

    pub fn id(&self) -> LayerID {
        self.metadata.id
    }

    pub fn offset(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    pub(crate) fn set_offset(&mut self, x: i32, y: i32) {
        self.x = x;
        self.y = y;
    }

    pub fn width(&self) -> usize {
        self.buffer.width()
    }

    pub fn height(&self) -> usize {
        self.buffer.height()
    }

    pub fn format(&self) -> ImageType {
        self.buffer.format()
    }

    pub fn has_alpha(&self) -> bool {
        self.buffer.format().has_alpha()
    }

    /// Bounding box in canvas coordinates.
    /// A zero sized layer has none.
    pub fn bounds(&self) -> Option<Rectangle> {
        self.buffer.bounds().map(|r| r.offset(self.x, self.y))
    }

    /// Bounding box in layer coordinates
    pub fn local_bounds(&self) -> Option<Rectangle> {
        self.buffer.bounds()
    }

    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    pub(crate) fn buffer_mut(&mut self) -> &mut PixelBuffer {
        &mut self.buffer
    }

    pub(crate) fn replace_buffer(&mut self, buffer: PixelBuffer) {
        self.buffer = buffer;
    }

    pub fn mask(&self) -> Option<&LayerMask> {
        self.mask.as_ref()
    }

    pub(crate) fn mask_mut(&mut self) -> Option<&mut LayerMask> {
        self.mask.as_mut()
    }

    /// Set or remove the layer mask. The mask must be the same size as the layer.
    pub fn set_mask(&mut self, mask: Option<LayerMask>) -> Result<()> {
        if let Some(m) = &mask {
            if m.width() != self.width() || m.height() != self.height() {
                return Err(CompositeError::PreconditionViolation(
                    "layer mask size must match the layer",
                ));
            }
        }
        self.mask = mask;
        Ok(())
    }

    /// Enlarge the layer to cover `rect` (in layer coordinates).
    /// Existing content keeps its position on the canvas. New pixels are
    /// transparent and new mask pixels fully visible.
    pub(crate) fn grow_to(&mut self, rect: &Rectangle) -> Result<()> {
        let area = match self.local_bounds() {
            Some(lb) => lb.union(rect),
            None => *rect,
        };
        if Some(area) == self.local_bounds() {
            return Ok(());
        }

        let (w, h) = (area.w as usize, area.h as usize);
        let mut buffer = PixelBuffer::new(w, h, self.format());
        buffer.paste(&self.buffer, -area.x, -area.y);
        self.buffer = buffer;

        if let Some(old) = self.mask.take() {
            let mut mbuf = PixelBuffer::filled(w, h, ImageType::Gray, &[255]);
            mbuf.paste(old.buffer(), -area.x, -area.y);
            let mut mask = LayerMask::from_buffer(mbuf)?;
            mask.show_masked = old.show_masked;
            mask.apply = old.apply;
            self.mask = Some(mask);
        }

        self.x = self.x.saturating_add(area.x);
        self.y = self.y.saturating_add(area.y);
        Ok(())
    }

    /// Is the mask shown in place of the layer content?
    pub fn shows_mask(&self) -> bool {
        self.mask.as_ref().map_or(false, |m| m.show_masked)
    }

    /// The pixels to composite: the mask itself in mask preview mode,
    /// the layer content otherwise.
    pub fn composite_source(&self) -> &PixelBuffer {
        match &self.mask {
            Some(m) if m.show_masked => m.buffer(),
            _ => &self.buffer,
        }
    }

    pub fn source_kind(&self) -> SourceKind {
        SourceKind::of(self.composite_source().format())
    }

    /// The mask used to modulate opacity during compositing, if any
    pub fn compositing_mask(&self) -> Option<&PixelBuffer> {
        match &self.mask {
            Some(m) if m.apply && !m.show_masked => Some(m.buffer()),
            _ => None,
        }
    }

    /// Compositor settings for this layer.
    /// A mask preview is always composited in Normal mode.
    pub fn composite_params(&self, scaling: OpacityScaling) -> CompositeParams {
        let md = &self.metadata;
        CompositeParams {
            opacity: scaling.scale(md.opacity),
            mode: if self.shows_mask() {
                LayerMode::Normal
            } else {
                md.mode
            },
            space: md.composite_space,
            composite: md.composite_mode,
            affect: md.active_channels,
        }
    }
}
