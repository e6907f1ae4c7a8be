// SPDX-License-Identifier: GPL-3.0-or-later

use crate::error::{CompositeError, Result};
use crate::paint::{IDGenerator, ImageType, Layer, LayerID, OpacityScaling};

/// Tunables of the compositing engine
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectionOptions {
    pub opacity_scaling: OpacityScaling,

    /// Does a non-empty selection modulate every layer's opacity
    pub selection_masks_layers: bool,

    /// Edge length of the dirty area accumulator's tiles
    pub dirty_tile_size: u32,
}

impl Default for ProjectionOptions {
    fn default() -> Self {
        ProjectionOptions {
            opacity_scaling: OpacityScaling::Legacy,
            selection_masks_layers: true,
            dirty_tile_size: 64,
        }
    }
}

/// State shared by every image of an application session
#[derive(Debug, Default)]
pub struct ApplicationContext {
    pub options: ProjectionOptions,
    layer_ids: IDGenerator,
}

impl ApplicationContext {
    pub fn new(options: ProjectionOptions) -> ApplicationContext {
        ApplicationContext {
            options,
            layer_ids: IDGenerator::default(),
        }
    }

    pub fn next_layer_id(&mut self) -> Result<LayerID> {
        self.layer_ids
            .take_next()
            .ok_or(CompositeError::PreconditionViolation("layer IDs exhausted"))
    }

    /// Return a layer ID to the pool
    pub fn release_layer_id(&mut self, id: LayerID) {
        self.layer_ids.release(id);
    }

    /// Create a new blank layer with a fresh ID
    pub fn new_layer(
        &mut self,
        title: &str,
        width: usize,
        height: usize,
        format: ImageType,
    ) -> Result<Layer> {
        Ok(Layer::new(self.next_layer_id()?, title, width, height, format))
    }
}
