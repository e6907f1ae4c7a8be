// SPDX-License-Identifier: GPL-3.0-or-later

use super::context::{ApplicationContext, ProjectionOptions};
use super::floating::FloatingFilter;
use super::graph::{Graph, NodeId, NodeKind};
use super::observable::{ImageEvent, ImageObserver, LayerChange, ObserverList, Subscription};
use crate::error::{CompositeError, Result};
use crate::paint::mask::{LayerMask, Selection};
use crate::paint::rasterop::ActiveChannels;
use crate::paint::rect::union_opt;
use crate::paint::{
    AoE, BaseType, Colormap, CompositeMode, CompositeSpace, Layer, LayerID, LayerMode,
    PixelBuffer, Rectangle, ResizePolicy, Size, TileMap,
};

use kurbo::BezPath;
use tracing::error;

use std::cell::RefCell;
use std::collections::HashMap;
use std::mem;
use std::rc::Rc;

/// Graph nodes belonging to a layer
#[derive(Copy, Clone, Debug)]
pub(super) struct LayerNodes {
    pub layer: NodeId,
    pub source: NodeId,
    pub mask: Option<NodeId>,
}

/// A canvas with a stack of layers and its composited projection
pub struct Image {
    pub(super) width: usize,
    pub(super) height: usize,
    pub(super) base_type: BaseType,
    pub(super) colormap: Option<Colormap>,
    pub(super) options: ProjectionOptions,

    /// The layer stack, bottom first
    pub(super) layers: Vec<Layer>,
    pub(super) graph: Graph,
    pub(super) root: NodeId,
    pub(super) nodes: HashMap<LayerID, LayerNodes>,
    /// Floating selection filters by target layer
    pub(super) filters: HashMap<LayerID, FloatingFilter>,

    pub(super) selection: Selection,
    pub(super) projection: PixelBuffer,
    pub(super) dirty: AoE,
    pub(super) observers: ObserverList,
}

fn precondition(msg: &'static str) -> CompositeError {
    error!("{}", msg);
    CompositeError::PreconditionViolation(msg)
}

impl Image {
    pub fn new(ctx: &ApplicationContext, width: usize, height: usize, base_type: BaseType) -> Image {
        let mut graph = Graph::new();
        let root = graph.add(NodeKind::Projection);
        Image {
            width,
            height,
            base_type,
            colormap: None,
            options: ctx.options.clone(),
            layers: Vec::new(),
            graph,
            root,
            nodes: HashMap::new(),
            filters: HashMap::new(),
            selection: Selection::new(width, height),
            projection: PixelBuffer::new(width, height, base_type.projection_type()),
            dirty: AoE::Nothing,
            observers: ObserverList::default(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn size(&self) -> Size {
        Size::new(self.width as i32, self.height as i32)
    }

    pub fn bounds(&self) -> Option<Rectangle> {
        Rectangle::from_size(self.size())
    }

    pub fn base_type(&self) -> BaseType {
        self.base_type
    }

    pub fn options(&self) -> &ProjectionOptions {
        &self.options
    }

    pub fn colormap(&self) -> Option<&Colormap> {
        self.colormap.as_ref()
    }

    pub fn set_colormap(&mut self, colormap: Option<Colormap>) {
        self.colormap = colormap;
        self.damage(self.bounds());
    }

    /// The composited image. Call `flush` first to bring it up to date.
    pub fn projection(&self) -> &PixelBuffer {
        &self.projection
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Add a new observer. It stays subscribed until the subscription
    /// or the observer itself is dropped.
    pub fn add_observer(&mut self, o: Rc<RefCell<dyn ImageObserver>>) -> Subscription {
        self.observers.subscribe(o)
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    // Layer stack

    /// The layer stack, bottom first
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, id: LayerID) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id() == id)
    }

    pub(super) fn index_of(&self, id: LayerID) -> Result<usize> {
        self.layers
            .iter()
            .position(|l| l.id() == id)
            .ok_or(CompositeError::UnknownLayer(id))
    }

    /// Add a layer to the top of the stack
    pub fn add_layer(&mut self, layer: Layer) -> Result<()> {
        self.insert_layer(self.layers.len(), layer)
    }

    /// Insert a layer at the given stack position (0 is the bottom)
    pub fn insert_layer(&mut self, index: usize, layer: Layer) -> Result<()> {
        let id = layer.id();
        if self.nodes.contains_key(&id) {
            return Err(CompositeError::PreconditionViolation(
                "layer ID already in use",
            ));
        }
        let index = index.min(self.layers.len());

        let layer_node = self.graph.add(NodeKind::Layer(id));
        let source = self.graph.add(NodeKind::LayerSource(id));
        self.graph.insert(layer_node, self.root, index)?;
        self.graph.attach(source, layer_node)?;
        let mask = match layer.mask() {
            Some(_) => {
                let m = self.graph.add(NodeKind::Mask(id));
                self.graph.attach(m, layer_node)?;
                Some(m)
            }
            None => None,
        };
        self.nodes.insert(
            id,
            LayerNodes {
                layer: layer_node,
                source,
                mask,
            },
        );

        self.layers.insert(index, layer);
        self.damage(self.contribution(id));
        Ok(())
    }

    /// Remove a layer from the stack.
    ///
    /// A floating selection attached to the layer is detached first, as is
    /// the layer itself if it is floating.
    pub fn remove_layer(&mut self, id: LayerID) -> Result<Layer> {
        self.index_of(id)?;
        let mut area = self.contribution(id);

        if self.filters.contains_key(&id) {
            let fs = self.detach_filter(id)?;
            area = union_opt(area, self.contribution(fs));
        }
        if let Some(target) = self.floating_target(id) {
            self.detach_filter(target)?;
        }

        let layer = self.take_layer(id)?;
        self.damage(area);
        Ok(layer)
    }

    fn take_layer(&mut self, id: LayerID) -> Result<Layer> {
        let index = self.index_of(id)?;
        if let Some(n) = self.nodes.remove(&id) {
            self.graph.remove(n.layer);
        }
        Ok(self.layers.remove(index))
    }

    /// Move a layer to a new stack position
    pub fn move_layer(&mut self, id: LayerID, index: usize) -> Result<()> {
        let old = self.index_of(id)?;
        let layer = self.layers.remove(old);
        let index = index.min(self.layers.len());
        self.layers.insert(index, layer);

        let node = self.nodes[&id].layer;
        self.graph.detach(node);
        self.graph.insert(node, self.root, index)?;

        self.damage(self.contribution(id));
        Ok(())
    }

    /// Is the layer composited on its own. A floating selection is
    /// composited through its target instead.
    pub fn is_rendered(&self, id: LayerID) -> bool {
        self.nodes
            .get(&id)
            .map_or(false, |n| self.graph.parent(n.source) == Some(n.layer))
    }

    pub fn layer_node(&self, id: LayerID) -> Option<NodeId> {
        self.nodes.get(&id).map(|n| n.layer)
    }

    pub fn source_node(&self, id: LayerID) -> Option<NodeId> {
        self.nodes.get(&id).map(|n| n.source)
    }

    /// Canvas area covered by the layer, including an attached floating
    /// selection's pixels extending past it. Visibility is not considered.
    pub fn layer_area(&self, id: LayerID) -> Option<Rectangle> {
        if let Some(target) = self.floating_target(id) {
            return self.floating_extent(target);
        }
        union_opt(self.layer(id)?.bounds(), self.floating_extent(id))
    }

    /// Canvas area whose projection currently depends on the layer
    pub(super) fn contribution(&self, id: LayerID) -> Option<Rectangle> {
        if let Some(target) = self.floating_target(id) {
            return if self.layer(target)?.metadata.is_visible() {
                self.floating_extent(target)
            } else {
                None
            };
        }
        if !self.layer(id)?.metadata.is_visible() || !self.is_rendered(id) {
            return None;
        }
        self.layer_area(id)
    }

    /// Canvas area the floating selection attached to `target` covers
    pub(super) fn floating_extent(&self, target: LayerID) -> Option<Rectangle> {
        let filter = self.filters.get(&target)?;
        let t = self.layer(target)?;
        if t.shows_mask() {
            return None;
        }
        let (tx, ty) = t.offset();
        filter
            .extent(self.layer(filter.floating())?)
            .map(|r| r.offset(tx, ty))
    }

    /// Mark an area for recompositing and tell the observers
    pub(super) fn damage(&mut self, area: Option<Rectangle>) {
        let r = match area.and_then(|r| r.cropped(self.size())) {
            Some(r) => r,
            None => return,
        };
        let tiles = TileMap::new(self.size(), self.options.dirty_tile_size.max(1)).with(&r);
        self.dirty = mem::take(&mut self.dirty).merge(tiles.into());
        self.observers.notify(&ImageEvent::RegionChanged(r));
    }

    /// Apply a property change to a layer, resynchronize dependent
    /// floating selection filters and damage what changed.
    fn change_layer<F>(&mut self, id: LayerID, change: LayerChange, f: F) -> Result<()>
    where
        F: FnOnce(&mut Layer) -> Result<()>,
    {
        let index = self.index_of(id)?;
        let before = self.contribution(id);
        f(&mut self.layers[index])?;
        self.sync_filters_of(id);
        let after = self.contribution(id);

        self.observers
            .notify(&ImageEvent::LayerChanged { layer: id, change });
        self.damage(union_opt(before, after));
        Ok(())
    }

    // Layer properties

    pub fn set_layer_offset(&mut self, id: LayerID, x: i32, y: i32) -> Result<()> {
        let (ox, oy) = self.layer(id).ok_or(CompositeError::UnknownLayer(id))?.offset();
        let change = LayerChange::OffsetChanged {
            dx: x.saturating_sub(ox),
            dy: y.saturating_sub(oy),
        };
        self.change_layer(id, change, |l| {
            l.set_offset(x, y);
            Ok(())
        })
    }

    pub fn set_layer_opacity(&mut self, id: LayerID, opacity: f32) -> Result<()> {
        self.change_layer(id, LayerChange::OpacityChanged, |l| {
            l.metadata.opacity = opacity.clamp(0.0, 1.0);
            Ok(())
        })
    }

    pub fn set_layer_mode(&mut self, id: LayerID, mode: LayerMode) -> Result<()> {
        self.change_layer(id, LayerChange::ModeChanged, |l| {
            l.metadata.mode = mode;
            Ok(())
        })
    }

    pub fn set_layer_composite_space(&mut self, id: LayerID, space: CompositeSpace) -> Result<()> {
        self.change_layer(id, LayerChange::ModeChanged, |l| {
            l.metadata.composite_space = space;
            Ok(())
        })
    }

    pub fn set_layer_composite_mode(&mut self, id: LayerID, mode: CompositeMode) -> Result<()> {
        self.change_layer(id, LayerChange::ModeChanged, |l| {
            l.metadata.composite_mode = mode;
            Ok(())
        })
    }

    pub fn set_layer_excludes_backdrop(&mut self, id: LayerID, excludes: bool) -> Result<()> {
        self.change_layer(id, LayerChange::ModeChanged, |l| {
            l.metadata.excludes_backdrop = excludes;
            Ok(())
        })
    }

    /// Show or hide a layer.
    ///
    /// Toggling a layer that excludes its backdrop also damages the
    /// backdrop beneath it.
    pub fn set_layer_visible(&mut self, id: LayerID, visible: bool) -> Result<()> {
        self.change_layer(id, LayerChange::VisibilityChanged, |l| {
            l.metadata.visible = visible;
            Ok(())
        })?;

        let index = self.index_of(id)?;
        if self.layers[index].metadata.excludes_backdrop && self.is_rendered(id) {
            if let Some(area) = self.layer_area(id) {
                let beneath = self.layers[..index]
                    .iter()
                    .filter_map(|l| self.contribution(l.id())?.intersected(&area))
                    .fold(None, |acc, r| union_opt(acc, Some(r)));
                self.damage(beneath);
            }
        }
        Ok(())
    }

    pub fn set_layer_active_channels(&mut self, id: LayerID, channels: ActiveChannels) -> Result<()> {
        self.change_layer(id, LayerChange::ActiveChannelsChanged, |l| {
            l.metadata.active_channels = channels;
            Ok(())
        })
    }

    pub fn set_layer_resize_policy(&mut self, id: LayerID, policy: ResizePolicy) -> Result<()> {
        self.change_layer(id, LayerChange::FormatChanged, |l| {
            l.metadata.resize_policy = policy;
            Ok(())
        })
    }

    /// Add or remove the layer's alpha channel
    pub fn set_layer_alpha(&mut self, id: LayerID, alpha: bool) -> Result<()> {
        self.change_layer(id, LayerChange::FormatChanged, |l| {
            let buffer = if alpha {
                l.buffer().with_alpha()
            } else {
                l.buffer().without_alpha()
            };
            l.replace_buffer(buffer);
            Ok(())
        })
    }

    /// Set or remove a layer's mask
    pub fn set_layer_mask(&mut self, id: LayerID, mask: Option<LayerMask>) -> Result<()> {
        let has_mask = mask.is_some();
        self.change_layer(id, LayerChange::MaskChanged, |l| l.set_mask(mask))?;

        let nodes = self.nodes.get_mut(&id).ok_or(CompositeError::UnknownLayer(id))?;
        match (nodes.mask, has_mask) {
            (None, true) => {
                let m = self.graph.add(NodeKind::Mask(id));
                self.graph.attach(m, nodes.layer)?;
                nodes.mask = Some(m);
            }
            (Some(m), false) => {
                self.graph.remove(m);
                nodes.mask = None;
            }
            _ => {}
        }
        Ok(())
    }

    fn change_mask<F>(&mut self, id: LayerID, f: F) -> Result<()>
    where
        F: FnOnce(&mut LayerMask),
    {
        self.change_layer(id, LayerChange::MaskChanged, |l| {
            let mask = l
                .mask_mut()
                .ok_or(CompositeError::PreconditionViolation("layer has no mask"))?;
            f(mask);
            Ok(())
        })
    }

    /// Show the mask in place of the layer content
    pub fn set_layer_mask_show(&mut self, id: LayerID, show: bool) -> Result<()> {
        self.change_mask(id, |m| m.show_masked = show)
    }

    pub fn set_layer_mask_apply(&mut self, id: LayerID, apply: bool) -> Result<()> {
        self.change_mask(id, |m| m.apply = apply)
    }

    /// Regenerate the layer mask from a vector path (layer coordinates)
    pub fn set_layer_mask_path(&mut self, id: LayerID, path: BezPath) -> Result<()> {
        self.change_mask(id, |m| m.set_path(path))
    }

    // Pixel content

    /// Modify a layer's pixels. `rect` (layer coordinates) is the area the
    /// edit may touch.
    pub fn edit_layer_pixels<F>(&mut self, id: LayerID, rect: &Rectangle, f: F) -> Result<()>
    where
        F: FnOnce(&mut PixelBuffer),
    {
        let index = self.index_of(id)?;
        f(self.layers[index].buffer_mut());
        self.update_layer(id, rect)
    }

    /// Report that a layer's pixels changed in the given area (layer coordinates)
    pub fn update_layer(&mut self, id: LayerID, rect: &Rectangle) -> Result<()> {
        let layer = self.layer(id).ok_or(CompositeError::UnknownLayer(id))?;
        let visible = layer.metadata.is_visible();

        let damaged = match self.floating_target(id) {
            Some(target) => {
                let t = self.layer(target).ok_or(CompositeError::UnknownLayer(target))?;
                let (tx, ty) = t.offset();
                if t.metadata.is_visible() && !t.shows_mask() {
                    self.filters[&target]
                        .damage_for(layer, rect)
                        .map(|r| r.offset(tx, ty))
                } else {
                    None
                }
            }
            None if visible && self.is_rendered(id) => {
                let (x, y) = layer.offset();
                layer
                    .local_bounds()
                    .and_then(|b| b.intersected(rect))
                    .map(|r| r.offset(x, y))
            }
            None => None,
        };

        self.observers.notify(&ImageEvent::LayerChanged {
            layer: id,
            change: LayerChange::PixelsChanged(*rect),
        });
        self.damage(damaged);
        Ok(())
    }

    // Selection

    pub fn select_rect(&mut self, rect: &Rectangle, value: u8) {
        let was_empty = self.selection.is_empty();
        let changed = self.selection.select_rect(rect, value);
        self.selection_changed(was_empty, changed);
    }

    /// Add the inside of a path (canvas coordinates) to the selection
    pub fn select_path(&mut self, path: &BezPath) {
        let was_empty = self.selection.is_empty();
        let changed = self.selection.select_path(path);
        self.selection_changed(was_empty, changed);
    }

    pub fn clear_selection(&mut self) {
        let was_empty = self.selection.is_empty();
        let changed = self.selection.clear();
        self.selection_changed(was_empty, changed);
    }

    pub fn replace_selection(&mut self, buffer: PixelBuffer) -> Result<()> {
        let was_empty = self.selection.is_empty();
        let changed = self.selection.replace(buffer)?;
        self.selection_changed(was_empty, changed);
        Ok(())
    }

    fn selection_changed(&mut self, was_empty: bool, changed: Option<Rectangle>) {
        let targets: Vec<LayerID> = self.filters.keys().copied().collect();
        for t in targets {
            self.sync_filter(t);
        }

        self.observers.notify(&ImageEvent::SelectionChanged);

        // A selection appearing or disappearing changes the mask
        // everywhere, not just where pixels were selected
        let uses_mask = self.options.selection_masks_layers || !self.filters.is_empty();
        if uses_mask && was_empty != self.selection.is_empty() {
            self.damage(self.bounds());
        } else if uses_mask {
            self.damage(changed);
        }
    }

    // Floating selections

    pub fn floating_filter(&self, target: LayerID) -> Option<&FloatingFilter> {
        self.filters.get(&target)
    }

    /// The floating selection attached to the target
    pub fn floating_selection(&self, target: LayerID) -> Option<LayerID> {
        self.filters.get(&target).map(|f| f.floating())
    }

    /// The layer this floating selection is attached to
    pub fn floating_target(&self, floating: LayerID) -> Option<LayerID> {
        self.filters
            .iter()
            .find(|(_, f)| f.floating() == floating)
            .map(|(t, _)| *t)
    }

    /// Attach a floating selection to a target layer.
    ///
    /// The floating layer stops being composited on its own and is composited
    /// onto the target instead.
    pub fn attach_floating_selection(&mut self, target: LayerID, floating: LayerID) -> Result<()> {
        if self.layer(target).is_none() {
            return Err(precondition("target is not part of this image"));
        }
        if self.layer(floating).is_none() {
            return Err(precondition("floating layer is not part of this image"));
        }
        if target == floating {
            return Err(precondition("a layer cannot float on itself"));
        }
        if self.filters.contains_key(&target) {
            return Err(precondition("target already has a floating selection"));
        }
        if self.floating_target(target).is_some() {
            return Err(precondition("target is itself a floating selection"));
        }
        if self.floating_target(floating).is_some() || self.filters.contains_key(&floating) {
            return Err(precondition("layer cannot become a floating selection"));
        }

        let before = union_opt(self.contribution(target), self.contribution(floating));

        let target_node = self.nodes[&target].layer;
        let source = self.nodes[&floating].source;
        let node = self.graph.add(NodeKind::FloatingFilter(target));
        self.graph.attach(node, target_node)?;
        self.graph.reparent(source, node)?;

        self.filters
            .insert(target, FloatingFilter::new(floating, node));
        self.sync_filter(target);

        self.observers
            .notify(&ImageEvent::FloatingSelectionAttached { target, floating });
        self.damage(union_opt(before, self.contribution(target)));
        Ok(())
    }

    /// Detach the floating selection from the target.
    /// The floating layer becomes a regular layer again.
    pub fn detach_floating_selection(&mut self, target: LayerID) -> Result<LayerID> {
        let before = self.contribution(target);
        let floating = self.detach_filter(target)?;
        let after = union_opt(self.contribution(target), self.contribution(floating));
        self.damage(union_opt(before, after));
        Ok(floating)
    }

    /// Merge the floating selection into the target and delete it.
    ///
    /// A target that has alpha and may grow is enlarged to fit the
    /// floating pixels first.
    pub fn anchor_floating_selection(&mut self, target: LayerID) -> Result<()> {
        let floating = self
            .floating_selection(target)
            .ok_or_else(|| precondition("no floating selection attached"))?;
        let tidx = self.index_of(target)?;
        if self.layers[tidx].format().is_indexed() {
            return Err(precondition("cannot anchor onto a palette layer"));
        }
        let before = self.contribution(target);

        let grow = {
            let filter = &self.filters[&target];
            let fs = &self.layers[self.index_of(floating)?];
            if filter.is_cropped() {
                None
            } else {
                filter.extent(fs)
            }
        };
        if let Some(ext) = grow {
            self.layers[tidx].grow_to(&ext)?;
            self.sync_filter(target);
        }

        let filter = self.filters[&target].clone();
        let fs = &self.layers[self.index_of(floating)?];
        let t = &self.layers[tidx];
        let merged = match t.local_bounds() {
            Some(area) => {
                let mut work = t.buffer().with_alpha();
                filter.apply(
                    &mut work,
                    &area,
                    fs,
                    &self.selection,
                    self.colormap.as_ref(),
                    t.offset(),
                )?;
                Some((area, if t.has_alpha() { work } else { work.without_alpha() }))
            }
            None => None,
        };

        self.detach_filter(target)?;
        self.take_layer(floating)?;

        if let Some((area, buffer)) = merged {
            let tidx = self.index_of(target)?;
            self.layers[tidx].replace_buffer(buffer);
            self.observers.notify(&ImageEvent::LayerChanged {
                layer: target,
                change: LayerChange::PixelsChanged(area),
            });
        }
        self.damage(union_opt(before, self.contribution(target)));
        Ok(())
    }

    /// Detach the floating selection and delete it
    pub fn remove_floating_selection(&mut self, target: LayerID) -> Result<Layer> {
        let before = self.contribution(target);
        let floating = self.detach_filter(target)?;
        let layer = self.take_layer(floating)?;
        self.damage(before);
        Ok(layer)
    }

    /// Undo the graph splice of a floating selection
    fn detach_filter(&mut self, target: LayerID) -> Result<LayerID> {
        let filter = self
            .filters
            .remove(&target)
            .ok_or_else(|| precondition("no floating selection attached"))?;
        let floating = filter.floating();

        if let Some(n) = self.nodes.get(&floating) {
            self.graph.reparent(n.source, n.layer)?;
        }
        self.graph.remove(filter.node());

        self.observers
            .notify(&ImageEvent::FloatingSelectionDetached { target, floating });
        Ok(floating)
    }

    /// Resynchronize every filter the layer takes part in
    fn sync_filters_of(&mut self, id: LayerID) {
        if self.filters.contains_key(&id) {
            self.sync_filter(id);
        }
        if let Some(target) = self.floating_target(id) {
            self.sync_filter(target);
        }
    }

    fn sync_filter(&mut self, target: LayerID) {
        let scaling = self.options.opacity_scaling;
        if let Some(filter) = self.filters.get_mut(&target) {
            let t = self.layers.iter().find(|l| l.id() == target);
            let fs = self.layers.iter().find(|l| l.id() == filter.floating());
            if let (Some(t), Some(fs)) = (t, fs) {
                filter.sync(t, fs, &self.selection, scaling);
            }
        }
    }
}
