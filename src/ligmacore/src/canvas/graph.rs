// SPDX-License-Identifier: GPL-3.0-or-later

use crate::error::{CompositeError, Result};
use crate::paint::LayerID;

/// Handle of a node in the compositing graph.
///
/// Slots of removed nodes are reused, but with a new generation, so a
/// handle to a removed node never refers to a later one.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum NodeKind {
    /// The root: everything attached to it ends up in the projection
    Projection,
    /// A layer's compositing stage
    Layer(LayerID),
    /// The pixel source of a layer
    LayerSource(LayerID),
    /// A floating selection filter spliced into the given target layer
    FloatingFilter(LayerID),
    /// A layer's mask
    Mask(LayerID),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// An arena of compositing nodes.
///
/// Children are kept in insertion order. For the projection node this is
/// the stacking order of the layers, bottom first.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    slots: Vec<Slot>,
    free: Vec<usize>,
}

impl Graph {
    pub fn new() -> Graph {
        Graph::default()
    }

    /// Add a new detached node
    pub fn add(&mut self, kind: NodeKind) -> NodeId {
        let node = Some(Node {
            kind,
            parent: None,
            children: Vec::new(),
        });
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.node = node;
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node,
                });
                NodeId {
                    index: self.slots.len() - 1,
                    generation: 0,
                }
            }
        }
    }

    fn node(&self, id: NodeId) -> Result<&Node> {
        self.slots
            .get(id.index)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.node.as_ref())
            .ok_or(CompositeError::PreconditionViolation("no such graph node"))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.slots
            .get_mut(id.index)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.node.as_mut())
            .ok_or(CompositeError::PreconditionViolation("no such graph node"))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_ok()
    }

    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.node(id).ok().map(|n| n.kind)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).ok().and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map_or(&[], |n| &n.children)
    }

    /// Attach a detached node as the last child of `parent`
    pub fn attach(&mut self, child: NodeId, parent: NodeId) -> Result<()> {
        self.insert(child, parent, usize::MAX)
    }

    /// Attach a detached node at the given position of `parent`'s child list.
    /// Positions past the end append.
    pub fn insert(&mut self, child: NodeId, parent: NodeId, index: usize) -> Result<()> {
        if child == parent {
            return Err(CompositeError::PreconditionViolation(
                "node cannot be its own parent",
            ));
        }
        if self.node(child)?.parent.is_some() {
            return Err(CompositeError::PreconditionViolation(
                "node is already attached",
            ));
        }
        if self.is_ancestor(child, parent) {
            return Err(CompositeError::PreconditionViolation(
                "attaching would create a cycle",
            ));
        }

        let p = self.node_mut(parent)?;
        let index = index.min(p.children.len());
        p.children.insert(index, child);
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Detach a node from its parent. Returns the old parent.
    pub fn detach(&mut self, child: NodeId) -> Option<NodeId> {
        let parent = self.node_mut(child).ok()?.parent.take()?;
        if let Ok(p) = self.node_mut(parent) {
            p.children.retain(|&c| c != child);
        }
        Some(parent)
    }

    /// Move a node under a new parent. Returns the old parent.
    pub fn reparent(&mut self, child: NodeId, new_parent: NodeId) -> Result<Option<NodeId>> {
        self.node(new_parent)?;
        if self.is_ancestor(child, new_parent) {
            return Err(CompositeError::PreconditionViolation(
                "reparenting would create a cycle",
            ));
        }
        let old = self.detach(child);
        self.attach(child, new_parent)?;
        Ok(old)
    }

    /// Remove a node along with its whole subtree
    pub fn remove(&mut self, id: NodeId) {
        self.detach(id);
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            if self.node(n).is_err() {
                continue;
            }
            let slot = &mut self.slots[n.index];
            if let Some(node) = slot.node.take() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(n.index);
                stack.extend(node.children);
            }
        }
    }

    /// Find the first live node of the given kind
    pub fn find(&self, kind: NodeKind) -> Option<NodeId> {
        self.slots
            .iter()
            .enumerate()
            .find(|(_, s)| s.node.as_ref().map_or(false, |n| n.kind == kind))
            .map(|(index, s)| NodeId {
                index,
                generation: s.generation,
            })
    }

    /// Is `a` an ancestor of (or the same node as) `b`
    pub fn is_ancestor(&self, a: NodeId, b: NodeId) -> bool {
        let mut n = Some(b);
        while let Some(id) = n {
            if id == a {
                return true;
            }
            n = self.parent(id);
        }
        false
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.node.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
