// SPDX-License-Identifier: GPL-3.0-or-later

use crate::paint::{LayerID, Rectangle};

use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// What changed about a layer
#[derive(Clone, Debug, PartialEq)]
pub enum LayerChange {
    OffsetChanged { dx: i32, dy: i32 },
    OpacityChanged,
    ModeChanged,
    VisibilityChanged,
    ActiveChannelsChanged,
    MaskChanged,
    FormatChanged,
    /// Pixels changed in the given rectangle (layer coordinates)
    PixelsChanged(Rectangle),
}

#[derive(Clone, Debug, PartialEq)]
pub enum ImageEvent {
    /// This area of the canvas needs to be recomposited
    RegionChanged(Rectangle),
    /// This area of the projection has been recomposited
    ProjectionUpdated(Rectangle),
    LayerChanged {
        layer: LayerID,
        change: LayerChange,
    },
    SelectionChanged,
    FloatingSelectionAttached {
        target: LayerID,
        floating: LayerID,
    },
    FloatingSelectionDetached {
        target: LayerID,
        floating: LayerID,
    },
}

pub trait ImageObserver {
    fn notify(&mut self, event: &ImageEvent);
}

/// Keeps an observer subscribed for as long as it is alive
#[must_use = "the observer is unsubscribed when the subscription is dropped"]
pub struct Subscription {
    _token: Rc<()>,
}

struct Entry {
    token: Weak<()>,
    observer: Weak<RefCell<dyn ImageObserver>>,
}

impl Entry {
    fn is_alive(&self) -> bool {
        self.token.strong_count() > 0 && self.observer.strong_count() > 0
    }
}

#[derive(Default)]
pub(crate) struct ObserverList {
    entries: Vec<Entry>,
}

impl ObserverList {
    /// Add a new observer.
    /// Only a weak reference to it is held.
    pub fn subscribe(&mut self, o: Rc<RefCell<dyn ImageObserver>>) -> Subscription {
        let token = Rc::new(());
        self.entries.push(Entry {
            token: Rc::downgrade(&token),
            observer: Rc::downgrade(&o),
        });
        Subscription { _token: token }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn notify(&mut self, event: &ImageEvent) {
        let mut cleanup = false;

        for e in self.entries.iter() {
            match (e.token.upgrade(), e.observer.upgrade()) {
                (Some(_), Some(o)) => o.borrow_mut().notify(event),
                _ => cleanup = true,
            }
        }

        if cleanup {
            self.entries.retain(Entry::is_alive);
        }
    }
}
