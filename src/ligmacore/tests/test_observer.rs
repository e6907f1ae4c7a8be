// SPDX-License-Identifier: GPL-3.0-or-later

use ligmacore::canvas::{ApplicationContext, Image, ImageEvent, ImageObserver, LayerChange};
use ligmacore::paint::{BaseType, ImageType, Layer, Rectangle};

use std::cell::RefCell;
use std::rc::Rc;

#[test]
fn test_image_observation() {
    let mut ctx = ApplicationContext::default();
    let mut image = Image::new(&ctx, 64, 64, BaseType::Rgb);

    let observer = Rc::new(RefCell::new(TestObserver::default()));
    let _sub = image.add_observer(observer.clone());

    assert!(observer.borrow().events.is_empty());
    assert_eq!(image.observer_count(), 1);

    let id = ctx.next_layer_id().unwrap();
    image
        .add_layer(Layer::new(id, "layer", 10, 10, ImageType::Rgba).at(5, 5))
        .unwrap();
    assert_eq!(
        observer.borrow_mut().take(),
        vec![ImageEvent::RegionChanged(Rectangle::new(5, 5, 10, 10))]
    );

    image.set_layer_opacity(id, 0.5).unwrap();
    let events = observer.borrow_mut().take();
    assert_eq!(
        events[0],
        ImageEvent::LayerChanged {
            layer: id,
            change: LayerChange::OpacityChanged
        }
    );

    image.flush().unwrap();
    assert_eq!(
        observer.borrow_mut().take(),
        vec![ImageEvent::ProjectionUpdated(Rectangle::new(0, 0, 64, 64))]
    );

    drop(observer);
    assert_eq!(image.observer_count(), 1);

    // missing observer is not noticed until the next notification
    image.set_layer_visible(id, false).unwrap();
    assert_eq!(image.observer_count(), 0);
}

#[test]
fn test_dropped_subscription() {
    let ctx = ApplicationContext::default();
    let mut image = Image::new(&ctx, 8, 8, BaseType::Gray);

    let observer = Rc::new(RefCell::new(TestObserver::default()));
    let sub = image.add_observer(observer.clone());
    image.select_rect(&Rectangle::new(0, 0, 2, 2), 255);
    assert!(observer
        .borrow()
        .events
        .contains(&ImageEvent::SelectionChanged));

    drop(sub);
    observer.borrow_mut().take();
    image.clear_selection();
    assert!(observer.borrow().events.is_empty());
    assert_eq!(image.observer_count(), 0);
}

#[derive(Default)]
struct TestObserver {
    events: Vec<ImageEvent>,
}

impl TestObserver {
    fn take(&mut self) -> Vec<ImageEvent> {
        std::mem::take(&mut self.events)
    }
}

impl ImageObserver for TestObserver {
    fn notify(&mut self, event: &ImageEvent) {
        self.events.push(event.clone());
    }
}
