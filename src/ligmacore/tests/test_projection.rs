// SPDX-License-Identifier: GPL-3.0-or-later

use ligmacore::canvas::{ApplicationContext, Image, ImageEvent, ImageObserver};
use ligmacore::paint::{
    ActiveChannels, BaseType, Colormap, ImageType, Layer, LayerID, LayerMask, LayerMode,
    PixelBuffer, Rectangle,
};
use ligmacore::CompositeError;

use itertools::Itertools;
use std::cell::RefCell;
use std::rc::Rc;

const RED: [u8; 4] = [255, 0, 0, 255];
const HALF_BLUE: [u8; 4] = [0, 0, 255, 128];

struct Canvas {
    ctx: ApplicationContext,
    image: Image,
}

impl Canvas {
    fn new() -> Canvas {
        let ctx = ApplicationContext::default();
        let image = Image::new(&ctx, 4, 4, BaseType::Rgb);
        Canvas { ctx, image }
    }

    fn add(&mut self, w: usize, h: usize, format: ImageType, pixel: &[u8]) -> LayerID {
        let id = self.ctx.next_layer_id().unwrap();
        let buffer = PixelBuffer::filled(w, h, format, pixel);
        self.image.add_layer(Layer::from_buffer(id, "layer", buffer)).unwrap();
        id
    }

    /// Opaque red background with a half transparent blue layer over the left half
    fn red_and_blue() -> (Canvas, LayerID, LayerID) {
        let mut c = Canvas::new();
        let a = c.add(4, 4, ImageType::Rgba, &RED);
        let b = c.add(2, 4, ImageType::Rgba, &HALF_BLUE);
        (c, a, b)
    }

    fn render(&mut self) -> &PixelBuffer {
        self.image.flush().unwrap();
        self.image.projection()
    }
}

fn assert_columns(projection: &PixelBuffer, left: [u8; 4], right: [u8; 4]) {
    for y in 0..4 {
        for x in 0..4 {
            let expected = if x < 2 { left } else { right };
            assert_eq!(projection.pixel_at(x, y), &expected, "pixel {},{}", x, y);
        }
    }
}

#[test]
fn test_blue_over_red() {
    let (mut c, _, _) = Canvas::red_and_blue();
    assert_columns(c.render(), [127, 0, 128, 255], RED);
}

#[test]
fn test_color_lock() {
    let (mut c, _, b) = Canvas::red_and_blue();
    c.image
        .set_layer_active_channels(b, ActiveChannels::ALPHA_ONLY)
        .unwrap();
    assert_columns(c.render(), RED, RED);
}

#[test]
fn test_opaque_layer_replaces() {
    let (mut c, _, b) = Canvas::red_and_blue();
    c.image
        .edit_layer_pixels(b, &Rectangle::new(0, 0, 2, 4), |buf| buf.fill(&[0, 255, 0, 255]))
        .unwrap();
    assert_columns(c.render(), [0, 255, 0, 255], RED);
}

#[test]
fn test_zero_opacity_and_hidden_are_noops() {
    let (mut c, _, b) = Canvas::red_and_blue();
    c.image.set_layer_opacity(b, 0.0).unwrap();
    assert_columns(c.render(), RED, RED);

    c.image.set_layer_opacity(b, 1.0).unwrap();
    c.image.set_layer_visible(b, false).unwrap();
    assert_columns(c.render(), RED, RED);

    c.image.set_layer_visible(b, true).unwrap();
    assert_columns(c.render(), [127, 0, 128, 255], RED);
}

#[test]
fn test_opacity_is_monotonic() {
    let mut previous = 255;
    for step in 0..=10 {
        let (mut c, _, b) = Canvas::red_and_blue();
        c.image.set_layer_opacity(b, step as f32 / 10.0).unwrap();
        let red = c.render().pixel_at(0, 0)[0];
        assert!(red <= previous, "red rose from {} to {} at step {}", previous, red, step);
        previous = red;
    }
}

#[test]
fn test_mask_preview() {
    let mut c = Canvas::new();
    c.add(4, 4, ImageType::Rgba, &RED);
    let b = c.add(4, 4, ImageType::Rgba, &[0, 0, 255, 255]);
    c.image.set_layer_mode(b, LayerMode::Multiply).unwrap();

    // A mask that hides the layer completely
    c.image.set_layer_mask(b, Some(LayerMask::new(4, 4, 0))).unwrap();
    assert_columns(c.render(), RED, RED);

    // Preview shows the mask itself, composited normally
    c.image
        .set_layer_mask(b, Some(LayerMask::new(4, 4, 200)))
        .unwrap();
    c.image.set_layer_mask_show(b, true).unwrap();
    let gray = [200, 200, 200, 255];
    assert_columns(c.render(), gray, gray);

    // Disabling a mask lets the layer through unmodulated
    c.image.set_layer_mask_show(b, false).unwrap();
    c.image.set_layer_mask_apply(b, false).unwrap();
    assert_columns(c.render(), [0, 0, 0, 255], [0, 0, 0, 255]);
}

#[test]
fn test_excludes_backdrop() {
    let (mut c, _, b) = Canvas::red_and_blue();
    c.image.set_layer_excludes_backdrop(b, true).unwrap();
    assert_columns(c.render(), HALF_BLUE, RED);

    c.image.set_layer_visible(b, false).unwrap();
    assert_columns(c.render(), RED, RED);
}

#[test]
fn test_missing_colormap_skips_layer() {
    let mut c = Canvas::new();
    c.add(4, 4, ImageType::Rgba, &RED);
    c.add(2, 4, ImageType::Indexed, &[1]);
    assert_columns(c.render(), RED, RED);

    c.image.set_colormap(Some(Colormap::new(vec![[0, 0, 0], [0, 255, 0]])));
    assert_columns(c.render(), [0, 255, 0, 255], RED);
}

#[test]
fn test_indexed_alpha_threshold() {
    let mut c = Canvas::new();
    c.image.set_colormap(Some(Colormap::new(vec![[0, 0, 255]])));
    c.add(4, 4, ImageType::Rgba, &RED);
    let low = c.add(2, 4, ImageType::IndexedA, &[0, 127]);
    assert_columns(c.render(), RED, RED);

    c.image
        .edit_layer_pixels(low, &Rectangle::new(0, 0, 2, 4), |buf| buf.fill(&[0, 128]))
        .unwrap();
    assert_columns(c.render(), [0, 0, 255, 255], RED);
}

#[test]
fn test_selection_masks_layers() {
    let mut c = Canvas::new();
    c.add(4, 4, ImageType::Rgba, &RED);
    c.image.select_rect(&Rectangle::new(0, 0, 2, 4), 255);

    let projection = c.render();
    for y in 0..4 {
        assert_eq!(projection.pixel_at(0, y), &RED);
        assert_eq!(projection.pixel_at(1, y), &RED);
        assert_eq!(projection.pixel_at(2, y)[3], 0);
        assert_eq!(projection.pixel_at(3, y)[3], 0);
    }

    c.image.clear_selection();
    assert_columns(c.render(), RED, RED);

    let mut mask = PixelBuffer::filled(4, 4, ImageType::Gray, &[0]);
    mask.fill_rect(&Rectangle::new(2, 0, 2, 4), &[255]);
    c.image.replace_selection(mask).unwrap();
    let projection = c.render();
    for y in 0..4 {
        assert_eq!(projection.pixel_at(1, y)[3], 0);
        assert_eq!(projection.pixel_at(2, y), &RED);
    }

    let wrong_size = PixelBuffer::filled(2, 2, ImageType::Gray, &[255]);
    assert!(matches!(
        c.image.replace_selection(wrong_size),
        Err(CompositeError::PreconditionViolation(_))
    ));
}

#[test]
fn test_layer_offset() {
    let (mut c, _, b) = Canvas::red_and_blue();
    c.image.set_layer_offset(b, 2, 0).unwrap();
    assert_columns(c.render(), RED, [127, 0, 128, 255]);

    // Moved entirely off canvas
    c.image.set_layer_offset(b, 10, 10).unwrap();
    assert_columns(c.render(), RED, RED);
}

#[test]
fn test_stack_order() {
    let (mut c, a, b) = Canvas::red_and_blue();
    c.image.move_layer(b, 0).unwrap();
    assert_eq!(c.image.layers().iter().map(|l| l.id()).collect::<Vec<_>>(), vec![b, a]);
    assert_columns(c.render(), RED, RED);

    c.image.remove_layer(a).unwrap();
    let projection = c.render();
    assert_eq!(projection.pixel_at(0, 0), &HALF_BLUE);
    assert_eq!(projection.pixel_at(3, 0)[3], 0);

    assert_eq!(c.image.remove_layer(a).unwrap_err(), CompositeError::UnknownLayer(a));
}

#[test]
fn test_duplicate_layer_id() {
    let (mut c, a, _) = Canvas::red_and_blue();
    let err = c
        .image
        .add_layer(Layer::new(a, "dup", 1, 1, ImageType::Rgba))
        .unwrap_err();
    assert!(matches!(err, CompositeError::PreconditionViolation(_)));
}

#[test]
fn test_dirty_tracking() {
    let (mut c, _, b) = Canvas::red_and_blue();
    assert!(c.image.is_dirty());
    c.image.flush().unwrap();
    assert!(!c.image.is_dirty());

    c.image.set_layer_mode(b, LayerMode::Screen).unwrap();
    assert!(c.image.is_dirty());
    c.image.flush().unwrap();
    assert!(!c.image.is_dirty());
}

#[test]
fn test_partial_recomposite_matches_full() {
    let (mut full, _, _) = Canvas::red_and_blue();
    let expected = full.render().clone();

    let (mut partial, _, _) = Canvas::red_and_blue();
    for (x, y) in (0..4).cartesian_product(0..4) {
        partial.image.request_recomposite(x, y, 1, 1).unwrap();
    }

    for (e, p) in expected
        .pixels()
        .iter()
        .zip_eq(partial.image.projection().pixels())
    {
        assert_eq!(e, p);
    }
}

#[derive(Default)]
struct UpdateCounter {
    updated: Vec<Rectangle>,
    damaged: Vec<Rectangle>,
}

impl ImageObserver for UpdateCounter {
    fn notify(&mut self, event: &ImageEvent) {
        match event {
            ImageEvent::ProjectionUpdated(r) => self.updated.push(*r),
            ImageEvent::RegionChanged(r) => self.damaged.push(*r),
            _ => {}
        }
    }
}

#[test]
fn test_recomposite_bounds() {
    let (mut c, _, _) = Canvas::red_and_blue();
    let observer = Rc::new(RefCell::new(UpdateCounter::default()));
    let _sub = c.image.add_observer(observer.clone());

    c.image.request_recomposite(0, 0, 0, 4).unwrap();
    c.image.request_recomposite(10, 10, 4, 4).unwrap();
    assert!(observer.borrow().updated.is_empty());

    c.image.request_recomposite(-2, -2, 4, 4).unwrap();
    assert_eq!(observer.borrow().updated, vec![Rectangle::new(0, 0, 2, 2)]);
}

#[test]
fn test_far_away_coordinates() {
    let (mut c, _, b) = Canvas::red_and_blue();
    c.render();
    let observer = Rc::new(RefCell::new(UpdateCounter::default()));
    let _sub = c.image.add_observer(observer.clone());

    c.image.request_recomposite(i32::MAX - 2, 0, 10, 10).unwrap();
    c.image.request_recomposite(i32::MIN, i32::MIN, 10, 10).unwrap();
    assert!(observer.borrow().updated.is_empty());

    c.image.set_layer_offset(b, i32::MAX - 3, 0).unwrap();
    assert_columns(c.render(), RED, RED);

    c.image.set_layer_offset(b, i32::MIN, i32::MIN).unwrap();
    assert_columns(c.render(), RED, RED);

    c.image.set_layer_offset(b, 0, 0).unwrap();
    assert_columns(c.render(), [127, 0, 128, 255], RED);
}

#[test]
fn test_excluding_layer_visibility_damage() {
    let (mut c, _, b) = Canvas::red_and_blue();
    c.image.set_layer_excludes_backdrop(b, true).unwrap();
    c.render();

    let observer = Rc::new(RefCell::new(UpdateCounter::default()));
    let _sub = c.image.add_observer(observer.clone());
    c.image.set_layer_visible(b, false).unwrap();

    let layer_area = Rectangle::new(0, 0, 2, 4);
    let damaged = observer.borrow().damaged.clone();
    assert!(!damaged.is_empty());
    assert!(damaged.iter().all(|r| layer_area.contains(r)), "{:?}", damaged);

    assert_columns(c.render(), RED, RED);
}
