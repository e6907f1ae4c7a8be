// SPDX-License-Identifier: GPL-3.0-or-later

use ligmacore::canvas::{ApplicationContext, Image};
use ligmacore::paint::{BaseType, ImageType, Layer, LayerMode, PixelBuffer, Rectangle};

use image::{ImageBuffer, RgbaImage};

const BAR: i32 = 24;

fn main() {
    let colors: [[u8; 4]; 6] = [
        [0x84, 0x5e, 0xc2, 0xff],
        [0xd6, 0x5d, 0xb1, 0xff],
        [0xff, 0x6f, 0x91, 0xff],
        [0xff, 0x96, 0x71, 0xff],
        [0xff, 0xc7, 0x5f, 0xff],
        [0xf9, 0xf8, 0x71, 0xff],
    ];

    let mut ctx = ApplicationContext::default();
    let height = BAR as usize * (LayerMode::ALL.len() + 1);
    let mut canvas = Image::new(&ctx, 256, height, BaseType::Rgb);

    // Vertical color bars as the backdrop, leaving a transparent skirt
    let mut backdrop = PixelBuffer::new(256, height, ImageType::Rgba);
    for (i, c) in colors.iter().enumerate() {
        backdrop.fill_rect(&Rectangle::new(10 + i as i32 * 40, 0, 30, height as i32), c);
    }
    canvas
        .add_layer(Layer::from_buffer(ctx.next_layer_id().unwrap(), "bars", backdrop))
        .unwrap();

    // One horizontal strip per layer mode
    for (i, mode) in LayerMode::ALL.into_iter().enumerate() {
        let strip = PixelBuffer::filled(236, BAR as usize - 4, ImageType::Rgba, &[40, 160, 220, 180]);
        let mut layer = Layer::from_buffer(ctx.next_layer_id().unwrap(), mode.name(), strip)
            .at(10, BAR * (i as i32 + 1));
        layer.metadata.mode = mode;
        layer.metadata.opacity = 0.8;
        canvas.add_layer(layer).unwrap();
    }

    canvas.flush().unwrap();

    let projection = canvas.projection();
    let img: RgbaImage = ImageBuffer::from_vec(
        projection.width() as u32,
        projection.height() as u32,
        projection.pixels().to_vec(),
    )
    .unwrap();

    println!("Writing layer_modes.png");
    img.save("layer_modes.png").unwrap();
}
