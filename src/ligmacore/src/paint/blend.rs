// SPDX-License-Identifier: GPL-3.0-or-later

//! Per-pixel blend functions of the layer modes.
//!
//! A blend function computes the color a layer pixel contributes given the
//! backdrop pixel under it. How that color is then mixed into the backdrop
//! is decided by the compositors in `rasterop`.

use super::color::*;
use super::{CompositeSpace, LayerMode};

use lazy_static::lazy_static;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore, SeedableRng};

const RANDOM_SEED: u64 = 314159265;
const RANDOM_TABLE_SIZE: usize = 4096;

lazy_static! {
    static ref RANDOM_TABLE: Vec<u64> = {
        let mut rng = StdRng::seed_from_u64(RANDOM_SEED);
        let mut table: Vec<u64> = (0..RANDOM_TABLE_SIZE).map(|_| rng.gen()).collect();
        table.shuffle(&mut rng);
        table
    };
}

/// Random coverage source for the Dissolve mode.
///
/// The sequence depends only on the canvas position of the row, so a
/// pixel dissolves the same way no matter which rectangle it is
/// rendered as part of.
pub struct Dissolver {
    rng: StdRng,
}

impl Dissolver {
    pub fn new(x: i32, y: i32) -> Dissolver {
        let seed = RANDOM_TABLE[y.rem_euclid(RANDOM_TABLE_SIZE as i32) as usize];
        let mut rng = StdRng::seed_from_u64(seed);
        for _ in 0..x.max(0) {
            rng.next_u32();
        }
        Dissolver { rng }
    }

    /// Decide the coverage of the next pixel: fully opaque with a
    /// probability of alpha/256, otherwise fully transparent.
    pub fn next_alpha(&mut self, alpha: u32) -> u8 {
        let r = self.rng.next_u32() & 0xff;
        if r < alpha {
            OPAQUE
        } else {
            TRANSPARENT
        }
    }
}

fn blend_channel(mode: LayerMode, a: u32, b: u32) -> u32 {
    use LayerMode::*;
    match mode {
        Multiply => u8_mult(a, b),
        Divide => ((a * 256) / (b + 1)).min(255),
        Screen => 255 - u8_mult(255 - a, 255 - b),
        Overlay => {
            let screen = 255 - u8_mult(255 - a, 255 - b);
            let mult = u8_mult(a, b);
            u8_blend(screen, mult, a)
        }
        Difference => (a as i32 - b as i32).unsigned_abs(),
        Addition => (a + b).min(255),
        Subtract => a.saturating_sub(b),
        DarkenOnly => a.min(b),
        LightenOnly => a.max(b),
        _ => b,
    }
}

fn blend_channel_linear(mode: LayerMode, a: f32, b: f32) -> f32 {
    use LayerMode::*;
    match mode {
        Multiply => a * b,
        Divide => (256.0 * a / (1.0 + 255.0 * b)).min(1.0),
        Screen => 1.0 - (1.0 - a) * (1.0 - b),
        Overlay => {
            let screen = 1.0 - (1.0 - a) * (1.0 - b);
            let mult = a * b;
            mult + (screen - mult) * a
        }
        Difference => (a - b).abs(),
        Addition => (a + b).min(1.0),
        Subtract => (a - b).max(0.0),
        DarkenOnly => a.min(b),
        LightenOnly => a.max(b),
        _ => b,
    }
}

fn is_arithmetic(mode: LayerMode) -> bool {
    use LayerMode::*;
    matches!(
        mode,
        Multiply
            | Divide
            | Screen
            | Overlay
            | Difference
            | Addition
            | Subtract
            | DarkenOnly
            | LightenOnly
    )
}

fn blend_hsv(mode: LayerMode, backdrop: [u8; 3], src: [u8; 3]) -> [u8; 3] {
    match mode {
        LayerMode::Color => {
            let mut hls = rgb_to_hls(backdrop);
            let src_hls = rgb_to_hls(src);
            hls[0] = src_hls[0];
            hls[2] = src_hls[2];
            hls_to_rgb(hls)
        }
        _ => {
            let mut hsv = rgb_to_hsv(backdrop);
            let src_hsv = rgb_to_hsv(src);
            match mode {
                // A gray source has no hue to give
                LayerMode::Hue if src_hsv[1] != 0 => hsv[0] = src_hsv[0],
                LayerMode::Saturation => hsv[1] = src_hsv[1],
                LayerMode::Value => hsv[2] = src_hsv[2],
                _ => {}
            }
            hsv_to_rgb(hsv)
        }
    }
}

/// Compute the color a source pixel contributes over a backdrop pixel.
///
/// All three slices are in the working format (RGBA or GrayA).
/// Modes with their own compositing rule (Normal, Dissolve, Behind,
/// Replace, Erase) return the source pixel unchanged. For the blending
/// modes the result alpha is the smaller of the two input alphas.
pub fn blend_pixel(
    mode: LayerMode,
    space: CompositeSpace,
    backdrop: &[u8],
    src: &[u8],
    out: &mut [u8],
) {
    let alpha = src.len() - 1;
    debug_assert!(alpha == 1 || alpha == 3);

    let color = alpha == 3;
    if is_arithmetic(mode) {
        if space.is_linear() {
            for b in 0..alpha {
                let v = blend_channel_linear(
                    mode,
                    srgb_to_linear(backdrop[b]),
                    srgb_to_linear(src[b]),
                );
                out[b] = linear_to_srgb(v);
            }
        } else {
            for b in 0..alpha {
                out[b] = blend_channel(mode, backdrop[b] as u32, src[b] as u32) as u8;
            }
        }
        out[alpha] = backdrop[alpha].min(src[alpha]);
    } else if mode.needs_color() && color {
        let rgb = blend_hsv(
            mode,
            [backdrop[0], backdrop[1], backdrop[2]],
            [src[0], src[1], src[2]],
        );
        out[..3].copy_from_slice(&rgb);
        out[3] = backdrop[3].min(src[3]);
    } else {
        out.copy_from_slice(src);
    }
}
