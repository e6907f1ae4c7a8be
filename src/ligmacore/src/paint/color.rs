// SPDX-License-Identifier: GPL-3.0-or-later

//! 8-bit fixed point helpers and color model conversions used by the
//! compositors.

use lazy_static::lazy_static;

pub const OPAQUE: u8 = 255;
pub const TRANSPARENT: u8 = 0;

/// Added to floating point channel mixes before truncation
pub const EPSILON: f32 = 0.0001;

/// Multiply two 8 bit values: a*b/255, rounded
#[inline]
pub fn u8_mult(a: u32, b: u32) -> u32 {
    let c = a * b + 0x80;
    ((c >> 8) + c) >> 8
}

/// Multiply three 8 bit values: a*b*c/(255*255), rounded
#[inline]
pub fn u8_mult3(a: u32, b: u32, c: u32) -> u32 {
    let t = a * b * c + 0x7f5b;
    ((t >> 7) + t) >> 16
}

/// Linear interpolation from b to a: b + (a-b)*alpha/255
#[inline]
pub fn u8_blend(a: u32, b: u32, alpha: u32) -> u32 {
    let c = (a as i32 - b as i32) * alpha as i32 + (b << 8) as i32 - b as i32 + 0x80;
    (((c >> 8) + c) >> 8) as u32
}

pub const INTENSITY_RED: u32 = 77;
pub const INTENSITY_GREEN: u32 = 151;
pub const INTENSITY_BLUE: u32 = 28;

/// Perceived brightness of an RGB color
#[inline]
pub fn intensity(r: u8, g: u8, b: u8) -> u8 {
    ((r as u32 * INTENSITY_RED + g as u32 * INTENSITY_GREEN + b as u32 * INTENSITY_BLUE + 128)
        >> 8) as u8
}

fn round(v: f64) -> i32 {
    (v + 0.5) as i32
}

/// Convert RGB to integer HSV.
/// Hue is in range 0..=360, saturation and value in 0..=255.
pub fn rgb_to_hsv(rgb: [u8; 3]) -> [i32; 3] {
    let (r, g, b) = (rgb[0] as f64, rgb[1] as f64, rgb[2] as f64);

    let (v, min) = if r > g {
        (r.max(b), g.min(b))
    } else {
        (g.max(b), r.min(b))
    };

    let delta = v - min;
    let s = if v == 0.0 { 0.0 } else { delta / v };

    let h = if s == 0.0 {
        0.0
    } else {
        let mut h = if r == v {
            60.0 * (g - b) / delta
        } else if g == v {
            120.0 + 60.0 * (b - r) / delta
        } else {
            240.0 + 60.0 * (r - g) / delta
        };
        if h < 0.0 {
            h += 360.0;
        }
        if h > 360.0 {
            h -= 360.0;
        }
        h
    };

    [round(h), round(s * 255.0), round(v)]
}

pub fn hsv_to_rgb(hsv: [i32; 3]) -> [u8; 3] {
    if hsv[1] == 0 {
        let v = hsv[2].clamp(0, 255) as u8;
        return [v, v, v];
    }

    let mut h = hsv[0] as f64;
    let s = hsv[1] as f64 / 255.0;
    let v = hsv[2] as f64 / 255.0;

    if h >= 360.0 {
        h = 0.0;
    }
    h /= 60.0;
    let i = h.floor();
    let f = h - i;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));

    let (r, g, b) = match i as i32 {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };

    [
        round(r * 255.0) as u8,
        round(g * 255.0) as u8,
        round(b * 255.0) as u8,
    ]
}

/// Convert RGB to integer HLS, all components in range 0..=255
pub fn rgb_to_hls(rgb: [u8; 3]) -> [i32; 3] {
    let (r, g, b) = (rgb[0] as i32, rgb[1] as i32, rgb[2] as i32);

    let (max, min) = if r > g {
        (r.max(b), g.min(b))
    } else {
        (g.max(b), r.min(b))
    };

    let l = (max + min) as f64 / 2.0;

    if max == min {
        return [0, round(l), 0];
    }

    let delta = (max - min) as f64;
    let s = if l < 128.0 {
        255.0 * delta / (max + min) as f64
    } else {
        255.0 * delta / (511 - max - min) as f64
    };

    let mut h = if r == max {
        (g - b) as f64 / delta
    } else if g == max {
        2.0 + (b - r) as f64 / delta
    } else {
        4.0 + (r - g) as f64 / delta
    };
    h *= 42.5;
    if h < 0.0 {
        h += 255.0;
    } else if h > 255.0 {
        h -= 255.0;
    }

    [round(h), round(l), round(s)]
}

fn hls_value(n1: f64, n2: f64, mut hue: f64) -> u8 {
    if hue > 255.0 {
        hue -= 255.0;
    } else if hue < 0.0 {
        hue += 255.0;
    }

    let value = if hue < 42.5 {
        n1 + (n2 - n1) * (hue / 42.5)
    } else if hue < 127.5 {
        n2
    } else if hue < 170.0 {
        n1 + (n2 - n1) * ((170.0 - hue) / 42.5)
    } else {
        n1
    };

    round(value * 255.0).clamp(0, 255) as u8
}

pub fn hls_to_rgb(hls: [i32; 3]) -> [u8; 3] {
    let (h, l, s) = (hls[0] as f64, hls[1] as f64, hls[2] as f64);

    if hls[2] == 0 {
        let v = hls[1].clamp(0, 255) as u8;
        return [v, v, v];
    }

    let m2 = if l < 128.0 {
        (l * (255.0 + s)) / 65025.0
    } else {
        (l + s - (l * s) / 255.0) / 255.0
    };
    let m1 = (l / 127.5) - m2;

    [
        hls_value(m1, m2, h + 85.0),
        hls_value(m1, m2, h),
        hls_value(m1, m2, h - 85.0),
    ]
}

lazy_static! {
    static ref SRGB_TO_LINEAR: [f32; 256] = {
        let mut lut = [0.0; 256];
        for (i, v) in lut.iter_mut().enumerate() {
            let c = i as f32 / 255.0;
            *v = if c <= 0.04045 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            };
        }
        lut
    };
}

/// Convert a gamma encoded sRGB channel to linear light in range 0..=1
#[inline]
pub fn srgb_to_linear(c: u8) -> f32 {
    SRGB_TO_LINEAR[c as usize]
}

/// Convert a linear light value back to a gamma encoded sRGB channel
pub fn linear_to_srgb(v: f32) -> u8 {
    let v = v.clamp(0.0, 1.0);
    let c = if v <= 0.0031308 {
        v * 12.92
    } else {
        1.055 * v.powf(1.0 / 2.4) - 0.055
    };
    (c * 255.0 + 0.5) as u8
}
