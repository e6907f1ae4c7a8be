// SPDX-License-Identifier: GPL-3.0-or-later

//! The initial and combine compositors.
//!
//! Both operate on rows in the working format (RGBA or GrayA). The source
//! row has already been converted (see `convert`), but how its alpha counts
//! still depends on what it was converted from, so every call takes the
//! source's `SourceKind`.

use super::blend::{blend_pixel, Dissolver};
use super::color::*;
use super::convert::SourceKind;
use super::region::{PixelRegion, PixelRegionMut};
use super::{CompositeMode, CompositeSpace, LayerMode};

/// Which channels of the output may be modified.
///
/// Index 0..=2 are the color channels (only index 0 is used for gray
/// images) and index 3 is alpha.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ActiveChannels(pub [bool; 4]);

impl ActiveChannels {
    pub const ALL: ActiveChannels = ActiveChannels([true; 4]);

    /// Only the alpha channel may change
    pub const ALPHA_ONLY: ActiveChannels = ActiveChannels([false, false, false, true]);

    pub fn alpha(self) -> bool {
        self.0[3]
    }

    pub fn set_alpha(&mut self, active: bool) {
        self.0[3] = active;
    }

    /// Is byte `b` of a pixel `bytes` long affected
    #[inline]
    pub fn affects(self, b: usize, bytes: usize) -> bool {
        if b == bytes - 1 {
            self.0[3]
        } else {
            self.0[b]
        }
    }

    /// Channels active in both sets
    pub fn intersected(self, other: ActiveChannels) -> ActiveChannels {
        let mut c = self.0;
        for (a, b) in c.iter_mut().zip(other.0) {
            *a = *a && b;
        }
        ActiveChannels(c)
    }
}

impl Default for ActiveChannels {
    fn default() -> Self {
        ActiveChannels::ALL
    }
}

/// Everything the compositors need to know about a layer
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CompositeParams {
    pub opacity: u8,
    pub mode: LayerMode,
    pub space: CompositeSpace,
    pub composite: CompositeMode,
    pub affect: ActiveChannels,
}

impl CompositeParams {
    pub fn new(opacity: u8, mode: LayerMode) -> CompositeParams {
        CompositeParams {
            opacity,
            mode,
            space: CompositeSpace::Auto,
            composite: CompositeMode::Auto,
            affect: ActiveChannels::ALL,
        }
    }
}

impl Default for CompositeParams {
    fn default() -> Self {
        CompositeParams::new(255, LayerMode::Normal)
    }
}

/// The rule used to form the output alpha of a blend
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum AlphaRule {
    /// Keep the backdrop alpha where the backdrop is not transparent
    Legacy,
    Union,
    Backdrop,
    Layer,
    Intersection,
}

impl AlphaRule {
    fn resolve(composite: CompositeMode, mode: LayerMode) -> AlphaRule {
        match composite {
            CompositeMode::Auto if mode.affects_alpha() => AlphaRule::Union,
            CompositeMode::Auto => AlphaRule::Legacy,
            CompositeMode::Union => AlphaRule::Union,
            CompositeMode::ClipToBackdrop => AlphaRule::Backdrop,
            CompositeMode::ClipToLayer => AlphaRule::Layer,
            CompositeMode::Intersection => AlphaRule::Intersection,
        }
    }
}

/// Layer pixel alpha scaled by the mask value and opacity
#[inline]
fn effective_alpha(alpha: u8, mask: Option<u8>, opacity: u32) -> u32 {
    match (alpha, mask) {
        (OPAQUE, Some(m)) => u8_mult(m as u32, opacity),
        (OPAQUE, None) => opacity,
        (a, Some(m)) => u8_mult3(a as u32, m as u32, opacity),
        (a, None) => u8_mult(a as u32, opacity),
    }
}

/// Per-row coverage adjustment shared by both compositors.
///
/// Palette sources and the Dissolve mode have all-or-nothing coverage:
/// their effective alpha is decided here and mask and opacity are consumed.
struct Coverage {
    kind: SourceKind,
    dissolve: Option<Dissolver>,
}

impl Coverage {
    fn new(kind: SourceKind, mode: LayerMode, x: i32, y: i32) -> Coverage {
        Coverage {
            kind,
            dissolve: (mode == LayerMode::Dissolve).then(|| Dissolver::new(x, y)),
        }
    }

    /// Returns the pixel to composite along with the mask value and opacity
    /// still to be applied to it.
    #[inline]
    fn apply(
        &mut self,
        src: &[u8],
        mask: Option<u8>,
        opacity: u32,
    ) -> ([u8; 4], Option<u8>, u32) {
        let a = src.len() - 1;
        let mut px = [0u8; 4];
        px[..src.len()].copy_from_slice(src);
        let (mut mask, mut opacity) = (mask, opacity);

        match self.kind {
            SourceKind::Intensity => px[a] = OPAQUE,
            SourceKind::IntensityAlpha => {}
            SourceKind::Indexed | SourceKind::IndexedAlpha => {
                let eff = effective_alpha(px[a], mask, opacity);
                px[a] = if eff > 127 { OPAQUE } else { TRANSPARENT };
                mask = None;
                opacity = 255;
            }
        }

        if let Some(d) = self.dissolve.as_mut() {
            let eff = effective_alpha(px[a], mask, opacity);
            px[a] = d.next_alpha(eff);
            mask = None;
            opacity = 255;
        }

        (px, mask, opacity)
    }
}

/// Paint the first layer of a stack onto an empty projection row.
///
/// The blend mode is not applied (there is nothing to blend with) except
/// for Dissolve. `x` and `y` are the canvas coordinates of the first pixel.
#[allow(clippy::too_many_arguments)]
pub fn initial_row(
    dest: &mut [u8],
    src: &[u8],
    mask: Option<&[u8]>,
    kind: SourceKind,
    params: &CompositeParams,
    bytes: usize,
    x: i32,
    y: i32,
) {
    let alpha = bytes - 1;
    let affect = params.affect;
    let mut coverage = Coverage::new(kind, params.mode, x, y);

    for (i, (d, s)) in dest
        .chunks_exact_mut(bytes)
        .zip(src.chunks_exact(bytes))
        .enumerate()
    {
        let (px, m, o) = coverage.apply(s, mask.map(|m| m[i]), params.opacity as u32);

        for b in 0..alpha {
            d[b] = if affect.0[b] { px[b] } else { 0 };
        }
        d[alpha] = if affect.alpha() {
            effective_alpha(px[alpha], m, o) as u8
        } else {
            TRANSPARENT
        };
    }
}

/// Composite a layer row onto the backdrop row in `dest`.
///
/// `x` and `y` are the canvas coordinates of the first pixel.
#[allow(clippy::too_many_arguments)]
pub fn combine_row(
    dest: &mut [u8],
    src: &[u8],
    mask: Option<&[u8]>,
    kind: SourceKind,
    params: &CompositeParams,
    bytes: usize,
    x: i32,
    y: i32,
) {
    let rule = AlphaRule::resolve(params.composite, params.mode);
    let mut coverage = Coverage::new(kind, params.mode, x, y);

    for (i, (d, s)) in dest
        .chunks_exact_mut(bytes)
        .zip(src.chunks_exact(bytes))
        .enumerate()
    {
        let (px, m, o) = coverage.apply(s, mask.map(|m| m[i]), params.opacity as u32);
        combine_pixel(d, &px[..bytes], m, o, params, rule);
    }
}

#[inline]
fn combine_pixel(
    d: &mut [u8],
    px: &[u8],
    mask: Option<u8>,
    opacity: u32,
    params: &CompositeParams,
    rule: AlphaRule,
) {
    let bytes = d.len();
    let alpha = bytes - 1;

    // Fully transparent source pixels never touch the backdrop
    if px[alpha] == TRANSPARENT {
        return;
    }

    match params.mode {
        LayerMode::Behind => behind(d, px, effective_alpha(px[alpha], mask, opacity), params),
        LayerMode::Erase => {
            let src_alpha = effective_alpha(px[alpha], mask, opacity);
            if src_alpha > 0 && params.affect.alpha() {
                let ba = d[alpha] as u32;
                d[alpha] = (ba - u8_mult(ba, src_alpha)) as u8;
            }
        }
        LayerMode::Replace => {
            let weight = mask.map_or(opacity, |m| u8_mult(m as u32, opacity));
            if weight > 0 {
                for b in 0..bytes {
                    if params.affect.affects(b, bytes) {
                        d[b] = u8_blend(px[b] as u32, d[b] as u32, weight) as u8;
                    }
                }
            }
        }
        _ => {
            let mut blended = [0u8; 4];
            blend_pixel(params.mode, params.space, d, px, &mut blended[..bytes]);
            let src_alpha = effective_alpha(blended[alpha], mask, opacity);
            if src_alpha > 0 {
                alphify(d, &blended[..bytes], src_alpha, params, rule);
            }
        }
    }
}

/// Mix the blended color into the backdrop, weighted by its share of the
/// accumulated alpha, then form the output alpha.
#[inline]
fn alphify(d: &mut [u8], blended: &[u8], src_alpha: u32, params: &CompositeParams, rule: AlphaRule) {
    let bytes = d.len();
    let alpha = bytes - 1;
    let ba = d[alpha] as u32;
    let new_alpha = ba + u8_mult(255 - ba, src_alpha);
    let affect = params.affect;

    if src_alpha == new_alpha {
        for b in 0..alpha {
            if affect.0[b] {
                d[b] = blended[b];
            }
        }
    } else {
        let ratio = src_alpha as f32 / new_alpha as f32;
        let compl_ratio = 1.0 - ratio;
        for b in 0..alpha {
            if affect.0[b] {
                d[b] = (blended[b] as f32 * ratio + d[b] as f32 * compl_ratio + EPSILON) as u8;
            }
        }
    }

    if affect.alpha() {
        d[alpha] = match rule {
            AlphaRule::Legacy if ba != 0 => ba,
            AlphaRule::Legacy | AlphaRule::Union => new_alpha,
            AlphaRule::Backdrop => ba,
            AlphaRule::Layer => src_alpha,
            AlphaRule::Intersection => u8_mult(ba, src_alpha),
        } as u8;
    }
}

/// Paint the layer pixel underneath the backdrop
#[inline]
fn behind(d: &mut [u8], px: &[u8], src_alpha: u32, params: &CompositeParams) {
    if src_alpha == 0 {
        return;
    }
    let bytes = d.len();
    let alpha = bytes - 1;
    let ba = d[alpha] as u32;
    let new_alpha = ba + u8_mult(255 - ba, src_alpha);

    let ratio = ba as f32 / new_alpha as f32;
    let compl_ratio = 1.0 - ratio;
    for b in 0..alpha {
        if params.affect.0[b] {
            d[b] = (d[b] as f32 * ratio + px[b] as f32 * compl_ratio + EPSILON) as u8;
        }
    }

    if params.affect.alpha() {
        d[alpha] = new_alpha as u8;
    }
}

/// Run the initial compositor over a whole region.
///
/// `src` and `dest` must be the same size and in the same working format.
/// `origin` is the canvas position of the region's top-left pixel.
pub fn initial_region(
    dest: &mut PixelRegionMut,
    src: &PixelRegion,
    mask: Option<&PixelRegion>,
    kind: SourceKind,
    params: &CompositeParams,
    origin: (i32, i32),
) {
    debug_assert_eq!(dest.bytes(), src.bytes());
    let bytes = src.bytes();
    let mut masks = mask.map(|m| m.rows());
    for (y, (d, s)) in dest.rows_mut().zip(src.rows()).enumerate() {
        let m = masks.as_mut().and_then(|m| m.next());
        initial_row(d, s, m, kind, params, bytes, origin.0, origin.1 + y as i32);
    }
}

/// Run the combine compositor over a whole region
pub fn combine_region(
    dest: &mut PixelRegionMut,
    src: &PixelRegion,
    mask: Option<&PixelRegion>,
    kind: SourceKind,
    params: &CompositeParams,
    origin: (i32, i32),
) {
    debug_assert_eq!(dest.bytes(), src.bytes());
    let bytes = src.bytes();
    let mut masks = mask.map(|m| m.rows());
    for (y, (d, s)) in dest.rows_mut().zip(src.rows()).enumerate() {
        let m = masks.as_mut().and_then(|m| m.next());
        combine_row(d, s, m, kind, params, bytes, origin.0, origin.1 + y as i32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: [u8; 4] = [255, 0, 0, 255];
    const HALF_BLUE: [u8; 4] = [0, 0, 255, 128];

    fn combine1(backdrop: [u8; 4], src: [u8; 4], params: &CompositeParams) -> [u8; 4] {
        let mut d = backdrop;
        combine_row(&mut d, &src, None, SourceKind::IntensityAlpha, params, 4, 0, 0);
        d
    }

    #[test]
    fn test_normal_over() {
        let params = CompositeParams::default();
        assert_eq!(combine1(RED, HALF_BLUE, &params), [127, 0, 128, 255]);
        assert_eq!(combine1(RED, [0, 255, 0, 255], &params), [0, 255, 0, 255]);
    }

    #[test]
    fn test_color_lock() {
        let mut params = CompositeParams::default();
        params.affect = ActiveChannels::ALPHA_ONLY;
        assert_eq!(combine1([255, 0, 0, 0], HALF_BLUE, &params), [255, 0, 0, 128]);
        assert_eq!(combine1(RED, HALF_BLUE, &params), RED);
    }

    #[test]
    fn test_locked_channels_never_change() {
        let backdrops = [RED, [12, 34, 56, 78], [200, 200, 200, 0], [0, 0, 0, 255]];
        let sources = [HALF_BLUE, [255, 255, 255, 255], [90, 180, 30, 200]];
        let composites = [
            CompositeMode::Auto,
            CompositeMode::Union,
            CompositeMode::ClipToBackdrop,
            CompositeMode::ClipToLayer,
            CompositeMode::Intersection,
        ];
        let spaces = [CompositeSpace::RgbPerceptual, CompositeSpace::RgbLinear];

        for locked in 0..4 {
            let mut affect = [true; 4];
            affect[locked] = false;
            for mode in LayerMode::ALL {
                for composite in composites {
                    for space in spaces {
                        let params = CompositeParams {
                            opacity: 200,
                            mode,
                            space,
                            composite,
                            affect: ActiveChannels(affect),
                        };
                        for backdrop in backdrops {
                            for src in sources {
                                for mask in [None, Some(130)] {
                                    let mut d = backdrop;
                                    let m = mask.map(|m: u8| [m]);
                                    combine_row(
                                        &mut d,
                                        &src,
                                        m.as_ref().map(|m| &m[..]),
                                        SourceKind::IntensityAlpha,
                                        &params,
                                        4,
                                        3,
                                        5,
                                    );
                                    assert_eq!(
                                        d[locked], backdrop[locked],
                                        "{:?} {:?} {:?} channel {} of {:?} under {:?}",
                                        mode, composite, space, locked, backdrop, src
                                    );
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_zero_opacity_is_noop() {
        let backdrop = [12, 34, 56, 78];
        for mode in LayerMode::ALL {
            let params = CompositeParams::new(0, mode);
            assert_eq!(combine1(backdrop, [200, 100, 50, 255], &params), backdrop);
            let params = CompositeParams::new(255, mode);
            assert_eq!(combine1(backdrop, [200, 100, 50, 0], &params), backdrop);
        }
    }

    #[test]
    fn test_legacy_alpha_rule() {
        // Multiply does not change alpha of a visible backdrop
        let params = CompositeParams::new(255, LayerMode::Multiply);
        assert_eq!(
            combine1([200, 200, 200, 100], [128, 128, 128, 255], &params),
            [137, 137, 137, 100]
        );

        let mut params = CompositeParams::new(255, LayerMode::Normal);
        params.composite = CompositeMode::ClipToBackdrop;
        assert_eq!(combine1([0, 0, 0, 100], [255, 255, 255, 255], &params)[3], 100);
        params.composite = CompositeMode::Intersection;
        assert_eq!(combine1([0, 0, 0, 100], [255, 255, 255, 128], &params)[3], 50);
    }

    #[test]
    fn test_behind() {
        let params = CompositeParams::new(255, LayerMode::Behind);
        assert_eq!(combine1(RED, [0, 0, 255, 255], &params), RED);
        assert_eq!(
            combine1([0, 0, 0, 0], [0, 0, 255, 255], &params),
            [0, 0, 255, 255]
        );
    }

    #[test]
    fn test_erase_and_replace() {
        let params = CompositeParams::new(255, LayerMode::Erase);
        assert_eq!(combine1(RED, [9, 9, 9, 255], &params), [255, 0, 0, 0]);
        assert_eq!(combine1(RED, [9, 9, 9, 128], &params), [255, 0, 0, 127]);

        let params = CompositeParams::new(255, LayerMode::Replace);
        assert_eq!(combine1(RED, HALF_BLUE, &params), HALF_BLUE);
        let params = CompositeParams::new(0, LayerMode::Replace);
        assert_eq!(combine1(RED, HALF_BLUE, &params), RED);
    }

    #[test]
    fn test_indexed_threshold() {
        let params = CompositeParams::new(255, LayerMode::Normal);
        let mut d = RED;
        combine_row(&mut d, &[0, 0, 255, 100], None, SourceKind::IndexedAlpha, &params, 4, 0, 0);
        assert_eq!(d, RED);
        combine_row(&mut d, &[0, 0, 255, 200], None, SourceKind::IndexedAlpha, &params, 4, 0, 0);
        assert_eq!(d, [0, 0, 255, 255]);
    }

    #[test]
    fn test_initial() {
        let params = CompositeParams::new(128, LayerMode::Normal);
        let mut d = [0u8; 8];
        initial_row(
            &mut d,
            &[10, 20, 30, 255, 40, 50, 60, 0],
            Some(&[255, 255]),
            SourceKind::IntensityAlpha,
            &params,
            4,
            0,
            0,
        );
        assert_eq!(d, [10, 20, 30, 128, 40, 50, 60, 0]);

        let mut params = CompositeParams::default();
        params.affect = ActiveChannels([false, true, true, true]);
        let mut d = [0u8; 2];
        initial_row(&mut d, &[77, 255], None, SourceKind::Intensity, &params, 2, 0, 0);
        assert_eq!(d, [0, 255]);
    }

    #[test]
    fn test_masked() {
        let params = CompositeParams::default();
        let mut d = [0, 0, 0, 255, 0, 0, 0, 255];
        combine_row(
            &mut d,
            &[255, 255, 255, 255, 255, 255, 255, 255],
            Some(&[0, 255]),
            SourceKind::Intensity,
            &params,
            4,
            0,
            0,
        );
        assert_eq!(d, [0, 0, 0, 255, 255, 255, 255, 255]);
    }

    #[test]
    fn test_dissolve_coverage_is_binary() {
        let params = CompositeParams::new(128, LayerMode::Dissolve);
        let mut d = vec![0u8; 64 * 4];
        let src: Vec<u8> = [200u8, 100, 50, 255].repeat(64);
        initial_row(&mut d, &src, None, SourceKind::IntensityAlpha, &params, 4, 0, 7);
        assert!(d.chunks_exact(4).all(|p| p[3] == 0 || p[3] == 255));
        assert!(d.chunks_exact(4).any(|p| p[3] == 255));
        assert!(d.chunks_exact(4).any(|p| p[3] == 0));
    }
}
