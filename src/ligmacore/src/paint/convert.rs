// SPDX-License-Identifier: GPL-3.0-or-later

//! Conversion of source pixels into the working format of a projection.
//!
//! The working format is always RGBA or GrayA, so the compositors never
//! need to know what the source was stored as. What they do need to know
//! is how the source's alpha should be interpreted, which is what
//! `SourceKind` tells them.

use super::color::{intensity, OPAQUE};
use super::region::{PixelRegion, PixelRegionMut};
use super::{BaseType, Colormap, ImageType};
use crate::error::{CompositeError, Result};

/// Compositing behavior family of a source format
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SourceKind {
    /// Color or gray data without alpha
    Intensity,
    /// Color or gray data with alpha
    IntensityAlpha,
    /// Palette data: coverage is all or nothing
    Indexed,
    /// Palette data with alpha: coverage is thresholded at 50%
    IndexedAlpha,
}

impl SourceKind {
    pub fn of(format: ImageType) -> SourceKind {
        use ImageType::*;
        match format {
            Rgb | Gray => SourceKind::Intensity,
            Rgba | GrayA => SourceKind::IntensityAlpha,
            Indexed => SourceKind::Indexed,
            IndexedA => SourceKind::IndexedAlpha,
        }
    }

    pub fn is_indexed(self) -> bool {
        matches!(self, SourceKind::Indexed | SourceKind::IndexedAlpha)
    }
}

/// Check that a source of the given format can be converted
pub fn check_colormap(format: ImageType, colormap: Option<&Colormap>) -> Result<()> {
    if format.is_indexed() && colormap.is_none() {
        Err(CompositeError::MissingColormap { format })
    } else {
        Ok(())
    }
}

/// Convert a row of pixels to the working format.
///
/// `working` must be RGBA or GrayA. Sources without alpha become opaque.
/// Palette indices outside the colormap are read as black.
pub fn convert_row(
    src: &[u8],
    format: ImageType,
    dest: &mut [u8],
    working: ImageType,
    colormap: Option<&Colormap>,
) -> Result<()> {
    check_colormap(format, colormap)?;
    debug_assert!(working == ImageType::Rgba || working == ImageType::GrayA);

    let sb = format.bytes();
    let db = working.bytes();
    debug_assert_eq!(src.len() / sb, dest.len() / db);

    let palette = |i: u8| colormap.map_or([0, 0, 0], |c| c.color(i));
    let gray_out = working.base_type() == BaseType::Gray;

    for (s, d) in src.chunks_exact(sb).zip(dest.chunks_exact_mut(db)) {
        let (rgb, alpha) = match format {
            ImageType::Rgb => ([s[0], s[1], s[2]], OPAQUE),
            ImageType::Rgba => ([s[0], s[1], s[2]], s[3]),
            ImageType::Gray => ([s[0]; 3], OPAQUE),
            ImageType::GrayA => ([s[0]; 3], s[1]),
            ImageType::Indexed => (palette(s[0]), OPAQUE),
            ImageType::IndexedA => (palette(s[0]), s[1]),
        };

        if gray_out {
            d[0] = intensity(rgb[0], rgb[1], rgb[2]);
            d[1] = alpha;
        } else {
            d[..3].copy_from_slice(&rgb);
            d[3] = alpha;
        }
    }

    Ok(())
}

/// Convert a whole region to the working format of `dest`.
/// Both regions must be the same size.
pub fn convert_region(
    src: &PixelRegion,
    dest: &mut PixelRegionMut,
    colormap: Option<&Colormap>,
) -> Result<()> {
    check_colormap(src.format(), colormap)?;
    if src.width() != dest.width() || src.height() != dest.height() {
        return Err(CompositeError::PreconditionViolation(
            "conversion regions differ in size",
        ));
    }
    let (format, working) = (src.format(), dest.format());
    for (s, d) in src.rows().zip(dest.rows_mut()) {
        convert_row(s, format, d, working, colormap)?;
    }
    Ok(())
}
