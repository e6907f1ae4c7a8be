// SPDX-License-Identifier: GPL-3.0-or-later

use num_enum::IntoPrimitive;
use num_enum::TryFromPrimitive;

/// Storage format of a raster
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum ImageType {
    Rgb = 0,
    Rgba,
    Gray,
    GrayA,
    Indexed,
    IndexedA,
}

/// The color model of a canvas, independent of alpha
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum BaseType {
    Rgb,
    Gray,
    Indexed,
}

impl ImageType {
    /// Bytes per pixel
    pub fn bytes(self) -> usize {
        use ImageType::*;
        match self {
            Rgb => 3,
            Rgba => 4,
            Gray | Indexed => 1,
            GrayA | IndexedA => 2,
        }
    }

    pub fn has_alpha(self) -> bool {
        matches!(self, ImageType::Rgba | ImageType::GrayA | ImageType::IndexedA)
    }

    pub fn is_indexed(self) -> bool {
        matches!(self, ImageType::Indexed | ImageType::IndexedA)
    }

    pub fn base_type(self) -> BaseType {
        use ImageType::*;
        match self {
            Rgb | Rgba => BaseType::Rgb,
            Gray | GrayA => BaseType::Gray,
            Indexed | IndexedA => BaseType::Indexed,
        }
    }

    pub fn with_alpha(self) -> ImageType {
        use ImageType::*;
        match self {
            Rgb | Rgba => Rgba,
            Gray | GrayA => GrayA,
            Indexed | IndexedA => IndexedA,
        }
    }

    pub fn without_alpha(self) -> ImageType {
        use ImageType::*;
        match self {
            Rgb | Rgba => Rgb,
            Gray | GrayA => Gray,
            Indexed | IndexedA => Indexed,
        }
    }

    pub fn name(self) -> &'static str {
        use ImageType::*;
        match self {
            Rgb => "RGB",
            Rgba => "RGBA",
            Gray => "Gray",
            GrayA => "GrayA",
            Indexed => "Indexed",
            IndexedA => "IndexedA",
        }
    }
}

impl BaseType {
    /// The format the projection of a canvas of this type is kept in.
    ///
    /// Indexed canvases are projected in RGBA: the blend math needs real
    /// color values rather than palette indices.
    pub fn projection_type(self) -> ImageType {
        match self {
            BaseType::Rgb | BaseType::Indexed => ImageType::Rgba,
            BaseType::Gray => ImageType::GrayA,
        }
    }
}

/// A palette of up to 256 RGB entries
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Colormap {
    entries: Vec<[u8; 3]>,
}

impl Colormap {
    pub const MAX_ENTRIES: usize = 256;

    pub fn new(entries: Vec<[u8; 3]>) -> Colormap {
        assert!(entries.len() <= Self::MAX_ENTRIES);
        Colormap { entries }
    }

    /// Build a colormap from packed RGB triples.
    /// Trailing bytes that do not form a whole triple are ignored.
    pub fn from_rgb_bytes(bytes: &[u8]) -> Colormap {
        Colormap::new(
            bytes
                .chunks_exact(3)
                .take(Self::MAX_ENTRIES)
                .map(|c| [c[0], c[1], c[2]])
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: u8) -> Option<[u8; 3]> {
        self.entries.get(index as usize).copied()
    }

    /// Look up a color. Indices outside the palette are black.
    pub fn color(&self, index: u8) -> [u8; 3] {
        self.get(index).unwrap_or([0, 0, 0])
    }
}
