// SPDX-License-Identifier: GPL-3.0-or-later

use num_enum::IntoPrimitive;
use num_enum::TryFromPrimitive;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum LayerMode {
    Normal = 0,
    Dissolve,
    Behind,
    Multiply,
    Screen,
    Overlay,
    Difference,
    Addition,
    Subtract,
    DarkenOnly,
    LightenOnly,
    Hue,
    Saturation,
    Color,
    Value,
    Divide,
    Erase,
    Replace,
}

impl LayerMode {
    pub const ALL: [LayerMode; 18] = [
        LayerMode::Normal,
        LayerMode::Dissolve,
        LayerMode::Behind,
        LayerMode::Multiply,
        LayerMode::Screen,
        LayerMode::Overlay,
        LayerMode::Difference,
        LayerMode::Addition,
        LayerMode::Subtract,
        LayerMode::DarkenOnly,
        LayerMode::LightenOnly,
        LayerMode::Hue,
        LayerMode::Saturation,
        LayerMode::Color,
        LayerMode::Value,
        LayerMode::Divide,
        LayerMode::Erase,
        LayerMode::Replace,
    ];

    /// Does this mode produce its own alpha value?
    ///
    /// Modes that don't leave the backdrop alpha alone wherever the
    /// backdrop is not fully transparent.
    pub fn affects_alpha(self) -> bool {
        matches!(
            self,
            LayerMode::Normal
                | LayerMode::Dissolve
                | LayerMode::Behind
                | LayerMode::Erase
                | LayerMode::Replace
        )
    }

    /// Modes that only make sense for color images.
    /// On grayscale projections these act like Normal.
    pub fn needs_color(self) -> bool {
        matches!(
            self,
            LayerMode::Hue | LayerMode::Saturation | LayerMode::Color | LayerMode::Value
        )
    }

    pub fn name(self) -> &'static str {
        use LayerMode::*;
        match self {
            Normal => "normal",
            Dissolve => "dissolve",
            Behind => "behind",
            Multiply => "multiply",
            Screen => "screen",
            Overlay => "overlay",
            Difference => "difference",
            Addition => "addition",
            Subtract => "subtract",
            DarkenOnly => "darken-only",
            LightenOnly => "lighten-only",
            Hue => "hue",
            Saturation => "saturation",
            Color => "color",
            Value => "value",
            Divide => "divide",
            Erase => "erase",
            Replace => "replace",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        LayerMode::ALL.iter().copied().find(|m| m.name() == name)
    }
}

impl Default for LayerMode {
    fn default() -> Self {
        LayerMode::Normal
    }
}

/// The color space the blend functions operate in
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum CompositeSpace {
    Auto = 0,
    RgbLinear,
    RgbPerceptual,
}

impl CompositeSpace {
    pub fn is_linear(self) -> bool {
        self == CompositeSpace::RgbLinear
    }
}

impl Default for CompositeSpace {
    fn default() -> Self {
        CompositeSpace::Auto
    }
}

/// How the alpha of the result is formed from the backdrop and layer alphas
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum CompositeMode {
    Auto = 0,
    Union,
    ClipToBackdrop,
    ClipToLayer,
    Intersection,
}

impl Default for CompositeMode {
    fn default() -> Self {
        CompositeMode::Auto
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::TryFrom;

    #[test]
    fn test_names() {
        for mode in LayerMode::ALL {
            assert_eq!(LayerMode::from_name(mode.name()), Some(mode));
        }
        assert_eq!(LayerMode::from_name("burn"), None);
    }

    #[test]
    fn test_alpha_table() {
        let affecting: Vec<LayerMode> = LayerMode::ALL
            .iter()
            .copied()
            .filter(|m| m.affects_alpha())
            .collect();
        assert_eq!(
            affecting,
            vec![
                LayerMode::Normal,
                LayerMode::Dissolve,
                LayerMode::Behind,
                LayerMode::Erase,
                LayerMode::Replace
            ]
        );
    }

    #[test]
    fn test_primitive_conversion() {
        assert_eq!(LayerMode::try_from(17u8), Ok(LayerMode::Replace));
        assert!(LayerMode::try_from(18u8).is_err());
        assert_eq!(u8::from(CompositeMode::Intersection), 4);
    }
}
