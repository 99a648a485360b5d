//! Sample layout and color interpretation descriptors.
//!
//! A raster only stores bytes; these descriptors say how many samples make
//! up a pixel and what those samples mean.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of bands a pixel may carry.
pub const MAX_BANDS: usize = 4;

/// How samples are laid out in a raster.
///
/// Samples are 8-bit and pixel-interleaved: pixel `(x, y)` occupies `bands`
/// consecutive bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SampleLayout {
    bands: usize,
}

impl SampleLayout {
    /// Single gray band.
    pub const GRAY: SampleLayout = SampleLayout { bands: 1 };
    /// Gray plus alpha.
    pub const GRAY_ALPHA: SampleLayout = SampleLayout { bands: 2 };
    /// Red, green, blue.
    pub const RGB: SampleLayout = SampleLayout { bands: 3 };
    /// Red, green, blue, alpha.
    pub const RGBA: SampleLayout = SampleLayout { bands: 4 };

    /// Create a layout with the given band count, `None` if it is outside
    /// `1..=MAX_BANDS`.
    pub fn new(bands: usize) -> Option<Self> {
        if (1..=MAX_BANDS).contains(&bands) {
            Some(Self { bands })
        } else {
            None
        }
    }

    /// Number of samples per pixel.
    pub fn bands(&self) -> usize {
        self.bands
    }

    /// Bytes needed for `width x height` pixels.
    pub fn buffer_len(&self, width: i32, height: i32) -> usize {
        width.max(0) as usize * height.max(0) as usize * self.bands
    }
}

impl fmt::Display for SampleLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} band(s)", self.bands)
    }
}

/// Color space the samples are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorSpace {
    Srgb,
    LinearRgb,
    Gray,
}

/// Color interpretation of a raster's samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColorModel {
    /// Color space of the color bands
    pub space: ColorSpace,
    /// Whether the last band is alpha
    pub has_alpha: bool,
    /// Whether color bands are premultiplied by alpha
    pub premultiplied: bool,
}

impl ColorModel {
    /// Non-premultiplied sRGB with alpha.
    pub const SRGBA: ColorModel = ColorModel {
        space: ColorSpace::Srgb,
        has_alpha: true,
        premultiplied: false,
    };

    /// Opaque sRGB.
    pub const SRGB: ColorModel = ColorModel {
        space: ColorSpace::Srgb,
        has_alpha: false,
        premultiplied: false,
    };

    /// Opaque gray.
    pub const GRAY: ColorModel = ColorModel {
        space: ColorSpace::Gray,
        has_alpha: false,
        premultiplied: false,
    };

    /// Pick the conventional color model for a layout.
    pub fn default_for(layout: SampleLayout) -> Self {
        match layout.bands() {
            1 => Self::GRAY,
            2 => ColorModel {
                space: ColorSpace::Gray,
                has_alpha: true,
                premultiplied: false,
            },
            3 => Self::SRGB,
            _ => Self::SRGBA,
        }
    }

    /// Whether this model can describe samples with the given layout.
    pub fn is_compatible_with(&self, layout: SampleLayout) -> bool {
        let color_bands = match self.space {
            ColorSpace::Gray => 1,
            ColorSpace::Srgb | ColorSpace::LinearRgb => 3,
        };
        color_bands + usize::from(self.has_alpha) == layout.bands()
    }
}
