//! Text style metadata carried by each extracted block.

use std::fmt;

use crate::color::Rgb;

/// Identifier of the universal fallback font (standard Helvetica).
pub const FALLBACK_FONT: &str = "helv";

/// Font size used when a block's style record is unusable.
pub const DEFAULT_FONT_SIZE: f64 = 12.0;

/// Style of the first styled run inside a block.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TextStyle {
    /// Font size in points.
    pub font_size: f64,
    /// Original font family identifier (base font name, possibly subset-prefixed).
    pub font_family: String,
    /// Fill color.
    pub color: Rgb,
    /// Fill opacity in `[0, 1]`.
    pub opacity: f64,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size: DEFAULT_FONT_SIZE,
            font_family: FALLBACK_FONT.to_string(),
            color: Rgb::BLACK,
            opacity: 1.0,
        }
    }
}

/// Why a block's style fell back to [`TextStyle::default`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DefaultReason {
    /// The block has no lines.
    NoLines,
    /// The first line has no runs.
    NoSpans,
    /// The first run's font size is zero, negative, or not finite.
    InvalidFontSize,
    /// The first run carries no font name.
    MissingFontName,
}

impl DefaultReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DefaultReason::NoLines => "block has no lines",
            DefaultReason::NoSpans => "first line has no runs",
            DefaultReason::InvalidFontSize => "first run has an invalid font size",
            DefaultReason::MissingFontName => "first run has no font name",
        }
    }
}

impl fmt::Display for DefaultReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Style as extracted: either read from the block, or substituted.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExtractedStyle {
    Styled(TextStyle),
    Defaulted(TextStyle, DefaultReason),
}

impl ExtractedStyle {
    /// The effective style, whichever way it was obtained.
    pub fn style(&self) -> &TextStyle {
        match self {
            ExtractedStyle::Styled(s) | ExtractedStyle::Defaulted(s, _) => s,
        }
    }

    pub fn is_defaulted(&self) -> bool {
        matches!(self, ExtractedStyle::Defaulted(..))
    }
}

/// Horizontal alignment of re-inserted text within its rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Alignment {
    #[default]
    Left,
    /// For right-to-left target languages.
    Right,
}
