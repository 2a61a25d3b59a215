//! Structural page model and text block extraction.
//!
//! A [`PageModel`] is the page's content as blocks → lines → runs, rebuilt
//! from the content stream on demand. [`extract_text_blocks`] reduces it to
//! the [`TextBlock`]s that take part in translation.

use crate::color::Rgb;
use crate::error::{Diagnostic, DiagnosticCode, ExtractResult};
use crate::geometry::BBox;
use crate::style::{DefaultReason, ExtractedStyle, TextStyle};

/// Discriminates text blocks from non-text (image) blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BlockKind {
    Text,
    Image,
}

/// One styled run of text as shown by a single text-showing operator.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawSpan {
    pub text: String,
    /// Base font name as declared by the font dictionary.
    pub font: String,
    /// Effective font size in points.
    pub size: f64,
    /// Fill color packed as `0xRRGGBB`.
    pub color: u32,
    /// Fill opacity in `[0, 1]`.
    pub alpha: f64,
    pub bbox: BBox,
}

/// Runs sharing a baseline, sorted left-to-right.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawLine {
    pub spans: Vec<RawSpan>,
    pub bbox: BBox,
}

impl RawLine {
    /// Concatenate runs, inserting a space where runs are visibly apart.
    pub fn text(&self) -> String {
        let mut out = String::new();
        let mut prev: Option<&RawSpan> = None;
        for span in &self.spans {
            if let Some(p) = prev {
                let gap = span.bbox.x0 - p.bbox.x1;
                let threshold = 0.2 * p.size.max(span.size);
                if gap > threshold
                    && !out.ends_with(char::is_whitespace)
                    && !span.text.starts_with(char::is_whitespace)
                {
                    out.push(' ');
                }
            }
            out.push_str(&span.text);
            prev = Some(span);
        }
        out
    }
}

/// A block of the structural model: a paragraph of lines, or an image.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawBlock {
    pub kind: BlockKind,
    pub bbox: BBox,
    /// Empty for image blocks.
    pub lines: Vec<RawLine>,
}

impl RawBlock {
    /// Lines joined by newlines.
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(RawLine::text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// The structural content model of one page.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PageModel {
    pub width: f64,
    pub height: f64,
    /// Blocks in scan order (top-to-bottom, then left-to-right).
    pub blocks: Vec<RawBlock>,
}

impl PageModel {
    /// Page rectangle in top-left coordinates.
    pub fn page_bbox(&self) -> BBox {
        BBox::new(0.0, 0.0, self.width, self.height)
    }

    /// Plain text of all text blocks, separated by blank lines.
    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .filter(|b| b.kind == BlockKind::Text)
            .map(RawBlock::text)
            .filter(|t| !t.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// A translatable block of text.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TextBlock {
    /// Index among the page's text blocks, `0..n-1` in scan order.
    pub id: usize,
    pub bbox: BBox,
    pub text: String,
    pub kind: BlockKind,
    pub style: ExtractedStyle,
}

/// Derive a block's style from the first run of its first line.
pub fn block_style(block: &RawBlock) -> ExtractedStyle {
    let defaulted = |reason| ExtractedStyle::Defaulted(TextStyle::default(), reason);

    let Some(line) = block.lines.first() else {
        return defaulted(DefaultReason::NoLines);
    };
    let Some(span) = line.spans.first() else {
        return defaulted(DefaultReason::NoSpans);
    };
    if !span.size.is_finite() || span.size <= 0.0 {
        return defaulted(DefaultReason::InvalidFontSize);
    }
    if span.font.trim().is_empty() {
        return defaulted(DefaultReason::MissingFontName);
    }

    let opacity = if span.alpha.is_finite() {
        span.alpha.clamp(0.0, 1.0)
    } else {
        1.0
    };
    ExtractedStyle::Styled(TextStyle {
        font_size: span.size,
        font_family: span.font.clone(),
        color: Rgb::from_packed(span.color),
        opacity,
    })
}

/// Reduce a page model to its translatable text blocks.
///
/// Image blocks are skipped, blocks whose trimmed text is empty are dropped,
/// and the survivors are numbered `0..n-1` in scan order. A block whose style
/// record is unusable keeps its text with [`TextStyle::default`] and a
/// `STYLE_DEFAULTED` diagnostic.
pub fn extract_text_blocks(model: &PageModel, page: usize) -> ExtractResult<Vec<TextBlock>> {
    let mut blocks = Vec::new();
    let mut diagnostics = Vec::new();

    for raw in model.blocks.iter().filter(|b| b.kind == BlockKind::Text) {
        let text = raw.text();
        if text.trim().is_empty() {
            continue;
        }
        let id = blocks.len();
        let style = block_style(raw);
        if let ExtractedStyle::Defaulted(_, reason) = &style {
            diagnostics.push(
                Diagnostic::new(
                    DiagnosticCode::StyleDefaulted,
                    format!("using default style: {reason}"),
                )
                .on_page(page)
                .for_block(id),
            );
        }
        blocks.push(TextBlock {
            id,
            bbox: raw.bbox,
            text,
            kind: BlockKind::Text,
            style,
        });
    }

    ExtractResult::with_diagnostics(blocks, diagnostics)
}
