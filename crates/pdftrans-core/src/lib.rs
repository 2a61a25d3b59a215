//! pdftrans-core: Backend-independent data types and algorithms.
//!
//! This crate provides the foundational types (BBox, Rgb, TextStyle, the
//! structural page model, TextBlock) and algorithms (run clustering, text
//! block extraction, context windows, word wrapping, the adaptive fit loop)
//! used by pdftrans. It has no required dependencies.

pub mod block;
pub mod color;
pub mod context;
pub mod error;
pub mod fit;
pub mod fonts;
pub mod geometry;
pub mod layout;
pub mod style;
pub mod translation;
pub mod wrap;

pub use block::{
    BlockKind, PageModel, RawBlock, RawLine, RawSpan, TextBlock, block_style, extract_text_blocks,
};
pub use color::Rgb;
pub use context::{PageTextCache, assemble_request, neighbor_window};
pub use error::{Diagnostic, DiagnosticCode, ExtractOptions, ExtractResult, PdfError};
pub use fit::{BlockState, FitAttempt, FitOutcome, FitPolicy, Layout, fit_text};
pub use fonts::{font_name_matches, normalize_font_id, strip_subset_prefix};
pub use geometry::{BBox, Ctm, Point};
pub use layout::{
    build_page_model, cluster_lines_into_blocks, cluster_spans_into_lines,
    sort_blocks_reading_order, split_lines_at_gaps,
};
pub use style::{
    Alignment, DEFAULT_FONT_SIZE, DefaultReason, ExtractedStyle, FALLBACK_FONT, TextStyle,
};
pub use translation::{BlockPayload, TranslationRequest, TranslationResult};
pub use wrap::wrap_text;
