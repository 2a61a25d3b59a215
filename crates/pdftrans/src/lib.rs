//! pdftrans: Translate PDF pages in place while keeping their layout.
//!
//! This is the public API facade crate for pdftrans. It re-exports types from
//! pdftrans-core and uses pdftrans-parse for PDF reading and interpretation.
//!
//! # Architecture
//!
//! - **pdftrans-core**: Backend-independent data types and algorithms
//! - **pdftrans-parse**: PDF parsing and content stream interpretation
//! - **pdftrans** (this crate): Document I/O, font resolution, redaction,
//!   re-insertion and the page/document driver
//!
//! # Example
//!
//! ```ignore
//! use pdftrans::{IdentityTranslator, TranslateConfig, translate_document};
//!
//! let config = TranslateConfig::new("in.pdf", "out/in.de.pdf", "German");
//! assert!(translate_document(&config, &IdentityTranslator));
//! ```

mod config;
mod document;
mod extractor;
mod fonts;
#[cfg(feature = "ollama")]
mod ollama;
mod pipeline;
mod redact;
mod reinsert;
mod report;
mod resources;
mod translator;

pub use config::TranslateConfig;
pub use document::Document;
pub use extractor::BlockExtractor;
pub use fonts::{FontEntry, FontError, FontProgram, FontResolver, FontTable, OutputFont};
#[cfg(feature = "ollama")]
pub use ollama::{OllamaConfig, OllamaTranslator};
pub use pipeline::{DocumentTranslator, translate_document};
pub use redact::{RedactionSummary, redact_page};
pub use reinsert::{
    BlockOutcome, InsertOptions, LINE_SPACING, PageInsertion, PageTarget, Reinserter,
    required_height,
};
pub use report::{PageReport, PageStatus, TranslationReport};
pub use translator::{
    IdentityTranslator, ResponseError, RetryPolicy, SYSTEM_INSTRUCTION, Translator, build_prompt,
    parse_response, strip_code_fences,
};

pub use pdftrans_core::{
    Alignment, BBox, BlockKind, BlockPayload, BlockState, Diagnostic, DiagnosticCode,
    ExtractOptions, ExtractResult, ExtractedStyle, PageModel, PdfError, Rgb, TextBlock,
    TextStyle, TranslationRequest, TranslationResult,
};

pub use pdftrans_core;
pub use pdftrans_parse;
