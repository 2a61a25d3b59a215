//! Error and diagnostic types for pdftrans.
//!
//! Provides [`PdfError`] for fatal errors that stop processing,
//! [`Diagnostic`] for non-fatal issues that allow best-effort continuation,
//! [`ExtractResult`] for pairing a value with collected diagnostics, and
//! [`ExtractOptions`] for configuring interpretation limits.

use std::fmt;

/// Fatal error types for PDF processing.
///
/// These errors indicate conditions that prevent further processing
/// of the document or of the current operation.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfError {
    /// Error parsing PDF structure or syntax.
    ParseError(String),
    /// I/O error reading or writing PDF data.
    IoError(String),
    /// Error resolving font or encoding information.
    FontError(String),
    /// Error during content stream interpretation.
    InterpreterError(String),
    /// The PDF is encrypted and requires a password to open.
    PasswordRequired,
    /// The output document could not be serialized or committed.
    WriteError(String),
    /// Any other error not covered by specific variants.
    Other(String),
}

impl fmt::Display for PdfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PdfError::ParseError(msg) => write!(f, "parse error: {msg}"),
            PdfError::IoError(msg) => write!(f, "I/O error: {msg}"),
            PdfError::FontError(msg) => write!(f, "font error: {msg}"),
            PdfError::InterpreterError(msg) => write!(f, "interpreter error: {msg}"),
            PdfError::PasswordRequired => write!(f, "PDF is encrypted and requires a password"),
            PdfError::WriteError(msg) => write!(f, "write error: {msg}"),
            PdfError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for PdfError {}

impl From<std::io::Error> for PdfError {
    fn from(err: std::io::Error) -> Self {
        PdfError::IoError(err.to_string())
    }
}

/// Machine-readable code for categorizing degradations.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "type", content = "detail")
)]
pub enum DiagnosticCode {
    /// A block's style record was unusable and defaults were substituted.
    StyleDefaulted,
    /// A font identifier resolved to the fallback font.
    FontFallback,
    /// The resolved font lacks glyphs for the translated text.
    GlyphFallback,
    /// The fit loop exhausted its attempts; the block was dropped.
    BlockAbandoned,
    /// The insertion primitive failed for one block; the block was dropped.
    InsertFailed,
    /// The translation result had no entry for a block.
    MissingTranslation,
    /// The page has no translatable text blocks.
    NoTranslatableBlocks,
    /// The translator returned an empty or unusable result for a page.
    EmptyTranslation,
    /// The page's structural model could not be read.
    ExtractionFailed,
    /// Removing the page's original marks failed.
    RedactionFailed,
    /// Neighbor-page context follows true previous/next pages.
    ContextWindowCorrected,
    /// A referenced font was not found in resources.
    MissingFont,
    /// A PDF object is malformed or has unexpected structure.
    MalformedObject,
    /// Character decoding fell back to a default mapping.
    EncodingFallback,
    /// Translated characters the output font cannot encode were written as `?`.
    UnencodableText,
    /// Any other diagnostic not covered by specific variants.
    Other(String),
}

impl DiagnosticCode {
    /// Returns the string tag for this code.
    pub fn as_str(&self) -> &str {
        match self {
            DiagnosticCode::StyleDefaulted => "STYLE_DEFAULTED",
            DiagnosticCode::FontFallback => "FONT_FALLBACK",
            DiagnosticCode::GlyphFallback => "GLYPH_FALLBACK",
            DiagnosticCode::BlockAbandoned => "BLOCK_ABANDONED",
            DiagnosticCode::InsertFailed => "INSERT_FAILED",
            DiagnosticCode::MissingTranslation => "MISSING_TRANSLATION",
            DiagnosticCode::NoTranslatableBlocks => "NO_TRANSLATABLE_BLOCKS",
            DiagnosticCode::EmptyTranslation => "EMPTY_TRANSLATION",
            DiagnosticCode::ExtractionFailed => "EXTRACTION_FAILED",
            DiagnosticCode::RedactionFailed => "REDACTION_FAILED",
            DiagnosticCode::ContextWindowCorrected => "CONTEXT_WINDOW_CORRECTED",
            DiagnosticCode::MissingFont => "MISSING_FONT",
            DiagnosticCode::MalformedObject => "MALFORMED_OBJECT",
            DiagnosticCode::EncodingFallback => "ENCODING_FALLBACK",
            DiagnosticCode::UnencodableText => "UNENCODABLE_TEXT",
            DiagnosticCode::Other(_) => "OTHER",
        }
    }

    /// Whether this code marks translated text that did not reach the page.
    pub fn is_block_loss(&self) -> bool {
        matches!(
            self,
            DiagnosticCode::BlockAbandoned | DiagnosticCode::InsertFailed
        )
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-fatal issue recorded during extraction or rewriting.
///
/// Diagnostics carry a structured [`code`](Diagnostic::code), a human-readable
/// description, and optional location context (page, block id, font name).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Diagnostic {
    /// Machine-readable code.
    pub code: DiagnosticCode,
    /// Human-readable description.
    pub description: String,
    /// Page index (0-based), if applicable.
    pub page: Option<usize>,
    /// Block id within the page, if applicable.
    pub block: Option<usize>,
    /// Font name associated with the diagnostic, if applicable.
    pub font_name: Option<String>,
}

impl Diagnostic {
    /// Create a diagnostic with a specific code and description.
    pub fn new(code: DiagnosticCode, description: impl Into<String>) -> Self {
        Self {
            code,
            description: description.into(),
            page: None,
            block: None,
            font_name: None,
        }
    }

    /// Attach a page index (builder pattern).
    pub fn on_page(mut self, page: usize) -> Self {
        self.page = Some(page);
        self
    }

    /// Attach a block id (builder pattern).
    pub fn for_block(mut self, block: usize) -> Self {
        self.block = Some(block);
        self
    }

    /// Attach a font name (builder pattern).
    pub fn with_font(mut self, font_name: impl Into<String>) -> Self {
        self.font_name = Some(font_name.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.description)?;
        if let Some(page) = self.page {
            write!(f, " (page {page})")?;
        }
        if let Some(block) = self.block {
            write!(f, " [block {block}]")?;
        }
        if let Some(ref font_name) = self.font_name {
            write!(f, " [font {font_name}]")?;
        }
        Ok(())
    }
}

/// Result wrapper that pairs a value with collected diagnostics.
#[derive(Debug, Clone)]
pub struct ExtractResult<T> {
    /// The extracted value.
    pub value: T,
    /// Diagnostics collected along the way.
    pub diagnostics: Vec<Diagnostic>,
}

impl<T> ExtractResult<T> {
    /// Create a result with no diagnostics.
    pub fn ok(value: T) -> Self {
        Self {
            value,
            diagnostics: Vec::new(),
        }
    }

    /// Create a result with diagnostics.
    pub fn with_diagnostics(value: T, diagnostics: Vec<Diagnostic>) -> Self {
        Self { value, diagnostics }
    }

    /// Returns true if there are no diagnostics.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Transform the value while preserving diagnostics.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ExtractResult<U> {
        ExtractResult {
            value: f(self.value),
            diagnostics: self.diagnostics,
        }
    }
}

/// Options controlling content interpretation and block clustering.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractOptions {
    /// Maximum recursion depth for nested Form XObjects (default: 10).
    pub max_recursion_depth: usize,
    /// Vertical tolerance for clustering runs into the same line, in points (default: 3.0).
    pub y_tolerance: f64,
    /// Maximum vertical gap between lines of the same block, in points (default: 10.0).
    pub y_density: f64,
    /// Minimum horizontal gap that splits a line into separate segments, in points (default: 20.0).
    pub x_density: f64,
    /// Whether to collect interpreter diagnostics (default: true).
    pub collect_warnings: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            max_recursion_depth: 10,
            y_tolerance: 3.0,
            y_density: 10.0,
            x_density: 20.0,
            collect_warnings: true,
        }
    }
}
