//! Outcome of a translation run.

use std::path::PathBuf;

use pdftrans_core::{Diagnostic, DiagnosticCode};
use serde::Serialize;

/// What happened to one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageStatus {
    /// Redacted and rewritten; some blocks may still have been dropped.
    Translated,
    /// No translatable text; left as it was.
    NoText,
    /// The translator returned nothing usable; left as it was.
    Untranslated,
    /// The page content could not be read; left as it was.
    ExtractionFailed,
    /// The original text could not be removed; left as it was.
    RedactionFailed,
    /// Redacted, but the new text could not be attached.
    InsertFailed,
}

impl PageStatus {
    /// Whether the page still carries its original content.
    pub fn is_unchanged(&self) -> bool {
        !matches!(self, PageStatus::Translated | PageStatus::InsertFailed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageReport {
    /// 0-based page index.
    pub index: usize,
    pub status: PageStatus,
    /// Translatable blocks found.
    pub blocks: usize,
    pub inserted: usize,
    pub abandoned: usize,
    /// Blocks the translator returned no text for.
    pub missing: usize,
}

impl PageReport {
    pub fn new(index: usize, status: PageStatus) -> Self {
        Self {
            index,
            status,
            blocks: 0,
            inserted: 0,
            abandoned: 0,
            missing: 0,
        }
    }
}

/// Per-page outcomes and every diagnostic of a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TranslationReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub target_language: String,
    pub pages: Vec<PageReport>,
    pub diagnostics: Vec<Diagnostic>,
    /// Font objects added to the output.
    pub font_registrations: usize,
}

impl TranslationReport {
    /// Record a diagnostic and log it once at warn level.
    pub fn record(&mut self, diagnostic: Diagnostic) {
        tracing::warn!("{diagnostic}");
        self.diagnostics.push(diagnostic);
    }

    pub fn record_all(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        for d in diagnostics {
            self.record(d);
        }
    }

    pub fn translated_pages(&self) -> usize {
        self.pages
            .iter()
            .filter(|p| p.status == PageStatus::Translated)
            .count()
    }

    pub fn blocks_inserted(&self) -> usize {
        self.pages.iter().map(|p| p.inserted).sum()
    }

    pub fn blocks_abandoned(&self) -> usize {
        self.pages.iter().map(|p| p.abandoned).sum()
    }

    /// Diagnostics with a given code.
    pub fn with_code<'a>(&'a self, code: &'a DiagnosticCode) -> impl Iterator<Item = &'a Diagnostic> {
        self.diagnostics.iter().filter(move |d| &d.code == code)
    }

    /// One-line summary for terminals.
    pub fn summary(&self) -> String {
        format!(
            "{} of {} pages translated, {} blocks inserted, {} dropped, {} diagnostics",
            self.translated_pages(),
            self.pages.len(),
            self.blocks_inserted(),
            self.blocks_abandoned(),
            self.diagnostics.len()
        )
    }
}
