//! The page/document driver.

use pdftrans_core::{
    Diagnostic, DiagnosticCode, PageTextCache, PdfError, TextBlock, assemble_request,
};

use crate::config::TranslateConfig;
use crate::document::Document;
use crate::extractor::BlockExtractor;
use crate::fonts::{FontResolver, FontTable};
use crate::redact::redact_page;
use crate::reinsert::{InsertOptions, PageTarget, Reinserter};
use crate::report::{PageReport, PageStatus, TranslationReport};
use crate::translator::Translator;

/// Translates a whole document, one page at a time.
///
/// Pages are processed strictly in order. Trouble on one page leaves that
/// page as it was and the run continues; only failing to open the input or
/// to write the output ends the run with an error.
pub struct DocumentTranslator<'t, T: Translator + ?Sized> {
    config: TranslateConfig,
    translator: &'t T,
}

/// State shared by every page of one run.
struct RunState<'a> {
    extractor: BlockExtractor,
    cache: PageTextCache,
    table: FontTable,
    fonts: FontResolver,
    options: InsertOptions,
    report: &'a mut TranslationReport,
}

impl<'t, T: Translator + ?Sized> DocumentTranslator<'t, T> {
    pub fn new(config: TranslateConfig, translator: &'t T) -> Self {
        Self { config, translator }
    }

    pub fn config(&self) -> &TranslateConfig {
        &self.config
    }

    /// Open the input, translate every page, and save the output.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the input cannot be
    /// opened, or the output cannot be written.
    pub fn run(&self) -> Result<TranslationReport, PdfError> {
        self.config.validate()?;
        let mut doc =
            Document::open_file(&self.config.input_path, Some(self.config.extract.clone()))?;
        let mut report = TranslationReport {
            input: self.config.input_path.clone(),
            output: self.config.output_path.clone(),
            target_language: self.config.target_language.clone(),
            ..TranslationReport::default()
        };
        self.translate_pages(&mut doc, &mut report);

        doc.save(&self.config.output_path)?;
        tracing::info!(
            "{} -> {}: {}",
            self.config.input_path.display(),
            self.config.output_path.display(),
            report.summary()
        );
        Ok(report)
    }

    /// Translate every page of an open document in place.
    pub fn translate_pages(&self, doc: &mut Document, report: &mut TranslationReport) {
        tracing::info!(
            pages = doc.page_count(),
            language = %self.config.target_language,
            "translating document"
        );
        tracing::debug!(
            code = %DiagnosticCode::ContextWindowCorrected,
            window = self.config.context_window,
            "context uses the true previous and next pages"
        );

        let extractor = BlockExtractor::new(doc.options());
        let cache = extractor.page_text_cache(doc);
        let table = FontTable::build(doc.lopdf());
        let mut state = RunState {
            extractor,
            cache,
            table,
            fonts: FontResolver::new(),
            options: self.config.insert_options(),
            report,
        };

        for index in 0..doc.page_count() {
            let page = self.translate_page(doc, index, &mut state);
            tracing::info!(
                page = index + 1,
                status = ?page.status,
                inserted = page.inserted,
                "page done"
            );
            state.report.pages.push(page);
        }
        state.report.font_registrations = state.fonts.registrations();
    }

    fn translate_page(&self, doc: &mut Document, index: usize, state: &mut RunState<'_>) -> PageReport {
        let page_error = |code, e: PdfError| Diagnostic::new(code, e.to_string()).on_page(index);

        let blocks: Vec<TextBlock> = match state.extractor.text_blocks(doc, index) {
            Ok(result) => {
                state.report.record_all(result.diagnostics);
                result.value
            }
            Err(e) => {
                state.report.record(page_error(DiagnosticCode::ExtractionFailed, e));
                return PageReport::new(index, PageStatus::ExtractionFailed);
            }
        };

        let Some(request) = assemble_request(
            index,
            &blocks,
            &state.cache,
            self.config.context_window,
            &self.config.target_language,
        ) else {
            state.report.record(
                Diagnostic::new(DiagnosticCode::NoTranslatableBlocks, "page has no text to translate")
                    .on_page(index),
            );
            return PageReport::new(index, PageStatus::NoText);
        };

        let translations = self.translator.translate(&request);
        let matched = blocks
            .iter()
            .filter(|b| translations.get(b.id).is_some())
            .count();
        let mut page = PageReport {
            blocks: blocks.len(),
            ..PageReport::new(index, PageStatus::Untranslated)
        };
        if matched == 0 {
            state.report.record(
                Diagnostic::new(
                    DiagnosticCode::EmptyTranslation,
                    format!("no usable translation for {} blocks", blocks.len()),
                )
                .on_page(index),
            );
            return page;
        }

        let target = match (doc.page_id(index), doc.page_box(index)) {
            (Ok(page_id), Ok(page_box)) => PageTarget {
                page_id,
                index,
                page_box,
            },
            (Err(e), _) | (_, Err(e)) => {
                state.report.record(page_error(DiagnosticCode::ExtractionFailed, e));
                page.status = PageStatus::ExtractionFailed;
                return page;
            }
        };

        let max_depth = doc.options().max_recursion_depth;
        if let Err(e) = redact_page(doc.lopdf_mut(), target.page_id, max_depth) {
            state.report.record(page_error(DiagnosticCode::RedactionFailed, e));
            page.status = PageStatus::RedactionFailed;
            return page;
        }

        let inserted = Reinserter::new(&mut state.fonts, &state.table, &state.options).insert_page(
            doc.lopdf_mut(),
            &target,
            &blocks,
            &translations,
        );
        match inserted {
            Ok(insertion) => {
                page.status = PageStatus::Translated;
                page.inserted = insertion.inserted();
                page.abandoned = insertion.abandoned();
                page.missing = blocks.len() - matched;
                state.report.record_all(insertion.diagnostics);
            }
            Err(e) => {
                state.report.record(page_error(DiagnosticCode::InsertFailed, e));
                page.status = PageStatus::InsertFailed;
            }
        }
        page
    }
}

/// Translate `config.input_path` into `config.output_path`.
///
/// Returns `false` only when the run as a whole failed; pages that could not
/// be translated are logged and left as they were.
pub fn translate_document<T: Translator + ?Sized>(config: &TranslateConfig, translator: &T) -> bool {
    match DocumentTranslator::new(config.clone(), translator).run() {
        Ok(_) => true,
        Err(e) => {
            tracing::error!("translation of {} failed: {e}", config.input_path.display());
            false
        }
    }
}
