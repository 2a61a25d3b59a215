//! Block extraction: page content → structural model → text blocks.

use pdftrans_core::{
    BBox, Diagnostic, ExtractOptions, ExtractResult, PageModel, PageTextCache, PdfError, RawSpan,
    TextBlock, build_page_model, extract_text_blocks,
};
use pdftrans_parse::lopdf_backend::PageBox;
use pdftrans_parse::{ContentHandler, ImageEvent, LopdfBackend, PdfBackend, TextRunEvent};

use crate::document::Document;

/// Converts interpreter events into top-left page coordinates.
struct SpanCollector {
    page_box: PageBox,
    page_index: usize,
    spans: Vec<RawSpan>,
    images: Vec<BBox>,
    warnings: Vec<Diagnostic>,
}

impl SpanCollector {
    fn new(page_box: PageBox, page_index: usize) -> Self {
        Self {
            page_box,
            page_index,
            spans: Vec::new(),
            images: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Flip a PDF y coordinate into distance from the top of the MediaBox.
    fn flip(&self, y: f64) -> f64 {
        self.page_box.y1 - y
    }
}

impl ContentHandler for SpanCollector {
    fn on_text_run(&mut self, event: TextRunEvent) {
        let bottom_pdf = event.origin.y + event.descent * event.font_size;
        let top_pdf = bottom_pdf + event.font_size;
        let (x0, x1) = if event.end.x >= event.origin.x {
            (event.origin.x, event.end.x)
        } else {
            (event.end.x, event.origin.x)
        };
        self.spans.push(RawSpan {
            text: event.text,
            font: event.font_name,
            size: event.font_size,
            color: event.fill.to_packed(),
            alpha: event.alpha,
            bbox: BBox::new(
                x0 - self.page_box.x0,
                self.flip(top_pdf),
                x1 - self.page_box.x0,
                self.flip(bottom_pdf),
            ),
        });
    }

    fn on_image(&mut self, event: ImageEvent) {
        self.images.push(BBox::new(
            event.min.x - self.page_box.x0,
            self.flip(event.max.y),
            event.max.x - self.page_box.x0,
            self.flip(event.min.y),
        ));
    }

    fn on_warning(&mut self, mut warning: Diagnostic) {
        if warning.page.is_none() {
            warning.page = Some(self.page_index);
        }
        self.warnings.push(warning);
    }
}

/// Reads pages into structural models and translatable text blocks.
///
/// Read-only: the document is never modified, and nothing is cached, so a
/// model read after a page has been rewritten reflects the new content.
#[derive(Debug, Clone, Default)]
pub struct BlockExtractor {
    options: ExtractOptions,
}

impl BlockExtractor {
    pub fn new(options: &ExtractOptions) -> Self {
        Self {
            options: options.clone(),
        }
    }

    /// Build the structural model of one page.
    ///
    /// # Errors
    ///
    /// Fails only when the page's content cannot be read at all.
    pub fn page_model(
        &self,
        doc: &Document,
        index: usize,
    ) -> Result<ExtractResult<PageModel>, PdfError> {
        let page = doc.page(index)?;
        let page_box = doc.page_box(index)?;

        let mut collector = SpanCollector::new(page_box, index);
        LopdfBackend::interpret_page(doc.backend(), &page, &mut collector, &self.options)
            .map_err(PdfError::from)?;

        let model = build_page_model(
            page_box.width(),
            page_box.height(),
            collector.spans,
            collector.images,
            &self.options,
        );
        Ok(ExtractResult::with_diagnostics(model, collector.warnings))
    }

    /// Translatable text blocks of one page, ids `0..n-1` in scan order.
    pub fn text_blocks(
        &self,
        doc: &Document,
        index: usize,
    ) -> Result<ExtractResult<Vec<TextBlock>>, PdfError> {
        let model = self.page_model(doc, index)?;
        let mut blocks = extract_text_blocks(&model.value, index);
        let mut diagnostics = model.diagnostics;
        diagnostics.append(&mut blocks.diagnostics);
        Ok(ExtractResult::with_diagnostics(blocks.value, diagnostics))
    }

    /// Plain text of every page. Unreadable pages contribute empty text.
    pub fn page_text_cache(&self, doc: &Document) -> PageTextCache {
        let pages = (0..doc.page_count())
            .map(|i| match self.page_model(doc, i) {
                Ok(model) => model.value.plain_text(),
                Err(e) => {
                    tracing::debug!(page = i, error = %e, "page text unavailable for context");
                    String::new()
                }
            })
            .collect();
        PageTextCache::new(pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdftrans_core::{Point, Rgb};

    fn page_box() -> PageBox {
        PageBox {
            x0: 0.0,
            y0: 0.0,
            x1: 612.0,
            y1: 792.0,
        }
    }

    fn run(text: &str, x: f64, y: f64, size: f64) -> TextRunEvent {
        TextRunEvent {
            text: text.to_string(),
            font_name: "Helvetica".to_string(),
            resource_name: "F1".to_string(),
            font_size: size,
            origin: Point::new(x, y),
            end: Point::new(x + 50.0, y),
            descent: -0.2,
            fill: Rgb::new(1.0, 0.0, 0.0),
            alpha: 0.5,
        }
    }

    #[test]
    fn text_run_is_flipped_to_top_left() {
        let mut c = SpanCollector::new(page_box(), 0);
        c.on_text_run(run("Hello", 72.0, 700.0, 10.0));
        let span = &c.spans[0];
        assert_eq!(span.bbox.x0, 72.0);
        assert_eq!(span.bbox.x1, 122.0);
        // bottom at 700 - 2 = 698, top at 708 in PDF space.
        assert!((span.bbox.top - 84.0).abs() < 1e-9);
        assert!((span.bbox.bottom - 94.0).abs() < 1e-9);
        assert_eq!(span.color, 0xFF0000);
        assert_eq!(span.alpha, 0.5);
    }

    #[test]
    fn offset_media_box_is_normalized() {
        let mut c = SpanCollector::new(
            PageBox {
                x0: 100.0,
                y0: 100.0,
                x1: 712.0,
                y1: 892.0,
            },
            0,
        );
        c.on_text_run(run("x", 172.0, 800.0, 10.0));
        assert_eq!(c.spans[0].bbox.x0, 72.0);
        assert!((c.spans[0].bbox.bottom - 94.0).abs() < 1e-9);
    }

    #[test]
    fn image_placement_becomes_box() {
        let mut c = SpanCollector::new(page_box(), 0);
        c.on_image(ImageEvent {
            name: "Im0".to_string(),
            min: Point::new(10.0, 600.0),
            max: Point::new(110.0, 700.0),
        });
        assert_eq!(c.images[0], BBox::new(10.0, 92.0, 110.0, 192.0));
    }

    #[test]
    fn warnings_get_page_context() {
        let mut c = SpanCollector::new(page_box(), 4);
        c.on_warning(Diagnostic::new(
            pdftrans_core::DiagnosticCode::MissingFont,
            "gone",
        ));
        assert_eq!(c.warnings[0].page, Some(4));
    }
}
