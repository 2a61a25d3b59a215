//! Re-insertion of translated text into redacted pages.

use std::collections::HashMap;
use std::rc::Rc;

use lopdf::content::{Content, Operation};
use lopdf::{Object, ObjectId, dictionary};
use pdftrans_core::{
    Alignment, BBox, BlockState, Diagnostic, DiagnosticCode, FALLBACK_FONT, FitAttempt,
    FitOutcome, FitPolicy, Layout, PdfError, TextBlock, TranslationResult, fit_text, wrap_text,
};
use pdftrans_parse::lopdf_backend::PageBox;

use crate::fonts::{FontResolver, FontTable, OutputFont};
use crate::resources::{append_page_content, page_resource, set_page_resource};

/// Baseline-to-baseline distance as a multiple of the font size.
pub const LINE_SPACING: f64 = 1.2;

/// Overflow below this is rounding noise.
const FIT_EPSILON: f64 = 1e-6;

/// Layout settings for re-inserted text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InsertOptions {
    pub fit: FitPolicy,
    pub alignment: Alignment,
}

/// The page being written to.
#[derive(Debug, Clone, Copy)]
pub struct PageTarget {
    pub page_id: ObjectId,
    pub index: usize,
    pub page_box: PageBox,
}

impl PageTarget {
    /// The page rectangle in top-left coordinates.
    fn bbox(&self) -> BBox {
        BBox::new(0.0, 0.0, self.page_box.width(), self.page_box.height())
    }
}

/// What happened to one block.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockOutcome {
    pub id: usize,
    pub state: BlockState,
    /// Font size the text was written at.
    pub font_size: Option<f64>,
    /// Resource name of the font used.
    pub font: Option<String>,
}

/// Result of re-inserting one page.
#[derive(Debug, Clone, Default)]
pub struct PageInsertion {
    pub outcomes: Vec<BlockOutcome>,
    pub diagnostics: Vec<Diagnostic>,
}

impl PageInsertion {
    pub fn inserted(&self) -> usize {
        self.count(BlockState::Inserted)
    }

    pub fn abandoned(&self) -> usize {
        self.count(BlockState::Abandoned)
    }

    fn count(&self, state: BlockState) -> usize {
        self.outcomes.iter().filter(|o| o.state == state).count()
    }
}

/// A block whose text has been laid out and is ready to write.
struct PlacedBlock {
    lines: Vec<String>,
    rect: BBox,
    font_size: f64,
}

/// Writes translated blocks into pages, consulting the font resolver.
pub struct Reinserter<'a> {
    fonts: &'a mut FontResolver,
    table: &'a FontTable,
    options: &'a InsertOptions,
}

impl<'a> Reinserter<'a> {
    pub fn new(fonts: &'a mut FontResolver, table: &'a FontTable, options: &'a InsertOptions) -> Self {
        Self {
            fonts,
            table,
            options,
        }
    }

    /// Insert the translations of `blocks`, in id order.
    ///
    /// Problems with a single block abandon that block only. The error case
    /// is reserved for failing to attach the new content to the page.
    pub fn insert_page(
        &mut self,
        doc: &mut lopdf::Document,
        target: &PageTarget,
        blocks: &[TextBlock],
        translations: &TranslationResult,
    ) -> Result<PageInsertion, PdfError> {
        let mut ordered: Vec<&TextBlock> = blocks.iter().collect();
        ordered.sort_by_key(|b| b.id);

        let mut page = PageInsertion::default();
        let mut opacity_states: HashMap<u32, String> = HashMap::new();
        let mut content = Vec::new();

        for block in ordered {
            let mut state = BlockState::Pending;
            let diag = |code, text: String| Diagnostic::new(code, text).on_page(target.index).for_block(block.id);

            let Some(text) = translations.get(block.id) else {
                page.diagnostics.push(diag(
                    DiagnosticCode::MissingTranslation,
                    format!("block {} has no translation", block.id),
                ));
                page.outcomes.push(BlockOutcome {
                    id: block.id,
                    state,
                    font_size: None,
                    font: None,
                });
                continue;
            };

            let font = self.block_font(doc, block, text, target.index, &mut page.diagnostics);
            let outcome = fit_text(
                block.bbox,
                block.style.style().font_size,
                &target.bbox(),
                &self.options.fit,
                |attempt| {
                    state.begin_attempt();
                    layout_attempt(&font, text, attempt)
                },
            );

            let placed = match outcome {
                FitOutcome::Fitted {
                    value,
                    rect,
                    font_size,
                    attempts,
                } => {
                    tracing::debug!(
                        page = target.index,
                        block = block.id,
                        attempts,
                        font_size,
                        "block fitted"
                    );
                    PlacedBlock {
                        lines: value,
                        rect,
                        font_size,
                    }
                }
                FitOutcome::Abandoned {
                    attempts,
                    last_overflow,
                } => {
                    state.finish(false);
                    page.diagnostics.push(diag(
                        DiagnosticCode::BlockAbandoned,
                        format!(
                            "block {} does not fit after {attempts} attempts ({last_overflow:.1} pt short)",
                            block.id
                        ),
                    ));
                    page.outcomes.push(BlockOutcome {
                        id: block.id,
                        state,
                        font_size: None,
                        font: Some(font.resource_name.clone()),
                    });
                    continue;
                }
            };

            match self.write_block(doc, target, block, &font, &placed, &mut opacity_states) {
                Ok(bytes) => {
                    state.finish(true);
                    content.extend_from_slice(&bytes);
                    content.push(b'\n');
                }
                Err(e) => {
                    state.finish(false);
                    page.diagnostics.push(diag(
                        DiagnosticCode::InsertFailed,
                        format!("block {} could not be written: {e}", block.id),
                    ));
                }
            }
            page.outcomes.push(BlockOutcome {
                id: block.id,
                state,
                font_size: (state == BlockState::Inserted).then_some(placed.font_size),
                font: Some(font.resource_name.clone()),
            });
        }

        if !content.is_empty() {
            append_page_content(doc, target.page_id, content)?;
        }
        Ok(page)
    }

    /// The output font for a block, with fallback diagnostics.
    fn block_font(
        &mut self,
        doc: &mut lopdf::Document,
        block: &TextBlock,
        text: &str,
        page: usize,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Rc<OutputFont> {
        let family = &block.style.style().font_family;
        let font = self.fonts.resolve(doc, self.table, family);

        if font.is_fallback() {
            if family != FALLBACK_FONT {
                diagnostics.push(
                    Diagnostic::new(
                        DiagnosticCode::FontFallback,
                        format!("font {family} unavailable, using Helvetica"),
                    )
                    .on_page(page)
                    .for_block(block.id)
                    .with_font(family.as_str()),
                );
            }
            check_encodable(&font, text, page, block.id, diagnostics);
            return font;
        }

        let missing = font.missing_glyphs(text);
        if missing.is_empty() {
            return font;
        }
        let sample: String = missing.iter().take(8).collect();
        diagnostics.push(
            Diagnostic::new(
                DiagnosticCode::GlyphFallback,
                format!("font {family} lacks glyphs for {sample:?}, using Helvetica"),
            )
            .on_page(page)
            .for_block(block.id)
            .with_font(family.as_str()),
        );
        let fallback = self.fonts.fallback(doc);
        check_encodable(&fallback, text, page, block.id, diagnostics);
        fallback
    }

    /// Install the block's resources and build its content bytes.
    fn write_block(
        &self,
        doc: &mut lopdf::Document,
        target: &PageTarget,
        block: &TextBlock,
        font: &OutputFont,
        placed: &PlacedBlock,
        opacity_states: &mut HashMap<u32, String>,
    ) -> Result<Vec<u8>, PdfError> {
        let style = block.style.style();
        let size = placed.font_size;

        // A same-named font declared by the page may be a different font.
        let installed = page_resource(doc, target.page_id, b"Font", &font.resource_name)
            .and_then(|o| o.as_reference().ok());
        if installed != Some(font.font_id) {
            set_page_resource(
                doc,
                target.page_id,
                b"Font",
                &font.resource_name,
                Object::Reference(font.font_id),
            )?;
        }

        let mut ops = vec![Operation::new("q", vec![])];
        let opacity = style.opacity.clamp(0.0, 1.0);
        if opacity < 1.0 {
            let name = opacity_state(doc, target.page_id, opacity, opacity_states)?;
            ops.push(Operation::new("gs", vec![Object::Name(name.into_bytes())]));
        }
        ops.push(Operation::new(
            "rg",
            vec![real(style.color.r), real(style.color.g), real(style.color.b)],
        ));
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new(
            "Tf",
            vec![Object::Name(font.resource_name.clone().into_bytes()), real(size)],
        ));

        let first_baseline = placed.rect.top + font.ascent() * size;
        for (i, line) in placed.lines.iter().enumerate() {
            if line.is_empty() {
                continue;
            }
            let x = match self.options.alignment {
                Alignment::Left => placed.rect.x0,
                Alignment::Right => placed.rect.x1 - font.text_width(line, size),
            };
            let y = first_baseline + i as f64 * LINE_SPACING * size;
            ops.push(Operation::new(
                "Tm",
                vec![
                    Object::Integer(1),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(1),
                    real(target.page_box.x0 + x),
                    real(target.page_box.y1 - y),
                ],
            ));
            ops.push(Operation::new("Tj", vec![font.encode(line)]));
        }
        ops.push(Operation::new("ET", vec![]));
        ops.push(Operation::new("Q", vec![]));

        Content { operations: ops }
            .encode()
            .map_err(|e| PdfError::WriteError(format!("failed to encode text: {e}")))
    }
}

/// One layout attempt: wrap to the rectangle width and compare heights.
fn layout_attempt(font: &OutputFont, text: &str, attempt: &FitAttempt) -> Layout<Vec<String>> {
    let size = attempt.font_size;
    let lines = wrap_text(text, attempt.rect.width(), |s| font.text_width(s, size));
    let required = required_height(lines.len(), size);
    let overflow = required - attempt.rect.height();
    if overflow <= FIT_EPSILON {
        Layout::Fits(lines)
    } else {
        tracing::debug!(attempt = attempt.attempt, size, overflow, "text overflows");
        Layout::Overflow(overflow)
    }
}

/// Height of `lines` lines of text at `size`.
pub fn required_height(lines: usize, size: f64) -> f64 {
    lines.saturating_sub(1) as f64 * LINE_SPACING * size + size
}

/// Record characters `font` will write as `?`.
fn check_encodable(
    font: &OutputFont,
    text: &str,
    page: usize,
    block: usize,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let missing = font.missing_glyphs(text);
    if missing.is_empty() {
        return;
    }
    let sample: String = missing.iter().take(8).collect();
    diagnostics.push(
        Diagnostic::new(
            DiagnosticCode::UnencodableText,
            format!(
                "{} cannot encode {} characters ({sample:?}), written as '?'",
                font.base_font,
                missing.len()
            ),
        )
        .on_page(page)
        .for_block(block)
        .with_font(font.resource_name.as_str()),
    );
}

fn real(value: f64) -> Object {
    Object::Real(value as f32)
}

/// Name of a page-local ExtGState carrying `opacity`, created on first use.
fn opacity_state(
    doc: &mut lopdf::Document,
    page_id: ObjectId,
    opacity: f64,
    cache: &mut HashMap<u32, String>,
) -> Result<String, PdfError> {
    let key = (opacity * 1000.0).round() as u32;
    if let Some(name) = cache.get(&key) {
        return Ok(name.clone());
    }
    let name = format!("TrGS{key}");
    let state_id = doc.add_object(dictionary! {
        "Type" => "ExtGState",
        "ca" => real(opacity),
        "CA" => real(opacity),
    });
    set_page_resource(doc, page_id, b"ExtGState", &name, Object::Reference(state_id))?;
    cache.insert(key, name.clone());
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::Stream;
    use pdftrans_core::{BlockKind, ExtractedStyle, Rgb, TextStyle};
    use pdftrans_parse::lopdf_backend::page_content_bytes;

    use crate::resources::has_page_resource;

    fn page_doc() -> (lopdf::Document, PageTarget) {
        let mut doc = lopdf::Document::with_version("1.5");
        let content_id = doc.add_object(Stream::new(dictionary! {}, b"q Q".to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Contents" => Object::Reference(content_id),
        });
        let target = PageTarget {
            page_id,
            index: 0,
            page_box: PageBox {
                x0: 0.0,
                y0: 0.0,
                x1: 612.0,
                y1: 792.0,
            },
        };
        (doc, target)
    }

    fn block(id: usize, bbox: BBox, style: TextStyle) -> TextBlock {
        TextBlock {
            id,
            bbox,
            text: "original".to_string(),
            kind: BlockKind::Text,
            style: ExtractedStyle::Styled(style),
        }
    }

    fn helvetica(size: f64) -> TextStyle {
        TextStyle {
            font_size: size,
            font_family: "Helvetica".to_string(),
            ..TextStyle::default()
        }
    }

    fn ops_of(doc: &lopdf::Document, target: &PageTarget) -> Vec<Operation> {
        let dict = doc.get_object(target.page_id).and_then(Object::as_dict).unwrap();
        Content::decode(&page_content_bytes(doc, dict).unwrap())
            .unwrap()
            .operations
    }

    fn insert(
        doc: &mut lopdf::Document,
        target: &PageTarget,
        blocks: &[TextBlock],
        translations: &TranslationResult,
        options: &InsertOptions,
    ) -> PageInsertion {
        let table = FontTable::build(doc);
        let mut fonts = FontResolver::new();
        Reinserter::new(&mut fonts, &table, options)
            .insert_page(doc, target, blocks, translations)
            .unwrap()
    }

    #[test]
    fn required_height_counts_em_box_of_last_line() {
        assert_eq!(required_height(1, 12.0), 12.0);
        assert!((required_height(3, 10.0) - 34.0).abs() < 1e-9);
    }

    #[test]
    fn single_line_is_written_at_original_size() {
        let (mut doc, target) = page_doc();
        let blocks = [block(0, BBox::new(72.0, 72.0, 300.0, 84.0), helvetica(12.0))];
        let translations: TranslationResult = [(0, "Bonjour")].into_iter().collect();

        let result = insert(&mut doc, &target, &blocks, &translations, &InsertOptions::default());
        assert_eq!(result.inserted(), 1);
        assert_eq!(result.outcomes[0].font_size, Some(12.0));
        assert_eq!(result.outcomes[0].font.as_deref(), Some("helv"));
        // Helvetica is the fallback but the family still asked for Helvetica.
        assert!(
            result
                .diagnostics
                .iter()
                .all(|d| d.code == DiagnosticCode::FontFallback)
        );

        let ops = ops_of(&doc, &target);
        let tm = ops.iter().find(|o| o.operator == "Tm").unwrap();
        let x = tm.operands[4].as_float().unwrap();
        let y = tm.operands[5].as_float().unwrap();
        assert!((x - 72.0).abs() < 1e-3);
        // Baseline at top + ascent * size, flipped.
        assert!((f64::from(y) - (792.0 - (72.0 + 0.718 * 12.0))).abs() < 1e-2);
        let tj = ops.iter().find(|o| o.operator == "Tj").unwrap();
        assert_eq!(tj.operands[0].as_str().unwrap(), b"Bonjour");
    }

    #[test]
    fn missing_translation_is_skipped() {
        let (mut doc, target) = page_doc();
        let blocks = [
            block(0, BBox::new(72.0, 72.0, 300.0, 84.0), helvetica(12.0)),
            block(1, BBox::new(72.0, 100.0, 300.0, 112.0), helvetica(12.0)),
        ];
        let translations: TranslationResult = [(1, "zwei")].into_iter().collect();

        let result = insert(&mut doc, &target, &blocks, &translations, &InsertOptions::default());
        assert_eq!(result.outcomes[0].state, BlockState::Pending);
        assert_eq!(result.outcomes[1].state, BlockState::Inserted);
        assert!(
            result
                .diagnostics
                .iter()
                .any(|d| d.code == DiagnosticCode::MissingTranslation && d.block == Some(0))
        );
    }

    #[test]
    fn long_text_shrinks_and_widens() {
        let (mut doc, target) = page_doc();
        let blocks = [block(0, BBox::new(72.0, 72.0, 200.0, 90.0), helvetica(12.0))];
        let translations: TranslationResult =
            [(0, "Bonjour le monde, ceci est une traduction nettement plus longue")]
                .into_iter()
                .collect();

        let result = insert(&mut doc, &target, &blocks, &translations, &InsertOptions::default());
        let outcome = &result.outcomes[0];
        match outcome.state {
            BlockState::Inserted => assert!(outcome.font_size.unwrap() < 12.0),
            BlockState::Abandoned => assert!(
                result
                    .diagnostics
                    .iter()
                    .any(|d| d.code == DiagnosticCode::BlockAbandoned)
            ),
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[test]
    fn impossible_fit_is_abandoned_after_max_attempts() {
        let (mut doc, target) = page_doc();
        let blocks = [block(0, BBox::new(72.0, 72.0, 80.0, 74.0), helvetica(12.0))];
        let text = "word ".repeat(500);
        let translations: TranslationResult = [(0, text)].into_iter().collect();
        let options = InsertOptions {
            fit: FitPolicy {
                max_attempts: 3,
                ..FitPolicy::default()
            },
            ..InsertOptions::default()
        };

        let result = insert(&mut doc, &target, &blocks, &translations, &options);
        assert_eq!(result.abandoned(), 1);
        assert!(ops_of(&doc, &target).iter().all(|o| o.operator != "Tj"));
    }

    #[test]
    fn text_outside_win_ansi_is_reported() {
        let (mut doc, target) = page_doc();
        let blocks = [block(0, BBox::new(72.0, 72.0, 300.0, 84.0), helvetica(12.0))];
        let translations: TranslationResult = [(0, "سلام دنیا")].into_iter().collect();

        let result = insert(&mut doc, &target, &blocks, &translations, &InsertOptions::default());
        assert_eq!(result.inserted(), 1);
        let unencodable: Vec<_> = result
            .diagnostics
            .iter()
            .filter(|d| d.code == DiagnosticCode::UnencodableText)
            .collect();
        assert_eq!(unencodable.len(), 1);
        assert_eq!(unencodable[0].block, Some(0));
    }

    #[test]
    fn latin_text_is_not_reported_as_unencodable() {
        let (mut doc, target) = page_doc();
        let blocks = [block(0, BBox::new(72.0, 72.0, 300.0, 84.0), helvetica(12.0))];
        let translations: TranslationResult = [(0, "Größe café")].into_iter().collect();

        let result = insert(&mut doc, &target, &blocks, &translations, &InsertOptions::default());
        assert!(
            result
                .diagnostics
                .iter()
                .all(|d| d.code != DiagnosticCode::UnencodableText)
        );
    }

    #[test]
    fn page_font_with_same_name_is_replaced() {
        let (mut doc, target) = page_doc();
        let courier = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        doc.get_object_mut(target.page_id)
            .and_then(Object::as_dict_mut)
            .unwrap()
            .set(
                "Resources",
                dictionary! { "Font" => dictionary! { "helv" => Object::Reference(courier) } },
            );
        let blocks = [block(0, BBox::new(72.0, 72.0, 300.0, 84.0), helvetica(12.0))];
        let translations: TranslationResult = [(0, "Bonjour")].into_iter().collect();

        let result = insert(&mut doc, &target, &blocks, &translations, &InsertOptions::default());
        assert_eq!(result.outcomes[0].font.as_deref(), Some("helv"));

        let installed = page_resource(&doc, target.page_id, b"Font", "helv")
            .and_then(|o| o.as_reference().ok())
            .unwrap();
        assert_ne!(installed, courier);
        let base_font = doc
            .get_object(installed)
            .and_then(Object::as_dict)
            .and_then(|d| d.get(b"BaseFont"))
            .and_then(Object::as_name)
            .unwrap();
        assert_eq!(base_font, b"Helvetica");
    }

    #[test]
    fn right_alignment_ends_at_right_edge() {
        let (mut doc, target) = page_doc();
        let blocks = [block(0, BBox::new(72.0, 72.0, 300.0, 84.0), helvetica(12.0))];
        let translations: TranslationResult = [(0, "Hi")].into_iter().collect();
        let options = InsertOptions {
            alignment: Alignment::Right,
            ..InsertOptions::default()
        };

        insert(&mut doc, &target, &blocks, &translations, &options);
        let ops = ops_of(&doc, &target);
        let tm = ops.iter().find(|o| o.operator == "Tm").unwrap();
        let x = f64::from(tm.operands[4].as_float().unwrap());
        assert!((x - (300.0 - 0.944 * 12.0)).abs() < 1e-2);
    }

    #[test]
    fn color_and_opacity_are_carried_over() {
        let (mut doc, target) = page_doc();
        let style = TextStyle {
            color: Rgb::new(1.0, 0.0, 0.0),
            opacity: 0.5,
            ..helvetica(12.0)
        };
        let blocks = [
            block(0, BBox::new(72.0, 72.0, 300.0, 84.0), style.clone()),
            block(1, BBox::new(72.0, 100.0, 300.0, 112.0), style),
        ];
        let translations: TranslationResult = [(0, "rouge"), (1, "aussi")].into_iter().collect();

        insert(&mut doc, &target, &blocks, &translations, &InsertOptions::default());
        let ops = ops_of(&doc, &target);
        let gs: Vec<_> = ops.iter().filter(|o| o.operator == "gs").collect();
        assert_eq!(gs.len(), 2);
        assert_eq!(gs[0].operands[0].as_name().unwrap(), b"TrGS500");
        assert_eq!(gs[1].operands[0].as_name().unwrap(), b"TrGS500");
        let rg = ops.iter().find(|o| o.operator == "rg").unwrap();
        assert_eq!(rg.operands[0].as_float().unwrap(), 1.0);
        assert!(has_page_resource(&doc, target.page_id, b"ExtGState", "TrGS500"));
    }
}
