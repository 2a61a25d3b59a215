//! End-to-end runs of the translation pipeline on generated PDFs.

mod common;

use std::cell::RefCell;

use common::{
    DEJAVU_SANS, blocks, blocks_of, font_resource_names, page_content, pdf_with_embedded_font,
    pdf_with_pages, text_at, translate_config_with, translate_with,
};
use pdftrans::{
    Alignment, DiagnosticCode, Document, IdentityTranslator, PageStatus, TranslationRequest,
    TranslationResult,
};

fn no_translation(_: &TranslationRequest) -> TranslationResult {
    TranslationResult::new()
}

#[test]
fn hello_world_is_replaced_in_place() {
    let content = text_at(72.0, 72.0, 12.0, "Hello World");
    let pdf = pdf_with_pages(&[content.as_bytes()]);
    let original = blocks(&Document::open(&pdf, None).unwrap(), 0);
    assert_eq!(original.len(), 1);

    let translator = |r: &TranslationRequest| -> TranslationResult {
        assert_eq!(r.blocks.len(), 1);
        assert_eq!(r.blocks[0].text, "Hello World");
        [(0, "Bonjour le monde")].into_iter().collect()
    };
    let run = translate_with(&pdf, &translator);

    assert_eq!(run.report.pages[0].status, PageStatus::Translated);
    assert_eq!(run.report.pages[0].inserted, 1);
    assert_eq!(run.report.blocks_abandoned(), 0);

    let out = blocks_of(&run.output, 0);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].text, "Bonjour le monde");
    assert!((out[0].bbox.x0 - original[0].bbox.x0).abs() < 1.0);
    assert!((out[0].bbox.top - original[0].bbox.top).abs() < 2.0);
    // The longer text is shrunk rather than wrapped below the original line.
    assert!(out[0].style.style().font_size <= 12.0);
}

#[test]
fn empty_translation_leaves_page_untouched() {
    let content = [
        text_at(72.0, 72.0, 12.0, "First"),
        text_at(72.0, 150.0, 12.0, "Second"),
        text_at(72.0, 250.0, 12.0, "Third"),
    ]
    .concat();
    let pdf = pdf_with_pages(&[content.as_bytes()]);
    let run = translate_with(&pdf, &no_translation);

    let page = &run.report.pages[0];
    assert_eq!(page.status, PageStatus::Untranslated);
    assert_eq!(page.blocks, 3);
    assert_eq!(run.report.with_code(&DiagnosticCode::EmptyTranslation).count(), 1);

    let input = Document::open(&pdf, None).unwrap();
    assert_eq!(page_content(&run.output_doc(), 0), page_content(&input, 0));
    let texts: Vec<_> = blocks_of(&run.output, 0).into_iter().map(|b| b.text).collect();
    assert_eq!(texts, vec!["First", "Second", "Third"]);
}

#[test]
fn five_times_longer_text_fits_smaller_or_is_dropped() {
    let content = text_at(72.0, 72.0, 12.0, "Short text here");
    let pdf = pdf_with_pages(&[content.as_bytes()]);
    let translator = |r: &TranslationRequest| -> TranslationResult {
        r.blocks
            .iter()
            .map(|b| (b.id, [b.text.as_str(); 5].join(" ")))
            .collect()
    };
    let run = translate_with(&pdf, &translator);

    let page = &run.report.pages[0];
    assert_eq!(page.status, PageStatus::Translated);
    assert_eq!(page.inserted + page.abandoned, 1);
    if page.inserted == 1 {
        let out = blocks_of(&run.output, 0);
        assert!(out.iter().all(|b| b.style.style().font_size < 12.0));
        assert!(out.iter().all(|b| b.bbox.x1 <= 612.0 + 1e-6));
    } else {
        assert_eq!(run.report.with_code(&DiagnosticCode::BlockAbandoned).count(), 1);
    }
}

#[test]
fn no_text_page_is_left_untouched() {
    let image_only = b"q 100 0 0 100 72 600 cm /Im0 Do Q".as_slice();
    let pdf = pdf_with_pages(&[image_only]);
    let calls = RefCell::new(0);
    let translator = |_: &TranslationRequest| -> TranslationResult {
        *calls.borrow_mut() += 1;
        TranslationResult::new()
    };
    let run = translate_with(&pdf, &translator);

    assert_eq!(*calls.borrow(), 0);
    assert_eq!(run.report.pages[0].status, PageStatus::NoText);
    let input = Document::open(&pdf, None).unwrap();
    assert_eq!(page_content(&run.output_doc(), 0), page_content(&input, 0));
}

#[test]
fn translations_follow_their_block_ids() {
    let content = [
        text_at(72.0, 72.0, 12.0, "alpha"),
        text_at(72.0, 200.0, 12.0, "beta"),
        text_at(72.0, 400.0, 12.0, "gamma"),
    ]
    .concat();
    let pdf = pdf_with_pages(&[content.as_bytes()]);
    let original = blocks(&Document::open(&pdf, None).unwrap(), 0);
    let ids: Vec<_> = original.iter().map(|b| b.id).collect();
    assert_eq!(ids, vec![0, 1, 2]);

    let translator = |r: &TranslationRequest| -> TranslationResult {
        r.blocks
            .iter()
            .map(|b| (b.id, format!("T{} {}", b.id, b.text.to_uppercase())))
            .collect()
    };
    let run = translate_with(&pdf, &translator);

    let out = blocks_of(&run.output, 0);
    assert_eq!(out.len(), 3);
    for (before, after) in original.iter().zip(&out) {
        assert_eq!(after.text, format!("T{} {}", before.id, before.text.to_uppercase()));
        assert!((after.bbox.top - before.bbox.top).abs() < 2.0);
    }
}

#[test]
fn partial_translation_keeps_run_going() {
    let content = [
        text_at(72.0, 72.0, 12.0, "kept"),
        text_at(72.0, 200.0, 12.0, "translated"),
    ]
    .concat();
    let pdf = pdf_with_pages(&[content.as_bytes()]);
    let translator =
        |_: &TranslationRequest| -> TranslationResult { [(1, "traduit")].into_iter().collect() };
    let run = translate_with(&pdf, &translator);

    let page = &run.report.pages[0];
    assert_eq!(page.status, PageStatus::Translated);
    assert_eq!(page.missing, 1);
    assert_eq!(page.inserted, 1);
    assert_eq!(run.report.with_code(&DiagnosticCode::MissingTranslation).count(), 1);
}

#[test]
fn context_comes_from_neighbor_pages() {
    let pages: Vec<String> = ["one", "two", "three"]
        .iter()
        .map(|t| text_at(72.0, 72.0, 12.0, &format!("page {t}")))
        .collect();
    let refs: Vec<&[u8]> = pages.iter().map(|p| p.as_bytes()).collect();
    let pdf = pdf_with_pages(&refs);

    let seen = RefCell::new(Vec::new());
    let translator = |r: &TranslationRequest| -> TranslationResult {
        seen.borrow_mut().push(r.clone());
        TranslationResult::new()
    };
    translate_with(&pdf, &translator);

    let seen = seen.into_inner();
    assert_eq!(seen.len(), 3);
    assert!(seen[0].previous_pages.is_empty());
    assert_eq!(seen[0].next_pages, vec!["page two"]);
    assert_eq!(seen[1].previous_pages, vec!["page one"]);
    assert_eq!(seen[1].next_pages, vec!["page three"]);
    assert_eq!(seen[2].previous_pages, vec!["page two"]);
    assert!(seen[2].next_pages.is_empty());
    assert!(seen.iter().all(|r| r.target_language == "French"));
}

#[test]
fn fallback_font_is_registered_once_per_document() {
    let a = text_at(72.0, 72.0, 12.0, "first page");
    let b = text_at(72.0, 72.0, 12.0, "second page");
    let pdf = pdf_with_pages(&[a.as_bytes(), b.as_bytes()]);
    let run = translate_with(&pdf, &IdentityTranslator);

    assert_eq!(run.report.translated_pages(), 2);
    assert_eq!(run.report.font_registrations, 1);
}

#[test]
fn shared_embedded_font_is_registered_once() {
    let a = text_at(72.0, 72.0, 12.0, "first page");
    let b = text_at(72.0, 72.0, 12.0, "second page");
    let pdf = pdf_with_embedded_font(&[a.as_bytes(), b.as_bytes()], DEJAVU_SANS);
    let translator = |r: &TranslationRequest| -> TranslationResult {
        r.blocks.iter().map(|b| (b.id, "Grüße")).collect()
    };
    let run = translate_with(&pdf, &translator);

    assert_eq!(run.report.translated_pages(), 2);
    assert_eq!(run.report.blocks_inserted(), 2);
    assert_eq!(run.report.font_registrations, 1);
    assert_eq!(run.report.with_code(&DiagnosticCode::FontFallback).count(), 0);
    assert_eq!(run.report.with_code(&DiagnosticCode::GlyphFallback).count(), 0);

    let out = run.output_doc();
    let first: Vec<_> = font_resource_names(&out, 0)
        .into_iter()
        .filter(|n| n.starts_with("TF"))
        .collect();
    let second: Vec<_> = font_resource_names(&out, 1)
        .into_iter()
        .filter(|n| n.starts_with("TF"))
        .collect();
    assert_eq!(first.len(), 1);
    assert_eq!(first, second);

    let texts: Vec<_> = blocks_of(&run.output, 1).into_iter().map(|b| b.text).collect();
    assert_eq!(texts, vec!["Grüße"]);
}

#[test]
fn right_alignment_moves_short_text_right() {
    let content = [
        text_at(72.0, 72.0, 12.0, "a much longer heading line"),
        text_at(72.0, 84.0, 12.0, "x"),
    ]
    .concat();
    let pdf = pdf_with_pages(&[content.as_bytes()]);
    let translator = |r: &TranslationRequest| -> TranslationResult {
        r.blocks.iter().map(|b| (b.id, "ok")).collect()
    };
    let run = translate_config_with(&pdf, &translator, |c| c.alignment = Alignment::Right);

    let original = blocks(&Document::open(&pdf, None).unwrap(), 0);
    let out = blocks_of(&run.output, 0);
    assert_eq!(out.len(), 1);
    assert!((out[0].bbox.x1 - original[0].bbox.x1).abs() < 1.0);
}

#[test]
fn output_directories_are_created() {
    let content = text_at(72.0, 72.0, 12.0, "Hello");
    let pdf = pdf_with_pages(&[content.as_bytes()]);
    let run = translate_with(&pdf, &IdentityTranslator);
    assert!(run.output.exists());
    assert!(run.input.exists());
    assert_eq!(run.output_doc().page_count(), 1);
    drop(run.dir);
}
