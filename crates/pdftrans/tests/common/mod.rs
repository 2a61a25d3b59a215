//! Shared helpers for pipeline integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use lopdf::{Object, Stream, dictionary};
use pdftrans::{
    BlockExtractor, Document, DocumentTranslator, TextBlock, TranslateConfig, TranslationReport,
    Translator,
};

pub const DEJAVU_SANS: &[u8] = include_bytes!("../fixtures/fonts/DejaVuSans.ttf");

/// Build a PDF with one page per content stream.
///
/// Every page is US Letter and can use `/F1` (Helvetica, WinAnsi) and
/// `/Im0` (a 1x1 gray image).
pub fn pdf_with_pages(contents: &[&[u8]]) -> Vec<u8> {
    pdf_with_font(contents, None)
}

/// Like [`pdf_with_pages`], but `/F1` is the TrueType program `ttf`
/// embedded as `ABCDEF+DejaVuSans`.
pub fn pdf_with_embedded_font(contents: &[&[u8]], ttf: &[u8]) -> Vec<u8> {
    pdf_with_font(contents, Some(ttf))
}

fn pdf_with_font(contents: &[&[u8]], ttf: Option<&[u8]>) -> Vec<u8> {
    let mut doc = lopdf::Document::with_version("1.5");
    let font = match ttf {
        None => dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        },
        Some(program) => {
            let file_id = doc.add_object(Stream::new(
                dictionary! { "Length1" => Object::Integer(program.len() as i64) },
                program.to_vec(),
            ));
            let descriptor_id = doc.add_object(dictionary! {
                "Type" => "FontDescriptor",
                "FontName" => "ABCDEF+DejaVuSans",
                "Flags" => Object::Integer(32),
                "Ascent" => Object::Integer(928),
                "Descent" => Object::Integer(-236),
                "FontFile2" => Object::Reference(file_id),
            });
            dictionary! {
                "Type" => "Font",
                "Subtype" => "TrueType",
                "BaseFont" => "ABCDEF+DejaVuSans",
                "Encoding" => "WinAnsiEncoding",
                "FontDescriptor" => Object::Reference(descriptor_id),
            }
        }
    };
    let font_id = doc.add_object(font);
    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => Object::Integer(1),
            "Height" => Object::Integer(1),
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => Object::Integer(8),
        },
        vec![0x80],
    ));
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => Object::Reference(font_id) },
        "XObject" => dictionary! { "Im0" => Object::Reference(image_id) },
    });

    let mut kids = Vec::new();
    for content in contents {
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Contents" => Object::Reference(content_id),
            "Resources" => Object::Reference(resources_id),
        });
        kids.push(Object::Reference(page_id));
    }
    let page_ids: Vec<_> = kids.iter().filter_map(|k| k.as_reference().ok()).collect();
    let pages_id = doc.add_object(dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => Object::Integer(contents.len() as i64),
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(612),
            Object::Integer(792),
        ],
    });
    for page_id in page_ids {
        if let Ok(dict) = doc.get_object_mut(page_id).and_then(Object::as_dict_mut) {
            dict.set("Parent", Object::Reference(pages_id));
        }
    }
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

/// Content showing `text` with its top-left corner near (`x`, `top`) in
/// top-left page coordinates.
pub fn text_at(x: f64, top: f64, size: f64, text: &str) -> String {
    let baseline = 792.0 - top - size * 0.8;
    format!("BT /F1 {size} Tf {x} {baseline} Td ({text}) Tj ET\n")
}

pub struct Run {
    pub dir: tempfile::TempDir,
    pub input: PathBuf,
    pub output: PathBuf,
    pub report: TranslationReport,
}

impl Run {
    pub fn output_doc(&self) -> Document {
        Document::open_file(&self.output, None).unwrap()
    }
}

/// Write `pdf` to a temporary directory and translate it into `out/out.pdf`.
pub fn translate_with<T: Translator + ?Sized>(pdf: &[u8], translator: &T) -> Run {
    translate_config_with(pdf, translator, |_| {})
}

pub fn translate_config_with<T: Translator + ?Sized>(
    pdf: &[u8],
    translator: &T,
    adjust: impl FnOnce(&mut TranslateConfig),
) -> Run {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.pdf");
    std::fs::write(&input, pdf).unwrap();
    let output = dir.path().join("out").join("out.pdf");
    let mut config = TranslateConfig::new(&input, &output, "French");
    adjust(&mut config);
    let report = DocumentTranslator::new(config, translator).run().unwrap();
    Run {
        dir,
        input,
        output,
        report,
    }
}

pub fn blocks(doc: &Document, page: usize) -> Vec<TextBlock> {
    BlockExtractor::new(doc.options())
        .text_blocks(doc, page)
        .unwrap()
        .value
}

pub fn blocks_of(path: &Path, page: usize) -> Vec<TextBlock> {
    blocks(&Document::open_file(path, None).unwrap(), page)
}

/// Names under the page's `/Resources /Font`.
pub fn font_resource_names(doc: &Document, page: usize) -> Vec<String> {
    let page_id = doc.page_id(page).unwrap();
    let resources = pdftrans::pdftrans_parse::lopdf_backend::page_resources(doc.lopdf(), page_id)
        .unwrap();
    let fonts = pdftrans::pdftrans_parse::lopdf_backend::dict_entry(doc.lopdf(), resources, b"Font")
        .unwrap();
    fonts
        .iter()
        .map(|(name, _)| String::from_utf8_lossy(name).into_owned())
        .collect()
}

/// Decoded content of a page.
pub fn page_content(doc: &Document, page: usize) -> Vec<u8> {
    let page_id = doc.page_id(page).unwrap();
    let dict = doc
        .lopdf()
        .get_object(page_id)
        .and_then(Object::as_dict)
        .unwrap();
    pdftrans::pdftrans_parse::lopdf_backend::page_content_bytes(doc.lopdf(), dict).unwrap()
}
