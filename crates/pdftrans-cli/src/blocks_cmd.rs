use std::path::Path;

use pdftrans::{BlockExtractor, ExtractedStyle};

use crate::cli::OutputFormat;
use crate::shared::{open_document, print_json, resolve_pages};

pub fn run(file: &Path, pages: Option<&str>, format: OutputFormat) -> Result<(), i32> {
    let doc = open_document(file)?;
    let page_indices = resolve_pages(pages, doc.page_count())?;
    let extractor = BlockExtractor::new(doc.options());

    if format == OutputFormat::Text {
        println!("page\tid\tx0\ttop\tx1\tbottom\tsize\tfont\tcolor\topacity\tstyle\ttext");
    }

    for idx in page_indices {
        let blocks = extractor.text_blocks(&doc, idx).map_err(|e| {
            eprintln!("Error reading page {}: {e}", idx + 1);
            1
        })?;
        for warning in &blocks.diagnostics {
            tracing::warn!("{warning}");
        }

        for block in &blocks.value {
            let style = block.style.style();
            let source = match &block.style {
                ExtractedStyle::Styled(_) => "styled".to_string(),
                ExtractedStyle::Defaulted(_, reason) => format!("defaulted: {reason}"),
            };
            match format {
                OutputFormat::Text => println!(
                    "{}\t{}\t{:.2}\t{:.2}\t{:.2}\t{:.2}\t{:.2}\t{}\t#{:06x}\t{:.2}\t{}\t{}",
                    idx + 1,
                    block.id,
                    block.bbox.x0,
                    block.bbox.top,
                    block.bbox.x1,
                    block.bbox.bottom,
                    style.font_size,
                    style.font_family,
                    style.color.to_packed(),
                    style.opacity,
                    source,
                    block.text.replace('\n', " "),
                ),
                OutputFormat::Json => print_json(&serde_json::json!({
                    "page": idx + 1,
                    "id": block.id,
                    "bbox": [block.bbox.x0, block.bbox.top, block.bbox.x1, block.bbox.bottom],
                    "font_size": style.font_size,
                    "font": style.font_family,
                    "color": [style.color.r, style.color.g, style.color.b],
                    "opacity": style.opacity,
                    "style": source,
                    "text": block.text,
                }))?,
            }
        }
    }
    Ok(())
}
