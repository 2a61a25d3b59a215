use std::path::Path;

use pdftrans::BlockExtractor;

use crate::cli::OutputFormat;
use crate::shared::{open_document, print_json, resolve_pages};

pub fn run(file: &Path, pages: Option<&str>, format: OutputFormat) -> Result<(), i32> {
    let doc = open_document(file)?;
    let page_indices = resolve_pages(pages, doc.page_count())?;
    let extractor = BlockExtractor::new(doc.options());

    for idx in page_indices {
        let model = extractor.page_model(&doc, idx).map_err(|e| {
            eprintln!("Error reading page {}: {e}", idx + 1);
            1
        })?;
        let text = model.value.plain_text();
        match format {
            OutputFormat::Text => {
                println!("--- Page {} ---", idx + 1);
                println!("{text}");
            }
            OutputFormat::Json => print_json(&serde_json::json!({
                "page": idx + 1,
                "text": text,
            }))?,
        }
    }
    Ok(())
}
