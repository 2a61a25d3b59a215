use std::path::Path;

use pdftrans::FontTable;

use crate::cli::OutputFormat;
use crate::shared::{open_document, print_json};

pub fn run(file: &Path, format: OutputFormat) -> Result<(), i32> {
    let doc = open_document(file)?;
    let table = FontTable::build(doc.lopdf());

    match format {
        OutputFormat::Text => {
            println!("resource\tbase_font\tnormalized\tprogram");
            for entry in table.entries() {
                println!(
                    "{}\t{}\t{}\t{}",
                    entry.resource_name,
                    entry.base_font,
                    entry.normalized_id,
                    entry.program.as_str()
                );
            }
        }
        OutputFormat::Json => {
            let fonts: Vec<_> = table
                .entries()
                .iter()
                .map(|entry| {
                    serde_json::json!({
                        "resource_name": entry.resource_name,
                        "base_font": entry.base_font,
                        "normalized_id": entry.normalized_id,
                        "program": entry.program.as_str(),
                    })
                })
                .collect();
            print_json(&serde_json::Value::Array(fonts))?;
        }
    }
    Ok(())
}
