use pdftrans::{Alignment, DocumentTranslator, IdentityTranslator, TranslateConfig, Translator};

use crate::cli::{AlignArg, Backend, OutputFormat, TranslateArgs};

pub fn run(args: &TranslateArgs) -> Result<(), i32> {
    if !args.file.exists() {
        eprintln!("Error: file not found: {}", args.file.display());
        return Err(1);
    }

    let config = TranslateConfig {
        context_window: args.window,
        max_fit_attempts: args.max_attempts,
        shrink_factor: args.shrink_factor,
        alignment: match args.align {
            AlignArg::Left => Alignment::Left,
            AlignArg::Right => Alignment::Right,
        },
        ..TranslateConfig::new(&args.file, &args.output, &args.target_language)
    };

    match args.backend {
        Backend::Identity => translate(config, &IdentityTranslator, args.format),
        Backend::Ollama => ollama(config, args),
    }
}

#[cfg(feature = "ollama")]
fn ollama(config: TranslateConfig, args: &TranslateArgs) -> Result<(), i32> {
    let translator = pdftrans::OllamaTranslator::new(pdftrans::OllamaConfig {
        base_url: args.ollama_url.clone(),
        model: args.model.clone(),
        max_retries: args.retries,
        ..pdftrans::OllamaConfig::default()
    })
    .map_err(|e| {
        eprintln!("Error: failed to set up the Ollama client: {e}");
        1
    })?;
    translate(config, &translator, args.format)
}

#[cfg(not(feature = "ollama"))]
fn ollama(_config: TranslateConfig, _args: &TranslateArgs) -> Result<(), i32> {
    eprintln!("Error: this build has no Ollama support; use --backend identity");
    Err(2)
}

fn translate<T: Translator>(
    config: TranslateConfig,
    translator: &T,
    format: OutputFormat,
) -> Result<(), i32> {
    let report = DocumentTranslator::new(config, translator).run().map_err(|e| {
        eprintln!("Error: {e}");
        1
    })?;

    match format {
        OutputFormat::Text => {
            for page in &report.pages {
                println!(
                    "page {}\t{:?}\tblocks {}\tinserted {}\tdropped {}\tmissing {}",
                    page.index + 1,
                    page.status,
                    page.blocks,
                    page.inserted,
                    page.abandoned,
                    page.missing
                );
            }
            println!("{}", report.summary());
            eprintln!("Wrote {}", report.output.display());
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&report).map_err(|e| {
                eprintln!("Error: failed to serialize report: {e}");
                1
            })?;
            println!("{json}");
        }
    }
    Ok(())
}
