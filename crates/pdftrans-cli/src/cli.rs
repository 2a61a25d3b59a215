use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

/// Translate PDF documents while keeping their layout.
#[derive(Debug, Parser)]
#[command(name = "pdftrans", about, version)]
pub struct Cli {
    /// Log more (-v: info, -vv: debug). RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Translate every page of a PDF into a new file
    Translate(TranslateArgs),

    /// List the translatable text blocks of each page
    Blocks {
        /// Path to the PDF file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Page range (e.g. '1,3-5'). Default: all pages
        #[arg(long)]
        pages: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Print the plain text of each page
    Text {
        /// Path to the PDF file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Page range (e.g. '1,3-5'). Default: all pages
        #[arg(long)]
        pages: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// List the fonts the document declares
    Fonts {
        /// Path to the PDF file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

#[derive(Debug, Args)]
pub struct TranslateArgs {
    /// Path to the PDF file
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Target language, e.g. 'German'
    #[arg(long = "to", value_name = "LANG")]
    pub target_language: String,

    /// Output path; missing directories are created
    #[arg(short, long, value_name = "OUT")]
    pub output: PathBuf,

    /// Neighbor pages on each side sent as context
    #[arg(long, default_value_t = 1)]
    pub window: usize,

    /// Layout attempts per block before it is dropped
    #[arg(long, default_value_t = 10)]
    pub max_attempts: usize,

    /// Font size divisor applied when text overflows
    #[arg(long, default_value_t = 1.2)]
    pub shrink_factor: f64,

    /// Horizontal alignment of translated text
    #[arg(long, value_enum, default_value_t = AlignArg::Left)]
    pub align: AlignArg,

    /// Translation backend
    #[arg(long, value_enum, default_value_t = Backend::Ollama)]
    pub backend: Backend,

    /// Ollama server URL
    #[arg(long, env = "PDFTRANS_OLLAMA_URL", default_value = "http://localhost:11434")]
    pub ollama_url: String,

    /// Ollama model name
    #[arg(long, env = "PDFTRANS_MODEL", default_value = "gemma3:27b")]
    pub model: String,

    /// Attempts per page against the translation backend
    #[arg(long, default_value_t = 10)]
    pub retries: usize,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Output format for every subcommand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON output
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AlignArg {
    Left,
    /// For right-to-left target languages
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// A local Ollama server
    Ollama,
    /// Write the original text back (layout dry run)
    Identity,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn translate_defaults() {
        let cli = Cli::parse_from(["pdftrans", "translate", "in.pdf", "--to", "German", "-o", "out.pdf"]);
        let Commands::Translate(args) = cli.command else {
            panic!("expected translate");
        };
        assert_eq!(args.target_language, "German");
        assert_eq!(args.window, 1);
        assert_eq!(args.max_attempts, 10);
        assert_eq!(args.shrink_factor, 1.2);
        assert_eq!(args.align, AlignArg::Left);
        assert_eq!(args.backend, Backend::Ollama);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn verbosity_is_counted_anywhere() {
        let cli = Cli::parse_from(["pdftrans", "fonts", "a.pdf", "-vv"]);
        assert_eq!(cli.verbose, 2);
    }
}
