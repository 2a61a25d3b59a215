mod blocks_cmd;
mod cli;
mod fonts_cmd;
mod logging;
mod page_range;
mod shared;
mod text_cmd;
mod translate_cmd;

use clap::Parser;
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result = match cli.command {
        Commands::Translate(ref args) => translate_cmd::run(args),
        Commands::Blocks {
            ref file,
            ref pages,
            format,
        } => blocks_cmd::run(file, pages.as_deref(), format),
        Commands::Text {
            ref file,
            ref pages,
            format,
        } => text_cmd::run(file, pages.as_deref(), format),
        Commands::Fonts { ref file, format } => fonts_cmd::run(file, format),
    };

    if let Err(code) = result {
        std::process::exit(code);
    }
}
