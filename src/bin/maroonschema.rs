use clap::Parser;
use maroon::cli::schema_cli::SchemaCli;
use maroonlang::describe;
use std::fs;
use std::process;

fn main() {
    let cli = SchemaCli::parse();

    let text = if cli.rust {
        describe::to_rust()
    } else {
        describe::to_markdown()
    };

    match &cli.out {
        Some(path) => {
            fs::write(path, &text).unwrap_or_else(|e| {
                eprintln!("Failed to write the schema to `{}`: {e}.", path.display());
                process::exit(1);
            });
        }
        None => print!("{text}"),
    }
}
