use clap::Parser;
use maroon::cli::diff_cli::DiffCli;
use maroonlang::canon;
use maroonlang::ir::Program;
use std::fs;
use std::path::Path;
use std::process;

fn load(path: &Path) -> Program {
    let text = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Failed to read the IR JSON from `{}`: {e}.", path.display());
        process::exit(1);
    });
    canon::parse_json(&text).unwrap_or_else(|e| {
        eprintln!("Failed to parse the IR JSON from `{}`: {e}.", path.display());
        process::exit(1);
    })
}

fn main() {
    let cli = DiffCli::parse();

    let a = load(&cli.a);
    let b = load(&cli.b);

    let sa = canon::canonical_json_no_lines(&a).unwrap_or_else(|e| {
        eprintln!("Failed to canonicalize `{}`: {e}.", cli.a.display());
        process::exit(1);
    });
    let sb = canon::canonical_json_no_lines(&b).unwrap_or_else(|e| {
        eprintln!("Failed to canonicalize `{}`: {e}.", cli.b.display());
        process::exit(1);
    });

    if sa != sb {
        println!("The IR JSONs are not identical.");
        if cli.verbose {
            println!("\n{sa}\n{sb}\n");
        }
        process::exit(1);
    }
}
