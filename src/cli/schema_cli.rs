use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "maroonschema")]
pub struct SchemaCli {
    /// The output file to dump the schema of the IR into; stdout when
    /// omitted.
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Set to output the Rust schema, keep unset for the Markdown schema.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub rust: bool,
}
