use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "maroondiff")]
pub struct DiffCli {
    /// One IR file as JSON.
    #[arg(long)]
    pub a: PathBuf,

    /// Another IR file as JSON.
    #[arg(long)]
    pub b: PathBuf,

    /// Actually dump both post-line-nullified JSONs.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub verbose: bool,
}
