use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Input .py file, or a directory searched recursively
    pub input: PathBuf,
    /// Output directory
    pub output: PathBuf,
    /// JSON generator config
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Rust path the bindings are mounted under
    #[arg(long)]
    pub namespace: Option<String>,
    /// Crate providing `runtime` to the generated code
    #[arg(long)]
    pub runtime_crate: Option<String>,
    /// Emit wrappers for the valid definitions of files with parse errors
    #[arg(long)]
    pub emit_on_parse_error: bool,
    /// Print diagnostics as JSON lines
    #[arg(long)]
    pub json: bool,
    /// More logging (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
