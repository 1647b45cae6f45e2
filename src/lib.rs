pub mod cli;
pub mod config;
pub mod generator;
pub mod input;
pub mod model;
pub mod processor;
pub mod runtime;
pub mod writer;

use anyhow::{Context, bail};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::GeneratorConfig;
use crate::generator::{DiagnosticSeverity, FileOutput, Generator};

pub fn run() -> anyhow::Result<()> {
    let args = cli::Cli::parse();
    init_logging(args.verbose);

    // 1. ── Configure ──────────────────────────────────────────────────
    let mut config = match &args.config {
        Some(path) => input::load_config(path)?,
        None => GeneratorConfig::default(),
    };
    if let Some(namespace) = args.namespace {
        config.namespace = namespace;
    }
    if let Some(runtime_crate) = args.runtime_crate {
        config.runtime_crate = runtime_crate;
    }
    config.emit_on_parse_error |= args.emit_on_parse_error;
    let generator = Generator::new(config).with_context(|| "Configuring generator")?;

    // 2. ── Read ───────────────────────────────────────────────────────
    let paths = input::discover(&args.input)?;
    let sources = input::read_sources(&paths)?;
    info!(count = sources.len(), "modules found");

    // 3. ── Generate ───────────────────────────────────────────────────
    let outputs = generator.generate_all(&sources);
    report(&outputs, args.json, args.verbose > 0)?;

    // 4. ── Write outputs ──────────────────────────────────────────────
    writer::files::emit(&outputs, &args.output).with_context(|| "Writing generated bindings")?;

    let failed = outputs.iter().filter(|o| o.has_errors()).count();
    if failed > 0 {
        bail!("{failed} of {} file(s) had errors", outputs.len());
    }
    Ok(())
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // A second call (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Prints diagnostics, one per line. Info diagnostics are only shown when
/// asked for, or always as JSON.
fn report(outputs: &[FileOutput], json: bool, show_info: bool) -> anyhow::Result<()> {
    for diagnostic in outputs.iter().flat_map(|o| &o.diagnostics) {
        if json {
            println!("{}", serde_json::to_string(diagnostic)?);
        } else if diagnostic.severity != DiagnosticSeverity::Info || show_info {
            eprintln!("{diagnostic}");
        }
    }
    Ok(())
}
