use std::{path::PathBuf, process::ExitCode};

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use wavport_core::{Converter, ConverterConfig};

#[derive(Parser)]
#[command(name = "wavport", version, about = "Convert MP3 / Ogg Vorbis files to 16-bit PCM WAV")]
struct Cli {
    /// Log at debug level (RUST_LOG wins when set)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert inputs and print one output path per line
    Convert {
        /// res://, user:// or filesystem paths
        #[arg(required = true)]
        inputs: Vec<String>,

        #[command(flatten)]
        common: Common,
    },
    /// Delete every converted WAV in the output directory
    Clean {
        #[command(flatten)]
        common: Common,
    },
}

#[derive(Args)]
struct Common {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides the configured output directory
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

impl Common {
    fn converter(&self) -> Result<Converter> {
        let cfg = match &self.config {
            Some(path) => ConverterConfig::from_file(path)?,
            None => ConverterConfig::from_env()?,
        };
        let mut builder = Converter::builder().config(cfg);
        if let Some(dir) = &self.output_dir {
            builder = builder.output_dir(dir);
        }
        Ok(builder.build()?)
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<bool> {
    match cli.command {
        Command::Convert { inputs, common } => {
            let converter = common.converter()?;
            let mut ok = true;
            for input in &inputs {
                match converter.convert_to_wav(input) {
                    Ok(path) => println!("{}", path.display()),
                    Err(e) => {
                        eprintln!("{input}: [{}] {e}", e.kind());
                        ok = false;
                    }
                }
            }
            Ok(ok)
        }
        Command::Clean { common } => {
            let converter = common.converter()?;
            let report = converter.cleanup_converted_files();
            for failure in &report.failures {
                eprintln!("[{}] {failure}", failure.kind());
            }
            println!(
                "removed {} file(s) from {}, {} failed",
                report.removed.len(),
                converter.output_dir().display(),
                report.failures.len()
            );
            Ok(report.failures.is_empty())
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
