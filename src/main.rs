use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tsdgen::{logging, pipeline, Config};

#[derive(Parser, Debug)]
#[command(name = "tsdgen", version, about = "TypeScript declaration generator")]
struct Cli {
    /// Enable verbose debug logging (or set TSDGEN_DEBUG=1)
    #[arg(short, long)]
    debug: bool,

    /// Configuration file (default: tsdgen.toml when present)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate .d.ts files from the doclet dumps
    Generate {
        /// Options doclet tree (JSON)
        #[arg(long, value_name = "FILE")]
        options: PathBuf,
        /// Namespace doclet tree (JSON)
        #[arg(long, value_name = "FILE")]
        namespace: PathBuf,
        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        out: PathBuf,
        /// Only keep options documented for this product
        #[arg(long, value_name = "NAME")]
        product: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_tracing(cli.debug || logging::debug_from_env());

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from_path(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::load_or_default().context("failed to load tsdgen.toml")?,
    };

    match cli.command {
        Command::Generate {
            options,
            namespace,
            out,
            product,
        } => {
            if product.is_some() {
                config.generator.product = product;
            }
            let inputs = pipeline::Inputs {
                options,
                namespace,
                out_dir: out,
            };
            let report = pipeline::run(&config, &inputs).context("generation failed")?;
            println!(
                "Wrote {} declaration files to {} ({} relocated, {} warnings)",
                report.written.len() * 2,
                inputs.out_dir.display(),
                report.relocated,
                report.warnings.len()
            );
        }
    }
    Ok(())
}
