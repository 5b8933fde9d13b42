//! `churi` CLI: convert between JSON and charges from the command line.
//!
//! ## Usage
//!
//! ```sh
//! # Encode JSON to a charge (stdin → stdout)
//! echo '{"search":"rust","page":2}' | churi encode
//!
//! # Encode from file to file
//! churi encode -i query.json -o query.txt
//!
//! # Decode a charge back to pretty-printed JSON
//! echo 'search(rust)page(2)' | churi decode
//!
//! # Reject charges with trailing unparsed input
//! churi decode --strict -i query.txt
//!
//! # Compare JSON and charge sizes
//! churi stats -i query.json
//! ```
//!
//! Set `RUST_LOG` (or pass `-v`) to see decoder diagnostics on stderr.

use std::io::{self, Read};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "churi",
    version,
    about = "Charged URI CLI: structured data inside URI components"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log decoder diagnostics to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode JSON to a charge
    Encode {
        /// Input file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Decode a charge to JSON
    Decode {
        /// Input file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
        /// Fail when the charge is not consumed up to the end
        #[arg(long)]
        strict: bool,
    },
    /// Compare the sizes of a JSON document and its charge
    Stats {
        /// Input JSON file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Encode { input, output } => {
            let json = read_input(input.as_deref())?;
            let charge = churi_core::encode_json(&json).context("Failed to encode JSON")?;
            let Some(charge) = charge else {
                bail!("JSON input has no charge representation");
            };
            write_output(output.as_deref(), &charge)?;
        }
        Commands::Decode {
            input,
            output,
            strict,
        } => {
            let raw = read_input(input.as_deref())?;
            let charge = raw.trim_end_matches(['\n', '\r']);
            let parsed = churi_core::decode(charge).context("Failed to decode charge")?;
            if parsed.end < charge.len() {
                if strict {
                    bail!(
                        "Unparsed input at offset {}: {:?}",
                        parsed.end,
                        &charge[parsed.end..]
                    );
                }
                debug!(end = parsed.end, "ignoring trailing input");
            }
            let pretty = serde_json::to_string_pretty(&parsed.charge)?;
            write_output(output.as_deref(), &pretty)?;
        }
        Commands::Stats { input } => {
            let json = read_input(input.as_deref())?;
            let value: serde_json::Value =
                serde_json::from_str(&json).context("Failed to parse JSON")?;
            let compact = serde_json::to_string(&value)?;
            let uri_json = utf8_percent_encode(&compact, NON_ALPHANUMERIC).to_string();
            let charge = churi_core::encode(&value).unwrap_or_default();

            let ratio = if uri_json.is_empty() {
                0.0
            } else {
                (1.0 - (charge.len() as f64 / uri_json.len() as f64)) * 100.0
            };
            println!("JSON size:         {} bytes", compact.len());
            println!("URI-encoded JSON:  {} bytes", uri_json.len());
            println!("Charge size:       {} bytes", charge.len());
            println!("Reduction:         {:.1}%", ratio);
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let env_filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&str>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
