//! Trace-driven DRAM simulator CLI.
//!
//! This binary loads a YAML-shaped configuration document, applies any
//! dotted-path overrides from the command line, builds a `MemorySystem`,
//! runs it to completion, and prints the resulting nested stats tree.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use dram_core::config::Config;
use dram_core::stats::Stats;
use dram_core::system::MemorySystem;

#[derive(Parser, Debug)]
#[command(
    name = "dramsim",
    author,
    version,
    about = "Cycle-accurate DRAM simulator",
    long_about = "Run a trace against a configured DRAM standard, controller, and RowHammer mitigation plugin chain.\n\nExamples:\n  dramsim -c configs/ddr4.yaml\n  dramsim -c configs/ddr4.yaml -o controller.plugins.0.params.threshold=0.01\n  dramsim -c configs/ddr4.yaml --format text"
)]
struct Cli {
    /// Path to the YAML configuration document.
    #[arg(short, long)]
    config: PathBuf,

    /// Dotted-path override, e.g. `system.max_cycles=100000`. May be repeated.
    #[arg(short = 'o', long = "override", value_name = "PATH=VALUE")]
    overrides: Vec<String>,

    /// Stats output format.
    #[arg(long, value_enum, default_value_t = StatsFormat::Json)]
    format: StatsFormat,
}

#[derive(Copy, Clone, Debug, clap::ValueEnum)]
enum StatsFormat {
    /// Indented text tree (`StatBlock::render`).
    Text,
    /// Pretty-printed JSON.
    Json,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("configuration error: {message}");
            process::exit(1);
        }
    };

    let mut system = match MemorySystem::new(&config) {
        Ok(system) => system,
        Err(e) => {
            eprintln!("failed to build memory system: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = system.run() {
        eprintln!("fatal simulation error: {e}");
        process::exit(1);
    }

    let stats = system.stats();
    match cli.format {
        StatsFormat::Text => print!("{}", stats.render()),
        StatsFormat::Json => match serde_json::to_string_pretty(&stats) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("failed to serialize stats: {e}");
                process::exit(1);
            }
        },
    }
}

fn load_config(cli: &Cli) -> Result<Config, String> {
    let base_dir = cli.config.parent().unwrap_or(std::path::Path::new("."));
    let text = std::fs::read_to_string(&cli.config).map_err(|e| format!("reading {}: {e}", cli.config.display()))?;

    let overrides: Vec<(String, String)> = cli
        .overrides
        .iter()
        .filter_map(|entry| entry.split_once('=').map(|(k, v)| (k.to_string(), v.to_string())))
        .collect();

    Config::from_yaml_str_with_overrides(&text, base_dir, &overrides).map_err(|e| e.to_string())
}
