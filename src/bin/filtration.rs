//! filtration CLI - apply field rules to a JSON or YAML data file
//!
//! Reads a data document and a rule file, runs the filters and prints the
//! filtered fields as JSON on stdout.

use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use filtration::{extraction, Bag, Filtration, RuleSet, Value};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "filtration")]
#[command(version, about = "Apply field filter rules to a JSON or YAML document", long_about = None)]
struct Cli {
    /// Path to the data document (JSON or YAML mapping)
    #[arg(short, long)]
    data: PathBuf,

    /// Path to the rule file (`rules: {field: "rule"}`)
    #[arg(short, long, default_value = "rules.yaml")]
    rules: PathBuf,

    /// Pretty-print the JSON output
    #[arg(short, long)]
    pretty: bool,

    /// Exit with status 1 if any field fails
    #[arg(short, long)]
    strict: bool,

    /// Print the whole document with filtered values written in place
    #[arg(short, long)]
    all: bool,
}

fn main() {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing (stderr, so stdout stays clean JSON)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let data = load_data(&cli.data)?;

    let rule_set = RuleSet::load_from_file(&cli.rules).map_err(|e| e.to_string())?;
    tracing::info!(
        "Loaded {} rule(s) from {}",
        rule_set.len(),
        cli.rules.display()
    );

    let mut filtration = Filtration::new(&data);
    filtration.attach_rule_set(&rule_set);

    let outcome = filtration.filtering();
    for error in filtration.errors().values() {
        tracing::error!("{}", error);
    }

    let output = if cli.all {
        // dotted results go back into the nested map they came from
        let mut merged = data.clone();
        for (field, value) in filtration.filtered_data() {
            extraction::assign(&mut merged, &field, value);
        }
        merged
    } else {
        filtration.filtered_data()
    };

    let json = if cli.pretty {
        serde_json::to_string_pretty(&output)
    } else {
        serde_json::to_string(&output)
    }
    .map_err(|e| format!("Failed to serialize output: {}", e))?;
    println!("{}", json);

    if cli.strict {
        outcome.map_err(|e| e.to_string())?;
    }

    Ok(())
}

/// Read a JSON or YAML document whose top level is a mapping.
fn load_data(path: &Path) -> Result<Bag, String> {
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read data file {}: {}", path.display(), e))?;

    let value: Value = serde_yaml::from_str(&contents)
        .map_err(|e| format!("Failed to parse data file {}: {}", path.display(), e))?;

    value
        .into_map()
        .ok_or_else(|| format!("Data file {} must contain a mapping", path.display()))
}
