use std::io::{Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use kpi_formula::{
    CrossEntitySnapshot, CrossEntityValue, EntityInput, EvaluatorConfig, FormulaDriver,
    SiblingEntry,
};
use serde::{Deserialize, Serialize};

#[derive(Parser, Debug)]
#[command(name = "kpi-formula")]
#[command(
    about = "Evaluate the formula fields of one entity document and print the results as JSON."
)]
struct Args {
    /// Entity document (JSON). If omitted, reads from stdin.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Evaluator settings (JSON). Missing keys keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the reason behind every uncomputable field to stderr.
    #[arg(long, short)]
    verbose: bool,

    /// Pretty-print the JSON output.
    #[arg(long)]
    pretty: bool,
}

/// The entity plus whatever is known about its siblings.
///
/// `snapshot` lists precomputed values directly; `siblings` are folded in the same way entry saves
/// do it (number and formula fields only, never the entity itself).
#[derive(Debug, Deserialize)]
struct InputDocument {
    #[serde(flatten)]
    entity: EntityInput,
    #[serde(default)]
    snapshot: Vec<CrossEntityValue>,
    #[serde(default)]
    siblings: Vec<SiblingEntry>,
}

fn read_input(input: &Option<PathBuf>) -> Result<Vec<u8>> {
    match input {
        Some(path) => std::fs::read(path).with_context(|| format!("read {}", path.display())),
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .context("read stdin")?;
            Ok(buf)
        }
    }
}

fn load_config(path: &Option<PathBuf>) -> Result<EvaluatorConfig> {
    let Some(path) = path else {
        return Ok(EvaluatorConfig::default());
    };
    let bytes = std::fs::read(path).with_context(|| format!("read config {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parse config {}", path.display()))
}

fn build_snapshot(doc: &InputDocument) -> CrossEntitySnapshot {
    let mut snapshot = CrossEntitySnapshot::from(doc.snapshot.clone());
    let siblings = CrossEntitySnapshot::from_siblings(doc.entity.entity_id, &doc.siblings);
    for value in Vec::<CrossEntityValue>::from(siblings) {
        snapshot.insert(value.entity_id, value.field_key, value.value);
    }
    snapshot
}

fn print_json(value: &impl Serialize, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .context("serialize results")?;

    let mut stdout = std::io::stdout().lock();
    match writeln!(stdout, "{json}") {
        Ok(()) => Ok(()),
        // A closed pipe (e.g. `| head`) is not an error for a reporting tool.
        Err(err) if err.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
        Err(err) => Err(err).context("write results"),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(&args.config)?;
    let bytes = read_input(&args.input)?;
    let doc: InputDocument = serde_json::from_slice(&bytes).context("parse entity document")?;
    let snapshot = build_snapshot(&doc);
    log::debug!(
        "evaluating entity {} ({} fields, {} cross-entity values)",
        doc.entity.entity_id,
        doc.entity.fields.len(),
        snapshot.len()
    );

    let driver = FormulaDriver::new(config);
    let results = driver.evaluate_reporting(
        &doc.entity.fields,
        &doc.entity.values,
        &snapshot,
        |key, err| {
            if args.verbose {
                eprintln!("{key}: {err} ({:?})", err.kind());
            }
        },
    );

    print_json(&results, args.pretty)
}
