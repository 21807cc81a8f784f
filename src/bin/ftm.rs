//! ftm - map tabular records onto entities and manage namespaced ids
//!
//! # Usage
//!
//! ```bash
//! # Map JSON-lines records to entities, ids signed for a dataset
//! ftm map --mapping companies.yml --input rows.jsonl --namespace uk_companies
//!
//! # Sign or verify ids
//! ftm sign --namespace uk_companies 4f1c0e2
//! echo 4f1c0e2.9ab071 | ftm verify --namespace uk_companies
//!
//! # Pretty-print an entity stream
//! ftm map -m companies.yml < rows.jsonl | ftm pretty
//! ```
//!
//! Logs go to stderr; set `RUST_LOG=debug` for mapping details.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};

use ftm_mapping::config::{load_query_mapping, ModelLoader};
use ftm_mapping::{Model, Namespace, QueryMapping, Record};

#[derive(Parser)]
#[command(name = "ftm")]
#[command(version)]
#[command(about = "Map tabular records onto graph entities and sign their ids")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Schema model file (falls back to ./config/model.yaml, then the built-in model)
    #[arg(long, global = true, env = "FTM_MODEL_PATH")]
    model: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Map JSON-lines records to JSON-lines entities
    Map {
        /// Mapping file (YAML or JSON)
        #[arg(short, long)]
        mapping: PathBuf,

        /// Input file (reads stdin if not provided)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Namespace used to sign entity ids
        #[arg(short, long, env = "FTM_NAMESPACE")]
        namespace: Option<String>,

        /// Prefix folded into every derived key
        #[arg(long)]
        key_prefix: Option<String>,
    },

    /// Sign plain ids (reads ids from stdin if none given)
    Sign {
        #[arg(short, long, env = "FTM_NAMESPACE")]
        namespace: String,
        ids: Vec<String>,
    },

    /// Verify signed ids; exits non-zero if any fail
    Verify {
        #[arg(short, long, env = "FTM_NAMESPACE")]
        namespace: String,
        ids: Vec<String>,
    },

    /// Format a stream of entities to make it readable
    Pretty,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) if is_broken_pipe(&err) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn is_broken_pipe(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<io::Error>()
            .is_some_and(|io_err| io_err.kind() == io::ErrorKind::BrokenPipe)
    })
}

fn run(cli: Cli) -> Result<ExitCode> {
    let loader = match cli.model {
        Some(path) => ModelLoader::new(path),
        None => ModelLoader::from_env(),
    };

    match cli.command {
        Commands::Map {
            mapping,
            input,
            namespace,
            key_prefix,
        } => {
            let model = loader.load()?;
            let query = load_query_mapping(&mapping, &model, key_prefix.as_deref())?;
            let namespace = Namespace::make(namespace.as_deref());
            let reader = open_input(input)?;
            let stats = map_records(&query, &namespace, reader, io::stdout().lock())?;
            info!(
                records = stats.records,
                entities = stats.entities,
                "Mapping complete"
            );
            Ok(ExitCode::SUCCESS)
        }
        Commands::Sign { namespace, ids } => {
            let namespace = Namespace::new(&namespace);
            let ids = ids_or_lines(ids, io::stdin().lock())?;
            sign_ids(&namespace, &ids, io::stdout().lock())?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Verify { namespace, ids } => {
            let namespace = Namespace::new(&namespace);
            let ids = ids_or_lines(ids, io::stdin().lock())?;
            verify_ids(&namespace, &ids, io::stdout().lock())
        }
        Commands::Pretty => {
            let model = loader.load()?;
            pretty(&model, io::stdin().lock(), io::stdout().lock())?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Ids given on the command line, or else one per non-blank input line
fn ids_or_lines<R: BufRead>(ids: Vec<String>, reader: R) -> Result<Vec<String>> {
    if !ids.is_empty() {
        return Ok(ids);
    }
    let mut read = Vec::new();
    for line in reader.lines() {
        let line = line.context("Failed to read ids")?;
        let line = line.trim();
        if !line.is_empty() {
            read.push(line.to_string());
        }
    }
    Ok(read)
}

fn open_input(input: Option<PathBuf>) -> Result<Box<dyn BufRead>> {
    match input {
        Some(path) => {
            let file =
                File::open(&path).with_context(|| format!("Failed to open {}", path.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(BufReader::new(io::stdin()))),
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
struct MapStats {
    records: usize,
    entities: usize,
}

/// Map a JSON-lines record stream, writing one entity per line in
/// dependency order with ids and references signed by `namespace`
fn map_records<R: BufRead, W: Write>(
    query: &QueryMapping,
    namespace: &Namespace,
    reader: R,
    out: W,
) -> Result<MapStats> {
    let mut out = BufWriter::new(out);
    let mut stats = MapStats::default();

    for (idx, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read input")?;
        if line.trim().is_empty() {
            continue;
        }
        let record: Record = match serde_json::from_str(&line) {
            Ok(record) => record,
            Err(err) => {
                warn!("Skipping line {}: not a JSON object ({err})", idx + 1);
                continue;
            }
        };
        stats.records += 1;

        let mut entities = query.map(&record);
        for entity_mapping in query.mappings() {
            let Some(proxy) = entities.remove(entity_mapping.name()) else {
                continue;
            };
            serde_json::to_writer(&mut out, &namespace.apply(&proxy))?;
            out.write_all(b"\n")?;
            stats.entities += 1;
        }
    }
    out.flush()?;
    Ok(stats)
}

fn sign_ids<W: Write>(namespace: &Namespace, ids: &[String], out: W) -> Result<()> {
    let mut out = BufWriter::new(out);
    for id in ids {
        if let Some(signed) = namespace.sign(id.as_str()) {
            writeln!(out, "{signed}")?;
        }
    }
    out.flush()?;
    Ok(())
}

/// Print `id<TAB>valid` per id; fails the process if any id does not verify
fn verify_ids<W: Write>(namespace: &Namespace, ids: &[String], out: W) -> Result<ExitCode> {
    let mut out = BufWriter::new(out);
    let mut all_valid = true;
    for id in ids {
        let valid = namespace.verify(id.as_str());
        all_valid &= valid;
        writeln!(out, "{id}\t{valid}")?;
    }
    out.flush()?;
    Ok(if all_valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn pretty<R: BufRead, W: Write>(model: &Model, reader: R, out: W) -> Result<()> {
    let mut out = BufWriter::new(out);
    for line in reader.lines() {
        let line = line.context("Failed to read entity stream")?;
        if line.trim().is_empty() {
            continue;
        }
        let value: serde_json::Value =
            serde_json::from_str(&line).context("Entity stream is not JSON lines")?;
        let proxy = model.entity_from_json(&value)?;
        serde_json::to_writer_pretty(&mut out, &proxy)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}
