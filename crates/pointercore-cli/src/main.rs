//! pointercore CLI
//!
//! Drives the extractor, store, and solvers end to end: `extract` parses a
//! batch of C/C++ files and persists their constraints; `query` slices from
//! a seed hash and prints either solver's points-to result. Per spec §6 the
//! core recognizes exactly one analysis-affecting option, `--neo4j
//! <connection string>`; everything else here (`--format`, `-v`/`-q`,
//! `--store`) is ordinary CLI ergonomics layered on top.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use pointercore_ast::ast::AstSource;
use pointercore_ast::parallel::ParallelSource;
use pointercore_query::{Algorithm, QueryEngine};
use pointercore_store::{ConstraintStore, MangledNameCache, UnreachableBackend};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pointercore")]
#[command(author, version, about = "Flow-insensitive points-to analysis over a C/C++ AST", long_about = None)]
struct Cli {
    /// Path to the local constraint store (defaults to ./.pointercore/store).
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Connection string for an optional remote graph backend. Its absence
    /// selects the local store (spec §6).
    #[arg(long, global = true)]
    neo4j: Option<String>,

    /// Increase log verbosity (-v, -vv). Overridden by `RUST_LOG` if set.
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all but warning/error logs.
    #[arg(short = 'q', long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and extract constraints from one or more C/C++ source files,
    /// persisting them to the store.
    Extract {
        /// Source files to parse.
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },
    /// Slice from a seed hash and resolve its points-to set.
    Query {
        /// The 64-bit seed hash (decimal), as printed by `extract`.
        seed: u64,

        /// Which solver to run.
        #[arg(long, value_enum, default_value_t = AlgorithmArg::Andersen)]
        algorithm: AlgorithmArg,

        /// Output format.
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum AlgorithmArg {
    Andersen,
    Steensgaard,
}

impl From<AlgorithmArg> for Algorithm {
    fn from(a: AlgorithmArg) -> Self {
        match a {
            AlgorithmArg::Andersen => Algorithm::Andersen,
            AlgorithmArg::Steensgaard => Algorithm::Steensgaard,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let store_path = cli
        .store
        .clone()
        .unwrap_or_else(|| PathBuf::from(".pointercore/store"));

    match cli.command {
        Commands::Extract { files } => cmd_extract(&store_path, &files),
        Commands::Query {
            seed,
            algorithm,
            format,
        } => cmd_query(&store_path, cli.neo4j.as_deref(), seed, algorithm.into(), format),
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let default_level = if quiet {
        "warn"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn cmd_extract(store_path: &PathBuf, files: &[PathBuf]) -> Result<()> {
    let store = ConstraintStore::open(store_path)
        .with_context(|| format!("opening store at {}", store_path.display()))?;
    let cache = MangledNameCache::new();

    let parser = ParallelSource::new();
    let parsed = parser.parse_files(files);

    let mut units = Vec::with_capacity(parsed.len());
    for (path, result) in parsed {
        match result {
            Ok(s) => units.push(s.translation_unit().clone()),
            Err(e) => warn!(file = %path.display(), error = %e, "skipping file that failed to parse"),
        }
    }

    // Extraction for independent translation units runs concurrently; the
    // store and mangled-name cache are shared and already safe for
    // concurrent writers (spec §5).
    let results = pointercore_analysis::extract_parallel(&units, &cache, &store)?;

    let mut total_constraints = 0usize;
    for r in &results {
        println!("{}: {} constraint(s)", r.file, r.constraints_persisted);
        total_constraints += r.constraints_persisted;
    }

    println!("\ntotal: {total_constraints} constraint(s) persisted to {}", store_path.display());
    Ok(())
}

fn cmd_query(
    store_path: &PathBuf,
    neo4j: Option<&str>,
    seed: u64,
    algorithm: Algorithm,
    format: OutputFormat,
) -> Result<()> {
    let store = ConstraintStore::open(store_path)
        .with_context(|| format!("opening store at {}", store_path.display()))?;

    let fallback;
    let backend = match neo4j {
        Some(conn) => {
            info!(connection = conn, "neo4j backend configured but no client is wired up; falling back");
            fallback = UnreachableBackend {
                reason: format!("no graph-db client configured for '{conn}'"),
            };
            Some(&fallback as &dyn pointercore_store::GraphBackend)
        }
        None => None,
    };

    let engine = match backend {
        Some(b) => QueryEngine::new(&store).with_backend(b),
        None => QueryEngine::new(&store),
    };

    let graph = engine.query(seed, algorithm)?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "seed": seed,
                "nodes": graph.nodes.iter().map(|n| serde_json::json!({
                    "hash": n.hash,
                    "label": n.label,
                    "container": format!("{:?}", n.container),
                    "shape": format!("{:?}", n.shape),
                    "highlighted": n.highlighted,
                })).collect::<Vec<_>>(),
                "edges": graph.edges.iter().map(|e| serde_json::json!({
                    "from": e.from,
                    "to": e.to,
                    "dashed": e.dashed,
                })).collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            println!("points-to graph for seed {seed}:");
            for node in &graph.nodes {
                let marker = if node.highlighted { "* " } else { "  " };
                println!(
                    "{marker}#{:x} {:<24} container={:?} shape={:?}",
                    node.hash, node.label, node.container, node.shape
                );
            }
            for edge in &graph.edges {
                let arrow = if edge.dashed { "- ->" } else { "-->" };
                println!("  #{:x} {arrow} #{:x}", edge.from, edge.to);
            }
            if graph.nodes.is_empty() {
                println!("  (empty result — unknown seed or no reachable constraints)");
            }
        }
    }

    Ok(())
}
