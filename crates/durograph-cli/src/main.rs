//! Durograph CLI
//!
//! - `query`: run durable pattern queries (best or top-k) under one or more
//!   ranking policies and emit JSON reports
//! - `snapshot`: convert a JSON graph into a binary `.dgs` snapshot
//! - `stats`: summarize a graph

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use durograph_engine::{
    DurationMode, IndexSelection, QueryConfig, QueryReport, QueryStatus, RankingPolicy,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod load;
mod run;

#[derive(Parser)]
#[command(name = "durograph")]
#[command(author, version, about = "Durograph: durable subgraph matching over temporal graphs")]
struct Cli {
    /// Debug-level logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run durable pattern queries against a graph.
    Query(QueryArgs),

    /// Convert a JSON graph into a binary snapshot.
    Snapshot {
        /// Input graph (JSON)
        graph: PathBuf,
        /// Output snapshot (`.dgs`)
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Print node, edge and label counts of a graph.
    Stats {
        /// Graph (JSON or `.dgs` snapshot)
        graph: PathBuf,
    },
}

#[derive(Args)]
struct QueryArgs {
    /// Graph (JSON or `.dgs` snapshot)
    #[arg(short, long)]
    graph: PathBuf,

    /// Pattern file (JSON)
    #[arg(short, long)]
    patterns: PathBuf,

    /// Query interval: `all` or e.g. `0..10,12,15..20`
    #[arg(short, long, default_value = "all")]
    interval: String,

    /// Require the matched lifespan to be contiguous
    #[arg(long)]
    contiguous: bool,

    /// Ranking policy (max, adaptive, min, halfway); repeatable
    #[arg(long = "policy", default_value = "max")]
    policies: Vec<RankingPolicy>,

    /// Report the k longest matches instead of all best ones
    #[arg(short = 'k', long)]
    top_k: Option<usize>,

    /// Wall-clock budget per query, in seconds
    #[arg(long, default_value_t = 600)]
    time_limit: u64,

    /// Maximum number of equal-duration matches in best mode
    #[arg(long, default_value_t = QueryConfig::DEFAULT_RESULT_CAP)]
    result_cap: usize,

    /// Treat node labels as static
    #[arg(long)]
    no_label_tracking: bool,

    /// Smallest candidate score worth indexing
    #[arg(long, default_value_t = 2)]
    min_score: u32,

    /// Shrink factor of the adaptive policy
    #[arg(long, default_value_t = 0.5)]
    adaptive_factor: f64,

    /// Keep duplicate signatures under the min policy
    #[arg(long)]
    keep_duplicates: bool,

    /// Neighbor-label index radius
    #[arg(long)]
    neighbor_radius: Option<usize>,

    /// Counted neighbor-label index radius
    #[arg(long)]
    counted_neighbor_radius: Option<usize>,

    /// Path-label index depth
    #[arg(long)]
    path_depth: Option<usize>,

    /// Worker threads (0 = one per core)
    #[arg(short, long, default_value_t = 0)]
    workers: usize,

    /// Write the JSON reports here instead of stdout
    #[arg(short, long)]
    out: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cli.verbose { "debug" } else { "info" })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Query(args) => cmd_query(&args),
        Commands::Snapshot { graph, out } => cmd_snapshot(&graph, &out),
        Commands::Stats { graph } => cmd_stats(&graph),
    }
}

fn cmd_query(args: &QueryArgs) -> Result<()> {
    let (graph, labels) = load::load_graph(&args.graph)?;
    let patterns = load::load_patterns(&args.patterns, graph.is_directed(), &labels)?;
    if patterns.is_empty() {
        bail!("{} holds no patterns", args.patterns.display());
    }

    let interval = load::parse_interval(&args.interval, graph.horizon())?;
    let mut builder = QueryConfig::builder(interval)
        .duration_mode(if args.contiguous {
            DurationMode::Contiguous
        } else {
            DurationMode::Total
        })
        .time_limit(Duration::from_secs(args.time_limit))
        .result_cap(args.result_cap)
        .track_label_changes(!args.no_label_tracking)
        .min_score(args.min_score)
        .adaptive_factor(args.adaptive_factor)
        .dedup_under_min(!args.keep_duplicates)
        .index(IndexSelection {
            neighbor_radius: args.neighbor_radius,
            counted_neighbor_radius: args.counted_neighbor_radius,
            path_depth: args.path_depth,
        });
    if let Some(k) = args.top_k {
        builder = builder.top_k(k);
    }
    let config = builder.build()?;

    let mut policies: Vec<RankingPolicy> = Vec::with_capacity(args.policies.len());
    for &policy in &args.policies {
        if !policies.contains(&policy) {
            policies.push(policy);
        }
    }

    tracing::info!(
        nodes = graph.len(),
        edges = graph.edge_count(),
        patterns = patterns.len(),
        policies = policies.len(),
        "running queries"
    );
    let reports = run::run_queries(&graph, &patterns, &config, &policies, args.workers)?;

    for report in &reports {
        print_summary(report);
    }

    let json = serde_json::to_string_pretty(&reports)?;
    match &args.out {
        Some(out) => {
            fs::write(out, json).with_context(|| format!("writing {}", out.display()))?;
            eprintln!("{} {}", "wrote".green().bold(), out.display().to_string().bold());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn print_summary(report: &QueryReport) {
    let status = match report.status {
        QueryStatus::Satisfied => report.status.to_string().green().bold(),
        QueryStatus::Exhausted | QueryStatus::NoCandidates => report.status.to_string().yellow().bold(),
        QueryStatus::TimedOut | QueryStatus::Capped => report.status.to_string().red().bold(),
    };
    let best = report
        .best_duration()
        .map(|d| d.to_string())
        .unwrap_or_else(|| "-".to_string());
    eprintln!(
        "pattern {} [{} {}] {}: {} matches, best {} ({} runs, {} ms)",
        report.pattern_id,
        report.policy,
        report.mode,
        status,
        report.matches.len(),
        best.bold(),
        report.threshold_iterations,
        report.elapsed_ms
    );
}

fn cmd_snapshot(graph_path: &Path, out: &Path) -> Result<()> {
    let (graph, labels) = load::load_graph(graph_path)?;
    graph.save(&labels, out)?;
    eprintln!(
        "{} {} ({} nodes, {} edges, {} labels)",
        "wrote".green().bold(),
        out.display().to_string().bold(),
        graph.len(),
        graph.edge_count(),
        labels.len()
    );
    Ok(())
}

fn cmd_stats(graph_path: &Path) -> Result<()> {
    let (graph, labels) = load::load_graph(graph_path)?;
    let stats = serde_json::json!({
        "nodes": graph.len(),
        "edges": graph.edge_count(),
        "labels": labels.len(),
        "horizon": graph.horizon(),
        "directed": graph.is_directed(),
    });
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
