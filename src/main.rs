use archivist::config::{self, ArchivistConfig};
use archivist::engine::SearchEngine;
use archivist::indexer::BuildOptions;
use archivist::query::{QueryOptions, HIGHLIGHT_CLOSE, HIGHLIGHT_OPEN};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "archivist", version, about = "Full-text search over local chat session archives")]
struct Cli {
    /// Path to config file (default: ~/.archivist/archivist.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the index/export directory
    #[arg(long, global = true)]
    index_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build or refresh the search index
    Index {
        /// Force a full rebuild instead of honoring the freshness policy
        #[arg(long)]
        full: bool,

        /// Source directory to scan (defaults to the configured sessions_dir)
        #[arg(long)]
        source: Option<PathBuf>,

        /// Enable verbose per-file logging
        #[arg(long)]
        verbose: bool,
    },

    /// Full-text search across indexed conversations
    Search {
        /// Search query (use "quoted phrases" for exact substrings)
        query: String,

        /// Filter by project name
        #[arg(long)]
        project: Option<String>,

        /// Maximum number of results
        #[arg(long)]
        limit: Option<usize>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show index statistics
    Stats,

    /// Write a default config file
    Init,
}

fn main() {
    let cli = Cli::parse();

    let cfg = match config::load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("failed to load config: {e:#}");
            std::process::exit(1);
        }
    };

    // Priority: RUST_LOG env > config file log_level > "info"
    let log_level = cfg.resolved_log_level().to_string();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .init();

    let cfg = apply_overrides(cfg, &cli);

    match cli.command {
        Commands::Init => run_init(),
        Commands::Index { full, ref source, verbose } => {
            run_index(cfg, full, source.clone(), verbose)
        }
        Commands::Search { ref query, ref project, limit, json } => {
            run_search(cfg, query, project.clone(), limit, json)
        }
        Commands::Stats => run_stats(cfg),
    }
}

fn apply_overrides(mut cfg: ArchivistConfig, cli: &Cli) -> ArchivistConfig {
    if let Some(dir) = &cli.index_dir {
        cfg.export_dir = dir.to_string_lossy().to_string();
    }
    cfg
}

fn run_init() {
    let path = config::default_config_path();
    if path.exists() {
        eprintln!("config file already exists: {}", path.display());
        std::process::exit(1);
    }
    if let Err(e) = archivist::search::write_default_config(&path) {
        eprintln!("failed to write config file: {e}");
        std::process::exit(1);
    }
    println!("wrote default config to {}", path.display());
}

fn run_index(mut cfg: ArchivistConfig, full: bool, source: Option<PathBuf>, verbose: bool) {
    if let Some(source) = source {
        cfg.sessions_dir = source.to_string_lossy().to_string();
    }
    cfg.indexer.verbose = verbose || cfg.indexer.verbose;

    let mut engine = SearchEngine::new(cfg);
    let result = if full {
        engine.build(BuildOptions { force: true })
    } else {
        engine.update()
    };

    match result {
        Ok(report) => println!("{report}"),
        Err(e) => {
            eprintln!("indexing failed: {e}");
            std::process::exit(1);
        }
    }
}

fn run_search(cfg: ArchivistConfig, query: &str, project: Option<String>, limit: Option<usize>, json: bool) {
    let mut engine = SearchEngine::new(cfg);
    let opts = QueryOptions {
        limit,
        project_filter: project,
    };

    match engine.search(query, opts) {
        Ok(response) => {
            if json {
                print_json(&response);
            } else {
                print_human(&response);
            }
        }
        Err(e) => {
            eprintln!("search failed: {e}");
            if matches!(e, archivist::ArchivistError::IndexMissing) {
                eprintln!("hint: run `archivist index` first");
            }
            std::process::exit(1);
        }
    }
}

fn print_human(response: &archivist::query::SearchResponse) {
    println!(
        "{} result(s) in {:.1}ms",
        response.total_found, response.search_time_ms
    );
    for result in &response.results {
        let preview = result
            .preview
            .replace(HIGHLIGHT_OPEN, "**")
            .replace(HIGHLIGHT_CLOSE, "**");
        println!(
            "\n[{:.2}] {} ({}) — {}",
            result.score,
            result.id,
            result.project,
            result.modified.to_rfc3339()
        );
        println!("  {preview}");
    }
}

fn print_json(response: &archivist::query::SearchResponse) {
    let entries: Vec<serde_json::Value> = response
        .results
        .iter()
        .map(|r| {
            serde_json::json!({
                "id": r.id,
                "project": r.project,
                "modified": r.modified.to_rfc3339(),
                "message_count": r.message_count,
                "score": r.score,
                "preview": r.preview,
                "occurrences": r.occurrences.iter().map(|o| serde_json::json!({
                    "start_offset": o.start_offset,
                    "length": o.length,
                    "matched_word": o.matched_word,
                    "query_word": o.query_word,
                })).collect::<Vec<_>>(),
            })
        })
        .collect();

    let payload = serde_json::json!({
        "results": entries,
        "total_found": response.total_found,
        "search_time_ms": response.search_time_ms,
    });
    println!("{}", serde_json::to_string_pretty(&payload).unwrap_or_default());
}

fn run_stats(cfg: ArchivistConfig) {
    let mut engine = SearchEngine::new(cfg);
    match engine.stats() {
        Ok(stats) => {
            println!("documents : {}", stats.document_count);
            println!("index size: {} bytes", stats.index_size);
            if let Some(built_at) = stats.built_at {
                println!("built at  : {}", built_at.to_rfc3339());
            }
            if let Some(version) = stats.version {
                println!("version   : {version}");
            }
        }
        Err(e) => {
            eprintln!("stats failed: {e}");
            std::process::exit(1);
        }
    }
}
