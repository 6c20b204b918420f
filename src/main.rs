//! # Resume RAG CLI (`rrag`)
//!
//! Builds the vector indexes, inspects routing and retrieval, and answers
//! questions about the people in the registry.
//!
//! ## Usage
//!
//! ```bash
//! rrag --config ./config/rag.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `rrag build` | Build the global index from every document |
//! | `rrag build --people` | Build one index per `data/<Name>/` directory |
//! | `rrag build --person <Name>` | Rebuild a single person's index |
//! | `rrag people` | List registered people and the default |
//! | `rrag resolve "<query>"` | Show which people a query routes to |
//! | `rrag search "<query>"` | Print the top chunks for a query |
//! | `rrag ask "<query>"` | Answer a question from the indexes |
//! | `rrag stats` | Summarize persisted indexes |
//!
//! Logs go to stderr; set `RUST_LOG` (default `info`) to adjust.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use resume_rag::answer::{Answer, Composer};
use resume_rag::config::{self, Config};
use resume_rag::embedding::EmbedderHandle;
use resume_rag::generation::generator_from_env;
use resume_rag::ingest::{self, PersonOutcome};
use resume_rag::models::Hit;
use resume_rag::registry::load_registry;
use resume_rag::retriever::Retriever;
use resume_rag::stats;
use resume_rag::store::Scope;

/// Resume RAG: retrieval-augmented answers about the people in your data
/// directory.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. Without one, built-in defaults and environment overrides apply.
#[derive(Parser)]
#[command(
    name = "rrag",
    about = "Resume RAG: retrieval-augmented question answering over resumes",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/rag.toml`. A missing file is not an error.
    #[arg(long, global = true, default_value = "./config/rag.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build vector indexes from the data directory.
    ///
    /// Without flags, every document under the data root goes into one
    /// global index. With `--people`, each subdirectory becomes its own
    /// person index. Builds always replace the previous index.
    Build {
        /// Build one index per person directory.
        #[arg(long)]
        people: bool,

        /// Build only this person's index.
        #[arg(long)]
        person: Option<String>,
    },

    /// List people in the registry.
    People,

    /// Show which people a query would be routed to.
    Resolve {
        query: String,
    },

    /// Retrieve the top chunks for a query.
    Search {
        query: String,

        /// Search this person's index instead of the global one.
        #[arg(long)]
        person: Option<String>,

        /// Number of results (defaults to `retrieval.top_k`).
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Answer a question.
    ///
    /// The query is routed to the people it mentions (or the default
    /// person) and each is answered from their own index.
    Ask {
        query: String,

        /// Answer from the global index instead of routing by person.
        #[arg(long)]
        global: bool,

        /// Chunks retrieved per person (defaults to `retrieval.top_k`).
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Summarize the persisted indexes.
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    match cli.command {
        Commands::Build { people, person } => run_build(&cfg, people, person).await?,
        Commands::People => {
            let registry = load_registry(&cfg.paths.registry)?;
            for name in registry.names() {
                println!("{}", name);
            }
            println!("default: {}", registry.default_entity()?);
        }
        Commands::Resolve { query } => {
            let registry = load_registry(&cfg.paths.registry)?;
            for name in registry.resolve_entities(&query)? {
                println!("{}", name);
            }
        }
        Commands::Search {
            query,
            person,
            top_k,
        } => {
            let scope = person.map(Scope::Person).unwrap_or(Scope::Global);
            let embedder = EmbedderHandle::new(cfg.embedding.clone());
            let retriever = Retriever::from_config(&cfg, scope, embedder);
            let hits = retriever.retrieve(&query, top_k).await?;
            if hits.is_empty() {
                println!("No results.");
            }
            print_hits(&hits);
        }
        Commands::Ask {
            query,
            global,
            top_k,
        } => run_ask(&cfg, &query, global, top_k).await?,
        Commands::Stats => stats::run_stats(&cfg)?,
    }

    Ok(())
}

async fn run_build(cfg: &Config, people: bool, person: Option<String>) -> anyhow::Result<()> {
    let embedder = EmbedderHandle::new(cfg.embedding.clone());

    if let Some(name) = person {
        let outcome = ingest::build_person(cfg, &embedder, &name).await?;
        print_outcome(&name, &outcome);
        return Ok(());
    }

    if people {
        let report = ingest::build_people(cfg, &embedder).await?;
        println!("build --people");
        for (name, outcome) in &report.people {
            print_outcome(name, outcome);
        }
        println!(
            "  built: {}, skipped: {}",
            report.built(),
            report.skipped()
        );
    } else {
        let summary = ingest::build_global(cfg, &embedder).await?;
        println!("build");
        println!("  documents: {}", summary.documents);
        println!("  chunks: {}", summary.chunks);
        println!("  dim: {}", summary.dim);
    }
    println!("ok");
    Ok(())
}

async fn run_ask(
    cfg: &Config,
    query: &str,
    global: bool,
    top_k: Option<usize>,
) -> anyhow::Result<()> {
    let generator = generator_from_env(&cfg.generation)?;
    let embedder = EmbedderHandle::new(cfg.embedding.clone());
    let composer = Composer::new(cfg, embedder, generator);

    if global {
        let Answer { text, hits } = composer.answer_global(query, top_k).await?;
        println!("{}", text);
        println!();
        print_hits(&hits);
        return Ok(());
    }

    let registry = load_registry(&cfg.paths.registry)?;
    let people = registry.resolve_entities(query)?;
    tracing::info!(people = ?people, "routing query");

    let result = composer.answer_many(query, &people, top_k).await;
    println!("{}", result.text);
    for answer in &result.answers {
        if let Ok(Answer { hits, .. }) = &answer.outcome {
            println!();
            println!("Sources for {}:", answer.person);
            print_hits(hits);
        }
    }
    Ok(())
}

fn print_outcome(name: &str, outcome: &PersonOutcome) {
    match outcome {
        PersonOutcome::Built { chunks, documents } => {
            println!("  {}: {} documents, {} chunks", name, documents, chunks)
        }
        PersonOutcome::Skipped { reason } => println!("  {}: skipped ({})", name, reason),
    }
}

fn print_hits(hits: &[Hit]) {
    for (i, hit) in hits.iter().enumerate() {
        let preview: String = hit.text.chars().take(200).collect();
        println!(
            "  [{}] {:.3}  {} #{}",
            i + 1,
            hit.score,
            hit.source,
            hit.chunk_id
        );
        println!("      {}", preview.replace('\n', " "));
    }
}
