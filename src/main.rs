use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

// Import from our modular crates
use mythos_core::{DistanceMetric, EmbeddingProvider};
use mythos_gemini::GeminiClient;
use mythos_rag::{
    load_documents, EmbeddingPolicy, FailurePolicy, IndexArtifact, IndexBuilder, IndexStore,
    RagConfig, RagPipeline,
};
use mythos_cli::{
    display_banner, failure_label, handle_input_with_history, is_quit, print_answer,
    print_build_report, print_error, print_help, print_sources, print_stats,
};

#[derive(Parser)]
#[command(name = "mythos")]
#[command(about = "Ask questions about a local document corpus, grounded by retrieval", long_about = None)]
struct Cli {
    /// Log pipeline progress (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory holding the index artifact
    #[arg(long, global = true)]
    index_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chunk and embed every document in the data directory and save the index
    Build {
        /// Directory of .pdf, .txt, .md and .html documents
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Fragment size in characters
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Distance metric: euclidean or cosine
        #[arg(long)]
        metric: Option<String>,

        /// Maximum embedding requests in flight
        #[arg(long)]
        concurrency: Option<usize>,

        /// Leave out fragments that fail to embed instead of aborting
        #[arg(long)]
        skip_failures: bool,
    },

    /// Interactive question loop
    Chat {
        /// Number of fragments used as context
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Print the retrieved fragments before each answer
        #[arg(long)]
        show_sources: bool,
    },

    /// Answer a single question and exit
    Ask {
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        #[arg(long)]
        show_sources: bool,

        #[arg(required = true, trailing_var_arg = true)]
        question: Vec<String>,
    },

    /// Show the fragments retrieved for a query, with distances, without generating
    Search {
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        #[arg(required = true, trailing_var_arg = true)]
        query: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = RagConfig::from_env()?;
    if let Some(dir) = cli.index_dir {
        config.index_dir = dir;
    }

    let client = Arc::new(GeminiClient::from_env()?);

    match cli.command {
        Commands::Build {
            data_dir,
            chunk_size,
            metric,
            concurrency,
            skip_failures,
        } => {
            if let Some(dir) = data_dir {
                config.data_dir = dir;
            }
            if let Some(size) = chunk_size {
                config.chunk_size = size;
            }
            if let Some(metric) = metric {
                config.metric = DistanceMetric::parse(&metric)?;
            }
            if let Some(n) = concurrency {
                config.embed_concurrency = n;
            }
            config.validate()?;

            let policy = EmbeddingPolicy {
                concurrency: config.embed_concurrency,
                on_failure: if skip_failures {
                    FailurePolicy::Skip
                } else {
                    FailurePolicy::Abort
                },
            };
            build(client, &config, policy).await
        }
        Commands::Chat {
            top_k,
            show_sources,
        } => {
            if let Some(k) = top_k {
                config.top_k = k;
            }
            config.validate()?;
            chat(client, &config, show_sources).await
        }
        Commands::Ask {
            top_k,
            show_sources,
            question,
        } => {
            if let Some(k) = top_k {
                config.top_k = k;
            }
            config.validate()?;

            let artifact = load_index(&client, &config)?;
            let pipeline = RagPipeline::new(
                client.clone(),
                client,
                Arc::new(artifact.into_index()),
            )
            .with_top_k(config.top_k);

            let answer = pipeline.ask(&question.join(" ")).await?;
            if show_sources {
                print_sources(&answer.sources);
            }
            print_answer(&answer.text);
            Ok(())
        }
        Commands::Search { top_k, query } => {
            if let Some(k) = top_k {
                config.top_k = k;
            }
            config.validate()?;

            let artifact = load_index(&client, &config)?;
            let pipeline = RagPipeline::new(
                client.clone(),
                client,
                Arc::new(artifact.into_index()),
            );

            let hits = pipeline
                .retriever()
                .retrieve(&query.join(" "), config.top_k)
                .await?;
            print_sources(&hits);
            Ok(())
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Load the artifact and refuse it if it was built with another embedding model
fn load_index(client: &GeminiClient, config: &RagConfig) -> Result<IndexArtifact> {
    let store = IndexStore::new(&config.index_dir);
    if !store.exists() {
        bail!(
            "no index found at {} (run `mythos build` first)",
            store.location().display()
        );
    }

    let artifact = store
        .load()
        .with_context(|| format!("could not load the index at {}", store.location().display()))?;
    artifact.ensure_model(EmbeddingProvider::model_id(client))?;
    tracing::info!(
        build_id = %artifact.manifest().build_id,
        fragments = artifact.manifest().count,
        "index loaded"
    );
    Ok(artifact)
}

async fn build(client: Arc<GeminiClient>, config: &RagConfig, policy: EmbeddingPolicy) -> Result<()> {
    println!(
        "{} Reading documents from {}",
        "📚".cyan(),
        config.data_dir.display()
    );
    let documents = load_documents(&config.data_dir)?;
    if documents.is_empty() {
        println!("{} No readable documents found; the index will be empty", "⚠️".yellow());
    }

    println!(
        "{} Embedding with {} ({} in flight)...",
        "🤖".blue(),
        EmbeddingProvider::model_id(client.as_ref()),
        policy.concurrency
    );

    let builder = IndexBuilder::new(client)
        .with_chunk_size(config.chunk_size)
        .with_metric(config.metric)
        .with_policy(policy);
    let (artifact, report) = builder.build(&documents).await?;

    let store = IndexStore::new(&config.index_dir);
    store.save(&artifact)?;
    print_build_report(&report, &store.location().display().to_string());
    Ok(())
}

async fn chat(client: Arc<GeminiClient>, config: &RagConfig, show_sources: bool) -> Result<()> {
    let artifact = load_index(&client, config)?;
    display_banner(artifact.manifest());

    let pipeline = RagPipeline::new(client.clone(), client, Arc::new(artifact.into_index()))
        .with_top_k(config.top_k);

    let mut show_sources = show_sources;
    let mut history = Vec::new();

    loop {
        let Some(input) = handle_input_with_history(&mut history)? else {
            break;
        };

        if input.is_empty() {
            continue;
        }

        if is_quit(&input) {
            break;
        }

        match input.to_lowercase().as_str() {
            "help" => {
                print_help();
                continue;
            }
            "sources" => {
                show_sources = !show_sources;
                println!(
                    "{} Source listing {}",
                    "🔎".cyan(),
                    if show_sources { "on" } else { "off" }
                );
                continue;
            }
            "stats" => {
                print_stats(&pipeline.stats());
                continue;
            }
            _ => {}
        }

        println!("{} Thinking...", "🤖".blue());

        match pipeline.ask(&input).await {
            Ok(answer) => {
                if show_sources {
                    print_sources(&answer.sources);
                }
                print_answer(&answer.text);
            }
            Err(e) => print_error(failure_label(&e), &e),
        }
    }

    println!("{}", "👋 Goodbye!".green());
    Ok(())
}
