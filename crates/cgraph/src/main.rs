//! # cgraph CLI
//!
//! Command-line interface for cgraph: ingest textbook documents into a
//! deduplicated concept graph.
//!
//! Each document is turned into text, sent to a language model that extracts
//! concepts and relations, validated, and merged into the graph store. The raw
//! text is also written to a vector index.
//!
//! ## Commands
//!
//! - `cgraph ingest <FILES...>` - Ingest documents
//! - `cgraph status` - Show graph store statistics
//! - `cgraph config show|init|path` - Inspect configuration
//!
//! ## Examples
//!
//! ```bash
//! # Ingest two chapters, abort a document if any relation is invalid
//! cgraph ingest chapter1.pdf chapter2.md --strict
//!
//! # Machine-readable results
//! cgraph --format json ingest notes.txt
//! ```

use anyhow::{Context, Result};
use cgraph_core::{
    ConceptGraphStore, DocumentHandle, Embedder, Strictness, VectorIndex,
};
use cgraph_embed::{EmbedderPool, HttpEmbedder, NoopEmbedder};
use cgraph_extract::ExtractorRegistry;
use cgraph_ingest::{IngestUpdate, IngestionPipeline, IngestionResult};
use cgraph_llm::{ChatClient, LlmGraphExtractor};
use cgraph_store::{MemoryGraphStore, MemoryVectorIndex};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod config;

use config::{Config, EmbeddingProvider, Secrets, StoreBackend};

#[derive(Parser)]
#[command(name = "cgraph")]
#[command(about = "Ingest textbooks into a concept graph")]
#[command(version)]
struct Cli {
    /// Path to config file (default: ~/.config/cgraph/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest documents into the concept graph
    Ingest {
        /// Documents to ingest (text, Markdown, PDF)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Abort a document when any relation references an unknown entity
        #[arg(long)]
        strict: bool,

        /// Documents ingested at once (default from config)
        #[arg(short = 'j', long)]
        concurrency: Option<usize>,
    },

    /// Show graph store statistics
    Status,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Print sample configuration file
    Init,
    /// Show config file path
    Path,
}

/// Output structure for one ingested document.
#[derive(Serialize)]
struct IngestOutput {
    document: String,
    succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    entity_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    relation_count: Option<usize>,
    skipped_edges: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    index_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl IngestOutput {
    fn new(document: &DocumentHandle, result: &IngestionResult) -> Self {
        match result {
            IngestionResult::Succeeded(summary) => Self {
                document: summary.document.clone(),
                succeeded: true,
                entity_count: Some(summary.entity_count),
                relation_count: Some(summary.relation_count),
                skipped_edges: summary.skipped_edges.len(),
                index_error: summary.index_error.clone(),
                error: None,
            },
            IngestionResult::Failed(err) => Self {
                document: document.label(),
                succeeded: false,
                entity_count: None,
                relation_count: None,
                skipped_edges: 0,
                index_error: None,
                error: Some(err.to_string()),
            },
        }
    }
}

/// Output structure for status.
#[derive(Serialize)]
struct StatusOutput {
    backend: StoreBackend,
    concepts: u64,
    relations: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_updated: Option<String>,
}

/// Create the embedder behind a concurrency limit.
fn create_embedder(config: &Config, secrets: &Secrets) -> Result<Arc<EmbedderPool>> {
    let embedding = &config.embedding;
    let embedder: Arc<dyn Embedder> = match embedding.provider {
        EmbeddingProvider::Noop => Arc::new(NoopEmbedder::with_dimension(embedding.dimension)),
        EmbeddingProvider::Http => Arc::new(
            HttpEmbedder::new(
                embedding.base_url.as_str(),
                embedding.model.as_str(),
                embedding.dimension,
                secrets.embedding_api_key.clone(),
            )
            .context("Failed to create embedding client")?,
        ),
    };

    Ok(Arc::new(EmbedderPool::new(embedder, embedding.max_concurrent)))
}

/// Create the graph store and vector index for the configured backend.
async fn create_stores(
    config: &Config,
    secrets: &Secrets,
    embedder: Arc<dyn Embedder>,
) -> Result<(Arc<dyn ConceptGraphStore>, Arc<dyn VectorIndex>)> {
    match config.store.backend {
        StoreBackend::Memory => Ok((
            Arc::new(MemoryGraphStore::new()),
            Arc::new(MemoryVectorIndex::new(embedder, config.embedding.dimension)),
        )),
        StoreBackend::Neo4j => create_neo4j_stores(config, secrets, embedder).await,
    }
}

#[cfg(feature = "neo4j")]
async fn create_neo4j_stores(
    config: &Config,
    secrets: &Secrets,
    embedder: Arc<dyn Embedder>,
) -> Result<(Arc<dyn ConceptGraphStore>, Arc<dyn VectorIndex>)> {
    use cgraph_store::{Neo4jConfig, Neo4jGraphStore, Neo4jVectorIndex};

    let neo4j = Neo4jConfig {
        uri: secrets
            .neo4j_uri
            .clone()
            .unwrap_or_else(|| config.store.uri.clone()),
        user: secrets
            .neo4j_user
            .clone()
            .unwrap_or_else(|| config.store.user.clone()),
        password: secrets
            .neo4j_password
            .clone()
            .context("NEO4J_PASSWORD is not set")?,
        database: config.store.database.clone(),
        max_connections: config.store.max_connections,
    };

    let graph = cgraph_store::neo4j::connect(&neo4j)
        .await
        .context("Failed to connect to Neo4j")?;

    let index = Neo4jVectorIndex::new(graph.clone(), embedder, config.embedding.dimension);
    index
        .ensure_collection(&config.ingest.collection)
        .await
        .context("Failed to create vector index")?;

    Ok((Arc::new(Neo4jGraphStore::new(graph)), Arc::new(index)))
}

#[cfg(not(feature = "neo4j"))]
async fn create_neo4j_stores(
    _config: &Config,
    _secrets: &Secrets,
    _embedder: Arc<dyn Embedder>,
) -> Result<(Arc<dyn ConceptGraphStore>, Arc<dyn VectorIndex>)> {
    anyhow::bail!("Neo4j backend requested but cgraph was built without the `neo4j` feature")
}

/// Log ingestion progress until the pipeline is dropped. Returns the number
/// of updates seen; lagged updates are skipped, not fatal.
async fn report_progress(mut updates: broadcast::Receiver<IngestUpdate>) -> usize {
    let mut seen = 0;
    loop {
        let update = match updates.recv().await {
            Ok(update) => update,
            Err(RecvError::Lagged(missed)) => {
                warn!("Progress output skipped {} updates", missed);
                continue;
            }
            Err(RecvError::Closed) => break,
        };
        seen += 1;
        match update {
            IngestUpdate::DocumentStarted { document } => {
                info!("Ingesting {}", document);
            }
            IngestUpdate::EdgesSkipped { document, count } => {
                warn!("{}: skipped {} invalid relations", document, count);
            }
            IngestUpdate::IndexWriteFailed { document, error } => {
                warn!("{}: vector index write failed: {}", document, error);
            }
            IngestUpdate::DocumentIngested { .. } | IngestUpdate::DocumentFailed { .. } => {}
        }
    }
    seen
}

fn init_logging(verbose: bool, config: &Config) -> Result<()> {
    let level = if verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let filter = EnvFilter::try_new(level)
        .with_context(|| format!("Invalid log level: {level}"))?;

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(Some(path.clone()))
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load().context("Failed to load config")?,
    };

    init_logging(cli.verbose, &config)?;

    match cli.command {
        Commands::Ingest {
            files,
            strict,
            concurrency,
        } => {
            for file in &files {
                if !file.exists() {
                    anyhow::bail!("File does not exist: {}", file.display());
                }
            }

            let secrets = Secrets::from_env();
            if secrets.llm_api_key.is_none() {
                warn!("No LLM API key set (CGRAPH_LLM_API_KEY or OPENAI_API_KEY)");
            }

            let mut pipeline_config = config.to_pipeline_config();
            if strict {
                pipeline_config.strictness = Strictness::AbortOnInvalid;
            }

            let embedder = create_embedder(&config, &secrets)?;
            let (store, index) = create_stores(&config, &secrets, embedder).await?;

            let client =
                ChatClient::new(config.chat_config(&secrets)).context("Failed to create LLM client")?;
            let graph_extractor =
                LlmGraphExtractor::new(client).context("Failed to create graph extractor")?;

            let pipeline = IngestionPipeline::new(
                Arc::new(ExtractorRegistry::with_defaults(pipeline_config.strategy)),
                Arc::new(graph_extractor),
                store,
                index,
                pipeline_config,
            );
            pipeline
                .init()
                .await
                .context("Failed to initialize stores")?;

            // Subscribe to updates for progress
            let updates = pipeline.subscribe();
            let progress_handle = tokio::spawn(report_progress(updates));

            let documents: Vec<DocumentHandle> =
                files.into_iter().map(DocumentHandle::path).collect();
            let concurrency = concurrency.unwrap_or(config.ingest.concurrency);
            let results = pipeline.ingest_all(&documents, concurrency).await;
            let stats = pipeline.stats().await;

            drop(pipeline);
            let _ = progress_handle.await;

            let outputs: Vec<IngestOutput> = documents
                .iter()
                .zip(&results)
                .map(|(document, result)| IngestOutput::new(document, result))
                .collect();

            match cli.format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&outputs)?);
                }
                OutputFormat::Text => {
                    for output in &outputs {
                        match (&output.error, output.entity_count, output.relation_count) {
                            (Some(error), _, _) => {
                                println!("FAILED  {}: {}", output.document, error);
                            }
                            (None, Some(entities), Some(relations)) => {
                                println!(
                                    "OK      {}: {} concepts, {} relations",
                                    output.document, entities, relations
                                );
                                if output.skipped_edges > 0 {
                                    println!(
                                        "        skipped {} invalid relations",
                                        output.skipped_edges
                                    );
                                }
                                if let Some(ref error) = output.index_error {
                                    println!("        index write failed: {error}");
                                }
                            }
                            (None, _, _) => {}
                        }
                    }
                    println!(
                        "\n{} ingested, {} failed",
                        stats.documents_ingested, stats.documents_failed
                    );
                }
            }

            if stats.documents_failed > 0 {
                anyhow::bail!(
                    "{} of {} documents failed",
                    stats.documents_failed,
                    documents.len()
                );
            }
        }

        Commands::Status => {
            let secrets = Secrets::from_env();
            let embedder = create_embedder(&config, &secrets)?;
            let (store, _index) = create_stores(&config, &secrets, embedder).await?;
            store.init().await.context("Failed to initialize store")?;

            let stats = store.stats().await.context("Failed to read store stats")?;

            match cli.format {
                OutputFormat::Json => {
                    let output = StatusOutput {
                        backend: config.store.backend,
                        concepts: stats.concept_count,
                        relations: stats.relation_count,
                        last_updated: stats.last_updated.map(|t| t.to_rfc3339()),
                    };
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                OutputFormat::Text => {
                    println!("Concept graph ({:?} backend)", config.store.backend);
                    println!("  Concepts:  {}", stats.concept_count);
                    println!("  Relations: {}", stats.relation_count);
                    if let Some(last) = stats.last_updated {
                        println!("  Updated:   {}", last.format("%Y-%m-%d %H:%M:%S"));
                    }
                    if config.store.backend == StoreBackend::Memory {
                        println!("  (in-memory store; contents are not kept between runs)");
                    }
                }
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => match cli.format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&config)
                            .context("Failed to serialize config")?
                    );
                }
                OutputFormat::Text => {
                    println!(
                        "{}",
                        toml::to_string_pretty(&config).context("Failed to serialize config")?
                    );
                }
            },
            ConfigAction::Init => {
                println!("{}", Config::sample_toml());
            }
            ConfigAction::Path => {
                if let Some(path) = cli.config.or_else(Config::config_path) {
                    println!("{}", path.display());
                } else {
                    println!("Could not determine config directory");
                }
            }
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_progress_survives_lag() {
        let (tx, rx) = broadcast::channel(1);
        for document in ["a.txt", "b.txt", "c.txt"] {
            tx.send(IngestUpdate::DocumentStarted {
                document: document.to_string(),
            })
            .unwrap();
        }
        drop(tx);

        // Two updates are overwritten; the last one still arrives.
        assert_eq!(report_progress(rx).await, 1);
    }

    #[tokio::test]
    async fn test_progress_ends_when_closed() {
        let (tx, rx) = broadcast::channel(16);
        tx.send(IngestUpdate::EdgesSkipped {
            document: "a.txt".to_string(),
            count: 2,
        })
        .unwrap();
        drop(tx);

        assert_eq!(report_progress(rx).await, 1);
    }
}
