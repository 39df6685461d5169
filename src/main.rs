//! # File Search Engine Main Driver
//!
//! ## Purpose
//! Main entry point for the file search engine server. Orchestrates
//! initialization of all system components and starts the web server for
//! handling upload and search requests.
//!
//! ## Input/Output Specification
//! - **Input**: Configuration files, command line arguments, environment variables
//! - **Output**: Running web server with upload/search API endpoints
//! - **Initialization**: Opens stores, spawns the indexing worker, optional rebuild
//!
//! ## Architecture Flow
//! 1. Parse command line arguments and load configuration
//! 2. Initialize logging and tracing
//! 3. Open document and content stores
//! 4. Start the background indexing pipeline
//! 5. Start web API server
//! 6. Handle shutdown signals gracefully

use clap::{Arg, Command};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use file_search_engine::{
    api::ApiServer,
    config::{Config, DocumentStoreKind},
    documents::DocumentService,
    errors::Result,
    index::InvertedIndex,
    indexing::IndexingService,
    search::SearchService,
    storage::{DocumentStore, FileContentStore, InMemoryDocumentStore, SledDocumentStore},
    text_processing::TextProcessor,
    AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("file-search-server")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Document upload and TF-IDF full-text search server")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("config.toml"),
        )
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .help("Server port")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("rebuild-index")
                .long("rebuild-index")
                .help("Rebuild the inverted index from stored documents on startup")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let config_path = matches.get_one::<String>("config").unwrap();
    let mut config = Config::from_file(config_path)?;

    if let Some(port) = matches.get_one::<u16>("port") {
        config.server.port = *port;
    }

    let config = Arc::new(config);

    init_logging(&config);

    info!("Starting File Search Engine v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded from: {}", config_path);

    let app_state = initialize_components(config.clone()).await?;

    if matches.get_flag("rebuild-index") {
        info!("Rebuilding index from stored documents...");
        let report = app_state.indexing.rebuild_index().await?;
        info!(
            "Startup rebuild indexed {}/{} documents",
            report.indexed, report.total
        );
    }

    let server = ApiServer::new(app_state.clone());
    let server_handle = tokio::spawn(async move {
        if let Err(e) = server.run().await {
            error!("Server error: {}", e);
        }
    });

    info!(
        "File Search Engine started on {}:{}",
        config.server.host, config.server.port
    );

    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Received SIGINT, shutting down gracefully...");
        }
        _ = server_handle => {
            warn!("Server stopped unexpectedly");
        }
    }

    app_state.indexing.shutdown().await;
    info!("File Search Engine shut down successfully");

    Ok(())
}

/// Initialize logging and tracing
fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let registry = tracing_subscriber::registry();

    if config.logging.json_format {
        registry
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true).json())
            .init();
    } else {
        registry
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }

    info!("Logging initialized with level: {}", config.logging.level);
}

/// Initialize all application components
async fn initialize_components(config: Arc<Config>) -> Result<AppState> {
    info!("Initializing application components...");

    let document_store: Arc<dyn DocumentStore> = match config.storage.db_type {
        DocumentStoreKind::Sled => {
            info!("Opening sled document store at {:?}", config.storage.db_path);
            Arc::new(SledDocumentStore::open(&config.storage.db_path).await?)
        }
        DocumentStoreKind::Memory => {
            warn!("Using in-memory document store; metadata will not survive restarts");
            Arc::new(InMemoryDocumentStore::new())
        }
    };

    let content = Arc::new(
        FileContentStore::new(
            config.storage.content_dir.clone(),
            config.storage.enable_compression,
        )
        .await?,
    );

    let index = Arc::new(InvertedIndex::new());
    let text_processor = Arc::new(TextProcessor::new()?);

    let indexing = Arc::new(IndexingService::new(
        index.clone(),
        text_processor.clone(),
        document_store.clone(),
        content.clone(),
        config.indexing.clone(),
    ));

    let search = Arc::new(SearchService::new(
        index.clone(),
        text_processor,
        document_store.clone(),
        content.clone(),
        config.search.clone(),
    ));

    let documents = Arc::new(DocumentService::new(
        document_store.clone(),
        content,
        indexing.clone(),
    ));

    info!("All components initialized successfully");

    Ok(AppState {
        config,
        documents,
        search,
        indexing,
        index,
        document_store,
    })
}
