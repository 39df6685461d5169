//! # API Server Module
//!
//! ## Purpose
//! REST API server exposing document upload/download, free-text search and
//! index management for the file search engine.
//!
//! ## Input/Output Specification
//! - **Input**: HTTP requests with raw file bodies and search queries
//! - **Output**: JSON responses with upload outcomes, ranked results, system
//!   status; raw bytes on download
//! - **Endpoints**: Files, search, index rebuild, health, stats
//!
//! ## Key Features
//! - Raw-body uploads with a configurable payload size limit
//! - CORS support for web frontends
//! - Structured JSON error responses mapped from the engine's error taxonomy

use crate::errors::SearchError;
use crate::search::SearchQuery;
use crate::utils::{Timer, ValidationUtils};
use actix_cors::Cors;
use actix_web::{web, App, HttpResponse, HttpServer, Result as ActixResult};
use serde::Serialize;
use uuid::Uuid;

/// REST API server over the shared application state.
pub struct ApiServer {
    app_state: crate::AppState,
}

/// Search response payload
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<crate::SearchResult>,
    pub total_results: usize,
    pub query_time_ms: u64,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub components: HealthComponents,
}

/// Component health status
#[derive(Debug, Serialize)]
pub struct HealthComponents {
    pub index: String,
    pub document_store: String,
}

impl ApiServer {
    /// Create new API server
    pub fn new(app_state: crate::AppState) -> Self {
        Self { app_state }
    }

    /// Run the API server until the process is stopped
    pub async fn run(self) -> crate::Result<()> {
        let server = &self.app_state.config.server;
        let bind_addr = format!("{}:{}", server.host, server.port);
        let workers = server.workers;
        let payload_limit = server.max_payload_size_mb * 1024 * 1024;
        let enable_cors = server.enable_cors;

        tracing::info!("Starting API server on {}", bind_addr);

        let app_state = self.app_state;
        let server = HttpServer::new(move || {
            let cors = if enable_cors {
                Cors::permissive()
            } else {
                Cors::default()
            };

            App::new()
                .wrap(cors)
                .app_data(web::Data::new(app_state.clone()))
                .app_data(web::PayloadConfig::new(payload_limit))
                .configure(routes)
        })
        .workers(workers)
        .bind(&bind_addr)
        .map_err(|e| SearchError::Internal {
            message: format!("Failed to bind server to {}: {}", bind_addr, e),
        })?
        .run();

        server.await.map_err(|e| SearchError::Internal {
            message: format!("Server error: {}", e),
        })?;

        Ok(())
    }
}

/// Route table, shared by the server and the handler tests
pub fn routes(cfg: &mut web::ServiceConfig) {
    // POST takes the file name, GET takes the document id; the extractors
    // pull the single path segment positionally
    cfg.service(
        web::resource("/api/files/{filename}")
            .route(web::post().to(upload_handler))
            .route(web::get().to(download_handler)),
    )
    .route("/api/search", web::get().to(search_handler))
        .route("/api/index/rebuild", web::post().to(rebuild_handler))
        .route("/health", web::get().to(health_handler))
        .route("/stats", web::get().to(stats_handler))
        .route("/", web::get().to(index_handler));
}

/// Upload endpoint handler: the raw request body is the file content
async fn upload_handler(
    app_state: web::Data<crate::AppState>,
    path: web::Path<String>,
    body: web::Bytes,
) -> ActixResult<HttpResponse> {
    let file_name = path.into_inner();

    match app_state.documents.upload(&body, &file_name).await {
        Ok(outcome) if outcome.accepted => Ok(HttpResponse::Created().json(outcome)),
        Ok(outcome) => Ok(HttpResponse::Conflict().json(outcome)),
        Err(e) => {
            tracing::error!("Upload error for '{}': {}", file_name, e);
            Ok(error_response(&e))
        }
    }
}

/// Download endpoint handler
async fn download_handler(
    app_state: web::Data<crate::AppState>,
    path: web::Path<Uuid>,
) -> ActixResult<HttpResponse> {
    let id = path.into_inner();

    match app_state.documents.download(id).await {
        Ok((document, content)) => Ok(HttpResponse::Ok()
            .content_type(content_type_for(&document.file_extension))
            .insert_header((
                "Content-Disposition",
                format!("attachment; filename=\"{}\"", document.file_name),
            ))
            .body(content)),
        Err(e) => {
            tracing::warn!("Download error for {}: {}", id, e);
            Ok(error_response(&e))
        }
    }
}

/// Search endpoint handler
async fn search_handler(
    app_state: web::Data<crate::AppState>,
    query: web::Query<SearchQuery>,
) -> ActixResult<HttpResponse> {
    let timer = Timer::new("api_search");
    let search_config = &app_state.config.search;

    if !ValidationUtils::is_valid_search_query(&query.q, search_config.max_query_length) {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "error": "validation",
            "message": format!(
                "Query must be non-empty and at most {} characters",
                search_config.max_query_length
            ),
        })));
    }

    let max_results = query
        .max_results
        .unwrap_or(search_config.default_max_results);

    match app_state.search.search(&query.q, max_results).await {
        Ok(results) => {
            let response = SearchResponse {
                total_results: results.len(),
                results,
                query_time_ms: timer.elapsed_ms(),
            };
            Ok(HttpResponse::Ok().json(response))
        }
        Err(e) => {
            tracing::error!("Search error for '{}': {}", query.q, e);
            Ok(error_response(&e))
        }
    }
}

/// Index rebuild endpoint handler
async fn rebuild_handler(app_state: web::Data<crate::AppState>) -> ActixResult<HttpResponse> {
    match app_state.indexing.rebuild_index().await {
        Ok(report) => Ok(HttpResponse::Ok().json(report)),
        Err(e) => {
            tracing::error!("Index rebuild error: {}", e);
            Ok(error_response(&e))
        }
    }
}

/// Health check endpoint handler
async fn health_handler(app_state: web::Data<crate::AppState>) -> ActixResult<HttpResponse> {
    let store_status = match app_state.document_store.get_all().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let response = HealthResponse {
        status: store_status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        components: HealthComponents {
            index: "healthy".to_string(),
            document_store: store_status.to_string(),
        },
    };

    Ok(HttpResponse::Ok().json(response))
}

/// Statistics endpoint handler
async fn stats_handler(app_state: web::Data<crate::AppState>) -> ActixResult<HttpResponse> {
    let index_stats = app_state.index.stats();
    let document_count = match app_state.document_store.get_all().await {
        Ok(documents) => documents.len(),
        Err(e) => {
            tracing::error!("Stats error: {}", e);
            return Ok(error_response(&e));
        }
    };

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "documents": document_count,
        "index": index_stats,
    })))
}

/// Index page handler
async fn index_handler() -> ActixResult<HttpResponse> {
    let html = r#"
    <!DOCTYPE html>
    <html>
    <head>
        <title>File Search Engine</title>
        <style>
            body { font-family: Arial, sans-serif; margin: 40px; }
            .header { color: #2c3e50; }
            .endpoint { margin: 20px 0; padding: 15px; background: #f8f9fa; border-radius: 5px; }
            .method { font-weight: bold; color: #27ae60; }
        </style>
    </head>
    <body>
        <h1 class="header">File Search Engine API</h1>
        <p>Upload documents and search their content with TF-IDF ranking.</p>

        <h2>Available Endpoints</h2>

        <div class="endpoint">
            <span class="method">POST</span> /api/files/{filename}
            <p>Upload a file; the raw request body is the file content.</p>
        </div>

        <div class="endpoint">
            <span class="method">GET</span> /api/files/{id}
            <p>Download a previously uploaded file by its id.</p>
        </div>

        <div class="endpoint">
            <span class="method">GET</span> /api/search?q=...&amp;max_results=10
            <p>Search uploaded documents with a free-text query.</p>
        </div>

        <div class="endpoint">
            <span class="method">POST</span> /api/index/rebuild
            <p>Clear and rebuild the inverted index from stored documents.</p>
        </div>

        <div class="endpoint">
            <span class="method">GET</span> /health
            <p>Check the health status of the system components.</p>
        </div>

        <div class="endpoint">
            <span class="method">GET</span> /stats
            <p>Get document and index statistics.</p>
        </div>
    </body>
    </html>
    "#;

    Ok(HttpResponse::Ok().content_type("text/html").body(html))
}

/// Map an engine error onto an HTTP status with a JSON body
fn error_response(e: &SearchError) -> HttpResponse {
    let body = serde_json::json!({
        "error": e.category(),
        "message": e.to_string(),
    });

    if e.is_not_found() {
        HttpResponse::NotFound().json(body)
    } else {
        match e {
            SearchError::Validation { .. } | SearchError::UnsupportedFormat { .. } => {
                HttpResponse::BadRequest().json(body)
            }
            _ => HttpResponse::InternalServerError().json(body),
        }
    }
}

/// MIME type for the download response, by stored extension
fn content_type_for(extension: &str) -> &'static str {
    match extension {
        "txt" => "text/plain; charset=utf-8",
        "pdf" => "application/pdf",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, IndexingConfig, SearchConfig};
    use crate::index::InvertedIndex;
    use crate::indexing::IndexingService;
    use crate::search::SearchService;
    use crate::storage::{DocumentStore, FileContentStore, InMemoryDocumentStore};
    use crate::text_processing::TextProcessor;
    use actix_web::{test, App};
    use std::sync::Arc;

    async fn app_state(dir: &tempfile::TempDir) -> crate::AppState {
        let index = Arc::new(InvertedIndex::new());
        let text_processor = Arc::new(TextProcessor::new().unwrap());
        let document_store: Arc<dyn DocumentStore> = Arc::new(InMemoryDocumentStore::new());
        let content = Arc::new(
            FileContentStore::new(dir.path().to_path_buf(), false)
                .await
                .unwrap(),
        );

        let indexing = Arc::new(IndexingService::new(
            index.clone(),
            text_processor.clone(),
            document_store.clone(),
            content.clone(),
            IndexingConfig::default(),
        ));
        let search = Arc::new(SearchService::new(
            index.clone(),
            text_processor,
            document_store.clone(),
            content.clone(),
            SearchConfig::default(),
        ));
        let documents = Arc::new(crate::documents::DocumentService::new(
            document_store.clone(),
            content,
            indexing.clone(),
        ));

        crate::AppState {
            config: Arc::new(Config::default()),
            documents,
            search,
            indexing,
            index,
            document_store,
        }
    }

    #[actix_web::test]
    async fn upload_download_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(&dir).await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/files/notes.txt")
            .set_payload("searchable body text")
            .to_request();
        let outcome: crate::UploadOutcome = test::call_and_read_body_json(&app, req).await;
        assert!(outcome.accepted);

        let req = test::TestRequest::get()
            .uri(&format!("/api/files/{}", outcome.document_id.unwrap()))
            .to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(&body[..], b"searchable body text");
    }

    #[actix_web::test]
    async fn duplicate_upload_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(&dir).await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/files/dup.txt")
            .set_payload("same")
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 201);

        let req = test::TestRequest::post()
            .uri("/api/files/dup.txt")
            .set_payload("same")
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 409);
    }

    #[actix_web::test]
    async fn search_after_rebuild_finds_upload() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(&dir).await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/files/report.txt")
            .set_payload("quarterly revenue exceeded expectations")
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 201);

        // Rebuild indexes synchronously, no need to wait for the worker
        let req = test::TestRequest::post()
            .uri("/api/index/rebuild")
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 200);

        let req = test::TestRequest::get()
            .uri("/api/search?q=revenue")
            .to_request();
        let response: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(response["total_results"], 1);
        assert_eq!(response["results"][0]["file_name"], "report.txt");
    }

    #[actix_web::test]
    async fn blank_query_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(&dir).await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(routes),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/search?q=%20%20")
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 400);
    }

    #[actix_web::test]
    async fn unknown_download_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(&dir).await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(routes),
        )
        .await;

        let req = test::TestRequest::get()
            .uri(&format!("/api/files/{}", uuid::Uuid::new_v4()))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 404);
    }
}
