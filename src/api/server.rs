//! HTTP server implementation for the API

use anyhow::Result;
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{info, warn};

use super::handlers;
use super::models::{EpisodeForm, ErrorBody};
use crate::catalog::CatalogStore;
use crate::config::Config;
use crate::error::EchoLineError;
use crate::media::MediaLayout;
use crate::video::ThumbnailGenerator;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub catalog: CatalogStore,
    pub layout: MediaLayout,
    pub thumbnails: ThumbnailGenerator,
}

impl AppState {
    /// Wire the catalog, media layout and thumbnail generator from `config`
    pub async fn from_config(config: Arc<Config>) -> crate::error::Result<Self> {
        let catalog = CatalogStore::open(config.catalog_path()).await?;
        let layout = MediaLayout::from_config(&config);
        layout.ensure_dirs().await?;
        let thumbnails = ThumbnailGenerator::new(&config.thumbnails);

        Ok(Self {
            config,
            catalog,
            layout,
            thumbnails,
        })
    }
}

/// Routes for the management API, with static files for everything else
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let static_files = ServeDir::new(state.layout.root()).append_index_html_on_directories(true);
    let body_limit = state.config.server.max_upload_bytes;

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/health", get(health_handler))
        .route("/api/episodes", get(list_episodes_handler))
        .route("/api/episode", post(add_episode_handler))
        .route(
            "/api/episode/:index",
            put(update_episode_handler).delete(delete_episode_handler),
        )
        .route("/api/generate-thumbnails", post(generate_thumbnails_handler))
        .fallback_service(static_files)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
}

/// Configure and start the HTTP server
pub async fn start_http_server(config: Arc<Config>) -> Result<()> {
    let address = format!("{}:{}", config.server.host, config.server.port);
    info!("🚀 Starting HTTP server on {}", address);

    let state = AppState::from_config(config).await?;
    info!("📁 Serving {}", state.layout.root().display());
    info!("📚 Catalog at {}", state.catalog.path().display());

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("🌐 EchoLine listening on http://{}", address);

    axum::serve(listener, app).await?;

    Ok(())
}

fn status_for(error: &EchoLineError) -> StatusCode {
    match error {
        EchoLineError::NotFound(_) => StatusCode::NOT_FOUND,
        EchoLineError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for EchoLineError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        if status.is_server_error() {
            warn!("Request failed: {}", self);
        }
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

fn respond<T: Serialize>(result: crate::error::Result<T>) -> Response {
    match result {
        Ok(data) => (StatusCode::OK, Json(data)).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn read_form(mut multipart: Multipart) -> crate::error::Result<EpisodeForm> {
    let mut form = EpisodeForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| EchoLineError::invalid(format!("Malformed multipart body: {e}")))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        let file_name = field.file_name().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| EchoLineError::invalid(format!("Failed to read field {name}: {e}")))?;
        form.accept(&name, file_name, bytes.to_vec());
    }

    Ok(form)
}

/// Health check handler
async fn health_handler() -> Response {
    respond(handlers::health_check().await)
}

/// List episodes handler
async fn list_episodes_handler(State(state): State<AppState>) -> Response {
    respond(handlers::list_episodes(&state).await)
}

/// Add episode handler
async fn add_episode_handler(State(state): State<AppState>, multipart: Multipart) -> Response {
    match read_form(multipart).await {
        Ok(form) => respond(handlers::add_episode(&state, form).await),
        Err(e) => e.into_response(),
    }
}

/// Edit episode handler
async fn update_episode_handler(
    State(state): State<AppState>,
    Path(index): Path<usize>,
    multipart: Multipart,
) -> Response {
    match read_form(multipart).await {
        Ok(form) => respond(handlers::update_episode(&state, index, form).await),
        Err(e) => e.into_response(),
    }
}

/// Delete episode handler
async fn delete_episode_handler(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> Response {
    respond(handlers::delete_episode(&state, index).await)
}

/// Bulk thumbnail handler
async fn generate_thumbnails_handler(State(state): State<AppState>) -> Response {
    respond(handlers::generate_thumbnails(&state).await)
}
