//! Forum Topics Backend
//!
//! Categorised discussion topics with slug permalinks, server-rendered pages
//! and editor image uploads, persisted in SQLite.

mod api;
mod auth;
mod config;
mod content;
mod db;
mod errors;
mod factory;
mod lifecycle;
mod models;
mod policy;
mod upload;
mod views;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use tera::Tera;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::{LinkCache, Repository};
use upload::ImageUploader;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Arc<Config>,
    pub templates: Arc<Tera>,
    pub links: Arc<LinkCache>,
    pub uploader: Arc<ImageUploader>,
}

impl AppState {
    pub fn new(repo: Repository, config: Config, templates: Tera) -> Self {
        let links = LinkCache::new(Duration::from_secs(config.link_cache_secs));
        let uploader = ImageUploader::new(
            config.upload_dir.clone(),
            format!("{}/uploads", config.app_url),
        );

        Self {
            repo: Arc::new(repo),
            config: Arc::new(config),
            templates: Arc::new(templates),
            links: Arc::new(links),
            uploader: Arc::new(uploader),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Forum Topics Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Upload directory: {:?}", config.upload_dir);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Repository::new(pool);

    if let Some(count) = config.seed_topics {
        factory::seed_demo(&repo, count).await?;
    }

    tokio::fs::create_dir_all(&config.upload_dir).await?;

    let templates = views::templates()?;
    let bind_addr = config.bind_addr;

    let state = AppState::new(repo, config, templates);
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Server listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Multipart framing on top of the largest accepted file
    let body_limit = (state.config.upload_max_kb as usize + 64) * 1024 * 2;

    // Pages anyone can read
    let public_routes = Router::new()
        .route("/", get(api::root))
        .route("/topics", get(api::list_topics))
        .route("/topics/{id}", get(api::show_topic))
        .route("/topics/{id}/{slug}", get(api::show_topic_with_slug))
        .route("/health", get(health_check));

    // Writes need a signed-in user
    let member_routes = Router::new()
        .route("/topics/create", get(api::create_topic_form))
        .route("/topics", post(api::store_topic))
        .route("/topics/{id}/edit", get(api::edit_topic_form))
        .route(
            "/topics/{id}",
            post(api::update_topic)
                .put(api::update_topic)
                .patch(api::update_topic)
                .delete(api::destroy_topic),
        )
        .route("/upload_image", post(api::upload_image))
        .layer(DefaultBodyLimit::max(body_limit))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_user,
        ));

    let uploads = ServeDir::new(&state.config.upload_dir);

    Router::new()
        .merge(public_routes)
        .merge(member_routes)
        .nest_service("/uploads", uploads)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
