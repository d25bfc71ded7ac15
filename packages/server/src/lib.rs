pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod index;
pub mod models;
pub mod routes;
pub mod state;
pub mod utils;

use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderValue, Method, header};
use hashbin_common::StorageEngine;
use hashbin_common::storage::filesystem::FilesystemBlobStore;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_axum::router::OpenApiRouter;
use utoipa_scalar::{Scalar, Servable as ScalarServable};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::{AppConfig, CorsConfig};
use crate::index::SeaOrmMetadataIndex;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "hashbin API",
        version = "1.0.0",
        description = "Content-addressed file storage with per-owner deletion"
    ),
    tags(
        (name = "Files", description = "Upload, download and delete stored files"),
        (name = "Health", description = "Liveness"),
    ),
    modifiers(&SecurityAddon),
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_default();
        components.add_security_scheme(
            "basic",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Basic).build()),
        );
    }
}

/// Open both stores named in `config` and wire them into an engine.
pub async fn build_engine(config: &AppConfig) -> anyhow::Result<StorageEngine> {
    let blobs = FilesystemBlobStore::new(config.storage.root.clone()).await?;
    let db = database::init_db(&config.database.url).await?;

    Ok(
        StorageEngine::new(Arc::new(blobs), Arc::new(SeaOrmMetadataIndex::new(db)))
            .with_compensation_policy(config.storage.compensation_policy()),
    )
}

fn cors_layer(cors: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = cors
        .allow_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(cors.max_age))
}

/// Build the application router.
pub fn build_router(state: AppState) -> axum::Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .merge(routes::file_routes(&state.config))
        .split_for_parts();

    let cors = cors_layer(&state.config.server.cors);

    router
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api.clone()))
        .merge(Scalar::with_url("/scalar", api))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
