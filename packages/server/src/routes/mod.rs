use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::config::AppConfig;
use crate::handlers::file;
use crate::state::AppState;

pub fn file_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(file::upload_file))
        .routes(routes!(file::download_file))
        .routes(routes!(file::delete_file))
        .routes(routes!(file::health))
        .layer(file::upload_body_limit(config.storage.max_upload_size))
}
