//! API router.
//!
//! Layers (outermost first): CORS → request log → nosniff → body limit → handler.

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::config::{API_PREFIX, UPLOADS_MOUNT};

/// Room for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Build the full application router.
///
/// NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
pub fn build_router(ctx: ApiContext) -> Router {
    let body_limit = ctx.config.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;
    let uploads = ServeDir::new(&ctx.config.upload_dir);
    let cors = cors_layer(&ctx.config.cors_origins);

    let api = Router::new()
        .route(
            "/patients",
            post(endpoints::patients::create).get(endpoints::patients::list),
        )
        .route(
            "/patients/:id",
            get(endpoints::patients::detail)
                .put(endpoints::patients::update)
                .delete(endpoints::patients::delete),
        )
        .route(
            "/medications",
            post(endpoints::medications::create).get(endpoints::medications::list),
        )
        .route(
            "/medications/:id",
            get(endpoints::medications::detail)
                .put(endpoints::medications::update)
                .delete(endpoints::medications::delete),
        )
        .route(
            "/reconciliations",
            post(endpoints::reconciliations::start).get(endpoints::reconciliations::list),
        )
        .route(
            "/reconciliations/:id",
            get(endpoints::reconciliations::detail).put(endpoints::reconciliations::update),
        )
        .route(
            "/reconciliations/:id/complete",
            post(endpoints::reconciliations::complete),
        )
        .route("/upload/image", post(endpoints::upload::upload_image))
        .route("/upload/images/:filename", get(endpoints::upload::get_image));

    Router::new()
        .route("/", get(endpoints::health::root))
        .route("/health", get(endpoints::health::check))
        .nest(API_PREFIX, api)
        .nest_service(UPLOADS_MOUNT, uploads)
        .with_state(ctx)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(axum::middleware::from_fn(middleware::audit::log_request))
        .layer(cors)
}

/// Empty origin list means any origin (development).
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    if origins.is_empty() {
        return layer.allow_origin(Any);
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(allowed)
}
