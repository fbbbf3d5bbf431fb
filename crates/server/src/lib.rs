//! A thin HTTP facade over the NGD request-composition pipeline.
//!
//! One route per pre-built wrapper stack: every combination of
//! authentication, pagination, multi-geometry fan-out, and multi-collection
//! fan-out is addressable by path, and the latest-collections catalog is
//! exposed alongside them. Responses are the pipeline's own JSON; error
//! payloads come back with their `code` as the HTTP status.

#![warn(missing_docs, unused_qualifications)]

mod config;
mod error;
mod handlers;
mod params;

pub use config::{AppState, Config};

use axum::{Router, routing::get};
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

/// Builds the facade router.
///
/// # Examples
///
/// ```
/// use ngd_server::Config;
///
/// let state = Config::default().build_state().unwrap();
/// let router = ngd_server::router(state);
/// ```
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(handlers::health))
        .route(
            "/features/latest-collections",
            get(handlers::latest_collections),
        )
        .route(
            "/features/latest-collections/{collection}",
            get(handlers::latest_collection),
        )
        .route("/features/{collection}/items", get(handlers::items))
        .route("/features/{collection}/items/auth", get(handlers::items_auth))
        .route(
            "/features/{collection}/items/limit",
            get(handlers::items_limit),
        )
        .route("/features/{collection}/items/geom", get(handlers::items_geom))
        .route(
            "/features/{collection}/items/limit-geom",
            get(handlers::items_limit_geom),
        )
        .route(
            "/features/{collection}/items/auth-limit",
            get(handlers::items_auth_limit),
        )
        .route(
            "/features/{collection}/items/auth-geom",
            get(handlers::items_auth_geom),
        )
        .route(
            "/features/{collection}/items/auth-limit-geom",
            get(handlers::items_auth_limit_geom),
        )
        .route(
            "/features/multi-collection/items/col",
            get(handlers::items_col),
        )
        .route(
            "/features/multi-collection/items/limit-col",
            get(handlers::items_limit_col),
        )
        .route(
            "/features/multi-collection/items/geom-col",
            get(handlers::items_geom_col),
        )
        .route(
            "/features/multi-collection/items/limit-geom-col",
            get(handlers::items_limit_geom_col),
        )
        .route(
            "/features/multi-collection/items/auth-col",
            get(handlers::items_auth_col),
        )
        .route(
            "/features/multi-collection/items/auth-limit-col",
            get(handlers::items_auth_limit_col),
        )
        .route(
            "/features/multi-collection/items/auth-geom-col",
            get(handlers::items_auth_geom_col),
        )
        .route(
            "/features/multi-collection/items/auth-limit-geom-col",
            get(handlers::items_auth_limit_geom_col),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(CatchPanicLayer::custom(panic_response))
        .with_state(state)
}

/// Anything that escapes a handler comes back as a generic 500 payload
/// rather than a dropped connection.
fn panic_response(
    _: Box<dyn std::any::Any + Send + 'static>,
) -> axum::http::Response<axum::body::Body> {
    let payload = ngd_api::ErrorPayload::new(
        500,
        "internal server error",
        ngd_api::ERROR_SOURCE_WRAPPER,
    );
    axum::http::Response::builder()
        .status(500)
        .header("content-type", "application/json")
        .body(axum::body::Body::from(
            serde_json::to_vec(&payload).unwrap_or_default(),
        ))
        .unwrap()
}
