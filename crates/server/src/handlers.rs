//! One handler per pre-built wrapper stack.
//!
//! Stacks are assembled innermost-first: authentication sits directly on
//! the API client, pagination pages the authenticated client, geometry
//! fan-out repeats the paginated search per part, and collection fan-out
//! repeats all of that per collection.

use crate::config::AppState;
use crate::error::{fill_supported_params, payload_response};
use crate::params::{self, RouteOptions};
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use ngd_api::{ItemsClient, ItemsRequest, MultiGeometry, Paginated};

const BASE: RouteOptions = RouteOptions {
    paging: false,
    geometry: false,
    multi_collection: false,
};
const LIMIT: RouteOptions = RouteOptions {
    paging: true,
    geometry: false,
    multi_collection: false,
};
const GEOM: RouteOptions = RouteOptions {
    paging: false,
    geometry: true,
    multi_collection: false,
};
const LIMIT_GEOM: RouteOptions = RouteOptions {
    paging: true,
    geometry: true,
    multi_collection: false,
};
const COL: RouteOptions = RouteOptions {
    paging: false,
    geometry: false,
    multi_collection: true,
};
const LIMIT_COL: RouteOptions = RouteOptions {
    paging: true,
    geometry: false,
    multi_collection: true,
};
const GEOM_COL: RouteOptions = RouteOptions {
    paging: false,
    geometry: true,
    multi_collection: true,
};
const LIMIT_GEOM_COL: RouteOptions = RouteOptions {
    paging: true,
    geometry: true,
    multi_collection: true,
};

type Pairs = Vec<(String, String)>;

async fn run<C: ItemsClient>(client: C, request: ItemsRequest, options: RouteOptions) -> Response {
    match client.items(request).await {
        Ok(results) => Json(results).into_response(),
        Err(error) => {
            let mut payload = error.to_payload();
            fill_supported_params(&mut payload, &options.supported_params());
            payload_response(payload)
        }
    }
}

async fn single<C, F>(
    state: AppState,
    collection: String,
    pairs: Pairs,
    headers: HeaderMap,
    options: RouteOptions,
    build: F,
) -> Response
where
    C: ItemsClient,
    F: FnOnce(&AppState) -> C,
{
    match params::parse_request(Some(collection), &pairs, options, &headers) {
        Ok(request) => run(build(&state), request, options).await,
        Err(payload) => payload_response(payload),
    }
}

async fn multi<C, F>(
    state: AppState,
    pairs: Pairs,
    headers: HeaderMap,
    options: RouteOptions,
    build: F,
) -> Response
where
    C: ItemsClient,
    F: FnOnce(&AppState) -> C,
{
    match params::parse_request(None, &pairs, options, &headers) {
        Ok(request) => run(build(&state), request, options).await,
        Err(payload) => payload_response(payload),
    }
}

/// `GET /healthz`
pub(crate) async fn health() -> &'static str {
    "ok"
}

/// `GET /features/latest-collections`
pub(crate) async fn latest_collections(
    State(state): State<AppState>,
    Query(pairs): Query<Pairs>,
) -> Response {
    let (flag_recent_updates, recent_update_days) = match params::parse_latest_collections(&pairs)
    {
        Ok(parsed) => parsed,
        Err(payload) => return payload_response(payload),
    };
    if flag_recent_updates {
        match state.resolver.latest_versions_report(recent_update_days).await {
            Ok(report) => Json(report).into_response(),
            Err(error) => payload_response(error.to_payload()),
        }
    } else {
        match state.resolver.latest_versions().await {
            Ok(catalog) => Json(catalog.to_lookup()).into_response(),
            Err(error) => payload_response(error.to_payload()),
        }
    }
}

/// `GET /features/latest-collections/{collection}`
pub(crate) async fn latest_collection(
    State(state): State<AppState>,
    Path(collection): Path<String>,
) -> Response {
    match state.resolver.resolve(&[collection]).await {
        Ok(resolved) => Json(resolved).into_response(),
        Err(error) => payload_response(error.to_payload()),
    }
}

/// `GET /features/{collection}/items`
pub(crate) async fn items(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Query(pairs): Query<Pairs>,
    headers: HeaderMap,
) -> Response {
    single(state, collection, pairs, headers, BASE, |state| {
        state.client.clone()
    })
    .await
}

/// `GET /features/{collection}/items/auth`
pub(crate) async fn items_auth(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Query(pairs): Query<Pairs>,
    headers: HeaderMap,
) -> Response {
    single(state, collection, pairs, headers, BASE, |state| {
        state.authenticated(state.client.clone())
    })
    .await
}

/// `GET /features/{collection}/items/limit`
pub(crate) async fn items_limit(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Query(pairs): Query<Pairs>,
    headers: HeaderMap,
) -> Response {
    single(state, collection, pairs, headers, LIMIT, |state| {
        Paginated::new(state.client.clone())
    })
    .await
}

/// `GET /features/{collection}/items/geom`
pub(crate) async fn items_geom(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Query(pairs): Query<Pairs>,
    headers: HeaderMap,
) -> Response {
    single(state, collection, pairs, headers, GEOM, |state| {
        MultiGeometry::new(state.client.clone())
    })
    .await
}

/// `GET /features/{collection}/items/limit-geom`
pub(crate) async fn items_limit_geom(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Query(pairs): Query<Pairs>,
    headers: HeaderMap,
) -> Response {
    single(state, collection, pairs, headers, LIMIT_GEOM, |state| {
        MultiGeometry::new(Paginated::new(state.client.clone()))
    })
    .await
}

/// `GET /features/{collection}/items/auth-limit`
pub(crate) async fn items_auth_limit(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Query(pairs): Query<Pairs>,
    headers: HeaderMap,
) -> Response {
    single(state, collection, pairs, headers, LIMIT, |state| {
        Paginated::new(state.authenticated(state.client.clone()))
    })
    .await
}

/// `GET /features/{collection}/items/auth-geom`
pub(crate) async fn items_auth_geom(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Query(pairs): Query<Pairs>,
    headers: HeaderMap,
) -> Response {
    single(state, collection, pairs, headers, GEOM, |state| {
        MultiGeometry::new(state.authenticated(state.client.clone()))
    })
    .await
}

/// `GET /features/{collection}/items/auth-limit-geom`
pub(crate) async fn items_auth_limit_geom(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Query(pairs): Query<Pairs>,
    headers: HeaderMap,
) -> Response {
    single(state, collection, pairs, headers, LIMIT_GEOM, |state| {
        MultiGeometry::new(Paginated::new(state.authenticated(state.client.clone())))
    })
    .await
}

/// `GET /features/multi-collection/items/col`
pub(crate) async fn items_col(
    State(state): State<AppState>,
    Query(pairs): Query<Pairs>,
    headers: HeaderMap,
) -> Response {
    multi(state, pairs, headers, COL, |state| {
        state.multi_collection(state.client.clone())
    })
    .await
}

/// `GET /features/multi-collection/items/limit-col`
pub(crate) async fn items_limit_col(
    State(state): State<AppState>,
    Query(pairs): Query<Pairs>,
    headers: HeaderMap,
) -> Response {
    multi(state, pairs, headers, LIMIT_COL, |state| {
        state.multi_collection(Paginated::new(state.client.clone()))
    })
    .await
}

/// `GET /features/multi-collection/items/geom-col`
pub(crate) async fn items_geom_col(
    State(state): State<AppState>,
    Query(pairs): Query<Pairs>,
    headers: HeaderMap,
) -> Response {
    multi(state, pairs, headers, GEOM_COL, |state| {
        state.multi_collection(MultiGeometry::new(state.client.clone()))
    })
    .await
}

/// `GET /features/multi-collection/items/limit-geom-col`
pub(crate) async fn items_limit_geom_col(
    State(state): State<AppState>,
    Query(pairs): Query<Pairs>,
    headers: HeaderMap,
) -> Response {
    multi(state, pairs, headers, LIMIT_GEOM_COL, |state| {
        state.multi_collection(MultiGeometry::new(Paginated::new(state.client.clone())))
    })
    .await
}

/// `GET /features/multi-collection/items/auth-col`
pub(crate) async fn items_auth_col(
    State(state): State<AppState>,
    Query(pairs): Query<Pairs>,
    headers: HeaderMap,
) -> Response {
    multi(state, pairs, headers, COL, |state| {
        state.multi_collection(state.authenticated(state.client.clone()))
    })
    .await
}

/// `GET /features/multi-collection/items/auth-limit-col`
pub(crate) async fn items_auth_limit_col(
    State(state): State<AppState>,
    Query(pairs): Query<Pairs>,
    headers: HeaderMap,
) -> Response {
    multi(state, pairs, headers, LIMIT_COL, |state| {
        state.multi_collection(Paginated::new(state.authenticated(state.client.clone())))
    })
    .await
}

/// `GET /features/multi-collection/items/auth-geom-col`
pub(crate) async fn items_auth_geom_col(
    State(state): State<AppState>,
    Query(pairs): Query<Pairs>,
    headers: HeaderMap,
) -> Response {
    multi(state, pairs, headers, GEOM_COL, |state| {
        state.multi_collection(MultiGeometry::new(state.authenticated(state.client.clone())))
    })
    .await
}

/// `GET /features/multi-collection/items/auth-limit-geom-col`
pub(crate) async fn items_auth_limit_geom_col(
    State(state): State<AppState>,
    Query(pairs): Query<Pairs>,
    headers: HeaderMap,
) -> Response {
    multi(state, pairs, headers, LIMIT_GEOM_COL, |state| {
        state.multi_collection(MultiGeometry::new(Paginated::new(
            state.authenticated(state.client.clone()),
        )))
    })
    .await
}
