//! Query-string marshaling.
//!
//! Wrapper parameters are parsed here and consumed; everything else passes
//! through to the upstream query string, where the upstream rejects what it
//! does not recognise. Which parameters count as wrapper parameters depends
//! on the route: on a paginated route `limit` means the total feature cap,
//! anywhere else it is the upstream page size.

use axum::http::HeaderMap;
use ngd_api::{Crs, ERROR_SOURCE_WRAPPER, ErrorPayload, ItemsRequest, SearchArea};

/// Which wrapper parameters a route understands.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct RouteOptions {
    /// The route pages results: `limit` and `request-limit` are wrapper
    /// parameters.
    pub(crate) paging: bool,

    /// The route fans out across a multi-geometry: `wkt` is required and
    /// `hierarchical-output` is available.
    pub(crate) geometry: bool,

    /// The route fans out across collections: the `collection` list comes
    /// from the query string and `hierarchical-output` is available.
    pub(crate) multi_collection: bool,
}

impl RouteOptions {
    /// The wrapper parameters this route supports, for error messages.
    pub(crate) fn supported_params(&self) -> Vec<&'static str> {
        let mut params = vec!["wkt", "use-latest-collection"];
        if self.geometry || self.multi_collection {
            params.push("hierarchical-output");
        }
        if self.paging {
            params.extend(["limit", "request-limit"]);
        }
        if self.multi_collection {
            params.push("collection");
        }
        params
    }
}

/// Parses query-string pairs into an [ItemsRequest].
///
/// `collection` is the path parameter on single-collection routes; on
/// multi-collection routes the list arrives comma-separated in the query
/// string.
pub(crate) fn parse_request(
    collection: Option<String>,
    pairs: &[(String, String)],
    options: RouteOptions,
    headers: &HeaderMap,
) -> Result<ItemsRequest, ErrorPayload> {
    let mut request = match collection {
        Some(collection) => ItemsRequest::new(collection),
        None => ItemsRequest::default(),
    };
    for (key, value) in pairs {
        match key.as_str() {
            "wkt" => request.search_area = Some(SearchArea::Wkt(value.clone())),
            "use-latest-collection" => {
                request.use_latest_collection = parse_bool(key, value)?;
            }
            "hierarchical-output" if options.geometry || options.multi_collection => {
                request.hierarchical_output = parse_bool(key, value)?;
            }
            "limit" if options.paging => request.limit = Some(parse_integer(key, value)?),
            "request-limit" if options.paging => {
                request.request_limit = Some(parse_integer(key, value)?);
            }
            "collection" if options.multi_collection => {
                // Accepts both a comma-joined list and a repeated parameter.
                request.collections.extend(
                    value
                        .split(',')
                        .map(|c| c.trim().to_string())
                        .filter(|c| !c.is_empty()),
                );
            }
            "bbox" => request.query.bbox = Some(value.clone()),
            "bbox-crs" => request.query.bbox_crs = Some(Crs::parse(value)),
            "crs" => request.query.crs = Some(Crs::parse(value)),
            "datetime" => request.query.datetime = Some(value.clone()),
            "filter" => request.query.filter = Some(value.clone()),
            "filter-crs" => request.query.filter_crs = Some(Crs::parse(value)),
            "filter-lang" => request.query.filter_lang = Some(value.clone()),
            "limit" => request.query.limit = Some(parse_integer(key, value)?),
            "offset" => request.query.offset = Some(parse_integer(key, value)?),
            _ => {
                request
                    .query
                    .additional_params
                    .insert(key.clone(), value.clone());
            }
        }
    }
    if options.geometry && request.search_area.is_none() {
        return Err(missing_param("wkt"));
    }
    if options.multi_collection && request.collections.is_empty() {
        return Err(missing_param("collection"));
    }
    for (name, value) in headers {
        if let Ok(value) = value.to_str() {
            request.headers.push((name.as_str().to_string(), value.to_string()));
        }
    }
    Ok(request)
}

/// Parameters of the latest-collections routes; unknown parameters are
/// ignored.
pub(crate) fn parse_latest_collections(
    pairs: &[(String, String)],
) -> Result<(bool, u64), ErrorPayload> {
    let mut flag_recent_updates = true;
    let mut recent_update_days = ngd_api::DEFAULT_RECENT_UPDATE_DAYS;
    for (key, value) in pairs {
        match key.as_str() {
            "flag-recent-updates" => flag_recent_updates = parse_bool(key, value)?,
            "recent-update-days" => recent_update_days = parse_integer(key, value)?,
            _ => {}
        }
    }
    Ok((flag_recent_updates, recent_update_days))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ErrorPayload> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(invalid_param(key, value)),
    }
}

fn parse_integer(key: &str, value: &str) -> Result<u64, ErrorPayload> {
    value.parse().map_err(|_| invalid_param(key, value))
}

fn invalid_param(key: &str, value: &str) -> ErrorPayload {
    ErrorPayload::new(
        400,
        format!("invalid value {value:?} for parameter {key:?}"),
        ERROR_SOURCE_WRAPPER,
    )
}

fn missing_param(key: &str) -> ErrorPayload {
    ErrorPayload::new(
        400,
        format!("missing required parameter {key:?}"),
        ERROR_SOURCE_WRAPPER,
    )
}

#[cfg(test)]
mod tests {
    use super::{RouteOptions, parse_latest_collections, parse_request};
    use axum::http::HeaderMap;

    fn pairs(entries: &[(&str, &str)]) -> Vec<(String, String)> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    const PAGED_GEOM: RouteOptions = RouteOptions {
        paging: true,
        geometry: true,
        multi_collection: false,
    };

    #[test]
    fn wrapper_params_are_consumed_and_the_rest_pass_through() {
        let request = parse_request(
            Some("bld-fts-buildingline-2".to_string()),
            &pairs(&[
                ("wkt", "POINT(1 2)"),
                ("use-latest-collection", "true"),
                ("limit", "250"),
                ("request-limit", "10"),
                ("filter-crs", "27700"),
                ("frobnicate", "x"),
            ]),
            PAGED_GEOM,
            &HeaderMap::new(),
        )
        .unwrap();
        assert_eq!(request.collections, vec!["bld-fts-buildingline-2"]);
        assert!(request.use_latest_collection);
        assert_eq!(request.limit, Some(250));
        assert_eq!(request.request_limit, Some(10));
        assert!(request.search_area.is_some());
        assert_eq!(request.query.filter_crs, Some(ngd_api::Crs::Epsg(27700)));
        assert_eq!(request.query.additional_params["frobnicate"], "x");
        assert!(request.query.limit.is_none());
    }

    #[test]
    fn limit_is_an_upstream_parameter_on_unpaged_routes() {
        let request = parse_request(
            Some("bld-fts-buildingline-2".to_string()),
            &pairs(&[("limit", "10")]),
            RouteOptions::default(),
            &HeaderMap::new(),
        )
        .unwrap();
        assert!(request.limit.is_none());
        assert_eq!(request.query.limit, Some(10));
    }

    #[test]
    fn the_collection_list_splits_on_commas() {
        let request = parse_request(
            None,
            &pairs(&[("collection", "bld-fts-buildingpart,bld-fts-buildingline-2")]),
            RouteOptions {
                multi_collection: true,
                ..Default::default()
            },
            &HeaderMap::new(),
        )
        .unwrap();
        assert_eq!(
            request.collections,
            vec!["bld-fts-buildingpart", "bld-fts-buildingline-2"]
        );
    }

    #[test]
    fn a_geometry_route_requires_wkt() {
        let error = parse_request(
            Some("bld-fts-buildingline-2".to_string()),
            &[],
            RouteOptions {
                geometry: true,
                ..Default::default()
            },
            &HeaderMap::new(),
        )
        .unwrap_err();
        assert_eq!(error.code, 400);
    }

    #[test]
    fn a_bad_boolean_is_a_400() {
        let error = parse_request(
            Some("bld-fts-buildingline-2".to_string()),
            &pairs(&[("use-latest-collection", "maybe")]),
            RouteOptions::default(),
            &HeaderMap::new(),
        )
        .unwrap_err();
        assert_eq!(error.code, 400);
    }

    #[test]
    fn latest_collections_defaults() {
        let (flag, days) = parse_latest_collections(&[]).unwrap();
        assert!(flag);
        assert_eq!(days, ngd_api::DEFAULT_RECENT_UPDATE_DAYS);
        let (flag, days) = parse_latest_collections(&pairs(&[
            ("flag-recent-updates", "false"),
            ("recent-update-days", "7"),
            ("ignored", "yes"),
        ]))
        .unwrap();
        assert!(!flag);
        assert_eq!(days, 7);
    }

    #[test]
    fn supported_params_follow_the_route_shape() {
        assert_eq!(
            PAGED_GEOM.supported_params(),
            vec![
                "wkt",
                "use-latest-collection",
                "hierarchical-output",
                "limit",
                "request-limit"
            ]
        );
        assert_eq!(
            RouteOptions::default().supported_params(),
            vec!["wkt", "use-latest-collection"]
        );
    }
}
