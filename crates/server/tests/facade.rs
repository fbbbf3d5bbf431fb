use axum::body::Body;
use axum::http::{Request, StatusCode};
use ngd_server::Config;
use serde_json::{Value, json};
use tower::ServiceExt;

async fn get(router: axum::Router, uri: &str) -> (StatusCode, Value) {
    let response = router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

fn router_for(server: &mockito::ServerGuard) -> axum::Router {
    let state = Config {
        base_url: server.url(),
        token_url: format!("{}/token", server.url()),
    }
    .build_state()
    .unwrap();
    ngd_server::router(state)
}

fn page<I, S>(ids: I, next: Option<&str>) -> String
where
    I: IntoIterator<Item = S>,
    S: ToString,
{
    let features: Vec<_> = ids
        .into_iter()
        .map(|id| json!({"id": id.to_string(), "properties": {}}))
        .collect();
    let mut links = Vec::new();
    if let Some(next) = next {
        links.push(json!({"rel": "next", "href": next}));
    }
    json!({
        "type": "FeatureCollection",
        "numberReturned": features.len(),
        "features": features,
        "links": links
    })
    .to_string()
}

#[tokio::test]
async fn the_base_items_route_returns_the_tagged_page() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/collections/bld-fts-buildingline-2/items/")
        .with_body(page(&["a"], None))
        .create_async()
        .await;

    let (status, body) = get(
        router_for(&server),
        "/features/bld-fts-buildingline-2/items",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["numberOfRequests"], json!(1));
    assert_eq!(body["features"][0]["collection"], json!("bld-fts-buildingline-2"));
}

#[tokio::test]
async fn the_limit_route_pages_through_the_upstream() {
    let mut server = mockito::Server::new_async().await;
    let url = server.url();
    server
        .mock("GET", "/collections/bld-fts-buildingline-2/items/")
        .match_query(mockito::Matcher::UrlEncoded(
            "offset".to_string(),
            "0".to_string(),
        ))
        .with_body(page(
            (0..100).map(|i| format!("f{i}")),
            Some(&format!("{url}?offset=100")),
        ))
        .create_async()
        .await;
    server
        .mock("GET", "/collections/bld-fts-buildingline-2/items/")
        .match_query(mockito::Matcher::AllOf(vec![
            mockito::Matcher::UrlEncoded("offset".to_string(), "100".to_string()),
            mockito::Matcher::UrlEncoded("limit".to_string(), "50".to_string()),
        ]))
        .with_body(page(
            (100..150).map(|i| format!("f{i}")),
            Some(&format!("{url}?offset=200")),
        ))
        .create_async()
        .await;

    let (status, body) = get(
        router_for(&server),
        "/features/bld-fts-buildingline-2/items/limit?limit=150",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["numberOfRequests"], json!(2));
    assert_eq!(body["numberReturned"], json!(150));
}

#[tokio::test]
async fn upstream_errors_come_back_with_their_code_and_the_route_params() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/collections/bld-fts-buildingline-2/items/")
        .match_query(mockito::Matcher::UrlEncoded(
            "frobnicate".to_string(),
            "1".to_string(),
        ))
        .with_status(400)
        .with_body(
            json!({
                "code": 400,
                "description": "Not supported query parameter: frobnicate. Supported parameters are: bbox."
            })
            .to_string(),
        )
        .create_async()
        .await;

    let (status, body) = get(
        router_for(&server),
        "/features/bld-fts-buildingline-2/items?frobnicate=1",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorSource"], json!("OS NGD API"));
    let description = body["description"].as_str().unwrap();
    assert!(description.contains("Supported NGD parameters are"));
    assert!(description.contains("wkt, use-latest-collection"));
    assert!(!description.contains("{attr}"));
}

#[tokio::test]
async fn a_geometry_route_without_wkt_is_a_wrapper_400() {
    let server = mockito::Server::new_async().await;
    let (status, body) = get(
        router_for(&server),
        "/features/bld-fts-buildingline-2/items/geom",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorSource"], json!("NGD API wrapper"));
}

#[tokio::test]
async fn the_geom_col_route_merges_collections_of_search_areas() {
    let mut server = mockito::Server::new_async().await;
    for collection in ["bld-fts-buildingpart-1", "bld-fts-buildingline-2"] {
        for (polygon, id) in [
            ("POLYGON((0 0,1 0,1 1,0 0))", format!("{collection}-a")),
            ("POLYGON((5 5,6 5,6 6,5 5))", format!("{collection}-b")),
        ] {
            server
                .mock("GET", format!("/collections/{collection}/items/").as_str())
                .match_query(mockito::Matcher::UrlEncoded(
                    "filter".to_string(),
                    format!("(INTERSECTS(geometry,{polygon}))"),
                ))
                .with_body(page(&[id.as_str()], None))
                .create_async()
                .await;
        }
    }

    let wkt = "MULTIPOLYGON(((0 0, 1 0, 1 1, 0 0)), ((5 5, 6 5, 6 6, 5 5)))";
    let uri = format!(
        "/features/multi-collection/items/geom-col?collection=bld-fts-buildingpart-1,bld-fts-buildingline-2&wkt={}",
        urlencode(wkt)
    );
    let (status, body) = get(router_for(&server), &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["numberReturned"], json!(4));
    assert_eq!(
        body["numberReturnedByCollection"],
        json!({"bld-fts-buildingpart-1": 2, "bld-fts-buildingline-2": 2})
    );
}

#[tokio::test]
async fn latest_collections_reports_the_lookup() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/collections/")
        .with_body(
            json!({"collections": [
                {"id": "bld-fts-buildingline-1"},
                {"id": "bld-fts-buildingline-2"}
            ]})
            .to_string(),
        )
        .create_async()
        .await;

    let (status, body) = get(router_for(&server), "/features/latest-collections").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["collection-lookup"]["bld-fts-buildingline"],
        json!("bld-fts-buildingline-2")
    );
    assert_eq!(body["recent-collection-updates"], json!([]));
}

#[tokio::test]
async fn an_unknown_base_name_is_a_404_payload() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/collections/")
        .with_body(json!({"collections": [{"id": "bld-fts-buildingline-2"}]}).to_string())
        .create_async()
        .await;

    let (status, body) = get(
        router_for(&server),
        "/features/latest-collections/bld-fts-nosuch",
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["description"].as_str().unwrap().contains("bld-fts-nosuch"));
    assert!(body["help"].as_str().is_some());
}

fn urlencode(value: &str) -> String {
    let mut encoded = String::new();
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }
    encoded
}
