use crate::{
    Error, FeatureSet, ItemsClient, ItemsRequest, Result, SearchResults, VersionResolver,
};
use indexmap::IndexMap;
use ngd::CollectionName;

/// Repeats an items search across several feature collections.
///
/// With `use_latest_collection`, names without an explicit version suffix
/// are completed to their latest version in one catalog lookup before any
/// search runs; an unresolvable base name therefore short-circuits the whole
/// call, whatever its position in the list. Resolved names run first,
/// explicitly-versioned names after.
///
/// With `hierarchical_output` the per-collection results are returned keyed
/// by collection name; the default flattens them into one set, keeping
/// per-collection request and feature counts alongside the totals.
#[derive(Clone, Debug)]
pub struct MultiCollection<C> {
    inner: C,
    resolver: VersionResolver,
}

impl<C> MultiCollection<C> {
    /// Wraps a client with multi-collection fan-out.
    pub fn new(inner: C, resolver: VersionResolver) -> MultiCollection<C> {
        MultiCollection { inner, resolver }
    }

    /// Completes unversioned names with their latest version.
    async fn apply_latest_versions(&self, collections: &[String]) -> Result<Vec<String>> {
        let mut versioned = Vec::new();
        let mut unversioned = Vec::new();
        for collection in collections {
            if CollectionName::has_explicit_version(collection) {
                versioned.push(collection.clone());
            } else {
                unversioned.push(collection.clone());
            }
        }
        let mut collections = if unversioned.is_empty() {
            Vec::new()
        } else {
            self.resolver
                .resolve(&unversioned)
                .await?
                .into_values()
                .collect()
        };
        collections.extend(versioned);
        Ok(collections)
    }
}

impl<C: ItemsClient> ItemsClient for MultiCollection<C> {
    async fn items(&self, request: ItemsRequest) -> Result<SearchResults> {
        if request.collections.is_empty() {
            return Err(Error::Validation(
                "at least one collection name must be provided".to_string(),
            ));
        }
        let collections = if request.use_latest_collection {
            self.apply_latest_versions(&request.collections).await?
        } else {
            request.collections.clone()
        };

        let mut results: IndexMap<String, SearchResults> = IndexMap::new();
        for collection in collections {
            let mut collection_request = request.clone();
            collection_request.collections = vec![collection.clone()];
            // Resolution already happened up here; the inner client must
            // not resolve a second time.
            collection_request.use_latest_collection = false;
            let result = self.inner.items(collection_request).await?;
            results.insert(collection, result);
        }

        if request.hierarchical_output {
            Ok(SearchResults::Collections(results))
        } else {
            Ok(SearchResults::Features(merge_collections(results)?))
        }
    }
}

/// Merges per-collection sets into one, keeping a per-collection breakdown
/// of the request and feature counts.
fn merge_collections(results: IndexMap<String, SearchResults>) -> Result<FeatureSet> {
    let mut number_of_requests = 0;
    let mut number_returned = 0;
    let mut requests_by_collection = IndexMap::new();
    let mut returned_by_collection = IndexMap::new();
    let mut features = Vec::new();

    for (collection, result) in results {
        let set = result.into_features()?;
        let requests = set.number_of_requests.unwrap_or_default();
        let returned = set.number_returned.unwrap_or(set.features.len() as u64);
        number_of_requests += requests;
        number_returned += returned;
        requests_by_collection.insert(collection.clone(), requests);
        returned_by_collection.insert(collection, returned);
        features.extend(set.features);
    }

    let mut merged = FeatureSet::new();
    merged.number_of_requests = Some(number_of_requests);
    merged.number_of_requests_by_collection = Some(requests_by_collection);
    merged.number_returned = Some(number_returned);
    merged.number_returned_by_collection = Some(returned_by_collection);
    merged.features = features;
    merged.stamp();
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::MultiCollection;
    use crate::{ApiClient, Error, ItemsClient, ItemsRequest};
    use serde_json::json;

    fn page(ids: &[&str]) -> String {
        let features: Vec<_> = ids
            .iter()
            .map(|id| json!({"id": id, "properties": {}}))
            .collect();
        json!({
            "type": "FeatureCollection",
            "numberReturned": features.len(),
            "features": features,
            "links": []
        })
        .to_string()
    }

    fn stack(server: &mockito::ServerGuard) -> MultiCollection<ApiClient> {
        let client = ApiClient::with_base_url(&server.url()).unwrap();
        let resolver = client.resolver().unwrap();
        MultiCollection::new(client, resolver)
    }

    #[tokio::test]
    async fn merged_output_keeps_per_collection_counts() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/collections/bld-fts-buildingpart-1/items/")
            .with_body(page(&["a", "b"]))
            .create_async()
            .await;
        server
            .mock("GET", "/collections/bld-fts-buildingline-2/items/")
            .with_body(page(&["c"]))
            .create_async()
            .await;

        let results = stack(&server)
            .items(ItemsRequest::multi([
                "bld-fts-buildingpart-1",
                "bld-fts-buildingline-2",
            ]))
            .await
            .unwrap();

        let set = results.into_features().unwrap();
        assert_eq!(set.number_returned, Some(3));
        assert_eq!(set.number_of_requests, Some(2));
        let by_collection = set.number_returned_by_collection.unwrap();
        assert_eq!(by_collection["bld-fts-buildingpart-1"], 2);
        assert_eq!(by_collection["bld-fts-buildingline-2"], 1);
        assert_eq!(set.features.len(), 3);
        assert_eq!(set.features[2]["collection"], json!("bld-fts-buildingline-2"));
    }

    #[tokio::test]
    async fn an_erroring_collection_stops_the_fan_out() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/collections/bld-fts-buildingpart-1/items/")
            .with_status(403)
            .with_body(json!({"code": 403, "description": "no"}).to_string())
            .create_async()
            .await;
        let second = server
            .mock("GET", "/collections/bld-fts-buildingline-2/items/")
            .expect(0)
            .create_async()
            .await;

        let error = stack(&server)
            .items(ItemsRequest::multi([
                "bld-fts-buildingpart-1",
                "bld-fts-buildingline-2",
            ]))
            .await
            .unwrap_err();
        assert!(matches!(error, Error::Upstream(payload) if payload.code == 403));
        second.assert_async().await;
    }

    #[tokio::test]
    async fn unresolvable_base_names_short_circuit_before_any_search() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/collections/")
            .with_body(json!({"collections": [{"id": "bld-fts-buildingline-2"}]}).to_string())
            .create_async()
            .await;
        let items = server
            .mock("GET", "/collections/bld-fts-buildingline-2/items/")
            .expect(0)
            .create_async()
            .await;

        let error = stack(&server)
            .items(
                ItemsRequest::multi(["bld-fts-buildingline-2", "bld-fts-nosuch"])
                    .use_latest_collection(true),
            )
            .await
            .unwrap_err();
        assert!(matches!(error, Error::CollectionNotFound(base) if base == "bld-fts-nosuch"));
        items.assert_async().await;
    }

    #[tokio::test]
    async fn resolved_names_run_before_explicitly_versioned_names() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/collections/")
            .with_body(
                json!({"collections": [
                    {"id": "trn-ntwk-street-1"},
                    {"id": "trn-ntwk-street-2"}
                ]})
                .to_string(),
            )
            .create_async()
            .await;
        server
            .mock("GET", "/collections/trn-ntwk-street-2/items/")
            .with_body(page(&["street"]))
            .create_async()
            .await;
        server
            .mock("GET", "/collections/bld-fts-buildingline-2/items/")
            .with_body(page(&["line"]))
            .create_async()
            .await;

        let results = stack(&server)
            .items(
                ItemsRequest::multi(["bld-fts-buildingline-2", "trn-ntwk-street"])
                    .use_latest_collection(true)
                    .hierarchical_output(true),
            )
            .await
            .unwrap();

        let value = serde_json::to_value(&results).unwrap();
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["trn-ntwk-street-2", "bld-fts-buildingline-2"]);
    }
}
