use crate::{
    Error, Feature, FeatureSet, ItemsClient, ItemsRequest, Result, SearchArea, SearchAreaResults,
    SearchResults,
    features::set_feature_member,
};
use serde_json::{Value, json};
use std::collections::HashMap;

/// Fans an items search out across the atomic parts of a multi-geometry.
///
/// The search area is exploded into points, line strings, and polygons and
/// each part is searched on its own, in part order; every result is tagged
/// with its 0-based `searchAreaNumber`. Searching part-by-part keeps each
/// upstream request small enough not to time out on complex geometries.
///
/// With `hierarchical_output` the per-part sets are returned as-is; the
/// default flattens them into one set, keeping a feature that matched
/// several parts once and collecting all of its part numbers.
#[derive(Clone, Debug)]
pub struct MultiGeometry<C> {
    inner: C,
}

impl<C> MultiGeometry<C> {
    /// Wraps a client with multi-geometry fan-out.
    pub fn new(inner: C) -> MultiGeometry<C> {
        MultiGeometry { inner }
    }
}

impl<C: ItemsClient> ItemsClient for MultiGeometry<C> {
    async fn items(&self, request: ItemsRequest) -> Result<SearchResults> {
        let Some(search_area) = &request.search_area else {
            return Err(Error::Validation(
                "a search area geometry (wkt) is required".to_string(),
            ));
        };
        let geometry = match search_area.to_geometry() {
            Ok(geometry) => geometry,
            Err(_) => {
                return Err(Error::InvalidGeometry(
                    "the input geometry is not valid; check the formatting for your \
                     geometry type"
                        .to_string(),
                ));
            }
        };

        let mut areas = Vec::new();
        for (search_area_number, part) in ngd::geometry::explode(geometry).into_iter().enumerate()
        {
            let mut part_request = request.clone();
            part_request.search_area = Some(SearchArea::Geometry(part));
            let mut set = self.inner.items(part_request).await?.into_features()?;
            set.search_area_number = Some(search_area_number as u64);
            areas.push(set);
        }

        if request.hierarchical_output {
            Ok(SearchResults::SearchAreas(SearchAreaResults {
                search_areas: areas,
            }))
        } else {
            Ok(SearchResults::Features(flatten_search_areas(areas)))
        }
    }
}

/// Merges per-search-area sets into one, reconciling features that matched
/// more than one area.
///
/// A feature id seen in an earlier area is not duplicated; the later area's
/// number is appended to its `searchAreaNumber`, promoting the scalar to a
/// list on the first collision. `numberReturned` counts only newly-added
/// features.
fn flatten_search_areas(areas: Vec<FeatureSet>) -> FeatureSet {
    let mut number_of_requests = 0;
    let mut number_returned = 0;
    let mut features: Vec<Feature> = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();

    for mut area in areas {
        let search_area_number = area.search_area_number.take().unwrap_or_default();
        number_of_requests += area.number_of_requests.unwrap_or_default();
        for mut feature in area.features {
            set_feature_member(&mut feature, "searchAreaNumber", json!(search_area_number));
            let id = feature
                .get("id")
                .filter(|id| !id.is_null())
                .map(Value::to_string);
            if let Some(id) = id {
                if let Some(&index) = seen.get(&id) {
                    append_search_area(&mut features[index], search_area_number);
                    continue;
                }
                seen.insert(id, features.len());
            }
            features.push(feature);
            number_returned += 1;
        }
    }

    let mut merged = FeatureSet::new();
    merged.number_of_requests = Some(number_of_requests);
    merged.number_returned = Some(number_returned);
    merged.features = features;
    merged.stamp();
    merged
}

fn append_search_area(feature: &mut Feature, search_area_number: u64) {
    match feature.get_mut("searchAreaNumber") {
        Some(Value::Array(numbers)) => numbers.push(json!(search_area_number)),
        Some(value) => {
            let first = value.take();
            *value = json!([first, search_area_number]);
        }
        None => {
            feature.insert("searchAreaNumber".to_string(), json!(search_area_number));
        }
    }
}
