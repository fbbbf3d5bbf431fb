use crate::{Error, Result};
use chrono::{SecondsFormat, Utc};
use indexmap::IndexMap;
use ngd::Link;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One GeoJSON-like feature, exactly as the upstream returned it.
///
/// Features keep their upstream shape; the pipeline only *adds* members
/// (`collection`, `searchAreaNumber`). A feature's identity is its upstream
/// `id`.
pub type Feature = Map<String, Value>;

/// Sets a member on a feature's top level and, when the feature has a
/// `properties` object, inside that too.
pub(crate) fn set_feature_member(feature: &mut Feature, key: &str, value: Value) {
    if let Some(Value::Object(properties)) = feature.get_mut("properties") {
        properties.insert(key.to_string(), value.clone());
    }
    feature.insert(key.to_string(), value);
}

/// A set of features with its aggregation bookkeeping.
///
/// This one shape covers both the raw single page the upstream returns
/// (`links`, upstream `numberReturned`, any members we do not model) and
/// every merged form the wrappers build on top of it; the optional members
/// are simply absent when a layer did not produce them.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct FeatureSet {
    /// Always `FeatureCollection`.
    #[serde(rename = "type", default = "feature_collection")]
    pub r#type: String,

    /// Index of the search area this set came from, when produced under a
    /// multi-geometry fan-out with hierarchical output.
    #[serde(rename = "searchAreaNumber", skip_serializing_if = "Option::is_none")]
    pub search_area_number: Option<u64>,

    /// How many upstream requests produced this set.
    #[serde(rename = "numberOfRequests", skip_serializing_if = "Option::is_none")]
    pub number_of_requests: Option<u64>,

    /// Per-collection request counts, present on merged multi-collection
    /// output.
    #[serde(
        rename = "numberOfRequestsByCollection",
        skip_serializing_if = "Option::is_none"
    )]
    pub number_of_requests_by_collection: Option<IndexMap<String, u64>>,

    /// How many features this set holds.
    #[serde(rename = "numberReturned", skip_serializing_if = "Option::is_none")]
    pub number_returned: Option<u64>,

    /// Per-collection feature counts, present on merged multi-collection
    /// output.
    #[serde(
        rename = "numberReturnedByCollection",
        skip_serializing_if = "Option::is_none"
    )]
    pub number_returned_by_collection: Option<IndexMap<String, u64>>,

    /// When this set was assembled.
    #[serde(rename = "timeStamp", skip_serializing_if = "Option::is_none")]
    pub time_stamp: Option<String>,

    /// The collection this set was fetched from, absent on merged
    /// multi-collection output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,

    /// The features.
    #[serde(default)]
    pub features: Vec<Feature>,

    /// Upstream paging links; present on raw pages only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,

    /// Additional members carried over from the upstream response.
    #[serde(flatten)]
    pub additional_fields: Map<String, Value>,
}

fn feature_collection() -> String {
    "FeatureCollection".to_string()
}

impl FeatureSet {
    /// Creates an empty feature set.
    pub fn new() -> FeatureSet {
        FeatureSet {
            r#type: feature_collection(),
            search_area_number: None,
            number_of_requests: None,
            number_of_requests_by_collection: None,
            number_returned: None,
            number_returned_by_collection: None,
            time_stamp: None,
            collection: None,
            features: Vec::new(),
            links: Vec::new(),
            additional_fields: Map::new(),
        }
    }

    /// Returns true if the upstream signalled a further page of results.
    pub fn has_next_link(&self) -> bool {
        self.links.iter().any(Link::is_next)
    }

    /// Stamps the set with the current time.
    pub(crate) fn stamp(&mut self) {
        self.time_stamp = Some(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true));
    }
}

impl Default for FeatureSet {
    fn default() -> FeatureSet {
        FeatureSet::new()
    }
}

/// Hierarchical multi-geometry output: one result set per search area, in
/// search-area order.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SearchAreaResults {
    /// The per-area sets, each tagged with its `searchAreaNumber`.
    #[serde(rename = "searchAreas")]
    pub search_areas: Vec<FeatureSet>,
}

/// The output of any pipeline component.
///
/// Serialises untagged: a flat set is a GeoJSON-like object, hierarchical
/// multi-geometry output is a `searchAreas` wrapper, and hierarchical
/// multi-collection output is a map from collection name to whatever the
/// inner component produced.
#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum SearchResults {
    /// A single feature set: a raw page, or a flattened merge.
    Features(FeatureSet),
    /// Hierarchical multi-geometry output.
    SearchAreas(SearchAreaResults),
    /// Hierarchical multi-collection output, keyed by collection name.
    Collections(IndexMap<String, SearchResults>),
}

impl SearchResults {
    /// Unwraps the single-feature-set form.
    ///
    /// Fails when the inner component produced hierarchical output, which
    /// cannot be folded into a flat merge.
    pub fn into_features(self) -> Result<FeatureSet> {
        match self {
            SearchResults::Features(set) => Ok(set),
            SearchResults::SearchAreas(_) => Err(Error::Unmergeable("search-area")),
            SearchResults::Collections(_) => Err(Error::Unmergeable("per-collection")),
        }
    }

    /// Returns the single-feature-set form, if that is what this is.
    pub fn as_features(&self) -> Option<&FeatureSet> {
        match self {
            SearchResults::Features(set) => Some(set),
            _ => None,
        }
    }
}

impl From<FeatureSet> for SearchResults {
    fn from(set: FeatureSet) -> SearchResults {
        SearchResults::Features(set)
    }
}
