use crate::{DEFAULT_REQUEST_LIMIT, Query, Result};
use geo_types::Geometry;
use indexmap::IndexMap;
use ngd::filter::FilterValue;

/// A spatial search area: WKT text, or an already-parsed geometry.
#[derive(Clone, Debug)]
pub enum SearchArea {
    /// Well-known text, parsed on demand.
    Wkt(String),
    /// An in-memory geometry.
    Geometry(Geometry<f64>),
}

impl SearchArea {
    /// Returns the geometry form, parsing WKT if necessary.
    pub fn to_geometry(&self) -> Result<Geometry<f64>> {
        match self {
            SearchArea::Wkt(wkt) => Ok(ngd::geometry::parse_wkt(wkt)?),
            SearchArea::Geometry(geometry) => Ok(geometry.clone()),
        }
    }

    /// Renders the WKT form.
    pub fn to_wkt(&self) -> String {
        match self {
            SearchArea::Wkt(wkt) => wkt.clone(),
            SearchArea::Geometry(geometry) => ngd::geometry::to_wkt(geometry),
        }
    }
}

impl From<&str> for SearchArea {
    fn from(wkt: &str) -> SearchArea {
        SearchArea::Wkt(wkt.to_string())
    }
}

impl From<String> for SearchArea {
    fn from(wkt: String) -> SearchArea {
        SearchArea::Wkt(wkt)
    }
}

impl From<Geometry<f64>> for SearchArea {
    fn from(geometry: Geometry<f64>) -> SearchArea {
        SearchArea::Geometry(geometry)
    }
}

/// One items search, as understood by every component in the pipeline.
///
/// Each wrapper consumes the members addressed to it and passes the rest
/// down: [Paginated](crate::Paginated) owns `limit`/`request_limit`,
/// [MultiGeometry](crate::MultiGeometry) consumes the multi-part
/// `search_area`, [MultiCollection](crate::MultiCollection) consumes the
/// collection list and `use_latest_collection`, and
/// [Authenticated](crate::Authenticated) contributes to `headers`.
#[derive(Clone, Debug)]
pub struct ItemsRequest {
    /// Target collection names, possibly unversioned.
    pub collections: Vec<String>,

    /// Upstream query parameters.
    pub query: Query,

    /// Attribute equality filters, merged into the `filter` parameter
    /// before dispatch.
    pub filters: IndexMap<String, FilterValue>,

    /// Spatial search area, merged into the `filter` parameter as an
    /// `INTERSECTS` predicate.
    pub search_area: Option<SearchArea>,

    /// Headers forwarded with the upstream request.
    pub headers: Vec<(String, String)>,

    /// Resolve unversioned collection names to their latest version.
    pub use_latest_collection: bool,

    /// Keep fan-out results grouped instead of flattening them.
    pub hierarchical_output: bool,

    /// Stamp single-page metadata (`numberOfRequests`) onto raw pages.
    ///
    /// Wrappers that do their own counting turn this off for the pages they
    /// fetch.
    pub add_metadata: bool,

    /// Maximum total number of features to page through.
    pub limit: Option<u64>,

    /// Maximum number of upstream requests one pagination run may issue.
    ///
    /// Defaults to [DEFAULT_REQUEST_LIMIT]; clearing it without setting
    /// `limit` is rejected, since that would allow unbounded paging.
    pub request_limit: Option<u64>,
}

impl ItemsRequest {
    /// Creates a request against one collection.
    ///
    /// # Examples
    ///
    /// ```
    /// use ngd_api::ItemsRequest;
    ///
    /// let request = ItemsRequest::new("bld-fts-buildingline-2")
    ///     .filter("oslandcovertierb", "Water")
    ///     .limit(250);
    /// ```
    pub fn new(collection: impl ToString) -> ItemsRequest {
        ItemsRequest::multi([collection.to_string()])
    }

    /// Creates a request against several collections.
    pub fn multi<I, S>(collections: I) -> ItemsRequest
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        ItemsRequest {
            collections: collections.into_iter().map(|c| c.to_string()).collect(),
            query: Query::default(),
            filters: IndexMap::new(),
            search_area: None,
            headers: Vec::new(),
            use_latest_collection: false,
            hierarchical_output: false,
            add_metadata: true,
            limit: None,
            request_limit: Some(DEFAULT_REQUEST_LIMIT),
        }
    }

    /// Sets the upstream query parameters.
    pub fn query(mut self, query: Query) -> ItemsRequest {
        self.query = query;
        self
    }

    /// Adds an attribute equality filter.
    pub fn filter(mut self, key: impl ToString, value: impl Into<FilterValue>) -> ItemsRequest {
        self.filters.insert(key.to_string(), value.into());
        self
    }

    /// Sets the spatial search area.
    pub fn search_area(mut self, search_area: impl Into<SearchArea>) -> ItemsRequest {
        self.search_area = Some(search_area.into());
        self
    }

    /// Sets whether unversioned collection names resolve to their latest
    /// version.
    pub fn use_latest_collection(mut self, use_latest_collection: bool) -> ItemsRequest {
        self.use_latest_collection = use_latest_collection;
        self
    }

    /// Sets whether fan-out output stays grouped.
    pub fn hierarchical_output(mut self, hierarchical_output: bool) -> ItemsRequest {
        self.hierarchical_output = hierarchical_output;
        self
    }

    /// Sets the maximum total number of features to page through.
    pub fn limit(mut self, limit: u64) -> ItemsRequest {
        self.limit = Some(limit);
        self
    }

    /// Sets (or clears) the maximum number of requests one pagination run
    /// may issue.
    pub fn request_limit(mut self, request_limit: Option<u64>) -> ItemsRequest {
        self.request_limit = request_limit;
        self
    }

    /// Adds a forwarded header, replacing any existing header of the same
    /// name.
    pub fn header(mut self, name: impl ToString, value: impl ToString) -> ItemsRequest {
        self.set_header(name.to_string(), value.to_string());
        self
    }

    /// Replaces or appends a forwarded header.
    pub(crate) fn set_header(&mut self, name: String, value: String) {
        if let Some(existing) = self
            .headers
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            existing.1 = value;
        } else {
            self.headers.push((name, value));
        }
    }
}

impl Default for ItemsRequest {
    fn default() -> ItemsRequest {
        ItemsRequest::multi(Vec::<String>::new())
    }
}

#[cfg(test)]
mod tests {
    use super::{ItemsRequest, SearchArea};

    #[test]
    fn new_requests_carry_the_default_request_limit() {
        let request = ItemsRequest::new("bld-fts-buildingline-2");
        assert_eq!(request.request_limit, Some(crate::DEFAULT_REQUEST_LIMIT));
        assert!(request.add_metadata);
    }

    #[test]
    fn set_header_replaces_case_insensitively() {
        let mut request = ItemsRequest::new("bld-fts-buildingline-2")
            .header("Authorization", "Bearer stale");
        request.set_header("authorization".to_string(), "Bearer fresh".to_string());
        assert_eq!(request.headers.len(), 1);
        assert_eq!(request.headers[0].1, "Bearer fresh");
    }

    #[test]
    fn search_area_wkt_round_trip() {
        let area = SearchArea::from("POINT(1 2)");
        assert_eq!(area.to_wkt(), "POINT(1 2)");
        let geometry = area.to_geometry().unwrap();
        assert_eq!(SearchArea::from(geometry).to_wkt(), "POINT(1 2)");
    }
}
