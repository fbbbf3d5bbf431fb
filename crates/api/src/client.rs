use crate::{
    ERROR_SOURCE_UPSTREAM, Error, ErrorPayload, ItemsRequest, Result, SearchResults, Telemetry,
    TracingTelemetry, VersionResolver,
    features::set_feature_member,
};
use indexmap::IndexMap;
use ngd::CollectionName;
use serde_json::{Value, json};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// The default root of the upstream features API.
pub const DEFAULT_BASE_URL: &str = "https://api.os.uk/features/ngd/ofa/v1/";

/// How long any single upstream call may take before it is abandoned.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// A client that can run an NGD items search.
///
/// [ApiClient] is the base implementation; every wrapper in this crate
/// implements the same trait around another implementation, so stacks can
/// be assembled in any order and depth.
pub trait ItemsClient: Send + Sync {
    /// Runs one items search.
    fn items(
        &self,
        request: ItemsRequest,
    ) -> impl Future<Output = Result<SearchResults>> + Send;
}

/// Issues single bounded GET requests against the upstream items endpoint.
///
/// One call maps to one upstream request: filters are assembled, the
/// request is dispatched with a fixed timeout, and the response is
/// normalised into either a raw feature page or an [ErrorPayload].
///
/// # Examples
///
/// ```no_run
/// use ngd_api::{ApiClient, ItemsClient, ItemsRequest};
///
/// # async fn example() -> ngd_api::Result<()> {
/// let client = ApiClient::new()?;
/// let results = client
///     .items(ItemsRequest::new("bld-fts-buildingline-2"))
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: Url,
    telemetry: Arc<dyn Telemetry>,
}

impl ApiClient {
    /// Creates a client against the production API.
    pub fn new() -> Result<ApiClient> {
        ApiClient::with_base_url(DEFAULT_BASE_URL)
    }

    /// Creates a client against another service root, e.g. a test double.
    pub fn with_base_url(base_url: &str) -> Result<ApiClient> {
        Ok(ApiClient {
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()?,
            base_url: Url::parse(base_url)?,
            telemetry: Arc::new(TracingTelemetry),
        })
    }

    /// Replaces the telemetry sink.
    pub fn telemetry(mut self, telemetry: Arc<dyn Telemetry>) -> ApiClient {
        self.telemetry = telemetry;
        self
    }

    /// Returns a version resolver against the same service root.
    pub fn resolver(&self) -> Result<VersionResolver> {
        VersionResolver::new(self.client.clone(), &self.base_url)
    }

    async fn resolve_collection(&self, collection: &str) -> Result<String> {
        let resolver = self.resolver()?;
        let base_names = vec![collection.to_string()];
        let resolved = resolver.resolve(&base_names).await?;
        Ok(resolved
            .get(collection)
            .cloned()
            .unwrap_or_else(|| collection.to_string()))
    }

    fn record_items_event(
        &self,
        url: &Url,
        collection: &str,
        set: &crate::FeatureSet,
        pairs: &[(String, String)],
    ) {
        let bbox = ngd::geometry::coordinate_bounds(set.features.iter())
            .map(|(xmin, ymin, xmax, ymax)| format!("{xmin},{ymin},{xmax},{ymax}"))
            .unwrap_or_default();
        let number_returned = set
            .number_returned
            .unwrap_or(set.features.len() as u64);
        let mut attributes = IndexMap::new();
        attributes.insert("method".to_string(), "GET".to_string());
        attributes.insert("url.path".to_string(), url.to_string());
        attributes.insert(
            "url.path_params.collection".to_string(),
            collection.to_string(),
        );
        attributes.insert("response.bbox".to_string(), bbox);
        attributes.insert(
            "response.numberReturned".to_string(),
            number_returned.to_string(),
        );
        for (key, value) in pairs {
            attributes.insert(format!("url.query_params.{key}"), value.clone());
        }
        self.telemetry.record_event("OS NGD API - Features", &attributes);
    }
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ItemsClient for ApiClient {
    async fn items(&self, request: ItemsRequest) -> Result<SearchResults> {
        let Some(collection) = request.collections.first().cloned() else {
            return Err(Error::Validation(
                "at least one collection name must be provided".to_string(),
            ));
        };
        // An explicit version suffix always wins over latest-version
        // resolution.
        let collection = if request.use_latest_collection
            && !CollectionName::has_explicit_version(&collection)
        {
            self.resolve_collection(&collection).await?
        } else {
            collection
        };

        let mut query = request.query.clone();
        if !request.filters.is_empty() {
            let attribute = ngd::filter::attribute_filter(&request.filters);
            query.filter = Some(ngd::filter::merge_filter(query.filter.as_deref(), &attribute));
        }
        if let Some(search_area) = &request.search_area {
            let spatial = ngd::filter::spatial_filter(&search_area.to_wkt());
            query.filter = Some(ngd::filter::merge_filter(query.filter.as_deref(), &spatial));
        }

        let url = self
            .base_url
            .join(&format!("collections/{collection}/items/"))?;
        let pairs = query.to_pairs();
        let mut builder = self.client.get(url.clone()).query(&pairs);
        for (name, value) in &request.headers {
            // The transport sets its own host header; forwarding the
            // caller's confuses upstream routing.
            if name.eq_ignore_ascii_case("host") {
                continue;
            }
            builder = builder.header(name, value);
        }

        let response = builder
            .send()
            .await
            .map_err(|error| Error::Upstream(transport_payload(&error)))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|error| Error::Upstream(transport_payload(&error)))?;

        let value: Value = match serde_json::from_str(&body) {
            Ok(value) => value,
            Err(error) => {
                return Err(Error::Upstream(undecodable_body_payload(status, &error)));
            }
        };

        if status >= 400 {
            return Err(Error::Upstream(upstream_error_payload(status, value)));
        }

        let mut set: crate::FeatureSet = serde_json::from_value(value)?;
        for feature in &mut set.features {
            set_feature_member(feature, "collection", Value::String(collection.clone()));
        }
        self.record_items_event(&url, &collection, &set, &pairs);
        if request.add_metadata {
            set.number_of_requests = Some(1);
        }
        Ok(SearchResults::Features(set))
    }
}

/// Builds the payload for a transport-level failure: the upstream was never
/// heard from, but the error still flows through the normal short-circuit
/// path rather than tearing the pipeline down.
pub(crate) fn transport_payload(error: &reqwest::Error) -> ErrorPayload {
    if error.is_timeout() {
        ErrorPayload::new(
            504,
            format!(
                "the upstream request did not complete within {} seconds",
                REQUEST_TIMEOUT.as_secs()
            ),
            ERROR_SOURCE_UPSTREAM,
        )
    } else {
        ErrorPayload::new(502, error.to_string(), ERROR_SOURCE_UPSTREAM)
    }
}

/// Builds the payload for a response body that was not JSON.
///
/// An empty body usually means the request URI itself was refused, so that
/// case is reported as a 414 with a hint.
pub(crate) fn undecodable_body_payload(status: u16, error: &serde_json::Error) -> ErrorPayload {
    if error.is_eof() {
        ErrorPayload::new(
            414,
            json!({
                "error": error.to_string(),
                "help": "this can happen when the request URI is too long or the input geometry is too complex",
            }),
            ERROR_SOURCE_UPSTREAM,
        )
    } else {
        ErrorPayload::new(status, error.to_string(), ERROR_SOURCE_UPSTREAM)
    }
}

/// Normalises an upstream error body into an [ErrorPayload].
///
/// Bodies that describe themselves keep their description (with the
/// unsupported-parameter rewrite applied); bodies that do not are demoted
/// wholesale into the description. A missing code is filled from the HTTP
/// status.
pub(crate) fn upstream_error_payload(status: u16, body: Value) -> ErrorPayload {
    let Value::Object(mut body) = body else {
        return ErrorPayload::new(status, body, ERROR_SOURCE_UPSTREAM);
    };
    let code = body
        .remove("code")
        .and_then(|value| value.as_u64())
        .and_then(|code| u16::try_from(code).ok());
    let description = match body.remove("description") {
        Some(Value::String(description)) => {
            Value::String(augment_unsupported_parameter(description))
        }
        Some(other) => other,
        None => {
            return ErrorPayload::new(status, Value::Object(body), ERROR_SOURCE_UPSTREAM);
        }
    };
    let help = body.remove("help").and_then(|value| match value {
        Value::String(help) => Some(help),
        _ => None,
    });
    ErrorPayload {
        code: code.unwrap_or(status),
        description,
        error_source: ERROR_SOURCE_UPSTREAM.to_string(),
        help,
        additional_fields: body,
    }
}

/// The upstream lists its own query parameters when it rejects an unknown
/// one; extend that list with a placeholder for the wrapper parameters,
/// which the serving layer fills in per route.
fn augment_unsupported_parameter(description: String) -> String {
    if !description.starts_with("Not supported query parameter") {
        return description;
    }
    let description =
        description.replace("Supported parameters are", "Supported NGD parameters are");
    format!("{description}. Additional supported wrapper parameters for this function are: {{attr}}.")
}
