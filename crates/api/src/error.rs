use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// The `errorSource` tag for errors raised by (or while talking to) the
/// upstream API.
pub const ERROR_SOURCE_UPSTREAM: &str = "OS NGD API";

/// The `errorSource` tag for errors raised by this wrapper layer.
pub const ERROR_SOURCE_WRAPPER: &str = "NGD API wrapper";

const COLLECTIONS_HELP_URL: &str = "https://api.os.uk/features/ngd/ofa/v1/collections";
const WKT_HELP_URL: &str = "http://libgeos.org/specifications/wkt/";

/// The wire shape every pipeline error is reported as.
///
/// Wrappers never unpack or rewrite a payload raised below them; it travels
/// to the outermost boundary unchanged, where `code` becomes the HTTP status
/// of the response.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ErrorPayload {
    /// HTTP-style status code.
    pub code: u16,

    /// Human-readable description: a string, or the upstream body when the
    /// upstream did not describe itself.
    pub description: Value,

    /// Which layer raised the error.
    #[serde(rename = "errorSource")]
    pub error_source: String,

    /// Pointer to relevant documentation, when there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,

    /// Additional members carried over from an upstream error body.
    #[serde(flatten)]
    pub additional_fields: Map<String, Value>,
}

impl ErrorPayload {
    /// Creates a new payload.
    pub fn new(code: u16, description: impl Into<Value>, error_source: &str) -> ErrorPayload {
        ErrorPayload {
            code,
            description: description.into(),
            error_source: error_source.to_string(),
            help: None,
            additional_fields: Map::new(),
        }
    }

    /// Sets the help link.
    pub fn with_help(mut self, help: impl ToString) -> ErrorPayload {
        self.help = Some(help.to_string());
        self
    }
}

/// Error enum for crate-specific errors.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Malformed caller input.
    #[error("{0}")]
    Validation(String),

    /// The search-area WKT could not be parsed.
    #[error("invalid search area: {0}")]
    InvalidGeometry(String),

    /// An error reported by, or while talking to, the upstream API.
    ///
    /// The payload propagates unchanged through every wrapping layer.
    #[error("upstream error (code {})", .0.code)]
    Upstream(ErrorPayload),

    /// Credentials are missing, or were rejected while refreshing a token.
    #[error("{0}")]
    Credentials(String),

    /// A collection base name the catalog does not know.
    #[error("collection {0:?} is not a supported collection base name")]
    CollectionNotFound(String),

    /// An inner wrapper produced hierarchical output where a flattened
    /// feature set was needed.
    #[error("cannot flatten {0} results into a single feature set")]
    Unmergeable(&'static str),

    /// [ngd::Error]
    #[error(transparent)]
    Ngd(#[from] ngd::Error),

    /// [reqwest::Error]
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    /// [serde_json::Error]
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),

    /// [url::ParseError]
    #[error(transparent)]
    UrlParse(#[from] url::ParseError),
}

impl Error {
    /// Renders this error as the wire payload the outermost boundary
    /// returns.
    pub fn to_payload(&self) -> ErrorPayload {
        match self {
            Error::Validation(message) => {
                ErrorPayload::new(400, message.as_str(), ERROR_SOURCE_WRAPPER)
            }
            Error::InvalidGeometry(message) => {
                ErrorPayload::new(400, message.as_str(), ERROR_SOURCE_WRAPPER)
                    .with_help(WKT_HELP_URL)
            }
            Error::Upstream(payload) => payload.clone(),
            Error::Credentials(message) => {
                ErrorPayload::new(401, message.as_str(), ERROR_SOURCE_WRAPPER)
            }
            Error::CollectionNotFound(base) => ErrorPayload::new(
                404,
                format!(
                    "Collection {base:?} is not a supported collection base name. The name \
                     must not include a version suffix; refer to the collections catalog for \
                     the supported names."
                ),
                ERROR_SOURCE_WRAPPER,
            )
            .with_help(COLLECTIONS_HELP_URL),
            Error::Ngd(error) => ErrorPayload::new(400, error.to_string(), ERROR_SOURCE_WRAPPER),
            other => ErrorPayload::new(500, other.to_string(), ERROR_SOURCE_WRAPPER),
        }
    }

    /// Returns the HTTP status this error maps to.
    pub fn status_code(&self) -> u16 {
        self.to_payload().code
    }
}

#[cfg(test)]
mod tests {
    use super::{ERROR_SOURCE_UPSTREAM, ERROR_SOURCE_WRAPPER, Error, ErrorPayload};
    use serde_json::json;

    #[test]
    fn validation_errors_are_400_wrapper_payloads() {
        let payload = Error::Validation("bad input".to_string()).to_payload();
        assert_eq!(payload.code, 400);
        assert_eq!(payload.error_source, ERROR_SOURCE_WRAPPER);
    }

    #[test]
    fn upstream_payloads_pass_through_unchanged() {
        let payload = ErrorPayload::new(503, "unavailable", ERROR_SOURCE_UPSTREAM);
        let error = Error::Upstream(payload.clone());
        assert_eq!(error.to_payload(), payload);
        assert_eq!(error.status_code(), 503);
    }

    #[test]
    fn collection_not_found_is_404_shaped_with_help() {
        let payload = Error::CollectionNotFound("bld-fts-nosuch".to_string()).to_payload();
        assert_eq!(payload.code, 404);
        assert!(payload.help.is_some());
        assert!(
            payload
                .description
                .as_str()
                .unwrap()
                .contains("must not include a version suffix")
        );
    }

    #[test]
    fn payload_serialization_uses_wire_names() {
        let payload = ErrorPayload::new(401, "no", ERROR_SOURCE_WRAPPER);
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value,
            json!({"code": 401, "description": "no", "errorSource": ERROR_SOURCE_WRAPPER})
        );
    }
}
