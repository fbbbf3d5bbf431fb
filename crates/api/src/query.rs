use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::fmt;

/// A coordinate reference system reference.
///
/// Callers may supply a bare EPSG code; the upstream only accepts the full
/// URI form, so a `Crs` always renders as
/// `http://www.opengis.net/def/crs/EPSG/0/{code}`.
///
/// # Examples
///
/// ```
/// use ngd_api::Crs;
///
/// assert_eq!(
///     Crs::Epsg(27700).to_uri(),
///     "http://www.opengis.net/def/crs/EPSG/0/27700"
/// );
/// assert_eq!(Crs::parse("27700"), Crs::Epsg(27700));
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Crs {
    /// A bare EPSG code.
    Epsg(u32),
    /// A full CRS URI, passed through verbatim.
    Uri(String),
}

impl Crs {
    /// Parses a query-string value: integers become EPSG codes, anything
    /// else is taken as a URI.
    pub fn parse(value: &str) -> Crs {
        value
            .parse()
            .map(Crs::Epsg)
            .unwrap_or_else(|_| Crs::Uri(value.to_string()))
    }

    /// Renders the full URI form the upstream expects.
    pub fn to_uri(&self) -> String {
        match self {
            Crs::Epsg(code) => format!("http://www.opengis.net/def/crs/EPSG/0/{code}"),
            Crs::Uri(uri) => uri.clone(),
        }
    }
}

impl From<u32> for Crs {
    fn from(code: u32) -> Crs {
        Crs::Epsg(code)
    }
}

impl From<&str> for Crs {
    fn from(value: &str) -> Crs {
        Crs::parse(value)
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uri())
    }
}

impl Serialize for Crs {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_uri())
    }
}

impl<'de> Deserialize<'de> for Crs {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Crs, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        match value {
            serde_json::Value::Number(number) => number
                .as_u64()
                .and_then(|code| u32::try_from(code).ok())
                .map(Crs::Epsg)
                .ok_or_else(|| de::Error::custom("crs code is not a valid EPSG integer")),
            serde_json::Value::String(value) => Ok(Crs::parse(&value)),
            _ => Err(de::Error::custom("crs must be an EPSG code or a URI")),
        }
    }
}

/// Query parameters recognised by the upstream items endpoint.
///
/// Anything the upstream does not document lands in `additional_params` and
/// is forwarded verbatim; the upstream rejects what it does not know.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Query {
    /// Bounding-box filter, comma-joined coordinates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<String>,

    /// CRS the bbox coordinates are expressed in.
    #[serde(rename = "bbox-crs", skip_serializing_if = "Option::is_none")]
    pub bbox_crs: Option<Crs>,

    /// CRS of the response geometries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crs: Option<Crs>,

    /// Datetime filter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datetime: Option<String>,

    /// CQL filter expression.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,

    /// CRS of any geometry inside the filter expression.
    #[serde(rename = "filter-crs", skip_serializing_if = "Option::is_none")]
    pub filter_crs: Option<Crs>,

    /// Filter language identifier.
    #[serde(rename = "filter-lang", skip_serializing_if = "Option::is_none")]
    pub filter_lang: Option<String>,

    /// Maximum number of features in one response (upstream cap 100).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,

    /// Start index within the upstream result set.
    ///
    /// Owned by [Paginated](crate::Paginated) whenever that wrapper is in
    /// the stack; it rejects requests that set an offset themselves.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,

    /// Additional parameters, forwarded verbatim.
    #[serde(flatten)]
    pub additional_params: IndexMap<String, String>,
}

impl Query {
    /// Assembles the query-string pairs in declaration order, CRS values in
    /// full URI form.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(bbox) = &self.bbox {
            pairs.push(("bbox".to_string(), bbox.clone()));
        }
        if let Some(bbox_crs) = &self.bbox_crs {
            pairs.push(("bbox-crs".to_string(), bbox_crs.to_uri()));
        }
        if let Some(crs) = &self.crs {
            pairs.push(("crs".to_string(), crs.to_uri()));
        }
        if let Some(datetime) = &self.datetime {
            pairs.push(("datetime".to_string(), datetime.clone()));
        }
        if let Some(filter) = &self.filter {
            pairs.push(("filter".to_string(), filter.clone()));
        }
        if let Some(filter_crs) = &self.filter_crs {
            pairs.push(("filter-crs".to_string(), filter_crs.to_uri()));
        }
        if let Some(filter_lang) = &self.filter_lang {
            pairs.push(("filter-lang".to_string(), filter_lang.clone()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(offset) = self.offset {
            pairs.push(("offset".to_string(), offset.to_string()));
        }
        for (key, value) in &self.additional_params {
            pairs.push((key.clone(), value.clone()));
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::{Crs, Query};

    #[test]
    fn integer_crs_renders_as_the_full_uri() {
        let mut query = Query::default();
        query.crs = Some(Crs::Epsg(27700));
        query.filter_crs = Some(Crs::parse("4326"));
        let pairs = query.to_pairs();
        assert_eq!(
            pairs,
            vec![
                (
                    "crs".to_string(),
                    "http://www.opengis.net/def/crs/EPSG/0/27700".to_string()
                ),
                (
                    "filter-crs".to_string(),
                    "http://www.opengis.net/def/crs/EPSG/0/4326".to_string()
                ),
            ]
        );
    }

    #[test]
    fn uri_crs_passes_through() {
        let crs = Crs::parse("http://www.opengis.net/def/crs/EPSG/0/3857");
        assert_eq!(crs.to_uri(), "http://www.opengis.net/def/crs/EPSG/0/3857");
    }

    #[test]
    fn pairs_keep_declaration_order_with_passthrough_last() {
        let mut query = Query::default();
        query.bbox = Some("0,0,1,1".to_string());
        query.limit = Some(10);
        query
            .additional_params
            .insert("unknown".to_string(), "value".to_string());
        let keys: Vec<_> = query.to_pairs().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["bbox", "limit", "unknown"]);
    }

    #[test]
    fn crs_deserializes_from_integers_and_strings() {
        let crs: Crs = serde_json::from_str("27700").unwrap();
        assert_eq!(crs, Crs::Epsg(27700));
        let crs: Crs = serde_json::from_str("\"27700\"").unwrap();
        assert_eq!(crs, Crs::Epsg(27700));
        let crs: Crs = serde_json::from_str("\"urn:ogc:def:crs:EPSG::4326\"").unwrap();
        assert_eq!(crs, Crs::Uri("urn:ogc:def:crs:EPSG::4326".to_string()));
    }
}
