use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A link object as returned by the upstream API.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Link {
    /// The link relation, e.g. `next` for the following page of results.
    pub rel: String,

    /// The link target.
    pub href: String,

    /// Additional members of the link object.
    #[serde(flatten)]
    pub additional_fields: Map<String, Value>,
}

impl Link {
    /// Creates a new link.
    ///
    /// # Examples
    ///
    /// ```
    /// let link = ngd::Link::new("next", "https://ngd.test/items?offset=100");
    /// assert!(link.is_next());
    /// ```
    pub fn new(rel: impl ToString, href: impl ToString) -> Link {
        Link {
            rel: rel.to_string(),
            href: href.to_string(),
            additional_fields: Map::new(),
        }
    }

    /// Returns true if this link points at the next page of results.
    pub fn is_next(&self) -> bool {
        self.rel == "next"
    }
}
