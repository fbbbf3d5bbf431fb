use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use tracing::warn;

/// The upstream collections catalog.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Collections {
    /// The catalog entries.
    pub collections: Vec<Collection>,

    /// Additional members of the catalog object.
    #[serde(flatten)]
    pub additional_fields: Map<String, Value>,
}

/// One feature collection in the upstream catalog.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Collection {
    /// The collection identifier, e.g. `bld-fts-buildingline-2`.
    pub id: String,

    /// The collection's declared extent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extent: Option<Extent>,

    /// Additional members of the collection object.
    #[serde(flatten)]
    pub additional_fields: Map<String, Value>,
}

/// A collection's spatial and temporal extent.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Extent {
    /// The temporal extent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temporal: Option<TemporalExtent>,

    /// Additional members of the extent object.
    #[serde(flatten)]
    pub additional_fields: Map<String, Value>,
}

/// A temporal extent: one or more `[start, end]` intervals, either of which
/// may be null.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TemporalExtent {
    /// The intervals.
    pub interval: Vec<Vec<Option<String>>>,

    /// Additional members of the temporal extent object.
    #[serde(flatten)]
    pub additional_fields: Map<String, Value>,
}

impl Collection {
    /// Returns the start of this collection's first temporal interval, when
    /// declared.
    ///
    /// For NGD collections this is the date the collection version went
    /// live.
    pub fn temporal_start(&self) -> Option<&str> {
        self.extent
            .as_ref()?
            .temporal
            .as_ref()?
            .interval
            .first()?
            .first()?
            .as_deref()
    }
}

/// A feature collection name, `theme-collection-featuretype[-version]`.
///
/// Base names may themselves contain hyphens, so only the segment after the
/// *last* hyphen is a version candidate, and only when it is an integer.
///
/// # Examples
///
/// ```
/// use ngd::CollectionName;
///
/// let name = CollectionName::parse("trn-ntwk-street-1");
/// assert_eq!(name.base(), "trn-ntwk-street");
/// assert_eq!(name.version(), Some(1));
///
/// let name = CollectionName::parse("trn-ntwk-street");
/// assert_eq!(name.version(), None);
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CollectionName {
    base: String,
    version: Option<u32>,
}

impl CollectionName {
    /// Splits a collection identifier into its base name and version.
    pub fn parse(id: &str) -> CollectionName {
        if let Some((base, suffix)) = id.rsplit_once('-') {
            if !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_digit()) {
                if let Ok(version) = suffix.parse() {
                    return CollectionName {
                        base: base.to_string(),
                        version: Some(version),
                    };
                }
            }
        }
        CollectionName {
            base: id.to_string(),
            version: None,
        }
    }

    /// Returns true if an identifier carries an explicit version suffix.
    ///
    /// This is the quick test used when fanning out across collections: a
    /// name ending in a digit is taken verbatim, anything else goes through
    /// version resolution.
    pub fn has_explicit_version(id: &str) -> bool {
        id.chars().next_back().is_some_and(|c| c.is_ascii_digit())
    }

    /// Returns the base name, without any version suffix.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Returns the version, if the name carried one.
    pub fn version(&self) -> Option<u32> {
        self.version
    }
}

impl fmt::Display for CollectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.version {
            Some(version) => write!(f, "{}-{}", self.base, version),
            None => f.write_str(&self.base),
        }
    }
}

/// A lookup from collection base name to the newest version of that
/// collection seen in the catalog.
///
/// Built fresh from a catalog listing; there is exactly one entry per base
/// name and the highest integer suffix wins.
///
/// # Examples
///
/// ```
/// use ngd::VersionCatalog;
///
/// let catalog = VersionCatalog::from_ids([
///     "bld-fts-buildingline-1",
///     "bld-fts-buildingline-2",
///     "trn-ntwk-street-1",
/// ]);
/// assert_eq!(
///     catalog.latest("bld-fts-buildingline").unwrap(),
///     "bld-fts-buildingline-2"
/// );
/// ```
#[derive(Clone, Debug, Default)]
pub struct VersionCatalog {
    latest: IndexMap<String, u32>,
}

impl VersionCatalog {
    /// Builds the catalog from collection identifiers.
    ///
    /// Identifiers without an integer version suffix are skipped with a
    /// warning; the upstream catalog is not expected to contain any.
    pub fn from_ids<I, S>(ids: I) -> VersionCatalog
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut latest: IndexMap<String, u32> = IndexMap::new();
        for id in ids {
            let name = CollectionName::parse(id.as_ref());
            let Some(version) = name.version() else {
                warn!(
                    "skipping catalog id without a version suffix: {}",
                    id.as_ref()
                );
                continue;
            };
            let entry = latest.entry(name.base().to_string()).or_insert(version);
            if version > *entry {
                *entry = version;
            }
        }
        VersionCatalog { latest }
    }

    /// Returns the full name of the latest version of a base name.
    pub fn latest(&self, base: &str) -> Option<String> {
        self.latest.get(base).map(|version| format!("{base}-{version}"))
    }

    /// Returns true if the catalog knows this base name.
    pub fn contains(&self, base: &str) -> bool {
        self.latest.contains_key(base)
    }

    /// Returns the base name → latest full name lookup, in catalog order.
    pub fn to_lookup(&self) -> IndexMap<String, String> {
        self.latest
            .iter()
            .map(|(base, version)| (base.clone(), format!("{base}-{version}")))
            .collect()
    }

    /// Returns true if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.latest.is_empty()
    }
}
