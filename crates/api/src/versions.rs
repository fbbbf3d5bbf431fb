use crate::{
    Error, Result,
    client::{transport_payload, undecodable_body_payload, upstream_error_payload},
};
use chrono::{DateTime, Duration, Utc};
use indexmap::IndexMap;
use ngd::{Collections, VersionCatalog};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;
use url::Url;

/// Default window for flagging recently-started collection versions, in
/// days.
pub const DEFAULT_RECENT_UPDATE_DAYS: u64 = 31;

/// The latest-versions report.
///
/// A new collection version can carry reworked attribution, so versions
/// whose temporal extent started recently are worth flagging to operators.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct LatestCollections {
    /// Base name → full name of the newest version.
    #[serde(rename = "collection-lookup")]
    pub collection_lookup: IndexMap<String, String>,

    /// The window used to flag recent updates, in days.
    #[serde(rename = "recent-update-threshold-days")]
    pub recent_update_threshold_days: u64,

    /// Latest versions whose temporal extent started inside the window.
    #[serde(rename = "recent-collection-updates")]
    pub recent_collection_updates: Vec<String>,
}

/// Resolves collection base names against the upstream catalog.
///
/// The catalog is fetched fresh for every resolution; nothing is cached
/// across calls.
#[derive(Clone, Debug)]
pub struct VersionResolver {
    client: reqwest::Client,
    collections_url: Url,
}

impl VersionResolver {
    pub(crate) fn new(client: reqwest::Client, base_url: &Url) -> Result<VersionResolver> {
        Ok(VersionResolver {
            client,
            collections_url: base_url.join("collections/")?,
        })
    }

    /// Fetches the catalog and keeps the highest version of each base name.
    pub async fn latest_versions(&self) -> Result<VersionCatalog> {
        let collections = self.fetch_catalog().await?;
        Ok(VersionCatalog::from_ids(
            collections.collections.iter().map(|c| c.id.as_str()),
        ))
    }

    /// The catalog lookup, plus the versions that started inside the given
    /// window.
    ///
    /// Each recent version is also warned about, so a deployment notices a
    /// collection rollover without polling this endpoint.
    pub async fn latest_versions_report(
        &self,
        recent_update_days: u64,
    ) -> Result<LatestCollections> {
        let collections = self.fetch_catalog().await?;
        let catalog =
            VersionCatalog::from_ids(collections.collections.iter().map(|c| c.id.as_str()));
        let lookup = catalog.to_lookup();
        let cutoff = Utc::now() - Duration::days(recent_update_days as i64);
        let mut recent = Vec::new();
        for collection in &collections.collections {
            if !lookup.values().any(|latest| latest == &collection.id) {
                continue;
            }
            let Some(start) = collection.temporal_start() else {
                continue;
            };
            let Ok(start) = DateTime::parse_from_rfc3339(start) else {
                continue;
            };
            if start.with_timezone(&Utc) > cutoff {
                warn!(
                    collection = collection.id.as_str(),
                    "collection version started within the last {recent_update_days} days"
                );
                recent.push(collection.id.clone());
            }
        }
        Ok(LatestCollections {
            collection_lookup: lookup,
            recent_update_threshold_days: recent_update_days,
            recent_collection_updates: recent,
        })
    }

    /// Completes base names with their latest version, in input order.
    ///
    /// Fails naming the first base name the catalog does not know;
    /// versioned names are not accepted as input.
    pub async fn resolve(&self, base_names: &[String]) -> Result<IndexMap<String, String>> {
        let catalog = self.latest_versions().await?;
        let mut resolved = IndexMap::with_capacity(base_names.len());
        for base_name in base_names {
            match catalog.latest(base_name) {
                Some(latest) => {
                    resolved.insert(base_name.clone(), latest);
                }
                None => return Err(Error::CollectionNotFound(base_name.clone())),
            }
        }
        Ok(resolved)
    }

    async fn fetch_catalog(&self) -> Result<Collections> {
        let response = self
            .client
            .get(self.collections_url.clone())
            .send()
            .await
            .map_err(|error| Error::Upstream(transport_payload(&error)))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|error| Error::Upstream(transport_payload(&error)))?;
        let value: Value = serde_json::from_str(&body)
            .map_err(|error| Error::Upstream(undecodable_body_payload(status, &error)))?;
        if status >= 400 {
            return Err(Error::Upstream(upstream_error_payload(status, value)));
        }
        Ok(serde_json::from_value(value)?)
    }
}
