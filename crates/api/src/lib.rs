//! Request composition and result aggregation for the Ordnance Survey NGD
//! features API.
//!
//! The heart of this crate is one capability:
//!
//! ```text
//! ItemsClient::items(ItemsRequest) -> Result<SearchResults>
//! ```
//!
//! [ApiClient] implements it by issuing a single bounded request against the
//! upstream items endpoint. Everything else is a wrapper that implements the
//! same capability around another implementation of it:
//!
//! - [Paginated] pages past the upstream 100-feature cap
//! - [MultiGeometry] fans out across the atomic parts of a multi-geometry
//! - [MultiCollection] fans out across several feature collections
//! - [Authenticated] attaches a bearer token and retries once on a 401
//!
//! Because every wrapper speaks the same contract, stacks can be assembled
//! in any order:
//!
//! ```no_run
//! use ngd_api::{
//!     ApiClient, Authenticated, ItemsClient, ItemsRequest, MultiCollection,
//!     MultiGeometry, Paginated, TokenBroker, TokenStore,
//! };
//!
//! # async fn example() -> ngd_api::Result<()> {
//! let client = ApiClient::new()?;
//! let resolver = client.resolver()?;
//! let broker = TokenBroker::new(None)?;
//! let stack = MultiCollection::new(
//!     MultiGeometry::new(Paginated::new(Authenticated::new(
//!         client,
//!         TokenStore::new(),
//!         broker,
//!     ))),
//!     resolver,
//! );
//! let request = ItemsRequest::multi(["bld-fts-buildingline", "bld-fts-buildingpart"])
//!     .use_latest_collection(true)
//!     .search_area("MULTIPOLYGON(((0 0, 1 0, 1 1, 0 0)), ((5 5, 6 5, 6 6, 5 5)))")
//!     .limit(250);
//! let results = stack.items(request).await?;
//! # Ok(())
//! # }
//! ```
//!
//! Fan-out is sequential: one upstream request is in flight at a time, parts
//! run in input order, and the first error aborts the remainder.

#![warn(missing_docs, unused_qualifications)]

mod auth;
mod client;
mod error;
mod features;
mod multi_collection;
mod multi_geometry;
mod paginate;
mod query;
mod request;
mod telemetry;
mod versions;

pub use auth::{Authenticated, Credentials, DEFAULT_TOKEN_URL, TokenBroker, TokenStore};
pub use client::{ApiClient, DEFAULT_BASE_URL, ItemsClient};
pub use error::{ERROR_SOURCE_UPSTREAM, ERROR_SOURCE_WRAPPER, Error, ErrorPayload};
pub use features::{Feature, FeatureSet, SearchAreaResults, SearchResults};
pub use multi_collection::MultiCollection;
pub use multi_geometry::MultiGeometry;
pub use ngd::filter::FilterValue;
pub use paginate::{DEFAULT_REQUEST_LIMIT, Paginated};
pub use query::{Crs, Query};
pub use request::{ItemsRequest, SearchArea};
pub use telemetry::{Telemetry, TracingTelemetry};
pub use versions::{DEFAULT_RECENT_UPDATE_DAYS, LatestCollections, VersionResolver};

/// Crate-specific result type.
pub type Result<T> = std::result::Result<T, Error>;
