//! Data structures and pure logic for the Ordnance Survey [National
//! Geographic Database (NGD) features API](https://docs.os.uk/osngd/accessing-os-ngd/access-the-os-ngd-api/os-ngd-api-features).
//!
//! This crate **is**:
//!
//! - Collection naming and version selection
//! - Filter-expression building (Simple CQL fragments)
//! - Search-area geometry handling
//!
//! This crate **is not**:
//!
//! - An HTTP client (see `ngd-api`)
//! - A server (see `ngd-server`)
//!
//! # Data structures
//!
//! Feature collections are versioned by a trailing integer on their name:
//!
//! ```
//! use ngd::CollectionName;
//!
//! let name = CollectionName::parse("bld-fts-buildingline-2");
//! assert_eq!(name.base(), "bld-fts-buildingline");
//! assert_eq!(name.version(), Some(2));
//! ```

#![warn(missing_docs, unused_qualifications)]

mod collection;
mod error;
pub mod filter;
pub mod geometry;
mod link;

pub use collection::{
    Collection, CollectionName, Collections, Extent, TemporalExtent, VersionCatalog,
};
pub use error::Error;
pub use link::Link;

/// Crate-specific result type.
pub type Result<T> = std::result::Result<T, Error>;
