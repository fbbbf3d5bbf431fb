use thiserror::Error;

/// Error enum for crate-specific errors.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A bounding box with a minimum bound greater than its maximum.
    #[error("invalid bbox: {0}")]
    InvalidBbox(String),

    /// A bounding box built from named bounds with one or more missing.
    #[error("you must provide either a complete bbox tuple or all of xmin, ymin, xmax, and ymax")]
    MissingBboxBounds,

    /// This string is not valid well-known text.
    #[error("invalid wkt: {0}")]
    InvalidWkt(String),
}
