//! Builders for the filter fragments the upstream API accepts.
//!
//! The NGD features API implements the Simple CQL conformance class of [OGC
//! API - Features - Part 3](https://portal.ogc.org/files/96288#rc_simple-cql):
//! atomic predicates joined with `and`. These builders produce the fragments;
//! [merge_filter] stacks them onto whatever filter a caller already set.

use crate::{Error, Result};
use indexmap::IndexMap;
use std::fmt;

/// A rectangular search extent, `(xmin, ymin, xmax, ymax)`.
///
/// Renders as the comma-joined coordinate string the `bbox` query parameter
/// expects.
///
/// # Examples
///
/// ```
/// use ngd::filter::Bbox;
///
/// let bbox = Bbox::new(440000.0, 112000.0, 441000.0, 113000.0).unwrap();
/// assert_eq!(bbox.to_string(), "440000,112000,441000,113000");
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bbox {
    xmin: f64,
    ymin: f64,
    xmax: f64,
    ymax: f64,
}

impl Bbox {
    /// Creates a bounding box, checking that the bounds are ordered.
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Result<Bbox> {
        if xmin > xmax {
            return Err(Error::InvalidBbox(format!(
                "xmax ({xmax}) must be greater than xmin ({xmin})"
            )));
        }
        if ymin > ymax {
            return Err(Error::InvalidBbox(format!(
                "ymax ({ymax}) must be greater than ymin ({ymin})"
            )));
        }
        Ok(Bbox {
            xmin,
            ymin,
            xmax,
            ymax,
        })
    }

    /// Creates a bounding box from individually-supplied bounds.
    ///
    /// All four must be present.
    pub fn from_bounds(
        xmin: Option<f64>,
        ymin: Option<f64>,
        xmax: Option<f64>,
        ymax: Option<f64>,
    ) -> Result<Bbox> {
        match (xmin, ymin, xmax, ymax) {
            (Some(xmin), Some(ymin), Some(xmax), Some(ymax)) => Bbox::new(xmin, ymin, xmax, ymax),
            _ => Err(Error::MissingBboxBounds),
        }
    }
}

impl TryFrom<(f64, f64, f64, f64)> for Bbox {
    type Error = Error;

    fn try_from((xmin, ymin, xmax, ymax): (f64, f64, f64, f64)) -> Result<Bbox> {
        Bbox::new(xmin, ymin, xmax, ymax)
    }
}

impl fmt::Display for Bbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.xmin, self.ymin, self.xmax, self.ymax)
    }
}

/// An attribute filter value.
///
/// Strings are single-quoted in the rendered filter; numbers and booleans
/// are rendered bare.
#[derive(Clone, Debug, PartialEq)]
pub enum FilterValue {
    /// A string value, quoted on output.
    String(String),
    /// A numeric value.
    Number(f64),
    /// A boolean value.
    Bool(bool),
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::String(value) => write!(f, "'{value}'"),
            FilterValue::Number(value) => write!(f, "{value}"),
            FilterValue::Bool(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> FilterValue {
        FilterValue::String(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> FilterValue {
        FilterValue::String(value)
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> FilterValue {
        FilterValue::Number(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> FilterValue {
        FilterValue::Number(value as f64)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> FilterValue {
        FilterValue::Bool(value)
    }
}

/// Renders attribute equality predicates, `(key=value)` joined with `and`.
///
/// An empty map renders as the empty string; callers skip appending the
/// filter in that case.
///
/// # Examples
///
/// ```
/// use indexmap::IndexMap;
/// use ngd::filter;
///
/// let mut params = IndexMap::new();
/// params.insert("oslandcovertierb".to_string(), "Water".into());
/// assert_eq!(filter::attribute_filter(&params), "(oslandcovertierb='Water')");
/// ```
pub fn attribute_filter(params: &IndexMap<String, FilterValue>) -> String {
    params
        .iter()
        .map(|(key, value)| format!("({key}={value})"))
        .collect::<Vec<_>>()
        .join("and")
}

/// Wraps a WKT geometry in a spatial predicate.
///
/// `INTERSECTS` is the only predicate offered: the upstream's Simple CQL
/// conformance class does not guarantee support for the others.
pub fn spatial_filter(wkt: &str) -> String {
    format!("(INTERSECTS(geometry,{wkt}))")
}

/// Appends a predicate to an existing filter expression.
///
/// The existing expression is parenthesised before the `and` so its own
/// operator grouping survives, whatever the caller had written.
///
/// # Examples
///
/// ```
/// use ngd::filter;
///
/// assert_eq!(filter::merge_filter(Some("(a=1)"), "(b=2)"), "((a=1))and(b=2)");
/// assert_eq!(filter::merge_filter(None, "(b=2)"), "(b=2)");
/// ```
pub fn merge_filter(existing: Option<&str>, addition: &str) -> String {
    match existing {
        Some(existing) if !existing.is_empty() => format!("({existing})and{addition}"),
        _ => addition.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{Bbox, FilterValue, attribute_filter, merge_filter, spatial_filter};
    use indexmap::IndexMap;

    #[test]
    fn bbox_round_trips_through_its_string_form() {
        let bbox = Bbox::new(-1.5, 50.0, 0.25, 51.0).unwrap();
        let rendered = bbox.to_string();
        let values: Vec<f64> = rendered.split(',').map(|v| v.parse().unwrap()).collect();
        assert_eq!(values, vec![-1.5, 50.0, 0.25, 51.0]);
    }

    #[test]
    fn bbox_rejects_inverted_x_bounds() {
        assert!(matches!(
            Bbox::new(5.0, 0.0, 1.0, 1.0).unwrap_err(),
            crate::Error::InvalidBbox(_)
        ));
    }

    #[test]
    fn bbox_rejects_inverted_y_bounds() {
        assert!(matches!(
            Bbox::new(0.0, 5.0, 1.0, 1.0).unwrap_err(),
            crate::Error::InvalidBbox(_)
        ));
    }

    #[test]
    fn bbox_from_bounds_requires_all_four() {
        assert!(matches!(
            Bbox::from_bounds(Some(0.0), Some(0.0), Some(1.0), None).unwrap_err(),
            crate::Error::MissingBboxBounds
        ));
        let bbox = Bbox::from_bounds(Some(0.0), Some(0.0), Some(1.0), Some(1.0)).unwrap();
        assert_eq!(bbox.to_string(), "0,0,1,1");
    }

    #[test]
    fn attribute_filter_quotes_strings() {
        let mut params = IndexMap::new();
        params.insert("oslandcovertierb".to_string(), FilterValue::from("Water"));
        assert_eq!(attribute_filter(&params), "(oslandcovertierb='Water')");
    }

    #[test]
    fn attribute_filter_leaves_numbers_and_bools_bare() {
        let mut params = IndexMap::new();
        params.insert("buildingage".to_string(), FilterValue::from(1890_i64));
        params.insert("islisted".to_string(), FilterValue::from(true));
        assert_eq!(
            attribute_filter(&params),
            "(buildingage=1890)and(islisted=true)"
        );
    }

    #[test]
    fn attribute_filter_of_nothing_is_empty() {
        assert_eq!(attribute_filter(&IndexMap::new()), "");
    }

    #[test]
    fn merge_wraps_the_existing_expression() {
        assert_eq!(merge_filter(Some("(a=1)"), "(b=2)"), "((a=1))and(b=2)");
    }

    #[test]
    fn merge_with_nothing_existing_is_the_addition() {
        assert_eq!(merge_filter(None, "(b=2)"), "(b=2)");
        assert_eq!(merge_filter(Some(""), "(b=2)"), "(b=2)");
    }

    #[test]
    fn spatial_filter_is_an_intersects_predicate() {
        assert_eq!(
            spatial_filter("POINT(1 2)"),
            "(INTERSECTS(geometry,POINT(1 2)))"
        );
    }
}
