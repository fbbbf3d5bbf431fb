//! Search-area geometry handling.
//!
//! Search areas arrive as well-known text. Multi-part geometries are not
//! sent upstream whole; they are exploded into their atomic parts so each
//! part can be searched on its own.

use crate::{Error, Result};
use geo_types::Geometry;
use serde_json::{Map, Value};
use std::str::FromStr;
use wkt::ToWkt;

/// Parses a WKT string into a geometry.
///
/// # Examples
///
/// ```
/// use geo_types::Geometry;
///
/// let geometry = ngd::geometry::parse_wkt("POLYGON((0 0, 1 0, 1 1, 0 1, 0 0))").unwrap();
/// assert!(matches!(geometry, Geometry::Polygon(_)));
/// ```
pub fn parse_wkt(wkt: &str) -> Result<Geometry<f64>> {
    wkt::Wkt::from_str(wkt)
        .map_err(|e| Error::InvalidWkt(format!("{e:?}")))
        .and_then(|w| {
            w.try_into()
                .map_err(|e: wkt::conversion::Error| Error::InvalidWkt(format!("{e:?}")))
        })
}

/// Renders a geometry back to WKT.
pub fn to_wkt(geometry: &Geometry<f64>) -> String {
    geometry.wkt_string()
}

/// Explodes a geometry into its atomic constituents.
///
/// Multi-geometries are flattened recursively, so nested geometry
/// collections come out as one flat, ordered list of points, line strings,
/// and polygons. A non-multi geometry explodes to a one-element list
/// containing itself.
///
/// # Examples
///
/// ```
/// let geometry = ngd::geometry::parse_wkt(
///     "MULTIPOINT((0 0), (1 1), (2 2))"
/// ).unwrap();
/// assert_eq!(ngd::geometry::explode(geometry).len(), 3);
/// ```
pub fn explode(geometry: Geometry<f64>) -> Vec<Geometry<f64>> {
    match geometry {
        Geometry::MultiPoint(points) => points.into_iter().map(Geometry::Point).collect(),
        Geometry::MultiLineString(lines) => {
            lines.into_iter().map(Geometry::LineString).collect()
        }
        Geometry::MultiPolygon(polygons) => {
            polygons.into_iter().map(Geometry::Polygon).collect()
        }
        Geometry::GeometryCollection(collection) => {
            collection.into_iter().flat_map(explode).collect()
        }
        geometry => vec![geometry],
    }
}

/// Computes the bounding box of the coordinates in a set of GeoJSON
/// features.
///
/// Coordinates are taken from each feature's `geometry.coordinates` member
/// and flattened through any nesting. Returns `None` when no coordinates
/// are present at all.
pub fn coordinate_bounds<'a, I>(features: I) -> Option<(f64, f64, f64, f64)>
where
    I: IntoIterator<Item = &'a Map<String, Value>>,
{
    let mut bounds = None;
    for feature in features {
        if let Some(coordinates) = feature.get("geometry").and_then(|g| g.get("coordinates")) {
            fold_coordinates(coordinates, &mut bounds);
        }
    }
    bounds
}

fn fold_coordinates(value: &Value, bounds: &mut Option<(f64, f64, f64, f64)>) {
    let Value::Array(values) = value else {
        return;
    };
    // A position is an array whose leading elements are numbers; anything
    // else is a nested list of positions.
    if let [Value::Number(x), Value::Number(y), ..] = values.as_slice() {
        if let (Some(x), Some(y)) = (x.as_f64(), y.as_f64()) {
            *bounds = Some(match *bounds {
                Some((xmin, ymin, xmax, ymax)) => {
                    (xmin.min(x), ymin.min(y), xmax.max(x), ymax.max(y))
                }
                None => (x, y, x, y),
            });
            return;
        }
    }
    for value in values {
        fold_coordinates(value, bounds);
    }
}
