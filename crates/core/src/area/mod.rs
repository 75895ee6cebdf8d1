//! GeoJSON area files: one footprint plus search properties.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AreaError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid GeoJSON in {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("{0} contains no geometry")]
    NoGeometry(PathBuf),

    #[error("unsupported geometry type {kind} in {path}")]
    UnsupportedGeometry { path: PathBuf, kind: String },
}

/// A search area: name (file stem), WKT footprint and the properties that
/// override the default search query.
#[derive(Debug, Clone, PartialEq)]
pub struct Area {
    pub name: String,
    pub wkt: String,
    pub properties: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum Document {
    FeatureCollection { features: Vec<Feature> },
    Feature(Feature),
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: Option<Value>,
    #[serde(default)]
    properties: Option<Map<String, Value>>,
}

type Position = Vec<f64>;

fn position(p: &[f64]) -> String {
    p.iter()
        .take(2)
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn ring(r: &[Position]) -> String {
    format!(
        "({})",
        r.iter().map(|p| position(p)).collect::<Vec<_>>().join(",")
    )
}

fn polygon(rings: &[Vec<Position>]) -> String {
    format!("({})", rings.iter().map(|r| ring(r)).collect::<Vec<_>>().join(","))
}

/// Render a GeoJSON geometry as WKT.
///
/// `Ok(None)` for geometry types without a WKT rendering here.
fn to_wkt(geometry: &Value) -> Result<Option<String>, serde_json::Error> {
    let coordinates = geometry.get("coordinates").cloned().unwrap_or(Value::Null);
    let wkt = match geometry.get("type").and_then(Value::as_str) {
        Some("Point") => {
            let p: Position = serde_json::from_value(coordinates)?;
            format!("POINT ({})", position(&p))
        }
        Some("Polygon") => {
            let rings: Vec<Vec<Position>> = serde_json::from_value(coordinates)?;
            format!("POLYGON {}", polygon(&rings))
        }
        Some("MultiPolygon") => {
            let polygons: Vec<Vec<Vec<Position>>> = serde_json::from_value(coordinates)?;
            format!(
                "MULTIPOLYGON ({})",
                polygons.iter().map(|p| polygon(p)).collect::<Vec<_>>().join(",")
            )
        }
        _ => return Ok(None),
    };
    Ok(Some(wkt))
}

/// Parse GeoJSON text. The first feature carrying a geometry wins.
pub fn parse_area(name: &str, path: &Path, text: &str) -> Result<Area, AreaError> {
    let parse_error = |e: serde_json::Error| AreaError::Parse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };
    let document: Document = serde_json::from_str(text).map_err(parse_error)?;

    let features = match document {
        Document::FeatureCollection { features } => features,
        Document::Feature(feature) => vec![feature],
    };

    let feature = features
        .into_iter()
        .find(|f| f.geometry.as_ref().is_some_and(|g| !g.is_null()))
        .ok_or_else(|| AreaError::NoGeometry(path.to_path_buf()))?;
    let geometry = feature.geometry.unwrap_or_default();

    let wkt = to_wkt(&geometry)
        .map_err(parse_error)?
        .ok_or_else(|| AreaError::UnsupportedGeometry {
            path: path.to_path_buf(),
            kind: geometry
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
        })?;

    Ok(Area {
        name: name.to_string(),
        wkt,
        properties: feature.properties.unwrap_or_default(),
    })
}

/// Read an area file.
pub async fn read_area(path: &Path) -> Result<Area, AreaError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| AreaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    parse_area(name, path, &text)
}
