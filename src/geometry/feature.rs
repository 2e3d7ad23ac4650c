//! Spatial features and their decoding from backend payloads
//!
//! Geometry is a tagged variant with one concrete shape per tag:
//! a Point carries one coordinate, a Polygon one ring, a MultiPolygon a set
//! of rings. The decoder accepts both that flat form and full GeoJSON
//! nesting (polygon = list of rings), keeping only the outer ring.

use super::Point;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors raised while decoding a single feature
#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("geometry has no `type` field")]
    MissingType,

    #[error("unsupported geometry type: {0}")]
    UnsupportedType(String),

    #[error("geometry has no `coordinates` field")]
    MissingCoordinates,

    #[error("malformed coordinates: {0}")]
    MalformedCoordinates(String),

    #[error("non-finite coordinate in feature")]
    NonFinite,

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// TYPES
// =============================================================================

/// Feature kind tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureKind {
    Point,
    Polygon,
    MultiPolygon,
}

/// Geometry of a spatial feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(Point),
    Polygon(Vec<Point>),
    MultiPolygon(Vec<Vec<Point>>),
}

impl Geometry {
    pub fn kind(&self) -> FeatureKind {
        match self {
            Geometry::Point(_) => FeatureKind::Point,
            Geometry::Polygon(_) => FeatureKind::Polygon,
            Geometry::MultiPolygon(_) => FeatureKind::MultiPolygon,
        }
    }

    /// True when every coordinate is finite
    pub fn is_finite(&self) -> bool {
        match self {
            Geometry::Point(p) => p.is_finite(),
            Geometry::Polygon(ring) => ring.iter().all(|p| p.is_finite()),
            Geometry::MultiPolygon(rings) => rings.iter().flatten().all(|p| p.is_finite()),
        }
    }

    /// Decode a GeoJSON-style `{type, coordinates}` object
    pub fn from_geojson(value: &Value) -> Result<Self, FeatureError> {
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or(FeatureError::MissingType)?;
        let coords = value
            .get("coordinates")
            .ok_or(FeatureError::MissingCoordinates)?;
        // Backend stores polygon coordinates as a JSON string
        let parsed;
        let coords = match coords {
            Value::String(raw) => {
                parsed = serde_json::from_str::<Value>(raw)?;
                &parsed
            }
            other => other,
        };

        let geometry = match kind {
            "Point" => Geometry::Point(parse_position(coords)?),
            "Polygon" => Geometry::Polygon(parse_polygon(coords)?),
            "MultiPolygon" => {
                let parts = coords.as_array().ok_or_else(|| {
                    FeatureError::MalformedCoordinates("MultiPolygon is not an array".into())
                })?;
                Geometry::MultiPolygon(
                    parts.iter().map(parse_polygon).collect::<Result<_, _>>()?,
                )
            }
            other => return Err(FeatureError::UnsupportedType(other.to_string())),
        };

        if !geometry.is_finite() {
            return Err(FeatureError::NonFinite);
        }
        Ok(geometry)
    }
}

/// A spatial record selectable by a drawn polygon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialFeature {
    pub identity: String,
    pub geometry: Geometry,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Value>,
}

impl SpatialFeature {
    pub fn new(identity: impl Into<String>, geometry: Geometry) -> Self {
        Self {
            identity: identity.into(),
            geometry,
            properties: BTreeMap::new(),
        }
    }

    pub fn point(identity: impl Into<String>, x: f64, y: f64) -> Self {
        Self::new(identity, Geometry::Point(Point::new(x, y)))
    }

    pub fn polygon(identity: impl Into<String>, ring: Vec<Point>) -> Self {
        Self::new(identity, Geometry::Polygon(ring))
    }

    pub fn multi_polygon(identity: impl Into<String>, rings: Vec<Vec<Point>>) -> Self {
        Self::new(identity, Geometry::MultiPolygon(rings))
    }

    /// Builder: attach a property
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn kind(&self) -> FeatureKind {
        self.geometry.kind()
    }

    /// Decode one record.
    ///
    /// Accepts a GeoJSON `Feature` (`geometry` + `properties`) or the flat
    /// spatial-context shape `{name, type, coordinates}`. `fallback_identity`
    /// is used when the record carries no name or id.
    pub fn from_value(value: &Value, fallback_identity: &str) -> Result<Self, FeatureError> {
        let is_feature = value.get("type").and_then(Value::as_str) == Some("Feature");
        let geometry_value = if is_feature {
            value.get("geometry").ok_or(FeatureError::MissingCoordinates)?
        } else {
            value
        };
        let geometry = Geometry::from_geojson(geometry_value)?;

        let mut properties = BTreeMap::new();
        if let Some(Value::Object(map)) = value.get("properties") {
            properties.extend(map.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        let identity = ["identity", "name", "id"]
            .iter()
            .find_map(|key| {
                value
                    .get(*key)
                    .or_else(|| properties.get(*key))
                    .and_then(value_as_label)
            })
            .unwrap_or_else(|| fallback_identity.to_string());

        Ok(Self {
            identity,
            geometry,
            properties,
        })
    }
}

/// Decode a list of records, skipping malformed ones.
///
/// A single bad record never aborts the batch; it is logged and dropped.
pub fn decode_features(values: &[Value]) -> Vec<SpatialFeature> {
    let mut features = Vec::with_capacity(values.len());
    for (i, value) in values.iter().enumerate() {
        match SpatialFeature::from_value(value, &format!("feature-{i}")) {
            Ok(feature) => features.push(feature),
            Err(e) => warn!(index = i, error = %e, "skipping malformed spatial feature"),
        }
    }
    features
}

// =============================================================================
// SPATIAL HYPEREDGE PAYLOAD
// =============================================================================

/// One hyperedge with its spatial contexts, as returned by the backend
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpatialHyperedge {
    #[serde(default)]
    pub hyperedge_id: Option<String>,
    #[serde(default)]
    pub relation_type: Option<String>,
    #[serde(default)]
    pub subjects: Vec<String>,
    #[serde(default)]
    pub objects: Vec<String>,
    #[serde(default)]
    pub spatial_contexts: Vec<Value>,
}

/// Envelope of the spatial-hyperedge listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpatialHyperedgePayload {
    #[serde(default)]
    pub hyperedges: Vec<SpatialHyperedge>,
}

impl SpatialHyperedgePayload {
    pub fn from_json_str(json: &str) -> Result<Self, FeatureError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Flatten spatial hyperedges into one feature per spatial context.
///
/// Each feature inherits the hyperedge's relation, subjects and objects as
/// properties. Contexts that carry only a place name have no geometry and
/// are skipped quietly.
pub fn features_from_spatial_hyperedges(payload: &SpatialHyperedgePayload) -> Vec<SpatialFeature> {
    let mut features = Vec::new();
    for (i, edge) in payload.hyperedges.iter().enumerate() {
        let relation = edge.relation_type.as_deref().unwrap_or("unknown");
        for (j, ctx) in edge.spatial_contexts.iter().enumerate() {
            if ctx.get("coordinates").map_or(true, Value::is_null) {
                debug!(hyperedge = i, context = j, "spatial context without coordinates");
                continue;
            }
            let fallback = match &edge.hyperedge_id {
                Some(id) => format!("{id}#{j}"),
                None => format!("{relation}#{i}.{j}"),
            };
            match SpatialFeature::from_value(ctx, &fallback) {
                Ok(feature) => features.push(
                    feature
                        .with_property("relation_type", relation)
                        .with_property("subjects", edge.subjects.clone())
                        .with_property("objects", edge.objects.clone()),
                ),
                Err(e) => {
                    warn!(hyperedge = i, context = j, error = %e, "skipping malformed spatial context")
                }
            }
        }
    }
    features
}

// =============================================================================
// COORDINATE PARSING
// =============================================================================

fn value_as_label(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_position(value: &Value) -> Result<Point, FeatureError> {
    let arr = value
        .as_array()
        .filter(|a| a.len() >= 2)
        .ok_or_else(|| FeatureError::MalformedCoordinates(format!("not a position: {value}")))?;
    let x = arr[0].as_f64();
    let y = arr[1].as_f64();
    match (x, y) {
        (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Ok(Point::new(x, y)),
        (Some(_), Some(_)) => Err(FeatureError::NonFinite),
        _ => Err(FeatureError::MalformedCoordinates(format!(
            "non-numeric position: {value}"
        ))),
    }
}

fn parse_ring(value: &Value) -> Result<Vec<Point>, FeatureError> {
    value
        .as_array()
        .ok_or_else(|| FeatureError::MalformedCoordinates("ring is not an array".into()))?
        .iter()
        .map(parse_position)
        .collect()
}

/// A polygon is either a bare ring or a GeoJSON list of rings (outer first)
fn parse_polygon(value: &Value) -> Result<Vec<Point>, FeatureError> {
    let arr = value
        .as_array()
        .ok_or_else(|| FeatureError::MalformedCoordinates("polygon is not an array".into()))?;
    let Some(first) = arr.first() else {
        return Ok(Vec::new());
    };
    if is_position(first) {
        parse_ring(value)
    } else {
        parse_ring(first)
    }
}

fn is_position(value: &Value) -> bool {
    value
        .as_array()
        .and_then(|a| a.first())
        .is_some_and(Value::is_number)
}
