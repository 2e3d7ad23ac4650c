//! Planar geometry shared by the spatial filter and the layout engine
//!
//! Coordinates are `f64` throughout: the same `Point` carries lon/lat pairs
//! for map features and simulation-space positions for graph nodes.

pub mod drawing;
pub mod feature;
pub mod kernel;
pub mod selection;

pub use drawing::{DrawEvent, DrawingConfig, DrawingState, DrawingStateMachine, ScreenProjection};
pub use feature::{
    decode_features, features_from_spatial_hyperedges, FeatureError, FeatureKind, Geometry,
    SpatialFeature, SpatialHyperedge, SpatialHyperedgePayload,
};
pub use kernel::{
    point_in_polygon, polygon_fully_inside, polygons_intersect, polygons_intersect_traced,
    segments_intersect, IntersectPhase, IntersectStats,
};
pub use selection::{feature_matches, filter_features, validate_polygon, ContainmentMode, SpatialSelection};

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

/// Denominator floor for direction vectors of (near) zero length
pub const EPSILON: f64 = 1e-6;

// =============================================================================
// POINT
// =============================================================================

/// A 2D point or vector. Serializes as `[x, y]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f64 {
        self.length_sq().sqrt()
    }

    pub fn length_sq(self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    pub fn distance(self, other: Point) -> f64 {
        (self - other).length()
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Point> for [f64; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Point {
    fn add_assign(&mut self, rhs: Point) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Point {
    fn sub_assign(&mut self, rhs: Point) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Mul<f64> for Point {
    type Output = Point;
    fn mul(self, k: f64) -> Point {
        Point::new(self.x * k, self.y * k)
    }
}

// =============================================================================
// BOUNDING BOX
// =============================================================================

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Point,
    pub max: Point,
}

impl BoundingBox {
    pub fn from_min_max(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    pub fn from_center_half_size(center: Point, half_w: f64, half_h: f64) -> Self {
        Self {
            min: Point::new(center.x - half_w, center.y - half_h),
            max: Point::new(center.x + half_w, center.y + half_h),
        }
    }

    /// Box around a point set, `None` when empty
    pub fn from_points(points: &[Point]) -> Option<Self> {
        let first = *points.first()?;
        let mut bounds = Self::from_min_max(first, first);
        for p in &points[1..] {
            bounds.include(*p);
        }
        Some(bounds)
    }

    pub fn include(&mut self, p: Point) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
    }

    pub fn union(self, other: BoundingBox) -> BoundingBox {
        let mut out = self;
        out.include(other.min);
        out.include(other.max);
        out
    }

    /// Grow by `amount` on every side
    pub fn expand(self, amount: f64) -> BoundingBox {
        Self {
            min: Point::new(self.min.x - amount, self.min.y - amount),
            max: Point::new(self.max.x + amount, self.max.y + amount),
        }
    }

    /// Closed-interval overlap test (touching boxes overlap)
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_serializes_as_pair() {
        let json = serde_json::to_string(&Point::new(-71.06, 42.36)).unwrap();
        assert_eq!(json, "[-71.06,42.36]");
        let back: Point = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Point::new(-71.06, 42.36));
    }

    #[test]
    fn test_bounds_from_points() {
        assert!(BoundingBox::from_points(&[]).is_none());

        let b = BoundingBox::from_points(&[
            Point::new(1.0, 5.0),
            Point::new(-2.0, 3.0),
            Point::new(4.0, -1.0),
        ])
        .unwrap();
        assert_eq!(b.min, Point::new(-2.0, -1.0));
        assert_eq!(b.max, Point::new(4.0, 5.0));
        assert_eq!(b.center(), Point::new(1.0, 2.0));
    }

    #[test]
    fn test_bounds_touching_intersect() {
        let a = BoundingBox::from_min_max(Point::new(0.0, 0.0), Point::new(1.0, 1.0));
        let b = BoundingBox::from_min_max(Point::new(1.0, 0.0), Point::new(2.0, 1.0));
        let c = BoundingBox::from_min_max(Point::new(1.5, 0.0), Point::new(2.0, 1.0));
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }
}
