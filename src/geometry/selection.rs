//! Polygon selection over a spatial dataset
//!
//! The filter always runs against the baseline - the last unfiltered
//! snapshot - never against a previous result, so toggling the containment
//! mode back and forth reproduces the same outputs.

use super::feature::{Geometry, SpatialFeature};
use super::kernel::{point_in_polygon, polygon_fully_inside, polygons_intersect, MIN_RING_VERTICES};
use super::Point;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Selection policy for area features
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainmentMode {
    /// Any intersection with the drawn polygon counts
    #[default]
    Overlap,
    /// The feature must lie entirely inside the drawn polygon
    Contained,
}

impl ContainmentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainmentMode::Overlap => "overlap",
            ContainmentMode::Contained => "contained",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            ContainmentMode::Overlap => ContainmentMode::Contained,
            ContainmentMode::Contained => ContainmentMode::Overlap,
        }
    }
}

impl std::str::FromStr for ContainmentMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "overlap" => Ok(ContainmentMode::Overlap),
            "contained" => Ok(ContainmentMode::Contained),
            other => Err(format!("unknown containment mode: {other}")),
        }
    }
}

/// Returns the polygon when it is usable as a selection (≥3 finite vertices)
pub fn validate_polygon(points: &[Point]) -> Option<&[Point]> {
    (points.len() >= MIN_RING_VERTICES && points.iter().all(|p| p.is_finite())).then_some(points)
}

/// Classify one feature against a validated polygon.
///
/// MultiPolygons are asymmetric between modes: `Overlap` needs any part to
/// intersect, `Contained` needs every part fully inside.
pub fn feature_matches(feature: &SpatialFeature, polygon: &[Point], mode: ContainmentMode) -> bool {
    match (&feature.geometry, mode) {
        (Geometry::Point(p), _) => point_in_polygon(*p, polygon),
        (Geometry::Polygon(ring), ContainmentMode::Overlap) => polygons_intersect(ring, polygon),
        (Geometry::Polygon(ring), ContainmentMode::Contained) => {
            polygon_fully_inside(ring, polygon)
        }
        (Geometry::MultiPolygon(rings), ContainmentMode::Overlap) => {
            rings.iter().any(|ring| polygons_intersect(ring, polygon))
        }
        (Geometry::MultiPolygon(rings), ContainmentMode::Contained) => {
            !rings.is_empty() && rings.iter().all(|ring| polygon_fully_inside(ring, polygon))
        }
    }
}

/// Filter `baseline` by `polygon`.
///
/// Returns `None` when the polygon is not a usable selection. Features with
/// non-finite coordinates are skipped and logged.
pub fn filter_features(
    baseline: &[SpatialFeature],
    polygon: &[Point],
    mode: ContainmentMode,
) -> Option<Vec<SpatialFeature>> {
    let polygon = validate_polygon(polygon)?;

    let mut selected = Vec::new();
    for feature in baseline {
        if !feature.geometry.is_finite() {
            warn!(identity = %feature.identity, "skipping feature with non-finite geometry");
            continue;
        }
        if feature_matches(feature, polygon, mode) {
            selected.push(feature.clone());
        }
    }
    Some(selected)
}

// =============================================================================
// SELECTION STATE
// =============================================================================

/// Baseline snapshot plus the active polygon selection over it
#[derive(Debug, Clone, Default)]
pub struct SpatialSelection {
    /// Last unfiltered dataset
    baseline: Vec<SpatialFeature>,
    /// Active drawn polygon (validated)
    polygon: Option<Vec<Point>>,
    mode: ContainmentMode,
    /// Result of the last filter run, `None` when no selection is active
    filtered: Option<Vec<SpatialFeature>>,
}

impl SpatialSelection {
    pub fn new(mode: ContainmentMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Builder: set the baseline
    pub fn with_baseline(mut self, features: Vec<SpatialFeature>) -> Self {
        self.set_baseline(features);
        self
    }

    /// Replace the baseline. An active polygon is re-applied to the new data.
    pub fn set_baseline(&mut self, features: Vec<SpatialFeature>) {
        self.baseline = features;
        self.refilter();
    }

    pub fn baseline(&self) -> &[SpatialFeature] {
        &self.baseline
    }

    /// Apply a drawn polygon. Returns whether a selection is now active.
    ///
    /// An unusable polygon clears any previous selection.
    pub fn apply_polygon(&mut self, polygon: &[Point]) -> bool {
        match validate_polygon(polygon) {
            Some(valid) => {
                self.polygon = Some(valid.to_vec());
                self.refilter();
                true
            }
            None => {
                debug!(vertices = polygon.len(), "ignoring unusable selection polygon");
                self.clear();
                false
            }
        }
    }

    /// Change the containment mode and re-filter from the baseline
    pub fn set_mode(&mut self, mode: ContainmentMode) {
        if self.mode != mode {
            self.mode = mode;
            self.refilter();
        }
    }

    pub fn mode(&self) -> ContainmentMode {
        self.mode
    }

    pub fn polygon(&self) -> Option<&[Point]> {
        self.polygon.as_deref()
    }

    pub fn is_active(&self) -> bool {
        self.filtered.is_some()
    }

    /// Drop the polygon; the visible set falls back to the stored baseline
    pub fn clear(&mut self) {
        self.polygon = None;
        self.filtered = None;
    }

    /// Currently visible features: the filtered set, or the baseline
    pub fn current(&self) -> &[SpatialFeature] {
        self.filtered.as_deref().unwrap_or(&self.baseline)
    }

    fn refilter(&mut self) {
        self.filtered = self
            .polygon
            .as_deref()
            .and_then(|polygon| filter_features(&self.baseline, polygon, self.mode));
        if let Some(ref filtered) = self.filtered {
            debug!(
                mode = self.mode.as_str(),
                selected = filtered.len(),
                baseline = self.baseline.len(),
                "spatial selection applied"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: f64, y0: f64, size: f64) -> Vec<Point> {
        vec![
            Point::new(x0, y0),
            Point::new(x0 + size, y0),
            Point::new(x0 + size, y0 + size),
            Point::new(x0, y0 + size),
        ]
    }

    fn dataset() -> Vec<SpatialFeature> {
        vec![
            SpatialFeature::point("inside-point", 5.0, 5.0),
            SpatialFeature::point("outside-point", 50.0, 50.0),
            SpatialFeature::polygon("straddling", square(8.0, 8.0, 4.0)),
            SpatialFeature::polygon("enclosed", square(2.0, 2.0, 2.0)),
        ]
    }

    fn ids(features: &[SpatialFeature]) -> Vec<&str> {
        features.iter().map(|f| f.identity.as_str()).collect()
    }

    #[test]
    fn test_overlap_vs_contained() {
        let drawn = square(0.0, 0.0, 10.0);
        let overlap = filter_features(&dataset(), &drawn, ContainmentMode::Overlap).unwrap();
        let contained = filter_features(&dataset(), &drawn, ContainmentMode::Contained).unwrap();

        assert_eq!(ids(&overlap), vec!["inside-point", "straddling", "enclosed"]);
        assert_eq!(ids(&contained), vec!["inside-point", "enclosed"]);
    }

    #[test]
    fn test_unusable_polygon_is_no_selection() {
        let two = vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)];
        assert!(filter_features(&dataset(), &two, ContainmentMode::Overlap).is_none());

        let nan = vec![
            Point::new(0.0, 0.0),
            Point::new(f64::NAN, 1.0),
            Point::new(1.0, 0.0),
        ];
        assert!(filter_features(&dataset(), &nan, ContainmentMode::Overlap).is_none());
    }

    #[test]
    fn test_non_finite_feature_skipped() {
        let mut data = dataset();
        data.push(SpatialFeature::point("broken", f64::INFINITY, 1.0));
        let out = filter_features(&data, &square(-100.0, -100.0, 1000.0), ContainmentMode::Overlap)
            .unwrap();
        assert!(!ids(&out).contains(&"broken"));
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn test_selection_clear_restores_baseline() {
        let mut selection = SpatialSelection::new(ContainmentMode::Overlap).with_baseline(dataset());
        assert_eq!(selection.current().len(), 4);

        assert!(selection.apply_polygon(&square(0.0, 0.0, 10.0)));
        assert_eq!(selection.current().len(), 3);

        selection.clear();
        assert!(!selection.is_active());
        assert_eq!(selection.current(), dataset().as_slice());
    }

    #[test]
    fn test_mode_toggle_round_trip() {
        let mut selection = SpatialSelection::new(ContainmentMode::Overlap).with_baseline(dataset());
        selection.apply_polygon(&square(0.0, 0.0, 10.0));
        let first = selection.current().to_vec();

        selection.set_mode(ContainmentMode::Contained);
        assert_eq!(selection.current().len(), 2);
        selection.set_mode(ContainmentMode::Overlap);

        assert_eq!(selection.current(), first.as_slice());
        assert_eq!(selection.baseline(), dataset().as_slice());
    }

    #[test]
    fn test_new_baseline_is_refiltered() {
        let mut selection = SpatialSelection::new(ContainmentMode::Overlap);
        selection.apply_polygon(&square(0.0, 0.0, 10.0));
        assert!(selection.current().is_empty());

        selection.set_baseline(dataset());
        assert_eq!(selection.current().len(), 3);
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("Contained".parse::<ContainmentMode>(), Ok(ContainmentMode::Contained));
        assert!("inside".parse::<ContainmentMode>().is_err());
        assert_eq!(ContainmentMode::Overlap.toggled(), ContainmentMode::Contained);
    }
}
