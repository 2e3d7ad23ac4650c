//! Polygon selection over decoded spatial datasets
//!
//! Drives the filter through the same entry points the explorer uses: JSON
//! payload → features → drawn polygon → visible set.

use kh_canvas::geometry::SpatialHyperedgePayload;
use kh_canvas::{
    decode_features, features_from_spatial_hyperedges, filter_features, ContainmentMode,
    DrawEvent, DrawingConfig, DrawingStateMachine, Point, ScreenProjection, SpatialFeature,
    SpatialSelection, Viewport, ViewportTransform,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn ring(coords: &[[f64; 2]]) -> Vec<Point> {
    coords.iter().map(|&c| Point::from(c)).collect()
}

fn drawn_box() -> Vec<Point> {
    ring(&[[-71.12, 42.34], [-71.12, 42.41], [-70.98, 42.41], [-70.98, 42.34]])
}

fn boston_baseline() -> Vec<SpatialFeature> {
    decode_features(&[
        json!({"name": "State House", "type": "Point", "coordinates": [-71.06, 42.36]}),
        json!({
            "name": "Downtown",
            "type": "Polygon",
            "coordinates": [[[-71.10, 42.35], [-71.00, 42.35], [-71.00, 42.40], [-71.10, 42.40]]]
        }),
    ])
}

fn identities(features: &[SpatialFeature]) -> Vec<&str> {
    let mut ids: Vec<&str> = features.iter().map(|f| f.identity.as_str()).collect();
    ids.sort_unstable();
    ids
}

#[test]
fn test_boston_point_and_polygon_both_modes() {
    let baseline = boston_baseline();
    assert_eq!(baseline.len(), 2);

    for mode in [ContainmentMode::Overlap, ContainmentMode::Contained] {
        let selected = filter_features(&baseline, &drawn_box(), mode).unwrap();
        assert_eq!(identities(&selected), vec!["Downtown", "State House"], "{mode:?}");
    }
}

#[test]
fn test_multipolygon_any_versus_all() {
    let baseline = vec![SpatialFeature::multi_polygon(
        "split-district",
        vec![
            ring(&[[-71.09, 42.36], [-71.05, 42.36], [-71.05, 42.39]]),
            ring(&[[-72.00, 43.00], [-71.90, 43.00], [-71.90, 43.10]]),
        ],
    )];

    let overlap = filter_features(&baseline, &drawn_box(), ContainmentMode::Overlap).unwrap();
    let contained = filter_features(&baseline, &drawn_box(), ContainmentMode::Contained).unwrap();

    // Any part intersecting is enough for overlap; contained needs every part
    assert_eq!(overlap.len(), 1);
    assert!(contained.is_empty());
}

#[test]
fn test_filter_is_idempotent() {
    let baseline = boston_baseline();
    let first = filter_features(&baseline, &drawn_box(), ContainmentMode::Overlap).unwrap();
    let second = filter_features(&baseline, &drawn_box(), ContainmentMode::Overlap).unwrap();
    assert_eq!(identities(&first), identities(&second));
}

#[test]
fn test_mode_toggle_is_reversible() {
    let baseline = boston_baseline();
    let mut selection = SpatialSelection::new(ContainmentMode::Overlap).with_baseline(baseline.clone());
    // Half-in polygon so the modes disagree
    let half = ring(&[[-71.08, 42.30], [-70.90, 42.30], [-70.90, 42.38], [-71.08, 42.38]]);
    assert!(selection.apply_polygon(&half));
    let original = selection.current().to_vec();
    assert_eq!(identities(&original), vec!["Downtown", "State House"]);

    selection.set_mode(ContainmentMode::Contained);
    assert_eq!(identities(selection.current()), vec!["State House"]);

    selection.set_mode(ContainmentMode::Overlap);
    assert_eq!(selection.current(), original.as_slice());
    assert_eq!(selection.baseline(), baseline.as_slice());
}

#[test]
fn test_spatial_hyperedge_payload_to_selection() {
    let payload: SpatialHyperedgePayload = serde_json::from_value(json!({
        "hyperedges": [
            {
                "hyperedge_id": "h1",
                "relation_type": "located_in",
                "subjects": ["MIT"],
                "objects": ["Cambridge"],
                "spatial_contexts": [
                    {"name": "Cambridge", "type": "Point", "coordinates": [-71.09, 42.37]},
                    {"name": "Somewhere"}
                ]
            },
            {
                "hyperedge_id": "h2",
                "relation_type": "visited",
                "subjects": ["Alice"],
                "objects": ["Paris"],
                "spatial_contexts": [
                    {"name": "Paris", "type": "Point", "coordinates": [2.35, 48.86]}
                ]
            }
        ]
    }))
    .unwrap();

    let features = features_from_spatial_hyperedges(&payload);
    assert_eq!(features.len(), 2);

    let selected = filter_features(&features, &drawn_box(), ContainmentMode::Overlap).unwrap();
    assert_eq!(identities(&selected), vec!["Cambridge"]);
    assert_eq!(selected[0].properties["relation_type"], json!("located_in"));
}

#[test]
fn test_drawing_through_viewport_projection() {
    // World units are small (degrees); at scale 5 one degree is 5 px
    let mut viewport = ViewportTransform::new(800.0, 600.0);
    viewport.set_transform(Viewport {
        translate_x: 400.0,
        translate_y: 300.0,
        scale: 5.0,
    });

    let mut machine = DrawingStateMachine::new(DrawingConfig::default(), ContainmentMode::Overlap);
    machine.set_baseline(vec![
        SpatialFeature::point("inside", 5.0, 5.0),
        SpatialFeature::point("outside", 50.0, 50.0),
    ]);

    machine.start();
    for v in [[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0]] {
        machine.click(Point::from(v), &viewport);
    }
    // 1 world unit from the first vertex is 5 px on screen: closes
    let near = Point::new(1.0, 0.0);
    assert!(viewport.to_screen(near).distance(viewport.to_screen(Point::ZERO)) <= 10.0);
    let event = machine.click(near, &viewport);
    assert_eq!(event, DrawEvent::Closed { vertices: 4, selected: 1 });
    assert_eq!(identities(machine.visible_features()), vec!["inside"]);

    machine.clear();
    assert_eq!(machine.visible_features().len(), 2);
}

#[test]
fn test_malformed_records_are_skipped() {
    let features = decode_features(&[
        json!({"name": "ok", "type": "Point", "coordinates": [1.0, 2.0]}),
        json!({"name": "bad-type", "type": "LineString", "coordinates": [[0, 0], [1, 1]]}),
        json!({"name": "no-coords", "type": "Point"}),
        json!({"name": "short", "type": "Point", "coordinates": [1.0]}),
    ]);
    assert_eq!(identities(&features), vec!["ok"]);
}
