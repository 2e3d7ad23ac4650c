//! Geometry kernel: containment and intersection of rings
//!
//! Rings are open vertex lists; the closing edge from the last vertex back to
//! the first is implicit. A ring with fewer than 3 vertices is treated as
//! absent: every predicate involving it answers `false`.
//!
//! Points lying exactly on a ring edge get whatever the even-odd rule gives
//! them. That answer depends on edge orientation and is not "fixed" here.

use super::{BoundingBox, Point};

/// Minimum vertex count of a usable ring
pub const MIN_RING_VERTICES: usize = 3;

/// Even-odd ray casting
pub fn point_in_polygon(point: Point, ring: &[Point]) -> bool {
    if ring.len() < MIN_RING_VERTICES {
        return false;
    }

    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let pi = ring[i];
        let pj = ring[j];

        // Straddle check guarantees pj.y != pi.y in the division
        if (pi.y > point.y) != (pj.y > point.y)
            && point.x < (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x
        {
            inside = !inside;
        }

        j = i;
    }

    inside
}

/// Counter-clockwise orientation of the triple (a, b, c)
fn ccw(a: Point, b: Point, c: Point) -> bool {
    (c.y - a.y) * (b.x - a.x) > (b.y - a.y) * (c.x - a.x)
}

/// Orientation-sign segment test. Collinear overlaps are not special-cased.
pub fn segments_intersect(a1: Point, a2: Point, b1: Point, b2: Point) -> bool {
    ccw(a1, b1, b2) != ccw(a2, b1, b2) && ccw(a1, a2, b1) != ccw(a1, a2, b2)
}

/// Which phase of [`polygons_intersect_traced`] produced the answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntersectPhase {
    /// A ring had fewer than 3 vertices
    Degenerate,
    /// Bounding boxes are disjoint
    BoundingBox,
    /// A vertex of one ring lies inside the other
    VertexContainment,
    /// Two edges cross
    EdgeCrossing,
    /// Every edge pair was tested without a hit
    Exhausted,
}

/// Instrumentation for polygon intersection queries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntersectStats {
    pub decided_by: Option<IntersectPhase>,
    pub vertex_tests: usize,
    pub edge_pairs_tested: usize,
}

/// Polygon/polygon intersection
pub fn polygons_intersect(poly1: &[Point], poly2: &[Point]) -> bool {
    polygons_intersect_traced(poly1, poly2, &mut IntersectStats::default())
}

/// Polygon/polygon intersection, recording how the answer was reached.
///
/// 1. Bounding-box rejection
/// 2. Any vertex of either ring inside the other
/// 3. Every edge pair, stopping at the first crossing
pub fn polygons_intersect_traced(
    poly1: &[Point],
    poly2: &[Point],
    stats: &mut IntersectStats,
) -> bool {
    if poly1.len() < MIN_RING_VERTICES || poly2.len() < MIN_RING_VERTICES {
        stats.decided_by = Some(IntersectPhase::Degenerate);
        return false;
    }

    let (Some(b1), Some(b2)) = (BoundingBox::from_points(poly1), BoundingBox::from_points(poly2))
    else {
        stats.decided_by = Some(IntersectPhase::Degenerate);
        return false;
    };
    if !b1.intersects(&b2) {
        stats.decided_by = Some(IntersectPhase::BoundingBox);
        return false;
    }

    for &p in poly1 {
        stats.vertex_tests += 1;
        if point_in_polygon(p, poly2) {
            stats.decided_by = Some(IntersectPhase::VertexContainment);
            return true;
        }
    }
    for &p in poly2 {
        stats.vertex_tests += 1;
        if point_in_polygon(p, poly1) {
            stats.decided_by = Some(IntersectPhase::VertexContainment);
            return true;
        }
    }

    for (a1, a2) in edges(poly1) {
        for (b1, b2) in edges(poly2) {
            stats.edge_pairs_tested += 1;
            if segments_intersect(a1, a2, b1, b2) {
                stats.decided_by = Some(IntersectPhase::EdgeCrossing);
                return true;
            }
        }
    }

    stats.decided_by = Some(IntersectPhase::Exhausted);
    false
}

/// True when every vertex of `inner` lies inside `outer`
pub fn polygon_fully_inside(inner: &[Point], outer: &[Point]) -> bool {
    if inner.len() < MIN_RING_VERTICES || outer.len() < MIN_RING_VERTICES {
        return false;
    }
    inner.iter().all(|&p| point_in_polygon(p, outer))
}

/// Edges of a ring including the implicit closing edge
fn edges(ring: &[Point]) -> impl Iterator<Item = (Point, Point)> + '_ {
    let n = ring.len();
    (0..n).map(move |i| (ring[i], ring[(i + 1) % n]))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(coords: &[(f64, f64)]) -> Vec<Point> {
        coords.iter().map(|&c| Point::from(c)).collect()
    }

    fn square(x0: f64, y0: f64, size: f64) -> Vec<Point> {
        ring(&[
            (x0, y0),
            (x0 + size, y0),
            (x0 + size, y0 + size),
            (x0, y0 + size),
        ])
    }

    #[test]
    fn test_point_in_square() {
        let sq = square(0.0, 0.0, 10.0);
        assert!(point_in_polygon(Point::new(5.0, 5.0), &sq));
        assert!(!point_in_polygon(Point::new(15.0, 5.0), &sq));
        assert!(!point_in_polygon(Point::new(-0.1, 5.0), &sq));
    }

    #[test]
    fn test_point_in_concave_ring() {
        // U shape, opening at the top
        let u = ring(&[
            (0.0, 0.0),
            (9.0, 0.0),
            (9.0, 9.0),
            (6.0, 9.0),
            (6.0, 3.0),
            (3.0, 3.0),
            (3.0, 9.0),
            (0.0, 9.0),
        ]);
        assert!(point_in_polygon(Point::new(1.5, 6.0), &u));
        assert!(!point_in_polygon(Point::new(4.5, 6.0), &u));
        assert!(point_in_polygon(Point::new(4.5, 1.5), &u));
    }

    #[test]
    fn test_short_ring_is_absent() {
        let two = ring(&[(0.0, 0.0), (10.0, 10.0)]);
        assert!(!point_in_polygon(Point::new(5.0, 5.0), &two));
        assert!(!polygons_intersect(&two, &square(0.0, 0.0, 10.0)));
        assert!(!polygon_fully_inside(&two, &square(-5.0, -5.0, 30.0)));
        assert!(!polygon_fully_inside(&square(0.0, 0.0, 1.0), &two));
    }

    #[test]
    fn test_segments_cross() {
        assert!(segments_intersect(
            Point::new(0.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
            Point::new(10.0, 0.0),
        ));
        assert!(!segments_intersect(
            Point::new(0.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(5.0, 0.0),
            Point::new(6.0, 1.0),
        ));
    }

    #[test]
    fn test_collinear_overlap_not_detected() {
        // Known limitation of the sign test
        assert!(!segments_intersect(
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(6.0, 0.0),
        ));
    }

    #[test]
    fn test_polygon_intersects_itself() {
        let sq = square(3.0, -2.0, 4.0);
        assert!(polygons_intersect(&sq, &sq));
    }

    #[test]
    fn test_disjoint_boxes_short_circuit() {
        let mut stats = IntersectStats::default();
        let hit = polygons_intersect_traced(
            &square(0.0, 0.0, 1.0),
            &square(5.0, 5.0, 1.0),
            &mut stats,
        );
        assert!(!hit);
        assert_eq!(stats.decided_by, Some(IntersectPhase::BoundingBox));
        assert_eq!(stats.vertex_tests, 0);
        assert_eq!(stats.edge_pairs_tested, 0);
    }

    #[test]
    fn test_cross_shape_needs_edge_phase() {
        // Plus sign: neither rectangle has a vertex inside the other
        let wide = ring(&[(0.0, 4.0), (10.0, 4.0), (10.0, 6.0), (0.0, 6.0)]);
        let tall = ring(&[(4.0, 0.0), (6.0, 0.0), (6.0, 10.0), (4.0, 10.0)]);

        let mut stats = IntersectStats::default();
        assert!(polygons_intersect_traced(&wide, &tall, &mut stats));
        assert_eq!(stats.decided_by, Some(IntersectPhase::EdgeCrossing));
        assert!(stats.edge_pairs_tested > 0);
    }

    #[test]
    fn test_overlapping_boxes_but_no_contact() {
        // L-shaped ring whose box overlaps a small square sitting in its notch
        let l = ring(&[
            (0.0, 0.0),
            (10.0, 0.0),
            (10.0, 2.0),
            (2.0, 2.0),
            (2.0, 10.0),
            (0.0, 10.0),
        ]);
        let notch = square(5.0, 5.0, 2.0);

        let mut stats = IntersectStats::default();
        assert!(!polygons_intersect_traced(&l, &notch, &mut stats));
        assert_eq!(stats.decided_by, Some(IntersectPhase::Exhausted));
        assert_eq!(stats.edge_pairs_tested, l.len() * notch.len());
    }

    #[test]
    fn test_fully_inside() {
        let outer = square(0.0, 0.0, 10.0);
        assert!(polygon_fully_inside(&square(2.0, 2.0, 3.0), &outer));
        assert!(!polygon_fully_inside(&square(8.0, 8.0, 3.0), &outer));
        assert!(!polygon_fully_inside(&outer, &square(2.0, 2.0, 3.0)));
    }
}
