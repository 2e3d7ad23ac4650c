//! Barnes-Hut quadtree for the many-body force
//!
//! Quads live in a flat arena. Leaves hold body indices; a leaf splits on
//! its second body until `MAX_DEPTH`, after which coincident bodies share
//! the leaf.

use crate::geometry::{BoundingBox, Point, EPSILON};

const MAX_DEPTH: usize = 24;

/// Bodies closer than this are treated as this far apart
const MIN_DISTANCE: f64 = 1.0;

#[derive(Debug, Clone)]
struct Quad {
    bounds: BoundingBox,
    depth: usize,
    bodies: Vec<usize>,
    children: Option<[usize; 4]>,
    mass: f64,
    center_of_mass: Point,
}

impl Quad {
    fn new(bounds: BoundingBox, depth: usize) -> Self {
        Self {
            bounds,
            depth,
            bodies: Vec::new(),
            children: None,
            mass: 0.0,
            center_of_mass: Point::ZERO,
        }
    }

    fn quadrant(&self, p: Point) -> usize {
        let c = self.bounds.center();
        match (p.x >= c.x, p.y >= c.y) {
            (false, false) => 0,
            (true, false) => 1,
            (false, true) => 2,
            (true, true) => 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BarnesHutTree {
    quads: Vec<Quad>,
    positions: Vec<Point>,
    theta: f64,
}

impl BarnesHutTree {
    /// Build over `positions`. Non-finite positions are left out.
    pub fn build(positions: &[Point], theta: f64) -> Self {
        let finite: Vec<Point> = positions.iter().copied().filter(|p| p.is_finite()).collect();
        let bounds = match BoundingBox::from_points(&finite) {
            Some(b) => {
                // Square root so child quads stay square
                let half = (b.width().max(b.height()) / 2.0).max(MIN_DISTANCE);
                BoundingBox::from_center_half_size(b.center(), half, half)
            }
            None => BoundingBox::from_center_half_size(Point::ZERO, MIN_DISTANCE, MIN_DISTANCE),
        };

        let mut tree = Self {
            quads: vec![Quad::new(bounds, 0)],
            positions: positions.to_vec(),
            theta,
        };
        for (i, p) in positions.iter().enumerate() {
            if p.is_finite() {
                tree.insert(0, i);
            }
        }
        tree.accumulate(0);
        tree
    }

    pub fn len(&self) -> usize {
        self.quads[0].mass as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(&mut self, quad: usize, body: usize) {
        let pos = self.positions[body];
        let mut q = quad;
        loop {
            match self.quads[q].children {
                Some(children) => {
                    q = children[self.quads[q].quadrant(pos)];
                }
                None => {
                    if self.quads[q].bodies.is_empty() || self.quads[q].depth >= MAX_DEPTH {
                        self.quads[q].bodies.push(body);
                        return;
                    }
                    self.split(q);
                }
            }
        }
    }

    fn split(&mut self, q: usize) {
        let bounds = self.quads[q].bounds;
        let depth = self.quads[q].depth + 1;
        let c = bounds.center();
        let half_w = bounds.width() / 4.0;
        let half_h = bounds.height() / 4.0;

        let base = self.quads.len();
        for (dx, dy) in [(-1.0, -1.0), (1.0, -1.0), (-1.0, 1.0), (1.0, 1.0)] {
            let center = Point::new(c.x + dx * half_w, c.y + dy * half_h);
            self.quads
                .push(Quad::new(BoundingBox::from_center_half_size(center, half_w, half_h), depth));
        }
        let children = [base, base + 1, base + 2, base + 3];
        self.quads[q].children = Some(children);

        let bodies = std::mem::take(&mut self.quads[q].bodies);
        for body in bodies {
            let child = children[self.quads[q].quadrant(self.positions[body])];
            self.quads[child].bodies.push(body);
        }
    }

    /// Bottom-up mass and center of mass
    fn accumulate(&mut self, q: usize) {
        let (mass, weighted) = match self.quads[q].children {
            Some(children) => {
                let mut mass = 0.0;
                let mut weighted = Point::ZERO;
                for child in children {
                    self.accumulate(child);
                    let c = &self.quads[child];
                    mass += c.mass;
                    weighted += c.center_of_mass * c.mass;
                }
                (mass, weighted)
            }
            None => {
                let quad = &self.quads[q];
                let weighted = quad
                    .bodies
                    .iter()
                    .fold(Point::ZERO, |acc, &b| acc + self.positions[b]);
                (quad.bodies.len() as f64, weighted)
            }
        };
        let quad = &mut self.quads[q];
        quad.mass = mass;
        quad.center_of_mass = if mass > 0.0 {
            weighted * (1.0 / mass)
        } else {
            quad.bounds.center()
        };
    }

    /// Repulsive velocity delta on `body`, scaled by `strength` (d3 style,
    /// magnitude ∝ strength / distance).
    pub fn repulsion(&self, body: usize, strength: f64) -> Point {
        let Some(&pos) = self.positions.get(body) else {
            return Point::ZERO;
        };
        if !pos.is_finite() || self.is_empty() {
            return Point::ZERO;
        }

        let theta2 = self.theta * self.theta;
        let mut force = Point::ZERO;
        let mut stack = vec![0usize];

        while let Some(q) = stack.pop() {
            let quad = &self.quads[q];
            if quad.mass == 0.0 {
                continue;
            }

            match quad.children {
                Some(children) => {
                    let d = quad.center_of_mass - pos;
                    let w = quad.bounds.width();
                    if w * w / theta2 < d.length_sq() {
                        force += push(d, strength * quad.mass);
                    } else {
                        stack.extend(children);
                    }
                }
                None => {
                    for &other in &quad.bodies {
                        if other == body {
                            continue;
                        }
                        let mut d = self.positions[other] - pos;
                        if d.length_sq() == 0.0 {
                            d = jiggle(body, other);
                        }
                        force += push(d, strength);
                    }
                }
            }
        }
        force
    }
}

/// Velocity delta away from an attractor at offset `d`
fn push(d: Point, strength: f64) -> Point {
    let mut l2 = d.length_sq();
    if l2 < MIN_DISTANCE * MIN_DISTANCE {
        l2 = (MIN_DISTANCE * MIN_DISTANCE * l2).sqrt().max(EPSILON * EPSILON);
    }
    d * (-strength / l2)
}

/// Deterministic tiny offset separating coincident bodies
pub(crate) fn jiggle(a: usize, b: usize) -> Point {
    // Golden-angle spread keyed on the ordered pair, antisymmetric in (a, b)
    let (lo, hi, sign) = if a < b { (a, b, 1.0) } else { (b, a, -1.0) };
    let angle = ((lo * 31 + hi) as f64) * 2.399_963_229_728_653;
    Point::new(angle.cos(), angle.sin()) * (EPSILON * sign)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// O(n²) reference for the same force law
    fn brute_force(positions: &[Point], body: usize, strength: f64) -> Point {
        positions
            .iter()
            .enumerate()
            .filter(|&(j, _)| j != body)
            .fold(Point::ZERO, |acc, (_, &p)| acc + push(p - positions[body], strength))
    }

    fn grid(n: usize) -> Vec<Point> {
        (0..n)
            .map(|i| Point::new((i % 7) as f64 * 37.0, (i / 7) as f64 * 23.0 + (i % 3) as f64))
            .collect()
    }

    #[test]
    fn test_mass_counts_bodies() {
        let tree = BarnesHutTree::build(&grid(30), 0.9);
        assert_eq!(tree.len(), 30);
        assert!(BarnesHutTree::build(&[], 0.9).is_empty());
    }

    #[test]
    fn test_exact_when_theta_zero() {
        let positions = grid(20);
        let tree = BarnesHutTree::build(&positions, 0.0);
        for body in [0, 7, 19] {
            let exact = brute_force(&positions, body, 100.0);
            let approx = tree.repulsion(body, 100.0);
            assert!(exact.distance(approx) < 1e-9, "body {body}");
        }
    }

    #[test]
    fn test_approximation_close_to_exact() {
        let positions = grid(60);
        let tree = BarnesHutTree::build(&positions, 0.9);
        let exact = brute_force(&positions, 3, 100.0);
        let approx = tree.repulsion(3, 100.0);
        assert!(exact.distance(approx) < exact.length() * 0.3);
    }

    #[test]
    fn test_two_bodies_push_apart() {
        let positions = vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)];
        let tree = BarnesHutTree::build(&positions, 0.9);
        assert!(tree.repulsion(0, 50.0).x < 0.0);
        assert!(tree.repulsion(1, 50.0).x > 0.0);
    }

    #[test]
    fn test_coincident_bodies_separate() {
        let positions = vec![Point::new(5.0, 5.0); 3];
        let tree = BarnesHutTree::build(&positions, 0.9);
        for body in 0..3 {
            let f = tree.repulsion(body, 10.0);
            assert!(f.is_finite());
            assert!(f.length() > 0.0);
        }
        // Opposite directions for a coincident pair
        let a = push(jiggle(0, 1), 1.0);
        let b = push(jiggle(1, 0), 1.0);
        assert!((a + b).length() < 1e-9);
    }
}
