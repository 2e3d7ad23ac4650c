//! Force simulation for the hypergraph view
//!
//! Tick-driven particle layout, d3-style:
//! - Link springs with degree bias
//! - Many-body repulsion (Barnes-Hut)
//! - Centering toward the visible rect
//! - Collision between silhouettes
//! - Boundary containment (quadratic push inside a margin band)
//!
//! Each tick accumulates every force into a buffer before any position moves,
//! then commits velocities, then hard-clamps every silhouette into the
//! visible rect. Soft forces are scaled by `alpha`, which cools
//! geometrically toward `alpha_target`.
//!
//! # Usage
//! ```ignore
//! let mut layout = LayoutEngine::new(ForceConfig::default());
//! layout.sync(engine.data().clone());
//!
//! // Each frame:
//! viewport.update(dt);
//! layout.tick(&viewport);
//! for update in layout.positions() { /* move the node */ }
//! ```

use super::camera::ViewportTransform;
use super::quadtree::{jiggle, BarnesHutTree};
use super::spatial::NodeIndex;
use super::types::{GraphData, GraphLink, GraphNode, LinkSegment, PositionUpdate};
use crate::geometry::{BoundingBox, Point, EPSILON};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

// =============================================================================
// SIMULATION CONFIG
// =============================================================================

/// Force constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForceConfig {
    /// Rest length of link springs
    pub link_distance: f64,
    /// Spring strength before the degree bias is applied
    pub link_strength: f64,
    /// Many-body repulsion strength
    pub repulsion: f64,
    /// Barnes-Hut opening angle
    pub theta: f64,
    /// Pull toward the center of the visible rect
    pub center_strength: f64,
    /// Extra gap kept between silhouettes
    pub collision_padding: f64,
    /// Fraction of an overlap resolved per tick
    pub collision_strength: f64,
    /// Width of the band along the visible edge where the boundary force acts
    pub boundary_margin: f64,
    pub boundary_strength: f64,
    /// Fraction of velocity lost per tick
    pub velocity_decay: f64,
    pub max_velocity: f64,
    pub alpha_decay: f64,
    pub alpha_min: f64,
    /// Alpha held while a node is dragged
    pub drag_alpha_target: f64,
}

impl Default for ForceConfig {
    fn default() -> Self {
        Self {
            link_distance: 120.0,
            link_strength: 0.3,
            repulsion: 300.0,
            theta: 0.9,
            center_strength: 0.05,
            collision_padding: 4.0,
            collision_strength: 0.7,
            boundary_margin: 40.0,
            boundary_strength: 0.15,
            velocity_decay: 0.4,
            max_velocity: 50.0,
            alpha_decay: 0.0228,
            alpha_min: 0.001,
            drag_alpha_target: 0.3,
        }
    }
}

/// Resolved link: arena indices plus precomputed degree bias
#[derive(Debug, Clone, Copy)]
struct Spring {
    source: usize,
    target: usize,
    /// Share of the correction applied to the target
    bias: f64,
    strength: f64,
}

/// What a rebuild is compared by: node-id sequence and link endpoints
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Signature {
    nodes: Vec<String>,
    links: Vec<(String, String)>,
}

impl Signature {
    fn of(data: &GraphData) -> Self {
        Self {
            nodes: data.nodes.iter().map(|n| n.id.clone()).collect(),
            links: data
                .links
                .iter()
                .map(|l| (l.source.clone(), l.target.clone()))
                .collect(),
        }
    }
}

// =============================================================================
// LAYOUT ENGINE
// =============================================================================

/// Owns node positions, velocities and pins between rebuilds
#[derive(Debug, Clone)]
pub struct LayoutEngine {
    nodes: Vec<GraphNode>,
    links: Vec<GraphLink>,
    /// Quick lookup by ID
    node_index: HashMap<String, usize>,
    springs: Vec<Spring>,
    signature: Signature,
    pub config: ForceConfig,
    alpha: f64,
    alpha_target: f64,
    hit_index: NodeIndex,
}

impl Default for LayoutEngine {
    fn default() -> Self {
        Self::new(ForceConfig::default())
    }
}

impl LayoutEngine {
    pub fn new(config: ForceConfig) -> Self {
        Self {
            nodes: Vec::new(),
            links: Vec::new(),
            node_index: HashMap::new(),
            springs: Vec::new(),
            signature: Signature::default(),
            config,
            alpha: 1.0,
            alpha_target: 0.0,
            hit_index: NodeIndex::new(),
        }
    }

    // =========================================================================
    // GRAPH MANAGEMENT
    // =========================================================================

    /// Adopt a freshly built graph.
    ///
    /// Restarts only when the node-id sequence or link endpoints changed;
    /// otherwise labels and styles are refreshed in place and positions stay.
    /// Nodes surviving a restart keep their position and pin.
    /// Returns whether the simulation restarted.
    pub fn sync(&mut self, data: GraphData) -> bool {
        let signature = Signature::of(&data);
        if signature == self.signature {
            for (node, fresh) in self.nodes.iter_mut().zip(data.nodes) {
                node.kind = fresh.kind;
                node.radius = fresh.radius;
                node.label = fresh.label;
            }
            self.links = data.links;
            self.hit_index.mark_dirty();
            debug!(nodes = self.nodes.len(), "graph unchanged, layout kept");
            return false;
        }

        let previous: HashMap<String, GraphNode> = self
            .nodes
            .drain(..)
            .map(|n| (n.id.clone(), n))
            .collect();

        self.nodes = data
            .nodes
            .into_iter()
            .map(|mut node| {
                if let Some(old) = previous.get(&node.id) {
                    node.position = old.position;
                    node.velocity = old.velocity;
                    node.pin = old.pin;
                }
                if !node.position.is_finite() {
                    node.position = Point::ZERO;
                }
                node
            })
            .collect();
        self.links = data.links;
        self.node_index = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.clone(), i))
            .collect();
        self.springs = self.resolve_springs();
        self.signature = signature;
        self.hit_index.mark_dirty();
        // A held node may not have survived the rebuild
        if self.nodes.iter().all(|n| n.pin.is_none()) {
            self.alpha_target = 0.0;
        }
        self.reheat();

        info!(
            nodes = self.nodes.len(),
            links = self.links.len(),
            springs = self.springs.len(),
            "layout restarted"
        );
        true
    }

    /// Links resolved through the id index. Links to unknown ids and
    /// self-links are dropped.
    fn resolve_springs(&self) -> Vec<Spring> {
        let resolved: Vec<(usize, usize)> = self
            .links
            .iter()
            .filter_map(|l| {
                let s = *self.node_index.get(&l.source)?;
                let t = *self.node_index.get(&l.target)?;
                (s != t).then_some((s, t))
            })
            .collect();

        let mut degree = vec![0usize; self.nodes.len()];
        for &(s, t) in &resolved {
            degree[s] += 1;
            degree[t] += 1;
        }

        resolved
            .into_iter()
            .map(|(s, t)| {
                let (ds, dt) = (degree[s] as f64, degree[t] as f64);
                Spring {
                    source: s,
                    target: t,
                    bias: ds / (ds + dt),
                    strength: self.config.link_strength / ds.min(dt),
                }
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.links.clear();
        self.node_index.clear();
        self.springs.clear();
        self.signature = Signature::default();
        self.hit_index.clear();
        self.alpha = 1.0;
        self.alpha_target = 0.0;
    }

    pub fn get_node(&self, id: &str) -> Option<&GraphNode> {
        self.node_index.get(id).map(|&idx| &self.nodes[idx])
    }

    fn get_node_mut(&mut self, id: &str) -> Option<&mut GraphNode> {
        self.node_index
            .get(id)
            .copied()
            .map(|idx| &mut self.nodes[idx])
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn links(&self) -> &[GraphLink] {
        &self.links
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // =========================================================================
    // COOLING
    // =========================================================================

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Restore full energy
    pub fn reheat(&mut self) {
        self.alpha = 1.0;
    }

    /// Cooled below `alpha_min` with nothing held
    pub fn is_settled(&self) -> bool {
        self.alpha < self.config.alpha_min && self.alpha_target < self.config.alpha_min
    }

    // =========================================================================
    // SIMULATION
    // =========================================================================

    /// Run one step inside the viewport's visible rect
    pub fn tick(&mut self, viewport: &ViewportTransform) {
        if self.nodes.is_empty() {
            return;
        }
        let rect = viewport.visible_rect();

        self.alpha += (self.alpha_target - self.alpha) * self.config.alpha_decay;

        if !self.is_settled() {
            let forces = self.accumulate_forces(&rect);
            self.commit(&forces);
        }
        self.clamp_to(&rect);
        self.hit_index.mark_dirty();
    }

    /// Sum of all forces per node. Reads positions only.
    fn accumulate_forces(&self, rect: &BoundingBox) -> Vec<Point> {
        let n = self.nodes.len();
        let alpha = self.alpha;
        let cfg = &self.config;
        let mut forces = vec![Point::ZERO; n];

        // Link springs
        for spring in &self.springs {
            let s = &self.nodes[spring.source];
            let t = &self.nodes[spring.target];
            let mut d = t.position - s.position;
            if d.length_sq() == 0.0 {
                d = jiggle(spring.source, spring.target);
            }
            let l = d.length();
            let delta = d * ((l - cfg.link_distance) / l * alpha * spring.strength);
            forces[spring.target] -= delta * spring.bias;
            forces[spring.source] += delta * (1.0 - spring.bias);
        }

        // Many-body
        let positions: Vec<Point> = self.nodes.iter().map(|n| n.position).collect();
        let tree = BarnesHutTree::build(&positions, cfg.theta);
        for (i, force) in forces.iter_mut().enumerate() {
            *force += tree.repulsion(i, cfg.repulsion * alpha);
        }

        // Centering
        let center = rect.center();
        for (force, node) in forces.iter_mut().zip(&self.nodes) {
            *force += (center - node.position) * (cfg.center_strength * alpha);
        }

        // Collision
        for i in 0..n {
            for j in (i + 1)..n {
                let (a, b) = (&self.nodes[i], &self.nodes[j]);
                let min_gap = a.radius + b.radius + cfg.collision_padding;
                let mut d = b.position - a.position;
                if d.length_sq() >= min_gap * min_gap {
                    continue;
                }
                if d.length_sq() == 0.0 {
                    d = jiggle(i, j);
                }
                let l = d.length();
                let push = d * ((min_gap - l) / l * cfg.collision_strength * 0.5);
                forces[i] -= push;
                forces[j] += push;
            }
        }

        // Boundary band
        let margin = cfg.boundary_margin.max(EPSILON);
        for (force, node) in forces.iter_mut().zip(&self.nodes) {
            *force += boundary_push(node, rect, margin) * (cfg.boundary_strength * alpha);
        }

        forces
    }

    /// Integrate velocities; pinned nodes follow their pin
    fn commit(&mut self, forces: &[Point]) {
        let keep = 1.0 - self.config.velocity_decay;
        let max_v = self.config.max_velocity;

        for (node, &force) in self.nodes.iter_mut().zip(forces) {
            if let Some(pin) = node.pin {
                node.position = pin;
                node.velocity = Point::ZERO;
                continue;
            }

            let mut v = (node.velocity + force) * keep;
            let speed = v.length();
            if speed > max_v {
                v = v * (max_v / speed);
            }
            if !v.is_finite() {
                v = Point::ZERO;
            }
            node.velocity = v;
            node.position += v;
        }
    }

    /// Snap every silhouette back inside `rect`, zeroing the velocity
    /// component that pushed it out. Pins are clamped too.
    fn clamp_to(&mut self, rect: &BoundingBox) {
        for node in &mut self.nodes {
            if let Some(pin) = node.pin {
                node.position = pin;
            }

            let r = node.radius;
            let (x, clamped_x) = clamp_axis(node.position.x, rect.min.x + r, rect.max.x - r);
            let (y, clamped_y) = clamp_axis(node.position.y, rect.min.y + r, rect.max.y - r);
            node.position = Point::new(x, y);
            if clamped_x {
                node.velocity.x = 0.0;
            }
            if clamped_y {
                node.velocity.y = 0.0;
            }
            if node.pin.is_some() {
                node.pin = Some(node.position);
            }
        }
    }

    // =========================================================================
    // PINNING (for drag)
    // =========================================================================

    /// Hold a node at `at` and keep the simulation warm
    pub fn pin(&mut self, id: &str, at: Point) -> bool {
        if !at.is_finite() {
            return false;
        }
        let Some(node) = self.get_node_mut(id) else {
            return false;
        };
        node.pin = Some(at);
        node.velocity = Point::ZERO;
        self.alpha_target = self.config.drag_alpha_target;
        true
    }

    /// Move a held node
    pub fn drag_to(&mut self, id: &str, at: Point) -> bool {
        if !at.is_finite() {
            return false;
        }
        match self.get_node_mut(id) {
            Some(node) if node.pin.is_some() => {
                node.pin = Some(at);
                true
            }
            _ => false,
        }
    }

    /// Return a node to free motion with zero velocity
    pub fn release(&mut self, id: &str) -> bool {
        let Some(node) = self.get_node_mut(id) else {
            return false;
        };
        if node.pin.take().is_none() {
            return false;
        }
        node.velocity = Point::ZERO;
        if self.nodes.iter().all(|n| n.pin.is_none()) {
            self.alpha_target = 0.0;
        }
        true
    }

    // =========================================================================
    // OUTPUT
    // =========================================================================

    /// Current `(id, x, y)` for every node
    pub fn positions(&self) -> Vec<PositionUpdate> {
        self.nodes
            .iter()
            .map(|n| PositionUpdate {
                id: n.id.clone(),
                x: n.position.x,
                y: n.position.y,
            })
            .collect()
    }

    /// Links anchored on both endpoint silhouettes
    pub fn link_segments(&self) -> Vec<LinkSegment> {
        self.links
            .iter()
            .filter_map(|link| {
                let s = self.get_node(&link.source)?;
                let t = self.get_node(&link.target)?;
                Some(LinkSegment {
                    source: link.source.clone(),
                    target: link.target.clone(),
                    from: s.boundary_point(t.position),
                    to: t.boundary_point(s.position),
                    directed: link.directed,
                    style: link.style.clone(),
                })
            })
            .collect()
    }

    // =========================================================================
    // HIT TESTING
    // =========================================================================

    /// Node under a world-space point (for drag start)
    pub fn node_at(&mut self, world: Point) -> Option<&GraphNode> {
        if self.hit_index.is_dirty() {
            self.hit_index.rebuild(&self.nodes);
        }
        let id = self.hit_index.hit_test(world)?.id.clone();
        self.get_node(&id)
    }
}

/// Inward push for a node inside the margin band, quadratic in depth
fn boundary_push(node: &GraphNode, rect: &BoundingBox, margin: f64) -> Point {
    let r = node.radius;
    let p = node.position;
    let band = |depth: f64| {
        let t = (depth / margin).clamp(0.0, 1.0);
        t * t * margin
    };

    Point::new(
        band(rect.min.x + r + margin - p.x) - band(p.x - (rect.max.x - r - margin)),
        band(rect.min.y + r + margin - p.y) - band(p.y - (rect.max.y - r - margin)),
    )
}

/// Clamp into `[lo, hi]`; a range narrower than zero collapses to its middle
fn clamp_axis(v: f64, lo: f64, hi: f64) -> (f64, bool) {
    if lo > hi {
        return ((lo + hi) / 2.0, true);
    }
    if !v.is_finite() {
        return ((lo + hi) / 2.0, true);
    }
    if v < lo {
        (lo, true)
    } else if v > hi {
        (hi, true)
    } else {
        (v, false)
    }
}

// =============================================================================
// TESTS
// =============================================================================
