//! Graph node and link types
//!
//! Nodes live in an id-indexed arena inside the layout engine; links refer to
//! nodes by id only and are resolved through that index at tick time.

use crate::geometry::{Point, EPSILON};
use serde::{Deserialize, Serialize};

/// Radius bounds for derived node size
pub const MIN_NODE_RADIUS: f64 = 30.0;
pub const MAX_NODE_RADIUS: f64 = 60.0;

/// Radius contributed by each character of the longest label line
const RADIUS_PER_CHAR: f64 = 4.0;

// =============================================================================
// NODE KIND / SILHOUETTE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Entity,
    Relation,
    Context,
    State,
}

impl NodeKind {
    /// Relations are drawn as diamonds; everything else as circles
    pub fn silhouette(self) -> Silhouette {
        match self {
            NodeKind::Relation => Silhouette::Diamond,
            NodeKind::Entity | NodeKind::Context | NodeKind::State => Silhouette::Circle,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Entity => "entity",
            NodeKind::Relation => "relation",
            NodeKind::Context => "context",
            NodeKind::State => "state",
        }
    }
}

/// Rendered outline used for anchor and boundary math
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Silhouette {
    /// L2 ball of the node radius
    Circle,
    /// L1 ball of the node radius
    Diamond,
}

impl Silhouette {
    /// Whether `offset` (relative to the center) lies inside a ball of `radius`
    pub fn contains(self, offset: Point, radius: f64) -> bool {
        match self {
            Silhouette::Circle => offset.length_sq() <= radius * radius,
            Silhouette::Diamond => offset.x.abs() + offset.y.abs() <= radius,
        }
    }
}

/// Radius from the longest label line, clamped to `[30, 60]`
pub fn radius_for_label(label: &str) -> f64 {
    let longest = label.lines().map(|l| l.chars().count()).max().unwrap_or(0);
    (longest as f64 * RADIUS_PER_CHAR).clamp(MIN_NODE_RADIUS, MAX_NODE_RADIUS)
}

// =============================================================================
// GRAPH NODE
// =============================================================================

/// A node in the hypergraph view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Unique, stable across rebuilds of the same data
    pub id: String,

    pub kind: NodeKind,

    /// Display label, `\n` separates rendered lines
    pub label: String,

    /// Current position in simulation space
    pub position: Point,

    /// Current velocity
    #[serde(skip)]
    pub(crate) velocity: Point,

    /// Position override while the node is held (e.g. dragged)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin: Option<Point>,

    /// Derived from the label
    pub radius: f64,
}

impl GraphNode {
    pub fn new(id: impl Into<String>, kind: NodeKind, label: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            id: id.into(),
            kind,
            radius: radius_for_label(&label),
            label,
            position: Point::ZERO,
            velocity: Point::ZERO,
            pin: None,
        }
    }

    /// Builder: set position
    pub fn with_position(mut self, position: Point) -> Self {
        self.position = position;
        self
    }

    pub fn silhouette(&self) -> Silhouette {
        self.kind.silhouette()
    }

    pub fn velocity(&self) -> Point {
        self.velocity
    }

    pub fn is_pinned(&self) -> bool {
        self.pin.is_some()
    }

    /// Point on the silhouette in the direction of `toward`.
    ///
    /// Circle: `center + r·unit`. Diamond: `center + s·(dx, dy)` with
    /// `s = r / (|dx| + |dy|)`, which lands on the L1 ball.
    pub fn boundary_point(&self, toward: Point) -> Point {
        let d = toward - self.position;
        let norm = match self.silhouette() {
            Silhouette::Circle => d.length(),
            Silhouette::Diamond => d.x.abs() + d.y.abs(),
        };
        self.position + d * (self.radius / norm.max(EPSILON))
    }

    /// Whether `point` falls inside the silhouette
    pub fn contains(&self, point: Point) -> bool {
        self.silhouette().contains(point - self.position, self.radius)
    }
}

// =============================================================================
// GRAPH LINK
// =============================================================================

/// Role a link plays between hyperedge parts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkRole {
    /// Subject entity → relation
    Subject,
    /// Relation → object entity
    Object,
    /// Relation → spatial/temporal context
    Context,
    /// State change → the fact it affects
    Affects,
    /// Causing fact → state change
    Cause,
}

/// Rendering attributes carried through the core untouched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkStyle {
    pub role: LinkRole,
    #[serde(default)]
    pub dashed: bool,
}

impl LinkStyle {
    pub fn solid(role: LinkRole) -> Self {
        Self {
            role,
            dashed: false,
        }
    }

    pub fn dashed(role: LinkRole) -> Self {
        Self { role, dashed: true }
    }
}

/// A link between two nodes, by id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphLink {
    pub source: String,
    pub target: String,
    pub directed: bool,
    pub style: LinkStyle,
}

impl GraphLink {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        directed: bool,
        style: LinkStyle,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            directed,
            style,
        }
    }

    pub fn endpoints(&self) -> (&str, &str) {
        (&self.source, &self.target)
    }
}

/// Built node/link lists, ready for the layout engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
}

// =============================================================================
// LAYOUT OUTPUT
// =============================================================================

/// Per-tick position update for the rendering adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub id: String,
    pub x: f64,
    pub y: f64,
}

/// Link segment anchored on both silhouettes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkSegment {
    pub source: String,
    pub target: String,
    pub from: Point,
    pub to: Point,
    pub directed: bool,
    pub style: LinkStyle,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radius_from_longest_line() {
        assert_eq!(radius_for_label("A"), MIN_NODE_RADIUS);
        assert_eq!(radius_for_label("x".repeat(40).as_str()), MAX_NODE_RADIUS);
        // longest line is 12 chars
        assert_eq!(radius_for_label("short\nconsiderable\nmid"), 48.0);
        assert_eq!(radius_for_label(""), MIN_NODE_RADIUS);
    }

    #[test]
    fn test_relation_is_diamond() {
        assert_eq!(NodeKind::Relation.silhouette(), Silhouette::Diamond);
        assert_eq!(NodeKind::Entity.silhouette(), Silhouette::Circle);
        assert_eq!(NodeKind::State.silhouette(), Silhouette::Circle);
    }

    #[test]
    fn test_circle_boundary_point() {
        let node = GraphNode::new("a", NodeKind::Entity, "a").with_position(Point::new(10.0, 10.0));
        let p = node.boundary_point(Point::new(110.0, 10.0));
        assert!((p.x - 40.0).abs() < 1e-9);
        assert!((p.y - 10.0).abs() < 1e-9);

        let diag = node.boundary_point(Point::new(20.0, 20.0));
        assert!(((diag - node.position).length() - node.radius).abs() < 1e-9);
    }

    #[test]
    fn test_diamond_boundary_point_on_l1_ball() {
        let node = GraphNode::new("r", NodeKind::Relation, "rel");
        let p = node.boundary_point(Point::new(3.0, 4.0));
        assert!((p.x.abs() + p.y.abs() - node.radius).abs() < 1e-9);
        // Along an axis the diamond reaches the full radius
        let axis = node.boundary_point(Point::new(0.0, -100.0));
        assert!((axis.y + node.radius).abs() < 1e-9);
    }

    #[test]
    fn test_boundary_point_coincident_target() {
        let node = GraphNode::new("a", NodeKind::Entity, "a").with_position(Point::new(5.0, 5.0));
        let p = node.boundary_point(Point::new(5.0, 5.0));
        assert!(p.is_finite());
        assert_eq!(p, node.position);
    }

    #[test]
    fn test_contains_respects_silhouette() {
        let diamond = GraphNode::new("r", NodeKind::Relation, "r");
        let circle = GraphNode::new("e", NodeKind::Entity, "e");
        let corner = Point::new(25.0, 15.0);
        assert!(circle.contains(corner));
        assert!(!diamond.contains(corner));
    }
}
