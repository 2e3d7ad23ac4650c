//! Node index for pointer hit testing
//!
//! R-tree (via `rstar`) over node silhouette boxes. Candidates from the tree
//! are confirmed against the real silhouette, so a click in the corner of a
//! diamond's box does not pick the relation.

use super::types::{GraphNode, Silhouette};
use crate::geometry::Point;
use rstar::{PointDistance, RTree, RTreeObject, AABB};

/// Index entry for one node
#[derive(Debug, Clone)]
pub struct IndexedNode {
    pub id: String,
    pub center: [f64; 2],
    pub radius: f64,
    pub silhouette: Silhouette,
    bounds: AABB<[f64; 2]>,
}

impl IndexedNode {
    pub fn new(id: impl Into<String>, center: Point, radius: f64, silhouette: Silhouette) -> Self {
        Self {
            id: id.into(),
            center: [center.x, center.y],
            radius,
            silhouette,
            bounds: AABB::from_corners(
                [center.x - radius, center.y - radius],
                [center.x + radius, center.y + radius],
            ),
        }
    }

    pub fn from_node(node: &GraphNode) -> Self {
        Self::new(node.id.clone(), node.position, node.radius, node.silhouette())
    }

    fn offset(&self, point: &[f64; 2]) -> Point {
        Point::new(point[0] - self.center[0], point[1] - self.center[1])
    }

    /// Distance from `point` to the center
    fn center_distance(&self, point: &[f64; 2]) -> f64 {
        self.offset(point).length()
    }
}

impl RTreeObject for IndexedNode {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.bounds
    }
}

impl PointDistance for IndexedNode {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let to_edge = (self.center_distance(point) - self.radius).max(0.0);
        to_edge * to_edge
    }

    fn contains_point(&self, point: &[f64; 2]) -> bool {
        self.silhouette.contains(self.offset(point), self.radius)
    }
}

/// Hit-testing index, rebuilt from node positions when marked dirty
#[derive(Clone, Default)]
pub struct NodeIndex {
    tree: RTree<IndexedNode>,
    dirty: bool,
}

impl std::fmt::Debug for NodeIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeIndex")
            .field("count", &self.tree.size())
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}

impl NodeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_nodes<'a>(nodes: impl IntoIterator<Item = &'a GraphNode>) -> Self {
        let mut index = Self::new();
        index.rebuild(nodes);
        index
    }

    /// Bulk-load from current positions; nodes at non-finite positions are left out
    pub fn rebuild<'a>(&mut self, nodes: impl IntoIterator<Item = &'a GraphNode>) {
        let entries: Vec<_> = nodes
            .into_iter()
            .filter(|n| n.position.is_finite())
            .map(IndexedNode::from_node)
            .collect();
        self.tree = RTree::bulk_load(entries);
        self.dirty = false;
    }

    pub fn clear(&mut self) {
        self.tree = RTree::new();
        self.dirty = false;
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Node whose silhouette contains `point`. Overlaps resolve to the
    /// nearest center.
    pub fn hit_test(&self, point: Point) -> Option<&IndexedNode> {
        let p = [point.x, point.y];
        self.tree
            .locate_all_at_point(&p)
            .min_by(|a, b| a.center_distance(&p).total_cmp(&b.center_distance(&p)))
    }

    /// Nodes whose boxes intersect the rectangle
    pub fn query_rect(&self, min: Point, max: Point) -> Vec<&IndexedNode> {
        let bounds = AABB::from_corners([min.x, min.y], [max.x, max.y]);
        self.tree.locate_in_envelope_intersecting(&bounds).collect()
    }

    /// Nearest node by distance to its silhouette edge
    pub fn nearest(&self, point: Point) -> Option<&IndexedNode> {
        self.tree.nearest_neighbor(&[point.x, point.y])
    }
}
