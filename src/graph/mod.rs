//! Hypergraph view: building, layout, and the viewport it lives in
//!
//! Pure compute; no rendering. A rendering adapter reads
//! [`LayoutEngine::positions`] and [`LayoutEngine::link_segments`] each frame.

pub mod animation;
pub mod builder;
pub mod camera;
pub mod force_sim;
pub mod quadtree;
pub mod spatial;
pub mod types;
pub mod viewport_fit;

pub use animation::{ease_cubic_in_out, ViewAnimation};
pub use builder::{
    wrap_label, BuildConfig, ContextRecord, FactRef, GraphBuildError, GraphEngine, Hyperedge,
    Hyperstructure, StateEvent, TemporalInterval,
};
pub use camera::{Viewport, ViewportConfig, ViewportTransform};
pub use force_sim::{ForceConfig, LayoutEngine};
pub use quadtree::BarnesHutTree;
pub use spatial::{IndexedNode, NodeIndex};
pub use types::{
    radius_for_label, GraphData, GraphLink, GraphNode, LinkRole, LinkSegment, LinkStyle, NodeKind,
    PositionUpdate, Silhouette, MAX_NODE_RADIUS, MIN_NODE_RADIUS,
};
pub use viewport_fit::{compute_fit, content_bounds};
