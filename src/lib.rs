//! Knowledge-hypergraph canvas core
//!
//! This crate contains ONLY the numeric core of the explorer - no HTTP, no
//! renderer, no app shell. Rendering adapters consume the positions, link
//! segments and filtered feature lists produced here.
//!
//! ```text
//! Hyperstructure (from backend)          SpatialFeature dataset
//!        │                                        │
//!        ▼                                        ▼
//! GraphEngine (builder)             DrawingStateMachine ──► SpatialSelection
//!        │                                                        │
//!        ▼                                                        ▼
//! LayoutEngine ◄── ViewportTransform               geometry::kernel
//!        │
//!        ▼
//! (id, x, y) updates + anchored link segments
//! ```

pub mod config;
pub mod geometry;
pub mod graph;

pub use config::{global_config, ConfigError, KhConfig};
pub use geometry::{
    decode_features, features_from_spatial_hyperedges, filter_features, BoundingBox,
    ContainmentMode, DrawEvent, DrawingConfig, DrawingState, DrawingStateMachine, FeatureError,
    FeatureKind, Geometry, Point, ScreenProjection, SpatialFeature, SpatialSelection,
};
pub use graph::{
    ForceConfig, GraphData, GraphEngine, GraphLink, GraphNode, Hyperstructure, LayoutEngine,
    LinkSegment, NodeKind, PositionUpdate, Silhouette, Viewport, ViewportConfig,
    ViewportTransform,
};
