//! Interactive polygon drawing
//!
//! `Idle → Drawing → Closed → Idle`. Clicks while drawing append world-space
//! vertices. The ring closes on a double-click, or on a click that lands
//! within `close_radius_px` screen pixels of the first vertex; both need at
//! least three vertices. Closing hands the ring to the owned
//! [`SpatialSelection`]; the ring stays as an overlay so mode toggles can
//! re-filter without redrawing.

use super::feature::SpatialFeature;
use super::selection::{validate_polygon, ContainmentMode, SpatialSelection};
use super::Point;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Maps world coordinates to screen pixels.
///
/// Close detection is measured in pixels, so it has to follow the current
/// pan/zoom (or map projection) rather than the world distance.
pub trait ScreenProjection {
    fn to_screen(&self, world: Point) -> Point;
}

/// Drawing settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawingConfig {
    /// Pixel radius around the first vertex that closes the ring
    pub close_radius_px: f64,
    /// Vertices required before the ring may close
    pub min_vertices: usize,
}

impl Default for DrawingConfig {
    fn default() -> Self {
        Self {
            close_radius_px: 10.0,
            min_vertices: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawingState {
    #[default]
    Idle,
    Drawing,
    Closed,
}

/// Outcome of feeding one input event to the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawEvent {
    /// Event has no meaning in the current state
    Ignored,
    Started,
    VertexAdded { count: usize },
    /// Ring finalized and applied; `selected` features remain visible
    Closed { vertices: usize, selected: usize },
    /// Drawing abandoned, previous selection untouched
    Cancelled,
    /// Ring discarded and baseline restored
    Cleared,
}

/// Click-to-polygon state machine driving a [`SpatialSelection`]
#[derive(Debug, Clone, Default)]
pub struct DrawingStateMachine {
    state: DrawingState,
    /// Vertices in world space; frozen once closed
    vertices: Vec<Point>,
    config: DrawingConfig,
    selection: SpatialSelection,
}

impl DrawingStateMachine {
    pub fn new(config: DrawingConfig, mode: ContainmentMode) -> Self {
        Self {
            state: DrawingState::Idle,
            vertices: Vec::new(),
            config,
            selection: SpatialSelection::new(mode),
        }
    }

    pub fn state(&self) -> DrawingState {
        self.state
    }

    /// Vertices collected so far (the overlay ring once closed)
    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    /// The finalized ring, only while `Closed`
    pub fn closed_ring(&self) -> Option<&[Point]> {
        (self.state == DrawingState::Closed).then_some(self.vertices.as_slice())
    }

    pub fn selection(&self) -> &SpatialSelection {
        &self.selection
    }

    /// Features currently visible (filtered set or baseline)
    pub fn visible_features(&self) -> &[SpatialFeature] {
        self.selection.current()
    }

    /// New unfiltered dataset; an active ring is re-applied to it
    pub fn set_baseline(&mut self, features: Vec<SpatialFeature>) {
        self.selection.set_baseline(features);
    }

    /// Toggle containment mode, re-filtering the baseline with the kept ring
    pub fn set_mode(&mut self, mode: ContainmentMode) {
        self.selection.set_mode(mode);
    }

    /// Enter drawing mode with an empty ring. An earlier selection stays
    /// visible until the new ring closes or is cancelled.
    pub fn start(&mut self) -> DrawEvent {
        self.vertices.clear();
        self.state = DrawingState::Drawing;
        debug!("polygon drawing started");
        DrawEvent::Started
    }

    /// Single click at `world`
    pub fn click(&mut self, world: Point, projection: &dyn ScreenProjection) -> DrawEvent {
        if self.state != DrawingState::Drawing || !world.is_finite() {
            return DrawEvent::Ignored;
        }

        if self.vertices.len() >= self.config.min_vertices {
            let first = projection.to_screen(self.vertices[0]);
            let here = projection.to_screen(world);
            if first.distance(here) <= self.config.close_radius_px {
                return self.close();
            }
        }

        self.vertices.push(world);
        DrawEvent::VertexAdded {
            count: self.vertices.len(),
        }
    }

    /// Double click. The preceding single clicks have already appended the
    /// double-click location, so repeated trailing vertices are collapsed
    /// before the vertex count is checked.
    pub fn double_click(&mut self) -> DrawEvent {
        if self.state != DrawingState::Drawing {
            return DrawEvent::Ignored;
        }
        self.vertices.dedup();
        if self.vertices.len() < self.config.min_vertices {
            return DrawEvent::Ignored;
        }
        self.close()
    }

    /// Leave drawing mode without closing. The partial ring is dropped and
    /// an earlier selection comes back with its overlay.
    pub fn cancel(&mut self) -> DrawEvent {
        if self.state != DrawingState::Drawing {
            return DrawEvent::Ignored;
        }
        match self.selection.polygon() {
            Some(ring) => {
                self.vertices = ring.to_vec();
                self.state = DrawingState::Closed;
            }
            None => {
                self.vertices.clear();
                self.state = DrawingState::Idle;
            }
        }
        DrawEvent::Cancelled
    }

    /// Discard the ring and restore the baseline
    pub fn clear(&mut self) -> DrawEvent {
        self.vertices.clear();
        self.selection.clear();
        self.state = DrawingState::Idle;
        debug!("polygon selection cleared");
        DrawEvent::Cleared
    }

    fn close(&mut self) -> DrawEvent {
        if validate_polygon(&self.vertices).is_none() {
            return DrawEvent::Ignored;
        }
        self.state = DrawingState::Closed;
        self.selection.apply_polygon(&self.vertices);
        let selected = self.selection.current().len();
        info!(
            vertices = self.vertices.len(),
            selected,
            mode = self.selection.mode().as_str(),
            "polygon closed"
        );
        DrawEvent::Closed {
            vertices: self.vertices.len(),
            selected,
        }
    }
}
