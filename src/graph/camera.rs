//! ViewportTransform - pan/zoom with eased auto-fit
//!
//! `screen = world · scale + translate`. The scale is always clamped to
//! `[min_scale, max_scale]`.
//!
//! - Call `update(dt)` at the start of a frame to advance an in-flight fit
//! - Read `visible_rect()` for the world region the layout must stay inside
//! - Manual pan/zoom cancels a running fit animation
//!
//! # Auto-fit
//! The first `auto_fit` after construction (or `reset`) snaps immediately;
//! later fits tween over `fit_duration_ms`.

use super::animation::ViewAnimation;
use super::types::GraphNode;
use super::viewport_fit::{compute_fit, content_bounds};
use crate::geometry::{BoundingBox, Point, ScreenProjection};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Pan/zoom state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub translate_x: f64,
    pub translate_y: f64,
    pub scale: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            translate_x: 0.0,
            translate_y: 0.0,
            scale: 1.0,
        }
    }
}

impl Viewport {
    /// World → screen
    pub fn apply(&self, world: Point) -> Point {
        Point::new(
            world.x * self.scale + self.translate_x,
            world.y * self.scale + self.translate_y,
        )
    }

    /// Screen → world
    pub fn invert(&self, screen: Point) -> Point {
        Point::new(
            (screen.x - self.translate_x) / self.scale,
            (screen.y - self.translate_y) / self.scale,
        )
    }
}

/// Viewport limits and auto-fit settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub min_scale: f64,
    pub max_scale: f64,
    /// World-space padding around the fitted content
    pub fit_padding: f64,
    /// Fraction of the view the content may fill
    pub fit_ratio: f64,
    pub fit_duration_ms: u64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_scale: 0.2,
            max_scale: 5.0,
            fit_padding: 50.0,
            fit_ratio: 0.95,
            fit_duration_ms: 750,
        }
    }
}

impl ViewportConfig {
    /// Reject settings that cannot describe a scale range
    pub fn validate(&self) -> Result<(), String> {
        let (lo, hi) = (self.min_scale, self.max_scale);
        if !(lo.is_finite() && hi.is_finite() && lo > 0.0 && hi > 0.0) {
            return Err(format!("scale bounds must be positive and finite, got [{lo}, {hi}]"));
        }
        if lo > hi {
            return Err(format!("min_scale {lo} exceeds max_scale {hi}"));
        }
        if !(self.fit_ratio.is_finite() && self.fit_ratio > 0.0) {
            return Err(format!("fit_ratio must be positive, got {}", self.fit_ratio));
        }
        Ok(())
    }

    /// `(min, max)` scale, usable even for unvalidated settings: inverted
    /// bounds are swapped and unusable ones fall back to the defaults.
    pub fn scale_bounds(&self) -> (f64, f64) {
        let (lo, hi) = (self.min_scale, self.max_scale);
        if lo.is_finite() && hi.is_finite() && lo > 0.0 && hi > 0.0 {
            (lo.min(hi), lo.max(hi))
        } else {
            let fallback = Self::default();
            (fallback.min_scale, fallback.max_scale)
        }
    }

    /// Clamp into [`Self::scale_bounds`]; a non-finite scale becomes 1
    /// before clamping
    pub fn clamp_scale(&self, scale: f64) -> f64 {
        let (lo, hi) = self.scale_bounds();
        if scale.is_finite() {
            scale.clamp(lo, hi)
        } else {
            1.0_f64.clamp(lo, hi)
        }
    }
}

/// Pannable/zoomable view onto simulation space
#[derive(Debug, Clone)]
pub struct ViewportTransform {
    current: Viewport,
    width: f64,
    height: f64,
    config: ViewportConfig,
    animation: Option<ViewAnimation>,
    /// Whether a fit has been applied since construction/reset
    fitted: bool,
}

impl ViewportTransform {
    pub fn new(width: f64, height: f64) -> Self {
        Self::with_config(width, height, ViewportConfig::default())
    }

    pub fn with_config(width: f64, height: f64, config: ViewportConfig) -> Self {
        Self {
            current: Viewport::default(),
            width: width.max(0.0),
            height: height.max(0.0),
            config,
            animation: None,
            fitted: false,
        }
    }

    pub fn config(&self) -> &ViewportConfig {
        &self.config
    }

    // =========================================================================
    // CURRENT VALUES
    // =========================================================================

    pub fn transform(&self) -> Viewport {
        self.current
    }

    pub fn scale(&self) -> f64 {
        self.current.scale
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// Where a running animation will end, else the current transform
    pub fn target(&self) -> Viewport {
        self.animation
            .as_ref()
            .map_or(self.current, ViewAnimation::target)
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    // =========================================================================
    // ANIMATION UPDATE
    // =========================================================================

    /// Advance an in-flight fit by `dt` seconds
    pub fn update(&mut self, dt: f64) {
        if let Some(anim) = self.animation.as_mut() {
            self.current = anim.tick(dt);
            if anim.is_finished() {
                self.animation = None;
            }
        }
    }

    // =========================================================================
    // CONTROLS
    // =========================================================================

    pub fn set_view_size(&mut self, width: f64, height: f64) {
        self.width = width.max(0.0);
        self.height = height.max(0.0);
    }

    /// Replace the transform; the scale is clamped
    pub fn set_transform(&mut self, viewport: Viewport) {
        self.animation = None;
        self.current = self.clamped(viewport);
    }

    /// Pan by a screen-space delta
    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.animation = None;
        self.current.translate_x += dx;
        self.current.translate_y += dy;
    }

    /// Zoom by `factor`, keeping the world point under `screen_pos` fixed
    pub fn zoom_at(&mut self, factor: f64, screen_pos: Point) {
        if !(factor.is_finite() && factor > 0.0) {
            return;
        }
        self.animation = None;

        let old = self.current.scale;
        let new = self.config.clamp_scale(old * factor);
        if (new - old).abs() <= f64::EPSILON {
            return;
        }

        let anchor = self.current.invert(screen_pos);
        self.current.scale = new;
        self.current.translate_x = screen_pos.x - anchor.x * new;
        self.current.translate_y = screen_pos.y - anchor.y * new;
    }

    /// Frame every node silhouette. The first fit snaps, later ones animate.
    ///
    /// Returns the target transform, or `None` when there is nothing to fit.
    pub fn auto_fit(&mut self, nodes: &[GraphNode]) -> Option<Viewport> {
        let bounds = content_bounds(nodes, self.config.fit_padding)?;
        let target = compute_fit(&bounds, self.width, self.height, &self.config)?;

        if self.fitted {
            let duration = self.config.fit_duration_ms as f64 / 1000.0;
            self.animation = Some(ViewAnimation::new(self.current, target, duration));
        } else {
            self.current = target;
            self.animation = None;
            self.fitted = true;
        }
        debug!(
            scale = target.scale,
            tx = target.translate_x,
            ty = target.translate_y,
            animated = self.animation.is_some(),
            "auto-fit"
        );
        Some(target)
    }

    /// Identity transform; the next fit snaps again
    pub fn reset(&mut self) {
        self.current = Viewport::default();
        self.animation = None;
        self.fitted = false;
    }

    fn clamped(&self, mut viewport: Viewport) -> Viewport {
        viewport.scale = self.config.clamp_scale(viewport.scale);
        viewport
    }

    // =========================================================================
    // COORDINATE TRANSFORMS
    // =========================================================================

    pub fn world_to_screen(&self, world: Point) -> Point {
        self.current.apply(world)
    }

    pub fn screen_to_world(&self, screen: Point) -> Point {
        self.current.invert(screen)
    }

    /// World-space rectangle covered by the screen
    pub fn visible_rect(&self) -> BoundingBox {
        BoundingBox::from_min_max(
            self.screen_to_world(Point::ZERO),
            self.screen_to_world(Point::new(self.width, self.height)),
        )
    }
}

impl ScreenProjection for ViewportTransform {
    fn to_screen(&self, world: Point) -> Point {
        self.world_to_screen(world)
    }
}
