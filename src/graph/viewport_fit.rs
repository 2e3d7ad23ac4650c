//! Auto-fit: the transform that frames every node silhouette

use super::camera::{Viewport, ViewportConfig};
use super::types::GraphNode;
use crate::geometry::{BoundingBox, Point};

/// Union of node silhouette boxes, grown by `padding`.
///
/// `None` for an empty node set or when any position is non-finite.
pub fn content_bounds(nodes: &[GraphNode], padding: f64) -> Option<BoundingBox> {
    let mut bounds: Option<BoundingBox> = None;
    for node in nodes {
        if !node.position.is_finite() {
            return None;
        }
        // Both silhouettes are bounded by center ± radius
        let b = BoundingBox::from_center_half_size(node.position, node.radius, node.radius);
        bounds = Some(match bounds {
            Some(acc) => acc.union(b),
            None => b,
        });
    }
    bounds.map(|b| b.expand(padding))
}

/// Transform that centers `bounds` in a `width × height` view.
///
/// `scale = clamp(min(w / cw, h / ch) · fit_ratio, min_scale, max_scale)`
pub fn compute_fit(
    bounds: &BoundingBox,
    width: f64,
    height: f64,
    config: &ViewportConfig,
) -> Option<Viewport> {
    let (cw, ch) = (bounds.width(), bounds.height());
    if cw <= 0.0 || ch <= 0.0 || width <= 0.0 || height <= 0.0 {
        return None;
    }

    let scale = config.clamp_scale((width / cw).min(height / ch) * config.fit_ratio);
    let Point { x: cx, y: cy } = bounds.center();

    Some(Viewport {
        translate_x: width / 2.0 - cx * scale,
        translate_y: height / 2.0 - cy * scale,
        scale,
    })
}
