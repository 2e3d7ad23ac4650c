//! Eased tween between two viewport transforms
//!
//! Fixed-duration interpolation used for non-initial auto-fits. No callbacks:
//! call `tick(dt)` once per frame and read the transform it returns.

use super::camera::Viewport;

/// Cubic in-out easing on `t ∈ [0, 1]`
pub fn ease_cubic_in_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        let u = -2.0 * t + 2.0;
        1.0 - u * u * u / 2.0
    }
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// In-flight viewport transition
#[derive(Debug, Clone, PartialEq)]
pub struct ViewAnimation {
    from: Viewport,
    to: Viewport,
    /// Seconds since start
    elapsed: f64,
    /// Total seconds
    duration: f64,
}

impl ViewAnimation {
    pub fn new(from: Viewport, to: Viewport, duration_secs: f64) -> Self {
        Self {
            from,
            to,
            elapsed: 0.0,
            duration: duration_secs.max(0.0),
        }
    }

    pub fn target(&self) -> Viewport {
        self.to
    }

    /// Progress in `[0, 1]`
    pub fn progress(&self) -> f64 {
        if self.duration <= 0.0 {
            1.0
        } else {
            (self.elapsed / self.duration).min(1.0)
        }
    }

    pub fn is_finished(&self) -> bool {
        self.progress() >= 1.0
    }

    /// Transform at the current progress
    pub fn current(&self) -> Viewport {
        if self.is_finished() {
            return self.to;
        }
        let t = ease_cubic_in_out(self.progress());
        Viewport {
            translate_x: lerp(self.from.translate_x, self.to.translate_x, t),
            translate_y: lerp(self.from.translate_y, self.to.translate_y, t),
            scale: lerp(self.from.scale, self.to.scale, t),
        }
    }

    /// Advance by `dt` seconds and return the new transform
    pub fn tick(&mut self, dt: f64) -> Viewport {
        if dt.is_finite() && dt > 0.0 {
            self.elapsed += dt;
        }
        self.current()
    }
}
