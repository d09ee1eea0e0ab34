use glam::Mat4;
use serde::{Deserialize, Serialize};

/// Perspective projection parameters. The aspect ratio is not stored; it comes
/// from the framebuffer size each frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Projection {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            fov_degrees: 90.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl Projection {
    /// Projection for a framebuffer of `width` x `height`. A zero dimension
    /// (minimised window) is treated as 1.
    pub fn matrix(&self, width: u32, height: u32) -> Mat4 {
        Mat4::perspective_rh(
            self.fov_degrees.to_radians(),
            aspect_ratio(width, height),
            self.near,
            self.far,
        )
    }
}

pub fn aspect_ratio(width: u32, height: u32) -> f32 {
    width.max(1) as f32 / height.max(1) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aspect_of(m: Mat4) -> f32 {
        m.col(1).y / m.col(0).x
    }

    #[test]
    fn aspect_follows_framebuffer() {
        let p = Projection::default();
        assert!((aspect_of(p.matrix(1600, 900)) - 16.0 / 9.0).abs() < 1e-5);
        assert!((aspect_of(p.matrix(300, 600)) - 0.5).abs() < 1e-5);
    }

    #[test]
    fn zero_height_does_not_produce_nan() {
        let m = Projection::default().matrix(800, 0);
        assert!(!m.is_nan());
        assert_eq!(aspect_ratio(800, 0), 800.0);
    }

    #[test]
    fn ninety_degree_fov_has_unit_focal_length() {
        let m = Projection::default().matrix(100, 100);
        assert!((m.col(1).y - 1.0).abs() < 1e-5);
    }
}
