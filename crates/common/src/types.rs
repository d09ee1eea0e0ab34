use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// One vertex as uploaded to the GPU.
///
/// Attribute locations: 0 = position, 1 = color, 2 = texcoord, 3 = normal.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable, Serialize, Deserialize)]
pub struct Vertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
    pub texcoord: [f32; 2],
    pub normal: [f32; 3],
}

impl Vertex {
    /// Size in bytes of one vertex in a vertex buffer.
    pub const STRIDE: usize = std::mem::size_of::<Vertex>();

    pub const fn new(
        position: [f32; 3],
        color: [f32; 3],
        texcoord: [f32; 2],
        normal: [f32; 3],
    ) -> Self {
        Self {
            position,
            color,
            texcoord,
            normal,
        }
    }
}

/// Local transform of a piece of geometry.
///
/// `origin` is the pivot that rotation and scale act around; `rotation` holds
/// Euler angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub origin: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            origin: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn translate(&mut self, delta: Vec3) {
        self.position += delta;
    }

    pub fn rotate(&mut self, delta: Vec3) {
        self.rotation += delta;
    }

    pub fn scale_by(&mut self, delta: Vec3) {
        self.scale += delta;
    }

    /// Derive the model matrix:
    /// `T(origin) * Rx * Ry * Rz * T(position - origin) * S(scale)`.
    ///
    /// The rotation order is part of the visual contract and must not change.
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_translation(self.origin)
            * Mat4::from_rotation_x(self.rotation.x.to_radians())
            * Mat4::from_rotation_y(self.rotation.y.to_radians())
            * Mat4::from_rotation_z(self.rotation.z.to_radians())
            * Mat4::from_translation(self.position - self.origin)
            * Mat4::from_scale(self.scale)
    }
}

/// Camera movement direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Forward,
    Backward,
    Left,
    Right,
    Up,
    Down,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_mat_eq(a: Mat4, b: Mat4) {
        assert!(a.abs_diff_eq(b, 1e-5), "\n{a:?}\n!=\n{b:?}");
    }

    #[test]
    fn vertex_layout_is_tightly_packed() {
        assert_eq!(Vertex::STRIDE, 11 * 4);
        let v = Vertex::new([1.0, 2.0, 3.0], [0.1, 0.2, 0.3], [0.5, 0.5], [0.0, 1.0, 0.0]);
        let floats: &[f32] = bytemuck::cast_slice(std::slice::from_ref(&v));
        assert_eq!(floats[0..3], [1.0, 2.0, 3.0]);
        assert_eq!(floats[6..8], [0.5, 0.5]);
        assert_eq!(floats[8..11], [0.0, 1.0, 0.0]);
    }

    #[test]
    fn transform_default_is_identity() {
        let t = Transform::default();
        assert_eq!(t.position, Vec3::ZERO);
        assert_eq!(t.origin, Vec3::ZERO);
        assert_eq!(t.rotation, Vec3::ZERO);
        assert_eq!(t.scale, Vec3::ONE);
        assert_mat_eq(t.model_matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn model_matrix_matches_composition_order() {
        let t = Transform {
            position: Vec3::new(3.0, -1.0, 2.0),
            origin: Vec3::new(1.0, 0.5, -2.0),
            rotation: Vec3::new(30.0, 45.0, 60.0),
            scale: Vec3::new(2.0, 1.0, 0.5),
        };
        let expected = Mat4::from_translation(t.origin)
            * Mat4::from_rotation_x(30f32.to_radians())
            * Mat4::from_rotation_y(45f32.to_radians())
            * Mat4::from_rotation_z(60f32.to_radians())
            * Mat4::from_translation(t.position - t.origin)
            * Mat4::from_scale(t.scale);
        assert_mat_eq(t.model_matrix(), expected);
    }

    #[test]
    fn rotation_order_is_x_then_y_then_z() {
        let t = Transform {
            rotation: Vec3::new(90.0, 90.0, 0.0),
            ..Transform::default()
        };
        let swapped =
            Mat4::from_rotation_y(90f32.to_radians()) * Mat4::from_rotation_x(90f32.to_radians());
        let p = Vec3::new(0.0, 0.0, 1.0);
        // Rx * Ry: Ry takes (0,0,1) to (1,0,0), which Rx leaves alone.
        let rotated = t.model_matrix().transform_point3(p);
        assert!(rotated.abs_diff_eq(Vec3::new(1.0, 0.0, 0.0), 1e-5));
        assert!(!swapped.transform_point3(p).abs_diff_eq(rotated, 1e-3));
    }

    #[test]
    fn rotation_pivots_around_origin() {
        let pivot = Vec3::new(2.0, 0.0, 2.0);
        let t = Transform {
            position: pivot,
            origin: pivot,
            rotation: Vec3::new(0.0, 90.0, 0.0),
            scale: Vec3::ONE,
        };
        let local = Vec3::new(0.5, -0.5, 0.5);
        let world = t.model_matrix().transform_point3(local);
        assert!(world.abs_diff_eq(Vec3::new(2.5, -0.5, 1.5), 1e-5));
        // Distance to the pivot is preserved in the XZ plane.
        let before = glam::Vec2::new(local.x, local.z);
        let after = glam::Vec2::new(world.x - pivot.x, world.z - pivot.z);
        assert!((before.length() - after.length()).abs() < 1e-5);
    }

    #[test]
    fn additive_mutators() {
        let mut t = Transform::default();
        t.translate(Vec3::new(1.0, 0.0, 0.0));
        t.translate(Vec3::new(1.0, 2.0, 0.0));
        t.rotate(Vec3::new(0.0, 10.0, 0.0));
        t.rotate(Vec3::new(0.0, 5.0, 0.0));
        t.scale_by(Vec3::splat(0.5));
        assert_eq!(t.position, Vec3::new(2.0, 2.0, 0.0));
        assert_eq!(t.rotation, Vec3::new(0.0, 15.0, 0.0));
        assert_eq!(t.scale, Vec3::splat(1.5));
    }

    #[test]
    fn direction_uses_snake_case_names() {
        let json = serde_json::to_string(&Direction::Backward).unwrap();
        assert_eq!(json, "\"backward\"");
    }
}
