use crate::gpu::GpuError;
use crate::{Camera, Light, Projection, Shader};
use glam::{Mat4, Vec3};

/// Uniforms shared by every draw in a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameUniforms {
    pub view: Mat4,
    pub projection: Mat4,
    pub camera_position: Vec3,
    pub light_position: Vec3,
}

impl FrameUniforms {
    pub fn new(
        camera: &Camera,
        projection: &Projection,
        framebuffer: (u32, u32),
        light: &Light,
    ) -> Self {
        Self {
            view: camera.view_matrix(),
            projection: projection.matrix(framebuffer.0, framebuffer.1),
            camera_position: camera.position(),
            light_position: light.position,
        }
    }

    pub fn apply(&self, shader: &Shader) -> Result<(), GpuError> {
        shader.set_mat4("ViewMatrix", self.view)?;
        shader.set_vec3("cameraPos", self.camera_position)?;
        shader.set_vec3("lightPos0", self.light_position)?;
        shader.set_mat4("ProjectionMatrix", self.projection)
    }
}
