use crate::Shader;
use crate::gpu::GpuError;
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Phong surface parameters plus the texture units the shader samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub diffuse_unit: i32,
    pub specular_unit: i32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            ambient: Vec3::splat(0.1),
            diffuse: Vec3::ONE,
            specular: Vec3::splat(2.0),
            diffuse_unit: 0,
            specular_unit: 1,
        }
    }
}

impl Material {
    pub fn new(
        ambient: Vec3,
        diffuse: Vec3,
        specular: Vec3,
        diffuse_unit: i32,
        specular_unit: i32,
    ) -> Self {
        Self {
            ambient,
            diffuse,
            specular,
            diffuse_unit,
            specular_unit,
        }
    }

    pub fn send_to_shader(&self, shader: &Shader) -> Result<(), GpuError> {
        shader.set_vec3("material.ambient", self.ambient)?;
        shader.set_vec3("material.diffuse", self.diffuse)?;
        shader.set_vec3("material.specular", self.specular)?;
        shader.set_i32("material.diffuseTex", self.diffuse_unit)?;
        shader.set_i32("material.specularTex", self.specular_unit)
    }
}
