use crate::gpu::{GpuError, ProgramId, ShaderSource, SharedGpu, UniformValue};
use glam::{Mat4, Vec3};
use std::rc::Rc;

/// A compiled shader program owned by one CPU-side object.
///
/// Uniform setters address values by name and store them on this program;
/// they do not require the program to be in use.
pub struct Shader {
    gpu: SharedGpu,
    program: ProgramId,
    label: String,
}

impl Shader {
    pub fn new(
        gpu: &SharedGpu,
        label: impl Into<String>,
        source: &ShaderSource,
    ) -> Result<Self, GpuError> {
        let label = label.into();
        let program = gpu.borrow_mut().create_program(source)?;
        tracing::debug!(%label, %program, "shader program created");
        Ok(Self {
            gpu: Rc::clone(gpu),
            program,
            label,
        })
    }

    pub(crate) fn gpu(&self) -> &SharedGpu {
        &self.gpu
    }

    pub fn program(&self) -> ProgramId {
        self.program
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn use_program(&self) -> Result<(), GpuError> {
        self.gpu.borrow_mut().use_program(Some(self.program))
    }

    pub fn unuse(&self) -> Result<(), GpuError> {
        self.gpu.borrow_mut().use_program(None)
    }

    pub fn set_uniform(&self, name: &str, value: UniformValue) -> Result<(), GpuError> {
        self.gpu.borrow_mut().set_uniform(self.program, name, value)
    }

    pub fn set_mat4(&self, name: &str, value: Mat4) -> Result<(), GpuError> {
        self.set_uniform(name, UniformValue::Mat4(value))
    }

    pub fn set_vec3(&self, name: &str, value: Vec3) -> Result<(), GpuError> {
        self.set_uniform(name, UniformValue::Vec3(value))
    }

    pub fn set_i32(&self, name: &str, value: i32) -> Result<(), GpuError> {
        self.set_uniform(name, UniformValue::I32(value))
    }

    pub fn set_f32(&self, name: &str, value: f32) -> Result<(), GpuError> {
        self.set_uniform(name, UniformValue::F32(value))
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        match self.gpu.try_borrow_mut() {
            Ok(mut gpu) => {
                if let Err(err) = gpu.delete_program(self.program) {
                    tracing::error!(label = %self.label, %err, "failed to release shader program");
                } else {
                    tracing::debug!(label = %self.label, program = %self.program, "shader program released");
                }
            }
            Err(_) => {
                tracing::error!(label = %self.label, "gpu busy while releasing shader program");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::Gpu;
    use crate::HeadlessGpu;
    use std::cell::RefCell;

    #[test]
    fn setters_store_on_program() {
        let headless = Rc::new(RefCell::new(HeadlessGpu::new(4, 4)));
        let gpu: SharedGpu = headless.clone();
        let shader = Shader::new(&gpu, "core", &ShaderSource::Core).unwrap();
        shader.set_vec3("lightPos0", Vec3::new(0.0, 0.0, 1.0)).unwrap();
        shader.set_i32("material.diffuseTex", 0).unwrap();
        shader.set_f32("time", 1.5).unwrap();

        let hg = headless.borrow();
        assert_eq!(
            hg.uniform(shader.program(), "lightPos0"),
            Some(UniformValue::Vec3(Vec3::new(0.0, 0.0, 1.0)))
        );
        assert_eq!(
            hg.uniform(shader.program(), "material.diffuseTex"),
            Some(UniformValue::I32(0))
        );
        assert_eq!(hg.uniform(shader.program(), "time"), Some(UniformValue::F32(1.5)));
    }

    #[test]
    fn use_and_unuse_toggle_binding() {
        let headless = Rc::new(RefCell::new(HeadlessGpu::new(4, 4)));
        let gpu: SharedGpu = headless.clone();
        let shader = Shader::new(&gpu, "core", &ShaderSource::Core).unwrap();
        shader.use_program().unwrap();
        assert_eq!(headless.borrow().bindings().program, Some(shader.program()));
        shader.unuse().unwrap();
        assert!(headless.borrow().bindings().is_idle());
    }

    #[test]
    fn drop_releases_program_once() {
        let headless = Rc::new(RefCell::new(HeadlessGpu::new(4, 4)));
        let gpu: SharedGpu = headless.clone();
        let shader = Shader::new(&gpu, "core", &ShaderSource::Core).unwrap();
        assert_eq!(headless.borrow().live_programs(), 1);
        drop(shader);
        let stats = headless.borrow().stats();
        assert_eq!(stats.live(), 0);
        assert_eq!(stats.failed_releases, 0);
    }
}
