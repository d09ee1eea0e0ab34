//! Backend-agnostic scene rendering.
//!
//! Everything here drives a [`Gpu`] through its explicit binding state
//! machine. Resource owners ([`GeometryBuffer`], [`Shader`], [`Texture`])
//! hold a [`SharedGpu`] and release their handles exactly once on drop.
//!
//! # Invariants
//! - After every [`GeometryBuffer::render`] the device is idle: no vertex
//!   array, no program, unit 0 active, no texture bound.
//! - A geometry buffer has an index buffer iff its index count is non-zero.
//! - Model matrices are derived at render time, never cached across frames.

pub mod camera;
pub mod frame;
pub mod gpu;
pub mod headless;
pub mod light;
pub mod material;
pub mod mesh;
pub mod model;
pub mod projection;
pub mod shader;
pub mod texture;

pub use camera::Camera;
pub use frame::FrameUniforms;
pub use gpu::{
    BindingState, BufferId, BufferTarget, Gpu, GpuError, MAX_TEXTURE_UNITS, ProgramId,
    ShaderSource, SharedGpu, TextureId, UniformValue, VertexArrayId,
};
pub use headless::{DrawCall, DrawKind, HeadlessGpu, ResourceStats};
pub use light::Light;
pub use material::Material;
pub use mesh::GeometryBuffer;
pub use model::DrawableObject;
pub use projection::Projection;
pub use shader::Shader;
pub use texture::Texture;

use ink_assets::AssetError;
use ink_common::RegistryError;

/// Errors raised while building or drawing scene objects.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    Gpu(#[from] GpuError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Asset(#[from] AssetError),
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),
}

pub fn crate_info() -> &'static str {
    "ink-render v0.1.0"
}
