//! wgpu backend for the ink renderer.
//!
//! [`WgpuGpu`] implements the [`ink_render::Gpu`] binding state machine on top
//! of wgpu. Draw calls are recorded with a snapshot of the program's uniforms
//! and the textures on the units the material names, then encoded into one
//! render pass when the frame is presented.
//!
//! # Invariants
//! - One pipeline per program: depth test, back-face culling with CCW front
//!   faces, alpha blending, filled triangles.
//! - Uniforms are addressed by name; names outside the core layout are ignored
//!   with a warning.
//! - A lost or outdated surface is reconfigured and the frame is skipped.

mod gpu;
mod shaders;

pub use gpu::WgpuGpu;
pub use shaders::CORE_SHADER;

pub fn crate_info() -> &'static str {
    "ink-render-wgpu v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("wgpu"));
    }
}
