//! Scene orchestration: the scene file, the asset registries it fills, and
//! the per-frame update/render loop.
//!
//! # Invariants
//! - Update always completes before Render; should-close is only checked
//!   between frames.
//! - Projection aspect is re-derived from the framebuffer every frame.
//! - Drawables drop before the registries their handles point into.
//! - Every frame ends with the GPU binding state idle, including frames that
//!   fail part way.

pub mod assets;
pub mod config;
pub mod scene;

pub use assets::SceneAssets;
pub use config::{
    CameraConfig, MaterialConfig, ModelConfig, ModelSource, SceneConfig, ShaderConfig,
    ShaderFiles, TextureConfig, TextureSource,
};
pub use scene::{Scene, SceneObject};

use ink_assets::AssetError;
use ink_common::RegistryError;
use ink_render::{GpuError, RenderError};
use std::path::PathBuf;

/// Errors from loading or running a scene.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("initialization failed: {0}")]
    Initialization(String),
    #[error(transparent)]
    Asset(#[from] AssetError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Gpu(#[from] GpuError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("unknown {kind} '{name}'")]
    UnknownAsset { kind: &'static str, name: String },
    #[error("duplicate {kind} '{name}'")]
    DuplicateAsset { kind: &'static str, name: String },
    #[error("scene file error: {0}")]
    Config(#[from] serde_yaml::Error),
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("scene has no lights")]
    NoLights,
    #[error("scene has no shaders")]
    NoShaders,
}

pub fn crate_info() -> &'static str {
    "ink-scene v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("scene"));
    }

    #[test]
    fn unknown_asset_names_kind_and_name() {
        let err = SceneError::UnknownAsset {
            kind: "texture",
            name: "brick".into(),
        };
        assert_eq!(err.to_string(), "unknown texture 'brick'");
    }
}
