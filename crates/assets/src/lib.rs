//! Asset import: built-in primitives, OBJ geometry, texture images.
//!
//! Importers return plain CPU-side data (`MeshData`, `Vec<Vertex>`,
//! `TextureImage`). Uploading to the GPU is the renderer's job.

pub mod obj;
pub mod primitives;
pub mod texture;

pub use obj::load_obj;
pub use primitives::{MeshData, Primitive};
pub use texture::TextureImage;

use std::path::PathBuf;

/// Errors from asset import.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("OBJ import failed for {path}: {source}")]
    Obj {
        path: PathBuf,
        #[source]
        source: tobj::LoadError,
    },
    #[error("OBJ file {0} contains no triangles")]
    EmptyGeometry(PathBuf),
    #[error("image decode failed for {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("image data is {actual} bytes, expected {expected} for {width}x{height} RGBA")]
    ImageSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

pub fn crate_info() -> &'static str {
    "ink-assets v0.1.0"
}
