//! Shared types used by every ink crate.
//!
//! # Invariants
//! - `Vertex` has a fixed `#[repr(C)]` layout that GPU backends upload as-is.
//! - `Transform::model_matrix` composes in a fixed order (see its docs).
//! - Assets are referenced through typed `Handle`s resolved by a `Registry`.

pub mod registry;
pub mod types;

pub use registry::{Handle, Registry, RegistryError};
pub use types::{Direction, Transform, Vertex};

pub fn crate_info() -> &'static str {
    "ink-common v0.1.0"
}
