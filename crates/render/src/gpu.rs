use glam::{Mat4, Vec3};
use ink_assets::TextureImage;
use std::cell::RefCell;
use std::fmt;
use std::path::Path;
use std::rc::Rc;

/// Number of texture units a backend exposes.
pub const MAX_TEXTURE_UNITS: usize = 16;

macro_rules! gpu_id {
    ($($(#[$meta:meta])* $name:ident => $kind:literal),* $(,)?) => {$(
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u64);

        impl $name {
            pub const KIND: &'static str = $kind;

            pub fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            pub fn raw(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", $kind, self.0)
            }
        }
    )*};
}

gpu_id! {
    /// Vertex input state: which buffers feed a draw and how.
    VertexArrayId => "vertex array",
    BufferId => "buffer",
    ProgramId => "program",
    TextureId => "texture",
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    /// Interleaved [`ink_common::Vertex`] data.
    Vertex,
    /// `u32` triangle-list indices.
    Index,
}

/// Source for a shader program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShaderSource {
    /// The backend's built-in lit shader.
    Core,
    /// Backend-specific vertex and fragment stage text.
    Custom { vertex: String, fragment: String },
}

impl ShaderSource {
    pub fn load(vertex: impl AsRef<Path>, fragment: impl AsRef<Path>) -> std::io::Result<Self> {
        Ok(Self::Custom {
            vertex: std::fs::read_to_string(vertex)?,
            fragment: std::fs::read_to_string(fragment)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Mat4(Mat4),
    Vec3(Vec3),
    I32(i32),
    F32(f32),
}

#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("unknown {kind} {id}")]
    UnknownResource { kind: &'static str, id: u64 },
    #[error("draw issued with no vertex array bound")]
    NoVertexArrayBound,
    #[error("draw issued with no program in use")]
    NoProgramBound,
    #[error("texture unit {unit} is outside the {max} available units")]
    InvalidTextureUnit { unit: u32, max: usize },
    #[error("vertex array {0} has no vertex buffer attached")]
    IncompleteVertexArray(u64),
    #[error("draw of {count} elements exceeds the {available} available")]
    DrawOutOfRange { count: u32, available: u32 },
    #[error("resource creation failed: {0}")]
    ResourceCreation(String),
    #[error("surface error: {0}")]
    Surface(String),
}

/// Binding state of the device.
///
/// Idle means no vertex array, no program, unit 0 active and nothing bound on
/// any unit. Every draw and every frame ends in the idle state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingState {
    pub vertex_array: Option<VertexArrayId>,
    pub program: Option<ProgramId>,
    pub active_unit: u32,
    pub textures: [Option<TextureId>; MAX_TEXTURE_UNITS],
}

impl Default for BindingState {
    fn default() -> Self {
        Self {
            vertex_array: None,
            program: None,
            active_unit: 0,
            textures: [None; MAX_TEXTURE_UNITS],
        }
    }
}

impl BindingState {
    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn texture_at(&self, unit: u32) -> Option<TextureId> {
        self.textures.get(unit as usize).copied().flatten()
    }

    pub fn set_active_unit(&mut self, unit: u32) -> Result<(), GpuError> {
        if unit as usize >= MAX_TEXTURE_UNITS {
            return Err(GpuError::InvalidTextureUnit {
                unit,
                max: MAX_TEXTURE_UNITS,
            });
        }
        self.active_unit = unit;
        Ok(())
    }

    /// Bind to the active unit.
    pub fn bind_texture(&mut self, texture: Option<TextureId>) {
        self.textures[self.active_unit as usize] = texture;
    }

    /// Drop every binding that refers to a deleted texture.
    pub fn forget_texture(&mut self, texture: TextureId) {
        for slot in self.textures.iter_mut() {
            if *slot == Some(texture) {
                *slot = None;
            }
        }
    }
}

/// A graphics device driven as an explicit binding state machine.
///
/// Resources are created and deleted through the device and referred to by
/// id. Deleting an id that is not live is an error, so a double release is
/// always detected.
pub trait Gpu {
    /// Short backend name for logs.
    fn backend_name(&self) -> &str;

    fn create_vertex_array(&mut self) -> Result<VertexArrayId, GpuError>;
    fn delete_vertex_array(&mut self, id: VertexArrayId) -> Result<(), GpuError>;

    /// Allocate a buffer and upload `data` once as static data.
    fn create_buffer(&mut self, target: BufferTarget, data: &[u8]) -> Result<BufferId, GpuError>;
    fn delete_buffer(&mut self, id: BufferId) -> Result<(), GpuError>;

    /// Record a vertex buffer, and optionally an index buffer, as the inputs
    /// of a vertex array using the [`ink_common::Vertex`] layout.
    fn attach_buffers(
        &mut self,
        vertex_array: VertexArrayId,
        vertices: BufferId,
        indices: Option<BufferId>,
    ) -> Result<(), GpuError>;

    fn create_program(&mut self, source: &ShaderSource) -> Result<ProgramId, GpuError>;
    fn delete_program(&mut self, id: ProgramId) -> Result<(), GpuError>;

    fn create_texture(&mut self, image: &TextureImage) -> Result<TextureId, GpuError>;
    fn delete_texture(&mut self, id: TextureId) -> Result<(), GpuError>;

    fn bind_vertex_array(&mut self, id: Option<VertexArrayId>) -> Result<(), GpuError>;
    fn use_program(&mut self, id: Option<ProgramId>) -> Result<(), GpuError>;
    fn active_texture(&mut self, unit: u32) -> Result<(), GpuError>;
    /// Bind a texture to the active unit, or clear it.
    fn bind_texture(&mut self, id: Option<TextureId>) -> Result<(), GpuError>;

    /// Store a uniform value on a program. Values persist until overwritten.
    fn set_uniform(
        &mut self,
        program: ProgramId,
        name: &str,
        value: UniformValue,
    ) -> Result<(), GpuError>;

    /// Non-indexed triangle-list draw over the first `count` vertices.
    fn draw_arrays(&mut self, count: u32) -> Result<(), GpuError>;
    /// Indexed triangle-list draw over the first `count` indices.
    fn draw_elements(&mut self, count: u32) -> Result<(), GpuError>;

    /// Clear color, depth and stencil for the next frame.
    fn clear(&mut self, color: [f32; 4]);
    fn set_viewport(&mut self, width: u32, height: u32);
    fn present(&mut self) -> Result<(), GpuError>;

    fn bindings(&self) -> &BindingState;
    /// Return to the idle binding state.
    fn reset_bindings(&mut self);
}

/// Device handle shared by every resource owner on the render thread.
pub type SharedGpu = Rc<RefCell<dyn Gpu>>;
