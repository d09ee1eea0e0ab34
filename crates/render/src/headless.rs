use crate::gpu::{
    BindingState, BufferId, BufferTarget, Gpu, GpuError, ProgramId, ShaderSource, TextureId,
    UniformValue, VertexArrayId,
};
use ink_assets::TextureImage;
use ink_common::Vertex;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawKind {
    Arrays,
    Elements,
}

/// One recorded draw call with the state it was issued under.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub kind: DrawKind,
    pub count: u32,
    pub bindings: BindingState,
    /// Uniforms of the program in use at draw time.
    pub uniforms: BTreeMap<String, UniformValue>,
}

impl DrawCall {
    pub fn uniform(&self, name: &str) -> Option<UniformValue> {
        self.uniforms.get(name).copied()
    }
}

/// Creation and release counters, per resource kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceStats {
    pub created: usize,
    pub released: usize,
    /// Deletes that named a resource which was not live.
    pub failed_releases: usize,
}

impl ResourceStats {
    pub fn live(&self) -> usize {
        self.created - self.released
    }
}

#[derive(Debug, Default)]
struct VertexArrayRecord {
    vertices: Option<BufferId>,
    indices: Option<BufferId>,
}

#[derive(Debug)]
struct BufferRecord {
    target: BufferTarget,
    len: usize,
}

/// A [`Gpu`] that keeps books instead of drawing.
///
/// Ids are never reused, so a stale id always fails. Draw calls for the
/// current frame are recorded and moved to [`HeadlessGpu::last_frame`] on
/// present.
#[derive(Debug)]
pub struct HeadlessGpu {
    next_id: u64,
    vertex_arrays: HashMap<VertexArrayId, VertexArrayRecord>,
    buffers: HashMap<BufferId, BufferRecord>,
    programs: HashMap<ProgramId, BTreeMap<String, UniformValue>>,
    textures: HashMap<TextureId, (u32, u32)>,
    bindings: BindingState,
    stats: ResourceStats,
    frame: Vec<DrawCall>,
    last_frame: Vec<DrawCall>,
    frames_presented: u64,
    clear_color: Option<[f32; 4]>,
    viewport: (u32, u32),
}

impl HeadlessGpu {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            next_id: 1,
            vertex_arrays: HashMap::new(),
            buffers: HashMap::new(),
            programs: HashMap::new(),
            textures: HashMap::new(),
            bindings: BindingState::default(),
            stats: ResourceStats::default(),
            frame: Vec::new(),
            last_frame: Vec::new(),
            frames_presented: 0,
            clear_color: None,
            viewport: (width, height),
        }
    }

    pub fn stats(&self) -> ResourceStats {
        self.stats
    }

    /// Live resources across all kinds.
    pub fn live_resources(&self) -> usize {
        self.vertex_arrays.len() + self.buffers.len() + self.programs.len() + self.textures.len()
    }

    pub fn live_buffers(&self, target: BufferTarget) -> usize {
        self.buffers.values().filter(|b| b.target == target).count()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    /// Draws recorded since the last present.
    pub fn pending_draws(&self) -> &[DrawCall] {
        &self.frame
    }

    /// Draws of the most recently presented frame.
    pub fn last_frame(&self) -> &[DrawCall] {
        &self.last_frame
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    pub fn clear_color(&self) -> Option<[f32; 4]> {
        self.clear_color
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    pub fn uniform(&self, program: ProgramId, name: &str) -> Option<UniformValue> {
        self.programs.get(&program)?.get(name).copied()
    }

    fn allocate(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.stats.created += 1;
        id
    }

    fn released(&mut self, ok: bool, kind: &'static str, id: u64) -> Result<(), GpuError> {
        if ok {
            self.stats.released += 1;
            tracing::trace!(kind, id, "headless resource released");
            Ok(())
        } else {
            self.stats.failed_releases += 1;
            Err(GpuError::UnknownResource { kind, id })
        }
    }

    fn bound_program(&self) -> Result<ProgramId, GpuError> {
        self.bindings.program.ok_or(GpuError::NoProgramBound)
    }

    fn bound_vertex_array(&self) -> Result<&VertexArrayRecord, GpuError> {
        let id = self
            .bindings
            .vertex_array
            .ok_or(GpuError::NoVertexArrayBound)?;
        self.vertex_arrays
            .get(&id)
            .ok_or(GpuError::UnknownResource {
                kind: VertexArrayId::KIND,
                id: id.raw(),
            })
    }

    fn buffer_elements(&self, id: BufferId, element_size: usize) -> Result<u32, GpuError> {
        let record = self.buffers.get(&id).ok_or(GpuError::UnknownResource {
            kind: BufferId::KIND,
            id: id.raw(),
        })?;
        Ok((record.len / element_size) as u32)
    }

    fn record(&mut self, kind: DrawKind, count: u32, available: u32) -> Result<(), GpuError> {
        if count > available {
            return Err(GpuError::DrawOutOfRange { count, available });
        }
        let program = self.bound_program()?;
        let uniforms = self.programs.get(&program).cloned().unwrap_or_default();
        tracing::trace!(?kind, count, %program, "headless draw");
        self.frame.push(DrawCall {
            kind,
            count,
            bindings: self.bindings.clone(),
            uniforms,
        });
        Ok(())
    }
}

impl Gpu for HeadlessGpu {
    fn backend_name(&self) -> &str {
        "headless"
    }

    fn create_vertex_array(&mut self) -> Result<VertexArrayId, GpuError> {
        let id = VertexArrayId::from_raw(self.allocate());
        self.vertex_arrays.insert(id, VertexArrayRecord::default());
        Ok(id)
    }

    fn delete_vertex_array(&mut self, id: VertexArrayId) -> Result<(), GpuError> {
        let ok = self.vertex_arrays.remove(&id).is_some();
        if ok && self.bindings.vertex_array == Some(id) {
            self.bindings.vertex_array = None;
        }
        self.released(ok, VertexArrayId::KIND, id.raw())
    }

    fn create_buffer(&mut self, target: BufferTarget, data: &[u8]) -> Result<BufferId, GpuError> {
        if data.is_empty() {
            return Err(GpuError::ResourceCreation(format!(
                "{target:?} buffer with no data"
            )));
        }
        let id = BufferId::from_raw(self.allocate());
        self.buffers.insert(
            id,
            BufferRecord {
                target,
                len: data.len(),
            },
        );
        Ok(id)
    }

    fn delete_buffer(&mut self, id: BufferId) -> Result<(), GpuError> {
        let ok = self.buffers.remove(&id).is_some();
        self.released(ok, BufferId::KIND, id.raw())
    }

    fn attach_buffers(
        &mut self,
        vertex_array: VertexArrayId,
        vertices: BufferId,
        indices: Option<BufferId>,
    ) -> Result<(), GpuError> {
        for buffer in std::iter::once(vertices).chain(indices) {
            if !self.buffers.contains_key(&buffer) {
                return Err(GpuError::UnknownResource {
                    kind: BufferId::KIND,
                    id: buffer.raw(),
                });
            }
        }
        let record =
            self.vertex_arrays
                .get_mut(&vertex_array)
                .ok_or(GpuError::UnknownResource {
                    kind: VertexArrayId::KIND,
                    id: vertex_array.raw(),
                })?;
        record.vertices = Some(vertices);
        record.indices = indices;
        Ok(())
    }

    fn create_program(&mut self, source: &ShaderSource) -> Result<ProgramId, GpuError> {
        if let ShaderSource::Custom { vertex, fragment } = source {
            if vertex.trim().is_empty() || fragment.trim().is_empty() {
                return Err(GpuError::ResourceCreation(
                    "shader stage source is empty".to_string(),
                ));
            }
        }
        let id = ProgramId::from_raw(self.allocate());
        self.programs.insert(id, BTreeMap::new());
        Ok(id)
    }

    fn delete_program(&mut self, id: ProgramId) -> Result<(), GpuError> {
        let ok = self.programs.remove(&id).is_some();
        if ok && self.bindings.program == Some(id) {
            self.bindings.program = None;
        }
        self.released(ok, ProgramId::KIND, id.raw())
    }

    fn create_texture(&mut self, image: &TextureImage) -> Result<TextureId, GpuError> {
        let id = TextureId::from_raw(self.allocate());
        self.textures.insert(id, (image.width(), image.height()));
        Ok(id)
    }

    fn delete_texture(&mut self, id: TextureId) -> Result<(), GpuError> {
        let ok = self.textures.remove(&id).is_some();
        if ok {
            self.bindings.forget_texture(id);
        }
        self.released(ok, TextureId::KIND, id.raw())
    }

    fn bind_vertex_array(&mut self, id: Option<VertexArrayId>) -> Result<(), GpuError> {
        if let Some(id) = id {
            if !self.vertex_arrays.contains_key(&id) {
                return Err(GpuError::UnknownResource {
                    kind: VertexArrayId::KIND,
                    id: id.raw(),
                });
            }
        }
        self.bindings.vertex_array = id;
        Ok(())
    }

    fn use_program(&mut self, id: Option<ProgramId>) -> Result<(), GpuError> {
        if let Some(id) = id {
            if !self.programs.contains_key(&id) {
                return Err(GpuError::UnknownResource {
                    kind: ProgramId::KIND,
                    id: id.raw(),
                });
            }
        }
        self.bindings.program = id;
        Ok(())
    }

    fn active_texture(&mut self, unit: u32) -> Result<(), GpuError> {
        self.bindings.set_active_unit(unit)
    }

    fn bind_texture(&mut self, id: Option<TextureId>) -> Result<(), GpuError> {
        if let Some(id) = id {
            if !self.textures.contains_key(&id) {
                return Err(GpuError::UnknownResource {
                    kind: TextureId::KIND,
                    id: id.raw(),
                });
            }
        }
        self.bindings.bind_texture(id);
        Ok(())
    }

    fn set_uniform(
        &mut self,
        program: ProgramId,
        name: &str,
        value: UniformValue,
    ) -> Result<(), GpuError> {
        let uniforms = self
            .programs
            .get_mut(&program)
            .ok_or(GpuError::UnknownResource {
                kind: ProgramId::KIND,
                id: program.raw(),
            })?;
        uniforms.insert(name.to_string(), value);
        Ok(())
    }

    fn draw_arrays(&mut self, count: u32) -> Result<(), GpuError> {
        let vertex_array = self.bound_vertex_array()?;
        let vertices = vertex_array.vertices.ok_or(GpuError::IncompleteVertexArray(
            self.bindings.vertex_array.map_or(0, VertexArrayId::raw),
        ))?;
        let available = self.buffer_elements(vertices, Vertex::STRIDE)?;
        self.record(DrawKind::Arrays, count, available)
    }

    fn draw_elements(&mut self, count: u32) -> Result<(), GpuError> {
        let vertex_array = self.bound_vertex_array()?;
        let indices = vertex_array.indices.ok_or(GpuError::IncompleteVertexArray(
            self.bindings.vertex_array.map_or(0, VertexArrayId::raw),
        ))?;
        let available = self.buffer_elements(indices, std::mem::size_of::<u32>())?;
        self.record(DrawKind::Elements, count, available)
    }

    fn clear(&mut self, color: [f32; 4]) {
        self.clear_color = Some(color);
        self.frame.clear();
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
    }

    fn present(&mut self) -> Result<(), GpuError> {
        self.last_frame = std::mem::take(&mut self.frame);
        self.frames_presented += 1;
        Ok(())
    }

    fn bindings(&self) -> &BindingState {
        &self.bindings
    }

    fn reset_bindings(&mut self) {
        self.bindings.reset();
    }
}
