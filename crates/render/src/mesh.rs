use crate::RenderError;
use crate::Shader;
use crate::gpu::{BufferId, BufferTarget, Gpu, GpuError, SharedGpu, VertexArrayId};
use glam::{Mat4, Vec3};
use ink_assets::MeshData;
use ink_common::{Transform, Vertex};
use std::rc::Rc;

/// GPU-resident geometry with its own local transform.
///
/// Owns a vertex array, a vertex buffer and, for indexed geometry, an index
/// buffer. The handles are created in the constructor and released in `Drop`;
/// nothing else ever deletes them.
pub struct GeometryBuffer {
    gpu: SharedGpu,
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    vertex_array: VertexArrayId,
    vertex_buffer: BufferId,
    index_buffer: Option<BufferId>,
    transform: Transform,
    model_matrix: Mat4,
}

impl GeometryBuffer {
    /// Upload `vertices` (and `indices`, when non-empty) with an identity
    /// transform.
    pub fn new(gpu: &SharedGpu, vertices: &[Vertex], indices: &[u32]) -> Result<Self, RenderError> {
        Self::with_transform(gpu, vertices, indices, Transform::default())
    }

    pub fn from_mesh_data(gpu: &SharedGpu, mesh: &MeshData) -> Result<Self, RenderError> {
        Self::new(gpu, &mesh.vertices, &mesh.indices)
    }

    pub fn with_transform(
        gpu: &SharedGpu,
        vertices: &[Vertex],
        indices: &[u32],
        transform: Transform,
    ) -> Result<Self, RenderError> {
        validate(vertices, indices)?;
        let (vertex_array, vertex_buffer, index_buffer) =
            upload(&mut *gpu.borrow_mut(), vertices, indices)?;
        tracing::debug!(
            %vertex_array,
            vertices = vertices.len(),
            indices = indices.len(),
            "geometry uploaded"
        );
        Ok(Self {
            gpu: Rc::clone(gpu),
            vertices: vertices.to_vec(),
            indices: indices.to_vec(),
            vertex_array,
            vertex_buffer,
            index_buffer,
            transform,
            model_matrix: transform.model_matrix(),
        })
    }

    /// Deep copy: same CPU data and transform, fresh GPU resources.
    pub fn try_clone(&self) -> Result<Self, RenderError> {
        Self::with_transform(&self.gpu, &self.vertices, &self.indices, self.transform)
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.transform.position = position;
    }

    pub fn set_origin(&mut self, origin: Vec3) {
        self.transform.origin = origin;
    }

    pub fn set_rotation(&mut self, rotation: Vec3) {
        self.transform.rotation = rotation;
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.transform.scale = scale;
    }

    pub fn translate(&mut self, delta: Vec3) {
        self.transform.translate(delta);
    }

    pub fn rotate(&mut self, delta: Vec3) {
        self.transform.rotate(delta);
    }

    pub fn scale_by(&mut self, delta: Vec3) {
        self.transform.scale_by(delta);
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Matrix computed by the last render (or construction).
    pub fn model_matrix(&self) -> Mat4 {
        self.model_matrix
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Zero for non-indexed geometry.
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn vertex_array(&self) -> VertexArrayId {
        self.vertex_array
    }

    pub fn has_index_buffer(&self) -> bool {
        self.index_buffer.is_some()
    }

    /// Derive the model matrix, push it as `ModelMatrix` and issue one draw.
    ///
    /// The device is returned to the idle binding state afterwards, also when
    /// the draw fails.
    pub fn render(&mut self, shader: &Shader) -> Result<(), RenderError> {
        self.model_matrix = self.transform.model_matrix();
        let result = self.submit(shader);
        self.gpu.borrow_mut().reset_bindings();
        result.map_err(RenderError::from)
    }

    fn submit(&self, shader: &Shader) -> Result<(), GpuError> {
        shader.set_mat4("ModelMatrix", self.model_matrix)?;
        shader.use_program()?;
        let mut gpu = self.gpu.borrow_mut();
        gpu.bind_vertex_array(Some(self.vertex_array))?;
        if self.indices.is_empty() {
            gpu.draw_arrays(self.vertices.len() as u32)
        } else {
            gpu.draw_elements(self.indices.len() as u32)
        }
    }
}

impl Drop for GeometryBuffer {
    fn drop(&mut self) {
        let Ok(mut gpu) = self.gpu.try_borrow_mut() else {
            tracing::error!(vertex_array = %self.vertex_array, "gpu busy while releasing geometry");
            return;
        };
        if let Err(err) = gpu.delete_vertex_array(self.vertex_array) {
            tracing::error!(%err, "failed to release vertex array");
        }
        if let Err(err) = gpu.delete_buffer(self.vertex_buffer) {
            tracing::error!(%err, "failed to release vertex buffer");
        }
        if let Some(index_buffer) = self.index_buffer {
            if let Err(err) = gpu.delete_buffer(index_buffer) {
                tracing::error!(%err, "failed to release index buffer");
            }
        }
        tracing::trace!(vertex_array = %self.vertex_array, "geometry released");
    }
}

fn validate(vertices: &[Vertex], indices: &[u32]) -> Result<(), RenderError> {
    if vertices.is_empty() {
        return Err(RenderError::InvalidGeometry(
            "geometry has no vertices".to_string(),
        ));
    }
    if let Some(&bad) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
        return Err(RenderError::InvalidGeometry(format!(
            "index {bad} out of range for {} vertices",
            vertices.len()
        )));
    }
    Ok(())
}

/// Create and fill the GPU objects, releasing any partial allocation on
/// failure.
fn upload(
    gpu: &mut dyn Gpu,
    vertices: &[Vertex],
    indices: &[u32],
) -> Result<(VertexArrayId, BufferId, Option<BufferId>), GpuError> {
    let vertex_array = gpu.create_vertex_array()?;
    let vertex_buffer = match gpu.create_buffer(BufferTarget::Vertex, bytemuck::cast_slice(vertices)) {
        Ok(buffer) => buffer,
        Err(err) => {
            rollback(gpu, vertex_array, None, None);
            return Err(err);
        }
    };
    let index_buffer = if indices.is_empty() {
        None
    } else {
        match gpu.create_buffer(BufferTarget::Index, bytemuck::cast_slice(indices)) {
            Ok(buffer) => Some(buffer),
            Err(err) => {
                rollback(gpu, vertex_array, Some(vertex_buffer), None);
                return Err(err);
            }
        }
    };
    if let Err(err) = gpu.attach_buffers(vertex_array, vertex_buffer, index_buffer) {
        rollback(gpu, vertex_array, Some(vertex_buffer), index_buffer);
        return Err(err);
    }
    Ok((vertex_array, vertex_buffer, index_buffer))
}

/// Release a partial upload, newest resource first.
fn rollback(
    gpu: &mut dyn Gpu,
    vertex_array: VertexArrayId,
    vertex_buffer: Option<BufferId>,
    index_buffer: Option<BufferId>,
) {
    for buffer in [index_buffer, vertex_buffer].into_iter().flatten() {
        if let Err(err) = gpu.delete_buffer(buffer) {
            tracing::error!(%buffer, %err, "failed to release buffer after upload error");
        }
    }
    if let Err(err) = gpu.delete_vertex_array(vertex_array) {
        tracing::error!(%vertex_array, %err, "failed to release vertex array after upload error");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::{ShaderSource, UniformValue};
    use crate::headless::DrawKind;
    use crate::HeadlessGpu;
    use ink_assets::Primitive;
    use std::cell::RefCell;

    fn device() -> (Rc<RefCell<HeadlessGpu>>, SharedGpu) {
        let headless = Rc::new(RefCell::new(HeadlessGpu::new(64, 64)));
        let gpu: SharedGpu = headless.clone();
        (headless, gpu)
    }

    #[test]
    fn rejects_empty_and_out_of_range() {
        let (_, gpu) = device();
        assert!(matches!(
            GeometryBuffer::new(&gpu, &[], &[]),
            Err(RenderError::InvalidGeometry(_))
        ));
        let verts = [Vertex::default(); 3];
        assert!(matches!(
            GeometryBuffer::new(&gpu, &verts, &[0, 1, 3]),
            Err(RenderError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn non_indexed_geometry_has_no_index_buffer() {
        let (headless, gpu) = device();
        let pyramid = GeometryBuffer::from_mesh_data(&gpu, &Primitive::Pyramid.mesh_data()).unwrap();
        assert_eq!(pyramid.index_count(), 0);
        assert!(!pyramid.has_index_buffer());
        assert_eq!(headless.borrow().live_buffers(BufferTarget::Index), 0);

        let quad = GeometryBuffer::from_mesh_data(&gpu, &Primitive::Quad.mesh_data()).unwrap();
        assert_eq!(quad.index_count(), 6);
        assert!(quad.has_index_buffer());
        assert_eq!(headless.borrow().live_buffers(BufferTarget::Index), 1);
    }

    #[test]
    fn create_and_drop_many_leaks_nothing() {
        let (headless, gpu) = device();
        let mut meshes = Vec::new();
        for prim in [Primitive::Triangle, Primitive::Pyramid, Primitive::Cube] {
            for _ in 0..5 {
                meshes.push(GeometryBuffer::from_mesh_data(&gpu, &prim.mesh_data()).unwrap());
            }
        }
        assert_eq!(headless.borrow().live_resources(), 5 * 3 + 5 * 2 + 5 * 3);
        drop(meshes);
        let stats = headless.borrow().stats();
        assert_eq!(headless.borrow().live_resources(), 0);
        assert_eq!(stats.created, stats.released);
        assert_eq!(stats.failed_releases, 0);
    }

    #[test]
    fn render_picks_draw_kind_and_restores_idle() {
        let (headless, gpu) = device();
        let shader = Shader::new(&gpu, "core", &ShaderSource::Core).unwrap();
        let mut pyramid = GeometryBuffer::from_mesh_data(&gpu, &Primitive::Pyramid.mesh_data()).unwrap();
        let mut cube = GeometryBuffer::from_mesh_data(&gpu, &Primitive::Cube.mesh_data()).unwrap();

        pyramid.render(&shader).unwrap();
        assert!(headless.borrow().bindings().is_idle());
        cube.render(&shader).unwrap();
        assert!(headless.borrow().bindings().is_idle());

        let hg = headless.borrow();
        let draws = hg.pending_draws();
        assert_eq!(draws.len(), 2);
        assert_eq!((draws[0].kind, draws[0].count), (DrawKind::Arrays, 12));
        assert_eq!((draws[1].kind, draws[1].count), (DrawKind::Elements, 36));
        assert_eq!(draws[0].bindings.vertex_array, Some(pyramid.vertex_array()));
        assert_eq!(draws[0].bindings.program, Some(shader.program()));
    }

    #[test]
    fn render_recomputes_model_matrix() {
        let (headless, gpu) = device();
        let shader = Shader::new(&gpu, "core", &ShaderSource::Core).unwrap();
        let mut mesh = GeometryBuffer::from_mesh_data(&gpu, &Primitive::Triangle.mesh_data()).unwrap();
        mesh.set_position(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(mesh.model_matrix(), Mat4::IDENTITY);

        mesh.render(&shader).unwrap();
        let expected = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        assert!(mesh.model_matrix().abs_diff_eq(expected, 1e-6));
        assert_eq!(
            headless.borrow().pending_draws()[0].uniform("ModelMatrix"),
            Some(UniformValue::Mat4(mesh.model_matrix()))
        );
    }

    #[test]
    fn rotation_is_applied_about_origin_after_scale() {
        let (headless, gpu) = device();
        let shader = Shader::new(&gpu, "core", &ShaderSource::Core).unwrap();
        let mut mesh = GeometryBuffer::from_mesh_data(&gpu, &Primitive::Quad.mesh_data()).unwrap();
        mesh.set_position(Vec3::new(1.0, 0.0, 0.0));
        mesh.set_scale(Vec3::splat(2.0));
        mesh.set_rotation(Vec3::new(0.0, 90.0, 0.0));
        assert_eq!(mesh.transform().rotation, Vec3::new(0.0, 90.0, 0.0));

        mesh.render(&shader).unwrap();
        let m = mesh.model_matrix();
        // scale (2,0,0), offset to (3,0,0), then a quarter turn about +y
        assert!(m.transform_point3(Vec3::X).abs_diff_eq(Vec3::new(0.0, 0.0, -3.0), 1e-5));
        assert!(m.transform_point3(Vec3::ZERO).abs_diff_eq(Vec3::new(0.0, 0.0, -1.0), 1e-5));

        mesh.set_rotation(Vec3::ZERO);
        mesh.render(&shader).unwrap();
        let expected = Mat4::from_translation(Vec3::X) * Mat4::from_scale(Vec3::splat(2.0));
        let draws = headless.borrow().pending_draws().to_vec();
        match draws[1].uniform("ModelMatrix") {
            Some(UniformValue::Mat4(m)) => assert!(m.abs_diff_eq(expected, 1e-6)),
            other => panic!("missing model matrix: {other:?}"),
        }
    }

    #[test]
    fn failed_draw_still_restores_idle() {
        let (headless, gpu) = device();
        let shader = Shader::new(&gpu, "core", &ShaderSource::Core).unwrap();
        let mut mesh = GeometryBuffer::from_mesh_data(&gpu, &Primitive::Quad.mesh_data()).unwrap();
        headless.borrow_mut().delete_buffer(mesh.index_buffer.unwrap()).unwrap();

        assert!(mesh.render(&shader).is_err());
        assert!(headless.borrow().bindings().is_idle());
        // Drop reports the already-deleted index buffer instead of panicking.
        drop(mesh);
        assert_eq!(headless.borrow().stats().failed_releases, 1);
    }

    #[test]
    fn rollback_keeps_releasing_after_a_failed_delete() {
        let (headless, _) = device();
        let mut hg = headless.borrow_mut();
        let vertex_array = hg.create_vertex_array().unwrap();
        let vertex_buffer = hg.create_buffer(BufferTarget::Vertex, &[0; 44]).unwrap();
        let index_buffer = hg.create_buffer(BufferTarget::Index, &[0; 4]).unwrap();
        hg.delete_buffer(index_buffer).unwrap();

        rollback(&mut *hg, vertex_array, Some(vertex_buffer), Some(index_buffer));
        assert_eq!(hg.live_resources(), 0);
        assert_eq!(hg.stats().failed_releases, 1);
    }

    #[test]
    fn try_clone_is_independent() {
        let (headless, gpu) = device();
        let mut original = GeometryBuffer::from_mesh_data(&gpu, &Primitive::Cube.mesh_data()).unwrap();
        original.set_scale(Vec3::splat(2.0));
        let mut copy = original.try_clone().unwrap();
        assert_ne!(copy.vertex_array(), original.vertex_array());
        assert_eq!(copy.transform(), original.transform());

        copy.translate(Vec3::X);
        copy.rotate(Vec3::Y);
        copy.scale_by(Vec3::ONE);
        assert_eq!(original.transform().position, Vec3::ZERO);
        assert_eq!(original.transform().scale, Vec3::splat(2.0));
        assert_eq!(copy.transform().scale, Vec3::splat(3.0));

        drop(original);
        assert_eq!(headless.borrow().live_resources(), 3);
    }
}
