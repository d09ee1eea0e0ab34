use crate::shaders;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use ink_assets::TextureImage;
use ink_common::Vertex;
use ink_render::{
    BindingState, BufferId, BufferTarget, Gpu, GpuError, ProgramId, ShaderSource, TextureId,
    UniformValue, VertexArrayId,
};
use std::collections::{HashMap, HashSet};
use std::num::NonZeroU64;
use wgpu::util::DeviceExt;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24PlusStencil8;

/// Per-draw uniform block, laid out to match `Uniforms` in the core shader.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
struct CoreUniforms {
    model: [[f32; 4]; 4],
    view: [[f32; 4]; 4],
    projection: [[f32; 4]; 4],
    camera_pos: [f32; 4],
    light_pos: [f32; 4],
    ambient: [f32; 4],
    diffuse: [f32; 4],
    specular: [f32; 4],
}

impl Default for CoreUniforms {
    fn default() -> Self {
        Self {
            model: Mat4::IDENTITY.to_cols_array_2d(),
            view: Mat4::IDENTITY.to_cols_array_2d(),
            projection: Mat4::IDENTITY.to_cols_array_2d(),
            camera_pos: [0.0, 0.0, 0.0, 1.0],
            light_pos: [0.0, 0.0, 0.0, 1.0],
            ambient: [0.0; 4],
            diffuse: [0.0; 4],
            specular: [0.0; 4],
        }
    }
}

impl CoreUniforms {
    /// Store a named value. Returns `false` if the block has no such field.
    fn set(&mut self, name: &str, value: UniformValue) -> bool {
        let point = |v: Vec3| v.extend(1.0).to_array();
        match (name, value) {
            ("ModelMatrix", UniformValue::Mat4(m)) => self.model = m.to_cols_array_2d(),
            ("ViewMatrix", UniformValue::Mat4(m)) => self.view = m.to_cols_array_2d(),
            ("ProjectionMatrix", UniformValue::Mat4(m)) => {
                self.projection = m.to_cols_array_2d()
            }
            ("cameraPos", UniformValue::Vec3(v)) => self.camera_pos = point(v),
            ("lightPos0", UniformValue::Vec3(v)) => self.light_pos = point(v),
            ("material.ambient", UniformValue::Vec3(v)) => self.ambient = point(v),
            ("material.diffuse", UniformValue::Vec3(v)) => self.diffuse = point(v),
            ("material.specular", UniformValue::Vec3(v)) => self.specular = point(v),
            _ => return false,
        }
        true
    }
}

fn align_to(size: u64, alignment: u64) -> u64 {
    size.div_ceil(alignment) * alignment
}

type TexturePair = (Option<TextureId>, Option<TextureId>);

#[derive(Default)]
struct VertexArrayRecord {
    vertices: Option<BufferId>,
    indices: Option<BufferId>,
}

struct BufferRecord {
    buffer: wgpu::Buffer,
    elements: u32,
}

struct ProgramRecord {
    pipeline: wgpu::RenderPipeline,
    uniforms: CoreUniforms,
    diffuse_unit: u32,
    specular_unit: u32,
}

struct TextureRecord {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

struct QueuedDraw {
    program: ProgramId,
    vertices: BufferId,
    indices: Option<BufferId>,
    count: u32,
    uniforms: CoreUniforms,
    textures: TexturePair,
}

/// [`Gpu`] implementation over a wgpu surface.
pub struct WgpuGpu {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    adapter_info: wgpu::AdapterInfo,
    depth_view: wgpu::TextureView,
    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    uniform_capacity: u64,
    uniform_stride: u64,
    sampler: wgpu::Sampler,
    fallback: TextureRecord,
    next_id: u64,
    vertex_arrays: HashMap<VertexArrayId, VertexArrayRecord>,
    buffers: HashMap<BufferId, BufferRecord>,
    programs: HashMap<ProgramId, ProgramRecord>,
    textures: HashMap<TextureId, TextureRecord>,
    texture_groups: HashMap<TexturePair, wgpu::BindGroup>,
    bindings: BindingState,
    clear_color: wgpu::Color,
    queued: Vec<QueuedDraw>,
    warned_uniforms: HashSet<String>,
}

impl WgpuGpu {
    /// Create a device for `target` and configure its surface at
    /// `width` x `height`.
    pub fn new(
        target: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
    ) -> Result<Self, GpuError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(target)
            .map_err(|e| GpuError::Surface(e.to_string()))?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| GpuError::ResourceCreation("no compatible GPU adapter".to_string()))?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("ink_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .map_err(|e| GpuError::ResourceCreation(e.to_string()))?;
        device.on_uncaptured_error(Box::new(|err| {
            tracing::error!(%err, "uncaptured wgpu error");
        }));

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or_else(|| GpuError::Surface("surface reports no formats".to_string()))?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let uniform_size = std::mem::size_of::<CoreUniforms>() as u64;
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("uniform_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(uniform_size),
                },
                count: None,
            }],
        });

        let texture_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("texture_bind_group_layout"),
            entries: &[
                texture_entry(0),
                texture_entry(1),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("core_pipeline_layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let uniform_stride = align_to(
            uniform_size,
            u64::from(device.limits().min_uniform_buffer_offset_alignment),
        );
        let uniform_capacity = uniform_stride * 64;
        let uniform_buffer = create_uniform_buffer(&device, uniform_capacity);
        let uniform_bind_group =
            create_uniform_bind_group(&device, &uniform_layout, &uniform_buffer, uniform_size);

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("texture_sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let fallback = upload_texture(&device, &queue, &TextureImage::solid([255; 4]), "fallback");
        let depth_view = create_depth_texture(&device, config.width, config.height);
        let adapter_info = adapter.get_info();

        tracing::info!(
            "GPU initialized with {} backend ({})",
            adapter_info.backend.to_str(),
            adapter_info.name
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            adapter_info,
            depth_view,
            uniform_layout,
            texture_layout,
            pipeline_layout,
            uniform_buffer,
            uniform_bind_group,
            uniform_capacity,
            uniform_stride,
            sampler,
            fallback,
            next_id: 1,
            vertex_arrays: HashMap::new(),
            buffers: HashMap::new(),
            programs: HashMap::new(),
            textures: HashMap::new(),
            texture_groups: HashMap::new(),
            bindings: BindingState::default(),
            clear_color: wgpu::Color::BLACK,
            queued: Vec::new(),
            warned_uniforms: HashSet::new(),
        })
    }

    pub fn adapter_info(&self) -> &wgpu::AdapterInfo {
        &self.adapter_info
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    fn allocate(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn build_pipeline(&self, source: &ShaderSource) -> wgpu::RenderPipeline {
        let module = |label: &str, source: &str| {
            self.device
                .create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(label),
                    source: wgpu::ShaderSource::Wgsl(source.into()),
                })
        };
        let (vertex_module, fragment_module) = match source {
            ShaderSource::Core => (
                module("core_vertex", shaders::CORE_SHADER),
                module("core_fragment", shaders::CORE_SHADER),
            ),
            ShaderSource::Custom { vertex, fragment } => (
                module("custom_vertex", vertex),
                module("custom_fragment", fragment),
            ),
        };

        self.device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("core_pipeline"),
                layout: Some(&self.pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &vertex_module,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: Vertex::STRIDE as u64,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &wgpu::vertex_attr_array![
                            0 => Float32x3,
                            1 => Float32x3,
                            2 => Float32x2,
                            3 => Float32x3,
                        ],
                    }],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &fragment_module,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.config.format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: Some(wgpu::Face::Back),
                    polygon_mode: wgpu::PolygonMode::Fill,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: Default::default(),
                    bias: Default::default(),
                }),
                multisample: Default::default(),
                multiview: None,
                cache: None,
            })
    }

    fn unknown<T>(kind: &'static str, id: u64) -> Result<T, GpuError> {
        Err(GpuError::UnknownResource { kind, id })
    }

    /// Buffers attached to the bound vertex array.
    fn bound_buffers(&self) -> Result<(BufferId, Option<BufferId>), GpuError> {
        let id = self
            .bindings
            .vertex_array
            .ok_or(GpuError::NoVertexArrayBound)?;
        let record = self
            .vertex_arrays
            .get(&id)
            .ok_or(GpuError::UnknownResource {
                kind: VertexArrayId::KIND,
                id: id.raw(),
            })?;
        let vertices = record
            .vertices
            .ok_or(GpuError::IncompleteVertexArray(id.raw()))?;
        Ok((vertices, record.indices))
    }

    fn elements(&self, id: BufferId) -> Result<u32, GpuError> {
        self.buffers
            .get(&id)
            .map(|b| b.elements)
            .ok_or(GpuError::UnknownResource {
                kind: BufferId::KIND,
                id: id.raw(),
            })
    }

    fn queue_draw(
        &mut self,
        vertices: BufferId,
        indices: Option<BufferId>,
        count: u32,
        available: u32,
    ) -> Result<(), GpuError> {
        if count > available {
            return Err(GpuError::DrawOutOfRange { count, available });
        }
        let program_id = self.bindings.program.ok_or(GpuError::NoProgramBound)?;
        let program = self
            .programs
            .get(&program_id)
            .ok_or(GpuError::UnknownResource {
                kind: ProgramId::KIND,
                id: program_id.raw(),
            })?;
        let textures = (
            self.bindings.texture_at(program.diffuse_unit),
            self.bindings.texture_at(program.specular_unit),
        );
        self.queued.push(QueuedDraw {
            program: program_id,
            vertices,
            indices,
            count,
            uniforms: program.uniforms,
            textures,
        });
        Ok(())
    }

    fn upload_uniforms(&mut self, draws: &[QueuedDraw]) {
        if draws.is_empty() {
            return;
        }
        let stride = self.uniform_stride as usize;
        let needed = (draws.len() * stride) as u64;
        if needed > self.uniform_capacity {
            self.uniform_capacity = needed.next_power_of_two();
            self.uniform_buffer = create_uniform_buffer(&self.device, self.uniform_capacity);
            self.uniform_bind_group = create_uniform_bind_group(
                &self.device,
                &self.uniform_layout,
                &self.uniform_buffer,
                std::mem::size_of::<CoreUniforms>() as u64,
            );
            tracing::debug!(capacity = self.uniform_capacity, "uniform buffer grown");
        }
        let mut bytes = vec![0u8; draws.len() * stride];
        for (chunk, draw) in bytes.chunks_mut(stride).zip(draws) {
            let block = bytemuck::bytes_of(&draw.uniforms);
            chunk[..block.len()].copy_from_slice(block);
        }
        self.queue.write_buffer(&self.uniform_buffer, 0, &bytes);
    }

    fn ensure_texture_group(&mut self, pair: TexturePair) {
        if self.texture_groups.contains_key(&pair) {
            return;
        }
        let view = |id: Option<TextureId>| {
            id.and_then(|id| self.textures.get(&id))
                .map_or(&self.fallback.view, |t| &t.view)
        };
        let group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("texture_bind_group"),
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view(pair.0)),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(view(pair.1)),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });
        self.texture_groups.insert(pair, group);
    }

    fn encode(&self, draws: &[QueuedDraw], target: &wgpu::TextureView) -> wgpu::CommandBuffer {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame_encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(0),
                        store: wgpu::StoreOp::Store,
                    }),
                }),
                ..Default::default()
            });

            for (i, draw) in draws.iter().enumerate() {
                let (Some(program), Some(vertices), Some(textures)) = (
                    self.programs.get(&draw.program),
                    self.buffers.get(&draw.vertices),
                    self.texture_groups.get(&draw.textures),
                ) else {
                    tracing::warn!(program = %draw.program, "skipping draw whose resources were released");
                    continue;
                };
                let offset = (i as u64 * self.uniform_stride) as u32;
                pass.set_pipeline(&program.pipeline);
                pass.set_bind_group(0, &self.uniform_bind_group, &[offset]);
                pass.set_bind_group(1, textures, &[]);
                pass.set_vertex_buffer(0, vertices.buffer.slice(..));
                match draw.indices {
                    None => pass.draw(0..draw.count, 0..1),
                    Some(id) => {
                        let Some(indices) = self.buffers.get(&id) else {
                            tracing::warn!(buffer = %id, "skipping draw with released index buffer");
                            continue;
                        };
                        pass.set_index_buffer(indices.buffer.slice(..), wgpu::IndexFormat::Uint32);
                        pass.draw_indexed(0..draw.count, 0, 0..1);
                    }
                }
            }
        }
        encoder.finish()
    }
}

impl Gpu for WgpuGpu {
    fn backend_name(&self) -> &str {
        self.adapter_info.backend.to_str()
    }

    fn create_vertex_array(&mut self) -> Result<VertexArrayId, GpuError> {
        let id = VertexArrayId::from_raw(self.allocate());
        self.vertex_arrays.insert(id, VertexArrayRecord::default());
        Ok(id)
    }

    fn delete_vertex_array(&mut self, id: VertexArrayId) -> Result<(), GpuError> {
        if self.vertex_arrays.remove(&id).is_none() {
            return Self::unknown(VertexArrayId::KIND, id.raw());
        }
        if self.bindings.vertex_array == Some(id) {
            self.bindings.vertex_array = None;
        }
        Ok(())
    }

    fn create_buffer(&mut self, target: BufferTarget, data: &[u8]) -> Result<BufferId, GpuError> {
        if data.is_empty() {
            return Err(GpuError::ResourceCreation(format!(
                "{target:?} buffer with no data"
            )));
        }
        let (usage, element_size, label) = match target {
            BufferTarget::Vertex => (wgpu::BufferUsages::VERTEX, Vertex::STRIDE, "vertex_buffer"),
            BufferTarget::Index => (
                wgpu::BufferUsages::INDEX,
                std::mem::size_of::<u32>(),
                "index_buffer",
            ),
        };
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: data,
                usage,
            });
        let id = BufferId::from_raw(self.allocate());
        self.buffers.insert(
            id,
            BufferRecord {
                buffer,
                elements: (data.len() / element_size) as u32,
            },
        );
        Ok(id)
    }

    fn delete_buffer(&mut self, id: BufferId) -> Result<(), GpuError> {
        match self.buffers.remove(&id) {
            Some(record) => {
                record.buffer.destroy();
                Ok(())
            }
            None => Self::unknown(BufferId::KIND, id.raw()),
        }
    }

    fn attach_buffers(
        &mut self,
        vertex_array: VertexArrayId,
        vertices: BufferId,
        indices: Option<BufferId>,
    ) -> Result<(), GpuError> {
        for buffer in std::iter::once(vertices).chain(indices) {
            if !self.buffers.contains_key(&buffer) {
                return Self::unknown(BufferId::KIND, buffer.raw());
            }
        }
        let Some(record) = self.vertex_arrays.get_mut(&vertex_array) else {
            return Self::unknown(VertexArrayId::KIND, vertex_array.raw());
        };
        record.vertices = Some(vertices);
        record.indices = indices;
        Ok(())
    }

    fn create_program(&mut self, source: &ShaderSource) -> Result<ProgramId, GpuError> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = self.build_pipeline(source);
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(GpuError::ResourceCreation(format!("shader program: {err}")));
        }
        let id = ProgramId::from_raw(self.allocate());
        self.programs.insert(
            id,
            ProgramRecord {
                pipeline,
                uniforms: CoreUniforms::default(),
                diffuse_unit: 0,
                specular_unit: 1,
            },
        );
        Ok(id)
    }

    fn delete_program(&mut self, id: ProgramId) -> Result<(), GpuError> {
        if self.programs.remove(&id).is_none() {
            return Self::unknown(ProgramId::KIND, id.raw());
        }
        if self.bindings.program == Some(id) {
            self.bindings.program = None;
        }
        Ok(())
    }

    fn create_texture(&mut self, image: &TextureImage) -> Result<TextureId, GpuError> {
        let id = TextureId::from_raw(self.allocate());
        let record = upload_texture(&self.device, &self.queue, image, "texture");
        self.textures.insert(id, record);
        Ok(id)
    }

    fn delete_texture(&mut self, id: TextureId) -> Result<(), GpuError> {
        if self.textures.remove(&id).is_none() {
            return Self::unknown(TextureId::KIND, id.raw());
        }
        self.bindings.forget_texture(id);
        self.texture_groups
            .retain(|(diffuse, specular), _| *diffuse != Some(id) && *specular != Some(id));
        Ok(())
    }

    fn bind_vertex_array(&mut self, id: Option<VertexArrayId>) -> Result<(), GpuError> {
        if let Some(id) = id {
            if !self.vertex_arrays.contains_key(&id) {
                return Self::unknown(VertexArrayId::KIND, id.raw());
            }
        }
        self.bindings.vertex_array = id;
        Ok(())
    }

    fn use_program(&mut self, id: Option<ProgramId>) -> Result<(), GpuError> {
        if let Some(id) = id {
            if !self.programs.contains_key(&id) {
                return Self::unknown(ProgramId::KIND, id.raw());
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
                return Self::unknown(TextureId::KIND, id.raw());
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
        let Some(record) = self.programs.get_mut(&program) else {
            return Self::unknown(ProgramId::KIND, program.raw());
        };
        let stored = match (name, value) {
            ("material.diffuseTex", UniformValue::I32(unit)) => u32::try_from(unit)
                .map(|unit| record.diffuse_unit = unit)
                .is_ok(),
            ("material.specularTex", UniformValue::I32(unit)) => u32::try_from(unit)
                .map(|unit| record.specular_unit = unit)
                .is_ok(),
            _ => record.uniforms.set(name, value),
        };
        if !stored && self.warned_uniforms.insert(name.to_string()) {
            tracing::warn!(uniform = name, ?value, "uniform not in the core layout; ignored");
        }
        Ok(())
    }

    fn draw_arrays(&mut self, count: u32) -> Result<(), GpuError> {
        let (vertices, _) = self.bound_buffers()?;
        let available = self.elements(vertices)?;
        self.queue_draw(vertices, None, count, available)
    }

    fn draw_elements(&mut self, count: u32) -> Result<(), GpuError> {
        let (vertices, indices) = self.bound_buffers()?;
        let vertex_array = self.bindings.vertex_array.map_or(0, VertexArrayId::raw);
        let indices = indices.ok_or(GpuError::IncompleteVertexArray(vertex_array))?;
        let available = self.elements(indices)?;
        self.queue_draw(vertices, Some(indices), count, available)
    }

    fn clear(&mut self, color: [f32; 4]) {
        self.clear_color = wgpu::Color {
            r: f64::from(color[0]),
            g: f64::from(color[1]),
            b: f64::from(color[2]),
            a: f64::from(color[3]),
        };
        self.queued.clear();
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.config.width = width.max(1);
        self.config.height = height.max(1);
        self.surface.configure(&self.device, &self.config);
        self.depth_view = create_depth_texture(&self.device, self.config.width, self.config.height);
        tracing::debug!(width, height, "surface resized");
    }

    fn present(&mut self) -> Result<(), GpuError> {
        let draws = std::mem::take(&mut self.queued);
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                tracing::warn!("surface lost; reconfiguring and skipping frame");
                self.surface.configure(&self.device, &self.config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                tracing::warn!("surface timed out; skipping frame");
                return Ok(());
            }
            Err(e) => return Err(GpuError::Surface(e.to_string())),
        };

        self.upload_uniforms(&draws);
        for draw in &draws {
            self.ensure_texture_group(draw.textures);
        }
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let commands = self.encode(&draws, &view);
        self.queue.submit(std::iter::once(commands));
        frame.present();
        tracing::trace!(draws = draws.len(), "frame presented");
        Ok(())
    }

    fn bindings(&self) -> &BindingState {
        &self.bindings
    }

    fn reset_bindings(&mut self) {
        self.bindings.reset();
    }
}

fn create_uniform_buffer(device: &wgpu::Device, size: u64) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("uniform_buffer"),
        size,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_uniform_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    buffer: &wgpu::Buffer,
    block_size: u64,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("uniform_bind_group"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer,
                offset: 0,
                size: NonZeroU64::new(block_size),
            }),
        }],
    })
}

fn upload_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    image: &TextureImage,
    label: &str,
) -> TextureRecord {
    let size = wgpu::Extent3d {
        width: image.width(),
        height: image.height(),
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        image.pixels(),
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * image.width()),
            rows_per_image: Some(image.height()),
        },
        size,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    TextureRecord {
        _texture: texture,
        view,
    }
}

fn create_depth_texture(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("depth_texture"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&Default::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_block_matches_shader_layout() {
        // 3 mat4 + 5 vec4
        assert_eq!(std::mem::size_of::<CoreUniforms>(), 3 * 64 + 5 * 16);
        assert_eq!(std::mem::size_of::<CoreUniforms>() % 16, 0);
    }

    #[test]
    fn stride_respects_offset_alignment() {
        assert_eq!(align_to(272, 256), 512);
        assert_eq!(align_to(256, 256), 256);
        assert_eq!(align_to(1, 64), 64);
    }

    #[test]
    fn named_uniforms_land_in_their_fields() {
        let mut u = CoreUniforms::default();
        let m = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        assert!(u.set("ModelMatrix", UniformValue::Mat4(m)));
        assert!(u.set("lightPos0", UniformValue::Vec3(Vec3::new(0.0, 0.0, 1.0))));
        assert!(u.set("material.specular", UniformValue::Vec3(Vec3::splat(2.0))));
        assert_eq!(u.model, m.to_cols_array_2d());
        assert_eq!(u.light_pos, [0.0, 0.0, 1.0, 1.0]);
        assert_eq!(u.specular, [2.0, 2.0, 2.0, 1.0]);
    }

    #[test]
    fn unknown_or_mistyped_uniforms_are_rejected() {
        let mut u = CoreUniforms::default();
        assert!(!u.set("fogDensity", UniformValue::F32(0.5)));
        assert!(!u.set("ModelMatrix", UniformValue::Vec3(Vec3::ONE)));
        assert_eq!(u, CoreUniforms::default());
    }

    #[test]
    fn shader_declares_entry_points_and_bindings() {
        assert!(shaders::CORE_SHADER.contains("fn vs_main"));
        assert!(shaders::CORE_SHADER.contains("fn fs_main"));
        assert!(shaders::CORE_SHADER.contains("@group(1) @binding(2)"));
    }

    #[test]
    fn depth_target_carries_a_stencil_aspect() {
        // The frame clears stencil alongside depth, which needs both aspects.
        assert!(DEPTH_FORMAT.has_depth_aspect());
        assert!(DEPTH_FORMAT.has_stencil_aspect());
    }
}
