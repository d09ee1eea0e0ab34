use crate::config::{ModelConfig, ModelSource};
use crate::{SceneAssets, SceneConfig, SceneError};
use glam::Vec3;
use ink_assets::Primitive;
use ink_common::Handle;
use ink_input::{Action, KeyBindings, MouseTracker, WindowSystem};
use ink_render::{
    Camera, DrawableObject, FrameUniforms, GeometryBuffer, Light, Projection, Shader, SharedGpu,
};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::rc::Rc;

/// A drawable plus the per-object settings the scene applies to it.
pub struct SceneObject {
    drawable: DrawableObject,
    shader: Handle<Shader>,
    spin: Option<Vec3>,
}

impl SceneObject {
    pub fn drawable(&self) -> &DrawableObject {
        &self.drawable
    }

    pub fn shader(&self) -> Handle<Shader> {
        self.shader
    }

    pub fn spin(&self) -> Option<Vec3> {
        self.spin
    }
}

/// Owns everything on screen and runs the update/render cycle.
pub struct Scene<W: WindowSystem> {
    // Declared first so drawables drop before the registries they reference.
    objects: Vec<SceneObject>,
    assets: SceneAssets,
    camera: Camera,
    constrain_pitch: bool,
    projection: Projection,
    light: Light,
    clear_color: [f32; 4],
    bindings: KeyBindings,
    mouse: MouseTracker,
    last_time: f64,
    dt: f32,
    frames: u64,
    last_frame: Option<FrameUniforms>,
    gpu: SharedGpu,
    window: W,
}

impl<W: WindowSystem> Scene<W> {
    /// Load assets, build every model and hook the window's resize callback
    /// up to the GPU viewport.
    pub fn new(mut window: W, gpu: SharedGpu, config: &SceneConfig) -> Result<Self, SceneError> {
        let light = match config.lights.as_slice() {
            [] => return Err(SceneError::NoLights),
            [first] => *first,
            [first, rest @ ..] => {
                tracing::warn!(ignored = rest.len(), "only the first light is used");
                *first
            }
        };

        let assets = SceneAssets::load(&gpu, config)?;
        let objects = build_objects(&gpu, config, &assets)?;

        let (width, height) = window.framebuffer_size();
        gpu.borrow_mut().set_viewport(width, height);
        let viewport_gpu = Rc::clone(&gpu);
        window.set_framebuffer_resize_callback(Box::new(move |w, h| {
            match viewport_gpu.try_borrow_mut() {
                Ok(mut gpu) => gpu.set_viewport(w, h),
                Err(_) => tracing::warn!(w, h, "gpu busy during resize, viewport not updated"),
            }
        }));

        let cam = &config.camera;
        let camera = Camera::new(cam.position, cam.direction, cam.world_up)
            .with_speed(cam.speed, cam.sensitivity);

        let backend = gpu.borrow().backend_name().to_string();
        tracing::info!(
            models = objects.len(),
            %backend,
            width,
            height,
            "scene ready"
        );
        let last_time = window.time();
        Ok(Self {
            objects,
            assets,
            camera,
            constrain_pitch: cam.constrain_pitch,
            projection: config.projection,
            light,
            clear_color: config.clear_color,
            bindings: config.bindings.clone(),
            mouse: MouseTracker::new(),
            last_time,
            dt: 0.0,
            frames: 0,
            last_frame: None,
            gpu,
            window,
        })
    }

    /// Input, delta time, camera and light, then spin.
    ///
    /// Time is sampled after polling so a clock that advances with event
    /// delivery is counted in the frame it belongs to.
    pub fn update(&mut self) {
        self.window.poll_events();

        let now = self.window.time();
        self.dt = (now - self.last_time) as f32;
        self.last_time = now;

        for action in self.bindings.active_actions(&self.window) {
            match action {
                Action::Quit => self.window.set_should_close(true),
                Action::MoveCamera(direction) => self.camera.move_in(self.dt, direction),
                Action::MoveLightToCamera => self.light.move_to(self.camera.position()),
            }
        }

        let offset = self.mouse.sample(self.window.cursor_position());
        self.camera
            .update_input(self.dt, self.constrain_pitch, offset.x, offset.y);

        for object in &mut self.objects {
            if let Some(spin) = object.spin {
                object.drawable.rotate(spin * self.dt);
            }
        }
    }

    /// Draw one frame and present it. Binding state is reset afterwards
    /// whether or not drawing succeeded.
    pub fn render(&mut self) -> Result<(), SceneError> {
        let result = self.draw_frame();
        self.gpu.borrow_mut().reset_bindings();
        result
    }

    fn draw_frame(&mut self) -> Result<(), SceneError> {
        self.gpu.borrow_mut().clear(self.clear_color);

        let frame = FrameUniforms::new(
            &self.camera,
            &self.projection,
            self.window.framebuffer_size(),
            &self.light,
        );
        for (_, shader) in self.assets.shaders().iter() {
            frame.apply(shader)?;
        }

        for object in &mut self.objects {
            let shader = self.assets.shaders().get(object.shader)?;
            object
                .drawable
                .render(shader, self.assets.materials(), self.assets.textures())?;
        }

        self.gpu.borrow_mut().present()?;
        self.frames += 1;
        self.last_frame = Some(frame);
        tracing::trace!(frame = self.frames, dt = self.dt, "frame presented");
        Ok(())
    }

    /// One update followed by one render.
    pub fn frame(&mut self) -> Result<(), SceneError> {
        self.update();
        self.render()
    }

    /// Run frames until the window asks to close. Returns the frames drawn.
    pub fn run(&mut self) -> Result<u64, SceneError> {
        self.run_frames(u64::MAX)
    }

    /// Run at most `limit` frames, stopping early on close.
    pub fn run_frames(&mut self, limit: u64) -> Result<u64, SceneError> {
        let start = self.frames;
        let mut run = 0;
        while run < limit && !self.window.should_close() {
            self.frame()?;
            run += 1;
        }
        tracing::debug!(frames = self.frames - start, "frame loop stopped");
        Ok(self.frames - start)
    }

    pub fn should_close(&self) -> bool {
        self.window.should_close()
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn light(&self) -> &Light {
        &self.light
    }

    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub fn object(&self, name: &str) -> Option<&SceneObject> {
        self.objects.iter().find(|o| o.drawable.name() == name)
    }

    pub fn assets(&self) -> &SceneAssets {
        &self.assets
    }

    /// Seconds between the two most recent updates.
    pub fn dt(&self) -> f32 {
        self.dt
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames
    }

    /// Frame-global uniforms of the most recently presented frame.
    pub fn last_frame(&self) -> Option<&FrameUniforms> {
        self.last_frame.as_ref()
    }

    pub fn window(&self) -> &W {
        &self.window
    }

    pub fn window_mut(&mut self) -> &mut W {
        &mut self.window
    }
}

/// Build the drawables. Primitive prototypes are uploaded once, shared by
/// every model that uses them, and released when this returns.
fn build_objects(
    gpu: &SharedGpu,
    config: &SceneConfig,
    assets: &SceneAssets,
) -> Result<Vec<SceneObject>, SceneError> {
    let mut prototypes: HashMap<Primitive, GeometryBuffer> = HashMap::new();
    let mut objects = Vec::with_capacity(config.models.len());
    for model in &config.models {
        let drawable = build_drawable(gpu, config, assets, model, &mut prototypes)?;
        let shader = match &model.shader {
            Some(name) => assets.shader(name)?,
            None => assets.default_shader(),
        };
        tracing::debug!(
            name = %model.name,
            meshes = drawable.meshes().len(),
            "model built"
        );
        objects.push(SceneObject {
            drawable,
            shader,
            spin: model.spin,
        });
    }
    Ok(objects)
}

fn build_drawable(
    gpu: &SharedGpu,
    config: &SceneConfig,
    assets: &SceneAssets,
    model: &ModelConfig,
    prototypes: &mut HashMap<Primitive, GeometryBuffer>,
) -> Result<DrawableObject, SceneError> {
    let material = assets.material(&model.material)?;
    let diffuse = assets.texture(&model.diffuse)?;
    let specular = assets.texture(&model.specular)?;
    let drawable = match &model.geometry {
        ModelSource::Primitive { shape } => {
            let prototype = match prototypes.entry(*shape) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    entry.insert(GeometryBuffer::from_mesh_data(gpu, &shape.mesh_data())?)
                }
            };
            DrawableObject::new(
                &model.name,
                model.position,
                material,
                diffuse,
                specular,
                std::slice::from_ref(&*prototype),
            )?
        }
        ModelSource::Obj { path } => DrawableObject::from_obj(
            gpu,
            &model.name,
            model.position,
            material,
            diffuse,
            specular,
            config.resolve(path),
        )?,
    };
    Ok(drawable)
}
