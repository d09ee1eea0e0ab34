mod window;

use anyhow::{Context, Result};
use clap::Parser;
use ink_render::SharedGpu;
use ink_render_wgpu::WgpuGpu;
use ink_scene::{Scene, SceneConfig};
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use window::WinitWindow;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{DeviceEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

#[derive(Parser)]
#[command(name = "ink-desktop", about = "Real-time 3D scene viewer")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// YAML scene file; the built-in demo scene when omitted
    #[arg(short, long)]
    scene: Option<PathBuf>,

    /// Window width override
    #[arg(long)]
    width: Option<u32>,

    /// Window height override
    #[arg(long)]
    height: Option<u32>,

    /// Window title override
    #[arg(long)]
    title: Option<String>,
}

impl Cli {
    fn scene_config(&self) -> Result<SceneConfig> {
        let mut config = match &self.scene {
            Some(path) => SceneConfig::load(path)
                .with_context(|| format!("loading scene file {}", path.display()))?,
            None => SceneConfig::default(),
        };
        if let Some(width) = self.width {
            config.window.width = width;
        }
        if let Some(height) = self.height {
            config.window.height = height;
        }
        if let Some(title) = &self.title {
            config.window.title = title.clone();
        }
        Ok(config)
    }
}

struct InkApp {
    config: SceneConfig,
    scene: Option<Scene<WinitWindow>>,
    error: Option<anyhow::Error>,
}

impl InkApp {
    fn new(config: SceneConfig) -> Self {
        Self {
            config,
            scene: None,
            error: None,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let settings = &self.config.window;
        let attrs = Window::default_attributes()
            .with_title(settings.title.clone())
            .with_inner_size(PhysicalSize::new(settings.width, settings.height))
            .with_resizable(settings.resizable);
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("creating window")?,
        );

        let size = window.inner_size();
        let gpu = WgpuGpu::new(window.clone(), size.width, size.height)
            .context("initializing GPU")?;
        tracing::info!(
            adapter = %gpu.adapter_info().name,
            backend = gpu.adapter_info().backend.to_str(),
            format = ?gpu.surface_format(),
            "GPU initialized"
        );
        let gpu: SharedGpu = Rc::new(RefCell::new(gpu));

        let scene = Scene::new(WinitWindow::new(window), gpu, &self.config)
            .context("building scene")?;
        self.scene = Some(scene);
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        tracing::error!("{err:#}");
        self.error = Some(err);
        // Release GPU objects while the window still exists.
        self.scene = None;
        event_loop.exit();
    }
}

impl ApplicationHandler for InkApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.scene.is_some() {
            return;
        }
        if let Err(err) = self.init(event_loop) {
            self.fail(event_loop, err);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(scene) = self.scene.as_mut() else {
            return;
        };
        if let WindowEvent::RedrawRequested = event {
            if let Err(err) = scene.frame() {
                self.fail(event_loop, err.into());
                return;
            }
            if scene.should_close() {
                tracing::info!(frames = scene.frames_rendered(), "closing");
                self.scene = None;
                event_loop.exit();
            }
            return;
        }
        scene.window_mut().handle_window_event(&event);
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: winit::event::DeviceId,
        event: DeviceEvent,
    ) {
        if let Some(scene) = self.scene.as_mut() {
            scene.window_mut().handle_device_event(&event);
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(scene) = &self.scene {
            scene.window().request_redraw();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    tracing::info!("ink-desktop starting");
    let config = cli.scene_config()?;

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = InkApp::new(config);
    event_loop.run_app(&mut app)?;

    match app.error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
