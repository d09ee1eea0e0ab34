use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ink_input::{HeadlessWindow, WindowSystem};
use ink_render::{DrawCall, DrawKind, Gpu, HeadlessGpu, SharedGpu, UniformValue};
use ink_scene::{Scene, SceneConfig};
use serde::Serialize;
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ink-cli", about = "Headless tools for ink scenes")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// Print the built-in demo scene as YAML
    DefaultScene,
    /// Load a scene and build it on the headless device without drawing
    Check {
        /// YAML scene file; the built-in demo scene when omitted
        #[arg(short, long)]
        scene: Option<PathBuf>,
    },
    /// Drive frames on the headless window and device, then report the last one
    Run {
        /// YAML scene file; the built-in demo scene when omitted
        #[arg(short, long)]
        scene: Option<PathBuf>,
        /// Number of frames to run
        #[arg(short, long, default_value = "60")]
        frames: u64,
        /// Simulated seconds per frame
        #[arg(long, default_value = "0.016666")]
        step: f64,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct DrawReport {
    kind: &'static str,
    count: u32,
    translation: Option<[f32; 3]>,
    diffuse_texture: Option<String>,
    specular_texture: Option<String>,
}

#[derive(Serialize)]
struct RunReport {
    frames: u64,
    camera_position: [f32; 3],
    light_position: [f32; 3],
    viewport: (u32, u32),
    draws: Vec<DrawReport>,
    bindings_idle: bool,
    live_resources: usize,
}

impl DrawReport {
    fn from_call(call: &DrawCall) -> Self {
        let translation = match call.uniform("ModelMatrix") {
            Some(UniformValue::Mat4(m)) => Some(m.w_axis.truncate().to_array()),
            _ => None,
        };
        Self {
            kind: match call.kind {
                DrawKind::Arrays => "arrays",
                DrawKind::Elements => "elements",
            },
            count: call.count,
            translation,
            diffuse_texture: call.bindings.texture_at(0).map(|t| t.to_string()),
            specular_texture: call.bindings.texture_at(1).map(|t| t.to_string()),
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<SceneConfig> {
    match path {
        Some(path) => SceneConfig::load(path)
            .with_context(|| format!("loading scene file {}", path.display())),
        None => Ok(SceneConfig::default()),
    }
}

fn headless_scene(
    config: &SceneConfig,
    step: f64,
) -> Result<(Rc<RefCell<HeadlessGpu>>, Scene<HeadlessWindow>)> {
    let headless = Rc::new(RefCell::new(HeadlessGpu::new(
        config.window.width,
        config.window.height,
    )));
    let gpu: SharedGpu = headless.clone();
    let window = HeadlessWindow::new(config.window.clone()).with_fixed_step(step);
    let scene = Scene::new(window, gpu, config).context("building scene")?;
    Ok((headless, scene))
}

fn run(config: &SceneConfig, frames: u64, step: f64) -> Result<RunReport> {
    let (headless, mut scene) = headless_scene(config, step)?;
    let ran = scene.run_frames(frames).context("running frames")?;
    tracing::debug!(frames = ran, "headless run finished");

    let hg = headless.borrow();
    Ok(RunReport {
        frames: ran,
        camera_position: scene.camera().position().to_array(),
        light_position: scene.light().position.to_array(),
        viewport: scene.window().framebuffer_size(),
        draws: hg.last_frame().iter().map(DrawReport::from_call).collect(),
        bindings_idle: hg.bindings().is_idle(),
        live_resources: hg.live_resources(),
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("ink-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("common: {}", ink_common::crate_info());
            println!("assets: {}", ink_assets::crate_info());
            println!("input: {}", ink_input::crate_info());
            println!("render: {}", ink_render::crate_info());
            println!("render-wgpu: {}", ink_render_wgpu::crate_info());
            println!("scene: {}", ink_scene::crate_info());
        }
        Commands::DefaultScene => {
            print!("{}", SceneConfig::default().to_yaml()?);
        }
        Commands::Check { scene } => {
            let config = load_config(scene.as_deref())?;
            let (headless, scene) = headless_scene(&config, 0.0)?;
            let assets = scene.assets();
            println!(
                "OK: {} models, {} shaders, {} textures, {} materials, {} GPU resources",
                scene.objects().len(),
                assets.shaders().len(),
                assets.textures().len(),
                assets.materials().len(),
                headless.borrow().live_resources()
            );
        }
        Commands::Run {
            scene,
            frames,
            step,
            json,
        } => {
            let config = load_config(scene.as_deref())?;
            let report = run(&config, frames, step)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "frames={} viewport={}x{} idle={} live_resources={}",
                    report.frames,
                    report.viewport.0,
                    report.viewport.1,
                    report.bindings_idle,
                    report.live_resources
                );
                println!(
                    "camera={:?} light={:?}",
                    report.camera_position, report.light_position
                );
                for (i, draw) in report.draws.iter().enumerate() {
                    println!(
                        "draw {i}: {} count={} at {:?} diffuse={} specular={}",
                        draw.kind,
                        draw.count,
                        draw.translation.unwrap_or_default(),
                        draw.diffuse_texture.as_deref().unwrap_or("-"),
                        draw.specular_texture.as_deref().unwrap_or("-"),
                    );
                }
            }
        }
    }

    Ok(())
}
