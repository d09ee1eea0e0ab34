use crate::SceneError;
use glam::Vec3;
use ink_assets::{Primitive, TextureImage};
use ink_input::{KeyBindings, WindowConfig};
use ink_render::{Light, Material, Projection, ShaderSource};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Everything needed to build a [`Scene`](crate::Scene), as read from a YAML
/// scene file.
///
/// Missing sections fall back to [`SceneConfig::default`], which is the
/// built-in demo scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub window: WindowConfig,
    pub camera: CameraConfig,
    pub projection: Projection,
    pub clear_color: [f32; 4],
    pub bindings: KeyBindings,
    pub shaders: Vec<ShaderConfig>,
    pub textures: Vec<TextureConfig>,
    pub materials: Vec<MaterialConfig>,
    pub lights: Vec<Light>,
    pub models: Vec<ModelConfig>,
    /// Directory relative asset paths resolve against. Set by [`SceneConfig::load`].
    #[serde(skip)]
    pub asset_root: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: Vec3,
    pub direction: Vec3,
    pub world_up: Vec3,
    pub speed: f32,
    pub sensitivity: f32,
    pub constrain_pitch: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 1.0),
            direction: Vec3::NEG_Z,
            world_up: Vec3::Y,
            speed: ink_render::camera::DEFAULT_SPEED,
            sensitivity: ink_render::camera::DEFAULT_SENSITIVITY,
            constrain_pitch: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShaderConfig {
    pub name: String,
    pub source: ShaderFiles,
}

/// Where a shader program's code comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShaderFiles {
    /// The backend's built-in lit, textured program.
    Core,
    Files { vertex: PathBuf, fragment: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureConfig {
    pub name: String,
    pub source: TextureSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TextureSource {
    File { path: PathBuf },
    Solid { color: [u8; 4] },
    Checker {
        size: u32,
        cells: u32,
        a: [u8; 4],
        b: [u8; 4],
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialConfig {
    pub name: String,
    #[serde(default)]
    pub material: Material,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    #[serde(default)]
    pub position: Vec3,
    pub material: String,
    pub diffuse: String,
    pub specular: String,
    /// Shader to draw with. Defaults to the first shader in the file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shader: Option<String>,
    pub geometry: ModelSource,
    /// Degrees per second per axis, applied every update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spin: Option<Vec3>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelSource {
    Primitive { shape: Primitive },
    Obj { path: PathBuf },
}

impl SceneConfig {
    /// Read a YAML scene file. Relative asset paths in it resolve against the
    /// file's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SceneError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| SceneError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self = serde_yaml::from_reader(file)?;
        config.asset_root = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        tracing::info!(
            path = %path.display(),
            models = config.models.len(),
            "loaded scene file"
        );
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SceneError> {
        let path = path.as_ref();
        let file = std::fs::File::create(path).map_err(|source| SceneError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::to_writer(file, self)?;
        Ok(())
    }

    pub fn from_yaml(text: &str) -> Result<Self, SceneError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn to_yaml(&self) -> Result<String, SceneError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Resolve a path from the scene file against [`Self::asset_root`].
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.asset_root.join(path)
        }
    }

    pub fn shader_source(&self, files: &ShaderFiles) -> Result<ShaderSource, SceneError> {
        match files {
            ShaderFiles::Core => Ok(ShaderSource::Core),
            ShaderFiles::Files { vertex, fragment } => {
                let vertex = self.resolve(vertex);
                let fragment = self.resolve(fragment);
                ShaderSource::load(&vertex, &fragment).map_err(|source| SceneError::Io {
                    path: vertex,
                    source,
                })
            }
        }
    }

    pub fn texture_image(&self, source: &TextureSource) -> Result<TextureImage, SceneError> {
        Ok(match source {
            TextureSource::File { path } => TextureImage::load(self.resolve(path))?,
            TextureSource::Solid { color } => TextureImage::solid(*color),
            TextureSource::Checker { size, cells, a, b } => {
                TextureImage::checker(*size, *cells, *a, *b)
            }
        })
    }
}

const CRATE_BROWN: [u8; 4] = [150, 101, 52, 255];
const CRATE_DARK: [u8; 4] = [94, 60, 28, 255];
const PANEL_LIGHT: [u8; 4] = [214, 208, 196, 255];
const PANEL_DARK: [u8; 4] = [58, 74, 110, 255];

fn model(
    name: &str,
    position: Vec3,
    diffuse: &str,
    specular: &str,
    shape: Primitive,
) -> ModelConfig {
    ModelConfig {
        name: name.to_string(),
        position,
        material: "default".to_string(),
        diffuse: diffuse.to_string(),
        specular: specular.to_string(),
        shader: None,
        geometry: ModelSource::Primitive { shape },
        spin: None,
    }
}

fn texture(name: &str, source: TextureSource) -> TextureConfig {
    TextureConfig {
        name: name.to_string(),
        source,
    }
}

impl Default for SceneConfig {
    /// Three textured pyramids and a cube, lit by one light at the camera
    /// start. Needs no asset files.
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            camera: CameraConfig::default(),
            projection: Projection::default(),
            clear_color: [0.0, 0.0, 0.0, 1.0],
            bindings: KeyBindings::default(),
            shaders: vec![ShaderConfig {
                name: "core".to_string(),
                source: ShaderFiles::Core,
            }],
            textures: vec![
                texture(
                    "crate",
                    TextureSource::Checker {
                        size: 64,
                        cells: 4,
                        a: CRATE_BROWN,
                        b: CRATE_DARK,
                    },
                ),
                texture(
                    "crate_specular",
                    TextureSource::Checker {
                        size: 64,
                        cells: 4,
                        a: [200, 200, 200, 255],
                        b: [40, 40, 40, 255],
                    },
                ),
                texture(
                    "panel",
                    TextureSource::Checker {
                        size: 64,
                        cells: 8,
                        a: PANEL_LIGHT,
                        b: PANEL_DARK,
                    },
                ),
                texture(
                    "panel_specular",
                    TextureSource::Solid {
                        color: [128, 128, 128, 255],
                    },
                ),
            ],
            materials: vec![MaterialConfig {
                name: "default".to_string(),
                material: Material::default(),
            }],
            lights: vec![Light::new(Vec3::new(0.0, 0.0, 1.0))],
            models: vec![
                model("pyramid", Vec3::ZERO, "crate", "crate_specular", Primitive::Pyramid),
                model(
                    "pyramid_far",
                    Vec3::new(2.0, 0.0, 2.0),
                    "crate",
                    "crate_specular",
                    Primitive::Pyramid,
                ),
                model(
                    "pyramid_raised",
                    Vec3::new(0.0, 1.0, 1.0),
                    "panel",
                    "panel_specular",
                    Primitive::Pyramid,
                ),
                model(
                    "cube",
                    Vec3::new(4.0, 0.0, 4.0),
                    "panel",
                    "panel_specular",
                    Primitive::Cube,
                ),
            ],
            asset_root: PathBuf::new(),
        }
    }
}
