use crate::{SceneConfig, SceneError};
use ink_common::{Handle, Registry};
use ink_render::{Material, Shader, SharedGpu, Texture};
use std::collections::HashMap;

/// Name lookup over a [`Registry`].
struct Named<T> {
    registry: Registry<T>,
    names: HashMap<String, Handle<T>>,
}

impl<T> Named<T> {
    fn new(kind: &'static str) -> Self {
        Self {
            registry: Registry::new(kind),
            names: HashMap::new(),
        }
    }

    fn insert(&mut self, name: &str, value: T) -> Result<Handle<T>, SceneError> {
        if self.names.contains_key(name) {
            return Err(SceneError::DuplicateAsset {
                kind: self.registry.kind(),
                name: name.to_string(),
            });
        }
        let handle = self.registry.insert(value);
        self.names.insert(name.to_string(), handle);
        Ok(handle)
    }

    fn lookup(&self, name: &str) -> Result<Handle<T>, SceneError> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| SceneError::UnknownAsset {
                kind: self.registry.kind(),
                name: name.to_string(),
            })
    }
}

/// Shaders, textures and materials owned by a scene, addressable by the
/// names the scene file gives them.
pub struct SceneAssets {
    shaders: Named<Shader>,
    textures: Named<Texture>,
    materials: Named<Material>,
    default_shader: Handle<Shader>,
}

impl SceneAssets {
    /// Compile every shader, upload every texture and register every
    /// material listed in `config`.
    pub fn load(gpu: &SharedGpu, config: &SceneConfig) -> Result<Self, SceneError> {
        let mut shaders = Named::new("shader");
        let mut default_shader = None;
        for entry in &config.shaders {
            let source = config.shader_source(&entry.source)?;
            let shader = Shader::new(gpu, &entry.name, &source)?;
            let handle = shaders.insert(&entry.name, shader)?;
            default_shader.get_or_insert(handle);
        }
        let default_shader = default_shader.ok_or(SceneError::NoShaders)?;

        let mut textures = Named::new("texture");
        for entry in &config.textures {
            let image = config.texture_image(&entry.source)?;
            let texture = Texture::new(gpu, &entry.name, &image)?;
            textures.insert(&entry.name, texture)?;
        }

        let mut materials = Named::new("material");
        for entry in &config.materials {
            materials.insert(&entry.name, entry.material)?;
        }

        tracing::info!(
            shaders = shaders.registry.len(),
            textures = textures.registry.len(),
            materials = materials.registry.len(),
            "scene assets loaded"
        );
        Ok(Self {
            shaders,
            textures,
            materials,
            default_shader,
        })
    }

    pub fn shader(&self, name: &str) -> Result<Handle<Shader>, SceneError> {
        self.shaders.lookup(name)
    }

    pub fn texture(&self, name: &str) -> Result<Handle<Texture>, SceneError> {
        self.textures.lookup(name)
    }

    pub fn material(&self, name: &str) -> Result<Handle<Material>, SceneError> {
        self.materials.lookup(name)
    }

    /// The first shader in the scene file.
    pub fn default_shader(&self) -> Handle<Shader> {
        self.default_shader
    }

    pub fn shaders(&self) -> &Registry<Shader> {
        &self.shaders.registry
    }

    pub fn textures(&self) -> &Registry<Texture> {
        &self.textures.registry
    }

    pub fn materials(&self) -> &Registry<Material> {
        &self.materials.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MaterialConfig, TextureConfig, TextureSource};
    use ink_render::HeadlessGpu;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn headless() -> (Rc<RefCell<HeadlessGpu>>, SharedGpu) {
        let hg = Rc::new(RefCell::new(HeadlessGpu::new(64, 64)));
        let gpu: SharedGpu = hg.clone();
        (hg, gpu)
    }

    #[test]
    fn default_scene_assets_resolve_by_name() {
        let (hg, gpu) = headless();
        let assets = SceneAssets::load(&gpu, &SceneConfig::default()).unwrap();
        assert_eq!(assets.shaders().len(), 1);
        assert_eq!(assets.textures().len(), 4);
        assert_eq!(assets.materials().len(), 1);
        assert_eq!(hg.borrow().live_textures(), 4);
        assert_eq!(hg.borrow().live_programs(), 1);

        let crate_tex = assets.texture("crate").unwrap();
        assert_eq!(assets.textures().get(crate_tex).unwrap().label(), "crate");
        assert_eq!(assets.shader("core").unwrap(), assets.default_shader());
        let material = assets.material("default").unwrap();
        assert_eq!(*assets.materials().get(material).unwrap(), Material::default());
    }

    #[test]
    fn unknown_name_is_reported_with_kind() {
        let (_hg, gpu) = headless();
        let assets = SceneAssets::load(&gpu, &SceneConfig::default()).unwrap();
        match assets.texture("brick") {
            Err(SceneError::UnknownAsset { kind, name }) => {
                assert_eq!(kind, "texture");
                assert_eq!(name, "brick");
            }
            other => panic!("expected UnknownAsset, got {other:?}"),
        }
        assert!(assets.material("shiny").is_err());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let (_hg, gpu) = headless();
        let mut config = SceneConfig::default();
        config.materials.push(MaterialConfig {
            name: "default".into(),
            material: Material::default(),
        });
        assert!(matches!(
            SceneAssets::load(&gpu, &config),
            Err(SceneError::DuplicateAsset { kind: "material", .. })
        ));
    }

    #[test]
    fn scene_without_shaders_fails() {
        let (_hg, gpu) = headless();
        let mut config = SceneConfig::default();
        config.shaders.clear();
        assert!(matches!(
            SceneAssets::load(&gpu, &config),
            Err(SceneError::NoShaders)
        ));
    }

    #[test]
    fn missing_texture_file_fails_and_releases_earlier_uploads() {
        let (hg, gpu) = headless();
        let mut config = SceneConfig::default();
        config.textures.push(TextureConfig {
            name: "photo".into(),
            source: TextureSource::File {
                path: "missing/photo.png".into(),
            },
        });
        assert!(matches!(
            SceneAssets::load(&gpu, &config),
            Err(SceneError::Asset(_))
        ));
        assert_eq!(hg.borrow().live_resources(), 0);
    }

    #[test]
    fn dropping_assets_releases_gpu_resources() {
        let (hg, gpu) = headless();
        let assets = SceneAssets::load(&gpu, &SceneConfig::default()).unwrap();
        assert!(hg.borrow().live_resources() > 0);
        drop(assets);
        let stats = hg.borrow().stats();
        assert_eq!(stats.live(), 0);
        assert_eq!(stats.failed_releases, 0);
    }
}
