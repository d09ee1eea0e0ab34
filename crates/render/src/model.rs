use crate::gpu::SharedGpu;
use crate::{GeometryBuffer, Material, RenderError, Shader, Texture};
use glam::Vec3;
use ink_common::{Handle, Registry};
use std::path::Path;

/// Texture unit the diffuse override is bound to.
pub const DIFFUSE_UNIT: u32 = 0;
/// Texture unit the specular override is bound to.
pub const SPECULAR_UNIT: u32 = 1;

/// A named, positioned group of meshes sharing one material and one pair of
/// override textures.
///
/// Meshes are deep copies owned by the object. Material and textures are
/// referred to by handle and resolved at render time.
pub struct DrawableObject {
    name: String,
    position: Vec3,
    material: Handle<Material>,
    diffuse_texture: Handle<Texture>,
    specular_texture: Handle<Texture>,
    meshes: Vec<GeometryBuffer>,
}

impl DrawableObject {
    /// Copy every prototype, then place each copy at `position` with its
    /// pivot at `position`.
    pub fn new(
        name: impl Into<String>,
        position: Vec3,
        material: Handle<Material>,
        diffuse_texture: Handle<Texture>,
        specular_texture: Handle<Texture>,
        prototypes: &[GeometryBuffer],
    ) -> Result<Self, RenderError> {
        let name = name.into();
        if prototypes.is_empty() {
            return Err(RenderError::InvalidGeometry(format!(
                "model '{name}' has no meshes"
            )));
        }
        let meshes = prototypes
            .iter()
            .map(GeometryBuffer::try_clone)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::placed(
            name,
            position,
            material,
            diffuse_texture,
            specular_texture,
            meshes,
        ))
    }

    /// Import an OBJ file as a single non-indexed mesh.
    pub fn from_obj(
        gpu: &SharedGpu,
        name: impl Into<String>,
        position: Vec3,
        material: Handle<Material>,
        diffuse_texture: Handle<Texture>,
        specular_texture: Handle<Texture>,
        path: impl AsRef<Path>,
    ) -> Result<Self, RenderError> {
        let vertices = ink_assets::load_obj(path.as_ref())?;
        let mesh = GeometryBuffer::new(gpu, &vertices, &[])?;
        Ok(Self::placed(
            name.into(),
            position,
            material,
            diffuse_texture,
            specular_texture,
            vec![mesh],
        ))
    }

    fn placed(
        name: String,
        position: Vec3,
        material: Handle<Material>,
        diffuse_texture: Handle<Texture>,
        specular_texture: Handle<Texture>,
        mut meshes: Vec<GeometryBuffer>,
    ) -> Self {
        for mesh in &mut meshes {
            mesh.translate(position);
            mesh.set_origin(position);
        }
        tracing::debug!(%name, meshes = meshes.len(), ?position, "drawable object built");
        Self {
            name,
            position,
            material,
            diffuse_texture,
            specular_texture,
            meshes,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn material(&self) -> Handle<Material> {
        self.material
    }

    pub fn textures(&self) -> (Handle<Texture>, Handle<Texture>) {
        (self.diffuse_texture, self.specular_texture)
    }

    pub fn meshes(&self) -> &[GeometryBuffer] {
        &self.meshes
    }

    pub fn meshes_mut(&mut self) -> &mut [GeometryBuffer] {
        &mut self.meshes
    }

    pub fn rotate(&mut self, delta: Vec3) {
        for mesh in &mut self.meshes {
            mesh.rotate(delta);
        }
    }

    /// Push the material, activate the program, then bind the override
    /// textures and draw for every mesh.
    ///
    /// Bindings are idle afterwards, also when a step fails.
    pub fn render(
        &mut self,
        shader: &Shader,
        materials: &Registry<Material>,
        textures: &Registry<Texture>,
    ) -> Result<(), RenderError> {
        let result = self.draw(shader, materials, textures);
        shader.gpu().borrow_mut().reset_bindings();
        result
    }

    fn draw(
        &mut self,
        shader: &Shader,
        materials: &Registry<Material>,
        textures: &Registry<Texture>,
    ) -> Result<(), RenderError> {
        let material = materials.get(self.material)?;
        let diffuse = textures.get(self.diffuse_texture)?;
        let specular = textures.get(self.specular_texture)?;

        material.send_to_shader(shader)?;
        shader.use_program()?;
        for mesh in &mut self.meshes {
            diffuse.bind(DIFFUSE_UNIT)?;
            specular.bind(SPECULAR_UNIT)?;
            mesh.render(shader)?;
        }
        tracing::trace!(name = %self.name, "drawable object rendered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::{Gpu, ShaderSource, UniformValue};
    use crate::HeadlessGpu;
    use glam::Mat4;
    use ink_assets::{Primitive, TextureImage};
    use ink_common::RegistryError;
    use std::cell::RefCell;
    use std::io::Write;
    use std::rc::Rc;

    struct Fixture {
        headless: Rc<RefCell<HeadlessGpu>>,
        gpu: SharedGpu,
        materials: Registry<Material>,
        textures: Registry<Texture>,
        material: Handle<Material>,
        diffuse: Handle<Texture>,
        specular: Handle<Texture>,
    }

    fn fixture() -> Fixture {
        let headless = Rc::new(RefCell::new(HeadlessGpu::new(64, 64)));
        let gpu: SharedGpu = headless.clone();
        let mut materials = Registry::new("material");
        let mut textures = Registry::new("texture");
        let material = materials.insert(Material::default());
        let diffuse = textures.insert(Texture::new(&gpu, "d", &TextureImage::solid([255; 4])).unwrap());
        let specular = textures.insert(Texture::new(&gpu, "s", &TextureImage::solid([0; 4])).unwrap());
        Fixture {
            headless,
            gpu,
            materials,
            textures,
            material,
            diffuse,
            specular,
        }
    }

    fn pyramid(gpu: &SharedGpu) -> GeometryBuffer {
        GeometryBuffer::from_mesh_data(gpu, &Primitive::Pyramid.mesh_data()).unwrap()
    }

    #[test]
    fn construction_places_meshes_at_position() {
        let f = fixture();
        let proto = pyramid(&f.gpu);
        let at = Vec3::new(2.0, 0.0, 2.0);
        let obj = DrawableObject::new("p", at, f.material, f.diffuse, f.specular, &[proto]).unwrap();
        for mesh in obj.meshes() {
            assert_eq!(mesh.transform().origin, at);
            assert_eq!(mesh.transform().position, at);
        }
    }

    #[test]
    fn rotation_pivots_on_object_position() {
        let f = fixture();
        let proto = pyramid(&f.gpu);
        let at = Vec3::new(2.0, 0.0, 2.0);
        let mut obj =
            DrawableObject::new("p", at, f.material, f.diffuse, f.specular, &[proto]).unwrap();
        obj.rotate(Vec3::new(0.0, 90.0, 0.0));

        let shader = Shader::new(&f.gpu, "core", &ShaderSource::Core).unwrap();
        obj.render(&shader, &f.materials, &f.textures).unwrap();
        let m = obj.meshes()[0].model_matrix();
        // The pivot stays put; a point one unit along +x swings to -z.
        assert!(m.transform_point3(Vec3::ZERO).abs_diff_eq(at, 1e-5));
        assert!(
            m.transform_point3(Vec3::X)
                .abs_diff_eq(Vec3::new(2.0, 0.0, 1.0), 1e-5)
        );
    }

    #[test]
    fn meshes_are_isolated_from_prototypes_and_siblings() {
        let f = fixture();
        let protos = vec![pyramid(&f.gpu)];
        let mut a =
            DrawableObject::new("a", Vec3::X, f.material, f.diffuse, f.specular, &protos).unwrap();
        let b =
            DrawableObject::new("b", Vec3::X, f.material, f.diffuse, f.specular, &protos).unwrap();
        a.meshes_mut()[0].scale_by(Vec3::ONE);
        a.rotate(Vec3::new(10.0, 0.0, 0.0));

        assert_eq!(protos[0].transform().scale, Vec3::ONE);
        assert_eq!(protos[0].transform().position, Vec3::ZERO);
        assert_eq!(b.meshes()[0].transform().scale, Vec3::ONE);
        assert_eq!(b.meshes()[0].transform().rotation, Vec3::ZERO);
        assert_ne!(a.meshes()[0].vertex_array(), protos[0].vertex_array());
        assert_ne!(a.meshes()[0].vertex_array(), b.meshes()[0].vertex_array());
    }

    #[test]
    fn render_binds_textures_and_material_per_draw() {
        let f = fixture();
        let protos = vec![pyramid(&f.gpu), pyramid(&f.gpu)];
        let mut obj =
            DrawableObject::new("pair", Vec3::ZERO, f.material, f.diffuse, f.specular, &protos)
                .unwrap();
        let shader = Shader::new(&f.gpu, "core", &ShaderSource::Core).unwrap();
        obj.render(&shader, &f.materials, &f.textures).unwrap();

        let hg = f.headless.borrow();
        assert!(hg.bindings().is_idle());
        let draws = hg.pending_draws();
        assert_eq!(draws.len(), 2);
        let diffuse_id = f.textures.get(f.diffuse).unwrap().id();
        let specular_id = f.textures.get(f.specular).unwrap().id();
        for draw in draws {
            assert_eq!(draw.bindings.texture_at(DIFFUSE_UNIT), Some(diffuse_id));
            assert_eq!(draw.bindings.texture_at(SPECULAR_UNIT), Some(specular_id));
            assert_eq!(draw.uniform("material.diffuseTex"), Some(UniformValue::I32(0)));
            assert!(matches!(draw.uniform("ModelMatrix"), Some(UniformValue::Mat4(m)) if m == Mat4::IDENTITY));
        }
    }

    #[test]
    fn stale_texture_handle_is_a_registry_error() {
        let mut f = fixture();
        let protos = vec![pyramid(&f.gpu)];
        let mut obj =
            DrawableObject::new("p", Vec3::ZERO, f.material, f.diffuse, f.specular, &protos)
                .unwrap();
        f.textures.remove(f.specular).unwrap();
        let shader = Shader::new(&f.gpu, "core", &ShaderSource::Core).unwrap();
        let err = obj.render(&shader, &f.materials, &f.textures).unwrap_err();
        assert!(matches!(
            err,
            RenderError::Registry(RegistryError::Stale { kind: "texture", .. })
        ));
        assert!(f.headless.borrow().pending_draws().is_empty());
    }

    #[test]
    fn failed_bind_leaves_device_idle() {
        let f = fixture();
        let protos = vec![pyramid(&f.gpu)];
        let mut obj =
            DrawableObject::new("p", Vec3::ZERO, f.material, f.diffuse, f.specular, &protos)
                .unwrap();
        let specular_id = f.textures.get(f.specular).unwrap().id();
        f.headless.borrow_mut().delete_texture(specular_id).unwrap();

        let shader = Shader::new(&f.gpu, "core", &ShaderSource::Core).unwrap();
        let err = obj.render(&shader, &f.materials, &f.textures).unwrap_err();
        assert!(matches!(err, RenderError::Gpu(_)));
        let hg = f.headless.borrow();
        assert!(hg.bindings().is_idle());
        assert!(hg.pending_draws().is_empty());
    }

    #[test]
    fn no_prototypes_is_rejected() {
        let f = fixture();
        assert!(matches!(
            DrawableObject::new("empty", Vec3::ZERO, f.material, f.diffuse, f.specular, &[]),
            Err(RenderError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn obj_file_becomes_one_non_indexed_mesh() {
        let f = fixture();
        let mut file = tempfile::Builder::new().suffix(".obj").tempfile().unwrap();
        file.write_all(b"v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n")
            .unwrap();
        file.flush().unwrap();

        let at = Vec3::new(4.0, 0.0, 4.0);
        let obj = DrawableObject::from_obj(
            &f.gpu, "sphere", at, f.material, f.diffuse, f.specular, file.path(),
        )
        .unwrap();
        assert_eq!(obj.meshes().len(), 1);
        assert_eq!(obj.meshes()[0].index_count(), 0);
        assert_eq!(obj.meshes()[0].vertex_count(), 6);
        assert_eq!(obj.meshes()[0].transform().origin, at);
        assert_eq!(obj.meshes()[0].transform().position, at);
    }

    #[test]
    fn missing_obj_file_is_an_asset_error() {
        let f = fixture();
        let result = DrawableObject::from_obj(
            &f.gpu, "missing", Vec3::ZERO, f.material, f.diffuse, f.specular, "nope.obj",
        );
        assert!(matches!(result, Err(RenderError::Asset(_))));
    }
}
