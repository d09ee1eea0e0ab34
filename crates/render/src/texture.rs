use crate::gpu::{GpuError, SharedGpu, TextureId};
use ink_assets::TextureImage;
use std::rc::Rc;

/// A 2D texture resident on the GPU.
pub struct Texture {
    gpu: SharedGpu,
    id: TextureId,
    width: u32,
    height: u32,
    label: String,
}

impl Texture {
    pub fn new(
        gpu: &SharedGpu,
        label: impl Into<String>,
        image: &TextureImage,
    ) -> Result<Self, GpuError> {
        let label = label.into();
        let id = gpu.borrow_mut().create_texture(image)?;
        tracing::debug!(%label, %id, width = image.width(), height = image.height(), "texture uploaded");
        Ok(Self {
            gpu: Rc::clone(gpu),
            id,
            width: image.width(),
            height: image.height(),
            label,
        })
    }

    pub fn id(&self) -> TextureId {
        self.id
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Make `unit` active and bind this texture to it.
    pub fn bind(&self, unit: u32) -> Result<(), GpuError> {
        let mut gpu = self.gpu.borrow_mut();
        gpu.active_texture(unit)?;
        gpu.bind_texture(Some(self.id))
    }

    /// Clear whatever is bound to `unit`.
    pub fn unbind(&self, unit: u32) -> Result<(), GpuError> {
        let mut gpu = self.gpu.borrow_mut();
        gpu.active_texture(unit)?;
        gpu.bind_texture(None)
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        let Ok(mut gpu) = self.gpu.try_borrow_mut() else {
            tracing::error!(label = %self.label, "gpu busy while releasing texture");
            return;
        };
        if let Err(err) = gpu.delete_texture(self.id) {
            tracing::error!(label = %self.label, %err, "failed to release texture");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::Gpu;
    use crate::HeadlessGpu;
    use std::cell::RefCell;

    #[test]
    fn bind_selects_unit() {
        let headless = Rc::new(RefCell::new(HeadlessGpu::new(4, 4)));
        let gpu: SharedGpu = headless.clone();
        let tex = Texture::new(&gpu, "box", &TextureImage::checker(4, 2, [0; 4], [255; 4])).unwrap();
        assert_eq!(tex.size(), (4, 4));

        tex.bind(1).unwrap();
        {
            let hg = headless.borrow();
            assert_eq!(hg.bindings().active_unit, 1);
            assert_eq!(hg.bindings().texture_at(1), Some(tex.id()));
        }
        tex.unbind(1).unwrap();
        assert_eq!(headless.borrow().bindings().texture_at(1), None);
    }

    #[test]
    fn bad_unit_is_an_error() {
        let headless = Rc::new(RefCell::new(HeadlessGpu::new(4, 4)));
        let gpu: SharedGpu = headless.clone();
        let tex = Texture::new(&gpu, "solid", &TextureImage::solid([9; 4])).unwrap();
        assert!(matches!(
            tex.bind(64),
            Err(GpuError::InvalidTextureUnit { unit: 64, .. })
        ));
    }

    #[test]
    fn drop_releases_texture() {
        let headless = Rc::new(RefCell::new(HeadlessGpu::new(4, 4)));
        let gpu: SharedGpu = headless.clone();
        drop(Texture::new(&gpu, "solid", &TextureImage::solid([9; 4])).unwrap());
        assert_eq!(headless.borrow().live_textures(), 0);
        assert_eq!(headless.borrow().stats().failed_releases, 0);
    }
}
