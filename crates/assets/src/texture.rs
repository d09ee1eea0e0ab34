use crate::AssetError;
use std::path::Path;

/// Decoded RGBA8 pixels ready for upload, bottom row first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl TextureImage {
    pub fn from_rgba8(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, AssetError> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || pixels.len() != expected {
            return Err(AssetError::ImageSize {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Decode an image file (PNG or JPEG).
    ///
    /// Rows are flipped so that texcoord `v = 0` samples the bottom of the
    /// picture, matching the texcoords of the built-in primitives.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let path = path.as_ref();
        let decoded = image::open(path).map_err(|source| AssetError::Image {
            path: path.to_path_buf(),
            source,
        })?;
        let rgba = decoded.flipv().to_rgba8();
        let (width, height) = rgba.dimensions();
        tracing::debug!(path = %path.display(), width, height, "decoded texture image");
        Self::from_rgba8(width, height, rgba.into_raw())
    }

    /// A 1x1 image of a single color.
    pub fn solid(rgba: [u8; 4]) -> Self {
        Self {
            width: 1,
            height: 1,
            pixels: rgba.to_vec(),
        }
    }

    /// A `size`x`size` checkerboard with `cells` squares per side.
    pub fn checker(size: u32, cells: u32, a: [u8; 4], b: [u8; 4]) -> Self {
        let size = size.max(1);
        let cell = (size / cells.max(1)).max(1);
        let mut pixels = Vec::with_capacity(size as usize * size as usize * 4);
        for y in 0..size {
            for x in 0..size {
                let even = ((x / cell) + (y / cell)) % 2 == 0;
                pixels.extend_from_slice(if even { &a } else { &b });
            }
        }
        Self {
            width: size,
            height: size,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let mut px = [0; 4];
        px.copy_from_slice(&self.pixels[i..i + 4]);
        Some(px)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLACK: [u8; 4] = [0, 0, 0, 255];
    const WHITE: [u8; 4] = [255, 255, 255, 255];

    #[test]
    fn from_rgba8_checks_length() {
        assert!(TextureImage::from_rgba8(2, 2, vec![0; 16]).is_ok());
        assert!(matches!(
            TextureImage::from_rgba8(2, 2, vec![0; 15]),
            Err(AssetError::ImageSize { expected: 16, actual: 15, .. })
        ));
        assert!(TextureImage::from_rgba8(0, 4, Vec::new()).is_err());
    }

    #[test]
    fn solid_is_one_pixel() {
        let img = TextureImage::solid([10, 20, 30, 40]);
        assert_eq!((img.width(), img.height()), (1, 1));
        assert_eq!(img.pixel(0, 0), Some([10, 20, 30, 40]));
        assert_eq!(img.pixel(1, 0), None);
    }

    #[test]
    fn checker_alternates_cells() {
        let img = TextureImage::checker(8, 2, BLACK, WHITE);
        assert_eq!(img.pixels().len(), 8 * 8 * 4);
        assert_eq!(img.pixel(0, 0), Some(BLACK));
        assert_eq!(img.pixel(3, 3), Some(BLACK));
        assert_eq!(img.pixel(4, 0), Some(WHITE));
        assert_eq!(img.pixel(4, 4), Some(BLACK));
    }

    #[test]
    fn load_flips_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("two_rows.png");
        let mut source = image::RgbaImage::new(1, 2);
        source.put_pixel(0, 0, image::Rgba(WHITE));
        source.put_pixel(0, 1, image::Rgba(BLACK));
        source.save(&path).unwrap();

        let img = TextureImage::load(&path).unwrap();
        assert_eq!((img.width(), img.height()), (1, 2));
        assert_eq!(img.pixel(0, 0), Some(BLACK));
        assert_eq!(img.pixel(0, 1), Some(WHITE));
    }

    #[test]
    fn load_missing_file_fails() {
        let err = TextureImage::load("missing/box.png").unwrap_err();
        assert!(matches!(err, AssetError::Image { .. }));
    }
}
