//! Image loading for texture data

use std::path::Path;

use crate::assets::AssetError;

/// Decoded RGBA8 image ready for GPU upload
#[derive(Debug, Clone)]
pub struct ImageData {
    /// Tightly packed RGBA pixels, row-major from the top-left
    pub data: Vec<u8>,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
}

impl ImageData {
    /// Load and decode an image file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AssetError> {
        let path = path.as_ref();
        log::debug!("Loading image from {:?}", path);

        let bytes = std::fs::read(path).map_err(|source| AssetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let image = Self::decode(&bytes).map_err(|source| AssetError::Decode {
            path: path.to_path_buf(),
            source,
        })?;

        log::info!("Loaded image {}x{} from {:?}", image.width, image.height, path);
        Ok(image)
    }

    fn decode(bytes: &[u8]) -> Result<Self, image::ImageError> {
        let rgba = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(Self {
            data: rgba.into_raw(),
            width,
            height,
        })
    }

    /// Size of the pixel data in bytes
    pub fn byte_len(&self) -> usize {
        self.data.len()
    }
}
