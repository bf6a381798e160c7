//! Static scene assets
//!
//! Mesh definitions, image decoding and the logical-name asset manifest. GPU
//! upload of these lives in [`crate::render::vulkan::scene`].

mod image_loader;
mod manifest;
pub mod meshes;

use std::path::PathBuf;

use thiserror::Error;

pub use image_loader::ImageData;
pub use manifest::{names, AssetManifest};
pub use meshes::MeshData;

/// Asset resolution and loading failures
#[derive(Error, Debug)]
pub enum AssetError {
    /// The manifest has no entry for the logical name
    #[error("Unknown asset '{0}'")]
    UnknownAsset(String),

    /// The file could not be read
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// The file was read but is not a decodable image
    #[error("Failed to decode image {}: {source}", .path.display())]
    Decode {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        source: image::ImageError,
    },
}
