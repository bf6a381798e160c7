//! Crate-level error type
//!
//! Every fallible operation in the engine funnels into [`EngineError`]. A stale
//! surface is not an error: it travels through the acquire/present outcome
//! enums and is handled by the frame driver's recovery path.

use thiserror::Error;

use crate::assets::AssetError;
use crate::config::ConfigError;
use crate::render::vulkan::{VulkanError, WindowError};

/// Unrecoverable engine failures
#[derive(Error, Debug)]
pub enum EngineError {
    /// A Vulkan object or command failed
    #[error(transparent)]
    Vulkan(#[from] VulkanError),

    /// Window system failure
    #[error(transparent)]
    Window(#[from] WindowError),

    /// Asset could not be resolved or decoded
    #[error(transparent)]
    Asset(#[from] AssetError),

    /// Configuration could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The surface handed out an image index with no matching frame slot
    #[error("Surface image index {index} has no frame slot ({count} slots)")]
    ImageIndexOutOfRange {
        /// Index returned by acquisition
        index: u32,
        /// Number of frame slots owned by the driver
        count: usize,
    },
}

/// Result alias used throughout the engine
pub type EngineResult<T> = Result<T, EngineError>;
