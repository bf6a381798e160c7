//! # Billboard Engine
//!
//! Vulkan forward renderer for a textured ground plane with alpha-blended
//! billboard sprites, built around an explicit per-frame synchronization
//! state machine.
//!
//! ## Features
//!
//! - **Frame Driver**: acquire, slot wait, record, submit and present with
//!   transparent recovery from stale (resized or reformatted) surfaces
//! - **Per-image frame slots**: one command buffer, fence and semaphore pair
//!   per surface image, bounding frames in flight to the image count
//! - **Uniform barrier policy**: every in-band uniform update is bracketed by
//!   a transfer/shader barrier pair
//! - **Backend seam**: the driver is generic over [`render::FrameBackend`],
//!   so the whole protocol runs against a recording backend in tests
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use billboard_engine::prelude::*;
//!
//! fn main() -> Result<(), EngineError> {
//!     let config = RendererConfig::default();
//!     let mut window = Window::new(&config.window.title, config.window.width, config.window.height)?;
//!     let context = Arc::new(VulkanContext::new(&mut window, &config.window.title, config.enable_validation)?);
//!     let backend = VulkanBackend::new(Arc::clone(&context), &config.assets, window.framebuffer_extent())?;
//!     let scene = SceneResources::load(Arc::clone(&context), &backend, &config.assets)?;
//!     let mut driver = FrameDriver::new(backend, scene.bindings(), FrameSettings::from(&config), window.framebuffer_extent())?;
//!
//!     loop {
//!         let input = window.poll_input();
//!         if driver.run_iteration(&input)? == FrameOutcome::CloseRequested {
//!             break;
//!         }
//!     }
//!     driver.wait_idle()?;
//!     Ok(())
//! }
//! ```

pub mod assets;
pub mod config;
pub mod error;
pub mod foundation;
pub mod input;
pub mod render;

pub use error::{EngineError, EngineResult};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::{Config, RendererConfig},
        error::{EngineError, EngineResult},
        input::{FrameInput, InputEvent},
        render::{
            FrameDriver, FrameOutcome, FrameSettings, FrameStats,
            vulkan::{SceneResources, VulkanBackend, VulkanContext, Window},
        },
    };
}
