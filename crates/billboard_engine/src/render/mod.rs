//! Rendering
//!
//! The backend-independent frame protocol lives at this level: the
//! [`FrameDriver`] state machine, the per-frame parameter block, the barrier
//! policy and the command sequence recorded each frame. [`vulkan`] implements
//! the [`FrameBackend`] seam on top of `ash`.

pub mod backend;
pub mod barrier;
pub mod commands;
pub mod frame_driver;
pub mod frame_params;
pub mod pipeline;
pub mod render_pass;
pub mod vulkan;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{AcquireOutcome, FrameBackend, GpuHandle, PresentOutcome, SurfaceChanges, SurfaceInfo};
pub use barrier::BufferTransition;
pub use commands::{CommandSink, DrawBatch, FrameRecording, SceneBindings};
pub use frame_driver::{FrameDriver, FrameOutcome, FrameSettings, FrameState, FrameStats};
pub use frame_params::FrameParameters;
pub use pipeline::{BlendMode, PipelineSet, PipelineVariant};
pub use render_pass::RenderPassLayout;
