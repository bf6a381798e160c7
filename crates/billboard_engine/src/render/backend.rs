//! GPU seam between the frame driver and a concrete graphics API
//!
//! The driver only ever talks to a [`FrameBackend`]. Vulkan objects that the
//! driver owns (fences, semaphores, per-generation targets, pipelines) are
//! associated types, so ownership and destruction stay with whoever created
//! them while the driver decides *when* they are replaced.

use ash::vk;
use bitflags::bitflags;

use crate::error::EngineResult;
use crate::render::commands::CommandSink;
use crate::render::pipeline::PipelineVariant;

/// Access to the raw Vulkan handle behind an owning wrapper
pub trait GpuHandle<H> {
    /// Raw handle, valid for as long as the wrapper lives
    fn handle(&self) -> H;
}

/// Snapshot of the current surface generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceInfo {
    /// Pixel format shared by every surface image
    pub format: vk::Format,
    /// Dimensions shared by every surface image
    pub extent: vk::Extent2D,
    /// Number of presentable images
    pub image_count: usize,
}

bitflags! {
    /// What a surface recreation changed
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SurfaceChanges: u8 {
        /// Pixel format differs from the previous generation
        const FORMAT = 1;
        /// Extent differs from the previous generation
        const SIZE = 1 << 1;
    }
}

impl SurfaceChanges {
    /// Compare two surface generations
    pub fn between(previous: &SurfaceInfo, current: &SurfaceInfo) -> Self {
        let mut changes = Self::empty();
        changes.set(Self::FORMAT, previous.format != current.format);
        changes.set(Self::SIZE, previous.extent != current.extent);
        changes
    }
}

/// Result of asking the surface for its next image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// Image index ready; the acquire semaphore will be signaled
    Ready(u32),
    /// Surface is suboptimal or out of date and must be rebuilt
    Stale,
}

/// Result of queueing an image for presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    /// Presentation queued normally
    Presented,
    /// Presentation queued (or dropped) but the surface must be rebuilt
    Stale,
}

/// GPU operations the frame driver needs
///
/// Per-frame operations report only fatal failures as errors. Surface
/// staleness comes back through [`AcquireOutcome`] and [`PresentOutcome`].
pub trait FrameBackend {
    /// CPU-waitable completion fence
    type Fence;
    /// GPU-side binary semaphore
    type Semaphore;
    /// Resettable primary command buffer
    type CommandBuffer;
    /// Render pass for the current color format
    type RenderPass: GpuHandle<vk::RenderPass>;
    /// Depth attachment sized to the surface
    type DepthBuffer;
    /// Framebuffer binding one surface image with the depth buffer
    type Framebuffer: GpuHandle<vk::Framebuffer>;
    /// Graphics pipeline with viewport and scissor baked in
    type Pipeline: GpuHandle<vk::Pipeline>;

    /// Current surface generation
    fn surface_info(&self) -> SurfaceInfo;

    /// Create a fence, optionally already signaled
    fn create_fence(&self, signaled: bool) -> EngineResult<Self::Fence>;
    /// Create an unsignaled binary semaphore
    fn create_semaphore(&self) -> EngineResult<Self::Semaphore>;
    /// Allocate a primary command buffer that can be reset individually
    fn allocate_command_buffer(&self) -> EngineResult<Self::CommandBuffer>;

    /// Block until the fence is signaled
    fn wait_for_fence(&self, fence: &Self::Fence) -> EngineResult<()>;
    /// Return the fence to the unsignaled state
    fn reset_fence(&self, fence: &Self::Fence) -> EngineResult<()>;

    /// Request the next surface image, signaling `signal` when it is available
    fn acquire_next_image(&mut self, signal: &Self::Semaphore) -> EngineResult<AcquireOutcome>;

    /// Reset `command_buffer` and record into it
    fn record<F>(&self, command_buffer: &Self::CommandBuffer, commands: F) -> EngineResult<()>
    where
        F: FnOnce(&mut dyn CommandSink);

    /// Submit on the graphics queue
    ///
    /// Waits on `wait` at the color-attachment-output stage and signals both
    /// `signal` and `fence` on completion.
    fn submit(
        &self,
        command_buffer: &Self::CommandBuffer,
        wait: &Self::Semaphore,
        signal: &Self::Semaphore,
        fence: &Self::Fence,
    ) -> EngineResult<()>;

    /// Queue `image_index` for presentation once `wait` is signaled
    fn present(&mut self, image_index: u32, wait: &Self::Semaphore) -> EngineResult<PresentOutcome>;

    /// Block until the device has finished all submitted work
    fn wait_idle(&self) -> EngineResult<()>;

    /// Replace the surface generation and report what changed
    ///
    /// Only called after [`FrameBackend::wait_idle`].
    fn recreate_surface(&mut self, window_extent: vk::Extent2D) -> EngineResult<SurfaceChanges>;

    /// Build the color + depth render pass for `color_format`
    fn create_render_pass(&self, color_format: vk::Format) -> EngineResult<Self::RenderPass>;
    /// Build a depth attachment of `extent`
    fn create_depth_buffer(&self, extent: vk::Extent2D) -> EngineResult<Self::DepthBuffer>;
    /// Build one framebuffer per surface image, in image-index order
    fn create_framebuffers(
        &self,
        render_pass: &Self::RenderPass,
        depth_buffer: &Self::DepthBuffer,
    ) -> EngineResult<Vec<Self::Framebuffer>>;
    /// Build one pipeline variant against `render_pass` for `extent`
    fn create_pipeline(
        &self,
        render_pass: &Self::RenderPass,
        variant: PipelineVariant,
        extent: vk::Extent2D,
    ) -> EngineResult<Self::Pipeline>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(format: vk::Format, width: u32, height: u32) -> SurfaceInfo {
        SurfaceInfo {
            format,
            extent: vk::Extent2D { width, height },
            image_count: 3,
        }
    }

    #[test]
    fn test_no_changes() {
        let a = info(vk::Format::B8G8R8A8_SRGB, 800, 600);
        assert!(SurfaceChanges::between(&a, &a).is_empty());
    }

    #[test]
    fn test_size_only() {
        let a = info(vk::Format::B8G8R8A8_SRGB, 800, 600);
        let b = info(vk::Format::B8G8R8A8_SRGB, 800, 700);
        assert_eq!(SurfaceChanges::between(&a, &b), SurfaceChanges::SIZE);
    }

    #[test]
    fn test_format_and_size() {
        let a = info(vk::Format::B8G8R8A8_SRGB, 800, 600);
        let b = info(vk::Format::R8G8B8A8_UNORM, 640, 480);
        assert_eq!(SurfaceChanges::between(&a, &b), SurfaceChanges::FORMAT | SurfaceChanges::SIZE);
    }
}
