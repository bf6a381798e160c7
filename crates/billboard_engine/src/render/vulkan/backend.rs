//! [`FrameBackend`] on top of `ash`
//!
//! Owns the swapchain, the command pool, the shared pipeline layout and the
//! shader modules pipelines are rebuilt from. Surface staleness reported by
//! acquire or present (`ERROR_OUT_OF_DATE_KHR` or a suboptimal result) comes
//! back as an outcome; every other failure is an error.

use std::sync::Arc;

use ash::vk;

use crate::assets::AssetManifest;
use crate::error::EngineResult;
use crate::render::backend::{
    AcquireOutcome, FrameBackend, GpuHandle, PresentOutcome, SurfaceChanges, SurfaceInfo,
};
use crate::render::commands::CommandSink;
use crate::render::pipeline::PipelineVariant;
use crate::render::vulkan::commands::{CommandBuffer, CommandPool};
use crate::render::vulkan::context::{VulkanContext, VulkanError, VulkanResult};
use crate::render::vulkan::descriptor_set::{object_set_layout, scene_set_layout, DescriptorSetLayout};
use crate::render::vulkan::framebuffer::{DepthBuffer, Framebuffer};
use crate::render::vulkan::pipeline::{GraphicsPipeline, PipelineLayout, ShaderModule};
use crate::render::vulkan::render_pass::RenderPass;
use crate::render::vulkan::swapchain::Swapchain;
use crate::render::vulkan::sync::{Fence, Semaphore};

/// Map `vkAcquireNextImageKHR` onto the driver's outcome
///
/// A suboptimal acquire still signals the semaphore; the driver replaces it
/// during recovery.
fn acquire_outcome(result: Result<(u32, bool), vk::Result>) -> VulkanResult<AcquireOutcome> {
    match result {
        Ok((index, false)) => Ok(AcquireOutcome::Ready(index)),
        Ok((_, true)) | Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquireOutcome::Stale),
        Err(e) => Err(VulkanError::api("vkAcquireNextImageKHR")(e)),
    }
}

/// Map `vkQueuePresentKHR` onto the driver's outcome
fn present_outcome(result: Result<bool, vk::Result>) -> VulkanResult<PresentOutcome> {
    match result {
        Ok(false) => Ok(PresentOutcome::Presented),
        Ok(true) | Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentOutcome::Stale),
        Err(e) => Err(VulkanError::api("vkQueuePresentKHR")(e)),
    }
}

/// Vulkan implementation of the frame seam
pub struct VulkanBackend {
    swapchain: Swapchain,
    vertex_shader: ShaderModule,
    opaque_fragment_shader: ShaderModule,
    alpha_fragment_shader: ShaderModule,
    pipeline_layout: PipelineLayout,
    object_set_layout: DescriptorSetLayout,
    scene_set_layout: DescriptorSetLayout,
    command_pool: CommandPool,
    context: Arc<VulkanContext>,
}

impl VulkanBackend {
    /// Create the first surface generation and load the scene shaders
    pub fn new(context: Arc<VulkanContext>, assets: &AssetManifest, window_extent: vk::Extent2D) -> EngineResult<Self> {
        let device = context.device().clone();

        let command_pool = CommandPool::new(device.clone(), context.graphics_queue_family())?;
        let scene_set_layout = scene_set_layout().build(&device)?;
        let object_set_layout = object_set_layout().build(&device)?;
        let pipeline_layout =
            PipelineLayout::new(device.clone(), &[scene_set_layout.handle(), object_set_layout.handle()])?;

        let load = |name: &str| -> EngineResult<ShaderModule> {
            Ok(ShaderModule::from_file(device.clone(), assets.resolve(name)?)?)
        };
        let vertex_shader = load(PipelineVariant::Opaque.vertex_shader())?;
        let opaque_fragment_shader = load(PipelineVariant::Opaque.fragment_shader())?;
        let alpha_fragment_shader = load(PipelineVariant::Alpha.fragment_shader())?;

        let swapchain = Swapchain::new(&context, window_extent, vk::SwapchainKHR::null())?;

        Ok(Self {
            swapchain,
            vertex_shader,
            opaque_fragment_shader,
            alpha_fragment_shader,
            pipeline_layout,
            object_set_layout,
            scene_set_layout,
            command_pool,
            context,
        })
    }

    /// Shared context
    pub fn context(&self) -> &Arc<VulkanContext> {
        &self.context
    }

    /// Pool used for frame command buffers and one-off uploads
    pub const fn command_pool(&self) -> &CommandPool {
        &self.command_pool
    }

    /// Layout shared by both pipelines
    pub const fn pipeline_layout(&self) -> vk::PipelineLayout {
        self.pipeline_layout.handle()
    }

    /// Layout of descriptor set 0
    pub const fn scene_set_layout(&self) -> vk::DescriptorSetLayout {
        self.scene_set_layout.handle()
    }

    /// Layout of descriptor set 1
    pub const fn object_set_layout(&self) -> vk::DescriptorSetLayout {
        self.object_set_layout.handle()
    }

    const fn fragment_shader(&self, variant: PipelineVariant) -> &ShaderModule {
        match variant {
            PipelineVariant::Opaque => &self.opaque_fragment_shader,
            PipelineVariant::Alpha => &self.alpha_fragment_shader,
        }
    }
}

impl FrameBackend for VulkanBackend {
    type Fence = Fence;
    type Semaphore = Semaphore;
    type CommandBuffer = CommandBuffer;
    type RenderPass = RenderPass;
    type DepthBuffer = DepthBuffer;
    type Framebuffer = Framebuffer;
    type Pipeline = GraphicsPipeline;

    fn surface_info(&self) -> SurfaceInfo {
        self.swapchain.info()
    }

    fn create_fence(&self, signaled: bool) -> EngineResult<Fence> {
        Ok(Fence::new(self.context.device().clone(), signaled)?)
    }

    fn create_semaphore(&self) -> EngineResult<Semaphore> {
        Ok(Semaphore::new(self.context.device().clone())?)
    }

    fn allocate_command_buffer(&self) -> EngineResult<CommandBuffer> {
        Ok(self.command_pool.allocate()?)
    }

    fn wait_for_fence(&self, fence: &Fence) -> EngineResult<()> {
        Ok(fence.wait(u64::MAX)?)
    }

    fn reset_fence(&self, fence: &Fence) -> EngineResult<()> {
        Ok(fence.reset()?)
    }

    fn acquire_next_image(&mut self, signal: &Semaphore) -> EngineResult<AcquireOutcome> {
        Ok(acquire_outcome(self.swapchain.acquire_next_image(signal.handle()))?)
    }

    fn record<F>(&self, command_buffer: &CommandBuffer, commands: F) -> EngineResult<()>
    where
        F: FnOnce(&mut dyn CommandSink),
    {
        Ok(command_buffer.record(commands)?)
    }

    fn submit(
        &self,
        command_buffer: &CommandBuffer,
        wait: &Semaphore,
        signal: &Semaphore,
        fence: &Fence,
    ) -> EngineResult<()> {
        let wait_semaphores = [wait.handle()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [command_buffer.handle()];
        let signal_semaphores = [signal.handle()];

        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores)
            .build();

        unsafe {
            self.context
                .device()
                .queue_submit(self.context.graphics_queue(), &[submit_info], fence.handle())
                .map_err(VulkanError::api("vkQueueSubmit"))?;
        }
        Ok(())
    }

    fn present(&mut self, image_index: u32, wait: &Semaphore) -> EngineResult<PresentOutcome> {
        let result = self
            .swapchain
            .present(self.context.present_queue(), image_index, wait.handle());
        Ok(present_outcome(result)?)
    }

    fn wait_idle(&self) -> EngineResult<()> {
        Ok(self.context.wait_idle()?)
    }

    fn recreate_surface(&mut self, window_extent: vk::Extent2D) -> EngineResult<SurfaceChanges> {
        let previous = self.swapchain.info();
        let replacement = Swapchain::new(&self.context, window_extent, self.swapchain.handle())?;
        // Dropping the retired swapchain destroys its views and handle
        self.swapchain = replacement;
        Ok(SurfaceChanges::between(&previous, &self.swapchain.info()))
    }

    fn create_render_pass(&self, color_format: vk::Format) -> EngineResult<RenderPass> {
        Ok(RenderPass::new_forward_pass(self.context.device().clone(), color_format)?)
    }

    fn create_depth_buffer(&self, extent: vk::Extent2D) -> EngineResult<DepthBuffer> {
        Ok(DepthBuffer::new(
            self.context.device().clone(),
            &self.context.physical_device().memory_properties,
            extent,
        )?)
    }

    fn create_framebuffers(&self, render_pass: &RenderPass, depth_buffer: &DepthBuffer) -> EngineResult<Vec<Framebuffer>> {
        let extent = self.swapchain.info().extent;
        self.swapchain
            .image_views()
            .iter()
            .map(|&view| {
                Framebuffer::new(
                    self.context.device().clone(),
                    render_pass.handle(),
                    &[view, depth_buffer.image_view()],
                    extent,
                )
                .map_err(Into::into)
            })
            .collect()
    }

    fn create_pipeline(
        &self,
        render_pass: &RenderPass,
        variant: PipelineVariant,
        extent: vk::Extent2D,
    ) -> EngineResult<GraphicsPipeline> {
        Ok(GraphicsPipeline::new(
            self.context.device().clone(),
            render_pass.handle(),
            self.pipeline_layout.handle(),
            variant,
            &self.vertex_shader,
            self.fragment_shader(variant),
            extent,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_staleness_is_an_outcome() {
        assert_eq!(acquire_outcome(Ok((2, false))).unwrap(), AcquireOutcome::Ready(2));
        assert_eq!(acquire_outcome(Ok((2, true))).unwrap(), AcquireOutcome::Stale);
        assert_eq!(
            acquire_outcome(Err(vk::Result::ERROR_OUT_OF_DATE_KHR)).unwrap(),
            AcquireOutcome::Stale
        );
    }

    #[test]
    fn test_acquire_device_loss_is_fatal() {
        let err = acquire_outcome(Err(vk::Result::ERROR_DEVICE_LOST)).unwrap_err();
        assert!(matches!(
            err,
            VulkanError::Api {
                operation: "vkAcquireNextImageKHR",
                result: vk::Result::ERROR_DEVICE_LOST,
            }
        ));
    }

    #[test]
    fn test_present_outcomes() {
        assert_eq!(present_outcome(Ok(false)).unwrap(), PresentOutcome::Presented);
        assert_eq!(present_outcome(Ok(true)).unwrap(), PresentOutcome::Stale);
        assert_eq!(
            present_outcome(Err(vk::Result::ERROR_OUT_OF_DATE_KHR)).unwrap(),
            PresentOutcome::Stale
        );
        assert!(present_outcome(Err(vk::Result::ERROR_SURFACE_LOST_KHR)).is_err());
    }
}
