//! Framebuffer and depth attachment management

use ash::{vk, Device};

use crate::render::backend::GpuHandle;
use crate::render::render_pass::DEPTH_FORMAT;
use crate::render::vulkan::context::{VulkanError, VulkanResult};
use crate::render::vulkan::image::AllocatedImage;

/// Framebuffer wrapper with RAII cleanup
pub struct Framebuffer {
    device: Device,
    framebuffer: vk::Framebuffer,
}

impl Framebuffer {
    /// Create a framebuffer binding `attachments` in render pass order
    pub fn new(
        device: Device,
        render_pass: vk::RenderPass,
        attachments: &[vk::ImageView],
        extent: vk::Extent2D,
    ) -> VulkanResult<Self> {
        let framebuffer_create_info = vk::FramebufferCreateInfo::builder()
            .render_pass(render_pass)
            .attachments(attachments)
            .width(extent.width)
            .height(extent.height)
            .layers(1);

        let framebuffer = unsafe {
            device
                .create_framebuffer(&framebuffer_create_info, None)
                .map_err(VulkanError::api("vkCreateFramebuffer"))?
        };

        Ok(Self { device, framebuffer })
    }
}

impl GpuHandle<vk::Framebuffer> for Framebuffer {
    fn handle(&self) -> vk::Framebuffer {
        self.framebuffer
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_framebuffer(self.framebuffer, None);
        }
    }
}

/// Depth attachment shared by every framebuffer of a surface generation
///
/// Frames in flight share it; the render pass's external dependency orders
/// their depth writes.
pub struct DepthBuffer {
    image: AllocatedImage,
}

impl DepthBuffer {
    /// Create a `D32_SFLOAT` depth attachment of `extent`
    pub fn new(
        device: Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        extent: vk::Extent2D,
    ) -> VulkanResult<Self> {
        let image = AllocatedImage::new(
            device,
            memory_properties,
            extent,
            DEPTH_FORMAT,
            vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
            vk::ImageAspectFlags::DEPTH,
        )?;
        log::debug!("Depth buffer created at {}x{}", extent.width, extent.height);
        Ok(Self { image })
    }

    /// Get the image view handle
    pub const fn image_view(&self) -> vk::ImageView {
        self.image.view()
    }

    /// Dimensions of the attachment
    pub const fn extent(&self) -> vk::Extent2D {
        self.image.extent()
    }
}
