//! Render pass management

use ash::{vk, Device};

use crate::render::backend::GpuHandle;
use crate::render::render_pass::{RenderPassLayout, COLOR_ATTACHMENT, DEPTH_ATTACHMENT};
use crate::render::vulkan::context::{VulkanError, VulkanResult};

/// Render pass wrapper with RAII cleanup
pub struct RenderPass {
    device: Device,
    render_pass: vk::RenderPass,
    color_format: vk::Format,
}

impl RenderPass {
    /// Create the single-subpass color + depth pass for `color_format`
    pub fn new_forward_pass(device: Device, color_format: vk::Format) -> VulkanResult<Self> {
        let layout = RenderPassLayout::forward(color_format);

        let color_attachment_ref = vk::AttachmentReference {
            attachment: COLOR_ATTACHMENT,
            layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        };
        let depth_attachment_ref = vk::AttachmentReference {
            attachment: DEPTH_ATTACHMENT,
            layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        };

        let color_attachments = [color_attachment_ref];
        let subpasses = [vk::SubpassDescription::builder()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&color_attachments)
            .depth_stencil_attachment(&depth_attachment_ref)
            .build()];
        let dependencies = [layout.dependency];

        let render_pass_create_info = vk::RenderPassCreateInfo::builder()
            .attachments(&layout.attachments)
            .subpasses(&subpasses)
            .dependencies(&dependencies);

        let render_pass = unsafe {
            device
                .create_render_pass(&render_pass_create_info, None)
                .map_err(VulkanError::api("vkCreateRenderPass"))?
        };

        log::debug!("Render pass created for {:?}", color_format);
        Ok(Self {
            device,
            render_pass,
            color_format,
        })
    }

    /// Color format the pass was built for
    pub const fn color_format(&self) -> vk::Format {
        self.color_format
    }
}

impl GpuHandle<vk::RenderPass> for RenderPass {
    fn handle(&self) -> vk::RenderPass {
        self.render_pass
    }
}

impl Drop for RenderPass {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_render_pass(self.render_pass, None);
        }
    }
}
