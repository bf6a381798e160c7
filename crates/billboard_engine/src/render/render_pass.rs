//! Render pass graph description
//!
//! One subpass with a color attachment (the surface image) and a depth
//! attachment. The opaque and alpha draws both run inside that subpass.

use ash::vk;

/// Depth attachment format
pub const DEPTH_FORMAT: vk::Format = vk::Format::D32_SFLOAT;

/// Index of the color attachment
pub const COLOR_ATTACHMENT: u32 = 0;
/// Index of the depth attachment
pub const DEPTH_ATTACHMENT: u32 = 1;

/// Attachments and external dependency of the forward pass
#[derive(Debug, Clone, Copy)]
pub struct RenderPassLayout {
    /// Color then depth
    pub attachments: [vk::AttachmentDescription; 2],
    /// Orders the pass after presentation engine reads and prior depth use
    pub dependency: vk::SubpassDependency,
}

impl RenderPassLayout {
    /// Forward pass rendering into a surface of `color_format`
    pub fn forward(color_format: vk::Format) -> Self {
        let color = vk::AttachmentDescription::builder()
            .format(color_format)
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(vk::ImageLayout::PRESENT_SRC_KHR)
            .build();

        let depth = vk::AttachmentDescription::builder()
            .format(DEPTH_FORMAT)
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::DONT_CARE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
            .build();

        // Previous frame's depth writes land in late fragment tests; this frame
        // clears depth in early fragment tests and then tests and writes it
        let dependency = vk::SubpassDependency::builder()
            .src_subpass(vk::SUBPASS_EXTERNAL)
            .dst_subpass(0)
            .src_stage_mask(
                vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
                    | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS
                    | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS,
            )
            .src_access_mask(vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE)
            .dst_stage_mask(
                vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
                    | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
            )
            .dst_access_mask(
                vk::AccessFlags::COLOR_ATTACHMENT_WRITE
                    | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ
                    | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            )
            .build();

        Self {
            attachments: [color, depth],
            dependency,
        }
    }

    /// Color attachment description
    pub const fn color(&self) -> &vk::AttachmentDescription {
        &self.attachments[COLOR_ATTACHMENT as usize]
    }

    /// Depth attachment description
    pub const fn depth(&self) -> &vk::AttachmentDescription {
        &self.attachments[DEPTH_ATTACHMENT as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_attachment_is_cleared_stored_and_presentable() {
        let layout = RenderPassLayout::forward(vk::Format::B8G8R8A8_SRGB);
        let color = layout.color();

        assert_eq!(color.format, vk::Format::B8G8R8A8_SRGB);
        assert_eq!(color.load_op, vk::AttachmentLoadOp::CLEAR);
        assert_eq!(color.store_op, vk::AttachmentStoreOp::STORE);
        assert_eq!(color.final_layout, vk::ImageLayout::PRESENT_SRC_KHR);
    }

    #[test]
    fn test_depth_attachment_is_cleared_and_discarded() {
        let layout = RenderPassLayout::forward(vk::Format::R8G8B8A8_UNORM);
        let depth = layout.depth();

        assert_eq!(depth.format, DEPTH_FORMAT);
        assert_eq!(depth.load_op, vk::AttachmentLoadOp::CLEAR);
        assert_eq!(depth.store_op, vk::AttachmentStoreOp::DONT_CARE);
    }

    #[test]
    fn test_external_dependency_targets_the_only_subpass() {
        let layout = RenderPassLayout::forward(vk::Format::B8G8R8A8_SRGB);
        assert_eq!(layout.dependency.src_subpass, vk::SUBPASS_EXTERNAL);
        assert_eq!(layout.dependency.dst_subpass, 0);
        assert!(layout
            .dependency
            .dst_stage_mask
            .contains(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT));
    }

    #[test]
    fn test_previous_depth_writes_are_ordered_before_clear() {
        let dependency = RenderPassLayout::forward(vk::Format::B8G8R8A8_SRGB).dependency;

        assert!(dependency
            .src_stage_mask
            .contains(vk::PipelineStageFlags::LATE_FRAGMENT_TESTS));
        assert_eq!(dependency.src_access_mask, vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE);
        assert!(dependency
            .dst_stage_mask
            .contains(vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS));
        assert!(dependency.dst_access_mask.contains(
            vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE
        ));
    }
}
