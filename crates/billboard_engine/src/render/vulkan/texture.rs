//! Sampled textures
//!
//! Decoded RGBA8 pixels are staged, copied into an sRGB image and left in
//! `SHADER_READ_ONLY_OPTIMAL` for the fragment shader.

use ash::{vk, Device};

use crate::assets::ImageData;
use crate::render::vulkan::buffer::Buffer;
use crate::render::vulkan::commands::CommandPool;
use crate::render::vulkan::context::{VulkanError, VulkanResult};
use crate::render::vulkan::image::AllocatedImage;

/// Format every texture is uploaded as
pub const TEXTURE_FORMAT: vk::Format = vk::Format::R8G8B8A8_SRGB;

/// Layout change with the access and stage masks that order it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutTransition {
    /// Layout before the barrier
    pub old_layout: vk::ImageLayout,
    /// Layout after the barrier
    pub new_layout: vk::ImageLayout,
    /// Accesses that must complete first
    pub src_access: vk::AccessFlags,
    /// Accesses that wait
    pub dst_access: vk::AccessFlags,
    /// Stage of the earlier accesses
    pub src_stage: vk::PipelineStageFlags,
    /// Stage of the later accesses
    pub dst_stage: vk::PipelineStageFlags,
}

impl LayoutTransition {
    /// Fresh image about to receive a copy
    pub const UNDEFINED_TO_TRANSFER_DST: Self = Self {
        old_layout: vk::ImageLayout::UNDEFINED,
        new_layout: vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        src_access: vk::AccessFlags::empty(),
        dst_access: vk::AccessFlags::TRANSFER_WRITE,
        src_stage: vk::PipelineStageFlags::TOP_OF_PIPE,
        dst_stage: vk::PipelineStageFlags::TRANSFER,
    };

    /// Copied image handed to the fragment shader
    pub const TRANSFER_DST_TO_SHADER_READ: Self = Self {
        old_layout: vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        new_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        src_access: vk::AccessFlags::TRANSFER_WRITE,
        dst_access: vk::AccessFlags::SHADER_READ,
        src_stage: vk::PipelineStageFlags::TRANSFER,
        dst_stage: vk::PipelineStageFlags::FRAGMENT_SHADER,
    };

    fn record(self, device: &Device, command_buffer: vk::CommandBuffer, image: vk::Image) {
        let barrier = vk::ImageMemoryBarrier::builder()
            .old_layout(self.old_layout)
            .new_layout(self.new_layout)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(image)
            .subresource_range(AllocatedImage::subresource_range(vk::ImageAspectFlags::COLOR))
            .src_access_mask(self.src_access)
            .dst_access_mask(self.dst_access)
            .build();

        unsafe {
            device.cmd_pipeline_barrier(
                command_buffer,
                self.src_stage,
                self.dst_stage,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[barrier],
            );
        }
    }
}

/// Linear-filtered, repeating sampler
pub struct Sampler {
    device: Device,
    sampler: vk::Sampler,
}

impl Sampler {
    /// Create the sampler every scene texture uses
    pub fn new(device: Device) -> VulkanResult<Self> {
        let create_info = vk::SamplerCreateInfo::builder()
            .mag_filter(vk::Filter::LINEAR)
            .min_filter(vk::Filter::LINEAR)
            .address_mode_u(vk::SamplerAddressMode::REPEAT)
            .address_mode_v(vk::SamplerAddressMode::REPEAT)
            .address_mode_w(vk::SamplerAddressMode::REPEAT)
            .anisotropy_enable(false)
            .max_anisotropy(1.0)
            .border_color(vk::BorderColor::INT_OPAQUE_BLACK)
            .unnormalized_coordinates(false)
            .compare_enable(false)
            .compare_op(vk::CompareOp::ALWAYS)
            .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
            .mip_lod_bias(0.0)
            .min_lod(0.0)
            .max_lod(0.0);

        let sampler = unsafe {
            device
                .create_sampler(&create_info, None)
                .map_err(VulkanError::api("vkCreateSampler"))?
        };

        Ok(Self { device, sampler })
    }

    /// Get the sampler handle
    pub const fn handle(&self) -> vk::Sampler {
        self.sampler
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_sampler(self.sampler, None);
        }
    }
}

/// Device-local sRGB texture ready for sampling
pub struct Texture {
    image: AllocatedImage,
}

impl Texture {
    /// Upload `pixels` and transition the image for shader reads
    pub fn from_image_data(
        device: Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        command_pool: &CommandPool,
        queue: vk::Queue,
        pixels: &ImageData,
    ) -> VulkanResult<Self> {
        let expected = pixels.width as usize * pixels.height as usize * 4;
        if pixels.byte_len() != expected {
            return Err(VulkanError::InvalidOperation {
                reason: format!(
                    "{}x{} RGBA8 texture needs {} bytes, got {}",
                    pixels.width,
                    pixels.height,
                    expected,
                    pixels.byte_len()
                ),
            });
        }

        let extent = vk::Extent2D {
            width: pixels.width,
            height: pixels.height,
        };
        let staging = Buffer::staging(device.clone(), memory_properties, &pixels.data)?;
        let image = AllocatedImage::new(
            device,
            memory_properties,
            extent,
            TEXTURE_FORMAT,
            vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::SAMPLED,
            vk::ImageAspectFlags::COLOR,
        )?;

        command_pool.execute_single_time(queue, |device, command_buffer| {
            LayoutTransition::UNDEFINED_TO_TRANSFER_DST.record(device, command_buffer, image.image());

            let region = vk::BufferImageCopy::builder()
                .buffer_offset(0)
                .buffer_row_length(0)
                .buffer_image_height(0)
                .image_subresource(vk::ImageSubresourceLayers {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    mip_level: 0,
                    base_array_layer: 0,
                    layer_count: 1,
                })
                .image_offset(vk::Offset3D { x: 0, y: 0, z: 0 })
                .image_extent(vk::Extent3D {
                    width: extent.width,
                    height: extent.height,
                    depth: 1,
                })
                .build();
            unsafe {
                device.cmd_copy_buffer_to_image(
                    command_buffer,
                    staging.handle(),
                    image.image(),
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    &[region],
                );
            }

            LayoutTransition::TRANSFER_DST_TO_SHADER_READ.record(device, command_buffer, image.image());
        })?;

        log::debug!("Uploaded {}x{} texture", extent.width, extent.height);
        Ok(Self { image })
    }

    /// Get the image view handle
    pub const fn image_view(&self) -> vk::ImageView {
        self.image.view()
    }

    /// Texture dimensions
    pub const fn extent(&self) -> vk::Extent2D {
        self.image.extent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_transitions_chain() {
        let first = LayoutTransition::UNDEFINED_TO_TRANSFER_DST;
        let second = LayoutTransition::TRANSFER_DST_TO_SHADER_READ;
        assert_eq!(first.new_layout, second.old_layout);
        assert_eq!(first.dst_access, second.src_access);
        assert_eq!(first.dst_stage, second.src_stage);
    }

    #[test]
    fn test_texture_ends_readable_by_fragment_shader() {
        let last = LayoutTransition::TRANSFER_DST_TO_SHADER_READ;
        assert_eq!(last.new_layout, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
        assert_eq!(last.dst_access, vk::AccessFlags::SHADER_READ);
        assert_eq!(last.dst_stage, vk::PipelineStageFlags::FRAGMENT_SHADER);
    }

    #[test]
    fn test_textures_are_srgb() {
        assert_eq!(TEXTURE_FORMAT, vk::Format::R8G8B8A8_SRGB);
    }
}
