//! Device-local 2D images with a single view

use ash::{vk, Device};

use crate::render::vulkan::context::{VulkanError, VulkanResult};
use crate::render::vulkan::memory;

/// Image, its memory and a view over the whole image
pub struct AllocatedImage {
    device: Device,
    image: vk::Image,
    memory: vk::DeviceMemory,
    view: vk::ImageView,
    extent: vk::Extent2D,
}

impl AllocatedImage {
    /// Create a single-mip, single-layer, optimally tiled image
    pub fn new(
        device: Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        extent: vk::Extent2D,
        format: vk::Format,
        usage: vk::ImageUsageFlags,
        aspect: vk::ImageAspectFlags,
    ) -> VulkanResult<Self> {
        let image_create_info = vk::ImageCreateInfo::builder()
            .image_type(vk::ImageType::TYPE_2D)
            .extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .format(format)
            .tiling(vk::ImageTiling::OPTIMAL)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .samples(vk::SampleCountFlags::TYPE_1);

        let image = unsafe {
            device
                .create_image(&image_create_info, None)
                .map_err(VulkanError::api("vkCreateImage"))?
        };

        let requirements = unsafe { device.get_image_memory_requirements(image) };
        let memory = match memory::allocate(
            &device,
            memory_properties,
            requirements,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        ) {
            Ok(memory) => memory,
            Err(e) => {
                unsafe { device.destroy_image(image, None) };
                return Err(e);
            }
        };

        // From here on Drop cleans up whatever exists
        let mut result = Self {
            device,
            image,
            memory,
            view: vk::ImageView::null(),
            extent,
        };

        unsafe {
            result
                .device
                .bind_image_memory(image, memory, 0)
                .map_err(VulkanError::api("vkBindImageMemory"))?;
        }

        let view_create_info = vk::ImageViewCreateInfo::builder()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .subresource_range(Self::subresource_range(aspect));

        result.view = unsafe {
            result
                .device
                .create_image_view(&view_create_info, None)
                .map_err(VulkanError::api("vkCreateImageView"))?
        };

        Ok(result)
    }

    /// Whole-image subresource range for `aspect`
    pub const fn subresource_range(aspect: vk::ImageAspectFlags) -> vk::ImageSubresourceRange {
        vk::ImageSubresourceRange {
            aspect_mask: aspect,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        }
    }

    /// Image handle
    pub const fn image(&self) -> vk::Image {
        self.image
    }

    /// View over the whole image
    pub const fn view(&self) -> vk::ImageView {
        self.view
    }

    /// Dimensions
    pub const fn extent(&self) -> vk::Extent2D {
        self.extent
    }
}

impl Drop for AllocatedImage {
    fn drop(&mut self) {
        unsafe {
            if self.view != vk::ImageView::null() {
                self.device.destroy_image_view(self.view, None);
            }
            self.device.destroy_image(self.image, None);
            self.device.free_memory(self.memory, None);
        }
    }
}
