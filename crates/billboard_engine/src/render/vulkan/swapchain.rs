//! Vulkan swapchain management
//!
//! A [`Swapchain`] is one surface generation: its images, their views and the
//! format and extent they share. Recreation builds a new generation from the
//! old handle and drops the old one.

use ash::extensions::khr::Swapchain as SwapchainLoader;
use ash::{vk, Device};

use crate::render::backend::SurfaceInfo;
use crate::render::vulkan::context::{VulkanContext, VulkanError, VulkanResult};

/// Swapchain wrapper with RAII cleanup
pub struct Swapchain {
    device: Device,
    swapchain_loader: SwapchainLoader,
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    format: vk::SurfaceFormatKHR,
    extent: vk::Extent2D,
}

impl Swapchain {
    /// Create a swapchain for the context's surface
    ///
    /// `old_swapchain` may be null; otherwise it is retired by the new one and
    /// must still be destroyed by its owner.
    pub fn new(
        context: &VulkanContext,
        window_extent: vk::Extent2D,
        old_swapchain: vk::SwapchainKHR,
    ) -> VulkanResult<Self> {
        let physical_device = context.physical_device().device;
        let surface = context.surface();
        let surface_loader = context.surface_loader();

        let surface_caps = unsafe {
            surface_loader
                .get_physical_device_surface_capabilities(physical_device, surface)
                .map_err(VulkanError::api("vkGetPhysicalDeviceSurfaceCapabilitiesKHR"))?
        };
        let surface_formats = unsafe {
            surface_loader
                .get_physical_device_surface_formats(physical_device, surface)
                .map_err(VulkanError::api("vkGetPhysicalDeviceSurfaceFormatsKHR"))?
        };

        let format = choose_surface_format(&surface_formats)
            .ok_or_else(|| VulkanError::InitializationFailed("Surface reports no formats".to_string()))?;
        let extent = choose_extent(&surface_caps, window_extent);
        let image_count = choose_image_count(&surface_caps);

        let (sharing_mode, queue_families) = if context.graphics_queue_family() == context.present_queue_family() {
            (vk::SharingMode::EXCLUSIVE, Vec::new())
        } else {
            (
                vk::SharingMode::CONCURRENT,
                vec![context.graphics_queue_family(), context.present_queue_family()],
            )
        };

        // FIFO is the only mode every implementation must support
        let swapchain_create_info = vk::SwapchainCreateInfoKHR::builder()
            .surface(surface)
            .min_image_count(image_count)
            .image_format(format.format)
            .image_color_space(format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(sharing_mode)
            .queue_family_indices(&queue_families)
            .pre_transform(surface_caps.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(vk::PresentModeKHR::FIFO)
            .clipped(true)
            .old_swapchain(old_swapchain);

        let device = context.device().clone();
        let swapchain_loader = context.swapchain_loader().clone();
        let swapchain = unsafe {
            swapchain_loader
                .create_swapchain(&swapchain_create_info, None)
                .map_err(VulkanError::api("vkCreateSwapchainKHR"))?
        };

        // Owned from here on so a failure below still destroys what exists
        let mut result = Self {
            device,
            swapchain_loader,
            swapchain,
            images: Vec::new(),
            image_views: Vec::new(),
            format,
            extent,
        };

        result.images = unsafe {
            result
                .swapchain_loader
                .get_swapchain_images(swapchain)
                .map_err(VulkanError::api("vkGetSwapchainImagesKHR"))?
        };

        for &image in &result.images {
            let create_info = vk::ImageViewCreateInfo::builder()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(format.format)
                .components(vk::ComponentMapping::default())
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    base_mip_level: 0,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: 1,
                });
            let view = unsafe {
                result
                    .device
                    .create_image_view(&create_info, None)
                    .map_err(VulkanError::api("vkCreateImageView"))?
            };
            result.image_views.push(view);
        }

        log::debug!(
            "Swapchain created: {}x{} {:?}, {} images",
            extent.width,
            extent.height,
            format.format,
            result.images.len()
        );
        Ok(result)
    }

    /// Get the swapchain handle
    pub const fn handle(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    /// Image views, indexed by image index
    pub fn image_views(&self) -> &[vk::ImageView] {
        &self.image_views
    }

    /// Format, extent and image count of this generation
    pub fn info(&self) -> SurfaceInfo {
        SurfaceInfo {
            format: self.format.format,
            extent: self.extent,
            image_count: self.images.len(),
        }
    }

    /// Acquire the next image, signaling `semaphore` when it is ready
    ///
    /// Returns the raw acquire result: `Ok((index, suboptimal))` or the error
    /// code, including `ERROR_OUT_OF_DATE_KHR`.
    pub fn acquire_next_image(&self, semaphore: vk::Semaphore) -> Result<(u32, bool), vk::Result> {
        unsafe {
            self.swapchain_loader
                .acquire_next_image(self.swapchain, u64::MAX, semaphore, vk::Fence::null())
        }
    }

    /// Queue `image_index` for presentation after `wait` is signaled
    ///
    /// Returns `Ok(true)` when the presentation was suboptimal.
    pub fn present(&self, queue: vk::Queue, image_index: u32, wait: vk::Semaphore) -> Result<bool, vk::Result> {
        let wait_semaphores = [wait];
        let swapchains = [self.swapchain];
        let image_indices = [image_index];
        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        unsafe { self.swapchain_loader.queue_present(queue, &present_info) }
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            for &view in &self.image_views {
                self.device.destroy_image_view(view, None);
            }
            self.swapchain_loader.destroy_swapchain(self.swapchain, None);
        }
    }
}

/// Prefer sRGB BGRA8, fall back to whatever the surface lists first
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    formats
        .iter()
        .find(|sf| sf.format == vk::Format::B8G8R8A8_SRGB && sf.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR)
        .or_else(|| formats.first())
        .copied()
}

/// Use the surface's extent when it dictates one, else clamp the window's
pub fn choose_extent(caps: &vk::SurfaceCapabilitiesKHR, window_extent: vk::Extent2D) -> vk::Extent2D {
    if caps.current_extent.width != u32::MAX {
        return caps.current_extent;
    }
    vk::Extent2D {
        width: window_extent
            .width
            .clamp(caps.min_image_extent.width, caps.max_image_extent.width),
        height: window_extent
            .height
            .clamp(caps.min_image_extent.height, caps.max_image_extent.height),
    }
}

/// One more than the minimum, capped by the maximum when there is one
pub const fn choose_image_count(caps: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let wanted = caps.min_image_count + 1;
    if caps.max_image_count > 0 && wanted > caps.max_image_count {
        caps.max_image_count
    } else {
        wanted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(min: u32, max: u32, current: vk::Extent2D) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            min_image_count: min,
            max_image_count: max,
            current_extent: current,
            min_image_extent: vk::Extent2D { width: 1, height: 1 },
            max_image_extent: vk::Extent2D { width: 4096, height: 4096 },
            ..Default::default()
        }
    }

    fn surface_format(format: vk::Format) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR {
            format,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        }
    }

    #[test]
    fn test_prefers_srgb_bgra() {
        let formats = [
            surface_format(vk::Format::R8G8B8A8_UNORM),
            surface_format(vk::Format::B8G8R8A8_SRGB),
        ];
        assert_eq!(choose_surface_format(&formats).unwrap().format, vk::Format::B8G8R8A8_SRGB);
    }

    #[test]
    fn test_falls_back_to_first_format() {
        let formats = [surface_format(vk::Format::R8G8B8A8_UNORM)];
        assert_eq!(choose_surface_format(&formats).unwrap().format, vk::Format::R8G8B8A8_UNORM);
        assert!(choose_surface_format(&[]).is_none());
    }

    #[test]
    fn test_image_count_is_min_plus_one() {
        let any = vk::Extent2D { width: 800, height: 600 };
        assert_eq!(choose_image_count(&caps(2, 0, any)), 3);
        assert_eq!(choose_image_count(&caps(2, 8, any)), 3);
        assert_eq!(choose_image_count(&caps(3, 3, any)), 3);
    }

    #[test]
    fn test_surface_dictated_extent_wins() {
        let current = vk::Extent2D { width: 800, height: 600 };
        let window = vk::Extent2D { width: 1024, height: 768 };
        assert_eq!(choose_extent(&caps(2, 0, current), window), current);
    }

    #[test]
    fn test_window_extent_is_clamped() {
        let undefined = vk::Extent2D { width: u32::MAX, height: u32::MAX };
        let window = vk::Extent2D { width: 8000, height: 0 };
        assert_eq!(
            choose_extent(&caps(2, 0, undefined), window),
            vk::Extent2D { width: 4096, height: 1 }
        );
    }
}
