//! Vulkan rendering backend
//!
//! RAII wrappers over `ash` objects plus the [`VulkanBackend`] that plugs them
//! into the frame driver. Every wrapper holds a clone of the logical device
//! and destroys its handle on drop; the shared [`VulkanContext`] outlives them
//! all through an `Arc`.

pub mod backend;
pub mod buffer;
pub mod commands;
pub mod context;
pub mod descriptor_set;
pub mod framebuffer;
pub mod image;
pub mod memory;
pub mod pipeline;
pub mod render_pass;
pub mod scene;
pub mod swapchain;
pub mod sync;
pub mod texture;
pub mod window;

pub use backend::VulkanBackend;
pub use buffer::Buffer;
pub use commands::{CommandBuffer, CommandPool};
pub use context::{LogicalDevice, PhysicalDeviceInfo, VulkanContext, VulkanError, VulkanInstance, VulkanResult};
pub use framebuffer::{DepthBuffer, Framebuffer};
pub use pipeline::{GraphicsPipeline, PipelineLayout, ShaderModule};
pub use render_pass::RenderPass;
pub use scene::SceneResources;
pub use swapchain::Swapchain;
pub use sync::{Fence, Semaphore};
pub use texture::{Sampler, Texture};
pub use window::{Window, WindowError, WindowResult};
