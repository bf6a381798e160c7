//! Command buffer management
//!
//! One pool serves every frame slot and every one-off upload. Frame command
//! buffers are reset and re-recorded each time their slot comes around;
//! [`VulkanCommandSink`] turns the frame's command sequence into `vkCmd*`.

use ash::{vk, Device};

use crate::render::backend::GpuHandle;
use crate::render::barrier::BufferTransition;
use crate::render::commands::CommandSink;
use crate::render::vulkan::context::{VulkanError, VulkanResult};

/// Command pool wrapper with RAII cleanup
pub struct CommandPool {
    device: Device,
    command_pool: vk::CommandPool,
}

impl CommandPool {
    /// Create a pool whose buffers can be reset individually
    pub fn new(device: Device, queue_family_index: u32) -> VulkanResult<Self> {
        let pool_create_info = vk::CommandPoolCreateInfo::builder()
            .flags(vk::CommandPoolCreateFlags::TRANSIENT | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
            .queue_family_index(queue_family_index);

        let command_pool = unsafe {
            device
                .create_command_pool(&pool_create_info, None)
                .map_err(VulkanError::api("vkCreateCommandPool"))?
        };

        Ok(Self { device, command_pool })
    }

    /// Allocate one primary command buffer owned by the returned wrapper
    pub fn allocate(&self) -> VulkanResult<CommandBuffer> {
        let alloc_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(self.command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);

        let command_buffers = unsafe {
            self.device
                .allocate_command_buffers(&alloc_info)
                .map_err(VulkanError::api("vkAllocateCommandBuffers"))?
        };
        let command_buffer = command_buffers.into_iter().next().ok_or_else(|| VulkanError::InvalidOperation {
            reason: "vkAllocateCommandBuffers returned no buffers".to_string(),
        })?;

        Ok(CommandBuffer {
            device: self.device.clone(),
            pool: self.command_pool,
            command_buffer,
        })
    }

    /// Record and submit a one-off command buffer, then wait for the queue
    ///
    /// Used for uploads at scene load; never on the frame path.
    pub fn execute_single_time<F>(&self, queue: vk::Queue, record: F) -> VulkanResult<()>
    where
        F: FnOnce(&Device, vk::CommandBuffer),
    {
        let command_buffer = self.allocate()?;
        let begin_info = vk::CommandBufferBeginInfo::builder().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

        unsafe {
            self.device
                .begin_command_buffer(command_buffer.handle(), &begin_info)
                .map_err(VulkanError::api("vkBeginCommandBuffer"))?;
        }

        record(&self.device, command_buffer.handle());

        let buffers = [command_buffer.handle()];
        let submit_info = vk::SubmitInfo::builder().command_buffers(&buffers).build();
        unsafe {
            self.device
                .end_command_buffer(command_buffer.handle())
                .map_err(VulkanError::api("vkEndCommandBuffer"))?;
            self.device
                .queue_submit(queue, &[submit_info], vk::Fence::null())
                .map_err(VulkanError::api("vkQueueSubmit"))?;
            self.device
                .queue_wait_idle(queue)
                .map_err(VulkanError::api("vkQueueWaitIdle"))?;
        }
        Ok(())
    }
}

impl Drop for CommandPool {
    fn drop(&mut self) {
        unsafe {
            // Frees any buffers still allocated from it
            self.device.destroy_command_pool(self.command_pool, None);
        }
    }
}

/// Primary command buffer freed back to its pool on drop
pub struct CommandBuffer {
    device: Device,
    pool: vk::CommandPool,
    command_buffer: vk::CommandBuffer,
}

impl CommandBuffer {
    /// Reset, begin, hand a sink to `record`, end
    pub fn record<F>(&self, record: F) -> VulkanResult<()>
    where
        F: FnOnce(&mut dyn CommandSink),
    {
        let begin_info = vk::CommandBufferBeginInfo::builder().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

        unsafe {
            self.device
                .reset_command_buffer(self.command_buffer, vk::CommandBufferResetFlags::empty())
                .map_err(VulkanError::api("vkResetCommandBuffer"))?;
            self.device
                .begin_command_buffer(self.command_buffer, &begin_info)
                .map_err(VulkanError::api("vkBeginCommandBuffer"))?;
        }

        let mut sink = VulkanCommandSink {
            device: &self.device,
            command_buffer: self.command_buffer,
        };
        record(&mut sink);

        unsafe {
            self.device
                .end_command_buffer(self.command_buffer)
                .map_err(VulkanError::api("vkEndCommandBuffer"))
        }
    }
}

impl GpuHandle<vk::CommandBuffer> for CommandBuffer {
    fn handle(&self) -> vk::CommandBuffer {
        self.command_buffer
    }
}

impl Drop for CommandBuffer {
    fn drop(&mut self) {
        unsafe {
            self.device.free_command_buffers(self.pool, &[self.command_buffer]);
        }
    }
}

/// [`CommandSink`] writing into a command buffer in the recording state
pub struct VulkanCommandSink<'a> {
    device: &'a Device,
    command_buffer: vk::CommandBuffer,
}

impl CommandSink for VulkanCommandSink<'_> {
    fn buffer_barrier(&mut self, buffer: vk::Buffer, transition: BufferTransition) {
        let barrier = transition.buffer_barrier(buffer);
        unsafe {
            self.device.cmd_pipeline_barrier(
                self.command_buffer,
                transition.src_stage,
                transition.dst_stage,
                vk::DependencyFlags::empty(),
                &[],
                &[barrier],
                &[],
            );
        }
    }

    fn update_buffer(&mut self, buffer: vk::Buffer, offset: vk::DeviceSize, data: &[u8]) {
        unsafe {
            self.device.cmd_update_buffer(self.command_buffer, buffer, offset, data);
        }
    }

    fn begin_render_pass(
        &mut self,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        render_area: vk::Rect2D,
        clear_color: [f32; 4],
        clear_depth: f32,
    ) {
        let clear_values = [
            vk::ClearValue {
                color: vk::ClearColorValue { float32: clear_color },
            },
            vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue {
                    depth: clear_depth,
                    stencil: 0,
                },
            },
        ];
        let begin_info = vk::RenderPassBeginInfo::builder()
            .render_pass(render_pass)
            .framebuffer(framebuffer)
            .render_area(render_area)
            .clear_values(&clear_values);

        unsafe {
            self.device
                .cmd_begin_render_pass(self.command_buffer, &begin_info, vk::SubpassContents::INLINE);
        }
    }

    fn bind_pipeline(&mut self, pipeline: vk::Pipeline) {
        unsafe {
            self.device
                .cmd_bind_pipeline(self.command_buffer, vk::PipelineBindPoint::GRAPHICS, pipeline);
        }
    }

    fn bind_descriptor_set(&mut self, layout: vk::PipelineLayout, set_index: u32, set: vk::DescriptorSet) {
        unsafe {
            self.device.cmd_bind_descriptor_sets(
                self.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                layout,
                set_index,
                &[set],
                &[],
            );
        }
    }

    fn bind_vertex_buffers(&mut self, first_binding: u32, buffers: &[vk::Buffer]) {
        let offsets = vec![0; buffers.len()];
        unsafe {
            self.device
                .cmd_bind_vertex_buffers(self.command_buffer, first_binding, buffers, &offsets);
        }
    }

    fn draw(&mut self, vertex_count: u32) {
        unsafe {
            self.device.cmd_draw(self.command_buffer, vertex_count, 1, 0, 0);
        }
    }

    fn end_render_pass(&mut self) {
        unsafe {
            self.device.cmd_end_render_pass(self.command_buffer);
        }
    }
}
