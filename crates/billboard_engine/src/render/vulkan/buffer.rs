//! Buffer management for vertex streams and uniforms
//!
//! Static data lives in device-local memory and is uploaded once through a
//! host-visible staging buffer. The uniform buffer is device-local too and is
//! written in-band by each frame's command buffer.

use ash::{vk, Device};

use crate::render::barrier::BufferTransition;
use crate::render::vulkan::commands::CommandPool;
use crate::render::vulkan::context::{VulkanError, VulkanResult};
use crate::render::vulkan::memory;

/// Buffer wrapper with a dedicated allocation
pub struct Buffer {
    device: Device,
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    size: vk::DeviceSize,
}

impl Buffer {
    /// Create a buffer and bind fresh memory with `properties`
    pub fn new(
        device: Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        properties: vk::MemoryPropertyFlags,
    ) -> VulkanResult<Self> {
        let buffer_info = vk::BufferCreateInfo::builder()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe {
            device
                .create_buffer(&buffer_info, None)
                .map_err(VulkanError::api("vkCreateBuffer"))?
        };

        let requirements = unsafe { device.get_buffer_memory_requirements(buffer) };
        let memory = match memory::allocate(&device, memory_properties, requirements, properties) {
            Ok(memory) => memory,
            Err(e) => {
                unsafe { device.destroy_buffer(buffer, None) };
                return Err(e);
            }
        };

        let result = Self {
            device,
            buffer,
            memory,
            size,
        };
        unsafe {
            result
                .device
                .bind_buffer_memory(buffer, memory, 0)
                .map_err(VulkanError::api("vkBindBufferMemory"))?;
        }
        Ok(result)
    }

    /// Host-visible, coherent staging buffer holding `data`
    pub fn staging(
        device: Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        data: &[u8],
    ) -> VulkanResult<Self> {
        let buffer = Self::new(
            device,
            memory_properties,
            data.len() as vk::DeviceSize,
            vk::BufferUsageFlags::TRANSFER_SRC,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;
        buffer.write_bytes(data)?;
        Ok(buffer)
    }

    /// Device-local buffer initialized from `data` through a staging copy
    ///
    /// The copy is followed by a barrier making the transfer write visible to
    /// `first_use`, then the queue is drained.
    pub fn device_local_with_data(
        device: Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        command_pool: &CommandPool,
        queue: vk::Queue,
        usage: vk::BufferUsageFlags,
        data: &[u8],
        first_use: BufferTransition,
    ) -> VulkanResult<Self> {
        let size = data.len() as vk::DeviceSize;
        let staging = Self::staging(device.clone(), memory_properties, data)?;
        let buffer = Self::new(
            device,
            memory_properties,
            size,
            usage | vk::BufferUsageFlags::TRANSFER_DST,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        )?;

        command_pool.execute_single_time(queue, |device, command_buffer| {
            let region = vk::BufferCopy {
                src_offset: 0,
                dst_offset: 0,
                size,
            };
            let barrier = first_use.buffer_barrier(buffer.buffer);
            unsafe {
                device.cmd_copy_buffer(command_buffer, staging.buffer, buffer.buffer, &[region]);
                device.cmd_pipeline_barrier(
                    command_buffer,
                    first_use.src_stage,
                    first_use.dst_stage,
                    vk::DependencyFlags::empty(),
                    &[],
                    &[barrier],
                    &[],
                );
            }
        })?;

        Ok(buffer)
    }

    /// Copy `data` to the start of a host-visible buffer
    pub fn write_bytes(&self, data: &[u8]) -> VulkanResult<()> {
        if data.len() as vk::DeviceSize > self.size {
            return Err(VulkanError::InvalidOperation {
                reason: format!("{} bytes do not fit a {} byte buffer", data.len(), self.size),
            });
        }

        unsafe {
            let ptr = self
                .device
                .map_memory(self.memory, 0, self.size, vk::MemoryMapFlags::empty())
                .map_err(VulkanError::api("vkMapMemory"))?;
            std::ptr::copy_nonoverlapping(data.as_ptr(), ptr.cast::<u8>(), data.len());
            self.device.unmap_memory(self.memory);
        }
        Ok(())
    }

    /// Get buffer handle
    pub const fn handle(&self) -> vk::Buffer {
        self.buffer
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_buffer(self.buffer, None);
            self.device.free_memory(self.memory, None);
        }
    }
}
