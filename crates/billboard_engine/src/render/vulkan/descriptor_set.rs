//! Descriptor set layouts, pool and writes
//!
//! The scene binds two sets: set 0 holds the frame parameters uniform buffer
//! for the vertex stage, set 1 holds one object's texture for the fragment
//! stage. Sets are written once at load and never change afterwards.

use ash::{vk, Device};

use crate::render::vulkan::context::{VulkanError, VulkanResult};

/// Descriptor set layout builder
#[derive(Debug, Default)]
pub struct DescriptorSetLayoutBuilder {
    bindings: Vec<vk::DescriptorSetLayoutBinding>,
}

impl DescriptorSetLayoutBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a uniform buffer binding
    pub fn add_uniform_buffer(self, binding: u32, stage_flags: vk::ShaderStageFlags) -> Self {
        self.add(binding, vk::DescriptorType::UNIFORM_BUFFER, stage_flags)
    }

    /// Add a combined image sampler binding
    pub fn add_combined_image_sampler(self, binding: u32, stage_flags: vk::ShaderStageFlags) -> Self {
        self.add(binding, vk::DescriptorType::COMBINED_IMAGE_SAMPLER, stage_flags)
    }

    fn add(mut self, binding: u32, descriptor_type: vk::DescriptorType, stage_flags: vk::ShaderStageFlags) -> Self {
        self.bindings.push(
            vk::DescriptorSetLayoutBinding::builder()
                .binding(binding)
                .descriptor_type(descriptor_type)
                .descriptor_count(1)
                .stage_flags(stage_flags)
                .build(),
        );
        self
    }

    /// Bindings added so far
    pub fn bindings(&self) -> &[vk::DescriptorSetLayoutBinding] {
        &self.bindings
    }

    /// Build the descriptor set layout
    pub fn build(self, device: &Device) -> VulkanResult<DescriptorSetLayout> {
        let layout_info = vk::DescriptorSetLayoutCreateInfo::builder().bindings(&self.bindings);

        let layout = unsafe { device.create_descriptor_set_layout(&layout_info, None) }
            .map_err(VulkanError::api("vkCreateDescriptorSetLayout"))?;

        Ok(DescriptorSetLayout {
            layout,
            device: device.clone(),
        })
    }
}

/// Layout of set 0: frame parameters, read by the vertex shader
pub fn scene_set_layout() -> DescriptorSetLayoutBuilder {
    DescriptorSetLayoutBuilder::new().add_uniform_buffer(0, vk::ShaderStageFlags::VERTEX)
}

/// Layout of set 1: one texture, sampled by the fragment shader
pub fn object_set_layout() -> DescriptorSetLayoutBuilder {
    DescriptorSetLayoutBuilder::new().add_combined_image_sampler(0, vk::ShaderStageFlags::FRAGMENT)
}

/// Descriptor set layout wrapper with automatic cleanup
pub struct DescriptorSetLayout {
    layout: vk::DescriptorSetLayout,
    device: Device,
}

impl DescriptorSetLayout {
    /// Get the Vulkan descriptor set layout handle
    pub const fn handle(&self) -> vk::DescriptorSetLayout {
        self.layout
    }
}

impl Drop for DescriptorSetLayout {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_descriptor_set_layout(self.layout, None);
        }
    }
}

/// Pool sizes for one scene set and `object_sets` object sets
pub fn scene_pool_sizes(object_sets: u32) -> [vk::DescriptorPoolSize; 2] {
    [
        vk::DescriptorPoolSize {
            ty: vk::DescriptorType::UNIFORM_BUFFER,
            descriptor_count: 1,
        },
        vk::DescriptorPoolSize {
            ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            descriptor_count: object_sets,
        },
    ]
}

/// Descriptor pool; sets are freed with the pool
pub struct DescriptorPool {
    pool: vk::DescriptorPool,
    device: Device,
}

impl DescriptorPool {
    /// Create a pool with room for `max_sets` sets drawn from `pool_sizes`
    pub fn new(device: Device, max_sets: u32, pool_sizes: &[vk::DescriptorPoolSize]) -> VulkanResult<Self> {
        let pool_info = vk::DescriptorPoolCreateInfo::builder()
            .max_sets(max_sets)
            .pool_sizes(pool_sizes);

        let pool = unsafe { device.create_descriptor_pool(&pool_info, None) }
            .map_err(VulkanError::api("vkCreateDescriptorPool"))?;

        Ok(Self { pool, device })
    }

    /// Allocate one set per layout, in order
    pub fn allocate(&self, layouts: &[vk::DescriptorSetLayout]) -> VulkanResult<Vec<vk::DescriptorSet>> {
        let alloc_info = vk::DescriptorSetAllocateInfo::builder()
            .descriptor_pool(self.pool)
            .set_layouts(layouts);

        unsafe { self.device.allocate_descriptor_sets(&alloc_info) }
            .map_err(VulkanError::api("vkAllocateDescriptorSets"))
    }
}

impl Drop for DescriptorPool {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_descriptor_pool(self.pool, None);
        }
    }
}

/// Batches descriptor writes and applies them in one call
///
/// Buffer and image infos are kept in their own vectors and only turned into
/// `VkWriteDescriptorSet`s inside [`DescriptorSetWriter::update`], so the
/// pointers the writes carry stay valid for the call.
#[derive(Debug, Default)]
pub struct DescriptorSetWriter {
    buffer_writes: Vec<(vk::DescriptorSet, u32, vk::DescriptorBufferInfo)>,
    image_writes: Vec<(vk::DescriptorSet, u32, vk::DescriptorImageInfo)>,
}

impl DescriptorSetWriter {
    /// Create an empty writer
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the whole of `buffer` as a uniform buffer
    pub fn write_uniform_buffer(mut self, set: vk::DescriptorSet, binding: u32, buffer: vk::Buffer) -> Self {
        self.buffer_writes.push((
            set,
            binding,
            vk::DescriptorBufferInfo {
                buffer,
                offset: 0,
                range: vk::WHOLE_SIZE,
            },
        ));
        self
    }

    /// Bind `image_view` with `sampler`, expected in shader-read layout
    pub fn write_combined_image_sampler(
        mut self,
        set: vk::DescriptorSet,
        binding: u32,
        image_view: vk::ImageView,
        sampler: vk::Sampler,
    ) -> Self {
        self.image_writes.push((
            set,
            binding,
            vk::DescriptorImageInfo {
                sampler,
                image_view,
                image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            },
        ));
        self
    }

    /// Number of queued writes
    pub fn len(&self) -> usize {
        self.buffer_writes.len() + self.image_writes.len()
    }

    /// Whether no writes are queued
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply all queued writes
    pub fn update(self, device: &Device) {
        let buffer_writes = self.buffer_writes.iter().map(|(set, binding, info)| {
            vk::WriteDescriptorSet::builder()
                .dst_set(*set)
                .dst_binding(*binding)
                .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                .buffer_info(std::slice::from_ref(info))
                .build()
        });
        let image_writes = self.image_writes.iter().map(|(set, binding, info)| {
            vk::WriteDescriptorSet::builder()
                .dst_set(*set)
                .dst_binding(*binding)
                .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                .image_info(std::slice::from_ref(info))
                .build()
        });
        let writes: Vec<vk::WriteDescriptorSet> = buffer_writes.chain(image_writes).collect();

        unsafe {
            device.update_descriptor_sets(&writes, &[]);
        }
    }
}
