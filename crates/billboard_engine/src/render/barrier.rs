//! Buffer access transitions
//!
//! A buffer written by one pipeline stage and read by another inside the same
//! frame is bracketed by a pair of [`BufferTransition`]s: one before the write
//! that invalidates the previous reader's access, and its [`reverse`] after
//! the write that narrows visibility back to the reader.
//!
//! [`reverse`]: BufferTransition::reverse

use ash::vk;

/// Source/destination access and stage masks for a whole-buffer barrier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferTransition {
    /// Access being made available
    pub src_access: vk::AccessFlags,
    /// Access being made visible
    pub dst_access: vk::AccessFlags,
    /// Stage that performed the source access
    pub src_stage: vk::PipelineStageFlags,
    /// Stage that will perform the destination access
    pub dst_stage: vk::PipelineStageFlags,
}

impl BufferTransition {
    /// Uniform buffer read by the vertex shader, about to be overwritten by a transfer
    pub const UNIFORM_READ_TO_TRANSFER_WRITE: Self = Self {
        src_access: vk::AccessFlags::UNIFORM_READ,
        dst_access: vk::AccessFlags::TRANSFER_WRITE,
        src_stage: vk::PipelineStageFlags::VERTEX_SHADER,
        dst_stage: vk::PipelineStageFlags::TRANSFER,
    };

    /// Uniform buffer just written by a transfer, about to be read by the vertex shader
    pub const TRANSFER_WRITE_TO_UNIFORM_READ: Self = Self::UNIFORM_READ_TO_TRANSFER_WRITE.reverse();

    /// Freshly uploaded vertex data, about to be fetched as vertex attributes
    pub const TRANSFER_WRITE_TO_VERTEX_READ: Self = Self {
        src_access: vk::AccessFlags::TRANSFER_WRITE,
        dst_access: vk::AccessFlags::VERTEX_ATTRIBUTE_READ,
        src_stage: vk::PipelineStageFlags::TRANSFER,
        dst_stage: vk::PipelineStageFlags::VERTEX_INPUT,
    };

    /// The transition that undoes this one
    pub const fn reverse(self) -> Self {
        Self {
            src_access: self.dst_access,
            dst_access: self.src_access,
            src_stage: self.dst_stage,
            dst_stage: self.src_stage,
        }
    }

    /// Whole-buffer barrier on `buffer`, no queue family transfer
    pub fn buffer_barrier(self, buffer: vk::Buffer) -> vk::BufferMemoryBarrier {
        vk::BufferMemoryBarrier::builder()
            .src_access_mask(self.src_access)
            .dst_access_mask(self.dst_access)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .buffer(buffer)
            .offset(0)
            .size(vk::WHOLE_SIZE)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    #[test]
    fn test_uniform_pair_is_symmetric() {
        let before = BufferTransition::UNIFORM_READ_TO_TRANSFER_WRITE;
        let after = BufferTransition::TRANSFER_WRITE_TO_UNIFORM_READ;

        assert_eq!(after.src_access, vk::AccessFlags::TRANSFER_WRITE);
        assert_eq!(after.dst_access, vk::AccessFlags::UNIFORM_READ);
        assert_eq!(after.src_stage, vk::PipelineStageFlags::TRANSFER);
        assert_eq!(after.dst_stage, vk::PipelineStageFlags::VERTEX_SHADER);
        assert_eq!(after.reverse(), before);
    }

    #[test]
    fn test_barrier_covers_whole_buffer() {
        let buffer = vk::Buffer::from_raw(42);
        let barrier = BufferTransition::TRANSFER_WRITE_TO_VERTEX_READ.buffer_barrier(buffer);

        assert_eq!(barrier.buffer, buffer);
        assert_eq!(barrier.offset, 0);
        assert_eq!(barrier.size, vk::WHOLE_SIZE);
        assert_eq!(barrier.src_queue_family_index, vk::QUEUE_FAMILY_IGNORED);
        assert_eq!(barrier.dst_access_mask, vk::AccessFlags::VERTEX_ATTRIBUTE_READ);
    }
}
