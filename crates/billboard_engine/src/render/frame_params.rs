//! Per-frame parameter block
//!
//! [`FrameParameters`] is the uniform buffer contents bound at set 0,
//! binding 0. It is recomputed from scratch every frame and pushed with an
//! in-band `vkCmdUpdateBuffer`, which limits it to 65536 bytes and requires a
//! size that is a multiple of 4.

use ash::vk;
use bytemuck::{Pod, Zeroable};

use crate::config::CameraSettings;
use crate::foundation::math::{to_columns, Mat4, Mat4Ext};

/// Largest payload `vkCmdUpdateBuffer` accepts
pub const MAX_INLINE_UPDATE_BYTES: usize = 65536;

/// Camera, projection and their product, laid out as three std140 `mat4`s
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameParameters {
    /// World-to-camera transform
    pub camera: [[f32; 4]; 4],
    /// Camera-to-clip transform, Y-flipped for Vulkan
    pub projection: [[f32; 4]; 4],
    /// `projection * camera`
    pub proj_cam: [[f32; 4]; 4],
}

// SAFETY: three [[f32; 4]; 4] fields, repr(C), no padding
unsafe impl Zeroable for FrameParameters {}
unsafe impl Pod for FrameParameters {}

const _: () = assert!(FrameParameters::SIZE <= MAX_INLINE_UPDATE_BYTES);
const _: () = assert!(FrameParameters::SIZE % 4 == 0);

impl FrameParameters {
    /// Size of the block in bytes
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Compute the block for a surface of `extent` seen through `camera`
    ///
    /// Pure: the same inputs always give the same block.
    pub fn compute(extent: vk::Extent2D, camera: &CameraSettings) -> Self {
        let projection = Self::projection(extent, camera);
        let view = Mat4::new_translation(&camera.translation);
        Self::from_matrices(&view, &projection)
    }

    /// Y-flipped right-handed zero-to-one perspective for `extent`
    pub fn projection(extent: vk::Extent2D, camera: &CameraSettings) -> Mat4 {
        Self::unflipped_projection(extent, camera).flip_clip_y()
    }

    /// Perspective before the Y flip
    pub fn unflipped_projection(extent: vk::Extent2D, camera: &CameraSettings) -> Mat4 {
        Mat4::perspective_rh_zo(
            camera.fov_y_degrees.to_radians(),
            aspect_ratio(extent),
            camera.near,
            camera.far,
        )
    }

    fn from_matrices(camera: &Mat4, projection: &Mat4) -> Self {
        Self {
            camera: to_columns(camera),
            projection: to_columns(projection),
            proj_cam: to_columns(&(projection * camera)),
        }
    }

    /// Bytes as uploaded to the uniform buffer
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

/// Width over height; a zero height is treated as one pixel
pub fn aspect_ratio(extent: vk::Extent2D) -> f32 {
    extent.width as f32 / extent.height.max(1) as f32
}
