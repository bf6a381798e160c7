//! GPU-resident scene
//!
//! Uploads the ground plane and sprite meshes, their textures and the frame
//! parameters uniform buffer, then writes the descriptor sets once. Nothing
//! here depends on the surface, so the scene survives every recreation.

use std::sync::Arc;

use ash::vk;

use crate::assets::{names, AssetManifest, ImageData, MeshData};
use crate::error::EngineResult;
use crate::render::barrier::BufferTransition;
use crate::render::commands::{DrawBatch, SceneBindings};
use crate::render::frame_params::FrameParameters;
use crate::render::vulkan::backend::VulkanBackend;
use crate::render::vulkan::buffer::Buffer;
use crate::render::vulkan::context::{VulkanContext, VulkanError};
use crate::render::vulkan::descriptor_set::{scene_pool_sizes, DescriptorPool, DescriptorSetWriter};
use crate::render::vulkan::texture::{Sampler, Texture};

/// Scene set plus one object set per textured mesh
const MAX_SETS: u32 = 3;
const OBJECT_SETS: u32 = 2;

/// Vertex streams of one uploaded mesh
struct GpuMesh {
    positions: Buffer,
    texcoords: Buffer,
    vertex_count: u32,
}

/// Everything both draws reference, alive for the whole run
pub struct SceneResources {
    bindings: SceneBindings,
    // Sets are freed with the pool
    _descriptor_pool: DescriptorPool,
    _floor_texture: Texture,
    _sprite_texture: Texture,
    _sampler: Sampler,
    _floor: GpuMesh,
    _sprite: GpuMesh,
    _uniform_buffer: Buffer,
    _context: Arc<VulkanContext>,
}

impl SceneResources {
    /// Upload the scene and write its descriptor sets
    pub fn load(context: Arc<VulkanContext>, backend: &VulkanBackend, assets: &AssetManifest) -> EngineResult<Self> {
        log::info!("Loading scene resources");
        let device = context.device().clone();
        let memory_properties = &context.physical_device().memory_properties;
        let queue = context.graphics_queue();
        let pool = backend.command_pool();

        // Written in-band each frame, so it only needs transfer-destination usage
        let uniform_buffer = Buffer::new(
            device.clone(),
            memory_properties,
            FrameParameters::SIZE as vk::DeviceSize,
            vk::BufferUsageFlags::UNIFORM_BUFFER | vk::BufferUsageFlags::TRANSFER_DST,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        )?;

        let upload_mesh = |mesh: &MeshData| -> EngineResult<GpuMesh> {
            let upload = |bytes: &[u8]| {
                Buffer::device_local_with_data(
                    device.clone(),
                    memory_properties,
                    pool,
                    queue,
                    vk::BufferUsageFlags::VERTEX_BUFFER,
                    bytes,
                    BufferTransition::TRANSFER_WRITE_TO_VERTEX_READ,
                )
            };
            Ok(GpuMesh {
                positions: upload(mesh.position_bytes())?,
                texcoords: upload(mesh.texcoord_bytes())?,
                vertex_count: mesh.vertex_count(),
            })
        };
        let floor = upload_mesh(&MeshData::plane())?;
        let sprite = upload_mesh(&MeshData::sprite())?;

        let upload_texture = |name: &str| -> EngineResult<Texture> {
            let pixels = ImageData::from_file(assets.resolve(name)?)?;
            Ok(Texture::from_image_data(
                device.clone(),
                memory_properties,
                pool,
                queue,
                &pixels,
            )?)
        };
        let floor_texture = upload_texture(names::FLOOR_TEXTURE)?;
        let sprite_texture = upload_texture(names::SPRITE_TEXTURE)?;
        let sampler = Sampler::new(device.clone())?;

        let descriptor_pool = DescriptorPool::new(device.clone(), MAX_SETS, &scene_pool_sizes(OBJECT_SETS))?;
        let object_layout = backend.object_set_layout();
        let sets = descriptor_pool.allocate(&[backend.scene_set_layout(), object_layout, object_layout])?;
        let &[scene_set, floor_set, sprite_set] = sets.as_slice() else {
            return Err(VulkanError::InvalidOperation {
                reason: format!("expected {MAX_SETS} descriptor sets, got {}", sets.len()),
            }
            .into());
        };

        DescriptorSetWriter::new()
            .write_uniform_buffer(scene_set, 0, uniform_buffer.handle())
            .write_combined_image_sampler(floor_set, 0, floor_texture.image_view(), sampler.handle())
            .write_combined_image_sampler(sprite_set, 0, sprite_texture.image_view(), sampler.handle())
            .update(&device);

        let batch = |mesh: &GpuMesh, object_set: vk::DescriptorSet| DrawBatch {
            positions: mesh.positions.handle(),
            texcoords: mesh.texcoords.handle(),
            vertex_count: mesh.vertex_count,
            object_set,
        };
        let bindings = SceneBindings {
            pipeline_layout: backend.pipeline_layout(),
            scene_set,
            uniform_buffer: uniform_buffer.handle(),
            opaque: batch(&floor, floor_set),
            alpha: batch(&sprite, sprite_set),
        };

        log::info!(
            "Scene ready: floor {} vertices, sprite {} vertices",
            floor.vertex_count,
            sprite.vertex_count
        );

        Ok(Self {
            bindings,
            _descriptor_pool: descriptor_pool,
            _floor_texture: floor_texture,
            _sprite_texture: sprite_texture,
            _sampler: sampler,
            _floor: floor,
            _sprite: sprite,
            _uniform_buffer: uniform_buffer,
            _context: context,
        })
    }

    /// Handles the frame driver records against
    pub const fn bindings(&self) -> SceneBindings {
        self.bindings
    }
}
