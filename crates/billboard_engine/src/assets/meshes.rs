//! Vertex data for the ground plane and the billboard sprite
//!
//! Both meshes are non-indexed triangle lists with positions and texcoords in
//! separate streams, matching vertex bindings 0 and 1.

/// Non-indexed mesh with split position/texcoord streams
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    /// Object-space positions
    pub positions: Vec<[f32; 3]>,
    /// Texture coordinates, one per position
    pub texcoords: Vec<[f32; 2]>,
}

const PLANE_POSITIONS: [[f32; 3]; 6] = [
    [-1.0, 0.0, -6.0],
    [-1.0, 0.0, 6.0],
    [1.0, 0.0, 6.0],
    [-1.0, 0.0, -6.0],
    [1.0, 0.0, 6.0],
    [1.0, 0.0, -6.0],
];

// V runs past [0, 1] so the floor texture repeats along the strip.
const PLANE_TEXCOORDS: [[f32; 2]; 6] = [
    [0.0, -6.0],
    [0.0, 6.0],
    [1.0, 6.0],
    [0.0, -6.0],
    [1.0, 6.0],
    [1.0, -6.0],
];

const SPRITE_POSITIONS: [[f32; 3]; 6] = [
    [-1.5, 1.5, -4.0],
    [-1.5, -0.5, -4.0],
    [1.5, -0.5, -4.0],
    [-1.5, 1.5, -4.0],
    [1.5, -0.5, -4.0],
    [1.5, 1.5, -4.0],
];

const SPRITE_TEXCOORDS: [[f32; 2]; 6] = [
    [0.0, 1.0],
    [0.0, 0.0],
    [1.0, 0.0],
    [0.0, 1.0],
    [1.0, 0.0],
    [1.0, 1.0],
];

impl MeshData {
    /// Long textured strip lying on the XZ plane
    pub fn plane() -> Self {
        Self {
            positions: PLANE_POSITIONS.to_vec(),
            texcoords: PLANE_TEXCOORDS.to_vec(),
        }
    }

    /// Camera-facing quad standing behind the origin
    pub fn sprite() -> Self {
        Self {
            positions: SPRITE_POSITIONS.to_vec(),
            texcoords: SPRITE_TEXCOORDS.to_vec(),
        }
    }

    /// Number of vertices to draw
    pub fn vertex_count(&self) -> u32 {
        u32::try_from(self.positions.len()).unwrap_or(u32::MAX)
    }

    /// Position stream as raw bytes
    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    /// Texcoord stream as raw bytes
    pub fn texcoord_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.texcoords)
    }
}
