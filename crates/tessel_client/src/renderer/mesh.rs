use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use tessel_shared::block::{BlockFace, FaceMask};
use tessel_shared::block_texture::{BlockTexture, BlockTextures};
use tessel_shared::chunk::{get_block_type, ChunkData};
use tessel_shared::coords::{ChunkDims, ChunkPos};

use super::atlas::TerrainAtlas;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct BlockVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 3],
    pub tex_coord: [f32; 2],
}
const _: [(); 44] = [(); std::mem::size_of::<BlockVertex>()];

impl BlockVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x3,
        2 => Float32x3,
        3 => Float32x2
    ];

    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<BlockVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Geometry for one chunk, textured from the terrain atlas it holds on to.
#[derive(Debug, Clone)]
pub struct ChunkMesh {
    pub vertices: Vec<BlockVertex>,
    pub indices: Vec<u32>,
    atlas: Arc<TerrainAtlas>,
}

impl ChunkMesh {
    pub fn empty(atlas: Arc<TerrainAtlas>) -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
            atlas,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    pub fn atlas(&self) -> &Arc<TerrainAtlas> {
        &self.atlas
    }
}

fn visible_faces(chunk: &ChunkData, x: i32, y: i32, z: i32) -> FaceMask {
    let mut mask = FaceMask::empty();
    for face in BlockFace::ALL {
        let n = face.normal();
        if get_block_type(chunk.blocks(), chunk.dims(), x + n.x, y + n.y, z + n.z).is_air() {
            mask |= face.mask();
        }
    }
    mask
}

fn chunk_offset(dims: ChunkDims, chunk_pos: ChunkPos) -> [f32; 3] {
    dims.chunk_origin(chunk_pos).as_vec3().to_array()
}

/// Meshes every face of a solid block that borders air. The chunk is meshed on its
/// own, so faces on the chunk boundary are always emitted.
pub fn build_chunk_mesh(
    chunk: &ChunkData,
    chunk_pos: ChunkPos,
    textures: &BlockTextures,
    atlas: &Arc<TerrainAtlas>,
) -> ChunkMesh {
    let mut mesh = ChunkMesh::empty(Arc::clone(atlas));
    if chunk.is_empty() {
        return mesh;
    }

    let dims = chunk.dims();
    let offset = chunk_offset(dims, chunk_pos);

    for y in 0..dims.height as i32 {
        for z in 0..dims.depth as i32 {
            for x in 0..dims.width as i32 {
                let block = get_block_type(chunk.blocks(), dims, x, y, z);
                if block.is_air() {
                    continue;
                }

                let visible = visible_faces(chunk, x, y, z);
                if visible.is_empty() {
                    continue;
                }

                let origin = [
                    offset[0] + x as f32,
                    offset[1] + y as f32,
                    offset[2] + z as f32,
                ];
                for face in BlockFace::ALL {
                    if !visible.contains(face.mask()) {
                        continue;
                    }
                    push_face(&mut mesh, face, origin, textures.texture(block, face));
                    if let Some(overlay) = textures.overlay(block, face) {
                        push_face(&mut mesh, face, origin, overlay);
                    }
                }
            }
        }
    }

    mesh
}

fn push_face(mesh: &mut ChunkMesh, face: BlockFace, origin: [f32; 3], texture: BlockTexture) {
    let corners = face.corners();
    let positions = corners.map(|corner| {
        [
            origin[0] + corner[0],
            origin[1] + corner[1],
            origin[2] + corner[2],
        ]
    });
    push_quad(
        mesh,
        positions,
        face.normal_f32(),
        texture.coords.corners(),
        texture.color,
    );
}

fn push_quad(
    mesh: &mut ChunkMesh,
    positions: [[f32; 3]; 4],
    normal: [f32; 3],
    tex_coords: [[f32; 2]; 4],
    color: [f32; 3],
) {
    let base_index = mesh.vertices.len() as u32;
    for i in 0..4 {
        mesh.vertices.push(BlockVertex {
            position: positions[i],
            normal,
            color,
            tex_coord: tex_coords[i],
        });
    }

    mesh.indices.extend_from_slice(&[
        base_index,
        base_index + 1,
        base_index + 2,
        base_index + 2,
        base_index + 3,
        base_index,
    ]);
}
