use std::fmt;

use glam::IVec3;

use crate::block::BlockType;
use crate::coords::ChunkDims;

/// Block lookup that treats everything outside the chunk as air.
///
/// All neighbour checks go through here so that faces on the chunk boundary are
/// always considered exposed.
pub fn get_block_type(blocks: &[BlockType], dims: ChunkDims, x: i32, y: i32, z: i32) -> BlockType {
    if !dims.in_chunk_bounds(x, y, z) {
        return BlockType::Air;
    }
    blocks
        .get(dims.block_index(x, y, z))
        .copied()
        .unwrap_or(BlockType::Air)
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChunkData {
    dims: ChunkDims,
    blocks: Vec<BlockType>,
}

impl ChunkData {
    pub fn new_empty(dims: ChunkDims) -> Self {
        Self::new_filled(dims, BlockType::Air)
    }

    pub fn new_filled(dims: ChunkDims, block: BlockType) -> Self {
        Self {
            dims,
            blocks: vec![block; dims.volume()],
        }
    }

    pub fn from_blocks(dims: ChunkDims, blocks: Vec<BlockType>) -> Result<Self, ChunkDataError> {
        if blocks.len() != dims.volume() {
            return Err(ChunkDataError::LengthMismatch {
                expected: dims.volume(),
                actual: blocks.len(),
            });
        }
        Ok(Self { dims, blocks })
    }

    pub fn dims(&self) -> ChunkDims {
        self.dims
    }

    pub fn blocks(&self) -> &[BlockType] {
        &self.blocks
    }

    pub fn get(&self, local: IVec3) -> BlockType {
        get_block_type(&self.blocks, self.dims, local.x, local.y, local.z)
    }

    /// Writes one block. Returns `false` and leaves the chunk untouched when `local`
    /// is outside the chunk.
    pub fn set(&mut self, local: IVec3, block: BlockType) -> bool {
        if !self.dims.in_chunk_bounds(local.x, local.y, local.z) {
            return false;
        }
        let index = self.dims.block_index(local.x, local.y, local.z);
        self.blocks[index] = block;
        true
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.iter().all(|block| block.is_air())
    }

    pub fn solid_count(&self) -> usize {
        self.blocks.iter().filter(|block| block.is_solid()).count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkDataError {
    LengthMismatch { expected: usize, actual: usize },
}

impl fmt::Display for ChunkDataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LengthMismatch { expected, actual } => {
                write!(f, "expected {expected} blocks, got {actual}")
            }
        }
    }
}

impl std::error::Error for ChunkDataError {}
