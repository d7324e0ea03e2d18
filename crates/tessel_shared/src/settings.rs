use serde::{Deserialize, Serialize};

use crate::coords::ChunkDims;

pub const MIN_CHUNK_EXTENT: usize = 1;
pub const MAX_CHUNK_EXTENT: usize = 256;
pub const MIN_RENDER_DISTANCE: i32 = 1;
pub const MAX_RENDER_DISTANCE: i32 = 64;

/// World-wide constants shared read-only by streaming, meshing and picking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldSettings {
    #[serde(default = "default_chunk_extent")]
    pub chunk_width: usize,
    #[serde(default = "default_chunk_extent")]
    pub chunk_height: usize,
    #[serde(default = "default_chunk_extent")]
    pub chunk_depth: usize,
    /// Radius of the streamed area, in chunks.
    #[serde(default = "default_render_distance")]
    pub render_distance: i32,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            chunk_width: default_chunk_extent(),
            chunk_height: default_chunk_extent(),
            chunk_depth: default_chunk_extent(),
            render_distance: default_render_distance(),
        }
    }
}

impl WorldSettings {
    pub fn sanitize(mut self) -> Self {
        self.chunk_width = self.chunk_width.clamp(MIN_CHUNK_EXTENT, MAX_CHUNK_EXTENT);
        self.chunk_height = self.chunk_height.clamp(MIN_CHUNK_EXTENT, MAX_CHUNK_EXTENT);
        self.chunk_depth = self.chunk_depth.clamp(MIN_CHUNK_EXTENT, MAX_CHUNK_EXTENT);
        self.render_distance = self
            .render_distance
            .clamp(MIN_RENDER_DISTANCE, MAX_RENDER_DISTANCE);
        self
    }

    pub fn dims(&self) -> ChunkDims {
        ChunkDims::new(self.chunk_width, self.chunk_height, self.chunk_depth)
    }
}

fn default_chunk_extent() -> usize {
    16
}

fn default_render_distance() -> i32 {
    8
}
