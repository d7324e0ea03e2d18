pub mod atlas;
pub mod mesh;

pub use atlas::{AtlasError, TerrainAtlas};
pub use mesh::{build_chunk_mesh, BlockVertex, ChunkMesh};
