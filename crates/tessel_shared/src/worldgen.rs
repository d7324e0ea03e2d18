use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use noise::{NoiseFn, Perlin};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::block::BlockType;
use crate::coords::{ChunkDims, ChunkPos};

/// Produces the block array of one chunk.
///
/// Output is `dims.volume()` long in [`ChunkDims::block_index`] order. Generators
/// should be deterministic per coordinate so chunks look the same when they stream
/// back in.
pub trait ChunkGenerator: Send + Sync {
    fn name(&self) -> &str;

    fn generate(&self, pos: ChunkPos, dims: ChunkDims) -> Vec<BlockType>;
}

/// Same bedrock / stone / dirt / grass stack in every chunk.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatGenerator;

impl ChunkGenerator for FlatGenerator {
    fn name(&self) -> &str {
        "flat"
    }

    fn generate(&self, _pos: ChunkPos, dims: ChunkDims) -> Vec<BlockType> {
        let mut blocks = vec![BlockType::Air; dims.volume()];
        for y in 0..dims.height.min(9) as i32 {
            let block = match y {
                0 => BlockType::Bedrock,
                1..=3 => BlockType::Stone,
                4..=7 => BlockType::Dirt,
                _ => BlockType::Grass,
            };
            fill_layer(&mut blocks, dims, y, block);
        }
        blocks
    }
}

const PATTERN_OFFSET: i32 = 7000;

/// A five block tall slab inset two blocks from every chunk edge, with the block
/// type cycling through the solid types by chunk coordinate. Makes chunk seams and
/// per-type texturing easy to eyeball.
#[derive(Debug, Clone, Copy, Default)]
pub struct TestPatternGenerator;

impl TestPatternGenerator {
    pub fn block_for(pos: ChunkPos) -> BlockType {
        let solid_types = (BlockType::COUNT - 1) as i32;
        let raw = (PATTERN_OFFSET + pos.x + pos.z).rem_euclid(solid_types) + 1;
        BlockType::from_raw(raw as u8).unwrap_or(BlockType::Stone)
    }
}

impl ChunkGenerator for TestPatternGenerator {
    fn name(&self) -> &str {
        "test_pattern"
    }

    fn generate(&self, pos: ChunkPos, dims: ChunkDims) -> Vec<BlockType> {
        let block = Self::block_for(pos);
        let mut blocks = vec![BlockType::Air; dims.volume()];

        for z in 2..dims.depth.saturating_sub(2) as i32 {
            for y in 0..dims.height.min(5) as i32 {
                for x in 2..dims.width.saturating_sub(2) as i32 {
                    blocks[dims.block_index(x, y, z)] = block;
                }
            }
        }
        blocks
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layer {
    pub block: BlockType,
    pub thickness: usize,
}

/// Horizontal layers stacked from y = 0, described by a small TOML script:
///
/// ```toml
/// [[layer]]
/// block = "bedrock"
/// thickness = 1
///
/// [[layer]]
/// block = "stone"
/// thickness = 6
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayeredGenerator {
    layers: Vec<Layer>,
}

#[derive(Debug, Deserialize)]
struct LayerScript {
    #[serde(default)]
    layer: Vec<RawLayer>,
}

#[derive(Debug, Deserialize)]
struct RawLayer {
    block: String,
    thickness: usize,
}

impl LayeredGenerator {
    pub fn new(layers: Vec<Layer>) -> Result<Self, LayerScriptError> {
        if layers.iter().all(|layer| layer.thickness == 0) {
            return Err(LayerScriptError::Empty);
        }
        Ok(Self { layers })
    }

    pub fn load(path: &Path) -> Result<Self, LayerScriptError> {
        let source = fs::read_to_string(path).map_err(|source| LayerScriptError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let generator = Self::from_toml_str(&source)?;
        debug!(
            "Loaded layer script {} ({} layers, {} blocks thick)",
            path.display(),
            generator.layers.len(),
            generator.total_thickness()
        );
        Ok(generator)
    }

    pub fn from_toml_str(source: &str) -> Result<Self, LayerScriptError> {
        let script: LayerScript = toml::from_str(source).map_err(LayerScriptError::Parse)?;
        let layers = script
            .layer
            .into_iter()
            .map(|raw| {
                let block = BlockType::from_name(&raw.block)
                    .ok_or(LayerScriptError::UnknownBlock { name: raw.block })?;
                Ok(Layer {
                    block,
                    thickness: raw.thickness,
                })
            })
            .collect::<Result<Vec<_>, LayerScriptError>>()?;
        Self::new(layers)
    }

    pub fn total_thickness(&self) -> usize {
        self.layers.iter().map(|layer| layer.thickness).sum()
    }
}

impl ChunkGenerator for LayeredGenerator {
    fn name(&self) -> &str {
        "layered"
    }

    fn generate(&self, _pos: ChunkPos, dims: ChunkDims) -> Vec<BlockType> {
        let mut blocks = vec![BlockType::Air; dims.volume()];
        let mut y = 0usize;
        for layer in &self.layers {
            for _ in 0..layer.thickness {
                if y >= dims.height {
                    return blocks;
                }
                fill_layer(&mut blocks, dims, y as i32, layer.block);
                y += 1;
            }
        }
        blocks
    }
}

#[derive(Debug)]
pub enum LayerScriptError {
    Io { path: PathBuf, source: io::Error },
    Parse(toml::de::Error),
    UnknownBlock { name: String },
    Empty,
}

impl fmt::Display for LayerScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read layer script {}: {source}", path.display())
            }
            Self::Parse(source) => write!(f, "failed to parse layer script: {source}"),
            Self::UnknownBlock { name } => write!(f, "unknown block '{name}' in layer script"),
            Self::Empty => write!(f, "layer script has no non-empty layers"),
        }
    }
}

impl std::error::Error for LayerScriptError {}

const TERRAIN_FREQUENCY: f64 = 0.021;
const DETAIL_FREQUENCY: f64 = 0.087;
const TREE_CHANCE: u64 = 61;
const TRUNK_HEIGHT: i32 = 4;

/// Rolling Perlin heightmap with a dirt/grass crust and the occasional tree.
#[derive(Debug, Clone)]
pub struct TerrainGenerator {
    seed: u32,
    terrain: Perlin,
    base_height: f64,
    amplitude: f64,
}

impl TerrainGenerator {
    pub fn new(seed: u32) -> Self {
        Self {
            seed,
            terrain: Perlin::new(seed),
            base_height: 0.45,
            amplitude: 0.25,
        }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Topmost solid y of the column at a world position, already clamped to the chunk.
    pub fn surface_height(&self, world_x: i32, world_z: i32, height: usize) -> i32 {
        let wx = world_x as f64;
        let wz = world_z as f64;
        let coarse = self.terrain.get([wx * TERRAIN_FREQUENCY, wz * TERRAIN_FREQUENCY]);
        let detail = self
            .terrain
            .get([wx * DETAIL_FREQUENCY + 37.1, wz * DETAIL_FREQUENCY - 11.9])
            * 0.3;

        let h = height as f64;
        let surface = h * self.base_height + (coarse + detail) * h * self.amplitude;
        (surface.round() as i32).clamp(1, height as i32 - 1)
    }

    fn column_hash(&self, world_x: i32, world_z: i32) -> u64 {
        let mut hash = u64::from(self.seed) ^ 0x9E37_79B9_7F4A_7C15;
        hash ^= (world_x as i64 as u64).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        hash = hash.rotate_left(31);
        hash ^= (world_z as i64 as u64).wrapping_mul(0x94D0_49BB_1331_11EB);
        hash ^ (hash >> 29)
    }

    fn place_tree(&self, blocks: &mut [BlockType], dims: ChunkDims, x: i32, ground: i32, z: i32) {
        let top = ground + TRUNK_HEIGHT;
        for dy in -1..=1 {
            let radius = if dy == 1 { 1 } else { 2 };
            for dz in -radius..=radius {
                for dx in -radius..=radius {
                    let (lx, ly, lz) = (x + dx, top + dy, z + dz);
                    if dims.in_chunk_bounds(lx, ly, lz) {
                        let index = dims.block_index(lx, ly, lz);
                        if blocks[index].is_air() {
                            blocks[index] = BlockType::Leaves;
                        }
                    }
                }
            }
        }
        for y in ground + 1..=top {
            if dims.in_chunk_bounds(x, y, z) {
                blocks[dims.block_index(x, y, z)] = BlockType::Wood;
            }
        }
    }
}

impl ChunkGenerator for TerrainGenerator {
    fn name(&self) -> &str {
        "terrain"
    }

    fn generate(&self, pos: ChunkPos, dims: ChunkDims) -> Vec<BlockType> {
        let mut blocks = vec![BlockType::Air; dims.volume()];
        if dims.height < 2 {
            return blocks;
        }

        let origin_x = pos.x * dims.width as i32;
        let origin_z = pos.z * dims.depth as i32;
        let mut trees = Vec::new();

        for z in 0..dims.depth as i32 {
            for x in 0..dims.width as i32 {
                let world_x = origin_x + x;
                let world_z = origin_z + z;
                let surface = self.surface_height(world_x, world_z, dims.height);

                for y in 0..=surface {
                    let block = if y == 0 {
                        BlockType::Bedrock
                    } else if y == surface {
                        BlockType::Grass
                    } else if y >= surface - 3 {
                        BlockType::Dirt
                    } else {
                        BlockType::Stone
                    };
                    blocks[dims.block_index(x, y, z)] = block;
                }

                // Trees stay two blocks clear of the chunk edge so their canopy never
                // needs a neighbouring chunk.
                let interior = x >= 2
                    && z >= 2
                    && x < dims.width as i32 - 2
                    && z < dims.depth as i32 - 2;
                let fits = surface + TRUNK_HEIGHT + 1 < dims.height as i32;
                if interior && fits && self.column_hash(world_x, world_z) % TREE_CHANCE == 0 {
                    trees.push((x, surface, z));
                }
            }
        }

        for (x, ground, z) in trees {
            self.place_tree(&mut blocks, dims, x, ground, z);
        }
        blocks
    }
}

/// Generator selection as it appears in configuration files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GeneratorConfig {
    Flat,
    TestPattern,
    Layered { script: PathBuf },
    Terrain { seed: u32 },
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self::Terrain { seed: 0xC0FFEE }
    }
}

impl GeneratorConfig {
    pub fn build(&self) -> Result<Box<dyn ChunkGenerator>, LayerScriptError> {
        Ok(match self {
            Self::Flat => Box::new(FlatGenerator),
            Self::TestPattern => Box::new(TestPatternGenerator),
            Self::Layered { script } => Box::new(LayeredGenerator::load(script)?),
            Self::Terrain { seed } => Box::new(TerrainGenerator::new(*seed)),
        })
    }
}

fn fill_layer(blocks: &mut [BlockType], dims: ChunkDims, y: i32, block: BlockType) {
    for z in 0..dims.depth as i32 {
        for x in 0..dims.width as i32 {
            blocks[dims.block_index(x, y, z)] = block;
        }
    }
}
