use std::collections::VecDeque;
use std::sync::Arc;

use glam::{IVec3, Vec3};
use rustc_hash::{FxHashMap, FxHashSet};
use tessel_core::events::{self, EventReceiver, EventSender};
use tessel_core::jobs::JobSystem;
use tessel_shared::block::BlockType;
use tessel_shared::block_texture::BlockTextures;
use tessel_shared::chunk::ChunkData;
use tessel_shared::coords::{ChunkDims, ChunkPos};
use tessel_shared::physics::{self, ChunkSource, RaycastResult};
use tessel_shared::settings::WorldSettings;
use tessel_shared::worldgen::ChunkGenerator;
use tracing::{debug, info, warn};

use crate::renderer::atlas::TerrainAtlas;
use crate::renderer::mesh::{build_chunk_mesh, ChunkMesh};

/// A live chunk: its blocks and the mesh built from them.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub pos: ChunkPos,
    pub data: ChunkData,
    pub mesh: ChunkMesh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkEvent {
    Loaded(ChunkPos),
    Remeshed(ChunkPos),
    Unloaded(ChunkPos),
}

/// What one [`ChunkManager::update`] changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamReport {
    pub player_chunk: ChunkPos,
    pub added: Vec<ChunkPos>,
    pub removed: Vec<ChunkPos>,
}

impl StreamReport {
    pub fn is_unchanged(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Generated block arrays kept around so chunks that stream back in skip the
/// generator. Oldest entries go first once `capacity` is reached.
#[derive(Debug, Default)]
struct GenerationCache {
    capacity: usize,
    order: VecDeque<ChunkPos>,
    blocks: FxHashMap<ChunkPos, Vec<BlockType>>,
}

impl GenerationCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    fn get(&self, pos: ChunkPos) -> Option<&Vec<BlockType>> {
        self.blocks.get(&pos)
    }

    fn insert(&mut self, pos: ChunkPos, blocks: Vec<BlockType>) {
        if self.capacity == 0 {
            return;
        }
        if self.blocks.insert(pos, blocks).is_some() {
            return;
        }
        self.order.push_back(pos);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.blocks.remove(&oldest);
            }
        }
    }

    fn remove(&mut self, pos: ChunkPos) {
        if self.blocks.remove(&pos).is_some() {
            self.order.retain(|queued| *queued != pos);
        }
    }

    fn clear(&mut self) {
        self.order.clear();
        self.blocks.clear();
    }

    fn len(&self) -> usize {
        self.blocks.len()
    }
}

/// Borrowed pieces a chunk build needs, so builds can run off the manager's thread.
#[derive(Clone, Copy)]
struct ChunkBuilder<'a> {
    generator: &'a dyn ChunkGenerator,
    dims: ChunkDims,
    textures: &'a BlockTextures,
    atlas: &'a Arc<TerrainAtlas>,
}

impl ChunkBuilder<'_> {
    /// Returns the chunk and whether the generator had to run.
    fn build(&self, pos: ChunkPos, cached: Option<Vec<BlockType>>) -> (Chunk, bool) {
        let fresh = cached.is_none();
        let blocks = cached.unwrap_or_else(|| self.generator.generate(pos, self.dims));
        let data = match ChunkData::from_blocks(self.dims, blocks) {
            Ok(data) => data,
            Err(err) => {
                warn!(
                    "Generator '{}' gave chunk {pos:?} bad data ({err}); using an empty chunk",
                    self.generator.name()
                );
                ChunkData::new_empty(self.dims)
            }
        };
        let mesh = build_chunk_mesh(&data, pos, self.textures, self.atlas);
        (Chunk { pos, data, mesh }, fresh)
    }
}

/// Keeps the chunks within render distance of the viewer generated and meshed.
pub struct ChunkManager {
    settings: WorldSettings,
    generator: Box<dyn ChunkGenerator>,
    textures: Arc<BlockTextures>,
    atlas: Arc<TerrainAtlas>,
    chunks: Vec<Chunk>,
    index: FxHashMap<ChunkPos, usize>,
    cache: GenerationCache,
    jobs: Option<JobSystem>,
    events: Option<EventSender<ChunkEvent>>,
}

impl ChunkManager {
    pub fn new(
        settings: WorldSettings,
        generator: Box<dyn ChunkGenerator>,
        textures: Arc<BlockTextures>,
        atlas: Arc<TerrainAtlas>,
    ) -> Self {
        let sanitized = settings.sanitize();
        if sanitized != settings {
            warn!(
                "World settings {settings:?} are out of range; streaming with {sanitized:?}"
            );
        }

        Self {
            settings: sanitized,
            generator,
            textures,
            atlas,
            chunks: Vec::new(),
            index: FxHashMap::default(),
            cache: GenerationCache::new(0),
            jobs: None,
            events: None,
        }
    }

    pub fn with_generation_cache(mut self, capacity: usize) -> Self {
        self.cache = GenerationCache::new(capacity);
        self
    }

    /// Builds newly needed chunks on `jobs` instead of the calling thread.
    pub fn with_jobs(mut self, jobs: JobSystem) -> Self {
        self.jobs = Some(jobs);
        self
    }

    /// Replaces any earlier subscriber.
    pub fn subscribe(&mut self) -> EventReceiver<ChunkEvent> {
        let (tx, rx) = events::channel();
        self.events = Some(tx);
        rx
    }

    pub fn settings(&self) -> &WorldSettings {
        &self.settings
    }

    pub fn dims(&self) -> ChunkDims {
        self.settings.dims()
    }

    pub fn generator_name(&self) -> &str {
        self.generator.name()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn contains(&self, pos: ChunkPos) -> bool {
        self.index.contains_key(&pos)
    }

    pub fn get(&self, pos: ChunkPos) -> Option<&Chunk> {
        self.index.get(&pos).map(|&slot| &self.chunks[slot])
    }

    /// Live chunks in the order they were loaded.
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.iter()
    }

    pub fn positions(&self) -> impl Iterator<Item = ChunkPos> + '_ {
        self.chunks.iter().map(|chunk| chunk.pos)
    }

    pub fn cached_chunk_count(&self) -> usize {
        self.cache.len()
    }

    pub fn player_chunk(&self, viewer: Vec3) -> ChunkPos {
        self.dims().chunk_containing(viewer)
    }

    /// Chunk coordinates within render distance of `center`, dx outer and dz inner.
    pub fn desired_chunks(&self, center: ChunkPos) -> Vec<ChunkPos> {
        let radius = self.settings.render_distance;
        let radius_sq = radius * radius;
        let mut desired = Vec::new();
        for dx in -radius..radius {
            for dz in -radius..radius {
                if dx * dx + dz * dz < radius_sq {
                    desired.push(center + ChunkPos::new(dx, dz));
                }
            }
        }
        desired
    }

    /// Loads every desired chunk that isn't live yet and unloads everything else.
    pub fn update(&mut self, viewer: Vec3) -> StreamReport {
        let player_chunk = self.player_chunk(viewer);
        let desired = self.desired_chunks(player_chunk);

        let missing: Vec<ChunkPos> = desired
            .iter()
            .copied()
            .filter(|pos| !self.index.contains_key(pos))
            .collect();
        let added = self.load_chunks(missing);

        let desired_set: FxHashSet<ChunkPos> = desired.into_iter().collect();
        let removed = self.evict_except(&desired_set);

        if !added.is_empty() || !removed.is_empty() {
            info!(
                "Streamed chunks around {player_chunk:?}: {} added, {} removed, {} live",
                added.len(),
                removed.len(),
                self.chunks.len()
            );
        }

        StreamReport {
            player_chunk,
            added,
            removed,
        }
    }

    fn load_chunks(&mut self, missing: Vec<ChunkPos>) -> Vec<ChunkPos> {
        if missing.is_empty() {
            return missing;
        }

        let inputs: Vec<(ChunkPos, Option<Vec<BlockType>>)> = missing
            .iter()
            .map(|&pos| (pos, self.cache.get(pos).cloned()))
            .collect();
        let builder = ChunkBuilder {
            generator: self.generator.as_ref(),
            dims: self.settings.dims(),
            textures: &self.textures,
            atlas: &self.atlas,
        };

        let built: Vec<(Chunk, bool)> = match self.jobs.as_ref() {
            Some(jobs) => jobs.map_ordered(inputs, |(pos, cached)| builder.build(pos, cached)),
            None => inputs
                .into_iter()
                .map(|(pos, cached)| builder.build(pos, cached))
                .collect(),
        };

        for (chunk, fresh) in built {
            if fresh {
                self.cache.insert(chunk.pos, chunk.data.blocks().to_vec());
            }
            debug!(
                "Loaded chunk {:?} ({} vertices)",
                chunk.pos,
                chunk.mesh.vertex_count()
            );
            self.emit(ChunkEvent::Loaded(chunk.pos));
            self.index.insert(chunk.pos, self.chunks.len());
            self.chunks.push(chunk);
        }
        missing
    }

    // Decide first, then rebuild the arena and index in a single pass.
    fn evict_except(&mut self, keep: &FxHashSet<ChunkPos>) -> Vec<ChunkPos> {
        let evicted: Vec<ChunkPos> = self
            .chunks
            .iter()
            .map(|chunk| chunk.pos)
            .filter(|pos| !keep.contains(pos))
            .collect();
        if evicted.is_empty() {
            return evicted;
        }

        let previous = std::mem::take(&mut self.chunks);
        self.index.clear();
        for chunk in previous {
            if keep.contains(&chunk.pos) {
                self.index.insert(chunk.pos, self.chunks.len());
                self.chunks.push(chunk);
            }
        }

        for &pos in &evicted {
            debug!("Unloaded chunk {pos:?}");
            self.emit(ChunkEvent::Unloaded(pos));
        }
        evicted
    }

    /// Block at a world position; air when its chunk isn't live.
    pub fn block_at(&self, world_pos: IVec3) -> BlockType {
        physics::block_at_world(self, self.dims(), world_pos)
    }

    /// Edits a live chunk and remeshes it. Returns `false` when the position isn't
    /// inside a live chunk.
    pub fn set_block(&mut self, world_pos: IVec3, block: BlockType) -> bool {
        let dims = self.settings.dims();
        if world_pos.y < 0 || world_pos.y >= dims.height as i32 {
            return false;
        }
        let (pos, local) = dims.world_to_chunk(world_pos);
        let Some(&slot) = self.index.get(&pos) else {
            return false;
        };

        let chunk = &mut self.chunks[slot];
        if !chunk.data.set(local, block) {
            return false;
        }
        chunk.mesh = build_chunk_mesh(&chunk.data, pos, &self.textures, &self.atlas);
        self.cache.remove(pos);
        self.emit(ChunkEvent::Remeshed(pos));
        true
    }

    /// Drops a cached generation so the chunk is regenerated next time it loads.
    pub fn invalidate(&mut self, pos: ChunkPos) {
        self.cache.remove(pos);
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    pub fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<RaycastResult> {
        physics::raycast(&self.settings, self, origin, direction, max_distance)
    }

    pub fn mesh_totals(&self) -> (usize, usize) {
        self.chunks.iter().fold((0, 0), |(vertices, indices), chunk| {
            (
                vertices + chunk.mesh.vertex_count(),
                indices + chunk.mesh.index_count(),
            )
        })
    }

    fn emit(&self, event: ChunkEvent) {
        if let Some(tx) = self.events.as_ref() {
            let _ = tx.send(event);
        }
    }
}

impl ChunkSource for ChunkManager {
    fn chunk(&self, pos: ChunkPos) -> Option<&ChunkData> {
        self.get(pos).map(|chunk| &chunk.data)
    }
}
