use std::sync::Arc;

use glam::Vec3;
use rayon::ThreadPoolBuildError;
use rustc_hash::FxHashMap;
use tessel_core::events::EventReceiver;
use tessel_core::jobs::JobSystem;
use tessel_shared::coords::ChunkPos;
use tessel_shared::physics::RaycastResult;
use tessel_shared::worldgen::{ChunkGenerator, FlatGenerator};
use tracing::{debug, info, warn};

use crate::chunk_manager::{ChunkEvent, ChunkManager, StreamReport};
use crate::config::ClientConfig;
use crate::renderer::atlas::TerrainAtlas;

/// Per-chunk buffer sizes a renderer would hold on the GPU, kept in sync through
/// chunk events.
#[derive(Debug, Default)]
pub struct MeshUploads {
    buffers: FxHashMap<ChunkPos, usize>,
}

impl MeshUploads {
    pub fn apply(&mut self, chunks: &ChunkManager, event: ChunkEvent) {
        match event {
            ChunkEvent::Loaded(pos) | ChunkEvent::Remeshed(pos) => {
                if let Some(chunk) = chunks.get(pos) {
                    let bytes = chunk.mesh.vertex_bytes().len() + chunk.mesh.index_bytes().len();
                    self.buffers.insert(pos, bytes);
                }
            }
            ChunkEvent::Unloaded(pos) => {
                self.buffers.remove(&pos);
            }
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.buffers.len()
    }

    pub fn total_bytes(&self) -> usize {
        self.buffers.values().sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickSummary {
    pub stream: StreamReport,
    pub pick: Option<RaycastResult>,
}

/// Headless client: moves a viewer, streams chunks around it and picks the block
/// underneath every tick.
pub struct App {
    chunks: ChunkManager,
    events: EventReceiver<ChunkEvent>,
    uploads: MeshUploads,
    viewer: Vec3,
    pick_distance: f32,
}

impl App {
    pub fn new(config: &ClientConfig) -> Result<Self, ThreadPoolBuildError> {
        let config = config.clone().sanitize();
        let generator: Box<dyn ChunkGenerator> = match config.generator.build() {
            Ok(generator) => generator,
            Err(err) => {
                warn!("{err}; falling back to the flat generator");
                Box::new(FlatGenerator)
            }
        };

        let atlas = Arc::new(TerrainAtlas::load_or_placeholder(
            &config.atlas_path,
            config.atlas_side_count,
        ));
        let textures = Arc::new(config.load_block_textures());

        let mut chunks = ChunkManager::new(config.world, generator, textures, atlas)
            .with_generation_cache(config.generation_cache_capacity);
        if config.parallel_streaming {
            let jobs = JobSystem::new(config.worker_threads)?;
            info!("Streaming chunks on {} worker thread(s)", jobs.thread_count());
            chunks = chunks.with_jobs(jobs);
        }
        let events = chunks.subscribe();

        info!(
            "Client ready: generator '{}', {}x{}x{} chunks, render distance {}",
            chunks.generator_name(),
            config.world.chunk_width,
            config.world.chunk_height,
            config.world.chunk_depth,
            config.world.render_distance
        );

        let viewer = Vec3::new(0.5, config.world.chunk_height as f32 - 0.5, 0.5);
        Ok(Self {
            chunks,
            events,
            uploads: MeshUploads::default(),
            viewer,
            pick_distance: config.pick_distance,
        })
    }

    pub fn viewer(&self) -> Vec3 {
        self.viewer
    }

    pub fn chunks(&self) -> &ChunkManager {
        &self.chunks
    }

    pub fn chunks_mut(&mut self) -> &mut ChunkManager {
        &mut self.chunks
    }

    pub fn uploads(&self) -> &MeshUploads {
        &self.uploads
    }

    pub fn tick(&mut self, movement: Vec3) -> TickSummary {
        self.viewer += movement;
        let stream = self.chunks.update(self.viewer);
        self.sync_uploads();

        let pick = self
            .chunks
            .raycast(self.viewer, Vec3::NEG_Y, self.pick_distance);
        match pick.as_ref() {
            Some(hit) => debug!(
                "Picked {} at {} ({:.2} away)",
                hit.block, hit.block_position, hit.distance
            ),
            None => debug!("Nothing to pick below {}", self.viewer),
        }

        TickSummary { stream, pick }
    }

    /// Applies pending chunk events, e.g. after editing blocks between ticks.
    pub fn sync_uploads(&mut self) {
        for event in self.events.drain() {
            self.uploads.apply(&self.chunks, event);
        }
    }
}
