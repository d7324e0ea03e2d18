use std::collections::HashMap;
use std::hash::BuildHasher;

use glam::{IVec3, Vec3};

use crate::block::{BlockFace, BlockType};
use crate::chunk::ChunkData;
use crate::coords::{ChunkDims, ChunkPos, WORLD_COORD_LIMIT};
use crate::settings::WorldSettings;

/// Longest ray the traversal will follow, in world units. Longer or non-finite
/// limits are clamped to it.
pub const MAX_RAYCAST_DISTANCE: f32 = 65_536.0;

#[derive(Debug, Copy, Clone)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

/// One voxel visited by [`RaycastIter`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RaycastStep {
    pub voxel: IVec3,
    /// Face of `voxel` the ray entered through. `None` for the starting voxel.
    pub face: Option<BlockFace>,
    /// Ray parameter at which `voxel` was entered.
    pub distance: f32,
}

#[derive(Debug, Copy, Clone)]
pub struct RaycastIter {
    current: IVec3,
    step: IVec3,
    t_max: Vec3,
    t_delta: Vec3,
    magnitude: Vec3,
    max_distance: f32,
    started: bool,
    finished: bool,
}

fn axis_step(component: f32) -> i32 {
    if component > 0.0 {
        1
    } else if component < 0.0 {
        -1
    } else {
        0
    }
}

fn first_crossing(origin: f32, voxel: i32, step: i32, direction: f32) -> f32 {
    if step == 0 {
        return f32::INFINITY;
    }
    let boundary = if step > 0 { voxel as f32 + 1.0 } else { voxel as f32 };
    (boundary - origin) / direction
}

fn crossing_interval(direction: f32) -> f32 {
    if direction != 0.0 {
        1.0 / direction.abs()
    } else {
        f32::INFINITY
    }
}

fn within_world_limit(origin: Vec3) -> bool {
    origin.is_finite() && origin.abs().max_element() <= WORLD_COORD_LIMIT as f32
}

impl RaycastIter {
    fn new(ray: &Ray, max_distance: f32) -> Self {
        let direction = ray.direction;
        let step = IVec3::new(
            axis_step(direction.x),
            axis_step(direction.y),
            axis_step(direction.z),
        );
        let current = ray.origin.floor().as_ivec3();

        let t_max = Vec3::new(
            first_crossing(ray.origin.x, current.x, step.x, direction.x),
            first_crossing(ray.origin.y, current.y, step.y, direction.y),
            first_crossing(ray.origin.z, current.z, step.z, direction.z),
        );
        let t_delta = Vec3::new(
            crossing_interval(direction.x),
            crossing_interval(direction.y),
            crossing_interval(direction.z),
        );

        Self {
            current,
            step,
            t_max,
            t_delta,
            magnitude: direction.abs(),
            max_distance: if max_distance.is_nan() {
                0.0
            } else {
                max_distance.clamp(0.0, MAX_RAYCAST_DISTANCE)
            },
            started: false,
            finished: step == IVec3::ZERO || !within_world_limit(ray.origin),
        }
    }

    /// Axis with the nearest boundary crossing. Simultaneous crossings step the axis
    /// the ray moves fastest along first, then X, Y, Z. Tied axes share the same
    /// parametric distance, so ordering them by that distance could not separate
    /// them; direction magnitude is used instead.
    fn next_axis(&self) -> usize {
        let nearest = self.t_max.min_element();
        let mut best = None::<usize>;
        for axis in 0..3 {
            if self.t_max[axis] != nearest {
                continue;
            }
            match best {
                Some(current) if self.magnitude[axis] <= self.magnitude[current] => {}
                _ => best = Some(axis),
            }
        }
        best.unwrap_or(0)
    }
}

impl Iterator for RaycastIter {
    type Item = RaycastStep;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        if !self.started {
            self.started = true;
            return Some(RaycastStep {
                voxel: self.current,
                face: None,
                distance: 0.0,
            });
        }

        let axis = self.next_axis();
        let distance = self.t_max[axis];
        if !distance.is_finite() || distance > self.max_distance {
            self.finished = true;
            return None;
        }

        let step = self.step[axis];
        self.current[axis] += step;
        self.t_max[axis] += self.t_delta[axis];

        // Entering through the face that points back along the step.
        let mut normal = IVec3::ZERO;
        normal[axis] = -step;

        Some(RaycastStep {
            voxel: self.current,
            face: BlockFace::from_normal(normal),
            distance,
        })
    }
}

pub fn raycast_blocks(ray: &Ray, max_distance: f32) -> impl Iterator<Item = RaycastStep> {
    RaycastIter::new(ray, max_distance)
}

/// Read access to resident chunks by coordinate.
pub trait ChunkSource {
    fn chunk(&self, pos: ChunkPos) -> Option<&ChunkData>;
}

impl<S: BuildHasher> ChunkSource for HashMap<ChunkPos, ChunkData, S> {
    fn chunk(&self, pos: ChunkPos) -> Option<&ChunkData> {
        self.get(&pos)
    }
}

/// Block at a world voxel. Missing chunks and heights outside the chunk read as air.
pub fn block_at_world<C: ChunkSource + ?Sized>(
    chunks: &C,
    dims: ChunkDims,
    world_pos: IVec3,
) -> BlockType {
    if world_pos.y < 0 || world_pos.y >= dims.height as i32 {
        return BlockType::Air;
    }
    let (chunk_pos, local) = dims.world_to_chunk(world_pos);
    chunks
        .chunk(chunk_pos)
        .map_or(BlockType::Air, |chunk| chunk.get(local))
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RaycastResult {
    pub position: Vec3,
    pub block_position: IVec3,
    pub normal: BlockFace,
    pub block: BlockType,
    pub distance: f32,
}

/// First solid block along a ray, at most `max_distance` world units away.
pub fn raycast<C: ChunkSource + ?Sized>(
    settings: &WorldSettings,
    chunks: &C,
    origin: Vec3,
    direction: Vec3,
    max_distance: f32,
) -> Option<RaycastResult> {
    let direction = direction.try_normalize()?;
    let dims = settings.dims();
    let ray = Ray { origin, direction };

    let height = dims.height as i32;

    for step in raycast_blocks(&ray, max_distance) {
        // Past the top or bottom of the world and not heading back: nothing left to hit.
        let below = step.voxel.y < 0 && direction.y <= 0.0;
        let above = step.voxel.y >= height && direction.y >= 0.0;
        if below || above {
            return None;
        }

        let block = block_at_world(chunks, dims, step.voxel);
        if block.is_air() {
            continue;
        }
        return Some(RaycastResult {
            position: origin + direction * step.distance,
            block_position: step.voxel,
            normal: step
                .face
                .unwrap_or_else(|| BlockFace::facing_against(direction)),
            block,
            distance: step.distance,
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use glam::{IVec3, Vec3};

    use super::{block_at_world, raycast, raycast_blocks, Ray, RaycastStep, MAX_RAYCAST_DISTANCE};
    use crate::block::{BlockFace, BlockType};
    use crate::chunk::ChunkData;
    use crate::coords::ChunkPos;
    use crate::settings::WorldSettings;

    fn world_with(blocks: &[(IVec3, BlockType)]) -> (WorldSettings, HashMap<ChunkPos, ChunkData>) {
        let settings = WorldSettings::default();
        let dims = settings.dims();
        let mut chunks = HashMap::new();
        for &(world_pos, block) in blocks {
            let (pos, local) = dims.world_to_chunk(world_pos);
            let chunk = chunks
                .entry(pos)
                .or_insert_with(|| ChunkData::new_empty(dims));
            assert!(chunk.set(local, block));
        }
        (settings, chunks)
    }

    #[test]
    fn raycast_returns_expected_voxels_and_faces() {
        let ray = Ray {
            origin: Vec3::new(0.5, 0.5, 0.5),
            direction: Vec3::X,
        };

        let visited: Vec<RaycastStep> = raycast_blocks(&ray, 2.1).take(5).collect();
        let voxels: Vec<(IVec3, Option<BlockFace>)> =
            visited.iter().map(|step| (step.voxel, step.face)).collect();
        assert_eq!(
            voxels,
            vec![
                (IVec3::new(0, 0, 0), None),
                (IVec3::new(1, 0, 0), Some(BlockFace::Left)),
                (IVec3::new(2, 0, 0), Some(BlockFace::Left)),
            ]
        );
        assert_eq!(visited[2].distance, 1.5);
    }

    #[test]
    fn simultaneous_crossings_step_the_faster_axis_first() {
        let faster_x = Ray {
            origin: Vec3::new(0.5, 0.75, 0.5),
            direction: Vec3::new(1.0, 0.5, 0.0),
        };
        let voxels: Vec<IVec3> = raycast_blocks(&faster_x, 0.6).map(|s| s.voxel).collect();
        assert_eq!(
            voxels,
            vec![IVec3::new(0, 0, 0), IVec3::new(1, 0, 0), IVec3::new(1, 1, 0)]
        );

        let faster_y = Ray {
            origin: Vec3::new(0.75, 0.5, 0.5),
            direction: Vec3::new(0.5, 1.0, 0.0),
        };
        let voxels: Vec<IVec3> = raycast_blocks(&faster_y, 0.6).map(|s| s.voxel).collect();
        assert_eq!(
            voxels,
            vec![IVec3::new(0, 0, 0), IVec3::new(0, 1, 0), IVec3::new(1, 1, 0)]
        );

        let diagonal = Ray {
            origin: Vec3::new(0.5, 0.5, 0.5),
            direction: Vec3::new(-1.0, -1.0, 0.0),
        };
        let first: Vec<RaycastStep> = raycast_blocks(&diagonal, 0.6).collect();
        assert_eq!(first[1].voxel, IVec3::new(-1, 0, 0));
        assert_eq!(first[1].face, Some(BlockFace::Right));
        assert_eq!(first[2].voxel, IVec3::new(-1, -1, 0));
        assert_eq!(first[2].face, Some(BlockFace::Top));
    }

    #[test]
    fn axis_ray_hits_block_face_towards_viewer() {
        let (settings, chunks) = world_with(&[(IVec3::new(5, 2, 3), BlockType::Stone)]);

        let hit = raycast(&settings, &chunks, Vec3::new(0.5, 2.5, 3.5), Vec3::X, 10.0)
            .expect("stone ahead");
        assert_eq!(hit.block_position, IVec3::new(5, 2, 3));
        assert_eq!(hit.block, BlockType::Stone);
        assert_eq!(hit.normal, BlockFace::Left);
        assert_eq!(hit.distance, 4.5);
        assert_eq!(hit.position, Vec3::new(5.0, 2.5, 3.5));
    }

    #[test]
    fn ray_pointing_away_or_too_short_misses() {
        let (settings, chunks) = world_with(&[(IVec3::new(5, 2, 3), BlockType::Stone)]);
        let origin = Vec3::new(0.5, 2.5, 3.5);

        assert!(raycast(&settings, &chunks, origin, Vec3::NEG_X, 50.0).is_none());
        assert!(raycast(&settings, &chunks, origin, Vec3::X, 4.0).is_none());
        assert!(raycast(&settings, &chunks, origin, Vec3::ZERO, 50.0).is_none());
    }

    #[test]
    fn ray_crosses_into_negative_chunks() {
        let (settings, chunks) = world_with(&[(IVec3::new(-1, 2, 0), BlockType::Wood)]);
        assert!(chunks.contains_key(&ChunkPos::new(-1, 0)));

        let hit = raycast(&settings, &chunks, Vec3::new(3.5, 2.5, 0.5), Vec3::NEG_X, 10.0)
            .expect("wood behind the chunk seam");
        assert_eq!(hit.block_position, IVec3::new(-1, 2, 0));
        assert_eq!(hit.normal, BlockFace::Right);
        assert_eq!(hit.distance, 3.5);
    }

    #[test]
    fn ray_from_above_the_world_reaches_the_floor() {
        let (settings, chunks) = world_with(&[(IVec3::new(1, 0, 1), BlockType::Bedrock)]);

        let hit = raycast(&settings, &chunks, Vec3::new(1.5, 20.5, 1.5), Vec3::NEG_Y, 30.0)
            .expect("bedrock below");
        assert_eq!(hit.block_position, IVec3::new(1, 0, 1));
        assert_eq!(hit.normal, BlockFace::Top);
        assert_eq!(hit.distance, 19.5);
    }

    #[test]
    fn origin_inside_solid_block_hits_immediately() {
        let (settings, chunks) = world_with(&[(IVec3::new(5, 2, 3), BlockType::Dirt)]);

        let hit = raycast(
            &settings,
            &chunks,
            Vec3::new(5.5, 2.5, 3.5),
            Vec3::new(1.0, 0.2, 0.0),
            10.0,
        )
        .expect("inside dirt");
        assert_eq!(hit.block_position, IVec3::new(5, 2, 3));
        assert_eq!(hit.distance, 0.0);
        assert_eq!(hit.normal, BlockFace::Left);
        assert_eq!(hit.position, Vec3::new(5.5, 2.5, 3.5));
    }

    #[test]
    fn missing_chunks_and_out_of_range_heights_read_as_air() {
        let (settings, chunks) = world_with(&[(IVec3::new(0, 0, 0), BlockType::Stone)]);
        let dims = settings.dims();

        assert_eq!(block_at_world(&chunks, dims, IVec3::ZERO), BlockType::Stone);
        assert_eq!(block_at_world(&chunks, dims, IVec3::new(0, -1, 0)), BlockType::Air);
        assert_eq!(block_at_world(&chunks, dims, IVec3::new(0, 16, 0)), BlockType::Air);
        assert_eq!(block_at_world(&chunks, dims, IVec3::new(100, 0, 100)), BlockType::Air);
    }

    #[test]
    fn rays_leaving_the_world_vertically_stop() {
        let (settings, chunks) = world_with(&[(IVec3::new(0, 0, 0), BlockType::Stone)]);
        let above = Vec3::new(0.5, 20.5, 0.5);

        assert!(raycast(&settings, &chunks, above, Vec3::Y, f32::INFINITY).is_none());
        assert!(raycast(&settings, &chunks, above, Vec3::X, f32::INFINITY).is_none());
        assert!(raycast(&settings, &chunks, Vec3::new(0.5, -3.0, 0.5), Vec3::NEG_Y, f32::INFINITY).is_none());

        let hit = raycast(&settings, &chunks, above, Vec3::NEG_Y, f32::INFINITY)
            .expect("stone below");
        assert_eq!(hit.block_position, IVec3::ZERO);
    }

    #[test]
    fn unbounded_or_invalid_limits_still_terminate() {
        let ray = Ray {
            origin: Vec3::new(0.5, 5.5, 0.5),
            direction: Vec3::X,
        };
        let steps = raycast_blocks(&ray, f32::INFINITY).count();
        assert_eq!(steps, MAX_RAYCAST_DISTANCE as usize + 1);
        assert_eq!(raycast_blocks(&ray, f32::NAN).count(), 1);

        let far = Ray {
            origin: Vec3::new(3.0e9, 5.5, 0.5),
            direction: Vec3::X,
        };
        assert_eq!(raycast_blocks(&far, 10.0).count(), 0);
    }
}
