use std::ops::{Add, AddAssign, Sub, SubAssign};

use glam::{IVec3, Vec3};
use serde::{Deserialize, Serialize};

/// Horizontal grid position of a chunk. Chunks span the full world height, so there
/// is no vertical component.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }
}

impl Add for ChunkPos {
    type Output = ChunkPos;

    fn add(self, rhs: Self) -> Self::Output {
        ChunkPos {
            x: self.x + rhs.x,
            z: self.z + rhs.z,
        }
    }
}

impl AddAssign for ChunkPos {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.z += rhs.z;
    }
}

impl Sub for ChunkPos {
    type Output = ChunkPos;

    fn sub(self, rhs: Self) -> Self::Output {
        ChunkPos {
            x: self.x - rhs.x,
            z: self.z - rhs.z,
        }
    }
}

impl SubAssign for ChunkPos {
    fn sub_assign(&mut self, rhs: Self) {
        self.x -= rhs.x;
        self.z -= rhs.z;
    }
}

/// Horizontal world coordinates are kept within ±2^30 blocks so chunk and voxel
/// arithmetic stays inside `i32`.
pub const WORLD_COORD_LIMIT: i32 = 1 << 30;

/// Block extent of every chunk in a world.
///
/// Blocks are stored x-fastest, then y, then z:
/// `index = x + y * width + z * width * height`. Every lookup in the workspace goes
/// through [`ChunkDims::block_index`], so this order only lives here.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkDims {
    pub width: usize,
    pub height: usize,
    pub depth: usize,
}

impl ChunkDims {
    pub const fn new(width: usize, height: usize, depth: usize) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }

    pub fn volume(&self) -> usize {
        self.width * self.height * self.depth
    }

    pub fn in_chunk_bounds(&self, x: i32, y: i32, z: i32) -> bool {
        x >= 0
            && y >= 0
            && z >= 0
            && (x as usize) < self.width
            && (y as usize) < self.height
            && (z as usize) < self.depth
    }

    /// Flat offset of a local block. Only meaningful when
    /// [`in_chunk_bounds`](Self::in_chunk_bounds) holds.
    pub fn block_index(&self, x: i32, y: i32, z: i32) -> usize {
        x as usize + y as usize * self.width + z as usize * self.width * self.height
    }

    pub fn index_to_local(&self, index: usize) -> IVec3 {
        assert!(index < self.volume(), "chunk index out of bounds: {index}");

        let layer = self.width * self.height;
        let z = index / layer;
        let rem = index % layer;
        let y = rem / self.width;
        let x = rem % self.width;

        IVec3::new(x as i32, y as i32, z as i32)
    }

    /// World-space block offset of a chunk's local origin. Chunks start at y = 0.
    pub fn chunk_origin(&self, pos: ChunkPos) -> IVec3 {
        IVec3::new(
            pos.x.saturating_mul(self.width as i32),
            0,
            pos.z.saturating_mul(self.depth as i32),
        )
    }

    /// Chunk containing a world-space point, flooring on the horizontal plane only.
    /// Points past [`WORLD_COORD_LIMIT`] map to the chunk at the limit.
    pub fn chunk_containing(&self, position: Vec3) -> ChunkPos {
        let limit = WORLD_COORD_LIMIT as f32;
        ChunkPos {
            x: (position.x.clamp(-limit, limit) / self.width as f32).floor() as i32,
            z: (position.z.clamp(-limit, limit) / self.depth as f32).floor() as i32,
        }
    }

    /// Splits a world block position into its chunk and the local position inside it.
    /// The local y is the world y unchanged.
    pub fn world_to_chunk(&self, world_pos: IVec3) -> (ChunkPos, IVec3) {
        let (chunk_x, local_x) = div_rem_floor(world_pos.x, self.width as i32);
        let (chunk_z, local_z) = div_rem_floor(world_pos.z, self.depth as i32);

        (
            ChunkPos {
                x: chunk_x,
                z: chunk_z,
            },
            IVec3::new(local_x, world_pos.y, local_z),
        )
    }

    pub fn chunk_to_world(&self, pos: ChunkPos, local: IVec3) -> IVec3 {
        self.chunk_origin(pos) + local
    }
}

fn div_rem_floor(value: i32, divisor: i32) -> (i32, i32) {
    let mut q = value / divisor;
    let mut r = value % divisor;
    if r < 0 {
        q -= 1;
        r += divisor;
    }
    (q, r)
}

#[cfg(test)]
mod tests {
    use glam::{IVec3, Vec3};

    use super::{ChunkDims, ChunkPos, WORLD_COORD_LIMIT};

    #[test]
    fn block_index_is_a_bijection_onto_the_volume() {
        let dims = ChunkDims::new(5, 7, 3);
        let mut seen = vec![false; dims.volume()];

        for z in 0..dims.depth as i32 {
            for y in 0..dims.height as i32 {
                for x in 0..dims.width as i32 {
                    assert!(dims.in_chunk_bounds(x, y, z));
                    let index = dims.block_index(x, y, z);
                    assert!(index < dims.volume());
                    assert!(!seen[index], "index {index} produced twice");
                    seen[index] = true;
                    assert_eq!(dims.index_to_local(index), IVec3::new(x, y, z));
                }
            }
        }

        assert!(seen.into_iter().all(|hit| hit));
    }

    #[test]
    fn block_index_is_x_fastest_then_y_then_z() {
        let dims = ChunkDims::new(16, 32, 16);
        assert_eq!(dims.block_index(1, 0, 0), 1);
        assert_eq!(dims.block_index(0, 1, 0), 16);
        assert_eq!(dims.block_index(0, 0, 1), 16 * 32);
    }

    #[test]
    fn bounds_reject_every_axis_overflow() {
        let dims = ChunkDims::new(16, 16, 16);
        assert!(!dims.in_chunk_bounds(-1, 0, 0));
        assert!(!dims.in_chunk_bounds(0, -1, 0));
        assert!(!dims.in_chunk_bounds(0, 0, -1));
        assert!(!dims.in_chunk_bounds(16, 0, 0));
        assert!(!dims.in_chunk_bounds(0, 16, 0));
        assert!(!dims.in_chunk_bounds(0, 0, 16));
        assert!(dims.in_chunk_bounds(15, 15, 15));
    }

    #[test]
    fn chunk_pos_arithmetic_is_component_wise() {
        let a = ChunkPos::new(10, 4);
        let b = ChunkPos::new(-3, 1);

        assert_eq!(a + b, ChunkPos::new(7, 5));
        assert_eq!(a - b, ChunkPos::new(13, 3));

        let mut c = a;
        c += b;
        assert_eq!(c, ChunkPos::new(7, 5));
        c -= b;
        assert_eq!(c, a);
    }

    #[test]
    fn world_to_chunk_floors_negative_coordinates() {
        let dims = ChunkDims::new(16, 64, 8);

        let (chunk, local) = dims.world_to_chunk(IVec3::new(-1, 5, -1));
        assert_eq!(chunk, ChunkPos::new(-1, -1));
        assert_eq!(local, IVec3::new(15, 5, 7));

        let (chunk, local) = dims.world_to_chunk(IVec3::new(32, 0, 8));
        assert_eq!(chunk, ChunkPos::new(2, 1));
        assert_eq!(local, IVec3::new(0, 0, 0));

        let world = IVec3::new(-33, 40, 66);
        let (chunk, local) = dims.world_to_chunk(world);
        assert_eq!(dims.chunk_to_world(chunk, local), world);
    }

    #[test]
    fn chunk_containing_agrees_with_block_conversion() {
        let dims = ChunkDims::new(16, 16, 16);
        assert_eq!(dims.chunk_containing(Vec3::new(-0.1, 100.0, 15.9)), ChunkPos::new(-1, 0));
        assert_eq!(dims.chunk_containing(Vec3::new(16.0, -5.0, -16.0)), ChunkPos::new(1, -1));

        let point = Vec3::new(-17.25, 3.0, 40.5);
        let (chunk, _) = dims.world_to_chunk(point.floor().as_ivec3());
        assert_eq!(dims.chunk_containing(point), chunk);
    }

    #[test]
    fn far_positions_clamp_to_the_world_limit() {
        let dims = ChunkDims::new(16, 16, 16);
        let far = dims.chunk_containing(Vec3::new(3.0e9, 0.0, -3.0e9));
        assert_eq!(far, ChunkPos::new(WORLD_COORD_LIMIT / 16, -WORLD_COORD_LIMIT / 16));

        let origin = dims.chunk_origin(far + ChunkPos::new(64, -64));
        assert_eq!(origin.x, WORLD_COORD_LIMIT + 64 * 16);
        assert_eq!(origin.z, -WORLD_COORD_LIMIT - 64 * 16);

        let overflowing = dims.chunk_origin(ChunkPos::new(i32::MAX, i32::MIN));
        assert_eq!(overflowing, IVec3::new(i32::MAX, 0, i32::MIN));
    }
}
