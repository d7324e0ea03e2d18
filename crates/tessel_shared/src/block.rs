use std::fmt;

use bitflags::bitflags;
use glam::{IVec3, Vec3};
use serde::{Deserialize, Serialize};

#[repr(u8)]
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    #[default]
    Air = 0,
    Dirt = 1,
    Grass = 2,
    Stone = 3,
    Wood = 4,
    Leaves = 5,
    Cobblestone = 6,
    Bedrock = 7,
}

impl BlockType {
    pub const COUNT: usize = 8;

    pub const ALL: [BlockType; Self::COUNT] = [
        BlockType::Air,
        BlockType::Dirt,
        BlockType::Grass,
        BlockType::Stone,
        BlockType::Wood,
        BlockType::Leaves,
        BlockType::Cobblestone,
        BlockType::Bedrock,
    ];

    pub fn raw(self) -> u8 {
        self as u8
    }

    pub fn from_raw(raw: u8) -> Option<Self> {
        Self::ALL.get(usize::from(raw)).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            BlockType::Air => "air",
            BlockType::Dirt => "dirt",
            BlockType::Grass => "grass",
            BlockType::Stone => "stone",
            BlockType::Wood => "wood",
            BlockType::Leaves => "leaves",
            BlockType::Cobblestone => "cobblestone",
            BlockType::Bedrock => "bedrock",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|block| block.name().eq_ignore_ascii_case(name))
    }

    pub fn is_air(self) -> bool {
        self == BlockType::Air
    }

    pub fn is_solid(self) -> bool {
        !self.is_air()
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

bitflags! {
    /// Set of cube faces, used by the mesher to record which faces of a block are exposed.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct FaceMask: u8 {
        const FRONT = 1 << 0;
        const BACK = 1 << 1;
        const LEFT = 1 << 2;
        const RIGHT = 1 << 3;
        const TOP = 1 << 4;
        const BOTTOM = 1 << 5;
        const SIDES = Self::FRONT.bits() | Self::BACK.bits() | Self::LEFT.bits() | Self::RIGHT.bits();
    }
}

#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BlockFace {
    /// +Z
    Front = 0,
    /// -Z
    Back = 1,
    /// -X
    Left = 2,
    /// +X
    Right = 3,
    /// +Y
    Top = 4,
    /// -Y
    Bottom = 5,
}

impl BlockFace {
    pub const ALL: [BlockFace; 6] = [
        BlockFace::Front,
        BlockFace::Back,
        BlockFace::Left,
        BlockFace::Right,
        BlockFace::Top,
        BlockFace::Bottom,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn normal(self) -> IVec3 {
        match self {
            BlockFace::Front => IVec3::Z,
            BlockFace::Back => IVec3::NEG_Z,
            BlockFace::Left => IVec3::NEG_X,
            BlockFace::Right => IVec3::X,
            BlockFace::Top => IVec3::Y,
            BlockFace::Bottom => IVec3::NEG_Y,
        }
    }

    pub fn normal_f32(self) -> [f32; 3] {
        self.normal().as_vec3().to_array()
    }

    pub fn from_normal(normal: IVec3) -> Option<Self> {
        Self::ALL.into_iter().find(|face| face.normal() == normal)
    }

    pub fn is_side(self) -> bool {
        !matches!(self, BlockFace::Top | BlockFace::Bottom)
    }

    pub fn mask(self) -> FaceMask {
        match self {
            BlockFace::Front => FaceMask::FRONT,
            BlockFace::Back => FaceMask::BACK,
            BlockFace::Left => FaceMask::LEFT,
            BlockFace::Right => FaceMask::RIGHT,
            BlockFace::Top => FaceMask::TOP,
            BlockFace::Bottom => FaceMask::BOTTOM,
        }
    }

    /// The face a ray travelling along `direction` would strike first: the one whose
    /// normal opposes the dominant direction axis.
    pub fn facing_against(direction: Vec3) -> Self {
        let abs = direction.abs();
        if abs.x >= abs.y && abs.x >= abs.z {
            if direction.x > 0.0 {
                BlockFace::Left
            } else {
                BlockFace::Right
            }
        } else if abs.y >= abs.z {
            if direction.y > 0.0 {
                BlockFace::Bottom
            } else {
                BlockFace::Top
            }
        } else if direction.z > 0.0 {
            BlockFace::Back
        } else {
            BlockFace::Front
        }
    }

    /// Unit-cube corners of this face in bottom-left, bottom-right, top-right,
    /// top-left order. Counter-clockwise seen from outside the cube.
    pub fn corners(self) -> [[f32; 3]; 4] {
        match self {
            BlockFace::Front => [
                [0.0, 0.0, 1.0],
                [1.0, 0.0, 1.0],
                [1.0, 1.0, 1.0],
                [0.0, 1.0, 1.0],
            ],
            BlockFace::Back => [
                [1.0, 0.0, 0.0],
                [0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [1.0, 1.0, 0.0],
            ],
            BlockFace::Left => [
                [0.0, 0.0, 0.0],
                [0.0, 0.0, 1.0],
                [0.0, 1.0, 1.0],
                [0.0, 1.0, 0.0],
            ],
            BlockFace::Right => [
                [1.0, 0.0, 1.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [1.0, 1.0, 1.0],
            ],
            BlockFace::Top => [
                [0.0, 1.0, 1.0],
                [1.0, 1.0, 1.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, 0.0],
            ],
            BlockFace::Bottom => [
                [1.0, 0.0, 1.0],
                [0.0, 0.0, 1.0],
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::{IVec3, Vec3};

    use super::{BlockFace, BlockType, FaceMask};

    #[test]
    fn raw_ids_and_names_round_trip() {
        for block in BlockType::ALL {
            assert_eq!(BlockType::from_raw(block.raw()), Some(block));
            assert_eq!(BlockType::from_name(block.name()), Some(block));
        }
        assert_eq!(BlockType::from_raw(8), None);
        assert_eq!(BlockType::from_name(" Grass "), Some(BlockType::Grass));
        assert_eq!(BlockType::from_name("granite"), None);
        assert!(BlockType::Air.is_air());
        assert!(BlockType::Bedrock.is_solid());
    }

    #[test]
    fn face_quads_wind_counter_clockwise_around_their_normal() {
        for face in BlockFace::ALL {
            let [a, b, c, d] = face.corners().map(Vec3::from_array);
            let first = (b - a).cross(c - a);
            let second = (d - c).cross(a - c);
            let normal = face.normal().as_vec3();
            assert_eq!(first, normal, "{face:?} first triangle");
            assert_eq!(second, normal, "{face:?} second triangle");

            for corner in face.corners() {
                let on_plane = Vec3::from_array(corner) - Vec3::splat(0.5);
                assert_eq!(on_plane.dot(normal), 0.5, "{face:?} corner off the face plane");
            }
        }
    }

    #[test]
    fn faces_map_to_normals_and_back() {
        for face in BlockFace::ALL {
            assert_eq!(BlockFace::from_normal(face.normal()), Some(face));
        }
        assert_eq!(BlockFace::from_normal(IVec3::new(1, 1, 0)), None);

        let sides: FaceMask = BlockFace::ALL
            .into_iter()
            .filter(|face| face.is_side())
            .map(BlockFace::mask)
            .collect();
        assert_eq!(sides, FaceMask::SIDES);
    }

    #[test]
    fn facing_against_opposes_dominant_axis() {
        assert_eq!(BlockFace::facing_against(Vec3::new(0.9, 0.1, 0.0)), BlockFace::Left);
        assert_eq!(BlockFace::facing_against(Vec3::new(0.1, -0.9, 0.2)), BlockFace::Top);
        assert_eq!(BlockFace::facing_against(Vec3::new(0.0, 0.0, -1.0)), BlockFace::Front);
    }
}
