use std::fmt;

use serde::Deserialize;
use tracing::warn;

use crate::atlas::{texture_coords, tile_count, TextureCoords};
use crate::block::{BlockFace, BlockType};

pub const DEFAULT_ATLAS_SIDE: u32 = 16;
pub const MISSING_TILE: u32 = 31;
pub const WHITE: [f32; 3] = [1.0, 1.0, 1.0];
pub const GRASS_TINT: [f32; 3] = [0.7, 1.0, 0.4];

const GRASS_SIDE_OVERLAY_TILE: u32 = 38;

/// Atlas region plus tint multiplier resolved for one block face.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BlockTexture {
    pub coords: TextureCoords,
    pub color: [f32; 3],
}

#[derive(Copy, Clone, Debug, PartialEq)]
struct TileRef {
    tile: u32,
    tint: [f32; 3],
}

type FaceTable = [[Option<TileRef>; 6]; BlockType::COUNT];

/// Per-face texture assignments for every block type.
///
/// Lookups never fail: anything without an assignment resolves to the missing tile.
#[derive(Clone, Debug)]
pub struct BlockTextures {
    atlas_side: u32,
    base: FaceTable,
    overlay: FaceTable,
}

impl Default for BlockTextures {
    fn default() -> Self {
        let mut textures = Self::new(DEFAULT_ATLAS_SIDE);

        textures.set_all(BlockType::Dirt, 2, WHITE);
        textures.set_all(BlockType::Stone, 1, WHITE);
        textures.set_all(BlockType::Leaves, 53, WHITE);
        textures.set_all(BlockType::Cobblestone, 16, WHITE);
        textures.set_all(BlockType::Bedrock, 17, WHITE);

        textures.set_sides(BlockType::Grass, 3, WHITE);
        textures.set_face(BlockType::Grass, BlockFace::Top, 0, GRASS_TINT);
        textures.set_face(BlockType::Grass, BlockFace::Bottom, 2, WHITE);
        for face in BlockFace::ALL.into_iter().filter(|face| face.is_side()) {
            textures.set_overlay(BlockType::Grass, face, GRASS_SIDE_OVERLAY_TILE, GRASS_TINT);
        }

        textures.set_sides(BlockType::Wood, 20, WHITE);
        textures.set_face(BlockType::Wood, BlockFace::Top, 21, WHITE);
        textures.set_face(BlockType::Wood, BlockFace::Bottom, 21, WHITE);

        textures
    }
}

impl BlockTextures {
    /// Creates an empty table for an `atlas_side`x`atlas_side` atlas.
    pub fn new(atlas_side: u32) -> Self {
        Self {
            atlas_side: atlas_side.max(1),
            base: [[None; 6]; BlockType::COUNT],
            overlay: [[None; 6]; BlockType::COUNT],
        }
    }

    pub fn atlas_side(&self) -> u32 {
        self.atlas_side
    }

    pub fn set_face(&mut self, block: BlockType, face: BlockFace, tile: u32, tint: [f32; 3]) {
        let entry = self.checked_tile(block, tile, tint);
        self.base[usize::from(block.raw())][face.index()] = entry;
    }

    pub fn set_all(&mut self, block: BlockType, tile: u32, tint: [f32; 3]) {
        for face in BlockFace::ALL {
            self.set_face(block, face, tile, tint);
        }
    }

    pub fn set_sides(&mut self, block: BlockType, tile: u32, tint: [f32; 3]) {
        for face in BlockFace::ALL.into_iter().filter(|face| face.is_side()) {
            self.set_face(block, face, tile, tint);
        }
    }

    pub fn set_overlay(&mut self, block: BlockType, face: BlockFace, tile: u32, tint: [f32; 3]) {
        let entry = self.checked_tile(block, tile, tint);
        self.overlay[usize::from(block.raw())][face.index()] = entry;
    }

    /// Base texture for a block face. Total over every block/face pair.
    pub fn texture(&self, block: BlockType, face: BlockFace) -> BlockTexture {
        match self.base[usize::from(block.raw())][face.index()] {
            Some(entry) => self.resolve(entry),
            None => self.missing(),
        }
    }

    /// Second, alpha-blended layer drawn over the base face, if the pair defines one.
    pub fn overlay(&self, block: BlockType, face: BlockFace) -> Option<BlockTexture> {
        self.overlay[usize::from(block.raw())][face.index()].map(|entry| self.resolve(entry))
    }

    pub fn missing(&self) -> BlockTexture {
        let tile = MISSING_TILE.min(tile_count(self.atlas_side).saturating_sub(1));
        BlockTexture {
            coords: texture_coords(tile, self.atlas_side),
            color: WHITE,
        }
    }

    fn resolve(&self, entry: TileRef) -> BlockTexture {
        BlockTexture {
            coords: texture_coords(entry.tile, self.atlas_side),
            color: entry.tint,
        }
    }

    // Out-of-range tiles are stored as "unassigned" so they resolve to the missing tile.
    fn checked_tile(&self, block: BlockType, tile: u32, tint: [f32; 3]) -> Option<TileRef> {
        if tile >= tile_count(self.atlas_side) {
            warn!(
                "Tile {tile} for block '{block}' is outside the {0}x{0} atlas; using missing tile",
                self.atlas_side
            );
            return None;
        }
        Some(TileRef { tile, tint })
    }

    /// Builds a table from a TOML description, starting from an empty table.
    ///
    /// ```toml
    /// atlas_side = 16
    ///
    /// [[block]]
    /// name = "grass"
    /// sides = 3
    /// bottom = 2
    ///
    /// [[block]]
    /// name = "grass"
    /// top = 0
    /// tint = [0.7, 1.0, 0.4]
    /// overlay_sides = 38
    /// overlay_tint = [0.7, 1.0, 0.4]
    /// ```
    ///
    /// Later entries override faces set by earlier ones. Unknown block names are
    /// skipped with a warning; only malformed TOML is an error.
    pub fn from_toml_str(source: &str) -> Result<Self, TextureTableError> {
        let table: TextureTable = toml::from_str(source).map_err(TextureTableError::Parse)?;
        let mut textures = Self::new(table.atlas_side.unwrap_or(DEFAULT_ATLAS_SIDE));

        for entry in &table.block {
            let Some(block) = BlockType::from_name(&entry.name) else {
                warn!("Unknown block '{}' in texture table; entry ignored", entry.name);
                continue;
            };
            let tint = entry.tint.unwrap_or(WHITE);

            if let Some(tile) = entry.all {
                textures.set_all(block, tile, tint);
            }
            if let Some(tile) = entry.sides {
                textures.set_sides(block, tile, tint);
            }
            if let Some(tile) = entry.top {
                textures.set_face(block, BlockFace::Top, tile, tint);
            }
            if let Some(tile) = entry.bottom {
                textures.set_face(block, BlockFace::Bottom, tile, tint);
            }
            if let Some(tile) = entry.overlay_sides {
                let overlay_tint = entry.overlay_tint.unwrap_or(WHITE);
                for face in BlockFace::ALL.into_iter().filter(|face| face.is_side()) {
                    textures.set_overlay(block, face, tile, overlay_tint);
                }
            }
        }

        Ok(textures)
    }
}

#[derive(Debug, Deserialize)]
struct TextureTable {
    atlas_side: Option<u32>,
    #[serde(default)]
    block: Vec<TextureEntry>,
}

#[derive(Debug, Deserialize)]
struct TextureEntry {
    name: String,
    all: Option<u32>,
    sides: Option<u32>,
    top: Option<u32>,
    bottom: Option<u32>,
    tint: Option<[f32; 3]>,
    overlay_sides: Option<u32>,
    overlay_tint: Option<[f32; 3]>,
}

#[derive(Debug)]
pub enum TextureTableError {
    Parse(toml::de::Error),
}

impl fmt::Display for TextureTableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(source) => write!(f, "failed to parse block texture table: {source}"),
        }
    }
}

impl std::error::Error for TextureTableError {}

#[cfg(test)]
mod tests {
    use super::{BlockTextures, GRASS_TINT, MISSING_TILE, WHITE};
    use crate::atlas::texture_coords;
    use crate::block::{BlockFace, BlockType};

    #[test]
    fn default_table_matches_terrain_atlas() {
        let textures = BlockTextures::default();

        let grass_top = textures.texture(BlockType::Grass, BlockFace::Top);
        assert_eq!(grass_top.coords, texture_coords(0, 16));
        assert_eq!(grass_top.color, GRASS_TINT);

        assert_eq!(
            textures.texture(BlockType::Grass, BlockFace::Left).coords,
            texture_coords(3, 16)
        );
        assert_eq!(
            textures.texture(BlockType::Grass, BlockFace::Bottom).coords,
            texture_coords(2, 16)
        );
        assert_eq!(
            textures.texture(BlockType::Wood, BlockFace::Top).coords,
            texture_coords(21, 16)
        );
        assert_eq!(
            textures.texture(BlockType::Wood, BlockFace::Front).coords,
            texture_coords(20, 16)
        );
        assert_eq!(
            textures.texture(BlockType::Bedrock, BlockFace::Back).coords,
            texture_coords(17, 16)
        );
    }

    #[test]
    fn every_pair_resolves_inside_the_atlas() {
        let textures = BlockTextures::default();
        for block in BlockType::ALL {
            for face in BlockFace::ALL {
                let texture = textures.texture(block, face);
                assert!(texture.coords.min_x >= 0.0 && texture.coords.max_x <= 1.0);
                assert!(texture.coords.min_y >= 0.0 && texture.coords.max_y <= 1.0);
                assert_eq!(texture, textures.texture(block, face));
            }
        }

        let air = textures.texture(BlockType::Air, BlockFace::Top);
        assert_eq!(air.coords, texture_coords(MISSING_TILE, 16));
        assert_eq!(air.color, WHITE);
    }

    #[test]
    fn only_grass_sides_have_overlays() {
        let textures = BlockTextures::default();
        for block in BlockType::ALL {
            for face in BlockFace::ALL {
                let overlay = textures.overlay(block, face);
                if block == BlockType::Grass && face.is_side() {
                    let overlay = overlay.expect("grass side overlay");
                    assert_eq!(overlay.coords, texture_coords(38, 16));
                    assert_eq!(overlay.color, GRASS_TINT);
                } else {
                    assert!(overlay.is_none(), "{block:?} {face:?} has no overlay");
                }
            }
        }
    }

    #[test]
    fn out_of_range_tiles_fall_back_to_missing() {
        let mut textures = BlockTextures::new(16);
        textures.set_all(BlockType::Stone, 256, WHITE);
        assert_eq!(
            textures.texture(BlockType::Stone, BlockFace::Top),
            textures.missing()
        );

        let tiny = BlockTextures::new(2);
        assert_eq!(tiny.missing().coords, texture_coords(3, 2));
    }

    #[test]
    fn toml_table_overrides_faces_in_order() {
        let source = r#"
            atlas_side = 16

            [[block]]
            name = "stone"
            all = 1

            [[block]]
            name = "stone"
            top = 5
            tint = [0.5, 0.5, 0.5]

            [[block]]
            name = "marble"
            all = 4

            [[block]]
            name = "grass"
            sides = 3
            overlay_sides = 38
        "#;
        let textures = BlockTextures::from_toml_str(source).expect("valid table");

        assert_eq!(
            textures.texture(BlockType::Stone, BlockFace::Front).coords,
            texture_coords(1, 16)
        );
        let top = textures.texture(BlockType::Stone, BlockFace::Top);
        assert_eq!(top.coords, texture_coords(5, 16));
        assert_eq!(top.color, [0.5, 0.5, 0.5]);

        assert!(textures.overlay(BlockType::Grass, BlockFace::Right).is_some());
        assert!(textures.overlay(BlockType::Grass, BlockFace::Top).is_none());
        assert_eq!(
            textures.texture(BlockType::Dirt, BlockFace::Top),
            textures.missing()
        );
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(BlockTextures::from_toml_str("[[block]]\nname = 3").is_err());
    }
}
