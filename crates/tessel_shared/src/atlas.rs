/// UV rectangle of one atlas tile. Texture space has its origin at the bottom-left.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TextureCoords {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl TextureCoords {
    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    /// Corner UVs in bottom-left, bottom-right, top-right, top-left order, matching
    /// the corner order of [`crate::block::BlockFace::corners`].
    pub fn corners(&self) -> [[f32; 2]; 4] {
        [
            [self.min_x, self.min_y],
            [self.max_x, self.min_y],
            [self.max_x, self.max_y],
            [self.min_x, self.max_y],
        ]
    }
}

/// Maps tile `index` of a `count`x`count` atlas to its UV rectangle.
///
/// Tiles are numbered row-major starting at the top-left of the image, so row 0
/// lands at the top of texture space (v close to 1).
pub fn texture_coords(index: u32, count: u32) -> TextureCoords {
    let count = count.max(1);
    let size = 1.0 / count as f32;
    let column = (index % count) as f32;
    let row = (index / count) as f32;

    let min_x = column * size;
    let min_y = 1.0 - (row + 1.0) * size;

    TextureCoords {
        min_x,
        min_y,
        max_x: min_x + size,
        max_y: min_y + size,
    }
}

pub fn tile_count(count: u32) -> u32 {
    count.saturating_mul(count)
}
