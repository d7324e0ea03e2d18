use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use image::{imageops, Rgba, RgbaImage};
use tessel_shared::atlas::{texture_coords, tile_count, TextureCoords};
use tracing::{info, warn};

const PLACEHOLDER_TILE_SIZE: u32 = 16;
const PLACEHOLDER_DARK: Rgba<u8> = Rgba([24, 24, 24, 255]);
const PLACEHOLDER_BRIGHT: Rgba<u8> = Rgba([255, 0, 255, 255]);

/// Square terrain texture atlas split into `side_count × side_count` tiles.
///
/// The image is stored bottom row first, so tile rows count downward from the top
/// of the source file while texture coordinates count upward from v = 0.
#[derive(Debug, Clone)]
pub struct TerrainAtlas {
    image: RgbaImage,
    side_count: u32,
    placeholder: bool,
}

#[derive(Debug)]
pub enum AtlasError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },
    NotSquare {
        width: u32,
        height: u32,
    },
    Indivisible {
        size: u32,
        side_count: u32,
    },
}

impl fmt::Display for AtlasError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read atlas {}: {source}", path.display())
            }
            Self::Decode { path, source } => {
                write!(f, "failed to decode atlas {}: {source}", path.display())
            }
            Self::NotSquare { width, height } => {
                write!(f, "atlas must be square, got {width}x{height}")
            }
            Self::Indivisible { size, side_count } => write!(
                f,
                "atlas size {size} is not divisible into {side_count} tiles per side"
            ),
        }
    }
}

impl std::error::Error for AtlasError {}

impl TerrainAtlas {
    pub fn load(path: &Path, side_count: u32) -> Result<Self, AtlasError> {
        let bytes = fs::read(path).map_err(|source| AtlasError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let decoded = image::load_from_memory(&bytes).map_err(|source| AtlasError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        let atlas = Self::from_image(decoded.to_rgba8(), side_count)?;
        info!(
            "Loaded terrain atlas {} ({}x{}, {} tiles)",
            path.display(),
            atlas.image.width(),
            atlas.image.height(),
            tile_count(atlas.side_count)
        );
        Ok(atlas)
    }

    /// Loads the atlas, falling back to a generated checkerboard if it can't be used.
    pub fn load_or_placeholder(path: &Path, side_count: u32) -> Self {
        match Self::load(path, side_count) {
            Ok(atlas) => atlas,
            Err(err) => {
                warn!("{err}; using placeholder atlas");
                Self::placeholder(side_count)
            }
        }
    }

    pub fn from_image(mut image: RgbaImage, side_count: u32) -> Result<Self, AtlasError> {
        let (width, height) = image.dimensions();
        if width != height {
            return Err(AtlasError::NotSquare { width, height });
        }
        let side_count = side_count.max(1);
        if width == 0 || width % side_count != 0 {
            return Err(AtlasError::Indivisible {
                size: width,
                side_count,
            });
        }

        imageops::flip_vertical_in_place(&mut image);
        Ok(Self {
            image,
            side_count,
            placeholder: false,
        })
    }

    pub fn placeholder(side_count: u32) -> Self {
        let side_count = side_count.max(1);
        let size = side_count * PLACEHOLDER_TILE_SIZE;
        let half = PLACEHOLDER_TILE_SIZE / 2;
        let image = RgbaImage::from_fn(size, size, |x, y| {
            if ((x % PLACEHOLDER_TILE_SIZE) / half + (y % PLACEHOLDER_TILE_SIZE) / half) % 2 == 0 {
                PLACEHOLDER_BRIGHT
            } else {
                PLACEHOLDER_DARK
            }
        });

        Self {
            image,
            side_count,
            placeholder: true,
        }
    }

    pub fn texture_coords(&self, index: u32) -> TextureCoords {
        texture_coords(index, self.side_count)
    }

    pub fn side_count(&self) -> u32 {
        self.side_count
    }

    pub fn tile_size(&self) -> u32 {
        self.image.width() / self.side_count
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }

    /// Rows bottom-up, ready for a texture upload.
    pub fn rgba_bytes(&self) -> &[u8] {
        self.image.as_raw()
    }
}

#[cfg(test)]
mod tests {
    use image::{Rgba, RgbaImage};

    use super::{AtlasError, TerrainAtlas};

    #[test]
    fn placeholder_is_square_and_tiled() {
        let atlas = TerrainAtlas::placeholder(4);
        assert!(atlas.is_placeholder());
        assert_eq!(atlas.dimensions(), (64, 64));
        assert_eq!(atlas.tile_size(), 16);
        assert_eq!(atlas.rgba_bytes().len(), 64 * 64 * 4);
    }

    #[test]
    fn images_are_flipped_so_the_top_row_lands_at_high_v() {
        let mut image = RgbaImage::new(2, 2);
        image.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        let atlas = TerrainAtlas::from_image(image, 2).expect("valid atlas");

        // First pixel of the stored buffer is now the bottom-left of the source.
        assert_eq!(&atlas.rgba_bytes()[..4], &[0, 0, 0, 0]);
        let last_row_start = 2 * 4;
        assert_eq!(&atlas.rgba_bytes()[last_row_start..last_row_start + 4], &[255, 0, 0, 255]);

        let top_left = atlas.texture_coords(0);
        assert_eq!(top_left.max_y, 1.0);
    }

    #[test]
    fn rejects_bad_shapes() {
        assert!(matches!(
            TerrainAtlas::from_image(RgbaImage::new(32, 16), 2),
            Err(AtlasError::NotSquare { width: 32, height: 16 })
        ));
        assert!(matches!(
            TerrainAtlas::from_image(RgbaImage::new(30, 30), 4),
            Err(AtlasError::Indivisible { size: 30, side_count: 4 })
        ));
    }

    #[test]
    fn missing_file_falls_back_to_placeholder() {
        let path = std::env::temp_dir().join("tessel_atlas_that_does_not_exist.png");
        assert!(matches!(
            TerrainAtlas::load(&path, 16),
            Err(AtlasError::Io { .. })
        ));
        let atlas = TerrainAtlas::load_or_placeholder(&path, 16);
        assert!(atlas.is_placeholder());
        assert_eq!(atlas.side_count(), 16);
    }

    #[test]
    fn loads_png_from_disk() {
        let path = std::env::temp_dir().join(format!("tessel_atlas_{}.png", std::process::id()));
        RgbaImage::from_pixel(8, 8, Rgba([10, 20, 30, 255]))
            .save(&path)
            .expect("write png");

        let atlas = TerrainAtlas::load(&path, 2).expect("load png");
        assert!(!atlas.is_placeholder());
        assert_eq!(atlas.tile_size(), 4);
        let _ = std::fs::remove_file(&path);
    }
}
