use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use serde::Deserialize;

const EMPTY_TILE: Rgba<u8> = Rgba([255, 0, 255, 255]);

/// `textures[i]` becomes tile `i`, filled left to right and top to bottom.
#[derive(Debug, Deserialize)]
struct AtlasManifest {
    output: String,
    #[serde(default = "default_side_count")]
    side_count: u32,
    #[serde(default = "default_tile_size")]
    tile_size: u32,
    textures: Vec<String>,
}

fn default_side_count() -> u32 {
    16
}

fn default_tile_size() -> u32 {
    16
}

fn main() {
    let manifest_path = env::args()
        .nth(1)
        .unwrap_or_else(|| "manifest.toml".to_string());

    if let Err(err) = run(Path::new(&manifest_path)) {
        eprintln!("atlas_packer error: {err}");
        std::process::exit(1);
    }
}

fn run(manifest_path: &Path) -> Result<(), String> {
    let manifest_src = fs::read_to_string(manifest_path)
        .map_err(|err| format!("failed to read {}: {err}", manifest_path.display()))?;

    let manifest: AtlasManifest = toml::from_str(&manifest_src)
        .map_err(|err| format!("failed to parse {}: {err}", manifest_path.display()))?;

    let base_dir = manifest_path.parent().unwrap_or_else(|| Path::new("."));
    let mut tiles = Vec::with_capacity(manifest.textures.len());
    for rel_path in &manifest.textures {
        let path = base_dir.join(rel_path);
        let tile = image::open(&path)
            .map_err(|err| format!("failed to load {}: {err}", path.display()))?;
        tiles.push(tile.to_rgba8());
    }

    let atlas = pack(&tiles, manifest.side_count, manifest.tile_size)?;
    let output = base_dir.join(PathBuf::from(&manifest.output));
    atlas
        .save(&output)
        .map_err(|err| format!("failed to write {}: {err}", output.display()))?;

    println!(
        "Packed {} textures into {} ({}x{} tiles of {}px)",
        tiles.len(),
        output.display(),
        manifest.side_count,
        manifest.side_count,
        manifest.tile_size
    );
    Ok(())
}

fn pack(tiles: &[RgbaImage], side_count: u32, tile_size: u32) -> Result<RgbaImage, String> {
    if side_count == 0 || tile_size == 0 {
        return Err("side_count and tile_size must be positive".to_string());
    }
    let (Some(capacity), Some(size)) = (
        side_count.checked_mul(side_count),
        side_count.checked_mul(tile_size),
    ) else {
        return Err(format!(
            "a {side_count}x{side_count} atlas of {tile_size}px tiles is too large"
        ));
    };
    if tiles.len() > capacity as usize {
        return Err(format!(
            "{} textures don't fit in a {side_count}x{side_count} atlas",
            tiles.len()
        ));
    }

    let mut atlas = RgbaImage::from_pixel(size, size, EMPTY_TILE);
    for (index, tile) in tiles.iter().enumerate() {
        let index = index as u32;
        let x = (index % side_count) * tile_size;
        let y = (index / side_count) * tile_size;
        let scaled = if tile.dimensions() == (tile_size, tile_size) {
            tile.clone()
        } else {
            imageops::resize(tile, tile_size, tile_size, FilterType::Nearest)
        };
        imageops::replace(&mut atlas, &scaled, i64::from(x), i64::from(y));
    }
    Ok(atlas)
}

#[cfg(test)]
mod tests {
    use image::{Rgba, RgbaImage};

    use super::{pack, EMPTY_TILE};

    #[test]
    fn tiles_fill_rows_from_the_top_left() {
        let red = RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255]));
        let blue = RgbaImage::from_pixel(8, 8, Rgba([0, 0, 255, 255]));
        let atlas = pack(&[red, blue.clone(), blue], 2, 4).expect("pack");

        assert_eq!(atlas.dimensions(), (8, 8));
        assert_eq!(*atlas.get_pixel(0, 0), Rgba([255, 0, 0, 255]));
        assert_eq!(*atlas.get_pixel(5, 1), Rgba([0, 0, 255, 255]));
        assert_eq!(*atlas.get_pixel(1, 6), Rgba([0, 0, 255, 255]));
        assert_eq!(*atlas.get_pixel(7, 7), EMPTY_TILE);
    }

    #[test]
    fn too_many_tiles_is_an_error() {
        let tile = RgbaImage::new(2, 2);
        assert!(pack(&vec![tile; 5], 2, 2).is_err());
        assert!(pack(&[], 0, 2).is_err());
        assert!(pack(&[], 70_000, 1).is_err());
        assert!(pack(&[], 2, u32::MAX).is_err());
    }
}
