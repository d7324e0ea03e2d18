use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use tessel_client::renderer::atlas::TerrainAtlas;
use tessel_client::renderer::mesh::build_chunk_mesh;
use tessel_shared::block::BlockType;
use tessel_shared::block_texture::BlockTextures;
use tessel_shared::chunk::ChunkData;
use tessel_shared::coords::ChunkPos;
use tessel_shared::settings::WorldSettings;
use tessel_shared::worldgen::GeneratorConfig;

fn main() {
    let mut generator = "terrain".to_string();
    let mut layers: Option<PathBuf> = None;
    let mut seed = 0xC0FFEE_u32;
    let mut pos = ChunkPos::default();

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--help" || arg == "-h" {
            println!(
                "Usage: mesh_inspector [--generator flat|test_pattern|terrain|layered] \
                 [--layers <path>] [--seed <u32>] [--x <i32>] [--z <i32>]"
            );
            return;
        }
        let Some(value) = args.next() else {
            eprintln!("{arg} expects an argument");
            std::process::exit(2);
        };
        let parsed = match arg.as_str() {
            "--generator" => {
                generator = value;
                Ok(())
            }
            "--layers" => {
                layers = Some(PathBuf::from(value));
                Ok(())
            }
            "--seed" => value.parse::<u32>().map(|v| seed = v).map_err(|err| err.to_string()),
            "--x" => value.parse::<i32>().map(|v| pos.x = v).map_err(|err| err.to_string()),
            "--z" => value.parse::<i32>().map(|v| pos.z = v).map_err(|err| err.to_string()),
            other => Err(format!("unknown argument: {other}")),
        };
        if let Err(err) = parsed {
            eprintln!("mesh_inspector: {arg}: {err}");
            std::process::exit(2);
        }
    }

    let config = match generator.as_str() {
        "flat" => GeneratorConfig::Flat,
        "test_pattern" => GeneratorConfig::TestPattern,
        "terrain" => GeneratorConfig::Terrain { seed },
        "layered" => {
            let Some(script) = layers else {
                eprintln!("mesh_inspector: the layered generator needs --layers <path>");
                std::process::exit(2);
            };
            GeneratorConfig::Layered { script }
        }
        other => {
            eprintln!("mesh_inspector: unknown generator '{other}'");
            std::process::exit(2);
        }
    };

    if let Err(err) = run(&config, pos) {
        eprintln!("mesh_inspector error: {err}");
        std::process::exit(1);
    }
}

fn run(config: &GeneratorConfig, pos: ChunkPos) -> Result<(), String> {
    let generator = config.build().map_err(|err| err.to_string())?;
    let dims = WorldSettings::default().dims();
    let data = ChunkData::from_blocks(dims, generator.generate(pos, dims))
        .map_err(|err| format!("generator '{}' {err}", generator.name()))?;

    let textures = BlockTextures::default();
    let atlas = Arc::new(TerrainAtlas::placeholder(textures.atlas_side()));
    let mesh = build_chunk_mesh(&data, pos, &textures, &atlas);

    println!(
        "Chunk ({}, {}) from '{}' ({}x{}x{})",
        pos.x,
        pos.z,
        generator.name(),
        dims.width,
        dims.height,
        dims.depth
    );
    for block in BlockType::ALL {
        let count = data.blocks().iter().filter(|b| **b == block).count();
        if count > 0 {
            println!("  {block:<12} {count}");
        }
    }
    println!("Vertices: {}", mesh.vertex_count());
    println!("Indices:  {}", mesh.index_count());
    println!("Quads:    {}", mesh.vertex_count() / 4);
    println!("Vertex buffer: {} bytes", mesh.vertex_bytes().len());
    Ok(())
}
