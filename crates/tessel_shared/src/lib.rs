pub mod atlas;
pub mod block;
pub mod block_texture;
pub mod chunk;
pub mod coords;
pub mod physics;
pub mod settings;
pub mod worldgen;
