pub mod app;
pub mod chunk_manager;
pub mod config;
pub mod renderer;
