use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tessel_shared::block_texture::{BlockTextures, DEFAULT_ATLAS_SIDE};
use tessel_shared::settings::WorldSettings;
use tessel_shared::worldgen::GeneratorConfig;
use tracing::warn;

pub const MIN_PICK_DISTANCE: f32 = 0.5;
pub const MAX_PICK_DISTANCE: f32 = 256.0;
pub const MAX_GENERATION_CACHE: usize = 65_536;
pub const MAX_WORKER_THREADS: usize = 64;
pub const MAX_ATLAS_SIDE: u32 = 64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_pick_distance")]
    pub pick_distance: f32,
    #[serde(default)]
    pub generation_cache_capacity: usize,
    #[serde(default)]
    pub parallel_streaming: bool,
    #[serde(default)]
    pub worker_threads: Option<usize>,
    #[serde(default = "default_atlas_path")]
    pub atlas_path: PathBuf,
    #[serde(default = "default_atlas_side_count")]
    pub atlas_side_count: u32,
    #[serde(default)]
    pub block_textures: Option<PathBuf>,
    #[serde(default)]
    pub world: WorldSettings,
    #[serde(default)]
    pub generator: GeneratorConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            pick_distance: default_pick_distance(),
            generation_cache_capacity: 0,
            parallel_streaming: false,
            worker_threads: None,
            atlas_path: default_atlas_path(),
            atlas_side_count: default_atlas_side_count(),
            block_textures: None,
            world: WorldSettings::default(),
            generator: GeneratorConfig::default(),
        }
    }
}

#[derive(Debug)]
pub enum SettingsError {
    Io(io::Error),
    Parse(toml::de::Error),
    Serialize(toml::ser::Error),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "{err}"),
            Self::Parse(err) => write!(f, "failed to deserialize settings: {err}"),
            Self::Serialize(err) => write!(f, "failed to serialize settings: {err}"),
        }
    }
}

impl std::error::Error for SettingsError {}

impl From<io::Error> for SettingsError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl ClientConfig {
    pub fn sanitize(mut self) -> Self {
        self.world = self.world.sanitize();
        self.pick_distance = if self.pick_distance.is_finite() {
            self.pick_distance.clamp(MIN_PICK_DISTANCE, MAX_PICK_DISTANCE)
        } else {
            default_pick_distance()
        };
        self.generation_cache_capacity = self.generation_cache_capacity.min(MAX_GENERATION_CACHE);
        self.worker_threads = self
            .worker_threads
            .map(|threads| threads.clamp(1, MAX_WORKER_THREADS));
        self.atlas_side_count = self.atlas_side_count.clamp(1, MAX_ATLAS_SIDE);
        self
    }

    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path)?;
        let parsed = toml::from_str::<Self>(&contents).map_err(SettingsError::Parse)?;
        Ok(parsed.sanitize())
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let config = self.clone().sanitize();
        let serialized = toml::to_string_pretty(&config).map_err(SettingsError::Serialize)?;
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serialized)?;
        Ok(())
    }

    /// Loads `path`, writing defaults there if it doesn't exist. Unreadable files
    /// fall back to defaults and are left as they are.
    pub fn load_or_create(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(SettingsError::Io(err)) if err.kind() == io::ErrorKind::NotFound => {
                let config = Self::default();
                if let Err(save_err) = config.save(path) {
                    warn!(
                        "Failed to create default config at {}: {save_err}",
                        path.display()
                    );
                }
                config
            }
            Err(err) => {
                warn!("Failed to load config from {}: {err}", path.display());
                Self::default()
            }
        }
    }

    /// Texture table from `block_textures`, or the built-in one.
    pub fn load_block_textures(&self) -> BlockTextures {
        let textures = match self.block_textures.as_deref() {
            None => BlockTextures::default(),
            Some(path) => match fs::read_to_string(path) {
                Ok(source) => BlockTextures::from_toml_str(&source).unwrap_or_else(|err| {
                    warn!("Ignoring texture table {}: {err}", path.display());
                    BlockTextures::default()
                }),
                Err(err) => {
                    warn!("Failed to read texture table {}: {err}", path.display());
                    BlockTextures::default()
                }
            },
        };

        if textures.atlas_side() != self.atlas_side_count {
            warn!(
                "Texture table expects a {0}x{0} atlas but the config says {1}x{1}",
                textures.atlas_side(),
                self.atlas_side_count
            );
        }
        textures
    }
}

fn default_pick_distance() -> f32 {
    8.0
}

fn default_atlas_path() -> PathBuf {
    PathBuf::from("assets/terrain.png")
}

fn default_atlas_side_count() -> u32 {
    DEFAULT_ATLAS_SIDE
}
