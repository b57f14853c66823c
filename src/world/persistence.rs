use std::path::{Path, PathBuf};

use glam::IVec2;
use serde::{Deserialize, Serialize};

use crate::entity::player::Player;
use crate::error::{WorldError, WorldResult};
use crate::world::clock::START_TIME;

const WORLD_INFO_FILE: &str = "worldInfo.json";
const MANIFEST_FILE: &str = "manifest.json";
const CHUNK_DIR: &str = "world";

/// World metadata stored in worldInfo.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorldInfo {
    #[serde(rename = "defaultGM")]
    pub default_gm: i32,
    pub map_type: i32,
    pub seed: i32,
    /// Clock seconds (game minutes since the world began)
    pub time: i64,
    /// Real seconds played
    pub play_time: i64,
    /// Lowest entity id not yet handed out in this world
    pub next_entity_id: u64,

    /// Player save data (inventory, position)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player: Option<Player>,
}

impl Default for WorldInfo {
    fn default() -> Self {
        Self {
            default_gm: 0,
            map_type: 0,
            seed: rand::random(),
            time: START_TIME,
            play_time: 0,
            next_entity_id: 0,
            player: None, // Will be populated on first save
        }
    }
}

/// Save summary shown by world pickers, stored in manifest.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub date: String,
    pub time: String,
    pub version: String,
    /// `H:MM:SS`
    pub play_time: String,
}

impl Manifest {
    pub fn now(play_time_secs: i64) -> Self {
        let now = chrono::Local::now();
        Self {
            date: now.format("%Y-%m-%d").to_string(),
            time: now.format("%H:%M:%S").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            play_time: format_play_time(play_time_secs),
        }
    }
}

pub fn format_play_time(secs: i64) -> String {
    let secs = secs.max(0);
    format!("{}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

/// File layout of one save directory
pub struct ChunkPersistence {
    save_dir: PathBuf,
}

impl ChunkPersistence {
    /// Open (and create if needed) the save directory
    pub fn new(save_dir: impl Into<PathBuf>) -> WorldResult<Self> {
        let save_dir = save_dir.into();
        let chunk_dir = save_dir.join(CHUNK_DIR);
        std::fs::create_dir_all(&chunk_dir).map_err(|e| WorldError::io(&chunk_dir, e))?;
        Ok(Self { save_dir })
    }

    pub fn save_dir(&self) -> &Path {
        &self.save_dir
    }

    pub fn chunk_path(&self, coord: IVec2) -> PathBuf {
        self.save_dir
            .join(CHUNK_DIR)
            .join(format!("{}_{}", coord.x, coord.y))
    }

    pub fn has_chunk(&self, coord: IVec2) -> bool {
        self.chunk_path(coord).exists()
    }

    /// Write an encoded chunk
    pub fn write_chunk(&self, coord: IVec2, bytes: &[u8]) -> WorldResult<()> {
        let path = self.chunk_path(coord);
        write_atomic(&path, bytes)?;
        log::debug!(
            "[SAVE] Chunk ({}, {}) saved ({} bytes)",
            coord.x,
            coord.y,
            bytes.len()
        );
        Ok(())
    }

    /// Read an encoded chunk, None when it was never saved
    pub fn read_chunk(&self, coord: IVec2) -> WorldResult<Option<Vec<u8>>> {
        let path = self.chunk_path(coord);
        match std::fs::read(&path) {
            Ok(bytes) => {
                log::debug!("[LOAD] Read {} bytes from {:?}", bytes.len(), path);
                Ok(Some(bytes))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(WorldError::io(path, e)),
        }
    }

    /// Load worldInfo.json. A missing file yields defaults (a new world);
    /// missing fields take their defaults.
    pub fn load_world_info(&self) -> WorldResult<Option<WorldInfo>> {
        let path = self.save_dir.join(WORLD_INFO_FILE);
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("[LOAD] No world info in {:?}, creating new world", self.save_dir);
                return Ok(None);
            }
            Err(e) => return Err(WorldError::io(path, e)),
        };

        let info = serde_json::from_str(&contents).map_err(|source| WorldError::Metadata {
            file: WORLD_INFO_FILE,
            source,
        })?;
        log::info!("[LOAD] Loaded world info from {:?}", path);
        Ok(Some(info))
    }

    pub fn save_world_info(&self, info: &WorldInfo) -> WorldResult<()> {
        let serialized = serde_json::to_vec_pretty(info).map_err(|source| WorldError::Metadata {
            file: WORLD_INFO_FILE,
            source,
        })?;
        write_atomic(&self.save_dir.join(WORLD_INFO_FILE), &serialized)
    }

    pub fn save_manifest(&self, manifest: &Manifest) -> WorldResult<()> {
        let serialized =
            serde_json::to_vec_pretty(manifest).map_err(|source| WorldError::Metadata {
                file: MANIFEST_FILE,
                source,
            })?;
        write_atomic(&self.save_dir.join(MANIFEST_FILE), &serialized)
    }

    pub fn load_manifest(&self) -> WorldResult<Option<Manifest>> {
        let path = self.save_dir.join(MANIFEST_FILE);
        match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)
                .map(Some)
                .map_err(|source| WorldError::Metadata {
                    file: MANIFEST_FILE,
                    source,
                }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(WorldError::io(path, e)),
        }
    }

    /// Delete all chunks and metadata (used by --regenerate)
    pub fn delete_save(save_dir: &Path) -> WorldResult<()> {
        if save_dir.exists() {
            std::fs::remove_dir_all(save_dir).map_err(|e| WorldError::io(save_dir, e))?;
            log::info!("Deleted save: {:?}", save_dir);
        }
        Ok(())
    }
}

/// Atomic write: write to temp file, then rename
fn write_atomic(path: &Path, bytes: &[u8]) -> WorldResult<()> {
    let temp_path = path.with_extension("tmp");
    std::fs::write(&temp_path, bytes).map_err(|e| WorldError::io(&temp_path, e))?;
    std::fs::rename(&temp_path, path).map_err(|e| WorldError::io(path, e))?;
    Ok(())
}
