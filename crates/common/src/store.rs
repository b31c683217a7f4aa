//! Persistence for the registry and the server profile
//!
//! Both live as pretty-printed JSON files in the data directory. Saves go
//! through a temp file in the same directory that is synced and then
//! renamed over the target, so the previous state survives a failed write.

use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::types::{Registry, ServerProfile};
use crate::{Error, Result};

/// Registry file name inside the data directory
pub const REGISTRY_FILE: &str = "wg_userdb_ips.json";
/// Server profile file name inside the data directory
pub const PROFILE_FILE: &str = "wg_server_config.json";

/// Storage for issued identities
pub trait RegistryStore: Send + Sync {
    /// Load the registry; an absent store yields an empty registry
    fn load(&self) -> Result<Registry>;

    /// Replace the persisted registry
    fn save(&self, registry: &Registry) -> Result<()>;
}

/// Storage for the server profile
pub trait ProfileStore: Send + Sync {
    fn load(&self) -> Result<Option<ServerProfile>>;

    fn save(&self, profile: &ServerProfile) -> Result<()>;
}

/// Interactive source of a fresh server profile
pub trait ProfileSource {
    fn obtain(&self) -> Result<ServerProfile>;
}

/// Return the stored profile, or obtain one from `source` and persist it
pub fn load_or_setup(store: &dyn ProfileStore, source: &dyn ProfileSource) -> Result<ServerProfile> {
    if let Some(profile) = store.load()? {
        return Ok(profile);
    }
    info!("No server profile found, running setup");
    let profile = source.obtain()?;
    store.save(&profile)?;
    Ok(profile)
}

// ============================================================================
// JSON file stores
// ============================================================================

/// Registry persisted as a flat JSON object
#[derive(Debug, Clone)]
pub struct JsonRegistryStore {
    path: PathBuf,
}

impl JsonRegistryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the default location inside `data_dir`
    pub fn in_dir(data_dir: impl AsRef<Path>) -> Self {
        Self::new(data_dir.as_ref().join(REGISTRY_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RegistryStore for JsonRegistryStore {
    fn load(&self) -> Result<Registry> {
        Ok(read_json(&self.path)?.unwrap_or_default())
    }

    fn save(&self, registry: &Registry) -> Result<()> {
        write_json_atomic(&self.path, registry)?;
        debug!("Saved registry ({} entries) to {:?}", registry.len(), self.path);
        Ok(())
    }
}

/// Server profile persisted as a JSON object
#[derive(Debug, Clone)]
pub struct JsonProfileStore {
    path: PathBuf,
}

impl JsonProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(data_dir: impl AsRef<Path>) -> Self {
        Self::new(data_dir.as_ref().join(PROFILE_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProfileStore for JsonProfileStore {
    fn load(&self) -> Result<Option<ServerProfile>> {
        read_json(&self.path)
    }

    fn save(&self, profile: &ServerProfile) -> Result<()> {
        write_json_atomic(&self.path, profile)?;
        info!("Saved server profile '{}' to {:?}", profile.name, self.path);
        Ok(())
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| Error::corrupt(path, e))
}

/// Write `value` as pretty JSON, replacing `path` only once the new content
/// is fully on disk.
pub(crate) fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut content = serde_json::to_string_pretty(value)
        .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
    content.push('\n');

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

// ============================================================================
// In-memory stores
// ============================================================================

/// Registry held in memory
#[derive(Debug, Default)]
pub struct MemoryRegistryStore {
    registry: Mutex<Registry>,
    saves: Mutex<usize>,
    fail_saves: bool,
}

impl MemoryRegistryStore {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry: Mutex::new(registry),
            ..Default::default()
        }
    }

    /// Store whose saves always fail with an IO error
    pub fn failing(registry: Registry) -> Self {
        Self {
            fail_saves: true,
            ..Self::new(registry)
        }
    }

    /// Currently persisted registry
    pub fn snapshot(&self) -> Registry {
        self.registry.lock().clone()
    }

    /// Number of successful saves
    pub fn save_count(&self) -> usize {
        *self.saves.lock()
    }
}

impl RegistryStore for MemoryRegistryStore {
    fn load(&self) -> Result<Registry> {
        Ok(self.snapshot())
    }

    fn save(&self, registry: &Registry) -> Result<()> {
        if self.fail_saves {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "registry save refused",
            )));
        }
        *self.registry.lock() = registry.clone();
        *self.saves.lock() += 1;
        Ok(())
    }
}

/// Server profile held in memory
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    profile: Mutex<Option<ServerProfile>>,
}

impl MemoryProfileStore {
    pub fn new(profile: Option<ServerProfile>) -> Self {
        Self {
            profile: Mutex::new(profile),
        }
    }
}

impl ProfileStore for MemoryProfileStore {
    fn load(&self) -> Result<Option<ServerProfile>> {
        Ok(self.profile.lock().clone())
    }

    fn save(&self, profile: &ServerProfile) -> Result<()> {
        *self.profile.lock() = Some(profile.clone());
        Ok(())
    }
}
