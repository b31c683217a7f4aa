//! CLI Commands

pub mod issue;
pub mod list;
pub mod setup;

use anyhow::{Context as _, Result};
use std::path::PathBuf;
use wgprov_common::{
    DirectorySink, Error, JsonProfileStore, JsonRegistryStore, Registry, RegistryStore,
    ServerProfile, Subnet, WgToolKeyGenerator,
};

use crate::config::Settings;
use crate::output::OutputFormat;

/// Resolved data directory, settings and output format for one run
#[derive(Debug, Clone)]
pub struct Context {
    pub data_dir: PathBuf,
    pub settings: Settings,
    pub settings_path: PathBuf,
    pub format: OutputFormat,
}

impl Context {
    pub fn registry_store(&self) -> JsonRegistryStore {
        JsonRegistryStore::in_dir(&self.data_dir)
    }

    pub fn profile_store(&self) -> JsonProfileStore {
        JsonProfileStore::in_dir(&self.data_dir)
    }

    pub fn keygen(&self) -> WgToolKeyGenerator {
        WgToolKeyGenerator::new(&self.settings.wg_binary, self.settings.keygen_timeout())
    }

    pub fn sink(&self, qr_png: bool) -> DirectorySink {
        DirectorySink::new(&self.data_dir).with_qr_png(qr_png)
    }

    pub fn ensure_data_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", self.data_dir))
    }
}

/// Load the registry and check it against the profile's subnet
pub fn load_registry(store: &JsonRegistryStore, profile: &ServerProfile) -> Result<Registry> {
    let registry = store.load()?;
    let subnet = Subnet::parse(&profile.subnet_cidr)?;
    registry.verify(&subnet).map_err(|reason| Error::CorruptState {
        path: store.path().to_path_buf(),
        reason,
    })?;
    Ok(registry)
}
