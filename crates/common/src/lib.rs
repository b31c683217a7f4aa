//! wgprov Common Library
//!
//! Core of the WireGuard client provisioner: the identity registry, address
//! allocation, key generation, config rendering and the issuance flow that
//! ties them together.

pub mod allocator;
pub mod artifacts;
pub mod error;
pub mod identity;
pub mod issuer;
pub mod keygen;
pub mod render;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use allocator::{next_available, next_available_cidr, Subnet};
pub use artifacts::{ArtifactSink, DirectorySink, MemorySink, WrittenArtifacts};
pub use error::{Error, Result};
pub use identity::{validate_identity, IdentityError};
pub use issuer::{preview_next, IssueReport, Issuer};
pub use keygen::{KeyGenerator, StaticKeyGenerator, WgToolKeyGenerator};
pub use render::{PeerContext, RenderOptions, RenderedArtifacts};
pub use store::{
    load_or_setup, JsonProfileStore, JsonRegistryStore, MemoryProfileStore, MemoryRegistryStore,
    ProfileSource, ProfileStore, RegistryStore,
};
pub use types::*;

/// Default data directory, relative to the working directory
pub fn default_data_dir() -> std::path::PathBuf {
    std::path::PathBuf::from("wg_creator_data")
}
