//! Error types for wgprov

use std::net::Ipv4Addr;
use std::path::PathBuf;
use thiserror::Error;

use crate::identity::IdentityError;

/// Result type alias using wgprov Error
pub type Result<T> = std::result::Result<T, Error>;

/// wgprov error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Identity '{identity}' already exists with IP {address}")]
    DuplicateIdentity { identity: String, address: Ipv4Addr },

    #[error("No more available IPs in subnet {subnet}")]
    SubnetExhausted { subnet: String },

    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    #[error("Corrupt state in {path:?}: {reason}")]
    CorruptState { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(
        "Failed to write artifacts for '{identity}' ({address} stays reserved): {source}"
    )]
    ArtifactWrite {
        identity: String,
        address: Ipv4Addr,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid identity: {0}")]
    InvalidIdentity(#[from] IdentityError),

    #[error("Invalid subnet: {0}")]
    InvalidSubnet(String),
}

impl Error {
    /// Stable machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Error::DuplicateIdentity { .. } => "duplicate_identity",
            Error::SubnetExhausted { .. } => "subnet_exhausted",
            Error::KeyGeneration(_) => "key_generation",
            Error::CorruptState { .. } => "corrupt_state",
            Error::Io(_) => "io",
            Error::ArtifactWrite { .. } => "artifact_write",
            Error::InvalidIdentity(_) => "invalid_identity",
            Error::InvalidSubnet(_) => "invalid_subnet",
        }
    }

    /// Whether the registry was committed before this error occurred
    pub fn allocation_committed(&self) -> bool {
        matches!(self, Error::ArtifactWrite { .. })
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::CorruptState {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
