//! Issuance of a new client
//!
//! Order matters here. Everything that can fail without side effects runs
//! first (identity checks, key generation, allocation). The registry is then
//! saved, and only after that are artifacts written. A crash before the save
//! leaves nothing behind; a crash after it leaves the address reserved, so
//! it can never be handed to a second client.

use tracing::{debug, info, warn};

use crate::allocator::{next_available, Subnet};
use crate::artifacts::{ArtifactSink, WrittenArtifacts};
use crate::identity::validate_identity;
use crate::keygen::KeyGenerator;
use crate::render::{PeerContext, RenderOptions, RenderedArtifacts};
use crate::store::RegistryStore;
use crate::types::{Issuance, Registry, ServerProfile};
use crate::{Error, Result};

/// Result of a successful issuance
#[derive(Debug, Clone)]
pub struct IssueReport {
    pub issuance: Issuance,
    pub rendered: RenderedArtifacts,
    pub written: WrittenArtifacts,
}

/// Runs issuances against a registry store, key generator and artifact sink
pub struct Issuer<'a> {
    registry_store: &'a dyn RegistryStore,
    keygen: &'a dyn KeyGenerator,
    sink: &'a dyn ArtifactSink,
    options: RenderOptions,
}

impl<'a> Issuer<'a> {
    pub fn new(
        registry_store: &'a dyn RegistryStore,
        keygen: &'a dyn KeyGenerator,
        sink: &'a dyn ArtifactSink,
    ) -> Self {
        Self {
            registry_store,
            keygen,
            sink,
            options: RenderOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    /// Issue a config for `identity`.
    ///
    /// `registry` is the registry loaded at the start of the run. It is only
    /// modified once the new entry has been persisted.
    pub async fn issue(
        &self,
        identity: &str,
        profile: &ServerProfile,
        registry: &mut Registry,
    ) -> Result<IssueReport> {
        // Checked before validation: older registries may hold keys that
        // would no longer pass it, and they still own their address.
        if let Some((existing, address)) = registry.find(identity) {
            return Err(Error::DuplicateIdentity {
                identity: existing.to_string(),
                address,
            });
        }

        let identity = validate_identity(identity)?;

        debug!("Generating client keys for {}", identity);
        let keypair = self.keygen.generate().await?;

        let subnet = Subnet::parse(&profile.subnet_cidr)?;
        let address = next_available(registry, &subnet)?;

        let mut updated = registry.clone();
        updated.insert(&identity, address)?;
        self.registry_store.save(&updated)?;
        *registry = updated;
        info!("Allocated {} to {}", address, identity);

        let issuance = Issuance {
            identity,
            address,
            keypair,
        };
        let rendered = RenderedArtifacts::render(&PeerContext::new(&issuance, profile), &self.options);

        let written = match self.sink.write(&issuance.identity, &rendered) {
            Ok(written) => written,
            Err(source) => {
                warn!(
                    "Artifacts for {} failed after allocation of {}: {}",
                    issuance.identity, address, source
                );
                return Err(Error::ArtifactWrite {
                    identity: issuance.identity,
                    address,
                    source,
                });
            }
        };

        Ok(IssueReport {
            issuance,
            rendered,
            written,
        })
    }
}

/// Address the next issuance would receive, without changing anything
pub fn preview_next(profile: &ServerProfile, registry: &Registry) -> Result<std::net::Ipv4Addr> {
    let subnet = Subnet::parse(&profile.subnet_cidr)?;
    next_available(registry, &subnet)
}
