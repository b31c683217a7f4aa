//! Core types for wgprov

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::net::Ipv4Addr;

use crate::allocator::Subnet;
use crate::{Error, Result};

/// Static server-side parameters used to render peer configs.
///
/// Field contents are trusted: apart from the port, nothing here is
/// validated, and empty keys flow straight into rendered configs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerProfile {
    /// Server interface name, used as the RouterOS interface in peer fragments
    #[serde(rename = "server_name")]
    pub name: String,

    /// Public host (IP or DNS name) clients connect to
    #[serde(rename = "server_ip")]
    pub endpoint_host: String,

    #[serde(rename = "server_port", deserialize_with = "port_from_number_or_string")]
    pub port: u16,

    #[serde(rename = "server_public_key")]
    pub public_key: String,

    #[serde(rename = "server_private_key")]
    pub private_key: String,

    /// VPN subnet in CIDR notation, e.g. 192.168.100.0/24
    #[serde(rename = "subnet")]
    pub subnet_cidr: String,
}

impl ServerProfile {
    /// `host:port` endpoint as written into client configs
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.endpoint_host, self.port)
    }

    /// Copy with the private key masked, for display
    pub fn redacted(&self) -> Self {
        Self {
            private_key: redact(&self.private_key),
            ..self.clone()
        }
    }
}

fn redact(secret: &str) -> String {
    if secret.is_empty() {
        String::new()
    } else {
        "********".to_string()
    }
}

/// Ports were historically stored as the raw prompt string, so accept both
/// `51820` and `"51820"`.
fn port_from_number_or_string<'de, D>(deserializer: D) -> std::result::Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawPort {
        Number(u64),
        Text(String),
    }

    let value = match RawPort::deserialize(deserializer)? {
        RawPort::Number(n) => n,
        RawPort::Text(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| serde::de::Error::custom(format!("invalid port '{}'", s)))?,
    };

    match u16::try_from(value) {
        Ok(port) if port != 0 => Ok(port),
        _ => Err(serde::de::Error::custom(format!(
            "port {} out of range 1-65535",
            value
        ))),
    }
}

/// Persistent record of identity -> allocated address
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Registry {
    entries: BTreeMap<String, Ipv4Addr>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Existing entry for `identity`, ignoring surrounding whitespace and case.
    ///
    /// Keys written by older tools are not normalized, so an exact key match
    /// is not enough to detect a duplicate.
    pub fn find(&self, identity: &str) -> Option<(&str, Ipv4Addr)> {
        let wanted = identity.trim().to_lowercase();
        self.iter()
            .find(|(key, _)| key.trim().to_lowercase() == wanted)
    }

    pub fn get(&self, identity: &str) -> Option<Ipv4Addr> {
        self.entries.get(identity).copied()
    }

    /// Record a new allocation. Existing identities are never overwritten.
    pub fn insert(&mut self, identity: &str, address: Ipv4Addr) -> Result<()> {
        if let Some((existing, address)) = self.find(identity) {
            return Err(Error::DuplicateIdentity {
                identity: existing.to_string(),
                address,
            });
        }
        self.entries.insert(identity.to_string(), address);
        Ok(())
    }

    /// Set of all allocated addresses
    pub fn allocated(&self) -> HashSet<Ipv4Addr> {
        self.entries.values().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Ipv4Addr)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Check that every address is unique and inside the allocation range.
    ///
    /// Returns the offending detail as a message; callers wrap it into
    /// `CorruptState` with the path they loaded from.
    pub fn verify(&self, subnet: &Subnet) -> std::result::Result<(), String> {
        let mut seen: BTreeMap<Ipv4Addr, &str> = BTreeMap::new();
        for (identity, address) in self.iter() {
            if !subnet.is_allocatable(address) {
                return Err(format!(
                    "address {} of '{}' is outside {}",
                    address, identity, subnet
                ));
            }
            if let Some(other) = seen.insert(address, identity) {
                return Err(format!(
                    "address {} is assigned to both '{}' and '{}'",
                    address, other, identity
                ));
            }
        }
        Ok(())
    }
}

impl FromIterator<(String, Ipv4Addr)> for Registry {
    fn from_iter<I: IntoIterator<Item = (String, Ipv4Addr)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// WireGuard key pair (base64)
#[derive(Clone, PartialEq, Eq)]
pub struct KeyPair {
    pub private_key: String,
    pub public_key: String,
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

/// A single issuance in flight; only its effects are persisted
#[derive(Debug, Clone)]
pub struct Issuance {
    pub identity: String,
    pub address: Ipv4Addr,
    pub keypair: KeyPair,
}
