//! Address allocation inside the VPN subnet
//!
//! Allocation works on the final octet only: hosts .2 through .254 of the
//! /24 holding the subnet address. .0, .1 (server) and .255 are never
//! handed out. Prefixes longer than /24 are rejected since part of that
//! range would fall outside the subnet; shorter prefixes are accepted and
//! still allocate from the single /24.

use ipnetwork::Ipv4Network;
use std::net::Ipv4Addr;
use tracing::{debug, warn};

use crate::types::Registry;
use crate::{Error, Result};

/// First allocatable host octet
pub const FIRST_HOST: u8 = 2;
/// Last allocatable host octet
pub const LAST_HOST: u8 = 254;

/// Parsed VPN subnet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subnet {
    network: Ipv4Network,
    base: [u8; 3],
}

impl Subnet {
    /// Parse a CIDR such as `192.168.100.0/24`
    pub fn parse(cidr: &str) -> Result<Self> {
        let network: Ipv4Network = cidr
            .trim()
            .parse()
            .map_err(|e| Error::InvalidSubnet(format!("'{}': {}", cidr, e)))?;

        if network.prefix() > 24 {
            return Err(Error::InvalidSubnet(format!(
                "'{}': prefix /{} is narrower than /24",
                cidr,
                network.prefix()
            )));
        }
        if network.prefix() < 24 {
            warn!(
                "Subnet {} is wider than /24; allocating from {}.0/24 only",
                cidr,
                dotted(base_octets(network.ip()))
            );
        }

        Ok(Self {
            network,
            base: base_octets(network.ip()),
        })
    }

    /// First three octets shared by every allocated address
    pub fn base(&self) -> [u8; 3] {
        self.base
    }

    /// Address with the given host octet
    pub fn host(&self, last: u8) -> Ipv4Addr {
        let [a, b, c] = self.base;
        Ipv4Addr::new(a, b, c, last)
    }

    /// Whether `addr` is one the allocator could hand out
    pub fn is_allocatable(&self, addr: Ipv4Addr) -> bool {
        let [a, b, c, last] = addr.octets();
        [a, b, c] == self.base && (FIRST_HOST..=LAST_HOST).contains(&last)
    }

    /// Candidate addresses in ascending order
    pub fn candidates(&self) -> impl Iterator<Item = Ipv4Addr> + '_ {
        (FIRST_HOST..=LAST_HOST).map(move |last| self.host(last))
    }

    /// Number of allocatable addresses
    pub fn capacity(&self) -> usize {
        usize::from(LAST_HOST - FIRST_HOST) + 1
    }
}

impl std::fmt::Display for Subnet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.network)
    }
}

fn base_octets(ip: Ipv4Addr) -> [u8; 3] {
    let [a, b, c, _] = ip.octets();
    [a, b, c]
}

fn dotted([a, b, c]: [u8; 3]) -> String {
    format!("{}.{}.{}", a, b, c)
}

/// Lowest free address in the subnet.
///
/// Pure: the registry is only read, so repeated calls with the same inputs
/// return the same address.
pub fn next_available(registry: &Registry, subnet: &Subnet) -> Result<Ipv4Addr> {
    let used = registry.allocated();
    match subnet.candidates().find(|candidate| !used.contains(candidate)) {
        Some(addr) => {
            debug!("Next free address in {} is {}", subnet, addr);
            Ok(addr)
        }
        None => Err(Error::SubnetExhausted {
            subnet: subnet.to_string(),
        }),
    }
}

/// [`next_available`] taking the subnet as a CIDR string
pub fn next_available_cidr(registry: &Registry, subnet_cidr: &str) -> Result<Ipv4Addr> {
    let subnet = Subnet::parse(subnet_cidr)?;
    next_available(registry, &subnet)
}
