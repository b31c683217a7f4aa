//! Registry Commands

use anyhow::{Context as _, Result};
use serde::Serialize;
use std::net::Ipv4Addr;
use wgprov_common::{preview_next, ProfileStore, Registry, RegistryStore};

use super::{load_registry, Context};
use crate::output::{print_item, print_list, TableDisplay};

/// Registry entry display wrapper
#[derive(Serialize)]
pub struct ClientDisplay {
    pub identity: String,
    pub address: Ipv4Addr,
}

impl TableDisplay for ClientDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Identity", "Address"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.identity.clone(), self.address.to_string()]
    }
}

/// Clients ordered by address
fn clients(registry: &Registry) -> Vec<ClientDisplay> {
    let mut clients: Vec<ClientDisplay> = registry
        .iter()
        .map(|(identity, address)| ClientDisplay {
            identity: identity.to_string(),
            address,
        })
        .collect();
    clients.sort_by_key(|c| c.address);
    clients
}

pub fn execute(ctx: &Context) -> Result<()> {
    let registry = ctx.registry_store().load()?;
    print_list(&clients(&registry), ctx.format);
    Ok(())
}

/// Next address display wrapper
#[derive(Serialize)]
pub struct NextDisplay {
    pub subnet: String,
    pub next_address: Ipv4Addr,
    pub allocated: usize,
}

impl TableDisplay for NextDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Subnet", "Next Address", "Allocated"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.subnet.clone(),
            self.next_address.to_string(),
            self.allocated.to_string(),
        ]
    }
}

pub fn next(ctx: &Context) -> Result<()> {
    let profile = ctx
        .profile_store()
        .load()?
        .context("No server profile found; run `wgprov setup` first")?;
    let registry = load_registry(&ctx.registry_store(), &profile)?;
    let next_address = preview_next(&profile, &registry)?;

    print_item(
        &NextDisplay {
            subnet: profile.subnet_cidr.clone(),
            next_address,
            allocated: registry.len(),
        },
        ctx.format,
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clients_sorted_by_address() {
        let mut registry = Registry::new();
        registry.insert("alice", Ipv4Addr::new(10, 0, 0, 10)).unwrap();
        registry.insert("bob", Ipv4Addr::new(10, 0, 0, 2)).unwrap();
        registry.insert("carol", Ipv4Addr::new(10, 0, 0, 3)).unwrap();

        let names: Vec<_> = clients(&registry).into_iter().map(|c| c.identity).collect();
        assert_eq!(names, ["bob", "carol", "alice"]);
    }
}
