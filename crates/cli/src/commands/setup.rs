//! Server Profile Commands

use anyhow::{bail, Result};
use clap::Args;
use serde::Serialize;
use wgprov_common::{ProfileSource, ProfileStore, ServerProfile, Subnet};

use super::Context;
use crate::output::{print_info, print_item, print_success, TableDisplay};
use crate::prompt::{ProfilePreset, PromptProfileSource};

#[derive(Args)]
pub struct SetupArgs {
    /// Overwrite an existing server profile
    #[arg(long)]
    pub force: bool,

    /// Server interface name
    #[arg(long)]
    pub name: Option<String>,

    /// Public IP or hostname clients connect to
    #[arg(long)]
    pub host: Option<String>,

    /// Listen port
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    pub port: Option<u16>,

    /// Server public key
    #[arg(long)]
    pub public_key: Option<String>,

    /// Server private key
    #[arg(long, env = "WGPROV_SERVER_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: Option<String>,

    /// VPN subnet (e.g., 192.168.100.0/24)
    #[arg(long)]
    pub subnet: Option<String>,
}

/// Profile display wrapper; never carries the private key in clear
#[derive(Serialize)]
pub struct ProfileDisplay {
    pub name: String,
    pub endpoint: String,
    pub public_key: String,
    pub private_key: String,
    pub subnet: String,
}

impl From<&ServerProfile> for ProfileDisplay {
    fn from(profile: &ServerProfile) -> Self {
        let shown = profile.redacted();
        Self {
            name: shown.name.clone(),
            endpoint: shown.endpoint(),
            public_key: shown.public_key,
            private_key: shown.private_key,
            subnet: shown.subnet_cidr,
        }
    }
}

impl TableDisplay for ProfileDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Name", "Endpoint", "Public Key", "Private Key", "Subnet"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.endpoint.clone(),
            self.public_key.clone(),
            self.private_key.clone(),
            self.subnet.clone(),
        ]
    }
}

pub fn execute(args: SetupArgs, ctx: &Context) -> Result<()> {
    ctx.ensure_data_dir()?;
    let store = ctx.profile_store();

    if store.load()?.is_some() && !args.force {
        bail!(
            "Server profile already exists at {:?}; use --force to replace it",
            store.path()
        );
    }

    if let Some(subnet) = &args.subnet {
        Subnet::parse(subnet)?;
    }

    let source = PromptProfileSource::new(ProfilePreset {
        name: args.name,
        endpoint_host: args.host,
        port: args.port,
        public_key: args.public_key,
        private_key: args.private_key,
        subnet_cidr: args.subnet,
    });
    let profile = source.obtain()?;
    store.save(&profile)?;
    print_success(&format!("Saved server profile '{}'", profile.name));

    if !ctx.settings_path.exists() {
        ctx.settings.save(&ctx.settings_path)?;
        print_info(&format!("Wrote default settings to {}", ctx.settings_path.display()));
    }

    Ok(())
}

pub fn show(ctx: &Context) -> Result<()> {
    let store = ctx.profile_store();
    match store.load()? {
        Some(profile) => print_item(&ProfileDisplay::from(&profile), ctx.format),
        None => bail!("No server profile found; run `wgprov setup` first"),
    }
    Ok(())
}
