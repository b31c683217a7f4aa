//! Interactive prompts for server setup and identities

use dialoguer::{Input, Password};
use wgprov_common::{Error, ProfileSource, Result, ServerProfile, Subnet};

/// Server profile fields supplied up front; missing ones are prompted for
#[derive(Debug, Clone, Default)]
pub struct ProfilePreset {
    pub name: Option<String>,
    pub endpoint_host: Option<String>,
    pub port: Option<u16>,
    pub public_key: Option<String>,
    pub private_key: Option<String>,
    pub subnet_cidr: Option<String>,
}

/// Builds a server profile from presets and terminal prompts
#[derive(Debug, Clone, Default)]
pub struct PromptProfileSource {
    preset: ProfilePreset,
}

impl PromptProfileSource {
    pub fn new(preset: ProfilePreset) -> Self {
        Self { preset }
    }
}

impl ProfileSource for PromptProfileSource {
    fn obtain(&self) -> Result<ServerProfile> {
        let p = &self.preset;
        let name = preset_or_prompt(&p.name, "Enter WireGuard Server Name")?;
        let endpoint_host = preset_or_prompt(&p.endpoint_host, "Enter WireGuard Server Public IP")?;
        let port = match p.port {
            Some(port) => port,
            None => Input::<u16>::new()
                .with_prompt("Enter WireGuard Port")
                .default(51820)
                .interact_text()
                .map_err(prompt_error)?,
        };
        let public_key = preset_or_prompt(&p.public_key, "Enter WireGuard Server Public Key")?;
        let private_key = match &p.private_key {
            Some(key) => key.clone(),
            None => Password::new()
                .with_prompt("Enter WireGuard Server Private Key")
                .allow_empty_password(true)
                .interact()
                .map_err(prompt_error)?,
        };
        let subnet_cidr = match &p.subnet_cidr {
            Some(cidr) => cidr.clone(),
            None => Input::<String>::new()
                .with_prompt("Enter WireGuard Subnet (e.g., 192.168.100.0/24)")
                .validate_with(|s: &String| Subnet::parse(s).map(|_| ()).map_err(|e| e.to_string()))
                .interact_text()
                .map_err(prompt_error)?,
        };

        Ok(ServerProfile {
            name,
            endpoint_host,
            port,
            public_key,
            private_key,
            subnet_cidr,
        })
    }
}

fn preset_or_prompt(preset: &Option<String>, prompt: &str) -> Result<String> {
    match preset {
        Some(value) => Ok(value.clone()),
        None => Input::<String>::new()
            .with_prompt(prompt)
            .interact_text()
            .map_err(prompt_error),
    }
}

/// Ask for the identity of the client being issued
pub fn prompt_identity() -> Result<String> {
    Input::<String>::new()
        .with_prompt("Enter the username for this WireGuard config")
        .interact_text()
        .map_err(prompt_error)
}

fn prompt_error(e: dialoguer::Error) -> Error {
    Error::Io(std::io::Error::new(std::io::ErrorKind::Other, e))
}
