//! Client and server config rendering
//!
//! Pure functions: nothing here touches disk or validates profile fields.
//! Empty or odd values in the server profile come out verbatim.

use std::net::Ipv4Addr;

use crate::types::{Issuance, KeyPair, ServerProfile};

/// RouterOS interface created on the client side
pub const MIKROTIK_CLIENT_INTERFACE: &str = "WireGuard_Client";

/// Tunables that are not part of the server profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// DNS server pushed to wg-quick clients; `None` omits the line
    pub dns: Option<String>,
    /// PersistentKeepalive in seconds
    pub keepalive: u16,
    /// Prefix length of the client interface address
    pub client_prefix: u8,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            dns: Some("94.140.14.14".to_string()),
            keepalive: 25,
            client_prefix: 24,
        }
    }
}

/// Everything a renderer needs for one committed issuance
#[derive(Debug, Clone, Copy)]
pub struct PeerContext<'a> {
    pub identity: &'a str,
    pub address: Ipv4Addr,
    pub keypair: &'a KeyPair,
    pub profile: &'a ServerProfile,
}

impl<'a> PeerContext<'a> {
    pub fn new(issuance: &'a Issuance, profile: &'a ServerProfile) -> Self {
        Self {
            identity: &issuance.identity,
            address: issuance.address,
            keypair: &issuance.keypair,
            profile,
        }
    }
}

/// All text artifacts for one issuance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedArtifacts {
    /// wg-quick config (Windows, Linux, mobile apps)
    pub windows: String,
    /// RouterOS client script
    pub mikrotik: String,
    /// RouterOS peer line for the server
    pub server_peer: String,
}

impl RenderedArtifacts {
    pub fn render(ctx: &PeerContext<'_>, options: &RenderOptions) -> Self {
        Self {
            windows: windows_config(ctx, options),
            mikrotik: mikrotik_config(ctx, options),
            server_peer: server_peer_fragment(ctx),
        }
    }
}

/// wg-quick style client config
pub fn windows_config(ctx: &PeerContext<'_>, options: &RenderOptions) -> String {
    let dns_line = options
        .dns
        .as_ref()
        .map(|dns| format!("DNS = {}\n", dns))
        .unwrap_or_default();

    format!(
r#"[Interface]
PrivateKey = {private_key}
Address = {address}/{prefix}
{dns_line}
[Peer]
PublicKey = {server_pubkey}
Endpoint = {endpoint}
AllowedIPs = 0.0.0.0/0, ::/0
PersistentKeepalive = {keepalive}
"#,
        private_key = ctx.keypair.private_key,
        address = ctx.address,
        prefix = options.client_prefix,
        dns_line = dns_line,
        server_pubkey = ctx.profile.public_key,
        endpoint = ctx.profile.endpoint(),
        keepalive = options.keepalive,
    )
}

/// RouterOS script setting up a client router
pub fn mikrotik_config(ctx: &PeerContext<'_>, options: &RenderOptions) -> String {
    format!(
r#"# Create WireGuard interface
/interface wireguard add name={iface} private-key={private_key}

# Assign IP to the WireGuard interface
/ip address add address={address}/{prefix} interface={iface}

# Add server peer
/interface wireguard peers add interface={iface} public-key={server_pubkey} endpoint={endpoint} allowed-address=0.0.0.0/0 persistent-keepalive={keepalive}

# Set default route through WireGuard tunnel
/ip route add dst-address=0.0.0.0/0 gateway={iface}
"#,
        iface = MIKROTIK_CLIENT_INTERFACE,
        private_key = ctx.keypair.private_key,
        address = ctx.address,
        prefix = options.client_prefix,
        server_pubkey = ctx.profile.public_key,
        endpoint = ctx.profile.endpoint(),
        keepalive = options.keepalive,
    )
}

/// RouterOS peer entry to append to the server's peer script
pub fn server_peer_fragment(ctx: &PeerContext<'_>) -> String {
    format!(
r#"# Add new peer to WireGuard server
/interface wireguard peers add name="{identity}" interface="{server}" public-key="{pubkey}" allowed-address="{address}/32"
"#,
        identity = ctx.identity,
        server = ctx.profile.name,
        pubkey = ctx.keypair.public_key,
        address = ctx.address,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> ServerProfile {
        ServerProfile {
            name: "wg-server".into(),
            endpoint_host: "203.0.113.7".into(),
            port: 51820,
            public_key: "SERVERPUBKEY=".into(),
            private_key: "SERVERPRIVKEY=".into(),
            subnet_cidr: "192.168.100.0/24".into(),
        }
    }

    fn keypair() -> KeyPair {
        KeyPair {
            private_key: "CLIENTPRIVKEY=".into(),
            public_key: "CLIENTPUBKEY=".into(),
        }
    }

    fn ctx<'a>(kp: &'a KeyPair, profile: &'a ServerProfile) -> PeerContext<'a> {
        PeerContext {
            identity: "alice",
            address: Ipv4Addr::new(192, 168, 100, 2),
            keypair: kp,
            profile,
        }
    }

    #[test]
    fn test_windows_config_exact() {
        let (kp, p) = (keypair(), profile());
        let expected = "[Interface]
PrivateKey = CLIENTPRIVKEY=
Address = 192.168.100.2/24
DNS = 94.140.14.14

[Peer]
PublicKey = SERVERPUBKEY=
Endpoint = 203.0.113.7:51820
AllowedIPs = 0.0.0.0/0, ::/0
PersistentKeepalive = 25
";
        assert_eq!(windows_config(&ctx(&kp, &p), &RenderOptions::default()), expected);
    }

    #[test]
    fn test_mikrotik_config_exact() {
        let (kp, p) = (keypair(), profile());
        let expected = "# Create WireGuard interface
/interface wireguard add name=WireGuard_Client private-key=CLIENTPRIVKEY=

# Assign IP to the WireGuard interface
/ip address add address=192.168.100.2/24 interface=WireGuard_Client

# Add server peer
/interface wireguard peers add interface=WireGuard_Client public-key=SERVERPUBKEY= endpoint=203.0.113.7:51820 allowed-address=0.0.0.0/0 persistent-keepalive=25

# Set default route through WireGuard tunnel
/ip route add dst-address=0.0.0.0/0 gateway=WireGuard_Client
";
        assert_eq!(mikrotik_config(&ctx(&kp, &p), &RenderOptions::default()), expected);
    }

    #[test]
    fn test_server_peer_fragment_exact() {
        let (kp, p) = (keypair(), profile());
        let expected = "# Add new peer to WireGuard server
/interface wireguard peers add name=\"alice\" interface=\"wg-server\" public-key=\"CLIENTPUBKEY=\" allowed-address=\"192.168.100.2/32\"
";
        assert_eq!(server_peer_fragment(&ctx(&kp, &p)), expected);
    }

    #[test]
    fn test_options_change_output() {
        let (kp, p) = (keypair(), profile());
        let options = RenderOptions {
            dns: None,
            keepalive: 15,
            client_prefix: 32,
        };
        let text = windows_config(&ctx(&kp, &p), &options);
        assert!(!text.contains("DNS"));
        assert!(text.contains("Address = 192.168.100.2/32\n\n[Peer]\n"));
        assert!(text.contains("PersistentKeepalive = 15\n"));
    }

    #[test]
    fn test_empty_profile_fields_pass_through() {
        let kp = keypair();
        let p = ServerProfile {
            public_key: String::new(),
            ..profile()
        };
        let text = windows_config(&ctx(&kp, &p), &RenderOptions::default());
        assert!(text.contains("PublicKey = \n"));
    }

    #[test]
    fn test_render_bundle() {
        let (kp, p) = (keypair(), profile());
        let bundle = RenderedArtifacts::render(&ctx(&kp, &p), &RenderOptions::default());
        assert!(bundle.windows.starts_with("[Interface]"));
        assert!(bundle.mikrotik.contains("WireGuard_Client"));
        assert!(bundle.server_peer.contains("name=\"alice\""));
    }
}
