//! End-to-end tests for the wgprov binary

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

const PROFILE: &str = r#"{
    "server_name": "wg-server",
    "server_ip": "203.0.113.7",
    "server_port": "51820",
    "server_public_key": "SERVERPUBKEY=",
    "server_private_key": "SERVERPRIVKEY=",
    "subnet": "192.168.100.0/24"
}"#;

fn wgprov(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("wgprov").unwrap();
    for var in [
        "WGPROV_DATA_DIR",
        "WGPROV_CONFIG",
        "WGPROV_WG_BINARY",
        "WGPROV_KEYGEN_TIMEOUT",
        "WGPROV_SERVER_PRIVATE_KEY",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd.arg("--data-dir").arg(dir);
    cmd
}

fn seed(dir: &Path, registry: Option<&str>) {
    std::fs::write(dir.join("wg_server_config.json"), PROFILE).unwrap();
    if let Some(registry) = registry {
        std::fs::write(dir.join("wg_userdb_ips.json"), registry).unwrap();
    }
}

fn read_registry(dir: &Path) -> serde_json::Value {
    let content = std::fs::read_to_string(dir.join("wg_userdb_ips.json")).unwrap();
    serde_json::from_str(&content).unwrap()
}

#[test]
fn list_empty_registry() {
    let tmp = TempDir::new().unwrap();
    wgprov(tmp.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No items found."));
}

#[test]
fn list_json() {
    let tmp = TempDir::new().unwrap();
    seed(tmp.path(), Some(r#"{"bob": "192.168.100.3", "alice": "192.168.100.2"}"#));
    let output = wgprov(tmp.path())
        .args(["--format", "json", "list"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json[0]["identity"], "alice");
    assert_eq!(json[1]["address"], "192.168.100.3");
}

#[test]
fn duplicate_identity_rejected_without_changes() {
    let tmp = TempDir::new().unwrap();
    let registry = "{\n    \"alice\": \"192.168.100.2\"\n}";
    seed(tmp.path(), Some(registry));

    wgprov(tmp.path())
        .args(["--wg-binary", "/nonexistent/wg", "issue", "alice"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists with IP 192.168.100.2"));

    let after = std::fs::read_to_string(tmp.path().join("wg_userdb_ips.json")).unwrap();
    assert_eq!(after, registry);
}

#[test]
fn mixed_case_registry_key_rejected() {
    let tmp = TempDir::new().unwrap();
    let registry = r#"{"Alice": "192.168.100.2"}"#;
    seed(tmp.path(), Some(registry));

    wgprov(tmp.path())
        .args(["--wg-binary", "/nonexistent/wg", "issue", "alice"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Identity 'Alice' already exists with IP 192.168.100.2"));

    let after = std::fs::read_to_string(tmp.path().join("wg_userdb_ips.json")).unwrap();
    assert_eq!(after, registry);
}

#[test]
fn json_errors_carry_kind() {
    let tmp = TempDir::new().unwrap();
    seed(tmp.path(), Some(r#"{"alice": "192.168.100.2"}"#));

    let output = wgprov(tmp.path())
        .args(["--format", "json", "issue", "alice"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["error"], "duplicate_identity");
}

#[test]
fn missing_wg_binary_leaves_no_state() {
    let tmp = TempDir::new().unwrap();
    seed(tmp.path(), None);

    wgprov(tmp.path())
        .args(["--wg-binary", "/nonexistent/wg", "issue", "carol"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Key generation failed"));

    assert!(!tmp.path().join("wg_userdb_ips.json").exists());
    assert!(!tmp.path().join("carol_wg_windows.conf").exists());
}

#[test]
fn invalid_identity_rejected() {
    let tmp = TempDir::new().unwrap();
    seed(tmp.path(), None);

    wgprov(tmp.path())
        .args(["issue", "../escape"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid identity"));
}

#[test]
fn corrupt_registry_is_fatal() {
    let tmp = TempDir::new().unwrap();
    seed(tmp.path(), Some("{ broken"));

    wgprov(tmp.path())
        .args(["issue", "dave"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Corrupt state"));

    assert_eq!(
        std::fs::read_to_string(tmp.path().join("wg_userdb_ips.json")).unwrap(),
        "{ broken"
    );
}

#[test]
fn registry_outside_subnet_is_fatal() {
    let tmp = TempDir::new().unwrap();
    seed(tmp.path(), Some(r#"{"alice": "10.9.9.2"}"#));

    wgprov(tmp.path())
        .arg("next")
        .assert()
        .failure()
        .stderr(predicate::str::contains("outside"));
}

#[test]
fn next_reports_lowest_gap() {
    let tmp = TempDir::new().unwrap();
    seed(
        tmp.path(),
        Some(r#"{"alice": "192.168.100.2", "bob": "192.168.100.4"}"#),
    );

    wgprov(tmp.path())
        .args(["--format", "plain", "next"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Next Address: 192.168.100.3"));
}

#[test]
fn setup_non_interactive_and_profile_redacted() {
    let tmp = TempDir::new().unwrap();

    wgprov(tmp.path())
        .args([
            "setup",
            "--name",
            "wg0",
            "--host",
            "vpn.example.net",
            "--port",
            "51820",
            "--public-key",
            "SERVERPUB=",
            "--private-key",
            "SERVERPRIV=",
            "--subnet",
            "10.8.0.0/24",
        ])
        .assert()
        .success();

    assert!(tmp.path().join("wg_server_config.json").exists());
    assert!(tmp.path().join("wgprov.toml").exists());

    wgprov(tmp.path())
        .args(["--format", "json", "profile"])
        .assert()
        .success()
        .stdout(predicate::str::contains("vpn.example.net:51820"))
        .stdout(predicate::str::contains("SERVERPRIV=").not());

    // A second setup without --force is refused
    wgprov(tmp.path())
        .args(["setup", "--name", "other"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
}

#[test]
fn setup_rejects_narrow_subnet() {
    let tmp = TempDir::new().unwrap();
    wgprov(tmp.path())
        .args([
            "setup", "--name", "wg0", "--host", "h", "--port", "51820", "--public-key", "p",
            "--private-key", "k", "--subnet", "10.8.0.0/30",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid subnet"));
    assert!(!tmp.path().join("wg_server_config.json").exists());
}

#[cfg(unix)]
mod with_fake_wg {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;

    const CLIENT_PRIV: &str = "yAnz5TF+lXXJte14tji3zlMNq+hd2rYUIgJBgB3fBmk=";
    const CLIENT_PUB: &str = "HIksEnGBwdFVNN3rBbpxkDjXSBWu98mYDn+dMbzb/Bw=";

    fn fake_wg(dir: &Path) -> PathBuf {
        let path = dir.join("fake-wg");
        let script = format!(
            "#!/bin/sh\ncase \"$1\" in\n  genkey) echo '{}' ;;\n  pubkey) read k; echo '{}' ;;\n  *) exit 1 ;;\nesac\n",
            CLIENT_PRIV, CLIENT_PUB
        );
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn issue_two_clients() {
        let tools = TempDir::new().unwrap();
        let wg = fake_wg(tools.path());
        let tmp = TempDir::new().unwrap();
        seed(tmp.path(), None);

        wgprov(tmp.path())
            .arg("--wg-binary")
            .arg(&wg)
            .args(["issue", "alice", "--no-qr"])
            .assert()
            .success()
            .stdout(predicate::str::contains("192.168.100.2"));

        wgprov(tmp.path())
            .arg("--wg-binary")
            .arg(&wg)
            .args(["--format", "json", "issue", "bob"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"address\": \"192.168.100.3\""));

        let registry = read_registry(tmp.path());
        assert_eq!(registry["alice"], "192.168.100.2");
        assert_eq!(registry["bob"], "192.168.100.3");

        let windows = std::fs::read_to_string(tmp.path().join("alice_wg_windows.conf")).unwrap();
        assert_eq!(
            windows,
            format!(
                "[Interface]\nPrivateKey = {}\nAddress = 192.168.100.2/24\nDNS = 94.140.14.14\n\n\
                 [Peer]\nPublicKey = SERVERPUBKEY=\nEndpoint = 203.0.113.7:51820\n\
                 AllowedIPs = 0.0.0.0/0, ::/0\nPersistentKeepalive = 25\n",
                CLIENT_PRIV
            )
        );
        assert!(tmp.path().join("alice_wg_mt_setup.rsc").exists());
        assert!(!tmp.path().join("alice_wg_qr.png").exists());
        assert!(tmp.path().join("bob_wg_qr.png").exists());

        let peers = std::fs::read_to_string(tmp.path().join("wg_server_peer_config.rsc")).unwrap();
        assert!(peers.contains("name=\"alice\" interface=\"wg-server\""));
        assert!(peers.contains("allowed-address=\"192.168.100.3/32\""));
    }
}
