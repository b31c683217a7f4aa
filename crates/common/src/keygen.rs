//! Client key generation
//!
//! Keys come from the `wg` tool (`wg genkey` / `wg pubkey`); this crate only
//! checks that what comes back has the shape of a WireGuard key.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::types::KeyPair;
use crate::{Error, Result};

/// Default bound on each `wg` invocation
pub const DEFAULT_KEYGEN_TIMEOUT: Duration = Duration::from_secs(10);

/// Source of fresh client key pairs
#[async_trait]
pub trait KeyGenerator: Send + Sync {
    async fn generate(&self) -> Result<KeyPair>;
}

/// Check that `key` is base64 of exactly 32 bytes
pub fn validate_key(key: &str) -> Result<()> {
    let bytes = STANDARD
        .decode(key)
        .map_err(|e| Error::KeyGeneration(format!("key is not valid base64: {}", e)))?;
    if bytes.len() != 32 {
        return Err(Error::KeyGeneration(format!(
            "key decodes to {} bytes, expected 32",
            bytes.len()
        )));
    }
    Ok(())
}

/// Key generator backed by the WireGuard `wg` binary
#[derive(Debug, Clone)]
pub struct WgToolKeyGenerator {
    binary: PathBuf,
    timeout: Duration,
}

impl Default for WgToolKeyGenerator {
    fn default() -> Self {
        Self::new("wg", DEFAULT_KEYGEN_TIMEOUT)
    }
}

impl WgToolKeyGenerator {
    pub fn new(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    async fn run(&self, subcommand: &str, stdin: Option<&str>) -> Result<String> {
        match tokio::time::timeout(self.timeout, self.run_unbounded(subcommand, stdin)).await {
            Ok(result) => result,
            Err(_) => Err(Error::KeyGeneration(format!(
                "timeout after {:?} running '{} {}'",
                self.timeout,
                self.binary.display(),
                subcommand
            ))),
        }
    }

    async fn run_unbounded(&self, subcommand: &str, stdin: Option<&str>) -> Result<String> {
        let mut child = Command::new(&self.binary)
            .arg(subcommand)
            .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Error::KeyGeneration(format!("cannot run '{}': {}", self.binary.display(), e))
            })?;

        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            let line = format!("{}\n", input);
            pipe.write_all(line.as_bytes())
                .await
                .map_err(|e| Error::KeyGeneration(format!("writing to '{}': {}", subcommand, e)))?;
            // Closing stdin lets `wg pubkey` finish reading
            drop(pipe);
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| Error::KeyGeneration(format!("waiting for '{}': {}", subcommand, e)))?;
        if !output.status.success() {
            return Err(Error::KeyGeneration(format!(
                "'{} {}' failed ({}): {}",
                self.binary.display(),
                subcommand,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let stdout = String::from_utf8(output.stdout).map_err(|_| {
            Error::KeyGeneration(format!("'{}' produced non-UTF-8 output", subcommand))
        })?;
        let key = stdout.trim().to_string();
        if key.is_empty() {
            return Err(Error::KeyGeneration(format!(
                "'{} {}' returned empty output",
                self.binary.display(),
                subcommand
            )));
        }
        Ok(key)
    }
}

#[async_trait]
impl KeyGenerator for WgToolKeyGenerator {
    async fn generate(&self) -> Result<KeyPair> {
        debug!("Generating client keys with {:?}", self.binary);
        let private_key = self.run("genkey", None).await?;
        validate_key(&private_key)?;
        let public_key = self.run("pubkey", Some(&private_key)).await?;
        validate_key(&public_key)?;
        Ok(KeyPair {
            private_key,
            public_key,
        })
    }
}

/// Key generator returning a fixed pair
#[derive(Debug, Clone)]
pub struct StaticKeyGenerator {
    keypair: KeyPair,
}

impl StaticKeyGenerator {
    pub fn new(private_key: impl Into<String>, public_key: impl Into<String>) -> Self {
        Self {
            keypair: KeyPair {
                private_key: private_key.into(),
                public_key: public_key.into(),
            },
        }
    }
}

#[async_trait]
impl KeyGenerator for StaticKeyGenerator {
    async fn generate(&self) -> Result<KeyPair> {
        Ok(self.keypair.clone())
    }
}

/// Key generator that always fails, as when `wg` is missing
#[derive(Debug, Clone, Default)]
pub struct FailingKeyGenerator;

#[async_trait]
impl KeyGenerator for FailingKeyGenerator {
    async fn generate(&self) -> Result<KeyPair> {
        Err(Error::KeyGeneration("key generator unavailable".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "yAnz5TF+lXXJte14tji3zlMNq+hd2rYUIgJBgB3fBmk=";

    #[test]
    fn test_validate_key() {
        assert!(validate_key(KEY).is_ok());
        assert!(validate_key("AAAA").is_err());
        assert!(validate_key("not base64!").is_err());
        assert!(validate_key("").is_err());
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let generator = WgToolKeyGenerator::new("/nonexistent/wg-binary", Duration::from_secs(2));
        let err = generator.generate().await.unwrap_err();
        assert!(matches!(err, Error::KeyGeneration(_)));
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        fn script(dir: &TempDir, body: &str) -> PathBuf {
            let path = dir.path().join("fake-wg");
            std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        #[tokio::test]
        async fn test_fake_wg_tool() {
            let dir = TempDir::new().unwrap();
            let body = format!(
                "case \"$1\" in\n  genkey) echo '{}' ;;\n  pubkey) read k; echo 'HIksEnGBwdFVNN3rBbpxkDjXSBWu98mYDn+dMbzb/Bw=' ;;\nesac",
                KEY
            );
            let generator = WgToolKeyGenerator::new(script(&dir, &body), Duration::from_secs(5));
            let kp = generator.generate().await.unwrap();
            assert_eq!(kp.private_key, KEY);
            assert_eq!(kp.public_key, "HIksEnGBwdFVNN3rBbpxkDjXSBWu98mYDn+dMbzb/Bw=");
        }

        #[tokio::test]
        async fn test_empty_output() {
            let dir = TempDir::new().unwrap();
            let generator = WgToolKeyGenerator::new(script(&dir, "exit 0"), Duration::from_secs(5));
            let err = generator.generate().await.unwrap_err();
            assert!(err.to_string().contains("empty output"));
        }

        #[tokio::test]
        async fn test_non_zero_exit() {
            let dir = TempDir::new().unwrap();
            let generator = WgToolKeyGenerator::new(
                script(&dir, "echo boom >&2; exit 3"),
                Duration::from_secs(5),
            );
            let err = generator.generate().await.unwrap_err();
            assert!(matches!(err, Error::KeyGeneration(ref m) if m.contains("boom")));
        }

        #[tokio::test]
        async fn test_timeout() {
            let dir = TempDir::new().unwrap();
            let generator = WgToolKeyGenerator::new(script(&dir, "sleep 5"), Duration::from_millis(200));
            let err = generator.generate().await.unwrap_err();
            assert!(matches!(err, Error::KeyGeneration(ref m) if m.contains("timeout")));
        }
    }
}
