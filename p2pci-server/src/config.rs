//! Load config from file and environment.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use p2pci_core::{DEFAULT_DIRECTORY_PORT, DEFAULT_PROTOCOL_VERSION};

/// Directory server configuration. File: ~/.config/p2pci/server.toml or /etc/p2pci/server.toml.
/// Env overrides: P2PCI_PORT, P2PCI_BIND, P2PCI_PROTOCOL_VERSION.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Listen port (default 7734).
    #[serde(default = "default_port")]
    pub port: u16,
    /// Listen address (default 0.0.0.0).
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Protocol token every request must carry.
    #[serde(default = "default_protocol_version")]
    pub protocol_version: String,
}

fn default_port() -> u16 {
    DEFAULT_DIRECTORY_PORT
}
fn default_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_protocol_version() -> String {
    DEFAULT_PROTOCOL_VERSION.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
            protocol_version: default_protocol_version(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Load config: default, then config file (explicit path or first existing default path), then env vars.
pub fn load(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    let mut c = match explicit {
        Some(p) => read_file(p)?,
        None => match config_paths().into_iter().find(|p| p.exists()) {
            Some(p) => read_file(&p)?,
            None => Config::default(),
        },
    };
    apply_env(&mut c, |k| std::env::var(k).ok());
    Ok(c)
}

/// Apply `P2PCI_*` overrides. Unparsable values are ignored.
pub fn apply_env(c: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(p) = var("P2PCI_PORT").and_then(|s| s.parse::<u16>().ok()) {
        c.port = p;
    }
    if let Some(b) = var("P2PCI_BIND") {
        c.bind = b;
    }
    if let Some(v) = var("P2PCI_PROTOCOL_VERSION") {
        c.protocol_version = v;
    }
}

fn config_paths() -> Vec<PathBuf> {
    let home = std::env::var_os("HOME").map(PathBuf::from);
    let mut out = Vec::new();
    if let Some(h) = home {
        out.push(h.join(".config/p2pci/server.toml"));
    }
    out.push(PathBuf::from("/etc/p2pci/server.toml"));
    out
}

fn read_file(path: &Path) -> Result<Config, ConfigError> {
    let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&s).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults() {
        let c = Config::default();
        assert_eq!(c.port, 7734);
        assert_eq!(c.bind, "0.0.0.0");
        assert_eq!(c.protocol_version, "P2P-CI/1.0");
    }

    #[test]
    fn file_fills_missing_keys_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.toml");
        std::fs::write(&path, "port = 9000\n").unwrap();
        let c = read_file(&path).unwrap();
        assert_eq!(c.port, 9000);
        assert_eq!(c.protocol_version, "P2P-CI/1.0");
    }

    #[test]
    fn unknown_keys_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.toml");
        std::fs::write(&path, "prot = 9000\n").unwrap();
        assert!(matches!(read_file(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn env_overrides() {
        let env: HashMap<&str, &str> = [
            ("P2PCI_PORT", "8000"),
            ("P2PCI_PROTOCOL_VERSION", "P2P-DI/1.0"),
        ]
        .into_iter()
        .collect();
        let mut c = Config::default();
        apply_env(&mut c, |k| env.get(k).map(|v| v.to_string()));
        assert_eq!(c.port, 8000);
        assert_eq!(c.bind, "0.0.0.0");
        assert_eq!(c.protocol_version, "P2P-DI/1.0");

        let mut c = Config::default();
        apply_env(&mut c, |k| (k == "P2PCI_PORT").then(|| "not-a-port".to_string()));
        assert_eq!(c.port, 7734);
    }
}
