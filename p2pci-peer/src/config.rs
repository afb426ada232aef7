//! Load config from file and environment.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use p2pci_core::{DEFAULT_DIRECTORY_PORT, DEFAULT_PROTOCOL_VERSION};

/// Peer configuration. File: ~/.config/p2pci/peer.toml or /etc/p2pci/peer.toml.
/// Env overrides: P2PCI_SERVER_HOST, P2PCI_SERVER_PORT, P2PCI_RFC_DIR, P2PCI_PEER_NAME,
/// P2PCI_ADVERTISE_HOST, P2PCI_LISTEN_HOST, P2PCI_PROTOCOL_VERSION.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Directory server host (default localhost).
    #[serde(default = "default_server_host")]
    pub server_host: String,
    /// Directory server port (default 7734).
    #[serde(default = "default_server_port")]
    pub server_port: u16,
    /// Document directory (default `<peer name>_rfcs`).
    #[serde(default)]
    pub rfc_dir: Option<PathBuf>,
    /// Name reported to the directory (default `<hostname>-<pid>`).
    #[serde(default)]
    pub peer_name: Option<String>,
    /// Host other peers use to reach this one (default: the local address of the directory connection).
    #[serde(default)]
    pub advertise_host: Option<String>,
    /// Address the document responder binds; its port is always OS-assigned.
    #[serde(default = "default_listen_host")]
    pub listen_host: String,
    #[serde(default = "default_protocol_version")]
    pub protocol_version: String,
}

fn default_server_host() -> String {
    "localhost".to_string()
}
fn default_server_port() -> u16 {
    DEFAULT_DIRECTORY_PORT
}
fn default_listen_host() -> String {
    "0.0.0.0".to_string()
}
fn default_protocol_version() -> String {
    DEFAULT_PROTOCOL_VERSION.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: default_server_host(),
            server_port: default_server_port(),
            rfc_dir: None,
            peer_name: None,
            advertise_host: None,
            listen_host: default_listen_host(),
            protocol_version: default_protocol_version(),
        }
    }
}

impl Config {
    pub fn peer_name(&self) -> String {
        self.peer_name
            .clone()
            .unwrap_or_else(|| default_peer_name(|k| std::env::var(k).ok()))
    }

    pub fn rfc_dir(&self) -> PathBuf {
        self.rfc_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("{}_rfcs", self.peer_name())))
    }
}

/// `<hostname>-<pid>`, so several peers on one machine get distinct names.
/// `HOSTNAME` overrides the system host name.
fn default_peer_name(var: impl Fn(&str) -> Option<String>) -> String {
    let host = var("HOSTNAME")
        .filter(|h| !h.is_empty())
        .or_else(system_hostname)
        .unwrap_or_else(|| "peer".to_string());
    format!("{}-{}", host, std::process::id())
}

fn system_hostname() -> Option<String> {
    let name = hostname::get().ok()?.to_string_lossy().into_owned();
    (!name.is_empty()).then_some(name)
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
    if let Some(h) = var("P2PCI_SERVER_HOST") {
        c.server_host = h;
    }
    if let Some(p) = var("P2PCI_SERVER_PORT").and_then(|s| s.parse::<u16>().ok()) {
        c.server_port = p;
    }
    if let Some(d) = var("P2PCI_RFC_DIR") {
        c.rfc_dir = Some(PathBuf::from(d));
    }
    if let Some(n) = var("P2PCI_PEER_NAME") {
        c.peer_name = Some(n);
    }
    if let Some(h) = var("P2PCI_ADVERTISE_HOST") {
        c.advertise_host = Some(h);
    }
    if let Some(h) = var("P2PCI_LISTEN_HOST") {
        c.listen_host = h;
    }
    if let Some(v) = var("P2PCI_PROTOCOL_VERSION") {
        c.protocol_version = v;
    }
}

fn config_paths() -> Vec<PathBuf> {
    let home = std::env::var_os("HOME").map(PathBuf::from);
    let mut out = Vec::new();
    if let Some(h) = home {
        out.push(h.join(".config/p2pci/peer.toml"));
    }
    out.push(PathBuf::from("/etc/p2pci/peer.toml"));
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

    #[test]
    fn rfc_dir_follows_peer_name() {
        let c = Config {
            peer_name: Some("alice".into()),
            ..Config::default()
        };
        assert_eq!(c.rfc_dir(), PathBuf::from("alice_rfcs"));
        let c = Config {
            peer_name: Some("alice".into()),
            rfc_dir: Some("/srv/docs".into()),
            ..Config::default()
        };
        assert_eq!(c.rfc_dir(), PathBuf::from("/srv/docs"));
    }

    #[test]
    fn default_name_has_pid_suffix() {
        let name = Config::default().peer_name();
        assert!(name.ends_with(&format!("-{}", std::process::id())));
    }

    #[test]
    fn default_name_uses_system_hostname_without_env() {
        let host = hostname::get().unwrap().to_string_lossy().into_owned();
        assert!(!host.is_empty());
        let name = default_peer_name(|_| None);
        assert_eq!(name, format!("{}-{}", host, std::process::id()));
    }

    #[test]
    fn hostname_env_overrides_system_name() {
        let name = default_peer_name(|k| (k == "HOSTNAME").then(|| "box".to_string()));
        assert_eq!(name, format!("box-{}", std::process::id()));
    }

    #[test]
    fn file_and_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("peer.toml");
        std::fs::write(&path, "server_host = \"dir.example\"\npeer_name = \"bob\"\n").unwrap();
        let mut c = read_file(&path).unwrap();
        assert_eq!(c.server_host, "dir.example");
        assert_eq!(c.server_port, 7734);
        apply_env(&mut c, |k| match k {
            "P2PCI_SERVER_PORT" => Some("7000".into()),
            "P2PCI_ADVERTISE_HOST" => Some("10.1.1.1".into()),
            _ => None,
        });
        assert_eq!(c.server_port, 7000);
        assert_eq!(c.advertise_host.as_deref(), Some("10.1.1.1"));
        assert_eq!(c.peer_name(), "bob");
    }

    #[test]
    fn unknown_keys_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("peer.toml");
        std::fs::write(&path, "upload_port = 1\n").unwrap();
        assert!(matches!(read_file(&path), Err(ConfigError::Parse { .. })));
    }
}
