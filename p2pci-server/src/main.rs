// P2P-CI directory server daemon.

use std::path::PathBuf;

use clap::Parser;
use p2pci_server::{config, DirectoryServer};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "p2pci-server", version, about = "P2P-CI directory server")]
struct Cli {
    /// Listen port (overrides config and P2PCI_PORT).
    #[arg(short, long)]
    port: Option<u16>,
    /// Listen address.
    #[arg(long)]
    bind: Option<String>,
    /// Protocol token requests must carry.
    #[arg(long)]
    protocol_version: Option<String>,
    /// Config file (default: ~/.config/p2pci/server.toml, then /etc/p2pci/server.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// More logging (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut cfg = config::load(cli.config.as_deref())?;
    if let Some(p) = cli.port {
        cfg.port = p;
    }
    if let Some(b) = cli.bind {
        cfg.bind = b;
    }
    if let Some(v) = cli.protocol_version {
        cfg.protocol_version = v;
    }

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let server =
            DirectoryServer::bind((cfg.bind.as_str(), cfg.port), &cfg.protocol_version).await?;
        tracing::info!(
            addr = %server.local_addr()?,
            version = %cfg.protocol_version,
            "directory server listening"
        );
        tokio::select! {
            _ = server.run() => {}
            res = shutdown_signal() => {
                res?;
                tracing::info!("directory server shutting down");
            }
        }
        Ok::<(), anyhow::Error>(())
    })
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Wait for Ctrl+C or SIGTERM (Unix).
async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => res?,
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
    }
    Ok(())
}
