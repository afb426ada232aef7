// P2P-CI peer daemon with an interactive shell.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use p2pci_peer::shell::Shell;
use p2pci_peer::{config, fixtures, PeerNode};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "p2pci-peer", version, about = "P2P-CI peer")]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
    #[command(flatten)]
    run: RunArgs,
    /// More logging (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Write the sample documents, one per directory.
    Fixtures {
        /// Target directories (default: peer1_rfcs peer2_rfcs peer3_rfcs).
        dirs: Vec<PathBuf>,
    },
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Directory server host.
    server_host: Option<String>,
    #[arg(long)]
    server_port: Option<u16>,
    /// Document directory (default: <peer name>_rfcs).
    #[arg(long)]
    rfc_dir: Option<PathBuf>,
    /// Name reported to the directory (default: <hostname>-<pid>).
    #[arg(long)]
    peer_name: Option<String>,
    /// Host other peers should use to reach this peer.
    #[arg(long)]
    advertise_host: Option<String>,
    /// Protocol token sent and required.
    #[arg(long)]
    protocol_version: Option<String>,
    /// Config file (default: ~/.config/p2pci/peer.toml, then /etc/p2pci/peer.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Some(Command::Fixtures { dirs }) = cli.command {
        let dirs = if dirs.is_empty() {
            fixtures::default_dirs()
        } else {
            dirs
        };
        for path in fixtures::write_samples(&dirs)? {
            println!("Created {}", path.display());
        }
        return Ok(());
    }

    let args = cli.run;
    let mut cfg = config::load(args.config.as_deref())?;
    if let Some(h) = args.server_host {
        cfg.server_host = h;
    }
    if let Some(p) = args.server_port {
        cfg.server_port = p;
    }
    if let Some(d) = args.rfc_dir {
        cfg.rfc_dir = Some(d);
    }
    if let Some(n) = args.peer_name {
        cfg.peer_name = Some(n);
    }
    if let Some(h) = args.advertise_host {
        cfg.advertise_host = Some(h);
    }
    if let Some(v) = args.protocol_version {
        cfg.protocol_version = v;
    }
    // Resolve the generated name once so rfc_dir and the advertised name agree.
    cfg.peer_name = Some(cfg.peer_name());

    let rt = tokio::runtime::Runtime::new()?;
    let result = rt.block_on(async {
        let mut node = PeerNode::start(&cfg).await?;
        node.register_local_documents().await?;
        println!(
            "P2P peer {} started, serving {} on port {}",
            node.identity(),
            node.store().dir().display(),
            node.responder_addr().port()
        );
        let mut shell = Shell::new(&mut node, cfg.protocol_version.as_str());
        tokio::select! {
            res = shell.run() => res?,
            res = shutdown_signal() => res?,
        }
        tracing::info!("peer shutting down");
        Ok::<(), anyhow::Error>(())
    });
    // A pending stdin read sits on the blocking pool and would hold a normal runtime drop.
    rt.shutdown_background();
    result
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
