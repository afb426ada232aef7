#![cfg(unix)]

use std::io::{BufRead, BufReader};
use std::process::{Command, Stdio};

use p2pci_server::DirectoryServer;
use tokio::time::{sleep, Duration, Instant};

#[tokio::test]
async fn sigterm_stops_peer_while_stdin_is_open() {
    let server = DirectoryServer::bind("127.0.0.1:0", "P2P-CI/1.0").await.unwrap();
    let port = server.local_addr().unwrap().port();
    tokio::spawn(server.run());

    let dir = tempfile::tempdir().unwrap();
    let cfg = dir.path().join("peer.toml");
    std::fs::write(&cfg, "").unwrap();
    let mut child = Command::new(env!("CARGO_BIN_EXE_p2pci-peer"))
        .arg("127.0.0.1")
        .args(["--server-port", &port.to_string()])
        .args(["--peer-name", "sig"])
        .arg("--rfc-dir")
        .arg(dir.path().join("docs"))
        .arg("--config")
        .arg(&cfg)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();
    // Held open for the whole test so the shell stays blocked on its next line.
    let _stdin = child.stdin.take().unwrap();

    // Read up to the shell's usage text; the reader is kept so later prompts never hit a closed pipe.
    let stdout = BufReader::new(child.stdout.take().unwrap());
    let (_stdout, seen) = tokio::task::spawn_blocking(move || {
        let mut stdout = stdout;
        let mut seen = String::new();
        while !seen.contains("Commands:") {
            if stdout.read_line(&mut seen).unwrap() == 0 {
                break;
            }
        }
        (stdout, seen)
    })
    .await
    .unwrap();
    assert!(seen.contains("started"), "unexpected output: {seen}");
    assert!(seen.contains("Commands:"), "unexpected output: {seen}");
    // Let the signal handlers install alongside the first stdin read.
    sleep(Duration::from_millis(300)).await;

    let status = Command::new("kill")
        .args(["-TERM", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(status.success());

    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if let Some(status) = child.try_wait().unwrap() {
            assert!(status.success(), "peer exited with {status}");
            return;
        }
        if Instant::now() > deadline {
            child.kill().unwrap();
            panic!("peer still running 5s after SIGTERM");
        }
        sleep(Duration::from_millis(50)).await;
    }
}
