//! Interactive shell over stdin: add, lookup, list, download, quit.

use std::io::Write;

use p2pci_core::Status;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::directory_client::DirectoryReply;
use crate::node::PeerNode;

pub const USAGE: &str = "\
Commands:
  add <rfc_num> <title>  Add RFC to index
  lookup <rfc_num>       Find peers with RFC
  list                   List all RFCs
  download <rfc_num>     Download RFC from peer
  quit                   Exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add { number: u32, title: String },
    Lookup(u32),
    List,
    Download(u32),
    Quit,
}

const NOT_A_NUMBER: &str = "RFC number must be integer";

fn parse_number(s: &str) -> Result<u32, &'static str> {
    s.parse().map_err(|_| NOT_A_NUMBER)
}

/// Parse one input line. `Ok(None)` for a blank line.
pub fn parse_command(line: &str) -> Result<Option<Command>, &'static str> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((&cmd, args)) = words.split_first() else {
        return Ok(None);
    };
    let command = match (cmd, args) {
        ("add", [n, title @ ..]) if !title.is_empty() => Command::Add {
            number: parse_number(n)?,
            title: title.join(" "),
        },
        ("lookup", [n]) => Command::Lookup(parse_number(n)?),
        ("list", []) => Command::List,
        ("list", _) => return Err("LIST takes no arguments"),
        ("download", [n]) => Command::Download(parse_number(n)?),
        ("quit", []) => Command::Quit,
        _ => return Err("Unsupported command or arguments"),
    };
    Ok(Some(command))
}

/// Zero-based index for a 1-based peer choice; empty input picks the first.
pub fn parse_selection(input: &str, len: usize) -> Result<usize, &'static str> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(0);
    }
    let choice: usize = input.parse().map_err(|_| "Selection must be numeric")?;
    if (1..=len).contains(&choice) {
        Ok(choice - 1)
    } else {
        Err("Selection out of range")
    }
}

pub struct Shell<'a> {
    node: &'a mut PeerNode,
    lines: Lines<BufReader<Stdin>>,
    version: String,
}

impl<'a> Shell<'a> {
    pub fn new(node: &'a mut PeerNode, version: impl Into<String>) -> Self {
        Self {
            node,
            lines: BufReader::new(tokio::io::stdin()).lines(),
            version: version.into(),
        }
    }

    /// Read commands until `quit` or end of input.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        println!("{}", USAGE);
        loop {
            let Some(line) = self.prompt("\n> ").await? else {
                return Ok(());
            };
            match parse_command(&line) {
                Ok(None) => {}
                Ok(Some(Command::Quit)) => return Ok(()),
                Ok(Some(cmd)) => self.execute(cmd).await?,
                Err(msg) => self.print_local(Status::BadRequest, msg),
            }
        }
    }

    async fn execute(&mut self, cmd: Command) -> anyhow::Result<()> {
        match cmd {
            Command::Add { number, title } => {
                let reply = self.node.add(number, &title).await?;
                print_reply(&reply);
            }
            Command::Lookup(number) => {
                let reply = self.node.lookup(number).await?;
                print_reply(&reply);
            }
            Command::List => {
                let reply = self.node.list().await?;
                print_reply(&reply);
            }
            Command::Download(number) => self.download(number).await?,
            Command::Quit => {}
        }
        Ok(())
    }

    async fn download(&mut self, number: u32) -> anyhow::Result<()> {
        let hosts = self.node.hosts_for(number).await?;
        if hosts.is_empty() {
            let msg = format!("No peers hosting RFC {}", number);
            self.print_local(Status::NotFound, &msg);
            return Ok(());
        }
        println!("Available peers:");
        for (i, r) in hosts.iter().enumerate() {
            println!("{}. {} ({}:{})", i + 1, r.title, r.owner.host, r.owner.port);
        }
        let Some(input) = self.prompt("Select peer [1]: ").await? else {
            return Ok(());
        };
        let record = match parse_selection(&input, hosts.len()) {
            Ok(i) => &hosts[i],
            Err(msg) => {
                self.print_local(Status::BadRequest, msg);
                return Ok(());
            }
        };
        match self.node.download_from(record).await {
            Ok(reply) => {
                println!("Downloaded RFC {} from {}", number, record.owner);
                print_reply(&reply);
            }
            Err(e) => {
                tracing::warn!(number, peer = %record.owner, error = %e, "download failed");
                println!("Download failed: {}", e);
            }
        }
        Ok(())
    }

    async fn prompt(&mut self, text: &str) -> anyhow::Result<Option<String>> {
        print!("{}", text);
        std::io::stdout().flush()?;
        Ok(self.lines.next_line().await?)
    }

    fn print_local(&self, status: Status, msg: &str) {
        let code = status.code();
        println!("{} {} {}\n{}", self.version, code, status.reason(&self.version), msg);
    }
}

fn print_reply(reply: &DirectoryReply) {
    println!("{}", reply.head.status_line);
    if !reply.body.is_empty() {
        println!("{}", reply.body.replace("\r\n", "\n"));
    }
}
