//! Line commands that drive the daemon from stdin.

use mesh_core::{Callbacks, Daemon, Status};

pub const HELP: &str = "\
commands:
  connect <peer_id> [uid]     simulate a peer connecting
  disconnect <peer_id>        simulate a peer disconnecting
  recv <peer_id> <text>       simulate inbound data from a peer
  send <peer_id> <text>       queue a message to a peer
  send-uid <uid> <text>       send directly to the peer registered under uid
  peers                       list known peers
  status                      show daemon state
  help
  quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Connect { peer_id: u64, uid: String },
    Disconnect { peer_id: u64 },
    Recv { peer_id: u64, text: String },
    Send { peer_id: u64, text: String },
    SendUid { uid: String, text: String },
    Peers,
    Status,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command: {0}")]
    Unknown(String),
    #[error("missing argument: {0}")]
    Missing(&'static str),
    #[error("invalid peer id: {0}")]
    BadPeerId(String),
}

fn peer_id(arg: Option<&str>) -> Result<u64, ParseError> {
    let s = arg.ok_or(ParseError::Missing("peer_id"))?;
    s.parse().map_err(|_| ParseError::BadPeerId(s.to_string()))
}

/// Rest of the line after `n` whitespace-separated words, leading whitespace trimmed.
fn rest(line: &str, n: usize) -> Option<String> {
    let mut s = line.trim_start();
    for _ in 0..n {
        let end = s.find(char::is_whitespace)?;
        s = s[end..].trim_start();
    }
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

pub fn parse_command(line: &str) -> Result<Command, ParseError> {
    let mut words = line.split_whitespace();
    let cmd = words.next().ok_or(ParseError::Empty)?;
    match cmd {
        "connect" => {
            let peer_id = peer_id(words.next())?;
            let uid = words.next().unwrap_or("").to_string();
            Ok(Command::Connect { peer_id, uid })
        }
        "disconnect" => Ok(Command::Disconnect {
            peer_id: peer_id(words.next())?,
        }),
        "recv" | "send" => {
            let peer_id = peer_id(words.next())?;
            let text = rest(line, 2).ok_or(ParseError::Missing("text"))?;
            if cmd == "recv" {
                Ok(Command::Recv { peer_id, text })
            } else {
                Ok(Command::Send { peer_id, text })
            }
        }
        "send-uid" => {
            let uid = words.next().ok_or(ParseError::Missing("uid"))?.to_string();
            let text = rest(line, 2).ok_or(ParseError::Missing("text"))?;
            Ok(Command::SendUid { uid, text })
        }
        "peers" => Ok(Command::Peers),
        "status" => Ok(Command::Status),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(ParseError::Unknown(other.to_string())),
    }
}

/// Run a command against the daemon. Returns text to print, if any.
pub fn execute(daemon: &Daemon, cmd: Command) -> Option<String> {
    let queued = |accepted: bool| {
        if accepted {
            None
        } else {
            Some("daemon is not running".to_string())
        }
    };
    match cmd {
        Command::Connect { peer_id, uid } => queued(daemon.simulate_peer_connect(peer_id, &uid)),
        Command::Disconnect { peer_id } => queued(daemon.simulate_peer_disconnect(peer_id)),
        Command::Recv { peer_id, text } => {
            queued(daemon.simulate_message(peer_id, text.as_bytes()))
        }
        Command::Send { peer_id, text } => daemon
            .send_message(peer_id, text.as_bytes())
            .err()
            .map(|e| format!("send failed: {}", e)),
        Command::SendUid { uid, text } => daemon
            .send_message_to_uid(&uid, text.as_bytes())
            .err()
            .map(|e| format!("send failed: {}", e)),
        Command::Peers => {
            let peers = daemon.peers();
            if peers.is_empty() {
                return Some("no peers".to_string());
            }
            let lines: Vec<String> = peers
                .iter()
                .map(|p| {
                    let uid = if p.uid.is_empty() { "-" } else { p.uid.as_str() };
                    format!("{:>6}  {:<16}  since {}", p.peer_id, uid, p.connected_at)
                })
                .collect();
            Some(lines.join("\n"))
        }
        Command::Status => Some(format!(
            "state={} running={} busy={} pending={} peers={}",
            daemon.state(),
            daemon.is_running(),
            daemon.is_busy(),
            daemon.pending(),
            daemon.peer_count()
        )),
        Command::Help => Some(HELP.to_string()),
        Command::Quit => None,
    }
}

/// Callbacks that print notifications to stdout (invoked on the worker thread).
pub fn printing_callbacks() -> Callbacks {
    Callbacks::new()
        .on_message(|peer_id, uid, data, timestamp| {
            println!(
                "[message] peer={} uid={} ts={} {}",
                peer_id,
                uid,
                timestamp,
                String::from_utf8_lossy(data)
            );
        })
        .on_peer(|peer_id, uid, connected| {
            let what = if connected { "connected" } else { "disconnected" };
            println!("[peer] {} peer={} uid={}", what, peer_id, uid);
        })
        .on_status(|status, message| {
            let level = match status {
                Status::Error => "error",
                _ => "status",
            };
            println!("[{}] {}", level, message);
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn parse_connect_with_and_without_uid() {
        assert_eq!(
            parse_command("connect 7 alice"),
            Ok(Command::Connect {
                peer_id: 7,
                uid: "alice".into()
            })
        );
        assert_eq!(
            parse_command("  connect 8"),
            Ok(Command::Connect {
                peer_id: 8,
                uid: String::new()
            })
        );
    }

    #[test]
    fn parse_text_keeps_spaces() {
        assert_eq!(
            parse_command("send 3 hello  mesh world"),
            Ok(Command::Send {
                peer_id: 3,
                text: "hello  mesh world".into()
            })
        );
        assert_eq!(
            parse_command("send-uid bob hi there"),
            Ok(Command::SendUid {
                uid: "bob".into(),
                text: "hi there".into()
            })
        );
    }

    #[test]
    fn parse_errors() {
        assert_eq!(parse_command("   "), Err(ParseError::Empty));
        assert_eq!(parse_command("fly"), Err(ParseError::Unknown("fly".into())));
        assert_eq!(parse_command("recv 1"), Err(ParseError::Missing("text")));
        assert_eq!(parse_command("disconnect x"), Err(ParseError::BadPeerId("x".into())));
        assert_eq!(parse_command("send"), Err(ParseError::Missing("peer_id")));
    }

    #[test]
    fn execute_against_daemon() {
        let d = Daemon::new();
        assert_eq!(
            execute(&d, Command::Recv { peer_id: 1, text: "x".into() }),
            Some("daemon is not running".into())
        );
        d.start().unwrap();
        assert_eq!(execute(&d, Command::Peers), Some("no peers".into()));
        assert_eq!(execute(&d, Command::Connect { peer_id: 4, uid: "dora".into() }), None);
        assert!(d.wait_idle(Duration::from_secs(5)));
        let listing = execute(&d, Command::Peers).unwrap();
        assert!(listing.contains("dora"));
        let err = execute(&d, Command::SendUid { uid: "nobody".into(), text: "x".into() }).unwrap();
        assert_eq!(err, "send failed: peer not found");
        let status = execute(&d, Command::Status).unwrap();
        assert!(status.starts_with("state=running running=true"));
        d.stop();
    }
}
