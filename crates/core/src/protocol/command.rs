//! Verb parsing (§4.4), grounded on `protocol/request.rs`'s
//! `RtspRequest::parse`, adapted from a multi-line header block to a
//! single-line `VERB [arg]` command.

use crate::state::room::Move;

/// A parsed client command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Hello(String),
    List,
    Create(String),
    Join(u64),
    Ready,
    Leave,
    Move(Move),
    GetOpp,
    Reconnect(String),
    Pong,
    Quit,
    /// Recognized verb, wrong argument shape.
    BadArgs,
    /// Verb not in the protocol at all.
    Unknown,
}

impl Command {
    /// Parse one already-framed line (§4.1 supplies CRLF stripping).
    pub fn parse(line: &str) -> Self {
        let mut parts = line.splitn(2, ' ');
        let verb = parts.next().unwrap_or("");
        let rest = parts.next().unwrap_or("").trim();

        match verb {
            "HELLO" => {
                if rest.is_empty() {
                    Command::BadArgs
                } else {
                    Command::Hello(rest.to_string())
                }
            }
            "LIST" => Command::List,
            "CREATE" => {
                if rest.is_empty() || rest.contains(' ') {
                    Command::BadArgs
                } else {
                    Command::Create(rest.to_string())
                }
            }
            "JOIN" => match rest.parse::<u64>() {
                Ok(id) => Command::Join(id),
                Err(_) => Command::BadArgs,
            },
            "READY" => Command::Ready,
            "LEAVE" => Command::Leave,
            "MOVE" => match Move::parse(rest) {
                Some(mv) => Command::Move(mv),
                None => Command::BadArgs,
            },
            "GET_OPP" => Command::GetOpp,
            "RECONNECT" => {
                if rest.is_empty() {
                    Command::BadArgs
                } else {
                    Command::Reconnect(rest.to_string())
                }
            }
            "PONG" => Command::Pong,
            "QUIT" => Command::Quit,
            _ => Command::Unknown,
        }
    }
}
