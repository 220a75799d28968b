//! Client connection state (§3, §4.2 of the design).

use std::fmt;
use std::io::Write;
use std::net::TcpStream;
use std::time::Instant;

use rand::RngExt;

use crate::error::{Result, RpsError};
use crate::state::room::RoomId;

/// Maximum number of simultaneously registered clients.
pub const MAX_CLIENTS: usize = 128;

/// Length in hex characters of a session token.
const TOKEN_LEN: usize = 30;

/// Opaque, server-assigned connection handle.
///
/// Stands in for the "fd" of a socket-level implementation — a stable,
/// copyable identity used for registry lookups and room back-references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(u64);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Client-side connection state machine (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Connected,
    Auth,
    InLobby,
    Ready,
    Playing,
}

/// Heartbeat / liveness state (§4.7), independent of [`ClientState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heartbeat {
    Live,
    Soft,
    Hard,
}

/// One connected session.
pub struct Client {
    pub id: ClientId,
    pub nick: String,
    pub token: String,
    pub state: ClientState,
    pub room_id: Option<RoomId>,
    pub last_seen: Instant,
    pub last_ping_sent: Instant,
    pub heartbeat: Heartbeat,
    /// Set once a newer connection has adopted this session via RECONNECT
    /// (§4.6). A `replaced` client's own terminal cleanup is a no-op.
    pub replaced: bool,
    pub invalid_streak: u8,
    writer: TcpStream,
}

impl Client {
    pub(crate) fn new(id: ClientId, writer: TcpStream) -> Self {
        let now = Instant::now();
        Client {
            id,
            nick: String::new(),
            token: String::new(),
            state: ClientState::Connected,
            room_id: None,
            last_seen: now,
            last_ping_sent: now,
            heartbeat: Heartbeat::Live,
            replaced: false,
            invalid_streak: 0,
            writer,
        }
    }

    /// Generate a fresh 30-character hex session token (§4.4 HELLO).
    pub fn generate_token() -> String {
        let mut rng = rand::rng();
        let bytes: [u8; TOKEN_LEN / 2] = rng.random();
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Write one framed line to the client's socket (§4.1).
    ///
    /// Called while the caller holds the global lock, so a send is a single
    /// write of a complete line — no interleaving with any other writer.
    pub fn send_line(&mut self, line: &str) {
        if let Err(error) = write!(self.writer, "{line}\r\n") {
            tracing::debug!(client = %self.id, %error, "send failed, connection likely gone");
        }
    }

    /// Force-close the read half so a blocked connection worker unblocks
    /// promptly (§5 cancellation, §4.7 supervisor-driven timeouts).
    pub fn shutdown_read(&self) {
        let _ = self.writer.shutdown(std::net::Shutdown::Read);
    }

    pub fn reset_invalid_streak(&mut self) {
        self.invalid_streak = 0;
    }

    /// Returns `true` once three consecutive invalid commands have been seen
    /// (§4.4 — caller should force-close the connection).
    pub fn mark_invalid(&mut self) -> bool {
        self.invalid_streak += 1;
        self.invalid_streak >= 3
    }
}

/// Fixed-capacity table of live clients (§4.2), linear-scanned by id,
/// nickname or token.
pub struct ClientRegistry {
    slots: Vec<Option<Client>>,
    next_id: u64,
}

impl ClientRegistry {
    pub fn new() -> Self {
        let mut slots = Vec::with_capacity(MAX_CLIENTS);
        slots.resize_with(MAX_CLIENTS, || None);
        ClientRegistry { slots, next_id: 1 }
    }

    /// Register a new connection, assigning it a fresh [`ClientId`].
    pub fn register(&mut self, writer: TcpStream) -> Result<ClientId> {
        let slot = self
            .slots
            .iter()
            .position(|s| s.is_none())
            .ok_or(RpsError::ClientRegistryFull)?;
        let id = ClientId(self.next_id);
        self.next_id += 1;
        self.slots[slot] = Some(Client::new(id, writer));
        Ok(id)
    }

    pub fn unregister(&mut self, id: ClientId) {
        if let Some(slot) = self
            .slots
            .iter_mut()
            .find(|s| matches!(s, Some(c) if c.id == id))
        {
            *slot = None;
        }
    }

    pub fn get(&self, id: ClientId) -> Option<&Client> {
        self.slots.iter().flatten().find(|c| c.id == id)
    }

    pub fn get_mut(&mut self, id: ClientId) -> Option<&mut Client> {
        self.slots.iter_mut().flatten().find(|c| c.id == id)
    }

    pub fn find_by_name(&self, nick: &str) -> Option<&Client> {
        if nick.is_empty() {
            return None;
        }
        self.slots
            .iter()
            .flatten()
            .find(|c| !c.nick.is_empty() && c.nick == nick)
    }

    pub fn find_by_token(&self, token: &str) -> Option<&Client> {
        if token.is_empty() {
            return None;
        }
        self.slots
            .iter()
            .flatten()
            .find(|c| !c.token.is_empty() && c.token == token)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Client> {
        self.slots.iter().flatten()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Client> {
        self.slots.iter_mut().flatten()
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{TcpListener, TcpStream};

    fn dummy_stream() -> TcpStream {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        listener.accept().unwrap();
        client
    }

    #[test]
    fn register_assigns_distinct_ids() {
        let mut reg = ClientRegistry::new();
        let a = reg.register(dummy_stream()).unwrap();
        let b = reg.register(dummy_stream()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn registry_full_after_capacity() {
        let mut reg = ClientRegistry::new();
        for _ in 0..MAX_CLIENTS {
            reg.register(dummy_stream()).unwrap();
        }
        assert!(matches!(
            reg.register(dummy_stream()),
            Err(RpsError::ClientRegistryFull)
        ));
    }

    #[test]
    fn unregister_frees_slot() {
        let mut reg = ClientRegistry::new();
        let id = reg.register(dummy_stream()).unwrap();
        reg.unregister(id);
        assert!(reg.get(id).is_none());
        // slot is reusable
        reg.register(dummy_stream()).unwrap();
    }

    #[test]
    fn find_by_name_ignores_empty_nick() {
        let mut reg = ClientRegistry::new();
        reg.register(dummy_stream()).unwrap();
        assert!(reg.find_by_name("").is_none());
    }

    #[test]
    fn token_generation_is_thirty_hex_chars() {
        let token = Client::generate_token();
        assert_eq!(token.len(), TOKEN_LEN);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
