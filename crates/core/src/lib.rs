//! # rps — authoritative Rock-Paper-Scissors match server
//!
//! A session-oriented TCP server for two-player best-of-5 Rock-Paper-Scissors,
//! speaking a line-delimited (CRLF) ASCII protocol: nickname auth, room
//! discovery/join, ready-up, synchronous round play, and token-based
//! reconnect across network blips.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │  Server        — public API, orchestrator│
//! │  ServerConfig  — tunable round/heartbeat │
//! │                  constants (§2.1)        │
//! ├──────────────────────────────────────────┤
//! │  Protocol      — verb parsing, dispatch, │
//! │                  wire-error formatting   │
//! ├──────────────────────────────────────────┤
//! │  State         — Client/Room registries, │
//! │                  match engine, heartbeat │
//! │                  supervisor, all behind  │
//! │                  one lock (Core)         │
//! ├──────────────────────────────────────────┤
//! │  Transport     — TCP accept loop, one    │
//! │                  thread per connection   │
//! └──────────────────────────────────────────┘
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use rps::Server;
//!
//! let mut server = Server::new("0.0.0.0:2500");
//! server.start().unwrap();
//! ```
//!
//! ## Crate layout
//!
//! - [`server`] — High-level [`Server`] orchestrator.
//! - [`config`] — [`config::ServerConfig`] / [`config::RoundRules`], the tunable constants.
//! - [`protocol`] — Verb parsing ([`protocol::Command`]), dispatch, and the
//!   client-facing `ERR` taxonomy ([`protocol::ProtocolError`]).
//! - [`state`] — Client/room registries, the match engine, and the heartbeat
//!   supervisor — all operating under [`state::Core`]'s single lock.
//! - [`transport`] — TCP listener and per-connection worker.
//! - [`error`] — [`RpsError`] enum and [`Result`] alias for internal/setup failures.

pub mod config;
pub mod error;
pub mod protocol;
pub mod server;
pub mod state;
pub mod transport;

pub use config::{RoundRules, ServerConfig};
pub use error::{Result, RpsError};
pub use server::Server;
