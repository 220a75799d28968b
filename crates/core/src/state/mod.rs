//! Session and match state (client registry, room registry, match engine).
//!
//! This is the concurrent heart of the server: every mutation here happens
//! while the caller holds [`Core`]'s single lock (§5 of the design — one
//! coarse lock rather than the teacher's per-entity `RwLock`s, because a
//! single handler routinely touches both a client and its room's opponent
//! in one atomic step).
//!
//! ## Layout
//!
//! - [`client`] — [`Client`], [`ClientState`], [`Heartbeat`], [`ClientRegistry`].
//! - [`room`] — [`Room`], [`RoomState`], [`RoomRegistry`].
//! - [`core`] — [`Core`], the locked aggregate the rest of the crate operates on.
//! - [`match_engine`] — round lifecycle: start/resolve/end/timeout.
//! - [`heartbeat`] — the ~200ms supervisor tick.

pub mod client;
pub mod core;
pub mod heartbeat;
pub mod match_engine;
pub mod room;

pub use client::{Client, ClientId, ClientState, Heartbeat};
pub use core::{Core, Inner};
pub use room::{Room, RoomId, RoomState};
