//! The single locked aggregate of all mutable server state (§5, §9).
//!
//! A handler or the supervisor acquires [`Core::lock`] once and performs a
//! whole logical transition — reading and writing both the client registry
//! and the room registry — before releasing it. This is the one coarse lock
//! the design calls for: the teacher's per-entity `parking_lot::RwLock`
//! pattern doesn't compose here, because nearly every transition touches a
//! client and its opponent's room together and must be atomic with respect
//! to every other connection and the heartbeat supervisor.

use parking_lot::{Mutex, MutexGuard};

use crate::config::ServerConfig;
use crate::state::client::ClientRegistry;
use crate::state::room::RoomRegistry;

/// Everything guarded by [`Core`]'s lock.
pub struct Inner {
    pub clients: ClientRegistry,
    pub rooms: RoomRegistry,
}

/// Shared, lockable handle to all server state. In this crate a single
/// `Core` is constructed once in [`crate::server::Server`], wrapped in an
/// `Arc`, and shared across the accept loop, every connection worker, and
/// the heartbeat supervisor thread.
///
/// `config` is immutable for the server's lifetime, so it sits outside the
/// lock — every reader sees the same value without contention.
pub struct Core {
    inner: Mutex<Inner>,
    pub config: ServerConfig,
}

impl Core {
    pub fn new(config: ServerConfig) -> Self {
        Core {
            inner: Mutex::new(Inner {
                clients: ClientRegistry::new(),
                rooms: RoomRegistry::new(),
            }),
            config,
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock()
    }
}

impl Default for Core {
    fn default() -> Self {
        Self::new(ServerConfig::default())
    }
}
