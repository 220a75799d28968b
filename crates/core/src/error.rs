//! Internal error types for the match server library.
//!
//! These are *not* the client-facing protocol errors (the `ERR <code> <KIND>
//! [detail]` wire responses described in [`crate::protocol::response`]) — those
//! never implement [`std::error::Error`] and are formatted directly onto the
//! wire. This type covers failures that keep the server itself from running:
//! bind failures, and the two registries reporting they are at capacity.
#[derive(Debug, thiserror::Error)]
pub enum RpsError {
    /// Underlying I/O or socket error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// [`Server::start`](crate::server::Server::start) was called while already running.
    #[error("server already running")]
    AlreadyRunning,

    /// The client registry has no free slot (at capacity).
    #[error("client registry full")]
    ClientRegistryFull,

    /// The room registry has no free slot (at capacity).
    #[error("room registry full")]
    RoomRegistryFull,
}

/// Convenience alias for `Result<T, RpsError>`.
pub type Result<T> = std::result::Result<T, RpsError>;
