use std::net::TcpListener;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crate::config::ServerConfig;
use crate::error::{Result, RpsError};
use crate::state::core::Core;
use crate::state::heartbeat;
use crate::transport::tcp;

/// Orchestrates the two long-running threads a match server needs: the TCP
/// accept loop and the heartbeat supervisor. Both share one [`Core`] behind
/// an `Arc`.
pub struct Server {
    core: Arc<Core>,
    running: Arc<AtomicBool>,
    bind_addr: String,
}

impl Server {
    pub fn new(bind_addr: &str) -> Self {
        Self::with_config(bind_addr, ServerConfig::default())
    }

    /// Create a server with custom round/heartbeat tuning (§2.1).
    pub fn with_config(bind_addr: &str, config: ServerConfig) -> Self {
        Server {
            core: Arc::new(Core::new(config)),
            running: Arc::new(AtomicBool::new(false)),
            bind_addr: bind_addr.to_string(),
        }
    }

    /// Bind the listening socket and spawn the accept loop and supervisor
    /// threads. Returns once both are running.
    pub fn start(&mut self) -> Result<()> {
        if self.running.load(Ordering::SeqCst) {
            return Err(RpsError::AlreadyRunning);
        }

        let listener = TcpListener::bind(&self.bind_addr)?;
        listener.set_nonblocking(true)?;

        self.running.store(true, Ordering::SeqCst);

        let core = self.core.clone();
        let running = self.running.clone();
        tracing::info!(addr = %self.bind_addr, "match server listening");
        thread::spawn(move || tcp::accept_loop(listener, core, running));

        let core = self.core.clone();
        let running = self.running.clone();
        thread::spawn(move || supervisor_loop(core, running));

        Ok(())
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        tracing::info!("server stopping");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Shared handle to all session/match state, for tests and embedders
    /// that want to inspect state without going through the wire protocol.
    pub fn core(&self) -> Arc<Core> {
        self.core.clone()
    }
}

/// Ticks the heartbeat supervisor at [`ServerConfig::supervisor_tick`] until
/// told to stop.
fn supervisor_loop(core: Arc<Core>, running: Arc<AtomicBool>) {
    let tick_period = core.config.supervisor_tick;
    while running.load(Ordering::SeqCst) {
        heartbeat::tick(&core);
        thread::sleep(tick_period);
    }
    tracing::debug!("supervisor loop exited");
}
