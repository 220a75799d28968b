use std::io::{BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crate::protocol::codec::{Frame, read_frame};
use crate::protocol::dispatcher::{self, Outcome};
use crate::protocol::response::SERVER_FULL;
use crate::state::client::ClientId;
use crate::state::core::Core;
use crate::state::heartbeat;

/// Blocking TCP accept loop.
///
/// Checks the `running` flag between accepts with a 50ms poll interval so
/// that [`crate::server::Server::stop`] can terminate it promptly.
pub fn accept_loop(listener: TcpListener, core: Arc<Core>, running: Arc<AtomicBool>) {
    while running.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, _)) => {
                if stream.set_nonblocking(false).is_err() {
                    continue;
                }
                let core = core.clone();
                let running = running.clone();
                thread::spawn(move || Connection::handle(stream, core, running));
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(50));
            }
            Err(e) => {
                if running.load(Ordering::SeqCst) {
                    tracing::warn!(error = %e, "TCP accept error");
                }
            }
        }
    }
    tracing::debug!("accept loop exited");
}

/// A single session's connection lifecycle: register, read/dispatch loop,
/// terminal cleanup.
struct Connection {
    reader: BufReader<TcpStream>,
    peer_addr: SocketAddr,
}

impl Connection {
    /// Entry point: register a [`Client`](crate::state::client::Client) for
    /// this socket and run its command loop.
    pub fn handle(stream: TcpStream, core: Arc<Core>, running: Arc<AtomicBool>) {
        let peer_addr = match stream.peer_addr() {
            Ok(addr) => addr,
            Err(_) => return,
        };
        tracing::info!(%peer_addr, "client connected");

        let mut stream = stream;
        let write_handle = match stream.try_clone() {
            Ok(s) => s,
            Err(error) => {
                tracing::warn!(%peer_addr, %error, "failed to clone socket for writer handle");
                let _ = write!(
                    stream,
                    "{}\r\n",
                    crate::protocol::response::SERVER_ERROR.line("")
                );
                return;
            }
        };

        let id = {
            let mut guard = core.lock();
            guard.clients.register(write_handle)
        };
        let id = match id {
            Ok(id) => id,
            Err(_) => {
                let _ = write!(stream, "{}\r\n", SERVER_FULL.line(""));
                return;
            }
        };

        let mut conn = Connection {
            reader: BufReader::new(stream),
            peer_addr,
        };
        let reason = conn.run(id, &core, &running);

        {
            let mut guard = core.lock();
            // §4.8: a client parked in Soft heartbeat may still be adopted by a
            // RECONNECT within HARD seconds — leave its storage in place and let
            // the supervisor's hard-timeout path (or a future RECONNECT) finish
            // it off. Only tear down immediately for any other heartbeat state.
            let soft = guard
                .clients
                .get(id)
                .is_some_and(|c| c.heartbeat == crate::state::client::Heartbeat::Soft);
            if !soft {
                heartbeat::disconnect_cleanup(&mut guard, id);
            }
        }
        tracing::info!(%peer_addr, client = %id, reason, "client disconnected");
    }

    /// Command read/dispatch loop. Returns the reason for exiting.
    fn run(&mut self, id: ClientId, core: &Arc<Core>, running: &Arc<AtomicBool>) -> &'static str {
        while running.load(Ordering::SeqCst) {
            match read_frame(&mut self.reader) {
                Ok(Frame::Eof) => return "connection closed by client",
                Ok(Frame::Malformed) => {
                    let mut guard = core.lock();
                    // A malformed frame still counts against the invalid-command streak (§4.1, §4.4).
                    let outcome = dispatcher::dispatch(&mut guard, id, "", &core.config.rules);
                    drop(guard);
                    if outcome == Outcome::Disconnect {
                        return "too many invalid commands";
                    }
                }
                Ok(Frame::Line(line)) => {
                    tracing::debug!(peer = %self.peer_addr, %line, "command");
                    let mut guard = core.lock();
                    let outcome = dispatcher::dispatch(&mut guard, id, &line, &core.config.rules);
                    drop(guard);
                    if outcome == Outcome::Disconnect {
                        return "client quit";
                    }
                }
                Err(_) => return "read error",
            }
        }
        "server shutting down"
    }
}
