//! Heartbeat / timeout supervisor (§4.7), grounded on
//! `original_source/server/src/server.c`'s `room_timeout_worker`,
//! `check_rooms` and `check_clients`.
//!
//! Runs on a single thread ticking at [`SUPERVISOR_TICK`], holding [`Core`]'s
//! lock for the whole tick — same granularity as every connection handler.

use std::time::Instant;

use crate::config::ServerConfig;
use crate::state::client::{ClientId, ClientState, Heartbeat};
use crate::state::core::{Core, Inner};
use crate::state::match_engine;
use crate::state::room::RoomState;

/// Run one supervisor pass: round timeouts, then per-client heartbeat
/// progression. Called on every tick from the dedicated timer thread
/// spawned by [`crate::server::Server::start`].
pub fn tick(core: &Core) {
    let mut guard = core.lock();
    check_rooms(&mut guard, &core.config);
    check_clients(&mut guard, &core.config);
}

fn check_rooms(inner: &mut Inner, config: &ServerConfig) {
    let now = Instant::now();
    let timed_out: Vec<_> = inner
        .rooms
        .iter()
        .filter(|r| {
            r.state == RoomState::Playing
                && r.awaiting_moves
                && now.duration_since(r.round_start_time) >= config.rules.round_timeout
        })
        .map(|r| r.id)
        .collect();

    for room_id in timed_out {
        match_engine::handle_round_timeout(inner, room_id, &config.rules);
    }
}

fn check_clients(inner: &mut Inner, config: &ServerConfig) {
    let now = Instant::now();

    let soft: Vec<ClientId> = inner
        .clients
        .iter()
        .filter(|c| {
            c.heartbeat == Heartbeat::Live && now.duration_since(c.last_seen) >= config.soft_timeout
        })
        .map(|c| c.id)
        .collect();
    for id in soft {
        tracing::debug!(client = %id, "soft timeout");
        if let Some(client) = inner.clients.get_mut(id) {
            client.heartbeat = Heartbeat::Soft;
        }
        soft_timeout_effects(inner, id);
        if let Some(client) = inner.clients.get(id) {
            client.shutdown_read();
        }
    }

    let hard: Vec<ClientId> = inner
        .clients
        .iter()
        .filter(|c| {
            c.heartbeat == Heartbeat::Soft && now.duration_since(c.last_seen) >= config.hard_timeout
        })
        .map(|c| c.id)
        .collect();
    for id in hard {
        tracing::debug!(client = %id, "hard timeout");
        if let Some(client) = inner.clients.get_mut(id) {
            client.heartbeat = Heartbeat::Hard;
            client.shutdown_read();
        }
        disconnect_cleanup(inner, id);
    }

    let ping: Vec<ClientId> = inner
        .clients
        .iter()
        .filter(|c| {
            c.heartbeat == Heartbeat::Live
                && now.duration_since(c.last_ping_sent) >= config.ping_interval
        })
        .map(|c| c.id)
        .collect();
    for id in ping {
        if let Some(client) = inner.clients.get_mut(id) {
            client.send_line("PING");
            client.last_ping_sent = now;
        }
    }
}

/// §4.7.a — side effects of entering the Soft heartbeat state, by client state.
fn soft_timeout_effects(inner: &mut Inner, id: ClientId) {
    let Some(state) = inner.clients.get(id).map(|c| c.state) else {
        return;
    };
    match state {
        ClientState::InLobby | ClientState::Ready => {
            if let Some(client) = inner.clients.get_mut(id) {
                client.state = ClientState::InLobby;
            }
            let nick = inner
                .clients
                .get(id)
                .map(|c| c.nick.clone())
                .unwrap_or_default();
            if let Some(room) = inner.rooms.find_by_player(id)
                && let Some(opp) = room.opponent_of(id)
                && let Some(opp_client) = inner.clients.get_mut(opp)
            {
                opp_client.send_line(&format!("OPP_INF {nick} N_R"));
            }
        }
        ClientState::Playing => {
            if let Some(room) = inner.rooms.find_by_player_mut(id) {
                room.state = RoomState::Paused;
                room.awaiting_moves = false;
                if let Some(opp) = room.opponent_of(id)
                    && let Some(opp_client) = inner.clients.get_mut(opp)
                {
                    opp_client.send_line("G_PAUSE");
                }
            }
        }
        _ => {}
    }
}

/// §4.7.b — hard-disconnect cleanup. Invoked from two places: the supervisor
/// at the hard-timeout point, and a connection worker's own terminal cleanup
/// (`crate::transport::tcp`) for any client whose heartbeat isn't Soft when
/// its read loop exits (a Soft client is left in place for a possible
/// RECONNECT instead, per §4.8).
pub fn hard_disconnect_cleanup(inner: &mut Inner, id: ClientId) {
    let Some(client) = inner.clients.get(id) else {
        return;
    };
    if client.replaced {
        return;
    }
    let state = client.state;

    match state {
        ClientState::InLobby | ClientState::Ready => {
            if let Some(room) = inner.rooms.find_by_player(id) {
                let room_id = room.id;
                let opp = room.opponent_of(id);
                inner.rooms.remove_player(room_id, id);
                if let Some(opp) = opp
                    && let Some(opp_client) = inner.clients.get_mut(opp)
                {
                    opp_client.state = ClientState::InLobby;
                    opp_client.send_line("OPP_INF NONE");
                }
            }
        }
        ClientState::Playing => {
            if let Some(room) = inner.rooms.find_by_player(id) {
                let room_id = room.id;
                if let Some(opp) = room.opponent_of(id)
                    && let Some(opp_client) = inner.clients.get_mut(opp)
                {
                    opp_client.send_line("G_END opp_l");
                    opp_client.state = ClientState::Auth;
                    opp_client.room_id = None;
                }
                inner.rooms.remove(room_id);
            }
        }
        _ => {}
    }
}

/// Full disconnect: §4.7.b cleanup followed by freeing the registry slot.
/// Used both for hard-timeout (above) and for a connection worker's own
/// EOF/error path (`crate::transport::tcp`) — a no-op if the slot is
/// already gone, which is exactly the case when the supervisor got there
/// first.
pub fn disconnect_cleanup(inner: &mut Inner, id: ClientId) {
    hard_disconnect_cleanup(inner, id);
    inner.clients.unregister(id);
}
