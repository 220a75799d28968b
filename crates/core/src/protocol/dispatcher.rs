//! Per-verb command handlers (§4.4), grounded on `protocol/handler.rs`'s
//! `MethodHandler::handle` dispatch and on
//! `original_source/server/src/commands.c`'s `handle_*` functions.
//!
//! Every function here runs while the caller holds [`Core`](crate::state::Core)'s
//! lock for the whole transition (§5).

use std::time::Instant;

use crate::config::RoundRules;
use crate::protocol::command::Command;
use crate::protocol::response::{
    self, BAD_FORMAT, CANNOT_RECONNECT, INVALID_STATE, NICKNAME_TAKEN, ROOM_WRONG_STATE,
    SERVER_FULL, UNKNOWN_ROOM,
};
use crate::state::client::{Client, ClientId, ClientState};
use crate::state::core::Inner;
use crate::state::match_engine;
use crate::state::room::RoomState;

/// What the connection worker should do after a dispatched command.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    Disconnect,
}

const NICK_MAX: usize = 32;
const ROOM_NAME_MAX: usize = 32;

fn reply(inner: &mut Inner, id: ClientId, line: &str) {
    if let Some(client) = inner.clients.get_mut(id) {
        client.send_line(line);
    }
}

fn fail(inner: &mut Inner, id: ClientId, err: response::ProtocolError, detail: &str) -> Outcome {
    let line = err.line(detail);
    let force_close = inner
        .clients
        .get_mut(id)
        .map(|c| {
            c.send_line(&line);
            c.mark_invalid()
        })
        .unwrap_or(false);
    if force_close {
        Outcome::Disconnect
    } else {
        Outcome::Continue
    }
}

fn ok(inner: &mut Inner, id: ClientId) -> Outcome {
    if let Some(client) = inner.clients.get_mut(id) {
        client.reset_invalid_streak();
    }
    Outcome::Continue
}

/// Parse and route one already-framed line (§4.4).
pub fn dispatch(inner: &mut Inner, id: ClientId, line: &str, rules: &RoundRules) -> Outcome {
    if let Some(client) = inner.clients.get_mut(id) {
        client.last_seen = Instant::now();
    }

    match Command::parse(line) {
        Command::Hello(nick) => handle_hello(inner, id, nick),
        Command::List => handle_list(inner, id),
        Command::Create(name) => handle_create(inner, id, name),
        Command::Join(raw_id) => handle_join(inner, id, raw_id),
        Command::Ready => handle_ready(inner, id),
        Command::Leave => handle_leave(inner, id),
        Command::Move(mv) => handle_move(inner, id, mv, rules),
        Command::GetOpp => handle_get_opp(inner, id),
        Command::Reconnect(token) => handle_reconnect(inner, id, token),
        Command::Pong => ok(inner, id),
        Command::Quit => {
            reply(inner, id, "OK bye");
            Outcome::Disconnect
        }
        Command::BadArgs => fail(inner, id, BAD_FORMAT, "bad_args"),
        Command::Unknown => fail(inner, id, BAD_FORMAT, "unknown_command"),
    }
}

fn state_of(inner: &Inner, id: ClientId) -> Option<ClientState> {
    inner.clients.get(id).map(|c| c.state)
}

fn handle_hello(inner: &mut Inner, id: ClientId, nick: String) -> Outcome {
    if state_of(inner, id) != Some(ClientState::Connected) {
        return fail(inner, id, INVALID_STATE, "");
    }
    if nick.is_empty() || nick.len() > NICK_MAX {
        return fail(inner, id, BAD_FORMAT, "nick_too_long");
    }
    if inner.clients.find_by_name(&nick).is_some() {
        return fail(inner, id, NICKNAME_TAKEN, &nick);
    }

    let token = Client::generate_token();
    if let Some(client) = inner.clients.get_mut(id) {
        client.nick = nick;
        client.token = token.clone();
        client.state = ClientState::Auth;
    }
    reply(inner, id, &format!("WELCOME {token}"));
    ok(inner, id)
}

/// Shared by LIST and RECONNECT's Auth-state snapshot (§4.4, §4.6 step 4).
fn list_lines(inner: &Inner) -> Vec<String> {
    let rooms: Vec<_> = inner.rooms.iter().collect();
    let mut lines = Vec::with_capacity(rooms.len() + 1);
    lines.push(format!("R_LIST {}", rooms.len()));
    for room in rooms {
        lines.push(format!(
            "ROOM {} {} {}/2 {}",
            room.id,
            room.name,
            room.player_count(),
            room.state
        ));
    }
    lines
}

fn handle_list(inner: &mut Inner, id: ClientId) -> Outcome {
    if state_of(inner, id) != Some(ClientState::Auth) {
        return fail(inner, id, INVALID_STATE, "");
    }
    for line in list_lines(inner) {
        reply(inner, id, &line);
    }
    ok(inner, id)
}

fn handle_create(inner: &mut Inner, id: ClientId, name: String) -> Outcome {
    if state_of(inner, id) != Some(ClientState::Auth) {
        return fail(inner, id, INVALID_STATE, "");
    }
    if name.is_empty() || name.len() > ROOM_NAME_MAX {
        return fail(inner, id, BAD_FORMAT, "bad_room_name");
    }
    match inner.rooms.create(&name) {
        Ok(room_id) => {
            inner.rooms.add_player(room_id, id);
            if let Some(client) = inner.clients.get_mut(id) {
                client.room_id = Some(room_id);
                client.state = ClientState::InLobby;
            }
            reply(inner, id, &format!("R_CREATED {room_id}"));
            ok(inner, id)
        }
        Err(_) => fail(inner, id, SERVER_FULL, ""),
    }
}

fn handle_join(inner: &mut Inner, id: ClientId, raw_id: u64) -> Outcome {
    if state_of(inner, id) != Some(ClientState::Auth) {
        return fail(inner, id, INVALID_STATE, "");
    }
    let Some(room) = inner.rooms.find_by_raw_id(raw_id) else {
        return fail(inner, id, UNKNOWN_ROOM, "");
    };
    if room.state != RoomState::Open {
        return fail(inner, id, ROOM_WRONG_STATE, "");
    }
    let room_id = room.id;

    let new_state = inner.rooms.add_player(room_id, id);
    if let Some(client) = inner.clients.get_mut(id) {
        client.room_id = Some(room_id);
        client.state = ClientState::InLobby;
    }
    reply(inner, id, &format!("R_JOINED {room_id}"));

    if new_state == Some(RoomState::Full) {
        let nick = inner
            .clients
            .get(id)
            .map(|c| c.nick.clone())
            .unwrap_or_default();
        if let Some(opp) = inner.rooms.get(room_id).and_then(|r| r.opponent_of(id)) {
            reply(inner, opp, &format!("P_JOINED {nick}"));
        }
    }
    ok(inner, id)
}

fn handle_ready(inner: &mut Inner, id: ClientId) -> Outcome {
    if state_of(inner, id) != Some(ClientState::InLobby) {
        return fail(inner, id, INVALID_STATE, "");
    }
    let Some(room_id) = inner.rooms.find_by_player(id).map(|r| r.id) else {
        return fail(inner, id, INVALID_STATE, "");
    };

    if let Some(client) = inner.clients.get_mut(id) {
        client.state = ClientState::Ready;
    }
    reply(inner, id, "OK you_are_ready");

    let opp = inner.rooms.get(room_id).and_then(|r| r.opponent_of(id));
    let opp_ready = opp.is_some_and(|o| state_of(inner, o) == Some(ClientState::Ready));

    if opp_ready {
        match_engine::start_game(inner, room_id);
    } else if let Some(opp) = opp {
        let nick = inner
            .clients
            .get(id)
            .map(|c| c.nick.clone())
            .unwrap_or_default();
        reply(inner, opp, &format!("P_READY {nick}"));
    }
    ok(inner, id)
}

fn handle_leave(inner: &mut Inner, id: ClientId) -> Outcome {
    let state = state_of(inner, id);
    if !matches!(state, Some(ClientState::InLobby) | Some(ClientState::Ready)) {
        return fail(inner, id, INVALID_STATE, "");
    }
    let Some(room) = inner.rooms.find_by_player(id) else {
        return fail(inner, id, INVALID_STATE, "");
    };
    let room_id = room.id;
    if !matches!(room.state, RoomState::Open | RoomState::Full) {
        return fail(inner, id, ROOM_WRONG_STATE, "");
    }
    let opp = room.opponent_of(id);

    inner.rooms.remove_player(room_id, id);
    if let Some(client) = inner.clients.get_mut(id) {
        client.state = ClientState::Auth;
        client.room_id = None;
    }
    reply(inner, id, &format!("OK left_room {room_id}"));

    if let Some(opp) = opp {
        if let Some(opp_client) = inner.clients.get_mut(opp) {
            opp_client.state = ClientState::InLobby;
        }
        reply(inner, opp, "OPP_INF NONE");
    }
    ok(inner, id)
}

fn handle_move(
    inner: &mut Inner,
    id: ClientId,
    mv: crate::state::room::Move,
    rules: &RoundRules,
) -> Outcome {
    if state_of(inner, id) != Some(ClientState::Playing) {
        return fail(inner, id, INVALID_STATE, "");
    }
    let Some(room) = inner.rooms.find_by_player(id) else {
        return fail(inner, id, INVALID_STATE, "");
    };
    let room_id = room.id;
    if room.state != RoomState::Playing || !room.awaiting_moves {
        return fail(inner, id, ROOM_WRONG_STATE, "");
    }
    if room.move_of(id).is_some() {
        return fail(inner, id, INVALID_STATE, "already_moved");
    }

    if let Some(room) = inner.rooms.get_mut(room_id) {
        room.set_move(id, mv);
    }
    reply(inner, id, "M_ACC");
    let result = ok(inner, id);
    match_engine::try_resolve(inner, room_id, rules);
    result
}

fn handle_get_opp(inner: &mut Inner, id: ClientId) -> Outcome {
    let state = state_of(inner, id);
    if !matches!(state, Some(ClientState::InLobby) | Some(ClientState::Ready)) {
        return fail(inner, id, INVALID_STATE, "");
    }
    match inner
        .rooms
        .find_by_player(id)
        .and_then(|r| r.opponent_of(id))
    {
        None => reply(inner, id, "OPP_INF NONE"),
        Some(opp) => {
            let nick = inner
                .clients
                .get(opp)
                .map(|c| c.nick.clone())
                .unwrap_or_default();
            let status = if state_of(inner, opp) == Some(ClientState::Ready) {
                "READY"
            } else {
                "NOT_READY"
            };
            reply(inner, id, &format!("OPP_INF {nick} {status}"));
        }
    }
    ok(inner, id)
}

/// §4.6 RECONNECT — adopt a soft-timed-out session's identity.
fn handle_reconnect(inner: &mut Inner, id: ClientId, token: String) -> Outcome {
    if state_of(inner, id) != Some(ClientState::Connected) {
        return fail(inner, id, INVALID_STATE, "");
    }
    let Some(old_id) = inner.clients.find_by_token(&token).map(|c| c.id) else {
        return fail(inner, id, CANNOT_RECONNECT, "");
    };
    let soft = inner
        .clients
        .get(old_id)
        .map(|c| c.heartbeat == crate::state::client::Heartbeat::Soft)
        .unwrap_or(false);
    if !soft {
        return fail(inner, id, CANNOT_RECONNECT, "");
    }

    let (nick, adopted_state, room_id, invalid_streak) = {
        let old = inner.clients.get(old_id).unwrap();
        (old.nick.clone(), old.state, old.room_id, old.invalid_streak)
    };
    if let Some(old) = inner.clients.get_mut(old_id) {
        old.replaced = true;
    }

    if let Some(client) = inner.clients.get_mut(id) {
        client.nick = nick;
        client.token = token;
        client.state = adopted_state;
        client.room_id = room_id;
        client.invalid_streak = invalid_streak;
        client.heartbeat = crate::state::client::Heartbeat::Live;
        client.last_seen = Instant::now();
    }
    if let Some(room_id) = room_id
        && let Some(room) = inner.rooms.get_mut(room_id)
    {
        room.rebind_player(old_id, id);
    }
    inner.clients.unregister(old_id);

    match adopted_state {
        ClientState::Auth => {
            reply(inner, id, "REC_OK C");
            for line in list_lines(inner) {
                reply(inner, id, &line);
            }
        }
        ClientState::InLobby | ClientState::Ready => {
            reply(inner, id, "REC_OK L");
        }
        ClientState::Playing => {
            if let Some(room_id) = room_id {
                let opp = inner.rooms.get(room_id).and_then(|r| r.opponent_of(id));
                if let Some(room) = inner.rooms.get_mut(room_id) {
                    room.state = RoomState::Playing;
                    room.awaiting_moves = true;
                    room.round_start_time = Instant::now();
                }
                let room = inner.rooms.get(room_id).unwrap();
                let (round, score_p1, score_p2) = (room.round_number, room.score_p1, room.score_p2);
                let own_marker = if room.move_of(id).is_some() { 'X' } else { '0' };
                reply(
                    inner,
                    id,
                    &format!("REC_OK G {score_p1} {score_p2} {round} {own_marker}"),
                );
                if let Some(opp) = opp {
                    reply(
                        inner,
                        opp,
                        &format!("G_RES {round} {score_p1} {score_p2} {own_marker}"),
                    );
                }
            }
        }
        ClientState::Connected => {}
    }

    ok(inner, id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::client::ClientRegistry;
    use crate::state::room::RoomRegistry;
    use std::net::{TcpListener, TcpStream};

    fn dummy_stream() -> TcpStream {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let s = TcpStream::connect(addr).unwrap();
        listener.accept().unwrap();
        s
    }

    fn new_inner() -> Inner {
        Inner {
            clients: ClientRegistry::new(),
            rooms: RoomRegistry::new(),
        }
    }

    fn d(inner: &mut Inner, id: ClientId, line: &str) -> Outcome {
        dispatch(inner, id, line, &RoundRules::default())
    }

    #[test]
    fn hello_transitions_to_auth() {
        let mut inner = new_inner();
        let id = inner.clients.register(dummy_stream()).unwrap();
        let outcome = d(&mut inner, id, "HELLO alice");
        assert_eq!(outcome, Outcome::Continue);
        assert_eq!(state_of(&inner, id), Some(ClientState::Auth));
    }

    #[test]
    fn duplicate_nick_rejected() {
        let mut inner = new_inner();
        let a = inner.clients.register(dummy_stream()).unwrap();
        let b = inner.clients.register(dummy_stream()).unwrap();
        d(&mut inner, a, "HELLO alice");
        d(&mut inner, b, "HELLO alice");
        assert_eq!(state_of(&inner, b), Some(ClientState::Connected));
    }

    #[test]
    fn create_and_join_reaches_full() {
        let mut inner = new_inner();
        let a = inner.clients.register(dummy_stream()).unwrap();
        let b = inner.clients.register(dummy_stream()).unwrap();
        d(&mut inner, a, "HELLO alice");
        d(&mut inner, b, "HELLO bob");
        d(&mut inner, a, "CREATE arena");
        let room_id = inner.rooms.iter().next().unwrap().id;
        d(&mut inner, b, &format!("JOIN {room_id}"));
        assert_eq!(inner.rooms.get(room_id).unwrap().state, RoomState::Full);
    }

    #[test]
    fn ready_from_both_starts_game() {
        let mut inner = new_inner();
        let a = inner.clients.register(dummy_stream()).unwrap();
        let b = inner.clients.register(dummy_stream()).unwrap();
        d(&mut inner, a, "HELLO alice");
        d(&mut inner, b, "HELLO bob");
        d(&mut inner, a, "CREATE arena");
        let room_id = inner.rooms.iter().next().unwrap().id;
        d(&mut inner, b, &format!("JOIN {room_id}"));
        d(&mut inner, a, "READY");
        d(&mut inner, b, "READY");
        assert_eq!(inner.rooms.get(room_id).unwrap().state, RoomState::Playing);
        assert_eq!(state_of(&inner, a), Some(ClientState::Playing));
    }

    #[test]
    fn three_invalid_commands_force_disconnect() {
        let mut inner = new_inner();
        let id = inner.clients.register(dummy_stream()).unwrap();
        assert_eq!(d(&mut inner, id, "NOPE"), Outcome::Continue);
        assert_eq!(d(&mut inner, id, "NOPE"), Outcome::Continue);
        assert_eq!(d(&mut inner, id, "NOPE"), Outcome::Disconnect);
    }

    #[test]
    fn move_twice_in_one_round_is_rejected() {
        let mut inner = new_inner();
        let a = inner.clients.register(dummy_stream()).unwrap();
        let b = inner.clients.register(dummy_stream()).unwrap();
        d(&mut inner, a, "HELLO alice");
        d(&mut inner, b, "HELLO bob");
        d(&mut inner, a, "CREATE arena");
        let room_id = inner.rooms.iter().next().unwrap().id;
        d(&mut inner, b, &format!("JOIN {room_id}"));
        d(&mut inner, a, "READY");
        d(&mut inner, b, "READY");
        d(&mut inner, a, "MOVE R");
        let before = inner.rooms.get(room_id).unwrap().move_p1;
        d(&mut inner, a, "MOVE P");
        assert_eq!(inner.rooms.get(room_id).unwrap().move_p1, before);
    }

    #[test]
    fn quit_signals_disconnect() {
        let mut inner = new_inner();
        let id = inner.clients.register(dummy_stream()).unwrap();
        assert_eq!(d(&mut inner, id, "QUIT"), Outcome::Disconnect);
    }
}
