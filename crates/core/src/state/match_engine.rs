//! Round lifecycle: start a game, start a round, resolve a round (by moves
//! or by timeout), and end a game (§4.5, grounded on
//! `original_source/server/src/game.c`).

use std::time::Instant;

use crate::config::RoundRules;
use crate::state::client::ClientId;
use crate::state::core::Inner;
use crate::state::room::{Room, RoomId, RoomState};

fn send_to(inner: &mut Inner, id: ClientId, line: &str) {
    if let Some(client) = inner.clients.get_mut(id) {
        client.send_line(line);
    }
}

fn nick_of(inner: &Inner, id: ClientId) -> String {
    inner
        .clients
        .get(id)
        .map(|c| c.nick.clone())
        .unwrap_or_default()
}

/// Begin a match: both players must already occupy the room (§4.3 Full).
pub fn start_game(inner: &mut Inner, room_id: RoomId) {
    let Some(room) = inner.rooms.get_mut(room_id) else {
        return;
    };
    room.state = RoomState::Playing;
    room.round_number = 0;
    room.score_p1 = 0;
    room.score_p2 = 0;
    let (p1, p2) = (room.p1, room.p2);

    for id in [p1, p2].into_iter().flatten() {
        if let Some(client) = inner.clients.get_mut(id) {
            client.state = crate::state::client::ClientState::Playing;
            client.send_line("G_ST");
        }
    }

    start_next_round(inner, room_id);
}

/// Advance to the next round, resetting per-round move state (§4.5).
pub fn start_next_round(inner: &mut Inner, room_id: RoomId) {
    let Some(room) = inner.rooms.get_mut(room_id) else {
        return;
    };
    room.round_number += 1;
    room.move_p1 = None;
    room.move_p2 = None;
    room.round_start_time = Instant::now();
    room.awaiting_moves = true;
    let round = room.round_number;
    let (p1, p2) = (room.p1, room.p2);

    let line = format!("R_ST {round}");
    for id in [p1, p2].into_iter().flatten() {
        send_to(inner, id, &line);
    }
}

/// Called after a MOVE completes the pair; resolves the round and either
/// starts the next one or ends the game.
pub fn try_resolve(inner: &mut Inner, room_id: RoomId, rules: &RoundRules) {
    let ready = matches!(
        inner.rooms.get(room_id),
        Some(Room {
            move_p1: Some(_),
            move_p2: Some(_),
            ..
        })
    );
    if ready {
        resolve(inner, room_id, rules);
    }
}

fn resolve(inner: &mut Inner, room_id: RoomId, rules: &RoundRules) {
    let Some(room) = inner.rooms.get_mut(room_id) else {
        return;
    };
    room.awaiting_moves = false;
    let (p1, p2) = (room.p1.unwrap(), room.p2.unwrap());
    let (m1, m2) = (room.move_p1.unwrap(), room.move_p2.unwrap());

    let winner = if m1 == m2 {
        None
    } else if m1.beats(m2) {
        Some(p1)
    } else {
        Some(p2)
    };
    if let Some(winner) = winner {
        room.award_point(winner);
    }

    announce_round(inner, room_id, winner, false);
    after_round(inner, room_id, rules);
}

/// A round timed out with zero or one move submitted (§4.5, §4.7). The
/// player who *did* move wins the round; a double no-show is a draw.
pub fn handle_round_timeout(inner: &mut Inner, room_id: RoomId, rules: &RoundRules) {
    let Some(room) = inner.rooms.get_mut(room_id) else {
        return;
    };
    if room.state == RoomState::Paused {
        return;
    }
    room.awaiting_moves = false;
    let (p1, p2) = (room.p1.unwrap(), room.p2.unwrap());

    let winner = match (room.move_p1, room.move_p2) {
        (None, Some(_)) => Some(p2),
        (Some(_), None) => Some(p1),
        _ => None,
    };
    if let Some(winner) = winner {
        room.award_point(winner);
    }

    announce_round(inner, room_id, winner, true);
    after_round(inner, room_id, rules);
}

/// Send each player their own `R_RE` line, per-player-relative (§4.5, §8
/// scenario 1): own move/score first, then the opponent's.
fn announce_round(inner: &mut Inner, room_id: RoomId, winner: Option<ClientId>, timed_out: bool) {
    let Some(room) = inner.rooms.get(room_id) else {
        return;
    };
    let (p1, p2) = (room.p1.unwrap(), room.p2.unwrap());

    let winner_token = if timed_out {
        "T".to_string()
    } else {
        match winner {
            None => "DRAW".to_string(),
            Some(w) => nick_of(inner, w),
        }
    };

    for &(me, opp) in &[(p1, p2), (p2, p1)] {
        let room = inner.rooms.get(room_id).unwrap();
        let own_move = room.move_of(me).map(|m| m.as_char()).unwrap_or('X');
        let opp_move = room.move_of(opp).map(|m| m.as_char()).unwrap_or('X');
        let (own_score, opp_score) = room.scores_for(me);
        let line = format!("R_RE {winner_token} {own_move} {opp_move} {own_score} {opp_score}");
        send_to(inner, me, &line);
    }
}

fn after_round(inner: &mut Inner, room_id: RoomId, rules: &RoundRules) {
    let Some(room) = inner.rooms.get(room_id) else {
        return;
    };
    let game_over = room.score_p1 >= rules.win_threshold || room.score_p2 >= rules.win_threshold;
    if game_over {
        end_game(inner, room_id);
    } else {
        start_next_round(inner, room_id);
    }
}

/// End the match: announce the winner, return both players to Auth, and
/// release the room slot (§4.5). Whichever side has the higher score wins;
/// called only once [`after_round`] has confirmed the threshold was met.
pub fn end_game(inner: &mut Inner, room_id: RoomId) {
    let Some(room) = inner.rooms.get(room_id) else {
        return;
    };
    let (p1, p2) = (room.p1.unwrap(), room.p2.unwrap());
    let winner = if room.score_p1 >= room.score_p2 {
        p1
    } else {
        p2
    };
    let winner_nick = nick_of(inner, winner);

    let line = format!("G_END {winner_nick}");
    for id in [p1, p2] {
        send_to(inner, id, &line);
        if let Some(client) = inner.clients.get_mut(id) {
            client.state = crate::state::client::ClientState::Auth;
            client.room_id = None;
        }
    }

    inner.rooms.remove(room_id);
}
