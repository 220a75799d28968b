//! Room (match slot) state (§3, §4.3 of the design).

use std::fmt;
use std::time::Instant;

use crate::error::{Result, RpsError};
use crate::state::client::ClientId;

/// Maximum number of simultaneously open rooms.
pub const MAX_ROOMS: usize = 64;

/// Non-zero, monotonically assigned room identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoomId(u64);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl RoomId {
    /// The raw numeric id as sent on the wire (`JOIN <id>`, `ROOM <id> ...`).
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Room state machine (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomState {
    Open,
    Full,
    Playing,
    Paused,
}

impl fmt::Display for RoomState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RoomState::Open => "OPEN",
            RoomState::Full => "FULL",
            RoomState::Playing => "PLAYING",
            RoomState::Paused => "PAUSED",
        };
        write!(f, "{s}")
    }
}

/// A single RPS move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    Rock,
    Paper,
    Scissors,
}

impl Move {
    pub fn parse(c: &str) -> Option<Self> {
        match c {
            "R" => Some(Move::Rock),
            "P" => Some(Move::Paper),
            "S" => Some(Move::Scissors),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Move::Rock => 'R',
            Move::Paper => 'P',
            Move::Scissors => 'S',
        }
    }

    /// `true` if `self` beats `other` under the canonical RPS cycle
    /// (rock beats scissors, paper beats rock, scissors beats paper).
    pub fn beats(self, other: Move) -> bool {
        matches!(
            (self, other),
            (Move::Rock, Move::Scissors)
                | (Move::Paper, Move::Rock)
                | (Move::Scissors, Move::Paper)
        )
    }
}

/// A match slot (§3). Holds up to two players by [`ClientId`] — indirect
/// references, never direct pointers to `Client`, so that removal or
/// RECONNECT adoption is a single-id rewrite rather than a borrow-checker
/// fight over shared ownership.
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub p1: Option<ClientId>,
    pub p2: Option<ClientId>,
    pub state: RoomState,
    pub round_number: u32,
    pub score_p1: u32,
    pub score_p2: u32,
    pub move_p1: Option<Move>,
    pub move_p2: Option<Move>,
    pub round_start_time: Instant,
    pub awaiting_moves: bool,
}

impl Room {
    fn new(id: RoomId, name: String) -> Self {
        Room {
            id,
            name,
            p1: None,
            p2: None,
            state: RoomState::Open,
            round_number: 0,
            score_p1: 0,
            score_p2: 0,
            move_p1: None,
            move_p2: None,
            round_start_time: Instant::now(),
            awaiting_moves: false,
        }
    }

    pub fn player_count(&self) -> usize {
        self.p1.is_some() as usize + self.p2.is_some() as usize
    }

    pub fn has_player(&self, id: ClientId) -> bool {
        self.p1 == Some(id) || self.p2 == Some(id)
    }

    pub fn opponent_of(&self, id: ClientId) -> Option<ClientId> {
        if self.p1 == Some(id) {
            self.p2
        } else if self.p2 == Some(id) {
            self.p1
        } else {
            None
        }
    }

    /// Score as seen from `id`'s own perspective: `(own, opponent)`.
    pub fn scores_for(&self, id: ClientId) -> (u32, u32) {
        if self.p1 == Some(id) {
            (self.score_p1, self.score_p2)
        } else {
            (self.score_p2, self.score_p1)
        }
    }

    pub fn score_of(&self, id: ClientId) -> u32 {
        if self.p1 == Some(id) {
            self.score_p1
        } else {
            self.score_p2
        }
    }

    pub fn award_point(&mut self, id: ClientId) {
        if self.p1 == Some(id) {
            self.score_p1 += 1;
        } else if self.p2 == Some(id) {
            self.score_p2 += 1;
        }
    }

    pub fn move_of(&self, id: ClientId) -> Option<Move> {
        if self.p1 == Some(id) {
            self.move_p1
        } else if self.p2 == Some(id) {
            self.move_p2
        } else {
            None
        }
    }

    pub fn set_move(&mut self, id: ClientId, mv: Move) {
        if self.p1 == Some(id) {
            self.move_p1 = Some(mv);
        } else if self.p2 == Some(id) {
            self.move_p2 = Some(mv);
        }
    }

    /// Rewrite any reference to `old` (used on RECONNECT adoption, §4.6).
    pub fn rebind_player(&mut self, old: ClientId, new: ClientId) {
        if self.p1 == Some(old) {
            self.p1 = Some(new);
        } else if self.p2 == Some(old) {
            self.p2 = Some(new);
        }
    }
}

/// Fixed-capacity table of rooms (§4.3).
pub struct RoomRegistry {
    slots: Vec<Option<Room>>,
    next_id: u64,
}

impl RoomRegistry {
    pub fn new() -> Self {
        let mut slots = Vec::with_capacity(MAX_ROOMS);
        slots.resize_with(MAX_ROOMS, || None);
        RoomRegistry { slots, next_id: 1 }
    }

    pub fn create(&mut self, name: &str) -> Result<RoomId> {
        let slot = self
            .slots
            .iter()
            .position(|s| s.is_none())
            .ok_or(RpsError::RoomRegistryFull)?;
        let id = RoomId(self.next_id);
        self.next_id += 1;
        self.slots[slot] = Some(Room::new(id, name.to_string()));
        Ok(id)
    }

    pub fn remove(&mut self, id: RoomId) {
        if let Some(slot) = self
            .slots
            .iter_mut()
            .find(|s| matches!(s, Some(r) if r.id == id))
        {
            *slot = None;
        }
    }

    pub fn get(&self, id: RoomId) -> Option<&Room> {
        self.slots.iter().flatten().find(|r| r.id == id)
    }

    pub fn get_mut(&mut self, id: RoomId) -> Option<&mut Room> {
        self.slots.iter_mut().flatten().find(|r| r.id == id)
    }

    pub fn find_by_player(&self, id: ClientId) -> Option<&Room> {
        self.slots.iter().flatten().find(|r| r.has_player(id))
    }

    pub fn find_by_raw_id(&self, raw: u64) -> Option<&Room> {
        self.slots.iter().flatten().find(|r| r.id.value() == raw)
    }

    pub fn find_by_player_mut(&mut self, id: ClientId) -> Option<&mut Room> {
        self.slots.iter_mut().flatten().find(|r| r.has_player(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Room> {
        self.slots.iter().flatten()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Room> {
        self.slots.iter_mut().flatten()
    }

    /// Add a player to a room (§4.3). Transitions Open → Full on the second
    /// join; returns the room's new state.
    pub fn add_player(&mut self, room_id: RoomId, client_id: ClientId) -> Option<RoomState> {
        let room = self.get_mut(room_id)?;
        if room.p1.is_none() {
            room.p1 = Some(client_id);
        } else if room.p2.is_none() {
            room.p2 = Some(client_id);
        } else {
            return None;
        }
        if room.player_count() == 2 {
            room.state = RoomState::Full;
        }
        Some(room.state)
    }

    /// Remove a player from a room. If one player remains, they are
    /// canonicalised into `p1` and the room returns to Open (§4.3).
    /// Returns the remaining occupant, if any.
    pub fn remove_player(&mut self, room_id: RoomId, client_id: ClientId) -> Option<ClientId> {
        let room = self.get_mut(room_id)?;
        if room.p1 == Some(client_id) {
            room.p1 = None;
        } else if room.p2 == Some(client_id) {
            room.p2 = None;
        }
        if room.p1.is_none() && room.p2.is_some() {
            room.p1 = room.p2.take();
        }
        room.state = RoomState::Open;
        room.p1
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}
