//! Client-facing protocol errors (§6, §7), grounded on `protocol/response.rs`'s
//! `RtspResponse` builder — but these never implement [`std::error::Error`]:
//! they are wire text, not a Rust error type, because the client stays
//! connected after receiving one (§7).

/// One entry of the `ERR <code> <KIND> [detail]` taxonomy (§6).
#[derive(Debug, Clone, Copy)]
pub struct ProtocolError {
    pub code: u32,
    pub kind: &'static str,
}

pub const BAD_FORMAT: ProtocolError = ProtocolError {
    code: 100,
    kind: "BAD_FORMAT",
};
pub const INVALID_STATE: ProtocolError = ProtocolError {
    code: 101,
    kind: "INVALID_STATE",
};
pub const UNKNOWN_ROOM: ProtocolError = ProtocolError {
    code: 104,
    kind: "UNKNOWN_ROOM",
};
pub const ROOM_WRONG_STATE: ProtocolError = ProtocolError {
    code: 106,
    kind: "ROOM_WRONG_STATE",
};
pub const NICKNAME_TAKEN: ProtocolError = ProtocolError {
    code: 107,
    kind: "NICKNAME_TAKEN",
};
pub const CANNOT_RECONNECT: ProtocolError = ProtocolError {
    code: 110,
    kind: "cannot_reconnect_now",
};
pub const SERVER_FULL: ProtocolError = ProtocolError {
    code: 200,
    kind: "SERVER_FULL",
};
pub const SERVER_ERROR: ProtocolError = ProtocolError {
    code: 500,
    kind: "SERVER_ERROR",
};

impl ProtocolError {
    /// Format as a complete `ERR` line, with an optional free-text detail.
    pub fn line(&self, detail: &str) -> String {
        if detail.is_empty() {
            format!("ERR {} {}", self.code, self.kind)
        } else {
            format!("ERR {} {} {}", self.code, self.kind, detail)
        }
    }
}
