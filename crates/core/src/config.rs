//! Tunable match/heartbeat parameters (§2.1), bundled the way the teacher's
//! `server.rs` bundles `ServerConfig` — named fields with a `Default` impl
//! matching the literal defaults, overridable by the CLI binary — rather
//! than constants scattered through the match engine and supervisor.

use std::time::Duration;

/// Round/match constants (§4.5).
#[derive(Debug, Clone, Copy)]
pub struct RoundRules {
    /// Score needed to win a match.
    pub win_threshold: u32,
    /// How long a round waits for both moves before timing out.
    pub round_timeout: Duration,
}

impl Default for RoundRules {
    fn default() -> Self {
        RoundRules {
            win_threshold: 5,
            round_timeout: Duration::from_secs(10),
        }
    }
}

/// Heartbeat/timeout constants (§4.7) plus the round rules, passed down to
/// [`crate::state::heartbeat`] and [`crate::state::match_engine`].
#[derive(Debug, Clone, Copy)]
pub struct ServerConfig {
    pub rules: RoundRules,
    /// Supervisor tick period.
    pub supervisor_tick: Duration,
    /// How often a Live client is sent an unsolicited `PING`.
    pub ping_interval: Duration,
    /// Elapsed time since `last_seen` before a Live client goes Soft.
    pub soft_timeout: Duration,
    /// Elapsed time since `last_seen` before a Soft client goes Hard.
    pub hard_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            rules: RoundRules::default(),
            supervisor_tick: Duration::from_millis(200),
            ping_interval: Duration::from_secs(3),
            soft_timeout: Duration::from_secs(6),
            hard_timeout: Duration::from_secs(45),
        }
    }
}
