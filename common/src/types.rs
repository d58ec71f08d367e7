use core::fmt;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PlayerId {
    P1,
    P2,
}

impl PlayerId {
    pub fn opponent(self) -> PlayerId {
        match self {
            PlayerId::P1 => PlayerId::P2,
            PlayerId::P2 => PlayerId::P1,
        }
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PlayerId::P1 => "P1",
            PlayerId::P2 => "P2",
        };
        write!(f, "{}", s)
    }
}

/// Where a round currently is. Monotonic within a round: Idle -> Waiting ->
/// Signaled -> Ended, with Signaled skipped on a false start. Only a new
/// round or an explicit reset moves it back.
#[derive(Copy, Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Waiting,
    Signaled,
    Ended,
}

#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum WinReason {
    Reaction,
    FalseStart,
}

/// Which input channel delivered an action.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum ActionSource {
    Touch,
    Key,
    Voice,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Outcome {
    pub winner: PlayerId,
    pub reason: WinReason,
    pub reaction_latency_ms: u64,
}

/// Notification pushed to presentation subscribers on every transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhaseChange {
    pub phase: Phase,
    /// Milliseconds since the round started (live) or since the replay's
    /// virtual origin (replayed).
    pub at_ms: u64,
    /// Present only on the Ended transition.
    pub outcome: Option<Outcome>,
    /// True when this transition comes from a replay, not a live round.
    pub replayed: bool,
}
