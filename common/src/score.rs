use serde::{Deserialize, Serialize};

use crate::types::{Outcome, PlayerId};

/// Running tournament tally across an unbounded sequence of rounds.
/// Nothing here ever ends a session; the players stop when they stop.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Scoreboard {
    p1_wins: u32,
    p2_wins: u32,
    rounds_played: u32,
    streak_holder: Option<PlayerId>,
    streak_len: u32,
}

impl Scoreboard {
    pub fn record(&mut self, outcome: &Outcome) {
        self.rounds_played += 1;
        match outcome.winner {
            PlayerId::P1 => self.p1_wins += 1,
            PlayerId::P2 => self.p2_wins += 1,
        }
        if self.streak_holder == Some(outcome.winner) {
            self.streak_len += 1;
        } else {
            self.streak_holder = Some(outcome.winner);
            self.streak_len = 1;
        }
    }

    pub fn wins(&self, player: PlayerId) -> u32 {
        match player {
            PlayerId::P1 => self.p1_wins,
            PlayerId::P2 => self.p2_wins,
        }
    }

    pub fn rounds_played(&self) -> u32 {
        self.rounds_played
    }

    /// None while tied.
    pub fn leader(&self) -> Option<PlayerId> {
        match self.p1_wins.cmp(&self.p2_wins) {
            std::cmp::Ordering::Greater => Some(PlayerId::P1),
            std::cmp::Ordering::Less => Some(PlayerId::P2),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn streak(&self) -> Option<(PlayerId, u32)> {
        self.streak_holder.map(|p| (p, self.streak_len))
    }

    pub fn reset(&mut self) {
        *self = Scoreboard::default();
    }
}
