use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::types::{ActionSource, Outcome};

#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum LogEventKind {
    WaitingStarted,
    SignalShown,
    RoundEnded,
}

/// Opaque captured-audio payload riding on a finished round. The core never
/// decodes it; the stamps exist so a replay can line playback up with the
/// moment that ended the round.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AudioClip {
    pub data: Vec<u8>,
    /// Engine-timeline stamp at which the recording began.
    pub recording_started_at_ms: u64,
    /// Engine-timeline stamp of the moment that triggered the round's end.
    pub trigger_at_ms: u64,
}

impl AudioClip {
    /// Offset of the trigger moment inside the recording itself.
    pub fn trigger_offset_ms(&self) -> u64 {
        self.trigger_at_ms.saturating_sub(self.recording_started_at_ms)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogEntry {
    pub kind: LogEventKind,
    /// Time since the round's WaitingStarted origin. Non-decreasing.
    pub at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ActionSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioClip>,
}

impl LogEntry {
    pub fn waiting_started() -> Self {
        Self {
            kind: LogEventKind::WaitingStarted,
            at_ms: 0,
            outcome: None,
            source: None,
            audio: None,
        }
    }

    pub fn signal_shown(at_ms: u64) -> Self {
        Self {
            kind: LogEventKind::SignalShown,
            at_ms,
            outcome: None,
            source: None,
            audio: None,
        }
    }

    pub fn round_ended(
        at_ms: u64,
        outcome: Outcome,
        source: ActionSource,
        audio: Option<AudioClip>,
    ) -> Self {
        Self {
            kind: LogEventKind::RoundEnded,
            at_ms,
            outcome: Some(outcome),
            source: Some(source),
            audio,
        }
    }
}

/// Append-only record of one round. Sealed once RoundEnded lands; a sealed
/// log drops further appends instead of erroring, since those only arise
/// from input races the engine already decided.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoundLog {
    entries: Vec<LogEntry>,
}

impl RoundLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, entry: LogEntry) {
        if self.is_sealed() {
            log::debug!("dropping append to sealed round log: {:?}", entry.kind);
            return;
        }
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn is_sealed(&self) -> bool {
        matches!(self.entries.last(), Some(e) if e.kind == LogEventKind::RoundEnded)
    }

    pub fn ended_entry(&self) -> Option<&LogEntry> {
        self.entries
            .iter()
            .find(|e| e.kind == LogEventKind::RoundEnded)
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.ended_entry().and_then(|e| e.outcome.as_ref())
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).context("failed to serialize round log")
    }

    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str(s).context("failed to parse round log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PlayerId, WinReason};

    fn outcome() -> Outcome {
        Outcome {
            winner: PlayerId::P1,
            reason: WinReason::Reaction,
            reaction_latency_ms: 300,
        }
    }

    #[test]
    fn sealing_drops_later_appends() {
        let mut log = RoundLog::new();
        log.append(LogEntry::waiting_started());
        log.append(LogEntry::signal_shown(2000));
        assert!(!log.is_sealed());
        log.append(LogEntry::round_ended(2300, outcome(), ActionSource::Key, None));
        assert!(log.is_sealed());

        log.append(LogEntry::signal_shown(9999));
        assert_eq!(log.entries().len(), 3);
    }

    #[test]
    fn outcome_is_read_from_the_terminal_entry() {
        let mut log = RoundLog::new();
        log.append(LogEntry::waiting_started());
        log.append(LogEntry::round_ended(150, outcome(), ActionSource::Touch, None));
        assert_eq!(log.outcome().unwrap().winner, PlayerId::P1);
    }

    #[test]
    fn json_round_trip_preserves_audio_stamps() {
        let clip = AudioClip {
            data: vec![1, 2, 3],
            recording_started_at_ms: 500,
            trigger_at_ms: 3000,
        };
        let mut log = RoundLog::new();
        log.append(LogEntry::waiting_started());
        log.append(LogEntry::round_ended(
            2500,
            outcome(),
            ActionSource::Voice,
            Some(clip.clone()),
        ));

        let decoded = RoundLog::from_json(&log.to_json().unwrap()).unwrap();
        assert_eq!(decoded, log);
        assert_eq!(
            decoded.ended_entry().unwrap().audio.as_ref().unwrap(),
            &clip
        );
        assert_eq!(clip.trigger_offset_ms(), 2500);
    }
}
