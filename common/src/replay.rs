use log::debug;
use thiserror::Error;

use crate::event_log::{LogEventKind, RoundLog};
use crate::types::{Outcome, Phase, PhaseChange};

/// Lead-in before the replayed trigger moment during which captured audio is
/// already playing, so the sound runs into the trigger as it did live.
pub const AUDIO_PRE_ROLL_MS: u64 = 500;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReplayLogError {
    #[error("log does not begin with a WaitingStarted entry")]
    MissingStart,
    #[error("log is not sealed with a RoundEnded entry")]
    Unsealed,
    #[error("log contains a duplicate or misplaced {0:?} entry")]
    Misplaced(LogEventKind),
    #[error("log timestamps regress at entry {index}")]
    OutOfOrder { index: usize },
}

/// Where captured audio should start so its trigger moment lines up with
/// the replayed round end.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioCue {
    /// Seek into the recording, in ms.
    pub seek_ms: u64,
    /// Virtual-timeline moment playback should begin, ms from replay start.
    pub start_at_virtual_ms: u64,
}

struct ReplayStep {
    at_ms: u64,
    phase: Phase,
    outcome: Option<Outcome>,
}

/// Re-presents one sealed round on a virtual timeline. Owns its copy of the
/// log and only ever reads it; randomness, the arbiter and the recorder are
/// never consulted, so replaying cannot perturb live state.
pub struct ReplaySession {
    log: RoundLog,
    started_at: u64,
    steps: Vec<ReplayStep>,
    next: usize,
    cancelled: bool,
    audio_cue: Option<AudioCue>,
}

impl ReplaySession {
    /// Validates the log and derives the virtual schedule. The Waiting step
    /// sits at virtual zero and is emitted by the first `tick`.
    pub fn new(log: RoundLog, now_ms: u64) -> Result<Self, ReplayLogError> {
        validate(&log)?;

        let mut steps = vec![ReplayStep {
            at_ms: 0,
            phase: Phase::Waiting,
            outcome: None,
        }];
        let mut audio_cue = None;
        for entry in log.entries() {
            match entry.kind {
                LogEventKind::WaitingStarted => {}
                LogEventKind::SignalShown => steps.push(ReplayStep {
                    at_ms: entry.at_ms,
                    phase: Phase::Signaled,
                    outcome: None,
                }),
                LogEventKind::RoundEnded => {
                    steps.push(ReplayStep {
                        at_ms: entry.at_ms,
                        phase: Phase::Ended,
                        outcome: entry.outcome.clone(),
                    });
                    if let Some(clip) = &entry.audio {
                        audio_cue = Some(AudioCue {
                            seek_ms: clip.trigger_offset_ms().saturating_sub(AUDIO_PRE_ROLL_MS),
                            start_at_virtual_ms: entry.at_ms.saturating_sub(AUDIO_PRE_ROLL_MS),
                        });
                    }
                }
            }
        }

        Ok(Self {
            log,
            started_at: now_ms,
            steps,
            next: 0,
            cancelled: false,
            audio_cue,
        })
    }

    /// Emits every step due at `now_ms`. Nothing is ever emitted after
    /// `cancel`.
    pub fn tick(&mut self, now_ms: u64) -> Vec<PhaseChange> {
        let mut out = Vec::new();
        if self.cancelled {
            return out;
        }
        let elapsed = now_ms.saturating_sub(self.started_at);
        while self.next < self.steps.len() && self.steps[self.next].at_ms <= elapsed {
            let step = &self.steps[self.next];
            out.push(PhaseChange {
                phase: step.phase,
                at_ms: step.at_ms,
                outcome: step.outcome.clone(),
                replayed: true,
            });
            self.next += 1;
        }
        out
    }

    pub fn finished(&self) -> bool {
        self.cancelled || self.next >= self.steps.len()
    }

    /// Idempotent. Pending steps and the audio cue are dropped for good.
    pub fn cancel(&mut self) {
        if !self.cancelled {
            debug!(
                "replay cancelled with {} step(s) pending",
                self.steps.len() - self.next
            );
        }
        self.cancelled = true;
    }

    pub fn audio_cue(&self) -> Option<&AudioCue> {
        if self.cancelled {
            None
        } else {
            self.audio_cue.as_ref()
        }
    }

    pub fn source_log(&self) -> &RoundLog {
        &self.log
    }
}

fn validate(log: &RoundLog) -> Result<(), ReplayLogError> {
    let entries = log.entries();
    match entries.first() {
        Some(e) if e.kind == LogEventKind::WaitingStarted => {}
        _ => return Err(ReplayLogError::MissingStart),
    }
    if !log.is_sealed() {
        return Err(ReplayLogError::Unsealed);
    }

    let mut seen_signal = false;
    let mut prev = 0u64;
    for (index, entry) in entries.iter().enumerate() {
        if entry.at_ms < prev {
            return Err(ReplayLogError::OutOfOrder { index });
        }
        prev = entry.at_ms;
        match entry.kind {
            LogEventKind::WaitingStarted => {
                if index != 0 {
                    return Err(ReplayLogError::Misplaced(LogEventKind::WaitingStarted));
                }
            }
            LogEventKind::SignalShown => {
                if seen_signal {
                    return Err(ReplayLogError::Misplaced(LogEventKind::SignalShown));
                }
                seen_signal = true;
            }
            LogEventKind::RoundEnded => {
                if index + 1 != entries.len() {
                    return Err(ReplayLogError::Misplaced(LogEventKind::RoundEnded));
                }
            }
        }
    }
    Ok(())
}
