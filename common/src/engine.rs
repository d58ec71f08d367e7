use log::{debug, info};

use crate::arbiter;
use crate::config::RoundConfig;
use crate::event_log::{AudioClip, LogEntry, RoundLog};
use crate::types::{ActionSource, Outcome, Phase, PhaseChange, PlayerId};
use crate::util::PseudoRandom;

/// The round state machine. Time never comes from the environment: every
/// operation takes the caller's `now_ms`, and the GO signal is a stored
/// deadline fired from `tick`. Transitions hand back the `PhaseChange` the
/// host should publish; invalid calls answer None and change nothing.
pub struct RoundEngine {
    phase: Phase,
    started_at: Option<u64>,
    signal_at: Option<u64>,
    /// Pending one-shot signal deadline. Cleared on any transition out of
    /// Waiting; the phase guard in `fire_signal` backs that up.
    signal_due: Option<u64>,
    outcome: Option<Outcome>,
    log: RoundLog,
    pending_audio: Option<AudioClip>,
    rng: PseudoRandom,
}

impl RoundEngine {
    pub fn new(seed: u64) -> Self {
        Self {
            phase: Phase::Idle,
            started_at: None,
            signal_at: None,
            signal_due: None,
            outcome: None,
            log: RoundLog::new(),
            pending_audio: None,
            rng: PseudoRandom::new(seed),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    pub fn log(&self) -> &RoundLog {
        &self.log
    }

    pub fn signal_at_ms(&self) -> Option<u64> {
        self.signal_at
    }

    /// Begins a fresh round, superseding whatever came before: a deadline
    /// still pending from the previous round is cancelled here so it can
    /// never signal into the new one.
    pub fn start_round(&mut self, cfg: &RoundConfig, now_ms: u64) -> Option<PhaseChange> {
        self.signal_due = None;
        self.outcome = None;
        self.signal_at = None;
        self.pending_audio = None;
        self.started_at = Some(now_ms);
        self.log = RoundLog::new();
        self.log.append(LogEntry::waiting_started());

        let delay = self.rng.range_ms(cfg.min_wait_ms, cfg.max_wait_ms);
        self.signal_due = Some(now_ms + delay);
        self.phase = Phase::Waiting;
        debug!("round started, signal in {delay} ms");

        Some(PhaseChange {
            phase: Phase::Waiting,
            at_ms: 0,
            outcome: None,
            replayed: false,
        })
    }

    /// Fires the scheduled signal once its deadline is due. Call from the
    /// host loop with the current clock reading.
    pub fn tick(&mut self, now_ms: u64) -> Option<PhaseChange> {
        match self.signal_due {
            Some(due) if now_ms >= due => {
                self.signal_due = None;
                self.fire_signal(now_ms)
            }
            _ => None,
        }
    }

    fn fire_signal(&mut self, now_ms: u64) -> Option<PhaseChange> {
        // A deadline can outlive its round; only a waiting round may signal.
        if self.phase != Phase::Waiting {
            debug!("stale signal deadline ignored in phase {:?}", self.phase);
            return None;
        }
        let started = self.started_at?;
        self.signal_at = Some(now_ms);
        self.phase = Phase::Signaled;

        let at_ms = now_ms.saturating_sub(started);
        self.log.append(LogEntry::signal_shown(at_ms));
        Some(PhaseChange {
            phase: Phase::Signaled,
            at_ms,
            outcome: None,
            replayed: false,
        })
    }

    /// Sole entry point for every response source (touch, key, voice).
    /// Ignored outside Waiting/Signaled so queued inputs arriving after the
    /// round decided never corrupt state.
    pub fn submit_action(
        &mut self,
        player: PlayerId,
        source: ActionSource,
        now_ms: u64,
    ) -> Option<PhaseChange> {
        if !matches!(self.phase, Phase::Waiting | Phase::Signaled) {
            debug!("action from {player} ignored in phase {:?}", self.phase);
            return None;
        }
        let verdict = arbiter::decide(self.phase, player, now_ms, self.signal_at)?;

        self.signal_due = None;
        let started = self.started_at?;
        let at_ms = now_ms.saturating_sub(started);
        self.phase = Phase::Ended;
        self.outcome = Some(verdict.clone());
        self.log.append(LogEntry::round_ended(
            at_ms,
            verdict.clone(),
            source,
            self.pending_audio.take(),
        ));
        info!(
            "round ended: {} wins by {:?} ({} ms)",
            verdict.winner, verdict.reason, verdict.reaction_latency_ms
        );

        Some(PhaseChange {
            phase: Phase::Ended,
            at_ms,
            outcome: Some(verdict),
            replayed: false,
        })
    }

    /// Collaborator hook: captured audio handed in during the round rides on
    /// the RoundEnded entry.
    pub fn set_round_audio(&mut self, clip: AudioClip) {
        if matches!(self.phase, Phase::Waiting | Phase::Signaled) {
            self.pending_audio = Some(clip);
        } else {
            debug!("audio clip ignored outside an active round");
        }
    }

    /// Back to Idle, discarding round data. Used when switching modes.
    pub fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.started_at = None;
        self.signal_at = None;
        self.signal_due = None;
        self.outcome = None;
        self.pending_audio = None;
        self.log = RoundLog::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_log::LogEventKind;
    use crate::types::WinReason;

    fn fixed_cfg(delay_ms: u64) -> RoundConfig {
        RoundConfig {
            min_wait_ms: delay_ms,
            max_wait_ms: delay_ms,
            seed: 1,
        }
    }

    #[test]
    fn reaction_round_runs_waiting_signaled_ended() {
        let mut engine = RoundEngine::new(1);
        let start = engine.start_round(&fixed_cfg(2000), 10_000).unwrap();
        assert_eq!(start.phase, Phase::Waiting);
        assert_eq!(engine.phase(), Phase::Waiting);

        assert!(engine.tick(11_999).is_none());
        let go = engine.tick(12_000).unwrap();
        assert_eq!(go.phase, Phase::Signaled);
        assert_eq!(go.at_ms, 2000);

        let end = engine
            .submit_action(PlayerId::P1, ActionSource::Key, 12_300)
            .unwrap();
        let outcome = end.outcome.unwrap();
        assert_eq!(outcome.winner, PlayerId::P1);
        assert_eq!(outcome.reason, WinReason::Reaction);
        assert_eq!(outcome.reaction_latency_ms, 300);
        assert_eq!(engine.phase(), Phase::Ended);
    }

    #[test]
    fn false_start_forfeits_to_the_opponent() {
        let mut engine = RoundEngine::new(1);
        engine.start_round(&fixed_cfg(2000), 0);
        let end = engine
            .submit_action(PlayerId::P2, ActionSource::Touch, 150)
            .unwrap();
        let outcome = end.outcome.unwrap();
        assert_eq!(outcome.winner, PlayerId::P1);
        assert_eq!(outcome.reason, WinReason::FalseStart);
        assert_eq!(outcome.reaction_latency_ms, 0);

        // the false start skipped the signal entirely
        let kinds: Vec<LogEventKind> = engine.log().entries().iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![LogEventKind::WaitingStarted, LogEventKind::RoundEnded]
        );
    }

    #[test]
    fn late_actions_never_change_the_outcome() {
        let mut engine = RoundEngine::new(1);
        engine.start_round(&fixed_cfg(2000), 0);
        engine.tick(2000);
        engine.submit_action(PlayerId::P1, ActionSource::Key, 2300);
        let decided = engine.outcome().cloned().unwrap();

        assert!(
            engine
                .submit_action(PlayerId::P2, ActionSource::Key, 2301)
                .is_none()
        );
        assert!(
            engine
                .submit_action(PlayerId::P1, ActionSource::Voice, 2500)
                .is_none()
        );
        assert_eq!(engine.outcome().cloned().unwrap(), decided);
    }

    #[test]
    fn cancelled_deadline_cannot_signal_after_a_false_start() {
        let mut engine = RoundEngine::new(1);
        engine.start_round(&fixed_cfg(2000), 0);
        engine.submit_action(PlayerId::P1, ActionSource::Key, 100);
        assert_eq!(engine.phase(), Phase::Ended);

        // the old deadline at t=2000 must not fire into the ended round
        assert!(engine.tick(2000).is_none());
        assert!(engine.tick(10_000).is_none());
        assert_eq!(engine.phase(), Phase::Ended);
    }

    #[test]
    fn restarting_supersedes_the_pending_deadline() {
        let mut engine = RoundEngine::new(1);
        engine.start_round(&fixed_cfg(2000), 0);
        // restart before the first signal deadline (t=2000) fires
        engine.start_round(&fixed_cfg(2000), 1000);

        // old deadline instant: nothing may fire
        assert!(engine.tick(2000).is_none());
        assert_eq!(engine.phase(), Phase::Waiting);

        // only the new round's deadline produces the signal
        let go = engine.tick(3000).unwrap();
        assert_eq!(go.phase, Phase::Signaled);
        assert_eq!(go.at_ms, 2000);
    }

    #[test]
    fn actions_outside_a_round_are_no_ops() {
        let mut engine = RoundEngine::new(1);
        assert!(
            engine
                .submit_action(PlayerId::P1, ActionSource::Key, 0)
                .is_none()
        );
        assert!(engine.tick(99_999).is_none());
        assert_eq!(engine.phase(), Phase::Idle);
    }

    #[test]
    fn log_records_relative_stamps_in_order() {
        let mut engine = RoundEngine::new(1);
        engine.start_round(&fixed_cfg(2000), 50_000);
        engine.tick(52_000);
        engine.submit_action(PlayerId::P2, ActionSource::Key, 52_450);

        let stamps: Vec<u64> = engine.log().entries().iter().map(|e| e.at_ms).collect();
        assert_eq!(stamps, vec![0, 2000, 2450]);
        assert!(engine.log().is_sealed());
    }

    #[test]
    fn audio_clip_rides_the_round_ended_entry() {
        let clip = AudioClip {
            data: vec![0xAB; 16],
            recording_started_at_ms: 10,
            trigger_at_ms: 900,
        };
        let mut engine = RoundEngine::new(1);
        engine.start_round(&fixed_cfg(2000), 0);
        engine.set_round_audio(clip.clone());
        engine.submit_action(PlayerId::P1, ActionSource::Voice, 900);

        let ended = engine.log().ended_entry().unwrap();
        assert_eq!(ended.audio.as_ref().unwrap(), &clip);
        assert_eq!(ended.source, Some(ActionSource::Voice));
    }

    #[test]
    fn audio_outside_a_round_is_dropped() {
        let mut engine = RoundEngine::new(1);
        engine.set_round_audio(AudioClip {
            data: vec![],
            recording_started_at_ms: 0,
            trigger_at_ms: 0,
        });
        engine.start_round(&fixed_cfg(100), 0);
        engine.submit_action(PlayerId::P1, ActionSource::Key, 10);
        assert!(engine.log().ended_entry().unwrap().audio.is_none());
    }

    #[test]
    fn reset_returns_to_idle() {
        let mut engine = RoundEngine::new(1);
        engine.start_round(&fixed_cfg(2000), 0);
        engine.reset();
        assert_eq!(engine.phase(), Phase::Idle);
        assert!(engine.outcome().is_none());
        assert!(engine.log().entries().is_empty());
        // the reset also cancelled the deadline
        assert!(engine.tick(5000).is_none());
    }
}
