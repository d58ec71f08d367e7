use std::sync::mpsc::{self, Receiver, Sender};

use log::debug;

use crate::clock::Clock;
use crate::config::{ConfigError, RoundConfig};
use crate::engine::RoundEngine;
use crate::event_log::{AudioClip, RoundLog};
use crate::replay::{AudioCue, ReplaySession};
use crate::score::Scoreboard;
use crate::types::{ActionSource, Outcome, Phase, PhaseChange, PlayerId};

/// Facade tying the engine, the replay scheduler and the observers to one
/// injected clock. Everything runs on the caller's thread; `poll` from the
/// host loop advances time-driven work.
pub struct Duel {
    clock: Box<dyn Clock>,
    cfg: RoundConfig,
    engine: RoundEngine,
    replay: Option<ReplaySession>,
    subscribers: Vec<Sender<PhaseChange>>,
    scoreboard: Scoreboard,
    last_log: Option<RoundLog>,
}

impl Duel {
    pub fn new(cfg: RoundConfig, clock: Box<dyn Clock>) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let engine = RoundEngine::new(cfg.seed);
        Ok(Self {
            clock,
            cfg,
            engine,
            replay: None,
            subscribers: Vec::new(),
            scoreboard: Scoreboard::default(),
            last_log: None,
        })
    }

    /// Presentation layers poll the returned receiver for transitions.
    pub fn subscribe(&mut self) -> Receiver<PhaseChange> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    /// Begins a fresh round. A replay still running and a deadline still
    /// pending from the previous round are both cancelled first.
    pub fn start_round(&mut self) {
        self.cancel_replay();
        let now = self.clock.now_ms();
        if let Some(change) = self.engine.start_round(&self.cfg, now) {
            self.publish(change);
        }
    }

    /// Like `start_round`, but validates and installs a new wait interval
    /// first.
    pub fn start_round_with(&mut self, cfg: RoundConfig) -> Result<(), ConfigError> {
        cfg.validate()?;
        self.cfg = cfg;
        self.start_round();
        Ok(())
    }

    /// Applies a player action from any input source. Ignored while a
    /// replay is running and outside Waiting/Signaled.
    pub fn submit_action(&mut self, player: PlayerId, source: ActionSource) {
        if self.replay.is_some() {
            debug!("action from {player} ignored during replay");
            return;
        }
        let now = self.clock.now_ms();
        if let Some(change) = self.engine.submit_action(player, source, now) {
            if let Some(outcome) = &change.outcome {
                self.scoreboard.record(outcome);
            }
            self.last_log = Some(self.engine.log().clone());
            self.publish(change);
        }
    }

    /// Advances the signal deadline and any running replay. Call from the
    /// host loop.
    pub fn poll(&mut self) {
        let now = self.clock.now_ms();
        if let Some(change) = self.engine.tick(now) {
            self.publish(change);
        }

        let mut replay_changes = Vec::new();
        let mut replay_done = false;
        if let Some(replay) = &mut self.replay {
            replay_changes = replay.tick(now);
            replay_done = replay.finished();
        }
        for change in replay_changes {
            self.publish(change);
        }
        if replay_done {
            self.replay = None;
        }
    }

    /// Re-presents a sealed log. A malformed log is a guarded no-op; the
    /// only visible effect of a valid one is the immediate Waiting step.
    pub fn start_replay(&mut self, log: RoundLog) {
        self.cancel_replay();
        let now = self.clock.now_ms();
        match ReplaySession::new(log, now) {
            Ok(mut session) => {
                for change in session.tick(now) {
                    self.publish(change);
                }
                if !session.finished() {
                    self.replay = Some(session);
                }
            }
            Err(err) => debug!("replay refused: {err}"),
        }
    }

    /// Replays the most recently finished round, if there is one.
    pub fn replay_last(&mut self) {
        match self.last_log.clone() {
            Some(log) => self.start_replay(log),
            None => debug!("no finished round to replay"),
        }
    }

    /// Idempotent. No replay step fires after this returns.
    pub fn cancel_replay(&mut self) {
        if let Some(replay) = &mut self.replay {
            replay.cancel();
        }
        self.replay = None;
    }

    /// Leaves the duel idle; the current round and any replay are
    /// discarded. The scoreboard and last sealed log survive.
    pub fn reset(&mut self) {
        self.cancel_replay();
        self.engine.reset();
    }

    pub fn phase(&self) -> Phase {
        self.engine.phase()
    }

    pub fn current_outcome(&self) -> Option<&Outcome> {
        self.engine.outcome()
    }

    pub fn replaying(&self) -> bool {
        self.replay.is_some()
    }

    pub fn scoreboard(&self) -> &Scoreboard {
        &self.scoreboard
    }

    pub fn last_log(&self) -> Option<&RoundLog> {
        self.last_log.as_ref()
    }

    pub fn audio_cue(&self) -> Option<&AudioCue> {
        self.replay.as_ref().and_then(|r| r.audio_cue())
    }

    /// Collaborator hook: captured audio for the round in progress.
    pub fn set_round_audio(&mut self, clip: AudioClip) {
        self.engine.set_round_audio(clip);
    }

    fn publish(&mut self, change: PhaseChange) {
        // senders whose receiver is gone are pruned as they surface
        self.subscribers.retain(|tx| tx.send(change.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::types::WinReason;

    fn duel_with_clock(min: u64, max: u64) -> (Duel, ManualClock) {
        let clock = ManualClock::new();
        let cfg = RoundConfig {
            min_wait_ms: min,
            max_wait_ms: max,
            seed: 3,
        };
        let duel = Duel::new(cfg, Box::new(clock.clone())).unwrap();
        (duel, clock)
    }

    fn drain(rx: &Receiver<PhaseChange>) -> Vec<PhaseChange> {
        rx.try_iter().collect()
    }

    #[test]
    fn inverted_config_is_refused() {
        let cfg = RoundConfig {
            min_wait_ms: 5000,
            max_wait_ms: 1000,
            seed: 3,
        };
        assert!(Duel::new(cfg, Box::new(ManualClock::new())).is_err());
    }

    #[test]
    fn subscribers_see_the_monotonic_phase_sequence() {
        let (mut duel, clock) = duel_with_clock(2000, 2000);
        let rx = duel.subscribe();

        duel.start_round();
        clock.advance(2000);
        duel.poll();
        clock.advance(300);
        duel.submit_action(PlayerId::P1, ActionSource::Key);

        let phases: Vec<Phase> = drain(&rx).into_iter().map(|c| c.phase).collect();
        assert_eq!(phases, vec![Phase::Waiting, Phase::Signaled, Phase::Ended]);

        let outcome = duel.current_outcome().unwrap();
        assert_eq!(outcome.winner, PlayerId::P1);
        assert_eq!(outcome.reaction_latency_ms, 300);
    }

    #[test]
    fn false_start_scores_for_the_opponent() {
        let (mut duel, clock) = duel_with_clock(2000, 2000);
        duel.start_round();
        clock.advance(100);
        duel.submit_action(PlayerId::P2, ActionSource::Touch);

        let outcome = duel.current_outcome().unwrap();
        assert_eq!(outcome.winner, PlayerId::P1);
        assert_eq!(outcome.reason, WinReason::FalseStart);
        assert_eq!(duel.scoreboard().wins(PlayerId::P1), 1);
        assert_eq!(duel.scoreboard().wins(PlayerId::P2), 0);
    }

    #[test]
    fn replay_reproduces_the_round_without_touching_it() {
        let (mut duel, clock) = duel_with_clock(2000, 2000);
        duel.start_round();
        clock.advance(2000);
        duel.poll();
        clock.advance(300);
        duel.submit_action(PlayerId::P1, ActionSource::Key);
        let sealed = duel.last_log().unwrap().clone();

        let rx = duel.subscribe();
        duel.replay_last();
        assert!(duel.replaying());

        clock.advance(2000);
        duel.poll();
        clock.advance(300);
        duel.poll();

        let seen = drain(&rx);
        assert!(seen.iter().all(|c| c.replayed));
        let phases: Vec<Phase> = seen.iter().map(|c| c.phase).collect();
        assert_eq!(phases, vec![Phase::Waiting, Phase::Signaled, Phase::Ended]);
        assert_eq!(
            seen.last().unwrap().outcome.as_ref().unwrap(),
            duel.current_outcome().unwrap()
        );

        assert!(!duel.replaying());
        assert_eq!(duel.last_log().unwrap(), &sealed);
    }

    #[test]
    fn actions_during_replay_are_ignored() {
        let (mut duel, clock) = duel_with_clock(2000, 2000);
        duel.start_round();
        clock.advance(100);
        duel.submit_action(PlayerId::P1, ActionSource::Key);
        let decided = duel.current_outcome().cloned().unwrap();

        duel.replay_last();
        duel.submit_action(PlayerId::P2, ActionSource::Key);
        assert_eq!(duel.current_outcome().cloned().unwrap(), decided);
        assert_eq!(duel.scoreboard().rounds_played(), 1);
    }

    #[test]
    fn cancelling_a_replay_silences_it() {
        let (mut duel, clock) = duel_with_clock(2000, 2000);
        duel.start_round();
        clock.advance(2000);
        duel.poll();
        clock.advance(300);
        duel.submit_action(PlayerId::P1, ActionSource::Key);

        let rx = duel.subscribe();
        duel.replay_last();
        clock.advance(1000);
        duel.poll();
        duel.cancel_replay();
        clock.advance(10_000);
        duel.poll();

        let phases: Vec<Phase> = drain(&rx).into_iter().map(|c| c.phase).collect();
        assert_eq!(phases, vec![Phase::Waiting]);
        // idempotent with nothing scheduled
        duel.cancel_replay();
    }

    #[test]
    fn starting_a_round_cancels_the_replay() {
        let (mut duel, clock) = duel_with_clock(2000, 2000);
        duel.start_round();
        clock.advance(100);
        duel.submit_action(PlayerId::P1, ActionSource::Key);

        duel.replay_last();
        assert!(duel.replaying());
        duel.start_round();
        assert!(!duel.replaying());
        assert_eq!(duel.phase(), Phase::Waiting);
    }

    #[test]
    fn replay_of_a_malformed_log_is_a_no_op() {
        let (mut duel, _clock) = duel_with_clock(2000, 2000);
        let rx = duel.subscribe();
        duel.start_replay(RoundLog::new());
        assert!(!duel.replaying());
        assert!(drain(&rx).is_empty());
    }

    #[test]
    fn replayed_voice_round_exposes_the_audio_cue() {
        let (mut duel, clock) = duel_with_clock(2000, 2000);
        duel.start_round();
        clock.advance(2000);
        duel.poll();
        duel.set_round_audio(AudioClip {
            data: vec![1, 2, 3],
            recording_started_at_ms: 0,
            trigger_at_ms: 2300,
        });
        clock.advance(300);
        duel.submit_action(PlayerId::P1, ActionSource::Voice);

        duel.replay_last();
        let cue = duel.audio_cue().cloned().unwrap();
        // trigger sits 2300 ms into the recording and at virtual 2300;
        // playback leads it by the 500 ms pre-roll
        assert_eq!(cue.seek_ms, 1800);
        assert_eq!(cue.start_at_virtual_ms, 1800);

        duel.cancel_replay();
        assert!(duel.audio_cue().is_none());
    }

    #[test]
    fn reconfigured_round_uses_the_new_interval() {
        let (mut duel, clock) = duel_with_clock(2000, 2000);
        duel.start_round_with(RoundConfig {
            min_wait_ms: 500,
            max_wait_ms: 500,
            seed: 3,
        })
        .unwrap();
        clock.advance(500);
        duel.poll();
        assert_eq!(duel.phase(), Phase::Signaled);

        let bad = RoundConfig {
            min_wait_ms: 900,
            max_wait_ms: 100,
            seed: 3,
        };
        assert!(duel.start_round_with(bad).is_err());
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let (mut duel, clock) = duel_with_clock(2000, 2000);
        let rx = duel.subscribe();
        drop(rx);
        duel.start_round();
        clock.advance(100);
        duel.submit_action(PlayerId::P1, ActionSource::Key);
        assert_eq!(duel.subscribers.len(), 0);
    }
}
