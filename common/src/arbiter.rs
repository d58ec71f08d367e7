use crate::types::{Outcome, Phase, PlayerId, WinReason};

/// Maps one candidate action onto a verdict. Pure: the caller supplies the
/// phase it observed and the timestamps; nothing here touches state.
///
/// Waiting means the actor jumped the signal, which forfeits the round to
/// the opponent with a latency fixed at zero. Signaled means a valid
/// reaction timed against the signal stamp. The engine never consults the
/// arbiter in Idle/Ended, so those arms answer None.
///
/// Races between simultaneous sources resolve by serialization, not here:
/// the first action the engine processes ends the round, and every later
/// one is ignored before the arbiter is reached.
pub fn decide(
    phase: Phase,
    actor: PlayerId,
    now_ms: u64,
    signal_at_ms: Option<u64>,
) -> Option<Outcome> {
    match phase {
        Phase::Waiting => Some(Outcome {
            winner: actor.opponent(),
            reason: WinReason::FalseStart,
            reaction_latency_ms: 0,
        }),
        Phase::Signaled => {
            let signal_at = signal_at_ms?;
            Some(Outcome {
                winner: actor,
                reason: WinReason::Reaction,
                // now >= signal_at whenever the phase really is Signaled;
                // saturate rather than trust the caller
                reaction_latency_ms: now_ms.saturating_sub(signal_at),
            })
        }
        Phase::Idle | Phase::Ended => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acting_during_waiting_forfeits() {
        let verdict = decide(Phase::Waiting, PlayerId::P2, 1234, None).unwrap();
        assert_eq!(verdict.winner, PlayerId::P1);
        assert_eq!(verdict.reason, WinReason::FalseStart);
        assert_eq!(verdict.reaction_latency_ms, 0);
    }

    #[test]
    fn acting_after_signal_wins_with_measured_latency() {
        let verdict = decide(Phase::Signaled, PlayerId::P2, 5300, Some(5000)).unwrap();
        assert_eq!(verdict.winner, PlayerId::P2);
        assert_eq!(verdict.reason, WinReason::Reaction);
        assert_eq!(verdict.reaction_latency_ms, 300);
    }

    #[test]
    fn idle_and_ended_are_not_call_sites() {
        assert!(decide(Phase::Idle, PlayerId::P1, 0, None).is_none());
        assert!(decide(Phase::Ended, PlayerId::P1, 0, Some(0)).is_none());
    }
}
