use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use common::{LogEventKind, PlayerId, RoundLog, Scoreboard, WinReason};

/// Plain-text battle report for the last sealed round plus the running
/// score. Stands in for the original game's shareable result card.
pub fn battle_report(
    log: &RoundLog,
    board: &Scoreboard,
    p1_name: &str,
    p2_name: &str,
) -> String {
    let name_of = |p: PlayerId| match p {
        PlayerId::P1 => p1_name,
        PlayerId::P2 => p2_name,
    };

    let mut out = String::new();
    out.push_str("==============================\n");
    out.push_str("        QUICKDRAW REPORT\n");
    out.push_str("==============================\n");

    match log.outcome() {
        Some(outcome) => {
            out.push_str(&format!("Winner     : {}\n", name_of(outcome.winner)));
            match outcome.reason {
                WinReason::Reaction => {
                    out.push_str("Decided by : reaction\n");
                    out.push_str(&format!(
                        "Latency    : {} ms\n",
                        outcome.reaction_latency_ms
                    ));
                }
                WinReason::FalseStart => {
                    out.push_str(&format!(
                        "Decided by : false start ({} jumped the signal)\n",
                        name_of(outcome.winner.opponent())
                    ));
                }
            }
        }
        None => out.push_str("No decided round yet.\n"),
    }

    let signal_delay = log
        .entries()
        .iter()
        .find(|e| e.kind == LogEventKind::SignalShown)
        .map(|e| e.at_ms);
    if let Some(delay) = signal_delay {
        out.push_str(&format!("Signal came after {} ms\n", delay));
    }

    out.push_str("------------------------------\n");
    out.push_str(&format!(
        "Score      : {} {} - {} {}\n",
        p1_name,
        board.wins(PlayerId::P1),
        board.wins(PlayerId::P2),
        p2_name,
    ));
    out.push_str(&format!("Rounds     : {}\n", board.rounds_played()));
    if let Some((holder, len)) = board.streak() {
        if len > 1 {
            out.push_str(&format!(
                "Streak     : {} x{}\n",
                name_of(holder),
                len
            ));
        }
    }
    out.push_str("==============================\n");
    out
}

pub fn export_report(path: &Path, report: &str) -> Result<()> {
    fs::write(path, report).with_context(|| format!("failed to write report to {:?}", path))
}
