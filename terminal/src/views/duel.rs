use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::time::{Duration, SystemTime};

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use common::{
    ActionSource, Duel, Outcome, Phase, PhaseChange, PlayerId, RoundConfig, SystemClock, WinReason,
};

use super::View;
use crate::app::AppCommand;
use crate::replay::{recorder::RoundReplayRecorder, ReplayMetadata};
use crate::report::{battle_report, export_report};
use crate::rewards::RewardBook;

const P1_NAME: &str = "Red";
const P2_NAME: &str = "Blue";

const WAGER_PRESETS: &[&str] = &[
    "Loser does the dishes",
    "Winner picks the movie",
    "Coffee run for a week",
];

enum Banner {
    Idle,
    Waiting { replayed: bool },
    Go { replayed: bool },
    Result { outcome: Outcome, replayed: bool },
}

pub struct DuelViewState {
    duel: Duel,
    events: Receiver<PhaseChange>,
    banner: Banner,
    rewards: RewardBook,
    recorder: RoundReplayRecorder,
    report_path: PathBuf,
    status: Option<String>,
    next_wager: usize,
}

impl DuelViewState {
    pub fn new(replay_dir: PathBuf) -> Result<Self> {
        let mut duel = Duel::new(RoundConfig::default(), Box::new(SystemClock::new()))?;
        let events = duel.subscribe();
        Ok(Self {
            duel,
            events,
            banner: Banner::Idle,
            rewards: RewardBook::new(),
            recorder: RoundReplayRecorder::new(replay_dir.clone()),
            report_path: replay_dir.join("battle_report.txt"),
            status: None,
            next_wager: 0,
        })
    }

    fn save_last_round(&mut self) {
        let Some(log) = self.duel.last_log() else {
            self.status = Some("nothing to save yet".to_string());
            return;
        };
        let metadata = ReplayMetadata {
            p1_name: P1_NAME.to_string(),
            p2_name: P2_NAME.to_string(),
            saved_at: SystemTime::now(),
            outcome: log.outcome().cloned(),
        };
        let label = self.duel.scoreboard().rounds_played().to_string();
        match self.recorder.save(log, &metadata, &label) {
            Ok(path) => self.status = Some(format!("saved {}", path.display())),
            Err(err) => self.status = Some(format!("save failed: {err:#}")),
        }
    }

    fn export_battle_report(&mut self) {
        let Some(log) = self.duel.last_log() else {
            self.status = Some("no round to report yet".to_string());
            return;
        };
        let report = battle_report(log, self.duel.scoreboard(), P1_NAME, P2_NAME);
        match export_report(&self.report_path, &report) {
            Ok(()) => {
                self.status = Some(format!("report written to {}", self.report_path.display()))
            }
            Err(err) => self.status = Some(format!("report failed: {err:#}")),
        }
    }

    fn stop_replay(&mut self) {
        if !self.duel.replaying() {
            return;
        }
        self.duel.cancel_replay();
        // fall back to showing the decided round, if any
        self.banner = match self.duel.current_outcome().cloned() {
            Some(outcome) => Banner::Result {
                outcome,
                replayed: false,
            },
            None => Banner::Idle,
        };
    }
}

impl View for DuelViewState {
    fn handle_input(&mut self, key: KeyEvent) -> Option<AppCommand> {
        // ignore auto-repeat and release events, like the browser original
        // ignored e.repeat
        if key.kind != KeyEventKind::Press {
            return None;
        }
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => Some(AppCommand::Quit),
            KeyCode::Char(' ') => {
                self.status = None;
                self.duel.start_round();
                None
            }
            KeyCode::Char('a') => {
                self.duel.submit_action(PlayerId::P1, ActionSource::Key);
                None
            }
            KeyCode::Char('l') => {
                self.duel.submit_action(PlayerId::P2, ActionSource::Key);
                None
            }
            KeyCode::Char('r') => {
                self.duel.replay_last();
                None
            }
            KeyCode::Char('x') => {
                self.stop_replay();
                None
            }
            KeyCode::Char('s') => {
                self.save_last_round();
                None
            }
            KeyCode::Char('e') => {
                self.export_battle_report();
                None
            }
            KeyCode::Char('v') => Some(AppCommand::BrowseReplays),
            KeyCode::Char('w') => {
                let preset = WAGER_PRESETS[self.next_wager % WAGER_PRESETS.len()];
                self.next_wager += 1;
                self.rewards.add_masked(preset);
                None
            }
            KeyCode::Char('d') => {
                self.rewards.remove_last();
                None
            }
            KeyCode::Char('m') => {
                let masked = !self.rewards.any_masked();
                self.rewards.set_all_masked(masked);
                None
            }
            _ => None,
        }
    }

    fn update(&mut self, _dt: Duration) {
        self.duel.poll();
        while let Ok(change) = self.events.try_recv() {
            self.banner = match change.phase {
                Phase::Idle => Banner::Idle,
                Phase::Waiting => Banner::Waiting {
                    replayed: change.replayed,
                },
                Phase::Signaled => Banner::Go {
                    replayed: change.replayed,
                },
                Phase::Ended => match change.outcome {
                    Some(outcome) => Banner::Result {
                        outcome,
                        replayed: change.replayed,
                    },
                    None => Banner::Idle,
                },
            };
        }
    }

    fn render(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Length(3), // title + score
                Constraint::Min(10),   // player zones + signal panel
                Constraint::Length(5), // wagers
                Constraint::Length(4), // controls + status
            ])
            .split(frame.area());

        frame.render_widget(self.render_header(), chunks[0]);

        let zones = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(35),
                Constraint::Percentage(30),
                Constraint::Percentage(35),
            ])
            .split(chunks[1]);
        self.render_player_zone(frame, zones[0], PlayerId::P1);
        self.render_signal_panel(frame, zones[1]);
        self.render_player_zone(frame, zones[2], PlayerId::P2);

        frame.render_widget(self.render_wagers(), chunks[2]);
        frame.render_widget(self.render_controls(), chunks[3]);
    }
}

impl DuelViewState {
    fn render_header(&self) -> Paragraph {
        let board = self.duel.scoreboard();
        let title = format!(
            "Quickdraw | {} {} - {} {} | rounds {}",
            P1_NAME,
            board.wins(PlayerId::P1),
            board.wins(PlayerId::P2),
            P2_NAME,
            board.rounds_played(),
        );
        Paragraph::new(title)
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL))
    }

    fn render_player_zone(&self, frame: &mut Frame, area: Rect, player: PlayerId) {
        let (name, key_hint, base_color) = match player {
            PlayerId::P1 => (P1_NAME, "key 'a'", Color::Red),
            PlayerId::P2 => (P2_NAME, "key 'l'", Color::Blue),
        };

        let mut lines = vec![
            Line::from(""),
            Line::from(Span::styled(
                name,
                Style::default().fg(base_color).add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(key_hint, Style::default().fg(Color::DarkGray))),
            Line::from(""),
        ];

        if let Banner::Result { outcome, .. } = &self.banner {
            if outcome.winner == player {
                lines.push(Line::from(Span::styled(
                    "WINNER",
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                )));
            } else if outcome.reason == WinReason::FalseStart {
                lines.push(Line::from(Span::styled(
                    "FALSE START!",
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                )));
            }
        }

        let zone = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title(name));
        frame.render_widget(zone, area);
    }

    fn render_signal_panel(&self, frame: &mut Frame, area: Rect) {
        let mut lines = vec![Line::from("")];
        let mut replay_tag = false;

        match &self.banner {
            Banner::Idle => {
                lines.push(Line::from("Press Space"));
                lines.push(Line::from("to start a round"));
            }
            Banner::Waiting { replayed } => {
                replay_tag = *replayed;
                lines.push(Line::from(Span::styled(
                    "...",
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                )));
                lines.push(Line::from("wait for it"));
            }
            Banner::Go { replayed } => {
                replay_tag = *replayed;
                lines.push(Line::from(Span::styled(
                    "GO!",
                    Style::default()
                        .fg(Color::Green)
                        .add_modifier(Modifier::BOLD),
                )));
            }
            Banner::Result { outcome, replayed } => {
                replay_tag = *replayed;
                let name = match outcome.winner {
                    PlayerId::P1 => P1_NAME,
                    PlayerId::P2 => P2_NAME,
                };
                lines.push(Line::from(Span::styled(
                    format!("{} wins", name),
                    Style::default()
                        .fg(Color::Green)
                        .add_modifier(Modifier::BOLD),
                )));
                match outcome.reason {
                    WinReason::Reaction => lines.push(Line::from(format!(
                        "{} ms reaction",
                        outcome.reaction_latency_ms
                    ))),
                    WinReason::FalseStart => {
                        lines.push(Line::from("opponent jumped the signal"))
                    }
                }
            }
        }

        if replay_tag {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "REPLAY",
                Style::default()
                    .fg(Color::Magenta)
                    .add_modifier(Modifier::BOLD),
            )));
        }

        let panel = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title("Signal"));
        frame.render_widget(panel, area);
    }

    fn render_wagers(&self) -> Paragraph {
        let lines: Vec<Line> = if self.rewards.is_empty() {
            vec![Line::from(Span::styled(
                "no wagers - 'w' adds one",
                Style::default().fg(Color::DarkGray),
            ))]
        } else {
            self.rewards
                .display_lines()
                .into_iter()
                .map(Line::from)
                .collect()
        };
        Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Wagers ({})", self.rewards.len())),
        )
    }

    fn render_controls(&self) -> Paragraph {
        let mut lines = vec![Line::from(
            "Space: start | a/l: react | r: replay | x: stop replay | s: save | e: report",
        )];
        lines.push(Line::from(
            "v: browse replays | w/d: add/drop wager | m: mask wagers | q: quit",
        ));
        if let Some(status) = &self.status {
            lines.push(Line::from(Span::styled(
                status.clone(),
                Style::default().fg(Color::Yellow),
            )));
        }
        Paragraph::new(lines)
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL))
    }
}
