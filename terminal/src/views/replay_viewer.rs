use super::View;
use crate::app::AppCommand;
use crate::replay::ReplayData;
use common::{Phase, PhaseChange, PlayerId, ReplaySession, WinReason};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use std::time::Duration;

/// Drives a `ReplaySession` on its own virtual clock: wall time only
/// advances the timeline while the viewer is unpaused.
pub struct ReplayViewerState {
    data: ReplayData,
    session: Option<ReplaySession>,
    virtual_now_ms: u64,
    paused: bool,
    shown: Vec<PhaseChange>,
}

impl ReplayViewerState {
    pub fn new(data: ReplayData) -> Self {
        let session = ReplaySession::new(data.log.clone(), 0).ok();
        Self {
            data,
            session,
            virtual_now_ms: 0,
            paused: false,
            shown: Vec::new(),
        }
    }

    fn restart(&mut self) {
        if let Some(session) = &mut self.session {
            session.cancel();
        }
        self.session = ReplaySession::new(self.data.log.clone(), 0).ok();
        self.virtual_now_ms = 0;
        self.shown.clear();
        self.paused = false;
    }

    fn player_name(&self, player: PlayerId) -> &str {
        match player {
            PlayerId::P1 => &self.data.metadata.p1_name,
            PlayerId::P2 => &self.data.metadata.p2_name,
        }
    }
}

impl View for ReplayViewerState {
    fn handle_input(&mut self, key: KeyEvent) -> Option<AppCommand> {
        if key.kind != KeyEventKind::Press {
            return None;
        }
        match key.code {
            KeyCode::Char(' ') => {
                self.paused = !self.paused;
                None
            }
            KeyCode::Char('r') => {
                self.restart();
                None
            }
            KeyCode::Char('q') | KeyCode::Esc => Some(AppCommand::BrowseReplays),
            _ => None,
        }
    }

    fn update(&mut self, dt: Duration) {
        if self.paused {
            return;
        }
        let Some(session) = &mut self.session else {
            return;
        };
        if session.finished() {
            return;
        }
        self.virtual_now_ms += dt.as_millis() as u64;
        let changes = session.tick(self.virtual_now_ms);
        self.shown.extend(changes);
    }

    fn render(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Length(3), // header
                Constraint::Min(7),    // banner
                Constraint::Length(8), // step log
                Constraint::Length(3), // controls
            ])
            .split(frame.area());

        frame.render_widget(self.render_header(), chunks[0]);
        frame.render_widget(self.render_banner(), chunks[1]);
        frame.render_widget(self.render_steps(), chunks[2]);

        let controls = Paragraph::new("Space: pause/resume | r: restart | q: back to list")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(controls, chunks[3]);
    }
}

impl ReplayViewerState {
    fn render_header(&self) -> Paragraph {
        let finished = self.session.as_ref().map(|s| s.finished()).unwrap_or(true);
        let state = if self.paused {
            "paused"
        } else if finished {
            "done"
        } else {
            "playing"
        };
        let title = format!(
            "Replay: {} vs {} | t = {} ms | {}",
            self.data.metadata.p1_name, self.data.metadata.p2_name, self.virtual_now_ms, state
        );
        Paragraph::new(title)
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL))
    }

    fn render_banner(&self) -> Paragraph {
        let mut lines = vec![Line::from("")];
        match self.shown.last() {
            None => lines.push(Line::from("starting...")),
            Some(change) => match change.phase {
                Phase::Idle => lines.push(Line::from("idle")),
                Phase::Waiting => {
                    lines.push(Line::from(Span::styled(
                        "...",
                        Style::default()
                            .fg(Color::Yellow)
                            .add_modifier(Modifier::BOLD),
                    )));
                    lines.push(Line::from("waiting for the signal"));
                }
                Phase::Signaled => lines.push(Line::from(Span::styled(
                    "GO!",
                    Style::default()
                        .fg(Color::Green)
                        .add_modifier(Modifier::BOLD),
                ))),
                Phase::Ended => {
                    if let Some(outcome) = &change.outcome {
                        lines.push(Line::from(Span::styled(
                            format!("{} wins", self.player_name(outcome.winner)),
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
                                lines.push(Line::from("won on a false start"))
                            }
                        }
                    }
                }
            },
        }

        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title("Round"))
    }

    fn render_steps(&self) -> Paragraph {
        let mut lines: Vec<Line> = self
            .shown
            .iter()
            .map(|change| Line::from(format!("t+{:>6} ms  {:?}", change.at_ms, change.phase)))
            .collect();

        if let Some(cue) = self.session.as_ref().and_then(|s| s.audio_cue()) {
            lines.push(Line::from(Span::styled(
                format!(
                    "audio: seek {} ms, start at t+{} ms",
                    cue.seek_ms, cue.start_at_virtual_ms
                ),
                Style::default().fg(Color::Magenta),
            )));
        }

        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Timeline"))
    }
}
