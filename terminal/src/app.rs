use anyhow::Result;
use crossterm::event::KeyEvent;
use ratatui::Frame;
use std::path::PathBuf;
use std::time::Duration;

use crate::replay::reader::ReplayReader;
use crate::views::{DuelViewState, ReplaySelectorState, ReplayViewerState, View};

#[derive(Debug)]
pub enum AppCommand {
    Quit,
    BrowseReplays,
    BackToDuel,
    OpenReplay(PathBuf),
}

/// Screens layered over the duel. The duel view itself is never torn down,
/// so the tournament score survives a trip through the replay browser.
enum Overlay {
    Selector(Box<ReplaySelectorState>),
    Viewer(Box<ReplayViewerState>),
}

pub struct App {
    duel: Box<DuelViewState>,
    overlay: Option<Overlay>,
    replay_dir: PathBuf,
}

impl App {
    pub fn new(replay_dir: PathBuf) -> Result<Self> {
        let duel = DuelViewState::new(replay_dir.clone())?;
        Ok(Self {
            duel: Box::new(duel),
            overlay: None,
            replay_dir,
        })
    }

    pub fn handle_input(&mut self, key: KeyEvent) -> Option<AppCommand> {
        match &mut self.overlay {
            Some(Overlay::Selector(selector)) => selector.handle_input(key),
            Some(Overlay::Viewer(viewer)) => viewer.handle_input(key),
            None => self.duel.handle_input(key),
        }
    }

    pub fn update(&mut self, dt: Duration) {
        // the duel is effectively paused while an overlay is up
        match &mut self.overlay {
            Some(Overlay::Selector(selector)) => selector.update(dt),
            Some(Overlay::Viewer(viewer)) => viewer.update(dt),
            None => self.duel.update(dt),
        }
    }

    pub fn render(&self, frame: &mut Frame) {
        match &self.overlay {
            Some(Overlay::Selector(selector)) => selector.render(frame),
            Some(Overlay::Viewer(viewer)) => viewer.render(frame),
            None => self.duel.render(frame),
        }
    }

    pub fn handle_command(&mut self, command: AppCommand) -> Result<()> {
        match command {
            AppCommand::BrowseReplays => {
                let selector = ReplaySelectorState::new(self.replay_dir.clone())?;
                self.overlay = Some(Overlay::Selector(Box::new(selector)));
            }
            AppCommand::OpenReplay(path) => {
                let replay_data = ReplayReader::load_replay(&path)?;
                let viewer = ReplayViewerState::new(replay_data);
                self.overlay = Some(Overlay::Viewer(Box::new(viewer)));
            }
            AppCommand::BackToDuel => {
                self.overlay = None;
            }
            AppCommand::Quit => {
                // Handled in main loop
            }
        }
        Ok(())
    }
}
