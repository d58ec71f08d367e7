/// Wager texts riding on the next rounds. A masked entry displays like a
/// password field until the players choose to reveal it, so the stake can
/// stay secret while the duel is set up.
#[derive(Clone, Debug, Default)]
pub struct RewardBook {
    entries: Vec<Reward>,
}

#[derive(Clone, Debug)]
pub struct Reward {
    text: String,
    masked: bool,
}

impl Reward {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_masked(&self) -> bool {
        self.masked
    }
}

impl RewardBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, text: impl Into<String>) {
        self.entries.push(Reward {
            text: text.into(),
            masked: false,
        });
    }

    pub fn add_masked(&mut self, text: impl Into<String>) {
        self.entries.push(Reward {
            text: text.into(),
            masked: true,
        });
    }

    pub fn remove(&mut self, index: usize) -> Option<Reward> {
        if index < self.entries.len() {
            Some(self.entries.remove(index))
        } else {
            None
        }
    }

    pub fn remove_last(&mut self) -> Option<Reward> {
        self.entries.pop()
    }

    pub fn toggle_mask(&mut self, index: usize) {
        if let Some(entry) = self.entries.get_mut(index) {
            entry.masked = !entry.masked;
        }
    }

    pub fn set_all_masked(&mut self, masked: bool) {
        for entry in &mut self.entries {
            entry.masked = masked;
        }
    }

    pub fn any_masked(&self) -> bool {
        self.entries.iter().any(|e| e.masked)
    }

    /// Text as it should appear on screen, with masked entries dotted out.
    pub fn display(&self, index: usize) -> Option<String> {
        self.entries.get(index).map(|entry| {
            if entry.masked {
                "\u{2022}".repeat(entry.text.chars().count())
            } else {
                entry.text.clone()
            }
        })
    }

    pub fn display_lines(&self) -> Vec<String> {
        (0..self.entries.len())
            .filter_map(|i| self.display(i))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
