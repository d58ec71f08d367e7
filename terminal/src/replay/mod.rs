pub mod reader;
pub mod recorder;

use common::{Outcome, RoundLog};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// First line of every replay file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayMetadata {
    pub p1_name: String,
    pub p2_name: String,
    pub saved_at: SystemTime,
    pub outcome: Option<Outcome>,
}

pub struct ReplayData {
    pub metadata: ReplayMetadata,
    pub log: RoundLog,
}
