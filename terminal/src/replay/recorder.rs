use anyhow::{Context, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

use super::ReplayMetadata;
use common::RoundLog;

/// Writes sealed round logs as gzip-compressed newline-delimited JSON:
/// one metadata line, then one line per log entry.
pub struct RoundReplayRecorder {
    output_dir: PathBuf,
}

impl RoundReplayRecorder {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    pub fn save(&self, log: &RoundLog, metadata: &ReplayMetadata, label: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)
            .context("failed to create replay output directory")?;

        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let filename = format!("round_{}_{}.replay", label, stamp);
        let filepath = self.output_dir.join(&filename);

        let file = fs::File::create(&filepath).context("failed to create replay file")?;
        let mut encoder = GzEncoder::new(file, Compression::default());

        let metadata_json = serde_json::to_string(metadata)?;
        writeln!(encoder, "{}", metadata_json)?;

        for entry in log.entries() {
            let entry_json = serde_json::to_string(entry)?;
            writeln!(encoder, "{}", entry_json)?;
        }

        encoder.finish()?;

        info!("saved round replay to {:?}", filepath);
        Ok(filepath)
    }
}
