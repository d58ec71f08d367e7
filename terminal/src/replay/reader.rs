use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::{ReplayData, ReplayMetadata};
use common::{LogEntry, RoundLog};

pub struct ReplayReader;

impl ReplayReader {
    pub fn load_replay(path: &Path) -> Result<ReplayData> {
        let file =
            File::open(path).with_context(|| format!("failed to open replay file: {:?}", path))?;
        let decoder = GzDecoder::new(file);
        let reader = BufReader::new(decoder);
        let mut lines = reader.lines();

        // Metadata (first line)
        let metadata_line = lines
            .next()
            .context("replay file is empty")?
            .context("failed to read metadata line")?;
        let metadata: ReplayMetadata =
            serde_json::from_str(&metadata_line).context("failed to parse replay metadata")?;

        // Log entries, one per line
        let mut log = RoundLog::new();
        for (i, line_result) in lines.enumerate() {
            let line =
                line_result.with_context(|| format!("failed to read entry line {}", i + 2))?;
            let entry: LogEntry = serde_json::from_str(&line)
                .with_context(|| format!("failed to parse entry on line {}", i + 2))?;
            log.append(entry);
        }

        Ok(ReplayData { metadata, log })
    }

    pub fn list_replays(dir: &Path) -> Result<Vec<PathBuf>> {
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut replays = Vec::new();

        fn find_replay_files(dir: &Path, replays: &mut Vec<PathBuf>) -> Result<()> {
            for entry in fs::read_dir(dir)? {
                let entry = entry?;
                let path = entry.path();

                if path.is_dir() {
                    find_replay_files(&path, replays).ok();
                } else if path.extension() == Some(OsStr::new("replay")) {
                    replays.push(path);
                }
            }
            Ok(())
        }

        find_replay_files(dir, &mut replays)?;

        // Newest first
        replays.sort_by(|a, b| {
            let a_time = a
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            let b_time = b
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            b_time.cmp(&a_time)
        });

        Ok(replays)
    }
}
