use log::debug;

use crate::types::PlayerId;

/// Default pitch split between the two players' voices. An arbitrary
/// upstream heuristic; nothing in the core depends on it being right.
pub const DEFAULT_SPLIT_HZ: f32 = 200.0;

/// RMS level below which a buffer is treated as silence.
pub const DEFAULT_VOLUME_THRESHOLD: f32 = 0.05;

/// Black-box pitch estimator. Implementations may be arbitrarily crude; the
/// game only needs "a frequency, or nothing usable".
pub trait SoundClassifier {
    fn pitch_estimate(&self, samples: &[f32], sample_rate_hz: u32) -> Option<f32>;
}

/// Counts sign changes over the buffer. Crude, but serviceable as the
/// default stand-in classifier.
pub struct ZeroCrossingPitch;

impl SoundClassifier for ZeroCrossingPitch {
    fn pitch_estimate(&self, samples: &[f32], sample_rate_hz: u32) -> Option<f32> {
        if samples.len() < 2 || sample_rate_hz == 0 {
            return None;
        }
        let mut crossings = 0u32;
        for pair in samples.windows(2) {
            if (pair[0] >= 0.0) != (pair[1] >= 0.0) {
                crossings += 1;
            }
        }
        if crossings == 0 {
            return None;
        }
        let seconds = samples.len() as f32 / sample_rate_hz as f32;
        Some(crossings as f32 / 2.0 / seconds)
    }
}

pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}

/// Turns raw audio buffers into at most one player guess per round. The
/// engine's post-Ended no-op rule is the real enforcer of "one per round";
/// the latch here only avoids re-triggering on a single sustained shout.
pub struct VoiceTrigger {
    classifier: Box<dyn SoundClassifier>,
    volume_threshold: f32,
    split_hz: f32,
    fired: bool,
}

impl VoiceTrigger {
    pub fn new(classifier: Box<dyn SoundClassifier>) -> Self {
        Self {
            classifier,
            volume_threshold: DEFAULT_VOLUME_THRESHOLD,
            split_hz: DEFAULT_SPLIT_HZ,
            fired: false,
        }
    }

    pub fn with_thresholds(mut self, volume_threshold: f32, split_hz: f32) -> Self {
        self.volume_threshold = volume_threshold;
        self.split_hz = split_hz;
        self
    }

    /// Feed one captured buffer; Some(player) at most once between resets.
    /// The volume gate runs before the classifier is asked anything.
    pub fn feed(&mut self, samples: &[f32], sample_rate_hz: u32) -> Option<PlayerId> {
        if self.fired {
            return None;
        }
        let level = rms(samples);
        if level < self.volume_threshold {
            return None;
        }
        let hz = self.classifier.pitch_estimate(samples, sample_rate_hz)?;
        self.fired = true;
        debug!("voice trigger at {hz:.1} Hz (rms {level:.3})");
        Some(if hz < self.split_hz {
            PlayerId::P1
        } else {
            PlayerId::P2
        })
    }

    /// Re-arm for the next round.
    pub fn reset(&mut self) {
        self.fired = false;
    }
}
