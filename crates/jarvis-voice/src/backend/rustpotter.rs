//! Local wake-word scoring with rustpotter.

use std::path::Path;

use jarvis_core::{ScorerError, WakeScores, WakeWordScorer};
use rustpotter::{Rustpotter, RustpotterConfig, SampleFormat};

/// [`WakeWordScorer`] backed by a rustpotter `.rpw` model.
///
/// Rustpotter consumes fixed-size frames, so incoming samples are buffered
/// and any remainder carries over to the next call.
pub struct RustpotterScorer {
    detector: Rustpotter,
    pending: Vec<f32>,
    frame_len: usize,
}

impl RustpotterScorer {
    /// Load a single keyword model. The keyword is named after the file stem.
    ///
    /// Detections scoring below `detection_threshold` are not reported at
    /// all, so pass the lowest score the caller wants to see.
    pub fn load(
        model_path: &Path,
        sample_rate: u32,
        detection_threshold: f32,
    ) -> Result<Self, ScorerError> {
        let mut config = RustpotterConfig::default();
        config.fmt.sample_rate = sample_rate as usize;
        config.fmt.channels = 1;
        config.fmt.sample_format = SampleFormat::F32;
        config.detector.threshold = detection_threshold;

        let mut detector = Rustpotter::new(&config).map_err(ScorerError::Load)?;

        let keyword = model_path
            .file_stem()
            .map_or_else(|| "wakeword".to_string(), |s| s.to_string_lossy().into_owned());
        let path = model_path.to_string_lossy();
        detector
            .add_wakeword_from_file(&keyword, &path)
            .map_err(ScorerError::Load)?;

        let frame_len = detector.get_samples_per_frame();
        if frame_len == 0 {
            return Err(ScorerError::Load("detector reported a zero frame size".into()));
        }
        tracing::info!(%keyword, path = %path, frame_len, "Wake word model loaded");

        Ok(Self {
            detector,
            pending: Vec::with_capacity(frame_len * 2),
            frame_len,
        })
    }
}

impl WakeWordScorer for RustpotterScorer {
    fn score(&mut self, samples: &[i16]) -> WakeScores {
        self.pending
            .extend(samples.iter().map(|&s| f32::from(s) / 32_768.0));

        let mut scores = WakeScores::new();
        while self.pending.len() >= self.frame_len {
            let frame: Vec<f32> = self.pending.drain(..self.frame_len).collect();
            if let Some(detection) = self.detector.process_f32(&frame) {
                let best = scores.entry(detection.name).or_insert(0.0);
                *best = best.max(detection.score);
            }
        }
        scores
    }
}
