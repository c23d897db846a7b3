use std::path::Path;
use std::time::{Duration, Instant};
use tracing::info;

#[derive(Debug, Clone)]
pub struct DetectionRecord {
    pub original: String,
    pub translated: String,
    pub confidence: f32,
}

/// Per-run reporter: one log record per detection, artifact locations, and
/// the total wall-clock duration. Nothing outlives the run.
pub struct ResultReporter {
    started: Instant,
    records: Vec<DetectionRecord>,
}

impl ResultReporter {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            records: Vec::new(),
        }
    }

    pub fn record(&mut self, original: &str, translated: &str, confidence: f32) {
        info!(
            "Original: {} | Translated: {} (conf: {:.2})",
            original, translated, confidence
        );
        self.records.push(DetectionRecord {
            original: original.to_string(),
            translated: translated.to_string(),
            confidence,
        });
    }

    pub fn artifact(&self, label: &str, path: &Path) {
        info!("{} saved to: {}", label, path.display());
    }

    pub fn records(&self) -> &[DetectionRecord] {
        &self.records
    }

    pub fn finish(&self) -> Duration {
        let elapsed = self.started.elapsed();
        info!(
            "Processed {} detection(s) in {:.2}s",
            self.records.len(),
            elapsed.as_secs_f64()
        );
        elapsed
    }
}

impl Default for ResultReporter {
    fn default() -> Self {
        Self::new()
    }
}
