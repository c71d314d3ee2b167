//! Per-run processing counters.
//!
//! Each transform keeps its own counters; the binary folds them into a
//! [`RunSummary`] that is logged and can be persisted as JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Counters kept by the resampler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResampleStats {
    /// Input events consumed
    pub events_in: u64,
    /// Uniform output events produced
    pub periods_emitted: u64,
    /// Output periods that contained no input event
    pub upsampled_periods: u64,
    /// Restarts caused by a gap above the threshold
    pub gaps: u64,
    /// Restarts caused by a timestamp before the current period
    pub backward_jumps: u64,
}

/// Counters kept by the label window applier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelStats {
    /// Input events consumed
    pub events_in: u64,
    /// Events emitted
    pub events_out: u64,
    /// Emitted events carrying a window label
    pub labeled_out: u64,
    /// Point labels found in the input
    pub labels_seen: u64,
    /// Windows opened
    pub windows_opened: u64,
    /// Windows whose start was moved to the previous window's end
    pub windows_truncated: u64,
    /// Windows left empty after truncation
    pub windows_degenerate: u64,
    /// Restarts caused by a timestamp before the last emitted event
    pub backward_jumps: u64,
}

/// Transform-specific counters of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "transform", rename_all = "snake_case")]
pub enum TransformStats {
    Resample(ResampleStats),
    Label(LabelStats),
    Latlong { pairs: u64 },
}

/// Summary of one tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub input: PathBuf,
    pub output: PathBuf,
    pub events_read: u64,
    pub events_written: u64,
    pub started: DateTime<Utc>,
    pub duration_secs: f64,
    pub transform: TransformStats,
}

impl RunSummary {
    /// Start a summary; call [`RunSummary::complete`] when the run ends.
    pub fn begin(input: &Path, output: &Path, transform: TransformStats) -> Self {
        Self {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            events_read: 0,
            events_written: 0,
            started: Utc::now(),
            duration_secs: 0.0,
            transform,
        }
    }

    /// Record final counters and elapsed time.
    pub fn complete(mut self, events_read: u64, events_written: u64, transform: TransformStats) -> Self {
        self.events_read = events_read;
        self.events_written = events_written;
        self.transform = transform;
        self.duration_secs = (Utc::now() - self.started).num_milliseconds() as f64 / 1000.0;
        self
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let mut text = format!(
            "Run Statistics:\n\
             - Input: {}\n\
             - Output: {}\n\
             - Events read: {}\n\
             - Events written: {}\n\
             - Duration: {:.3} seconds",
            self.input.display(),
            self.output.display(),
            self.events_read,
            self.events_written,
            self.duration_secs
        );

        match &self.transform {
            TransformStats::Resample(stats) => text.push_str(&format!(
                "\n - Periods emitted: {}\n\
                 - Upsampled periods: {}\n\
                 - Gap restarts: {}\n\
                 - Backward jumps: {}",
                stats.periods_emitted, stats.upsampled_periods, stats.gaps, stats.backward_jumps
            )),
            TransformStats::Label(stats) => text.push_str(&format!(
                "\n - Labels seen: {}\n\
                 - Windows opened: {} ({} truncated, {} empty)\n\
                 - Labeled events: {}\n\
                 - Backward jumps: {}",
                stats.labels_seen,
                stats.windows_opened,
                stats.windows_truncated,
                stats.windows_degenerate,
                stats.labeled_out,
                stats.backward_jumps
            )),
            TransformStats::Latlong { pairs } => {
                text.push_str(&format!("\n - Location pairs: {pairs}"))
            }
        }

        text
    }

    /// Save the summary as JSON.
    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_format() {
        let summary = RunSummary::begin(
            Path::new("in.csv"),
            Path::new("in.sampled.csv"),
            TransformStats::Resample(ResampleStats::default()),
        )
        .complete(
            10,
            4,
            TransformStats::Resample(ResampleStats {
                events_in: 10,
                periods_emitted: 4,
                upsampled_periods: 1,
                gaps: 1,
                backward_jumps: 0,
            }),
        );

        let text = summary.summary();
        assert!(text.contains("Events read: 10"));
        assert!(text.contains("Events written: 4"));
        assert!(text.contains("Upsampled periods: 1"));
        assert!(text.contains("Gap restarts: 1"));
    }

    #[test]
    fn test_label_summary_format() {
        let summary = RunSummary::begin(
            Path::new("in.csv"),
            Path::new("in.labeled.csv"),
            TransformStats::Label(LabelStats {
                windows_opened: 2,
                windows_truncated: 1,
                ..LabelStats::default()
            }),
        );
        assert!(summary
            .summary()
            .contains("Windows opened: 2 (1 truncated, 0 empty)"));
    }

    #[test]
    fn test_save_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats").join("run.json");
        let summary = RunSummary::begin(
            Path::new("in.csv"),
            Path::new("latlong"),
            TransformStats::Latlong { pairs: 3 },
        );
        summary.save(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["transform"]["transform"], "latlong");
        assert_eq!(value["transform"]["pairs"], 3);
    }
}
