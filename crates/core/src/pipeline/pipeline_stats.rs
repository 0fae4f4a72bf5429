use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Running count, sum and peak of one series. Constant size however long
/// the video is.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Running {
    count: u64,
    sum: f64,
    max: f64,
}

impl Running {
    fn add(&mut self, value: f64) {
        if self.count == 0 || value > self.max {
            self.max = value;
        }
        self.count += 1;
        self.sum += value;
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Per-stage timings and per-frame metrics for one run, logged once at
/// the end.
pub struct PipelineStats {
    stages: BTreeMap<&'static str, Running>,
    metrics: BTreeMap<&'static str, Running>,
    started: Instant,
    frames: usize,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self {
            stages: BTreeMap::new(),
            metrics: BTreeMap::new(),
            started: Instant::now(),
            frames: 0,
        }
    }

    /// Frames the run consumed, used for throughput.
    pub fn set_frames(&mut self, frames: usize) {
        self.frames = frames;
    }

    pub fn timing(&mut self, stage: &'static str, elapsed: Duration) {
        self.stages
            .entry(stage)
            .or_default()
            .add(elapsed.as_secs_f64() * 1000.0);
    }

    pub fn metric(&mut self, name: &'static str, value: f64) {
        self.metrics.entry(name).or_default().add(value);
    }

    /// `None` when nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        self.render(self.started.elapsed())
    }

    fn render(&self, wall: Duration) -> Option<String> {
        if self.stages.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let wall_ms = wall.as_secs_f64() * 1000.0;
        let mut out = format!("Run took {:.1}s over {} frames", wall_ms / 1000.0, self.frames);
        if self.frames > 0 && wall_ms > 0.0 {
            out.push_str(&format!(
                " ({:.1} fps)",
                self.frames as f64 * 1000.0 / wall_ms
            ));
        }

        for (stage, t) in &self.stages {
            let share = if wall_ms > 0.0 {
                t.sum / wall_ms * 100.0
            } else {
                0.0
            };
            out.push_str(&format!(
                "\n  {stage:<10} x{:<6} mean {:>7.2}ms  max {:>7.2}ms  {share:>5.1}% of wall",
                t.count,
                t.mean(),
                t.max
            ));
        }
        for (name, m) in &self.metrics {
            out.push_str(&format!(
                "\n  {name:<10} mean {:.2}  max {}",
                m.mean(),
                m.max
            ));
        }
        Some(out)
    }

    pub fn log_summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("{text}");
        }
    }
}

impl Default for PipelineStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_running_totals_do_not_keep_samples() {
        let mut stats = PipelineStats::new();
        for ms in [20, 30, 40] {
            stats.timing("analyze", Duration::from_millis(ms));
        }
        let analyze = stats.stages["analyze"];
        assert_eq!(analyze.count, 3);
        assert_relative_eq!(analyze.mean(), 30.0, epsilon = 1e-9);
        assert_relative_eq!(analyze.max, 40.0, epsilon = 1e-9);
        assert!(!stats.stages.contains_key("preview"));
    }

    #[test]
    fn test_metric_max_starts_from_first_sample() {
        let mut stats = PipelineStats::new();
        stats.metric("faces", -2.0);
        stats.metric("faces", -5.0);
        assert_eq!(stats.metrics["faces"].max, -2.0);
    }

    #[test]
    fn test_summary_reports_stages_metrics_and_fps() {
        let mut stats = PipelineStats::new();
        stats.set_frames(50);
        stats.timing("decode", Duration::from_millis(500));
        stats.metric("faces", 1.0);
        stats.metric("faces", 2.0);

        let text = stats.render(Duration::from_secs(2)).unwrap();
        assert!(text.starts_with("Run took 2.0s over 50 frames (25.0 fps)"), "{text}");
        assert!(text.contains("decode"));
        assert!(text.contains("25.0% of wall"), "{text}");
        assert!(text.contains("mean 1.50  max 2"), "{text}");
    }

    #[test]
    fn test_summary_without_frames_omits_fps() {
        let mut stats = PipelineStats::new();
        stats.timing("decode", Duration::from_millis(1));
        let text = stats.render(Duration::ZERO).unwrap();
        assert!(!text.contains("fps"));
    }

    #[test]
    fn test_empty_summary_returns_none() {
        assert!(PipelineStats::new().summary_string().is_none());
    }
}
