use std::collections::BTreeMap;
use std::time::Instant;

/// Observer for per-tick processing events.
///
/// Keeps the frame processor independent of how timings and progress are
/// reported (log lines, a GUI status bar, nothing at all).
pub trait PipelineLogger: Send {
    /// Called once per presented frame.
    fn progress(&mut self, ticks: usize);

    /// How long a named stage took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// A point-in-time value, e.g. the number of faces found.
    fn metric(&mut self, name: &str, value: f64);

    /// A human-readable event such as a mode change.
    fn info(&mut self, message: &str);

    /// End-of-run report. Default: no-op.
    fn summary(&self) {}
}

/// Discards every event.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _ticks: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Stats {
    count: usize,
    total: f64,
    max: f64,
}

impl Stats {
    fn record(&mut self, value: f64) {
        self.count += 1;
        self.total += value;
        self.max = self.max.max(value);
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total / self.count as f64
        }
    }
}

/// Aggregates stage timings and metrics through the `log` facade and
/// prints a summary when the run ends.
///
/// A progress line is logged every `throttle_ticks` frames.
pub struct SummaryPipelineLogger {
    throttle_ticks: usize,
    timings: BTreeMap<String, Stats>,
    metrics: BTreeMap<String, Stats>,
    started: Instant,
    ticks: usize,
}

impl SummaryPipelineLogger {
    pub fn new(throttle_ticks: usize) -> Self {
        Self {
            throttle_ticks: throttle_ticks.max(1),
            timings: BTreeMap::new(),
            metrics: BTreeMap::new(),
            started: Instant::now(),
            ticks: 0,
        }
    }

    /// Formatted report, or `None` before anything was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }
        let elapsed = self.started.elapsed().as_secs_f64();
        let mut lines = vec![format!("{} frames in {elapsed:.1}s", self.ticks)];

        for (stage, stats) in &self.timings {
            lines.push(format!(
                "  {stage:10} mean {:6.2}ms  max {:6.2}ms  ({} samples)",
                stats.mean(),
                stats.max,
                stats.count
            ));
        }
        for (name, stats) in &self.metrics {
            lines.push(format!("  {name}: mean {:.1}", stats.mean()));
        }
        if self.ticks > 0 && elapsed > 0.0 {
            lines.push(format!("  rate: {:.1} fps", self.ticks as f64 / elapsed));
        }
        Some(lines.join("\n"))
    }

    pub fn mean_timing(&self, stage: &str) -> Option<f64> {
        self.timings.get(stage).map(Stats::mean)
    }

    pub fn mean_metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).map(Stats::mean)
    }

    pub fn ticks(&self) -> usize {
        self.ticks
    }
}

impl Default for SummaryPipelineLogger {
    fn default() -> Self {
        Self::new(100)
    }
}

impl PipelineLogger for SummaryPipelineLogger {
    fn progress(&mut self, ticks: usize) {
        self.ticks = ticks;
        if ticks % self.throttle_ticks == 0 {
            log::info!("Processed {ticks} frames");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings.entry(stage.to_string()).or_default().record(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics.entry(name.to_string()).or_default().record(value);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("Run summary: {text}");
        }
    }
}
