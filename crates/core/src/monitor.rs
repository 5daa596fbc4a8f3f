//! Performance monitoring and reporting.
//!
//! This module is the instrumentation sink called by every layer of the
//! simulator. It provides:
//! 1. **Timers:** Named wall-clock timers with bounded elapsed-time histories.
//! 2. **Counters:** Named running counters (incremented or set outright).
//! 3. **Bandwidth:** Per-component byte accumulators with derived MB/s.
//! 4. **Caches and frames:** Per-cache hit/miss tallies and bounded frame
//!    metric histories.
//! 5. **Reporting:** Aggregated report generation, printing, and
//!    threshold-triggered alerts.
//!
//! Misuse is forgiving by design: ending a timer that was never started is a
//! no-op and querying an unknown name yields zero.

use std::collections::{HashMap, VecDeque};
use std::time::Instant;

/// Longest retained history per metric; oldest samples drop first.
const MAX_HISTORY: usize = 1000;

/// Aggregated snapshot of everything the monitor has recorded.
#[derive(Debug, Clone, Default)]
pub struct PerformanceReport {
    /// Mean elapsed milliseconds per named timer.
    pub timing_data: HashMap<String, f64>,
    /// Current counter values.
    pub counter_data: HashMap<String, u64>,
    /// Derived MB/s per component.
    pub bandwidth_data: HashMap<String, f64>,
    /// Hit rate per recorded cache (caches with zero accesses are omitted).
    pub cache_hit_rates: HashMap<String, f64>,

    /// Mean frame time in milliseconds (0.0 with no frames).
    pub avg_frame_time_ms: f64,
    /// Fastest recorded frame in milliseconds.
    pub min_frame_time_ms: f64,
    /// Slowest recorded frame in milliseconds.
    pub max_frame_time_ms: f64,
    /// Sum of recorded triangle counts.
    pub total_triangles: u64,
    /// Sum of recorded fragment counts.
    pub total_fragments: u64,

    /// Mean hit rate across recorded caches.
    pub memory_efficiency: f64,
    /// Mean hit rate across recorded caches (same basis as memory efficiency).
    pub cache_efficiency: f64,
    /// `min(1.0, fps / 60)` derived from the mean frame time.
    pub pipeline_utilization: f64,
}

/// In-memory bookkeeping for timers, counters, bandwidth, caches, and frames.
#[derive(Default)]
pub struct PerformanceMonitor {
    start_times: HashMap<String, Instant>,
    timing_history: HashMap<String, VecDeque<f64>>,
    counters: HashMap<String, u64>,
    bandwidth_bytes: HashMap<String, u64>,
    bandwidth_start_times: HashMap<String, Instant>,
    cache_hits: HashMap<String, u64>,
    cache_misses: HashMap<String, u64>,
    frame_times: VecDeque<f64>,
    triangle_counts: VecDeque<u32>,
    fragment_counts: VecDeque<u32>,
    thresholds: HashMap<String, f64>,
}

/// Appends to a bounded history, dropping the oldest sample on overflow.
fn push_bounded<T>(history: &mut VecDeque<T>, value: T) {
    if history.len() >= MAX_HISTORY {
        history.pop_front();
    }
    history.push_back(value);
}

/// Mean of a sample history, 0.0 when empty.
fn mean(values: &VecDeque<f64>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

impl PerformanceMonitor {
    /// Creates an empty monitor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts (or restarts) the named timer.
    pub fn start_timer(&mut self, event: &str) {
        self.start_times.insert(event.to_string(), Instant::now());
    }

    /// Stops the named timer, appending the elapsed milliseconds to its history.
    ///
    /// Ending a timer that was never started is a no-op.
    pub fn end_timer(&mut self, event: &str) {
        if let Some(start) = self.start_times.remove(event) {
            let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
            push_bounded(
                self.timing_history.entry(event.to_string()).or_default(),
                elapsed_ms,
            );
        }
    }

    /// Mean elapsed milliseconds recorded for `event`, 0.0 if none.
    pub fn get_elapsed_time_ms(&self, event: &str) -> f64 {
        self.timing_history.get(event).map_or(0.0, mean)
    }

    /// Adds `value` to the named counter (creating it at zero).
    pub fn increment_counter(&mut self, counter: &str, value: u64) {
        *self.counters.entry(counter.to_string()).or_insert(0) += value;
    }

    /// Sets the named counter outright.
    pub fn set_counter(&mut self, counter: &str, value: u64) {
        self.counters.insert(counter.to_string(), value);
    }

    /// Current value of the named counter, 0 if never touched.
    pub fn get_counter(&self, counter: &str) -> u64 {
        self.counters.get(counter).copied().unwrap_or(0)
    }

    /// Accumulates `bytes` against the component's bandwidth window.
    ///
    /// The first record per component stamps the window start; the derived
    /// rate is total MiB over seconds since that stamp.
    pub fn record_bandwidth_usage(&mut self, component: &str, bytes: u64) {
        self.bandwidth_start_times
            .entry(component.to_string())
            .or_insert_with(Instant::now);
        *self.bandwidth_bytes.entry(component.to_string()).or_insert(0) += bytes;
    }

    /// Derived bandwidth for the component in MB/s, 0.0 when unmeasurable.
    pub fn bandwidth_mbps(&self, component: &str) -> f64 {
        let (Some(&bytes), Some(start)) = (
            self.bandwidth_bytes.get(component),
            self.bandwidth_start_times.get(component),
        ) else {
            return 0.0;
        };

        let elapsed = start.elapsed().as_secs_f64();
        if elapsed <= 0.0 {
            return 0.0;
        }
        (bytes as f64 / (1024.0 * 1024.0)) / elapsed
    }

    /// Tallies one access against the named cache.
    pub fn record_cache_access(&mut self, cache: &str, hit: bool) {
        let tally = if hit {
            &mut self.cache_hits
        } else {
            &mut self.cache_misses
        };
        *tally.entry(cache.to_string()).or_insert(0) += 1;
    }

    /// Hit rate of the named cache, or `None` before any access.
    pub fn cache_hit_rate(&self, cache: &str) -> Option<f64> {
        let hits = self.cache_hits.get(cache).copied().unwrap_or(0);
        let misses = self.cache_misses.get(cache).copied().unwrap_or(0);
        let total = hits + misses;
        if total == 0 {
            return None;
        }
        Some(hits as f64 / total as f64)
    }

    /// Records one frame's time and primitive counts.
    pub fn record_frame_metrics(&mut self, frame_time_ms: f64, triangles: u32, fragments: u32) {
        push_bounded(&mut self.frame_times, frame_time_ms);
        push_bounded(&mut self.triangle_counts, triangles);
        push_bounded(&mut self.fragment_counts, fragments);
    }

    /// Sets (or replaces) an alert threshold for a metric name.
    ///
    /// `"frame_time_ms"` alerts when the latest frame time exceeds the
    /// threshold; `"<cache>_hit_rate"` alerts when that cache's hit rate
    /// falls below it.
    pub fn set_performance_threshold(&mut self, metric: &str, threshold: f64) {
        self.thresholds.insert(metric.to_string(), threshold);
    }

    /// Evaluates every threshold and returns the triggered alert messages.
    pub fn check_performance_alerts(&self) -> Vec<String> {
        let mut alerts = Vec::new();

        for (metric, &threshold) in &self.thresholds {
            if metric == "frame_time_ms" {
                if let Some(&current) = self.frame_times.back() {
                    if current > threshold {
                        alerts.push(format!(
                            "Frame time exceeded threshold: {:.3} ms > {:.3} ms",
                            current, threshold
                        ));
                    }
                }
            } else if let Some(cache) = metric.strip_suffix("_hit_rate") {
                if let Some(hit_rate) = self.cache_hit_rate(cache) {
                    if hit_rate < threshold {
                        alerts.push(format!(
                            "{} hit rate below threshold: {:.1}% < {:.1}%",
                            cache,
                            hit_rate * 100.0,
                            threshold * 100.0
                        ));
                    }
                }
            }
        }

        alerts
    }

    /// Aggregates all recorded data into a report snapshot.
    pub fn generate_report(&self) -> PerformanceReport {
        let mut report = PerformanceReport::default();

        for (event, times) in &self.timing_history {
            if !times.is_empty() {
                report.timing_data.insert(event.clone(), mean(times));
            }
        }

        report.counter_data = self.counters.clone();

        for component in self.bandwidth_bytes.keys() {
            report
                .bandwidth_data
                .insert(component.clone(), self.bandwidth_mbps(component));
        }

        for cache in self.cache_hits.keys().chain(self.cache_misses.keys()) {
            if let Some(rate) = self.cache_hit_rate(cache) {
                report.cache_hit_rates.insert(cache.clone(), rate);
            }
        }

        if !self.frame_times.is_empty() {
            report.avg_frame_time_ms = mean(&self.frame_times);
            report.min_frame_time_ms = self.frame_times.iter().copied().fold(f64::MAX, f64::min);
            report.max_frame_time_ms = self.frame_times.iter().copied().fold(f64::MIN, f64::max);
            report.total_triangles = self.triangle_counts.iter().map(|&t| t as u64).sum();
            report.total_fragments = self.fragment_counts.iter().map(|&f| f as u64).sum();
        }

        if !report.cache_hit_rates.is_empty() {
            let total: f64 = report.cache_hit_rates.values().sum();
            report.memory_efficiency = total / report.cache_hit_rates.len() as f64;
        }
        report.cache_efficiency = report.memory_efficiency;

        if report.avg_frame_time_ms > 0.0 {
            let fps = 1000.0 / report.avg_frame_time_ms;
            report.pipeline_utilization = (fps / 60.0).min(1.0);
        }

        report
    }

    /// Prints the full report to stdout.
    pub fn print_report(&self) {
        let report = self.generate_report();

        println!("\n==========================================================");
        println!("GPU SIMULATOR PERFORMANCE REPORT");
        println!("==========================================================");

        println!("TIMING");
        let mut timings: Vec<_> = report.timing_data.iter().collect();
        timings.sort_by(|a, b| a.0.cmp(b.0));
        for (event, avg) in timings {
            println!("  {:<30} {:.3} ms", event, avg);
        }
        println!("----------------------------------------------------------");

        println!("FRAMES");
        println!("  frame_time.avg               {:.3} ms", report.avg_frame_time_ms);
        println!("  frame_time.min               {:.3} ms", report.min_frame_time_ms);
        println!("  frame_time.max               {:.3} ms", report.max_frame_time_ms);
        if report.avg_frame_time_ms > 0.0 {
            println!(
                "  fps.avg                      {:.2}",
                1000.0 / report.avg_frame_time_ms
            );
        }
        println!("  triangles.total              {}", report.total_triangles);
        println!("  fragments.total              {}", report.total_fragments);
        println!("----------------------------------------------------------");

        println!("CACHES");
        let mut rates: Vec<_> = report.cache_hit_rates.iter().collect();
        rates.sort_by(|a, b| a.0.cmp(b.0));
        for (cache, rate) in rates {
            println!("  {:<30} hit_rate: {:.2}%", cache, rate * 100.0);
        }
        println!("----------------------------------------------------------");

        println!("BANDWIDTH");
        let mut bandwidth: Vec<_> = report.bandwidth_data.iter().collect();
        bandwidth.sort_by(|a, b| a.0.cmp(b.0));
        for (component, mbps) in bandwidth {
            println!("  {:<30} {:.2} MB/s", component, mbps);
        }
        println!("----------------------------------------------------------");

        println!("EFFICIENCY");
        println!(
            "  memory_efficiency            {:.2}%",
            report.memory_efficiency * 100.0
        );
        println!(
            "  cache_efficiency             {:.2}%",
            report.cache_efficiency * 100.0
        );
        println!(
            "  pipeline_utilization         {:.2}%",
            report.pipeline_utilization * 100.0
        );
        println!("----------------------------------------------------------");

        println!("COUNTERS");
        let mut counters: Vec<_> = report.counter_data.iter().collect();
        counters.sort_by(|a, b| a.0.cmp(b.0));
        for (counter, value) in counters {
            println!("  {:<30} {}", counter, value);
        }
        println!("==========================================================");
    }

    /// Clears every recorded metric, history, and threshold.
    pub fn reset(&mut self) {
        self.start_times.clear();
        self.timing_history.clear();
        self.counters.clear();
        self.bandwidth_bytes.clear();
        self.bandwidth_start_times.clear();
        self.cache_hits.clear();
        self.cache_misses.clear();
        self.frame_times.clear();
        self.triangle_counts.clear();
        self.fragment_counts.clear();
        self.thresholds.clear();
    }
}
