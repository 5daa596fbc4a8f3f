//! Performance Monitor Unit Tests.
//!
//! Verifies counters, timers, cache recordings, bandwidth windows, frame
//! histories, report aggregation, and threshold alerts.

use gpu_core::monitor::PerformanceMonitor;

use crate::common::init;

// ══════════════════════════════════════════════════════════
// 1. Counters
// ══════════════════════════════════════════════════════════

/// Increment, set, and get behave as running counters; unknown names read 0.
#[test]
fn counter_operations() {
    init();
    let mut mon = PerformanceMonitor::new();

    assert_eq!(mon.get_counter("unknown"), 0);

    mon.increment_counter("frames", 1);
    mon.increment_counter("frames", 2);
    assert_eq!(mon.get_counter("frames"), 3);

    mon.set_counter("frames", 10);
    assert_eq!(mon.get_counter("frames"), 10);
}

// ══════════════════════════════════════════════════════════
// 2. Timers
// ══════════════════════════════════════════════════════════

/// A start/end pair records one elapsed sample.
#[test]
fn timer_records_elapsed() {
    init();
    let mut mon = PerformanceMonitor::new();

    mon.start_timer("work");
    mon.end_timer("work");

    assert!(mon.get_elapsed_time_ms("work") > 0.0);
}

/// Ending a timer that was never started is a no-op.
#[test]
fn end_without_start_is_noop() {
    init();
    let mut mon = PerformanceMonitor::new();

    mon.end_timer("never_started");
    assert_eq!(mon.get_elapsed_time_ms("never_started"), 0.0);
}

/// A consumed timer must be restarted before it can record again.
#[test]
fn timer_start_is_consumed_by_end() {
    init();
    let mut mon = PerformanceMonitor::new();

    mon.start_timer("work");
    mon.end_timer("work");
    mon.end_timer("work"); // second end has no matching start

    let report = mon.generate_report();
    assert!(report.timing_data.contains_key("work"));
}

// ══════════════════════════════════════════════════════════
// 3. Cache Recordings and Alerts
// ══════════════════════════════════════════════════════════

/// Three recordings (hit, miss, hit) yield a 2/3 hit rate; an alert fires
/// for a 0.7 threshold but not for 0.6.
#[test]
fn cache_hit_rate_and_alerts() {
    init();
    let mut mon = PerformanceMonitor::new();

    mon.record_cache_access("c", true);
    mon.record_cache_access("c", false);
    mon.record_cache_access("c", true);

    let rate = mon.cache_hit_rate("c").expect("rate recorded");
    assert!((rate - 2.0 / 3.0).abs() < 1e-9);

    mon.set_performance_threshold("c_hit_rate", 0.7);
    assert_eq!(mon.check_performance_alerts().len(), 1);

    mon.set_performance_threshold("c_hit_rate", 0.6);
    assert!(mon.check_performance_alerts().is_empty());
}

/// Frame-time alerts compare the most recent frame against the threshold.
#[test]
fn frame_time_alert_uses_latest_frame() {
    init();
    let mut mon = PerformanceMonitor::new();
    mon.set_performance_threshold("frame_time_ms", 16.6);

    mon.record_frame_metrics(10.0, 100, 1000);
    assert!(mon.check_performance_alerts().is_empty(), "fast frame");

    mon.record_frame_metrics(40.0, 100, 1000);
    assert_eq!(mon.check_performance_alerts().len(), 1, "slow frame");
}

/// An alert threshold for a cache that never recorded anything stays silent.
#[test]
fn alert_on_unrecorded_cache_is_silent() {
    init();
    let mut mon = PerformanceMonitor::new();

    mon.set_performance_threshold("ghost_hit_rate", 0.99);
    assert!(mon.check_performance_alerts().is_empty());
}

// ══════════════════════════════════════════════════════════
// 4. Bandwidth
// ══════════════════════════════════════════════════════════

/// Recorded bytes produce a positive rate; unknown components read 0.
#[test]
fn bandwidth_accumulates() {
    init();
    let mut mon = PerformanceMonitor::new();

    assert_eq!(mon.bandwidth_mbps("vram"), 0.0);

    mon.record_bandwidth_usage("vram", 1024 * 1024);
    mon.record_bandwidth_usage("vram", 1024 * 1024);

    assert!(mon.bandwidth_mbps("vram") > 0.0);
}

// ══════════════════════════════════════════════════════════
// 5. Reports
// ══════════════════════════════════════════════════════════

/// The report aggregates frames, caches, and derived efficiency scalars.
#[test]
fn report_aggregates_everything() {
    init();
    let mut mon = PerformanceMonitor::new();

    mon.record_frame_metrics(50.0, 10, 100);
    mon.record_frame_metrics(30.0, 20, 200);
    mon.record_cache_access("l1", true);
    mon.record_cache_access("l1", true);
    mon.record_cache_access("l2", false);
    mon.increment_counter("frames_presented", 2);

    let report = mon.generate_report();

    assert!((report.avg_frame_time_ms - 40.0).abs() < 1e-9);
    assert_eq!(report.min_frame_time_ms, 30.0);
    assert_eq!(report.max_frame_time_ms, 50.0);
    assert_eq!(report.total_triangles, 30);
    assert_eq!(report.total_fragments, 300);

    // l1 at 1.0, l2 at 0.0: efficiency is their mean.
    assert!((report.memory_efficiency - 0.5).abs() < 1e-9);
    assert_eq!(report.cache_efficiency, report.memory_efficiency);

    // 40 ms/frame = 25 fps against a 60 fps target.
    assert!((report.pipeline_utilization - 25.0 / 60.0).abs() < 1e-9);
    assert_eq!(report.counter_data.get("frames_presented"), Some(&2));
}

/// An empty monitor yields a zeroed report.
#[test]
fn empty_report_is_zeroed() {
    init();
    let mon = PerformanceMonitor::new();
    let report = mon.generate_report();

    assert_eq!(report.avg_frame_time_ms, 0.0);
    assert_eq!(report.total_triangles, 0);
    assert_eq!(report.pipeline_utilization, 0.0);
    assert!(report.cache_hit_rates.is_empty());
}

/// Frame histories are bounded at 1000 samples, oldest first out.
#[test]
fn frame_history_is_bounded() {
    init();
    let mut mon = PerformanceMonitor::new();

    for _ in 0..1005 {
        mon.record_frame_metrics(1.0, 1, 1);
    }

    let report = mon.generate_report();
    assert_eq!(report.total_triangles, 1000);
    assert_eq!(report.total_fragments, 1000);
}

/// Reset clears every recorded metric.
#[test]
fn reset_clears_state() {
    init();
    let mut mon = PerformanceMonitor::new();

    mon.increment_counter("x", 5);
    mon.record_cache_access("c", true);
    mon.record_frame_metrics(10.0, 1, 1);
    mon.set_performance_threshold("frame_time_ms", 1.0);

    mon.reset();

    assert_eq!(mon.get_counter("x"), 0);
    assert_eq!(mon.cache_hit_rate("c"), None);
    assert!(mon.check_performance_alerts().is_empty());
    assert_eq!(mon.generate_report().total_triangles, 0);
}
