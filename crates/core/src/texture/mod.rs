//! Adaptive texture cache.
//!
//! This module implements a byte-addressable cache of whole texture/mip blobs
//! sitting above the memory hierarchy. It provides:
//! 1. **Demand fills:** Misses allocate VRAM, pull the blob through the
//!    hierarchy, and insert it, evicting first if needed.
//! 2. **Priority eviction:** Victims are chosen by a score combining recency,
//!    frequency, and a prefetch penalty, so speculative data never crowds out
//!    proven data.
//! 3. **Pattern prefetching:** A bounded access history predicts mip walks
//!    and sequential texture sweeps; predictions are serviced synchronously.
//! 4. **Self-tuning:** Observed hit rate and prefetch efficiency periodically
//!    adjust the prefetch aggressiveness and eviction threshold.

/// Access-pattern history and prefetch prediction.
pub mod pattern;

use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use self::pattern::PatternTracker;
use crate::config::TextureCacheConfig;
use crate::mem::MemoryHierarchy;
use crate::monitor::PerformanceMonitor;

/// Smallest entry payload; misses always fill at least this much.
const MIN_ENTRY_BYTES: usize = 1024 * 1024;

/// Mip levels at or above this collide in the packed cache key and are rejected.
const MIP_KEY_LIMIT: u32 = 256;

/// Packs a texture id and mip level into the cache key.
///
/// The mip level occupies the low 8 bits; callers must have rejected
/// `mip_level >= MIP_KEY_LIMIT` so distinct inputs cannot collide.
fn cache_key(texture_id: u64, mip_level: u32) -> u64 {
    (texture_id << 8) | (mip_level as u64 & 0xFF)
}

/// A resident texture/mip blob and its replacement metadata.
pub struct TextureCacheEntry {
    /// Texture identifier (opaque 64-bit token supplied by the caller).
    pub texture_id: u64,
    /// Mip level of this blob.
    pub mip_level: u32,
    /// Backing VRAM address of the blob.
    pub address: u64,
    /// Owned payload bytes.
    pub data: Vec<u8>,
    /// Microseconds since the cache epoch at the last access.
    pub last_access_time: u64,
    /// Number of demand accesses.
    pub access_count: u32,
    /// Set while the entry is speculative; cleared by the first demand hit.
    pub is_prefetched: bool,
}

impl TextureCacheEntry {
    /// Eviction priority at time `now_us`; lower scores evict first.
    ///
    /// `recency * frequency * bonus`, where recency decays over seconds since
    /// the last access, frequency is `ln(1 + access_count)`, and the bonus
    /// halves the score of still-speculative entries so unproven prefetches
    /// are the first to go.
    pub fn priority_score(&self, now_us: u64) -> f64 {
        let age_s = now_us.saturating_sub(self.last_access_time) as f64 / 1_000_000.0;
        let recency = 1.0 / (1.0 + age_s);
        let frequency = (1.0 + self.access_count as f64).ln();
        let bonus = if self.is_prefetched { 0.5 } else { 1.0 };
        recency * frequency * bonus
    }
}

/// Snapshot of texture cache performance metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CacheMetrics {
    /// Demand accesses served from a resident entry.
    pub cache_hits: u64,
    /// Demand accesses that required a fill.
    pub cache_misses: u64,
    /// Prefetched entries that served a demand access.
    pub prefetch_hits: u64,
    /// Prefetched entries discarded before any demand access.
    pub prefetch_misses: u64,
    /// `cache_hits / (cache_hits + cache_misses)`, 0.0 with no accesses.
    pub hit_rate: f64,
    /// `prefetch_hits / (prefetch_hits + prefetch_misses)`, 0.0 with no prefetches.
    pub prefetch_efficiency: f64,
    /// Total bytes pulled through the memory hierarchy by fills.
    pub bytes_transferred: u64,
    /// Mean wall-clock duration of `read_texture` calls in milliseconds.
    pub avg_access_latency_ms: f64,
    /// Resident payload bytes as a percentage of capacity.
    pub cache_utilization_percent: u32,
}

/// Byte-addressable cache of texture/mip blobs with prefetching and
/// adaptive self-tuning.
///
/// The cache owns its entries and accounting; the memory hierarchy and
/// performance monitor it collaborates with are threaded in as explicit
/// handles on each operation, so ownership stays a star with no cycles.
pub struct TextureCache {
    entries: HashMap<u64, TextureCacheEntry>,
    prefetch_queue: VecDeque<u64>,
    max_cache_size_bytes: usize,
    current_cache_size_bytes: usize,

    smart_prefetching: bool,
    adaptive_caching: bool,
    prefetch_distance: u32,
    prefetch_aggressiveness: f32,
    eviction_threshold: f32,
    optimization_interval_ms: u64,

    patterns: PatternTracker,
    epoch: Instant,
    last_optimization: Instant,

    cache_hits: u64,
    cache_misses: u64,
    prefetch_hits: u64,
    prefetch_misses: u64,
    bytes_transferred: u64,
    total_access_time_ms: f64,
}

impl TextureCache {
    /// Creates a texture cache from the given configuration.
    ///
    /// The tunable seeds are clamped into their self-tuning ranges.
    pub fn new(config: &TextureCacheConfig) -> Self {
        let now = Instant::now();
        Self {
            entries: HashMap::new(),
            prefetch_queue: VecDeque::new(),
            max_cache_size_bytes: config.capacity_bytes,
            current_cache_size_bytes: 0,
            smart_prefetching: config.smart_prefetching,
            adaptive_caching: config.adaptive_caching,
            prefetch_distance: config.prefetch_distance,
            prefetch_aggressiveness: config.prefetch_aggressiveness.clamp(0.1, 1.0),
            eviction_threshold: config.eviction_threshold.clamp(0.5, 0.9),
            optimization_interval_ms: config.optimization_interval_ms,
            patterns: PatternTracker::new(config.max_pattern_history),
            epoch: now,
            last_optimization: now,
            cache_hits: 0,
            cache_misses: 0,
            prefetch_hits: 0,
            prefetch_misses: 0,
            bytes_transferred: 0,
            total_access_time_ms: 0.0,
        }
    }

    /// Microseconds elapsed since the cache epoch.
    fn now_us(&self) -> u64 {
        self.epoch.elapsed().as_micros() as u64
    }

    /// Enables or disables pattern-based prefetching.
    pub fn set_smart_prefetching(&mut self, enable: bool) {
        self.smart_prefetching = enable;
    }

    /// Enables or disables periodic parameter retuning.
    pub fn set_adaptive_caching(&mut self, enable: bool) {
        self.adaptive_caching = enable;
    }

    /// Sets the prefetch lookahead distance.
    pub fn set_prefetch_distance(&mut self, distance: u32) {
        self.prefetch_distance = distance;
    }

    /// Configured prefetch lookahead distance.
    pub fn prefetch_distance(&self) -> u32 {
        self.prefetch_distance
    }

    /// Current prefetch aggressiveness (self-tuned within [0.1, 1.0]).
    pub fn prefetch_aggressiveness(&self) -> f32 {
        self.prefetch_aggressiveness
    }

    /// Current eviction threshold (self-tuned within [0.5, 0.9]).
    pub fn eviction_threshold(&self) -> f32 {
        self.eviction_threshold
    }

    /// Number of resident entries.
    pub fn resident_entries(&self) -> usize {
        self.entries.len()
    }

    /// Sum of resident payload sizes in bytes.
    pub fn current_size_bytes(&self) -> usize {
        self.current_cache_size_bytes
    }

    /// Capacity bound in bytes.
    pub fn capacity_bytes(&self) -> usize {
        self.max_cache_size_bytes
    }

    /// Returns the resident entry for `(texture_id, mip_level)`, if any.
    pub fn entry(&self, texture_id: u64, mip_level: u32) -> Option<&TextureCacheEntry> {
        if mip_level >= MIP_KEY_LIMIT {
            return None;
        }
        self.entries.get(&cache_key(texture_id, mip_level))
    }

    /// Returns `true` if `(texture_id, mip_level)` is resident.
    pub fn contains(&self, texture_id: u64, mip_level: u32) -> bool {
        self.entry(texture_id, mip_level).is_some()
    }

    /// Reads `buf.len()` bytes of the `(texture_id, mip_level)` blob starting
    /// at `offset`.
    ///
    /// The access is recorded into the pattern history before the hit/miss
    /// decision so prediction sees the access being made. A resident entry
    /// whose payload covers the requested slice is a hit; anything else takes
    /// the fill path: allocate VRAM, pull the blob through the hierarchy,
    /// evict to fit, insert. After the access, prediction and (rate-limited)
    /// retuning run regardless of hit or miss.
    ///
    /// Returns `false` for mip levels ≥ 256, on allocator exhaustion, on a
    /// backing-read failure, or when the blob cannot fit the cache at all.
    pub fn read_texture(
        &mut self,
        mem: &mut MemoryHierarchy,
        mon: &mut PerformanceMonitor,
        texture_id: u64,
        mip_level: u32,
        offset: u64,
        buf: &mut [u8],
    ) -> bool {
        if mip_level >= MIP_KEY_LIMIT {
            return false;
        }

        let start = Instant::now();
        let now_us = self.now_us();
        self.patterns.record(texture_id, mip_level, now_us);

        let key = cache_key(texture_id, mip_level);
        let ok = self.lookup_or_fill(mem, mon, key, texture_id, mip_level, offset, buf, now_us);

        if self.smart_prefetching {
            self.run_predictor(mem, mon);
        }
        if self.adaptive_caching
            && self.last_optimization.elapsed().as_millis() as u64 >= self.optimization_interval_ms
        {
            self.tune_performance_parameters(mon);
            self.last_optimization = Instant::now();
        }

        self.total_access_time_ms += start.elapsed().as_secs_f64() * 1000.0;
        ok
    }

    /// Hit path plus demand-fill path of `read_texture`.
    #[allow(clippy::too_many_arguments)]
    fn lookup_or_fill(
        &mut self,
        mem: &mut MemoryHierarchy,
        mon: &mut PerformanceMonitor,
        key: u64,
        texture_id: u64,
        mip_level: u32,
        offset: u64,
        buf: &mut [u8],
        now_us: u64,
    ) -> bool {
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.last_access_time = now_us;
            entry.access_count += 1;

            let end = offset.checked_add(buf.len() as u64);
            if end.is_some_and(|end| end <= entry.data.len() as u64) {
                let offset = offset as usize;
                buf.copy_from_slice(&entry.data[offset..offset + buf.len()]);

                self.cache_hits += 1;
                if entry.is_prefetched {
                    // First demand consumption proves the prefetch out.
                    self.prefetch_hits += 1;
                    entry.is_prefetched = false;
                }

                mon.record_cache_access("texture_cache", true);
                mon.increment_counter("texture_cache_bytes_read", buf.len() as u64);
                return true;
            }
            // Requested slice exceeds the resident blob: refill as a miss.
        }

        self.cache_misses += 1;
        mon.record_cache_access("texture_cache", false);
        mon.start_timer("texture_load_from_memory");

        let filled = self.fill_entry(mem, mon, key, texture_id, mip_level, offset, buf, now_us);

        mon.end_timer("texture_load_from_memory");
        filled
    }

    /// Demand fill: allocate, read through the hierarchy, evict, insert.
    #[allow(clippy::too_many_arguments)]
    fn fill_entry(
        &mut self,
        mem: &mut MemoryHierarchy,
        mon: &mut PerformanceMonitor,
        key: u64,
        texture_id: u64,
        mip_level: u32,
        offset: u64,
        buf: &mut [u8],
        now_us: u64,
    ) -> bool {
        let entry_size = buf.len().max(MIN_ENTRY_BYTES);
        if entry_size > self.max_cache_size_bytes {
            return false;
        }

        let Some(address) = mem.allocate(entry_size) else {
            return false;
        };

        let mut data = vec![0u8; entry_size];
        if !mem.read(address, &mut data) {
            mem.deallocate(address);
            return false;
        }

        // A stale entry under this key (undersized blob) is replaced outright.
        self.remove_entry(key, mem);
        self.evict_until_fits(entry_size, mem);

        let end = offset.checked_add(buf.len() as u64);
        if end.is_some_and(|end| end <= data.len() as u64) {
            let offset = offset as usize;
            buf.copy_from_slice(&data[offset..offset + buf.len()]);
        }

        self.entries.insert(
            key,
            TextureCacheEntry {
                texture_id,
                mip_level,
                address,
                data,
                last_access_time: now_us,
                access_count: 1,
                is_prefetched: false,
            },
        );
        self.current_cache_size_bytes += entry_size;
        self.bytes_transferred += entry_size as u64;
        mon.record_bandwidth_usage("texture_cache", entry_size as u64);

        true
    }

    /// Requests that `(texture_id, mip_level)` be made resident speculatively.
    ///
    /// Already-resident keys are a no-op. The request is queued and the queue
    /// drained immediately (the prefetch model is synchronous). Allocation or
    /// backing-read failures drop the request silently.
    pub fn prefetch_texture(
        &mut self,
        mem: &mut MemoryHierarchy,
        mon: &mut PerformanceMonitor,
        texture_id: u64,
        mip_level: u32,
    ) {
        if mip_level >= MIP_KEY_LIMIT {
            return;
        }
        let key = cache_key(texture_id, mip_level);
        if self.entries.contains_key(&key) {
            return;
        }
        self.prefetch_queue.push_back(key);

        while let Some(key) = self.prefetch_queue.pop_front() {
            if self.entries.contains_key(&key) {
                continue;
            }
            self.service_prefetch(mem, mon, key);
        }
    }

    /// Fills one queued prefetch request.
    fn service_prefetch(
        &mut self,
        mem: &mut MemoryHierarchy,
        mon: &mut PerformanceMonitor,
        key: u64,
    ) {
        let entry_size = MIN_ENTRY_BYTES;
        if entry_size > self.max_cache_size_bytes {
            return;
        }
        let Some(address) = mem.allocate(entry_size) else {
            return;
        };

        let mut data = vec![0u8; entry_size];
        if !mem.read(address, &mut data) {
            mem.deallocate(address);
            return;
        }

        self.evict_until_fits(entry_size, mem);

        let now_us = self.now_us();
        self.entries.insert(
            key,
            TextureCacheEntry {
                texture_id: key >> 8,
                mip_level: (key & 0xFF) as u32,
                address,
                data,
                last_access_time: now_us,
                access_count: 0,
                is_prefetched: true,
            },
        );
        self.current_cache_size_bytes += entry_size;
        self.bytes_transferred += entry_size as u64;
        mon.increment_counter("texture_prefetch_operations", 1);
        mon.record_bandwidth_usage("texture_cache", entry_size as u64);
    }

    /// Runs the pattern predictor and services any hint it emits.
    fn run_predictor(&mut self, mem: &mut MemoryHierarchy, mon: &mut PerformanceMonitor) {
        if let Some(hint) = self.patterns.predict() {
            self.prefetch_texture(mem, mon, hint.texture_id, hint.mip_level);
        }
    }

    /// Evicts minimum-score entries until `incoming` bytes fit.
    ///
    /// Runs strictly before insertion; an empty cache ends the loop.
    fn evict_until_fits(&mut self, incoming: usize, mem: &mut MemoryHierarchy) {
        let now_us = self.now_us();
        while self.current_cache_size_bytes + incoming > self.max_cache_size_bytes
            && !self.entries.is_empty()
        {
            let victim = self
                .entries
                .iter()
                .min_by(|a, b| {
                    a.1.priority_score(now_us)
                        .total_cmp(&b.1.priority_score(now_us))
                })
                .map(|(key, _)| *key);
            match victim {
                Some(key) => self.remove_entry(key, mem),
                None => break,
            }
        }
    }

    /// Removes one entry, returning its VRAM region and fixing the accounting.
    ///
    /// A still-speculative entry leaving the cache here never served a demand
    /// access, which is exactly a wasted prefetch.
    fn remove_entry(&mut self, key: u64, mem: &mut MemoryHierarchy) {
        if let Some(entry) = self.entries.remove(&key) {
            self.current_cache_size_bytes -= entry.data.len();
            mem.deallocate(entry.address);
            if entry.is_prefetched {
                self.prefetch_misses += 1;
            }
        }
    }

    /// Removes every resident mip of `texture_id`, releasing VRAM regions.
    pub fn invalidate_texture(&mut self, mem: &mut MemoryHierarchy, texture_id: u64) {
        let keys: Vec<u64> = self
            .entries
            .iter()
            .filter(|(_, e)| e.texture_id == texture_id)
            .map(|(k, _)| *k)
            .collect();
        for key in keys {
            self.remove_entry(key, mem);
        }
    }

    /// Releases all entries and their VRAM regions and clears the prefetch queue.
    pub fn flush(&mut self, mem: &mut MemoryHierarchy) {
        for (_, entry) in self.entries.drain() {
            mem.deallocate(entry.address);
            if entry.is_prefetched {
                self.prefetch_misses += 1;
            }
        }
        self.current_cache_size_bytes = 0;
        self.prefetch_queue.clear();
    }

    /// Retunes the adaptive parameters from observed rates.
    ///
    /// High prefetch efficiency (> 0.7) raises aggressiveness, low (< 0.3)
    /// lowers it, clamped to [0.1, 1.0]. High hit rate (> 0.9) raises the
    /// eviction threshold, low (< 0.7) lowers it, clamped to [0.5, 0.9].
    /// Both rates are published as percent counters.
    pub fn tune_performance_parameters(&mut self, mon: &mut PerformanceMonitor) {
        let demand_total = (self.cache_hits + self.cache_misses).max(1);
        let hit_rate = self.cache_hits as f64 / demand_total as f64;

        let prefetch_total = (self.prefetch_hits + self.prefetch_misses).max(1);
        let prefetch_efficiency = self.prefetch_hits as f64 / prefetch_total as f64;

        if prefetch_efficiency > 0.7 {
            self.prefetch_aggressiveness = (self.prefetch_aggressiveness + 0.1).min(1.0);
        } else if prefetch_efficiency < 0.3 {
            self.prefetch_aggressiveness = (self.prefetch_aggressiveness - 0.1).max(0.1);
        }

        if hit_rate > 0.9 {
            self.eviction_threshold = (self.eviction_threshold + 0.05).min(0.9);
        } else if hit_rate < 0.7 {
            self.eviction_threshold = (self.eviction_threshold - 0.05).max(0.5);
        }

        mon.set_counter("texture_cache_hit_rate_percent", (hit_rate * 100.0) as u64);
        mon.set_counter(
            "prefetch_efficiency_percent",
            (prefetch_efficiency * 100.0) as u64,
        );
    }

    /// Snapshots the current metrics with derived fields populated.
    pub fn get_metrics(&self) -> CacheMetrics {
        let demand_total = self.cache_hits + self.cache_misses;
        let hit_rate = if demand_total > 0 {
            self.cache_hits as f64 / demand_total as f64
        } else {
            0.0
        };

        let prefetch_total = self.prefetch_hits + self.prefetch_misses;
        let prefetch_efficiency = if prefetch_total > 0 {
            self.prefetch_hits as f64 / prefetch_total as f64
        } else {
            0.0
        };

        let avg_access_latency_ms = if demand_total > 0 {
            self.total_access_time_ms / demand_total as f64
        } else {
            0.0
        };

        let cache_utilization_percent = if self.max_cache_size_bytes > 0 {
            (self.current_cache_size_bytes as u64 * 100 / self.max_cache_size_bytes as u64) as u32
        } else {
            0
        };

        CacheMetrics {
            cache_hits: self.cache_hits,
            cache_misses: self.cache_misses,
            prefetch_hits: self.prefetch_hits,
            prefetch_misses: self.prefetch_misses,
            hit_rate,
            prefetch_efficiency,
            bytes_transferred: self.bytes_transferred,
            avg_access_latency_ms,
            cache_utilization_percent,
        }
    }

    /// Zeroes all performance counters without touching resident entries.
    pub fn reset_metrics(&mut self) {
        self.cache_hits = 0;
        self.cache_misses = 0;
        self.prefetch_hits = 0;
        self.prefetch_misses = 0;
        self.bytes_transferred = 0;
        self.total_access_time_ms = 0.0;
    }
}
