//! Set-Associative Cache Unit Tests.
//!
//! Verifies lookup, LRU replacement, payload copy clipping, invalidation,
//! flushing, and the hit/miss accounting invariant of the per-level cache.
//!
//! The cache is constructed directly from CacheConfig; no hierarchy needed.

use gpu_core::mem::cache::GpuCache;

use crate::common::{init, small_cache_config};

// ══════════════════════════════════════════════════════════
// 1. Accounting Invariant
// ══════════════════════════════════════════════════════════

/// After any mix of reads and writes, hits + misses == accesses.
#[test]
fn hits_plus_misses_equals_accesses() {
    init();
    let mut cache = GpuCache::new(&small_cache_config());
    let mut buf = [0u8; 16];

    cache.read(0x1000, &mut buf); // miss
    cache.write(0x1000, &[1, 2, 3, 4]); // miss, allocates
    cache.read(0x1000, &mut buf); // hit
    cache.write(0x2000, &[5, 6]); // miss
    cache.read(0x3000, &mut buf); // miss

    assert_eq!(cache.hits() + cache.misses(), cache.accesses());
    assert_eq!(cache.accesses(), 5);
}

/// Invalidate and flush do not count as accesses.
#[test]
fn invalidate_and_flush_do_not_count_accesses() {
    init();
    let mut cache = GpuCache::new(&small_cache_config());

    cache.write(0, &[1]);
    let before = cache.accesses();

    cache.invalidate(0);
    cache.flush();

    assert_eq!(cache.accesses(), before);
}

// ══════════════════════════════════════════════════════════
// 2. Read Semantics
// ══════════════════════════════════════════════════════════

/// A read miss reports false and installs nothing; the caller owns fills.
#[test]
fn read_miss_installs_nothing() {
    init();
    let mut cache = GpuCache::new(&small_cache_config());
    let mut buf = [0u8; 8];

    assert!(!cache.read(0x1000, &mut buf));
    assert_eq!(cache.misses(), 1);

    // Still a miss: the failed read must not have allocated a line.
    assert!(!cache.read(0x1000, &mut buf));
    assert_eq!(cache.misses(), 2);
}

/// Data written is readable back from the same line.
#[test]
fn write_then_read_roundtrip() {
    init();
    let mut cache = GpuCache::new(&small_cache_config());

    cache.write(0x80, &[0xAA, 0xBB, 0xCC]);

    let mut buf = [0u8; 3];
    assert!(cache.read(0x80, &mut buf));
    assert_eq!(buf, [0xAA, 0xBB, 0xCC]);
}

/// A write at an unaligned address lands in its aligned line: reads at other
/// offsets of the same line hit.
#[test]
fn unaligned_write_fills_aligned_line() {
    init();
    let mut cache = GpuCache::new(&small_cache_config());

    cache.write(70, &[9, 9]); // line base 64

    let mut buf = [0u8; 2];
    assert!(cache.read(64, &mut buf), "line base should hit");
    assert_eq!(buf, [0, 0], "untouched line bytes are zero");
    assert!(cache.read(70, &mut buf));
    assert_eq!(buf, [9, 9]);
}

/// A read crossing the line end copies only up to the line boundary and
/// leaves the rest of the buffer untouched; it still reports a hit.
#[test]
fn read_clips_at_line_end() {
    init();
    let mut cache = GpuCache::new(&small_cache_config());

    let pattern = [0x5A; 64];
    cache.write(0, &pattern);

    let mut buf = [0u8; 8];
    assert!(cache.read(60, &mut buf));
    assert_eq!(&buf[..4], &[0x5A; 4], "bytes up to the line end copied");
    assert_eq!(&buf[4..], &[0; 4], "bytes past the line end untouched");
}

// ══════════════════════════════════════════════════════════
// 3. LRU Replacement
// ══════════════════════════════════════════════════════════

/// Filling both ways of a set and writing a third conflicting address evicts
/// the least recently used line.
#[test]
fn conflict_evicts_lru_line() {
    init();
    let mut cache = GpuCache::new(&small_cache_config());
    let mut buf = [0u8; 1];

    // Three addresses mapping to set 0 (addr/64 even), distinct tags.
    cache.write(0, &[1]); // way 0
    cache.write(128, &[2]); // way 1
    cache.read(128, &mut buf); // refresh 128; 0 is now LRU
    cache.write(256, &[3]); // evicts 0

    assert!(!cache.read(0, &mut buf), "LRU victim evicted");
    assert!(cache.read(128, &mut buf), "recently used line survives");
    assert!(cache.read(256, &mut buf), "new line resident");
}

/// A read hit refreshes the LRU stamp and protects the line from eviction.
#[test]
fn read_hit_refreshes_lru() {
    init();
    let mut cache = GpuCache::new(&small_cache_config());
    let mut buf = [0u8; 1];

    cache.write(0, &[1]);
    cache.write(128, &[2]);
    cache.read(0, &mut buf); // 0 becomes MRU; 128 is LRU
    cache.write(256, &[3]); // evicts 128

    assert!(cache.read(0, &mut buf), "refreshed line survives");
    assert!(!cache.read(128, &mut buf), "stale line evicted");
}

// ══════════════════════════════════════════════════════════
// 4. Invalidate and Flush
// ══════════════════════════════════════════════════════════

/// An invalidated line no longer hits.
#[test]
fn invalidate_removes_line() {
    init();
    let mut cache = GpuCache::new(&small_cache_config());
    let mut buf = [0u8; 1];

    cache.write(0x1000, &[7]);
    cache.invalidate(0x1000);

    assert!(!cache.read(0x1000, &mut buf));
}

/// Invalidating one line leaves its set neighbors resident.
#[test]
fn invalidate_is_line_granular() {
    init();
    let mut cache = GpuCache::new(&small_cache_config());
    let mut buf = [0u8; 1];

    cache.write(0, &[1]);
    cache.write(128, &[2]);
    cache.invalidate(0);

    assert!(!cache.read(0, &mut buf));
    assert!(cache.read(128, &mut buf));
}

/// Flush empties every set.
#[test]
fn flush_invalidates_everything() {
    init();
    let mut cache = GpuCache::new(&small_cache_config());
    let mut buf = [0u8; 1];

    cache.write(0, &[1]);
    cache.write(64, &[2]);
    cache.write(128, &[3]);
    cache.flush();

    assert!(!cache.read(0, &mut buf));
    assert!(!cache.read(64, &mut buf));
    assert!(!cache.read(128, &mut buf));
}

// ══════════════════════════════════════════════════════════
// 5. Hit Rate
// ══════════════════════════════════════════════════════════

/// Hit rate is zero before any access and tracks hits / accesses after.
#[test]
fn hit_rate_derivation() {
    init();
    let mut cache = GpuCache::new(&small_cache_config());
    let mut buf = [0u8; 1];

    assert_eq!(cache.hit_rate(), 0.0);

    cache.write(0, &[1]); // miss
    cache.read(0, &mut buf); // hit
    cache.read(0, &mut buf); // hit
    cache.read(64, &mut buf); // miss

    assert!((cache.hit_rate() - 0.5).abs() < f64::EPSILON);
}
