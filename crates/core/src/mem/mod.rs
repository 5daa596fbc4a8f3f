//! GPU memory hierarchy.
//!
//! This module composes two cache levels over a flat VRAM byte store. It
//! provides:
//! 1. **Coherent reads:** L1 → L2 → VRAM lookup with downward fills so the
//!    faster levels are warm for the next access.
//! 2. **Write-through writes:** Every write reaches L1, L2, and VRAM in one
//!    operation.
//! 3. **Allocation:** A bump allocator with deallocation tracking. Freed
//!    regions are not reclaimed; frees exist to invalidate stale cache lines.
//! 4. **Accounting:** Per-level hit/miss counts and a weighted mean access
//!    latency in cycles.

/// Set-associative data cache with LRU replacement.
pub mod cache;

/// Lazily allocated VRAM byte store.
pub mod vram;

use std::collections::HashMap;

use self::cache::GpuCache;
use self::vram::VramBuffer;
use crate::config::MemoryConfig;

/// Allocation granularity in bytes; requested sizes are rounded up to this.
const ALLOC_ALIGN: u64 = 16;

/// Snapshot of memory hierarchy performance counters.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MemoryStats {
    /// L1 cache hit count.
    pub l1_hits: u64,
    /// L1 cache miss count.
    pub l1_misses: u64,
    /// L2 cache hit count.
    pub l2_hits: u64,
    /// L2 cache miss count.
    pub l2_misses: u64,
    /// VRAM access count (VRAM is reached exactly on L2 miss).
    pub vram_accesses: u64,
    /// Mean access latency in cycles, weighted by where accesses were served.
    pub avg_access_latency: f64,
}

/// Two-level cache hierarchy over a VRAM backing store with a bump allocator.
///
/// The hierarchy exclusively owns its caches, the VRAM buffer, and the
/// allocation map. Consumers interact through `read`/`write`/`allocate`/
/// `deallocate`; cache misses are structural, not errors, and only
/// out-of-bounds addressing or allocator exhaustion surface as failures.
pub struct MemoryHierarchy {
    l1: GpuCache,
    l2: GpuCache,
    vram: VramBuffer,
    next_address: u64,
    allocations: HashMap<u64, usize>,
    l1_latency: u64,
    l2_latency: u64,
    vram_latency: u64,
}

impl MemoryHierarchy {
    /// Creates a hierarchy from the given configuration.
    pub fn new(config: &MemoryConfig) -> Self {
        Self {
            l1: GpuCache::new(&config.l1),
            l2: GpuCache::new(&config.l2),
            vram: VramBuffer::new(config.vram_size),
            next_address: config.alloc_base,
            allocations: HashMap::new(),
            l1_latency: config.l1.latency,
            l2_latency: config.l2.latency,
            vram_latency: config.vram_latency,
        }
    }

    /// Reads `buf.len()` bytes starting at `address`.
    ///
    /// Tries L1 first, then L2 (filling L1 on an L2 hit), then VRAM (filling
    /// L2 then L1). Returns `false` only when the range falls outside VRAM.
    pub fn read(&mut self, address: u64, buf: &mut [u8]) -> bool {
        if self.l1.read(address, buf) {
            return true;
        }

        if self.l2.read(address, buf) {
            self.l1.write(address, buf);
            return true;
        }

        if self.vram.contains(address, buf.len()) {
            buf.copy_from_slice(self.vram.read_slice(address as usize, buf.len()));
            self.l2.write(address, buf);
            self.l1.write(address, buf);
            return true;
        }

        false
    }

    /// Writes `data` through L1, L2, and VRAM.
    ///
    /// Returns `false` when the range falls outside VRAM. The cache levels
    /// still capture the write in that case; callers treating the return
    /// value as authoritative must not rely on such lines having a backing
    /// store.
    pub fn write(&mut self, address: u64, data: &[u8]) -> bool {
        self.l1.write(address, data);
        self.l2.write(address, data);

        if self.vram.contains(address, data.len()) {
            self.vram.write_slice(address as usize, data);
            return true;
        }

        false
    }

    /// Allocates `size` bytes of VRAM, rounded up to a 16-byte multiple.
    ///
    /// Returns `None` when the request does not fit below the VRAM bound.
    /// Successive successful allocations return strictly increasing
    /// addresses; there is no reuse of freed regions.
    pub fn allocate(&mut self, size: usize) -> Option<u64> {
        let address = self.next_address;
        let size = (size as u64 + ALLOC_ALIGN - 1) & !(ALLOC_ALIGN - 1);

        if address.checked_add(size)? > self.vram.len() as u64 {
            return None;
        }

        self.allocations.insert(address, size as usize);
        self.next_address += size;

        Some(address)
    }

    /// Releases the allocation at `address`, invalidating covering cache lines.
    ///
    /// Every L1-line-sized stride of the freed range is invalidated in both
    /// levels, so no stale line can satisfy a later access to recycled
    /// addresses. Unknown addresses are a no-op.
    pub fn deallocate(&mut self, address: u64) {
        if let Some(size) = self.allocations.remove(&address) {
            let stride = self.l1.line_bytes() as u64;
            let mut addr = address;
            while addr < address + size as u64 {
                self.l1.invalidate(addr);
                self.l2.invalidate(addr);
                addr += stride;
            }
        }
    }

    /// Size in bytes of the allocation at `address`, if one is recorded.
    pub fn allocation_size(&self, address: u64) -> Option<usize> {
        self.allocations.get(&address).copied()
    }

    /// Flushes both cache levels.
    pub fn flush_all_caches(&mut self) {
        self.l1.flush();
        self.l2.flush();
    }

    /// Synthesizes the current performance counters.
    ///
    /// `vram_accesses` equals the L2 miss count. The mean latency weights
    /// each level's configured latency by the fraction of L1-level accesses
    /// it served; it is 0.0 before the first access.
    pub fn statistics(&self) -> MemoryStats {
        let l1_hits = self.l1.hits();
        let l1_misses = self.l1.misses();
        let l2_hits = self.l2.hits();
        let l2_misses = self.l2.misses();
        let vram_accesses = l2_misses;

        let total = l1_hits + l1_misses;
        let avg_access_latency = if total > 0 {
            let total = total as f64;
            (l1_hits as f64 / total) * self.l1_latency as f64
                + (l2_hits as f64 / total) * self.l2_latency as f64
                + (vram_accesses as f64 / total) * self.vram_latency as f64
        } else {
            0.0
        };

        MemoryStats {
            l1_hits,
            l1_misses,
            l2_hits,
            l2_misses,
            vram_accesses,
            avg_access_latency,
        }
    }
}
