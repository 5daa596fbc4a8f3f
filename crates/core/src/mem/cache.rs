//! Set-associative data cache.
//!
//! This module implements the per-level cache used by the memory hierarchy.
//! Unlike a pure hit/miss model, lines carry their payload bytes so that the
//! hierarchy can serve reads from cached data. It provides:
//! 1. **Lookup:** Set-indexed search with tag match on the line-aligned address.
//! 2. **Replacement:** LRU over a monotonic access counter (no tie is possible,
//!    since every access increments the counter exactly once).
//! 3. **Accounting:** Hit, miss, and total access counters with a derived hit rate.

use crate::config::CacheConfig;

/// Cache line entry holding the aligned base address, payload, and state bits.
#[derive(Clone, Default)]
struct CacheLine {
    /// Base address, aligned down to the line size. Meaningful only when `valid`.
    address: u64,
    /// Payload bytes; `line_bytes` long when `valid`, empty otherwise.
    data: Vec<u8>,
    valid: bool,
    dirty: bool,
    /// Value of the access counter at the last touch; the LRU ordering key.
    last_access: u64,
}

/// Set-associative cache with LRU replacement and payload storage.
///
/// Lines live in a flat vector of `num_sets * ways` slots; the slots for set
/// `s` occupy indices `s * ways .. (s + 1) * ways`. Associativity is small
/// (4-8 ways), so lookup is a linear scan within the set.
pub struct GpuCache {
    lines: Vec<CacheLine>,
    num_sets: usize,
    ways: usize,
    line_bytes: usize,
    hits: u64,
    misses: u64,
    accesses: u64,
}

impl GpuCache {
    /// Creates a cache with the given geometry.
    ///
    /// `num_sets` is derived as `size_bytes / (line_bytes * ways)`. Degenerate
    /// geometry values are clamped to a minimal working configuration.
    pub fn new(config: &CacheConfig) -> Self {
        let ways = config.ways.max(1);
        let line_bytes = if config.line_bytes == 0 {
            64
        } else {
            config.line_bytes
        };
        let size_bytes = if config.size_bytes == 0 {
            line_bytes * ways
        } else {
            config.size_bytes
        };

        let num_sets = (size_bytes / (line_bytes * ways)).max(1);

        Self {
            lines: vec![CacheLine::default(); num_sets * ways],
            num_sets,
            ways,
            line_bytes,
            hits: 0,
            misses: 0,
            accesses: 0,
        }
    }

    /// Line size in bytes.
    pub fn line_bytes(&self) -> usize {
        self.line_bytes
    }

    /// Total hits recorded so far.
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Total misses recorded so far.
    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Total accesses recorded so far (always `hits + misses`).
    pub fn accesses(&self) -> u64 {
        self.accesses
    }

    /// Fraction of accesses that hit, or 0.0 before the first access.
    pub fn hit_rate(&self) -> f64 {
        if self.accesses == 0 {
            return 0.0;
        }
        self.hits as f64 / self.accesses as f64
    }

    /// Aligns an address down to its line base.
    fn align(&self, address: u64) -> u64 {
        address & !(self.line_bytes as u64 - 1)
    }

    /// Returns the slot index of the valid line holding `address`, if any.
    ///
    /// Indexing is in bounds by construction: the set index is reduced modulo
    /// `num_sets` and the scan stays within the set's `ways` slots.
    fn find_line(&self, address: u64) -> Option<usize> {
        let aligned = self.align(address);
        let set_index = ((address as usize) / self.line_bytes) % self.num_sets;
        let base_idx = set_index * self.ways;

        (base_idx..base_idx + self.ways)
            .find(|&idx| self.lines[idx].valid && self.lines[idx].address == aligned)
    }

    /// Installs a fresh zero-filled line for `address`, returning its slot.
    ///
    /// Prefers an empty slot; otherwise the slot with the smallest
    /// `last_access` in the set is the victim.
    fn install_line(&mut self, address: u64) -> usize {
        let aligned = self.align(address);
        let set_index = ((address as usize) / self.line_bytes) % self.num_sets;
        let base_idx = set_index * self.ways;

        let slot = (base_idx..base_idx + self.ways)
            .find(|&idx| !self.lines[idx].valid)
            .unwrap_or_else(|| {
                (base_idx..base_idx + self.ways)
                    .min_by_key(|&idx| self.lines[idx].last_access)
                    .unwrap_or(base_idx)
            });

        self.lines[slot] = CacheLine {
            address: aligned,
            data: vec![0; self.line_bytes],
            valid: true,
            dirty: false,
            last_access: self.accesses,
        };
        slot
    }

    /// Reads from the cache into `buf`.
    ///
    /// On a hit, copies up to `buf.len()` bytes starting at the in-line offset
    /// (clipped to the line end), refreshes the LRU stamp, and returns `true`.
    /// On a miss, returns `false` without filling anything; the caller decides
    /// where the data comes from and installs it with [`write`](Self::write).
    pub fn read(&mut self, address: u64, buf: &mut [u8]) -> bool {
        self.accesses += 1;

        match self.find_line(address) {
            Some(idx) => {
                self.lines[idx].last_access = self.accesses;
                let offset = (address as usize) % self.line_bytes;
                let n = buf.len().min(self.line_bytes - offset);
                buf[..n].copy_from_slice(&self.lines[idx].data[offset..offset + n]);
                self.hits += 1;
                true
            }
            None => {
                self.misses += 1;
                false
            }
        }
    }

    /// Writes `data` into the cache, allocating a line on miss.
    ///
    /// The slice is clipped to the line end; the line is marked dirty and its
    /// LRU stamp refreshed. Writes never fail.
    pub fn write(&mut self, address: u64, data: &[u8]) {
        self.accesses += 1;

        let idx = match self.find_line(address) {
            Some(idx) => {
                self.hits += 1;
                idx
            }
            None => {
                self.misses += 1;
                self.install_line(address)
            }
        };

        let offset = (address as usize) % self.line_bytes;
        let n = data.len().min(self.line_bytes - offset);
        let line = &mut self.lines[idx];
        line.data[offset..offset + n].copy_from_slice(&data[..n]);
        line.dirty = true;
        line.last_access = self.accesses;
    }

    /// Invalidates the line covering `address`, if resident.
    ///
    /// Does not count as an access.
    pub fn invalidate(&mut self, address: u64) {
        if let Some(idx) = self.find_line(address) {
            self.lines[idx].valid = false;
            self.lines[idx].dirty = false;
        }
    }

    /// Invalidates every line in the cache.
    pub fn flush(&mut self) {
        for line in &mut self.lines {
            line.valid = false;
            line.dirty = false;
        }
    }
}
