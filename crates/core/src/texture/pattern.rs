//! Texture access-pattern tracking and prefetch prediction.
//!
//! A bounded history of recent `(texture, mip)` accesses feeds a small
//! predictor that recognizes two streaming shapes:
//! - **Mip walk:** consecutive accesses to the same texture predict the next
//!   mip level.
//! - **Sequential textures:** consecutive accesses to adjacent texture ids
//!   predict the next id at the same mip level.
//!
//! Prefetching is only attempted once enough history exists to distinguish a
//! pattern from noise.

/// Highest mip level the mip-walk rule will predict (exclusive).
const MAX_PREDICTED_MIP: u32 = 16;

/// Fewest recorded accesses before the predictor emits anything.
const MIN_HISTORY: usize = 2;

use std::collections::VecDeque;

/// One recorded texture access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessPattern {
    /// Texture identifier (opaque 64-bit token).
    pub texture_id: u64,
    /// Mip level accessed.
    pub mip_level: u32,
    /// Microseconds since the owning cache's epoch.
    pub timestamp_us: u64,
}

/// A `(texture, mip)` pair the predictor wants resident.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefetchHint {
    /// Texture to prefetch.
    pub texture_id: u64,
    /// Mip level to prefetch.
    pub mip_level: u32,
}

/// Bounded access history with pattern-based prefetch prediction.
pub struct PatternTracker {
    history: VecDeque<AccessPattern>,
    capacity: usize,
}

impl PatternTracker {
    /// Creates a tracker retaining at most `capacity` accesses.
    pub fn new(capacity: usize) -> Self {
        Self {
            history: VecDeque::with_capacity(capacity.min(4096)),
            capacity: capacity.max(1),
        }
    }

    /// Appends an access, discarding the oldest once the history is full.
    pub fn record(&mut self, texture_id: u64, mip_level: u32, timestamp_us: u64) {
        if self.history.len() >= self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(AccessPattern {
            texture_id,
            mip_level,
            timestamp_us,
        });
    }

    /// Number of accesses currently retained.
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// Returns `true` if no accesses have been recorded.
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Inspects the two most recent accesses and predicts the next one.
    ///
    /// Returns `None` until [`MIN_HISTORY`] accesses exist, when the last two
    /// accesses fit neither rule, or when a mip walk has reached the
    /// [`MAX_PREDICTED_MIP`] ceiling.
    pub fn predict(&self) -> Option<PrefetchHint> {
        if self.history.len() < MIN_HISTORY {
            return None;
        }

        let last = self.history[self.history.len() - 1];
        let prev = self.history[self.history.len() - 2];

        if prev.texture_id == last.texture_id {
            // Same texture across two accesses: assume a mip walk.
            let next_mip = last.mip_level + 1;
            if next_mip < MAX_PREDICTED_MIP {
                return Some(PrefetchHint {
                    texture_id: last.texture_id,
                    mip_level: next_mip,
                });
            }
        } else if last.texture_id == prev.texture_id.wrapping_add(1) {
            // Adjacent texture ids: assume a sequential sweep.
            return Some(PrefetchHint {
                texture_id: last.texture_id.wrapping_add(1),
                mip_level: last.mip_level,
            });
        }

        None
    }
}
