//! GPU architecture simulator library.
//!
//! This crate implements a cycle/latency-accounting simulator for a small
//! GPU-like system with the following:
//! 1. **Memory:** Set-associative L1/L2 caches with LRU replacement over a
//!    VRAM byte store and a bump allocator with deallocation tracking.
//! 2. **Textures:** An adaptive texture cache with priority-score eviction,
//!    pattern-based prefetching, and periodic self-tuning.
//! 3. **Cores:** Shader cores executing a small accounting-level instruction
//!    format under synchronous compute dispatch.
//! 4. **Pipeline:** Vertex, rasterization, fragment, and output-merger stages
//!    sampling textures through the cache.
//! 5. **Instrumentation:** Named timers, counters, bandwidth windows, cache
//!    recorders, frame histories, reporting, and threshold alerts.

/// Simulator configuration (defaults and hierarchical config structures).
pub mod config;
/// Shader cores and compute dispatch.
pub mod core;
/// Memory hierarchy (caches, VRAM, allocator).
pub mod mem;
/// Performance monitoring and reporting.
pub mod monitor;
/// Fixed-function graphics pipeline.
pub mod pipeline;
/// Top-level system wiring.
pub mod sim;
/// Adaptive texture cache.
pub mod texture;

/// Root configuration type; use `Config::default()` or deserialize from JSON.
pub use crate::config::Config;
/// Two-level cache hierarchy over VRAM; construct with `MemoryHierarchy::new`.
pub use crate::mem::MemoryHierarchy;
/// Instrumentation sink shared by every layer.
pub use crate::monitor::PerformanceMonitor;
/// Top-level system owning every component; construct with `GpuSystem::new`.
pub use crate::sim::GpuSystem;
/// Adaptive texture cache; collaborators are passed in per call.
pub use crate::texture::TextureCache;
