//! Configuration system for the GPU simulator.
//!
//! This module defines all configuration structures used to parameterize
//! the simulator. It provides:
//! 1. **Defaults:** Baseline hardware constants (VRAM, cache geometry, latencies).
//! 2. **Structures:** Hierarchical config for memory, texture cache, cores, and pipeline.
//!
//! Configuration is supplied via JSON (`serde_json`) or use `Config::default()`.
//! Every field carries its own default, so a partial document (or `{}`)
//! deserializes cleanly at any nesting level.

use serde::Deserialize;

/// Default configuration constants for the simulator.
///
/// These values define the baseline hardware configuration when not
/// explicitly overridden in a JSON configuration document.
mod defaults {
    /// Logical size of the VRAM byte store (4 GiB).
    ///
    /// The backing is allocated lazily; accesses beyond this bound fail.
    pub const VRAM_SIZE: usize = 4 * 1024 * 1024 * 1024;

    /// First address handed out by the VRAM bump allocator (256 MiB).
    ///
    /// Addresses below this are never produced by `allocate`, which keeps
    /// address `0` free to serve as the allocation-failure sentinel.
    pub const ALLOC_BASE: u64 = 0x1000_0000;

    /// L1 cache size in bytes (32 KiB).
    pub const L1_SIZE: usize = 32 * 1024;

    /// L1 cache line size in bytes.
    pub const L1_LINE: usize = 64;

    /// L1 associativity (4-way).
    pub const L1_WAYS: usize = 4;

    /// L1 access latency in cycles.
    pub const L1_LATENCY: u64 = 1;

    /// L2 cache size in bytes (512 KiB).
    pub const L2_SIZE: usize = 512 * 1024;

    /// L2 cache line size in bytes.
    pub const L2_LINE: usize = 128;

    /// L2 associativity (8-way).
    pub const L2_WAYS: usize = 8;

    /// L2 access latency in cycles.
    pub const L2_LATENCY: u64 = 10;

    /// VRAM access latency in cycles.
    ///
    /// Latencies are dimensionless cycle counts, never converted to wall time.
    pub const VRAM_LATENCY: u64 = 100;

    /// Texture cache capacity in bytes (256 MiB).
    pub const TEXTURE_CACHE_SIZE: usize = 256 * 1024 * 1024;

    /// How far ahead pattern-based prefetching looks, in entries.
    ///
    /// Carried in the configuration but not consulted by the baseline
    /// predictor; its semantics are still undefined.
    pub const PREFETCH_DISTANCE: u32 = 100;

    /// Number of recent texture accesses retained for pattern analysis.
    pub const PATTERN_HISTORY: usize = 1000;

    /// Minimum milliseconds between adaptive parameter retunes.
    pub const OPTIMIZATION_INTERVAL_MS: u64 = 100;

    /// Initial prefetch aggressiveness; self-tuned within [0.1, 1.0].
    pub const PREFETCH_AGGRESSIVENESS: f32 = 0.7;

    /// Initial eviction threshold; self-tuned within [0.5, 0.9].
    pub const EVICTION_THRESHOLD: f32 = 0.8;

    /// Number of shader cores.
    pub const SHADER_CORES: u32 = 32;

    /// Default viewport width in pixels.
    pub const VIEWPORT_WIDTH: u32 = 1920;

    /// Default viewport height in pixels.
    pub const VIEWPORT_HEIGHT: u32 = 1080;

    /// Number of texture binding units exposed by the pipeline.
    pub const TEXTURE_UNITS: usize = 8;
}

/// Root configuration structure containing all simulator settings.
///
/// # Examples
///
/// Creating a default configuration:
///
/// ```
/// use gpu_core::config::Config;
///
/// let config = Config::default();
/// assert_eq!(config.memory.l1.size_bytes, 32 * 1024);
/// assert_eq!(config.texture_cache.capacity_bytes, 256 * 1024 * 1024);
/// ```
///
/// Deserializing a partial JSON document (unspecified fields take defaults,
/// at every nesting level):
///
/// ```
/// use gpu_core::config::Config;
///
/// let json = r#"{
///     "memory": {
///         "vram_size": 268435456,
///         "l1": { "size_bytes": 16384, "ways": 2 }
///     },
///     "texture_cache": {
///         "capacity_bytes": 4194304,
///         "smart_prefetching": false
///     }
/// }"#;
///
/// let config: Config = serde_json::from_str(json).unwrap();
/// assert_eq!(config.memory.vram_size, 256 * 1024 * 1024);
/// assert_eq!(config.memory.l1.ways, 2);
/// assert_eq!(config.memory.l1.line_bytes, 64);
/// assert_eq!(config.memory.l2.ways, 8);
/// assert!(!config.texture_cache.smart_prefetching);
/// assert!(config.texture_cache.adaptive_caching);
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Memory hierarchy configuration (caches, VRAM, allocator).
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Texture cache capacity and tunables.
    #[serde(default)]
    pub texture_cache: TextureCacheConfig,

    /// Shader core configuration.
    #[serde(default)]
    pub core: CoreConfig,

    /// Graphics pipeline configuration.
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            memory: MemoryConfig::default(),
            texture_cache: TextureCacheConfig::default(),
            core: CoreConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

/// Geometry and latency of a single cache level.
///
/// Field defaults use the L1 geometry as the generic baseline; the L2 shape
/// is supplied by [`MemoryConfig`] when the whole `l2` object is omitted.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CacheConfig {
    /// Total capacity in bytes.
    #[serde(default = "CacheConfig::default_size")]
    pub size_bytes: usize,

    /// Line size in bytes (unit of transfer and replacement).
    #[serde(default = "CacheConfig::default_line")]
    pub line_bytes: usize,

    /// Associativity (slots per set).
    #[serde(default = "CacheConfig::default_ways")]
    pub ways: usize,

    /// Access latency in cycles.
    #[serde(default = "CacheConfig::default_latency")]
    pub latency: u64,
}

impl CacheConfig {
    /// Returns the baseline cache size in bytes.
    fn default_size() -> usize {
        defaults::L1_SIZE
    }

    /// Returns the baseline cache line size in bytes.
    fn default_line() -> usize {
        defaults::L1_LINE
    }

    /// Returns the baseline cache associativity (number of ways).
    fn default_ways() -> usize {
        defaults::L1_WAYS
    }

    /// Returns the baseline cache access latency in cycles.
    fn default_latency() -> u64 {
        defaults::L1_LATENCY
    }
}

impl Default for CacheConfig {
    /// Creates the baseline (L1-shaped) cache configuration.
    fn default() -> Self {
        Self {
            size_bytes: defaults::L1_SIZE,
            line_bytes: defaults::L1_LINE,
            ways: defaults::L1_WAYS,
            latency: defaults::L1_LATENCY,
        }
    }
}

/// Memory hierarchy configuration.
///
/// Specifies VRAM size, the allocator base address, and the geometry and
/// latency of both cache levels.
#[derive(Debug, Clone, Deserialize)]
pub struct MemoryConfig {
    /// VRAM size in bytes.
    #[serde(default = "MemoryConfig::default_vram_size")]
    pub vram_size: usize,

    /// First address handed out by the bump allocator.
    #[serde(default = "MemoryConfig::default_alloc_base")]
    pub alloc_base: u64,

    /// L1 cache geometry.
    #[serde(default = "MemoryConfig::default_l1")]
    pub l1: CacheConfig,

    /// L2 cache geometry.
    #[serde(default = "MemoryConfig::default_l2")]
    pub l2: CacheConfig,

    /// VRAM access latency in cycles.
    #[serde(default = "MemoryConfig::default_vram_latency")]
    pub vram_latency: u64,
}

impl MemoryConfig {
    /// Returns the default VRAM size in bytes.
    fn default_vram_size() -> usize {
        defaults::VRAM_SIZE
    }

    /// Returns the default allocator base address.
    fn default_alloc_base() -> u64 {
        defaults::ALLOC_BASE
    }

    /// Returns the default L1 geometry: 32 KiB, 64-byte lines, 4-way.
    fn default_l1() -> CacheConfig {
        CacheConfig {
            size_bytes: defaults::L1_SIZE,
            line_bytes: defaults::L1_LINE,
            ways: defaults::L1_WAYS,
            latency: defaults::L1_LATENCY,
        }
    }

    /// Returns the default L2 geometry: 512 KiB, 128-byte lines, 8-way.
    fn default_l2() -> CacheConfig {
        CacheConfig {
            size_bytes: defaults::L2_SIZE,
            line_bytes: defaults::L2_LINE,
            ways: defaults::L2_WAYS,
            latency: defaults::L2_LATENCY,
        }
    }

    /// Returns the default VRAM access latency in cycles.
    fn default_vram_latency() -> u64 {
        defaults::VRAM_LATENCY
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            vram_size: defaults::VRAM_SIZE,
            alloc_base: defaults::ALLOC_BASE,
            l1: Self::default_l1(),
            l2: Self::default_l2(),
            vram_latency: defaults::VRAM_LATENCY,
        }
    }
}

/// Texture cache configuration and adaptive-tuning seeds.
#[derive(Debug, Clone, Deserialize)]
pub struct TextureCacheConfig {
    /// Upper bound on resident entry payload bytes.
    #[serde(default = "TextureCacheConfig::default_capacity")]
    pub capacity_bytes: usize,

    /// Gates pattern-based prefetch prediction.
    #[serde(default = "TextureCacheConfig::default_smart_prefetching")]
    pub smart_prefetching: bool,

    /// Gates periodic parameter retuning.
    #[serde(default = "TextureCacheConfig::default_adaptive_caching")]
    pub adaptive_caching: bool,

    /// Pattern lookahead in entries. Not consulted by the baseline predictor.
    #[serde(default = "TextureCacheConfig::default_prefetch_distance")]
    pub prefetch_distance: u32,

    /// Bounded access-pattern history length.
    #[serde(default = "TextureCacheConfig::default_pattern_history")]
    pub max_pattern_history: usize,

    /// Minimum milliseconds between retunes.
    #[serde(default = "TextureCacheConfig::default_optimization_interval")]
    pub optimization_interval_ms: u64,

    /// Initial prefetch aggressiveness, self-tuned within [0.1, 1.0].
    #[serde(default = "TextureCacheConfig::default_prefetch_aggressiveness")]
    pub prefetch_aggressiveness: f32,

    /// Initial eviction threshold, self-tuned within [0.5, 0.9].
    #[serde(default = "TextureCacheConfig::default_eviction_threshold")]
    pub eviction_threshold: f32,
}

impl TextureCacheConfig {
    /// Returns the default capacity in bytes.
    fn default_capacity() -> usize {
        defaults::TEXTURE_CACHE_SIZE
    }

    /// Smart prefetching defaults to enabled.
    fn default_smart_prefetching() -> bool {
        true
    }

    /// Adaptive caching defaults to enabled.
    fn default_adaptive_caching() -> bool {
        true
    }

    /// Returns the default prefetch lookahead distance.
    fn default_prefetch_distance() -> u32 {
        defaults::PREFETCH_DISTANCE
    }

    /// Returns the default access-pattern history length.
    fn default_pattern_history() -> usize {
        defaults::PATTERN_HISTORY
    }

    /// Returns the default retune interval in milliseconds.
    fn default_optimization_interval() -> u64 {
        defaults::OPTIMIZATION_INTERVAL_MS
    }

    /// Returns the initial prefetch aggressiveness.
    fn default_prefetch_aggressiveness() -> f32 {
        defaults::PREFETCH_AGGRESSIVENESS
    }

    /// Returns the initial eviction threshold.
    fn default_eviction_threshold() -> f32 {
        defaults::EVICTION_THRESHOLD
    }
}

impl Default for TextureCacheConfig {
    fn default() -> Self {
        Self {
            capacity_bytes: defaults::TEXTURE_CACHE_SIZE,
            smart_prefetching: true,
            adaptive_caching: true,
            prefetch_distance: defaults::PREFETCH_DISTANCE,
            max_pattern_history: defaults::PATTERN_HISTORY,
            optimization_interval_ms: defaults::OPTIMIZATION_INTERVAL_MS,
            prefetch_aggressiveness: defaults::PREFETCH_AGGRESSIVENESS,
            eviction_threshold: defaults::EVICTION_THRESHOLD,
        }
    }
}

/// Shader core configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CoreConfig {
    /// Number of shader cores available for compute dispatch.
    #[serde(default = "CoreConfig::default_shader_cores")]
    pub shader_cores: u32,
}

impl CoreConfig {
    /// Returns the default number of shader cores.
    fn default_shader_cores() -> u32 {
        defaults::SHADER_CORES
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            shader_cores: defaults::SHADER_CORES,
        }
    }
}

/// Graphics pipeline configuration and initial render state.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Viewport width in pixels.
    #[serde(default = "PipelineConfig::default_viewport_width")]
    pub viewport_width: u32,

    /// Viewport height in pixels.
    #[serde(default = "PipelineConfig::default_viewport_height")]
    pub viewport_height: u32,

    /// Enable the depth test in the output merger.
    #[serde(default = "PipelineConfig::default_depth_test")]
    pub depth_test: bool,

    /// Enable alpha blending in the output merger.
    #[serde(default)]
    pub blending: bool,

    /// Enable backface culling.
    #[serde(default = "PipelineConfig::default_culling")]
    pub culling: bool,

    /// Number of texture binding units.
    #[serde(default = "PipelineConfig::default_texture_units")]
    pub texture_units: usize,
}

impl PipelineConfig {
    /// Returns the default viewport width in pixels.
    fn default_viewport_width() -> u32 {
        defaults::VIEWPORT_WIDTH
    }

    /// Returns the default viewport height in pixels.
    fn default_viewport_height() -> u32 {
        defaults::VIEWPORT_HEIGHT
    }

    /// The depth test defaults to enabled.
    fn default_depth_test() -> bool {
        true
    }

    /// Backface culling defaults to enabled.
    fn default_culling() -> bool {
        true
    }

    /// Returns the default number of texture binding units.
    fn default_texture_units() -> usize {
        defaults::TEXTURE_UNITS
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            viewport_width: defaults::VIEWPORT_WIDTH,
            viewport_height: defaults::VIEWPORT_HEIGHT,
            depth_test: true,
            blending: false,
            culling: true,
            texture_units: defaults::TEXTURE_UNITS,
        }
    }
}
