//! Top-level system wiring.
//!
//! `GpuSystem` owns every component side-by-side so that operations can
//! borrow them disjointly; collaborators are threaded into each other as
//! explicit `&mut` handles rather than shared-ownership pointers.

use crate::config::Config;
use crate::core::GpuCore;
use crate::mem::MemoryHierarchy;
use crate::monitor::PerformanceMonitor;
use crate::pipeline::{GraphicsPipeline, Vertex};
use crate::texture::TextureCache;

/// The simulated GPU: memory hierarchy, texture cache, shader cores,
/// graphics pipeline, and the shared performance monitor.
pub struct GpuSystem {
    /// Two-level cache hierarchy over VRAM.
    pub memory: MemoryHierarchy,
    /// Adaptive texture cache.
    pub texture_cache: TextureCache,
    /// Shader core array.
    pub core: GpuCore,
    /// Fixed-function graphics pipeline.
    pub pipeline: GraphicsPipeline,
    /// Instrumentation sink shared by every layer.
    pub monitor: PerformanceMonitor,
}

impl GpuSystem {
    /// Builds a system from the given configuration.
    pub fn new(config: &Config) -> Self {
        let mut monitor = PerformanceMonitor::new();
        monitor.set_counter("gpu_cores_total", config.core.shader_cores as u64);
        monitor.set_counter(
            "texture_cache_size_mb",
            (config.texture_cache.capacity_bytes / (1024 * 1024)) as u64,
        );
        monitor.set_counter("viewport_width", config.pipeline.viewport_width as u64);
        monitor.set_counter("viewport_height", config.pipeline.viewport_height as u64);

        Self {
            memory: MemoryHierarchy::new(&config.memory),
            texture_cache: TextureCache::new(&config.texture_cache),
            core: GpuCore::new(config.core.shader_cores),
            pipeline: GraphicsPipeline::new(&config.pipeline),
            monitor,
        }
    }

    /// Samples a texture blob through the texture cache.
    pub fn read_texture(
        &mut self,
        texture_id: u64,
        mip_level: u32,
        offset: u64,
        buf: &mut [u8],
    ) -> bool {
        self.texture_cache.read_texture(
            &mut self.memory,
            &mut self.monitor,
            texture_id,
            mip_level,
            offset,
            buf,
        )
    }

    /// Runs a compute program over `num_threads` threads.
    pub fn dispatch_compute(&mut self, program: &[u32], num_threads: u32) {
        self.core
            .dispatch_compute(&mut self.monitor, program, num_threads);
    }

    /// Draws a triangle list through the full pipeline.
    pub fn draw_triangles(&mut self, vertices: &[Vertex]) {
        self.pipeline.draw_triangles(
            &mut self.texture_cache,
            &mut self.memory,
            &mut self.monitor,
            vertices,
        );
    }

    /// Draws indexed geometry through the full pipeline.
    pub fn draw_indexed(&mut self, vertices: &[Vertex], indices: &[u32]) {
        self.pipeline.draw_indexed(
            &mut self.texture_cache,
            &mut self.memory,
            &mut self.monitor,
            vertices,
            indices,
        );
    }

    /// Starts a frame.
    pub fn begin_frame(&mut self) {
        self.pipeline.begin_frame(&mut self.monitor);
    }

    /// Ends a frame and records its metrics.
    pub fn end_frame(&mut self) {
        self.pipeline.end_frame(&mut self.monitor);
    }

    /// Presents the finished frame.
    pub fn present(&mut self) {
        self.pipeline.present(&mut self.monitor);
    }
}
