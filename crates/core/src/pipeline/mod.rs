//! Fixed-function graphics pipeline.
//!
//! Vertex transform, backface culling, barycentric rasterization, fragment
//! shading with texture sampling through the texture cache, and a
//! depth-tested (optionally blended) output merger. Stages are plain data
//! transforms over vertex and fragment arrays; shader hooks are boxed
//! functions applied per element.

use std::time::Instant;

use crate::config::PipelineConfig;
use crate::mem::MemoryHierarchy;
use crate::monitor::PerformanceMonitor;
use crate::texture::TextureCache;

/// Vertex attributes entering the pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct Vertex {
    /// Clip-space position (x, y, z, w).
    pub position: [f32; 4],
    /// RGBA color.
    pub color: [f32; 4],
    /// Texture coordinates (u, v).
    pub texcoord: [f32; 2],
    /// Surface normal.
    pub normal: [f32; 3],
}

/// A rasterized sample awaiting shading and merging.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fragment {
    /// Screen-space position; z carries interpolated depth.
    pub position: [f32; 4],
    /// RGBA color.
    pub color: [f32; 4],
    /// Interpolated texture coordinates.
    pub texcoord: [f32; 2],
    /// Depth for the depth test.
    pub depth: f32,
    /// Cleared for fragments that should be discarded.
    pub valid: bool,
}

/// Texture image data bound to a pipeline texture unit.
///
/// The id is an opaque 64-bit token chosen by the caller; it keys the
/// texture cache and has no meaning to the pipeline itself.
#[derive(Debug, Clone, Default)]
pub struct Texture {
    /// Opaque identifier used as the texture cache key.
    pub id: u64,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel format tag (opaque; pixels are assumed 4 bytes).
    pub format: u32,
    /// Pixel bytes.
    pub data: Vec<u8>,
    /// Number of mip levels available.
    pub mip_levels: u32,
}

/// Fixed-function state controlling rasterization and merging.
#[derive(Debug, Clone, Copy)]
pub struct PipelineState {
    /// Enables the depth test in the output merger.
    pub depth_test_enabled: bool,
    /// Enables alpha blending in the output merger.
    pub blending_enabled: bool,
    /// Enables backface culling.
    pub culling_enabled: bool,
    /// Viewport width in pixels.
    pub viewport_width: u32,
    /// Viewport height in pixels.
    pub viewport_height: u32,
}

/// Per-frame pipeline statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineStats {
    /// Vertices submitted this frame.
    pub vertices_processed: u64,
    /// Fragments rasterized this frame.
    pub fragments_processed: u64,
    /// Triangles surviving culling this frame.
    pub triangles_drawn: u64,
    /// Successful texture cache samples this frame.
    pub texture_samples: u64,
    /// Duration of the last completed frame in milliseconds.
    pub frame_time_ms: f64,
}

/// Per-vertex shader hook.
pub type VertexShader = Box<dyn Fn(&Vertex) -> Vertex + Send + Sync>;

/// Per-fragment shader hook.
pub type FragmentShader = Box<dyn Fn(&Fragment) -> Fragment + Send + Sync>;

/// The pipeline: render state, bound textures, shader hooks, and frame buffers.
pub struct GraphicsPipeline {
    state: PipelineState,
    bound_textures: Vec<Option<Texture>>,
    vertex_shader: Option<VertexShader>,
    fragment_shader: Option<FragmentShader>,
    color_buffer: Vec<u32>,
    depth_buffer: Vec<f32>,
    stats: PipelineStats,
    frame_start: Option<Instant>,
}

impl GraphicsPipeline {
    /// Creates a pipeline with cleared frame buffers sized to the viewport.
    pub fn new(config: &PipelineConfig) -> Self {
        let state = PipelineState {
            depth_test_enabled: config.depth_test,
            blending_enabled: config.blending,
            culling_enabled: config.culling,
            viewport_width: config.viewport_width,
            viewport_height: config.viewport_height,
        };
        let buffer_size = (state.viewport_width * state.viewport_height) as usize;

        Self {
            state,
            bound_textures: (0..config.texture_units).map(|_| None).collect(),
            vertex_shader: None,
            fragment_shader: None,
            color_buffer: vec![0; buffer_size],
            depth_buffer: vec![1.0; buffer_size],
            stats: PipelineStats::default(),
            frame_start: None,
        }
    }

    /// Current fixed-function state.
    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// Replaces the fixed-function state, resizing frame buffers if needed.
    pub fn set_pipeline_state(&mut self, state: PipelineState) {
        self.state = state;
        let buffer_size = (state.viewport_width * state.viewport_height) as usize;
        if buffer_size != self.color_buffer.len() {
            self.color_buffer = vec![0; buffer_size];
            self.depth_buffer = vec![1.0; buffer_size];
        }
    }

    /// Binds a texture to the given unit; out-of-range units are ignored.
    pub fn bind_texture(&mut self, unit: usize, texture: Texture) {
        if let Some(slot) = self.bound_textures.get_mut(unit) {
            *slot = Some(texture);
        }
    }

    /// Installs the per-vertex shader hook.
    pub fn set_vertex_shader(&mut self, shader: VertexShader) {
        self.vertex_shader = Some(shader);
    }

    /// Installs the per-fragment shader hook.
    pub fn set_fragment_shader(&mut self, shader: FragmentShader) {
        self.fragment_shader = Some(shader);
    }

    /// Statistics for the frame in progress (or the last completed one).
    pub fn statistics(&self) -> PipelineStats {
        self.stats
    }

    /// Draws `vertices` as a triangle list through all pipeline stages.
    pub fn draw_triangles(
        &mut self,
        textures: &mut TextureCache,
        mem: &mut MemoryHierarchy,
        mon: &mut PerformanceMonitor,
        vertices: &[Vertex],
    ) {
        mon.start_timer("draw_triangles");

        for triangle in vertices.chunks_exact(3) {
            let transformed = self.vertex_stage(triangle);

            if self.state.culling_enabled
                && is_triangle_culled(&transformed[0], &transformed[1], &transformed[2])
            {
                continue;
            }

            let fragments = self.rasterization_stage(&transformed);
            let shaded = self.fragment_stage(textures, mem, mon, &fragments);
            self.output_merger_stage(&shaded);

            self.stats.triangles_drawn += 1;
        }

        self.stats.vertices_processed += vertices.len() as u64;

        mon.end_timer("draw_triangles");
        mon.increment_counter("triangles_drawn", (vertices.len() / 3) as u64);
        mon.increment_counter("vertices_processed", vertices.len() as u64);
    }

    /// Draws indexed geometry; out-of-range indices are skipped.
    pub fn draw_indexed(
        &mut self,
        textures: &mut TextureCache,
        mem: &mut MemoryHierarchy,
        mon: &mut PerformanceMonitor,
        vertices: &[Vertex],
        indices: &[u32],
    ) {
        mon.start_timer("draw_indexed");

        let triangle_vertices: Vec<Vertex> = indices
            .iter()
            .filter_map(|&index| vertices.get(index as usize).copied())
            .collect();
        self.draw_triangles(textures, mem, mon, &triangle_vertices);

        mon.end_timer("draw_indexed");
    }

    /// Applies the vertex shader (identity when none is installed).
    fn vertex_stage(&self, input: &[Vertex]) -> Vec<Vertex> {
        input
            .iter()
            .map(|vertex| match &self.vertex_shader {
                Some(shader) => shader(vertex),
                None => *vertex,
            })
            .collect()
    }

    /// Rasterizes one triangle into fragments with barycentric interpolation.
    ///
    /// Positions are mapped from [-1, 1] clip space to the viewport; pixels
    /// whose centers fall inside the triangle get attributes interpolated by
    /// their barycentric weights (edge-function formulation).
    fn rasterization_stage(&self, vertices: &[Vertex]) -> Vec<Fragment> {
        let mut fragments = Vec::new();
        if vertices.len() < 3 {
            return fragments;
        }

        let (v0, v1, v2) = (&vertices[0], &vertices[1], &vertices[2]);

        let width = self.state.viewport_width as f32;
        let height = self.state.viewport_height as f32;
        let screen = |v: &Vertex| -> [f32; 2] {
            [
                (v.position[0] + 1.0) * 0.5 * width,
                (v.position[1] + 1.0) * 0.5 * height,
            ]
        };

        let p0 = screen(v0);
        let p1 = screen(v1);
        let p2 = screen(v2);

        // Signed double area; zero means a degenerate triangle.
        let area = edge_function(&p0, &p1, &p2);
        if area == 0.0 {
            return fragments;
        }

        let min_x = p0[0].min(p1[0]).min(p2[0]).floor().max(0.0) as i64;
        let max_x = (p0[0].max(p1[0]).max(p2[0]).ceil() as i64)
            .min(self.state.viewport_width as i64 - 1);
        let min_y = p0[1].min(p1[1]).min(p2[1]).floor().max(0.0) as i64;
        let max_y = (p0[1].max(p1[1]).max(p2[1]).ceil() as i64)
            .min(self.state.viewport_height as i64 - 1);

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let p = [x as f32 + 0.5, y as f32 + 0.5];

                // Sub-triangle areas; all sharing the sign of the full area
                // puts the sample inside.
                let w0 = edge_function(&p1, &p2, &p) / area;
                let w1 = edge_function(&p2, &p0, &p) / area;
                let w2 = edge_function(&p0, &p1, &p) / area;

                if w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0 {
                    let mut fragment = interpolate_fragment(v0, v1, v2, w0, w1, w2);
                    fragment.position[0] = x as f32;
                    fragment.position[1] = y as f32;
                    fragments.push(fragment);
                }
            }
        }

        fragments
    }

    /// Shades fragments and samples the unit-0 texture through the cache.
    ///
    /// A sample that the cache cannot serve leaves the fragment color
    /// unmodified.
    fn fragment_stage(
        &mut self,
        textures: &mut TextureCache,
        mem: &mut MemoryHierarchy,
        mon: &mut PerformanceMonitor,
        fragments: &[Fragment],
    ) -> Vec<Fragment> {
        let mut output = Vec::with_capacity(fragments.len());

        for fragment in fragments {
            let mut shaded = match &self.fragment_shader {
                Some(shader) => shader(fragment),
                None => *fragment,
            };

            if let Some(Some(texture)) = self.bound_textures.first() {
                if !texture.data.is_empty() {
                    let u = shaded.texcoord[0];
                    let v = shaded.texcoord[1];
                    let tex_x = (u * texture.width as f32) as u32 % texture.width;
                    let tex_y = (v * texture.height as f32) as u32 % texture.height;
                    let tex_offset = ((tex_y * texture.width + tex_x) * 4) as u64;

                    let mut pixel = [0u8; 4];
                    if textures.read_texture(mem, mon, texture.id, 0, tex_offset, &mut pixel) {
                        for (channel, &texel) in shaded.color.iter_mut().zip(pixel.iter()) {
                            *channel *= texel as f32 / 255.0;
                        }
                        self.stats.texture_samples += 1;
                    }
                }
            }

            output.push(shaded);
        }

        self.stats.fragments_processed += fragments.len() as u64;
        output
    }

    /// Depth-tests and writes fragments into the frame buffers.
    fn output_merger_stage(&mut self, fragments: &[Fragment]) {
        for fragment in fragments {
            if !fragment.valid {
                continue;
            }

            let x = fragment.position[0] as i64;
            let y = fragment.position[1] as i64;
            if x < 0
                || x >= self.state.viewport_width as i64
                || y < 0
                || y >= self.state.viewport_height as i64
            {
                continue;
            }

            let pixel_index = (y as u32 * self.state.viewport_width + x as u32) as usize;

            if self.state.depth_test_enabled {
                if fragment.depth >= self.depth_buffer[pixel_index] {
                    continue;
                }
                self.depth_buffer[pixel_index] = fragment.depth;
            }

            self.color_buffer[pixel_index] = if self.state.blending_enabled {
                blend(self.color_buffer[pixel_index], &fragment.color)
            } else {
                pack_color(&fragment.color)
            };
        }
    }

    /// Starts a frame: clears the frame buffers and per-frame statistics.
    pub fn begin_frame(&mut self, mon: &mut PerformanceMonitor) {
        self.frame_start = Some(Instant::now());
        self.color_buffer.fill(0x0000_00FF);
        self.depth_buffer.fill(1.0);

        self.stats.vertices_processed = 0;
        self.stats.fragments_processed = 0;
        self.stats.triangles_drawn = 0;
        self.stats.texture_samples = 0;

        mon.start_timer("frame_time");
    }

    /// Ends a frame: stops the frame timer and records frame metrics.
    pub fn end_frame(&mut self, mon: &mut PerformanceMonitor) {
        if let Some(start) = self.frame_start.take() {
            self.stats.frame_time_ms = start.elapsed().as_secs_f64() * 1000.0;
        }

        mon.end_timer("frame_time");
        mon.record_frame_metrics(
            self.stats.frame_time_ms,
            self.stats.triangles_drawn as u32,
            self.stats.fragments_processed as u32,
        );
    }

    /// Presents the frame (a counter bump; there is no display).
    pub fn present(&self, mon: &mut PerformanceMonitor) {
        mon.increment_counter("frames_presented", 1);
    }

    /// Packed RGBA color at `(x, y)`, if inside the viewport.
    pub fn pixel(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.state.viewport_width || y >= self.state.viewport_height {
            return None;
        }
        Some(self.color_buffer[(y * self.state.viewport_width + x) as usize])
    }
}

/// Twice the signed area of triangle `(a, b, p)`.
fn edge_function(a: &[f32; 2], b: &[f32; 2], p: &[f32; 2]) -> f32 {
    (b[0] - a[0]) * (p[1] - a[1]) - (b[1] - a[1]) * (p[0] - a[0])
}

/// Backface test: a non-positive cross product faces away from the viewer.
fn is_triangle_culled(v0: &Vertex, v1: &Vertex, v2: &Vertex) -> bool {
    let edge1_x = v1.position[0] - v0.position[0];
    let edge1_y = v1.position[1] - v0.position[1];
    let edge2_x = v2.position[0] - v0.position[0];
    let edge2_y = v2.position[1] - v0.position[1];

    edge1_x * edge2_y - edge1_y * edge2_x <= 0.0
}

/// Interpolates vertex attributes by barycentric weights.
fn interpolate_fragment(
    v0: &Vertex,
    v1: &Vertex,
    v2: &Vertex,
    w0: f32,
    w1: f32,
    w2: f32,
) -> Fragment {
    let mut fragment = Fragment {
        valid: true,
        ..Fragment::default()
    };

    fragment.position[2] =
        w0 * v0.position[2] + w1 * v1.position[2] + w2 * v2.position[2];
    fragment.position[3] =
        w0 * v0.position[3] + w1 * v1.position[3] + w2 * v2.position[3];

    for i in 0..4 {
        fragment.color[i] = w0 * v0.color[i] + w1 * v1.color[i] + w2 * v2.color[i];
    }
    for i in 0..2 {
        fragment.texcoord[i] = w0 * v0.texcoord[i] + w1 * v1.texcoord[i] + w2 * v2.texcoord[i];
    }

    fragment.depth = fragment.position[2];
    fragment
}

/// Packs an RGBA float color into `0xRRGGBBAA`.
fn pack_color(color: &[f32; 4]) -> u32 {
    let r = (color[0].clamp(0.0, 1.0) * 255.0) as u32;
    let g = (color[1].clamp(0.0, 1.0) * 255.0) as u32;
    let b = (color[2].clamp(0.0, 1.0) * 255.0) as u32;
    let a = (color[3].clamp(0.0, 1.0) * 255.0) as u32;
    (r << 24) | (g << 16) | (b << 8) | a
}

/// Alpha-blends `color` over the existing packed pixel.
fn blend(existing: u32, color: &[f32; 4]) -> u32 {
    let alpha = color[3].clamp(0.0, 1.0);

    let existing_r = ((existing >> 24) & 0xFF) as f32;
    let existing_g = ((existing >> 16) & 0xFF) as f32;
    let existing_b = ((existing >> 8) & 0xFF) as f32;

    let r = (color[0].clamp(0.0, 1.0) * alpha * 255.0 + existing_r * (1.0 - alpha)) as u32;
    let g = (color[1].clamp(0.0, 1.0) * alpha * 255.0 + existing_g * (1.0 - alpha)) as u32;
    let b = (color[2].clamp(0.0, 1.0) * alpha * 255.0 + existing_b * (1.0 - alpha)) as u32;

    (r.min(255) << 24) | (g.min(255) << 16) | (b.min(255) << 8) | 0xFF
}
