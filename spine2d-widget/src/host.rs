//! Contracts between the core and a host environment.

use crate::{BlendMode, Error, Vertex};
use glam::Mat4;

/// Frame information handed to [`Widget::update`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FrameContext {
    /// Host frame number. A widget runs at most one pass per number.
    pub frame: u64,
    /// Seconds since the previous frame.
    pub delta: f32,
}

/// One batch of triangles sharing a texture and blend state.
#[derive(Copy, Clone, Debug)]
pub struct DrawCall<'a> {
    pub vertices: &'a [Vertex],
    pub indices: &'a [u32],
    pub texture: &'a str,
    pub blend: BlendMode,
    pub premultiplied_alpha: bool,
    /// Set when `indices` may differ from the same caller's submission in the previous frame.
    /// Vertex positions and colors are expected to change every frame regardless.
    pub dirty: bool,
}

impl DrawCall<'_> {
    /// Floats per vertex: position, uv, light color, dark color.
    pub const VERTEX_STRIDE: usize = 12;

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Draw submission implemented per host graphics API.
pub trait HostRenderer {
    fn begin_frame(&mut self, clip_from_world: Mat4, canvas_size: [u32; 2]);

    /// Restricts drawing to `[x, y, width, height]` in canvas pixels, or lifts the restriction.
    fn set_scissor(&mut self, rect: Option<[u32; 4]>);

    /// Submits `call`. `mutator` is run on every vertex before upload, without touching the
    /// caller's buffers.
    fn draw(&mut self, call: &DrawCall<'_>, mutator: &mut dyn FnMut(&mut Vertex));

    fn end_frame(&mut self);
}

/// Capability set every drawable instance exposes to its host.
pub trait Widget {
    fn update(&mut self, frame: FrameContext) -> Result<(), Error>;

    fn render(&mut self, renderer: &mut dyn HostRenderer) -> Result<(), Error>;

    /// Releases listeners, cached geometry and pooled objects. Later calls are no-ops.
    fn destroy(&mut self);
}

/// Renderer that records draw calls, for hosts without a GPU and for tests.
#[derive(Clone, Debug, Default)]
pub struct RecordingRenderer {
    pub clip_from_world: Mat4,
    pub canvas_size: [u32; 2],
    pub scissor: Option<[u32; 4]>,
    pub frames: usize,
    pub calls: Vec<RecordedDraw>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RecordedDraw {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub texture: String,
    pub blend: BlendMode,
    pub scissor: Option<[u32; 4]>,
    pub dirty: bool,
}

impl HostRenderer for RecordingRenderer {
    fn begin_frame(&mut self, clip_from_world: Mat4, canvas_size: [u32; 2]) {
        self.clip_from_world = clip_from_world;
        self.canvas_size = canvas_size;
        self.scissor = None;
        self.calls.clear();
    }

    fn set_scissor(&mut self, rect: Option<[u32; 4]>) {
        self.scissor = rect;
    }

    fn draw(&mut self, call: &DrawCall<'_>, mutator: &mut dyn FnMut(&mut Vertex)) {
        let mut vertices = call.vertices.to_vec();
        vertices.iter_mut().for_each(|v| mutator(v));
        self.calls.push(RecordedDraw {
            vertices,
            indices: call.indices.to_vec(),
            texture: call.texture.to_string(),
            blend: call.blend,
            scissor: self.scissor,
            dirty: call.dirty,
        });
    }

    fn end_frame(&mut self) {
        self.frames += 1;
    }
}
