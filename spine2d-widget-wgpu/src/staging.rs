use glam::Mat4;
use spine2d_widget::{BlendMode, DrawCall, HostRenderer, Vertex};

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct GpuVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
    pub color: [f32; 4],
    pub dark_color: [f32; 4],
}

impl From<Vertex> for GpuVertex {
    fn from(v: Vertex) -> Self {
        Self {
            position: v.position,
            uv: v.uv,
            color: v.color,
            dark_color: v.dark_color,
        }
    }
}

/// A run of indices drawn with one pipeline, texture and scissor.
#[derive(Clone, Debug, PartialEq)]
pub struct Batch {
    pub texture: String,
    pub blend: BlendMode,
    pub premultiplied_alpha: bool,
    /// `[x, y, width, height]` in canvas pixels.
    pub scissor: Option<[u32; 4]>,
    pub first_index: u32,
    pub index_count: u32,
}

/// One frame of draw calls from every widget, merged into a single vertex and index stream.
#[derive(Clone, Debug, Default)]
pub struct StagedFrame {
    clip_from_world: Mat4,
    canvas_size: [u32; 2],
    scissor: Option<[u32; 4]>,
    pub(crate) vertices: Vec<GpuVertex>,
    pub(crate) indices: Vec<u32>,
    batches: Vec<Batch>,
    complete: bool,
    serial: u64,
    /// `[vertex_count, index_count]` per accepted call, this frame and the previous one.
    shapes: Vec<[u32; 2]>,
    previous_shapes: Vec<[u32; 2]>,
    indices_changed: bool,
}

impl StagedFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clip_from_world(&self) -> Mat4 {
        self.clip_from_world
    }

    pub fn canvas_size(&self) -> [u32; 2] {
        self.canvas_size
    }

    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Whether `end_frame` ran since the last `begin_frame`.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Incremented by every `begin_frame`.
    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// Whether the index stream may differ from the previous frame's. Unchanged calls in an
    /// unchanged order rebase to the same indices.
    pub fn indices_changed(&self) -> bool {
        self.indices_changed
    }

    /// Whether a GPU index buffer last written from frame `uploaded` must be rewritten for this
    /// frame. Any skipped frame in between forces a rewrite.
    pub fn needs_index_upload(&self, uploaded: Option<u64>) -> bool {
        self.indices_changed || uploaded.is_none_or(|serial| serial + 1 != self.serial)
    }

    /// Scissor clamped to the canvas. `None` when the rectangle lies outside it.
    pub fn clamp_scissor(&self, rect: [u32; 4]) -> Option<[u32; 4]> {
        let [width, height] = self.canvas_size;
        let [x, y, w, h] = rect;
        if x >= width || y >= height {
            return None;
        }
        let w = w.min(width - x);
        let h = h.min(height - y);
        (w > 0 && h > 0).then_some([x, y, w, h])
    }
}

impl HostRenderer for StagedFrame {
    fn begin_frame(&mut self, clip_from_world: Mat4, canvas_size: [u32; 2]) {
        self.clip_from_world = clip_from_world;
        self.canvas_size = canvas_size;
        self.scissor = None;
        self.vertices.clear();
        self.indices.clear();
        self.batches.clear();
        self.complete = false;
        self.serial += 1;
        std::mem::swap(&mut self.shapes, &mut self.previous_shapes);
        self.shapes.clear();
        self.indices_changed = false;
    }

    fn set_scissor(&mut self, rect: Option<[u32; 4]>) {
        self.scissor = rect;
    }

    fn draw(&mut self, call: &DrawCall<'_>, mutator: &mut dyn FnMut(&mut Vertex)) {
        if call.indices.is_empty() || call.vertices.is_empty() {
            return;
        }
        let base = self.vertices.len() as u32;
        self.vertices.extend(call.vertices.iter().map(|v| {
            let mut v = *v;
            mutator(&mut v);
            GpuVertex::from(v)
        }));

        let first_index = self.indices.len() as u32;
        self.indices.extend(call.indices.iter().map(|i| i + base));
        let index_count = call.indices.len() as u32;
        self.shapes.push([call.vertices.len() as u32, index_count]);
        self.indices_changed |= call.dirty;

        if let Some(last) = self.batches.last_mut() {
            let mergeable = last.texture == call.texture
                && last.blend == call.blend
                && last.premultiplied_alpha == call.premultiplied_alpha
                && last.scissor == self.scissor
                && last.first_index + last.index_count == first_index;
            if mergeable {
                last.index_count += index_count;
                return;
            }
        }
        self.batches.push(Batch {
            texture: call.texture.to_string(),
            blend: call.blend,
            premultiplied_alpha: call.premultiplied_alpha,
            scissor: self.scissor,
            first_index,
            index_count,
        });
    }

    fn end_frame(&mut self) {
        if self.shapes != self.previous_shapes {
            self.indices_changed = true;
        }
        self.complete = true;
    }
}
