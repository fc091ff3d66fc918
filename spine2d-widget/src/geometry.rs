use crate::clipping::{ClippedGeometry, ClippingTessellator};
use crate::{AttachmentKind, AttachmentView, BlendMode, Color, SkeletonPose, SlotView};
use std::collections::{HashMap, HashSet};

/// Index pattern of a region attachment quad.
pub const REGION_TRIANGLES: [u16; 6] = [0, 1, 2, 2, 3, 0];

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Vertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
    pub color: [f32; 4],
    pub dark_color: [f32; 4],
}

#[derive(Clone, Debug, PartialEq)]
pub struct Draw {
    pub texture: String,
    pub blend: BlendMode,
    pub premultiplied_alpha: bool,
    pub first_index: usize,
    pub index_count: usize,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DrawList {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub draws: Vec<Draw>,
}

impl DrawList {
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
        self.draws.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// The clip region open while a slot is visited.
#[derive(Copy, Clone, Debug)]
pub struct ClipRegion<'a> {
    pub slot: usize,
    pub polygon: &'a [f32],
}

/// Cached geometry of one (slot, attachment) pair.
#[derive(Clone, Debug)]
pub struct AttachmentGeometry {
    slot: usize,
    attachment: String,
    texture: String,
    blend: BlendMode,
    premultiplied_alpha: bool,
    vertices: Vec<f32>,
    uvs: Vec<f32>,
    indices: Vec<u16>,
    vertex_count: usize,
    index_count: usize,
    alpha: f32,
    clipped: Option<ClippedGeometry>,
    pub color: Color,
    pub dark_color: Color,
    /// Set when the composited alpha is zero or the geometry is degenerate.
    pub skip_render: bool,
    /// Cleared for entries whose slot was not reached, or shows another attachment, this pass.
    pub visible: bool,
    /// Raised when topology, clip state or alpha changed. Cleared by
    /// [`AttachmentGeometryBuilder::mark_clean`].
    pub dirty: bool,
}

impl AttachmentGeometry {
    fn new(slot: usize, attachment: &str) -> Self {
        Self {
            slot,
            attachment: attachment.to_string(),
            texture: String::new(),
            blend: BlendMode::Normal,
            premultiplied_alpha: false,
            vertices: Vec::new(),
            uvs: Vec::new(),
            indices: Vec::new(),
            vertex_count: 0,
            index_count: 0,
            alpha: f32::NAN,
            clipped: None,
            color: [1.0; 4],
            dark_color: [0.0, 0.0, 0.0, 1.0],
            skip_render: false,
            visible: false,
            dirty: true,
        }
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn attachment(&self) -> &str {
        &self.attachment
    }

    pub fn texture(&self) -> &str {
        &self.texture
    }

    pub fn is_clipped(&self) -> bool {
        self.clipped.is_some()
    }

    /// World positions, two floats per vertex. Clipped output while inside a clip region.
    pub fn vertices(&self) -> &[f32] {
        match &self.clipped {
            Some(clipped) => clipped.vertices(),
            None => &self.vertices[..self.vertex_count * 2],
        }
    }

    pub fn uvs(&self) -> &[f32] {
        match &self.clipped {
            Some(clipped) => clipped.uvs(),
            None => &self.uvs[..self.vertex_count * 2],
        }
    }

    pub fn indices(&self) -> &[u16] {
        match &self.clipped {
            Some(clipped) => clipped.indices(),
            None => &self.indices[..self.index_count],
        }
    }

    /// Whether this entry contributes triangles this frame.
    pub fn is_drawn(&self) -> bool {
        self.visible && !self.skip_render && !self.indices().is_empty()
    }

    /// Copies unclipped geometry. Returns true when the topology changed.
    fn set_geometry(&mut self, vertices: &[f32], uvs: &[f32], indices: &[u16]) -> bool {
        let vertex_count = vertices.len() / 2;
        let index_count = indices.len();
        let mut changed = vertex_count != self.vertex_count || index_count != self.index_count;

        if self.vertices.len() < vertex_count * 2 {
            self.vertices.resize(vertex_count * 2, 0.0);
            self.uvs.resize(vertex_count * 2, 0.0);
        }
        if self.indices.len() < index_count {
            self.indices.resize(index_count, 0);
        }

        self.vertices[..vertex_count * 2].copy_from_slice(&vertices[..vertex_count * 2]);
        for (i, uv) in self.uvs[..vertex_count * 2].iter_mut().enumerate() {
            *uv = uvs.get(i).copied().unwrap_or(0.0);
        }
        // Compare by value: the attachment may hand out a shared triangle array.
        for (dst, &src) in self.indices[..index_count].iter_mut().zip(indices) {
            if *dst != src {
                *dst = src;
                changed = true;
            }
        }

        self.vertex_count = vertex_count;
        self.index_count = index_count;
        changed
    }
}

/// Turns each slot's active attachment into renderable geometry, following draw order.
#[derive(Default)]
pub struct AttachmentGeometryBuilder {
    clipper: ClippingTessellator,
    world_vertices: Vec<f32>,
    entries: HashMap<usize, Vec<AttachmentGeometry>>,
    hidden_slots: HashSet<usize>,
    draw_list: DrawList,
    /// `(slot, entry)` keys appended to the draw list by the current and the previous build.
    drawn: Vec<(usize, usize)>,
    previous_drawn: Vec<(usize, usize)>,
    dirty: bool,
}

impl AttachmentGeometryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Suppresses a slot's own geometry, for slots replaced by a bound object.
    pub fn set_slot_hidden(&mut self, slot: usize, hidden: bool) {
        if hidden {
            self.hidden_slots.insert(slot);
        } else {
            self.hidden_slots.remove(&slot);
        }
    }

    pub fn is_slot_hidden(&self, slot: usize) -> bool {
        self.hidden_slots.contains(&slot)
    }

    pub fn draw_list(&self) -> &DrawList {
        &self.draw_list
    }

    pub fn entry(&self, slot: usize, attachment: &str) -> Option<&AttachmentGeometry> {
        self.entries
            .get(&slot)?
            .iter()
            .find(|entry| entry.attachment == attachment)
    }

    pub fn entries(&self) -> impl Iterator<Item = &AttachmentGeometry> {
        self.entries.values().flatten()
    }

    /// Whether the draw list's indices may differ from those at the last [`Self::mark_clean`].
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Records that the current draw list was submitted to the host.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
        for entry in self.entries.values_mut().flatten() {
            entry.dirty = false;
        }
    }

    /// Drops every cached entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.draw_list.clear();
        self.drawn.clear();
        self.previous_drawn.clear();
        self.dirty = true;
        self.clipper.clip_end();
    }

    /// Rebuilds geometry for the current pose. `visit` is called for every slot in draw order,
    /// before the slot is processed, with the clip region open at that point.
    pub fn build<S, F>(&mut self, skeleton: &S, mut visit: F) -> &DrawList
    where
        S: SkeletonPose + ?Sized,
        F: FnMut(usize, Option<ClipRegion<'_>>),
    {
        self.draw_list.clear();
        std::mem::swap(&mut self.drawn, &mut self.previous_drawn);
        self.drawn.clear();
        for entry in self.entries.values_mut().flatten() {
            entry.visible = false;
        }

        let skeleton_color = skeleton.color();
        for &slot_index in skeleton.draw_order() {
            let region = self.clipper.clip_slot().map(|slot| ClipRegion {
                slot,
                polygon: self.clipper.clipping_polygon(),
            });
            visit(slot_index, region);
            self.visit_slot(skeleton, slot_index, skeleton_color);
        }

        self.clipper.clip_end();
        if self.drawn != self.previous_drawn {
            self.dirty = true;
        }
        &self.draw_list
    }

    fn visit_slot<S: SkeletonPose + ?Sized>(
        &mut self,
        skeleton: &S,
        slot_index: usize,
        skeleton_color: Color,
    ) {
        let Some(slot) = skeleton.slot(slot_index) else {
            return;
        };
        let bone_active = skeleton.bone(slot.bone).is_some_and(|bone| bone.active);
        let attachment = slot.attachment.as_ref().filter(|_| bone_active);

        match attachment.map(|a| a.kind) {
            Some(AttachmentKind::Clipping) => {
                if let Some(attachment) = attachment {
                    self.start_clip(skeleton, slot_index, attachment);
                }
                // Clipping slots never close a region.
                return;
            }
            Some(AttachmentKind::Region | AttachmentKind::Mesh) => {
                if let Some(attachment) = attachment {
                    self.build_attachment(skeleton, slot_index, &slot, attachment, skeleton_color);
                }
            }
            Some(AttachmentKind::Other) | None => {}
        }

        self.clipper.clip_end_with_slot(slot_index);
    }

    fn start_clip<S: SkeletonPose + ?Sized>(
        &mut self,
        skeleton: &S,
        slot_index: usize,
        attachment: &AttachmentView<'_>,
    ) {
        if self.clipper.is_clipping() {
            return;
        }
        let len = attachment.world_vertices_length;
        if self.world_vertices.len() < len {
            self.world_vertices.resize(len, 0.0);
        }
        let written = skeleton
            .compute_world_vertices(slot_index, &mut self.world_vertices[..len])
            .min(len);
        if !self
            .clipper
            .clip_start(slot_index, &self.world_vertices[..written], attachment.end_slot)
        {
            log::debug!("clipping attachment '{}' ignored: degenerate polygon", attachment.name);
        }
    }

    fn build_attachment<S: SkeletonPose + ?Sized>(
        &mut self,
        skeleton: &S,
        slot_index: usize,
        slot: &SlotView<'_>,
        attachment: &AttachmentView<'_>,
        skeleton_color: Color,
    ) {
        let light = multiply_rgba(multiply_rgba(skeleton_color, slot.color), attachment.color);
        let premultiplied_alpha = attachment.premultiplied_alpha;
        let hidden = self.hidden_slots.contains(&slot_index);

        let (key, entry) = entry_for(&mut self.entries, slot_index, attachment.name);
        entry.visible = !hidden;
        if entry.alpha != light[3] {
            entry.alpha = light[3];
            entry.dirty = true;
        }
        entry.color = apply_pma(light, premultiplied_alpha);
        entry.dark_color = dark_color_rgba(slot.dark_color, premultiplied_alpha, light[3]);
        entry.blend = slot.blend;
        entry.premultiplied_alpha = premultiplied_alpha;
        if entry.texture != attachment.texture {
            entry.texture = attachment.texture.to_string();
        }

        entry.skip_render = light[3] <= 0.0;
        if entry.skip_render || hidden {
            return;
        }

        let len = attachment.world_vertices_length;
        if self.world_vertices.len() < len {
            self.world_vertices.resize(len, 0.0);
        }
        let written = skeleton
            .compute_world_vertices(slot_index, &mut self.world_vertices[..len])
            .min(len);
        let triangles: &[u16] = match attachment.kind {
            AttachmentKind::Region => &REGION_TRIANGLES,
            _ => attachment.triangles,
        };
        if written < 6 || triangles.is_empty() {
            entry.skip_render = true;
            return;
        }
        let world_vertices = &self.world_vertices[..written];

        if self.clipper.is_clipping() {
            self.clipper
                .clip_triangles_unpacked(world_vertices, triangles, attachment.uvs);
            let clipped = match entry.clipped.as_mut() {
                Some(clipped) => clipped,
                None => {
                    entry.dirty = true;
                    entry.clipped.insert(ClippedGeometry::default())
                }
            };
            if clipped.update_from(&self.clipper) {
                entry.dirty = true;
            }
            if clipped.index_count() == 0 {
                entry.skip_render = true;
                return;
            }
        } else {
            if entry.clipped.take().is_some() {
                entry.dirty = true;
            }
            if entry.set_geometry(world_vertices, attachment.uvs, triangles) {
                entry.dirty = true;
            }
        }

        self.dirty |= entry.dirty;
        self.drawn.push((slot_index, key));
        append_entry(&mut self.draw_list, entry);
    }
}

fn entry_for<'a>(
    entries: &'a mut HashMap<usize, Vec<AttachmentGeometry>>,
    slot: usize,
    attachment: &str,
) -> (usize, &'a mut AttachmentGeometry) {
    let slot_entries = entries.entry(slot).or_default();
    let index = match slot_entries.iter().position(|e| e.attachment == attachment) {
        Some(index) => index,
        None => {
            slot_entries.push(AttachmentGeometry::new(slot, attachment));
            slot_entries.len() - 1
        }
    };
    (index, &mut slot_entries[index])
}

fn append_entry(out: &mut DrawList, entry: &AttachmentGeometry) {
    let indices = entry.indices();
    if indices.is_empty() {
        return;
    }

    let base = out.vertices.len() as u32;
    out.vertices.extend(
        entry
            .vertices()
            .chunks_exact(2)
            .zip(entry.uvs().chunks_exact(2))
            .map(|(xy, uv)| Vertex {
                position: [xy[0], xy[1]],
                uv: [uv[0], uv[1]],
                color: entry.color,
                dark_color: entry.dark_color,
            }),
    );

    let first_index = out.indices.len();
    out.indices
        .extend(indices.iter().map(|&index| base + index as u32));

    if let Some(last) = out.draws.last_mut() {
        let expected = last.first_index + last.index_count;
        if last.texture == entry.texture
            && last.blend == entry.blend
            && last.premultiplied_alpha == entry.premultiplied_alpha
            && expected == first_index
        {
            last.index_count += indices.len();
            return;
        }
    }

    out.draws.push(Draw {
        texture: entry.texture.clone(),
        blend: entry.blend,
        premultiplied_alpha: entry.premultiplied_alpha,
        first_index,
        index_count: indices.len(),
    });
}

pub(crate) fn multiply_rgba(a: Color, b: Color) -> Color {
    [a[0] * b[0], a[1] * b[1], a[2] * b[2], a[3] * b[3]]
}

fn apply_pma(mut color: Color, premultiplied_alpha: bool) -> Color {
    if premultiplied_alpha {
        let a = color[3];
        color[0] *= a;
        color[1] *= a;
        color[2] *= a;
    }
    color
}

fn dark_color_rgba(dark: Option<[f32; 3]>, premultiplied_alpha: bool, light_alpha: f32) -> Color {
    // Without a tint the dark term is a no-op (0,0,0,1). With PMA the tint is premultiplied
    // by the final light alpha; otherwise alpha 0 selects the straight-alpha shader formula.
    let Some(dark) = dark else {
        return [0.0, 0.0, 0.0, 1.0];
    };

    if premultiplied_alpha {
        [
            dark[0] * light_alpha,
            dark[1] * light_alpha,
            dark[2] * light_alpha,
            1.0,
        ]
    } else {
        [dark[0], dark[1], dark[2], 0.0]
    }
}
