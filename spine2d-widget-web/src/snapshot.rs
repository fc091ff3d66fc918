//! Owned copy of a runtime skeleton's pose.
//!
//! spine-core objects live on the JS heap, so the pipeline reads a snapshot refreshed after every
//! mutation instead of borrowing from them.

use spine2d_widget::{
    AnimationInfo, AttachmentKind, AttachmentView, BlendMode, BoneTransform, Color, Physics,
    SlotView,
};

#[derive(Clone, Debug, PartialEq)]
pub struct BoneRecord {
    pub name: String,
    pub transform: BoneTransform,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AttachmentRecord {
    pub name: String,
    pub kind: AttachmentKind,
    pub texture: String,
    pub premultiplied_alpha: bool,
    pub color: Color,
    pub uvs: Vec<f32>,
    pub triangles: Vec<u16>,
    pub world_vertices_length: usize,
    pub hull_length: usize,
    pub end_slot: Option<usize>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SlotRecord {
    pub name: String,
    pub bone: usize,
    pub color: Color,
    pub dark_color: Option<[f32; 3]>,
    pub blend: BlendMode,
    pub attachment: Option<AttachmentRecord>,
}

#[derive(Clone, Debug, Default)]
pub struct PoseSnapshot {
    pub bones: Vec<BoneRecord>,
    pub slots: Vec<SlotRecord>,
    pub draw_order: Vec<usize>,
    pub animations: Vec<AnimationInfo>,
    world_vertices: Vec<Vec<f32>>,
}

impl PoseSnapshot {
    pub fn new(bones: Vec<BoneRecord>, slots: Vec<SlotRecord>, animations: Vec<AnimationInfo>) -> Self {
        let draw_order = (0..slots.len()).collect();
        let world_vertices = vec![Vec::new(); slots.len()];
        Self {
            bones,
            slots,
            draw_order,
            animations,
            world_vertices,
        }
    }

    pub fn slot_view(&self, index: usize) -> Option<SlotView<'_>> {
        let slot = self.slots.get(index)?;
        Some(SlotView {
            name: &slot.name,
            bone: slot.bone,
            color: slot.color,
            dark_color: slot.dark_color,
            blend: slot.blend,
            attachment: slot.attachment.as_ref().map(|a| AttachmentView {
                name: &a.name,
                kind: a.kind,
                texture: &a.texture,
                premultiplied_alpha: a.premultiplied_alpha,
                color: a.color,
                uvs: &a.uvs,
                triangles: &a.triangles,
                world_vertices_length: a.world_vertices_length,
                hull_length: a.hull_length,
                end_slot: a.end_slot,
            }),
        })
    }

    pub fn bone(&self, index: usize) -> Option<BoneTransform> {
        self.bones.get(index).map(|b| b.transform)
    }

    pub fn find_bone(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|b| b.name == name)
    }

    pub fn find_slot(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|s| s.name == name)
    }

    pub fn find_animation(&self, name: &str) -> Option<AnimationInfo> {
        self.animations.iter().find(|a| a.name == name).cloned()
    }

    /// Stores the world vertices of a slot's attachment as computed by the runtime.
    pub fn set_world_vertices(&mut self, slot: usize, vertices: &[f32]) {
        if slot >= self.world_vertices.len() {
            self.world_vertices.resize(slot + 1, Vec::new());
        }
        let stored = &mut self.world_vertices[slot];
        stored.clear();
        stored.extend_from_slice(vertices);
    }

    /// Copies the stored world vertices of `slot` into `out`, returning the floats written.
    pub fn copy_world_vertices(&self, slot: usize, out: &mut [f32]) -> usize {
        let Some(vertices) = self.world_vertices.get(slot) else {
            return 0;
        };
        let n = vertices.len().min(out.len());
        out[..n].copy_from_slice(&vertices[..n]);
        n
    }
}

/// Blend mode from spine-core's `BlendMode` enum ordinal.
pub fn blend_mode_from_ordinal(ordinal: u32) -> BlendMode {
    match ordinal {
        1 => BlendMode::Additive,
        2 => BlendMode::Multiply,
        3 => BlendMode::Screen,
        _ => BlendMode::Normal,
    }
}

/// spine-core's `Physics` enum ordinal.
pub fn physics_ordinal(physics: Physics) -> u32 {
    match physics {
        Physics::None => 0,
        Physics::Reset => 1,
        Physics::Update => 2,
        Physics::Pose => 3,
    }
}

/// Attachment kind from the properties a spine-core attachment object carries.
///
/// Clipping attachments have an `endSlot` property (possibly null), meshes carry triangles and
/// regions carry an offset array. Everything else has no geometry to draw.
pub fn classify_attachment(has_end_slot: bool, has_triangles: bool, has_offset: bool) -> AttachmentKind {
    if has_end_slot {
        AttachmentKind::Clipping
    } else if has_triangles {
        AttachmentKind::Mesh
    } else if has_offset {
        AttachmentKind::Region
    } else {
        AttachmentKind::Other
    }
}
