//! Interface to the skeleton and animation-state runtime.
//!
//! The widget pipeline never looks inside the bone hierarchy. It drives a runtime through
//! [`SkeletonPose`] and [`AnimationState`] and reads back world transforms, slot colors and
//! attachment world vertices.

use crate::Error;

/// RGBA color with components in `0.0..=1.0`.
pub type Color = [f32; 4];

/// Physics mode passed to [`SkeletonPose::update_world_transform`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum Physics {
    /// Physics constraints are not applied.
    None,
    /// Physics constraints are reset to their setup pose.
    Reset,
    /// Physics constraints are stepped using the skeleton clock.
    #[default]
    Update,
    /// Physics constraints hold their last pose.
    Pose,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum BlendMode {
    #[default]
    Normal,
    Additive,
    Multiply,
    Screen,
}

/// World transform of a bone after `update_world_transform`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BoneTransform {
    pub parent: Option<usize>,
    pub active: bool,
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub world_x: f32,
    pub world_y: f32,
    /// Local (applied) scale, used to find reflections along the parent chain.
    pub scale_x: f32,
    pub scale_y: f32,
}

impl BoneTransform {
    pub fn identity() -> Self {
        Self {
            parent: None,
            active: true,
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            world_x: 0.0,
            world_y: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }

    pub fn world_rotation_x(&self) -> f32 {
        self.c.atan2(self.a).to_degrees()
    }

    pub fn world_scale_x(&self) -> f32 {
        (self.a * self.a + self.c * self.c).sqrt()
    }

    pub fn world_scale_y(&self) -> f32 {
        (self.b * self.b + self.d * self.d).sqrt()
    }

    pub fn local_to_world(&self, x: f32, y: f32) -> [f32; 2] {
        [
            self.a * x + self.b * y + self.world_x,
            self.c * x + self.d * y + self.world_y,
        ]
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AttachmentKind {
    Region,
    Mesh,
    Clipping,
    /// Point, path, bounding box and any other attachment without visible geometry.
    Other,
}

/// Borrowed view of a slot's active attachment.
#[derive(Clone, Debug)]
pub struct AttachmentView<'a> {
    pub name: &'a str,
    pub kind: AttachmentKind,
    /// Texture page key used for batching. Empty for clipping attachments.
    pub texture: &'a str,
    pub premultiplied_alpha: bool,
    pub color: Color,
    /// Texture coordinates, two floats per vertex.
    pub uvs: &'a [f32],
    pub triangles: &'a [u16],
    /// Number of floats written by `compute_world_vertices` (two per vertex).
    pub world_vertices_length: usize,
    /// Number of floats of the convex hull prefix of the world vertices.
    pub hull_length: usize,
    /// Slot index closing the clip region, for clipping attachments.
    pub end_slot: Option<usize>,
}

/// Borrowed view of a slot.
#[derive(Clone, Debug)]
pub struct SlotView<'a> {
    pub name: &'a str,
    pub bone: usize,
    pub color: Color,
    pub dark_color: Option<[f32; 3]>,
    pub blend: BlendMode,
    pub attachment: Option<AttachmentView<'a>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AnimationInfo {
    pub index: usize,
    pub name: String,
    pub duration: f32,
}

/// The skeleton side of the runtime.
pub trait SkeletonPose {
    /// Slot indices in the current draw order.
    fn draw_order(&self) -> &[usize];

    fn slot_count(&self) -> usize;

    fn slot(&self, index: usize) -> Option<SlotView<'_>>;

    fn bone(&self, index: usize) -> Option<BoneTransform>;

    fn find_bone(&self, name: &str) -> Option<usize>;

    fn find_slot(&self, name: &str) -> Option<usize>;

    fn find_animation(&self, name: &str) -> Option<AnimationInfo>;

    fn color(&self) -> Color;

    fn scale(&self) -> [f32; 2];

    fn set_scale(&mut self, scale_x: f32, scale_y: f32);

    /// Writes the world vertices of the slot's active attachment into `out` (stride 2) and
    /// returns the number of floats written. `out` is at least `world_vertices_length` long.
    fn compute_world_vertices(&self, slot: usize, out: &mut [f32]) -> usize;

    fn set_to_setup_pose(&mut self);

    /// Advances the skeleton clock used by physics.
    fn update(&mut self, delta: f32);

    fn time(&self) -> f32;

    fn update_world_transform(&mut self, physics: Physics);

    /// Moves physics constraints as if the whole skeleton was translated.
    fn physics_translate(&mut self, _x: f32, _y: f32) {}

    fn has_skin(&self, name: &str) -> bool;

    /// Names of the skins currently combined into the active skin.
    fn skins(&self) -> Vec<String>;

    /// Activates the given skins, combining them when more than one is given.
    fn set_skins(&mut self, names: &[String]) -> Result<(), Error>;

    /// Applies a single animation at `time` on top of the setup pose, ignoring any track.
    fn apply_animation(&mut self, animation: usize, time: f32);

    /// Moves a bone so its world position becomes `(x, y)`.
    fn set_bone_world_position(&mut self, bone: usize, x: f32, y: f32);
}

/// Identifies a queued track entry of an [`AnimationState`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct TrackEntryId(pub u64);

/// The animation-state side of the runtime.
pub trait AnimationState {
    type Skeleton: SkeletonPose;

    fn update(&mut self, delta: f32);

    /// Applies all tracks to the skeleton. Returns whether anything was applied.
    fn apply(&mut self, skeleton: &mut Self::Skeleton) -> bool;

    /// Accumulated state time, advanced by [`AnimationState::update`].
    fn time(&self) -> f32;

    fn set_animation(
        &mut self,
        track: usize,
        animation: &str,
        looping: bool,
    ) -> Result<TrackEntryId, Error>;

    fn add_animation(
        &mut self,
        track: usize,
        animation: &str,
        looping: bool,
        delay: f32,
    ) -> Result<TrackEntryId, Error>;

    fn set_empty_animation(&mut self, track: usize, mix_duration: f32) -> TrackEntryId;

    fn add_empty_animation(&mut self, track: usize, mix_duration: f32, delay: f32)
    -> TrackEntryId;

    fn set_mix_duration(&mut self, entry: TrackEntryId, mix_duration: f32);

    fn set_default_mix(&mut self, mix_duration: f32);

    fn clear_tracks(&mut self);

    /// Entries that completed an iteration since the previous call.
    fn take_completed(&mut self) -> Vec<TrackEntryId>;
}
