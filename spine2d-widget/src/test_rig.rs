//! Small skeleton and animation-state implementations used by unit tests.

use crate::{
    AnimationInfo, AnimationState, AttachmentKind, AttachmentView, BlendMode, BoneTransform,
    Color, Error, Physics, SkeletonPose, SlotView, TrackEntryId,
};
use std::collections::{BTreeMap, VecDeque};

#[track_caller]
pub(crate) fn assert_approx(actual: f32, expected: f32) {
    let eps = 1.0e-4;
    assert!(
        (actual - expected).abs() <= eps,
        "expected {expected}, got {actual}"
    );
}

#[derive(Clone, Debug)]
pub(crate) struct RigBone {
    pub name: String,
    pub parent: Option<usize>,
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub active: bool,
}

#[derive(Clone, Debug)]
pub(crate) struct RigAttachment {
    pub name: String,
    pub kind: AttachmentKind,
    pub texture: String,
    pub premultiplied_alpha: bool,
    pub color: Color,
    /// Bone-local positions.
    pub vertices: Vec<f32>,
    pub uvs: Vec<f32>,
    pub triangles: Vec<u16>,
    pub hull_length: usize,
    pub end_slot: Option<usize>,
}

impl RigAttachment {
    pub fn region(name: &str, width: f32, height: f32) -> Self {
        let (hw, hh) = (width / 2.0, height / 2.0);
        Self {
            name: name.to_string(),
            kind: AttachmentKind::Region,
            texture: "page.png".to_string(),
            premultiplied_alpha: false,
            color: [1.0; 4],
            vertices: vec![-hw, -hh, hw, -hh, hw, hh, -hw, hh],
            uvs: vec![0.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0],
            triangles: Vec::new(),
            hull_length: 8,
            end_slot: None,
        }
    }

    pub fn mesh(name: &str, vertices: Vec<f32>, triangles: Vec<u16>, hull_length: usize) -> Self {
        let uvs = vertices.iter().map(|v| v.abs().fract()).collect();
        Self {
            name: name.to_string(),
            kind: AttachmentKind::Mesh,
            texture: "page.png".to_string(),
            premultiplied_alpha: false,
            color: [1.0; 4],
            vertices,
            uvs,
            triangles,
            hull_length,
            end_slot: None,
        }
    }

    pub fn clipping(name: &str, polygon: Vec<f32>, end_slot: Option<usize>) -> Self {
        let hull_length = polygon.len();
        Self {
            name: name.to_string(),
            kind: AttachmentKind::Clipping,
            texture: String::new(),
            premultiplied_alpha: false,
            color: [1.0; 4],
            vertices: polygon,
            uvs: Vec::new(),
            triangles: Vec::new(),
            hull_length,
            end_slot,
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct RigSlot {
    pub name: String,
    pub bone: usize,
    pub color: Color,
    pub dark_color: Option<[f32; 3]>,
    pub blend: BlendMode,
    pub attachment: Option<RigAttachment>,
}

/// Linear bone key from `from` to `to` (`x, y, rotation`) over the animation duration.
#[derive(Clone, Debug)]
pub(crate) struct RigKey {
    pub bone: usize,
    pub from: [f32; 3],
    pub to: [f32; 3],
}

#[derive(Clone, Debug)]
pub(crate) struct RigAnimation {
    pub name: String,
    pub duration: f32,
    pub keys: Vec<RigKey>,
}

#[derive(Clone, Debug)]
pub(crate) struct TestSkeleton {
    pub bones: Vec<RigBone>,
    setup_bones: Vec<RigBone>,
    pub slots: Vec<RigSlot>,
    setup_slots: Vec<RigSlot>,
    pub draw_order: Vec<usize>,
    pub color: Color,
    scale: [f32; 2],
    world: Vec<BoneTransform>,
    animations: Vec<RigAnimation>,
    known_skins: Vec<String>,
    skins: Vec<String>,
    time: f32,
    pub physics_translation: [f32; 2],
    pub world_updates: usize,
}

impl TestSkeleton {
    /// A skeleton with a single `root` bone at the origin.
    pub fn new() -> Self {
        let root = RigBone {
            name: "root".to_string(),
            parent: None,
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            active: true,
        };
        Self {
            bones: vec![root.clone()],
            setup_bones: vec![root],
            slots: Vec::new(),
            setup_slots: Vec::new(),
            draw_order: Vec::new(),
            color: [1.0; 4],
            scale: [1.0, 1.0],
            world: vec![BoneTransform::identity()],
            animations: Vec::new(),
            known_skins: vec!["default".to_string()],
            skins: vec!["default".to_string()],
            time: 0.0,
            physics_translation: [0.0; 2],
            world_updates: 0,
        }
    }

    /// Root plus a `body` bone at (0, 25) carrying a 50x50 region: setup bounds are
    /// `x -25..25`, `y 0..50`. A `walk` animation moves the body bone 100 units right over
    /// one second.
    pub fn standard() -> Self {
        let mut skeleton = Self::new();
        let body = skeleton.add_bone("body", Some(0), 0.0, 25.0, 0.0);
        skeleton.add_slot("body", body, Some(RigAttachment::region("body", 50.0, 50.0)));
        skeleton.add_animation(
            "walk",
            1.0,
            vec![RigKey {
                bone: body,
                from: [0.0, 25.0, 0.0],
                to: [100.0, 25.0, 0.0],
            }],
        );
        skeleton.add_animation("idle", 0.5, Vec::new());
        skeleton.known_skins.push("hat".to_string());
        skeleton.update_world_transform(Physics::None);
        skeleton
    }

    pub fn add_bone(&mut self, name: &str, parent: Option<usize>, x: f32, y: f32, rotation: f32) -> usize {
        let bone = RigBone {
            name: name.to_string(),
            parent,
            x,
            y,
            rotation,
            scale_x: 1.0,
            scale_y: 1.0,
            active: true,
        };
        self.bones.push(bone.clone());
        self.setup_bones.push(bone);
        self.world.push(BoneTransform::identity());
        self.bones.len() - 1
    }

    pub fn set_bone_scale(&mut self, bone: usize, scale_x: f32, scale_y: f32) {
        self.bones[bone].scale_x = scale_x;
        self.bones[bone].scale_y = scale_y;
        self.setup_bones[bone].scale_x = scale_x;
        self.setup_bones[bone].scale_y = scale_y;
    }

    pub fn add_slot(&mut self, name: &str, bone: usize, attachment: Option<RigAttachment>) -> usize {
        let slot = RigSlot {
            name: name.to_string(),
            bone,
            color: [1.0; 4],
            dark_color: None,
            blend: BlendMode::Normal,
            attachment,
        };
        self.slots.push(slot.clone());
        self.setup_slots.push(slot);
        self.draw_order.push(self.slots.len() - 1);
        self.slots.len() - 1
    }

    pub fn add_animation(&mut self, name: &str, duration: f32, keys: Vec<RigKey>) -> usize {
        self.animations.push(RigAnimation {
            name: name.to_string(),
            duration,
            keys,
        });
        self.animations.len() - 1
    }

    pub fn animation_list(&self) -> Vec<(String, f32)> {
        self.animations
            .iter()
            .map(|a| (a.name.clone(), a.duration))
            .collect()
    }

    pub fn world(&self, bone: usize) -> BoneTransform {
        self.world[bone]
    }
}

impl SkeletonPose for TestSkeleton {
    fn draw_order(&self) -> &[usize] {
        &self.draw_order
    }

    fn slot_count(&self) -> usize {
        self.slots.len()
    }

    fn slot(&self, index: usize) -> Option<SlotView<'_>> {
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
                world_vertices_length: a.vertices.len(),
                hull_length: a.hull_length,
                end_slot: a.end_slot,
            }),
        })
    }

    fn bone(&self, index: usize) -> Option<BoneTransform> {
        self.world.get(index).copied()
    }

    fn find_bone(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|b| b.name == name)
    }

    fn find_slot(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|s| s.name == name)
    }

    fn find_animation(&self, name: &str) -> Option<AnimationInfo> {
        let index = self.animations.iter().position(|a| a.name == name)?;
        Some(AnimationInfo {
            index,
            name: name.to_string(),
            duration: self.animations[index].duration,
        })
    }

    fn color(&self) -> Color {
        self.color
    }

    fn scale(&self) -> [f32; 2] {
        self.scale
    }

    fn set_scale(&mut self, scale_x: f32, scale_y: f32) {
        self.scale = [scale_x, scale_y];
    }

    fn compute_world_vertices(&self, slot: usize, out: &mut [f32]) -> usize {
        let Some(slot) = self.slots.get(slot) else {
            return 0;
        };
        let Some(attachment) = slot.attachment.as_ref() else {
            return 0;
        };
        let bone = self.world[slot.bone];
        let count = attachment.vertices.len().min(out.len()) / 2 * 2;
        for i in (0..count).step_by(2) {
            let [x, y] = bone.local_to_world(attachment.vertices[i], attachment.vertices[i + 1]);
            out[i] = x;
            out[i + 1] = y;
        }
        count
    }

    fn set_to_setup_pose(&mut self) {
        self.bones = self.setup_bones.clone();
        self.slots = self.setup_slots.clone();
        self.draw_order = (0..self.slots.len()).collect();
    }

    fn update(&mut self, delta: f32) {
        self.time += delta;
    }

    fn time(&self) -> f32 {
        self.time
    }

    fn update_world_transform(&mut self, _physics: Physics) {
        self.world_updates += 1;
        let [sx, sy] = self.scale;
        for i in 0..self.bones.len() {
            let bone = &self.bones[i];
            let (sin, cos) = bone.rotation.to_radians().sin_cos();
            let la = cos * bone.scale_x;
            let lb = -sin * bone.scale_y;
            let lc = sin * bone.scale_x;
            let ld = cos * bone.scale_y;
            let (a, b, c, d, world_x, world_y) = match bone.parent {
                None => (la * sx, lb * sx, lc * sy, ld * sy, bone.x * sx, bone.y * sy),
                Some(parent) => {
                    let p = self.world[parent];
                    (
                        p.a * la + p.b * lc,
                        p.a * lb + p.b * ld,
                        p.c * la + p.d * lc,
                        p.c * lb + p.d * ld,
                        p.a * bone.x + p.b * bone.y + p.world_x,
                        p.c * bone.x + p.d * bone.y + p.world_y,
                    )
                }
            };
            self.world[i] = BoneTransform {
                parent: bone.parent,
                active: bone.active,
                a,
                b,
                c,
                d,
                world_x,
                world_y,
                scale_x: bone.scale_x,
                scale_y: bone.scale_y,
            };
        }
    }

    fn physics_translate(&mut self, x: f32, y: f32) {
        self.physics_translation[0] += x;
        self.physics_translation[1] += y;
    }

    fn has_skin(&self, name: &str) -> bool {
        self.known_skins.iter().any(|s| s == name)
    }

    fn skins(&self) -> Vec<String> {
        self.skins.clone()
    }

    fn set_skins(&mut self, names: &[String]) -> Result<(), Error> {
        if let Some(name) = names.iter().find(|n| !self.known_skins.contains(n)) {
            return Err(Error::UnknownSkin { name: name.clone() });
        }
        self.skins = names.to_vec();
        Ok(())
    }

    fn apply_animation(&mut self, animation: usize, time: f32) {
        let Some(animation) = self.animations.get(animation) else {
            return;
        };
        let alpha = if animation.duration > 0.0 {
            (time / animation.duration).clamp(0.0, 1.0)
        } else {
            0.0
        };
        for key in &animation.keys {
            let bone = &mut self.bones[key.bone];
            bone.x = key.from[0] + (key.to[0] - key.from[0]) * alpha;
            bone.y = key.from[1] + (key.to[1] - key.from[1]) * alpha;
            bone.rotation = key.from[2] + (key.to[2] - key.from[2]) * alpha;
        }
    }

    fn set_bone_world_position(&mut self, bone: usize, x: f32, y: f32) {
        let parent = self.bones[bone].parent;
        let [local_x, local_y] = match parent {
            None => [x / self.scale[0], y / self.scale[1]],
            Some(parent) => {
                let p = self.world[parent];
                let det = p.a * p.d - p.b * p.c;
                let (dx, dy) = (x - p.world_x, y - p.world_y);
                [(dx * p.d - dy * p.b) / det, (dy * p.a - dx * p.c) / det]
            }
        };
        self.bones[bone].x = local_x;
        self.bones[bone].y = local_y;
    }
}

#[derive(Clone, Debug)]
struct RigEntry {
    id: TrackEntryId,
    animation: Option<usize>,
    duration: f32,
    looping: bool,
    delay: f32,
    track_time: f32,
    completed_iterations: u32,
}

/// Track-queue animation state driving [`TestSkeleton`].
#[derive(Clone, Debug, Default)]
pub(crate) struct TestAnimationState {
    animations: Vec<(String, f32)>,
    tracks: BTreeMap<usize, VecDeque<RigEntry>>,
    time: f32,
    next_id: u64,
    completed: Vec<TrackEntryId>,
    pub default_mix: f32,
    /// Human-readable record of queue operations, for assertions.
    pub log: Vec<String>,
}

impl TestAnimationState {
    pub fn new(skeleton: &TestSkeleton) -> Self {
        Self {
            animations: skeleton.animation_list(),
            ..Self::default()
        }
    }

    pub fn current(&self, track: usize) -> Option<&str> {
        let entry = self.tracks.get(&track)?.front()?;
        Some(match entry.animation {
            Some(index) => self.animations[index].0.as_str(),
            None => "<empty>",
        })
    }

    fn lookup(&self, name: &str) -> Result<(usize, f32), Error> {
        self.animations
            .iter()
            .position(|(n, _)| n == name)
            .map(|index| (index, self.animations[index].1))
            .ok_or_else(|| Error::UnknownAnimation {
                name: name.to_string(),
            })
    }

    fn next_entry(&mut self, animation: Option<usize>, duration: f32, looping: bool, delay: f32) -> RigEntry {
        self.next_id += 1;
        RigEntry {
            id: TrackEntryId(self.next_id),
            animation,
            duration,
            looping,
            delay,
            track_time: 0.0,
            completed_iterations: 0,
        }
    }

    fn queue_delay(&self, track: usize, delay: f32) -> f32 {
        if delay > 0.0 {
            return delay;
        }
        let previous = self
            .tracks
            .get(&track)
            .and_then(|queue| queue.back())
            .map_or(0.0, |entry| entry.duration);
        (previous + delay).max(0.0)
    }
}

impl AnimationState for TestAnimationState {
    type Skeleton = TestSkeleton;

    fn update(&mut self, delta: f32) {
        self.time += delta;
        for queue in self.tracks.values_mut() {
            let Some(current) = queue.front_mut() else {
                continue;
            };
            current.track_time += delta;

            let iterations = if current.duration > 0.0 {
                (current.track_time / current.duration).floor() as u32
            } else {
                1
            };
            if iterations > current.completed_iterations
                && (current.looping || current.completed_iterations == 0)
            {
                current.completed_iterations = iterations;
                self.completed.push(current.id);
            }

            if queue.len() > 1 && queue[0].track_time >= queue[1].delay {
                if let Some(previous) = queue.pop_front() {
                    if let Some(next) = queue.front_mut() {
                        next.track_time = previous.track_time - next.delay;
                    }
                }
            }
        }
    }

    fn apply(&mut self, skeleton: &mut TestSkeleton) -> bool {
        let mut applied = false;
        for queue in self.tracks.values() {
            let Some(entry) = queue.front() else {
                continue;
            };
            let Some(animation) = entry.animation else {
                continue;
            };
            let time = if entry.looping && entry.duration > 0.0 {
                entry.track_time % entry.duration
            } else {
                entry.track_time.min(entry.duration)
            };
            skeleton.apply_animation(animation, time);
            applied = true;
        }
        applied
    }

    fn time(&self) -> f32 {
        self.time
    }

    fn set_animation(&mut self, track: usize, animation: &str, looping: bool) -> Result<TrackEntryId, Error> {
        let (index, duration) = self.lookup(animation)?;
        let entry = self.next_entry(Some(index), duration, looping, 0.0);
        let id = entry.id;
        self.tracks.insert(track, VecDeque::from([entry]));
        self.log.push(format!("set {track} {animation} {looping}"));
        Ok(id)
    }

    fn add_animation(&mut self, track: usize, animation: &str, looping: bool, delay: f32) -> Result<TrackEntryId, Error> {
        let (index, duration) = self.lookup(animation)?;
        let delay = self.queue_delay(track, delay);
        let entry = self.next_entry(Some(index), duration, looping, delay);
        let id = entry.id;
        self.tracks.entry(track).or_default().push_back(entry);
        self.log.push(format!("add {track} {animation} {looping} {delay}"));
        Ok(id)
    }

    fn set_empty_animation(&mut self, track: usize, mix_duration: f32) -> TrackEntryId {
        let entry = self.next_entry(None, 0.0, false, 0.0);
        let id = entry.id;
        self.tracks.insert(track, VecDeque::from([entry]));
        self.log.push(format!("set-empty {track} {mix_duration}"));
        id
    }

    fn add_empty_animation(&mut self, track: usize, mix_duration: f32, delay: f32) -> TrackEntryId {
        let delay = self.queue_delay(track, delay);
        let entry = self.next_entry(None, 0.0, false, delay);
        let id = entry.id;
        self.tracks.entry(track).or_default().push_back(entry);
        self.log.push(format!("add-empty {track} {mix_duration} {delay}"));
        id
    }

    fn set_mix_duration(&mut self, entry: TrackEntryId, mix_duration: f32) {
        self.log.push(format!("mix {} {mix_duration}", entry.0));
    }

    fn set_default_mix(&mut self, mix_duration: f32) {
        self.default_mix = mix_duration;
    }

    fn clear_tracks(&mut self) {
        self.tracks.clear();
        self.log.push("clear".to_string());
    }

    fn take_completed(&mut self) -> Vec<TrackEntryId> {
        std::mem::take(&mut self.completed)
    }
}
