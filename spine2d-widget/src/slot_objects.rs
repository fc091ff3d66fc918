//! Host objects bound to skeleton slots, following their bone every frame.

use crate::{ClipMask, ClipRegion, Pool, PoolHandle, SkeletonPose};

/// Which properties of the slot a bound object follows.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FollowFlags {
    pub position: bool,
    pub rotation: bool,
    pub scale: bool,
    pub opacity: bool,
    pub visibility: bool,
    /// Visible only while the slot has an attachment.
    pub attachment_timeline: bool,
    /// Suppress the slot's own geometry while the object is bound.
    pub hide_attachment: bool,
}

impl Default for FollowFlags {
    fn default() -> Self {
        Self {
            position: true,
            rotation: true,
            scale: true,
            opacity: true,
            visibility: true,
            attachment_timeline: false,
            hide_attachment: false,
        }
    }
}

/// Transform pushed to a bound object. Properties the object does not follow are `None`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FollowerTransform {
    /// World position, widget offset included.
    pub position: Option<[f32; 2]>,
    /// Degrees, counter-clockwise.
    pub rotation: Option<f32>,
    pub scale: Option<[f32; 2]>,
    pub opacity: Option<f32>,
    pub visible: Option<bool>,
    /// World polygon of the clip region containing the slot, widget offset excluded.
    pub mask: Option<Vec<f32>>,
}

pub trait SlotFollower {
    fn apply(&mut self, transform: &FollowerTransform);
}

impl<T: SlotFollower + ?Sized> SlotFollower for Box<T> {
    fn apply(&mut self, transform: &FollowerTransform) {
        (**self).apply(transform)
    }
}

struct Binding<O> {
    id: String,
    slot: usize,
    object: O,
    flags: FollowFlags,
    transform: FollowerTransform,
    mask: Option<PoolHandle>,
    reached: bool,
    masked: bool,
}

/// Bound objects of one widget plus the pool their clip masks come from.
pub struct SlotObjects<O> {
    bindings: Vec<Binding<O>>,
    masks: Pool<ClipMask>,
}

impl<O> Default for SlotObjects<O> {
    fn default() -> Self {
        Self {
            bindings: Vec::new(),
            masks: Pool::new(),
        }
    }
}

impl<O: SlotFollower> SlotObjects<O> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `object` to `slot` under `id`, replacing and returning any object bound under the
    /// same id.
    pub fn bind(&mut self, id: &str, slot: usize, object: O, flags: FollowFlags) -> Option<O> {
        let previous = self.unbind(id);
        self.bindings.push(Binding {
            id: id.to_string(),
            slot,
            object,
            flags,
            transform: FollowerTransform::default(),
            mask: None,
            reached: false,
            masked: false,
        });
        previous
    }

    pub fn unbind(&mut self, id: &str) -> Option<O> {
        let index = self.bindings.iter().position(|b| b.id == id)?;
        let binding = self.bindings.remove(index);
        if let Some(mask) = binding.mask {
            self.masks.release(mask);
        }
        Some(binding.object)
    }

    /// Unbinds everything and releases every mask.
    pub fn clear(&mut self) {
        for binding in self.bindings.drain(..) {
            if let Some(mask) = binding.mask {
                self.masks.release(mask);
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&O> {
        self.binding(id).map(|b| &b.object)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut O> {
        self.bindings
            .iter_mut()
            .find(|b| b.id == id)
            .map(|b| &mut b.object)
    }

    pub fn transform(&self, id: &str) -> Option<&FollowerTransform> {
        self.binding(id).map(|b| &b.transform)
    }

    pub fn slot_of(&self, id: &str) -> Option<usize> {
        self.binding(id).map(|b| b.slot)
    }

    /// Whether any binding on `slot` hides the slot's own geometry.
    pub fn is_slot_hidden(&self, slot: usize) -> bool {
        self.bindings
            .iter()
            .any(|b| b.slot == slot && b.flags.hide_attachment)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn masks_in_use(&self) -> usize {
        self.masks.in_use()
    }

    fn binding(&self, id: &str) -> Option<&Binding<O>> {
        self.bindings.iter().find(|b| b.id == id)
    }

    pub fn begin_pass(&mut self) {
        for binding in &mut self.bindings {
            binding.reached = false;
            binding.masked = false;
        }
    }

    /// Updates the bindings of `slot`, reached in draw order with `region` open.
    pub fn visit<S: SkeletonPose + ?Sized>(
        &mut self,
        skeleton: &S,
        slot: usize,
        region: Option<ClipRegion<'_>>,
        offset: [f32; 2],
    ) {
        if !self.bindings.iter().any(|b| b.slot == slot) {
            return;
        }
        let Some(view) = skeleton.slot(slot) else {
            return;
        };
        let Some(bone) = skeleton.bone(view.bone) else {
            return;
        };
        let [sign_x, sign_y] = cumulative_scale_sign(skeleton, view.bone);
        let alpha = skeleton.color()[3] * view.color[3];
        let has_attachment = view.attachment.is_some();

        for binding in self.bindings.iter_mut().filter(|b| b.slot == slot) {
            binding.reached = true;
            let flags = binding.flags;
            let transform = &mut binding.transform;

            transform.position = flags
                .position
                .then(|| [bone.world_x + offset[0], bone.world_y + offset[1]]);
            transform.rotation = flags.rotation.then(|| {
                let rotation = bone.world_rotation_x();
                if sign_x < 0.0 { rotation - 180.0 } else { rotation }
            });
            transform.scale = flags.scale.then(|| {
                [
                    bone.world_scale_x() * sign_x,
                    bone.world_scale_y() * sign_y,
                ]
            });
            transform.opacity = flags.opacity.then_some(alpha);
            transform.visible = flags
                .visibility
                .then_some(!flags.attachment_timeline || has_attachment);

            match region {
                Some(region) => {
                    let handle = *binding.mask.get_or_insert_with(|| self.masks.obtain());
                    if let Some(mask) = self.masks.get_mut(handle) {
                        mask.clip_slot = region.slot;
                        mask.polygon.clear();
                        mask.polygon.extend_from_slice(region.polygon);
                        transform.mask = Some(mask.polygon.clone());
                    }
                    binding.masked = true;
                }
                None => transform.mask = None,
            }
        }
    }

    /// Releases masks not refreshed this pass, hides bindings whose slot was not reached and
    /// pushes every transform to its object.
    pub fn finish_pass(&mut self) {
        for binding in &mut self.bindings {
            if !binding.masked {
                if let Some(mask) = binding.mask.take() {
                    self.masks.release(mask);
                }
                binding.transform.mask = None;
            }
            if !binding.reached && binding.flags.visibility {
                binding.transform.visible = Some(false);
            }
            binding.object.apply(&binding.transform);
        }
    }
}

/// Sign of the product of local scales from `bone` up to the root.
fn cumulative_scale_sign<S: SkeletonPose + ?Sized>(skeleton: &S, bone: usize) -> [f32; 2] {
    let mut sign = [1.0f32, 1.0];
    let mut current = Some(bone);
    while let Some(index) = current {
        let Some(transform) = skeleton.bone(index) else {
            break;
        };
        if transform.scale_x < 0.0 {
            sign[0] = -sign[0];
        }
        if transform.scale_y < 0.0 {
            sign[1] = -sign[1];
        }
        current = transform.parent;
    }
    sign
}
