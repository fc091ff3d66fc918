//! Skeleton bounding rectangles: single-pose measurement, animation sampling and the
//! providers widgets select from their configuration.

use crate::clipping::ClippingTessellator;
use crate::{AttachmentKind, Physics, REGION_TRIANGLES, SkeletonPose};

pub const DEFAULT_TIME_STEP: f32 = 0.05;

/// Axis-aligned rectangle in skeleton-local units.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    /// Width and height of -1 mark bounds that were never computed.
    pub const UNSET: Self = Self {
        x: 0.0,
        y: 0.0,
        width: -1.0,
        height: -1.0,
    };

    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        width: 0.0,
        height: 0.0,
    };

    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn is_computed(&self) -> bool {
        self.width != -1.0 || self.height != -1.0
    }

    pub fn has_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::UNSET
    }
}

#[derive(Copy, Clone, Debug)]
struct Extents {
    min: [f32; 2],
    max: [f32; 2],
}

impl Extents {
    fn empty() -> Self {
        Self {
            min: [f32::INFINITY; 2],
            max: [f32::NEG_INFINITY; 2],
        }
    }

    fn add_points(&mut self, points: &[f32]) {
        for xy in points.chunks_exact(2) {
            self.min[0] = self.min[0].min(xy[0]);
            self.min[1] = self.min[1].min(xy[1]);
            self.max[0] = self.max[0].max(xy[0]);
            self.max[1] = self.max[1].max(xy[1]);
        }
    }

    fn is_empty(&self) -> bool {
        self.min[0] > self.max[0] || self.min[1] > self.max[1]
    }

    fn to_bounds(self) -> Bounds {
        Bounds {
            x: self.min[0],
            y: self.min[1],
            width: self.max[0] - self.min[0],
            height: self.max[1] - self.min[1],
        }
    }

    fn add_bounds(&mut self, bounds: &Bounds) {
        self.add_points(&[bounds.x, bounds.y, bounds.x + bounds.width, bounds.y + bounds.height]);
    }
}

/// Measures skeleton poses. Owns its clipper and scratch buffer.
#[derive(Default)]
pub struct BoundsEstimator {
    clipper: ClippingTessellator,
    vertices: Vec<f32>,
}

impl BoundsEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bounds of the current world pose over visible region and mesh attachments. With `clip`,
    /// geometry inside a clip region only counts where it survives clipping. A pose with nothing
    /// visible, or with NaN positions, measures as [`Bounds::ZERO`].
    pub fn pose_bounds(&mut self, skeleton: &dyn SkeletonPose, clip: bool) -> Bounds {
        match self.measure(skeleton, clip) {
            Measure::Bounds(bounds) => bounds,
            Measure::Empty | Measure::Nan => Bounds::ZERO,
        }
    }

    fn measure(&mut self, skeleton: &dyn SkeletonPose, clip: bool) -> Measure {
        let mut extents = Extents::empty();
        let mut saw_nan = false;

        for &slot_index in skeleton.draw_order() {
            let Some(slot) = skeleton.slot(slot_index) else {
                continue;
            };
            let active = skeleton.bone(slot.bone).is_some_and(|b| b.active);
            let Some(attachment) = slot.attachment.as_ref().filter(|_| active) else {
                self.clipper.clip_end_with_slot(slot_index);
                continue;
            };

            let len = attachment.world_vertices_length;
            if self.vertices.len() < len {
                self.vertices.resize(len, 0.0);
            }
            let kind = attachment.kind;
            if kind == AttachmentKind::Other {
                self.clipper.clip_end_with_slot(slot_index);
                continue;
            }

            let written = skeleton
                .compute_world_vertices(slot_index, &mut self.vertices[..len])
                .min(len);
            let vertices = &self.vertices[..written];

            if kind == AttachmentKind::Clipping {
                if clip && !self.clipper.is_clipping() {
                    self.clipper
                        .clip_start(slot_index, vertices, attachment.end_slot);
                }
                continue;
            }

            saw_nan |= vertices.iter().any(|v| v.is_nan());
            if self.clipper.is_clipping() {
                let triangles: &[u16] = match kind {
                    AttachmentKind::Region => &REGION_TRIANGLES,
                    _ => attachment.triangles,
                };
                self.clipper
                    .clip_triangles_unpacked(vertices, triangles, attachment.uvs);
                extents.add_points(self.clipper.clipped_vertices());
            } else {
                extents.add_points(vertices);
            }
            self.clipper.clip_end_with_slot(slot_index);
        }
        self.clipper.clip_end();

        if saw_nan {
            Measure::Nan
        } else if extents.is_empty() {
            Measure::Empty
        } else {
            Measure::Bounds(extents.to_bounds())
        }
    }

    /// Samples animations in isolation and returns the union of their pose bounds.
    ///
    /// Each animation is sampled `max(duration / time_step, 1)` times starting at t = 0. No
    /// animation means the setup pose. A NaN anywhere yields [`Bounds::ZERO`]. Sampling runs at
    /// unit skeleton scale so the result is in skeleton-local units. The skeleton is back in its
    /// setup pose, with its previous skins and scale and world transforms recomputed, afterwards.
    pub fn sample(
        &mut self,
        skeleton: &mut dyn SkeletonPose,
        animations: &[String],
        skins: &[String],
        time_step: f32,
        clip: bool,
    ) -> Bounds {
        let time_step = if time_step > 0.0 { time_step } else { DEFAULT_TIME_STEP };
        let previous_skins = skeleton.skins();
        let [scale_x, scale_y] = skeleton.scale();
        skeleton.set_scale(1.0, 1.0);
        if !skins.is_empty() {
            let known: Vec<String> = skins
                .iter()
                .filter(|name| {
                    let known = skeleton.has_skin(name);
                    if !known {
                        log::warn!("bounds: unknown skin '{name}' ignored");
                    }
                    known
                })
                .cloned()
                .collect();
            if let Err(err) = skeleton.set_skins(&known) {
                log::warn!("bounds: {err}");
            }
        }

        let bounds = self.sample_with_skins(skeleton, animations, time_step, clip);

        skeleton.set_to_setup_pose();
        skeleton.set_scale(scale_x, scale_y);
        if !skins.is_empty() {
            if let Err(err) = skeleton.set_skins(&previous_skins) {
                log::warn!("bounds: could not restore skins: {err}");
            }
        }
        skeleton.update_world_transform(Physics::Pose);
        bounds
    }

    fn sample_with_skins(
        &mut self,
        skeleton: &mut dyn SkeletonPose,
        animations: &[String],
        time_step: f32,
        clip: bool,
    ) -> Bounds {
        let infos: Vec<_> = animations
            .iter()
            .filter_map(|name| {
                let info = skeleton.find_animation(name);
                if info.is_none() {
                    log::warn!("bounds: unknown animation '{name}' ignored");
                }
                info
            })
            .collect();

        if infos.is_empty() {
            skeleton.set_to_setup_pose();
            skeleton.update_world_transform(Physics::Pose);
            return self.pose_bounds(skeleton, clip);
        }

        let mut extents = Extents::empty();
        for info in infos {
            let steps = (info.duration / time_step).max(1.0).ceil() as usize;
            for step in 0..steps {
                skeleton.set_to_setup_pose();
                skeleton.apply_animation(info.index, step as f32 * time_step);
                skeleton.update_world_transform(Physics::Pose);
                match self.measure(skeleton, clip) {
                    Measure::Nan => return Bounds::ZERO,
                    Measure::Empty => {}
                    Measure::Bounds(bounds) => extents.add_bounds(&bounds),
                }
            }
        }
        if extents.is_empty() {
            Bounds::ZERO
        } else {
            extents.to_bounds()
        }
    }
}

enum Measure {
    Empty,
    Nan,
    Bounds(Bounds),
}

/// Strategy computing the rectangle a widget fits and hit-tests against.
pub trait BoundsProvider {
    fn calculate_bounds(&self, skeleton: &mut dyn SkeletonPose, estimator: &mut BoundsEstimator) -> Bounds;
}

/// Bounds of the setup pose.
#[derive(Copy, Clone, Debug, Default)]
pub struct SetupPoseBounds {
    pub clip: bool,
}

impl BoundsProvider for SetupPoseBounds {
    fn calculate_bounds(&self, skeleton: &mut dyn SkeletonPose, estimator: &mut BoundsEstimator) -> Bounds {
        estimator.sample(skeleton, &[], &[], DEFAULT_TIME_STEP, self.clip)
    }
}

/// Union of the bounds of a set of animations under a skin selection.
#[derive(Clone, Debug)]
pub struct SkinsAndAnimationBounds {
    pub animations: Vec<String>,
    pub skins: Vec<String>,
    pub time_step: f32,
    pub clip: bool,
}

impl Default for SkinsAndAnimationBounds {
    fn default() -> Self {
        Self {
            animations: Vec::new(),
            skins: Vec::new(),
            time_step: DEFAULT_TIME_STEP,
            clip: false,
        }
    }
}

impl BoundsProvider for SkinsAndAnimationBounds {
    fn calculate_bounds(&self, skeleton: &mut dyn SkeletonPose, estimator: &mut BoundsEstimator) -> Bounds {
        estimator.sample(skeleton, &self.animations, &self.skins, self.time_step, self.clip)
    }
}

/// A fixed rectangle.
#[derive(Copy, Clone, Debug)]
pub struct RectangleBounds(pub Bounds);

impl BoundsProvider for RectangleBounds {
    fn calculate_bounds(&self, _skeleton: &mut dyn SkeletonPose, _estimator: &mut BoundsEstimator) -> Bounds {
        self.0
    }
}
