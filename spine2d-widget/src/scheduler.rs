//! Once-per-frame orchestration of a single skeleton instance.

use crate::{AnimationState, Error, Physics, SkeletonPose};
use std::str::FromStr;

/// Lifecycle of a drawable instance.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum LoadState {
    #[default]
    Uninitialized,
    /// Waiting for assets or for the host surface. Contributes no geometry.
    Loading,
    Ready,
    /// Inside a frame pass.
    Updating,
    Disposed,
}

/// What an off-screen instance does on each frame.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum OffScreenPolicy {
    /// Nothing advances.
    #[default]
    Pause,
    /// Animation state and skeleton clock advance; the pose is not applied.
    Update,
    /// Same as on screen.
    Pose,
}

impl FromStr for OffScreenPolicy {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "pause" => Ok(Self::Pause),
            "update" => Ok(Self::Update),
            "pose" => Ok(Self::Pose),
            other => Err(Error::InvalidValue {
                message: format!("unknown off-screen policy '{other}'"),
            }),
        }
    }
}

/// How much of the frame pass ran.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FrameWork {
    Skipped,
    /// Clocks advanced, pose untouched.
    StateOnly,
    /// Pose applied and world transforms recomputed: geometry must be rebuilt.
    Full,
}

pub type TransformHook<S> = Box<dyn FnMut(&mut S, f32)>;

/// Replaces apply / pre-hook / world transform / post-hook for one instance.
pub type UpdateOverride<S, A> = Box<dyn FnMut(&mut S, &mut A, f32)>;

pub struct FrameScheduler<S, A> {
    state: LoadState,
    policy: OffScreenPolicy,
    on_screen: bool,
    last_frame: Option<u64>,
    physics: Physics,
    before_world_transforms: Option<TransformHook<S>>,
    after_world_transforms: Option<TransformHook<S>>,
    update_override: Option<UpdateOverride<S, A>>,
}

impl<S, A> Default for FrameScheduler<S, A> {
    fn default() -> Self {
        Self {
            state: LoadState::Uninitialized,
            policy: OffScreenPolicy::Pause,
            on_screen: true,
            last_frame: None,
            physics: Physics::Update,
            before_world_transforms: None,
            after_world_transforms: None,
            update_override: None,
        }
    }
}

impl<S, A> FrameScheduler<S, A>
where
    S: SkeletonPose,
    A: AnimationState<Skeleton = S>,
{
    pub fn new(policy: OffScreenPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == LoadState::Ready
    }

    pub fn is_disposed(&self) -> bool {
        self.state == LoadState::Disposed
    }

    /// Returns false once disposed.
    pub fn begin_loading(&mut self) -> bool {
        match self.state {
            LoadState::Disposed => false,
            LoadState::Uninitialized => {
                self.state = LoadState::Loading;
                true
            }
            _ => true,
        }
    }

    /// Returns false once disposed.
    pub fn mark_ready(&mut self) -> bool {
        if self.state == LoadState::Disposed {
            return false;
        }
        self.state = LoadState::Ready;
        true
    }

    pub fn dispose(&mut self) {
        self.state = LoadState::Disposed;
        self.before_world_transforms = None;
        self.after_world_transforms = None;
        self.update_override = None;
    }

    pub fn policy(&self) -> OffScreenPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: OffScreenPolicy) {
        self.policy = policy;
    }

    pub fn is_on_screen(&self) -> bool {
        self.on_screen
    }

    pub fn set_on_screen(&mut self, on_screen: bool) {
        self.on_screen = on_screen;
    }

    pub fn set_physics(&mut self, physics: Physics) {
        self.physics = physics;
    }

    pub fn set_before_world_transforms(&mut self, hook: Option<TransformHook<S>>) {
        self.before_world_transforms = hook;
    }

    pub fn set_after_world_transforms(&mut self, hook: Option<TransformHook<S>>) {
        self.after_world_transforms = hook;
    }

    pub fn set_update_override(&mut self, update: Option<UpdateOverride<S, A>>) {
        self.update_override = update;
    }

    /// Runs the frame pass for host frame `frame`. A second call with the same frame number
    /// is a no-op.
    pub fn advance(&mut self, frame: u64, skeleton: &mut S, animation: &mut A, delta: f32) -> FrameWork {
        if self.state != LoadState::Ready || self.last_frame == Some(frame) {
            return FrameWork::Skipped;
        }
        if !self.on_screen && self.policy == OffScreenPolicy::Pause {
            return FrameWork::Skipped;
        }
        self.last_frame = Some(frame);
        self.state = LoadState::Updating;

        let delta = if delta.is_finite() { delta.max(0.0) } else { 0.0 };
        animation.update(delta);
        skeleton.update(delta);

        if !self.on_screen && self.policy == OffScreenPolicy::Update {
            self.state = LoadState::Ready;
            return FrameWork::StateOnly;
        }

        match self.update_override.as_mut() {
            Some(update) => update(skeleton, animation, delta),
            None => {
                animation.apply(skeleton);
                if let Some(hook) = self.before_world_transforms.as_mut() {
                    hook(skeleton, delta);
                }
                skeleton.update_world_transform(self.physics);
                if let Some(hook) = self.after_world_transforms.as_mut() {
                    hook(skeleton, delta);
                }
            }
        }

        self.state = LoadState::Ready;
        FrameWork::Full
    }
}
