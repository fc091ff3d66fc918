use crate::test_rig::{TestAnimationState, TestSkeleton, assert_approx};
use crate::{AnimationState, FrameScheduler, FrameWork, LoadState, OffScreenPolicy, SkeletonPose};
use std::cell::RefCell;
use std::rc::Rc;

type Scheduler = FrameScheduler<TestSkeleton, TestAnimationState>;

fn ready(policy: OffScreenPolicy) -> (Scheduler, TestSkeleton, TestAnimationState) {
    let skeleton = TestSkeleton::standard();
    let animation = TestAnimationState::new(&skeleton);
    let mut scheduler = Scheduler::new(policy);
    assert!(scheduler.begin_loading());
    assert!(scheduler.mark_ready());
    (scheduler, skeleton, animation)
}

#[test]
fn lifecycle_transitions() {
    let mut scheduler = Scheduler::new(OffScreenPolicy::Pause);
    assert_eq!(scheduler.state(), LoadState::Uninitialized);
    assert!(scheduler.begin_loading());
    assert_eq!(scheduler.state(), LoadState::Loading);
    assert!(scheduler.mark_ready());
    assert!(scheduler.is_ready());

    scheduler.dispose();
    assert!(scheduler.is_disposed());
    assert!(!scheduler.begin_loading());
    assert!(!scheduler.mark_ready());
}

#[test]
fn loading_instances_do_not_advance() {
    let mut skeleton = TestSkeleton::standard();
    let mut animation = TestAnimationState::new(&skeleton);
    let mut scheduler = Scheduler::new(OffScreenPolicy::Pose);
    scheduler.begin_loading();
    assert_eq!(scheduler.advance(1, &mut skeleton, &mut animation, 0.1), FrameWork::Skipped);
    assert_eq!(skeleton.time(), 0.0);
}

#[test]
fn advances_once_per_frame() {
    let (mut scheduler, mut skeleton, mut animation) = ready(OffScreenPolicy::Pause);
    let updates = skeleton.world_updates;

    assert_eq!(scheduler.advance(7, &mut skeleton, &mut animation, 0.1), FrameWork::Full);
    assert_eq!(scheduler.advance(7, &mut skeleton, &mut animation, 0.1), FrameWork::Skipped);
    assert_approx(skeleton.time(), 0.1);
    assert_eq!(skeleton.world_updates, updates + 1);

    assert_eq!(scheduler.advance(8, &mut skeleton, &mut animation, 0.1), FrameWork::Full);
    assert_approx(skeleton.time(), 0.2);
    assert_approx(animation.time(), 0.2);
    assert_eq!(scheduler.state(), LoadState::Ready);
}

#[test]
fn applies_animation_before_world_transform() {
    let (mut scheduler, mut skeleton, mut animation) = ready(OffScreenPolicy::Pause);
    animation.set_animation(0, "walk", false).unwrap();

    scheduler.advance(1, &mut skeleton, &mut animation, 0.5);
    assert_approx(skeleton.world(1).world_x, 50.0);
}

#[test]
fn off_screen_pause_freezes_everything() {
    let (mut scheduler, mut skeleton, mut animation) = ready(OffScreenPolicy::Pause);
    scheduler.set_on_screen(false);
    let updates = skeleton.world_updates;

    assert_eq!(scheduler.advance(1, &mut skeleton, &mut animation, 0.1), FrameWork::Skipped);
    assert_eq!(skeleton.time(), 0.0);
    assert_eq!(animation.time(), 0.0);
    assert_eq!(skeleton.world_updates, updates);
}

#[test]
fn off_screen_update_advances_clocks_only() {
    let (mut scheduler, mut skeleton, mut animation) = ready(OffScreenPolicy::Update);
    animation.set_animation(0, "walk", false).unwrap();
    scheduler.set_on_screen(false);
    let updates = skeleton.world_updates;

    assert_eq!(scheduler.advance(1, &mut skeleton, &mut animation, 0.25), FrameWork::StateOnly);
    assert_approx(skeleton.time(), 0.25);
    assert_approx(animation.time(), 0.25);
    assert_eq!(skeleton.world_updates, updates);
    assert_eq!(skeleton.bones[1].x, 0.0);
}

#[test]
fn off_screen_pose_behaves_like_on_screen() {
    let (mut scheduler, mut skeleton, mut animation) = ready(OffScreenPolicy::Pose);
    scheduler.set_on_screen(false);
    assert_eq!(scheduler.advance(1, &mut skeleton, &mut animation, 0.1), FrameWork::Full);
}

#[test]
fn invalid_deltas_are_treated_as_zero() {
    let (mut scheduler, mut skeleton, mut animation) = ready(OffScreenPolicy::Pause);
    scheduler.advance(1, &mut skeleton, &mut animation, -1.0);
    scheduler.advance(2, &mut skeleton, &mut animation, f32::NAN);
    scheduler.advance(3, &mut skeleton, &mut animation, f32::INFINITY);
    assert_eq!(skeleton.time(), 0.0);
}

#[test]
fn hooks_wrap_world_transform() {
    let (mut scheduler, mut skeleton, mut animation) = ready(OffScreenPolicy::Pause);
    let seen = Rc::new(RefCell::new(Vec::new()));

    let before = Rc::clone(&seen);
    scheduler.set_before_world_transforms(Some(Box::new(move |skeleton: &mut TestSkeleton, _| {
        before.borrow_mut().push(("before", skeleton.world_updates));
    })));
    let after = Rc::clone(&seen);
    scheduler.set_after_world_transforms(Some(Box::new(move |skeleton: &mut TestSkeleton, _| {
        after.borrow_mut().push(("after", skeleton.world_updates));
    })));

    let updates = skeleton.world_updates;
    scheduler.advance(1, &mut skeleton, &mut animation, 0.1);
    assert_eq!(*seen.borrow(), vec![("before", updates), ("after", updates + 1)]);
}

#[test]
fn update_override_replaces_default_pass() {
    let (mut scheduler, mut skeleton, mut animation) = ready(OffScreenPolicy::Pause);
    animation.set_animation(0, "walk", false).unwrap();
    let calls = Rc::new(RefCell::new(Vec::new()));
    let seen = Rc::clone(&calls);
    scheduler.set_update_override(Some(Box::new(move |_, _, delta| {
        seen.borrow_mut().push(delta);
    })));

    let updates = skeleton.world_updates;
    assert_eq!(scheduler.advance(1, &mut skeleton, &mut animation, 0.1), FrameWork::Full);
    assert_eq!(*calls.borrow(), vec![0.1]);
    assert_eq!(skeleton.world_updates, updates);
    assert_eq!(skeleton.bones[1].x, 0.0);
    // Clocks still advance ahead of the override.
    assert_approx(skeleton.time(), 0.1);
}

#[test]
fn disposed_instances_never_advance() {
    let (mut scheduler, mut skeleton, mut animation) = ready(OffScreenPolicy::Pose);
    scheduler.dispose();
    assert_eq!(scheduler.advance(1, &mut skeleton, &mut animation, 0.1), FrameWork::Skipped);
}

#[test]
fn policy_parses_attribute_values() {
    assert_eq!("pause".parse::<OffScreenPolicy>().unwrap(), OffScreenPolicy::Pause);
    assert_eq!("update".parse::<OffScreenPolicy>().unwrap(), OffScreenPolicy::Update);
    assert_eq!("pose".parse::<OffScreenPolicy>().unwrap(), OffScreenPolicy::Pose);
    assert!("sleep".parse::<OffScreenPolicy>().is_err());
}
