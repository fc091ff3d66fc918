use crate::{
    AnimationSequencer, AnimationState, AttachmentGeometryBuilder, Bounds, BoundsEstimator,
    BoundsProvider, DrawCall, Error, EventHub, FollowFlags, FrameContext,
    FrameScheduler, FrameWork, HostRect, HostRenderer, LoadState, Physics, PointerEventKind,
    PointerHitTester, PointerTarget, SkeletonPose, SlotFollower, SlotObjects, Subscription,
    Vertex, ViewportMapper, Widget, WidgetConfig, fit_layout,
};

/// Pointer event dispatched to widget listeners.
#[derive(Clone, Debug, PartialEq)]
pub struct WidgetPointerEvent {
    pub kind: PointerEventKind,
    pub target: PointerTarget,
    /// Pointer position relative to the skeleton origin, in world units.
    pub position: [f32; 2],
}

/// What a host needs to draw debug overlays for a widget.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DebugGeometry {
    pub bounds: Bounds,
    pub world_offset: [f32; 2],
    pub scale: [f32; 2],
}

/// Widget operations the overlay drives, on top of the [`Widget`] capability set.
pub trait OverlayWidget: Widget {
    fn identifier(&self) -> &str;

    fn is_disposed(&self) -> bool;

    fn is_on_screen(&self) -> bool;

    fn set_on_screen(&mut self, on_screen: bool);

    /// Fits the widget into `host`, given in canvas CSS pixels.
    fn layout(&mut self, mapper: &ViewportMapper, host: HostRect);

    /// Rescales DPR-derived skeleton scales after the effective DPR changed.
    fn rescale_for_dpr(&mut self, effective_dpr: f32);

    /// Handles a pointer event at `pointer_world`. Returns whether the host should suppress its
    /// default handling. Widgets that are neither interactive nor draggable ignore pointers.
    fn pointer(&mut self, kind: PointerEventKind, pointer_world: [f32; 2]) -> Result<bool, Error>;

    /// Moves a dragged widget by a world-space delta.
    fn drag_by(&mut self, dx: f32, dy: f32);
}

type BoxedFollower = Box<dyn SlotFollower>;

struct Runtime<S, A> {
    skeleton: S,
    animation: A,
}

/// A skeleton drawn into the shared overlay canvas.
pub struct SkeletonWidget<S, A> {
    identifier: String,
    config: WidgetConfig,
    runtime: Option<Runtime<S, A>>,
    scheduler: FrameScheduler<S, A>,
    builder: AttachmentGeometryBuilder,
    sequencer: AnimationSequencer,
    hit_tester: PointerHitTester,
    pointer_events: EventHub<WidgetPointerEvent>,
    slot_objects: SlotObjects<BoxedFollower>,
    bounds_provider: Box<dyn BoundsProvider>,
    estimator: BoundsEstimator,
    bounds: Bounds,
    world_offset: [f32; 2],
    /// Effective DPR folded into the skeleton scale for `none` and `origin`. Zero until laid out.
    dpr_scale: f32,
    scissor: Option<[u32; 4]>,
    started: bool,
    draw_indices: Vec<u32>,
}

impl<S, A> SkeletonWidget<S, A>
where
    S: SkeletonPose,
    A: AnimationState<Skeleton = S>,
{
    pub fn new(identifier: impl Into<String>, config: WidgetConfig) -> Result<Self, Error> {
        config.validate()?;
        let mut scheduler = FrameScheduler::new(config.offscreen);
        scheduler.begin_loading();
        Ok(Self {
            identifier: identifier.into(),
            bounds_provider: config.bounds_provider(),
            config,
            runtime: None,
            scheduler,
            builder: AttachmentGeometryBuilder::new(),
            sequencer: AnimationSequencer::default(),
            hit_tester: PointerHitTester::new(),
            pointer_events: EventHub::new(),
            slot_objects: SlotObjects::new(),
            estimator: BoundsEstimator::new(),
            bounds: Bounds::UNSET,
            world_offset: [0.0, 0.0],
            dpr_scale: 0.0,
            scissor: None,
            started: false,
            draw_indices: Vec::new(),
        })
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    pub fn state(&self) -> LoadState {
        self.scheduler.state()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn scheduler_mut(&mut self) -> &mut FrameScheduler<S, A> {
        &mut self.scheduler
    }

    pub fn skeleton(&self) -> Option<&S> {
        self.runtime.as_ref().map(|rt| &rt.skeleton)
    }

    pub fn skeleton_mut(&mut self) -> Option<&mut S> {
        self.runtime.as_mut().map(|rt| &mut rt.skeleton)
    }

    pub fn animation_state_mut(&mut self) -> Option<&mut A> {
        self.runtime.as_mut().map(|rt| &mut rt.animation)
    }

    pub fn geometry(&self) -> &AttachmentGeometryBuilder {
        &self.builder
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn world_offset(&self) -> [f32; 2] {
        self.world_offset
    }

    pub fn drag_offset(&self) -> [f32; 2] {
        self.hit_tester.drag_offset()
    }

    /// World position of the skeleton origin as drawn.
    pub fn render_offset(&self) -> [f32; 2] {
        let drag = self.hit_tester.drag_offset();
        [self.world_offset[0] + drag[0], self.world_offset[1] + drag[1]]
    }

    /// Hands over the loaded skeleton and animation state. The widget becomes ready and starts
    /// its animations unless started manually or on visibility.
    pub fn attach(&mut self, mut skeleton: S, mut animation: A) -> Result<(), Error> {
        self.ensure_not_disposed()?;

        if !self.config.skin.is_empty() {
            skeleton.set_skins(&self.config.skin)?;
        }
        skeleton.set_to_setup_pose();
        skeleton.update_world_transform(Physics::Update);
        animation.set_default_mix(self.config.default_mix);

        self.runtime = Some(Runtime {
            skeleton,
            animation,
        });
        self.recalculate_bounds();

        if !self.scheduler.mark_ready() {
            return Err(self.disposed());
        }
        let visible_enough = !self.config.start_when_visible || self.scheduler.is_on_screen();
        if !self.config.manual_start && visible_enough {
            self.start()?;
        }
        Ok(())
    }

    /// Queues the configured animation sequences.
    pub fn start(&mut self) -> Result<(), Error> {
        self.ensure_not_disposed()?;
        let Some(rt) = self.runtime.as_mut() else {
            return Err(Error::NotReady {
                identifier: self.identifier.clone(),
            });
        };
        self.sequencer = AnimationSequencer::new(self.config.animation_sequences());
        self.sequencer.start(&mut rt.animation)?;
        self.started = true;
        if self.config.auto_calculate_bounds {
            self.recalculate_bounds();
        }
        Ok(())
    }

    pub fn set_bounds_provider(&mut self, provider: Box<dyn BoundsProvider>) {
        self.bounds_provider = provider;
        self.recalculate_bounds();
    }

    /// Recomputes the bounds with the current provider. No-op until a skeleton is attached.
    pub fn recalculate_bounds(&mut self) {
        if let Some(rt) = self.runtime.as_mut() {
            self.bounds = self
                .bounds_provider
                .calculate_bounds(&mut rt.skeleton, &mut self.estimator);
            log::debug!("{}: bounds {:?}", self.identifier, self.bounds);
        }
    }

    /// World position of a bone, or `fallback` when the bone does not exist.
    pub fn bone_position(&self, name: &str, fallback: [f32; 2]) -> [f32; 2] {
        let bone = self.skeleton().and_then(|skeleton| {
            let index = skeleton.find_bone(name)?;
            skeleton.bone(index)
        });
        match bone {
            Some(bone) => [bone.world_x, bone.world_y],
            None => {
                log::warn!("{}: bone '{name}' not found", self.identifier);
                fallback
            }
        }
    }

    pub fn set_bone_position(&mut self, name: &str, x: f32, y: f32) -> Result<(), Error> {
        self.ensure_not_disposed()?;
        let skeleton = self.skeleton_mut().ok_or_else(|| Error::UnknownBone {
            name: name.to_string(),
        })?;
        let bone = skeleton.find_bone(name).ok_or_else(|| Error::UnknownBone {
            name: name.to_string(),
        })?;
        skeleton.set_bone_world_position(bone, x, y);
        Ok(())
    }

    /// Binds a host object to a slot. Rebinding `id` moves the object to the new slot.
    pub fn bind_slot_object(
        &mut self,
        id: &str,
        slot_name: &str,
        object: BoxedFollower,
        flags: FollowFlags,
    ) -> Result<(), Error> {
        self.ensure_not_disposed()?;
        let slot = self.find_slot(slot_name)?;
        let previous_slot = self.slot_objects.slot_of(id);
        self.slot_objects.bind(id, slot, object, flags);
        if let Some(previous) = previous_slot {
            self.builder
                .set_slot_hidden(previous, self.slot_objects.is_slot_hidden(previous));
        }
        self.builder
            .set_slot_hidden(slot, self.slot_objects.is_slot_hidden(slot));
        Ok(())
    }

    pub fn unbind_slot_object(&mut self, id: &str) -> Option<BoxedFollower> {
        let slot = self.slot_objects.slot_of(id)?;
        let object = self.slot_objects.unbind(id);
        self.builder
            .set_slot_hidden(slot, self.slot_objects.is_slot_hidden(slot));
        object
    }

    pub fn slot_objects(&self) -> &SlotObjects<BoxedFollower> {
        &self.slot_objects
    }

    /// Reports pointer transitions on slot `slot_name` to listeners.
    pub fn watch_slot(&mut self, slot_name: &str) -> Result<(), Error> {
        let slot = self.find_slot(slot_name)?;
        self.hit_tester.watch_slot(slot);
        Ok(())
    }

    pub fn unwatch_slot(&mut self, slot_name: &str) -> Result<(), Error> {
        let slot = self.find_slot(slot_name)?;
        self.hit_tester.unwatch_slot(slot);
        Ok(())
    }

    #[must_use = "dropping the subscription unsubscribes the listener"]
    pub fn on_pointer(&self, listener: impl FnMut(&WidgetPointerEvent) + 'static) -> Subscription {
        self.pointer_events.subscribe(listener)
    }

    /// Off screen widgets stay interactable once dragged.
    pub fn is_interactable(&self) -> bool {
        self.scheduler.is_on_screen() || self.hit_tester.has_moved()
    }

    pub fn debug_geometry(&self) -> Option<DebugGeometry> {
        if !self.config.debug {
            return None;
        }
        let scale = self.skeleton().map_or([1.0, 1.0], |s| s.scale());
        Some(DebugGeometry {
            bounds: self.bounds,
            world_offset: self.render_offset(),
            scale,
        })
    }

    fn find_slot(&self, slot_name: &str) -> Result<usize, Error> {
        self.skeleton()
            .and_then(|skeleton| skeleton.find_slot(slot_name))
            .ok_or_else(|| Error::UnknownSlot {
                name: slot_name.to_string(),
            })
    }

    fn ensure_not_disposed(&self) -> Result<(), Error> {
        if self.scheduler.is_disposed() {
            return Err(self.disposed());
        }
        Ok(())
    }

    fn disposed(&self) -> Error {
        Error::Disposed {
            identifier: self.identifier.clone(),
        }
    }

    fn rebuild_geometry(&mut self) {
        let offset = self.render_offset();
        let Some(rt) = self.runtime.as_ref() else {
            return;
        };
        let skeleton = &rt.skeleton;
        let slot_objects = &mut self.slot_objects;
        slot_objects.begin_pass();
        self.builder.build(skeleton, |slot, region| {
            slot_objects.visit(skeleton, slot, region, offset);
        });
        slot_objects.finish_pass();
    }
}

impl<S, A> Widget for SkeletonWidget<S, A>
where
    S: SkeletonPose,
    A: AnimationState<Skeleton = S>,
{
    fn update(&mut self, frame: FrameContext) -> Result<(), Error> {
        self.ensure_not_disposed()?;
        let Some(rt) = self.runtime.as_mut() else {
            return Ok(());
        };

        let work = self
            .scheduler
            .advance(frame.frame, &mut rt.skeleton, &mut rt.animation, frame.delta);
        if work == FrameWork::Skipped {
            return Ok(());
        }
        self.sequencer.update(&mut rt.animation, frame.delta);
        if work == FrameWork::Full {
            self.rebuild_geometry();
        }
        Ok(())
    }

    fn render(&mut self, renderer: &mut dyn HostRenderer) -> Result<(), Error> {
        self.ensure_not_disposed()?;
        if self.runtime.is_none() || !self.scheduler.is_on_screen() {
            return Ok(());
        }
        let draw_list = self.builder.draw_list();
        if draw_list.is_empty() {
            return Ok(());
        }

        let dirty = self.builder.is_dirty();
        let [dx, dy] = self.render_offset();
        let mut translate = |vertex: &mut Vertex| {
            vertex.position[0] += dx;
            vertex.position[1] += dy;
        };

        renderer.set_scissor(self.scissor);
        for draw in &draw_list.draws {
            let indices = &draw_list.indices[draw.first_index..draw.first_index + draw.index_count];
            let (Some(&first), Some(&last)) = (indices.iter().min(), indices.iter().max()) else {
                continue;
            };
            self.draw_indices.clear();
            self.draw_indices.extend(indices.iter().map(|i| i - first));
            let call = DrawCall {
                vertices: &draw_list.vertices[first as usize..=last as usize],
                indices: &self.draw_indices,
                texture: &draw.texture,
                blend: draw.blend,
                premultiplied_alpha: draw.premultiplied_alpha,
                dirty,
            };
            renderer.draw(&call, &mut translate);
        }
        renderer.set_scissor(None);
        self.builder.mark_clean();
        Ok(())
    }

    fn destroy(&mut self) {
        if self.scheduler.is_disposed() {
            return;
        }
        self.scheduler.dispose();
        self.builder.clear();
        self.slot_objects.clear();
        self.pointer_events.clear();
        self.runtime = None;
        log::debug!("{}: disposed", self.identifier);
    }
}

impl<S, A> OverlayWidget for SkeletonWidget<S, A>
where
    S: SkeletonPose,
    A: AnimationState<Skeleton = S>,
{
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn is_disposed(&self) -> bool {
        self.scheduler.is_disposed()
    }

    fn is_on_screen(&self) -> bool {
        self.scheduler.is_on_screen()
    }

    fn set_on_screen(&mut self, on_screen: bool) {
        if self.scheduler.is_disposed() {
            return;
        }
        self.scheduler.set_on_screen(on_screen);
        if !on_screen {
            self.hit_tester.reset();
            return;
        }
        if self.config.start_when_visible && !self.config.manual_start && !self.started && self.scheduler.is_ready() {
            if let Err(err) = self.start() {
                log::error!("{}: start on visibility failed: {err}", self.identifier);
            }
        }
    }

    fn layout(&mut self, mapper: &ViewportMapper, host: HostRect) {
        let Some(rt) = self.runtime.as_mut() else {
            return;
        };
        let host = HostRect {
            width: if self.config.width >= 0.0 { self.config.width } else { host.width },
            height: if self.config.height >= 0.0 { self.config.height } else { host.height },
            ..host
        };

        let params = self.config.fit_params();
        if params.mode.is_dpr_scaled() && self.dpr_scale == 0.0 {
            let scale = self.config.scale * mapper.effective_dpr();
            rt.skeleton.set_scale(scale, scale);
            self.dpr_scale = mapper.effective_dpr();
        }

        let layout = fit_layout(mapper, &host, &self.bounds, &params, rt.skeleton.scale());
        if let Some([scale_x, scale_y]) = layout.scale {
            rt.skeleton.set_scale(scale_x, scale_y);
        }
        self.world_offset = layout.world_offset;

        self.scissor = self.config.clip.then(|| {
            let dpr = mapper.effective_dpr();
            [
                (host.left * dpr).max(0.0).round() as u32,
                (host.top * dpr).max(0.0).round() as u32,
                (host.width * dpr).max(0.0).round() as u32,
                (host.height * dpr).max(0.0).round() as u32,
            ]
        });
    }

    fn rescale_for_dpr(&mut self, effective_dpr: f32) {
        if !self.config.fit.is_dpr_scaled() || self.dpr_scale == 0.0 {
            return;
        }
        let Some(rt) = self.runtime.as_mut() else {
            return;
        };
        let [scale_x, scale_y] = rt.skeleton.scale();
        let factor = effective_dpr / self.dpr_scale;
        rt.skeleton.set_scale(scale_x * factor, scale_y * factor);
        self.dpr_scale = effective_dpr;
    }

    fn pointer(&mut self, kind: PointerEventKind, pointer_world: [f32; 2]) -> Result<bool, Error> {
        if self.scheduler.is_disposed() || !(self.config.interactive || self.config.drag) {
            return Ok(false);
        }
        let offset = self.render_offset();
        let interactable = self.is_interactable();
        let Some(rt) = self.runtime.as_ref() else {
            return Ok(false);
        };

        self.hit_tester.update_pointer(pointer_world, offset);
        let transitions =
            self.hit_tester
                .pointer_event(kind, &rt.skeleton, &self.bounds, interactable)?;
        let position = self.hit_tester.pointer();
        if self.config.interactive {
            for transition in transitions {
                self.pointer_events.emit(&WidgetPointerEvent {
                    kind: transition.kind,
                    target: transition.target,
                    position,
                });
            }
        }

        match kind {
            PointerEventKind::Down if interactable => Ok(self
                .hit_tester
                .begin_drag(self.config.drag, self.hit_tester.is_inside_bounds_flag())),
            PointerEventKind::Up => {
                let was_dragging = self.hit_tester.is_dragging();
                self.hit_tester.end_drag();
                Ok(was_dragging)
            }
            PointerEventKind::Drag => Ok(self.hit_tester.is_dragging()),
            _ => Ok(false),
        }
    }

    fn drag_by(&mut self, dx: f32, dy: f32) {
        if let Some([dx, dy]) = self.hit_tester.drag_by(dx, dy) {
            if let Some(rt) = self.runtime.as_mut() {
                rt.skeleton.physics_translate(dx, dy);
            }
        }
    }
}
