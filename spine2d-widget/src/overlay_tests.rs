use crate::test_rig::{TestAnimationState, TestSkeleton, assert_approx};
use crate::pose::SkeletonPose;
use crate::{
    Error, FrameContext, FrameInput, HostRect, HostRenderer, Overlay, OverlayConfig,
    OverlayWidget, PointerEventKind, RecordingRenderer, SkeletonWidget, ViewportMapper, Widget,
    WidgetConfig,
};

#[derive(Default)]
struct Stub {
    identifier: String,
    fail_update: bool,
    prevent_default: bool,
    disposed: bool,
    on_screen: bool,
    updates: Vec<u64>,
    renders: usize,
    layouts: Vec<HostRect>,
    rescales: Vec<f32>,
    pointers: Vec<(PointerEventKind, [f32; 2])>,
    drags: Vec<[f32; 2]>,
}

impl Stub {
    fn new(identifier: &str) -> Self {
        Self {
            identifier: identifier.to_string(),
            on_screen: true,
            ..Self::default()
        }
    }
}

impl Widget for Stub {
    fn update(&mut self, frame: FrameContext) -> Result<(), Error> {
        self.updates.push(frame.frame);
        if self.fail_update {
            return Err(Error::InvalidValue {
                message: "broken".to_string(),
            });
        }
        Ok(())
    }

    fn render(&mut self, _renderer: &mut dyn HostRenderer) -> Result<(), Error> {
        self.renders += 1;
        Ok(())
    }

    fn destroy(&mut self) {
        self.disposed = true;
    }
}

impl OverlayWidget for Stub {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn is_on_screen(&self) -> bool {
        self.on_screen
    }

    fn set_on_screen(&mut self, on_screen: bool) {
        self.on_screen = on_screen;
    }

    fn layout(&mut self, _mapper: &ViewportMapper, host: HostRect) {
        self.layouts.push(host);
    }

    fn rescale_for_dpr(&mut self, effective_dpr: f32) {
        self.rescales.push(effective_dpr);
    }

    fn pointer(&mut self, kind: PointerEventKind, pointer_world: [f32; 2]) -> Result<bool, Error> {
        self.pointers.push((kind, pointer_world));
        Ok(self.prevent_default)
    }

    fn drag_by(&mut self, dx: f32, dy: f32) {
        self.drags.push([dx, dy]);
    }
}

fn input(dpr: f32) -> FrameInput {
    FrameInput {
        delta: 1.0 / 60.0,
        device_pixel_ratio: dpr,
        viewport_size: [800.0, 600.0],
        scroll: [0.0, 0.0],
    }
}

#[test]
fn registration_is_unique_and_removal_destroys() {
    let mut overlay = Overlay::new(OverlayConfig::default());
    overlay.add(Stub::new("a")).unwrap();
    assert!(matches!(
        overlay.add(Stub::new("a")),
        Err(Error::DuplicateIdentifier { .. })
    ));
    overlay.add(Stub::new("b")).unwrap();
    assert_eq!(overlay.len(), 2);

    let removed = overlay.remove("a").unwrap();
    assert!(removed.disposed);
    assert!(overlay.get("a").is_none());
    assert!(overlay.remove("a").is_none());
    assert!(matches!(
        overlay.set_host_rect("a", HostRect::default()),
        Err(Error::InvalidValue { .. })
    ));
    assert!(overlay.set_on_screen("b", false).is_ok());
    assert!(!overlay.get("b").unwrap().on_screen);
}

#[test]
fn tick_sizes_canvas_and_reports_translation() {
    let mut overlay: Overlay<Stub> = Overlay::new(OverlayConfig::default());
    let mut renderer = RecordingRenderer::default();

    let output = overlay.tick(input(1.0), &mut renderer);
    assert!(output.rescaled);
    let [top, _, _, _] = overlay.mapper().overflow_sizes();
    assert_approx(output.translation[0], 0.0);
    assert_approx(output.translation[1], -top);
    assert_eq!(output.canvas_size, overlay.mapper().canvas_size());
    assert_eq!(output.canvas_css_size, overlay.mapper().canvas_css_size());
    assert_eq!(renderer.canvas_size, output.canvas_size);
    assert_eq!(renderer.frames, 1);

    let output = overlay.tick(input(1.0), &mut renderer);
    assert!(!output.rescaled);
    assert_eq!(overlay.frame(), 2);
}

#[test]
fn widgets_are_laid_out_in_canvas_space_before_update() {
    let mut overlay = Overlay::new(OverlayConfig::default());
    overlay.add(Stub::new("a")).unwrap();
    overlay.add(Stub::new("unplaced")).unwrap();
    let mut renderer = RecordingRenderer::default();
    overlay.tick(input(1.0), &mut renderer);

    overlay.set_host_rect("a", HostRect::new(10.0, 20.0, 100.0, 50.0)).unwrap();
    overlay.tick(input(1.0), &mut renderer);

    let [top, _, left, _] = overlay.mapper().overflow_sizes();
    let stub = overlay.get("a").unwrap();
    assert_eq!(stub.layouts, vec![HostRect::new(10.0 + left, 20.0 + top, 100.0, 50.0)]);
    assert_eq!(stub.updates, vec![1, 2]);
    assert!(overlay.get("unplaced").unwrap().layouts.is_empty());
    assert_eq!(overlay.client_to_canvas(10.0, 20.0), [10.0 + left, 20.0 + top]);
}

#[test]
fn failing_widget_does_not_stop_the_others() {
    let mut overlay = Overlay::new(OverlayConfig::default());
    let mut broken = Stub::new("broken");
    broken.fail_update = true;
    overlay.add(broken).unwrap();
    overlay.add(Stub::new("fine")).unwrap();
    let mut gone = Stub::new("gone");
    gone.disposed = true;
    overlay.add(gone).unwrap();

    let mut renderer = RecordingRenderer::default();
    overlay.tick(input(1.0), &mut renderer);

    assert_eq!(overlay.get("broken").unwrap().renders, 1);
    assert_eq!(overlay.get("fine").unwrap().updates, vec![1]);
    assert_eq!(overlay.get("fine").unwrap().renders, 1);
    assert!(overlay.get("gone").unwrap().updates.is_empty());
    assert_eq!(overlay.get("gone").unwrap().renders, 0);
}

#[test]
fn dpr_change_rescales_widgets() {
    let mut overlay = Overlay::new(OverlayConfig::default());
    overlay.add(Stub::new("a")).unwrap();
    let mut renderer = RecordingRenderer::default();
    overlay.tick(input(1.0), &mut renderer);
    overlay.tick(input(1.0), &mut renderer);
    overlay.tick(input(2.0), &mut renderer);

    assert_eq!(overlay.get("a").unwrap().rescales, vec![1.0, 2.0]);
}

#[test]
fn pointer_drag_converts_screen_delta_to_world() {
    let mut overlay = Overlay::new(OverlayConfig::default());
    let mut stub = Stub::new("a");
    stub.prevent_default = true;
    overlay.add(stub).unwrap();
    overlay.add(Stub::new("b")).unwrap();
    let mut renderer = RecordingRenderer::default();
    overlay.tick(input(2.0), &mut renderer);

    assert!(overlay.pointer_event(PointerEventKind::Down, 100.0, 100.0));
    overlay.pointer_event(PointerEventKind::Drag, 110.0, 95.0);
    let drags = overlay.get("b").unwrap().drags.clone();
    assert_eq!(drags.len(), 1);
    assert_approx(drags[0][0], 20.0);
    assert_approx(drags[0][1], 10.0);

    let [canvas_x, canvas_y] = overlay.client_to_canvas(110.0, 95.0);
    let world = overlay.mapper().screen_to_world(canvas_x, canvas_y);
    let (kind, position) = *overlay.get("b").unwrap().pointers.last().unwrap();
    assert_eq!(kind, PointerEventKind::Drag);
    assert_eq!(position, world);

    overlay.pointer_event(PointerEventKind::Up, 110.0, 95.0);
    overlay.pointer_event(PointerEventKind::Drag, 150.0, 150.0);
    assert_eq!(overlay.get("b").unwrap().drags.len(), 1);
}

#[test]
fn dispose_destroys_everything() {
    let mut overlay = Overlay::new(OverlayConfig::default());
    overlay.add(Stub::new("a")).unwrap();
    overlay.dispose();
    assert!(overlay.is_empty());
    assert_eq!(overlay.widgets().count(), 0);
}

#[test]
fn skeleton_widgets_render_through_the_overlay() {
    let config = WidgetConfig::from_attributes([("atlas", "a.atlas"), ("skeleton", "a.json")]).unwrap();
    let mut widget = SkeletonWidget::<TestSkeleton, TestAnimationState>::new("hero", config).unwrap();
    let skeleton = TestSkeleton::standard();
    let animation = TestAnimationState::new(&skeleton);
    widget.attach(skeleton, animation).unwrap();

    let mut overlay = Overlay::new(OverlayConfig::default());
    overlay.add(widget).unwrap();
    overlay.set_host_rect("hero", HostRect::new(0.0, 0.0, 200.0, 200.0)).unwrap();

    let mut renderer = RecordingRenderer::default();
    overlay.tick(input(1.0), &mut renderer);
    assert_eq!(renderer.calls.len(), 1);
    assert_eq!(renderer.calls[0].texture, "page.png");
    assert_eq!(overlay.get("hero").unwrap().skeleton().unwrap().scale(), [4.0, 4.0]);

    // The drawn quad is centered in the host element.
    let [top, _, left, _] = overlay.mapper().overflow_sizes();
    let center = overlay.mapper().screen_to_world(100.0 + left, 100.0 + top);
    let xs: Vec<f32> = renderer.calls[0].vertices.iter().map(|v| v.position[0]).collect();
    let ys: Vec<f32> = renderer.calls[0].vertices.iter().map(|v| v.position[1]).collect();
    let mid_x = (xs.iter().cloned().fold(f32::MAX, f32::min) + xs.iter().cloned().fold(f32::MIN, f32::max)) / 2.0;
    let mid_y = (ys.iter().cloned().fold(f32::MAX, f32::min) + ys.iter().cloned().fold(f32::MIN, f32::max)) / 2.0;
    assert!((mid_x - center[0]).abs() < 1e-2);
    assert!((mid_y - center[1]).abs() < 1e-2);
}
