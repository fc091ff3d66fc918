use crate::spine_js::{JsAnimationState, JsSkeleton, describe};
use crate::{POINTER_EVENTS, PointerTracker};
use js_sys::{Array, Function, Object, Reflect};
use spine2d_widget::{
    ATTRIBUTES, Error, FrameInput, FrameOutput, HostRect, Overlay, OverlayConfig, PointerTarget,
    SkeletonWidget, Subscription, WidgetConfig, WidgetPointerEvent,
};
use spine2d_widget_wgpu::{
    HashMapTextureProvider, StagedFrame, WidgetRenderer, create_texture_bind_group,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, future_to_promise};

type JsWidget = SkeletonWidget<JsSkeleton, JsAnimationState>;

/// Host element attribute carrying the widget identifier, read back by the intersection observer.
const IDENTIFIER_ATTRIBUTE: &str = "data-spine-widget";

fn js_error(err: Error) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn window() -> Result<web_sys::Window, JsValue> {
    web_sys::window().ok_or_else(|| JsValue::from_str("missing window"))
}

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);
}

struct Gpu {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    renderer: WidgetRenderer,
    sampler: wgpu::Sampler,
}

impl Gpu {
    async fn new(canvas: &web_sys::HtmlCanvasElement) -> Result<Self, JsValue> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let surface = instance
            .create_surface(wgpu::SurfaceTarget::Canvas(canvas.clone()))
            .map_err(|e| JsValue::from_str(&format!("create_surface: {e:?}")))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| JsValue::from_str(&format!("request_adapter: {e:?}")))?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor::default())
            .await
            .map_err(|e| JsValue::from_str(&format!("request_device: {e:?}")))?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .first()
            .copied()
            .ok_or_else(|| JsValue::from_str("surface has no formats"))?;
        // The overlay is composited over the page.
        let alpha_mode = if caps
            .alpha_modes
            .contains(&wgpu::CompositeAlphaMode::PreMultiplied)
        {
            wgpu::CompositeAlphaMode::PreMultiplied
        } else {
            caps.alpha_modes[0]
        };

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: canvas.width().max(1),
            height: canvas.height().max(1),
            desired_maximum_frame_latency: 2,
            present_mode: caps.present_modes[0],
            alpha_mode,
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        let renderer = WidgetRenderer::new(&device, config.format);
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("spine2d-widget page sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Ok(Self {
            surface,
            device,
            queue,
            config,
            renderer,
            sampler,
        })
    }

    fn resize(&mut self, [width, height]: [u32; 2]) {
        if width == 0 || height == 0 {
            return;
        }
        if self.config.width != width || self.config.height != height {
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    fn draw(
        &mut self,
        staged: &StagedFrame,
        textures: &HashMapTextureProvider,
    ) -> Result<(), JsValue> {
        self.renderer.upload(&self.device, &self.queue, staged);

        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost) => {
                self.surface.configure(&self.device, &self.config);
                return Ok(());
            }
            Err(e) => return Err(JsValue::from_str(&format!("get_current_texture: {e:?}"))),
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("spine2d-widget encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("spine2d-widget overlay pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.renderer.render(&mut pass, staged, textures);
        }

        self.queue.submit([encoder.finish()]);
        frame.present();
        Ok(())
    }

    fn upload_texture(&self, width: u32, height: u32, pixels: &[u8]) -> wgpu::BindGroup {
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("spine2d-widget page texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.queue.write_texture(
            texture.as_image_copy(),
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            size,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        create_texture_bind_group(
            &self.device,
            self.renderer.texture_bind_group_layout(),
            &view,
            &self.sampler,
        )
    }
}

/// Pointer callbacks queued during dispatch and invoked once the overlay is no longer borrowed.
type PendingCallbacks = Rc<RefCell<Vec<(Function, JsValue)>>>;

struct OverlayState {
    overlay: Overlay<JsWidget>,
    canvas: web_sys::HtmlCanvasElement,
    /// Element the canvas is sized to, when not appended to the body.
    parent: Option<web_sys::Element>,
    elements: Vec<(String, web_sys::Element)>,
    subscriptions: Vec<(String, Subscription)>,
    pending: PendingCallbacks,
    gpu: Gpu,
    textures: HashMapTextureProvider,
    staged: StagedFrame,
    tracker: PointerTracker,
    window_size: [f32; 2],
    last_ts_ms: Option<f64>,
    next_widget: u64,
}

impl OverlayState {
    /// Client-space origin that host rectangles and pointers are made relative to.
    fn origin(&self) -> [f32; 2] {
        match &self.parent {
            Some(parent) => {
                let rect = parent.get_bounding_client_rect();
                [rect.left() as f32, rect.top() as f32]
            }
            None => [0.0, 0.0],
        }
    }

    fn viewport_size(&self) -> [f32; 2] {
        match &self.parent {
            Some(parent) => [parent.client_width() as f32, parent.client_height() as f32],
            None => self.window_size,
        }
    }

    fn frame(&mut self, ts_ms: f64) -> Result<(), JsValue> {
        let delta = self
            .last_ts_ms
            .map_or(0.0, |last| ((ts_ms - last) / 1000.0) as f32);
        self.last_ts_ms = Some(ts_ms);

        let [origin_x, origin_y] = self.origin();
        for (identifier, element) in &self.elements {
            let rect = element.get_bounding_client_rect();
            let host = HostRect::new(
                rect.left() as f32 - origin_x,
                rect.top() as f32 - origin_y,
                rect.width() as f32,
                rect.height() as f32,
            );
            if let Err(err) = self.overlay.set_host_rect(identifier, host) {
                log::warn!("{identifier}: {err}");
            }
        }

        let window = window()?;
        let scroll = match self.parent {
            Some(_) => [0.0, 0.0],
            None => [window.scroll_x()? as f32, window.scroll_y()? as f32],
        };
        let input = FrameInput {
            delta,
            device_pixel_ratio: window.device_pixel_ratio() as f32,
            viewport_size: self.viewport_size(),
            scroll,
        };
        let output = self.overlay.tick(input, &mut self.staged);
        self.place_canvas(&output)?;
        self.gpu.resize(output.canvas_size);
        self.gpu.draw(&self.staged, &self.textures)
    }

    fn place_canvas(&self, output: &FrameOutput) -> Result<(), JsValue> {
        let [width, height] = output.canvas_size;
        if self.canvas.width() != width {
            self.canvas.set_width(width);
        }
        if self.canvas.height() != height {
            self.canvas.set_height(height);
        }
        let [css_width, css_height] = output.canvas_css_size;
        let [tx, ty] = output.translation;
        let style = self.canvas.style();
        style.set_property("width", &format!("{css_width}px"))?;
        style.set_property("height", &format!("{css_height}px"))?;
        style.set_property("transform", &format!("translate({tx}px, {ty}px)"))?;
        Ok(())
    }

    fn pointer(&mut self, event: &web_sys::PointerEvent) {
        let Some(kind) = self.tracker.translate(&event.type_(), event.pointer_id()) else {
            return;
        };
        let [origin_x, origin_y] = self.origin();
        let x = event.client_x() as f32 - origin_x;
        let y = event.client_y() as f32 - origin_y;
        if self.overlay.pointer_event(kind, x, y) {
            event.prevent_default();
        }
    }

    fn widget_mut(&mut self, identifier: &str) -> Result<&mut JsWidget, JsValue> {
        self.overlay
            .get_mut(identifier)
            .ok_or_else(|| JsValue::from_str(&format!("unknown widget '{identifier}'")))
    }
}

fn pointer_event_object(event: &WidgetPointerEvent) -> JsValue {
    let object: JsValue = Object::new().into();
    let kind = format!("{:?}", event.kind).to_lowercase();
    let (target, slot) = match event.target {
        PointerTarget::Bounds => ("bounds", JsValue::NULL),
        PointerTarget::Slot(slot) => ("slot", JsValue::from(slot as u32)),
    };
    for (key, value) in [
        ("type", JsValue::from_str(&kind)),
        ("target", JsValue::from_str(target)),
        ("slot", slot),
        ("x", JsValue::from(event.position[0])),
        ("y", JsValue::from(event.position[1])),
    ] {
        let _ = Reflect::set(&object, &JsValue::from_str(key), &value);
    }
    object
}

fn flush_callbacks(pending: &PendingCallbacks) {
    let calls: Vec<_> = pending.borrow_mut().drain(..).collect();
    for (callback, event) in calls {
        if let Err(err) = callback.call1(&JsValue::NULL, &event) {
            log::error!("pointer callback failed: {}", describe(&err));
        }
    }
}

struct Listener {
    target: web_sys::EventTarget,
    event: &'static str,
    callback: Closure<dyn FnMut(web_sys::Event)>,
}

impl Listener {
    fn add(
        target: web_sys::EventTarget,
        event: &'static str,
        callback: impl FnMut(web_sys::Event) + 'static,
    ) -> Result<Self, JsValue> {
        let callback = Closure::wrap(Box::new(callback) as Box<dyn FnMut(web_sys::Event)>);
        target.add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())?;
        Ok(Self {
            target,
            event,
            callback,
        })
    }

    fn remove(&self) {
        let _ = self
            .target
            .remove_event_listener_with_callback(self.event, self.callback.as_ref().unchecked_ref());
    }
}

type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>;

fn request_frame(callback: &FrameCallback) -> Result<(), JsValue> {
    if let Some(callback) = callback.borrow().as_ref() {
        window()?.request_animation_frame(callback.as_ref().unchecked_ref())?;
    }
    Ok(())
}

/// A transparent canvas drawing a skeleton widget over every registered host element.
#[wasm_bindgen]
pub struct SpineOverlay {
    state: Rc<RefCell<OverlayState>>,
    running: Rc<Cell<bool>>,
    listeners: Vec<Listener>,
    observer: web_sys::IntersectionObserver,
    _observer_callback: Closure<dyn FnMut(Array)>,
}

/// Creates the overlay canvas and starts its frame loop.
///
/// `config_json` holds overlay settings (`overflow-top`, `append-to-body`, ...). When the
/// overlay is not appended to the body, the canvas is placed inside `parent` and sized to it.
#[wasm_bindgen(js_name = createOverlay)]
pub async fn create_overlay(
    parent: Option<web_sys::Element>,
    config_json: Option<String>,
) -> Result<SpineOverlay, JsValue> {
    let config = match config_json {
        Some(json) => OverlayConfig::from_json(&json).map_err(js_error)?,
        None => OverlayConfig::default(),
    };
    let window = window()?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("missing document"))?;

    let canvas: web_sys::HtmlCanvasElement = document.create_element("canvas")?.dyn_into()?;
    let style = canvas.style();
    style.set_property("position", "absolute")?;
    style.set_property("top", "0")?;
    style.set_property("left", "0")?;
    style.set_property("pointer-events", "none")?;
    style.set_property("z-index", "9999")?;

    let parent = if config.append_to_body {
        let body = document
            .body()
            .ok_or_else(|| JsValue::from_str("missing body"))?;
        body.append_child(&canvas)?;
        None
    } else {
        let parent = parent.ok_or_else(|| {
            JsValue::from_str("an overlay not appended to the body needs a parent element")
        })?;
        parent.append_child(&canvas)?;
        Some(parent)
    };

    let gpu = Gpu::new(&canvas).await?;
    let window_size = [
        window.inner_width()?.as_f64().unwrap_or(0.0) as f32,
        window.inner_height()?.as_f64().unwrap_or(0.0) as f32,
    ];
    let state = Rc::new(RefCell::new(OverlayState {
        overlay: Overlay::new(config),
        canvas,
        parent,
        elements: Vec::new(),
        subscriptions: Vec::new(),
        pending: Rc::new(RefCell::new(Vec::new())),
        gpu,
        textures: HashMapTextureProvider::default(),
        staged: StagedFrame::new(),
        tracker: PointerTracker::new(),
        window_size,
        last_ts_ms: None,
        next_widget: 0,
    }));

    let mut listeners = Vec::new();
    let root: web_sys::EventTarget = document
        .document_element()
        .ok_or_else(|| JsValue::from_str("missing document element"))?
        .into();
    for event in POINTER_EVENTS {
        let state = state.clone();
        listeners.push(Listener::add(root.clone(), event, move |event| {
            let Ok(event) = event.dyn_into::<web_sys::PointerEvent>() else {
                return;
            };
            let pending = {
                let mut state = state.borrow_mut();
                state.pointer(&event);
                state.pending.clone()
            };
            flush_callbacks(&pending);
        })?);
    }
    for event in ["resize", "orientationchange"] {
        let state = state.clone();
        listeners.push(Listener::add(window.clone().into(), event, move |_| {
            let Some(window) = web_sys::window() else {
                return;
            };
            let width = window.inner_width().ok().and_then(|v| v.as_f64());
            let height = window.inner_height().ok().and_then(|v| v.as_f64());
            if let (Some(width), Some(height)) = (width, height) {
                state.borrow_mut().window_size = [width as f32, height as f32];
            }
        })?);
    }

    let observer_callback = {
        let state = state.clone();
        Closure::wrap(Box::new(move |entries: Array| {
            let mut state = state.borrow_mut();
            for entry in entries.iter() {
                let Ok(entry) = entry.dyn_into::<web_sys::IntersectionObserverEntry>() else {
                    continue;
                };
                let Some(identifier) = entry.target().get_attribute(IDENTIFIER_ATTRIBUTE) else {
                    continue;
                };
                if let Err(err) = state
                    .overlay
                    .set_on_screen(&identifier, entry.is_intersecting())
                {
                    log::warn!("{identifier}: {err}");
                }
            }
        }) as Box<dyn FnMut(Array)>)
    };
    let observer = web_sys::IntersectionObserver::new(observer_callback.as_ref().unchecked_ref())?;

    let running = Rc::new(Cell::new(true));
    let frame_callback: FrameCallback = Rc::new(RefCell::new(None));
    {
        let handle = frame_callback.clone();
        let state = state.clone();
        let running = running.clone();
        *frame_callback.borrow_mut() = Some(Closure::wrap(Box::new(move |ts_ms: f64| {
            if !running.get() {
                // Dropping the closure breaks the self-reference and ends the loop.
                let _ = handle.borrow_mut().take();
                return;
            }
            if let Err(err) = state.borrow_mut().frame(ts_ms) {
                log::error!("frame failed: {}", describe(&err));
            }
            if let Err(err) = request_frame(&handle) {
                log::error!("requestAnimationFrame: {}", describe(&err));
            }
        }) as Box<dyn FnMut(f64)>));
    }
    request_frame(&frame_callback)?;

    Ok(SpineOverlay {
        state,
        running,
        listeners,
        observer,
        _observer_callback: observer_callback,
    })
}

#[wasm_bindgen]
impl SpineOverlay {
    /// Registers a host element. Its attributes configure the widget; the returned identifier
    /// addresses it in later calls.
    #[wasm_bindgen(js_name = addWidget)]
    pub fn add_widget(&self, element: web_sys::Element) -> Result<String, JsValue> {
        let attributes: Vec<(&str, String)> = ATTRIBUTES
            .iter()
            .filter_map(|(name, _)| element.get_attribute(name).map(|value| (*name, value)))
            .collect();
        let config =
            WidgetConfig::from_attributes(attributes.iter().map(|(n, v)| (*n, v.as_str())))
                .map_err(js_error)?;

        let mut state = self.state.borrow_mut();
        let identifier = match config.identifier.clone() {
            Some(identifier) => identifier,
            None if !element.id().is_empty() => element.id(),
            None => {
                state.next_widget += 1;
                format!("spine-widget-{}", state.next_widget)
            }
        };
        let widget = JsWidget::new(identifier.clone(), config).map_err(js_error)?;
        state.overlay.add(widget).map_err(js_error)?;

        element.set_attribute(IDENTIFIER_ATTRIBUTE, &identifier)?;
        self.observer.observe(&element);
        state.elements.push((identifier.clone(), element));
        Ok(identifier)
    }

    /// Hands a loaded spine-core `Skeleton` and `AnimationState` to a widget.
    #[wasm_bindgen(js_name = attachSkeleton)]
    pub fn attach_skeleton(
        &self,
        identifier: &str,
        skeleton: JsValue,
        animation_state: JsValue,
    ) -> Result<(), JsValue> {
        let skeleton = JsSkeleton::new(skeleton).map_err(js_error)?;
        let animation_state = JsAnimationState::new(animation_state).map_err(js_error)?;
        let mut state = self.state.borrow_mut();
        state
            .widget_mut(identifier)?
            .attach(skeleton, animation_state)
            .map_err(js_error)
    }

    /// Starts a widget configured with `manual-start`.
    pub fn start(&self, identifier: &str) -> Result<(), JsValue> {
        let mut state = self.state.borrow_mut();
        state.widget_mut(identifier)?.start().map_err(js_error)
    }

    /// Calls `callback` with `{ type, target, slot, x, y }` for the widget's pointer events.
    #[wasm_bindgen(js_name = onPointer)]
    pub fn on_pointer(&self, identifier: &str, callback: Function) -> Result<(), JsValue> {
        let mut state = self.state.borrow_mut();
        let pending = state.pending.clone();
        let subscription = state.widget_mut(identifier)?.on_pointer(move |event| {
            pending
                .borrow_mut()
                .push((callback.clone(), pointer_event_object(event)));
        });
        state
            .subscriptions
            .push((identifier.to_string(), subscription));
        Ok(())
    }

    #[wasm_bindgen(js_name = bonePosition)]
    pub fn bone_position(&self, identifier: &str, bone: &str) -> Result<Vec<f32>, JsValue> {
        let state = self.state.borrow();
        let widget = state
            .overlay
            .get(identifier)
            .ok_or_else(|| JsValue::from_str(&format!("unknown widget '{identifier}'")))?;
        Ok(widget.bone_position(bone, [0.0, 0.0]).to_vec())
    }

    #[wasm_bindgen(js_name = setBonePosition)]
    pub fn set_bone_position(
        &self,
        identifier: &str,
        bone: &str,
        x: f32,
        y: f32,
    ) -> Result<(), JsValue> {
        let mut state = self.state.borrow_mut();
        state
            .widget_mut(identifier)?
            .set_bone_position(bone, x, y)
            .map_err(js_error)
    }

    /// Destroys a widget and stops observing its host element.
    #[wasm_bindgen(js_name = removeWidget)]
    pub fn remove_widget(&self, identifier: &str) -> bool {
        let mut state = self.state.borrow_mut();
        state.subscriptions.retain(|(owner, _)| owner != identifier);
        if let Some(index) = state.elements.iter().position(|(id, _)| id == identifier) {
            let (_, element) = state.elements.remove(index);
            self.observer.unobserve(&element);
            let _ = element.remove_attribute(IDENTIFIER_ATTRIBUTE);
        }
        state.overlay.remove(identifier).is_some()
    }

    /// Registers RGBA8 pixels as the texture of an atlas page.
    #[wasm_bindgen(js_name = uploadTexture)]
    pub fn upload_texture(
        &self,
        page: &str,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<(), JsValue> {
        upload_texture(&self.state, page, width, height, pixels)
    }

    /// Fetches and decodes a PNG atlas page. Resolves once the texture is registered.
    #[wasm_bindgen(js_name = loadTexture)]
    pub fn load_texture(&self, page: String, url: String) -> js_sys::Promise {
        let state = self.state.clone();
        future_to_promise(async move {
            let bytes = fetch_bytes(&url).await?;
            let (width, height, pixels) =
                decode_png_rgba8(&url, &bytes).map_err(|e| JsValue::from_str(&e))?;
            upload_texture(&state, &page, width, height, &pixels)?;
            Ok(JsValue::UNDEFINED)
        })
    }

    /// Stops the frame loop, removes every listener and the canvas, and destroys all widgets.
    pub fn dispose(&mut self) {
        if !self.running.replace(false) {
            return;
        }
        for listener in self.listeners.drain(..) {
            listener.remove();
        }
        self.observer.disconnect();

        let mut state = self.state.borrow_mut();
        state.subscriptions.clear();
        state.elements.clear();
        state.overlay.dispose();
        state.canvas.remove();
    }
}

fn upload_texture(
    state: &Rc<RefCell<OverlayState>>,
    page: &str,
    width: u32,
    height: u32,
    pixels: &[u8],
) -> Result<(), JsValue> {
    if width == 0 || height == 0 || pixels.len() != (width * height * 4) as usize {
        return Err(JsValue::from_str(&format!(
            "texture '{page}': expected {width}x{height} RGBA8 pixels, got {} bytes",
            pixels.len()
        )));
    }
    let mut state = state.borrow_mut();
    let bind_group = state.gpu.upload_texture(width, height, pixels);
    state.textures.insert(page, bind_group);
    Ok(())
}

async fn fetch_bytes(path: &str) -> Result<Vec<u8>, JsValue> {
    let resp = JsFuture::from(window()?.fetch_with_str(path)).await?;
    let resp: web_sys::Response = resp.dyn_into()?;
    if !resp.ok() {
        return Err(JsValue::from_str(&format!("fetch {path}: HTTP {}", resp.status())));
    }
    let buffer = JsFuture::from(resp.array_buffer()?).await?;
    Ok(js_sys::Uint8Array::new(&buffer).to_vec())
}

fn decode_png_rgba8(label: &str, bytes: &[u8]) -> Result<(u32, u32, Vec<u8>), String> {
    let img = image::load_from_memory_with_format(bytes, image::ImageFormat::Png)
        .map_err(|e| format!("decode png {label}: {e}"))?;
    let rgba = img.to_rgba8();
    let (w, h) = rgba.dimensions();
    Ok((w, h, rgba.into_raw()))
}
