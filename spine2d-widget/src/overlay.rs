//! The shared canvas hosting every widget of a page.

use crate::{
    Error, FrameContext, HostRect, HostRenderer, OverlayConfig, OverlayWidget, PointerEventKind,
    Registry, ViewportMapper,
};

/// Host measurements for one tick.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FrameInput {
    /// Seconds since the previous tick.
    pub delta: f32,
    pub device_pixel_ratio: f32,
    /// Window size, or parent size when the overlay is not appended to the body, in CSS pixels.
    pub viewport_size: [f32; 2],
    /// Page scroll in CSS pixels.
    pub scroll: [f32; 2],
}

/// Canvas placement the host applies after a tick.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FrameOutput {
    pub canvas_size: [u32; 2],
    pub canvas_css_size: [f32; 2],
    /// CSS translation keeping the canvas over the visible area.
    pub translation: [f32; 2],
    pub rescaled: bool,
}

struct Entry<W> {
    widget: W,
    /// Host element rectangle relative to the viewport, in CSS pixels.
    client_rect: Option<HostRect>,
}

/// Owns the viewport mapping and every widget drawn into the canvas.
pub struct Overlay<W> {
    mapper: ViewportMapper,
    widgets: Registry<Entry<W>>,
    frame: u64,
    last_pointer: Option<[f32; 2]>,
}

impl<W: OverlayWidget> Overlay<W> {
    pub fn new(config: OverlayConfig) -> Self {
        Self {
            mapper: ViewportMapper::new(config),
            widgets: Registry::new(),
            frame: 0,
            last_pointer: None,
        }
    }

    pub fn mapper(&self) -> &ViewportMapper {
        &self.mapper
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn add(&mut self, widget: W) -> Result<(), Error> {
        let identifier = widget.identifier().to_string();
        self.widgets.register(
            &identifier,
            Entry {
                widget,
                client_rect: None,
            },
        )
    }

    /// Removes and destroys a widget.
    pub fn remove(&mut self, identifier: &str) -> Option<W> {
        let mut entry = self.widgets.remove(identifier)?;
        entry.widget.destroy();
        Some(entry.widget)
    }

    pub fn get(&self, identifier: &str) -> Option<&W> {
        self.widgets.get(identifier).map(|entry| &entry.widget)
    }

    pub fn get_mut(&mut self, identifier: &str) -> Option<&mut W> {
        self.widgets.get_mut(identifier).map(|entry| &mut entry.widget)
    }

    pub fn widgets(&self) -> impl Iterator<Item = &W> {
        self.widgets.iter().map(|(_, entry)| &entry.widget)
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    /// Records where a widget's host element sits, relative to the viewport.
    pub fn set_host_rect(&mut self, identifier: &str, client_rect: HostRect) -> Result<(), Error> {
        let entry = self.entry_mut(identifier)?;
        entry.client_rect = Some(client_rect);
        Ok(())
    }

    pub fn set_on_screen(&mut self, identifier: &str, on_screen: bool) -> Result<(), Error> {
        self.entry_mut(identifier)?.widget.set_on_screen(on_screen);
        Ok(())
    }

    fn entry_mut(&mut self, identifier: &str) -> Result<&mut Entry<W>, Error> {
        self.widgets
            .get_mut(identifier)
            .ok_or_else(|| Error::InvalidValue {
                message: format!("no widget registered as '{identifier}'"),
            })
    }

    /// Viewport-relative CSS position to canvas CSS position.
    pub fn client_to_canvas(&self, x: f32, y: f32) -> [f32; 2] {
        let [top, _, left, _] = self.mapper.overflow_sizes();
        [x + left, y + top]
    }

    /// Runs one frame: sizes the canvas, lays out and updates every widget, then renders them.
    pub fn tick(&mut self, input: FrameInput, renderer: &mut dyn HostRenderer) -> FrameOutput {
        self.mapper.set_device_pixel_ratio(input.device_pixel_ratio);
        let viewport = self
            .mapper
            .compute_viewport_size(input.viewport_size[0], input.viewport_size[1]);
        if viewport.rescale {
            let effective_dpr = self.mapper.effective_dpr();
            for (_, entry) in widgets_mut(&mut self.widgets) {
                entry.widget.rescale_for_dpr(effective_dpr);
            }
        }
        let [css_width, css_height] = self.mapper.canvas_css_size();
        let canvas_size = self.mapper.resize(css_width, css_height);
        let translation = self.mapper.canvas_translation(input.scroll[0], input.scroll[1]);

        self.frame += 1;
        let frame = FrameContext {
            frame: self.frame,
            delta: input.delta,
        };
        let [left, top] = self.client_to_canvas(0.0, 0.0);
        let mapper = &self.mapper;
        for (identifier, entry) in widgets_mut(&mut self.widgets) {
            if entry.widget.is_disposed() {
                continue;
            }
            if let Some(rect) = entry.client_rect {
                let host = HostRect::new(rect.left + left, rect.top + top, rect.width, rect.height);
                entry.widget.layout(mapper, host);
            }
            if let Err(err) = entry.widget.update(frame) {
                log::error!("{identifier}: frame update failed: {err}");
            }
        }

        renderer.begin_frame(self.mapper.clip_from_world(), canvas_size);
        for (identifier, entry) in widgets_mut(&mut self.widgets) {
            if entry.widget.is_disposed() {
                continue;
            }
            if let Err(err) = entry.widget.render(renderer) {
                log::error!("{identifier}: render failed: {err}");
            }
        }
        renderer.end_frame();

        FrameOutput {
            canvas_size,
            canvas_css_size: [css_width, css_height],
            translation,
            rescaled: viewport.rescale,
        }
    }

    /// Dispatches a pointer event at viewport-relative CSS coordinates to every widget.
    /// Returns whether the host should suppress its default handling.
    pub fn pointer_event(&mut self, kind: PointerEventKind, client_x: f32, client_y: f32) -> bool {
        let [x, y] = self.client_to_canvas(client_x, client_y);
        let world = self.mapper.screen_to_world(x, y);

        if kind == PointerEventKind::Drag {
            if let Some([last_x, last_y]) = self.last_pointer {
                let dx = self.mapper.screen_to_world_length(x - last_x);
                let dy = -self.mapper.screen_to_world_length(y - last_y);
                for (_, entry) in widgets_mut(&mut self.widgets) {
                    entry.widget.drag_by(dx, dy);
                }
            }
        }
        self.last_pointer = match kind {
            PointerEventKind::Up | PointerEventKind::Leave => None,
            _ => Some([x, y]),
        };

        let mut prevent_default = false;
        for (identifier, entry) in widgets_mut(&mut self.widgets) {
            match entry.widget.pointer(kind, world) {
                Ok(prevent) => prevent_default |= prevent,
                Err(err) => log::error!("{identifier}: pointer event failed: {err}"),
            }
        }
        prevent_default
    }

    /// Destroys every widget.
    pub fn dispose(&mut self) {
        for (_, entry) in widgets_mut(&mut self.widgets) {
            entry.widget.destroy();
        }
        self.widgets = Registry::new();
    }
}

fn widgets_mut<W>(widgets: &mut Registry<Entry<W>>) -> impl Iterator<Item = (&str, &mut Entry<W>)> {
    widgets.iter_mut()
}
