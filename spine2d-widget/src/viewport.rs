//! Screen/world mapping for the overlay canvas.
//!
//! Screen coordinates are CSS pixels relative to the canvas' top-left corner, y down. World
//! coordinates are backing-store pixels with the origin at the canvas center, y up. The backing
//! store is `css size * dpr / dpr_adjustment`, where `dpr_adjustment` grows in fixed steps
//! whenever the canvas would exceed the maximum pixel size.

use crate::OverlayConfig;
use glam::{Mat4, Vec3};

/// Sizing passes per call. Each DPR adjustment resets the virtual size once, so two or three
/// passes settle every finite size.
const MAX_SIZING_PASSES: usize = 8;

/// Result of [`ViewportMapper::compute_viewport_size`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ViewportUpdate {
    pub width: f32,
    pub height: f32,
    /// The effective DPR changed: DPR-derived skeleton scales must be recomputed.
    pub rescale: bool,
}

#[derive(Clone, Debug)]
pub struct ViewportMapper {
    config: OverlayConfig,
    device_pixel_ratio: f32,
    dpr_adjustment: f32,
    last_dpr: Option<f32>,
    virtual_size: [f32; 2],
    client_size: [f32; 2],
    canvas_size: [u32; 2],
    clip_from_world: Mat4,
    world_from_clip: Mat4,
}

impl ViewportMapper {
    pub fn new(config: OverlayConfig) -> Self {
        Self {
            config,
            device_pixel_ratio: 1.0,
            dpr_adjustment: 1.0,
            last_dpr: None,
            virtual_size: [0.0; 2],
            client_size: [1.0; 2],
            canvas_size: [1; 2],
            clip_from_world: Mat4::IDENTITY,
            world_from_clip: Mat4::IDENTITY,
        }
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    pub fn set_device_pixel_ratio(&mut self, device_pixel_ratio: f32) {
        if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
            self.device_pixel_ratio = device_pixel_ratio;
        }
    }

    pub fn device_pixel_ratio(&self) -> f32 {
        self.device_pixel_ratio
    }

    pub fn dpr_adjustment(&self) -> f32 {
        self.dpr_adjustment
    }

    /// `devicePixelRatio / dpr_adjustment`: world pixels per CSS pixel.
    pub fn effective_dpr(&self) -> f32 {
        self.device_pixel_ratio / self.dpr_adjustment
    }

    pub fn screen_to_world_length(&self, length: f32) -> f32 {
        length * self.effective_dpr()
    }

    pub fn world_to_screen_length(&self, length: f32) -> f32 {
        length / self.effective_dpr()
    }

    /// Stabilized virtual viewport size for a true viewport of `width x height` CSS pixels.
    ///
    /// Window-sized overlays only grow their virtual size, by the configured increments, and
    /// reset it when the DPR changes. Parent-sized overlays use the true size as is.
    pub fn compute_viewport_size(&mut self, width: f32, height: f32) -> ViewportUpdate {
        let width = sanitize(width);
        let height = sanitize(height);
        let mut rescale = false;

        for _ in 0..MAX_SIZING_PASSES {
            let dpr = self.effective_dpr();
            let dpr_changed = self.last_dpr != Some(dpr);

            if !self.config.append_to_body {
                self.virtual_size = [width, height];
                if dpr_changed {
                    self.last_dpr = Some(dpr);
                    rescale = true;
                }
            } else if dpr_changed {
                self.virtual_size[0] = if self.last_dpr.is_none() {
                    width
                } else {
                    width * self.config.width_increment
                };
                self.virtual_size[1] = height * self.config.height_increment;
                self.last_dpr = Some(dpr);
                rescale = true;
            } else {
                if width > self.virtual_size[0] {
                    self.virtual_size[0] = width * self.config.width_increment;
                }
                if height > self.virtual_size[1] {
                    self.virtual_size[1] = height * self.config.height_increment;
                }
            }

            let [canvas_width, canvas_height] = self.canvas_css_size();
            let fits = canvas_width * dpr <= self.config.max_canvas_width
                && canvas_height * dpr <= self.config.max_canvas_height;
            if fits || !self.config.append_to_body || self.config.dpr_step <= 0.0 {
                break;
            }
            let Some(adjustment) = self.next_dpr_adjustment(canvas_width, canvas_height) else {
                log::warn!(
                    "canvas of {canvas_width}x{canvas_height} css px cannot fit, dpr adjustment stays {}",
                    self.dpr_adjustment
                );
                break;
            };
            self.dpr_adjustment = adjustment;
            log::debug!(
                "canvas exceeds {}x{} px, dpr adjustment now {}",
                self.config.max_canvas_width,
                self.config.max_canvas_height,
                self.dpr_adjustment
            );
        }

        ViewportUpdate {
            width: self.virtual_size[0],
            height: self.virtual_size[1],
            rescale,
        }
    }

    /// Smallest `dpr_adjustment + k * dpr_step`, `k >= 1`, at which a canvas of the given CSS
    /// size fits the maximum pixel size. `None` when no representable adjustment is larger.
    fn next_dpr_adjustment(&self, css_width: f32, css_height: f32) -> Option<f32> {
        let step = self.config.dpr_step;
        let required = (css_width * self.device_pixel_ratio / self.config.max_canvas_width)
            .max(css_height * self.device_pixel_ratio / self.config.max_canvas_height);
        let steps = ((required - self.dpr_adjustment) / step).ceil().max(1.0);
        let next = self.dpr_adjustment + steps * step;
        (next.is_finite() && next > self.dpr_adjustment).then_some(next)
    }

    pub fn virtual_size(&self) -> [f32; 2] {
        self.virtual_size
    }

    /// Overflow margins in CSS pixels: `[top, bottom, left, right]`.
    pub fn overflow_sizes(&self) -> [f32; 4] {
        let [width, height] = self.virtual_size;
        [
            self.config.overflow_top * height,
            self.config.overflow_bottom * height,
            self.config.overflow_left * width,
            self.config.overflow_right * width,
        ]
    }

    /// Canvas size in CSS pixels: the virtual size plus overflow margins.
    pub fn canvas_css_size(&self) -> [f32; 2] {
        let [width, height] = self.virtual_size;
        [
            width * (1.0 + self.config.overflow_left + self.config.overflow_right),
            height * (1.0 + self.config.overflow_top + self.config.overflow_bottom),
        ]
    }

    /// Translation, in CSS pixels, that keeps the canvas covering the visible area after a
    /// scroll of `(scroll_x, scroll_y)`.
    pub fn canvas_translation(&self, scroll_x: f32, scroll_y: f32) -> [f32; 2] {
        let [top, _, left, _] = self.overflow_sizes();
        [scroll_x - left, scroll_y - top]
    }

    /// Resizes the canvas to `css_width x css_height` CSS pixels and updates the camera.
    /// Returns the backing-store size in pixels.
    pub fn resize(&mut self, css_width: f32, css_height: f32) -> [u32; 2] {
        self.client_size = [sanitize(css_width).max(1.0), sanitize(css_height).max(1.0)];
        self.canvas_size = [
            self.screen_to_world_length(self.client_size[0]).round().max(1.0) as u32,
            self.screen_to_world_length(self.client_size[1]).round().max(1.0) as u32,
        ];

        let half_width = self.canvas_size[0] as f32 / 2.0;
        let half_height = self.canvas_size[1] as f32 / 2.0;
        self.clip_from_world =
            Mat4::orthographic_rh(-half_width, half_width, -half_height, half_height, -1.0, 1.0);
        self.world_from_clip = self.clip_from_world.inverse();
        self.canvas_size
    }

    pub fn client_size(&self) -> [f32; 2] {
        self.client_size
    }

    pub fn canvas_size(&self) -> [u32; 2] {
        self.canvas_size
    }

    /// Camera matrix handed to the renderer.
    pub fn clip_from_world(&self) -> Mat4 {
        self.clip_from_world
    }

    pub fn screen_to_world(&self, x: f32, y: f32) -> [f32; 2] {
        let [width, height] = self.client_size;
        let ndc = Vec3::new(2.0 * x / width - 1.0, 1.0 - 2.0 * y / height, 0.0);
        let world = self.world_from_clip.project_point3(ndc);
        [world.x, world.y]
    }

    pub fn world_to_screen(&self, x: f32, y: f32) -> [f32; 2] {
        let [width, height] = self.client_size;
        let ndc = self.clip_from_world.project_point3(Vec3::new(x, y, 0.0));
        [(ndc.x + 1.0) * width / 2.0, (1.0 - ndc.y) * height / 2.0]
    }
}

fn sanitize(value: f32) -> f32 {
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}
