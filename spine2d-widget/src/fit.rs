use crate::{Bounds, Error, ViewportMapper};
use std::str::FromStr;

/// How a skeleton is scaled into its host rectangle.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum FitMode {
    /// Largest uniform scale that keeps the bounds inside the container.
    #[default]
    Contain,
    /// Smallest uniform scale that covers the container.
    Cover,
    /// Non-uniform scale matching both dimensions.
    Fill,
    Width,
    Height,
    /// Like `Contain`, but never scales up.
    ScaleDown,
    /// Keeps the skeleton scale and centers the bounds.
    None,
    /// Keeps the skeleton scale and places the skeleton origin at the container center.
    Origin,
}

impl FitMode {
    /// Modes whose skeleton scale derives from the device pixel ratio.
    pub fn is_dpr_scaled(self) -> bool {
        matches!(self, Self::None | Self::Origin)
    }
}

impl FromStr for FitMode {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(match value.trim() {
            "contain" => Self::Contain,
            "cover" => Self::Cover,
            "fill" => Self::Fill,
            "width" => Self::Width,
            "height" => Self::Height,
            "scaleDown" => Self::ScaleDown,
            "none" => Self::None,
            "origin" => Self::Origin,
            other => {
                return Err(Error::InvalidValue {
                    message: format!("unknown fit mode '{other}'"),
                });
            }
        })
    }
}

/// Host element rectangle in CSS pixels, relative to the canvas' top-left corner.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct HostRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl HostRect {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }
}

/// Placement parameters of a widget inside its host rectangle.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FitParams {
    pub mode: FitMode,
    /// User scale multiplier.
    pub scale: f32,
    /// Padding as fractions of the host size: left, right, top, bottom.
    pub padding: [f32; 4],
    /// Anchor shift as fractions of the host size.
    pub axis: [f32; 2],
    /// Extra offset in CSS pixels, y down.
    pub offset: [f32; 2],
}

impl Default for FitParams {
    fn default() -> Self {
        Self {
            mode: FitMode::Contain,
            scale: 1.0,
            padding: [0.0; 4],
            axis: [0.0; 2],
            offset: [0.0; 2],
        }
    }
}

/// Output of [`fit_layout`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FitLayout {
    /// New skeleton scale. `None` for modes that keep the current (DPR-derived) scale.
    pub scale: Option<[f32; 2]>,
    /// World position of the skeleton origin.
    pub world_offset: [f32; 2],
}

/// Places a skeleton with `bounds` inside `host`.
///
/// `current_scale` is the skeleton scale used by `none` and `origin`.
pub fn fit_layout(
    mapper: &ViewportMapper,
    host: &HostRect,
    bounds: &Bounds,
    params: &FitParams,
    current_scale: [f32; 2],
) -> FitLayout {
    let [pad_left, pad_right, pad_top, pad_bottom] = params.padding;
    let anchor_x = host.left + host.width * (0.5 + (pad_left - pad_right) / 2.0 + params.axis[0]);
    let anchor_y = host.top + host.height * (0.5 + (pad_top - pad_bottom) / 2.0 + params.axis[1]);
    let [mut world_x, mut world_y] = mapper.screen_to_world(anchor_x, anchor_y);

    let available_width = mapper.screen_to_world_length(host.width * (1.0 - pad_left - pad_right));
    let available_height = mapper.screen_to_world_length(host.height * (1.0 - pad_top - pad_bottom));

    let scale = if bounds.has_area() {
        let ratio_w = available_width / bounds.width;
        let ratio_h = available_height / bounds.height;
        match params.mode {
            FitMode::Contain => Some([ratio_w.min(ratio_h); 2]),
            FitMode::Cover => Some([ratio_w.max(ratio_h); 2]),
            FitMode::Fill => Some([ratio_w, ratio_h]),
            FitMode::Width => Some([ratio_w; 2]),
            FitMode::Height => Some([ratio_h; 2]),
            FitMode::ScaleDown => Some([ratio_w.min(ratio_h).min(1.0); 2]),
            FitMode::None | FitMode::Origin => None,
        }
    } else {
        None
    }
    .map(|[sx, sy]| [sx * params.scale, sy * params.scale]);

    let [scale_x, scale_y] = scale.unwrap_or(current_scale);
    if params.mode != FitMode::Origin && bounds.is_computed() {
        world_x -= (bounds.x + bounds.width / 2.0) * scale_x;
        world_y -= (bounds.y + bounds.height / 2.0) * scale_y;
    }

    world_x += mapper.screen_to_world_length(params.offset[0]);
    world_y -= mapper.screen_to_world_length(params.offset[1]);

    FitLayout {
        scale,
        world_offset: [world_x, world_y],
    }
}
