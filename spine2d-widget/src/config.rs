//! Overlay settings and the declarative widget attribute surface.

use crate::{
    AnimationsConfig, Bounds, BoundsProvider, DEFAULT_TIME_STEP, Error, FitMode, FitParams,
    OffScreenPolicy, RectangleBounds, SetupPoseBounds, SkinsAndAnimationBounds,
};
use serde::Deserialize;

/// Settings of the shared overlay canvas.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OverlayConfig {
    /// Extra canvas area as fractions of the viewport, so fast scrolling never shows an edge.
    pub overflow_top: f32,
    pub overflow_bottom: f32,
    pub overflow_left: f32,
    pub overflow_right: f32,
    /// Largest backing store, in device pixels, before the DPR is divided down.
    pub max_canvas_width: f32,
    pub max_canvas_height: f32,
    pub width_increment: f32,
    pub height_increment: f32,
    pub dpr_step: f32,
    /// Window-sized canvas appended to the page body, or a canvas sized to its parent.
    pub append_to_body: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            overflow_top: 0.2,
            overflow_bottom: 0.0,
            overflow_left: 0.0,
            overflow_right: 0.0,
            max_canvas_width: 7000.0,
            max_canvas_height: 7000.0,
            width_increment: 1.15,
            height_increment: 1.2,
            dpr_step: 0.5,
            append_to_body: true,
        }
    }
}

impl OverlayConfig {
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|err| Error::InvalidValue {
            message: format!("overlay config: {err}"),
        })
    }

    /// Applies one overlay element attribute. Returns false for names that are not overlay
    /// attributes.
    pub fn set_attribute(&mut self, name: &str, value: Option<&str>) -> Result<bool, Error> {
        let defaults = Self::default();
        let field = match name {
            "overflow-top" => (&mut self.overflow_top, defaults.overflow_top),
            "overflow-bottom" => (&mut self.overflow_bottom, defaults.overflow_bottom),
            "overflow-left" => (&mut self.overflow_left, defaults.overflow_left),
            "overflow-right" => (&mut self.overflow_right, defaults.overflow_right),
            "append-to-body" => {
                self.append_to_body = value.map_or(defaults.append_to_body, parse_bool);
                return Ok(true);
            }
            _ => return Ok(false),
        };
        *field.0 = match value {
            Some(value) => parse_number(name, value)?,
            None => field.1,
        };
        Ok(true)
    }
}

/// Value type of a widget attribute.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AttributeKind {
    String,
    Number,
    Boolean,
    NumberArray,
    StringArray,
    Object,
    FitMode,
    OffScreenPolicy,
    AnimationsGrammar,
}

/// Every recognised widget attribute with its value type.
pub const ATTRIBUTES: &[(&str, AttributeKind)] = &[
    ("atlas", AttributeKind::String),
    ("skeleton", AttributeKind::String),
    ("raw-data", AttributeKind::Object),
    ("json-skeleton-key", AttributeKind::String),
    ("identifier", AttributeKind::String),
    ("scale", AttributeKind::Number),
    ("animation", AttributeKind::String),
    ("animations", AttributeKind::AnimationsGrammar),
    ("animation-bounds", AttributeKind::StringArray),
    ("default-mix", AttributeKind::Number),
    ("skin", AttributeKind::StringArray),
    ("width", AttributeKind::Number),
    ("height", AttributeKind::Number),
    ("drag", AttributeKind::Boolean),
    ("interactive", AttributeKind::Boolean),
    ("x-axis", AttributeKind::Number),
    ("y-axis", AttributeKind::Number),
    ("offset-x", AttributeKind::Number),
    ("offset-y", AttributeKind::Number),
    ("pad-left", AttributeKind::Number),
    ("pad-right", AttributeKind::Number),
    ("pad-top", AttributeKind::Number),
    ("pad-bottom", AttributeKind::Number),
    ("bounds-x", AttributeKind::Number),
    ("bounds-y", AttributeKind::Number),
    ("bounds-width", AttributeKind::Number),
    ("bounds-height", AttributeKind::Number),
    ("auto-calculate-bounds", AttributeKind::Boolean),
    ("fit", AttributeKind::FitMode),
    ("offscreen", AttributeKind::OffScreenPolicy),
    ("clip", AttributeKind::Boolean),
    ("pages", AttributeKind::NumberArray),
    ("manual-start", AttributeKind::Boolean),
    ("start-when-visible", AttributeKind::Boolean),
    ("debug", AttributeKind::Boolean),
    ("spinner", AttributeKind::Boolean),
];

pub fn attribute_kind(name: &str) -> Option<AttributeKind> {
    ATTRIBUTES
        .iter()
        .find(|(attribute, _)| *attribute == name)
        .map(|(_, kind)| *kind)
}

/// Configuration of one skeleton widget.
#[derive(Clone, Debug, PartialEq)]
pub struct WidgetConfig {
    pub atlas_path: Option<String>,
    pub skeleton_path: Option<String>,
    /// Inline assets keyed by path, used instead of fetching.
    pub raw_data: Option<serde_json::Value>,
    /// Key of the skeleton inside a JSON file holding several skeletons.
    pub json_skeleton_key: Option<String>,
    pub identifier: Option<String>,
    pub scale: f32,
    pub animation: Option<String>,
    pub animations: AnimationsConfig,
    pub animation_bounds: Vec<String>,
    pub default_mix: f32,
    pub skin: Vec<String>,
    /// Host element size in CSS pixels. Negative means the element's own size.
    pub width: f32,
    pub height: f32,
    pub drag: bool,
    pub interactive: bool,
    pub x_axis: f32,
    pub y_axis: f32,
    pub offset_x: f32,
    pub offset_y: f32,
    pub pad_left: f32,
    pub pad_right: f32,
    pub pad_top: f32,
    pub pad_bottom: f32,
    pub bounds_x: f32,
    pub bounds_y: f32,
    pub bounds_width: f32,
    pub bounds_height: f32,
    pub auto_calculate_bounds: bool,
    pub fit: FitMode,
    pub offscreen: OffScreenPolicy,
    pub clip: bool,
    /// Atlas pages to load. `None` loads every page.
    pub pages: Option<Vec<usize>>,
    pub manual_start: bool,
    pub start_when_visible: bool,
    pub debug: bool,
    pub spinner: bool,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            atlas_path: None,
            skeleton_path: None,
            raw_data: None,
            json_skeleton_key: None,
            identifier: None,
            scale: 1.0,
            animation: None,
            animations: AnimationsConfig::default(),
            animation_bounds: Vec::new(),
            default_mix: 0.0,
            skin: Vec::new(),
            width: -1.0,
            height: -1.0,
            drag: false,
            interactive: false,
            x_axis: 0.0,
            y_axis: 0.0,
            offset_x: 0.0,
            offset_y: 0.0,
            pad_left: 0.0,
            pad_right: 0.0,
            pad_top: 0.0,
            pad_bottom: 0.0,
            bounds_x: 0.0,
            bounds_y: 0.0,
            bounds_width: -1.0,
            bounds_height: -1.0,
            auto_calculate_bounds: false,
            fit: FitMode::Contain,
            offscreen: OffScreenPolicy::Pause,
            clip: false,
            pages: None,
            manual_start: false,
            start_when_visible: false,
            debug: false,
            spinner: false,
        }
    }
}

impl WidgetConfig {
    pub fn from_attributes<'a, I>(attributes: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut config = Self::default();
        for (name, value) in attributes {
            config.set_attribute(name, Some(value))?;
        }
        Ok(config)
    }

    /// Applies one attribute. `None` (attribute removed) restores the default. Unknown names are
    /// ignored and return `Ok(false)`.
    pub fn set_attribute(&mut self, name: &str, value: Option<&str>) -> Result<bool, Error> {
        let Some(value) = value else {
            self.reset_attribute(name);
            return Ok(attribute_kind(name).is_some());
        };

        match name {
            "atlas" => self.atlas_path = non_empty(value),
            "skeleton" => self.skeleton_path = non_empty(value),
            "raw-data" => self.raw_data = Some(parse_object(name, value)?),
            "json-skeleton-key" => self.json_skeleton_key = non_empty(value),
            "identifier" => self.identifier = non_empty(value),
            "scale" => self.scale = parse_number(name, value)?,
            "animation" => self.animation = non_empty(value),
            "animations" => self.animations = AnimationsConfig::parse(value)?,
            "animation-bounds" => self.animation_bounds = parse_string_array(value),
            "default-mix" => self.default_mix = parse_number(name, value)?,
            "skin" => self.skin = parse_string_array(value),
            "width" => self.width = parse_number(name, value)?,
            "height" => self.height = parse_number(name, value)?,
            "drag" => self.drag = parse_bool(value),
            "interactive" => self.interactive = parse_bool(value),
            "x-axis" => self.x_axis = parse_number(name, value)?,
            "y-axis" => self.y_axis = parse_number(name, value)?,
            "offset-x" => self.offset_x = parse_number(name, value)?,
            "offset-y" => self.offset_y = parse_number(name, value)?,
            "pad-left" => self.pad_left = parse_number(name, value)?,
            "pad-right" => self.pad_right = parse_number(name, value)?,
            "pad-top" => self.pad_top = parse_number(name, value)?,
            "pad-bottom" => self.pad_bottom = parse_number(name, value)?,
            "bounds-x" => self.bounds_x = parse_number(name, value)?,
            "bounds-y" => self.bounds_y = parse_number(name, value)?,
            "bounds-width" => self.bounds_width = parse_number(name, value)?,
            "bounds-height" => self.bounds_height = parse_number(name, value)?,
            "auto-calculate-bounds" => self.auto_calculate_bounds = parse_bool(value),
            "fit" => {
                self.fit = value
                    .parse()
                    .map_err(|err: Error| Error::invalid_attribute(name, value, err.to_string()))?
            }
            "offscreen" => {
                self.offscreen = value
                    .parse()
                    .map_err(|err: Error| Error::invalid_attribute(name, value, err.to_string()))?
            }
            "clip" => self.clip = parse_bool(value),
            "pages" => self.pages = Some(parse_index_array(name, value)?),
            "manual-start" => self.manual_start = parse_bool(value),
            "start-when-visible" => self.start_when_visible = parse_bool(value),
            "debug" => self.debug = parse_bool(value),
            "spinner" => self.spinner = parse_bool(value),
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn reset_attribute(&mut self, name: &str) {
        let d = Self::default();
        match name {
            "atlas" => self.atlas_path = d.atlas_path,
            "skeleton" => self.skeleton_path = d.skeleton_path,
            "raw-data" => self.raw_data = d.raw_data,
            "json-skeleton-key" => self.json_skeleton_key = d.json_skeleton_key,
            "identifier" => self.identifier = d.identifier,
            "scale" => self.scale = d.scale,
            "animation" => self.animation = d.animation,
            "animations" => self.animations = d.animations,
            "animation-bounds" => self.animation_bounds = d.animation_bounds,
            "default-mix" => self.default_mix = d.default_mix,
            "skin" => self.skin = d.skin,
            "width" => self.width = d.width,
            "height" => self.height = d.height,
            "drag" => self.drag = d.drag,
            "interactive" => self.interactive = d.interactive,
            "x-axis" => self.x_axis = d.x_axis,
            "y-axis" => self.y_axis = d.y_axis,
            "offset-x" => self.offset_x = d.offset_x,
            "offset-y" => self.offset_y = d.offset_y,
            "pad-left" => self.pad_left = d.pad_left,
            "pad-right" => self.pad_right = d.pad_right,
            "pad-top" => self.pad_top = d.pad_top,
            "pad-bottom" => self.pad_bottom = d.pad_bottom,
            "bounds-x" => self.bounds_x = d.bounds_x,
            "bounds-y" => self.bounds_y = d.bounds_y,
            "bounds-width" => self.bounds_width = d.bounds_width,
            "bounds-height" => self.bounds_height = d.bounds_height,
            "auto-calculate-bounds" => self.auto_calculate_bounds = d.auto_calculate_bounds,
            "fit" => self.fit = d.fit,
            "offscreen" => self.offscreen = d.offscreen,
            "clip" => self.clip = d.clip,
            "pages" => self.pages = d.pages,
            "manual-start" => self.manual_start = d.manual_start,
            "start-when-visible" => self.start_when_visible = d.start_when_visible,
            "debug" => self.debug = d.debug,
            "spinner" => self.spinner = d.spinner,
            _ => {}
        }
    }

    /// Checks that assets can be located: an atlas and skeleton pair, or inline raw data.
    pub fn validate(&self) -> Result<(), Error> {
        if self.raw_data.is_some() {
            return Ok(());
        }
        if self.atlas_path.is_none() {
            return Err(Error::MissingAttribute {
                name: "atlas".to_string(),
            });
        }
        if self.skeleton_path.is_none() {
            return Err(Error::MissingAttribute {
                name: "skeleton".to_string(),
            });
        }
        Ok(())
    }

    pub fn fit_params(&self) -> FitParams {
        FitParams {
            mode: self.fit,
            scale: self.scale,
            padding: [self.pad_left, self.pad_right, self.pad_top, self.pad_bottom],
            axis: [self.x_axis, self.y_axis],
            offset: [self.offset_x, self.offset_y],
        }
    }

    /// Fixed bounds from the `bounds-*` attributes, when both sizes are set.
    pub fn fixed_bounds(&self) -> Option<Bounds> {
        (self.bounds_width > 0.0 && self.bounds_height > 0.0).then(|| {
            Bounds::new(
                self.bounds_x,
                self.bounds_y,
                self.bounds_width,
                self.bounds_height,
            )
        })
    }

    pub fn bounds_provider(&self) -> Box<dyn BoundsProvider> {
        if let Some(bounds) = self.fixed_bounds() {
            return Box::new(RectangleBounds(bounds));
        }
        if !self.animation_bounds.is_empty() {
            return Box::new(SkinsAndAnimationBounds {
                animations: self.animation_bounds.clone(),
                skins: self.skin.clone(),
                time_step: DEFAULT_TIME_STEP,
                clip: false,
            });
        }
        Box::new(SetupPoseBounds { clip: false })
    }

    /// Animation sequences to run: the `animations` grammar, or the `animation` shorthand
    /// looping on track 0.
    pub fn animation_sequences(&self) -> AnimationsConfig {
        if !self.animations.is_empty() {
            return self.animations.clone();
        }
        match &self.animation {
            Some(name) => {
                let mut config = AnimationsConfig::default();
                config
                    .tracks
                    .entry(0)
                    .or_default()
                    .entries
                    .push(crate::AnimationEntry {
                        animation: Some(name.clone()),
                        looping: true,
                        delay: None,
                        mix_duration: None,
                    });
                config
            }
            None => AnimationsConfig::default(),
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

pub(crate) fn parse_bool(value: &str) -> bool {
    value.trim() != "false"
}

fn parse_number(name: &str, value: &str) -> Result<f32, Error> {
    value
        .trim()
        .parse::<f32>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| Error::invalid_attribute(name, value, "expected a number"))
}

fn parse_string_array(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_index_array(name: &str, value: &str) -> Result<Vec<usize>, Error> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<usize>().map_err(|_| {
                Error::invalid_attribute(name, value, format!("'{s}' is not a page index"))
            })
        })
        .collect()
}

fn parse_object(name: &str, value: &str) -> Result<serde_json::Value, Error> {
    let parsed: serde_json::Value = serde_json::from_str(value)
        .map_err(|err| Error::invalid_attribute(name, value, err.to_string()))?;
    if !parsed.is_object() {
        return Err(Error::invalid_attribute(name, value, "expected a JSON object"));
    }
    Ok(parsed)
}
