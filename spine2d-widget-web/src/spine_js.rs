//! [`SkeletonPose`] and [`AnimationState`] over spine-core (4.2) JS objects.

use crate::{
    AttachmentRecord, BoneRecord, PoseSnapshot, SlotRecord, blend_mode_from_ordinal,
    classify_attachment, physics_ordinal,
};
use js_sys::{Array, Float32Array, Function, Object, Reflect};
use spine2d_widget::{
    AnimationInfo, AnimationState, AttachmentKind, BoneTransform, Color, Error, Physics,
    REGION_TRIANGLES, SkeletonPose, TrackEntryId,
};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

// spine-core `MixBlend.setup` and `MixDirection.mixIn`.
const MIX_BLEND_SETUP: u32 = 0;
const MIX_DIRECTION_IN: u32 = 0;

fn get(target: &JsValue, key: &str) -> JsValue {
    Reflect::get(target, &JsValue::from_str(key)).unwrap_or(JsValue::UNDEFINED)
}

fn set(target: &JsValue, key: &str, value: JsValue) {
    if let Err(err) = Reflect::set(target, &JsValue::from_str(key), &value) {
        log::warn!("cannot set '{key}': {}", describe(&err));
    }
}

fn number(target: &JsValue, key: &str) -> f32 {
    get(target, key).as_f64().unwrap_or(0.0) as f32
}

fn string(target: &JsValue, key: &str) -> String {
    get(target, key).as_string().unwrap_or_default()
}

fn present(value: &JsValue) -> bool {
    !value.is_undefined() && !value.is_null()
}

fn call(target: &JsValue, method: &str, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let function: Function = get(target, method)
        .dyn_into()
        .map_err(|_| JsValue::from_str(&format!("'{method}' is not a function")))?;
    let args: Array = args.iter().collect();
    function.apply(target, &args)
}

fn call_logged(target: &JsValue, method: &str, args: &[JsValue]) -> JsValue {
    call(target, method, args).unwrap_or_else(|err| {
        log::warn!("{method} failed: {}", describe(&err));
        JsValue::UNDEFINED
    })
}

pub(crate) fn describe(err: &JsValue) -> String {
    err.as_string()
        .or_else(|| get(err, "message").as_string())
        .unwrap_or_else(|| format!("{err:?}"))
}

fn color(value: &JsValue) -> Color {
    [
        number(value, "r"),
        number(value, "g"),
        number(value, "b"),
        number(value, "a"),
    ]
}

/// `data.index` of a bone or slot.
fn data_index(object: &JsValue) -> Option<usize> {
    get(&get(object, "data"), "index").as_f64().map(|i| i as usize)
}

fn floats(value: &JsValue) -> Vec<f32> {
    if !present(value) {
        return Vec::new();
    }
    Array::from(value)
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0) as f32)
        .collect()
}

fn shorts(value: &JsValue) -> Vec<u16> {
    if !present(value) {
        return Vec::new();
    }
    Array::from(value)
        .iter()
        .filter_map(|v| v.as_f64())
        .map(|v| v as u16)
        .collect()
}

fn array_items(target: &JsValue, key: &str) -> Vec<JsValue> {
    let value = get(target, key);
    if !Array::is_array(&value) {
        return Vec::new();
    }
    Array::from(&value).iter().collect()
}

/// A spine-core `Skeleton` read through a refreshed [`PoseSnapshot`].
pub struct JsSkeleton {
    skeleton: JsValue,
    snapshot: PoseSnapshot,
    skins: Vec<String>,
}

impl JsSkeleton {
    pub fn new(skeleton: JsValue) -> Result<Self, Error> {
        if !skeleton.is_object() {
            return Err(Error::InvalidValue {
                message: "skeleton is not an object".to_string(),
            });
        }
        let bones = array_items(&skeleton, "bones")
            .iter()
            .map(|bone| BoneRecord {
                name: string(&get(bone, "data"), "name"),
                transform: BoneTransform::identity(),
            })
            .collect();
        let slots = array_items(&skeleton, "slots")
            .iter()
            .map(|slot| SlotRecord {
                name: string(&get(slot, "data"), "name"),
                bone: data_index(&get(slot, "bone")).unwrap_or(0),
                color: [1.0; 4],
                dark_color: None,
                blend: blend_mode_from_ordinal(
                    get(&get(slot, "data"), "blendMode").as_f64().unwrap_or(0.0) as u32,
                ),
                attachment: None,
            })
            .collect();
        let animations = array_items(&get(&skeleton, "data"), "animations")
            .iter()
            .enumerate()
            .map(|(index, animation)| AnimationInfo {
                index,
                name: string(animation, "name"),
                duration: number(animation, "duration"),
            })
            .collect();
        let skins = {
            let skin = get(&skeleton, "skin");
            if present(&skin) {
                vec![string(&skin, "name")]
            } else {
                Vec::new()
            }
        };

        let mut skeleton = Self {
            skeleton,
            snapshot: PoseSnapshot::new(bones, slots, animations),
            skins,
        };
        skeleton.refresh();
        Ok(skeleton)
    }

    pub fn js(&self) -> &JsValue {
        &self.skeleton
    }

    /// Re-reads bone transforms, slot state, draw order and attachment world vertices.
    fn refresh(&mut self) {
        let bones = array_items(&self.skeleton, "bones");
        for (record, bone) in self.snapshot.bones.iter_mut().zip(&bones) {
            let scale_x = get(bone, "ascaleX");
            let scale_y = get(bone, "ascaleY");
            record.transform = BoneTransform {
                parent: data_index(&get(bone, "parent")),
                active: get(bone, "active").as_bool().unwrap_or(true),
                a: number(bone, "a"),
                b: number(bone, "b"),
                c: number(bone, "c"),
                d: number(bone, "d"),
                world_x: number(bone, "worldX"),
                world_y: number(bone, "worldY"),
                scale_x: scale_x.as_f64().map_or_else(|| number(bone, "scaleX"), |v| v as f32),
                scale_y: scale_y.as_f64().map_or_else(|| number(bone, "scaleY"), |v| v as f32),
            };
        }

        let slots = array_items(&self.skeleton, "slots");
        let mut world = Vec::new();
        for (index, slot) in slots.iter().enumerate() {
            let attachment = call(slot, "getAttachment", &[]).unwrap_or(JsValue::NULL);
            let Some(record) = self.snapshot.slots.get_mut(index) else {
                break;
            };
            record.color = color(&get(slot, "color"));
            let dark = get(slot, "darkColor");
            record.dark_color = present(&dark).then(|| {
                let [r, g, b, _] = color(&dark);
                [r, g, b]
            });

            if !present(&attachment) {
                record.attachment = None;
                continue;
            }
            let previous = record.attachment.take();
            let next = read_attachment(&attachment, previous);
            world.clear();
            world.resize(next.world_vertices_length, 0.0);
            compute_world_vertices(&self.skeleton, slot, &attachment, next.kind, &mut world);
            record.attachment = Some(next);
            self.snapshot.set_world_vertices(index, &world);
        }

        self.snapshot.draw_order = array_items(&self.skeleton, "drawOrder")
            .iter()
            .filter_map(data_index)
            .collect();
    }

    fn find_skin(&self, name: &str) -> Option<JsValue> {
        let skin = call(&get(&self.skeleton, "data"), "findSkin", &[JsValue::from_str(name)]).ok()?;
        present(&skin).then_some(skin)
    }
}

fn read_attachment(attachment: &JsValue, previous: Option<AttachmentRecord>) -> AttachmentRecord {
    let name = string(attachment, "name");
    let kind = classify_attachment(
        Reflect::has(attachment, &JsValue::from_str("endSlot")).unwrap_or(false),
        present(&get(attachment, "triangles")),
        present(&get(attachment, "offset")),
    );
    let attachment_color = color(&get(attachment, "color"));

    // Texture coordinates and triangles only change with the attachment.
    if let Some(mut previous) = previous.filter(|p| p.name == name && p.kind == kind) {
        previous.color = attachment_color;
        return previous;
    }

    let page = get(&get(attachment, "region"), "page");
    let texture = string(&page, "name");
    let premultiplied_alpha = get(&page, "pma").as_bool().unwrap_or(false);
    let world_vertices_length = get(attachment, "worldVerticesLength")
        .as_f64()
        .map_or(0, |n| n as usize);

    let (uvs, triangles, world_vertices_length, hull_length) = match kind {
        AttachmentKind::Region => (
            floats(&get(attachment, "uvs")),
            REGION_TRIANGLES.to_vec(),
            8,
            8,
        ),
        AttachmentKind::Mesh => (
            floats(&get(attachment, "uvs")),
            shorts(&get(attachment, "triangles")),
            world_vertices_length,
            get(attachment, "hullLength").as_f64().map_or(0, |n| n as usize),
        ),
        AttachmentKind::Clipping => (
            Vec::new(),
            Vec::new(),
            world_vertices_length,
            world_vertices_length,
        ),
        AttachmentKind::Other => (Vec::new(), Vec::new(), 0, 0),
    };
    let end_slot = get(&get(attachment, "endSlot"), "index")
        .as_f64()
        .map(|i| i as usize);

    AttachmentRecord {
        name,
        kind,
        texture,
        premultiplied_alpha,
        color: attachment_color,
        uvs,
        triangles,
        world_vertices_length,
        hull_length,
        end_slot,
    }
}

fn compute_world_vertices(
    skeleton: &JsValue,
    slot: &JsValue,
    attachment: &JsValue,
    kind: AttachmentKind,
    out: &mut [f32],
) {
    if out.is_empty() {
        return;
    }
    let buffer = Float32Array::new_with_length(out.len() as u32);
    let result = match kind {
        AttachmentKind::Region => call(
            attachment,
            "computeWorldVertices",
            &[slot.clone(), buffer.clone().into(), 0.into(), 2.into()],
        ),
        AttachmentKind::Mesh | AttachmentKind::Clipping => call(
            attachment,
            "computeWorldVertices",
            &[
                skeleton.clone(),
                slot.clone(),
                0.into(),
                (out.len() as u32).into(),
                buffer.clone().into(),
                0.into(),
                2.into(),
            ],
        ),
        AttachmentKind::Other => return,
    };
    match result {
        Ok(_) => buffer.copy_to(out),
        Err(err) => log::warn!("computeWorldVertices failed: {}", describe(&err)),
    }
}

impl SkeletonPose for JsSkeleton {
    fn draw_order(&self) -> &[usize] {
        &self.snapshot.draw_order
    }

    fn slot_count(&self) -> usize {
        self.snapshot.slots.len()
    }

    fn slot(&self, index: usize) -> Option<spine2d_widget::SlotView<'_>> {
        self.snapshot.slot_view(index)
    }

    fn bone(&self, index: usize) -> Option<BoneTransform> {
        self.snapshot.bone(index)
    }

    fn find_bone(&self, name: &str) -> Option<usize> {
        self.snapshot.find_bone(name)
    }

    fn find_slot(&self, name: &str) -> Option<usize> {
        self.snapshot.find_slot(name)
    }

    fn find_animation(&self, name: &str) -> Option<AnimationInfo> {
        self.snapshot.find_animation(name)
    }

    fn color(&self) -> Color {
        color(&get(&self.skeleton, "color"))
    }

    fn scale(&self) -> [f32; 2] {
        [number(&self.skeleton, "scaleX"), number(&self.skeleton, "scaleY")]
    }

    fn set_scale(&mut self, scale_x: f32, scale_y: f32) {
        set(&self.skeleton, "scaleX", scale_x.into());
        set(&self.skeleton, "scaleY", scale_y.into());
    }

    fn compute_world_vertices(&self, slot: usize, out: &mut [f32]) -> usize {
        self.snapshot.copy_world_vertices(slot, out)
    }

    fn set_to_setup_pose(&mut self) {
        call_logged(&self.skeleton, "setToSetupPose", &[]);
        self.refresh();
    }

    fn update(&mut self, delta: f32) {
        call_logged(&self.skeleton, "update", &[delta.into()]);
    }

    fn time(&self) -> f32 {
        number(&self.skeleton, "time")
    }

    fn update_world_transform(&mut self, physics: Physics) {
        call_logged(
            &self.skeleton,
            "updateWorldTransform",
            &[physics_ordinal(physics).into()],
        );
        self.refresh();
    }

    fn physics_translate(&mut self, x: f32, y: f32) {
        call_logged(&self.skeleton, "physicsTranslate", &[x.into(), y.into()]);
    }

    fn has_skin(&self, name: &str) -> bool {
        self.find_skin(name).is_some()
    }

    fn skins(&self) -> Vec<String> {
        self.skins.clone()
    }

    fn set_skins(&mut self, names: &[String]) -> Result<(), Error> {
        let skins = names
            .iter()
            .map(|name| {
                self.find_skin(name).ok_or_else(|| Error::UnknownSkin { name: name.clone() })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let skin = match skins.as_slice() {
            [] => return Ok(()),
            [single] => single.clone(),
            [first, ..] => {
                let constructor: Function = get(first, "constructor")
                    .dyn_into()
                    .map_err(|_| invalid("skin has no constructor"))?;
                let name = JsValue::from_str("custom");
                let combined =
                    Reflect::construct(&constructor, &Array::of1(&name)).map_err(js_failure)?;
                for skin in &skins {
                    call(&combined, "addSkin", &[skin.clone()]).map_err(js_failure)?;
                }
                combined
            }
        };
        call(&self.skeleton, "setSkin", &[skin]).map_err(js_failure)?;
        call_logged(&self.skeleton, "setSlotsToSetupPose", &[]);
        self.skins = names.to_vec();
        self.refresh();
        Ok(())
    }

    fn apply_animation(&mut self, animation: usize, time: f32) {
        let Some(animation) = array_items(&get(&self.skeleton, "data"), "animations")
            .into_iter()
            .nth(animation)
        else {
            return;
        };
        call_logged(
            &animation,
            "apply",
            &[
                self.skeleton.clone(),
                time.into(),
                time.into(),
                false.into(),
                JsValue::NULL,
                1.0f32.into(),
                MIX_BLEND_SETUP.into(),
                MIX_DIRECTION_IN.into(),
            ],
        );
    }

    fn set_bone_world_position(&mut self, bone: usize, x: f32, y: f32) {
        let Some(bone) = array_items(&self.skeleton, "bones").into_iter().nth(bone) else {
            return;
        };
        let parent = get(&bone, "parent");
        let point: JsValue = Object::new().into();
        set(&point, "x", x.into());
        set(&point, "y", y.into());
        if present(&parent) {
            call_logged(&parent, "worldToLocal", &[point.clone()]);
        }
        set(&bone, "x", get(&point, "x"));
        set(&bone, "y", get(&point, "y"));
    }
}

fn invalid(message: &str) -> Error {
    Error::InvalidValue {
        message: message.to_string(),
    }
}

fn js_failure(err: JsValue) -> Error {
    invalid(&describe(&err))
}

/// A spine-core `AnimationState`. Track entries are identified by the order they were queued.
pub struct JsAnimationState {
    state: JsValue,
    listener: JsValue,
    entries: Vec<(TrackEntryId, JsValue)>,
    next_id: u64,
    completed: Rc<RefCell<Vec<JsValue>>>,
    disposed: Rc<RefCell<Vec<JsValue>>>,
    time: f32,
    _callbacks: [Closure<dyn FnMut(JsValue)>; 2],
}

impl JsAnimationState {
    pub fn new(state: JsValue) -> Result<Self, Error> {
        if !state.is_object() {
            return Err(invalid("animation state is not an object"));
        }
        let completed = Rc::new(RefCell::new(Vec::new()));
        let disposed = Rc::new(RefCell::new(Vec::new()));

        let on_complete = {
            let completed = completed.clone();
            Closure::wrap(Box::new(move |entry: JsValue| {
                completed.borrow_mut().push(entry);
            }) as Box<dyn FnMut(JsValue)>)
        };
        let on_dispose = {
            let disposed = disposed.clone();
            Closure::wrap(Box::new(move |entry: JsValue| {
                disposed.borrow_mut().push(entry);
            }) as Box<dyn FnMut(JsValue)>)
        };
        let listener: JsValue = Object::new().into();
        let complete: &JsValue = on_complete.as_ref();
        let dispose: &JsValue = on_dispose.as_ref();
        set(&listener, "complete", complete.clone());
        set(&listener, "dispose", dispose.clone());
        call(&state, "addListener", &[listener.clone()]).map_err(js_failure)?;

        Ok(Self {
            state,
            listener,
            entries: Vec::new(),
            next_id: 0,
            completed,
            disposed,
            time: 0.0,
            _callbacks: [on_complete, on_dispose],
        })
    }

    fn track(&mut self, entry: JsValue) -> TrackEntryId {
        let id = TrackEntryId(self.next_id);
        self.next_id += 1;
        if present(&entry) {
            self.entries.push((id, entry));
        }
        id
    }

    fn ensure_animation(&self, name: &str) -> Result<(), Error> {
        let data = get(&get(&self.state, "data"), "skeletonData");
        let found = call(&data, "findAnimation", &[JsValue::from_str(name)]).unwrap_or(JsValue::NULL);
        if present(&found) {
            Ok(())
        } else {
            Err(Error::UnknownAnimation {
                name: name.to_string(),
            })
        }
    }

    fn id_of(&self, entry: &JsValue) -> Option<TrackEntryId> {
        self.entries
            .iter()
            .find(|(_, queued)| Object::is(queued, entry))
            .map(|(id, _)| *id)
    }
}

impl Drop for JsAnimationState {
    fn drop(&mut self) {
        call_logged(&self.state, "removeListener", &[self.listener.clone()]);
    }
}

impl AnimationState for JsAnimationState {
    type Skeleton = JsSkeleton;

    fn update(&mut self, delta: f32) {
        self.time += delta;
        call_logged(&self.state, "update", &[delta.into()]);
    }

    fn apply(&mut self, skeleton: &mut JsSkeleton) -> bool {
        call_logged(&self.state, "apply", &[skeleton.js().clone()])
            .as_bool()
            .unwrap_or(false)
    }

    fn time(&self) -> f32 {
        self.time
    }

    fn set_animation(
        &mut self,
        track: usize,
        animation: &str,
        looping: bool,
    ) -> Result<TrackEntryId, Error> {
        self.ensure_animation(animation)?;
        let entry = call(
            &self.state,
            "setAnimation",
            &[(track as u32).into(), animation.into(), looping.into()],
        )
        .map_err(js_failure)?;
        Ok(self.track(entry))
    }

    fn add_animation(
        &mut self,
        track: usize,
        animation: &str,
        looping: bool,
        delay: f32,
    ) -> Result<TrackEntryId, Error> {
        self.ensure_animation(animation)?;
        let entry = call(
            &self.state,
            "addAnimation",
            &[(track as u32).into(), animation.into(), looping.into(), delay.into()],
        )
        .map_err(js_failure)?;
        Ok(self.track(entry))
    }

    fn set_empty_animation(&mut self, track: usize, mix_duration: f32) -> TrackEntryId {
        let entry = call_logged(
            &self.state,
            "setEmptyAnimation",
            &[(track as u32).into(), mix_duration.into()],
        );
        self.track(entry)
    }

    fn add_empty_animation(&mut self, track: usize, mix_duration: f32, delay: f32) -> TrackEntryId {
        let entry = call_logged(
            &self.state,
            "addEmptyAnimation",
            &[(track as u32).into(), mix_duration.into(), delay.into()],
        );
        self.track(entry)
    }

    fn set_mix_duration(&mut self, entry: TrackEntryId, mix_duration: f32) {
        if let Some((_, entry)) = self.entries.iter().find(|(id, _)| *id == entry) {
            set(entry, "mixDuration", mix_duration.into());
        }
    }

    fn set_default_mix(&mut self, mix_duration: f32) {
        set(&get(&self.state, "data"), "defaultMix", mix_duration.into());
    }

    fn clear_tracks(&mut self) {
        call_logged(&self.state, "clearTracks", &[]);
        self.entries.clear();
        self.completed.borrow_mut().clear();
        self.disposed.borrow_mut().clear();
    }

    fn take_completed(&mut self) -> Vec<TrackEntryId> {
        let completed: Vec<JsValue> = self.completed.borrow_mut().drain(..).collect();
        let ids = completed.iter().filter_map(|entry| self.id_of(entry)).collect();

        let disposed: Vec<JsValue> = self.disposed.borrow_mut().drain(..).collect();
        self.entries
            .retain(|(_, queued)| !disposed.iter().any(|gone| Object::is(queued, gone)));
        ids
    }
}
