use crate::{
    AttachmentRecord, BoneRecord, PoseSnapshot, SlotRecord, blend_mode_from_ordinal,
    classify_attachment, physics_ordinal,
};
use spine2d_widget::{AnimationInfo, AttachmentKind, BlendMode, BoneTransform, Physics};

fn body() -> AttachmentRecord {
    AttachmentRecord {
        name: "body".to_string(),
        kind: AttachmentKind::Region,
        texture: "page.png".to_string(),
        premultiplied_alpha: true,
        color: [1.0; 4],
        uvs: vec![0.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0],
        triangles: Vec::new(),
        world_vertices_length: 8,
        hull_length: 8,
        end_slot: None,
    }
}

fn snapshot() -> PoseSnapshot {
    let bones = vec![
        BoneRecord {
            name: "root".to_string(),
            transform: BoneTransform::identity(),
        },
        BoneRecord {
            name: "hip".to_string(),
            transform: BoneTransform {
                parent: Some(0),
                world_y: 20.0,
                ..BoneTransform::identity()
            },
        },
    ];
    let slots = vec![
        SlotRecord {
            name: "body".to_string(),
            bone: 1,
            color: [1.0; 4],
            dark_color: None,
            blend: BlendMode::Normal,
            attachment: Some(body()),
        },
        SlotRecord {
            name: "empty".to_string(),
            bone: 0,
            color: [1.0; 4],
            dark_color: Some([0.1, 0.2, 0.3]),
            blend: BlendMode::Additive,
            attachment: None,
        },
    ];
    let animations = vec![AnimationInfo {
        index: 0,
        name: "walk".to_string(),
        duration: 1.25,
    }];
    PoseSnapshot::new(bones, slots, animations)
}

#[test]
fn lookups_by_name() {
    let snapshot = snapshot();
    assert_eq!(snapshot.find_bone("hip"), Some(1));
    assert_eq!(snapshot.find_bone("tail"), None);
    assert_eq!(snapshot.find_slot("empty"), Some(1));
    assert_eq!(snapshot.find_animation("walk").map(|a| a.duration), Some(1.25));
    assert!(snapshot.find_animation("run").is_none());
    assert_eq!(snapshot.bone(1).map(|b| b.world_y), Some(20.0));
    assert_eq!(snapshot.draw_order, vec![0, 1]);
}

#[test]
fn slot_views_borrow_records() {
    let snapshot = snapshot();
    let view = snapshot.slot_view(0).expect("body slot");
    assert_eq!(view.name, "body");
    assert_eq!(view.bone, 1);
    let attachment = view.attachment.expect("attachment");
    assert_eq!(attachment.texture, "page.png");
    assert!(attachment.premultiplied_alpha);
    assert_eq!(attachment.world_vertices_length, 8);

    let empty = snapshot.slot_view(1).expect("empty slot");
    assert!(empty.attachment.is_none());
    assert_eq!(empty.blend, BlendMode::Additive);
    assert!(snapshot.slot_view(2).is_none());
}

#[test]
fn world_vertices_copy_into_caller_buffer() {
    let mut snapshot = snapshot();
    snapshot.set_world_vertices(0, &[-5.0, 15.0, 5.0, 15.0, 5.0, 25.0, -5.0, 25.0]);

    let mut out = [0.0; 10];
    assert_eq!(snapshot.copy_world_vertices(0, &mut out), 8);
    assert_eq!(&out[..4], &[-5.0, 15.0, 5.0, 15.0]);

    let mut short = [0.0; 4];
    assert_eq!(snapshot.copy_world_vertices(0, &mut short), 4);
    assert_eq!(snapshot.copy_world_vertices(1, &mut out), 0);
    assert_eq!(snapshot.copy_world_vertices(9, &mut out), 0);

    snapshot.set_world_vertices(0, &[1.0, 2.0]);
    assert_eq!(snapshot.copy_world_vertices(0, &mut out), 2);
}

#[test]
fn enum_ordinals_follow_runtime() {
    assert_eq!(blend_mode_from_ordinal(0), BlendMode::Normal);
    assert_eq!(blend_mode_from_ordinal(3), BlendMode::Screen);
    assert_eq!(blend_mode_from_ordinal(42), BlendMode::Normal);
    assert_eq!(physics_ordinal(Physics::None), 0);
    assert_eq!(physics_ordinal(Physics::Pose), 3);
}

#[test]
fn attachment_classification() {
    assert_eq!(classify_attachment(true, true, false), AttachmentKind::Clipping);
    assert_eq!(classify_attachment(false, true, false), AttachmentKind::Mesh);
    assert_eq!(classify_attachment(false, false, true), AttachmentKind::Region);
    assert_eq!(classify_attachment(false, false, false), AttachmentKind::Other);
}
