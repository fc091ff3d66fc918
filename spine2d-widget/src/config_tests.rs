use crate::test_rig::TestSkeleton;
use crate::{
    ATTRIBUTES, AttributeKind, Bounds, BoundsEstimator, BoundsProvider, Error, FitMode,
    OffScreenPolicy, OverlayConfig, WidgetConfig, attribute_kind,
};

fn config(attributes: &[(&str, &str)]) -> WidgetConfig {
    WidgetConfig::from_attributes(attributes.iter().copied()).unwrap()
}

#[test]
fn overlay_defaults() {
    let config = OverlayConfig::default();
    assert_eq!(config.overflow_top, 0.2);
    assert_eq!(config.overflow_bottom, 0.0);
    assert_eq!(config.max_canvas_width, 7000.0);
    assert!(config.append_to_body);
}

#[test]
fn overlay_reads_partial_json() {
    let config = OverlayConfig::from_json(r#"{ "overflow-left": 0.1, "append-to-body": false }"#).unwrap();
    assert_eq!(config.overflow_left, 0.1);
    assert!(!config.append_to_body);
    assert_eq!(config.overflow_top, 0.2);

    let err = OverlayConfig::from_json(r#"{ "overflow-top": "lots" }"#).unwrap_err();
    assert!(matches!(err, Error::InvalidValue { .. }));
}

#[test]
fn overlay_attributes_set_and_reset() {
    let mut config = OverlayConfig::default();
    assert!(config.set_attribute("overflow-top", Some("0.5")).unwrap());
    assert!(config.set_attribute("append-to-body", Some("false")).unwrap());
    assert_eq!(config.overflow_top, 0.5);
    assert!(!config.append_to_body);

    assert!(config.set_attribute("overflow-top", None).unwrap());
    assert_eq!(config.overflow_top, 0.2);
    assert!(!config.set_attribute("fit", Some("cover")).unwrap());
    assert!(config.set_attribute("overflow-right", Some("wide")).is_err());
}

#[test]
fn every_attribute_has_a_kind() {
    assert_eq!(ATTRIBUTES.len(), 36);
    assert_eq!(attribute_kind("fit"), Some(AttributeKind::FitMode));
    assert_eq!(attribute_kind("raw-data"), Some(AttributeKind::Object));
    assert_eq!(attribute_kind("colour"), None);

    let mut config = WidgetConfig::default();
    for (name, _) in ATTRIBUTES {
        assert!(config.set_attribute(name, None).unwrap(), "{name} not handled");
    }
    assert_eq!(config, WidgetConfig::default());
}

#[test]
fn attributes_parse_by_kind() {
    let config = config(&[
        ("atlas", "assets/hero.atlas"),
        ("skeleton", "assets/hero.skel"),
        ("scale", "0.5"),
        ("skin", "default, hat ,"),
        ("drag", ""),
        ("interactive", "false"),
        ("fit", "cover"),
        ("offscreen", "update"),
        ("pages", "0,2"),
        ("pad-left", "0.1"),
        ("animations", "[0,walk,true]"),
        ("raw-data", r#"{"hero.atlas": "data"}"#),
        ("data-unrelated", "x"),
    ]);

    assert_eq!(config.atlas_path.as_deref(), Some("assets/hero.atlas"));
    assert_eq!(config.scale, 0.5);
    assert_eq!(config.skin, vec!["default".to_string(), "hat".to_string()]);
    assert!(config.drag, "present boolean attributes are true");
    assert!(!config.interactive);
    assert_eq!(config.fit, FitMode::Cover);
    assert_eq!(config.offscreen, OffScreenPolicy::Update);
    assert_eq!(config.pages, Some(vec![0, 2]));
    assert_eq!(config.fit_params().padding, [0.1, 0.0, 0.0, 0.0]);
    assert!(!config.animations.is_empty());
    assert!(config.raw_data.is_some());
}

#[test]
fn malformed_values_are_reported() {
    let mut config = WidgetConfig::default();
    let err = config.set_attribute("scale", Some("big")).unwrap_err();
    assert!(matches!(err, Error::InvalidAttribute { ref name, .. } if name == "scale"));

    let err = config.set_attribute("fit", Some("stretch")).unwrap_err();
    assert!(matches!(err, Error::InvalidAttribute { ref name, .. } if name == "fit"));

    assert!(config.set_attribute("pages", Some("0,first")).is_err());
    assert!(config.set_attribute("raw-data", Some("[1, 2]")).is_err());
    assert!(matches!(
        config.set_attribute("animations", Some("[zero,walk]")),
        Err(Error::InvalidAnimationSequence { .. })
    ));
    assert_eq!(config, WidgetConfig::default());
}

#[test]
fn validation_requires_assets() {
    assert!(matches!(
        WidgetConfig::default().validate(),
        Err(Error::MissingAttribute { name }) if name == "atlas"
    ));
    assert!(matches!(
        config(&[("atlas", "a.atlas")]).validate(),
        Err(Error::MissingAttribute { name }) if name == "skeleton"
    ));
    assert!(config(&[("atlas", "a.atlas"), ("skeleton", "a.json")]).validate().is_ok());
    assert!(config(&[("raw-data", "{}")]).validate().is_ok());
}

#[test]
fn bounds_provider_follows_precedence() {
    let mut skeleton = TestSkeleton::standard();
    let mut estimator = BoundsEstimator::new();

    let fixed = config(&[
        ("bounds-x", "1"),
        ("bounds-y", "2"),
        ("bounds-width", "3"),
        ("bounds-height", "4"),
        ("animation-bounds", "walk"),
    ]);
    assert_eq!(fixed.fixed_bounds(), Some(Bounds::new(1.0, 2.0, 3.0, 4.0)));
    assert_eq!(
        fixed.bounds_provider().calculate_bounds(&mut skeleton, &mut estimator),
        Bounds::new(1.0, 2.0, 3.0, 4.0)
    );

    let animated = config(&[("bounds-width", "3"), ("animation-bounds", "walk")]);
    assert_eq!(animated.fixed_bounds(), None);
    let bounds = animated.bounds_provider().calculate_bounds(&mut skeleton, &mut estimator);
    assert!(bounds.width > 100.0);

    let setup = WidgetConfig::default()
        .bounds_provider()
        .calculate_bounds(&mut skeleton, &mut estimator);
    assert_eq!(setup.width, 50.0);
}

#[test]
fn animation_shorthand_loops_on_track_zero() {
    let shorthand = config(&[("animation", "walk")]).animation_sequences();
    let entries = &shorthand.tracks[&0].entries;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].animation.as_deref(), Some("walk"));
    assert!(entries[0].looping);

    let both = config(&[("animation", "walk"), ("animations", "[1,idle]")]).animation_sequences();
    assert!(!both.tracks.contains_key(&0));
    assert!(both.tracks.contains_key(&1));

    assert!(WidgetConfig::default().animation_sequences().is_empty());
}
