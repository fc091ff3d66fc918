use crate::test_rig::assert_approx;
use crate::{Bounds, FitMode, FitParams, HostRect, OverlayConfig, ViewportMapper, fit_layout};

fn mapper(dpr: f32) -> ViewportMapper {
    let config = OverlayConfig {
        overflow_top: 0.0,
        ..OverlayConfig::default()
    };
    let mut mapper = ViewportMapper::new(config);
    mapper.set_device_pixel_ratio(dpr);
    mapper.compute_viewport_size(800.0, 600.0);
    let [w, h] = mapper.canvas_css_size();
    mapper.resize(w, h);
    mapper
}

fn params(mode: FitMode) -> FitParams {
    FitParams {
        mode,
        ..FitParams::default()
    }
}

const HOST: HostRect = HostRect {
    left: 100.0,
    top: 100.0,
    width: 200.0,
    height: 100.0,
};

const BOUNDS: Bounds = Bounds {
    x: -25.0,
    y: 0.0,
    width: 50.0,
    height: 50.0,
};

#[test]
fn fit_mode_parses_attribute_values() {
    assert_eq!("contain".parse::<FitMode>().unwrap(), FitMode::Contain);
    assert_eq!("scaleDown".parse::<FitMode>().unwrap(), FitMode::ScaleDown);
    assert_eq!(" origin ".parse::<FitMode>().unwrap(), FitMode::Origin);
    assert!("stretch".parse::<FitMode>().is_err());
    assert!(FitMode::None.is_dpr_scaled());
    assert!(!FitMode::Cover.is_dpr_scaled());
}

#[test]
fn contain_scales_to_smaller_ratio_and_centers_bounds() {
    let mapper = mapper(1.0);
    let layout = fit_layout(&mapper, &HOST, &BOUNDS, &params(FitMode::Contain), [1.0, 1.0]);
    assert_eq!(layout.scale, Some([2.0, 2.0]));

    let [cx, cy] = mapper.screen_to_world(200.0, 150.0);
    assert_approx(layout.world_offset[0], cx);
    assert_approx(layout.world_offset[1], cy - 50.0);
}

#[test]
fn ratio_modes_pick_expected_scale() {
    let mapper = mapper(1.0);
    let scale = |mode| {
        fit_layout(&mapper, &HOST, &BOUNDS, &params(mode), [1.0, 1.0])
            .scale
            .unwrap()
    };
    assert_eq!(scale(FitMode::Cover), [4.0, 4.0]);
    assert_eq!(scale(FitMode::Fill), [4.0, 2.0]);
    assert_eq!(scale(FitMode::Width), [4.0, 4.0]);
    assert_eq!(scale(FitMode::Height), [2.0, 2.0]);
    assert_eq!(scale(FitMode::ScaleDown), [1.0, 1.0]);
}

#[test]
fn user_scale_and_dpr_multiply_fit_scale() {
    let mapper = mapper(2.0);
    let fit = FitParams {
        scale: 0.5,
        ..FitParams::default()
    };
    let layout = fit_layout(&mapper, &HOST, &BOUNDS, &fit, [1.0, 1.0]);
    // Host is 400x200 backing pixels at DPR 2.
    assert_eq!(layout.scale, Some([2.0, 2.0]));
}

#[test]
fn padding_shrinks_area_and_shifts_anchor() {
    let mapper = mapper(1.0);
    let fit = FitParams {
        padding: [0.5, 0.0, 0.0, 0.0],
        mode: FitMode::Height,
        ..FitParams::default()
    };
    let layout = fit_layout(&mapper, &HOST, &BOUNDS, &fit, [1.0, 1.0]);
    assert_eq!(layout.scale, Some([2.0, 2.0]));

    let [cx, _] = mapper.screen_to_world(250.0, 150.0);
    assert_approx(layout.world_offset[0], cx);
}

#[test]
fn none_keeps_current_scale_and_origin_skips_centering() {
    let mapper = mapper(1.0);
    let none = fit_layout(&mapper, &HOST, &BOUNDS, &params(FitMode::None), [3.0, 3.0]);
    assert_eq!(none.scale, None);
    let [cx, cy] = mapper.screen_to_world(200.0, 150.0);
    assert_approx(none.world_offset[1], cy - 75.0);

    let origin = fit_layout(&mapper, &HOST, &BOUNDS, &params(FitMode::Origin), [3.0, 3.0]);
    assert_eq!(origin.scale, None);
    assert_approx(origin.world_offset[0], cx);
    assert_approx(origin.world_offset[1], cy);
}

#[test]
fn offset_and_axis_move_origin_in_screen_directions() {
    let mapper = mapper(1.0);
    let fit = FitParams {
        mode: FitMode::Origin,
        offset: [10.0, 20.0],
        axis: [0.25, 0.0],
        ..FitParams::default()
    };
    let layout = fit_layout(&mapper, &HOST, &BOUNDS, &fit, [1.0, 1.0]);
    let [cx, cy] = mapper.screen_to_world(250.0, 150.0);
    assert_approx(layout.world_offset[0], cx + 10.0);
    assert_approx(layout.world_offset[1], cy - 20.0);
}

#[test]
fn empty_bounds_keep_current_scale() {
    let mapper = mapper(1.0);
    let layout = fit_layout(&mapper, &HOST, &Bounds::ZERO, &params(FitMode::Contain), [1.5, 1.5]);
    assert_eq!(layout.scale, None);
}
