use super::*;
use crate::animation::anim::Animation;
use crate::animation::ease::Ease;
use crate::foundation::color::Color;
use crate::foundation::core::{Fps, Point};
use crate::scene::element::Element;

fn config(fps: u32) -> RenderConfig {
    RenderConfig {
        width: 64,
        height: 36,
        fps: Fps { num: fps, den: 1 },
        ..RenderConfig::default()
    }
}

#[test]
fn appear_scenario_produces_twenty_frames_and_settles_shown() {
    let mut reg = ElementRegistry::new();
    let a = reg.add(Element::candle(0, 10.0, 12.0, 9.0, 11.0));
    let mut tl = Timeline::new();
    tl.play([Animation::appear(vec![a])], 2.0, Ease::Linear)
        .unwrap();

    let scene = PreparedScene::prepare(config(10), &reg, Camera::default(), tl).unwrap();
    assert_eq!(scene.frame_count(), 20);

    let first = scene.frame_state(FrameIndex(0)).unwrap();
    assert!(!first.element(a).unwrap().is_shown());

    let last = scene.frame_state(FrameIndex(19)).unwrap();
    assert!((last.element(a).unwrap().opacity - 0.95).abs() < 1e-9);

    let end = scene.state_at(scene.total_duration()).unwrap();
    let e = end.element(a).unwrap();
    assert!(e.visible);
    assert_eq!(e.opacity, 1.0);
}

#[test]
fn wait_zero_terminated_scene_ends_fully_shown() {
    let mut reg = ElementRegistry::new();
    let a = reg.add(Element::candle(0, 10.0, 12.0, 9.0, 11.0));
    let mut tl = Timeline::new();
    tl.play([Animation::appear(vec![a])], 2.0, Ease::OutCubic)
        .unwrap();
    tl.wait(0.0).unwrap();

    let scene = PreparedScene::prepare(config(10), &reg, Camera::default(), tl).unwrap();
    assert_eq!(scene.frame_count(), 20);
    let end = scene.state_at(scene.total_duration()).unwrap();
    assert_eq!(end.element(a).unwrap().opacity, 1.0);
}

#[test]
fn entrance_targets_start_hidden_and_others_do_not() {
    let mut reg = ElementRegistry::new();
    let line = reg.add(Element::line(vec![Point::new(0.0, 1.0), Point::new(1.0, 2.0)]));
    let level = reg.add(Element::hline(5.0));
    let mut tl = Timeline::new();
    tl.wait(1.0).unwrap();
    tl.play(
        [Animation::draw(line), Animation::fade_out(level)],
        1.0,
        Ease::Linear,
    )
    .unwrap();

    let scene = PreparedScene::prepare(config(10), &reg, Camera::default(), tl).unwrap();
    let s = scene.state_at(0.5).unwrap();
    assert!(!s.element(line).unwrap().visible);
    assert!(s.element(level).unwrap().visible);
}

#[test]
fn concurrent_fade_and_draw_progress_together() {
    let mut reg = ElementRegistry::new();
    let e = reg.add(Element::hline(5.0));
    let l = reg.add(Element::line(vec![Point::new(0.0, 1.0), Point::new(1.0, 2.0)]));
    let mut tl = Timeline::new();
    tl.play([Animation::fade_in(e)], 1.0, Ease::Linear).unwrap();
    tl.play([Animation::draw(l)], 1.0, Ease::Linear).unwrap();

    let scene = PreparedScene::prepare(config(10), &reg, Camera::default(), tl).unwrap();
    assert_eq!(scene.timeline().directives()[1].start_time, 0.0);
    let mut s = scene.state_at(0.5).unwrap();
    assert_eq!(s.element(e).unwrap().opacity, 0.5);
    assert_eq!(
        s.element_mut(l).unwrap().draw_progress_mut().copied(),
        Some(0.5)
    );
}

#[test]
fn later_directive_wins_on_shared_property() {
    let mut reg = ElementRegistry::new();
    let l = reg.add(Element::line(vec![Point::new(0.0, 1.0)]));
    let red = Color::rgba(1.0, 0.0, 0.0, 1.0);
    let green = Color::rgba(0.0, 1.0, 0.0, 1.0);
    let mut tl = Timeline::new();
    tl.play(
        [Animation::ColorShift {
            target: l,
            to: red,
            from: Some(red),
        }],
        2.0,
        Ease::Linear,
    )
    .unwrap();
    tl.play(
        [Animation::ColorShift {
            target: l,
            to: green,
            from: Some(green),
        }],
        1.0,
        Ease::Linear,
    )
    .unwrap();
    tl.play([Animation::pan(0.0, 10.0)], 2.0, Ease::Linear).unwrap();
    tl.play([Animation::pan(20.0, 30.0)], 2.0, Ease::Linear).unwrap();

    let scene = PreparedScene::prepare(config(10), &reg, Camera::default(), tl).unwrap();
    let theme = &scene.config().theme;
    for t in [0.0, 0.5, 1.5, 3.0] {
        let s = scene.state_at(t).unwrap();
        assert_eq!(s.element(l).unwrap().color(theme), green, "t={t}");
    }
    let s = scene.state_at(2.0).unwrap();
    assert_eq!(s.camera.view_start, 20.0);
}

#[test]
fn end_state_persists_after_directive_finishes() {
    let mut reg = ElementRegistry::new();
    let z = reg.add(Element::zone(0.0, 5.0, 10.0, 20.0));
    let mut tl = Timeline::new();
    tl.play([Animation::highlight_zone(z)], 1.0, Ease::Linear)
        .unwrap();
    tl.wait(3.0).unwrap();

    let scene = PreparedScene::prepare(config(10), &reg, Camera::default(), tl).unwrap();
    let s = scene.state_at(2.5).unwrap();
    assert_eq!(s.element(z).unwrap().opacity, 1.0);
    assert!(s.element(z).unwrap().visible);
}

#[test]
fn snapshots_see_earlier_directives() {
    let mut reg = ElementRegistry::new();
    let mut tl = Timeline::new();
    tl.play([Animation::pan(10.0, 60.0)], 1.0, Ease::Linear).unwrap();
    tl.wait(1.0).unwrap();
    tl.play([Animation::pan(20.0, 70.0)], 1.0, Ease::Linear).unwrap();
    reg.add(Element::hline(1.0));

    let scene = PreparedScene::prepare(config(10), &reg, Camera::default(), tl).unwrap();
    assert_eq!(scene.snapshot(1).unwrap().camera().view_start, 10.0);
    let s = scene.state_at(1.5).unwrap();
    assert_eq!(s.camera.view_start, 15.0);
}

#[test]
fn evaluation_is_idempotent_and_order_independent() {
    let mut reg = ElementRegistry::new();
    let t = reg.add(Element::text("hello", 1.0, 1.0));
    let mut tl = Timeline::new();
    tl.play([Animation::type_text(t)], 1.0, Ease::InOutCubic)
        .unwrap();
    let scene = PreparedScene::prepare(config(30), &reg, Camera::default(), tl).unwrap();

    let late = scene.frame_state(FrameIndex(25)).unwrap();
    let early = scene.frame_state(FrameIndex(3)).unwrap();
    assert_eq!(scene.frame_state(FrameIndex(3)).unwrap(), early);
    assert_eq!(scene.frame_state(FrameIndex(25)).unwrap(), late);
    assert!(!scene.base().element(t).unwrap().visible);
}

#[test]
fn incompatible_target_fails_during_prepare() {
    let mut reg = ElementRegistry::new();
    let c = reg.add(Element::candle(0, 1.0, 2.0, 0.5, 1.5));
    let mut tl = Timeline::new();
    tl.wait(1.0).unwrap();
    tl.play([Animation::type_text(c)], 1.0, Ease::Linear).unwrap();

    let err = PreparedScene::prepare(config(10), &reg, Camera::default(), tl).unwrap_err();
    assert!(matches!(err, TradeanimError::Animation(_)));
    assert!(err.to_string().contains("directive 0"));
}

#[test]
fn removed_target_fails_during_prepare() {
    let mut reg = ElementRegistry::new();
    let c = reg.add(Element::hline(1.0));
    let mut tl = Timeline::new();
    tl.play([Animation::fade_in(c)], 1.0, Ease::Linear).unwrap();
    reg.remove(c);

    let err = PreparedScene::prepare(config(10), &reg, Camera::default(), tl).unwrap_err();
    assert!(matches!(err, TradeanimError::Timeline(_)));
}

#[test]
fn fade_out_removal_persists_and_blocks_later_directives() {
    let mut reg = ElementRegistry::new();
    let c = reg.add(Element::hline(1.0));
    let mut tl = Timeline::new();
    tl.play([Animation::fade_out_and_remove(c)], 1.0, Ease::Linear)
        .unwrap();
    tl.wait(2.0).unwrap();
    let prepared =
        PreparedScene::prepare(config(10), &reg, Camera::default(), tl.clone()).unwrap();
    assert!(prepared.state_at(0.5).unwrap().element(c).is_some());
    assert!(prepared.state_at(1.5).unwrap().element(c).is_none());

    tl.play([Animation::fade_in(c)], 1.0, Ease::Linear).unwrap();
    let err = PreparedScene::prepare(config(10), &reg, Camera::default(), tl).unwrap_err();
    assert!(matches!(err, TradeanimError::Timeline(_)));
    assert!(err.to_string().contains("removes"), "{err}");
}

#[test]
fn invalid_config_fails_before_snapshots() {
    let reg = ElementRegistry::new();
    let cfg = RenderConfig {
        width: 0,
        ..RenderConfig::default()
    };
    let err = PreparedScene::prepare(cfg, &reg, Camera::default(), Timeline::new()).unwrap_err();
    assert!(matches!(err, TradeanimError::Config(_)));
}
