use super::*;

#[test]
fn build_rejects_invalid_config_before_construct_runs() {
    let mut ran = false;
    let err = Scene::build(
        RenderConfig {
            crf: 99,
            ..RenderConfig::default()
        },
        |_| {
            ran = true;
            Ok(())
        },
    )
    .unwrap_err();
    assert!(matches!(err, TradeanimError::Config(_)));
    assert!(!ran);
}

#[test]
fn unknown_target_is_rejected_at_call_time() {
    let err = Scene::build(RenderConfig::default(), |s| {
        let id = s.add_element(Element::hline(1.0));
        s.remove_element(id)?;
        s.play([Animation::fade_in(id)], 1.0)
    })
    .unwrap_err();
    assert!(matches!(err, TradeanimError::Timeline(_)));
}

#[test]
fn referenced_element_cannot_be_removed() {
    let err = Scene::build(RenderConfig::default(), |s| {
        let id = s.add_element(Element::hline(1.0));
        s.play([Animation::fade_in(id)], 1.0)?;
        s.remove_element(id).map(|_| ())
    })
    .unwrap_err();
    assert!(err.to_string().contains("referenced"));
}

#[test]
fn negative_wait_is_rejected() {
    let err = Scene::build(RenderConfig::default(), |s| s.wait(-0.5)).unwrap_err();
    assert!(matches!(err, TradeanimError::Timeline(_)));
}

#[test]
fn play_and_wait_sequences_plays() {
    let scene = Scene::build(RenderConfig::default(), |s| {
        let a = s.add_element(Element::hline(1.0));
        let b = s.add_element(Element::hline(2.0));
        s.play_and_wait([Animation::fade_in(a)], 1.0)?;
        s.play([Animation::fade_in(b)], 0.5)?;
        Ok(())
    })
    .unwrap();
    let starts: Vec<f64> = scene
        .timeline()
        .directives()
        .iter()
        .map(|d| d.start_time)
        .collect();
    assert_eq!(starts, vec![0.0, 1.0]);
    assert_eq!(scene.total_duration(), 1.5);
}

#[test]
fn play_with_previous_offsets_from_last_play_start() {
    let scene = Scene::build(RenderConfig::default(), |s| {
        let a = s.add_element(Element::hline(1.0));
        let b = s.add_element(Element::hline(2.0));
        s.wait(1.0)?;
        s.play_and_wait([Animation::fade_in(a)], 2.0)?;
        s.play_with_previous([Animation::fade_in(b)], 1.0, 0.5)?;
        Ok(())
    })
    .unwrap();
    assert_eq!(scene.timeline().directives()[1].start_time, 1.5);
    assert_eq!(scene.total_duration(), 3.0);
}

#[test]
fn play_with_previous_eased_keeps_its_ease() {
    let scene = Scene::build(RenderConfig::default(), |s| {
        let a = s.add_element(Element::hline(1.0));
        let b = s.add_element(Element::hline(2.0));
        s.play([Animation::fade_in(a)], 1.0)?;
        s.play_with_previous_eased([Animation::fade_in(b)], 1.0, 0.25, Ease::OutCubic)?;
        Ok(())
    })
    .unwrap();
    let d = &scene.timeline().directives()[1];
    assert_eq!(d.start_time, 0.25);
    assert_eq!(d.ease, Ease::OutCubic);
}

#[test]
fn speed_multiplier_scales_every_duration() {
    let config = RenderConfig {
        speed_multiplier: 2.0,
        ..RenderConfig::default()
    };
    let scene = Scene::build(config, |s| {
        let a = s.add_element(Element::hline(1.0));
        s.play_and_wait([Animation::fade_in(a)], 2.0)?;
        s.wait(1.0)?;
        Ok(())
    })
    .unwrap();
    assert_eq!(scene.timeline().directives()[0].duration, 1.0);
    assert_eq!(scene.total_duration(), 1.5);
}

#[test]
fn play_with_staggers_and_uses_animation_defaults() {
    let scene = Scene::build(RenderConfig::default(), |s| {
        let a = s.add_element(Element::hline(1.0));
        let line = s.add_element(Element::line(vec![
            crate::foundation::core::Point::new(0.0, 1.0),
            crate::foundation::core::Point::new(1.0, 2.0),
        ]));
        s.wait(1.0)?;
        s.play_with(
            [Animation::fade_in(a), Animation::draw(line)],
            PlayOpts::staggered(0.5),
        )?;
        Ok(())
    })
    .unwrap();
    let ds = scene.timeline().directives();
    assert_eq!((ds[0].start_time, ds[0].duration, ds[0].ease), (1.0, 0.5, Ease::OutCubic));
    assert_eq!((ds[1].start_time, ds[1].duration, ds[1].ease), (1.5, 2.0, Ease::InOutCubic));
    assert_eq!(scene.total_duration(), 3.5);
}

#[test]
fn play_and_wait_with_waits_for_the_whole_stagger_at_speed() {
    let config = RenderConfig {
        speed_multiplier: 2.0,
        ..RenderConfig::default()
    };
    let scene = Scene::build(config, |s| {
        let ids = s.add_elements((0..3).map(|i| Element::hline(i as f64)));
        let opts = PlayOpts {
            duration: Some(1.0),
            delay: 0.5,
            ease: None,
        };
        s.play_and_wait_with(ids.into_iter().map(Animation::fade_in), opts)?;
        assert_eq!(s.current_time(), 1.0);
        Ok(())
    })
    .unwrap();
    let starts: Vec<f64> = scene
        .timeline()
        .directives()
        .iter()
        .map(|d| d.start_time)
        .collect();
    assert_eq!(starts, vec![0.0, 0.25, 0.5]);
    assert!(scene.timeline().directives().iter().all(|d| d.duration == 0.5));
}

#[test]
fn plain_play_keeps_linear_shared_timing() {
    let scene = Scene::build(RenderConfig::default(), |s| {
        let a = s.add_element(Element::hline(1.0));
        s.play([Animation::fade_in(a)], 2.0)?;
        Ok(())
    })
    .unwrap();
    let d = &scene.timeline().directives()[0];
    assert_eq!((d.duration, d.ease), (2.0, Ease::Linear));
}

#[test]
fn add_trade_registers_every_part() {
    use crate::scene::trade::{Side, Trade, TradeStyle};

    let scene = Scene::build(RenderConfig::default(), |s| {
        let trade = s.add_trade(
            Trade::new(3, 100.0, Side::Long, 95.0, 110.0),
            &TradeStyle::default(),
        )?;
        assert_eq!(trade.elements().len(), 5);
        s.play_and_wait([Animation::show_trade(&trade)], 1.0)?;
        s.play_and_wait([Animation::update_pnl(&trade)], 1.0)?;
        assert!(s.remove_element(trade.pnl.unwrap()).is_err());
        Ok(())
    })
    .unwrap();
    assert_eq!(scene.registry().len(), 5);

    let bad = Scene::build(RenderConfig::default(), |s| {
        s.add_trade(
            Trade::new(0, f64::NAN, Side::Long, 1.0, 2.0),
            &TradeStyle::default(),
        )?;
        Ok(())
    });
    assert!(bad.is_err());
}

#[test]
fn set_camera_is_the_initial_camera() {
    let cam = Camera {
        view_start: 5.0,
        view_end: 25.0,
        price_min: 90.0,
        price_max: 110.0,
    };
    let scene = Scene::build(RenderConfig::default(), |s| {
        s.set_camera(cam);
        Ok(())
    })
    .unwrap();
    assert_eq!(scene.camera(), cam);
    let prepared = scene.prepare().unwrap();
    assert_eq!(prepared.state_at(0.0).unwrap().camera, cam);
}

#[test]
fn frame_count_matches_config_fps() {
    let scene = Scene::build(RenderConfig::default(), |s| s.wait(1.5)).unwrap();
    assert_eq!(scene.frame_count(), 90);
}
