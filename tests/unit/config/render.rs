use super::*;

#[test]
fn defaults_validate() {
    let cfg = RenderConfig::default();
    cfg.validate().unwrap();
    assert_eq!(cfg.canvas().width, 1920);
    assert_eq!(cfg.quality().crf, 18);
    assert_eq!(cfg.quality().preset, "medium");
}

#[test]
fn rejects_bad_dimensions_and_quality() {
    let bad = |f: fn(&mut RenderConfig)| {
        let mut cfg = RenderConfig::default();
        f(&mut cfg);
        cfg.validate().unwrap_err()
    };

    assert!(matches!(bad(|c| c.width = 0), TradeanimError::Config(_)));
    assert!(matches!(bad(|c| c.height = 1081), TradeanimError::Config(_)));
    assert!(matches!(bad(|c| c.width = 70_000), TradeanimError::Config(_)));
    assert!(matches!(bad(|c| c.crf = 52), TradeanimError::Config(_)));
    assert!(matches!(
        bad(|c| c.preset = "warp".to_owned()),
        TradeanimError::Config(_)
    ));
    assert!(matches!(
        bad(|c| c.speed_multiplier = 0.0),
        TradeanimError::Config(_)
    ));
    assert!(matches!(bad(|c| c.fps.num = 0), TradeanimError::Config(_)));
    assert!(matches!(
        bad(|c| c.candle_width = 1.5),
        TradeanimError::Config(_)
    ));
}

#[test]
fn odd_size_is_fine_for_non_420_formats() {
    let cfg = RenderConfig {
        width: 101,
        height: 51,
        pixel_format: "yuv444p".to_owned(),
        ..RenderConfig::default()
    };
    cfg.validate().unwrap();
}

#[test]
fn json_config_overrides_selected_fields() {
    let cfg = RenderConfig::from_reader(
        r#"{ "width": 640, "height": 360, "fps": 30, "theme": "midnight", "crf": 23 }"#.as_bytes(),
    )
    .unwrap();
    assert_eq!(cfg.width, 640);
    assert_eq!(cfg.fps, Fps { num: 30, den: 1 });
    assert_eq!(cfg.theme, Theme::midnight());
    assert_eq!(cfg.preset, "medium");
    cfg.validate().unwrap();

    assert!(RenderConfig::from_reader(r#"{ "theme": "nope" }"#.as_bytes()).is_err());
}

#[test]
fn volume_supersample_and_post_are_checked() {
    let bad = |f: fn(&mut RenderConfig)| {
        let mut cfg = RenderConfig::default();
        f(&mut cfg);
        cfg.validate().unwrap_err()
    };
    assert!(matches!(bad(|c| c.supersample = 0), TradeanimError::Config(_)));
    assert!(matches!(bad(|c| c.supersample = 5), TradeanimError::Config(_)));
    assert!(matches!(
        bad(|c| {
            c.width = 20_000;
            c.supersample = 4;
        }),
        TradeanimError::Config(_)
    ));
    assert!(matches!(
        bad(|c| c.volume_height_ratio = 1.0),
        TradeanimError::Config(_)
    ));
    assert!(matches!(
        bad(|c| c.post.vignette = Some(crate::config::post::Vignette { strength: -1.0 })),
        TradeanimError::Config(_)
    ));
    assert!(matches!(
        bad(|c| c.post.bloom = Some(crate::config::post::Bloom { radius: 15, intensity: 2.0 })),
        TradeanimError::Config(_)
    ));

    let cfg = RenderConfig {
        supersample: 4,
        ..RenderConfig::default()
    };
    cfg.validate().unwrap();
    assert_eq!(cfg.raster_size(), (7680, 4320));
}

#[test]
fn json_post_block_enables_effects_with_defaults() {
    let cfg = RenderConfig::from_reader(
        r#"{ "show_volume": true, "supersample": 2, "post": { "bloom": {}, "vignette": { "strength": 0.5 } } }"#
            .as_bytes(),
    )
    .unwrap();
    cfg.validate().unwrap();
    assert!(cfg.show_volume);
    assert_eq!(cfg.volume_height_ratio, 0.15);
    let bloom = cfg.post.bloom.unwrap();
    assert_eq!((bloom.radius, bloom.intensity), (15, 0.15));
    assert_eq!(cfg.post.vignette.unwrap().strength, 0.5);
    assert!(cfg.post.lens_distortion.is_none());
    assert!(cfg.post.is_enabled());
}
