use super::*;
use crate::scene::element::ElementKind;

const BASIC: &str = r##"{
  "config": { "width": 320, "height": 180, "fps": { "num": 10, "den": 1 } },
  "series": [
    { "id": "btc", "start_index": 0, "ohlc": [[10, 12, 9, 11], [11, 13, 10, 12], [12, 12.5, 8, 9]] }
  ],
  "elements": [
    { "id": "sma", "kind": "line", "points": [{ "x": 0, "y": 10 }, { "x": 2, "y": 11 }] },
    { "id": "note", "kind": "text", "text": "breakout", "x": 0.5, "y": 0.9 }
  ],
  "steps": [
    { "play_and_wait": { "animations": [{ "type": "appear", "targets": ["btc"] }], "duration": 2.0 } },
    { "play": { "animations": [{ "type": "draw_line", "target": "sma" }], "duration": 1.0, "ease": "out_cubic" } },
    { "play_with_previous": { "animations": [{ "type": "write", "target": "note" }], "duration": 1.0, "offset": 0.5 } },
    { "wait": 1.0 }
  ]
}"##;

#[test]
fn basic_scene_builds_with_aliases_and_series_expansion() {
    let def = SceneDef::from_reader(BASIC.as_bytes()).unwrap();
    let scene = def.into_scene().unwrap();

    assert_eq!(scene.registry().len(), 5);
    let directives = scene.timeline().directives();
    assert_eq!(directives.len(), 3);
    assert_eq!(directives[0].animation.targets().len(), 3);
    assert_eq!(directives[1].start_time, 2.0);
    assert_eq!(directives[1].ease, Ease::OutCubic);
    assert_eq!(directives[2].start_time, 2.5);
    assert_eq!(directives[2].animation.name(), "type_text");
    assert_eq!(scene.total_duration(), 3.5);
    assert_eq!(scene.frame_count(), 35);
}

#[test]
fn series_rows_are_addressable_by_index() {
    let json = r#"{
      "series": [{ "id": "s", "start_index": 5, "ohlc": [[1, 2, 0.5, 1.5], [1.5, 2, 1, 1.2]], "style": "ohlc_bar" }],
      "steps": [{ "play": { "animations": [{ "type": "flash", "target": "s[1]" }], "duration": 1 } }]
    }"#;
    let scene = SceneDef::from_reader(json.as_bytes())
        .unwrap()
        .into_scene()
        .unwrap();
    let target = scene.timeline().directives()[0].animation.targets()[0];
    let e = scene.registry().get(target).unwrap();
    match &e.kind {
        ElementKind::OhlcBar(b) => assert_eq!(b.index, 6),
        other => panic!("unexpected kind {other:?}"),
    }
}

#[test]
fn defaults_fill_missing_animation_fields() {
    let json = r#"{
      "elements": [{ "id": "z", "kind": "zone", "x1": 0, "x2": 4, "y1": 1, "y2": 2 }],
      "steps": [{ "play": { "animations": [
        { "type": "pulse", "target": "z" },
        { "type": "slide_in", "target": "z" },
        { "type": "zoom_to", "start_index": 0, "end_index": 4 }
      ], "duration": 1 } }]
    }"#;
    let def = SceneDef::from_reader(json.as_bytes()).unwrap();
    let StepDef::Play(p) = &def.steps[0] else {
        panic!("expected play step");
    };
    match &p.animations[0] {
        AnimationDef::Pulse {
            min_opacity,
            max_opacity,
            cycles,
            ..
        } => assert_eq!((*min_opacity, *max_opacity, *cycles), (0.3, 1.0, 3.0)),
        other => panic!("unexpected {other:?}"),
    }
    match &p.animations[1] {
        AnimationDef::SlideIn {
            direction,
            distance,
            ..
        } => {
            assert_eq!(*direction, Direction::Left);
            assert_eq!(*distance, 0.15);
        }
        other => panic!("unexpected {other:?}"),
    }
    match &p.animations[2] {
        AnimationDef::ZoomTo { padding, .. } => assert_eq!(*padding, 0.1),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn unknown_target_is_a_timeline_error() {
    let json = r#"{
      "steps": [{ "play": { "animations": [{ "type": "fade_in", "target": "ghost" }], "duration": 1 } }]
    }"#;
    let err = SceneDef::from_reader(json.as_bytes())
        .unwrap()
        .into_scene()
        .unwrap_err();
    assert!(matches!(err, TradeanimError::Timeline(_)));
    assert!(err.to_string().contains("ghost"));
}

#[test]
fn duplicate_ids_are_rejected() {
    let json = r#"{
      "elements": [
        { "id": "a", "kind": "hline", "y": 1 },
        { "id": "a", "kind": "hline", "y": 2 }
      ]
    }"#;
    let err = SceneDef::from_reader(json.as_bytes())
        .unwrap()
        .into_scene()
        .unwrap_err();
    assert!(err.to_string().contains("duplicate"));
}

#[test]
fn series_name_is_not_a_single_target() {
    let json = r#"{
      "series": [{ "id": "s", "ohlc": [[1, 2, 0.5, 1.5], [1.5, 2, 1, 1.2]] }],
      "steps": [{ "play": { "animations": [{ "type": "fade_in", "target": "s" }], "duration": 1 } }]
    }"#;
    let err = SceneDef::from_reader(json.as_bytes())
        .unwrap()
        .into_scene()
        .unwrap_err();
    assert!(err.to_string().contains("2 elements"));
}

#[test]
fn malformed_json_is_a_serde_error() {
    let err = SceneDef::from_reader("{ \"steps\": [".as_bytes()).unwrap_err();
    assert!(matches!(err, TradeanimError::Serde(_)));
}

#[test]
fn negative_wait_surfaces_from_the_builder() {
    let err = SceneDef::from_reader(r#"{ "steps": [{ "wait": -1 }] }"#.as_bytes())
        .unwrap()
        .into_scene()
        .unwrap_err();
    assert!(matches!(err, TradeanimError::Timeline(_)));
}

#[test]
fn from_path_reads_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scene.json");
    std::fs::write(&path, BASIC).unwrap();
    let def = SceneDef::from_path(&path).unwrap();
    assert_eq!(def.series.len(), 1);

    let missing = SceneDef::from_path(dir.path().join("nope.json")).unwrap_err();
    assert!(matches!(missing, TradeanimError::Config(_)));
}

#[test]
fn play_delay_staggers_and_omitted_timing_uses_defaults() {
    let json = r#"{
      "elements": [
        { "id": "a", "kind": "hline", "y": 1 },
        { "id": "b", "kind": "hline", "y": 2 },
        { "id": "c", "kind": "hline", "y": 3 }
      ],
      "steps": [
        { "play_and_wait": { "animations": [
          { "type": "fade_in", "target": "a" },
          { "type": "fade_in", "target": "b" },
          { "type": "fade_in", "target": "c" }
        ], "delay": 0.25 } },
        { "play": { "animations": [{ "type": "glow_pulse", "target": "a" }] } }
      ]
    }"#;
    let scene = SceneDef::from_reader(json.as_bytes())
        .unwrap()
        .into_scene()
        .unwrap();
    let ds = scene.timeline().directives();
    let starts: Vec<f64> = ds.iter().map(|d| d.start_time).collect();
    assert_eq!(starts, vec![0.0, 0.25, 0.5, 1.0]);
    assert_eq!((ds[0].duration, ds[0].ease), (0.5, Ease::OutCubic));
    assert_eq!(ds[3].animation.name(), "pulse");
    assert_eq!((ds[3].duration, ds[3].ease), (1.5, Ease::Linear));
}

#[test]
fn entrance_aliases_resolve_to_their_variants() {
    let json = r#"{
      "series": [{ "id": "s", "ohlc": [[1, 2, 0.5, 1.5], [1.5, 2, 1, 1.2]] }],
      "elements": [{ "id": "t", "kind": "text", "text": "hi", "x": 0.5, "y": 0.5 }],
      "steps": [{ "play": { "animations": [
        { "type": "candle_grow", "targets": ["s"] },
        { "type": "bounce_in", "target": "t" }
      ], "duration": 1 } }]
    }"#;
    let scene = SceneDef::from_reader(json.as_bytes())
        .unwrap()
        .into_scene()
        .unwrap();
    let ds = scene.timeline().directives();
    assert!(matches!(
        ds[0].animation,
        Animation::Appear {
            style: AppearStyle::Pop,
            auto_camera: true,
            ..
        }
    ));
    assert_eq!(ds[1].animation.name(), "scale_in");
}

#[test]
fn chart_entrances_and_removal_parse_with_defaults() {
    let json = r#"{
      "series": [{ "id": "s", "ohlc": [[1, 2, 0.5, 1.5], [1.5, 2, 1, 1.2], [1.2, 1.4, 1, 1.1]] }],
      "elements": [{ "id": "z", "kind": "zone", "x1": 0, "x2": 2, "y1": 1, "y2": 2 }],
      "steps": [
        { "play_and_wait": { "animations": [{ "type": "chart_appear", "targets": ["s[0]"] }], "duration": 1 } },
        { "play_and_wait": { "animations": [{ "type": "add_candles", "targets": ["s[1]", "s[2]"] }], "duration": 1 } },
        { "play_and_wait": { "animations": [{ "type": "staggered_fade_in", "targets": ["z"] }] } },
        { "play": { "animations": [
          { "type": "sweep", "targets": ["s"] },
          { "type": "fade_out", "target": "z", "remove": true }
        ], "duration": 1 } }
      ]
    }"#;
    let scene = SceneDef::from_reader(json.as_bytes())
        .unwrap()
        .into_scene()
        .unwrap();
    let ds = scene.timeline().directives();
    let names: Vec<&str> = ds.iter().map(|d| d.animation.name()).collect();
    assert_eq!(
        names,
        ["chart_appear", "add_candles", "staggered_fade_in", "sweep", "fade_out"]
    );
    assert!(matches!(
        ds[2].animation,
        Animation::StaggeredFadeIn { stagger, fade, .. } if stagger == 0.08 && fade == 0.5
    ));
    assert_eq!(ds[2].duration, 0.5);
    assert_eq!(ds[4].animation.removes(), ds[4].animation.targets().first().copied());
}

#[test]
fn trades_register_their_parts_and_drive_pnl() {
    let json = r#"{
      "series": [{ "id": "s", "start_index": 0, "ohlc": [[100, 101, 99, 100], [100, 112, 99, 111]], "volume": [500, 900] }],
      "trades": [{ "id": "t", "entry_index": 0, "entry_price": 100, "side": "long", "sl": 95, "tp": 110 }],
      "steps": [
        { "play_and_wait": { "animations": [{ "type": "show_trade", "trade": "t" }] } },
        { "play_and_wait": { "animations": [{ "type": "fade_in", "target": "t.pnl" }], "duration": 0.5 } },
        { "play": { "animations": [{ "type": "update_pnl", "trade": "t" }], "duration": 2 } }
      ]
    }"#;
    let def = SceneDef::from_reader(json.as_bytes()).unwrap();
    assert_eq!(def.trades[0].trade.contracts, 1.0);
    assert!(def.trades[0].style.show_pnl);
    let scene = def.into_scene().unwrap();

    assert_eq!(scene.registry().len(), 7);
    let ds = scene.timeline().directives();
    assert_eq!(ds[0].animation.targets().len(), 5);
    assert_eq!((ds[0].duration, ds[0].ease), (0.8, Ease::OutCubic));
    let Animation::UpdatePnl { trade } = &ds[2].animation else {
        panic!("expected update_pnl");
    };
    assert_eq!(trade.trade.tp, 110.0);

    let volumes: Vec<f64> = scene
        .registry()
        .iter()
        .filter_map(|(_, e)| e.volume().map(|(_, v, _)| v))
        .collect();
    assert_eq!(volumes, vec![500.0, 900.0]);
}

#[test]
fn unknown_trade_is_a_timeline_error() {
    let json = r#"{
      "steps": [{ "play": { "animations": [{ "type": "show_trade", "trade": "nope" }] } }]
    }"#;
    let err = SceneDef::from_reader(json.as_bytes())
        .unwrap()
        .into_scene()
        .unwrap_err();
    assert!(matches!(err, TradeanimError::Timeline(_)));
    assert!(err.to_string().contains("nope"));
}
