use super::*;

#[test]
fn every_preset_resolves() {
    for name in ["dark", "light", "white", "white_green", "black", "midnight"] {
        assert!(Theme::preset(name).is_some(), "{name}");
    }
    assert!(Theme::preset("neon").is_none());
    assert_eq!(Theme::preset(" Dark "), Some(Theme::dark()));
}

#[test]
fn default_is_dark() {
    assert_eq!(Theme::default(), Theme::dark());
    assert_eq!(Theme::dark().background, Color::hex("#131722").unwrap());
}

#[test]
fn partial_theme_object_keeps_defaults() {
    let t: Theme = serde_json::from_str(r##"{"background": "#000000"}"##).unwrap();
    assert_eq!(t.background, Color::hex("#000000").unwrap());
    assert_eq!(t.bull_body, Theme::dark().bull_body);
}

#[test]
fn volume_colors_are_translucent_candle_colors() {
    let dark = Theme::dark();
    assert_eq!(dark.volume_up, Color::hex("#26a69a80").unwrap());
    assert_eq!(dark.volume_down, Color::hex("#ef535080").unwrap());
    assert_eq!(Theme::white().volume_up, Theme::white().volume_down);
    for name in ["dark", "light", "white", "white_green", "black", "midnight"] {
        let t = Theme::preset(name).unwrap();
        assert!(t.volume_up.a < 1.0 && t.volume_down.a < 1.0, "{name}");
    }
}
