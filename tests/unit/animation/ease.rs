use super::*;
use proptest::prelude::*;

#[test]
fn endpoints_are_exact_for_every_curve() {
    for e in Ease::ALL {
        assert_eq!(e.apply(0.0), 0.0, "{e:?} at 0");
        assert_eq!(e.apply(1.0), 1.0, "{e:?} at 1");
    }
}

#[test]
fn input_outside_unit_range_is_clamped() {
    for e in Ease::ALL {
        assert_eq!(e.apply(-3.0), 0.0, "{e:?}");
        assert_eq!(e.apply(7.0), 1.0, "{e:?}");
        assert_eq!(e.apply(f64::NAN), 0.0, "{e:?}");
    }
}

#[test]
fn overshoot_curves_leave_unit_range() {
    let peak = (1..100)
        .map(|i| Ease::OutBack.apply(f64::from(i) / 100.0))
        .fold(f64::MIN, f64::max);
    assert!(peak > 1.0);

    let peak = (1..100)
        .map(|i| Ease::OutElastic.apply(f64::from(i) / 100.0))
        .fold(f64::MIN, f64::max);
    assert!(peak > 1.0);
}

#[test]
fn midpoints_match_reference_values() {
    assert!((Ease::InQuad.apply(0.5) - 0.25).abs() < 1e-12);
    assert!((Ease::OutCubic.apply(0.5) - 0.875).abs() < 1e-12);
    assert!((Ease::InOutSine.apply(0.5) - 0.5).abs() < 1e-12);
    assert!((Ease::OutBounce.apply(0.5) - 0.765625).abs() < 1e-12);
}

#[test]
fn serde_uses_snake_case_names() {
    let e: Ease = serde_json::from_str("\"in_out_cubic\"").unwrap();
    assert_eq!(e, Ease::InOutCubic);
    assert_eq!(serde_json::to_string(&Ease::OutBack).unwrap(), "\"out_back\"");
}

proptest! {
    #[test]
    fn monotone_curves_stay_in_unit_range(t in 0.0f64..=1.0) {
        for e in [
            Ease::Linear,
            Ease::InQuad,
            Ease::OutQuad,
            Ease::InOutQuad,
            Ease::InCubic,
            Ease::OutCubic,
            Ease::InOutCubic,
            Ease::InSine,
            Ease::OutSine,
            Ease::InOutSine,
            Ease::InExpo,
            Ease::OutExpo,
            Ease::InOutExpo,
            Ease::OutBounce,
        ] {
            let v = e.apply(t);
            prop_assert!((-1e-12..=1.0 + 1e-12).contains(&v), "{:?}({}) = {}", e, t, v);
        }
    }
}
