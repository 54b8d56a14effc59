use super::*;

#[test]
fn mul_div255_rounds_to_nearest() {
    assert_eq!(mul_div255_u16(255, 255), 255);
    assert_eq!(mul_div255_u16(0, 200), 0);
    assert_eq!(mul_div255_u16(128, 255), 128);
    assert_eq!(mul_div255_u8(255, 128), 128);
}

#[test]
fn nice_step_snaps_to_round_values() {
    assert_eq!(nice_step(100.0, 10), 10.0);
    assert_eq!(nice_step(100.0, 5), 20.0);
    assert!((nice_step(1.0, 4) - 0.25).abs() < 1e-12);
    assert_eq!(nice_step(0.0, 5), 1.0);
    assert_eq!(nice_step(f64::NAN, 5), 1.0);
}
