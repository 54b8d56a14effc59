use std::f64::consts::PI;

/// Easing functions used to map normalized directive progress.
///
/// Every curve maps `0 -> 0` and `1 -> 1` exactly. `OutBack` and `OutElastic` overshoot
/// `[0, 1]` in between; animations document whether they clamp or extrapolate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ease {
    /// Linear interpolation.
    #[default]
    Linear,
    /// Quadratic ease-in.
    InQuad,
    /// Quadratic ease-out.
    OutQuad,
    /// Quadratic ease-in/out.
    InOutQuad,
    /// Cubic ease-in.
    InCubic,
    /// Cubic ease-out.
    OutCubic,
    /// Cubic ease-in/out.
    InOutCubic,
    /// Sine ease-in.
    InSine,
    /// Sine ease-out.
    OutSine,
    /// Sine ease-in/out.
    InOutSine,
    /// Exponential ease-in.
    InExpo,
    /// Exponential ease-out.
    OutExpo,
    /// Exponential ease-in/out.
    InOutExpo,
    /// Ease-out that overshoots past 1 before settling.
    OutBack,
    /// Damped oscillation around 1.
    OutElastic,
    /// Bouncing settle onto 1.
    OutBounce,
}

impl Ease {
    /// All curves, in declaration order.
    pub const ALL: [Ease; 16] = [
        Self::Linear,
        Self::InQuad,
        Self::OutQuad,
        Self::InOutQuad,
        Self::InCubic,
        Self::OutCubic,
        Self::InOutCubic,
        Self::InSine,
        Self::OutSine,
        Self::InOutSine,
        Self::InExpo,
        Self::OutExpo,
        Self::InOutExpo,
        Self::OutBack,
        Self::OutElastic,
        Self::OutBounce,
    ];

    /// Apply this easing function to normalized progress `t`.
    ///
    /// Input is clamped to `[0, 1]`; the endpoints are returned exactly.
    pub fn apply(self, t: f64) -> f64 {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        if t == 0.0 {
            return 0.0;
        }
        if t == 1.0 {
            return 1.0;
        }
        match self {
            Self::Linear => t,
            Self::InQuad => t * t,
            Self::OutQuad => t * (2.0 - t),
            Self::InOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    -1.0 + (4.0 - 2.0 * t) * t
                }
            }
            Self::InCubic => t * t * t,
            Self::OutCubic => {
                let u = t - 1.0;
                u * u * u + 1.0
            }
            Self::InOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    let u = t - 1.0;
                    1.0 + 4.0 * u * u * u
                }
            }
            Self::InSine => 1.0 - (t * PI / 2.0).cos(),
            Self::OutSine => (t * PI / 2.0).sin(),
            Self::InOutSine => 0.5 * (1.0 - (PI * t).cos()),
            Self::InExpo => 2f64.powf(10.0 * (t - 1.0)),
            Self::OutExpo => 1.0 - 2f64.powf(-10.0 * t),
            Self::InOutExpo => {
                if t < 0.5 {
                    0.5 * 2f64.powf(20.0 * t - 10.0)
                } else {
                    1.0 - 0.5 * 2f64.powf(-20.0 * t + 10.0)
                }
            }
            Self::OutBack => {
                const C1: f64 = 1.70158;
                const C3: f64 = C1 + 1.0;
                let u = t - 1.0;
                1.0 + C3 * u * u * u + C1 * u * u
            }
            Self::OutElastic => {
                const P: f64 = 0.3;
                2f64.powf(-10.0 * t) * ((t - P / 4.0) * (2.0 * PI) / P).sin() + 1.0
            }
            Self::OutBounce => {
                const N1: f64 = 7.5625;
                const D1: f64 = 2.75;
                if t < 1.0 / D1 {
                    N1 * t * t
                } else if t < 2.0 / D1 {
                    let u = t - 1.5 / D1;
                    N1 * u * u + 0.75
                } else if t < 2.5 / D1 {
                    let u = t - 2.25 / D1;
                    N1 * u * u + 0.9375
                } else {
                    let u = t - 2.625 / D1;
                    N1 * u * u + 0.984375
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/ease.rs"]
mod tests;
