use crate::foundation::core::{Affine, Rect};
use crate::scene::element::Element;

/// Viewport in data coordinates: candle index span by price span.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Camera {
    /// First visible index.
    pub view_start: f64,
    /// Last visible index.
    pub view_end: f64,
    /// Bottom of the price axis.
    pub price_min: f64,
    /// Top of the price axis.
    pub price_max: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            view_start: 0.0,
            view_end: 50.0,
            price_min: 0.0,
            price_max: 100.0,
        }
    }
}

/// Padding used when fitting a camera around candles.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FitPadding {
    /// Fraction of the price range added above the highest high.
    pub top: f64,
    /// Fraction of the price range added below the lowest low.
    pub bottom: f64,
    /// Empty index slots kept right of the last candle.
    pub right: f64,
}

impl Camera {
    /// Interpolate every field; `t` outside `[0, 1]` extrapolates.
    pub fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        let l = |x: f64, y: f64| x + (y - x) * t;
        Self {
            view_start: l(a.view_start, b.view_start),
            view_end: l(a.view_end, b.view_end),
            price_min: l(a.price_min, b.price_min),
            price_max: l(a.price_max, b.price_max),
        }
    }

    /// Camera framing every shown candle/bar in `elements`, or `None` when there is none.
    ///
    /// The view starts one slot before the first index and keeps `padding.right` slots after the
    /// last one. A flat price range is treated as a range of one.
    pub fn fit<'a>(
        elements: impl IntoIterator<Item = &'a Element>,
        padding: FitPadding,
    ) -> Option<Self> {
        Self::fit_extents(
            elements
                .into_iter()
                .filter(|e| e.is_shown())
                .filter_map(Element::price_extent),
            padding,
        )
    }

    /// [`Camera::fit`] over every candle/bar in `elements`, shown or not.
    pub fn fit_all<'a>(
        elements: impl IntoIterator<Item = &'a Element>,
        padding: FitPadding,
    ) -> Option<Self> {
        Self::fit_extents(elements.into_iter().filter_map(Element::price_extent), padding)
    }

    fn fit_extents(
        extents: impl IntoIterator<Item = (i64, f64, f64)>,
        padding: FitPadding,
    ) -> Option<Self> {
        let mut lo_idx = i64::MAX;
        let mut hi_idx = i64::MIN;
        let mut low = f64::INFINITY;
        let mut high = f64::NEG_INFINITY;
        let mut any = false;
        for (idx, l, h) in extents {
            any = true;
            lo_idx = lo_idx.min(idx);
            hi_idx = hi_idx.max(idx);
            low = low.min(l);
            high = high.max(h);
        }
        if !any {
            return None;
        }

        let mut range = high - low;
        if range == 0.0 {
            range = 1.0;
        }
        Some(Self {
            view_start: lo_idx as f64 - 1.0,
            view_end: hi_idx as f64 + padding.right,
            price_min: low - range * padding.bottom,
            price_max: high + range * padding.top,
        })
    }

    /// Camera framing the candles/bars whose index lies in `[start, end]`, shown or not.
    ///
    /// The view keeps one slot before `start` and three after `end`; `padding` is the fraction
    /// of the price range added above and below.
    pub fn frame_indices<'a>(
        elements: impl IntoIterator<Item = &'a Element>,
        start: i64,
        end: i64,
        padding: f64,
    ) -> Option<Self> {
        let (lo, hi) = if start <= end { (start, end) } else { (end, start) };
        let mut low = f64::INFINITY;
        let mut high = f64::NEG_INFINITY;
        for (idx, l, h) in elements.into_iter().filter_map(Element::price_extent) {
            if (lo..=hi).contains(&idx) {
                low = low.min(l);
                high = high.max(h);
            }
        }
        if !low.is_finite() || !high.is_finite() {
            return None;
        }
        let mut range = high - low;
        if range == 0.0 {
            range = 1.0;
        }
        Some(Self {
            view_start: lo as f64 - 1.0,
            view_end: hi as f64 + 3.0,
            price_min: low - range * padding,
            price_max: high + range * padding,
        })
    }

    /// Index span including half a slot on each side.
    pub fn x_bounds(&self) -> (f64, f64) {
        (self.view_start - 0.5, self.view_end + 0.5)
    }

    /// Data-to-pixel transform mapping the viewport onto `plot` with price increasing upward.
    ///
    /// Degenerate spans fall back to a span of one so the transform stays invertible.
    pub fn transform(&self, plot: Rect) -> Affine {
        let (x0, x1) = self.x_bounds();
        let mut x_span = x1 - x0;
        if !x_span.is_finite() || x_span.abs() < 1e-12 {
            x_span = 1.0;
        }
        let mut y_span = self.price_max - self.price_min;
        if !y_span.is_finite() || y_span.abs() < 1e-12 {
            y_span = 1.0;
        }

        let sx = plot.width() / x_span;
        let sy = plot.height() / y_span;
        Affine::new([
            sx,
            0.0,
            0.0,
            -sy,
            plot.x0 - x0 * sx,
            plot.y1 + self.price_min * sy,
        ])
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/camera.rs"]
mod tests;
