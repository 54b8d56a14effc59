use std::collections::HashMap;
use std::sync::Arc;

use kurbo::{Cap, Join, Shape, Stroke, StrokeOpts};

use crate::config::render::RenderConfig;
use crate::eval::state::FrameState;
use crate::foundation::color::Color;
use crate::foundation::core::{Affine, BezPath, Point, Rect, Vec2};
use crate::foundation::error::{TradeanimError, TradeanimResult};
use crate::foundation::math::nice_step;
use crate::render::backend::{FrameRGBA, RenderBackend};
use crate::render::post;
use crate::render::text::{FontBook, TextImage, TextRasterizer, TextStyle};
use crate::scene::camera::Camera;
use crate::scene::element::{
    Area, Arrow, Candle, Element, ElementKind, FillBetween, HAlign, HLine, Layer, Line, OhlcBar,
    Text, VAlign, Zone,
};

const STROKE_TOLERANCE: f64 = 0.1;
const REFERENCE_HEIGHT: f64 = 1080.0;
const VOLUME_HEADROOM: f64 = 1.05;

/// Pixel rectangles of the chart panel and its gutters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlotLayout {
    /// Whole canvas.
    pub canvas: Rect,
    /// Data area the camera maps onto.
    pub plot: Rect,
    /// Volume panel under the plot, sharing its x range.
    pub volume: Option<Rect>,
    /// Right-hand price axis gutter.
    pub price_gutter: Rect,
    /// Bottom index axis gutter.
    pub time_gutter: Rect,
}

impl PlotLayout {
    /// Split the output canvas using the config's gutter fractions.
    pub fn new(config: &RenderConfig) -> Self {
        Self::sized(config, config.width, config.height)
    }

    /// Split a `width` x `height` canvas using the config's gutter and volume fractions.
    pub fn sized(config: &RenderConfig, width: u32, height: u32) -> Self {
        let w = f64::from(width);
        let h = f64::from(height);
        let gw = (w * config.price_axis_width).round();
        let gh = (h * config.time_axis_height).round();
        let chart_h = h - gh;
        let vol_h = if config.show_volume {
            (chart_h * config.volume_height_ratio).round()
        } else {
            0.0
        };
        Self {
            canvas: Rect::new(0.0, 0.0, w, h),
            plot: Rect::new(0.0, 0.0, w - gw, chart_h - vol_h),
            volume: config
                .show_volume
                .then(|| Rect::new(0.0, chart_h - vol_h, w - gw, chart_h)),
            price_gutter: Rect::new(w - gw, 0.0, w, h),
            time_gutter: Rect::new(0.0, chart_h, w - gw, h),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct GradientKey {
    top: [u8; 4],
    bottom: [u8; 4],
    h: u32,
}

/// CPU rasterizer built on `vello_cpu`.
///
/// Draws, in order: background, grid, data elements, annotations, the volume panel, axis
/// gutters with labels, screen-anchored overlays and the watermark. Within a layer elements are
/// ordered by `z_order`, then insertion order.
///
/// With `supersample` above 1 everything is drawn at that multiple of the output size and
/// shrunk afterwards; post effects then run on the output-sized frame.
pub struct CpuBackend {
    config: RenderConfig,
    layout: PlotLayout,
    width: u16,
    height: u16,
    supersample: u32,
    ctx: Option<vello_cpu::RenderContext>,
    text: TextRasterizer,
    gradient_cache: HashMap<GradientKey, vello_cpu::Image>,
}

impl std::fmt::Debug for CpuBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuBackend")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

impl CpuBackend {
    /// Validate `config` and set up an empty raster context.
    pub fn new(config: RenderConfig, fonts: FontBook) -> TradeanimResult<Self> {
        config.validate()?;
        let (rw, rh) = config.raster_size();
        let width =
            u16::try_from(rw).map_err(|_| TradeanimError::config("width exceeds u16"))?;
        let height =
            u16::try_from(rh).map_err(|_| TradeanimError::config("height exceeds u16"))?;
        Ok(Self {
            layout: PlotLayout::sized(&config, rw, rh),
            supersample: config.supersample.max(1),
            config,
            width,
            height,
            ctx: None,
            text: TextRasterizer::new(fonts),
            gradient_cache: HashMap::new(),
        })
    }

    /// Panel and gutter rectangles in raster pixels.
    pub fn layout(&self) -> PlotLayout {
        self.layout
    }

    fn ui_scale(&self) -> f64 {
        f64::from(self.height) / REFERENCE_HEIGHT
    }

    fn with_ctx_mut<R>(
        &mut self,
        f: impl FnOnce(&mut Self, &mut vello_cpu::RenderContext) -> TradeanimResult<R>,
    ) -> TradeanimResult<R> {
        let (w, h) = (self.width, self.height);
        let mut ctx = match self.ctx.take() {
            Some(ctx) if ctx.width() == w && ctx.height() == h => ctx,
            _ => vello_cpu::RenderContext::new(w, h),
        };
        ctx.reset();
        let out = f(self, &mut ctx);
        self.ctx = Some(ctx);
        out
    }

    fn gradient_paint(&mut self, top: Color, bottom: Color, h: u32) -> TradeanimResult<vello_cpu::Image> {
        let top8 = top.to_rgba8_premul().to_array();
        let bottom8 = bottom.to_rgba8_premul().to_array();
        let key = GradientKey {
            top: top8,
            bottom: bottom8,
            h,
        };
        if let Some(img) = self.gradient_cache.get(&key).cloned() {
            return Ok(img);
        }
        const W: u32 = 2;
        let mut bytes = vec![0u8; FrameRGBA::expected_len(W, h)];
        let h1 = (h.max(1) - 1) as f64;
        for y in 0..h {
            let t = if h1 <= 0.0 { 0.0 } else { f64::from(y) / h1 };
            let lerp = |a: u8, b: u8| -> u8 {
                let (af, bf) = (f64::from(a), f64::from(b));
                (af + (bf - af) * t).round().clamp(0.0, 255.0) as u8
            };
            let c = [
                lerp(top8[0], bottom8[0]),
                lerp(top8[1], bottom8[1]),
                lerp(top8[2], bottom8[2]),
                lerp(top8[3], bottom8[3]),
            ];
            for x in 0..W {
                let idx = ((y as usize) * (W as usize) + (x as usize)) * 4;
                bytes[idx..idx + 4].copy_from_slice(&c);
            }
        }
        let img = premul_image(&bytes, W, h)?;
        if self.gradient_cache.len() >= 256 {
            self.gradient_cache.clear();
        }
        self.gradient_cache.insert(key, img.clone());
        Ok(img)
    }

    /// Fill `path` (pixel space) with a vertical gradient spanning `top_y..bottom_y`, clipped to
    /// the canvas rows.
    fn fill_path_gradient(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        path: &BezPath,
        top_y: f64,
        bottom_y: f64,
        top: Color,
        bottom: Color,
    ) -> TradeanimResult<()> {
        let (y_lo, y_hi, top, bottom) = if bottom_y >= top_y {
            (top_y, bottom_y, top, bottom)
        } else {
            (bottom_y, top_y, bottom, top)
        };
        // The strip only covers on-canvas rows; the image sampler pads beyond them.
        let clip = self.layout.canvas;
        let span = y_hi - y_lo;
        let y0 = y_lo.clamp(clip.y0, clip.y1);
        let y1 = y_hi.clamp(clip.y0, clip.y1);
        let at = |y: f64| {
            if span > 0.0 && span.is_finite() {
                Color::mix(top, bottom, (y - y_lo) / span)
            } else {
                top
            }
        };
        let (top, bottom) = (at(y0), at(y1));
        let h = (y1 - y0).ceil().max(1.0) as u32;
        let img = self.gradient_paint(top, bottom, h)?;
        let local = Affine::translate((0.0, -y0)) * path.clone();
        ctx.set_transform(affine_to_cpu(Affine::translate((0.0, y0))));
        ctx.set_paint(img);
        ctx.fill_path(&bezpath_to_cpu(&local));
        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        Ok(())
    }

    fn draw_frame(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        state: &FrameState,
    ) -> TradeanimResult<()> {
        let cam = state.camera;
        let xf = cam.transform(self.layout.plot);

        self.draw_background(ctx)?;
        if self.config.show_grid {
            self.draw_grid(ctx, &cam, xf);
        }
        for e in ordered(state, Layer::Data) {
            self.draw_element(ctx, e, &cam, xf)?;
        }
        for e in ordered(state, Layer::Annotation) {
            self.draw_element(ctx, e, &cam, xf)?;
        }
        if let Some(panel) = self.layout.volume {
            self.draw_volume(ctx, state, &cam, xf, panel);
        }
        self.draw_gutters(ctx, &cam, xf)?;
        for e in ordered(state, Layer::Overlay) {
            self.draw_element(ctx, e, &cam, xf)?;
        }
        self.draw_watermark(ctx)
    }

    fn draw_background(&mut self, ctx: &mut vello_cpu::RenderContext) -> TradeanimResult<()> {
        let canvas = self.layout.canvas;
        match self.config.background_gradient {
            Some((top, bottom)) => {
                let path = canvas.to_path(STROKE_TOLERANCE);
                self.fill_path_gradient(ctx, &path, canvas.y0, canvas.y1, top, bottom)?;
            }
            None => {
                fill_rect(ctx, canvas, self.config.theme.background);
                fill_rect(ctx, self.layout.plot, self.config.theme.panel_bg);
            }
        }
        Ok(())
    }

    /// Bars scaled to the largest volume among shown candles in view, colored by direction.
    fn draw_volume(
        &self,
        ctx: &mut vello_cpu::RenderContext,
        state: &FrameState,
        cam: &Camera,
        xf: Affine,
        panel: Rect,
    ) {
        let theme = &self.config.theme;
        // Covers price geometry that runs below the plot.
        if self.config.background_gradient.is_none() {
            fill_rect(ctx, panel, theme.panel_bg);
        }
        let (x0, x1) = cam.x_bounds();
        let bars: Vec<(f64, f64, bool, f64)> = state
            .elements()
            .filter(|(_, e)| e.is_shown() && e.opacity > 0.0)
            .filter_map(|(_, e)| {
                let (index, volume, bull) = e.volume()?;
                let x = index as f64;
                (volume > 0.0 && volume.is_finite() && x >= x0 - 1.0 && x <= x1 + 1.0)
                    .then_some((x, volume, bull, e.opacity.clamp(0.0, 1.0)))
            })
            .collect();
        let top = bars.iter().map(|b| b.1).fold(0.0, f64::max) * VOLUME_HEADROOM;
        if top > 0.0 {
            let half_w = self.config.candle_width / 2.0;
            for (x, volume, bull, opacity) in bars {
                let left = (xf * Point::new(x - half_w, 0.0)).x;
                let right = (xf * Point::new(x + half_w, 0.0)).x;
                let y = panel.y1 - panel.height() * (volume / top);
                let color = if bull { theme.volume_up } else { theme.volume_down };
                fill_rect(
                    ctx,
                    Rect::new(left.max(panel.x0), y, right.min(panel.x1), panel.y1),
                    color.with_alpha_mul(opacity),
                );
            }
        }
        let sep = self.ui_scale().max(1.0);
        fill_rect(
            ctx,
            Rect::new(panel.x0, panel.y0, panel.x1, panel.y0 + sep),
            theme.axis_color,
        );
    }

    fn draw_grid(&self, ctx: &mut vello_cpu::RenderContext, cam: &Camera, xf: Affine) {
        let plot = self.layout.plot;
        let color = self
            .config
            .theme
            .grid_color
            .with_alpha_mul(self.config.grid_alpha);
        let half = (self.config.grid_width * self.ui_scale()).max(0.5) / 2.0;

        let (prices, _) = price_ticks(cam);
        for p in prices {
            let y = (xf * Point::new(0.0, p)).y;
            fill_rect(ctx, Rect::new(plot.x0, y - half, plot.x1, y + half), color);
        }
        for i in index_ticks(cam) {
            let x = (xf * Point::new(i, 0.0)).x;
            fill_rect(ctx, Rect::new(x - half, plot.y0, x + half, plot.y1), color);
        }
    }

    fn draw_gutters(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        cam: &Camera,
        xf: Affine,
    ) -> TradeanimResult<()> {
        let layout = self.layout;
        let theme = self.config.theme.clone();
        let s = self.ui_scale();

        fill_rect(ctx, layout.price_gutter, theme.background);
        fill_rect(ctx, layout.time_gutter, theme.background);
        let sep = s.max(1.0);
        fill_rect(
            ctx,
            Rect::new(layout.plot.x1, layout.plot.y0, layout.plot.x1 + sep, layout.plot.y1),
            theme.axis_color,
        );
        fill_rect(
            ctx,
            Rect::new(layout.plot.x0, layout.plot.y1, layout.plot.x1 + sep, layout.plot.y1 + sep),
            theme.axis_color,
        );

        if !self.config.show_price_labels {
            return Ok(());
        }
        let (prices, step) = price_ticks(cam);
        let decimals = decimals_for(step);
        for p in prices {
            let y = (xf * Point::new(0.0, p)).y;
            if y < layout.plot.y0 || y > layout.plot.y1 {
                continue;
            }
            fill_rect(
                ctx,
                Rect::new(layout.plot.x1, y - sep / 2.0, layout.plot.x1 + 4.0 * s, y + sep / 2.0),
                theme.axis_color,
            );
            self.label(
                ctx,
                &format!("{p:.decimals$}"),
                Point::new(layout.plot.x1 + 6.0 * s, y),
                11.0 * s,
                theme.axis_color,
                HAlign::Left,
                VAlign::Center,
            )?;
        }
        if layout.time_gutter.height() >= 1.0 {
            for i in index_ticks(cam) {
                let x = (xf * Point::new(i, 0.0)).x;
                if x < layout.plot.x0 || x > layout.plot.x1 {
                    continue;
                }
                self.label(
                    ctx,
                    &format!("{i:.0}"),
                    Point::new(x, layout.time_gutter.y0 + 4.0 * s),
                    10.0 * s,
                    theme.axis_color,
                    HAlign::Center,
                    VAlign::Top,
                )?;
            }
        }
        Ok(())
    }

    fn draw_watermark(&mut self, ctx: &mut vello_cpu::RenderContext) -> TradeanimResult<()> {
        let Some(mark) = self.config.watermark.clone() else {
            return Ok(());
        };
        let color = self
            .config
            .theme
            .text_color
            .with_alpha_mul(self.config.watermark_alpha);
        let center = self.layout.plot.center();
        self.label(
            ctx,
            &mark,
            center,
            48.0 * self.ui_scale(),
            color,
            HAlign::Center,
            VAlign::Center,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn label(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        text: &str,
        anchor: Point,
        size_px: f64,
        color: Color,
        h: HAlign,
        v: VAlign,
    ) -> TradeanimResult<()> {
        let family = self.config.font_family.clone();
        let style = TextStyle {
            text,
            family: &family,
            size_px,
            bold: false,
            color,
            outline: None,
        };
        if let Some(img) = self.text.rasterize(&style)? {
            draw_image(ctx, &img, place(&img, anchor, h, v, 0.0));
        }
        Ok(())
    }

    fn draw_element(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        e: &Element,
        cam: &Camera,
        xf: Affine,
    ) -> TradeanimResult<()> {
        let opacity = e.opacity.clamp(0.0, 1.0);
        match &e.kind {
            ElementKind::Candle(c) => {
                self.draw_candle(ctx, c, opacity, xf);
                Ok(())
            }
            ElementKind::OhlcBar(b) => {
                self.draw_ohlc_bar(ctx, b, opacity, xf);
                Ok(())
            }
            ElementKind::Line(l) => self.draw_line(ctx, l, opacity, xf),
            ElementKind::Area(a) => self.draw_area(ctx, a, opacity, cam, xf),
            ElementKind::FillBetween(f) => {
                self.draw_fill_between(ctx, f, opacity, xf);
                Ok(())
            }
            ElementKind::Zone(z) => self.draw_zone(ctx, z, opacity, cam, xf),
            ElementKind::HLine(h) => self.draw_hline(ctx, h, opacity, cam, xf),
            ElementKind::Arrow(a) => self.draw_arrow(ctx, a, opacity, xf),
            ElementKind::Text(t) => self.draw_text(ctx, t, opacity, xf),
        }
    }

    fn body_and_wick(&self, bull: bool, bull_c: Option<Color>, bear_c: Option<Color>) -> (Color, Color) {
        let theme = &self.config.theme;
        if bull {
            let own = bull_c.or(self.config.candle_bull_override);
            (own.unwrap_or(theme.bull_body), own.unwrap_or(theme.bull_wick))
        } else {
            let own = bear_c.or(self.config.candle_bear_override);
            (own.unwrap_or(theme.bear_body), own.unwrap_or(theme.bear_wick))
        }
    }

    fn draw_candle(&self, ctx: &mut vello_cpu::RenderContext, c: &Candle, opacity: f64, xf: Affine) {
        let (body, wick) = self.body_and_wick(c.is_bull(), c.bull_color, c.bear_color);
        let [o, h, l, cl] = scaled_ohlc(c.open, c.high, c.low, c.close, c.offset_y, c.scale_y);
        let x = c.index as f64;
        let half_w = self.config.candle_width / 2.0;
        let body_bottom = o.min(cl);
        let body_h = (cl - o).abs().max((h - l) * 0.01);
        let s = self.ui_scale();

        let mut body_px =
            xf.transform_rect_bbox(Rect::new(x - half_w, body_bottom, x + half_w, body_bottom + body_h));
        if body_px.height() < 1.0 {
            let mid = body_px.center().y;
            body_px.y0 = mid - 0.5;
            body_px.y1 = mid + 0.5;
        }

        if self.config.candle_shadow {
            let off = Vec2::new(2.0 * s, 2.0 * s);
            fill_rect(ctx, body_px + off, Color::rgba(0.0, 0.0, 0.0, 0.35 * opacity));
        }

        let px = (xf * Point::new(x, 0.0)).x;
        let top = (xf * Point::new(x, h)).y;
        let bottom = (xf * Point::new(x, l)).y;
        let ww = (self.config.wick_width * s).max(1.0) / 2.0;
        fill_rect(
            ctx,
            Rect::new(px - ww, top.min(bottom), px + ww, top.max(bottom)),
            wick.with_alpha_mul(opacity),
        );
        fill_rect(ctx, body_px, body.with_alpha_mul(opacity));
    }

    fn draw_ohlc_bar(&self, ctx: &mut vello_cpu::RenderContext, b: &OhlcBar, opacity: f64, xf: Affine) {
        let (color, _) = self.body_and_wick(b.close >= b.open, b.bull_color, b.bear_color);
        let color = color.with_alpha_mul(opacity);
        let [o, h, l, cl] = scaled_ohlc(b.open, b.high, b.low, b.close, b.offset_y, b.scale_y);
        let x = b.index as f64;
        let hw = (self.config.wick_width * self.ui_scale()).max(1.0) / 2.0;

        let p = |x: f64, y: f64| xf * Point::new(x, y);
        let (hi, lo) = (p(x, h), p(x, l));
        fill_rect(ctx, Rect::new(hi.x - hw, hi.y.min(lo.y), hi.x + hw, hi.y.max(lo.y)), color);
        let (ol, oc) = (p(x - b.tick_width, o), p(x, o));
        fill_rect(ctx, Rect::new(ol.x, ol.y - hw, oc.x, oc.y + hw), color);
        let (cc, cr) = (p(x, cl), p(x + b.tick_width, cl));
        fill_rect(ctx, Rect::new(cc.x, cc.y - hw, cr.x, cr.y + hw), color);
    }

    fn dashes(&self, dashed: bool) -> Option<[f64; 2]> {
        let s = self.ui_scale().max(0.25);
        dashed.then(|| [6.0 * s, 4.0 * s])
    }

    fn draw_line(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        l: &Line,
        opacity: f64,
        xf: Affine,
    ) -> TradeanimResult<()> {
        let pts = l.visible_points();
        if pts.len() < 2 {
            return Ok(());
        }
        let color = l.color.with_alpha_mul(opacity);
        let path = polyline(pts.iter().map(|p| xf * *p), false);
        stroke_path(
            ctx,
            &path,
            l.line_width * self.ui_scale(),
            self.dashes(l.dashed).as_ref().map(|d| d.as_slice()),
            color,
        );
        if !l.label.is_empty() && l.draw_progress >= 1.0 {
            let last = pts[pts.len() - 1];
            self.label(
                ctx,
                &l.label,
                xf * Point::new(last.x + 0.5, last.y),
                9.0 * self.ui_scale(),
                color,
                HAlign::Left,
                VAlign::Center,
            )?;
        }
        Ok(())
    }

    fn draw_area(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        a: &Area,
        opacity: f64,
        cam: &Camera,
        xf: Affine,
    ) -> TradeanimResult<()> {
        let pts = a.visible_points();
        if pts.len() < 2 {
            return Ok(());
        }
        let baseline = a.baseline.unwrap_or(cam.price_min);
        let first = pts[0];
        let last = pts[pts.len() - 1];
        let outline: Vec<Point> = pts.iter().map(|p| xf * *p).collect();
        let poly = polyline(
            outline
                .iter()
                .copied()
                .chain([xf * Point::new(last.x, baseline), xf * Point::new(first.x, baseline)]),
            true,
        );

        let top_y = outline.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
        let base_y = (xf * Point::new(0.0, baseline)).y;
        let top = Color {
            a: (a.fill_alpha_top * opacity).clamp(0.0, 1.0),
            ..a.fill_color
        };
        let bottom = Color {
            a: (a.fill_alpha_bottom * opacity).clamp(0.0, 1.0),
            ..a.fill_color
        };
        self.fill_path_gradient(ctx, &poly, top_y, base_y, top, bottom)?;

        let color = a.color.with_alpha_mul(opacity);
        stroke_path(
            ctx,
            &polyline(outline.iter().copied(), false),
            a.line_width * self.ui_scale(),
            None,
            color,
        );
        if !a.label.is_empty() && a.draw_progress >= 1.0 {
            self.label(
                ctx,
                &a.label,
                xf * Point::new(last.x + 0.5, last.y),
                9.0 * self.ui_scale(),
                color,
                HAlign::Left,
                VAlign::Center,
            )?;
        }
        Ok(())
    }

    fn draw_fill_between(
        &self,
        ctx: &mut vello_cpu::RenderContext,
        f: &FillBetween,
        opacity: f64,
        xf: Affine,
    ) {
        let n = f.visible_len();
        if n < 2 {
            return;
        }
        let upper: Vec<Point> = (0..n).map(|i| xf * Point::new(f.xs[i], f.upper[i])).collect();
        let lower: Vec<Point> = (0..n).map(|i| xf * Point::new(f.xs[i], f.lower[i])).collect();
        let band = polyline(upper.iter().chain(lower.iter().rev()).copied(), true);
        fill_path(ctx, &band, f.fill_color.with_alpha_mul(opacity));
        if let Some(edge) = f.edge_color {
            let w = f.edge_width * self.ui_scale();
            let edge = edge.with_alpha_mul(opacity);
            stroke_path(ctx, &polyline(upper.iter().copied(), false), w, None, edge);
            stroke_path(ctx, &polyline(lower.iter().copied(), false), w, None, edge);
        }
    }

    fn draw_zone(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        z: &Zone,
        opacity: f64,
        cam: &Camera,
        xf: Affine,
    ) -> TradeanimResult<()> {
        let x2 = if z.extend_right { cam.view_end } else { z.x2 };
        let r = xf.transform_rect_bbox(Rect::new(z.x1, z.y1, x2, z.y2));
        fill_rect(ctx, r, z.fill_color.with_alpha_mul(opacity));
        if let Some(border) = z.border_color {
            stroke_path(
                ctx,
                &r.to_path(STROKE_TOLERANCE),
                z.border_width * self.ui_scale(),
                None,
                border.with_alpha_mul(opacity),
            );
        }
        if !z.label.is_empty() {
            self.label(
                ctx,
                &z.label,
                xf * Point::new(z.x1.min(x2) + 0.3, (z.y1 + z.y2) / 2.0),
                z.label_size * self.ui_scale(),
                z.label_color.with_alpha_mul(opacity),
                HAlign::Left,
                VAlign::Center,
            )?;
        }
        Ok(())
    }

    fn draw_hline(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        h: &HLine,
        opacity: f64,
        cam: &Camera,
        xf: Affine,
    ) -> TradeanimResult<()> {
        let xs = h.x_start.unwrap_or(cam.view_start);
        let xe = h.x_end.unwrap_or(cam.view_end);
        let color = h.color.with_alpha_mul(opacity);
        let path = polyline([xf * Point::new(xs, h.y), xf * Point::new(xe, h.y)], false);
        stroke_path(
            ctx,
            &path,
            h.line_width * self.ui_scale(),
            self.dashes(h.dashed).as_ref().map(|d| d.as_slice()),
            color,
        );
        if !h.label.is_empty() {
            self.label(
                ctx,
                &h.label,
                xf * Point::new(xe + 0.3, h.y),
                h.label_size * self.ui_scale(),
                h.label_color.unwrap_or(h.color).with_alpha_mul(opacity),
                HAlign::Left,
                VAlign::Center,
            )?;
        }
        Ok(())
    }

    fn draw_arrow(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        a: &Arrow,
        opacity: f64,
        xf: Affine,
    ) -> TradeanimResult<()> {
        let s = self.ui_scale();
        let tail = xf * Point::new(a.x1, a.y1);
        let tip = xf * Point::new(a.x2, a.y2);
        let d = tip - tail;
        let len = d.hypot();
        let color = a.color.with_alpha_mul(opacity);
        if len > 1e-6 {
            let slot = xf.as_coeffs()[0].abs();
            let head_len = (a.head_length * slot).max(4.0 * s).min(len);
            let head_w = (a.head_width * slot).max(4.0 * s);
            let dir = d / len;
            let normal = Vec2::new(-dir.y, dir.x);
            let base = tip - dir * head_len;
            stroke_path(
                ctx,
                &polyline([tail, base], false),
                a.line_width * s,
                None,
                color,
            );
            let head = polyline(
                [
                    tip,
                    base + normal * (head_w / 2.0),
                    base - normal * (head_w / 2.0),
                ],
                true,
            );
            fill_path(ctx, &head, color);
        }
        if !a.label.is_empty() {
            let mid = Point::new((a.x1 + a.x2) / 2.0, (a.y1 + a.y2) / 2.0);
            self.label(
                ctx,
                &a.label,
                xf * mid,
                10.0 * s,
                color,
                HAlign::Center,
                VAlign::Bottom,
            )?;
        }
        Ok(())
    }

    fn draw_text(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        t: &Text,
        opacity: f64,
        xf: Affine,
    ) -> TradeanimResult<()> {
        let shown = t.visible_text();
        if shown.is_empty() {
            return Ok(());
        }
        let s = self.ui_scale();
        let size = t.font_size * t.scale * s;
        let plot = self.layout.plot;
        let anchor = if t.data_coords {
            xf * Point::new(t.x, t.y)
        } else {
            Point::new(
                plot.x0 + t.x * plot.width(),
                plot.y1 - t.y * plot.height(),
            )
        };
        let family = t
            .font_family
            .clone()
            .unwrap_or_else(|| self.config.font_family.clone());

        let layered = opacity < 1.0;
        if layered {
            ctx.push_opacity_layer(opacity as f32);
        }
        if let Some(shadow) = &t.shadow {
            let style = TextStyle {
                text: shown,
                family: &family,
                size_px: size,
                bold: t.bold,
                color: shadow.color,
                outline: None,
            };
            if let Some(img) = self.text.rasterize(&style)? {
                let at = anchor + shadow.offset * s;
                draw_image(ctx, &img, place(&img, at, t.h_align, t.v_align, t.rotation));
            }
        }
        let style = TextStyle {
            text: shown,
            family: &family,
            size_px: size,
            bold: t.bold,
            color: t.color,
            outline: t.outline.as_ref().map(|o| (o.color, o.width * s)),
        };
        if let Some(img) = self.text.rasterize(&style)? {
            let at = place(&img, anchor, t.h_align, t.v_align, t.rotation);
            if let Some(bg) = &t.background {
                let pad = bg.padding * s;
                let r = Rect::new(
                    1.0 - pad,
                    1.0 - pad,
                    1.0 + img.ink_width() + pad,
                    1.0 + img.ink_height() + pad,
                );
                ctx.set_transform(affine_to_cpu(at));
                ctx.set_paint(to_paint(bg.color));
                ctx.fill_rect(&rect_to_cpu(r));
                ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
            }
            draw_image(ctx, &img, at);
        }
        if layered {
            ctx.pop_layer();
        }
        Ok(())
    }
}

impl RenderBackend for CpuBackend {
    fn render(&mut self, state: &FrameState, _sample_time: f64) -> TradeanimResult<FrameRGBA> {
        let (w, h) = (self.width, self.height);
        let raster = self.with_ctx_mut(|this, ctx| {
            this.draw_frame(ctx, state)?;
            let mut pixmap = vello_cpu::Pixmap::new(w, h);
            ctx.flush();
            ctx.render_to_pixmap(&mut pixmap);
            Ok(FrameRGBA {
                width: u32::from(w),
                height: u32::from(h),
                data: pixmap.data_as_u8_slice().to_vec(),
                premultiplied: true,
            })
        })?;
        let mut frame = post::downsample(raster, self.supersample)?;
        if self.config.post.is_enabled() {
            post::apply(&mut frame, &self.config.post)?;
        }
        Ok(frame)
    }
}

fn ordered(state: &FrameState, layer: Layer) -> Vec<&Element> {
    let mut items: Vec<(i32, usize, &Element)> = state
        .elements()
        .enumerate()
        .filter(|(_, (_, e))| e.is_shown() && e.layer() == layer)
        .map(|(i, (_, e))| (e.z_order, i, e))
        .collect();
    items.sort_by_key(|(z, i, _)| (*z, *i));
    items.into_iter().map(|(_, _, e)| e).collect()
}

fn scaled_ohlc(open: f64, high: f64, low: f64, close: f64, offset: f64, scale: f64) -> [f64; 4] {
    let [o, h, l, c] = [open, high, low, close].map(|v| v + offset);
    let mid = (o + c) / 2.0;
    [o, h, l, c].map(|v| mid + (v - mid) * scale)
}

/// Grid prices inside the camera's price range and the step between them.
pub(crate) fn price_ticks(cam: &Camera) -> (Vec<f64>, f64) {
    let lo = cam.price_min.min(cam.price_max);
    let hi = cam.price_min.max(cam.price_max);
    let step = nice_step(hi - lo, 8);
    (ticks(lo, hi, step), step)
}

fn index_ticks(cam: &Camera) -> Vec<f64> {
    let (x0, x1) = cam.x_bounds();
    let step = nice_step(x1 - x0, 10).max(1.0).round();
    ticks(x0, x1, step)
}

fn ticks(lo: f64, hi: f64, step: f64) -> Vec<f64> {
    if !(lo.is_finite() && hi.is_finite() && step > 0.0) {
        return Vec::new();
    }
    let first = (lo / step).ceil();
    (0..256)
        .map(|k| (first + k as f64) * step)
        .take_while(|v| *v <= hi + step * 1e-9)
        .collect()
}

/// Decimal places needed to print multiples of `step` exactly.
pub(crate) fn decimals_for(step: f64) -> usize {
    if !(step.is_finite() && step > 0.0) {
        return 2;
    }
    let mut d = (-step.log10()).ceil().max(0.0) as usize;
    let scaled = step * 10f64.powi(d as i32);
    if (scaled - scaled.round()).abs() > 1e-9 {
        d += 1;
    }
    d.min(8)
}

fn place(img: &TextImage, anchor: Point, h: HAlign, v: VAlign, rotation_deg: f64) -> Affine {
    let ax = 1.0
        + img.ink_width()
            * match h {
                HAlign::Left => 0.0,
                HAlign::Center => 0.5,
                HAlign::Right => 1.0,
            };
    let ay = 1.0
        + img.ink_height()
            * match v {
                VAlign::Top => 0.0,
                VAlign::Center => 0.5,
                VAlign::Bottom => 1.0,
            };
    Affine::translate(anchor.to_vec2())
        * Affine::rotate(-rotation_deg.to_radians())
        * Affine::translate((-ax, -ay))
}

fn draw_image(ctx: &mut vello_cpu::RenderContext, img: &TextImage, at: Affine) {
    ctx.set_transform(affine_to_cpu(at));
    ctx.set_paint(img.image.clone());
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
        0.0,
        0.0,
        f64::from(img.width),
        f64::from(img.height),
    ));
    ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
}

fn polyline(points: impl IntoIterator<Item = Point>, close: bool) -> BezPath {
    let mut path = BezPath::new();
    for (i, p) in points.into_iter().enumerate() {
        if i == 0 {
            path.move_to(p);
        } else {
            path.line_to(p);
        }
    }
    if close {
        path.close_path();
    }
    path
}

fn to_paint(c: Color) -> vello_cpu::peniko::Color {
    let [r, g, b, a] = c.to_rgba8();
    vello_cpu::peniko::Color::from_rgba8(r, g, b, a)
}

fn fill_rect(ctx: &mut vello_cpu::RenderContext, r: Rect, color: Color) {
    if color.a <= 0.0 || r.width() <= 0.0 || r.height() <= 0.0 {
        return;
    }
    ctx.set_paint(to_paint(color));
    ctx.fill_rect(&rect_to_cpu(r));
}

fn fill_path(ctx: &mut vello_cpu::RenderContext, path: &BezPath, color: Color) {
    if color.a <= 0.0 {
        return;
    }
    ctx.set_paint(to_paint(color));
    ctx.fill_path(&bezpath_to_cpu(path));
}

/// Stroke in pixel space by filling the stroke outline.
fn stroke_path(
    ctx: &mut vello_cpu::RenderContext,
    path: &BezPath,
    width: f64,
    dashes: Option<&[f64]>,
    color: Color,
) {
    if !(width > 0.0) || color.a <= 0.0 {
        return;
    }
    let mut style = Stroke::new(width).with_caps(Cap::Butt).with_join(Join::Round);
    if let Some(pattern) = dashes {
        style = style.with_dashes(0.0, pattern.iter().copied());
    }
    let outline = kurbo::stroke(path.iter(), &style, &StrokeOpts::default(), STROKE_TOLERANCE);
    fill_path(ctx, &outline, color);
}

fn rect_to_cpu(r: Rect) -> vello_cpu::kurbo::Rect {
    vello_cpu::kurbo::Rect::new(r.x0, r.y0, r.x1, r.y1)
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(vello_cpu::kurbo::Point::new(p.x, p.y)),
            PathEl::LineTo(p) => out.line_to(vello_cpu::kurbo::Point::new(p.x, p.y)),
            PathEl::QuadTo(p1, p2) => out.quad_to(
                vello_cpu::kurbo::Point::new(p1.x, p1.y),
                vello_cpu::kurbo::Point::new(p2.x, p2.y),
            ),
            PathEl::CurveTo(p1, p2, p3) => out.curve_to(
                vello_cpu::kurbo::Point::new(p1.x, p1.y),
                vello_cpu::kurbo::Point::new(p2.x, p2.y),
                vello_cpu::kurbo::Point::new(p3.x, p3.y),
            ),
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

fn pixmap_from_premul_bytes(
    bytes: &[u8],
    width: u32,
    height: u32,
) -> TradeanimResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| TradeanimError::render("pixmap width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| TradeanimError::render("pixmap height exceeds u16"))?;
    if bytes.len() != FrameRGBA::expected_len(width, height) {
        return Err(TradeanimError::render("pixmap byte len mismatch"));
    }
    let pixels = bytes
        .chunks_exact(4)
        .map(|px| vello_cpu::peniko::color::PremulRgba8::from_u8_array([px[0], px[1], px[2], px[3]]))
        .collect::<Vec<_>>();
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(pixels, w, h, true))
}

/// Wrap premultiplied RGBA8 bytes as an image paint.
pub(crate) fn premul_image(bytes: &[u8], width: u32, height: u32) -> TradeanimResult<vello_cpu::Image> {
    let pixmap = pixmap_from_premul_bytes(bytes, width, height)?;
    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
