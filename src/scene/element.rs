use crate::config::theme::Theme;
use crate::foundation::color::{Color, hex_or_magenta};
use crate::foundation::core::{Point, Vec2};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// What an element's state exposes to animations.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct Capabilities: u32 {
        /// Rasterized by the frame renderer.
        const DRAWABLE        = 1 << 0;
        /// Has an opacity that can be animated.
        const OPACITY         = 1 << 1;
        /// Has an anchor position that can be moved.
        const POSITION        = 1 << 2;
        /// Path geometry revealable by a draw-progress fraction.
        const PROGRESSIVE     = 1 << 3;
        /// Text revealable character by character.
        const TEXT_REVEAL     = 1 << 4;
        /// Has a scale factor.
        const SCALE           = 1 << 5;
        /// Has a rotation angle.
        const ROTATION        = 1 << 6;
        /// Has a primary color.
        const COLOR           = 1 << 7;
        /// Has y values that can be morphed point by point.
        const POINTS          = 1 << 8;
        /// Has a vertical data-space offset.
        const VERTICAL_OFFSET = 1 << 9;
        /// Rectangular price/index zone.
        const ZONE            = 1 << 10;
    }
}

/// Z-order band an element is drawn in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Layer {
    /// Candles, bars, lines, areas, zones and levels.
    Data,
    /// Arrows and data-anchored text.
    Annotation,
    /// Screen-anchored text drawn above the axis gutters.
    Overlay,
}

/// A drawable entity: shared visual state plus kind-specific geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Drawn at all.
    #[serde(default = "yes")]
    pub visible: bool,
    /// Opacity multiplier in `[0, 1]`.
    #[serde(default = "one")]
    pub opacity: f64,
    /// Ordering inside the element's [`Layer`]; ties keep insertion order.
    #[serde(default)]
    pub z_order: i32,
    /// Kind-specific state.
    #[serde(flatten)]
    pub kind: ElementKind,
}

/// Element kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ElementKind {
    /// Candlestick.
    Candle(Candle),
    /// OHLC bar with open/close ticks.
    OhlcBar(OhlcBar),
    /// Polyline.
    Line(Line),
    /// Polyline with a gradient fill down to a baseline.
    Area(Area),
    /// Band between an upper and a lower series.
    FillBetween(FillBetween),
    /// Price/index rectangle.
    Zone(Zone),
    /// Horizontal price level.
    #[serde(rename = "hline", alias = "h_line")]
    HLine(HLine),
    /// Arrow between two data points.
    Arrow(Arrow),
    /// Text label.
    Text(Text),
}

fn yes() -> bool {
    true
}

fn one() -> f64 {
    1.0
}

fn default_blue() -> Color {
    hex_or_magenta("#2196F3")
}

fn default_text_color() -> Color {
    hex_or_magenta("#d1d4dc")
}

/// One candlestick in index/price space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Horizontal slot.
    pub index: i64,
    /// Open price.
    pub open: f64,
    /// High price.
    pub high: f64,
    /// Low price.
    pub low: f64,
    /// Close price.
    pub close: f64,
    /// Body color override for bullish candles.
    #[serde(default)]
    pub bull_color: Option<Color>,
    /// Body color override for bearish candles.
    #[serde(default)]
    pub bear_color: Option<Color>,
    /// Vertical scale about the body midpoint.
    #[serde(default = "one")]
    pub scale_y: f64,
    /// Vertical offset in price units.
    #[serde(default)]
    pub offset_y: f64,
    /// Traded volume, drawn in the volume panel when enabled.
    #[serde(default)]
    pub volume: f64,
}

impl Candle {
    /// `close >= open`.
    pub fn is_bull(&self) -> bool {
        self.close >= self.open
    }

    /// Body midpoint.
    pub fn mid(&self) -> f64 {
        (self.open + self.close) / 2.0
    }
}

/// One OHLC bar in index/price space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcBar {
    /// Horizontal slot.
    pub index: i64,
    /// Open price.
    pub open: f64,
    /// High price.
    pub high: f64,
    /// Low price.
    pub low: f64,
    /// Close price.
    pub close: f64,
    /// Color override for bullish bars.
    #[serde(default)]
    pub bull_color: Option<Color>,
    /// Color override for bearish bars.
    #[serde(default)]
    pub bear_color: Option<Color>,
    /// Vertical scale about the open/close midpoint.
    #[serde(default = "one")]
    pub scale_y: f64,
    /// Vertical offset in price units.
    #[serde(default)]
    pub offset_y: f64,
    /// Length of the open/close ticks in index units.
    #[serde(default = "default_tick_width")]
    pub tick_width: f64,
    /// Traded volume, drawn in the volume panel when enabled.
    #[serde(default)]
    pub volume: f64,
}

fn default_tick_width() -> f64 {
    0.3
}

/// Polyline in data space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    /// Vertices.
    pub points: Vec<Point>,
    /// Stroke color.
    #[serde(default = "default_blue")]
    pub color: Color,
    /// Stroke width in pixels.
    #[serde(default = "default_line_width")]
    pub line_width: f64,
    /// Dashed stroke.
    #[serde(default)]
    pub dashed: bool,
    /// Fraction of the vertices drawn.
    #[serde(default = "one")]
    pub draw_progress: f64,
    /// Label drawn at the last vertex once fully drawn.
    #[serde(default)]
    pub label: String,
}

fn default_line_width() -> f64 {
    1.5
}

/// Filled polyline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Area {
    /// Vertices.
    pub points: Vec<Point>,
    /// Outline color.
    #[serde(default = "default_blue")]
    pub color: Color,
    /// Outline width in pixels.
    #[serde(default = "default_line_width")]
    pub line_width: f64,
    /// Fill color; its alpha is replaced by the gradient alphas.
    #[serde(default = "default_blue")]
    pub fill_color: Color,
    /// Fill alpha at the top of the area.
    #[serde(default = "default_fill_alpha_top")]
    pub fill_alpha_top: f64,
    /// Fill alpha at the baseline.
    #[serde(default)]
    pub fill_alpha_bottom: f64,
    /// Baseline price; defaults to the bottom of the view.
    #[serde(default)]
    pub baseline: Option<f64>,
    /// Fraction of the vertices drawn.
    #[serde(default = "one")]
    pub draw_progress: f64,
    /// Label drawn at the last vertex once fully drawn.
    #[serde(default)]
    pub label: String,
}

fn default_fill_alpha_top() -> f64 {
    0.4
}

/// Band between two series sharing x values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillBetween {
    /// Shared x values.
    pub xs: Vec<f64>,
    /// Upper series.
    pub upper: Vec<f64>,
    /// Lower series.
    pub lower: Vec<f64>,
    /// Fill color.
    #[serde(default = "default_band_fill")]
    pub fill_color: Color,
    /// Optional edge stroke.
    #[serde(default)]
    pub edge_color: Option<Color>,
    /// Edge width in pixels.
    #[serde(default = "default_edge_width")]
    pub edge_width: f64,
    /// Fraction of the samples drawn.
    #[serde(default = "one")]
    pub draw_progress: f64,
}

fn default_band_fill() -> Color {
    hex_or_magenta("#2196F315")
}

fn default_edge_width() -> f64 {
    0.5
}

/// Rectangle spanning `[x1, x2]` by `[y1, y2]` in data space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    /// Left index.
    pub x1: f64,
    /// Right index.
    pub x2: f64,
    /// Lower price.
    pub y1: f64,
    /// Upper price.
    pub y2: f64,
    /// Fill color.
    #[serde(default = "default_zone_fill")]
    pub fill_color: Color,
    /// Optional border stroke.
    #[serde(default)]
    pub border_color: Option<Color>,
    /// Border width in pixels.
    #[serde(default = "one")]
    pub border_width: f64,
    /// Label drawn in the top-left corner.
    #[serde(default)]
    pub label: String,
    /// Label color.
    #[serde(default = "default_text_color")]
    pub label_color: Color,
    /// Label size in pixels.
    #[serde(default = "default_label_size")]
    pub label_size: f64,
    /// Stretch to the right edge of the view.
    #[serde(default)]
    pub extend_right: bool,
}

fn default_zone_fill() -> Color {
    hex_or_magenta("#2196F340")
}

fn default_label_size() -> f64 {
    10.0
}

/// Horizontal price level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HLine {
    /// Price.
    pub y: f64,
    /// Stroke color.
    #[serde(default = "default_level_color")]
    pub color: Color,
    /// Stroke width in pixels.
    #[serde(default = "one")]
    pub line_width: f64,
    /// Dashed stroke.
    #[serde(default = "yes")]
    pub dashed: bool,
    /// Label drawn at the right end.
    #[serde(default)]
    pub label: String,
    /// Label color; defaults to the line color.
    #[serde(default)]
    pub label_color: Option<Color>,
    /// Label size in pixels.
    #[serde(default = "default_label_size")]
    pub label_size: f64,
    /// Left end; defaults to the left edge of the view.
    #[serde(default)]
    pub x_start: Option<f64>,
    /// Right end; defaults to the right edge of the view.
    #[serde(default)]
    pub x_end: Option<f64>,
}

fn default_level_color() -> Color {
    hex_or_magenta("#787b86")
}

/// Arrow from `(x1, y1)` to `(x2, y2)` in data space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arrow {
    /// Tail index.
    pub x1: f64,
    /// Tail price.
    pub y1: f64,
    /// Head index.
    pub x2: f64,
    /// Head price.
    pub y2: f64,
    /// Stroke and head color.
    #[serde(default = "default_text_color")]
    pub color: Color,
    /// Shaft width in pixels.
    #[serde(default = "default_line_width")]
    pub line_width: f64,
    /// Head width relative to a candle slot.
    #[serde(default = "default_head_width")]
    pub head_width: f64,
    /// Head length relative to a candle slot.
    #[serde(default = "default_head_length")]
    pub head_length: f64,
    /// Label drawn at the tail.
    #[serde(default)]
    pub label: String,
}

fn default_head_width() -> f64 {
    0.3
}

fn default_head_length() -> f64 {
    0.2
}

/// Horizontal text alignment relative to the anchor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HAlign {
    /// Anchor at the left edge.
    #[default]
    Left,
    /// Anchor at the center.
    Center,
    /// Anchor at the right edge.
    Right,
}

/// Vertical text alignment relative to the anchor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VAlign {
    /// Anchor at the top edge.
    Top,
    /// Anchor at the vertical center.
    Center,
    /// Anchor at the bottom edge.
    #[default]
    Bottom,
}

/// Filled box behind text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBox {
    /// Box color.
    pub color: Color,
    /// Padding around the text in pixels.
    #[serde(default = "default_box_padding")]
    pub padding: f64,
}

fn default_box_padding() -> f64 {
    4.0
}

/// Stroke drawn around glyphs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextOutline {
    /// Outline color.
    pub color: Color,
    /// Outline width in pixels.
    #[serde(default = "default_outline_width")]
    pub width: f64,
}

fn default_outline_width() -> f64 {
    2.0
}

/// Offset copy drawn beneath text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextShadow {
    /// Shadow color.
    pub color: Color,
    /// Pixel offset.
    #[serde(default = "default_shadow_offset")]
    pub offset: Vec2,
}

fn default_shadow_offset() -> Vec2 {
    Vec2::new(2.0, 2.0)
}

/// Text label.
///
/// With `data_coords` the anchor is `(index, price)`; otherwise it is a fraction of the plot
/// area measured from the bottom-left corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    /// Full text.
    pub text: String,
    /// Anchor x.
    pub x: f64,
    /// Anchor y.
    pub y: f64,
    /// Fill color.
    #[serde(default = "default_text_color")]
    pub color: Color,
    /// Font size in pixels.
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    /// Bold weight.
    #[serde(default)]
    pub bold: bool,
    /// Font family override; `None` uses the render config family.
    #[serde(default)]
    pub font_family: Option<String>,
    /// Horizontal alignment.
    #[serde(default)]
    pub h_align: HAlign,
    /// Vertical alignment.
    #[serde(default)]
    pub v_align: VAlign,
    /// Rotation in degrees, counter-clockwise.
    #[serde(default)]
    pub rotation: f64,
    /// Fraction of characters shown.
    #[serde(default = "one")]
    pub char_progress: f64,
    /// Anchor in data coordinates instead of plot fractions.
    #[serde(default = "yes")]
    pub data_coords: bool,
    /// Scale applied to the font size.
    #[serde(default = "one")]
    pub scale: f64,
    /// Optional background box.
    #[serde(default)]
    pub background: Option<TextBox>,
    /// Optional glyph outline.
    #[serde(default)]
    pub outline: Option<TextOutline>,
    /// Optional drop shadow.
    #[serde(default)]
    pub shadow: Option<TextShadow>,
}

fn default_font_size() -> f64 {
    14.0
}

impl Text {
    /// Prefix of `text` selected by `char_progress`, counted in characters.
    pub fn visible_text(&self) -> &str {
        let total = self.text.chars().count();
        let n = reveal_count(total, self.char_progress, 0);
        match self.text.char_indices().nth(n) {
            Some((byte, _)) => &self.text[..byte],
            None => &self.text,
        }
    }
}

impl Line {
    /// Leading vertices selected by `draw_progress` (at least one).
    pub fn visible_points(&self) -> &[Point] {
        &self.points[..reveal_count(self.points.len(), self.draw_progress, 1)]
    }
}

impl Area {
    /// Leading vertices selected by `draw_progress` (at least one).
    pub fn visible_points(&self) -> &[Point] {
        &self.points[..reveal_count(self.points.len(), self.draw_progress, 1)]
    }
}

impl FillBetween {
    /// Number of leading samples selected by `draw_progress`, bounded by the shortest series.
    pub fn visible_len(&self) -> usize {
        let n = self.xs.len().min(self.upper.len()).min(self.lower.len());
        reveal_count(n, self.draw_progress, 1)
    }
}

/// Number of items revealed out of `total` at `progress`, never below `min`.
pub(crate) fn reveal_count(total: usize, progress: f64, min: usize) -> usize {
    if total == 0 {
        return 0;
    }
    let p = if progress.is_nan() {
        0.0
    } else {
        progress.clamp(0.0, 1.0)
    };
    ((total as f64 * p).floor() as usize).clamp(min.min(total), total)
}

impl Element {
    /// Wrap a kind with default shared state (visible, opaque).
    pub fn new(kind: ElementKind) -> Self {
        Self {
            visible: true,
            opacity: 1.0,
            z_order: 0,
            kind,
        }
    }

    /// Candlestick at `index`.
    pub fn candle(index: i64, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self::new(ElementKind::Candle(Candle {
            index,
            open,
            high,
            low,
            close,
            bull_color: None,
            bear_color: None,
            scale_y: 1.0,
            offset_y: 0.0,
            volume: 0.0,
        }))
    }

    /// OHLC bar at `index`.
    pub fn ohlc_bar(index: i64, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self::new(ElementKind::OhlcBar(OhlcBar {
            index,
            open,
            high,
            low,
            close,
            bull_color: None,
            bear_color: None,
            scale_y: 1.0,
            offset_y: 0.0,
            tick_width: default_tick_width(),
            volume: 0.0,
        }))
    }

    /// Polyline through `points`.
    pub fn line(points: Vec<Point>) -> Self {
        Self::new(ElementKind::Line(Line {
            points,
            color: default_blue(),
            line_width: default_line_width(),
            dashed: false,
            draw_progress: 1.0,
            label: String::new(),
        }))
    }

    /// Filled area under `points`.
    pub fn area(points: Vec<Point>) -> Self {
        Self::new(ElementKind::Area(Area {
            points,
            color: default_blue(),
            line_width: default_line_width(),
            fill_color: default_blue(),
            fill_alpha_top: default_fill_alpha_top(),
            fill_alpha_bottom: 0.0,
            baseline: None,
            draw_progress: 1.0,
            label: String::new(),
        }))
    }

    /// Band between `upper` and `lower` over `xs`.
    pub fn fill_between(xs: Vec<f64>, upper: Vec<f64>, lower: Vec<f64>) -> Self {
        Self::new(ElementKind::FillBetween(FillBetween {
            xs,
            upper,
            lower,
            fill_color: default_band_fill(),
            edge_color: None,
            edge_width: default_edge_width(),
            draw_progress: 1.0,
        }))
    }

    /// Zone spanning `[x1, x2]` x `[y1, y2]`.
    pub fn zone(x1: f64, x2: f64, y1: f64, y2: f64) -> Self {
        Self::new(ElementKind::Zone(Zone {
            x1,
            x2,
            y1,
            y2,
            fill_color: default_zone_fill(),
            border_color: None,
            border_width: 1.0,
            label: String::new(),
            label_color: default_text_color(),
            label_size: default_label_size(),
            extend_right: false,
        }))
    }

    /// Dashed horizontal level at price `y`.
    pub fn hline(y: f64) -> Self {
        Self::new(ElementKind::HLine(HLine {
            y,
            color: default_level_color(),
            line_width: 1.0,
            dashed: true,
            label: String::new(),
            label_color: None,
            label_size: default_label_size(),
            x_start: None,
            x_end: None,
        }))
    }

    /// Arrow from `(x1, y1)` to `(x2, y2)`.
    pub fn arrow(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self::new(ElementKind::Arrow(Arrow {
            x1,
            y1,
            x2,
            y2,
            color: default_text_color(),
            line_width: default_line_width(),
            head_width: default_head_width(),
            head_length: default_head_length(),
            label: String::new(),
        }))
    }

    /// Text anchored at data coordinates `(x, y)`.
    pub fn text(text: impl Into<String>, x: f64, y: f64) -> Self {
        Self::new(ElementKind::Text(Text {
            text: text.into(),
            x,
            y,
            color: default_text_color(),
            font_size: default_font_size(),
            bold: false,
            font_family: None,
            h_align: HAlign::Left,
            v_align: VAlign::Bottom,
            rotation: 0.0,
            char_progress: 1.0,
            data_coords: true,
            scale: 1.0,
            background: None,
            outline: None,
            shadow: None,
        }))
    }

    /// Set the z-order.
    pub fn with_z_order(mut self, z: i32) -> Self {
        self.z_order = z;
        self
    }

    /// Set the traded volume of a candle or bar; other kinds are returned unchanged.
    pub fn with_volume(mut self, volume: f64) -> Self {
        match &mut self.kind {
            ElementKind::Candle(c) => c.volume = volume,
            ElementKind::OhlcBar(b) => b.volume = volume,
            _ => {}
        }
        self
    }

    /// Start hidden.
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Short kind name for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            ElementKind::Candle(_) => "candle",
            ElementKind::OhlcBar(_) => "ohlc_bar",
            ElementKind::Line(_) => "line",
            ElementKind::Area(_) => "area",
            ElementKind::FillBetween(_) => "fill_between",
            ElementKind::Zone(_) => "zone",
            ElementKind::HLine(_) => "hline",
            ElementKind::Arrow(_) => "arrow",
            ElementKind::Text(_) => "text",
        }
    }

    /// Capability tags derived from the kind.
    pub fn capabilities(&self) -> Capabilities {
        let base = Capabilities::DRAWABLE | Capabilities::OPACITY | Capabilities::COLOR;
        base | match &self.kind {
            ElementKind::Candle(_) | ElementKind::OhlcBar(_) => {
                Capabilities::SCALE | Capabilities::VERTICAL_OFFSET
            }
            ElementKind::Line(_) | ElementKind::Area(_) => {
                Capabilities::PROGRESSIVE | Capabilities::POINTS
            }
            ElementKind::FillBetween(_) => Capabilities::PROGRESSIVE,
            ElementKind::Zone(_) => Capabilities::ZONE | Capabilities::POSITION,
            ElementKind::HLine(_) => Capabilities::empty(),
            ElementKind::Arrow(_) => Capabilities::POSITION,
            ElementKind::Text(_) => {
                Capabilities::POSITION
                    | Capabilities::TEXT_REVEAL
                    | Capabilities::SCALE
                    | Capabilities::ROTATION
            }
        }
    }

    /// Z-order band.
    pub fn layer(&self) -> Layer {
        match &self.kind {
            ElementKind::Arrow(_) => Layer::Annotation,
            ElementKind::Text(t) if t.data_coords => Layer::Annotation,
            ElementKind::Text(_) => Layer::Overlay,
            _ => Layer::Data,
        }
    }

    /// Drawn this frame.
    pub fn is_shown(&self) -> bool {
        self.visible && self.opacity > 0.0
    }

    /// Horizontal anchor used to order reveal sweeps.
    pub fn anchor_x(&self) -> f64 {
        match &self.kind {
            ElementKind::Candle(c) => c.index as f64,
            ElementKind::OhlcBar(b) => b.index as f64,
            ElementKind::Line(l) => l.points.first().map_or(0.0, |p| p.x),
            ElementKind::Area(a) => a.points.first().map_or(0.0, |p| p.x),
            ElementKind::FillBetween(f) => f.xs.first().copied().unwrap_or(0.0),
            ElementKind::Zone(z) => z.x1.min(z.x2),
            ElementKind::HLine(h) => h.x_start.unwrap_or(f64::NEG_INFINITY),
            ElementKind::Arrow(a) => a.x1.min(a.x2),
            ElementKind::Text(t) => t.x,
        }
    }

    /// Vertical anchor used to order reveal sweeps.
    pub fn anchor_y(&self) -> f64 {
        match &self.kind {
            ElementKind::Candle(c) => c.mid(),
            ElementKind::OhlcBar(b) => (b.open + b.close) / 2.0,
            ElementKind::Line(l) => l.points.first().map_or(0.0, |p| p.y),
            ElementKind::Area(a) => a.points.first().map_or(0.0, |p| p.y),
            ElementKind::FillBetween(f) => f.upper.first().copied().unwrap_or(0.0),
            ElementKind::Zone(z) => z.y1.min(z.y2),
            ElementKind::HLine(h) => h.y,
            ElementKind::Arrow(a) => a.y1.min(a.y2),
            ElementKind::Text(t) => t.y,
        }
    }

    /// `(index, low, high)` for candles and bars.
    pub fn price_extent(&self) -> Option<(i64, f64, f64)> {
        match &self.kind {
            ElementKind::Candle(c) => Some((c.index, c.low, c.high)),
            ElementKind::OhlcBar(b) => Some((b.index, b.low, b.high)),
            _ => None,
        }
    }

    /// `(index, volume, bullish)` for candles and bars.
    pub fn volume(&self) -> Option<(i64, f64, bool)> {
        match &self.kind {
            ElementKind::Candle(c) => Some((c.index, c.volume, c.is_bull())),
            ElementKind::OhlcBar(b) => Some((b.index, b.volume, b.close >= b.open)),
            _ => None,
        }
    }

    pub(crate) fn draw_progress_mut(&mut self) -> Option<&mut f64> {
        match &mut self.kind {
            ElementKind::Line(l) => Some(&mut l.draw_progress),
            ElementKind::Area(a) => Some(&mut a.draw_progress),
            ElementKind::FillBetween(f) => Some(&mut f.draw_progress),
            _ => None,
        }
    }

    pub(crate) fn char_progress_mut(&mut self) -> Option<&mut f64> {
        match &mut self.kind {
            ElementKind::Text(t) => Some(&mut t.char_progress),
            _ => None,
        }
    }

    pub(crate) fn position(&self) -> Option<Point> {
        match &self.kind {
            ElementKind::Text(t) => Some(Point::new(t.x, t.y)),
            ElementKind::Arrow(a) => Some(Point::new(a.x1, a.y1)),
            ElementKind::Zone(z) => Some(Point::new(z.x1, z.y1)),
            _ => None,
        }
    }

    /// Move the anchor to `p`, translating any dependent geometry with it.
    pub(crate) fn set_position(&mut self, p: Point) -> bool {
        match &mut self.kind {
            ElementKind::Text(t) => {
                t.x = p.x;
                t.y = p.y;
            }
            ElementKind::Arrow(a) => {
                let d = Vec2::new(p.x - a.x1, p.y - a.y1);
                a.x1 += d.x;
                a.y1 += d.y;
                a.x2 += d.x;
                a.y2 += d.y;
            }
            ElementKind::Zone(z) => {
                let d = Vec2::new(p.x - z.x1, p.y - z.y1);
                z.x1 += d.x;
                z.x2 += d.x;
                z.y1 += d.y;
                z.y2 += d.y;
            }
            _ => return false,
        }
        true
    }

    pub(crate) fn scale_mut(&mut self) -> Option<&mut f64> {
        match &mut self.kind {
            ElementKind::Candle(c) => Some(&mut c.scale_y),
            ElementKind::OhlcBar(b) => Some(&mut b.scale_y),
            ElementKind::Text(t) => Some(&mut t.scale),
            _ => None,
        }
    }

    pub(crate) fn rotation(&self) -> Option<f64> {
        match &self.kind {
            ElementKind::Text(t) => Some(t.rotation),
            _ => None,
        }
    }

    pub(crate) fn rotation_mut(&mut self) -> Option<&mut f64> {
        match &mut self.kind {
            ElementKind::Text(t) => Some(&mut t.rotation),
            _ => None,
        }
    }

    pub(crate) fn offset_y(&self) -> Option<f64> {
        match &self.kind {
            ElementKind::Candle(c) => Some(c.offset_y),
            ElementKind::OhlcBar(b) => Some(b.offset_y),
            _ => None,
        }
    }

    pub(crate) fn offset_y_mut(&mut self) -> Option<&mut f64> {
        match &mut self.kind {
            ElementKind::Candle(c) => Some(&mut c.offset_y),
            ElementKind::OhlcBar(b) => Some(&mut b.offset_y),
            _ => None,
        }
    }

    pub(crate) fn points(&self) -> Option<&[Point]> {
        match &self.kind {
            ElementKind::Line(l) => Some(&l.points),
            ElementKind::Area(a) => Some(&a.points),
            _ => None,
        }
    }

    pub(crate) fn points_mut(&mut self) -> Option<&mut Vec<Point>> {
        match &mut self.kind {
            ElementKind::Line(l) => Some(&mut l.points),
            ElementKind::Area(a) => Some(&mut a.points),
            _ => None,
        }
    }

    /// Primary color; candles and bars resolve their body color through `theme`.
    pub fn color(&self, theme: &Theme) -> Color {
        match &self.kind {
            ElementKind::Candle(c) => {
                if c.is_bull() {
                    c.bull_color.unwrap_or(theme.bull_body)
                } else {
                    c.bear_color.unwrap_or(theme.bear_body)
                }
            }
            ElementKind::OhlcBar(b) => {
                if b.close >= b.open {
                    b.bull_color.unwrap_or(theme.bull_body)
                } else {
                    b.bear_color.unwrap_or(theme.bear_body)
                }
            }
            ElementKind::Line(l) => l.color,
            ElementKind::Area(a) => a.color,
            ElementKind::FillBetween(f) => f.fill_color,
            ElementKind::Zone(z) => z.fill_color,
            ElementKind::HLine(h) => h.color,
            ElementKind::Arrow(a) => a.color,
            ElementKind::Text(t) => t.color,
        }
    }

    /// Body color overrides `(bull, bear)` of candles and bars.
    pub(crate) fn body_colors(&self) -> Option<(Option<Color>, Option<Color>)> {
        match &self.kind {
            ElementKind::Candle(c) => Some((c.bull_color, c.bear_color)),
            ElementKind::OhlcBar(b) => Some((b.bull_color, b.bear_color)),
            _ => None,
        }
    }

    pub(crate) fn set_body_colors(&mut self, bull: Option<Color>, bear: Option<Color>) -> bool {
        match &mut self.kind {
            ElementKind::Candle(c) => {
                c.bull_color = bull;
                c.bear_color = bear;
            }
            ElementKind::OhlcBar(b) => {
                b.bull_color = bull;
                b.bear_color = bear;
            }
            _ => return false,
        }
        true
    }

    /// Overwrite the primary color (both body overrides for candles and bars).
    pub(crate) fn set_color(&mut self, color: Color) {
        match &mut self.kind {
            ElementKind::Candle(c) => {
                c.bull_color = Some(color);
                c.bear_color = Some(color);
            }
            ElementKind::OhlcBar(b) => {
                b.bull_color = Some(color);
                b.bear_color = Some(color);
            }
            ElementKind::Line(l) => l.color = color,
            ElementKind::Area(a) => {
                a.color = color;
                a.fill_color = color;
            }
            ElementKind::FillBetween(f) => f.fill_color = color,
            ElementKind::Zone(z) => z.fill_color = color,
            ElementKind::HLine(h) => h.color = color,
            ElementKind::Arrow(a) => a.color = color,
            ElementKind::Text(t) => t.color = color,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/element.rs"]
mod tests;
