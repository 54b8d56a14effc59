use std::f64::consts::PI;

use crate::animation::ease::Ease;
use crate::config::theme::Theme;
use crate::eval::state::{FrameState, Snapshot};
use crate::foundation::color::Color;
use crate::foundation::core::{Point, Vec2};
use crate::foundation::error::{TradeanimError, TradeanimResult};
use crate::scene::camera::{Camera, FitPadding};
use crate::scene::element::{Capabilities, Element, ElementKind};
use crate::scene::registry::ElementId;
use crate::scene::trade::{Bar, TradeHandle, TradeStatus};

/// Linear interpolation; `t` outside `[0, 1]` extrapolates.
pub trait Lerp: Sized {
    /// Value at `t` between `a` (t = 0) and `b` (t = 1).
    fn lerp(a: &Self, b: &Self, t: f64) -> Self;
}

impl Lerp for f64 {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        a + (b - a) * t
    }
}

impl Lerp for Vec2 {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        Vec2::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t)
    }
}

impl Lerp for Point {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        Point::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t)
    }
}

impl Lerp for Camera {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        Camera::lerp(a, b, t)
    }
}

/// How an [`Animation::Appear`] reveals its targets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppearStyle {
    /// One after another in target order.
    #[default]
    Sequential,
    /// All at once.
    #[serde(alias = "all", alias = "fade")]
    Together,
    /// One after another, each rising into place from below.
    SlideUp,
    /// One after another, each growing from a flat body.
    Pop,
    /// Overlapping reveals with staggered delays.
    Cascade,
}

/// Sweep direction for slides and wipes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Towards smaller x.
    #[default]
    Left,
    /// Towards larger x.
    Right,
    /// Towards larger y.
    Up,
    /// Towards smaller y.
    Down,
}

impl Direction {
    /// Unit vector in data space (y grows upward).
    pub fn unit(self) -> Vec2 {
        match self {
            Self::Left => Vec2::new(-1.0, 0.0),
            Self::Right => Vec2::new(1.0, 0.0),
            Self::Up => Vec2::new(0.0, 1.0),
            Self::Down => Vec2::new(0.0, -1.0),
        }
    }
}

/// Closed set of animation variants.
///
/// Each variant owns a fixed subset of its targets' properties and writes them from its start
/// [`Snapshot`] and the eased progress alone, so applying the same progress twice yields the
/// same state.
#[derive(Clone, Debug, PartialEq)]
pub enum Animation {
    /// Reveal targets (usually candles) by index.
    ///
    /// Owns visibility and opacity; `SlideUp` also owns the vertical offset and `Pop` the
    /// vertical scale. With `auto_camera` the camera follows the revealed candles. Per-target
    /// progress clamps.
    Appear {
        /// Elements in reveal order.
        targets: Vec<ElementId>,
        /// Reveal style.
        style: AppearStyle,
        /// Fit the camera to the revealed candles every frame.
        auto_camera: bool,
    },
    /// Opacity from 0 to 1; clamps.
    FadeIn {
        /// Element to fade.
        target: ElementId,
    },
    /// Opacity from the start value to 0, hidden once finished; clamps.
    FadeOut {
        /// Element to fade.
        target: ElementId,
        /// Drop the element from the scene once finished.
        remove: bool,
    },
    /// Reveal path geometry from its first vertex; clamps.
    DrawProgressive {
        /// Line, area or band.
        target: ElementId,
    },
    /// Reveal text character by character; clamps.
    TypeText {
        /// Text element.
        target: ElementId,
    },
    /// Fade a zone in; clamps.
    HighlightZone {
        /// Zone element.
        target: ElementId,
    },
    /// Move the camera; missing fields keep their start value. Extrapolates.
    PanCamera {
        /// Destination first visible index.
        view_start: Option<f64>,
        /// Destination last visible index.
        view_end: Option<f64>,
        /// Destination price floor.
        price_min: Option<f64>,
        /// Destination price ceiling.
        price_max: Option<f64>,
    },
    /// Move the camera onto the candles in an index range. Extrapolates.
    ZoomTo {
        /// First index of the range.
        start_index: i64,
        /// Last index of the range (inclusive).
        end_index: i64,
        /// Fraction of the price range added above and below.
        padding: f64,
    },
    /// Move into place from an offset while fading in; position extrapolates, opacity clamps.
    SlideIn {
        /// Element with a position.
        target: ElementId,
        /// Side the element enters from.
        direction: Direction,
        /// Offset in the element's own coordinate units.
        distance: f64,
    },
    /// Move away by an offset while fading out; hidden once finished.
    SlideOut {
        /// Element with a position.
        target: ElementId,
        /// Direction of travel.
        direction: Direction,
        /// Travel in the element's own coordinate units.
        distance: f64,
    },
    /// Grow from zero scale while fading in; scale extrapolates.
    ScaleIn {
        /// Element with a scale.
        target: ElementId,
    },
    /// Rotate from `angle` degrees to rest while growing in; extrapolates.
    SpinIn {
        /// Element with a rotation and a scale.
        target: ElementId,
        /// Start rotation in degrees.
        angle: f64,
    },
    /// Interpolate the primary color; clamps.
    ColorShift {
        /// Element with a color.
        target: ElementId,
        /// Final color.
        to: Color,
        /// Start color; defaults to the element's color at the start.
        from: Option<Color>,
    },
    /// Oscillate opacity between two levels, restoring the start opacity once finished.
    Pulse {
        /// Element to pulse.
        target: ElementId,
        /// Lowest opacity.
        min_opacity: f64,
        /// Highest opacity.
        max_opacity: f64,
        /// Full oscillations over the directive.
        cycles: f64,
    },
    /// Decaying vertical oscillation in price units.
    Shake {
        /// Candle or bar.
        target: ElementId,
        /// Initial amplitude in price units.
        amplitude: f64,
        /// Oscillations over the directive.
        cycles: f64,
    },
    /// Interpolate every vertex's y towards `target_y`; extrapolates.
    MorphLine {
        /// Line or area.
        target: ElementId,
        /// One y value per vertex.
        target_y: Vec<f64>,
    },
    /// Reveal targets in spatial order; clamps.
    Wipe {
        /// Elements to reveal.
        targets: Vec<ElementId>,
        /// Sweep direction; `Left` reveals from the smallest x.
        direction: Direction,
    },
    /// Blink a candle's body color, restoring it once finished.
    Flash {
        /// Candle or bar.
        target: ElementId,
        /// Flash color; defaults to the theme highlight.
        color: Option<Color>,
        /// Number of blinks.
        cycles: f64,
    },
    /// Curtain moving right over the targets' x span with a soft leading edge.
    Sweep {
        /// Elements to reveal.
        targets: Vec<ElementId>,
    },
    /// Overlapping ease-out fades, each starting `stagger` after the previous one.
    ///
    /// `stagger` and `fade` are seconds of the nominal length `fade + stagger * (n - 1)`; a
    /// directive of another length scales them proportionally.
    StaggeredFadeIn {
        /// Elements in fade order.
        targets: Vec<ElementId>,
        /// Delay between consecutive starts.
        stagger: f64,
        /// Length of each fade.
        fade: f64,
    },
    /// Fade and draw a whole chart in together.
    ///
    /// With `auto_camera` the camera jumps to every candle in `targets`, shown or not.
    ChartAppear {
        /// Chart elements.
        targets: Vec<ElementId>,
        /// Frame all target candles.
        auto_camera: bool,
    },
    /// Reveal new candles one after another after an existing chart.
    ///
    /// With `auto_camera` the camera follows every shown candle in the scene, so earlier
    /// candles stay in frame.
    AddCandles {
        /// Candles in reveal order.
        targets: Vec<ElementId>,
        /// Fit the camera to all shown candles every frame.
        auto_camera: bool,
    },
    /// Fade a trade's zones, level and readouts in together.
    ShowTrade {
        /// Trade elements.
        targets: Vec<ElementId>,
    },
    /// Rewrite a trade's readouts from the candles shown at each frame.
    ///
    /// Only candles at or after the entry index with opacity above one half count. The fill,
    /// the bracket hit and the mark price are recomputed from those candles every frame.
    UpdatePnl {
        /// Trade and its readout elements.
        trade: Box<TradeHandle>,
    },
}

/// Inputs an animation reads besides its snapshot.
#[derive(Clone, Copy, Debug)]
pub struct ApplyCtx<'a> {
    /// Active palette.
    pub theme: &'a Theme,
    /// Padding for camera fitting.
    pub fit: FitPadding,
}

fn clamp01(p: f64) -> f64 {
    if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) }
}

fn require(e: &Element, caps: Capabilities, anim: &str, id: ElementId) -> TradeanimResult<()> {
    if e.capabilities().contains(caps) {
        Ok(())
    } else {
        Err(TradeanimError::animation(format!(
            "{anim} cannot target {} {id}: missing {:?}",
            e.kind_name(),
            caps.difference(e.capabilities())
        )))
    }
}

fn field<'a>(slot: Option<&'a mut f64>, what: &str, id: ElementId) -> TradeanimResult<&'a mut f64> {
    slot.ok_or_else(|| TradeanimError::animation(format!("element {id} has no {what}")))
}

fn wave(p: f64, cycles: f64) -> f64 {
    0.5 + 0.5 * (p * cycles * 2.0 * PI).sin()
}

impl Animation {
    /// Appear with the sequential style and camera follow.
    pub fn appear(targets: impl Into<Vec<ElementId>>) -> Self {
        Self::Appear {
            targets: targets.into(),
            style: AppearStyle::Sequential,
            auto_camera: true,
        }
    }

    /// Fade `target` in.
    pub fn fade_in(target: ElementId) -> Self {
        Self::FadeIn { target }
    }

    /// Fade `target` out.
    pub fn fade_out(target: ElementId) -> Self {
        Self::FadeOut {
            target,
            remove: false,
        }
    }

    /// Fade `target` out and drop it from the scene.
    pub fn fade_out_and_remove(target: ElementId) -> Self {
        Self::FadeOut {
            target,
            remove: true,
        }
    }

    /// Draw `target` progressively.
    pub fn draw(target: ElementId) -> Self {
        Self::DrawProgressive { target }
    }

    /// Type `target` out.
    pub fn type_text(target: ElementId) -> Self {
        Self::TypeText { target }
    }

    /// Highlight zone `target`.
    pub fn highlight_zone(target: ElementId) -> Self {
        Self::HighlightZone { target }
    }

    /// Pan the index axis to `[view_start, view_end]`, keeping the price axis.
    pub fn pan(view_start: f64, view_end: f64) -> Self {
        Self::PanCamera {
            view_start: Some(view_start),
            view_end: Some(view_end),
            price_min: None,
            price_max: None,
        }
    }

    /// Zoom onto candles `start_index..=end_index` with 10% price padding.
    pub fn zoom_to(start_index: i64, end_index: i64) -> Self {
        Self::ZoomTo {
            start_index,
            end_index,
            padding: 0.1,
        }
    }

    /// Sweep over `targets` from the smallest x.
    pub fn sweep(targets: impl Into<Vec<ElementId>>) -> Self {
        Self::Sweep {
            targets: targets.into(),
        }
    }

    /// Staggered fade with 0.08 s between starts and 0.5 s fades.
    pub fn staggered_fade_in(targets: impl Into<Vec<ElementId>>) -> Self {
        Self::StaggeredFadeIn {
            targets: targets.into(),
            stagger: 0.08,
            fade: 0.5,
        }
    }

    /// Whole-chart entrance with the camera framing it.
    pub fn chart_appear(targets: impl Into<Vec<ElementId>>) -> Self {
        Self::ChartAppear {
            targets: targets.into(),
            auto_camera: true,
        }
    }

    /// Append `targets` to the chart with the camera following.
    pub fn add_candles(targets: impl Into<Vec<ElementId>>) -> Self {
        Self::AddCandles {
            targets: targets.into(),
            auto_camera: true,
        }
    }

    /// Fade `trade` in.
    pub fn show_trade(trade: &TradeHandle) -> Self {
        Self::ShowTrade {
            targets: trade.elements(),
        }
    }

    /// Keep `trade`'s readouts in step with the revealed candles.
    pub fn update_pnl(trade: &TradeHandle) -> Self {
        Self::UpdatePnl {
            trade: Box::new(trade.clone()),
        }
    }

    /// Elements this animation writes.
    pub fn targets(&self) -> Vec<ElementId> {
        match self {
            Self::Appear { targets, .. }
            | Self::Wipe { targets, .. }
            | Self::Sweep { targets }
            | Self::StaggeredFadeIn { targets, .. }
            | Self::ChartAppear { targets, .. }
            | Self::AddCandles { targets, .. }
            | Self::ShowTrade { targets } => targets.clone(),
            Self::UpdatePnl { trade } => trade.info.into_iter().chain(trade.pnl).collect(),
            Self::PanCamera { .. } | Self::ZoomTo { .. } => Vec::new(),
            Self::FadeIn { target }
            | Self::FadeOut { target, .. }
            | Self::DrawProgressive { target }
            | Self::TypeText { target }
            | Self::HighlightZone { target }
            | Self::SlideIn { target, .. }
            | Self::SlideOut { target, .. }
            | Self::ScaleIn { target }
            | Self::SpinIn { target, .. }
            | Self::ColorShift { target, .. }
            | Self::Pulse { target, .. }
            | Self::Shake { target, .. }
            | Self::MorphLine { target, .. }
            | Self::Flash { target, .. } => vec![*target],
        }
    }

    /// Whether this variant brings its targets into the scene.
    ///
    /// An element whose first directive is an entrance stays hidden until that directive
    /// starts.
    pub fn is_entrance(&self) -> bool {
        matches!(
            self,
            Self::Appear { .. }
                | Self::FadeIn { .. }
                | Self::DrawProgressive { .. }
                | Self::TypeText { .. }
                | Self::HighlightZone { .. }
                | Self::SlideIn { .. }
                | Self::ScaleIn { .. }
                | Self::SpinIn { .. }
                | Self::Wipe { .. }
                | Self::Sweep { .. }
                | Self::StaggeredFadeIn { .. }
                | Self::ChartAppear { .. }
                | Self::AddCandles { .. }
                | Self::ShowTrade { .. }
        )
    }

    /// Element this animation drops from the scene once finished.
    pub fn removes(&self) -> Option<ElementId> {
        match self {
            Self::FadeOut {
                target,
                remove: true,
            } => Some(*target),
            _ => None,
        }
    }

    /// Length used when a play call gives none, in seconds.
    pub fn default_duration(&self) -> f64 {
        match self {
            Self::Appear { .. } | Self::ChartAppear { .. } => 3.0,
            Self::AddCandles { .. } | Self::DrawProgressive { .. } => 2.0,
            Self::PanCamera { .. }
            | Self::ZoomTo { .. }
            | Self::Sweep { .. }
            | Self::Pulse { .. } => 1.5,
            Self::TypeText { .. }
            | Self::SpinIn { .. }
            | Self::ColorShift { .. }
            | Self::MorphLine { .. }
            | Self::Wipe { .. }
            | Self::Flash { .. } => 1.0,
            Self::HighlightZone { .. } | Self::ShowTrade { .. } => 0.8,
            Self::SlideIn { .. } => 0.6,
            Self::FadeIn { .. }
            | Self::FadeOut { .. }
            | Self::SlideOut { .. }
            | Self::ScaleIn { .. }
            | Self::Shake { .. } => 0.5,
            Self::StaggeredFadeIn {
                targets,
                stagger,
                fade,
            } => fade + stagger * targets.len().saturating_sub(1) as f64,
            Self::UpdatePnl { .. } => 5.0,
        }
    }

    /// Curve used when a play call gives none.
    pub fn default_ease(&self) -> Ease {
        match self {
            Self::Appear {
                style: AppearStyle::Pop,
                ..
            }
            | Self::ScaleIn { .. }
            | Self::SpinIn { .. } => Ease::OutBack,
            Self::DrawProgressive { .. }
            | Self::PanCamera { .. }
            | Self::ZoomTo { .. }
            | Self::SlideOut { .. }
            | Self::Sweep { .. }
            | Self::MorphLine { .. }
            | Self::Wipe { .. } => Ease::InOutCubic,
            Self::TypeText { .. }
            | Self::Flash { .. }
            | Self::Pulse { .. }
            | Self::Shake { .. }
            | Self::StaggeredFadeIn { .. }
            | Self::UpdatePnl { .. } => Ease::Linear,
            _ => Ease::OutCubic,
        }
    }

    /// Whether this variant writes the camera.
    pub fn moves_camera(&self) -> bool {
        match self {
            Self::PanCamera { .. } | Self::ZoomTo { .. } => true,
            Self::Appear { auto_camera, .. }
            | Self::ChartAppear { auto_camera, .. }
            | Self::AddCandles { auto_camera, .. } => *auto_camera,
            _ => false,
        }
    }

    /// Variant name for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Appear { .. } => "appear",
            Self::FadeIn { .. } => "fade_in",
            Self::FadeOut { .. } => "fade_out",
            Self::DrawProgressive { .. } => "draw_progressive",
            Self::TypeText { .. } => "type_text",
            Self::HighlightZone { .. } => "highlight_zone",
            Self::PanCamera { .. } => "pan_camera",
            Self::ZoomTo { .. } => "zoom_to",
            Self::SlideIn { .. } => "slide_in",
            Self::SlideOut { .. } => "slide_out",
            Self::ScaleIn { .. } => "scale_in",
            Self::SpinIn { .. } => "spin_in",
            Self::ColorShift { .. } => "color_shift",
            Self::Pulse { .. } => "pulse",
            Self::Shake { .. } => "shake",
            Self::MorphLine { .. } => "morph_line",
            Self::Wipe { .. } => "wipe",
            Self::Flash { .. } => "flash",
            Self::Sweep { .. } => "sweep",
            Self::StaggeredFadeIn { .. } => "staggered_fade_in",
            Self::ChartAppear { .. } => "chart_appear",
            Self::AddCandles { .. } => "add_candles",
            Self::ShowTrade { .. } => "show_trade",
            Self::UpdatePnl { .. } => "update_pnl",
        }
    }

    /// Record the start state this animation interpolates from.
    pub fn capture(&self, state: &FrameState) -> TradeanimResult<Snapshot> {
        let mut elements = Vec::new();
        for id in self.targets() {
            let e = state.element(id).ok_or_else(|| {
                TradeanimError::animation(format!("{} target {id} is not in the scene", self.name()))
            })?;
            elements.push((id, e.clone()));
        }

        let camera_target = match self {
            Self::ZoomTo {
                start_index,
                end_index,
                padding,
            } => Some(
                Camera::frame_indices(
                    state.elements().map(|(_, e)| e),
                    *start_index,
                    *end_index,
                    *padding,
                )
                .ok_or_else(|| {
                    TradeanimError::animation(format!(
                        "zoom_to: no candles in index range {start_index}..={end_index}"
                    ))
                })?,
            ),
            _ => None,
        };

        Ok(Snapshot {
            elements,
            camera: state.camera,
            camera_target,
        })
    }

    /// Write this animation's properties at eased progress `p`.
    pub fn apply(
        &self,
        state: &mut FrameState,
        snap: &Snapshot,
        p: f64,
        ctx: &ApplyCtx<'_>,
    ) -> TradeanimResult<()> {
        match self {
            Self::Appear {
                targets,
                style,
                auto_camera,
            } => {
                let n = targets.len();
                for (i, &id) in targets.iter().enumerate() {
                    let base = snap.element(id)?;
                    let local = match style {
                        AppearStyle::Together => clamp01(p),
                        AppearStyle::Cascade => {
                            let delay = i as f64 / n as f64 * 0.6;
                            clamp01((p - delay) / 0.4)
                        }
                        _ => clamp01(p * n as f64 - i as f64),
                    };
                    let e = state.element_mut(id)?;
                    e.visible = local > 0.0;
                    e.opacity = match style {
                        AppearStyle::Pop => (local * 2.0).min(1.0),
                        _ => local,
                    };
                    if let (Some(off), Some(base_off)) = (e.offset_y_mut(), base.offset_y()) {
                        *off = match (style, base.price_extent()) {
                            (AppearStyle::SlideUp, Some((_, low, high))) => {
                                base_off - (1.0 - local) * (high - low) * 3.0
                            }
                            _ => base_off,
                        };
                    }
                    if *style == AppearStyle::Pop
                        && let Some(scale) = e.scale_mut()
                    {
                        *scale = local;
                    }
                }
                if *auto_camera {
                    let revealed = targets.iter().filter_map(|id| state.element(*id));
                    let fitted = Camera::fit(revealed, ctx.fit);
                    state.camera = fitted.unwrap_or(snap.camera());
                }
            }
            Self::FadeIn { target } => {
                let e = state.element_mut(*target)?;
                require(e, Capabilities::OPACITY, self.name(), *target)?;
                e.visible = true;
                e.opacity = clamp01(p);
            }
            Self::FadeOut { target, remove } => {
                let start = snap.element(*target)?.opacity;
                let e = state.element_mut(*target)?;
                require(e, Capabilities::OPACITY, self.name(), *target)?;
                e.opacity = clamp01(start * (1.0 - p));
                e.visible = p < 1.0 && e.opacity > 0.0;
                if *remove && p >= 1.0 {
                    state.remove(*target);
                }
            }
            Self::DrawProgressive { target } => {
                let e = state.element_mut(*target)?;
                require(e, Capabilities::PROGRESSIVE, self.name(), *target)?;
                e.visible = true;
                *field(e.draw_progress_mut(), "draw progress", *target)? = clamp01(p);
            }
            Self::TypeText { target } => {
                let e = state.element_mut(*target)?;
                require(e, Capabilities::TEXT_REVEAL, self.name(), *target)?;
                e.visible = true;
                *field(e.char_progress_mut(), "char progress", *target)? = clamp01(p);
            }
            Self::HighlightZone { target } => {
                let e = state.element_mut(*target)?;
                require(e, Capabilities::ZONE, self.name(), *target)?;
                e.visible = true;
                e.opacity = clamp01(p);
            }
            Self::PanCamera {
                view_start,
                view_end,
                price_min,
                price_max,
            } => {
                let from = snap.camera();
                let to = Camera {
                    view_start: view_start.unwrap_or(from.view_start),
                    view_end: view_end.unwrap_or(from.view_end),
                    price_min: price_min.unwrap_or(from.price_min),
                    price_max: price_max.unwrap_or(from.price_max),
                };
                state.camera = <Camera as Lerp>::lerp(&from, &to, p);
            }
            Self::ZoomTo { .. } => {
                let to = snap.camera_target.ok_or_else(|| {
                    TradeanimError::animation("zoom_to applied without a captured destination")
                })?;
                state.camera = <Camera as Lerp>::lerp(&snap.camera(), &to, p);
            }
            Self::SlideIn {
                target,
                direction,
                distance,
            } => {
                let base = snap.element(*target)?;
                let rest = base.position().ok_or_else(|| {
                    TradeanimError::animation(format!(
                        "slide_in cannot target {} {target}: missing POSITION",
                        base.kind_name()
                    ))
                })?;
                let from = rest + direction.unit() * *distance;
                let e = state.element_mut(*target)?;
                e.set_position(<Point as Lerp>::lerp(&from, &rest, p));
                e.visible = true;
                e.opacity = clamp01(p);
            }
            Self::SlideOut {
                target,
                direction,
                distance,
            } => {
                let base = snap.element(*target)?;
                let start = base.position().ok_or_else(|| {
                    TradeanimError::animation(format!(
                        "slide_out cannot target {} {target}: missing POSITION",
                        base.kind_name()
                    ))
                })?;
                let start_opacity = base.opacity;
                let e = state.element_mut(*target)?;
                e.set_position(start + direction.unit() * (*distance * p));
                e.opacity = clamp01(start_opacity * (1.0 - p));
                e.visible = p < 1.0 && e.opacity > 0.0;
            }
            Self::ScaleIn { target } => {
                let e = state.element_mut(*target)?;
                require(e, Capabilities::SCALE, self.name(), *target)?;
                *field(e.scale_mut(), "scale", *target)? = p;
                e.visible = true;
                e.opacity = clamp01(p * 2.0);
            }
            Self::SpinIn { target, angle } => {
                let rest = snap.element(*target)?.rotation().unwrap_or(0.0);
                let e = state.element_mut(*target)?;
                require(
                    e,
                    Capabilities::ROTATION | Capabilities::SCALE,
                    self.name(),
                    *target,
                )?;
                *field(e.rotation_mut(), "rotation", *target)? = rest + angle * (1.0 - p);
                *field(e.scale_mut(), "scale", *target)? = p;
                e.visible = true;
                e.opacity = clamp01(p * 2.0);
            }
            Self::ColorShift { target, to, from } => {
                let start = match from {
                    Some(c) => *c,
                    None => snap.element(*target)?.color(ctx.theme),
                };
                let e = state.element_mut(*target)?;
                require(e, Capabilities::COLOR, self.name(), *target)?;
                e.set_color(Color::mix(start, *to, clamp01(p)));
            }
            Self::Pulse {
                target,
                min_opacity,
                max_opacity,
                cycles,
            } => {
                let start = snap.element(*target)?.opacity;
                let e = state.element_mut(*target)?;
                require(e, Capabilities::OPACITY, self.name(), *target)?;
                e.opacity = if p >= 1.0 {
                    start
                } else {
                    clamp01(min_opacity + (max_opacity - min_opacity) * wave(p, *cycles))
                };
            }
            Self::Shake {
                target,
                amplitude,
                cycles,
            } => {
                let rest = snap.element(*target)?.offset_y().unwrap_or(0.0);
                let e = state.element_mut(*target)?;
                require(e, Capabilities::VERTICAL_OFFSET, self.name(), *target)?;
                let wobble = if p >= 1.0 {
                    0.0
                } else {
                    amplitude * (1.0 - p) * (p * cycles * 2.0 * PI).sin()
                };
                *field(e.offset_y_mut(), "vertical offset", *target)? = rest + wobble;
            }
            Self::MorphLine { target, target_y } => {
                let base = snap.element(*target)?;
                let start = base.points().ok_or_else(|| {
                    TradeanimError::animation(format!(
                        "morph_line cannot target {} {target}: missing POINTS",
                        base.kind_name()
                    ))
                })?;
                if start.len() != target_y.len() {
                    return Err(TradeanimError::animation(format!(
                        "morph_line {target}: {} target values for {} vertices",
                        target_y.len(),
                        start.len()
                    )));
                }
                let morphed: Vec<Point> = start
                    .iter()
                    .zip(target_y)
                    .map(|(pt, ty)| Point::new(pt.x, <f64 as Lerp>::lerp(&pt.y, ty, p)))
                    .collect();
                if let Some(points) = state.element_mut(*target)?.points_mut() {
                    *points = morphed;
                }
            }
            Self::Wipe { targets, direction } => {
                let mut order = Vec::with_capacity(targets.len());
                for &id in targets {
                    let e = snap.element(id)?;
                    let key = match direction {
                        Direction::Left => e.anchor_x(),
                        Direction::Right => -e.anchor_x(),
                        Direction::Up => -e.anchor_y(),
                        Direction::Down => e.anchor_y(),
                    };
                    order.push((key, id));
                }
                order.sort_by(|a, b| a.0.total_cmp(&b.0));
                let reveal = p * order.len() as f64;
                for (i, (_, id)) in order.into_iter().enumerate() {
                    let e = state.element_mut(id)?;
                    let local = clamp01(reveal - i as f64);
                    e.visible = true;
                    e.opacity = local;
                }
            }
            Self::Flash {
                target,
                color,
                cycles,
            } => {
                let base = snap.element(*target)?;
                let (bull, bear) = base.body_colors().ok_or_else(|| {
                    TradeanimError::animation(format!(
                        "flash cannot target {} {target}: not a candle or bar",
                        base.kind_name()
                    ))
                })?;
                let flash = color.unwrap_or(ctx.theme.highlight);
                let e = state.element_mut(*target)?;
                if p < 1.0 && wave(p, *cycles) > 0.5 {
                    e.set_body_colors(Some(flash), Some(flash));
                } else {
                    e.set_body_colors(bull, bear);
                }
            }
            Self::Sweep { targets } => {
                let mut xs = Vec::with_capacity(targets.len());
                for &id in targets {
                    xs.push((id, snap.element(id)?.anchor_x()));
                }
                let finite = xs.iter().map(|(_, x)| *x).filter(|x| x.is_finite());
                let (lo, hi) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| {
                    (lo.min(x), hi.max(x))
                });
                let (lo, hi) = if lo <= hi { (lo, hi) } else { (0.0, 0.0) };
                let span = (hi - lo).max(1.0);
                let curtain = lo + span * p;
                let edge = span * 0.1 + 0.01;
                for (id, x) in xs {
                    let e = state.element_mut(id)?;
                    e.visible = true;
                    e.opacity = if p >= 1.0 {
                        1.0
                    } else if x <= curtain {
                        clamp01((curtain - x) / edge)
                    } else {
                        0.0
                    };
                }
            }
            Self::StaggeredFadeIn {
                targets,
                stagger,
                fade,
            } => {
                let n = targets.len();
                let total = fade + stagger * n.saturating_sub(1) as f64;
                let now = p * total;
                for (i, &id) in targets.iter().enumerate() {
                    let local = if p >= 1.0 {
                        1.0
                    } else if *fade > 0.0 {
                        clamp01((now - i as f64 * stagger) / fade)
                    } else if now >= i as f64 * stagger {
                        1.0
                    } else {
                        0.0
                    };
                    let e = state.element_mut(id)?;
                    e.visible = true;
                    e.opacity = Ease::OutCubic.apply(local);
                }
            }
            Self::ChartAppear {
                targets,
                auto_camera,
            } => {
                let q = clamp01(p);
                for &id in targets {
                    let e = state.element_mut(id)?;
                    e.visible = true;
                    e.opacity = q;
                    if let Some(progress) = e.draw_progress_mut() {
                        *progress = q;
                    }
                }
                if *auto_camera {
                    let all = snap.elements.iter().map(|(_, e)| e);
                    if let Some(cam) = Camera::fit_all(all, ctx.fit) {
                        state.camera = cam;
                    }
                }
            }
            Self::AddCandles {
                targets,
                auto_camera,
            } => {
                let n = targets.len() as f64;
                for (i, &id) in targets.iter().enumerate() {
                    let local = clamp01(p * n - i as f64);
                    let e = state.element_mut(id)?;
                    e.visible = local > 0.0;
                    e.opacity = local;
                }
                if *auto_camera {
                    let fitted = Camera::fit(state.elements().map(|(_, e)| e), ctx.fit);
                    state.camera = fitted.unwrap_or(snap.camera());
                }
            }
            Self::ShowTrade { targets } => {
                for &id in targets {
                    let e = state.element_mut(id)?;
                    e.visible = true;
                    e.opacity = clamp01(p);
                }
            }
            Self::UpdatePnl { trade } => {
                let bars: Vec<Bar> = state
                    .elements()
                    .filter(|(_, e)| e.visible && e.opacity > 0.5)
                    .filter_map(|(_, e)| Bar::of(e))
                    .collect();
                let status = trade.trade.status(bars);
                if let Some(id) = trade.info {
                    let filled = !matches!(status, TradeStatus::Pending);
                    set_text(state, id, trade.trade.info_label(filled), None)?;
                }
                if let Some(id) = trade.pnl {
                    let (text, color) = trade.trade.pnl_label(status);
                    set_text(state, id, text, Some(color))?;
                }
            }
        }
        Ok(())
    }
}

fn set_text(
    state: &mut FrameState,
    id: ElementId,
    text: String,
    color: Option<Color>,
) -> TradeanimResult<()> {
    let e = state.element_mut(id)?;
    let kind = e.kind_name();
    let ElementKind::Text(t) = &mut e.kind else {
        return Err(TradeanimError::animation(format!(
            "update_pnl cannot write {kind} {id}: not a text element"
        )));
    };
    t.text = text;
    if let Some(c) = color {
        t.color = c;
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/animation/anim.rs"]
mod tests;
