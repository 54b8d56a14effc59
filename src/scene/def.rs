use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::animation::anim::{Animation, AppearStyle, Direction};
use crate::animation::ease::Ease;
use crate::config::render::RenderConfig;
use crate::foundation::color::Color;
use crate::foundation::error::{TradeanimError, TradeanimResult};
use crate::scene::builder::{PlayOpts, Scene, SceneBuilder};
use crate::scene::camera::Camera;
use crate::scene::element::Element;
use crate::scene::registry::ElementId;
use crate::scene::trade::{Trade, TradeHandle, TradeStyle};

/// JSON scene description.
///
/// Elements are named by string ids; a candle series registers one element per row plus the
/// series id itself, which expands to every row when used as an animation target. A trade
/// registers its id (all of its parts) plus `id.tp`, `id.sl`, `id.entry`, `id.info` and `id.pnl`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SceneDef {
    /// Render settings.
    #[serde(default)]
    pub config: RenderConfig,
    /// Initial camera; defaults to [`Camera::default`].
    #[serde(default)]
    pub camera: Option<Camera>,
    /// Inline OHLC series.
    #[serde(default)]
    pub series: Vec<SeriesDef>,
    /// Individually declared elements, added after the series.
    #[serde(default)]
    pub elements: Vec<ElementDef>,
    /// Trade setups, added after the elements.
    #[serde(default)]
    pub trades: Vec<TradeDef>,
    /// Scheduling steps, in order.
    #[serde(default)]
    pub steps: Vec<StepDef>,
}

/// Named element.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementDef {
    /// Name used by animation targets.
    pub id: String,
    /// The element.
    #[serde(flatten)]
    pub element: Element,
}

/// Named trade setup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeDef {
    /// Name used by `show_trade` and `update_pnl`.
    pub id: String,
    /// Entry, brackets and sizing.
    #[serde(flatten)]
    pub trade: Trade,
    /// Readout placement and zone colors.
    #[serde(default)]
    pub style: TradeStyle,
}

/// How a series draws its rows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesStyle {
    /// Candlesticks.
    #[default]
    Candle,
    /// OHLC bars.
    OhlcBar,
}

/// Inline OHLC rows turned into consecutive candles or bars.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesDef {
    /// Series name; rows are also addressable as `id[i]`.
    pub id: String,
    /// Index of the first row.
    #[serde(default)]
    pub start_index: i64,
    /// `[open, high, low, close]` rows.
    pub ohlc: Vec<[f64; 4]>,
    /// Row style.
    #[serde(default)]
    pub style: SeriesStyle,
    /// Start hidden regardless of the entrance rule.
    #[serde(default)]
    pub hidden: bool,
    /// Per-row volume for the volume panel; missing rows have none.
    #[serde(default)]
    pub volume: Vec<f64>,
}

/// One scheduling step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepDef {
    /// Start animations at the current time.
    Play(PlayDef),
    /// Start animations and then wait for their duration.
    PlayAndWait(PlayDef),
    /// Start animations relative to the previous play.
    PlayWithPrevious(PlayDef),
    /// Advance the current time.
    Wait(f64),
}

/// One batch of animations.
///
/// Without `duration` or `ease` each animation uses its own default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayDef {
    /// Animations to start.
    pub animations: Vec<AnimationDef>,
    /// Shared duration in seconds.
    #[serde(default)]
    pub duration: Option<f64>,
    /// Shared ease.
    #[serde(default)]
    pub ease: Option<Ease>,
    /// Seconds between consecutive animation starts.
    #[serde(default)]
    pub delay: f64,
    /// Offset from the previous play's start (`play_with_previous` only).
    #[serde(default)]
    pub offset: f64,
}

impl PlayDef {
    fn opts(&self) -> PlayOpts {
        PlayOpts {
            duration: self.duration,
            delay: self.delay,
            ease: self.ease,
        }
    }
}

fn yes() -> bool {
    true
}

fn default_distance() -> f64 {
    0.15
}

fn default_spin() -> f64 {
    -90.0
}

fn default_zoom_padding() -> f64 {
    0.1
}

fn default_min_opacity() -> f64 {
    0.3
}

fn default_max_opacity() -> f64 {
    1.0
}

fn default_cycles() -> f64 {
    3.0
}

fn default_amplitude() -> f64 {
    0.5
}

fn default_shake_cycles() -> f64 {
    15.0
}

fn default_slide_out() -> Direction {
    Direction::Right
}

fn default_stagger() -> f64 {
    0.08
}

fn default_fade() -> f64 {
    0.5
}

/// Animation with string targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum AnimationDef {
    Appear {
        targets: Vec<String>,
        #[serde(default)]
        style: AppearStyle,
        #[serde(default = "yes")]
        auto_camera: bool,
    },
    FadeIn {
        target: String,
    },
    FadeOut {
        target: String,
        #[serde(default)]
        remove: bool,
    },
    #[serde(alias = "draw_line")]
    DrawProgressive {
        target: String,
    },
    #[serde(alias = "write")]
    TypeText {
        target: String,
    },
    HighlightZone {
        target: String,
    },
    PanCamera {
        #[serde(default)]
        view_start: Option<f64>,
        #[serde(default)]
        view_end: Option<f64>,
        #[serde(default)]
        price_min: Option<f64>,
        #[serde(default)]
        price_max: Option<f64>,
    },
    ZoomTo {
        start_index: i64,
        end_index: i64,
        #[serde(default = "default_zoom_padding")]
        padding: f64,
    },
    SlideIn {
        target: String,
        #[serde(default)]
        direction: Direction,
        #[serde(default = "default_distance")]
        distance: f64,
    },
    SlideOut {
        target: String,
        #[serde(default = "default_slide_out")]
        direction: Direction,
        #[serde(default = "default_distance")]
        distance: f64,
    },
    #[serde(alias = "grow_from_center", alias = "bounce_in")]
    ScaleIn {
        target: String,
    },
    SpinIn {
        target: String,
        #[serde(default = "default_spin")]
        angle: f64,
    },
    ColorShift {
        target: String,
        to: Color,
        #[serde(default)]
        from: Option<Color>,
    },
    #[serde(alias = "glow_pulse")]
    Pulse {
        target: String,
        #[serde(default = "default_min_opacity")]
        min_opacity: f64,
        #[serde(default = "default_max_opacity")]
        max_opacity: f64,
        #[serde(default = "default_cycles")]
        cycles: f64,
    },
    Shake {
        target: String,
        #[serde(default = "default_amplitude")]
        amplitude: f64,
        #[serde(default = "default_shake_cycles")]
        cycles: f64,
    },
    MorphLine {
        target: String,
        target_y: Vec<f64>,
    },
    Wipe {
        targets: Vec<String>,
        #[serde(default)]
        direction: Direction,
    },
    Flash {
        target: String,
        #[serde(default)]
        color: Option<Color>,
        #[serde(default = "default_cycles")]
        cycles: f64,
    },
    Sweep {
        targets: Vec<String>,
    },
    StaggeredFadeIn {
        targets: Vec<String>,
        #[serde(default = "default_stagger")]
        stagger: f64,
        #[serde(default = "default_fade")]
        fade: f64,
    },
    ChartAppear {
        targets: Vec<String>,
        #[serde(default = "yes")]
        auto_camera: bool,
    },
    AddCandles {
        targets: Vec<String>,
        #[serde(default = "yes")]
        auto_camera: bool,
    },
    /// Appear with the `pop` style.
    CandleGrow {
        targets: Vec<String>,
        #[serde(default = "yes")]
        auto_camera: bool,
    },
    ShowTrade {
        trade: String,
    },
    UpdatePnl {
        trade: String,
    },
}

#[derive(Default)]
struct Names {
    ids: BTreeMap<String, Vec<ElementId>>,
    trades: BTreeMap<String, TradeHandle>,
}

impl Names {
    fn insert(&mut self, name: String, ids: Vec<ElementId>) -> TradeanimResult<()> {
        if self.ids.contains_key(&name) {
            return Err(TradeanimError::timeline(format!(
                "duplicate element id '{name}'"
            )));
        }
        self.ids.insert(name, ids);
        Ok(())
    }

    fn insert_trade(&mut self, name: String, trade: TradeHandle) -> TradeanimResult<()> {
        let parts = [
            ("tp", Some(trade.tp_zone)),
            ("sl", Some(trade.sl_zone)),
            ("entry", Some(trade.entry_line)),
            ("info", trade.info),
            ("pnl", trade.pnl),
        ];
        for (part, id) in parts {
            if let Some(id) = id {
                self.insert(format!("{name}.{part}"), vec![id])?;
            }
        }
        self.insert(name.clone(), trade.elements())?;
        self.trades.insert(name, trade);
        Ok(())
    }

    fn trade(&self, name: &str) -> TradeanimResult<&TradeHandle> {
        self.trades
            .get(name)
            .ok_or_else(|| TradeanimError::timeline(format!("unknown trade id '{name}'")))
    }

    fn all(&self, name: &str) -> TradeanimResult<&[ElementId]> {
        self.ids
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| TradeanimError::timeline(format!("unknown element id '{name}'")))
    }

    fn one(&self, name: &str) -> TradeanimResult<ElementId> {
        match self.all(name)? {
            [id] => Ok(*id),
            ids => Err(TradeanimError::timeline(format!(
                "'{name}' names {} elements where one is expected",
                ids.len()
            ))),
        }
    }

    fn many(&self, names: &[String]) -> TradeanimResult<Vec<ElementId>> {
        let mut out = Vec::new();
        for n in names {
            out.extend_from_slice(self.all(n)?);
        }
        Ok(out)
    }
}

impl AnimationDef {
    fn resolve(&self, names: &Names) -> TradeanimResult<Animation> {
        Ok(match self {
            Self::Appear {
                targets,
                style,
                auto_camera,
            } => Animation::Appear {
                targets: names.many(targets)?,
                style: *style,
                auto_camera: *auto_camera,
            },
            Self::FadeIn { target } => Animation::FadeIn {
                target: names.one(target)?,
            },
            Self::FadeOut { target, remove } => Animation::FadeOut {
                target: names.one(target)?,
                remove: *remove,
            },
            Self::DrawProgressive { target } => Animation::DrawProgressive {
                target: names.one(target)?,
            },
            Self::TypeText { target } => Animation::TypeText {
                target: names.one(target)?,
            },
            Self::HighlightZone { target } => Animation::HighlightZone {
                target: names.one(target)?,
            },
            Self::PanCamera {
                view_start,
                view_end,
                price_min,
                price_max,
            } => Animation::PanCamera {
                view_start: *view_start,
                view_end: *view_end,
                price_min: *price_min,
                price_max: *price_max,
            },
            Self::ZoomTo {
                start_index,
                end_index,
                padding,
            } => Animation::ZoomTo {
                start_index: *start_index,
                end_index: *end_index,
                padding: *padding,
            },
            Self::SlideIn {
                target,
                direction,
                distance,
            } => Animation::SlideIn {
                target: names.one(target)?,
                direction: *direction,
                distance: *distance,
            },
            Self::SlideOut {
                target,
                direction,
                distance,
            } => Animation::SlideOut {
                target: names.one(target)?,
                direction: *direction,
                distance: *distance,
            },
            Self::ScaleIn { target } => Animation::ScaleIn {
                target: names.one(target)?,
            },
            Self::SpinIn { target, angle } => Animation::SpinIn {
                target: names.one(target)?,
                angle: *angle,
            },
            Self::ColorShift { target, to, from } => Animation::ColorShift {
                target: names.one(target)?,
                to: *to,
                from: *from,
            },
            Self::Pulse {
                target,
                min_opacity,
                max_opacity,
                cycles,
            } => Animation::Pulse {
                target: names.one(target)?,
                min_opacity: *min_opacity,
                max_opacity: *max_opacity,
                cycles: *cycles,
            },
            Self::Shake {
                target,
                amplitude,
                cycles,
            } => Animation::Shake {
                target: names.one(target)?,
                amplitude: *amplitude,
                cycles: *cycles,
            },
            Self::MorphLine { target, target_y } => Animation::MorphLine {
                target: names.one(target)?,
                target_y: target_y.clone(),
            },
            Self::Wipe { targets, direction } => Animation::Wipe {
                targets: names.many(targets)?,
                direction: *direction,
            },
            Self::Flash {
                target,
                color,
                cycles,
            } => Animation::Flash {
                target: names.one(target)?,
                color: *color,
                cycles: *cycles,
            },
            Self::Sweep { targets } => Animation::Sweep {
                targets: names.many(targets)?,
            },
            Self::StaggeredFadeIn {
                targets,
                stagger,
                fade,
            } => Animation::StaggeredFadeIn {
                targets: names.many(targets)?,
                stagger: *stagger,
                fade: *fade,
            },
            Self::ChartAppear {
                targets,
                auto_camera,
            } => Animation::ChartAppear {
                targets: names.many(targets)?,
                auto_camera: *auto_camera,
            },
            Self::AddCandles {
                targets,
                auto_camera,
            } => Animation::AddCandles {
                targets: names.many(targets)?,
                auto_camera: *auto_camera,
            },
            Self::CandleGrow {
                targets,
                auto_camera,
            } => Animation::Appear {
                targets: names.many(targets)?,
                style: AppearStyle::Pop,
                auto_camera: *auto_camera,
            },
            Self::ShowTrade { trade } => Animation::show_trade(names.trade(trade)?),
            Self::UpdatePnl { trade } => Animation::update_pnl(names.trade(trade)?),
        })
    }
}

impl SceneDef {
    /// Parse a scene description from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> TradeanimResult<Self> {
        serde_json::from_reader(r)
            .map_err(|e| TradeanimError::serde(format!("parse scene JSON: {e}")))
    }

    /// Parse a scene description from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> TradeanimResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            TradeanimError::config(format!("open scene JSON '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Build the scene through the same builder calls hand-written scenes use.
    pub fn into_scene(self) -> TradeanimResult<Scene> {
        let Self {
            config,
            camera,
            series,
            elements,
            trades,
            steps,
        } = self;
        Scene::build(config, move |s| {
            if let Some(cam) = camera {
                s.set_camera(cam);
            }
            let mut names = Names::default();
            for sd in series {
                add_series(s, &mut names, sd)?;
            }
            for ed in elements {
                let id = s.add_element(ed.element);
                names.insert(ed.id, vec![id])?;
            }
            for td in trades {
                let handle = s.add_trade(td.trade, &td.style)?;
                names.insert_trade(td.id, handle)?;
            }
            for step in &steps {
                run_step(s, &names, step)?;
            }
            Ok(())
        })
    }
}

fn add_series(s: &mut SceneBuilder, names: &mut Names, sd: SeriesDef) -> TradeanimResult<()> {
    let mut ids = Vec::with_capacity(sd.ohlc.len());
    for (i, [open, high, low, close]) in sd.ohlc.into_iter().enumerate() {
        let index = sd.start_index + i as i64;
        let mut e = match sd.style {
            SeriesStyle::Candle => Element::candle(index, open, high, low, close),
            SeriesStyle::OhlcBar => Element::ohlc_bar(index, open, high, low, close),
        };
        if let Some(&volume) = sd.volume.get(i) {
            e = e.with_volume(volume);
        }
        e.visible = !sd.hidden;
        let id = s.add_element(e);
        names.insert(format!("{}[{i}]", sd.id), vec![id])?;
        ids.push(id);
    }
    names.insert(sd.id, ids)
}

fn run_step(s: &mut SceneBuilder, names: &Names, step: &StepDef) -> TradeanimResult<()> {
    let resolve = |p: &PlayDef| -> TradeanimResult<Vec<Animation>> {
        p.animations.iter().map(|a| a.resolve(names)).collect()
    };
    match step {
        StepDef::Play(p) => s.play_with(resolve(p)?, p.opts()),
        StepDef::PlayAndWait(p) => s.play_and_wait_with(resolve(p)?, p.opts()),
        StepDef::PlayWithPrevious(p) => {
            s.play_with_previous_opts(resolve(p)?, p.offset, p.opts())
        }
        StepDef::Wait(secs) => s.wait(*secs),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/def.rs"]
mod tests;
