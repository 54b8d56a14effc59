//! Trade setups drawn on the chart: take-profit and stop-loss zones, the entry level and a live
//! PnL readout driven by the candles currently revealed.

use serde::{Deserialize, Serialize};

use crate::foundation::color::{Color, hex_or_magenta};
use crate::foundation::error::{TradeanimError, TradeanimResult};
use crate::scene::element::{Element, ElementKind, HAlign, VAlign};
use crate::scene::registry::ElementId;

const ZONE_FILL_ALPHA: f64 = 0x4D as f64 / 255.0;
const ZONE_BORDER_ALPHA: f64 = 0x80 as f64 / 255.0;
const LABEL_COLOR: &str = "#d1d4dc";
const NEUTRAL_COLOR: &str = "#787b86";
const PROFIT_COLOR: &str = "#26a69a";
const LOSS_COLOR: &str = "#ef5350";

/// Trade direction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// Profits when price rises.
    #[default]
    Long,
    /// Profits when price falls.
    Short,
}

/// How the entry is filled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    /// Filled on the entry candle.
    #[default]
    Market,
    /// Filled by the first revealed candle whose range contains the entry price.
    Limit,
}

/// Which bracket closed the trade.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Exit {
    /// Take-profit reached.
    TakeProfit,
    /// Stop-loss reached.
    StopLoss,
}

/// Where a trade stands after replaying a run of candles.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TradeStatus {
    /// Limit order not filled yet.
    Pending,
    /// Filled and running; `price` is the latest close.
    Open {
        /// Index of the filling candle.
        fill_index: i64,
        /// Mark price.
        price: f64,
    },
    /// Closed at one of the brackets.
    Closed {
        /// Index of the filling candle.
        fill_index: i64,
        /// Bracket that was hit.
        exit: Exit,
        /// Exit price (the bracket level).
        price: f64,
    },
}

/// One candle as seen by the trade replay.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bar {
    /// Horizontal slot.
    pub index: i64,
    /// High price.
    pub high: f64,
    /// Low price.
    pub low: f64,
    /// Close price.
    pub close: f64,
}

impl Bar {
    /// OHLC of a candle or bar element.
    pub fn of(e: &Element) -> Option<Self> {
        match &e.kind {
            ElementKind::Candle(c) => Some(Self {
                index: c.index,
                high: c.high,
                low: c.low,
                close: c.close,
            }),
            ElementKind::OhlcBar(b) => Some(Self {
                index: b.index,
                high: b.high,
                low: b.low,
                close: b.close,
            }),
            _ => None,
        }
    }
}

fn one() -> f64 {
    1.0
}

fn default_extend() -> i64 {
    10
}

/// A bracketed trade: entry, stop-loss and take-profit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Candle index the order is placed on.
    pub entry_index: i64,
    /// Entry price.
    pub entry_price: f64,
    /// Direction.
    #[serde(default)]
    pub side: Side,
    /// Stop-loss price.
    pub sl: f64,
    /// Take-profit price.
    pub tp: f64,
    /// Position size.
    #[serde(default = "one")]
    pub contracts: f64,
    /// Currency per point per contract.
    #[serde(default = "one")]
    pub point_value: f64,
    /// Index slots the zones and entry level extend to the right of the entry.
    #[serde(default = "default_extend")]
    pub extend: i64,
    /// Fill rule.
    #[serde(default)]
    pub order_type: OrderType,
}

/// Colors and readout placement for a trade's elements.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TradeStyle {
    /// Add the side/size/RR line.
    pub show_info: bool,
    /// Add the PnL readout.
    pub show_pnl: bool,
    /// Readout anchor x as a fraction of the plot width (right-aligned).
    pub pnl_x: f64,
    /// Readout anchor y as a fraction of the plot height (top-aligned).
    pub pnl_y: f64,
    /// Take-profit color.
    pub tp_color: Color,
    /// Stop-loss color.
    pub sl_color: Color,
}

impl Default for TradeStyle {
    fn default() -> Self {
        Self {
            show_info: true,
            show_pnl: true,
            pnl_x: 0.95,
            pnl_y: 0.92,
            tp_color: hex_or_magenta(PROFIT_COLOR),
            sl_color: hex_or_magenta(LOSS_COLOR),
        }
    }
}

/// Elements generated for a trade, before they are added to a scene.
#[derive(Clone, Debug, PartialEq)]
pub struct TradeParts {
    /// Take-profit zone.
    pub tp_zone: Element,
    /// Stop-loss zone.
    pub sl_zone: Element,
    /// Dashed entry level.
    pub entry_line: Element,
    /// Side/size/RR line.
    pub info: Option<Element>,
    /// PnL readout.
    pub pnl: Option<Element>,
}

/// A trade whose elements live in a scene.
#[derive(Clone, Debug, PartialEq)]
pub struct TradeHandle {
    /// The setup.
    pub trade: Trade,
    /// Take-profit zone.
    pub tp_zone: ElementId,
    /// Stop-loss zone.
    pub sl_zone: ElementId,
    /// Entry level.
    pub entry_line: ElementId,
    /// Side/size/RR line.
    pub info: Option<ElementId>,
    /// PnL readout.
    pub pnl: Option<ElementId>,
}

impl TradeHandle {
    /// Every element of the trade in drawing order.
    pub fn elements(&self) -> Vec<ElementId> {
        [self.tp_zone, self.sl_zone, self.entry_line]
            .into_iter()
            .chain(self.info)
            .chain(self.pnl)
            .collect()
    }
}

impl Trade {
    /// Market order of one contract at one currency unit per point.
    pub fn new(entry_index: i64, entry_price: f64, side: Side, sl: f64, tp: f64) -> Self {
        Self {
            entry_index,
            entry_price,
            side,
            sl,
            tp,
            contracts: 1.0,
            point_value: 1.0,
            extend: default_extend(),
            order_type: OrderType::Market,
        }
    }

    /// Check prices and sizes are usable.
    pub fn validate(&self) -> TradeanimResult<()> {
        for (what, v) in [
            ("entry_price", self.entry_price),
            ("sl", self.sl),
            ("tp", self.tp),
            ("contracts", self.contracts),
            ("point_value", self.point_value),
        ] {
            if !v.is_finite() {
                return Err(TradeanimError::config(format!("trade {what} must be finite")));
            }
        }
        if self.extend < 0 {
            return Err(TradeanimError::config("trade extend must be >= 0"));
        }
        Ok(())
    }

    /// Distance from entry to stop.
    pub fn risk(&self) -> f64 {
        (self.entry_price - self.sl).abs()
    }

    /// Distance from entry to target.
    pub fn reward(&self) -> f64 {
        (self.tp - self.entry_price).abs()
    }

    /// Reward over risk; zero when there is no risk.
    pub fn rr(&self) -> f64 {
        let risk = self.risk();
        if risk > 0.0 { self.reward() / risk } else { 0.0 }
    }

    /// Currency lost if the stop is hit.
    pub fn risk_amount(&self) -> f64 {
        self.risk() * self.contracts * self.point_value
    }

    /// Currency PnL if closed at `price`.
    pub fn pnl(&self, price: f64) -> f64 {
        let points = match self.side {
            Side::Long => price - self.entry_price,
            Side::Short => self.entry_price - price,
        };
        points * self.contracts * self.point_value
    }

    /// PnL in multiples of the risked amount.
    pub fn r_multiple(&self, price: f64) -> f64 {
        let risk = self.risk_amount();
        if risk == 0.0 { 0.0 } else { self.pnl(price) / risk }
    }

    /// Replay `bars` (any order) against the fill rule and the brackets.
    ///
    /// Bars before the entry index are ignored. The first bar reaching a bracket closes the
    /// trade; when one bar reaches both, the take-profit wins.
    pub fn status(&self, bars: impl IntoIterator<Item = Bar>) -> TradeStatus {
        let mut bars: Vec<Bar> = bars
            .into_iter()
            .filter(|b| b.index >= self.entry_index)
            .collect();
        bars.sort_by_key(|b| b.index);

        let fill_index = match self.order_type {
            OrderType::Market => self.entry_index,
            OrderType::Limit => {
                let hit = bars
                    .iter()
                    .find(|b| b.low <= self.entry_price && self.entry_price <= b.high);
                match hit {
                    Some(b) => b.index,
                    None => return TradeStatus::Pending,
                }
            }
        };

        for b in bars.iter().filter(|b| b.index >= fill_index) {
            let (tp_hit, sl_hit) = match self.side {
                Side::Long => (b.high >= self.tp, b.low <= self.sl),
                Side::Short => (b.low <= self.tp, b.high >= self.sl),
            };
            if tp_hit {
                return TradeStatus::Closed {
                    fill_index,
                    exit: Exit::TakeProfit,
                    price: self.tp,
                };
            }
            if sl_hit {
                return TradeStatus::Closed {
                    fill_index,
                    exit: Exit::StopLoss,
                    price: self.sl,
                };
            }
        }
        TradeStatus::Open {
            fill_index,
            price: bars.last().map_or(self.entry_price, |b| b.close),
        }
    }

    /// Side, size and RR line; the `LIMIT` prefix is shown until the order fills.
    pub fn info_label(&self, filled: bool) -> String {
        let side = match self.side {
            Side::Long => "LONG",
            Side::Short => "SHORT",
        };
        let prefix = if self.order_type == OrderType::Limit && !filled {
            "LIMIT "
        } else {
            ""
        };
        format!(
            "{prefix}{side} {}x  |  RR 1:{:.1}",
            self.contracts,
            self.rr()
        )
    }

    /// PnL readout text and color for `status`.
    pub fn pnl_label(&self, status: TradeStatus) -> (String, Color) {
        let (price, tag) = match status {
            TradeStatus::Pending => return ("Pending...".to_owned(), hex_or_magenta(NEUTRAL_COLOR)),
            TradeStatus::Open { price, .. } => (price, ""),
            TradeStatus::Closed { price, exit, .. } => (
                price,
                match exit {
                    Exit::TakeProfit => " TP",
                    Exit::StopLoss => " SL",
                },
            ),
        };
        let pnl = self.pnl(price);
        let r = self.r_multiple(price);
        if pnl >= 0.0 {
            (
                format!("PnL: +${} (+{r:.1}R){tag}", money(pnl)),
                hex_or_magenta(PROFIT_COLOR),
            )
        } else {
            (
                format!("PnL: -${} ({r:.1}R){tag}", money(pnl.abs())),
                hex_or_magenta(LOSS_COLOR),
            )
        }
    }

    /// Zones, entry level and readouts for this trade.
    pub fn parts(&self, style: &TradeStyle) -> TradeParts {
        let x1 = self.entry_index as f64;
        let x2 = (self.entry_index + self.extend) as f64;
        let zone = |lo: f64, hi: f64, color: Color, label: String| {
            let mut e = Element::zone(x1, x2, lo.min(hi), lo.max(hi));
            if let ElementKind::Zone(z) = &mut e.kind {
                z.fill_color = Color {
                    a: ZONE_FILL_ALPHA,
                    ..color
                };
                z.border_color = Some(Color {
                    a: ZONE_BORDER_ALPHA,
                    ..color
                });
                z.border_width = 0.8;
                z.label = label;
                z.label_color = color;
                z.label_size = 10.0;
            }
            e
        };

        let mut entry_line = Element::hline(self.entry_price);
        if let ElementKind::HLine(h) = &mut entry_line.kind {
            h.color = hex_or_magenta(LABEL_COLOR);
            h.line_width = 1.2;
            h.dashed = true;
            h.label = format!("Entry {}", self.entry_price);
            h.label_color = Some(hex_or_magenta(LABEL_COLOR));
            h.label_size = 10.0;
            h.x_start = Some(x1);
            h.x_end = Some(x2);
        }

        let readout = |text: String, y: f64, color: &str, size: f64| {
            let mut e = Element::text(text, style.pnl_x, y);
            if let ElementKind::Text(t) = &mut e.kind {
                t.color = hex_or_magenta(color);
                t.font_size = size;
                t.bold = true;
                t.h_align = HAlign::Right;
                t.v_align = VAlign::Top;
                t.data_coords = false;
            }
            e
        };
        let info = style.show_info.then(|| {
            readout(
                self.info_label(self.order_type == OrderType::Market),
                style.pnl_y,
                LABEL_COLOR,
                13.0,
            )
        });
        let pnl = style.show_pnl.then(|| {
            let y = if style.show_info {
                style.pnl_y - 0.04
            } else {
                style.pnl_y
            };
            let text = match self.order_type {
                OrderType::Limit => "Pending...".to_owned(),
                OrderType::Market => "PnL: $0.00 (0.0R)".to_owned(),
            };
            readout(text, y, NEUTRAL_COLOR, 15.0)
        });

        let (tp_span, sl_span) = match self.side {
            Side::Long => ((self.entry_price, self.tp), (self.sl, self.entry_price)),
            Side::Short => ((self.tp, self.entry_price), (self.entry_price, self.sl)),
        };
        TradeParts {
            tp_zone: zone(tp_span.0, tp_span.1, style.tp_color, format!("TP {}", self.tp)),
            sl_zone: zone(sl_span.0, sl_span.1, style.sl_color, format!("SL {}", self.sl)),
            entry_line,
            info,
            pnl,
        }
    }
}

/// `1234567.891` -> `1,234,567.89`.
fn money(v: f64) -> String {
    let fixed = format!("{v:.2}");
    let (int, frac) = fixed.split_once('.').unwrap_or((&fixed, "00"));
    let mut out = String::with_capacity(fixed.len() + int.len() / 3);
    for (i, ch) in int.chars().enumerate() {
        if i > 0 && (int.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    format!("{out}.{frac}")
}

#[cfg(test)]
#[path = "../../tests/unit/scene/trade.rs"]
mod tests;
