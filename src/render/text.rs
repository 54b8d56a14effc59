//! Text rasterization through `usvg`/`resvg`.
//!
//! Each label is laid out as a one-element SVG document, rasterized into a tightly cropped
//! premultiplied pixmap and then drawn by the CPU backend as an image paint.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use usvg::fontdb;

use crate::foundation::color::Color;
use crate::foundation::error::{TradeanimError, TradeanimResult};
use crate::render::cpu::premul_image;

const MAX_CACHED_RUNS: usize = 1024;

const MONOSPACE_CANDIDATES: &[&str] = &[
    "DejaVu Sans Mono",
    "Liberation Mono",
    "Noto Sans Mono",
    "Menlo",
    "Consolas",
    "Courier New",
];

const SANS_CANDIDATES: &[&str] = &[
    "DejaVu Sans",
    "Liberation Sans",
    "Noto Sans",
    "Helvetica",
    "Arial",
];

/// Shared, read-only font database.
///
/// Cloning is cheap; every render worker holds a clone of the same database.
#[derive(Clone)]
pub struct FontBook {
    db: Arc<fontdb::Database>,
}

impl fmt::Debug for FontBook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontBook")
            .field("faces", &self.db.len())
            .finish()
    }
}

impl FontBook {
    /// System fonts, loaded once per process.
    pub fn system() -> Self {
        static SYSTEM: OnceLock<Arc<fontdb::Database>> = OnceLock::new();
        let db = SYSTEM.get_or_init(|| {
            let mut db = fontdb::Database::new();
            db.load_system_fonts();
            if let Some(name) = first_available(&db, MONOSPACE_CANDIDATES) {
                db.set_monospace_family(name);
            }
            if let Some(name) = first_available(&db, SANS_CANDIDATES) {
                db.set_sans_serif_family(name);
            }
            tracing::debug!(faces = db.len(), "system fonts loaded");
            Arc::new(db)
        });
        Self { db: db.clone() }
    }

    /// No fonts at all; every text run rasterizes to nothing.
    pub fn empty() -> Self {
        Self {
            db: Arc::new(fontdb::Database::new()),
        }
    }

    /// Wrap a caller-populated database.
    pub fn from_database(db: fontdb::Database) -> Self {
        Self { db: Arc::new(db) }
    }

    /// Number of loaded font faces.
    pub fn len(&self) -> usize {
        self.db.len()
    }

    /// `true` when no faces are loaded.
    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }
}

fn first_available(db: &fontdb::Database, candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .find(|name| {
            db.faces()
                .any(|face| face.families.iter().any(|(family, _)| family == *name))
        })
        .map(|name| (*name).to_owned())
}

/// Everything that changes the raster of a text run.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct TextStyle<'a> {
    pub text: &'a str,
    pub family: &'a str,
    pub size_px: f64,
    pub bold: bool,
    pub color: Color,
    pub outline: Option<(Color, f64)>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct TextKey {
    text: String,
    family: String,
    size_q: u32,
    bold: bool,
    fill: [u8; 4],
    outline: Option<([u8; 4], u32)>,
}

fn quantize(v: f64) -> u32 {
    (v.max(0.0) * 64.0).round() as u32
}

impl TextKey {
    fn new(style: &TextStyle<'_>) -> Self {
        Self {
            text: style.text.to_owned(),
            family: style.family.to_owned(),
            size_q: quantize(style.size_px),
            bold: style.bold,
            fill: style.color.to_rgba8(),
            outline: style
                .outline
                .map(|(c, w)| (c.to_rgba8(), quantize(w))),
        }
    }
}

/// Rasterized text run.
///
/// The ink box sits one pixel inside the image on every side.
#[derive(Clone)]
pub(crate) struct TextImage {
    pub image: vello_cpu::Image,
    pub width: u32,
    pub height: u32,
}

impl TextImage {
    pub fn ink_width(&self) -> f64 {
        f64::from(self.width.saturating_sub(2))
    }

    pub fn ink_height(&self) -> f64 {
        f64::from(self.height.saturating_sub(2))
    }
}

/// Per-worker text cache over a shared [`FontBook`].
pub(crate) struct TextRasterizer {
    fonts: FontBook,
    cache: HashMap<TextKey, Option<Arc<TextImage>>>,
}

impl TextRasterizer {
    pub fn new(fonts: FontBook) -> Self {
        Self {
            fonts,
            cache: HashMap::new(),
        }
    }

    /// Rasterize `style`, returning `None` when nothing would be visible (empty text, no
    /// matching font, zero size).
    pub fn rasterize(&mut self, style: &TextStyle<'_>) -> TradeanimResult<Option<Arc<TextImage>>> {
        if style.text.trim().is_empty() || !(style.size_px >= 0.5) || self.fonts.is_empty() {
            return Ok(None);
        }
        let key = TextKey::new(style);
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit.clone());
        }
        let out = rasterize_uncached(&self.fonts, style)?.map(Arc::new);
        if self.cache.len() >= MAX_CACHED_RUNS {
            self.cache.clear();
        }
        self.cache.insert(key, out.clone());
        Ok(out)
    }

    #[cfg(test)]
    fn cached_runs(&self) -> usize {
        self.cache.len()
    }
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            // Not representable in XML 1.0.
            c if is_xml_invalid(c) => {}
            c => out.push(c),
        }
    }
    out
}

fn is_xml_invalid(c: char) -> bool {
    (c < ' ' && !matches!(c, '\t' | '\n' | '\r'))
        || matches!(c, '\u{FFFE}' | '\u{FFFF}')
}

fn svg_document(style: &TextStyle<'_>) -> String {
    let size = style.size_px;
    let stroke_w = style.outline.map_or(0.0, |(_, w)| w.max(0.0));
    let pad = size * 0.5 + stroke_w;
    let chars = style.text.chars().count().max(1) as f64;
    let width = (chars * size * 1.2 + 2.0 * pad).ceil();
    let height = (size * 2.0 + 2.0 * pad).ceil();
    let baseline = pad + size * 1.25;

    let mut attrs = format!(
        r#"x="{pad}" y="{baseline}" font-family="{family}, monospace, sans-serif" font-size="{size}" fill="{fill}" fill-opacity="{alpha}""#,
        family = escape_xml(style.family),
        fill = style.color.to_hex_rgb(),
        alpha = style.color.a.clamp(0.0, 1.0),
    );
    if style.bold {
        attrs.push_str(r#" font-weight="bold""#);
    }
    if let Some((color, w)) = style.outline {
        attrs.push_str(&format!(
            r#" stroke="{}" stroke-opacity="{}" stroke-width="{}" stroke-linejoin="round" paint-order="stroke""#,
            color.to_hex_rgb(),
            color.a.clamp(0.0, 1.0),
            w
        ));
    }
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}"><text {attrs} xml:space="preserve">{}</text></svg>"#,
        escape_xml(style.text)
    )
}

fn rasterize_uncached(fonts: &FontBook, style: &TextStyle<'_>) -> TradeanimResult<Option<TextImage>> {
    let svg = svg_document(style);
    let opts = usvg::Options {
        fontdb: fonts.db.clone(),
        ..usvg::Options::default()
    };
    let tree = usvg::Tree::from_str(&svg, &opts)
        .map_err(|e| TradeanimError::render(format!("lay out text '{}': {e}", style.text)))?;
    if !tree.root().has_children() {
        return Ok(None);
    }

    let bbox = tree.root().abs_stroke_bounding_box();
    if !(bbox.width() > 0.0 && bbox.height() > 0.0) {
        return Ok(None);
    }
    let width = bbox.width().ceil() as u32 + 2;
    let height = bbox.height().ceil() as u32 + 2;
    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| TradeanimError::render("failed to allocate text pixmap"))?;
    let xform = resvg::tiny_skia::Transform::from_translate(1.0 - bbox.left(), 1.0 - bbox.top());
    resvg::render(&tree, xform, &mut pixmap.as_mut());

    let image = premul_image(pixmap.data(), width, height)?;
    Ok(Some(TextImage {
        image,
        width,
        height,
    }))
}

#[cfg(test)]
#[path = "../../tests/unit/render/text.rs"]
mod tests;
