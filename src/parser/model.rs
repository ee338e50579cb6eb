//! Data model for parsed movies
//!
//! All lengths are kept in twips (1/20 px). Conversion to pixels happens only
//! when a value is formatted into output text.

use indexmap::IndexMap;
use sha2::{Digest, Sha256};

/// Twips per CSS/SVG pixel
pub const TWIPS_PER_PIXEL: f64 = 20.0;

/// Convert twips to pixels
pub fn px(twips: f64) -> f64 {
    twips / TWIPS_PER_PIXEL
}

/// An RGBA color; alpha ranges over 0..=256 where 256 is fully opaque
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub red: i32,
    pub green: i32,
    pub blue: i32,
    pub alpha: i32,
}

impl Rgba {
    pub fn new(red: i32, green: i32, blue: i32, alpha: i32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Lowercase `#rrggbb`, channels clamped to 0..=255
    pub fn to_hex(&self) -> String {
        let c = |v: i32| v.clamp(0, 255);
        format!(
            "#{:02x}{:02x}{:02x}",
            c(self.red),
            c(self.green),
            c(self.blue)
        )
    }

    /// Apply a color transform to every channel
    pub fn transform(&self, ctf: &ColorTransform) -> Rgba {
        let channel = |i: usize, v: i32| {
            let max = if i == 3 { 256 } else { 255 };
            let scaled = (v as i64 * ctf.factor[i] as i64).div_euclid(256) as i32;
            (scaled + ctf.offset[i]).clamp(0, max)
        };
        Rgba {
            red: channel(0, self.red),
            green: channel(1, self.green),
            blue: channel(2, self.blue),
            alpha: channel(3, self.alpha),
        }
    }
}

/// Value of one fill or line style
#[derive(Debug, Clone, PartialEq)]
pub enum Paint {
    Rgba(Rgba),
    /// Id of a gradient definition registered on the owning shape
    Gradient(String),
}

impl Paint {
    /// The value used for an SVG `fill`/`stroke` attribute
    pub fn svg_value(&self) -> String {
        match self {
            Paint::Rgba(c) => c.to_hex(),
            Paint::Gradient(id) => format!("url(#{})", id),
        }
    }
}

/// A style slot of an edge: either a fill or a line color
#[derive(Debug, Clone, PartialEq)]
pub enum StyleColor {
    Solid(Paint),
    Line(Paint),
}

/// How a moveto changes the selected style on one side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StyleChange {
    /// Attribute absent: the previous selection stays
    #[default]
    Keep,
    /// Style index 0: nothing is selected
    Clear,
    /// Zero-based style index
    Select(usize),
}

impl StyleChange {
    /// Convert a 1-based style attribute value
    pub fn from_one_based(value: Option<u32>) -> Self {
        match value {
            None => StyleChange::Keep,
            Some(0) => StyleChange::Clear,
            Some(n) => StyleChange::Select(n as usize - 1),
        }
    }
}

/// Style selection carried by a moveto
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StyleRun {
    pub fill_left: StyleChange,
    pub fill_right: StyleChange,
    pub line: StyleChange,
}

/// One drawing record of an edge
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Segment {
    /// Absolute moveto, starting a sub-path
    Move { x: f64, y: f64, styles: StyleRun },
    /// Relative straight line
    Line { dx: f64, dy: f64 },
    /// Relative quadratic curve: control delta then anchor delta
    Curve { dx1: f64, dy1: f64, dx2: f64, dy2: f64 },
}

impl Segment {
    pub fn is_move(&self) -> bool {
        matches!(self, Segment::Move { .. })
    }
}

/// Which half of an edge to collect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
    Line,
}

/// One style run of a shape: its colors and the segments drawn with them
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Edge {
    pub colors: Vec<StyleColor>,
    /// Widths of the line styles in twips, parallel to the line colors
    pub line_widths: Vec<f64>,
    pub segments: Vec<Segment>,
}

impl Edge {
    /// Fill paints in style order
    pub fn solid_colors(&self) -> Vec<&Paint> {
        self.colors
            .iter()
            .filter_map(|c| match c {
                StyleColor::Solid(p) => Some(p),
                StyleColor::Line(_) => None,
            })
            .collect()
    }

    /// Line paints in style order
    pub fn line_colors(&self) -> Vec<&Paint> {
        self.colors
            .iter()
            .filter_map(|c| match c {
                StyleColor::Line(p) => Some(p),
                StyleColor::Solid(_) => None,
            })
            .collect()
    }

    /// Segments drawn while `side` selects style `index`
    ///
    /// The moveto that makes the selection is included, so the result is a
    /// list of sub-paths each starting with a `Move`.
    pub fn path(&self, index: usize, side: Side) -> Vec<Segment> {
        let mut result = Vec::new();
        let mut contain = false;

        for seg in &self.segments {
            if let Segment::Move { styles, .. } = seg {
                let change = match side {
                    Side::Left => styles.fill_left,
                    Side::Right => styles.fill_right,
                    Side::Line => styles.line,
                };
                match change {
                    StyleChange::Keep => {}
                    StyleChange::Clear => contain = false,
                    StyleChange::Select(i) => contain = i == index,
                }
            }
            if contain {
                result.push(*seg);
            }
        }
        result
    }
}

/// A gradient stop
#[derive(Debug, Clone, PartialEq)]
pub struct GradientStop {
    pub color: Rgba,
    /// Ratio in 0..=255
    pub position: f64,
}

/// A linear gradient definition owned by a shape
#[derive(Debug, Clone, PartialEq)]
pub struct LinearGradient {
    pub id: String,
    pub matrix: Matrix,
    pub stops: Vec<GradientStop>,
}

/// A vector shape definition
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Shape {
    /// `obj<id>`
    pub symbol: String,
    /// Content name used in file names
    pub name: String,
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
    pub edges: Vec<Edge>,
    pub defs: Vec<LinearGradient>,
}

impl Shape {
    pub fn new(symbol: impl Into<String>) -> Self {
        let symbol = symbol.into();
        Self {
            name: content_name(&symbol),
            symbol,
            ..Self::default()
        }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }
}

/// SHA-256 hex digest of a symbol
pub fn content_name(symbol: &str) -> String {
    Sha256::digest(symbol.as_bytes())
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Resolved 2D affine matrix; translation in twips
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub sx: f64,
    pub sy: f64,
    pub wx: f64,
    pub wy: f64,
    pub tx: f64,
    pub ty: f64,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        sx: 1.0,
        sy: 1.0,
        wx: 0.0,
        wy: 0.0,
        tx: 0.0,
        ty: 0.0,
    };

    /// Terms in CSS `matrix()` order with translation in pixels
    pub fn css_terms(&self) -> [f64; 6] {
        [self.sx, self.wx, self.wy, self.sy, px(self.tx), px(self.ty)]
    }
}

/// Matrix as it appears on a placement record: each field may be absent
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PartialMatrix {
    pub sx: Option<f64>,
    pub sy: Option<f64>,
    pub wx: Option<f64>,
    pub wy: Option<f64>,
    pub tx: Option<f64>,
    pub ty: Option<f64>,
}

impl PartialMatrix {
    pub fn is_empty(&self) -> bool {
        self.fields().iter().all(Option::is_none)
    }

    /// Only the translation is given
    pub fn is_translate_only(&self) -> bool {
        self.sx.is_none() && self.sy.is_none() && self.wx.is_none() && self.wy.is_none()
    }

    fn fields(&self) -> [Option<f64>; 6] {
        [self.sx, self.sy, self.wx, self.wy, self.tx, self.ty]
    }

    /// Fill absent fields from `other`
    pub fn or(self, other: &PartialMatrix) -> PartialMatrix {
        PartialMatrix {
            sx: self.sx.or(other.sx),
            sy: self.sy.or(other.sy),
            wx: self.wx.or(other.wx),
            wy: self.wy.or(other.wy),
            tx: self.tx.or(other.tx),
            ty: self.ty.or(other.ty),
        }
    }

    /// Absent fields take their identity value
    pub fn resolve(&self) -> Matrix {
        let id = Matrix::IDENTITY;
        Matrix {
            sx: self.sx.unwrap_or(id.sx),
            sy: self.sy.unwrap_or(id.sy),
            wx: self.wx.unwrap_or(id.wx),
            wy: self.wy.unwrap_or(id.wy),
            tx: self.tx.unwrap_or(id.tx),
            ty: self.ty.unwrap_or(id.ty),
        }
    }
}

impl From<Matrix> for PartialMatrix {
    fn from(m: Matrix) -> Self {
        PartialMatrix {
            sx: Some(m.sx),
            sy: Some(m.sy),
            wx: Some(m.wx),
            wy: Some(m.wy),
            tx: Some(m.tx),
            ty: Some(m.ty),
        }
    }
}

/// Eight-value color transform: RGBA factors (256 = identity) then offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorTransform {
    pub factor: [i32; 4],
    pub offset: [i32; 4],
}

impl Default for ColorTransform {
    fn default() -> Self {
        Self {
            factor: [256; 4],
            offset: [0; 4],
        }
    }
}

impl ColorTransform {
    /// Build from `[factors.., offsets..]`
    pub fn from_values(values: [i32; 8]) -> Self {
        Self {
            factor: [values[0], values[1], values[2], values[3]],
            offset: [values[4], values[5], values[6], values[7]],
        }
    }

    pub fn values(&self) -> [i32; 8] {
        let f = self.factor;
        let o = self.offset;
        [f[0], f[1], f[2], f[3], o[0], o[1], o[2], o[3]]
    }

    /// Alpha of an opaque pixel after the transform, in 0..=1
    pub fn opacity(&self) -> f64 {
        Rgba::new(0, 0, 0, 256).transform(self).alpha as f64 / 256.0
    }

    /// `[f0, f1, ..., o3]` as written to structure and animation artifacts
    pub fn to_list_string(&self) -> String {
        let items: Vec<String> = self.values().iter().map(|v| v.to_string()).collect();
        format!("[{}]", items.join(", "))
    }
}

/// Format an optional color transform as a list (`[]` when absent)
pub fn ctf_list_string(ctf: Option<&ColorTransform>) -> String {
    ctf.map(ColorTransform::to_list_string)
        .unwrap_or_else(|| "[]".to_string())
}

/// One placement record of a timeline
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub object_id: Option<u16>,
    pub depth: u16,
    pub matrix: PartialMatrix,
    pub ctf: Option<ColorTransform>,
    pub clip_depth: Option<u16>,
    pub name: Option<String>,
    pub visible: bool,
    /// Instance keys (`<prefix>-obj<id>-<depth>`) this placement drives
    pub symbols: Vec<String>,
}

impl Place {
    pub fn new(depth: u16) -> Self {
        Self {
            object_id: None,
            depth,
            matrix: PartialMatrix::default(),
            ctf: None,
            clip_depth: None,
            name: None,
            visible: true,
            symbols: Vec::new(),
        }
    }
}

/// One timeline tick
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    /// Placements ordered by depth
    pub places: Vec<Place>,
}

impl Frame {
    /// Insert a placement keeping depth order
    pub fn add_place(&mut self, place: Place) {
        let at = self.places.partition_point(|p| p.depth <= place.depth);
        self.places.insert(at, place);
    }

    pub fn has_depth(&self, depth: u16) -> bool {
        self.places.iter().any(|p| p.depth == depth)
    }

    /// First placement carrying `key`
    pub fn place_for_key(&self, key: &str) -> Option<&Place> {
        self.places.iter().find(|p| p.symbols.iter().any(|s| s == key))
    }
}

/// A nested animated symbol
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sprite {
    pub symbol: String,
    pub frames: Vec<Frame>,
}

impl Sprite {
    /// Every key placed at `depth` in completed frames, first-seen order
    pub fn symbols_at_depth(&self, depth: u16) -> Vec<String> {
        let mut result: Vec<String> = Vec::new();
        for place in self.frames.iter().flat_map(|f| &f.places) {
            if place.depth != depth {
                continue;
            }
            for s in &place.symbols {
                if !result.contains(s) {
                    result.push(s.clone());
                }
            }
        }
        result
    }

    /// Every instance key of the sprite, first-seen order
    pub fn all_symbols(&self) -> Vec<String> {
        let mut result: Vec<String> = Vec::new();
        for place in self.frames.iter().flat_map(|f| &f.places) {
            for s in &place.symbols {
                if !result.contains(s) {
                    result.push(s.clone());
                }
            }
        }
        result
    }
}

/// Movie header values
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Header {
    pub frame_rate: Option<f64>,
    /// Stage rectangle in twips: left, top, right, bottom
    pub size: Option<[f64; 4]>,
}

/// A parsed movie
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    /// Shapes by object id, document order
    pub shapes: IndexMap<u16, Shape>,
    /// Sprites by object id, document order
    pub sprites: IndexMap<u16, Sprite>,
    /// Top-level placements by object id
    pub places: IndexMap<u16, Place>,
    pub header: Header,
}

impl Document {
    /// Shape referenced by a symbol or instance key (`obj12`, `-obj12-3`)
    pub fn shape(&self, key: &str) -> Option<&Shape> {
        object_id_from_key(key).and_then(|id| self.shapes.get(&id))
    }

    /// Sprite referenced by a symbol or instance key
    pub fn sprite(&self, key: &str) -> Option<&Sprite> {
        object_id_from_key(key).and_then(|id| self.sprites.get(&id))
    }
}

/// Join a key from its parts with `-`
pub fn make_key(prefix: &str, symbol: &str, suffix: &str) -> String {
    format!("{}-{}-{}", prefix, symbol, suffix)
}

/// The `obj<id>` part of an instance key, or the key itself when it has no parts
pub fn symbol_from_key(key: &str) -> &str {
    let mut parts = key.rsplitn(3, '-');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(symbol), Some(_)) => symbol,
        _ => key,
    }
}

/// Object id encoded in a symbol or instance key
pub fn object_id_from_key(key: &str) -> Option<u16> {
    symbol_from_key(key).strip_prefix("obj")?.parse().ok()
}
