//! Tag parser: builds the shape/sprite/placement model from the tag stream

use std::collections::BTreeMap;
use std::str::FromStr;

use tracing::debug;

use super::model::{
    make_key, ColorTransform, Document, Edge, Frame, GradientStop, Header, LinearGradient,
    Matrix, Paint, PartialMatrix, Place, Rgba, Segment, Shape, Sprite, StyleChange, StyleColor,
    StyleRun,
};
use crate::error::ParseError;
use crate::xml::Element;

/// Parse a movie document rooted at `<swf>`
///
/// `key_prefix` is prepended to every instance key (`<prefix>-obj<id>-<depth>`).
pub fn parse_document(root: &Element, key_prefix: &str) -> Result<Document, ParseError> {
    TagParser::new(key_prefix).parse(root)
}

/// Parser state for one document
pub struct TagParser {
    key_prefix: String,
    doc: Document,
}

impl TagParser {
    pub fn new(key_prefix: &str) -> Self {
        Self {
            key_prefix: key_prefix.to_string(),
            doc: Document::default(),
        }
    }

    pub fn parse(mut self, root: &Element) -> Result<Document, ParseError> {
        let header = root
            .find("Header")
            .ok_or_else(|| ParseError::missing_element(root, "Header"))?;
        self.doc.header = parse_header(header)?;

        for tag in header.find_all("tags/*") {
            match tag.name.as_str() {
                name if is_define_shape(name) => self.define_shape(tag)?,
                "DefineSprite" => self.define_sprite(tag)?,
                "PlaceObject2" => self.place_object(tag)?,
                other => debug!(tag = other, "skipping tag"),
            }
        }

        debug!(
            shapes = self.doc.shapes.len(),
            sprites = self.doc.sprites.len(),
            places = self.doc.places.len(),
            "parsed document"
        );
        Ok(self.doc)
    }

    fn define_shape(&mut self, e: &Element) -> Result<(), ParseError> {
        let Some(id) = opt_attr::<u16>(e, "objectID")? else {
            debug!(tag = %e.name, "shape without objectID skipped");
            return Ok(());
        };
        let shape = ShapeBuilder::new(id).build(e)?;
        self.doc.shapes.insert(id, shape);
        Ok(())
    }

    fn place_object(&mut self, e: &Element) -> Result<(), ParseError> {
        let Some(id) = opt_attr::<u16>(e, "objectID")? else {
            debug!("top-level PlaceObject2 without objectID skipped");
            return Ok(());
        };
        let place = parse_place(e)?;
        self.doc.places.insert(id, place);
        Ok(())
    }

    fn define_sprite(&mut self, e: &Element) -> Result<(), ParseError> {
        let Some(id) = opt_attr::<u16>(e, "objectID")? else {
            debug!("sprite without objectID skipped");
            return Ok(());
        };
        let tags = timeline_tags(e);
        let activity = DepthActivity::scan(&tags)?;

        let mut sprite = Sprite {
            symbol: format!("obj{}", id),
            frames: Vec::new(),
        };
        let mut frame = Frame::default();
        let mut last_place: BTreeMap<u16, Place> = BTreeMap::new();

        for tag in tags {
            match tag.name.as_str() {
                "PlaceObject2" => {
                    let mut place = parse_place(tag)?;
                    place.symbols = match place.object_id {
                        Some(obj) => vec![make_key(
                            &self.key_prefix,
                            &format!("obj{}", obj),
                            &place.depth.to_string(),
                        )],
                        None => sprite.symbols_at_depth(place.depth),
                    };
                    if let Some(previous) = last_place.get(&place.depth) {
                        if place.matrix.is_empty() {
                            // recolor of the existing instance
                            place.matrix = previous.matrix;
                        }
                    }
                    last_place.insert(place.depth, place.clone());
                    frame.add_place(place);
                }
                "ShowFrame" => {
                    let index = sprite.frames.len();
                    for (&depth, first) in &activity.first_place {
                        if frame.has_depth(depth) {
                            continue;
                        }
                        let active = activity.is_active(index, depth);
                        let mut place = match last_place.get(&depth) {
                            Some(p) => p.clone(),
                            None if active => continue,
                            None => self.keyed(first.clone()),
                        };
                        place.name = None;
                        place.visible = active;
                        if place.symbols.is_empty() {
                            continue;
                        }
                        frame.add_place(place);
                    }
                    sprite.frames.push(std::mem::take(&mut frame));
                }
                _ => {}
            }
        }

        debug!(sprite = %sprite.symbol, frames = sprite.frames.len(), "parsed sprite");
        self.doc.sprites.insert(id, sprite);
        Ok(())
    }

    fn keyed(&self, mut place: Place) -> Place {
        if let Some(obj) = place.object_id {
            place.symbols = vec![make_key(
                &self.key_prefix,
                &format!("obj{}", obj),
                &place.depth.to_string(),
            )];
        }
        place
    }
}

fn is_define_shape(name: &str) -> bool {
    match name.strip_prefix("DefineShape") {
        Some("") => true,
        Some(n) => matches!(n, "2" | "3" | "4" | "5"),
        None => false,
    }
}

/// Tags of a sprite timeline
///
/// A sprite holding a DoAction anywhere is cut to its first frame.
fn timeline_tags(sprite: &Element) -> Vec<&Element> {
    let tags = sprite.find_all("tags/*");
    if !tags.iter().any(|t| t.name == "DoAction") {
        return tags;
    }
    debug!(
        sprite = sprite.attr("objectID").unwrap_or("?"),
        "scripted sprite kept to its first frame"
    );
    let mut result = Vec::new();
    for tag in tags {
        if tag.name == "DoAction" {
            continue;
        }
        result.push(tag);
        if tag.name == "ShowFrame" {
            break;
        }
    }
    result
}

/// Per-frame activity of every depth used by a sprite
struct DepthActivity {
    /// First placement seen at each depth
    first_place: BTreeMap<u16, Place>,
    /// Depths active at the end of each frame
    frames: Vec<BTreeMap<u16, bool>>,
}

impl DepthActivity {
    fn scan(tags: &[&Element]) -> Result<Self, ParseError> {
        let mut first_place = BTreeMap::new();
        let mut frames: Vec<BTreeMap<u16, bool>> = Vec::new();
        let mut current: BTreeMap<u16, bool> = BTreeMap::new();

        for tag in tags {
            match tag.name.as_str() {
                "PlaceObject2" => {
                    let depth = req_attr::<u16>(tag, "depth")?;
                    if !first_place.contains_key(&depth) {
                        first_place.insert(depth, parse_place(tag)?);
                    }
                    current.insert(depth, true);
                }
                "RemoveObject2" => {
                    let depth = req_attr::<u16>(tag, "depth")?;
                    current.insert(depth, false);
                }
                "ShowFrame" => {
                    for &depth in first_place.keys() {
                        if !current.contains_key(&depth) {
                            let carried = frames
                                .last()
                                .and_then(|f| f.get(&depth).copied())
                                .unwrap_or(false);
                            current.insert(depth, carried);
                        }
                    }
                    frames.push(std::mem::take(&mut current));
                }
                _ => {}
            }
        }

        Ok(Self {
            first_place,
            frames,
        })
    }

    fn is_active(&self, frame: usize, depth: u16) -> bool {
        self.frames
            .get(frame)
            .and_then(|f| f.get(&depth).copied())
            .unwrap_or(false)
    }
}

/// Parse a PlaceObject2 element without resolving its symbol keys
pub(crate) fn parse_place(e: &Element) -> Result<Place, ParseError> {
    let mut place = Place::new(req_attr(e, "depth")?);
    place.object_id = opt_attr(e, "objectID")?;
    place.clip_depth = opt_attr(e, "clipDepth")?;
    place.name = e.attr("name").map(str::to_string);

    if let Some(t) = e.find("transform/Transform") {
        place.matrix = PartialMatrix {
            sx: opt_attr(t, "scaleX")?,
            sy: opt_attr(t, "scaleY")?,
            wx: opt_attr(t, "skewX")?,
            wy: opt_attr(t, "skewY")?,
            tx: opt_attr(t, "transX")?,
            ty: opt_attr(t, "transY")?,
        };
    }
    if let Some(ct) = e.find("colorTransform/ColorTransform2") {
        place.ctf = Some(parse_color_transform(ct)?);
    }
    Ok(place)
}

fn parse_color_transform(e: &Element) -> Result<ColorTransform, ParseError> {
    let mut ctf = ColorTransform::default();
    for (i, channel) in ["Red", "Green", "Blue", "Alpha"].iter().enumerate() {
        if let Some(f) = opt_attr(e, &format!("factor{}", channel))? {
            ctf.factor[i] = f;
        }
        if let Some(o) = opt_attr(e, &format!("offset{}", channel))? {
            ctf.offset[i] = o;
        }
    }
    Ok(ctf)
}

fn parse_header(e: &Element) -> Result<Header, ParseError> {
    let size = match e.find("size/Rectangle") {
        Some(r) => Some([
            opt_attr(r, "left")?.unwrap_or(0.0),
            opt_attr(r, "top")?.unwrap_or(0.0),
            opt_attr(r, "right")?.unwrap_or(0.0),
            opt_attr(r, "bottom")?.unwrap_or(0.0),
        ]),
        None => None,
    };
    Ok(Header {
        frame_rate: opt_attr(e, "framerate")?,
        size,
    })
}

fn parse_color(e: &Element, default_alpha: i32) -> Result<Rgba, ParseError> {
    Ok(Rgba::new(
        opt_attr(e, "red")?.unwrap_or(0),
        opt_attr(e, "green")?.unwrap_or(0),
        opt_attr(e, "blue")?.unwrap_or(0),
        opt_attr(e, "alpha")?.unwrap_or(default_alpha),
    ))
}

/// Builds one shape: styles, gradients and edges
struct ShapeBuilder {
    shape: Shape,
    edge: Edge,
    cursor: (f64, f64),
}

impl ShapeBuilder {
    fn new(id: u16) -> Self {
        Self {
            shape: Shape::new(format!("obj{}", id)),
            edge: Edge::default(),
            cursor: (0.0, 0.0),
        }
    }

    fn build(mut self, e: &Element) -> Result<Shape, ParseError> {
        let rect = e
            .find("bounds/Rectangle")
            .ok_or_else(|| ParseError::missing_element(e, "bounds/Rectangle"))?;
        self.shape.left = opt_attr(rect, "left")?.unwrap_or(0.0);
        self.shape.right = opt_attr(rect, "right")?.unwrap_or(0.0);
        self.shape.top = opt_attr(rect, "top")?.unwrap_or(0.0);
        self.shape.bottom = opt_attr(rect, "bottom")?.unwrap_or(0.0);

        self.add_styles(e)?;

        for record in e.find_all("shapes/Shape/edges/*") {
            match record.name.as_str() {
                "ShapeSetup" => self.shape_setup(record)?,
                "LineTo" => {
                    let (Some(dx), Some(dy)) = (opt_attr(record, "x")?, opt_attr(record, "y")?)
                    else {
                        continue;
                    };
                    self.ensure_move();
                    self.cursor.0 += dx;
                    self.cursor.1 += dy;
                    self.edge.segments.push(Segment::Line { dx, dy });
                }
                "CurveTo" => {
                    let (Some(dx1), Some(dy1), Some(dx2), Some(dy2)) = (
                        opt_attr(record, "x1")?,
                        opt_attr(record, "y1")?,
                        opt_attr(record, "x2")?,
                        opt_attr(record, "y2")?,
                    ) else {
                        continue;
                    };
                    self.ensure_move();
                    self.cursor.0 += dx1 + dx2;
                    self.cursor.1 += dy1 + dy2;
                    self.edge
                        .segments
                        .push(Segment::Curve { dx1, dy1, dx2, dy2 });
                }
                _ => {}
            }
        }

        self.flush_edge();
        Ok(self.shape)
    }

    /// Register the fill and line styles under `owner/styles/StyleList`
    ///
    /// Returns whether any style list was present.
    fn add_styles(&mut self, owner: &Element) -> Result<bool, ParseError> {
        let fills = owner.find_all("styles/StyleList/fillStyles");
        let lines = owner.find_all("styles/StyleList/lineStyles/LineStyle");

        for style in fills.iter().flat_map(|f| f.children.iter()) {
            if let Some(color) = style.find("color/Color") {
                let rgba = parse_color(color, 256)?;
                self.edge.colors.push(StyleColor::Solid(Paint::Rgba(rgba)));
            } else if !style.children.is_empty() {
                let id = format!("{}_{}", self.shape.symbol, self.shape.defs.len());
                let gradient = parse_gradient(style, &id)?;
                self.shape.defs.push(gradient);
                self.edge.colors.push(StyleColor::Solid(Paint::Gradient(id)));
            }
        }

        for style in &lines {
            if let Some(color) = style.find("color/Color") {
                let rgba = parse_color(color, 256)?;
                self.edge.colors.push(StyleColor::Line(Paint::Rgba(rgba)));
                self.edge
                    .line_widths
                    .push(opt_attr(style, "width")?.unwrap_or(0.0));
            }
        }

        Ok(!fills.is_empty() || !lines.is_empty())
    }

    fn shape_setup(&mut self, e: &Element) -> Result<(), ParseError> {
        if e.find("styles/StyleList").is_some() {
            self.flush_edge();
            self.add_styles(e)?;
        }

        let x: Option<f64> = opt_attr(e, "x")?;
        let y: Option<f64> = opt_attr(e, "y")?;
        self.cursor = (x.unwrap_or(self.cursor.0), y.unwrap_or(self.cursor.1));

        let styles = StyleRun {
            fill_left: StyleChange::from_one_based(opt_attr(e, "fillStyle0")?),
            fill_right: StyleChange::from_one_based(opt_attr(e, "fillStyle1")?),
            line: StyleChange::from_one_based(opt_attr(e, "lineStyle")?),
        };
        self.edge.segments.push(Segment::Move {
            x: self.cursor.0,
            y: self.cursor.1,
            styles,
        });
        Ok(())
    }

    fn ensure_move(&mut self) {
        if !self.edge.segments.first().is_some_and(Segment::is_move) {
            self.edge.segments.insert(
                0,
                Segment::Move {
                    x: self.cursor.0,
                    y: self.cursor.1,
                    styles: StyleRun::default(),
                },
            );
        }
    }

    fn flush_edge(&mut self) {
        let edge = std::mem::take(&mut self.edge);
        if !edge.colors.is_empty() {
            self.shape.edges.push(edge);
        }
    }
}

fn parse_gradient(style: &Element, id: &str) -> Result<LinearGradient, ParseError> {
    let mut matrix = Matrix::IDENTITY;
    if let Some(t) = style.find("matrix/Transform") {
        matrix = PartialMatrix {
            sx: opt_attr(t, "scaleX")?,
            sy: opt_attr(t, "scaleY")?,
            wx: opt_attr(t, "skewX")?,
            wy: opt_attr(t, "skewY")?,
            tx: opt_attr(t, "transX")?,
            ty: opt_attr(t, "transY")?,
        }
        .resolve();
    }

    let mut stops = Vec::new();
    for item in style.find_all("gradientColors/*") {
        let color = match item.find("color/Color") {
            Some(c) => parse_color(c, 255)?,
            None => continue,
        };
        stops.push(GradientStop {
            color,
            position: opt_attr(item, "position")?.unwrap_or(0.0),
        });
    }

    Ok(LinearGradient {
        id: id.to_string(),
        matrix,
        stops,
    })
}

pub(crate) fn opt_attr<T: FromStr>(e: &Element, name: &str) -> Result<Option<T>, ParseError> {
    match e.attr(name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ParseError::invalid_attribute(e, name, value)),
    }
}

pub(crate) fn req_attr<T: FromStr>(e: &Element, name: &str) -> Result<T, ParseError> {
    opt_attr(e, name)?.ok_or_else(|| ParseError::missing_attribute(e, name))
}
