//! SVG generation for shapes and the static scene

use crate::parser::model::{px, Document, Edge, LinearGradient, Matrix, Paint, Shape, Side};
use crate::scene::{NodeId, Scene};
use crate::xml::escape_xml;

use super::color::{ColorChain, ColorTransforms};
use super::path::{merged_path_data, reverse};
use super::SvgConfig;

/// Build SVG elements incrementally
pub struct SvgBuilder {
    config: SvgConfig,
    defs: Vec<String>,
    elements: Vec<String>,
    indent: usize,
}

impl SvgBuilder {
    /// Create a new SVG builder
    pub fn new(config: SvgConfig) -> Self {
        Self {
            config,
            defs: vec![],
            elements: vec![],
            indent: 1,
        }
    }

    fn pad(&self, level: usize) -> String {
        if self.config.pretty_print {
            "  ".repeat(level)
        } else {
            String::new()
        }
    }

    fn indent_str(&self) -> String {
        self.pad(self.indent)
    }

    fn newline(&self) -> &str {
        if self.config.pretty_print {
            "\n"
        } else {
            ""
        }
    }

    /// Add a linear gradient definition
    pub fn add_gradient(&mut self, gradient: &LinearGradient) {
        self.defs.push(format!(
            r#"{}<linearGradient id="{}" gradientUnits="userSpaceOnUse" x1="-819" x2="819" gradientTransform="{}">"#,
            self.pad(2),
            escape_xml(&gradient.id),
            svg_matrix(&gradient.matrix)
        ));
        for stop in &gradient.stops {
            let opacity = (stop.color.alpha as f64 / 255.0).min(1.0);
            self.defs.push(format!(
                r#"{}<stop stop-color="{}" stop-opacity="{:?}" offset="{:?}"/>"#,
                self.pad(3),
                stop.color.to_hex(),
                opacity,
                stop.position / 255.0
            ));
        }
        self.defs
            .push(format!("{}</linearGradient>", self.pad(2)));
    }

    /// Add a path element; empty path data emits nothing
    pub fn add_path(&mut self, attributes: &str, d: &str) {
        if d.is_empty() {
            return;
        }
        self.elements.push(format!(
            r#"{}<path {} d="{}"/>"#,
            self.indent_str(),
            attributes,
            d.trim_end()
        ));
    }

    /// Open a group element with an id and extra attributes
    pub fn start_group(&mut self, id: &str, attributes: &str) {
        let extra = if attributes.is_empty() {
            String::new()
        } else {
            format!(" {}", attributes)
        };
        self.elements.push(format!(
            r#"{}<g id="{}"{}>"#,
            self.indent_str(),
            escape_xml(id),
            extra
        ));
        self.indent += 1;
    }

    /// Close a group element
    pub fn end_group(&mut self) {
        self.indent = self.indent.saturating_sub(1);
        self.elements.push(format!("{}</g>", self.indent_str()));
    }

    /// Add the `<symbol>shape` group of one shape
    ///
    /// Stroke paths come first, then one fill path per solid color of every
    /// edge. Fill colors go through `chain`; gradients only take its opacity.
    pub fn add_shape(&mut self, shape: &Shape, chain: &ColorChain) {
        self.start_group(&format!("{}shape", shape.symbol), "");
        for edge in &shape.edges {
            self.add_strokes(edge);
            self.add_fills(edge, chain);
        }
        self.end_group();
    }

    fn add_strokes(&mut self, edge: &Edge) {
        let precision = self.config.path_precision;
        for (i, paint) in edge.line_colors().into_iter().enumerate() {
            let path = reverse(&edge.path(i, Side::Line));
            let width = edge.line_widths.get(i).copied().unwrap_or_default();
            let attributes = format!(
                r#"fill="none" stroke="{}" stroke-width="{:?}""#,
                paint.svg_value(),
                px(width)
            );
            self.add_path(&attributes, &merged_path_data(&path, precision));
        }
    }

    fn add_fills(&mut self, edge: &Edge, chain: &ColorChain) {
        let precision = self.config.path_precision;
        for (i, paint) in edge.solid_colors().into_iter().enumerate() {
            let mut path = edge.path(i, Side::Left);
            path.extend(reverse(&edge.path(i, Side::Right)));

            let mut attributes = String::from(r#"fill-rule="evenodd" clip-rule="evenodd""#);
            match paint {
                Paint::Rgba(color) => {
                    let color = chain.apply(*color);
                    attributes.push_str(&format!(r#" fill="{}""#, color.to_hex()));
                    if color.alpha > 0 && color.alpha < 256 {
                        attributes.push_str(&format!(
                            r#" fill-opacity="{:?}""#,
                            color.alpha as f64 / 256.0
                        ));
                    }
                }
                Paint::Gradient(_) => {
                    attributes.push_str(&format!(r#" fill="{}""#, paint.svg_value()));
                    if let Some(opacity) = chain.gradient_opacity() {
                        attributes.push_str(&format!(r#" fill-opacity="{:?}""#, opacity));
                    }
                }
            }
            self.add_path(&attributes, &merged_path_data(&path, precision));
        }
    }

    /// Build the final SVG string around a preformatted viewBox
    pub fn build(self, viewbox: &str) -> String {
        let nl = self.newline();

        let mut svg = String::new();

        if self.config.standalone {
            svg.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
            svg.push_str(nl);
        }

        svg.push_str(&format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" version="1.1" viewBox="{}">"#,
            viewbox
        ));
        svg.push_str(nl);

        if !self.defs.is_empty() {
            svg.push_str(&self.pad(1));
            svg.push_str("<defs>");
            svg.push_str(nl);
            for def in &self.defs {
                svg.push_str(def);
                svg.push_str(nl);
            }
            svg.push_str(&self.pad(1));
            svg.push_str("</defs>");
            svg.push_str(nl);
        }

        for elem in &self.elements {
            svg.push_str(elem);
            svg.push_str(nl);
        }

        svg.push_str("</svg>");

        svg
    }
}

/// `matrix(a b c d e f)` with two decimals for the linear terms and four for
/// the translation in pixels
pub fn svg_matrix(m: &Matrix) -> String {
    let [a, b, c, d, e, f] = m.css_terms();
    format!(
        "matrix({:.2} {:.2} {:.2} {:.2} {:.4} {:.4})",
        a, b, c, d, e, f
    )
}

/// Render one shape as a standalone SVG document
pub fn render_shape(shape: &Shape, chain: &ColorChain, config: &SvgConfig) -> String {
    let mut builder = SvgBuilder::new(config.clone());
    for gradient in &shape.defs {
        builder.add_gradient(gradient);
    }
    builder.add_shape(shape, chain);

    let viewbox = format!(
        "{:.6} {:.6} {:.6} {:.6}",
        px(shape.left),
        px(shape.top),
        px(shape.width()),
        px(shape.height())
    );
    builder.build(&viewbox)
}

/// Render the first frame of the whole movie as nested groups
///
/// Clip layers and hidden instances are emitted with `display:none`.
pub fn render_scene(
    doc: &Document,
    scene: &Scene,
    colors: &ColorTransforms,
    key_prefix: &str,
    config: &SvgConfig,
) -> String {
    let mut builder = SvgBuilder::new(config.clone());
    for gradient in doc.shapes.values().flat_map(|s| &s.defs) {
        builder.add_gradient(gradient);
    }
    render_node(doc, scene, colors, key_prefix, Scene::ROOT, &mut builder);

    let [left, top, width, height] = scene_bounds(doc, scene);
    let viewbox = format!(
        "{:.4} {:.4} {:.4} {:.4}",
        px(left),
        px(top),
        px(width),
        px(height)
    );
    builder.build(&viewbox)
}

fn render_node(
    doc: &Document,
    scene: &Scene,
    colors: &ColorTransforms,
    key_prefix: &str,
    id: NodeId,
    builder: &mut SvgBuilder,
) {
    let node = scene.node(id);
    let t = &node.transform;
    let attributes = if t.clip_depth.is_some() || !t.visible {
        r#"style="display:none""#.to_string()
    } else {
        format!(r#"transform="{}""#, svg_matrix(&t.matrix))
    };
    builder.start_group(&scene.key(id, key_prefix), &attributes);

    if node.children.is_empty() {
        if let Some(shape) = doc.shape(&node.symbol) {
            let chain = ColorChain::for_node(colors, scene, id, key_prefix);
            builder.add_shape(shape, &chain);
        }
    } else {
        for &child in &node.children {
            render_node(doc, scene, colors, key_prefix, child, builder);
        }
    }

    builder.end_group();
}

/// Stage rectangle `[left, top, width, height]` in twips
///
/// Taken from the header when present, else the union of every placed
/// shape's bounds offset by the translations of its non-root ancestors.
pub fn scene_bounds(doc: &Document, scene: &Scene) -> [f64; 4] {
    if let Some([left, top, right, bottom]) = doc.header.size {
        return [left, top, right - left, bottom - top];
    }

    let mut bounds: Option<[f64; 4]> = None;
    for id in scene.preorder(Scene::ROOT) {
        let node = scene.node(id);
        if !node.children.is_empty() {
            continue;
        }
        let Some(shape) = doc.shape(&node.symbol) else {
            continue;
        };
        let (dx, dy) = scene
            .ancestors(id)
            .filter(|&a| a != Scene::ROOT)
            .map(|a| scene.node(a).transform.matrix)
            .fold((0.0, 0.0), |(x, y), m| (x + m.tx, y + m.ty));

        let rect = [
            shape.left + dx,
            shape.top + dy,
            shape.right + dx,
            shape.bottom + dy,
        ];
        bounds = Some(match bounds {
            None => rect,
            Some(b) => [
                b[0].min(rect[0]),
                b[1].min(rect[1]),
                b[2].max(rect[2]),
                b[3].max(rect[3]),
            ],
        });
    }

    match bounds {
        Some([left, top, right, bottom]) => [left, top, right - left, bottom - top],
        None => [0.0; 4],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_document;
    use crate::xml::Element;
    use pretty_assertions::assert_eq;

    const SQUARE: &str = r#"
<DefineShape objectID="1">
  <bounds><Rectangle left="0" right="4800" top="0" bottom="4800"/></bounds>
  <styles><StyleList>
    <fillStyles><Solid><color><Color red="255" green="0" blue="0"/></color></Solid></fillStyles>
    <lineStyles><LineStyle width="40"><color><Color red="0" green="0" blue="255"/></color></LineStyle></lineStyles>
  </StyleList></styles>
  <shapes><Shape><edges>
    <ShapeSetup x="4800" y="0" fillStyle1="1" lineStyle="1"/>
    <LineTo x="-4800" y="0"/>
    <LineTo x="0" y="4800"/>
    <LineTo x="4800" y="0"/>
    <LineTo x="0" y="-4800"/>
  </edges></Shape></shapes>
</DefineShape>"#;

    fn document(tags: &str) -> Document {
        let xml = format!("<swf><Header><tags>{}</tags></Header></swf>", tags);
        let root = Element::parse_document(&xml).unwrap();
        parse_document(&root, "").unwrap()
    }

    #[test]
    fn test_svg_matrix() {
        let m = Matrix {
            sx: 1.5,
            sy: 2.0,
            wx: 0.25,
            wy: 0.0,
            tx: 101.0,
            ty: -20.0,
        };
        assert_eq!(svg_matrix(&m), "matrix(1.50 0.25 0.00 2.00 5.0500 -1.0000)");
    }

    #[test]
    fn test_render_square_shape() {
        let doc = document(SQUARE);
        let shape = &doc.shapes[&1];
        let colors = ColorTransforms::default();
        let svg = render_shape(shape, &ColorChain::empty(&colors), &SvgConfig::default());

        let expected = r##"<svg xmlns="http://www.w3.org/2000/svg" version="1.1" viewBox="0.000000 0.000000 240.000000 240.000000">
  <g id="obj1shape">
    <path fill="none" stroke="#0000ff" stroke-width="2.0" d="M240.0000 0.0000 l0.0000 240.0000 l-240.0000 0.0000 l0.0000 -240.0000 l240.0000 0.0000"/>
    <path fill-rule="evenodd" clip-rule="evenodd" fill="#ff0000" d="M240.0000 0.0000 l0.0000 240.0000 l-240.0000 0.0000 l0.0000 -240.0000 l240.0000 0.0000"/>
  </g>
</svg>"##;
        assert_eq!(svg, expected);
    }

    #[test]
    fn test_solid_fill_applies_chain_and_opacity() {
        let doc = document(&format!(
            r#"{}
<PlaceObject2 objectID="1" depth="1">
  <colorTransform><ColorTransform2 factorRed="0" offsetGreen="255" factorAlpha="128"/></colorTransform>
</PlaceObject2>"#,
            SQUARE
        ));
        let scene = Scene::build(&doc, 1.0);
        let colors = ColorTransforms::from_scene(&scene, "");
        let leaf = scene.node(Scene::ROOT).children[0];
        let chain = ColorChain::for_node(&colors, &scene, leaf, "");
        let svg = render_shape(&doc.shapes[&1], &chain, &SvgConfig::default());

        assert!(svg.contains(r##"fill="#00ff00" fill-opacity="0.5""##));
        // strokes keep their color
        assert!(svg.contains(r##"stroke="#0000ff""##));
    }

    #[test]
    fn test_gradient_defs() {
        let doc = document(
            r#"
<DefineShape2 objectID="3">
  <bounds><Rectangle left="0" right="20" top="0" bottom="20"/></bounds>
  <styles><StyleList><fillStyles>
    <LinearGradient>
      <matrix><Transform scaleX="0.5" scaleY="0.5" transX="200" transY="100"/></matrix>
      <gradientColors>
        <GradientItem position="0"><color><Color red="255" green="255" blue="255"/></color></GradientItem>
        <GradientItem position="255"><color><Color red="0" green="0" blue="0" alpha="51"/></color></GradientItem>
      </gradientColors>
    </LinearGradient>
  </fillStyles></StyleList></styles>
  <shapes><Shape><edges>
    <ShapeSetup x="0" y="0" fillStyle0="1"/>
    <LineTo x="20" y="0"/>
    <LineTo x="0" y="20"/>
    <LineTo x="-20" y="-20"/>
  </edges></Shape></shapes>
</DefineShape2>"#,
        );
        let colors = ColorTransforms::default();
        let config = SvgConfig::default().with_pretty_print(false);
        let svg = render_shape(&doc.shapes[&3], &ColorChain::empty(&colors), &config);

        assert!(svg.starts_with(r#"<svg xmlns="http://www.w3.org/2000/svg" version="1.1" viewBox="0.000000 0.000000 1.000000 1.000000"><defs><linearGradient id="obj3_0" gradientUnits="userSpaceOnUse" x1="-819" x2="819" gradientTransform="matrix(0.50 0.00 0.00 0.50 10.0000 5.0000)">"#));
        assert!(svg.contains(r##"<stop stop-color="#ffffff" stop-opacity="1.0" offset="0.0"/>"##));
        assert!(svg.contains(r##"<stop stop-color="#000000" stop-opacity="0.2" offset="1.0"/>"##));
        assert!(svg.contains(r##"fill="url(#obj3_0)" d="M0.0000 0.0000 l1.0000 0.0000"##));
    }

    #[test]
    fn test_standalone_declaration() {
        let doc = document(SQUARE);
        let colors = ColorTransforms::default();
        let config = SvgConfig::default().with_standalone(true);
        let svg = render_shape(&doc.shapes[&1], &ColorChain::empty(&colors), &config);
        assert!(svg.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<svg "));
    }

    #[test]
    fn test_empty_shape_has_empty_group() {
        let doc = document(
            r#"<DefineShape objectID="2"><bounds><Rectangle left="0" right="20" top="0" bottom="20"/></bounds></DefineShape>"#,
        );
        let colors = ColorTransforms::default();
        let config = SvgConfig::default().with_pretty_print(false);
        let svg = render_shape(&doc.shapes[&2], &ColorChain::empty(&colors), &config);
        assert!(!svg.contains("<path"));
        assert!(svg.contains(r#"<g id="obj2shape"></g>"#));
    }

    #[test]
    fn test_render_scene() {
        let doc = document(&format!(
            r#"{}
<DefineSprite objectID="2" frames="1"><tags>
  <PlaceObject2 objectID="1" depth="1"><transform><Transform transX="200" transY="400"/></transform></PlaceObject2>
  <PlaceObject2 objectID="1" depth="2" clipDepth="3"/>
  <ShowFrame/>
</tags></DefineSprite>
<PlaceObject2 objectID="2" depth="1"><transform><Transform transX="20" transY="0"/></transform></PlaceObject2>"#,
            SQUARE
        ));
        let scene = Scene::build(&doc, 1.0);
        let colors = ColorTransforms::from_scene(&scene, "");
        let svg = render_scene(&doc, &scene, &colors, "", &SvgConfig::default());

        assert!(svg.contains(r#"viewBox="1.0000 0.0000 250.0000 260.0000""#));
        assert!(svg.contains(r#"<g id="-root-1" transform="matrix(1.00 0.00 0.00 1.00 0.0000 0.0000)">"#));
        assert!(svg.contains(r#"<g id="-obj2-1" transform="matrix(1.00 0.00 0.00 1.00 1.0000 0.0000)">"#));
        assert!(svg.contains(r#"<g id="-obj1-2" style="display:none">"#));
        assert_eq!(svg.matches(r#"<g id="obj1shape">"#).count(), 2);
    }

    #[test]
    fn test_scene_bounds_prefers_header() {
        let xml = r#"<swf><Header framerate="24"><size><Rectangle left="0" right="9600" top="0" bottom="4800"/></size><tags/></Header></swf>"#;
        let root = Element::parse_document(xml).unwrap();
        let doc = parse_document(&root, "").unwrap();
        let scene = Scene::build(&doc, 1.0);
        assert_eq!(scene_bounds(&doc, &scene), [0.0, 0.0, 9600.0, 4800.0]);
    }

    #[test]
    fn test_scene_bounds_of_empty_scene() {
        let doc = document("");
        let scene = Scene::build(&doc, 1.0);
        assert_eq!(scene_bounds(&doc, &scene), [0.0; 4]);
    }
}
