//! swfcss - SWF movie XML to SVG shapes and CSS keyframe animations
//!
//! The input is a decompiled movie in XML form (a `<swf>` root with a
//! `Header/tags` stream). Shapes become standalone SVG documents, sprite
//! timelines become `@-webkit-keyframes` blocks, and the placement tree
//! becomes nested `div`s with one positioning rule each.
//!
//! # Example
//!
//! ```rust
//! let xml = r#"<swf><Header><tags>
//!   <DefineShape objectID="1"><bounds><Rectangle left="0" right="200" top="0" bottom="200"/></bounds></DefineShape>
//!   <PlaceObject2 objectID="1" depth="1"/>
//! </tags></Header></swf>"#;
//!
//! let conversion = swfcss::convert(xml).unwrap();
//! assert!(conversion.css().contains(".-obj1-1 {"));
//! assert!(conversion.html("movie").contains("<svg"));
//! ```

pub mod animation;
pub mod config;
pub mod css;
pub mod error;
pub mod parser;
pub mod renderer;
pub mod renumber;
pub mod scene;
pub mod xml;

use std::path::Path;

use indexmap::IndexMap;
use thiserror::Error;
use tracing::debug;

pub use config::{ConfigError, ConvertConfig};
pub use css::CssConfig;
pub use error::ParseError;
pub use parser::{parse_document, Document};
pub use renderer::SvgConfig;
pub use scene::{NodeId, Scene};

use animation::Animation;
use css::html::{animation_name_rules, page, DivBuilder};
use css::{class_rules, keyframe_blocks, stylesheet, RuleOptions};
use renderer::{render_scene, render_shape, ColorChain, ColorTransforms};
use renumber::SpriteRenumbering;
use xml::Element;

/// Errors that can occur during the conversion pipeline
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The input is not well-formed or misses required data
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// The configuration holds an unusable value
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// `root_name` matched no instance
    #[error("no instance named '{0}'")]
    UnknownRoot(String),

    /// Writing artifacts failed
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Runs the pipeline with one configuration
#[derive(Debug, Clone, Default)]
pub struct Converter {
    config: ConvertConfig,
}

impl Converter {
    pub fn new(config: ConvertConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConvertConfig {
        &self.config
    }

    /// Parse movie XML and derive every intermediate structure
    pub fn convert(&self, source: &str) -> Result<Conversion, ConvertError> {
        self.config.validate()?;
        let root = Element::parse_document(source)?;

        let (root, renumbered) = if self.config.renumber {
            let result = renumber::renumber(&root);
            (result.document, result.sprites)
        } else {
            (root, Vec::new())
        };
        debug!(sprites = renumbered.len(), "renumbering done");

        let document = parse_document(&root, &self.config.key_prefix)?;
        debug!(
            shapes = document.shapes.len(),
            sprites = document.sprites.len(),
            places = document.places.len(),
            "parsed document"
        );

        let scene = Scene::build(&document, self.config.scale_factor);
        debug!(nodes = scene.len(), "built scene");

        let subtree = match &self.config.root_name {
            Some(name) => scene
                .find_by_name(name)
                .ok_or_else(|| ConvertError::UnknownRoot(name.clone()))?,
            None => Scene::ROOT,
        };

        let animations = animation::extract(&document);
        debug!(animations = animations.len(), "extracted animations");

        let colors = ColorTransforms::from_scene(&scene, &self.config.key_prefix);

        Ok(Conversion {
            config: self.config.clone(),
            root,
            renumbered,
            document,
            scene,
            subtree,
            animations,
            colors,
        })
    }
}

/// Everything derived from one input document
#[derive(Debug, Clone)]
pub struct Conversion {
    config: ConvertConfig,
    root: Element,
    renumbered: Vec<SpriteRenumbering>,
    document: Document,
    scene: Scene,
    subtree: NodeId,
    animations: IndexMap<String, Animation>,
    colors: ColorTransforms,
}

impl Conversion {
    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn animations(&self) -> &IndexMap<String, Animation> {
        &self.animations
    }

    /// Sprites whose depths were renumbered
    pub fn renumbered_sprites(&self) -> &[SpriteRenumbering] {
        &self.renumbered
    }

    /// The input document after renumbering
    pub fn renumbered_xml(&self) -> String {
        self.root.to_xml_string(self.config.svg.pretty_print)
    }

    /// Count, then `<symbol> <name> <left> <top> <width> <height>` per shape
    pub fn shapes_table(&self) -> String {
        let mut out = format!("{}\n", self.document.shapes.len());
        for shape in self.document.shapes.values() {
            out.push_str(&format!(
                "{} {} {} {} {} {}\n",
                shape.symbol,
                shape.name,
                shape.left as i64,
                shape.top as i64,
                shape.width() as i64,
                shape.height() as i64
            ));
        }
        out
    }

    pub fn structure_xml(&self) -> String {
        self.scene.to_xml().to_xml_string(true)
    }

    pub fn animation_xml(&self) -> String {
        animation::to_xml(&self.animations).to_xml_string(true)
    }

    /// One `(file name, SVG)` pair per shape, file names `<symbol>_<name>.svg`
    pub fn shape_svgs(&self) -> Vec<(String, String)> {
        let chain = ColorChain::empty(&self.colors);
        self.document
            .shapes
            .values()
            .map(|shape| {
                (
                    format!("{}_{}.svg", shape.symbol, shape.name),
                    render_shape(shape, &chain, &self.config.svg),
                )
            })
            .collect()
    }

    /// The first frame of the whole movie as one SVG
    pub fn static_svg(&self) -> String {
        render_scene(
            &self.document,
            &self.scene,
            &self.colors,
            &self.config.key_prefix,
            &self.config.svg,
        )
    }

    /// Keyframe blocks followed by the class rules of the selected subtree
    pub fn css(&self) -> String {
        let options = RuleOptions {
            key_prefix: &self.config.key_prefix,
            frame_rate: self
                .config
                .css
                .resolve_frame_rate(self.document.header.frame_rate),
            inline_animation_name: self.config.css.inline_animation_name,
        };
        let blocks = keyframe_blocks(&self.animations, self.config.css.visibility_epsilon);
        let rules = class_rules(
            &self.document,
            &self.scene,
            self.subtree,
            &self.animations,
            options,
        );
        stylesheet(&blocks, &rules)
    }

    /// Animated keys of the selected subtree, first-seen order
    pub fn animation_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for id in self.scene.preorder(self.subtree) {
            let key = self.scene.key(id, &self.config.key_prefix);
            if self.animations.contains_key(&key) && !names.contains(&key) {
                names.push(key);
            }
        }
        names
    }

    pub fn div(&self) -> String {
        DivBuilder::new(
            &self.document,
            &self.scene,
            &self.colors,
            &self.config.key_prefix,
            &self.config.svg,
        )
        .build(self.subtree)
    }

    /// XHTML page with the div tree and inline stylesheet
    pub fn html(&self, title: &str) -> String {
        let extra = if self.config.css.inline_animation_name {
            String::new()
        } else {
            let rules = animation_name_rules(&self.animation_names());
            if rules.is_empty() {
                rules
            } else {
                format!("\n{}\n", rules)
            }
        };
        page(title, &self.div(), &self.css(), &extra)
    }

    /// Write every artifact into `dir`; CSS and HTML are named after `base`
    pub fn write_to_dir(&self, dir: &Path, base: &str) -> Result<(), ConvertError> {
        std::fs::create_dir_all(dir)?;
        std::fs::write(dir.join("shapes"), self.shapes_table())?;
        std::fs::write(dir.join("structure.xml"), self.structure_xml())?;
        std::fs::write(dir.join("animation.xml"), self.animation_xml())?;
        for (name, svg) in self.shape_svgs() {
            std::fs::write(dir.join(name), svg)?;
        }
        std::fs::write(dir.join("static.svg"), self.static_svg())?;
        std::fs::write(dir.join(format!("{}.css", base)), self.css())?;
        std::fs::write(dir.join(format!("{}.html", base)), self.html(base))?;
        debug!(dir = %dir.display(), "wrote artifacts");
        Ok(())
    }
}

/// Convert movie XML with the default configuration
pub fn convert(source: &str) -> Result<Conversion, ConvertError> {
    Converter::default().convert(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const MOVIE: &str = r#"<swf><Header framerate="24"><size><Rectangle left="0" right="4000" top="0" bottom="3000"/></size><tags>
<DefineShape objectID="15"><bounds><Rectangle left="-20" right="200" top="0" bottom="300"/></bounds></DefineShape>
<DefineSprite objectID="16" frames="2"><tags>
  <PlaceObject2 objectID="15" depth="1"/>
  <ShowFrame/>
  <PlaceObject2 depth="1"><transform><Transform transX="200" transY="0"/></transform></PlaceObject2>
  <ShowFrame/>
</tags></DefineSprite>
<PlaceObject2 objectID="16" depth="33" name="hoge"/>
</tags></Header></swf>"#;

    #[test]
    fn test_shapes_table() {
        let conversion = convert(MOVIE).unwrap();
        let table = conversion.shapes_table();
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "1");
        let name = parser::model::content_name("obj15");
        assert_eq!(lines[1], format!("obj15 {} -20 0 220 300", name));
    }

    #[test]
    fn test_shape_svg_file_names() {
        let conversion = convert(MOVIE).unwrap();
        let svgs = conversion.shape_svgs();
        assert_eq!(svgs.len(), 1);
        assert!(svgs[0].0.starts_with("obj15_"));
        assert!(svgs[0].0.ends_with(".svg"));
        assert!(svgs[0].1.contains(r#"<g id="obj15shape">"#));
    }

    #[test]
    fn test_header_frame_rate_drives_duration() {
        let css = convert(MOVIE).unwrap().css();
        assert!(css.contains("-webkit-animation-duration: 0.083333s;"));
        assert!(css.contains("@-webkit-keyframes -obj15-1 {"));
    }

    #[test]
    fn test_config_frame_rate_wins() {
        let config = ConvertConfig::new().with_css(CssConfig::default().with_frame_rate(2.0));
        let css = Converter::new(config).convert(MOVIE).unwrap().css();
        assert!(css.contains("-webkit-animation-duration: 1.000000s;"));
    }

    #[test]
    fn test_unknown_root_name() {
        let config = ConvertConfig::new().with_root_name("nobody");
        let result = Converter::new(config).convert(MOVIE);
        assert!(matches!(result, Err(ConvertError::UnknownRoot(name)) if name == "nobody"));
    }

    #[test]
    fn test_root_name_selects_subtree() {
        let config = ConvertConfig::new().with_root_name("hoge");
        let conversion = Converter::new(config).convert(MOVIE).unwrap();
        assert!(conversion.div().starts_with(r#"<div class="-obj16-33" id="hoge">"#));
        assert!(!conversion.css().contains(".-root-1 {"));
    }

    #[test]
    fn test_deferred_animation_names() {
        let config = ConvertConfig::new()
            .with_css(CssConfig::default().with_inline_animation_name(false));
        let conversion = Converter::new(config).convert(MOVIE).unwrap();
        assert_eq!(conversion.animation_names(), vec!["-obj15-1".to_string()]);
        assert!(!conversion.css().contains("-webkit-animation-name"));
        assert!(conversion
            .html("movie")
            .contains(".-obj15-1 {-webkit-animation-name: -obj15-1;}"));
    }

    #[test]
    fn test_zero_scale_factor_is_rejected() {
        let config = ConvertConfig::new().with_scale_factor(0.0);
        let result = Converter::new(config).convert(MOVIE);
        assert!(matches!(
            result,
            Err(ConvertError::Config(ConfigError::InvalidScaleFactor(_)))
        ));
    }

    #[test]
    fn test_malformed_xml_is_a_parse_error() {
        let result = convert("<swf><Header>");
        assert!(matches!(result, Err(ConvertError::Parse(ParseError::Xml { .. }))));
    }

    #[test]
    fn test_key_prefix() {
        let config = ConvertConfig::new().with_key_prefix("m");
        let css = Converter::new(config).convert(MOVIE).unwrap().css();
        assert!(css.contains(".m-obj16-33 {"));
        assert!(css.contains("@-webkit-keyframes m-obj15-1 {"));
    }
}
