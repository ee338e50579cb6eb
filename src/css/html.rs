//! Nested `div` tree and the XHTML page wrapping it

use crate::parser::model::Document;
use crate::renderer::{render_shape, ColorChain, ColorTransforms, SvgConfig};
use crate::scene::{NodeId, Scene};
use crate::xml::escape_xml;

use super::rules::shape_class;

/// Build the `div` tree of a placement subtree
///
/// One `div` per instance, classed by its key and carrying its instance name
/// as `id`. Clip layers are hidden. Shape leaves get a child `div` holding
/// the shape's inline SVG.
pub struct DivBuilder<'a> {
    doc: &'a Document,
    scene: &'a Scene,
    colors: &'a ColorTransforms,
    key_prefix: &'a str,
    svg: SvgConfig,
    lines: Vec<String>,
    indent: usize,
}

impl<'a> DivBuilder<'a> {
    pub fn new(
        doc: &'a Document,
        scene: &'a Scene,
        colors: &'a ColorTransforms,
        key_prefix: &'a str,
        svg: &SvgConfig,
    ) -> Self {
        Self {
            doc,
            scene,
            colors,
            key_prefix,
            // inline SVG never carries an XML declaration
            svg: svg.clone().with_standalone(false),
            lines: Vec::new(),
            indent: 0,
        }
    }

    fn indent_str(&self) -> String {
        if self.svg.pretty_print {
            "  ".repeat(self.indent)
        } else {
            String::new()
        }
    }

    fn push(&mut self, line: String) {
        let line = format!("{}{}", self.indent_str(), line);
        self.lines.push(line);
    }

    /// Render the subtree rooted at `from`
    pub fn build(mut self, from: NodeId) -> String {
        self.add_node(from);
        let sep = if self.svg.pretty_print { "\n" } else { "" };
        self.lines.join(sep)
    }

    fn add_node(&mut self, id: NodeId) {
        let (doc, scene, prefix) = (self.doc, self.scene, self.key_prefix);
        let node = scene.node(id);
        let t = &node.transform;

        let mut open = format!(r#"<div class="{}""#, escape_xml(&scene.key(id, prefix)));
        if let Some(name) = &t.name {
            open.push_str(&format!(r#" id="{}""#, escape_xml(name)));
        }
        if t.clip_depth.is_some() {
            open.push_str(r#" style="display:none;""#);
        }
        open.push('>');
        self.push(open);
        self.indent += 1;

        if node.children.is_empty() {
            if let Some(shape) = doc.shape(&node.symbol) {
                let class = shape_class(prefix, &node.symbol);
                self.push(format!(r#"<div class="{}">"#, escape_xml(&class)));
                self.indent += 1;

                let chain = ColorChain::for_node(self.colors, scene, id, prefix);
                let svg = render_shape(shape, &chain, &self.svg);
                for line in svg.lines() {
                    self.push(line.to_string());
                }

                self.indent -= 1;
                self.push("</div>".to_string());
            }
        } else {
            for &child in &node.children {
                self.add_node(child);
            }
        }

        self.indent -= 1;
        self.push("</div>".to_string());
    }
}

/// Rules that start deferred animations: `.<key> {-webkit-animation-name: <key>;}`
pub fn animation_name_rules<S: AsRef<str>>(keys: &[S]) -> String {
    keys.iter()
        .map(|k| {
            let k = k.as_ref();
            format!(".{} {{-webkit-animation-name: {};}}", k, k)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Wrap a `div` tree and its stylesheet in an XHTML document
pub fn page(title: &str, div: &str, css: &str, extra_css: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8" ?>
<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Transitional//EN" "http://www.w3.org/TR/xhtml1/DTD/xhtml1-transitional.dtd">
<html xmlns="http://www.w3.org/1999/xhtml">
<head>
<meta http-equiv="Content-Type" content="application/xhtml+xml; charset=utf-8"></meta>
<title>{}</title>
</head>
<body>
{}
<style type="text/css" rel="stylesheet">{}{}</style>
</body>
</html>
"#,
        escape_xml(title),
        div,
        css,
        extra_css
    )
}
