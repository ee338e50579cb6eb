//! Class rules for the placement tree

use indexmap::IndexMap;

use crate::animation::Animation;
use crate::parser::model::{make_key, Document, Matrix};
use crate::scene::{NodeId, Scene};

use super::format::{matrix, pixels};

/// One CSS rule: a selector and its declarations in order
#[derive(Debug, Clone, PartialEq)]
pub struct CssRule {
    pub selector: String,
    pub declarations: Vec<(String, String)>,
}

impl CssRule {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            declarations: Vec::new(),
        }
    }

    pub fn push(&mut self, property: &str, value: impl Into<String>) {
        self.declarations.push((property.to_string(), value.into()));
    }

    pub fn get(&self, property: &str) -> Option<&str> {
        self.declarations
            .iter()
            .find(|(p, _)| p == property)
            .map(|(_, v)| v.as_str())
    }

    /// `<selector> {` then one declaration per line, then `}` and a newline
    pub fn to_css(&self) -> String {
        let body: Vec<String> = self
            .declarations
            .iter()
            .map(|(p, v)| format!("{}: {};", p, v))
            .collect();
        format!("{} {{\n{}\n}}\n", self.selector, body.join("\n"))
    }
}

/// Settings shared by every rule of one stylesheet
#[derive(Debug, Clone, Copy)]
pub struct RuleOptions<'a> {
    pub key_prefix: &'a str,
    pub frame_rate: f64,
    pub inline_animation_name: bool,
}

/// Selector of the container that holds a shape's inline SVG
pub fn shape_class(key_prefix: &str, symbol: &str) -> String {
    make_key(key_prefix, symbol, "shape")
}

/// Rules for the subtree at `from`, keyed by class name in first-seen order
///
/// Every node gets a positioning rule. Animated nodes also get animation
/// timing, and shape leaves get a rule for their SVG container.
pub fn class_rules(
    doc: &Document,
    scene: &Scene,
    from: NodeId,
    animations: &IndexMap<String, Animation>,
    options: RuleOptions,
) -> IndexMap<String, CssRule> {
    let mut rules = IndexMap::new();

    for id in scene.preorder(from) {
        let node = scene.node(id);
        let key = scene.key(id, options.key_prefix);

        let mut rule = CssRule::new(format!(".{}", key));
        rule.push("position", "absolute");
        rule.push("-webkit-transform", matrix(&node.transform.matrix));
        rule.push("-webkit-transform-origin", "0.0px 0.0px");

        if let Some(animation) = animations.get(&key) {
            if options.inline_animation_name {
                rule.push("-webkit-animation-name", key.as_str());
            }
            let duration = animation.frames.len() as f64 / options.frame_rate;
            rule.push("-webkit-animation-duration", format!("{:.6}s", duration));
            rule.push("-webkit-animation-timing-function", "linear");
            rule.push("-webkit-animation-iteration-count", "infinite");
        }
        rules.insert(key, rule);

        if node.children.is_empty() {
            if let Some(shape) = doc.shape(&node.symbol) {
                let class = shape_class(options.key_prefix, &node.symbol);
                let mut rule = CssRule::new(format!(".{}", class));
                rule.push("position", "absolute");
                rule.push("-webkit-transform", matrix(&Matrix::IDENTITY));
                rule.push("left", pixels(shape.left));
                rule.push("top", pixels(shape.top));
                rule.push("width", pixels(shape.width()));
                rule.push("height", pixels(shape.height()));
                rules.insert(class, rule);
            }
        }
    }
    rules
}
