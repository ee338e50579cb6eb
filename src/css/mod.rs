//! CSS keyframe animation output
//!
//! Timelines become `@-webkit-keyframes` blocks, the placement tree becomes
//! one positioning rule per instance, and [`html`] nests the instances as
//! `div`s around inline shape SVG.

pub mod config;
pub mod format;
pub mod html;
pub mod keyframes;
pub mod rules;

use indexmap::IndexMap;

use crate::animation::Animation;

pub use config::CssConfig;
pub use keyframes::{synthesize, FormattedKeyframes, Keyframe, Keyframes};
pub use rules::{class_rules, CssRule, RuleOptions};

/// One `@-webkit-keyframes` block per animation, in timeline order
pub fn keyframe_blocks(animations: &IndexMap<String, Animation>, eps: f64) -> Vec<String> {
    animations
        .values()
        .map(|animation| synthesize(animation, eps).block(&animation.key))
        .collect()
}

/// The complete stylesheet: SVG display rule, keyframe blocks, class rules
pub fn stylesheet(blocks: &[String], rules: &IndexMap<String, CssRule>) -> String {
    let mut sections = Vec::new();
    if !blocks.is_empty() {
        sections.push(blocks.join("\n\n"));
    }
    if !rules.is_empty() {
        sections.push(
            rules
                .values()
                .map(CssRule::to_css)
                .collect::<Vec<_>>()
                .join("\n\n"),
        );
    }
    format!("svg {{ display:block; }}\n{}", sections.join("\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stylesheet_layout() {
        let mut rules = IndexMap::new();
        let mut a = CssRule::new(".a");
        a.push("position", "absolute");
        rules.insert("a".to_string(), a);
        let mut b = CssRule::new(".b");
        b.push("left", "0px");
        rules.insert("b".to_string(), b);

        let css = stylesheet(&["@-webkit-keyframes a {\n}".to_string()], &rules);
        assert_eq!(
            css,
            "svg { display:block; }\n@-webkit-keyframes a {\n}\n\n.a {\nposition: absolute;\n}\n\n\n.b {\nleft: 0px;\n}\n"
        );
    }

    #[test]
    fn test_empty_stylesheet() {
        assert_eq!(stylesheet(&[], &IndexMap::new()), "svg { display:block; }\n");
    }
}
