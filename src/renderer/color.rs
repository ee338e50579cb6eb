//! Color transforms applied to shape fills
//!
//! Placements may carry a color transform. When a shape is drawn, the
//! transforms registered for its instance and every enclosing instance are
//! applied in turn, innermost first.

use indexmap::IndexMap;

use crate::parser::model::{ColorTransform, Rgba};
use crate::scene::{NodeId, Scene};

/// Color transforms by instance key
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColorTransforms {
    by_key: IndexMap<String, ColorTransform>,
}

impl ColorTransforms {
    /// Collect the transforms of every scene node that has one
    pub fn from_scene(scene: &Scene, key_prefix: &str) -> Self {
        let mut table = Self::default();
        for id in scene.preorder(Scene::ROOT) {
            if let Some(ctf) = scene.node(id).transform.ctf {
                table.insert(scene.key(id, key_prefix), ctf);
            }
        }
        table
    }

    pub fn insert(&mut self, key: impl Into<String>, ctf: ColorTransform) {
        self.by_key.insert(key.into(), ctf);
    }

    pub fn get(&self, key: &str) -> Option<&ColorTransform> {
        self.by_key.get(key)
    }

    /// Apply the transform registered under `key`; unknown keys leave the color unchanged
    pub fn apply(&self, key: &str, color: Rgba) -> Rgba {
        match self.by_key.get(key) {
            Some(ctf) => color.transform(ctf),
            None => color,
        }
    }

    /// Alpha-only transform of an opaque pixel, in 0..=255/256
    ///
    /// Gradients are never recolored; only this opacity is applied to them.
    pub fn alpha_opacity(&self, key: &str) -> Option<f64> {
        self.by_key.get(key).map(|ctf| {
            let alpha = 256.0 * ctf.factor[3] as f64 / 256.0 + ctf.offset[3] as f64;
            alpha.clamp(0.0, 255.0) / 256.0
        })
    }
}

/// The keys whose transforms apply to one drawn shape, innermost first
#[derive(Debug, Clone)]
pub struct ColorChain<'a> {
    table: &'a ColorTransforms,
    keys: Vec<String>,
}

impl<'a> ColorChain<'a> {
    /// A chain that changes nothing
    pub fn empty(table: &'a ColorTransforms) -> Self {
        Self {
            table,
            keys: Vec::new(),
        }
    }

    /// Chain for a scene node and its ancestors
    pub fn for_node(
        table: &'a ColorTransforms,
        scene: &Scene,
        node: NodeId,
        key_prefix: &str,
    ) -> Self {
        Self {
            table,
            keys: scene.ancestors(node).map(|id| scene.key(id, key_prefix)).collect(),
        }
    }

    pub fn apply(&self, color: Rgba) -> Rgba {
        self.keys
            .iter()
            .fold(color, |c, key| self.table.apply(key, c))
    }

    /// Opacity for gradient fills from the innermost transform, if positive
    pub fn gradient_opacity(&self) -> Option<f64> {
        self.keys
            .iter()
            .find_map(|key| self.table.alpha_opacity(key))
            .filter(|&o| o > 0.0)
    }
}
