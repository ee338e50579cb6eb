//! Per-instance animation timelines
//!
//! Every sprite with more than one frame contributes one [`Animation`] per
//! instance key it ever places. Frames that do not restate an instance reuse
//! its previous matrix and color transform.

use indexmap::IndexMap;

use crate::parser::model::{ctf_list_string, ColorTransform, Document, Matrix, PartialMatrix, Sprite};
use crate::xml::Element;

/// One resolved frame of an instance timeline
#[derive(Debug, Clone, PartialEq)]
pub struct AnimFrame {
    pub index: usize,
    pub matrix: Matrix,
    pub ctf: Option<ColorTransform>,
    pub visible: bool,
}

impl AnimFrame {
    /// Opacity shown for this frame: 0 when hidden, else the transformed alpha
    pub fn opacity(&self) -> f64 {
        if !self.visible {
            return 0.0;
        }
        self.ctf.as_ref().map_or(1.0, ColorTransform::opacity)
    }
}

/// Timeline of one instance key
#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    pub key: String,
    pub frames: Vec<AnimFrame>,
}

/// Animations of every multi-frame sprite, keyed by instance key
pub fn extract(doc: &Document) -> IndexMap<String, Animation> {
    let mut result = IndexMap::new();
    for sprite in doc.sprites.values().filter(|s| s.frames.len() > 1) {
        for key in sprite.all_symbols() {
            let animation = timeline(sprite, &key);
            result.insert(key, animation);
        }
    }
    result
}

fn timeline(sprite: &Sprite, key: &str) -> Animation {
    let mut frames: Vec<AnimFrame> = Vec::with_capacity(sprite.frames.len());
    let mut previous = (Matrix::IDENTITY, None);

    for (index, frame) in sprite.frames.iter().enumerate() {
        let place = frame.place_for_key(key);
        let visible = place.map_or(true, |p| p.visible);
        let partial = place.map(|p| p.matrix).unwrap_or_default();

        let (matrix, ctf) = if partial.is_empty() {
            previous
        } else {
            (resolve(partial, &frames), place.and_then(|p| p.ctf))
        };
        previous = (matrix, ctf);

        frames.push(AnimFrame {
            index,
            matrix,
            ctf,
            visible,
        });
    }

    Animation {
        key: key.to_string(),
        frames,
    }
}

/// Resolve a placement matrix against the timeline built so far
///
/// A translate-only record takes scale and skew from the earliest frame with
/// the same translation.
fn resolve(mut partial: PartialMatrix, built: &[AnimFrame]) -> Matrix {
    if let (true, Some(tx), Some(ty)) = (partial.is_translate_only(), partial.tx, partial.ty) {
        if let Some(same) = built.iter().find(|f| f.matrix.tx == tx && f.matrix.ty == ty) {
            partial.sx = Some(same.matrix.sx);
            partial.sy = Some(same.matrix.sy);
            partial.wx = Some(same.matrix.wx);
            partial.wy = Some(same.matrix.wy);
        }
    }
    partial.resolve()
}

/// Animation artifact: `<animation_set>` with one sequence of `<animation>`s
pub fn to_xml(animations: &IndexMap<String, Animation>) -> Element {
    let mut sequence = Element::new("animation_sequence").with_attr("index", "1");
    for animation in animations.values() {
        let mut elem = Element::new("animation").with_attr("key", animation.key.as_str());
        for f in &animation.frames {
            let m = &f.matrix;
            elem.push(
                Element::new("frame")
                    .with_attr("index", f.index.to_string())
                    .with_attr("sx", format!("{:?}", m.sx))
                    .with_attr("sy", format!("{:?}", m.sy))
                    .with_attr("wx", format!("{:?}", m.wx))
                    .with_attr("wy", format!("{:?}", m.wy))
                    .with_attr("tx", format!("{:?}", m.tx))
                    .with_attr("ty", format!("{:?}", m.ty))
                    .with_attr("ctf", ctf_list_string(f.ctf.as_ref()))
                    .with_attr("visible", f.visible.to_string()),
            );
        }
        sequence.push(elem);
    }
    Element::new("animation_set").with_child(sequence)
}
