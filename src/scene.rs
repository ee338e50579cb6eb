//! Scene flattening
//!
//! Top-level placements and sprite contents are expanded into a rooted tree of
//! instances. Sprites are expanded from their first frame only; motion over
//! later frames is captured separately by [`crate::animation`].

use tracing::warn;

use crate::parser::model::{
    ctf_list_string, make_key, symbol_from_key, ColorTransform, Document, Matrix, Place,
};
use crate::xml::Element;

/// Index of a node in a [`Scene`]
pub type NodeId = usize;

/// Placement values of one scene node
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    pub matrix: Matrix,
    pub ctf: Option<ColorTransform>,
    pub depth: u16,
    pub clip_depth: Option<u16>,
    pub name: Option<String>,
    pub visible: bool,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            matrix: Matrix::IDENTITY,
            ctf: None,
            depth: 1,
            clip_depth: None,
            name: None,
            visible: true,
        }
    }
}

impl From<&Place> for Transform {
    fn from(place: &Place) -> Self {
        Self {
            matrix: place.matrix.resolve(),
            ctf: place.ctf,
            depth: place.depth,
            clip_depth: place.clip_depth,
            name: place.name.clone(),
            visible: place.visible,
        }
    }
}

/// One placed instance
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    /// `root` or `obj<id>`
    pub symbol: String,
    pub transform: Transform,
    pub children: Vec<NodeId>,
    pub parent: Option<NodeId>,
}

/// Flattened placement tree; node 0 is the root
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    nodes: Vec<SceneNode>,
}

impl Scene {
    pub const ROOT: NodeId = 0;

    /// Build the tree for a parsed document
    ///
    /// The root scales its contents by `1 / scale_factor`.
    pub fn build(doc: &Document, scale_factor: f64) -> Self {
        let root = SceneNode {
            symbol: "root".to_string(),
            transform: Transform {
                matrix: Matrix {
                    sx: 1.0 / scale_factor,
                    sy: 1.0 / scale_factor,
                    ..Matrix::IDENTITY
                },
                ..Transform::default()
            },
            children: Vec::new(),
            parent: None,
        };
        let mut scene = Scene { nodes: vec![root] };

        let mut stack = Vec::new();
        for (id, place) in &doc.places {
            let node = scene.add_child(Self::ROOT, format!("obj{}", id), place.into());
            stack.push(node);
        }

        while let Some(current) = stack.pop() {
            let Some(sprite) = doc.sprite(&scene.nodes[current].symbol) else {
                continue;
            };
            let Some(first) = sprite.frames.first() else {
                continue;
            };
            for place in &first.places {
                for key in &place.symbols {
                    let symbol = symbol_from_key(key).to_string();
                    let recursive = scene
                        .ancestors(current)
                        .any(|a| scene.nodes[a].symbol == symbol);
                    let node = scene.add_child(current, symbol.clone(), place.into());
                    if recursive {
                        warn!(symbol = %symbol, "sprite placed inside itself; not expanded");
                    } else {
                        stack.push(node);
                    }
                }
            }
        }
        scene
    }

    fn add_child(&mut self, parent: NodeId, symbol: String, transform: Transform) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(SceneNode {
            symbol,
            transform,
            children: Vec::new(),
            parent: Some(parent),
        });
        self.nodes[parent].children.push(id);
        id
    }

    pub fn node(&self, id: NodeId) -> &SceneNode {
        &self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The node itself followed by its ancestors up to the root
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(id), move |&n| self.nodes[n].parent)
    }

    /// Nodes of the subtree at `from` in document (pre-)order
    pub fn preorder(&self, from: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            result.push(id);
            stack.extend(self.nodes[id].children.iter().rev());
        }
        result
    }

    /// First node, in pre-order, whose instance name is `name`
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.preorder(Self::ROOT)
            .into_iter()
            .find(|&id| self.nodes[id].transform.name.as_deref() == Some(name))
    }

    /// Instance key `<prefix>-<symbol>-<depth>`
    pub fn key(&self, id: NodeId, prefix: &str) -> String {
        let node = &self.nodes[id];
        make_key(prefix, &node.symbol, &node.transform.depth.to_string())
    }

    /// Structure artifact: nested `<part>` elements under `<structure>`
    pub fn to_xml(&self) -> Element {
        Element::new("structure").with_child(self.part_element(Self::ROOT))
    }

    fn part_element(&self, id: NodeId) -> Element {
        let node = &self.nodes[id];
        let t = &node.transform;
        let m = &t.matrix;
        let mut part = Element::new("part")
            .with_attr("key", node.symbol.as_str())
            .with_attr("sx", format!("{:?}", m.sx))
            .with_attr("sy", format!("{:?}", m.sy))
            .with_attr("wx", format!("{:?}", m.wx))
            .with_attr("wy", format!("{:?}", m.wy))
            .with_attr("tx", format!("{:?}", m.tx))
            .with_attr("ty", format!("{:?}", m.ty))
            .with_attr("ctf", ctf_list_string(t.ctf.as_ref()))
            .with_attr("depth", t.depth.to_string());
        if let Some(name) = &t.name {
            part.set_attr("name", name.as_str());
        }
        if let Some(clip) = t.clip_depth {
            part.set_attr("clipDepth", clip.to_string());
        }
        part.set_attr("visible", t.visible.to_string());

        for &child in &node.children {
            part.push(self.part_element(child));
        }
        part
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_document;

    fn scene(tags: &str, scale: f64) -> (Document, Scene) {
        let xml = format!("<swf><Header><tags>{}</tags></Header></swf>", tags);
        let root = Element::parse_document(&xml).unwrap();
        let doc = parse_document(&root, "").unwrap();
        let scene = Scene::build(&doc, scale);
        (doc, scene)
    }

    const NESTED: &str = r#"
<DefineShape objectID="1"><bounds><Rectangle left="0" right="200" top="0" bottom="100"/></bounds></DefineShape>
<DefineSprite objectID="2" frames="2"><tags>
  <PlaceObject2 objectID="1" depth="3" name="body"><transform><Transform transX="40" transY="60"/></transform></PlaceObject2>
  <PlaceObject2 objectID="1" depth="5"><transform><Transform scaleX="2" scaleY="2"/></transform></PlaceObject2>
  <ShowFrame/>
  <PlaceObject2 depth="3"><transform><Transform transX="80" transY="60"/></transform></PlaceObject2>
  <ShowFrame/>
</tags></DefineSprite>
<PlaceObject2 objectID="2" depth="1" name="hero"><transform><Transform transX="100" transY="200"/></transform></PlaceObject2>"#;

    #[test]
    fn test_build_nested_tree() {
        let (_, scene) = scene(NESTED, 2.0);
        let root = scene.node(Scene::ROOT);
        assert_eq!(root.symbol, "root");
        assert_eq!(root.transform.matrix.sx, 0.5);
        assert_eq!(root.children.len(), 1);

        let hero = scene.node(root.children[0]);
        assert_eq!(hero.symbol, "obj2");
        assert_eq!(hero.transform.name.as_deref(), Some("hero"));
        assert_eq!(hero.transform.matrix.tx, 100.0);
        assert_eq!(hero.transform.matrix.sx, 1.0);
        assert_eq!(hero.children.len(), 2);

        // first frame only
        let body = scene.node(hero.children[0]);
        assert_eq!(body.symbol, "obj1");
        assert_eq!(body.transform.depth, 3);
        assert_eq!(body.transform.matrix.tx, 40.0);
        assert_eq!(body.parent, Some(root.children[0]));
        assert_eq!(scene.node(hero.children[1]).transform.matrix.sx, 2.0);
    }

    #[test]
    fn test_keys_and_lookup() {
        let (_, scene) = scene(NESTED, 1.0);
        let body = scene.find_by_name("body").unwrap();
        assert_eq!(scene.key(body, ""), "-obj1-3");
        assert_eq!(scene.key(body, "anim"), "anim-obj1-3");
        assert_eq!(scene.key(Scene::ROOT, ""), "-root-1");
        assert_eq!(scene.ancestors(body).count(), 3);
        assert!(scene.find_by_name("missing").is_none());
    }

    #[test]
    fn test_preorder() {
        let (_, scene) = scene(NESTED, 1.0);
        let symbols: Vec<&str> = scene
            .preorder(Scene::ROOT)
            .into_iter()
            .map(|id| scene.node(id).symbol.as_str())
            .collect();
        assert_eq!(symbols, vec!["root", "obj2", "obj1", "obj1"]);
    }

    #[test]
    fn test_self_referencing_sprite_is_not_expanded() {
        let (_, scene) = scene(
            r#"
<DefineSprite objectID="4" frames="1"><tags>
  <PlaceObject2 objectID="4" depth="1"/>
  <ShowFrame/>
</tags></DefineSprite>
<PlaceObject2 objectID="4" depth="1"/>"#,
            1.0,
        );
        assert_eq!(scene.len(), 3);
        let inner = scene.node(scene.node(1).children[0]);
        assert!(inner.children.is_empty());
    }

    #[test]
    fn test_structure_xml() {
        let (_, scene) = scene(NESTED, 1.0);
        let xml = scene.to_xml();
        let hero = xml.find("part/part").unwrap();
        assert_eq!(hero.attr("key"), Some("obj2"));
        assert_eq!(hero.attr("tx"), Some("100.0"));
        assert_eq!(hero.attr("ctf"), Some("[]"));
        assert_eq!(hero.attr("name"), Some("hero"));
        assert_eq!(hero.attr("visible"), Some("true"));
        assert_eq!(hero.attr("clipDepth"), None);
        assert_eq!(hero.find_all("part").len(), 2);
    }
}
