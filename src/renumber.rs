//! Depth renumbering
//!
//! A sprite timeline may place different objects at the same depth over its
//! lifetime. Everything downstream assumes one object per depth, so sprites
//! with such collisions are rewritten: each (depth, object) pair gets its own
//! virtual depth, placements become self-describing at their new depth, and
//! an explicit removal is inserted wherever a pair replaces another one.
//!
//! The pass never mutates its input; it returns a rewritten copy. Running it on
//! its own output changes nothing.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::ParseError;
use crate::parser::tags::{opt_attr, req_attr};
use crate::xml::Element;

/// Errors that stop one sprite from being renumbered
#[derive(Error, Debug)]
pub enum RenumberError {
    #[error("invalid placement record: {0}")]
    Attribute(#[from] ParseError),

    #[error("sprite has no tags element")]
    MissingTags,
}

/// Virtual depths assigned to one sprite
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteRenumbering {
    pub sprite_id: u16,
    /// (original depth, object id) -> virtual depth
    pub depths: BTreeMap<(u16, u16), u16>,
}

/// Result of the renumbering pass
#[derive(Debug, Clone)]
pub struct Renumbered {
    pub document: Element,
    /// Sprites that were rewritten, document order
    pub sprites: Vec<SpriteRenumbering>,
}

/// Renumber every sprite with depth collisions
pub fn renumber(root: &Element) -> Renumbered {
    let mut document = root.clone();
    let mut sprites = Vec::new();

    let tags = document
        .child_mut("Header")
        .and_then(|h| h.child_mut("tags"));
    if let Some(tags) = tags {
        for sprite in tags.children.iter_mut().filter(|t| t.name == "DefineSprite") {
            match renumber_sprite(sprite) {
                Ok(Some(table)) => {
                    info!(
                        sprite = table.sprite_id,
                        depths = table.depths.len(),
                        "renumbered sprite depths"
                    );
                    sprites.push(table);
                }
                Ok(None) => {}
                Err(err) => warn!(
                    sprite = sprite.attr("objectID").unwrap_or("?"),
                    error = %err,
                    "sprite left unrenumbered"
                ),
            }
        }
    }

    Renumbered { document, sprites }
}

/// Rewrite one sprite in place; on error the sprite is untouched
fn renumber_sprite(sprite: &mut Element) -> Result<Option<SpriteRenumbering>, RenumberError> {
    let Some(sprite_id) = opt_attr::<u16>(sprite, "objectID")? else {
        return Ok(None);
    };
    let tags = sprite.child("tags").ok_or(RenumberError::MissingTags)?;

    let show_frames = tags.children.iter().filter(|t| t.name == "ShowFrame").count();
    let frames = opt_attr::<usize>(sprite, "frames")?.unwrap_or(show_frames);
    if frames <= 1 {
        return Ok(None);
    }

    let objects = depth_objects(tags)?;
    if objects.values().all(|ids| ids.len() <= 1) {
        return Ok(None);
    }
    let depths = virtual_depths(&objects);
    debug!(sprite = sprite_id, pairs = depths.len(), "depth collisions found");

    let table = FrameTable::scan(tags)?;
    let children = rewrite(tags, &objects, &depths, &table)?;

    if let Some(tags) = sprite.child_mut("tags") {
        tags.children = children;
    }
    Ok(Some(SpriteRenumbering { sprite_id, depths }))
}

/// Distinct object ids ever placed at each depth
fn depth_objects(tags: &Element) -> Result<BTreeMap<u16, BTreeSet<u16>>, RenumberError> {
    let mut result: BTreeMap<u16, BTreeSet<u16>> = BTreeMap::new();
    for po in tags.children.iter().filter(|t| t.name == "PlaceObject2") {
        let depth = req_attr::<u16>(po, "depth")?;
        let ids = result.entry(depth).or_default();
        if let Some(id) = opt_attr::<u16>(po, "objectID")? {
            ids.insert(id);
        }
    }
    Ok(result)
}

/// Consecutive virtual depths from 1, ordered by depth then object id
fn virtual_depths(objects: &BTreeMap<u16, BTreeSet<u16>>) -> BTreeMap<(u16, u16), u16> {
    objects
        .iter()
        .flat_map(|(&depth, ids)| ids.iter().map(move |&id| (depth, id)))
        .zip(1..)
        .collect()
}

/// The placement active at a depth
#[derive(Debug, Clone, PartialEq)]
struct Snapshot {
    object_id: u16,
    transform: Option<Vec<(String, String)>>,
    color_transform: Option<Vec<(String, String)>>,
}

impl Snapshot {
    fn transform_element(&self) -> Option<Element> {
        self.transform.as_ref().map(|attrs| {
            Element::new("transform").with_child(Element {
                attributes: attrs.clone(),
                ..Element::new("Transform")
            })
        })
    }

    fn color_transform_element(&self) -> Option<Element> {
        self.color_transform.as_ref().map(|attrs| {
            Element::new("colorTransform").with_child(Element {
                attributes: attrs.clone(),
                ..Element::new("ColorTransform2")
            })
        })
    }
}

/// Active placement per depth at the end of every frame
struct FrameTable {
    frames: Vec<BTreeMap<u16, Snapshot>>,
}

impl FrameTable {
    fn scan(tags: &Element) -> Result<Self, RenumberError> {
        let mut frames: Vec<BTreeMap<u16, Snapshot>> = Vec::new();
        // None marks a removal within the frame
        let mut changes: BTreeMap<u16, Option<Snapshot>> = BTreeMap::new();

        for tag in &tags.children {
            match tag.name.as_str() {
                "ShowFrame" => {
                    let mut state = frames.last().cloned().unwrap_or_default();
                    for (depth, change) in std::mem::take(&mut changes) {
                        match change {
                            Some(snapshot) => state.insert(depth, snapshot),
                            None => state.remove(&depth),
                        };
                    }
                    frames.push(state);
                }
                "RemoveObject2" => {
                    changes.insert(req_attr(tag, "depth")?, None);
                }
                "PlaceObject2" => {
                    let depth = req_attr::<u16>(tag, "depth")?;
                    let base = match changes.get(&depth) {
                        Some(Some(s)) => Some(s),
                        _ => frames.last().and_then(|f| f.get(&depth)),
                    };
                    let object_id = match opt_attr::<u16>(tag, "objectID")? {
                        Some(id) => id,
                        None => match base {
                            Some(b) => b.object_id,
                            None => continue,
                        },
                    };
                    let attrs = |path: &str| tag.find(path).map(|t| t.attributes.clone());
                    let snapshot = Snapshot {
                        object_id,
                        transform: attrs("transform/Transform")
                            .or_else(|| base.and_then(|b| b.transform.clone())),
                        color_transform: attrs("colorTransform/ColorTransform2")
                            .or_else(|| base.and_then(|b| b.color_transform.clone())),
                    };
                    changes.insert(depth, Some(snapshot));
                }
                _ => {}
            }
        }
        Ok(Self { frames })
    }

    fn get(&self, frame: usize, depth: u16) -> Option<&Snapshot> {
        self.frames.get(frame).and_then(|f| f.get(&depth))
    }
}

/// Objects on the sprite's display list while its tags are replayed
#[derive(Default)]
struct DisplayList {
    objects: BTreeMap<u16, u16>,
}

impl DisplayList {
    /// Object at `depth`, or the only object the depth ever holds
    fn object_at(&self, depth: u16, objects: &BTreeMap<u16, BTreeSet<u16>>) -> Option<u16> {
        self.objects.get(&depth).copied().or_else(|| {
            objects
                .get(&depth)
                .filter(|ids| ids.len() == 1)
                .and_then(|ids| ids.first().copied())
        })
    }
}

fn rewrite(
    tags: &Element,
    objects: &BTreeMap<u16, BTreeSet<u16>>,
    depths: &BTreeMap<(u16, u16), u16>,
    table: &FrameTable,
) -> Result<Vec<Element>, RenumberError> {
    let mut result = Vec::with_capacity(tags.children.len());
    let mut frame = 0usize;
    let mut live = DisplayList::default();

    for tag in &tags.children {
        match tag.name.as_str() {
            "ShowFrame" => {
                frame += 1;
                result.push(tag.clone());
            }
            "RemoveObject2" => {
                let depth = req_attr::<u16>(tag, "depth")?;
                let mut elem = tag.clone();
                let removed = live
                    .object_at(depth, objects)
                    .and_then(|id| depths.get(&(depth, id)));
                if let Some(virtual_depth) = removed {
                    elem.set_attr("depth", virtual_depth.to_string());
                }
                live.objects.remove(&depth);
                result.push(elem);
            }
            "PlaceObject2" => {
                let depth = req_attr::<u16>(tag, "depth")?;
                let object_id = match opt_attr::<u16>(tag, "objectID")? {
                    Some(id) => Some(id),
                    None => live.object_at(depth, objects),
                };
                let Some(object_id) = object_id else {
                    result.push(tag.clone());
                    continue;
                };
                let Some(&virtual_depth) = depths.get(&(depth, object_id)) else {
                    result.push(tag.clone());
                    continue;
                };

                let mut elem = tag.clone();
                elem.set_attr("depth", virtual_depth.to_string());
                // Transforms carried over from earlier frames
                if let Some(snapshot) = table
                    .get(frame, depth)
                    .filter(|s| s.object_id == object_id)
                {
                    if elem.child("transform").is_none() {
                        if let Some(t) = snapshot.transform_element() {
                            elem.push(t);
                        }
                    }
                    if elem.child("colorTransform").is_none() {
                        if let Some(c) = snapshot.color_transform_element() {
                            elem.push(c);
                        }
                    }
                }

                let collides = objects.get(&depth).is_some_and(|ids| ids.len() > 1);
                let vacated = live
                    .objects
                    .get(&depth)
                    .filter(|&&prev| prev != object_id)
                    .and_then(|&prev| depths.get(&(depth, prev)));
                if let (true, Some(vacated)) = (collides, vacated) {
                    if elem.attr("replace") == Some("1") {
                        elem.set_attr("replace", "0");
                    }
                    result.push(
                        Element::new("RemoveObject2").with_attr("depth", vacated.to_string()),
                    );
                }
                live.objects.insert(depth, object_id);
                result.push(elem);
            }
            _ => result.push(tag.clone()),
        }
    }
    Ok(result)
}
