//! Reversible exclusion tagging and mirror preparation.
//!
//! While a world binding is live, every authored collider gets the mirror
//! layer added to its exclude mask so the avatar capsule only ever collides
//! with mirror geometry. The tagger remembers just enough per collider to
//! undo that exactly, and no more: a three-state record, not a mask
//! snapshot. Layers excluded or cleared by other code while a tag is held
//! stay whatever that code made them.

use std::collections::HashMap;

use rapier3d::geometry::Group;

use crate::constants::layers;
use crate::scene::{ColliderState, Component, NodeId, SceneGraph};

/// What a collider's exclude mask looked like before tagging.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColliderTag {
    /// No layers were excluded.
    Untouched,
    /// Some layers were excluded, but not the mirror layer.
    HadOtherExclusions,
    /// The mirror layer was already excluded.
    HadThisExclusion,
}

/// Side table of per-collider pre-tag exclusion state, keyed by node handle.
#[derive(Debug, Default)]
pub struct ColliderTagger {
    tags: HashMap<NodeId, ColliderTag>,
}

impl ColliderTagger {
    pub fn new() -> Self {
        Self {
            tags: HashMap::new(),
        }
    }

    pub fn tag(&self, id: NodeId) -> Option<ColliderTag> {
        self.tags.get(&id).copied()
    }

    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }

    /// Excludes the mirror layer on every eligible collider under `root`,
    /// recording the prior state. Trigger colliders and terrain are skipped.
    /// Safe to call repeatedly: an existing tag is undone before retagging,
    /// so the original record survives.
    pub fn apply(&mut self, scene: &mut SceneGraph, root: NodeId) {
        for id in scene.descendants(root) {
            let Some(node) = scene.node_mut(id) else { continue };
            let Some(collider) = node.collider_mut() else { continue };
            if collider.is_trigger {
                continue;
            }
            if let Some(tag) = self.tags.remove(&id) {
                restore(collider, tag);
            }
            let tag = classify(collider.exclude_layers);
            collider.exclude_layers |= layers::MIRROR;
            self.tags.insert(id, tag);
        }
    }

    /// Restores every tagged collider under `root` to its pre-tag state
    /// for the mirror layer and drops the records.
    pub fn reverse(&mut self, scene: &mut SceneGraph, root: NodeId) {
        for id in scene.descendants(root) {
            let Some(tag) = self.tags.remove(&id) else { continue };
            let Some(node) = scene.node_mut(id) else { continue };
            let Some(collider) = node.collider_mut() else { continue };
            restore(collider, tag);
        }
        // Colliders destroyed while tagged leave no record behind.
        self.tags.retain(|id, _| scene.contains(*id));
    }

    /// Strips a freshly instantiated mirror subtree down to transforms and
    /// mirror-layer colliders. With a ghost material configured, visual
    /// renderers survive as shadowless ghosts; everything else goes.
    pub fn prepare_mirror(
        scene: &mut SceneGraph,
        mirror_root: NodeId,
        ghost_material: Option<&str>,
    ) {
        for id in scene.descendants(mirror_root) {
            // A parent UI node may have taken this one down already.
            let Some(node) = scene.node(id) else { continue };
            if node.has_component(|c| matches!(c, Component::UiRect)) {
                scene.destroy(id);
                continue;
            }
            let Some(node) = scene.node_mut(id) else { continue };
            node.components.retain_mut(|component| match component {
                Component::Collider(collider) => {
                    force_mirror_layer(collider);
                    true
                }
                // Terrain cannot be layer-filtered; it has no mirror form.
                Component::TerrainCollider => false,
                Component::MeshRenderer(renderer) => match ghost_material {
                    Some(ghost) => {
                        renderer.cast_shadows = false;
                        renderer.receive_shadows = false;
                        for slot in &mut renderer.materials {
                            *slot = ghost.to_string();
                        }
                        true
                    }
                    None => false,
                },
                Component::MeshFilter(_) => ghost_material.is_some(),
                Component::UiRect | Component::Other(_) => false,
            });
        }
    }
}

/// Mirror geometry collides on the mirror layer and nothing else.
fn force_mirror_layer(collider: &mut ColliderState) {
    collider.include_layers = layers::MIRROR;
    collider.exclude_layers = !layers::MIRROR;
}

fn classify(exclude_layers: Group) -> ColliderTag {
    if exclude_layers == Group::NONE {
        ColliderTag::Untouched
    } else if exclude_layers.contains(layers::MIRROR) {
        ColliderTag::HadThisExclusion
    } else {
        ColliderTag::HadOtherExclusions
    }
}

fn restore(collider: &mut ColliderState, tag: ColliderTag) {
    match tag {
        ColliderTag::Untouched => collider.exclude_layers = Group::NONE,
        ColliderTag::HadOtherExclusions => collider.exclude_layers &= !layers::MIRROR,
        // Already excluded before we touched it; clearing would be wrong.
        ColliderTag::HadThisExclusion => {}
    }
}
