//! Mirror-world lifecycle: one inversely-scaled copy of the authored world,
//! repositioned every tick so the geometry nearest the avatar stays where
//! the avatar sees it.

use nalgebra::Vector3;

use crate::scene::{NodeId, SceneGraph};
use crate::tagger::ColliderTagger;

/// The authored root and its live mirror instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MirrorBinding {
    pub real: NodeId,
    pub mirror: NodeId,
}

/// Owns the mirror instance and the tag state on the authored root.
/// At most one binding is live at a time; the mirror's transform is written
/// here and nowhere else.
#[derive(Debug, Default)]
pub struct WorldMirror {
    binding: Option<MirrorBinding>,
    tagger: ColliderTagger,
}

impl WorldMirror {
    pub fn new() -> Self {
        Self {
            binding: None,
            tagger: ColliderTagger::new(),
        }
    }

    pub fn binding(&self) -> Option<MirrorBinding> {
        self.binding
    }

    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    pub fn tagger(&self) -> &ColliderTagger {
        &self.tagger
    }

    /// Replaces any existing binding with a fresh mirror of `root`.
    /// The previous root is untagged and its mirror destroyed first, so two
    /// mirrors never coexist. Returns false if `root` is gone.
    pub fn bind(
        &mut self,
        scene: &mut SceneGraph,
        root: NodeId,
        ghost_material: Option<&str>,
    ) -> bool {
        if let Some(previous) = self.binding.take() {
            self.tagger.reverse(scene, previous.real);
            scene.destroy(previous.mirror);
        }
        // Instantiate before tagging so the copy carries the untouched masks.
        let Some(mirror) = scene.instantiate(root) else {
            return false;
        };
        self.tagger.apply(scene, root);
        ColliderTagger::prepare_mirror(scene, mirror, ghost_material);
        self.binding = Some(MirrorBinding { real: root, mirror });
        true
    }

    /// Tears the binding down: mirror transform reset, authored masks
    /// restored, mirror instance destroyed.
    pub fn unbind(&mut self, scene: &mut SceneGraph) {
        let Some(binding) = self.binding.take() else { return };
        let real_position = scene.node(binding.real).map(|n| n.local_position);
        if let Some(mirror) = scene.node_mut(binding.mirror) {
            mirror.local_scale = Vector3::new(1.0, 1.0, 1.0);
            if let Some(position) = real_position {
                mirror.local_position = position;
            }
        }
        self.tagger.reverse(scene, binding.real);
        scene.destroy(binding.mirror);
    }

    /// Applies a uniform scale to the mirror root.
    pub fn set_uniform_scale(&self, scene: &mut SceneGraph, scale: f32) {
        let Some(binding) = self.binding else { return };
        let Some(mirror) = scene.node_mut(binding.mirror) else { return };
        mirror.local_scale = Vector3::new(scale, scale, scale);
    }

    /// Repositions the mirror so the world point at `pivot` coincides in
    /// both frames while the rest dilates around it by `world_scale`.
    /// The authored root's own scale divides out so pre-scaled worlds work.
    pub fn realign(&self, scene: &mut SceneGraph, pivot: Vector3<f32>, world_scale: f32) {
        let Some(binding) = self.binding else { return };
        let Some(real) = scene.node(binding.real) else { return };
        let authored_scale = real.local_scale.x;
        if authored_scale == 0.0 {
            return;
        }
        let target = pivot + (real.local_position - pivot) * world_scale / authored_scale;
        let Some(mirror) = scene.node_mut(binding.mirror) else { return };
        mirror.local_position = target;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::layers;
    use crate::scene::{ColliderShape, ColliderState, Component};
    use rapier3d::geometry::Group;

    fn world(scene: &mut SceneGraph) -> (NodeId, NodeId) {
        let root = scene.add_node("World", None);
        let wall = scene.add_node("Wall", Some(root));
        scene.add_component(
            wall,
            Component::Collider(ColliderState::solid(ColliderShape::Cuboid {
                half_extents: [1.0, 1.0, 1.0],
            })),
        );
        (root, wall)
    }

    #[test]
    fn test_bind_creates_one_mirror_and_tags_the_root() {
        let mut scene = SceneGraph::new();
        let (root, wall) = world(&mut scene);
        let mut mirror = WorldMirror::new();

        assert!(mirror.bind(&mut scene, root, None));

        let binding = mirror.binding().unwrap();
        assert_eq!(binding.real, root);
        assert!(scene.contains(binding.mirror));
        // Authored collider now ignores the mirror layer.
        let authored = scene.node(wall).unwrap().collider().unwrap();
        assert!(authored.exclude_layers.contains(layers::MIRROR));
        // The mirror copy collides on the mirror layer only.
        let mirror_wall = scene.descendants(binding.mirror)[1];
        let copied = scene.node(mirror_wall).unwrap().collider().unwrap();
        assert_eq!(copied.include_layers, layers::MIRROR);
    }

    #[test]
    fn test_rebind_reverses_old_root_and_destroys_old_mirror() {
        let mut scene = SceneGraph::new();
        let (root_a, wall_a) = world(&mut scene);
        let root_b = scene.add_node("WorldB", None);
        let mut mirror = WorldMirror::new();

        mirror.bind(&mut scene, root_a, None);
        let old_mirror = mirror.binding().unwrap().mirror;
        mirror.bind(&mut scene, root_b, None);

        assert!(!scene.contains(old_mirror));
        assert_eq!(mirror.binding().unwrap().real, root_b);
        let authored = scene.node(wall_a).unwrap().collider().unwrap();
        assert_eq!(authored.exclude_layers, Group::NONE);
        assert_eq!(mirror.tagger().tag_count(), 0);
    }

    #[test]
    fn test_unbind_restores_everything() {
        let mut scene = SceneGraph::new();
        let (root, wall) = world(&mut scene);
        let nodes_before = scene.len();
        let mut mirror = WorldMirror::new();

        mirror.bind(&mut scene, root, None);
        mirror.unbind(&mut scene);

        assert!(!mirror.is_bound());
        assert_eq!(scene.len(), nodes_before);
        let authored = scene.node(wall).unwrap().collider().unwrap();
        assert_eq!(authored.exclude_layers, Group::NONE);
    }

    #[test]
    fn test_realign_formula() {
        let mut scene = SceneGraph::new();
        let (root, _) = world(&mut scene);
        scene.node_mut(root).unwrap().local_position = Vector3::new(4.0, 0.0, 0.0);
        let mut mirror = WorldMirror::new();
        mirror.bind(&mut scene, root, None);

        let pivot = Vector3::new(1.0, 2.0, 3.0);
        mirror.realign(&mut scene, pivot, 2.0);

        let placed = scene
            .node(mirror.binding().unwrap().mirror)
            .unwrap()
            .local_position;
        let expected = pivot + (Vector3::new(4.0, 0.0, 0.0) - pivot) * 2.0;
        assert_eq!(placed, expected);
    }

    #[test]
    fn test_realign_at_unit_scale_matches_authored_position() {
        let mut scene = SceneGraph::new();
        let (root, _) = world(&mut scene);
        scene.node_mut(root).unwrap().local_position = Vector3::new(-3.0, 1.0, 8.0);
        let mut mirror = WorldMirror::new();
        mirror.bind(&mut scene, root, None);

        mirror.realign(&mut scene, Vector3::new(50.0, 0.0, -20.0), 1.0);

        let placed = scene
            .node(mirror.binding().unwrap().mirror)
            .unwrap()
            .local_position;
        assert_eq!(placed, Vector3::new(-3.0, 1.0, 8.0));
    }

    #[test]
    fn test_realign_divides_out_authored_scale() {
        let mut scene = SceneGraph::new();
        let (root, _) = world(&mut scene);
        scene.node_mut(root).unwrap().local_position = Vector3::new(10.0, 0.0, 0.0);
        scene.node_mut(root).unwrap().local_scale = Vector3::new(2.0, 2.0, 2.0);
        let mut mirror = WorldMirror::new();
        mirror.bind(&mut scene, root, None);

        let pivot = Vector3::zeros();
        mirror.realign(&mut scene, pivot, 4.0);

        let placed = scene
            .node(mirror.binding().unwrap().mirror)
            .unwrap()
            .local_position;
        assert_eq!(placed, Vector3::new(20.0, 0.0, 0.0));
    }
}
