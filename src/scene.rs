//! Retained scene model shared by the authored world and its mirror copy.
//!
//! Nodes carry a local transform, hierarchy links, and a closed set of
//! component kinds. Unknown component kinds are represented explicitly as
//! [`Component::Other`] so mirror preparation can default them to removal.

use std::collections::HashMap;

use nalgebra::{UnitQuaternion, Vector3};
use rapier3d::geometry::Group;

/// Stable handle for a scene node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

/// Collision shape for a collider component.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ColliderShape {
    Cuboid { half_extents: [f32; 3] },
    Ball { radius: f32 },
    Cylinder { half_height: f32, radius: f32 },
}

/// A collider's layer assignment and filtering masks.
#[derive(Clone, Debug, PartialEq)]
pub struct ColliderState {
    pub shape: ColliderShape,
    /// Layer this collider lives on.
    pub layer: Group,
    /// Layers this collider refuses to collide with.
    pub exclude_layers: Group,
    /// Layers this collider collides with regardless of exclusions.
    /// Inclusion wins over exclusion when both name the same layer.
    pub include_layers: Group,
    /// Trigger colliders report overlaps but produce no contact response.
    pub is_trigger: bool,
}

impl ColliderState {
    /// A solid collider on the default layer with no filtering.
    pub fn solid(shape: ColliderShape) -> Self {
        Self {
            shape,
            layer: Group::GROUP_1,
            exclude_layers: Group::NONE,
            include_layers: Group::NONE,
            is_trigger: false,
        }
    }

    /// A trigger volume on the default layer.
    pub fn trigger(shape: ColliderShape) -> Self {
        Self {
            is_trigger: true,
            ..Self::solid(shape)
        }
    }
}

/// Visual renderer settings, kept in mirrors only for ghost debugging.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshRenderer {
    /// Material names, one per slot.
    pub materials: Vec<String>,
    pub cast_shadows: bool,
    pub receive_shadows: bool,
}

impl MeshRenderer {
    pub fn new(materials: Vec<String>) -> Self {
        Self {
            materials,
            cast_shadows: true,
            receive_shadows: true,
        }
    }
}

/// The closed set of component kinds the system understands.
#[derive(Clone, Debug, PartialEq)]
pub enum Component {
    Collider(ColliderState),
    /// Heightfield terrain. Carries no exclusion-layer semantics.
    TerrainCollider,
    MeshRenderer(MeshRenderer),
    /// Mesh source backing a renderer; the payload names the mesh asset.
    MeshFilter(String),
    /// 2D layout rectangle. Meaningless in a physical mirror.
    UiRect,
    /// Anything the system does not model. Removed during mirror preparation.
    Other(String),
}

/// A scene node: local transform, hierarchy links, attached components.
#[derive(Clone, Debug)]
pub struct Node {
    pub name: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub local_position: Vector3<f32>,
    pub local_rotation: UnitQuaternion<f32>,
    pub local_scale: Vector3<f32>,
    pub components: Vec<Component>,
}

impl Node {
    fn new(name: &str, parent: Option<NodeId>) -> Self {
        Self {
            name: name.to_string(),
            parent,
            children: Vec::new(),
            local_position: Vector3::zeros(),
            local_rotation: UnitQuaternion::identity(),
            local_scale: Vector3::new(1.0, 1.0, 1.0),
            components: Vec::new(),
        }
    }

    /// First collider component attached to this node, if any.
    pub fn collider(&self) -> Option<&ColliderState> {
        self.components.iter().find_map(|c| match c {
            Component::Collider(collider) => Some(collider),
            _ => None,
        })
    }

    pub fn collider_mut(&mut self) -> Option<&mut ColliderState> {
        self.components.iter_mut().find_map(|c| match c {
            Component::Collider(collider) => Some(collider),
            _ => None,
        })
    }

    pub fn has_component(&self, predicate: impl Fn(&Component) -> bool) -> bool {
        self.components.iter().any(predicate)
    }
}

/// A node's composed world-space transform.
/// Scale is uniform by convention; the x component stands in for all three.
#[derive(Clone, Copy, Debug)]
pub struct WorldTransform {
    pub position: Vector3<f32>,
    pub rotation: UnitQuaternion<f32>,
    pub scale: f32,
}

/// Scene graph keyed by stable node ids. Ids are never reused.
#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: HashMap<u64, Node>,
    next_id: u64,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            next_id: 1,
        }
    }

    /// Creates a node under `parent`, or at the scene root when `None`.
    pub fn add_node(&mut self, name: &str, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id.0, Node::new(name, parent));
        if let Some(parent) = parent {
            if let Some(node) = self.nodes.get_mut(&parent.0) {
                node.children.push(id);
            }
        }
        id
    }

    pub fn add_component(&mut self, id: NodeId, component: Component) {
        if let Some(node) = self.nodes.get_mut(&id.0) {
            node.components.push(component);
        }
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id.0)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id.0)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All live node ids, in no particular order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.keys().map(|&id| NodeId(id)).collect()
    }

    /// Finds a node by name. Names are expected to be unique at the level
    /// this is used for (world roots); the first match wins otherwise.
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|(_, node)| node.name == name)
            .map(|(&id, _)| NodeId(id))
    }

    /// Collects `root` and every node below it.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.node(id) else { continue };
            out.push(id);
            stack.extend(node.children.iter().copied());
        }
        out
    }

    /// Composes a node's world transform by walking up its parent chain.
    pub fn world_transform(&self, id: NodeId) -> Option<WorldTransform> {
        let node = self.node(id)?;
        let local = WorldTransform {
            position: node.local_position,
            rotation: node.local_rotation,
            scale: node.local_scale.x,
        };
        match node.parent {
            None => Some(local),
            Some(parent) => {
                let up = self.world_transform(parent)?;
                Some(WorldTransform {
                    position: up.position + up.rotation * (local.position * up.scale),
                    rotation: up.rotation * local.rotation,
                    scale: up.scale * local.scale,
                })
            }
        }
    }

    /// Deep-clones `root`'s subtree at the scene root, returning the clone.
    /// The clone keeps names, local transforms, and components; ids are fresh.
    pub fn instantiate(&mut self, root: NodeId) -> Option<NodeId> {
        self.clone_subtree(root, None)
    }

    fn clone_subtree(&mut self, source: NodeId, parent: Option<NodeId>) -> Option<NodeId> {
        let (name, position, rotation, scale, components, children) = {
            let node = self.node(source)?;
            (
                node.name.clone(),
                node.local_position,
                node.local_rotation,
                node.local_scale,
                node.components.clone(),
                node.children.clone(),
            )
        };
        let clone = self.add_node(&name, parent);
        if let Some(node) = self.node_mut(clone) {
            node.local_position = position;
            node.local_rotation = rotation;
            node.local_scale = scale;
            node.components = components;
        }
        for child in children {
            self.clone_subtree(child, Some(clone));
        }
        Some(clone)
    }

    /// Destroys a node and its whole subtree, unlinking it from its parent.
    pub fn destroy(&mut self, id: NodeId) {
        let Some(node) = self.nodes.remove(&id.0) else { return };
        if let Some(parent) = node.parent {
            if let Some(parent) = self.nodes.get_mut(&parent.0) {
                parent.children.retain(|c| *c != id);
            }
        }
        for child in node.children {
            self.destroy(child);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube() -> ColliderShape {
        ColliderShape::Cuboid {
            half_extents: [0.5, 0.5, 0.5],
        }
    }

    #[test]
    fn test_add_and_find_nodes() {
        let mut scene = SceneGraph::new();
        let root = scene.add_node("World", None);
        let child = scene.add_node("Floor", Some(root));

        assert!(scene.contains(root));
        assert_eq!(scene.find_by_name("Floor"), Some(child));
        assert_eq!(scene.node(root).unwrap().children, vec![child]);
        assert_eq!(scene.node(child).unwrap().parent, Some(root));
    }

    #[test]
    fn test_descendants_include_root() {
        let mut scene = SceneGraph::new();
        let root = scene.add_node("World", None);
        let a = scene.add_node("A", Some(root));
        let b = scene.add_node("B", Some(a));

        let ids = scene.descendants(root);
        assert_eq!(ids.len(), 3);
        assert!(ids.contains(&root) && ids.contains(&a) && ids.contains(&b));
    }

    #[test]
    fn test_instantiate_is_a_deep_independent_copy() {
        let mut scene = SceneGraph::new();
        let root = scene.add_node("World", None);
        let wall = scene.add_node("Wall", Some(root));
        scene.add_component(wall, Component::Collider(ColliderState::solid(cube())));
        scene.node_mut(wall).unwrap().local_position = Vector3::new(2.0, 0.0, 0.0);

        let copy = scene.instantiate(root).unwrap();
        assert_ne!(copy, root);
        assert_eq!(scene.descendants(copy).len(), 2);

        // Mutating the copy leaves the original untouched.
        let copy_wall = scene.descendants(copy)[1];
        scene.node_mut(copy_wall).unwrap().local_position.x = 99.0;
        assert_eq!(scene.node(wall).unwrap().local_position.x, 2.0);
    }

    #[test]
    fn test_destroy_removes_subtree_and_parent_link() {
        let mut scene = SceneGraph::new();
        let root = scene.add_node("World", None);
        let a = scene.add_node("A", Some(root));
        let b = scene.add_node("B", Some(a));

        scene.destroy(a);
        assert!(!scene.contains(a));
        assert!(!scene.contains(b));
        assert!(scene.node(root).unwrap().children.is_empty());
    }

    #[test]
    fn test_world_transform_composes_scale_and_translation() {
        let mut scene = SceneGraph::new();
        let root = scene.add_node("World", None);
        scene.node_mut(root).unwrap().local_position = Vector3::new(10.0, 0.0, 0.0);
        scene.node_mut(root).unwrap().local_scale = Vector3::new(2.0, 2.0, 2.0);
        let child = scene.add_node("Child", Some(root));
        scene.node_mut(child).unwrap().local_position = Vector3::new(1.0, 0.0, 0.0);

        let world = scene.world_transform(child).unwrap();
        assert_eq!(world.position, Vector3::new(12.0, 0.0, 0.0));
        assert_eq!(world.scale, 2.0);
    }

    #[test]
    fn test_collider_accessor_finds_first_collider() {
        let mut scene = SceneGraph::new();
        let node = scene.add_node("Thing", None);
        scene.add_component(node, Component::Other("AudioSource".to_string()));
        scene.add_component(node, Component::Collider(ColliderState::solid(cube())));

        assert!(scene.node(node).unwrap().collider().is_some());
    }
}
