//! End-to-end smoke test: a shrunk avatar in a small world, driven through
//! the reference host for a few ticks, then rescaled, rebound, and disabled.

use approx::assert_relative_eq;
use nalgebra::Vector3;
use rapier3d::geometry::Group;

use scaled_colliders::constants::layers;
use scaled_colliders::constants::sim::TIMESTEP;
use scaled_colliders::scene::{
    ColliderShape, ColliderState, Component, MeshRenderer, NodeId, SceneGraph,
};
use scaled_colliders::sim::{SimAvatar, SimWorld};
use scaled_colliders::{ScaledColliderConfig, ScaledColliderSystem};

fn build_world(scene: &mut SceneGraph) -> (NodeId, NodeId) {
    let root = scene.add_node("World", None);

    let floor = scene.add_node("Floor", Some(root));
    scene.node_mut(floor).unwrap().local_position = Vector3::new(0.0, -0.5, 0.0);
    scene.add_component(
        floor,
        Component::Collider(ColliderState::solid(ColliderShape::Cuboid {
            half_extents: [20.0, 0.5, 20.0],
        })),
    );

    let wall = scene.add_node("Wall", Some(root));
    scene.node_mut(wall).unwrap().local_position = Vector3::new(6.0, 1.0, 0.0);
    scene.add_component(
        wall,
        Component::Collider(ColliderState::solid(ColliderShape::Cuboid {
            half_extents: [0.5, 1.0, 4.0],
        })),
    );
    scene.add_component(wall, Component::MeshFilter("wall".to_string()));
    scene.add_component(
        wall,
        Component::MeshRenderer(MeshRenderer::new(vec!["Brick".to_string()])),
    );

    let sign = scene.add_node("Sign", Some(root));
    scene.add_component(sign, Component::UiRect);

    let terrain = scene.add_node("Terrain", Some(root));
    scene.add_component(terrain, Component::TerrainCollider);

    (root, wall)
}

#[test]
fn test_full_lifecycle_at_half_scale() {
    let mut scene = SceneGraph::new();
    let (root, wall) = build_world(&mut scene);
    let mut system = ScaledColliderSystem::new(ScaledColliderConfig::default());
    let mut world = SimWorld::new(scene, SimAvatar::local(0.8));

    world.start(&mut system, Some(root));

    // Scale pair and movement parameters.
    assert_relative_eq!(system.player_scale(), 0.5);
    assert_relative_eq!(system.world_scale(), 2.0);
    assert_relative_eq!(world.local.walk_speed, 1.0);
    assert_relative_eq!(world.local.run_speed, 2.0);
    assert_relative_eq!(world.local.strafe_speed, 1.0);
    assert_relative_eq!(world.local.jump_impulse, 1.5);
    assert_relative_eq!(world.local.gravity_strength, 0.5);
    assert_eq!(world.local.eye_height_bounds, (0.3, 5.0));

    // The authored wall now excludes the mirror layer.
    let authored = world.scene.node(wall).unwrap().collider().unwrap();
    assert!(authored.exclude_layers.contains(layers::MIRROR));

    // The mirror is stripped: no UI node, no terrain collider component,
    // no renderer without a ghost material, colliders forced to the layer.
    let binding = system.mirror().binding().unwrap();
    let mirror_nodes = world.scene.descendants(binding.mirror);
    assert!(mirror_nodes
        .iter()
        .all(|&id| world.scene.node(id).unwrap().name != "Sign"));
    for &id in &mirror_nodes {
        let node = world.scene.node(id).unwrap();
        assert!(!node
            .components
            .iter()
            .any(|c| matches!(c, Component::TerrainCollider | Component::MeshRenderer(_))));
        if let Some(collider) = node.collider() {
            assert_eq!(collider.include_layers, layers::MIRROR);
        }
    }

    // A few ticks keep the mirror scaled and pinned around the avatar.
    world.local.position = Vector3::new(2.0, 0.0, 0.0);
    for _ in 0..5 {
        world.run_tick(&mut system, TIMESTEP);
    }
    let mirror_node = world.scene.node(binding.mirror).unwrap();
    assert_eq!(mirror_node.local_scale, Vector3::new(2.0, 2.0, 2.0));
    // pivot + (root - pivot) * world_scale, with the root at the origin.
    let pivot = system.snapshot().position;
    let expected = pivot + (Vector3::zeros() - pivot) * 2.0;
    assert_relative_eq!(mirror_node.local_position.x, expected.x, epsilon = 1e-4);
    assert_relative_eq!(mirror_node.local_position.z, expected.z, epsilon = 1e-4);

    // Growing the avatar flips the pair.
    world.set_local_eye_height(&mut system, 3.2);
    assert_relative_eq!(system.player_scale(), 2.0);
    assert_relative_eq!(system.world_scale(), 0.5);
    assert_relative_eq!(world.local.walk_speed, 4.0);

    // Disabling restores the authored masks and destroys the mirror.
    assert!(!system.set_colliders_enabled(&mut world.scene, &mut world.local, false));
    assert!(!world.scene.contains(binding.mirror));
    let authored = world.scene.node(wall).unwrap().collider().unwrap();
    assert_eq!(authored.exclude_layers, Group::NONE);
}

#[test]
fn test_rebind_moves_the_binding_cleanly() {
    let mut scene = SceneGraph::new();
    let (root_a, wall_a) = build_world(&mut scene);
    let root_b = scene.add_node("WorldB", None);
    let box_b = scene.add_node("Box", Some(root_b));
    scene.add_component(
        box_b,
        Component::Collider(ColliderState::solid(ColliderShape::Cuboid {
            half_extents: [1.0, 1.0, 1.0],
        })),
    );

    let mut system = ScaledColliderSystem::new(ScaledColliderConfig::default());
    let mut world = SimWorld::new(scene, SimAvatar::local(0.8));
    world.start(&mut system, Some(root_a));
    let mirror_a = system.mirror().binding().unwrap().mirror;

    system.rebind(&mut world.scene, &mut world.local, Some(root_b));

    // Exactly one live mirror, the old root fully untagged.
    assert!(!world.scene.contains(mirror_a));
    let binding = system.mirror().binding().unwrap();
    assert_eq!(binding.real, root_b);
    assert!(world.scene.contains(binding.mirror));
    let authored_a = world.scene.node(wall_a).unwrap().collider().unwrap();
    assert_eq!(authored_a.exclude_layers, Group::NONE);

    // The next tick gives the new mirror's geometry physics colliders.
    world.run_tick(&mut system, TIMESTEP);
    let mirror_box = world
        .scene
        .descendants(binding.mirror)
        .into_iter()
        .find(|&id| world.scene.node(id).unwrap().name == "Box")
        .unwrap();
    assert!(world.physics.has_collider_for(mirror_box));
}
