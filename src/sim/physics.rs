//! Wrapper around the Rapier physics world backing the reference host.
//! Syncs scene colliders into parentless fixed colliders, owns the avatar
//! capsule body, and reports capsule contact transitions after each step.

use std::collections::HashMap;

use crossbeam_channel::Receiver;
use nalgebra::{UnitQuaternion, Vector3};
use rapier3d::prelude::*;

use crate::constants::{layers, math};
use crate::host::BodySpec;
use crate::scene::{ColliderShape, ColliderState, NodeId, SceneGraph};

/// A capsule contact transition reported by the solver.
#[derive(Clone, Copy, Debug)]
pub struct ContactEvent {
    /// Scene node behind the other collider, when it is scene geometry.
    pub node: Option<NodeId>,
    /// True on contact start, false on contact stop.
    pub started: bool,
    /// Aggregate contact impulse at start; zero on stop (the pair is gone).
    pub impulse: Vector3<f32>,
}

pub struct PhysicsWorld {
    pub gravity: Vector<Real>,
    pub rigid_body_set: RigidBodySet,
    pub collider_set: ColliderSet,
    pub integration_parameters: IntegrationParameters,
    pub physics_pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub impulse_joint_set: ImpulseJointSet,
    pub multibody_joint_set: MultibodyJointSet,
    pub ccd_solver: CCDSolver,
    pub query_pipeline: QueryPipeline,

    /// Maps scene nodes to their collider handles.
    node_to_collider: HashMap<NodeId, ColliderHandle>,
    /// Reverse lookup for contact reporting.
    collider_to_node: HashMap<ColliderHandle, NodeId>,
    /// World scale each collider's shape was last built at.
    node_scale: HashMap<NodeId, f32>,
    avatar_body: Option<RigidBodyHandle>,
    avatar_collider: Option<ColliderHandle>,

    event_collector: ChannelEventCollector,
    collision_events: Receiver<CollisionEvent>,
    _contact_force_events: Receiver<ContactForceEvent>,
}

impl PhysicsWorld {
    pub fn new() -> Self {
        let (collision_send, collision_events) = crossbeam_channel::unbounded();
        let (force_send, contact_force_events) = crossbeam_channel::unbounded();
        Self {
            gravity: vector![0.0, -9.81, 0.0],
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            integration_parameters: IntegrationParameters::default(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            node_to_collider: HashMap::new(),
            collider_to_node: HashMap::new(),
            node_scale: HashMap::new(),
            avatar_body: None,
            avatar_collider: None,
            event_collector: ChannelEventCollector::new(collision_send, force_send),
            collision_events,
            _contact_force_events: contact_force_events,
        }
    }

    pub fn avatar_body(&self) -> Option<RigidBodyHandle> {
        self.avatar_body
    }

    pub fn has_collider_for(&self, node: NodeId) -> bool {
        self.node_to_collider.contains_key(&node)
    }

    /// Mirrors scene colliders into the collider set: creates handles for
    /// new nodes, refreshes transforms and masks for existing ones, and
    /// drops handles whose nodes are gone.
    pub fn sync_scene(&mut self, scene: &SceneGraph) {
        let stale: Vec<NodeId> = self
            .node_to_collider
            .keys()
            .filter(|&&id| {
                !scene.contains(id) || scene.node(id).and_then(|n| n.collider()).is_none()
            })
            .copied()
            .collect();
        for id in stale {
            self.remove_scene_collider(id);
        }

        for id in scene.node_ids() {
            let Some(node) = scene.node(id) else { continue };
            let Some(state) = node.collider() else { continue };
            let Some(world) = scene.world_transform(id) else { continue };
            let position = Isometry::from_parts(world.position.into(), world.rotation);

            match self.node_to_collider.get(&id).copied() {
                None => {
                    let collider = ColliderBuilder::new(build_shape(&state.shape, world.scale))
                        .position(position)
                        .sensor(state.is_trigger)
                        .collision_groups(interaction_groups(state))
                        .active_events(ActiveEvents::COLLISION_EVENTS)
                        .build();
                    let handle = self.collider_set.insert(collider);
                    self.node_to_collider.insert(id, handle);
                    self.collider_to_node.insert(handle, id);
                    self.node_scale.insert(id, world.scale);
                }
                Some(handle) => {
                    let Some(collider) = self.collider_set.get_mut(handle) else {
                        continue;
                    };
                    collider.set_position(position);
                    collider.set_collision_groups(interaction_groups(state));
                    collider.set_sensor(state.is_trigger);
                    let last_scale = self.node_scale.get(&id).copied().unwrap_or(1.0);
                    if (world.scale - last_scale).abs() > math::EPSILON {
                        collider.set_shape(build_shape(&state.shape, world.scale));
                        self.node_scale.insert(id, world.scale);
                    }
                }
            }
        }
    }

    fn remove_scene_collider(&mut self, id: NodeId) {
        let Some(handle) = self.node_to_collider.remove(&id) else { return };
        self.collider_to_node.remove(&handle);
        self.node_scale.remove(&id);
        self.collider_set.remove(
            handle,
            &mut self.island_manager,
            &mut self.rigid_body_set,
            true,
        );
    }

    /// Installs the avatar capsule described by `spec` at `position`.
    /// The body is dynamic so the solver resolves contacts for it;
    /// rotation locking and gravity follow `spec`.
    pub fn install_avatar(&mut self, spec: &BodySpec, position: Vector3<f32>) {
        let mut builder = RigidBodyBuilder::dynamic()
            .translation(position)
            .gravity_scale(if spec.use_gravity { 1.0 } else { 0.0 });
        if spec.freeze_rotation {
            builder = builder.lock_rotations();
        }
        let body_handle = self.rigid_body_set.insert(builder.build());

        let half_height = (spec.capsule_height - 2.0 * spec.capsule_radius).max(0.0) / 2.0;
        let collider = ColliderBuilder::capsule_y(half_height, spec.capsule_radius)
            .translation(vector![0.0, spec.capsule_center_y, 0.0])
            .collision_groups(InteractionGroups::new(layers::MIRROR, Group::ALL))
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .build();
        let collider_handle =
            self.collider_set
                .insert_with_parent(collider, body_handle, &mut self.rigid_body_set);

        self.avatar_body = Some(body_handle);
        self.avatar_collider = Some(collider_handle);
    }

    /// Solver-visible motion command, the non-teleporting move.
    pub fn move_avatar_to(&mut self, position: Vector3<f32>) {
        let Some(handle) = self.avatar_body else { return };
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.set_translation(position, true);
        }
    }

    pub fn teleport_avatar(&mut self, position: Vector3<f32>, rotation: UnitQuaternion<f32>) {
        let Some(handle) = self.avatar_body else { return };
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.set_translation(position, true);
            body.set_rotation(rotation, true);
        }
    }

    pub fn set_avatar_velocity(&mut self, velocity: Vector3<f32>) {
        let Some(handle) = self.avatar_body else { return };
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.set_linvel(velocity, true);
        }
    }

    pub fn avatar_position(&self) -> Option<Vector3<f32>> {
        let body = self.rigid_body_set.get(self.avatar_body?)?;
        Some(*body.translation())
    }

    pub fn avatar_rotation(&self) -> Option<UnitQuaternion<f32>> {
        let body = self.rigid_body_set.get(self.avatar_body?)?;
        Some(*body.rotation())
    }

    pub fn avatar_velocity(&self) -> Option<Vector3<f32>> {
        let body = self.rigid_body_set.get(self.avatar_body?)?;
        Some(*body.linvel())
    }

    /// Steps the simulation by `dt` seconds and returns the avatar capsule's
    /// contact transitions for this step.
    pub fn step(&mut self, dt: f32) -> Vec<ContactEvent> {
        self.integration_parameters.dt = dt;
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &self.event_collector,
        );

        let mut events = Vec::new();
        while let Ok(event) = self.collision_events.try_recv() {
            let (first, second, started) = match event {
                CollisionEvent::Started(first, second, _) => (first, second, true),
                CollisionEvent::Stopped(first, second, _) => (first, second, false),
            };
            let other = if Some(first) == self.avatar_collider {
                second
            } else if Some(second) == self.avatar_collider {
                first
            } else {
                continue;
            };
            let impulse = if started {
                self.contact_impulse(first, second)
            } else {
                Vector3::zeros()
            };
            events.push(ContactEvent {
                node: self.collider_to_node.get(&other).copied(),
                started,
                impulse,
            });
        }
        events
    }

    /// Sums manifold impulses along their normals for one contact pair.
    fn contact_impulse(&self, first: ColliderHandle, second: ColliderHandle) -> Vector3<f32> {
        let Some(pair) = self.narrow_phase.contact_pair(first, second) else {
            return Vector3::zeros();
        };
        let mut total = Vector3::zeros();
        for manifold in &pair.manifolds {
            let impulse_sum: f32 = manifold.points.iter().map(|p| p.data.impulse).sum();
            total += manifold.data.normal * impulse_sum;
        }
        total
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds a shape from scene collider data at a given world scale.
fn build_shape(shape: &ColliderShape, scale: f32) -> SharedShape {
    match *shape {
        ColliderShape::Cuboid { half_extents } => SharedShape::cuboid(
            half_extents[0] * scale,
            half_extents[1] * scale,
            half_extents[2] * scale,
        ),
        ColliderShape::Ball { radius } => SharedShape::ball(radius * scale),
        ColliderShape::Cylinder {
            half_height,
            radius,
        } => SharedShape::cylinder(half_height * scale, radius * scale),
    }
}

/// Maps a collider's include/exclude masks onto an interaction filter.
/// Inclusion wins over exclusion for the layers it names.
fn interaction_groups(collider: &ColliderState) -> InteractionGroups {
    let filter = collider.include_layers | (Group::ALL & !collider.exclude_layers);
    InteractionGroups::new(collider.layer, filter)
}
