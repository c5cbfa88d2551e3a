//! Reference host: owns avatars and the physics world, and translates
//! engine events into system calls. This is the adapter a real engine
//! integration replaces; tests and the CLI drive the system through it.

pub mod physics;

use nalgebra::{UnitQuaternion, Vector3};
use uuid::Uuid;

use crate::host::{Avatar, BodySpec, CollisionContact};
use crate::scene::{NodeId, SceneGraph};
use crate::system::ScaledColliderSystem;
use physics::{ContactEvent, PhysicsWorld};

/// Host-side avatar state. Fields are public so tests can inspect what the
/// system pushed through the `Avatar` seam.
#[derive(Clone, Debug)]
pub struct SimAvatar {
    pub id: Uuid,
    pub local: bool,
    pub valid: bool,
    pub eye_height: f32,
    pub position: Vector3<f32>,
    pub rotation: UnitQuaternion<f32>,
    pub velocity: Vector3<f32>,
    pub walk_speed: f32,
    pub run_speed: f32,
    pub strafe_speed: f32,
    pub jump_impulse: f32,
    pub gravity_strength: f32,
    pub voice_distance_far: f32,
    pub avatar_audio_far_radius: f32,
    pub manual_scaling_allowed: bool,
    pub eye_height_bounds: (f32, f32),
    /// Capsule setup the system installed, if any.
    pub body_spec: Option<BodySpec>,
    /// Motion command issued this tick, consumed by the host.
    pub pending_body_move: Option<Vector3<f32>>,
    /// Teleport issued this tick, consumed by the host.
    pub pending_teleport: Option<(Vector3<f32>, UnitQuaternion<f32>)>,
    /// Total teleports issued over this avatar's lifetime.
    pub teleport_count: u64,
}

impl SimAvatar {
    fn new(local: bool, eye_height: f32) -> Self {
        Self {
            id: Uuid::new_v4(),
            local,
            valid: true,
            eye_height,
            position: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
            velocity: Vector3::zeros(),
            walk_speed: 0.0,
            run_speed: 0.0,
            strafe_speed: 0.0,
            jump_impulse: 0.0,
            gravity_strength: 0.0,
            voice_distance_far: 0.0,
            avatar_audio_far_radius: 0.0,
            manual_scaling_allowed: false,
            eye_height_bounds: (0.0, 0.0),
            body_spec: None,
            pending_body_move: None,
            pending_teleport: None,
            teleport_count: 0,
        }
    }

    pub fn local(eye_height: f32) -> Self {
        Self::new(true, eye_height)
    }

    pub fn remote(eye_height: f32) -> Self {
        Self::new(false, eye_height)
    }
}

impl Avatar for SimAvatar {
    fn is_valid(&self) -> bool {
        self.valid
    }

    fn is_local(&self) -> bool {
        self.local
    }

    fn eye_height(&self) -> f32 {
        self.eye_height
    }

    fn position(&self) -> Vector3<f32> {
        self.position
    }

    fn rotation(&self) -> UnitQuaternion<f32> {
        self.rotation
    }

    fn velocity(&self) -> Vector3<f32> {
        self.velocity
    }

    fn set_velocity(&mut self, velocity: Vector3<f32>) {
        self.velocity = velocity;
    }

    fn teleport_to(&mut self, position: Vector3<f32>, rotation: UnitQuaternion<f32>) {
        self.position = position;
        self.rotation = rotation;
        self.pending_teleport = Some((position, rotation));
        self.teleport_count += 1;
    }

    fn move_body_to(&mut self, position: Vector3<f32>) {
        self.pending_body_move = Some(position);
    }

    fn walk_speed(&self) -> f32 {
        self.walk_speed
    }

    fn set_walk_speed(&mut self, speed: f32) {
        self.walk_speed = speed;
    }

    fn set_run_speed(&mut self, speed: f32) {
        self.run_speed = speed;
    }

    fn set_strafe_speed(&mut self, speed: f32) {
        self.strafe_speed = speed;
    }

    fn set_jump_impulse(&mut self, impulse: f32) {
        self.jump_impulse = impulse;
    }

    fn set_gravity_strength(&mut self, strength: f32) {
        self.gravity_strength = strength;
    }

    fn set_voice_distance_far(&mut self, meters: f32) {
        self.voice_distance_far = meters;
    }

    fn set_avatar_audio_far_radius(&mut self, meters: f32) {
        self.avatar_audio_far_radius = meters;
    }

    fn set_manual_scaling_allowed(&mut self, allowed: bool) {
        self.manual_scaling_allowed = allowed;
    }

    fn set_eye_height_bounds(&mut self, minimum: f32, maximum: f32) {
        self.eye_height_bounds = (minimum, maximum);
    }

    fn setup_body(&mut self, spec: &BodySpec) {
        self.body_spec = Some(*spec);
    }
}

/// The reference host world: one scene, one physics world, one local avatar.
pub struct SimWorld {
    pub scene: SceneGraph,
    pub physics: PhysicsWorld,
    pub local: SimAvatar,
    pub tick: u64,
}

impl SimWorld {
    pub fn new(scene: SceneGraph, local: SimAvatar) -> Self {
        Self {
            scene,
            physics: PhysicsWorld::new(),
            local,
            tick: 0,
        }
    }

    /// Starts the system and reports the local join, as an engine does when
    /// the world loads.
    pub fn start(&mut self, system: &mut ScaledColliderSystem, world_root: Option<NodeId>) {
        system.start(&mut self.scene, world_root, &mut self.local);
        system.on_player_joined(&mut self.scene, &mut self.local);
    }

    /// One host tick. The system update runs before the physics step so
    /// realignment sees this tick's starting position; collision callbacks
    /// run right after the step, before the next one. Returns the contact
    /// transitions dispatched this tick.
    pub fn run_tick(&mut self, system: &mut ScaledColliderSystem, dt: f32) -> Vec<ContactEvent> {
        system.on_physics_tick(&mut self.scene, &mut self.local);

        if self.physics.avatar_body().is_none() {
            if let Some(spec) = self.local.body_spec {
                self.physics.install_avatar(&spec, self.local.position);
            }
        }
        self.physics.sync_scene(&self.scene);
        self.apply_avatar_writes();

        let events = self.physics.step(dt);
        self.read_back_avatar();

        for event in &events {
            let contact = CollisionContact {
                impulse: event.impulse,
            };
            if event.started {
                system.on_collision_enter(&mut self.local, &contact);
            } else {
                system.on_collision_exit(&mut self.local, &contact);
            }
        }
        // Corrections issued by the callbacks land on the body immediately.
        self.apply_avatar_writes();

        self.tick += 1;
        events
    }

    /// Host-side eye-height change, forwarded like the engine callback.
    pub fn set_local_eye_height(&mut self, system: &mut ScaledColliderSystem, eye_height: f32) {
        let previous = self.local.eye_height;
        self.local.eye_height = eye_height;
        system.on_avatar_eye_height_changed(&mut self.scene, &mut self.local, previous);
    }

    fn apply_avatar_writes(&mut self) {
        if let Some((position, rotation)) = self.local.pending_teleport.take() {
            self.physics.teleport_avatar(position, rotation);
        }
        if let Some(target) = self.local.pending_body_move.take() {
            self.physics.move_avatar_to(target);
        }
        self.physics.set_avatar_velocity(self.local.velocity);
    }

    fn read_back_avatar(&mut self) {
        if let Some(position) = self.physics.avatar_position() {
            self.local.position = position;
        }
        if let Some(rotation) = self.physics.avatar_rotation() {
            self.local.rotation = rotation;
        }
        if let Some(velocity) = self.physics.avatar_velocity() {
            self.local.velocity = velocity;
        }
    }
}
