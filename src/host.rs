//! The host-engine seam: every primitive the system consumes from the
//! engine that owns avatars and their rigid bodies.

use nalgebra::{UnitQuaternion, Vector3};

use crate::constants::avatar;

/// One-time rigid-body setup the orchestrator installs on the local avatar.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodySpec {
    pub capsule_height: f32,
    pub capsule_radius: f32,
    /// Capsule center height above the avatar's feet.
    pub capsule_center_y: f32,
    pub use_gravity: bool,
    pub freeze_rotation: bool,
}

impl BodySpec {
    /// The standard avatar capsule. Host gravity stays off for this body;
    /// the avatar's own gravity is applied through the movement parameters.
    pub fn avatar_default() -> Self {
        Self {
            capsule_height: avatar::CAPSULE_HEIGHT,
            capsule_radius: avatar::CAPSULE_RADIUS,
            capsule_center_y: avatar::CAPSULE_CENTER_Y,
            use_gravity: false,
            freeze_rotation: true,
        }
    }
}

/// Avatar kinematics captured once at the start of a physics tick.
/// Valid for that tick only; the next capture overwrites it.
#[derive(Clone, Copy, Debug)]
pub struct KinematicSnapshot {
    /// Position at capture time, before any correction this tick.
    pub position: Vector3<f32>,
    /// Position of the previous capture.
    pub last_position: Vector3<f32>,
    pub rotation: UnitQuaternion<f32>,
    pub velocity: Vector3<f32>,
}

impl KinematicSnapshot {
    pub fn new() -> Self {
        Self {
            position: Vector3::zeros(),
            last_position: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
            velocity: Vector3::zeros(),
        }
    }

    /// Shifts the previous capture into `last_position` and records the
    /// avatar's current kinematics.
    pub fn capture(&mut self, avatar: &dyn Avatar) {
        self.last_position = self.position;
        self.position = avatar.position();
        self.rotation = avatar.rotation();
        self.velocity = avatar.velocity();
    }
}

impl Default for KinematicSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

/// A collision reported by the host for the avatar capsule.
#[derive(Clone, Copy, Debug)]
pub struct CollisionContact {
    /// Aggregate contact impulse. Only its direction matters to the
    /// corrections; a near-zero impulse leaves velocity untouched.
    pub impulse: Vector3<f32>,
}

/// Host avatar primitives. The host owns every value behind these setters;
/// the system only writes values derived from its own scale state.
pub trait Avatar {
    fn is_valid(&self) -> bool;
    fn is_local(&self) -> bool;

    /// Eye height in meters. The host enforces a positive minimum, but
    /// transiently invalid readings are still possible and must be skipped.
    fn eye_height(&self) -> f32;

    fn position(&self) -> Vector3<f32>;
    fn rotation(&self) -> UnitQuaternion<f32>;
    fn velocity(&self) -> Vector3<f32>;
    fn set_velocity(&mut self, velocity: Vector3<f32>);

    /// Immediate teleport, bypassing the rigid-body solver.
    fn teleport_to(&mut self, position: Vector3<f32>, rotation: UnitQuaternion<f32>);

    /// Non-teleporting motion command routed through the solver.
    fn move_body_to(&mut self, position: Vector3<f32>);

    fn walk_speed(&self) -> f32;
    fn set_walk_speed(&mut self, speed: f32);
    fn set_run_speed(&mut self, speed: f32);
    fn set_strafe_speed(&mut self, speed: f32);
    fn set_jump_impulse(&mut self, impulse: f32);
    fn set_gravity_strength(&mut self, strength: f32);

    fn set_voice_distance_far(&mut self, meters: f32);
    fn set_avatar_audio_far_radius(&mut self, meters: f32);

    fn set_manual_scaling_allowed(&mut self, allowed: bool);
    fn set_eye_height_bounds(&mut self, minimum: f32, maximum: f32);

    /// Installs the capsule rigid body described by `spec`.
    fn setup_body(&mut self, spec: &BodySpec);
}
