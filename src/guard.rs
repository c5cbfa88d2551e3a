//! Collision corrections for shrunk avatars.
//!
//! A capsule much smaller than the tolerances of the geometry it collides
//! with tunnels on entry and picks up outsized solver velocity on exit.
//! Entry pulls the body halfway back toward the pre-collision snapshot and
//! strips the velocity component that drove into the surface; exit clamps
//! residual horizontal speed down to the avatar's own walk speed. Neither
//! fires at or above 1:1 scale.

use nalgebra::Vector3;

use crate::constants::math;
use crate::host::{Avatar, CollisionContact, KinematicSnapshot};
use crate::scale::ScaleState;

/// Removes from `vector` its component along `direction`.
/// A direction too short to normalize leaves the vector unchanged.
pub fn reject(vector: Vector3<f32>, direction: Vector3<f32>) -> Vector3<f32> {
    match direction.try_normalize(math::EPSILON) {
        Some(dir) => vector - dir * vector.dot(&dir),
        None => vector,
    }
}

/// Collision-enter correction. Teleports to the 50/50 blend of snapshot and
/// current position at the snapshot rotation, then rejects the contact
/// impulse direction out of the snapshot velocity so tangential sliding
/// survives while the into-surface component dies.
pub fn on_collision_enter(
    state: ScaleState,
    snapshot: &KinematicSnapshot,
    avatar: &mut dyn Avatar,
    contact: &CollisionContact,
) {
    if !state.is_shrunk() {
        return;
    }
    let blended = (snapshot.position + avatar.position()) * 0.5;
    avatar.teleport_to(blended, snapshot.rotation);
    avatar.set_velocity(reject(snapshot.velocity, contact.impulse));
}

/// Collision-exit correction. If the snapshot's horizontal speed exceeds
/// the avatar's current (already scaled) walk speed, teleports to the
/// midpoint and clamps the horizontal components to walk speed, preserving
/// the vertical component and the horizontal direction.
pub fn on_collision_exit(state: ScaleState, snapshot: &KinematicSnapshot, avatar: &mut dyn Avatar) {
    if !state.is_shrunk() {
        return;
    }
    let velocity = snapshot.velocity;
    let horizontal = (velocity.x * velocity.x + velocity.z * velocity.z).sqrt();
    let walk_speed = avatar.walk_speed();
    if horizontal <= walk_speed {
        return;
    }
    let midpoint = (snapshot.position + avatar.position()) * 0.5;
    avatar.teleport_to(midpoint, snapshot.rotation);
    avatar.set_velocity(Vector3::new(
        velocity.x / horizontal * walk_speed,
        velocity.y,
        velocity.z / horizontal * walk_speed,
    ));
}
