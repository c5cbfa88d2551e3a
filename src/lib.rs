//! Scaled collider system
//!
//! Lets an avatar occupy a world at an arbitrary personal scale while
//! colliding against geometry authored at a single fixed scale. Instead of
//! resizing the world or the physics, the system keeps an inversely-scaled
//! mirror copy of the collidable geometry aligned under the avatar's
//! capsule, excludes the authored geometry from the capsule's collision
//! layer, and corrects the solver artifacts that show up at small scales.

pub mod config;
pub mod constants;
pub mod guard;
pub mod host;
pub mod mirror;
pub mod scale;
pub mod scene;
pub mod sim;
pub mod system;
pub mod tagger;

pub use config::{ConfigError, ScaledColliderConfig};
pub use host::{Avatar, BodySpec, CollisionContact, KinematicSnapshot};
pub use scale::ScaleState;
pub use system::ScaledColliderSystem;
