//! Avatar body and collision-layer constants.
//! Centralizing these prevents bugs from duplicated hardcoded values.

/// Avatar capsule body
pub mod avatar {
    /// Capsule collider total height in meters
    pub const CAPSULE_HEIGHT: f32 = 1.6;

    /// Capsule collider radius in meters
    pub const CAPSULE_RADIUS: f32 = 0.2;

    /// Capsule center height above the avatar's feet
    pub const CAPSULE_CENTER_Y: f32 = 0.8;
}

/// Collision layers
pub mod layers {
    use rapier3d::geometry::Group;

    /// The layer reserved for mirror geometry and the avatar capsule.
    /// Authored geometry gets this layer excluded while a binding is live;
    /// mirror geometry collides on this layer and nothing else.
    pub const MIRROR: Group = Group::GROUP_11;
}

/// Math tolerances
pub mod math {
    /// Small epsilon for float comparisons and safe normalization
    pub const EPSILON: f32 = 0.001;
}

/// Simulation host defaults
pub mod sim {
    /// Fixed timestep for the reference host (60 Hz)
    pub const TIMESTEP: f32 = 1.0 / 60.0;
}
