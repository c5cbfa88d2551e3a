//! Avatar scale derivation and the parameters that follow from it.

use log::warn;

use crate::config::ScaledColliderConfig;
use crate::host::Avatar;
use crate::mirror::WorldMirror;
use crate::scene::SceneGraph;

/// Current scale pair. `player_scale * world_scale == 1` always holds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScaleState {
    /// Avatar eye height over the configured base eye height.
    pub player_scale: f32,
    /// Inverse of `player_scale`; the mirror's uniform scale.
    pub world_scale: f32,
}

impl ScaleState {
    pub fn one_to_one() -> Self {
        Self {
            player_scale: 1.0,
            world_scale: 1.0,
        }
    }

    /// Scale pair for an avatar of `eye_height` against `base_eye_height`.
    /// Returns None for degenerate (non-positive) readings.
    pub fn from_eye_height(eye_height: f32, base_eye_height: f32) -> Option<Self> {
        if eye_height <= 0.0 || base_eye_height <= 0.0 {
            return None;
        }
        let player_scale = eye_height / base_eye_height;
        Some(Self {
            player_scale,
            world_scale: 1.0 / player_scale,
        })
    }

    /// Collision corrections only apply below 1:1.
    pub fn is_shrunk(&self) -> bool {
        self.player_scale < 1.0
    }
}

impl Default for ScaleState {
    fn default() -> Self {
        Self::one_to_one()
    }
}

/// Recomputes scale state and pushes the derived parameters to the host.
#[derive(Debug, Default)]
pub struct ScaleController {
    state: ScaleState,
}

impl ScaleController {
    pub fn new() -> Self {
        Self {
            state: ScaleState::one_to_one(),
        }
    }

    pub fn state(&self) -> ScaleState {
        self.state
    }

    pub fn player_scale(&self) -> f32 {
        self.state.player_scale
    }

    pub fn world_scale(&self) -> f32 {
        self.state.world_scale
    }

    /// Re-derives the local avatar's scale and reapplies everything that
    /// depends on it: movement parameters, then mirror scale and alignment
    /// when a mirror is live. A degenerate eye-height reading skips the
    /// recompute entirely, keeping the last valid scale.
    pub fn recompute_local_scale(
        &mut self,
        scene: &mut SceneGraph,
        mirror: &WorldMirror,
        avatar: &mut dyn Avatar,
        config: &ScaledColliderConfig,
    ) {
        let eye_height = avatar.eye_height();
        let Some(state) = ScaleState::from_eye_height(eye_height, config.base_eye_height) else {
            warn!("skipping rescale: degenerate eye height reading {eye_height}");
            return;
        };
        self.state = state;
        self.apply_local_movement(avatar, config);
        if !config.enable_scaled_colliders || !mirror.is_bound() {
            return;
        }
        mirror.set_uniform_scale(scene, state.world_scale);
        mirror.realign(scene, avatar.position(), state.world_scale);
    }

    /// Pushes walk/run/strafe/jump/gravity to the host, scaled by the
    /// player scale when scaled movement is enabled, unscaled otherwise.
    pub fn apply_local_movement(&self, avatar: &mut dyn Avatar, config: &ScaledColliderConfig) {
        let scale = if config.enable_scaled_movement {
            self.state.player_scale
        } else {
            1.0
        };
        avatar.set_walk_speed(config.base_walk_speed * scale);
        avatar.set_run_speed(config.base_run_speed * scale);
        avatar.set_strafe_speed(config.base_strafe_speed * scale);
        avatar.set_jump_impulse(config.base_jump_impulse * scale);
        avatar.set_gravity_strength(config.base_player_gravity * scale);
    }

    /// Scales a remote avatar's audio falloff from its own eye height.
    /// Movement is untouched: remote motion is simulated by the host.
    pub fn apply_remote_scale(&self, avatar: &mut dyn Avatar, config: &ScaledColliderConfig) {
        let Some(remote) = ScaleState::from_eye_height(avatar.eye_height(), config.base_eye_height)
        else {
            return;
        };
        if !config.enable_scaled_sounds {
            return;
        }
        avatar.set_voice_distance_far(remote.player_scale * config.base_voice_distance);
        avatar.set_avatar_audio_far_radius(remote.player_scale * config.base_avatar_audio_distance);
    }
}
