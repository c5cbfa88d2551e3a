//! Top-level driver wiring host events to scale, mirror, and guard.
//!
//! The host adapter translates engine callbacks into the methods below.
//! Ordered to ride the host solver correctly: the tick update must run
//! before the avatar's physics integration in the same step, so mirror
//! realignment reflects the tick's starting position rather than lagging a
//! frame behind it.

use log::debug;

use crate::config::ScaledColliderConfig;
use crate::guard;
use crate::host::{Avatar, BodySpec, CollisionContact, KinematicSnapshot};
use crate::mirror::WorldMirror;
use crate::scale::ScaleController;
use crate::scene::{NodeId, SceneGraph};

/// The scaled collider system. One instance serves one local avatar.
pub struct ScaledColliderSystem {
    config: ScaledColliderConfig,
    scale: ScaleController,
    mirror: WorldMirror,
    snapshot: KinematicSnapshot,
    world_root: Option<NodeId>,
}

impl ScaledColliderSystem {
    pub fn new(config: ScaledColliderConfig) -> Self {
        Self {
            config,
            scale: ScaleController::new(),
            mirror: WorldMirror::new(),
            snapshot: KinematicSnapshot::new(),
            world_root: None,
        }
    }

    pub fn config(&self) -> &ScaledColliderConfig {
        &self.config
    }

    pub fn colliders_enabled(&self) -> bool {
        self.config.enable_scaled_colliders
    }

    pub fn mirror(&self) -> &WorldMirror {
        &self.mirror
    }

    pub fn snapshot(&self) -> &KinematicSnapshot {
        &self.snapshot
    }

    pub fn player_scale(&self) -> f32 {
        self.scale.player_scale()
    }

    pub fn world_scale(&self) -> f32 {
        self.scale.world_scale()
    }

    /// One-time setup for the local avatar: size permissions and bounds,
    /// base movement parameters, the capsule body, the initial binding.
    pub fn start(
        &mut self,
        scene: &mut SceneGraph,
        world_root: Option<NodeId>,
        local: &mut dyn Avatar,
    ) {
        if !local.is_valid() {
            return;
        }
        self.apply_size_settings(local);
        self.scale.apply_local_movement(local, &self.config);
        local.setup_body(&BodySpec::avatar_default());
        self.rebind(scene, local, world_root);
    }

    pub fn on_player_joined(&mut self, scene: &mut SceneGraph, avatar: &mut dyn Avatar) {
        if !avatar.is_valid() {
            return;
        }
        if avatar.is_local() {
            self.apply_size_settings(avatar);
            self.scale
                .recompute_local_scale(scene, &self.mirror, avatar, &self.config);
        } else {
            self.scale.apply_remote_scale(avatar, &self.config);
        }
    }

    pub fn on_player_respawn(&mut self, scene: &mut SceneGraph, avatar: &mut dyn Avatar) {
        // Respawn reapplies the same settings a join does.
        self.on_player_joined(scene, avatar);
    }

    pub fn on_avatar_changed(&mut self, scene: &mut SceneGraph, avatar: &mut dyn Avatar) {
        if !avatar.is_valid() {
            return;
        }
        if avatar.is_local() {
            self.scale
                .recompute_local_scale(scene, &self.mirror, avatar, &self.config);
        } else {
            self.scale.apply_remote_scale(avatar, &self.config);
        }
    }

    pub fn on_avatar_eye_height_changed(
        &mut self,
        scene: &mut SceneGraph,
        avatar: &mut dyn Avatar,
        _previous_height: f32,
    ) {
        self.on_avatar_changed(scene, avatar);
    }

    /// Per-tick update, in run-early order: snapshot, realign, motion
    /// command. Inactive while disabled, unbound, or without a valid local
    /// avatar.
    pub fn on_physics_tick(&mut self, scene: &mut SceneGraph, local: &mut dyn Avatar) {
        if !self.config.enable_scaled_colliders || !self.mirror.is_bound() || !local.is_valid() {
            return;
        }
        if self.config.preview_mode {
            self.scale
                .recompute_local_scale(scene, &self.mirror, local, &self.config);
        }
        self.snapshot.capture(local);
        self.mirror
            .realign(scene, self.snapshot.position, self.scale.world_scale());
        local.move_body_to(self.snapshot.position);
    }

    pub fn on_collision_enter(&mut self, local: &mut dyn Avatar, contact: &CollisionContact) {
        if !local.is_valid() {
            return;
        }
        guard::on_collision_enter(self.scale.state(), &self.snapshot, local, contact);
    }

    pub fn on_collision_exit(&mut self, local: &mut dyn Avatar, _contact: &CollisionContact) {
        if !local.is_valid() {
            return;
        }
        guard::on_collision_exit(self.scale.state(), &self.snapshot, local);
    }

    /// Enables or disables the collider system, returning the effective
    /// state. Enabling with nothing to bind reports `false`: the feature
    /// turns itself off instead of erroring.
    pub fn set_colliders_enabled(
        &mut self,
        scene: &mut SceneGraph,
        local: &mut dyn Avatar,
        state: bool,
    ) -> bool {
        if self.world_root.is_none() {
            self.config.enable_scaled_colliders = false;
            return false;
        }
        self.config.enable_scaled_colliders = state;
        if state {
            self.rebind(scene, local, None);
        } else {
            self.mirror.unbind(scene);
        }
        self.config.enable_scaled_colliders
    }

    /// Toggles ghost rendering, rebuilding the mirror when the system is
    /// live so the ghost visuals take effect immediately.
    pub fn set_ghosts_enabled(
        &mut self,
        scene: &mut SceneGraph,
        local: &mut dyn Avatar,
        state: bool,
    ) -> bool {
        self.config.show_collider_ghosts = state;
        if self.config.enable_scaled_colliders {
            self.rebind(scene, local, None);
        }
        self.config.show_collider_ghosts
    }

    /// (Re)binds the mirror against `new_root`, or the current root when
    /// `None`. The old root is untagged and its mirror destroyed before the
    /// new binding exists. With nothing to bind, the feature disables
    /// itself.
    pub fn rebind(
        &mut self,
        scene: &mut SceneGraph,
        local: &mut dyn Avatar,
        new_root: Option<NodeId>,
    ) {
        match new_root {
            Some(root) if scene.contains(root) => self.world_root = Some(root),
            Some(root) => {
                debug!("cannot bind missing world root {root:?}; disabling");
                self.config.enable_scaled_colliders = false;
                return;
            }
            None => {}
        }
        let Some(root) = self.world_root else {
            self.config.enable_scaled_colliders = false;
            return;
        };
        let ghost = self.ghost_material();
        if !self.mirror.bind(scene, root, ghost.as_deref()) {
            self.config.enable_scaled_colliders = false;
            return;
        }
        self.scale
            .recompute_local_scale(scene, &self.mirror, local, &self.config);
    }

    fn ghost_material(&self) -> Option<String> {
        if self.config.show_collider_ghosts {
            self.config.ghost_material.clone()
        } else {
            None
        }
    }

    fn apply_size_settings(&self, avatar: &mut dyn Avatar) {
        avatar.set_manual_scaling_allowed(self.config.manual_scaling_allowed);
        avatar.set_eye_height_bounds(self.config.minimum_eye_height, self.config.maximum_eye_height);
    }
}
