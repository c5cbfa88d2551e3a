//! System configuration parsing from scaling.toml files

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Scaled collider system configuration.
/// Every field has a default so an empty file is a valid configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ScaledColliderConfig {
    /// Enables/disables the scaled collider system.
    #[serde(default = "default_true")]
    pub enable_scaled_colliders: bool,
    /// Name of the authored root node containing the collidable world.
    /// For performance, only collidable geometry belongs under this root.
    #[serde(default)]
    pub world_root: Option<String>,
    /// Eye height in meters at which the world is 1-to-1.
    #[serde(default = "default_base_eye_height")]
    pub base_eye_height: f32,

    /// Allow avatars to set their own scale within the eye-height bounds.
    #[serde(default = "default_true")]
    pub manual_scaling_allowed: bool,
    /// Smallest manually selectable eye height in meters. Scales below
    /// ~0.3m trade away some collision stability.
    #[serde(default = "default_minimum_eye_height")]
    pub minimum_eye_height: f32,
    /// Largest manually selectable eye height in meters.
    #[serde(default = "default_maximum_eye_height")]
    pub maximum_eye_height: f32,

    /// Scale movement (walking, jumping, fall speed) with avatar scale.
    #[serde(default = "default_true")]
    pub enable_scaled_movement: bool,
    #[serde(default = "default_base_walk_speed")]
    pub base_walk_speed: f32,
    #[serde(default = "default_base_run_speed")]
    pub base_run_speed: f32,
    #[serde(default = "default_base_strafe_speed")]
    pub base_strafe_speed: f32,
    #[serde(default = "default_base_jump_impulse")]
    pub base_jump_impulse: f32,
    #[serde(default = "default_base_player_gravity")]
    pub base_player_gravity: f32,

    /// Scale avatar sounds (voice and avatar audio) with avatar scale.
    #[serde(default = "default_true")]
    pub enable_scaled_sounds: bool,
    /// Meters away a voice can be heard at scale 1.
    #[serde(default = "default_base_voice_distance")]
    pub base_voice_distance: f32,
    /// Meters away avatar audio can be heard at scale 1.
    #[serde(default = "default_base_avatar_audio_distance")]
    pub base_avatar_audio_distance: f32,

    /// Render mirror colliders with `ghost_material`, for debugging.
    #[serde(default)]
    pub show_collider_ghosts: bool,
    /// Material shown on mirror colliders that usually carry a mesh.
    /// A semi-transparent material is recommended.
    #[serde(default)]
    pub ghost_material: Option<String>,
    /// Recompute the local scale every tick, for live preview setups.
    #[serde(default)]
    pub preview_mode: bool,
}

fn default_true() -> bool {
    true
}

fn default_base_eye_height() -> f32 {
    1.6
}

fn default_minimum_eye_height() -> f32 {
    0.3
}

fn default_maximum_eye_height() -> f32 {
    5.0
}

fn default_base_walk_speed() -> f32 {
    2.0
}

fn default_base_run_speed() -> f32 {
    4.0
}

fn default_base_strafe_speed() -> f32 {
    2.0
}

fn default_base_jump_impulse() -> f32 {
    3.0
}

fn default_base_player_gravity() -> f32 {
    1.0
}

fn default_base_voice_distance() -> f32 {
    25.0
}

fn default_base_avatar_audio_distance() -> f32 {
    40.0
}

impl Default for ScaledColliderConfig {
    fn default() -> Self {
        Self {
            enable_scaled_colliders: true,
            world_root: None,
            base_eye_height: default_base_eye_height(),
            manual_scaling_allowed: true,
            minimum_eye_height: default_minimum_eye_height(),
            maximum_eye_height: default_maximum_eye_height(),
            enable_scaled_movement: true,
            base_walk_speed: default_base_walk_speed(),
            base_run_speed: default_base_run_speed(),
            base_strafe_speed: default_base_strafe_speed(),
            base_jump_impulse: default_base_jump_impulse(),
            base_player_gravity: default_base_player_gravity(),
            enable_scaled_sounds: true,
            base_voice_distance: default_base_voice_distance(),
            base_avatar_audio_distance: default_base_avatar_audio_distance(),
            show_collider_ghosts: false,
            ghost_material: None,
            preview_mode: false,
        }
    }
}

impl ScaledColliderConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))
    }

    /// Load configuration from a directory containing scaling.toml
    pub fn from_dir(dir: &Path) -> Result<Self, ConfigError> {
        Self::from_file(&dir.join("scaling.toml"))
    }
}

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),
    #[error("failed to parse {0}: {1}")]
    Parse(PathBuf, #[source] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_config_uses_defaults() {
        let config: ScaledColliderConfig = toml::from_str("").unwrap();
        assert!(config.enable_scaled_colliders);
        assert_eq!(config.base_eye_height, 1.6);
        assert_eq!(config.base_walk_speed, 2.0);
        assert_eq!(config.base_voice_distance, 25.0);
        assert!(!config.show_collider_ghosts);
        assert!(config.ghost_material.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            enable_scaled_colliders = true
            world_root = "World"
            base_eye_height = 1.8
            manual_scaling_allowed = false
            minimum_eye_height = 0.5
            maximum_eye_height = 10.0
            base_walk_speed = 3.0
            show_collider_ghosts = true
            ghost_material = "GhostBlue"
        "#;
        let config: ScaledColliderConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.world_root.as_deref(), Some("World"));
        assert_eq!(config.base_eye_height, 1.8);
        assert!(!config.manual_scaling_allowed);
        assert_eq!(config.maximum_eye_height, 10.0);
        assert_eq!(config.base_walk_speed, 3.0);
        assert!(config.show_collider_ghosts);
        assert_eq!(config.ghost_material.as_deref(), Some("GhostBlue"));
        // Untouched fields keep their defaults.
        assert_eq!(config.base_run_speed, 4.0);
        assert!(config.enable_scaled_sounds);
    }

    #[test]
    fn test_default_matches_empty_toml() {
        let parsed: ScaledColliderConfig = toml::from_str("").unwrap();
        let built = ScaledColliderConfig::default();
        assert_eq!(parsed.base_jump_impulse, built.base_jump_impulse);
        assert_eq!(
            parsed.base_avatar_audio_distance,
            built.base_avatar_audio_distance
        );
        assert_eq!(parsed.preview_mode, built.preview_mode);
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        let err =
            ScaledColliderConfig::from_file(Path::new("/nonexistent/scaling.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_, _)));
    }
}
