use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Tunable layout and interaction constants.
///
/// Every field has a default, so a config file only needs to name the values
/// it overrides.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Distance between stacked depth layers along the view axis.
    pub layer_spacing: f32,
    /// Pushes depth layers slightly in front of the enclosing box so clicks land on the layer.
    pub depth_layer_offset: f32,
    /// Depth-layer plane size at zoom level zero.
    pub container_width: f32,
    pub container_height: f32,
    pub resize_factor: f32,
    pub move_factor: f32,
    pub min_scale: f32,
    pub handle_size: f32,
    /// How far in front of the camera root-level objects are spawned.
    pub spawn_distance: f32,
    pub fov_y_degrees: f32,
    pub move_speed: f32,
    pub aim_speed: f32,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            layer_spacing: 1.0,
            depth_layer_offset: 0.01,
            container_width: 4.0,
            container_height: 2.25,
            resize_factor: 0.01,
            move_factor: 0.004,
            min_scale: 0.01,
            handle_size: 0.2,
            spawn_distance: 2.0,
            fov_y_degrees: 80.0,
            move_speed: 1.5,
            aim_speed: 1.8,
        }
    }
}

impl EditorConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::EditorConfig;

    #[test]
    fn partial_override_keeps_defaults() {
        let config = EditorConfig::from_json_str(r#"{ "layer_spacing": 0.5 }"#).unwrap();
        assert_eq!(config.layer_spacing, 0.5);
        assert_eq!(config.move_factor, EditorConfig::default().move_factor);
        assert_eq!(config.container_width, 4.0);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(EditorConfig::from_json_str("{ layer_spacing: ").is_err());
    }
}
