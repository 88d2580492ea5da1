use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Error;

/// Pixel dimensions used as an upper bound for overlay base images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaxSize {
    pub width: u32,
    pub height: u32,
}

impl MaxSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Editor behaviour: zoom policy, highlight and keyboard scale steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Pixels kept free around the page when fitting it into the viewport
    #[serde(default = "default_viewport_margin")]
    pub viewport_margin: f32,

    /// Viewports at or below this size (either axis) are treated as not laid out yet
    #[serde(default = "default_ready_threshold")]
    pub ready_threshold: f32,

    /// Zoom used while the viewport is not laid out
    #[serde(default = "default_fallback_zoom")]
    pub fallback_zoom: f32,

    #[serde(default = "default_min_zoom")]
    pub min_zoom: f32,

    #[serde(default = "default_max_zoom")]
    pub max_zoom: f32,

    /// Gap between an overlay and its selection highlight (display pixels)
    #[serde(default = "default_highlight_inset")]
    pub highlight_inset: f32,

    /// Multiplier applied by the `+` key
    #[serde(default = "default_zoom_in_step")]
    pub zoom_in_step: f32,

    /// Multiplier applied by the `-` key
    #[serde(default = "default_zoom_out_step")]
    pub zoom_out_step: f32,

    #[serde(default = "default_min_scale")]
    pub min_scale: f32,

    #[serde(default = "default_max_scale")]
    pub max_scale: f32,
}

const fn default_viewport_margin() -> f32 {
    20.0
}

const fn default_ready_threshold() -> f32 {
    100.0
}

const fn default_fallback_zoom() -> f32 {
    2.0
}

const fn default_min_zoom() -> f32 {
    1.0
}

const fn default_max_zoom() -> f32 {
    5.0
}

const fn default_highlight_inset() -> f32 {
    3.0
}

const fn default_zoom_in_step() -> f32 {
    1.2
}

const fn default_zoom_out_step() -> f32 {
    0.8
}

const fn default_min_scale() -> f32 {
    0.1
}

const fn default_max_scale() -> f32 {
    5.0
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            viewport_margin: default_viewport_margin(),
            ready_threshold: default_ready_threshold(),
            fallback_zoom: default_fallback_zoom(),
            min_zoom: default_min_zoom(),
            max_zoom: default_max_zoom(),
            highlight_inset: default_highlight_inset(),
            zoom_in_step: default_zoom_in_step(),
            zoom_out_step: default_zoom_out_step(),
            min_scale: default_min_scale(),
            max_scale: default_max_scale(),
        }
    }
}

/// Where new overlays land and how large their base images may be.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementConfig {
    /// Minimum distance from the page's top and left edges (points)
    #[serde(default = "default_min_margin")]
    pub min_margin: f32,

    /// Default vertical anchor as a fraction of the page height
    #[serde(default = "default_vertical_ratio")]
    pub vertical_ratio: f32,

    #[serde(default = "default_handwritten_max")]
    pub handwritten_max: MaxSize,

    /// Limit for uploaded, text and test images
    #[serde(default = "default_image_max")]
    pub image_max: MaxSize,
}

const fn default_min_margin() -> f32 {
    50.0
}

const fn default_vertical_ratio() -> f32 {
    0.7
}

const fn default_handwritten_max() -> MaxSize {
    MaxSize::new(250, 120)
}

const fn default_image_max() -> MaxSize {
    MaxSize::new(300, 150)
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            min_margin: default_min_margin(),
            vertical_ratio: default_vertical_ratio(),
            handwritten_max: default_handwritten_max(),
            image_max: default_image_max(),
        }
    }
}

/// Operation log configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogConfig {
    /// Append every notice as a JSON line to this file
    pub path: Option<PathBuf>,
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignerConfig {
    #[serde(default)]
    pub editor: EditorConfig,

    #[serde(default)]
    pub placement: PlacementConfig,

    #[serde(default)]
    pub log: LogConfig,
}

impl SignerConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::ConfigLoad(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::ConfigLoad(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from default locations (~/.config/pdf-signer/config.toml, ./config.toml)
    pub fn load() -> Self {
        if let Some(config_dir) = crate::util::config_dir() {
            let user_config = config_dir.join("pdf-signer").join("config.toml");
            if user_config.exists() {
                match Self::from_file(&user_config) {
                    Ok(config) => {
                        tracing::debug!("Loaded config from {}", user_config.display());
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        let local_config = PathBuf::from("config.toml");
        if local_config.exists() {
            match Self::from_file(&local_config) {
                Ok(config) => {
                    tracing::debug!("Loaded config from ./config.toml");
                    return config;
                }
                Err(e) => {
                    tracing::warn!("Failed to load ./config.toml: {}", e);
                }
            }
        }

        tracing::debug!("No config file found, using defaults");
        Self::default()
    }

    /// Reject bounds that would make the zoom or scale policy meaningless.
    pub fn validate(&self) -> Result<(), Error> {
        let editor = &self.editor;
        check_range("editor.min_zoom", editor.min_zoom, editor.max_zoom)?;
        check_range("editor.min_scale", editor.min_scale, editor.max_scale)?;
        check_positive("editor.fallback_zoom", editor.fallback_zoom)?;
        check_positive("editor.zoom_in_step", editor.zoom_in_step)?;
        check_positive("editor.zoom_out_step", editor.zoom_out_step)?;

        if !(0.0..=1.0).contains(&self.placement.vertical_ratio) {
            return Err(Error::ConfigInvalid {
                field: "placement.vertical_ratio".to_string(),
                reason: "must be between 0 and 1".to_string(),
            });
        }

        Ok(())
    }
}

fn check_positive(field: &str, value: f32) -> Result<(), Error> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(Error::ConfigInvalid {
            field: field.to_string(),
            reason: format!("must be positive, got {value}"),
        })
    }
}

fn check_range(field: &str, min: f32, max: f32) -> Result<(), Error> {
    check_positive(field, min)?;
    if min > max {
        return Err(Error::ConfigInvalid {
            field: field.to_string(),
            reason: format!("lower bound {min} exceeds upper bound {max}"),
        });
    }
    Ok(())
}
