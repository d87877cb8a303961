// Configuration for the particle field

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

use crate::error::{FieldError, FieldResult};
use crate::types::Rgba;

pub const DEFAULT_CONFIG_PATHS: [&str; 3] = ["config.yaml", "config.yml", "config.json"];

// Fixed at start; a running field never re-reads its configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    // Pool
    pub particle_count: usize,
    pub min_radius: f32,
    pub max_radius: f32,
    pub colors: Vec<Rgba>,

    // Connections
    pub max_distance: f32,
    pub max_connections: usize,
    pub line_width: f32,

    // Motion
    pub speed_multiplier: f32,
    pub turbulence: f32,
    pub launch_speed_multiplier: f32,
    pub recycle: bool,

    // Timing (milliseconds)
    pub play_once: bool,
    pub duration_ms: f64,
    pub launch_phase_ms: f64,

    // Appearance
    pub fade_in_step: f32,
    pub glow_alpha: f32,
    pub trail_color: Rgba,
    pub launch_flash: bool,

    // Optional fade-out after stopping
    pub fade_out: bool,
    pub fade_out_step: f32,

    // Window
    pub window_width: u32,
    pub window_height: u32,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            particle_count: 120,
            min_radius: 2.0,
            max_radius: 6.0,
            colors: vec![
                Rgba::new(108, 99, 255, 0.8),
                Rgba::new(255, 101, 132, 0.8),
                Rgba::new(255, 255, 255, 0.8),
            ],
            max_distance: 100.0,
            max_connections: 5,
            line_width: 1.5,
            speed_multiplier: 1.5,
            turbulence: 0.3,
            launch_speed_multiplier: 3.0,
            recycle: true,
            play_once: true,
            duration_ms: 4000.0,
            launch_phase_ms: 1000.0,
            fade_in_step: 0.03,
            glow_alpha: 0.3,
            trail_color: Rgba::new(10, 10, 10, 0.1),
            launch_flash: true,
            fade_out: false,
            fade_out_step: 0.02,
            window_width: 1280,
            window_height: 720,
        }
    }
}

impl FieldConfig {
    /// Load a YAML or JSON file, chosen by extension (YAML when unknown).
    pub fn from_file(path: impl AsRef<Path>) -> FieldResult<Self> {
        let path = path.as_ref();
        let shown = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|source| FieldError::ConfigIo {
            path: shown.clone(),
            source,
        })?;

        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let config: FieldConfig = if is_json {
            serde_json::from_str(&text).map_err(|e| FieldError::ConfigParse {
                path: shown.clone(),
                message: e.to_string(),
            })?
        } else {
            serde_yaml::from_str(&text).map_err(|e| FieldError::ConfigParse {
                path: shown.clone(),
                message: e.to_string(),
            })?
        };

        config.validate()?;
        info!(path = %shown, "loaded configuration");
        Ok(config)
    }

    /// First readable file among [`DEFAULT_CONFIG_PATHS`], else defaults.
    pub fn from_default_paths() -> Self {
        for candidate in DEFAULT_CONFIG_PATHS {
            if !Path::new(candidate).exists() {
                continue;
            }
            match Self::from_file(candidate) {
                Ok(config) => return config,
                Err(e) => warn!(error = %e, "ignoring config file, using defaults"),
            }
        }
        Self::default()
    }

    pub fn validate(&self) -> FieldResult<()> {
        let fail = |msg: String| Err(FieldError::InvalidConfig(msg));

        if self.colors.is_empty() {
            return fail("colors must not be empty".into());
        }
        if let Some(c) = self.colors.iter().find(|c| !(0.0..=1.0).contains(&c.a)) {
            return fail(format!("color alpha {} outside 0..=1", c.a));
        }
        if !(0.0..=1.0).contains(&self.glow_alpha) || !(0.0..=1.0).contains(&self.trail_color.a) {
            return fail("glow_alpha and trail_color alpha must be within 0..=1".into());
        }
        if !(self.min_radius >= 0.0) || !(self.min_radius <= self.max_radius) {
            return fail(format!(
                "radius range {}..{} is not valid",
                self.min_radius, self.max_radius
            ));
        }
        if !(self.max_distance > 0.0) {
            return fail("max_distance must be positive".into());
        }
        // NaN fails every comparison, so these are written as negated `>=`
        let non_negative = [
            ("line_width", self.line_width),
            ("turbulence", self.turbulence),
            ("speed_multiplier", self.speed_multiplier),
            ("launch_speed_multiplier", self.launch_speed_multiplier),
        ];
        if let Some((name, value)) = non_negative.iter().find(|(_, v)| !(*v >= 0.0)) {
            return fail(format!("{} must be >= 0, got {}", name, value));
        }
        if !(self.fade_in_step > 0.0) || !(self.fade_out_step > 0.0) {
            return fail("fade steps must be positive".into());
        }
        if !(self.duration_ms >= 0.0) || !(self.launch_phase_ms >= 0.0) {
            return fail("durations must be >= 0".into());
        }
        Ok(())
    }
}
