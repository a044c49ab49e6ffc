//! Animation options with TOML preset support.
//!
//! Every tweakable setting (stage durations, lifecycle delays, ring and blob
//! tables) is consolidated here. Options serialize to/from TOML presets and
//! are validated once when a manager is constructed; nothing re-merges them
//! at runtime.

mod blob;
mod lifecycle;
mod ring;
mod targets;
mod timing;

use std::path::Path;

pub use blob::{BlobOptions, ParticleOptions, PulseOptions};
pub use lifecycle::LifecycleOptions;
pub use ring::{RingOptions, TextHideRule};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
pub use targets::StageTargets;
pub use timing::StageDurations;

use crate::error::OrbitError;

/// Top-level options container. All sub-structs use `#[serde(default)]` so
/// partial TOML files (e.g. only overriding `[timing]`) work correctly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(default)]
pub struct Options {
    /// Stage durations and looping.
    pub timing: StageDurations,
    /// Render gating and deferred-action delays.
    pub lifecycle: LifecycleOptions,
    /// Orbiting rings, in render order.
    pub rings: Vec<RingOptions>,
    /// Lens blob, if the page shows one.
    pub blob: Option<BlobOptions>,
    /// Size factor for narrow viewports, applied once at construction.
    #[schemars(title = "Responsive Scale", range(min = 0.1, max = 2.0))]
    pub responsive_scale: f32,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            timing: StageDurations::default(),
            lifecycle: LifecycleOptions::default(),
            rings: vec![
                RingOptions {
                    label: "inner".to_owned(),
                    ..RingOptions::default()
                },
                RingOptions {
                    label: "outer".to_owned(),
                    sphere_count: 18,
                    radius: StageTargets {
                        initial: 1.6,
                        stage1: 2.0,
                        stage2: 2.5,
                        stage3: 3.0,
                        stage4: 3.4,
                        final_value: 3.6,
                    },
                    rotation_speed: -0.18,
                    rotation_offset: std::f32::consts::FRAC_PI_6,
                    ..RingOptions::default()
                },
            ],
            blob: Some(BlobOptions::default()),
            responsive_scale: 1.0,
        }
    }
}

impl Options {
    /// Generate JSON Schema describing the UI-exposed options.
    #[must_use]
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(Options)
    }

    /// Load options from a TOML file. Missing fields use defaults.
    pub fn load(path: &Path) -> Result<Self, OrbitError> {
        let content = std::fs::read_to_string(path).map_err(OrbitError::Io)?;
        Self::from_toml(&content)
    }

    /// Parse options from a TOML string. Missing fields use defaults.
    pub fn from_toml(content: &str) -> Result<Self, OrbitError> {
        toml::from_str(content)
            .map_err(|e| OrbitError::OptionsParse(e.to_string()))
    }

    /// Save options to a TOML file (pretty-printed).
    pub fn save(&self, path: &Path) -> Result<(), OrbitError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| OrbitError::OptionsParse(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(OrbitError::Io)?;
        }
        std::fs::write(path, content).map_err(OrbitError::Io)
    }

    /// List available preset names (TOML file stems) in a directory.
    #[must_use]
    pub fn list_presets(dir: &Path) -> Vec<String> {
        let mut names = Vec::new();
        if let Ok(entries) = std::fs::read_dir(dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "toml") {
                    if let Some(stem) =
                        path.file_stem().and_then(|s| s.to_str())
                    {
                        names.push(stem.to_owned());
                    }
                }
            }
        }
        names.sort();
        names
    }

    /// Check every section; the first violation is returned.
    pub fn validate(&self) -> Result<(), OrbitError> {
        if !(self.responsive_scale.is_finite() && self.responsive_scale > 0.0) {
            return Err(OrbitError::invalid("responsive_scale", "must be > 0"));
        }
        self.timing.validate()?;
        self.lifecycle.validate()?;
        for (idx, ring) in self.rings.iter().enumerate() {
            ring.validate(idx)?;
        }
        if let Some(blob) = &self.blob {
            blob.validate()?;
        }
        Ok(())
    }
}
