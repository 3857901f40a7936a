// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Fabgraph Contributors

//! Engine configuration system

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file, looked up in the working directory
pub const CONFIG_FILE: &str = "fabgraph.toml";

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Voxels per model unit for render regions
    pub scale: f64,
    /// Upper bound on the sample count of a render region
    pub max_voxels: u64,
    /// Z extent used when rendering expressions that are flat in Z
    pub flat_depth: f64,
    /// Worker pool size for the render queue
    pub render_threads: Option<usize>,
    /// Line advance for text, in glyph heights
    pub text_line_spacing: f64,
    /// Default tracing filter
    pub log_filter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scale: 10.0,
            max_voxels: 1 << 24,
            flat_depth: 0.0,
            render_threads: None, // Auto-detect
            text_line_spacing: 1.2,
            log_filter: "info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config: EngineConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {:?}", path.as_ref()))?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides
    pub fn load() -> Result<Self> {
        let mut config = if PathBuf::from(CONFIG_FILE).exists() {
            Self::from_file(CONFIG_FILE)?
        } else {
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `FABGRAPH_*` overrides read through `lookup`
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(scale) = lookup("FABGRAPH_SCALE") {
            self.scale = scale
                .parse()
                .with_context(|| format!("Invalid FABGRAPH_SCALE: {scale}"))?;
            self.validate()
                .with_context(|| format!("Invalid FABGRAPH_SCALE: {scale}"))?;
        }

        if let Some(max_voxels) = lookup("FABGRAPH_MAX_VOXELS") {
            self.max_voxels = max_voxels
                .parse()
                .with_context(|| format!("Invalid FABGRAPH_MAX_VOXELS: {max_voxels}"))?;
        }

        if let Some(threads) = lookup("FABGRAPH_RENDER_THREADS") {
            self.render_threads = threads.parse().ok();
        }

        if let Some(filter) = lookup("FABGRAPH_LOG") {
            self.log_filter = filter;
        }

        Ok(())
    }

    /// Reject values no render region can be built from
    pub fn validate(&self) -> Result<()> {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            bail!("scale must be a finite positive number, got {}", self.scale);
        }
        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config file: {:?}", path.as_ref()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);

        let config = EngineConfig {
            scale: 25.0,
            render_threads: Some(3),
            ..Default::default()
        };
        config.save(&path).unwrap();

        assert_eq!(EngineConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "flat_depth = 0.5\n").unwrap();

        let config = EngineConfig::from_file(&path).unwrap();
        assert_eq!(config.flat_depth, 0.5);
        assert_eq!(config.scale, 10.0);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("FABGRAPH_SCALE", "4"),
            ("FABGRAPH_RENDER_THREADS", "auto"),
            ("FABGRAPH_LOG", "fabgraph=trace"),
        ]
        .into_iter()
        .collect();

        let mut config = EngineConfig::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.scale, 4.0);
        assert_eq!(config.render_threads, None);
        assert_eq!(config.log_filter, "fabgraph=trace");

        let bad = config.apply_overrides(|key| (key == "FABGRAPH_MAX_VOXELS").then(|| "lots".to_string()));
        assert!(bad.is_err());
    }

    #[test]
    fn test_scale_must_be_finite_and_positive() {
        for value in ["inf", "-inf", "NaN", "0", "-2"] {
            let mut config = EngineConfig::default();
            let result = config.apply_overrides(|key| (key == "FABGRAPH_SCALE").then(|| value.to_string()));
            assert!(result.is_err(), "accepted FABGRAPH_SCALE={value}");
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inf.toml");
        std::fs::write(&path, "scale = inf\n").unwrap();
        assert!(EngineConfig::from_file(&path).is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(EngineConfig::from_file(dir.path().join("absent.toml")).is_err());
    }
}
