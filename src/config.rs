//! Render driver configuration.
//!
//! Loaded from TOML. Every key is optional:
//!
//! ```toml
//! parallel = true
//! max_threads = 4
//! cache_capacity = 128
//! default_tile_size = 256
//! region = { x = 0, y = 0, width = 512, height = 512 }
//! ```

use crate::core::error::ConfigError;
use crate::core::geometry::Rect;
use crate::core::grid::DEFAULT_TILE_SIZE;
use crate::graph::spec::BuildDefaults;
use crate::ops::DEFAULT_CACHE_TILES;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings for building and rendering a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// Fetch tiles on the rayon pool.
    pub parallel: bool,
    /// Worker threads for parallel renders (0 = rayon's default).
    pub max_threads: usize,
    /// Capacity of cache nodes that do not set one.
    pub cache_capacity: usize,
    /// Tile edge of leaves that do not set one.
    pub default_tile_size: i32,
    /// Render only this part of the root.
    pub region: Option<Rect>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            max_threads: 0,
            cache_capacity: DEFAULT_CACHE_TILES,
            default_tile_size: DEFAULT_TILE_SIZE,
            region: None,
        }
    }
}

impl RenderConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable/disable parallel rendering.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Set maximum threads.
    pub fn with_max_threads(mut self, max: usize) -> Self {
        self.max_threads = max;
        self
    }

    /// Set the default cache capacity in tiles.
    pub fn with_cache_capacity(mut self, tiles: usize) -> Self {
        self.cache_capacity = tiles;
        self
    }

    /// Set the default tile edge.
    pub fn with_default_tile_size(mut self, size: i32) -> Self {
        self.default_tile_size = size;
        self
    }

    /// Restrict rendering to `region`.
    pub fn with_region(mut self, region: Rect) -> Self {
        self.region = Some(region);
        self
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&text)?;
        log::debug!("loaded config from {}: {:?}", path.as_ref().display(), config);
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_tile_size <= 0 {
            return Err(ConfigError::Invalid {
                field: "default_tile_size".to_string(),
                reason: format!("must be positive, got {}", self.default_tile_size),
            });
        }
        if self.cache_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "cache_capacity".to_string(),
                reason: "must hold at least one tile".to_string(),
            });
        }
        if let Some(region) = self.region {
            if region.is_empty() {
                return Err(ConfigError::Invalid {
                    field: "region".to_string(),
                    reason: format!("{} is empty", region),
                });
            }
        }
        Ok(())
    }

    /// Defaults applied when building a graph.
    pub fn build_defaults(&self) -> BuildDefaults {
        BuildDefaults {
            tile_size: self.default_tile_size,
            cache_capacity: self.cache_capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = RenderConfig::default();
        assert!(config.parallel);
        assert_eq!(config.default_tile_size, DEFAULT_TILE_SIZE);
        assert!(config.validate().is_ok());
        assert_eq!(RenderConfig::from_toml_str("").unwrap(), config);
    }

    #[test]
    fn test_builder() {
        let config = RenderConfig::new()
            .with_parallel(false)
            .with_max_threads(2)
            .with_cache_capacity(8)
            .with_default_tile_size(32);
        assert_eq!(
            config.build_defaults(),
            BuildDefaults {
                tile_size: 32,
                cache_capacity: 8
            }
        );
        assert!(!config.parallel);
    }

    #[test]
    fn test_parse_toml() {
        let config = RenderConfig::from_toml_str(
            r#"
            parallel = false
            default_tile_size = 64
            region = { x = -4, y = 0, width = 8, height = 8 }
            "#,
        )
        .unwrap();
        assert!(!config.parallel);
        assert_eq!(config.default_tile_size, 64);
        assert_eq!(config.region, Some(Rect::new(-4, 0, 8, 8)));
        assert_eq!(config.max_threads, 0);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            RenderConfig::from_toml_str("default_tile_size = 0"),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            RenderConfig::from_toml_str("cache_capacity = 0"),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            RenderConfig::from_toml_str("tile = 3"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            RenderConfig::from_toml_str("parallel = \"yes\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_threads = 3").unwrap();
        let config = RenderConfig::load(file.path()).unwrap();
        assert_eq!(config.max_threads, 3);

        assert!(matches!(
            RenderConfig::load("/definitely/not/here.toml"),
            Err(ConfigError::Io(_))
        ));
    }
}
