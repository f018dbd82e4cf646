use std::path::Path;

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use terraquad_common::BoundingQuad;
use terraquad_lod::LodConfig;
use terraquad_occupancy::OccupancyConfig;

/// Height-grid size times world units per sample.
const DEFAULT_WORLD_EXTENT: f32 = 512.0 * 15.0;

/// Everything the CLI needs to build both indices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerraquadConfig {
    pub world: BoundingQuad,
    pub lod: LodConfig,
    pub occupancy: OccupancyConfig,
}

impl Default for TerraquadConfig {
    fn default() -> Self {
        Self {
            world: BoundingQuad::centered(DEFAULT_WORLD_EXTENT),
            lod: LodConfig::default(),
            occupancy: OccupancyConfig::default(),
        }
    }
}

impl TerraquadConfig {
    /// Load from a YAML (`.yaml`/`.yml`) or JSON (`.json`) file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let parsed = match ext.as_deref() {
            Some("yaml" | "yml") => Self::from_yaml(&text),
            Some("json") => Self::from_json(&text),
            _ => bail!("unsupported config format: {}", path.display()),
        };
        parsed.with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_yaml(text: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_terrain_layout() {
        let config = TerraquadConfig::default();
        assert_eq!(config.world, BoundingQuad::new(-3840.0, 3840.0, -3840.0, 3840.0));
        assert_eq!(config.lod.max_depth, 5);
        assert_eq!(config.occupancy.threshold, 4);
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = TerraquadConfig::from_yaml(
            "lod:\n  max_depth: 7\noccupancy:\n  threshold: 2\n",
        )
        .unwrap();
        assert_eq!(config.lod.max_depth, 7);
        assert_eq!(config.lod.grid_width, 512);
        assert_eq!(config.occupancy.threshold, 2);
        assert_eq!(config.world, TerraquadConfig::default().world);
    }

    #[test]
    fn json_world_box() {
        let config = TerraquadConfig::from_json(
            r#"{"world": {"top": -10, "bottom": 10, "left": -20, "right": 20}}"#,
        )
        .unwrap();
        assert_eq!(config.world.width(), 40.0);
        assert_eq!(config.world.height(), 20.0);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let tmp = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        let err = TerraquadConfig::load(tmp.path()).unwrap_err();
        assert!(format!("{err:#}").contains("unsupported config format"));
    }

    #[test]
    fn load_yaml_file() {
        let mut tmp = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        std::io::Write::write_all(&mut tmp, b"occupancy:\n  max_depth: 9\n").unwrap();
        let config = TerraquadConfig::load(tmp.path()).unwrap();
        assert_eq!(config.occupancy.max_depth, 9);
        assert_eq!(config.lod, LodConfig::default());
    }

    #[test]
    fn missing_file_reports_path() {
        let err = TerraquadConfig::load(Path::new("/nonexistent/terraquad.yaml")).unwrap_err();
        assert!(err.to_string().contains("terraquad.yaml"));
    }
}
