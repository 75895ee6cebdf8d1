//! Configuration for the processing module.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Which processor handles a platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessorKind {
    Sentinel1,
    Sentinel2,
    /// Run the dataset's processing graphs with `gpt`.
    Graph,
}

/// External tool locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolPaths {
    #[serde(default = "default_gdalinfo")]
    pub gdalinfo: PathBuf,
    #[serde(default = "default_gdal_translate")]
    pub gdal_translate: PathBuf,
    #[serde(default = "default_gdalwarp")]
    pub gdalwarp: PathBuf,
    #[serde(default = "default_gpt")]
    pub gpt: PathBuf,
}

fn default_gdalinfo() -> PathBuf {
    PathBuf::from("gdalinfo")
}

fn default_gdal_translate() -> PathBuf {
    PathBuf::from("gdal_translate")
}

fn default_gdalwarp() -> PathBuf {
    PathBuf::from("gdalwarp")
}

fn default_gpt() -> PathBuf {
    PathBuf::from("gpt")
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            gdalinfo: default_gdalinfo(),
            gdal_translate: default_gdal_translate(),
            gdalwarp: default_gdalwarp(),
            gpt: default_gpt(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Platform name (as in the `platformname` predicate) to processor.
    #[serde(default = "default_platforms")]
    pub platforms: BTreeMap<String, ProcessorKind>,

    #[serde(default)]
    pub tools: ToolPaths,

    /// Timeout for a single tool invocation in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Target projection for radar products.
    #[serde(default = "default_radar_srs")]
    pub radar_srs: String,

    /// Target resolution for radar products, in metres.
    #[serde(default = "default_radar_resolution")]
    pub radar_resolution: f64,
}

fn default_platforms() -> BTreeMap<String, ProcessorKind> {
    BTreeMap::from([
        ("Sentinel-1".to_string(), ProcessorKind::Sentinel1),
        ("Sentinel-2".to_string(), ProcessorKind::Sentinel2),
    ])
}

fn default_timeout() -> u64 {
    3600
}

fn default_radar_srs() -> String {
    "EPSG:32640".to_string()
}

fn default_radar_resolution() -> f64 {
    40.0
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            platforms: default_platforms(),
            tools: ToolPaths::default(),
            timeout_secs: default_timeout(),
            radar_srs: default_radar_srs(),
            radar_resolution: default_radar_resolution(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: ProcessingConfig = toml::from_str("").unwrap();
        assert_eq!(
            config.platforms.get("Sentinel-2"),
            Some(&ProcessorKind::Sentinel2)
        );
        assert_eq!(config.tools.gdalwarp, PathBuf::from("gdalwarp"));
        assert_eq!(config.radar_srs, "EPSG:32640");
        assert_eq!(config.timeout_secs, 3600);
    }

    #[test]
    fn test_custom_platforms() {
        let toml = r#"
timeout_secs = 60

[platforms]
"Sentinel-1" = "graph"
"Sentinel-3" = "graph"

[tools]
gpt = "/opt/snap/bin/gpt"
"#;
        let config: ProcessingConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.platforms.len(), 2);
        assert_eq!(config.platforms["Sentinel-1"], ProcessorKind::Graph);
        assert_eq!(config.tools.gpt, PathBuf::from("/opt/snap/bin/gpt"));
        assert_eq!(config.tools.gdalinfo, PathBuf::from("gdalinfo"));
    }
}
