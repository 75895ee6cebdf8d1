//! Raster processors driving the GDAL command-line tools.

use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::config::ToolPaths;
use super::tool::ToolCommand;
use super::{ProcessingConfig, ProcessingError, ProcessingJob, Processor};

/// One entry of `metadata.SUBDATASETS` in `gdalinfo -json` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subdataset {
    pub name: String,
    pub description: String,
}

/// Extract subdatasets, in index order, from `gdalinfo -json` output.
pub fn parse_subdatasets(gdalinfo_json: &str) -> Result<Vec<Subdataset>, ProcessingError> {
    let info: Value = serde_json::from_str(gdalinfo_json)
        .map_err(|e| ProcessingError::InvalidOutput(format!("gdalinfo: {}", e)))?;
    let Some(entries) = info
        .pointer("/metadata/SUBDATASETS")
        .and_then(Value::as_object)
    else {
        return Ok(Vec::new());
    };

    let mut subdatasets = Vec::new();
    for index in 1.. {
        let Some(name) = entries
            .get(&format!("SUBDATASET_{}_NAME", index))
            .and_then(Value::as_str)
        else {
            break;
        };
        let description = entries
            .get(&format!("SUBDATASET_{}_DESC", index))
            .and_then(Value::as_str)
            .unwrap_or_default();
        subdatasets.push(Subdataset {
            name: name.to_string(),
            description: description.to_string(),
        });
    }
    Ok(subdatasets)
}

struct Gdal {
    tools: ToolPaths,
    timeout_secs: u64,
}

impl Gdal {
    fn from_config(config: &ProcessingConfig) -> Self {
        Self {
            tools: config.tools.clone(),
            timeout_secs: config.timeout_secs,
        }
    }

    async fn subdatasets(&self, dataset: &str, source: &Path) -> Result<Vec<Subdataset>, ProcessingError> {
        let json = ToolCommand::new(&self.tools.gdalinfo, self.timeout_secs)
            .arg("-json")
            .arg(dataset)
            .run()
            .await?;
        let subdatasets = parse_subdatasets(&json)?;
        if subdatasets.is_empty() {
            return Err(ProcessingError::NoSubdatasets {
                source_path: source.to_path_buf(),
            });
        }
        Ok(subdatasets)
    }

    fn warp(&self) -> ToolCommand {
        ToolCommand::new(&self.tools.gdalwarp, self.timeout_secs).args(["-overwrite", "-of", "GTiff"])
    }

    fn translate(&self) -> ToolCommand {
        ToolCommand::new(&self.tools.gdal_translate, self.timeout_secs)
    }
}

fn cutline_args(shape: Option<&Path>) -> Vec<String> {
    match shape {
        Some(shape) => vec![
            "-cutline".to_string(),
            shape.display().to_string(),
            "-crop_to_cutline".to_string(),
        ],
        None => Vec::new(),
    }
}

async fn prepare(dir: &Path, title: &str) -> Result<PathBuf, ProcessingError> {
    tokio::fs::create_dir_all(dir).await?;
    Ok(dir.join(format!("{}.tiff", title)))
}

/// Optical products: first subdataset, scaled to an 8-bit RGB GeoTIFF,
/// then cut per shape into `<area>[_<shape>]/<title>.tiff`.
pub struct Sentinel2Processor {
    gdal: Gdal,
}

impl Sentinel2Processor {
    pub fn new(config: &ProcessingConfig) -> Self {
        Self {
            gdal: Gdal::from_config(config),
        }
    }
}

#[async_trait]
impl Processor for Sentinel2Processor {
    fn name(&self) -> &str {
        "sentinel2"
    }

    async fn process(&self, job: &ProcessingJob) -> Result<Vec<PathBuf>, ProcessingError> {
        let source = job.source.display().to_string();
        let subdatasets = self.gdal.subdatasets(&source, &job.source).await?;
        let first = &subdatasets[0];
        info!(title = %job.title, subdataset = %first.description, "Reading subdataset");

        tokio::fs::create_dir_all(&job.output_dir).await?;
        let rgb = job.output_dir.join(format!(".{}.rgb.tiff", job.title));
        self.gdal
            .translate()
            .args(["-of", "GTiff", "-ot", "Byte", "-scale"])
            .args(["-b", "1", "-b", "2", "-b", "3"])
            .args(["-co", "COMPRESS=DEFLATE"])
            .arg(&first.name)
            .arg(&rgb)
            .run()
            .await?;

        let mut produced = Vec::new();
        let result = async {
            for shape in &job.shapes {
                let dir = job.output_dir.join(job.output_prefix(shape.as_deref()));
                let destination = prepare(&dir, &job.title).await?;
                self.gdal
                    .warp()
                    .args(cutline_args(shape.as_deref()))
                    .arg(&rgb)
                    .arg(&destination)
                    .run()
                    .await?;
                debug!(output = %destination.display(), "Warped");
                produced.push(destination);
            }
            Ok::<_, ProcessingError>(())
        }
        .await;

        let _ = tokio::fs::remove_file(&rgb).await;
        result?;
        Ok(produced)
    }
}

/// Radar products: HH and HV subdatasets of the zipped SAFE, warped to the
/// configured projection and resolution into
/// `<area>[_<shape>]/<pol>/<title>.tiff`.
pub struct Sentinel1Processor {
    gdal: Gdal,
    srs: String,
    resolution: f64,
}

impl Sentinel1Processor {
    pub const POLARISATIONS: [&'static str; 2] = ["HH", "HV"];

    pub fn new(config: &ProcessingConfig) -> Self {
        Self {
            gdal: Gdal::from_config(config),
            srs: config.radar_srs.clone(),
            resolution: config.radar_resolution,
        }
    }

    /// Pick the subdataset for a polarisation, falling back to position.
    fn select<'a>(subdatasets: &'a [Subdataset], index: usize, pol: &str) -> Option<&'a Subdataset> {
        subdatasets
            .iter()
            .find(|s| s.description.contains(pol) || s.name.contains(pol))
            .or_else(|| subdatasets.get(index))
    }
}

#[async_trait]
impl Processor for Sentinel1Processor {
    fn name(&self) -> &str {
        "sentinel1"
    }

    async fn process(&self, job: &ProcessingJob) -> Result<Vec<PathBuf>, ProcessingError> {
        let safe = format!(
            "/vsizip/{}/{}.SAFE/manifest.safe",
            job.source.display(),
            job.title
        );
        let subdatasets = self.gdal.subdatasets(&safe, &job.source).await?;
        let resolution = self.resolution.to_string();

        let mut produced = Vec::new();
        for (index, pol) in Self::POLARISATIONS.iter().enumerate() {
            let Some(subdataset) = Self::select(&subdatasets, index, pol) else {
                debug!(title = %job.title, polarisation = pol, "Polarisation not present");
                continue;
            };
            info!(title = %job.title, polarisation = pol, "Warping polarisation");

            for shape in &job.shapes {
                let dir = job
                    .output_dir
                    .join(job.output_prefix(shape.as_deref()))
                    .join(pol.to_lowercase());
                let destination = prepare(&dir, &job.title).await?;
                self.gdal
                    .warp()
                    .args(["-t_srs", self.srs.as_str()])
                    .args(["-tr", resolution.as_str(), resolution.as_str()])
                    .args(["-co", "COMPRESS=DEFLATE"])
                    .args(cutline_args(shape.as_deref()))
                    .arg(&subdataset.name)
                    .arg(&destination)
                    .run()
                    .await?;
                produced.push(destination);
            }
        }
        Ok(produced)
    }
}
