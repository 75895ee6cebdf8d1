use std::path::{Path, PathBuf};

/// One snapshot to process against one area and its cutting shapes.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingJob {
    /// The synced artifact.
    pub source: PathBuf,
    /// Dataset output directory.
    pub output_dir: PathBuf,
    /// Area file the snapshot was found for.
    pub area: PathBuf,
    /// Cutting shapes; `None` means the uncut area.
    pub shapes: Vec<Option<PathBuf>>,
    /// Processing graphs for the graph processor.
    pub graphs: Vec<PathBuf>,
    /// Product title, used for output file names.
    pub title: String,
}

impl ProcessingJob {
    pub fn new(source: impl Into<PathBuf>, output_dir: impl Into<PathBuf>, area: impl Into<PathBuf>) -> Self {
        let source = source.into();
        let title = title_of(&source);
        Self {
            source,
            output_dir: output_dir.into(),
            area: area.into(),
            shapes: vec![None],
            graphs: Vec::new(),
            title,
        }
    }

    pub fn with_shapes(mut self, shapes: Vec<Option<PathBuf>>) -> Self {
        self.shapes = if shapes.is_empty() { vec![None] } else { shapes };
        self
    }

    pub fn with_graphs(mut self, graphs: Vec<PathBuf>) -> Self {
        self.graphs = graphs;
        self
    }

    pub fn area_name(&self) -> String {
        stem(&self.area)
    }

    /// `<area>` or `<area>_<shape>`.
    pub fn output_prefix(&self, shape: Option<&Path>) -> String {
        match shape {
            Some(shape) => format!("{}_{}", self.area_name(), stem(shape)),
            None => self.area_name(),
        }
    }
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string()
}

/// Title of an artifact: its file name without the extension.
pub fn title_of(path: &Path) -> String {
    stem(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_prefix() {
        let job = ProcessingJob::new("/data/S2A_X.zip", "/out/ds", "/in/ds/field.geojson");
        assert_eq!(job.title, "S2A_X");
        assert_eq!(job.output_prefix(None), "field");
        assert_eq!(
            job.output_prefix(Some(Path::new("/in/ds/north.shp"))),
            "field_north"
        );
    }

    #[test]
    fn test_empty_shapes_mean_uncut() {
        let job = ProcessingJob::new("a.zip", "out", "area.geojson").with_shapes(vec![]);
        assert_eq!(job.shapes, vec![None]);
    }
}
