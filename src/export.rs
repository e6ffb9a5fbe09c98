//! Writing built samples to disk as stacked `.npy` arrays.
//!
//! Every observation field is stacked along a new leading sample axis and
//! written to its own file. The task is constant across one build, so its
//! images are written once. A `manifest.json` records shapes and provenance.

use crate::core::{Sample, Task};
use chrono::Utc;
use ndarray::{stack, ArrayView, Axis, Dimension, RemoveAxis};
use ndarray_npy::{write_npy, WritableElement};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// The name of this producer.
pub const PRODUCER_NAME: &str = "episode-windower";

/// File name of the manifest inside an export directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Producer metadata recorded in the manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Producer {
    pub name: String,
    pub version: String,
}

impl Default for Producer {
    fn default() -> Self {
        Self {
            name: PRODUCER_NAME.to_string(),
            version: crate::VERSION.to_string(),
        }
    }
}

/// One written array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayEntry {
    /// File name relative to the export directory
    pub file: String,
    pub shape: Vec<usize>,
}

/// Description of one export directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportManifest {
    /// Unique identifier of this export (UUID v4)
    pub run_id: String,
    /// When the export was written (RFC3339)
    pub created_at_utc: String,
    pub producer: Producer,
    pub num_samples: usize,
    pub window_length: usize,
    /// `image` or `language`
    pub goal_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_instruction: Option<String>,
    /// Written arrays keyed by field name (e.g. `observation.proprio`)
    pub arrays: BTreeMap<String, ArrayEntry>,
}

impl ExportManifest {
    /// Read a manifest back from an export directory.
    pub fn load(dir: &Path) -> Result<Self, ExportError> {
        let content = std::fs::read_to_string(dir.join(MANIFEST_FILE))
            .map_err(|e| ExportError::Io(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| ExportError::Serialize(e.to_string()))
    }
}

/// Errors that can occur while exporting samples.
#[derive(Debug)]
pub enum ExportError {
    /// Nothing to export
    Empty,
    /// Samples do not share one shape layout or one task
    Inconsistent(String),
    Io(String),
    Write { path: PathBuf, message: String },
    Serialize(String),
}

impl std::fmt::Display for ExportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportError::Empty => write!(f, "No samples to export"),
            ExportError::Inconsistent(e) => write!(f, "Inconsistent samples: {e}"),
            ExportError::Io(e) => write!(f, "IO error: {e}"),
            ExportError::Write { path, message } => {
                write!(f, "Failed to write {path:?}: {message}")
            }
            ExportError::Serialize(e) => write!(f, "Serialize error: {e}"),
        }
    }
}

impl std::error::Error for ExportError {}

/// Accumulates written arrays for the manifest.
struct ArrayWriter<'a> {
    dir: &'a Path,
    arrays: BTreeMap<String, ArrayEntry>,
}

impl<'a> ArrayWriter<'a> {
    fn new(dir: &'a Path) -> Self {
        Self {
            dir,
            arrays: BTreeMap::new(),
        }
    }

    /// Stack `views` along a new leading axis and write them.
    fn write_stacked<A, D>(
        &mut self,
        field: &str,
        views: &[ArrayView<'_, A, D>],
    ) -> Result<(), ExportError>
    where
        A: WritableElement + Clone,
        D: Dimension,
        D::Larger: RemoveAxis,
    {
        let stacked = stack(Axis(0), views)
            .map_err(|e| ExportError::Inconsistent(format!("{field}: {e}")))?;
        self.write(field, stacked.view())
    }

    fn write<A, D>(&mut self, field: &str, array: ArrayView<'_, A, D>) -> Result<(), ExportError>
    where
        A: WritableElement,
        D: Dimension,
    {
        let file = format!("{}.npy", field.replace('.', "_"));
        let path = self.dir.join(&file);

        write_npy(&path, &array).map_err(|e| ExportError::Write {
            path: path.clone(),
            message: e.to_string(),
        })?;

        tracing::debug!(field, shape = ?array.shape(), "Wrote array");
        self.arrays.insert(
            field.to_string(),
            ArrayEntry {
                file,
                shape: array.shape().to_vec(),
            },
        );
        Ok(())
    }
}

/// Export the samples of one build into `dir`, creating it if needed.
pub fn export_samples(samples: &[Sample], dir: &Path) -> Result<ExportManifest, ExportError> {
    let first = samples.first().ok_or(ExportError::Empty)?;

    if samples.iter().any(|s| s.task != first.task) {
        return Err(ExportError::Inconsistent(
            "samples carry different tasks".to_string(),
        ));
    }

    let wrist: Vec<_> = samples
        .iter()
        .filter_map(|s| s.observation.image_wrist.as_ref().map(|a| a.view()))
        .collect();
    if !wrist.is_empty() && wrist.len() != samples.len() {
        return Err(ExportError::Inconsistent(
            "wrist images present in only some samples".to_string(),
        ));
    }

    std::fs::create_dir_all(dir).map_err(|e| ExportError::Io(e.to_string()))?;
    let mut writer = ArrayWriter::new(dir);

    let primary: Vec<_> = samples
        .iter()
        .map(|s| s.observation.image_primary.view())
        .collect();
    writer.write_stacked("observation.image_primary", &primary)?;

    if !wrist.is_empty() {
        writer.write_stacked("observation.image_wrist", &wrist)?;
    }

    let proprio: Vec<_> = samples.iter().map(|s| s.observation.proprio.view()).collect();
    writer.write_stacked("observation.proprio", &proprio)?;

    let timestep: Vec<_> = samples
        .iter()
        .map(|s| s.observation.timestep.view())
        .collect();
    writer.write_stacked("observation.timestep", &timestep)?;

    let language_instruction = match &first.task {
        Task::Image {
            image_primary,
            image_wrist,
        } => {
            writer.write("task.image_primary", image_primary.view())?;
            if let Some(image_wrist) = image_wrist {
                writer.write("task.image_wrist", image_wrist.view())?;
            }
            None
        }
        Task::Language {
            language_instruction,
        } => Some(language_instruction.clone()),
    };

    let manifest = ExportManifest {
        run_id: Uuid::new_v4().to_string(),
        created_at_utc: Utc::now().to_rfc3339(),
        producer: Producer::default(),
        num_samples: samples.len(),
        window_length: first.window_length(),
        goal_type: first.task.kind().to_string(),
        language_instruction,
        arrays: writer.arrays,
    };

    let json = serde_json::to_string_pretty(&manifest)
        .map_err(|e| ExportError::Serialize(e.to_string()))?;
    std::fs::write(dir.join(MANIFEST_FILE), json).map_err(|e| ExportError::Io(e.to_string()))?;

    tracing::info!(
        samples = manifest.num_samples,
        dir = %dir.display(),
        "Exported samples"
    );

    Ok(manifest)
}
