//! Loading episode arrays from `.npy` files.
//!
//! Images are expected as (N, H, W, C) and proprio as (N, J), all `f32`.
//! Shape agreement across files is checked later by the window builder.

use crate::core::Episode;
use ndarray::{Array2, Array3, Array4};
use ndarray_npy::{read_npy, ReadNpyExt};
use std::path::{Path, PathBuf};

/// Locations of the arrays making up one episode.
#[derive(Debug, Clone)]
pub struct EpisodePaths {
    pub primary: PathBuf,
    pub proprio: PathBuf,
    pub wrist: Option<PathBuf>,
}

impl EpisodePaths {
    pub fn new(primary: impl Into<PathBuf>, proprio: impl Into<PathBuf>) -> Self {
        Self {
            primary: primary.into(),
            proprio: proprio.into(),
            wrist: None,
        }
    }

    pub fn with_wrist(mut self, wrist: impl Into<PathBuf>) -> Self {
        self.wrist = Some(wrist.into());
        self
    }
}

/// Errors that can occur while reading arrays.
#[derive(Debug)]
pub enum SourceError {
    /// File is missing
    NotFound(PathBuf),
    /// File exists but is not a readable array of the expected type and rank
    Read { path: PathBuf, message: String },
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::NotFound(path) => write!(f, "Array file not found: {path:?}"),
            SourceError::Read { path, message } => {
                write!(f, "Failed to read {path:?}: {message}")
            }
        }
    }
}

impl std::error::Error for SourceError {}

fn read_array<T: ReadNpyExt>(path: &Path) -> Result<T, SourceError> {
    if !path.exists() {
        return Err(SourceError::NotFound(path.to_path_buf()));
    }

    read_npy(path).map_err(|e| SourceError::Read {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Load an episode from its `.npy` files.
pub fn load_episode(paths: &EpisodePaths) -> Result<Episode, SourceError> {
    let primary: Array4<f32> = read_array(&paths.primary)?;
    let proprio: Array2<f32> = read_array(&paths.proprio)?;

    let mut episode = Episode::new(primary, proprio);
    if let Some(ref wrist_path) = paths.wrist {
        let wrist: Array4<f32> = read_array(wrist_path)?;
        episode = episode.with_wrist(wrist);
    }

    tracing::debug!(
        timesteps = episode.len(),
        wrist = episode.has_wrist(),
        "Loaded episode arrays"
    );

    Ok(episode)
}

/// Load a single (H, W, C) goal image.
pub fn load_goal_image(path: &Path) -> Result<Array3<f32>, SourceError> {
    read_array(path)
}
