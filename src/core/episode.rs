//! Episode types: the raw, time-ordered arrays a window is cut from.
//!
//! Timestep `i` of every array refers to the same real-world instant. The
//! wrist camera is optional; when it is absent nothing downstream invents it.

use super::WindowError;
use ndarray::{Array2, Array4, ArrayView3};

/// One recorded trajectory of `N` timesteps.
#[derive(Debug, Clone, PartialEq)]
pub struct Episode {
    /// Primary camera frames, shape (N, H1, W1, C)
    pub primary_images: Array4<f32>,
    /// Wrist camera frames, shape (N, H2, W2, C)
    pub wrist_images: Option<Array4<f32>>,
    /// Proprioceptive features, shape (N, J)
    pub proprio: Array2<f32>,
}

impl Episode {
    /// Create an episode without a wrist camera.
    pub fn new(primary_images: Array4<f32>, proprio: Array2<f32>) -> Self {
        Self {
            primary_images,
            wrist_images: None,
            proprio,
        }
    }

    /// Attach wrist camera frames.
    pub fn with_wrist(mut self, wrist_images: Array4<f32>) -> Self {
        self.wrist_images = Some(wrist_images);
        self
    }

    /// Number of timesteps, taken from the primary camera.
    pub fn len(&self) -> usize {
        self.primary_images.shape()[0]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_wrist(&self) -> bool {
        self.wrist_images.is_some()
    }

    /// Primary frame at the final timestep, if any.
    pub fn last_primary(&self) -> Option<ArrayView3<'_, f32>> {
        let n = self.len();
        (n > 0).then(|| self.primary_images.index_axis(ndarray::Axis(0), n - 1))
    }

    /// Wrist frame at the final timestep, if the wrist camera is present.
    pub fn last_wrist(&self) -> Option<ArrayView3<'_, f32>> {
        let wrist = self.wrist_images.as_ref()?;
        let n = wrist.shape()[0];
        (n > 0).then(|| wrist.index_axis(ndarray::Axis(0), n - 1))
    }

    /// Check that every present array covers the same timesteps.
    ///
    /// Per-timestep shapes are uniform by construction of the n-d arrays, so
    /// only the leading (time) axis needs comparing.
    pub fn validate(&self) -> Result<(), WindowError> {
        let n = self.len();

        let proprio_len = self.proprio.shape()[0];
        if proprio_len != n {
            return Err(WindowError::InvalidEpisode(format!(
                "proprio has {proprio_len} timesteps but primary_images has {n}"
            )));
        }

        if let Some(ref wrist) = self.wrist_images {
            let wrist_len = wrist.shape()[0];
            if wrist_len != n {
                return Err(WindowError::InvalidEpisode(format!(
                    "wrist_images has {wrist_len} timesteps but primary_images has {n}"
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array;

    fn frames(n: usize) -> Array4<f32> {
        Array::from_shape_fn((n, 2, 2, 3), |(t, _, _, _)| t as f32)
    }

    #[test]
    fn test_episode_len_and_wrist() {
        let episode = Episode::new(frames(4), Array2::zeros((4, 7)));
        assert_eq!(episode.len(), 4);
        assert!(!episode.has_wrist());
        assert!(episode.last_wrist().is_none());

        let episode = episode.with_wrist(frames(4));
        assert!(episode.has_wrist());
        assert_eq!(episode.last_wrist().unwrap()[[0, 0, 0]], 3.0);
    }

    #[test]
    fn test_last_primary() {
        let episode = Episode::new(frames(5), Array2::zeros((5, 2)));
        let last = episode.last_primary().unwrap();
        assert_eq!(last, episode.primary_images.index_axis(ndarray::Axis(0), 4));

        let empty = Episode::new(frames(0), Array2::zeros((0, 2)));
        assert!(empty.is_empty());
        assert!(empty.last_primary().is_none());
    }

    #[test]
    fn test_validate_mismatched_proprio() {
        let episode = Episode::new(frames(4), Array2::zeros((5, 7)));
        assert!(matches!(
            episode.validate(),
            Err(WindowError::InvalidEpisode(_))
        ));
    }

    #[test]
    fn test_validate_short_wrist() {
        let episode = Episode::new(frames(4), Array2::zeros((4, 7))).with_wrist(frames(3));
        let err = episode.validate().unwrap_err();
        assert!(err.to_string().contains("wrist_images"));
    }
}
