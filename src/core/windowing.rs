//! Trailing sliding-window expansion of an episode into samples.
//!
//! An episode of `N` timesteps and a window length `W` yield `N - W + 1`
//! samples in chronological order. Sample `k` observes timesteps
//! `k..=k + W - 1` and carries the same task as every other sample of the
//! build. Episodes shorter than one full window produce no samples.

use super::episode::Episode;
use super::goal::{BatchedTask, GoalSpec, Task};
use ndarray::{s, Array1, Array2, Array4, ArrayView2, ArrayView3, ArrayView5, Axis};

/// Window length used when none is configured.
pub const DEFAULT_WINDOW_LENGTH: usize = 2;

/// Errors raised while building windows.
#[derive(Debug, Clone, PartialEq)]
pub enum WindowError {
    /// Arrays are missing, of mismatched length, or otherwise unusable
    InvalidEpisode(String),
    /// Goal tag is neither `image` nor `language`
    UnsupportedGoalType(String),
    /// Language goal requested without an instruction
    MissingInstruction,
    /// Window length must be at least 1
    InvalidWindowLength(usize),
}

impl std::fmt::Display for WindowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WindowError::InvalidEpisode(e) => write!(f, "Invalid episode: {e}"),
            WindowError::UnsupportedGoalType(t) => write!(f, "Unsupported goal type: '{t}'"),
            WindowError::MissingInstruction => {
                write!(f, "Language goal requires an instruction")
            }
            WindowError::InvalidWindowLength(w) => {
                write!(f, "Invalid window length {w}: must be at least 1")
            }
        }
    }
}

impl std::error::Error for WindowError {}

/// Window length plus goal behaviour for one build.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowConfig {
    window_length: usize,
    pub goal_spec: GoalSpec,
}

impl WindowConfig {
    /// Create a config, rejecting a zero window length.
    pub fn new(window_length: usize, goal_spec: GoalSpec) -> Result<Self, WindowError> {
        if window_length == 0 {
            return Err(WindowError::InvalidWindowLength(window_length));
        }
        Ok(Self {
            window_length,
            goal_spec,
        })
    }

    pub fn window_length(&self) -> usize {
        self.window_length
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            window_length: DEFAULT_WINDOW_LENGTH,
            goal_spec: GoalSpec::default(),
        }
    }
}

/// Stacked observation data for `W` consecutive timesteps.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// Shape (W, H1, W1, C)
    pub image_primary: Array4<f32>,
    /// Shape (W, H2, W2, C); absent when the episode has no wrist camera
    pub image_wrist: Option<Array4<f32>>,
    /// Shape (W, J)
    pub proprio: Array2<f32>,
    /// 0-based episode indices covered by the window
    pub timestep: Array1<i64>,
}

/// One model input: a window of observations plus the task.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub observation: Observation,
    pub task: Task,
}

/// Observation fields with a leading batch axis of size 1.
#[derive(Debug, Clone)]
pub struct BatchedObservation<'a> {
    pub image_primary: ArrayView5<'a, f32>,
    pub image_wrist: Option<ArrayView5<'a, f32>>,
    pub proprio: ArrayView3<'a, f32>,
    pub timestep: ArrayView2<'a, i64>,
}

/// Borrowed, batch-shaped view of a [`Sample`].
#[derive(Debug, Clone)]
pub struct BatchedSample<'a> {
    pub observation: BatchedObservation<'a>,
    pub task: BatchedTask<'a>,
}

impl Sample {
    /// Borrow the sample in the (1, ...) layout the policy model consumes.
    pub fn batched(&self) -> BatchedSample<'_> {
        let obs = &self.observation;
        BatchedSample {
            observation: BatchedObservation {
                image_primary: obs.image_primary.view().insert_axis(Axis(0)),
                image_wrist: obs
                    .image_wrist
                    .as_ref()
                    .map(|images| images.view().insert_axis(Axis(0))),
                proprio: obs.proprio.view().insert_axis(Axis(0)),
                timestep: obs.timestep.view().insert_axis(Axis(0)),
            },
            task: self.task.batched(),
        }
    }

    /// Number of timesteps in the observation window.
    pub fn window_length(&self) -> usize {
        self.observation.timestep.len()
    }
}

/// Expands episodes into windowed samples.
#[derive(Debug, Clone, Default)]
pub struct WindowBuilder {
    config: WindowConfig,
}

impl WindowBuilder {
    pub fn new(config: WindowConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    /// Build every full trailing window of the episode.
    ///
    /// The episode is validated first, so malformed input fails even when it
    /// is too short to yield a window. The task is resolved once and cloned
    /// into each sample.
    pub fn build(&self, episode: &Episode) -> Result<Vec<Sample>, WindowError> {
        let w = self.config.window_length;
        if w == 0 {
            return Err(WindowError::InvalidWindowLength(w));
        }

        episode.validate()?;

        let n = episode.len();
        if n < w {
            tracing::warn!(
                timesteps = n,
                window_length = w,
                "Episode shorter than one window, no samples produced"
            );
            return Ok(Vec::new());
        }

        let task = self.config.goal_spec.resolve(episode)?;
        tracing::debug!(goal = task.kind(), "Resolved task goal");

        let start_offset = w - 1;
        let mut samples = Vec::with_capacity(n - start_offset);

        for end in start_offset..n {
            let start = end - start_offset;
            let observation = Observation {
                image_primary: episode
                    .primary_images
                    .slice(s![start..=end, .., .., ..])
                    .to_owned(),
                image_wrist: episode
                    .wrist_images
                    .as_ref()
                    .map(|wrist| wrist.slice(s![start..=end, .., .., ..]).to_owned()),
                proprio: episode.proprio.slice(s![start..=end, ..]).to_owned(),
                timestep: Array1::from_iter(start as i64..=end as i64),
            };

            samples.push(Sample {
                observation,
                task: task.clone(),
            });
        }

        tracing::debug!(
            timesteps = n,
            window_length = w,
            samples = samples.len(),
            wrist = episode.has_wrist(),
            "Built windowed samples"
        );

        Ok(samples)
    }
}

/// Build samples for `episode` under `config`.
pub fn build(episode: &Episode, config: &WindowConfig) -> Result<Vec<Sample>, WindowError> {
    WindowBuilder::new(config.clone()).build(episode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array, Array3};

    /// Frames whose every pixel holds its timestep index plus `offset`.
    fn frames(n: usize, offset: f32) -> Array4<f32> {
        Array::from_shape_fn((n, 4, 4, 3), |(t, _, _, _)| t as f32 + offset)
    }

    fn proprio(n: usize) -> Array2<f32> {
        Array::from_shape_fn((n, 7), |(t, j)| (t * 10 + j) as f32)
    }

    fn episode(n: usize) -> Episode {
        Episode::new(frames(n, 0.0), proprio(n)).with_wrist(frames(n, 0.5))
    }

    fn config(w: usize, goal: GoalSpec) -> WindowConfig {
        WindowConfig::new(w, goal).unwrap()
    }

    #[test]
    fn test_sample_count() {
        for (n, w) in [(5, 1), (5, 2), (5, 5), (10, 3)] {
            let samples = build(&episode(n), &config(w, GoalSpec::last_frame())).unwrap();
            assert_eq!(samples.len(), n - w + 1, "n={n} w={w}");
        }
    }

    #[test]
    fn test_image_goal_scenario() {
        let ep = episode(5);
        let samples = build(&ep, &config(2, GoalSpec::last_frame())).unwrap();

        assert_eq!(samples.len(), 4);
        assert_eq!(samples[0].observation.timestep.to_vec(), vec![0, 1]);
        assert_eq!(samples[3].observation.timestep.to_vec(), vec![3, 4]);

        let last_primary = ep.primary_images.index_axis(Axis(0), 4);
        let last_wrist = ep.wrist_images.as_ref().unwrap().index_axis(Axis(0), 4);
        for sample in &samples {
            assert_eq!(sample.task.image_primary().unwrap(), &last_primary);
            assert_eq!(sample.task.image_wrist().unwrap(), &last_wrist);
        }
    }

    #[test]
    fn test_language_goal_scenario() {
        let samples = build(
            &episode(3),
            &config(3, GoalSpec::language("pick up the cup")),
        )
        .unwrap();

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].observation.timestep.to_vec(), vec![0, 1, 2]);
        assert_eq!(
            samples[0].task,
            Task::Language {
                language_instruction: "pick up the cup".to_string()
            }
        );
    }

    #[test]
    fn test_language_instruction_on_every_sample() {
        let samples = build(
            &episode(6),
            &config(2, GoalSpec::language("close the lid")),
        )
        .unwrap();

        assert_eq!(samples.len(), 5);
        for sample in &samples {
            assert_eq!(sample.task.language_instruction(), Some("close the lid"));
            assert!(sample.task.image_primary().is_none());
        }
    }

    #[test]
    fn test_wrist_override_without_wrist_camera() {
        let goal_wrist = Array3::from_elem((4, 4, 3), 9.0);
        let goal = GoalSpec::Image {
            primary: None,
            wrist: Some(goal_wrist.clone()),
        };
        let ep = Episode::new(frames(3, 0.0), proprio(3));
        let samples = build(&ep, &config(2, goal)).unwrap();

        assert_eq!(samples.len(), 2);
        for sample in &samples {
            assert!(sample.observation.image_wrist.is_none());
            assert_eq!(sample.task.image_wrist().unwrap(), &goal_wrist);
            assert_eq!(sample.task.image_primary().unwrap()[[0, 0, 0]], 2.0);
        }
    }

    #[test]
    fn test_short_episode_is_empty_not_error() {
        let samples = build(&episode(2), &config(5, GoalSpec::last_frame())).unwrap();
        assert!(samples.is_empty());

        let samples = build(&episode(0), &config(1, GoalSpec::last_frame())).unwrap();
        assert!(samples.is_empty());
    }

    #[test]
    fn test_mismatched_lengths_fail() {
        let ep = Episode::new(frames(4, 0.0), proprio(5));
        let err = build(&ep, &config(2, GoalSpec::last_frame())).unwrap_err();
        assert!(matches!(err, WindowError::InvalidEpisode(_)));

        // Validation happens before the short-episode check
        let err = build(&ep, &config(10, GoalSpec::last_frame())).unwrap_err();
        assert!(matches!(err, WindowError::InvalidEpisode(_)));
    }

    #[test]
    fn test_zero_window_length_rejected() {
        assert_eq!(
            WindowConfig::new(0, GoalSpec::last_frame()),
            Err(WindowError::InvalidWindowLength(0))
        );
    }

    #[test]
    fn test_window_contents_follow_timesteps() {
        let ep = episode(6);
        let samples = build(&ep, &config(3, GoalSpec::last_frame())).unwrap();

        for (k, sample) in samples.iter().enumerate() {
            let expected: Vec<i64> = (k as i64..k as i64 + 3).collect();
            assert_eq!(sample.observation.timestep.to_vec(), expected);
            assert_eq!(sample.window_length(), 3);

            let obs = &sample.observation;
            assert_eq!(obs.image_primary.shape(), &[3, 4, 4, 3]);
            assert_eq!(obs.proprio.shape(), &[3, 7]);
            for (offset, t) in (k..k + 3).enumerate() {
                assert_eq!(obs.image_primary[[offset, 0, 0, 0]], t as f32);
                assert_eq!(obs.image_wrist.as_ref().unwrap()[[offset, 1, 1, 2]], t as f32 + 0.5);
                assert_eq!(obs.proprio.row(offset), ep.proprio.row(t));
            }
        }
    }

    #[test]
    fn test_single_step_windows() {
        let samples = build(&episode(3), &config(1, GoalSpec::last_frame())).unwrap();
        let steps: Vec<Vec<i64>> = samples
            .iter()
            .map(|s| s.observation.timestep.to_vec())
            .collect();
        assert_eq!(steps, vec![vec![0], vec![1], vec![2]]);
    }

    #[test]
    fn test_missing_wrist_propagates() {
        let ep = Episode::new(frames(4, 0.0), proprio(4));
        let samples = build(&ep, &config(2, GoalSpec::last_frame())).unwrap();

        assert_eq!(samples.len(), 3);
        for sample in &samples {
            assert!(sample.observation.image_wrist.is_none());
            assert!(sample.task.image_wrist().is_none());
        }
    }

    #[test]
    fn test_explicit_goal_overrides() {
        let goal_primary = Array3::from_elem((4, 4, 3), 42.0);
        let goal = GoalSpec::Image {
            primary: Some(goal_primary.clone()),
            wrist: None,
        };
        let ep = episode(4);
        let samples = build(&ep, &config(2, goal)).unwrap();

        for sample in &samples {
            assert_eq!(sample.task.image_primary().unwrap(), &goal_primary);
            assert_eq!(sample.task.image_wrist().unwrap()[[0, 0, 0]], 3.5);
        }
    }

    #[test]
    fn test_task_identical_across_samples() {
        let samples = build(&episode(7), &config(2, GoalSpec::last_frame())).unwrap();
        let first = &samples[0].task;
        assert!(samples.iter().all(|s| &s.task == first));
    }

    #[test]
    fn test_samples_do_not_alias_episode() {
        let mut ep = episode(3);
        let samples = build(&ep, &config(2, GoalSpec::last_frame())).unwrap();

        ep.primary_images.fill(-1.0);
        assert_eq!(samples[0].observation.image_primary[[0, 0, 0, 0]], 0.0);
        assert_eq!(samples[1].task.image_primary().unwrap()[[0, 0, 0]], 2.0);
    }

    #[test]
    fn test_batched_view_shapes() {
        let samples = build(&episode(4), &config(2, GoalSpec::last_frame())).unwrap();
        let batched = samples[0].batched();

        assert_eq!(batched.observation.image_primary.shape(), &[1, 2, 4, 4, 3]);
        assert_eq!(
            batched.observation.image_wrist.unwrap().shape(),
            &[1, 2, 4, 4, 3]
        );
        assert_eq!(batched.observation.proprio.shape(), &[1, 2, 7]);
        assert_eq!(batched.observation.timestep.shape(), &[1, 2]);
    }

    #[test]
    fn test_builder_usable_across_threads() {
        let builder = std::sync::Arc::new(WindowBuilder::new(config(2, GoalSpec::last_frame())));
        let handles: Vec<_> = (3..6)
            .map(|n| {
                let builder = builder.clone();
                std::thread::spawn(move || builder.build(&episode(n)).unwrap().len())
            })
            .collect();

        let counts: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(counts, vec![2, 3, 4]);
    }
}
