//! Goal specification and task resolution.
//!
//! A goal is either a pair of target images or a language instruction. Image
//! goals that are not given explicitly fall back to the final frame of the
//! whole episode, resolved once per build and shared by every sample.

use super::episode::Episode;
use super::WindowError;
use ndarray::{Array3, ArrayView4, Axis};

/// Tag of an image goal.
pub const IMAGE_GOAL: &str = "image";

/// Tag of a language goal.
pub const LANGUAGE_GOAL: &str = "language";

fn normalize_tag(goal_type: &str) -> String {
    goal_type.trim().to_lowercase()
}

/// How the task goal is determined.
#[derive(Debug, Clone, PartialEq)]
pub enum GoalSpec {
    /// Target images, one per camera. `None` means "use the episode's last frame".
    Image {
        primary: Option<Array3<f32>>,
        wrist: Option<Array3<f32>>,
    },
    /// A free-form instruction, used verbatim.
    Language { instruction: String },
}

impl Default for GoalSpec {
    fn default() -> Self {
        GoalSpec::Image {
            primary: None,
            wrist: None,
        }
    }
}

impl GoalSpec {
    /// Image goal with both cameras defaulting to the last episode frame.
    pub fn last_frame() -> Self {
        Self::default()
    }

    /// Language goal.
    pub fn language(instruction: impl Into<String>) -> Self {
        GoalSpec::Language {
            instruction: instruction.into(),
        }
    }

    /// Build a goal from its keyword form (`goal_type` tag plus optional parts).
    ///
    /// Parts that do not apply to the chosen tag are ignored.
    pub fn parse(
        goal_type: &str,
        instruction: Option<String>,
        goal_image_primary: Option<Array3<f32>>,
        goal_image_wrist: Option<Array3<f32>>,
    ) -> Result<Self, WindowError> {
        match normalize_tag(goal_type).as_str() {
            IMAGE_GOAL => Ok(GoalSpec::Image {
                primary: goal_image_primary,
                wrist: goal_image_wrist,
            }),
            LANGUAGE_GOAL => instruction
                .map(|instruction| GoalSpec::Language { instruction })
                .ok_or(WindowError::MissingInstruction),
            _ => Err(WindowError::UnsupportedGoalType(goal_type.to_string())),
        }
    }

    /// Whether `goal_type` names an image goal, so goal images are needed.
    pub fn is_image_tag(goal_type: &str) -> bool {
        normalize_tag(goal_type) == IMAGE_GOAL
    }

    /// Short name of the variant, as used in configuration and manifests.
    pub fn kind(&self) -> &'static str {
        match self {
            GoalSpec::Image { .. } => IMAGE_GOAL,
            GoalSpec::Language { .. } => LANGUAGE_GOAL,
        }
    }

    /// Resolve the goal against an episode.
    ///
    /// Each camera is resolved independently: an explicit override wins,
    /// otherwise the frame at index N-1 of that camera is copied. Returns
    /// `InvalidEpisode` when a default is needed but the episode has no frames.
    pub fn resolve(&self, episode: &Episode) -> Result<Task, WindowError> {
        match self {
            GoalSpec::Image { primary, wrist } => {
                let image_primary = match primary {
                    Some(image) => image.clone(),
                    None => episode
                        .last_primary()
                        .map(|frame| frame.to_owned())
                        .ok_or_else(|| {
                            WindowError::InvalidEpisode(
                                "cannot default the primary goal of an empty episode".to_string(),
                            )
                        })?,
                };

                let image_wrist = match wrist {
                    Some(image) => Some(image.clone()),
                    None => episode.last_wrist().map(|frame| frame.to_owned()),
                };

                Ok(Task::Image {
                    image_primary,
                    image_wrist,
                })
            }
            GoalSpec::Language { instruction } => Ok(Task::Language {
                language_instruction: instruction.clone(),
            }),
        }
    }
}

/// Goal descriptor attached to every sample of one build.
#[derive(Debug, Clone, PartialEq)]
pub enum Task {
    Image {
        image_primary: Array3<f32>,
        image_wrist: Option<Array3<f32>>,
    },
    Language {
        language_instruction: String,
    },
}

impl Task {
    pub fn image_primary(&self) -> Option<&Array3<f32>> {
        match self {
            Task::Image { image_primary, .. } => Some(image_primary),
            Task::Language { .. } => None,
        }
    }

    pub fn image_wrist(&self) -> Option<&Array3<f32>> {
        match self {
            Task::Image { image_wrist, .. } => image_wrist.as_ref(),
            Task::Language { .. } => None,
        }
    }

    pub fn language_instruction(&self) -> Option<&str> {
        match self {
            Task::Language {
                language_instruction,
            } => Some(language_instruction),
            Task::Image { .. } => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Task::Image { .. } => IMAGE_GOAL,
            Task::Language { .. } => LANGUAGE_GOAL,
        }
    }

    /// Borrow the task with a leading batch axis, without copying.
    pub fn batched(&self) -> BatchedTask<'_> {
        fn batch(image: &Array3<f32>) -> ArrayView4<'_, f32> {
            image.view().insert_axis(Axis(0))
        }

        match self {
            Task::Image {
                image_primary,
                image_wrist,
            } => BatchedTask::Image {
                image_primary: batch(image_primary),
                image_wrist: image_wrist.as_ref().map(batch),
            },
            Task::Language {
                language_instruction,
            } => BatchedTask::Language {
                language_instruction,
            },
        }
    }
}

/// Task images with a leading batch axis of size 1.
#[derive(Debug, Clone)]
pub enum BatchedTask<'a> {
    Image {
        image_primary: ArrayView4<'a, f32>,
        image_wrist: Option<ArrayView4<'a, f32>>,
    },
    Language {
        language_instruction: &'a str,
    },
}
