//! Core windowing transform.
//!
//! This module contains:
//! - Episode arrays and their length checks
//! - Goal specification and task resolution
//! - The sliding-window sample builder

pub mod episode;
pub mod goal;
pub mod windowing;

// Re-export commonly used types
pub use episode::Episode;
pub use goal::{BatchedTask, GoalSpec, Task, IMAGE_GOAL, LANGUAGE_GOAL};
pub use windowing::{
    build, BatchedObservation, BatchedSample, Observation, Sample, WindowBuilder, WindowConfig,
    WindowError, DEFAULT_WINDOW_LENGTH,
};
