//! Episode Windower - sliding-window samples for sequence-conditioned policies.
//!
//! This library turns one recorded episode (camera frames and proprioceptive
//! vectors, time-ordered) into the list of fixed-length observation windows a
//! sequence-conditioned policy model consumes, each paired with a task goal.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────────┐   ┌──────────────┐
//! │ Array source │──▶│  WindowBuilder   │──▶│    Export    │
//! │   (.npy)     │   │ (windows + goal) │   │ (.npy + json)│
//! └──────────────┘   └──────────────────┘   └──────────────┘
//! ```
//!
//! With `N` timesteps and window length `W` the builder yields `N - W + 1`
//! samples; sample `k` covers timesteps `k..=k + W - 1`. Image goals default
//! to the final frame of the whole episode, not of each window.
//!
//! # Example
//!
//! ```
//! use episode_windower::{build, Episode, GoalSpec, WindowConfig};
//! use ndarray::{Array2, Array4};
//!
//! let episode = Episode::new(Array4::zeros((5, 8, 8, 3)), Array2::zeros((5, 7)));
//! let config = WindowConfig::new(2, GoalSpec::language("pick up the cup")).unwrap();
//!
//! let samples = build(&episode, &config).unwrap();
//! assert_eq!(samples.len(), 4);
//! assert_eq!(samples[3].observation.timestep.to_vec(), vec![3, 4]);
//! ```

pub mod config;
pub mod core;
pub mod export;
pub mod source;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError, GoalConfig};
pub use crate::core::{
    build, Episode, GoalSpec, Observation, Sample, Task, WindowBuilder, WindowConfig, WindowError,
};
pub use export::{export_samples, ExportError, ExportManifest};
pub use source::{load_episode, EpisodePaths, SourceError};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
