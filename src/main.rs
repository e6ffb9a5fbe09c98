//! Episode Windower CLI
//!
//! Builds windowed policy samples from `.npy` episode arrays.

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use episode_windower::{
    config::{Config, GoalConfig},
    export::export_samples,
    source::{load_episode, EpisodePaths},
    WindowBuilder, VERSION,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "episode-windower")]
#[command(version = VERSION)]
#[command(about = "Sliding-window sample builder for sequence-conditioned policies", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build windowed samples from an episode and export them
    Build {
        /// Primary camera frames (.npy, N x H x W x C)
        #[arg(long)]
        primary: PathBuf,

        /// Proprioceptive features (.npy, N x J)
        #[arg(long)]
        proprio: PathBuf,

        /// Wrist camera frames (.npy, N x H x W x C)
        #[arg(long)]
        wrist: Option<PathBuf>,

        /// Timesteps per window (overrides config)
        #[arg(long)]
        window: Option<usize>,

        /// Goal type: image or language (overrides config)
        #[arg(long)]
        goal_type: Option<String>,

        /// Instruction for language goals
        #[arg(long)]
        instruction: Option<String>,

        /// Explicit primary goal image (.npy, H x W x C)
        #[arg(long)]
        goal_primary: Option<PathBuf>,

        /// Explicit wrist goal image (.npy, H x W x C)
        #[arg(long)]
        goal_wrist: Option<PathBuf>,

        /// Output directory (defaults to a timestamped directory under the export path)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Show configuration
    Config,

    /// Write the default configuration file
    Init {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },
}

/// Goal-related CLI overrides.
struct GoalArgs {
    goal_type: Option<String>,
    instruction: Option<String>,
    goal_primary: Option<PathBuf>,
    goal_wrist: Option<PathBuf>,
}

impl GoalArgs {
    /// Layer CLI values over the configured goal.
    fn apply(self, goal: &mut GoalConfig) {
        if let Some(goal_type) = self.goal_type {
            goal.goal_type = goal_type;
        }
        if self.instruction.is_some() {
            goal.instruction = self.instruction;
        }
        if self.goal_primary.is_some() {
            goal.goal_image_primary = self.goal_primary;
        }
        if self.goal_wrist.is_some() {
            goal.goal_image_wrist = self.goal_wrist;
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Build {
            primary,
            proprio,
            wrist,
            window,
            goal_type,
            instruction,
            goal_primary,
            goal_wrist,
            output,
        } => {
            let mut paths = EpisodePaths::new(primary, proprio);
            paths.wrist = wrist;
            let goal = GoalArgs {
                goal_type,
                instruction,
                goal_primary,
                goal_wrist,
            };
            cmd_build(paths, window, goal, output)
        }
        Commands::Config => cmd_config(),
        Commands::Init { force } => cmd_init(force),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn cmd_build(
    paths: EpisodePaths,
    window: Option<usize>,
    goal: GoalArgs,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut config = Config::load().context("loading configuration")?;
    if let Some(window) = window {
        config.window_length = window;
    }
    goal.apply(&mut config.goal);

    let window_config = config
        .window_config()
        .context("resolving window configuration")?;

    println!("Episode Windower v{VERSION}");
    println!();
    println!("  Primary images: {:?}", paths.primary);
    println!("  Proprio: {:?}", paths.proprio);
    println!(
        "  Wrist images: {}",
        paths
            .wrist
            .as_ref()
            .map(|p| format!("{p:?}"))
            .unwrap_or_else(|| "none".to_string())
    );
    println!("  Window length: {}", window_config.window_length());
    println!("  Goal: {}", window_config.goal_spec.kind());
    println!();

    let episode = load_episode(&paths).context("loading episode arrays")?;
    let samples = WindowBuilder::new(window_config)
        .build(&episode)
        .context("building windows")?;

    println!(
        "Built {} samples from {} timesteps",
        samples.len(),
        episode.len()
    );

    if samples.is_empty() {
        println!("Episode is shorter than one window; nothing to export.");
        return Ok(());
    }

    let output_dir = match output {
        Some(dir) => dir,
        None => {
            config
                .ensure_directories()
                .context("creating export directory")?;
            config
                .export_path
                .join(format!("samples_{}", Utc::now().format("%Y%m%d_%H%M%S")))
        }
    };

    let manifest = export_samples(&samples, &output_dir)
        .with_context(|| format!("exporting samples to {output_dir:?}"))?;

    println!(
        "Exported {} samples to {:?} (run {})",
        manifest.num_samples, output_dir, manifest.run_id
    );
    for (field, entry) in &manifest.arrays {
        println!("  {field}: {:?}", entry.shape);
    }

    Ok(())
}

fn cmd_config() -> anyhow::Result<()> {
    let config = Config::load().context("loading configuration")?;

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);

    Ok(())
}

fn cmd_init(force: bool) -> anyhow::Result<()> {
    let path = Config::config_path();
    if path.exists() && !force {
        println!("Config already exists at {path:?} (use --force to overwrite)");
        return Ok(());
    }

    Config::default().save().context("saving configuration")?;
    println!("Wrote default configuration to {path:?}");

    Ok(())
}
