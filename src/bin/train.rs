#![recursion_limit = "256"]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use cartpole_rl::ai::algorithms::{DqnAgent, ReinforceAgent};
use cartpole_rl::ai::TrainableAgent;
use cartpole_rl::checkpoint::CheckpointManager;
use cartpole_rl::config::AppConfig;
use cartpole_rl::env::{CartPole, Environment};
use cartpole_rl::training::{RunHistory, Trainer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Algorithm {
    Dqn,
    Reinforce,
    ReinforceBaseline,
}

/// Train a DQN or REINFORCE agent on CartPole.
#[derive(Parser)]
#[command(name = "train", about = "Train an RL agent on CartPole")]
struct Cli {
    /// Algorithm to train
    #[arg(long, value_enum, default_value_t = Algorithm::Dqn)]
    algorithm: Algorithm,

    /// Resume training from the latest checkpoint
    #[arg(long)]
    resume: bool,

    /// Skip the chart viewer at the end of training
    #[arg(long)]
    headless: bool,

    /// Path to TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Override number of training episodes
    #[arg(long)]
    episodes: Option<usize>,

    /// Override learning rate
    #[arg(long)]
    lr: Option<f64>,

    /// Seed the environment, agent and warm-up for a reproducible run
    #[arg(long)]
    seed: Option<u64>,

    /// Print the default configuration as TOML and exit
    #[arg(long)]
    dump_config: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    if cli.dump_config {
        print!("{}", AppConfig::default_toml().context("serializing default config")?);
        return Ok(());
    }

    let mut app_config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;

    if let Some(episodes) = cli.episodes {
        app_config.training.num_episodes = episodes;
    }
    if let Some(seed) = cli.seed {
        app_config.training.seed = Some(seed);
    }
    match cli.algorithm {
        Algorithm::Dqn => {
            if let Some(lr) = cli.lr {
                app_config.dqn.learning_rate = lr;
            }
        }
        Algorithm::Reinforce | Algorithm::ReinforceBaseline => {
            if let Some(lr) = cli.lr {
                app_config.reinforce.learning_rate = lr;
            }
            app_config.reinforce.baseline = cli.algorithm == Algorithm::ReinforceBaseline;
        }
    }
    app_config.validate().context("validating config")?;

    let seed = app_config.training.seed;
    let mut env = match seed {
        Some(seed) => CartPole::with_seed(app_config.env.clone(), seed),
        None => CartPole::new(app_config.env.clone()),
    };
    let observation_size = env.observation_size();
    let num_actions = env.action_space().num_actions();

    let mut agent: Box<dyn TrainableAgent> = match cli.algorithm {
        Algorithm::Dqn => {
            let config = app_config.dqn.clone();
            Box::new(match seed {
                Some(seed) => DqnAgent::with_seed(config, observation_size, num_actions, seed),
                None => DqnAgent::new(config, observation_size, num_actions),
            })
        }
        Algorithm::Reinforce | Algorithm::ReinforceBaseline => {
            let config = app_config.reinforce.clone();
            Box::new(match seed {
                Some(seed) => {
                    ReinforceAgent::with_seed(config, observation_size, num_actions, seed)
                }
                None => ReinforceAgent::new(config, observation_size, num_actions),
            })
        }
    };

    if cli.resume {
        CheckpointManager::new(app_config.checkpoint.clone())
            .resume(agent.as_mut())
            .context("resuming from the latest checkpoint")?;
    }

    let mut trainer = Trainer::new(app_config.training.clone(), app_config.checkpoint.clone());
    let history = trainer
        .train(&mut env, agent.as_mut())
        .context("training failed")?;

    if !cli.headless {
        show_charts(&history)?;
    }
    Ok(())
}

fn show_charts(history: &RunHistory) -> Result<()> {
    cartpole_rl::ui::show_history(history, 10).context("running chart viewer")
}
