use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use cartpole_rl::training::RunHistory;

/// Plot the reward and loss curves of a saved training run.
#[derive(Parser)]
#[command(name = "cartpole-rl", about = "View a CartPole training history")]
struct Cli {
    /// History JSON written by `train`
    #[arg(default_value = "history.json")]
    history: PathBuf,

    /// Episodes in the trailing mean
    #[arg(long, default_value_t = 10)]
    window: usize,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let history = RunHistory::load(&cli.history)
        .with_context(|| format!("loading history from {}", cli.history.display()))?;
    log::info!(
        "{}: {} episodes, best reward {:.0}",
        history.algorithm,
        history.len(),
        history.best_reward().unwrap_or(0.0)
    );

    cartpole_rl::ui::show_history(&history, cli.window).context("running chart viewer")?;
    Ok(())
}
