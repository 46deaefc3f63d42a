//! Checkpoint series on disk.
//!
//! Every algorithm variant keeps its own series under the checkpoint root:
//!
//! ```text
//! checkpoints/
//!   dqn/
//!     checkpoint_0000050/   metadata.json, training_state.json, *.mpk
//!     checkpoint_0000100/
//!     latest -> checkpoint_0000100
//!   reinforce_baseline/
//!     ...
//! ```

use std::cmp::Ordering;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::ai::TrainableAgent;
use crate::checkpoint::metadata::{CheckpointMetadata, CheckpointMetrics};
use crate::error::CheckpointError;

const LATEST: &str = "latest";
const METADATA_FILE: &str = "metadata.json";
const STATE_FILE: &str = "training_state.json";
const DIR_PREFIX: &str = "checkpoint_";
const STAGING_SUFFIX: &str = ".tmp";

/// Where checkpoints live and how many survive pruning.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CheckpointManagerConfig {
    /// Root holding one subdirectory per algorithm series.
    pub checkpoint_dir: PathBuf,
    /// Most recent checkpoints always kept.
    pub keep_last_n: usize,
    /// Checkpoints with the highest eval reward always kept.
    pub keep_best_n: usize,
}

impl Default for CheckpointManagerConfig {
    fn default() -> Self {
        CheckpointManagerConfig {
            checkpoint_dir: PathBuf::from("checkpoints"),
            keep_last_n: 5,
            keep_best_n: 3,
        }
    }
}

/// A checkpoint read back from disk. The agent parses its own training state.
#[derive(Debug)]
pub struct AgentCheckpointData {
    pub path: PathBuf,
    pub metadata: CheckpointMetadata,
    pub training_state_json: String,
}

/// Writes, reads and prunes the checkpoint series of each algorithm.
pub struct CheckpointManager {
    config: CheckpointManagerConfig,
}

impl CheckpointManager {
    pub fn new(config: CheckpointManagerConfig) -> Self {
        CheckpointManager { config }
    }

    /// Directory of one algorithm's series, e.g. `checkpoints/dqn`.
    pub fn series_dir(&self, series: &str) -> PathBuf {
        self.config.checkpoint_dir.join(series)
    }

    /// Write the agent's networks, training state and metadata as
    /// `checkpoint_<episode>` in the agent's series, then move `latest` and
    /// prune.
    ///
    /// Files are written to `<name>.tmp` and renamed into place.
    pub fn save_agent_checkpoint(
        &self,
        agent: &dyn TrainableAgent,
        metrics: &CheckpointMetrics,
        episode: usize,
    ) -> Result<PathBuf, CheckpointError> {
        let metadata = CheckpointMetadata {
            episode,
            timestamp: unix_now(),
            algorithm: agent.name().to_string(),
            metrics: metrics.clone(),
            hyperparameters: agent.hyperparameters(),
        };
        let series_dir = self.series_dir(metadata.hyperparameters.series());
        let name = format!("{DIR_PREFIX}{episode:07}");
        let staging = series_dir.join(format!("{name}{STAGING_SUFFIX}"));
        let target = series_dir.join(&name);

        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }
        fs::create_dir_all(&staging)?;
        agent
            .save_weights_to_dir(&staging)
            .map_err(|e| CheckpointError::ModelSave(e.to_string()))?;
        fs::write(staging.join(STATE_FILE), agent.training_state_json()?)?;
        fs::write(
            staging.join(METADATA_FILE),
            serde_json::to_string_pretty(&metadata)?,
        )?;

        if target.exists() {
            fs::remove_dir_all(&target)?;
        }
        fs::rename(&staging, &target)?;
        point_latest_at(&series_dir, &name)?;
        let pruned = self.prune(&series_dir)?;

        log::info!(
            "saved checkpoint {} (eval reward {:.1}, {} pruned)",
            target.display(),
            metrics.eval_reward,
            pruned
        );
        Ok(target)
    }

    /// Read one checkpoint directory.
    pub fn load_agent_checkpoint(
        &self,
        dir: &Path,
    ) -> Result<AgentCheckpointData, CheckpointError> {
        if !dir.is_dir() {
            return Err(CheckpointError::DirNotFound(dir.to_path_buf()));
        }
        Ok(AgentCheckpointData {
            path: dir.to_path_buf(),
            metadata: read_metadata(&dir.join(METADATA_FILE))?,
            training_state_json: read_text(&dir.join(STATE_FILE))?,
        })
    }

    /// Read the checkpoint `latest` points at in the given series.
    pub fn load_agent_latest(
        &self,
        series: &str,
    ) -> Result<AgentCheckpointData, CheckpointError> {
        let series_dir = self.series_dir(series);
        let link = fs::read_link(series_dir.join(LATEST))
            .map_err(|_| CheckpointError::NoLatestSymlink(series_dir.clone()))?;
        self.load_agent_checkpoint(&series_dir.join(link))
    }

    /// Restore the agent from the latest checkpoint of its own series.
    ///
    /// Returns `Ok(None)` when the series has no checkpoint yet. The
    /// checkpoint's recorded hyperparameters must belong to the same series
    /// as the agent, otherwise nothing is loaded.
    pub fn resume(
        &self,
        agent: &mut dyn TrainableAgent,
    ) -> Result<Option<CheckpointMetadata>, CheckpointError> {
        let expected = agent.hyperparameters().series();
        let data = match self.load_agent_latest(expected) {
            Ok(data) => data,
            Err(CheckpointError::NoLatestSymlink(dir)) => {
                log::info!("no checkpoint in {}, starting fresh", dir.display());
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let found = data.metadata.hyperparameters.series();
        if found != expected {
            return Err(CheckpointError::SeriesMismatch { expected, found });
        }

        agent
            .load_weights_from_dir(&data.path)
            .map_err(|e| CheckpointError::ModelLoad(e.to_string()))?;
        agent.restore_training_state_json(&data.training_state_json)?;
        log::info!(
            "resumed {} from episode {} (eval reward {:.1})",
            data.metadata.algorithm,
            data.metadata.episode,
            data.metadata.metrics.eval_reward
        );
        Ok(Some(data.metadata))
    }

    /// Checkpoints of one series, oldest episode first. A series that was
    /// never written is empty.
    pub fn list_checkpoints(
        &self,
        series: &str,
    ) -> Result<Vec<(PathBuf, CheckpointMetadata)>, CheckpointError> {
        scan_series(&self.series_dir(series))
    }

    /// Delete every checkpoint that is neither among the `keep_last_n` most
    /// recent nor among the `keep_best_n` best. Returns how many were removed.
    fn prune(&self, series_dir: &Path) -> Result<usize, CheckpointError> {
        let checkpoints = scan_series(series_dir)?;
        let older = checkpoints
            .len()
            .saturating_sub(self.config.keep_last_n.max(1));

        let mut ranked: Vec<&(PathBuf, CheckpointMetadata)> = checkpoints.iter().collect();
        ranked.sort_by(|a, b| compare_merit(&b.1.metrics, &a.1.metrics));
        let best: Vec<&Path> = ranked
            .iter()
            .take(self.config.keep_best_n)
            .map(|(path, _)| path.as_path())
            .collect();

        let mut removed = 0;
        for (path, metadata) in &checkpoints[..older] {
            if best.contains(&path.as_path()) {
                continue;
            }
            fs::remove_dir_all(path)?;
            log::debug!("pruned checkpoint at episode {}", metadata.episode);
            removed += 1;
        }
        Ok(removed)
    }
}

/// Order checkpoints by greedy eval reward. Equal rewards favour the one
/// trained for more steps.
fn compare_merit(a: &CheckpointMetrics, b: &CheckpointMetrics) -> Ordering {
    a.eval_reward
        .total_cmp(&b.eval_reward)
        .then(a.training_steps.cmp(&b.training_steps))
}

fn scan_series(
    series_dir: &Path,
) -> Result<Vec<(PathBuf, CheckpointMetadata)>, CheckpointError> {
    let entries = match fs::read_dir(series_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut found = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let is_checkpoint = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| {
                name.starts_with(DIR_PREFIX) && !name.ends_with(STAGING_SUFFIX)
            });
        let metadata_path = path.join(METADATA_FILE);
        if is_checkpoint && metadata_path.is_file() {
            found.push((path, read_metadata(&metadata_path)?));
        }
    }
    found.sort_by_key(|(_, metadata)| metadata.episode);
    Ok(found)
}

/// Repoint `latest` by renaming a fresh symlink over it.
fn point_latest_at(series_dir: &Path, name: &str) -> io::Result<()> {
    let staged = series_dir.join(format!("{LATEST}{STAGING_SUFFIX}"));
    if staged.symlink_metadata().is_ok() {
        fs::remove_file(&staged)?;
    }
    std::os::unix::fs::symlink(name, &staged)?;
    fs::rename(&staged, series_dir.join(LATEST))
}

fn read_text(path: &Path) -> Result<String, CheckpointError> {
    fs::read_to_string(path).map_err(|source| CheckpointError::MetadataRead {
        path: path.to_path_buf(),
        source,
    })
}

fn read_metadata(path: &Path) -> Result<CheckpointMetadata, CheckpointError> {
    serde_json::from_str(&read_text(path)?).map_err(|source| CheckpointError::MetadataParse {
        path: path.to_path_buf(),
        source,
    })
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::algorithms::{DqnAgent, DqnConfig, ReinforceAgent, ReinforceConfig};
    use crate::checkpoint::metadata::CheckpointHyperparameters;

    fn metrics(eval_reward: f32, training_steps: usize) -> CheckpointMetrics {
        CheckpointMetrics {
            eval_reward,
            mean_reward: 42.0,
            mean_loss: 0.05,
            mean_episode_length: 42.0,
            training_steps,
        }
    }

    fn manager_in(dir: &Path, keep_last_n: usize, keep_best_n: usize) -> CheckpointManager {
        CheckpointManager::new(CheckpointManagerConfig {
            checkpoint_dir: dir.to_path_buf(),
            keep_last_n,
            keep_best_n,
        })
    }

    fn small_dqn(seed: u64) -> DqnAgent {
        DqnAgent::with_seed(
            DqnConfig {
                hidden_sizes: vec![8],
                ..Default::default()
            },
            4,
            2,
            seed,
        )
    }

    fn small_reinforce(baseline: bool, seed: u64) -> ReinforceAgent {
        ReinforceAgent::with_seed(
            ReinforceConfig {
                baseline,
                hidden_sizes: vec![8],
                baseline_hidden_sizes: vec![8],
                ..Default::default()
            },
            4,
            2,
            seed,
        )
    }

    fn episodes(manager: &CheckpointManager, series: &str) -> Vec<usize> {
        manager
            .list_checkpoints(series)
            .unwrap()
            .iter()
            .map(|(_, m)| m.episode)
            .collect()
    }

    #[test]
    fn test_series_follow_algorithm_variant() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(dir.path(), 5, 3);

        let dqn = manager
            .save_agent_checkpoint(&small_dqn(0), &metrics(1.0, 10), 20)
            .unwrap();
        let plain = manager
            .save_agent_checkpoint(&small_reinforce(false, 0), &metrics(1.0, 10), 20)
            .unwrap();
        let baseline = manager
            .save_agent_checkpoint(&small_reinforce(true, 0), &metrics(1.0, 10), 20)
            .unwrap();

        assert_eq!(dqn, dir.path().join("dqn").join("checkpoint_0000020"));
        assert_eq!(plain, dir.path().join("reinforce").join("checkpoint_0000020"));
        assert_eq!(
            baseline,
            dir.path().join("reinforce_baseline").join("checkpoint_0000020")
        );
        assert!(baseline.join("value_network.mpk").exists());
        assert!(!plain.join("value_network.mpk").exists());
    }

    #[test]
    fn test_dqn_save_and_resume() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(dir.path(), 5, 3);
        let mut agent = small_dqn(0);
        agent.set_epsilon(0.3);

        let path = manager
            .save_agent_checkpoint(&agent, &metrics(100.0, 1000), 20)
            .unwrap();
        assert!(path.join(METADATA_FILE).exists());
        assert!(path.join(STATE_FILE).exists());
        assert!(path.join("q_network.mpk").exists());
        assert!(path.join("target_network.mpk").exists());

        let data = manager.load_agent_checkpoint(&path).unwrap();
        assert_eq!(data.metadata.episode, 20);
        assert_eq!(data.metadata.algorithm, "DQN");
        assert!(matches!(
            data.metadata.hyperparameters,
            CheckpointHyperparameters::Dqn(_)
        ));

        let mut restored = small_dqn(1);
        let resumed = manager.resume(&mut restored).unwrap().unwrap();
        assert_eq!(resumed.episode, 20);
        assert!((restored.epsilon() - 0.3).abs() < 1e-9);
        assert_eq!(restored.parameter_snapshot(), agent.parameter_snapshot());
    }

    #[test]
    fn test_reinforce_checkpoint_records_hyperparameters() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(dir.path(), 5, 3);
        let agent = ReinforceAgent::with_seed(
            ReinforceConfig {
                baseline: true,
                gamma: 0.9,
                ..Default::default()
            },
            4,
            2,
            1,
        );

        manager
            .save_agent_checkpoint(&agent, &metrics(10.0, 7), 7)
            .unwrap();
        let data = manager.load_agent_latest("reinforce_baseline").unwrap();
        assert_eq!(data.metadata.algorithm, "REINFORCE+baseline");
        match &data.metadata.hyperparameters {
            CheckpointHyperparameters::Reinforce(hp) => {
                assert!(hp.baseline);
                assert!((hp.gamma - 0.9).abs() < 1e-6);
            }
            other => panic!("expected REINFORCE hyperparameters, got {:?}", other),
        }

        let mut restored = ReinforceAgent::with_seed(
            ReinforceConfig {
                baseline: true,
                ..Default::default()
            },
            4,
            2,
            2,
        );
        manager.resume(&mut restored).unwrap();
        let obs = [0.01, 0.0, -0.02, 0.03];
        assert_eq!(
            restored.action_probs(&obs).unwrap(),
            agent.action_probs(&obs).unwrap()
        );
    }

    #[test]
    fn test_resume_rejects_foreign_series() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(dir.path(), 5, 3);
        manager
            .save_agent_checkpoint(&small_reinforce(false, 0), &metrics(5.0, 3), 3)
            .unwrap();
        // A REINFORCE series moved where DQN looks for its checkpoints
        fs::rename(dir.path().join("reinforce"), dir.path().join("dqn")).unwrap();

        let mut agent = small_dqn(0);
        let before = agent.parameter_snapshot();
        let err = manager.resume(&mut agent).unwrap_err();
        assert!(
            matches!(
                err,
                CheckpointError::SeriesMismatch {
                    expected: "dqn",
                    found: "reinforce"
                }
            ),
            "got: {err}"
        );
        assert_eq!(agent.parameter_snapshot(), before);
        assert_eq!(agent.episode_count(), 0);
    }

    #[test]
    fn test_resume_without_checkpoint_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(dir.path(), 5, 3);
        let mut agent = small_dqn(0);
        assert!(manager.resume(&mut agent).unwrap().is_none());

        let err = manager.load_agent_latest("dqn").unwrap_err();
        assert!(matches!(err, CheckpointError::NoLatestSymlink(_)));
    }

    #[test]
    fn test_latest_moves_and_listing_is_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(dir.path(), 10, 10);
        let agent = small_dqn(0);

        for ep in [30, 10, 20] {
            manager
                .save_agent_checkpoint(&agent, &metrics(1.0, ep), ep)
                .unwrap();
        }

        assert_eq!(episodes(&manager, "dqn"), vec![10, 20, 30]);
        // `latest` follows the most recent save, not the highest episode
        let latest = manager.load_agent_latest("dqn").unwrap();
        assert_eq!(latest.metadata.episode, 20);
        assert!(episodes(&manager, "reinforce").is_empty());
    }

    #[test]
    fn test_pruning_keeps_last_and_best() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(dir.path(), 2, 1);
        let agent = small_dqn(0);

        let rewards = [50.0, 480.0, 20.0, 90.0, 120.0];
        for (i, &r) in rewards.iter().enumerate() {
            let episode = (i + 1) * 10;
            manager
                .save_agent_checkpoint(&agent, &metrics(r, episode * 10), episode)
                .unwrap();
        }

        assert_eq!(episodes(&manager, "dqn"), vec![20, 40, 50]);
    }

    #[test]
    fn test_pruning_breaks_reward_ties_by_training_steps() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(dir.path(), 1, 1);
        let agent = small_dqn(0);

        manager
            .save_agent_checkpoint(&agent, &metrics(500.0, 900), 10)
            .unwrap();
        manager
            .save_agent_checkpoint(&agent, &metrics(500.0, 2000), 20)
            .unwrap();
        manager
            .save_agent_checkpoint(&agent, &metrics(30.0, 2500), 30)
            .unwrap();

        // Both early checkpoints reach 500; the longer-trained one survives
        assert_eq!(episodes(&manager, "dqn"), vec![20, 30]);
    }

    #[test]
    fn test_load_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(dir.path(), 5, 3);
        let err = manager
            .load_agent_checkpoint(&dir.path().join("checkpoint_0000001"))
            .unwrap_err();
        assert!(matches!(err, CheckpointError::DirNotFound(_)));
    }

    #[test]
    fn test_metadata_serde() {
        let meta = CheckpointMetadata {
            episode: 150,
            timestamp: 1700000000,
            algorithm: "DQN".to_string(),
            metrics: metrics(250.0, 1000),
            hyperparameters: CheckpointHyperparameters::Dqn(DqnConfig::default()),
        };

        let json = serde_json::to_string_pretty(&meta).unwrap();
        assert!(json.contains("\"kind\": \"dqn\""));
        let deserialized: CheckpointMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.episode, 150);
        assert_eq!(deserialized.hyperparameters.series(), "dqn");
    }
}
