use crate::ai::{Agent, RandomAgent, TrainableAgent, Transition};
use crate::env::Environment;
use crate::error::TrainingError;
use crate::training::metrics::EpisodeRecord;

/// Fill the agent's replay memory with transitions from uniformly random actions.
///
/// Episodes are reset as they end; the environment is left mid-episode.
pub fn run_warmup(
    env: &mut dyn Environment,
    agent: &mut dyn TrainableAgent,
    random: &mut RandomAgent,
) -> Result<usize, TrainingError> {
    let steps = agent.warmup_steps();
    if steps == 0 {
        return Ok(0);
    }

    let (mut observation, _) = env.reset();
    for _ in 0..steps {
        let action = random.select_action(&observation, true)?;
        let step = env.step(action)?;
        let done = step.is_done();
        agent.remember(Transition {
            state: observation,
            action,
            next_state: step.observation.clone(),
            reward: step.reward,
            done,
        });
        observation = if done { env.reset().0 } else { step.observation };
    }
    Ok(steps)
}

/// Play one training episode, feeding every transition to the agent, and
/// finish it with the agent's end-of-episode update.
pub fn run_training_episode(
    env: &mut dyn Environment,
    agent: &mut dyn TrainableAgent,
    max_steps: usize,
    episode: usize,
) -> Result<EpisodeRecord, TrainingError> {
    let (mut observation, _) = env.reset();
    let mut total_reward = 0.0;
    let mut length = 0;

    while length < max_steps {
        let action = agent.select_action(&observation, true)?;
        let step = env.step(action)?;
        let done = step.is_done();
        total_reward += step.reward;
        length += 1;

        agent.observe(Transition {
            state: observation,
            action,
            next_state: step.observation.clone(),
            reward: step.reward,
            done,
        })?;

        if done {
            break;
        }
        observation = step.observation;
    }

    let update = agent.end_episode()?;
    Ok(EpisodeRecord {
        episode,
        total_reward,
        loss: update.loss,
        length,
    })
}

/// Play one greedy episode without learning and return its total reward.
pub fn run_eval_episode<A: Agent + ?Sized>(
    env: &mut dyn Environment,
    agent: &mut A,
    max_steps: usize,
) -> Result<f32, TrainingError> {
    let (mut observation, _) = env.reset();
    let mut total_reward = 0.0;

    for _ in 0..max_steps {
        let action = agent.select_action(&observation, false)?;
        let step = env.step(action)?;
        total_reward += step.reward;
        if step.is_done() {
            break;
        }
        observation = step.observation;
    }
    Ok(total_reward)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::algorithms::{DqnAgent, DqnConfig, ReinforceAgent, ReinforceConfig};
    use crate::env::{CartPole, CartPoleConfig};

    fn cart_pole(max_episode_steps: usize) -> CartPole {
        CartPole::with_seed(CartPoleConfig { max_episode_steps }, 11)
    }

    fn small_dqn(warmup_steps: usize, batch_size: usize) -> DqnAgent {
        DqnAgent::with_seed(
            DqnConfig {
                hidden_sizes: vec![8],
                warmup_steps,
                batch_size,
                replay_capacity: 1000,
                ..Default::default()
            },
            4,
            2,
            3,
        )
    }

    #[test]
    fn test_warmup_fills_replay_without_training() {
        let mut env = cart_pole(500);
        let mut agent = small_dqn(150, 32);
        let mut random = RandomAgent::with_seed(env.action_space(), 0);

        let steps = run_warmup(&mut env, &mut agent, &mut random).unwrap();
        assert_eq!(steps, 150);
        assert_eq!(agent.replay_len(), 150);
        assert_eq!(agent.env_steps(), 0);
        assert_eq!(agent.step_count(), 0);
    }

    #[test]
    fn test_warmup_noop_for_reinforce() {
        let mut env = cart_pole(500);
        let mut agent = ReinforceAgent::with_seed(ReinforceConfig::default(), 4, 2, 0);
        let mut random = RandomAgent::with_seed(env.action_space(), 0);
        assert_eq!(run_warmup(&mut env, &mut agent, &mut random).unwrap(), 0);
    }

    #[test]
    fn test_training_episode_respects_step_budget() {
        let mut env = cart_pole(500);
        let mut agent = ReinforceAgent::with_seed(ReinforceConfig::default(), 4, 2, 1);

        let record = run_training_episode(&mut env, &mut agent, 5, 1).unwrap();
        assert!(record.length <= 5);
        assert_eq!(record.total_reward, record.length as f32);
        assert_eq!(agent.episode_count(), 1);
        assert_eq!(agent.trajectory_len(), 0);
    }

    #[test]
    fn test_training_episode_stops_at_truncation() {
        let mut env = cart_pole(3);
        let mut agent = small_dqn(0, 1000);

        let record = run_training_episode(&mut env, &mut agent, 100, 1).unwrap();
        assert!(record.length <= 3);
        assert_eq!(agent.env_steps(), record.length);
        assert_eq!(record.loss, 0.0);
    }

    #[test]
    fn test_eval_episode_does_not_learn() {
        let mut env = cart_pole(50);
        let mut agent = small_dqn(0, 8);
        let eps = agent.epsilon();

        let reward = run_eval_episode(&mut env, &mut agent, 50).unwrap();
        assert!(reward >= 1.0 && reward <= 50.0);
        assert_eq!(agent.replay_len(), 0);
        assert_eq!(agent.epsilon(), eps);
    }
}
