use rand::rngs::StdRng;
use rand::SeedableRng;

use super::agent::Agent;
use crate::env::ActionSpace;
use crate::error::TrainingError;

/// An agent that selects uniformly at random from the action space.
pub struct RandomAgent {
    action_space: ActionSpace,
    rng: StdRng,
}

impl RandomAgent {
    pub fn new(action_space: ActionSpace) -> Self {
        RandomAgent {
            action_space,
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn with_seed(action_space: ActionSpace, seed: u64) -> Self {
        RandomAgent {
            action_space,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Agent for RandomAgent {
    fn select_action(
        &mut self,
        _observation: &[f32],
        _training: bool,
    ) -> Result<usize, TrainingError> {
        Ok(self.action_space.sample(&mut self.rng))
    }

    fn name(&self) -> &str {
        "Random"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{CartPole, CartPoleConfig, Environment};

    #[test]
    fn test_random_agent_selects_valid_action() {
        let space = ActionSpace::Discrete(2);
        let mut agent = RandomAgent::with_seed(space, 11);
        for _ in 0..100 {
            let action = agent.select_action(&[0.0; 4], false).unwrap();
            assert!(space.contains(action), "Action {} is not valid", action);
        }
    }

    #[test]
    fn test_random_agent_plays_full_episode() {
        let mut env = CartPole::with_seed(CartPoleConfig::default(), 2);
        let mut agent = RandomAgent::with_seed(env.action_space(), 2);
        let (mut obs, _) = env.reset();

        let mut steps = 0;
        loop {
            let action = agent.select_action(&obs, false).unwrap();
            let step = env.step(action).unwrap();
            steps += 1;
            obs = step.observation.clone();
            if step.is_done() {
                break;
            }
        }
        assert!(steps > 0 && steps <= 500);
    }

    #[test]
    fn test_random_agent_name() {
        let agent = RandomAgent::new(ActionSpace::Discrete(2));
        assert_eq!(agent.name(), "Random");
    }
}
