//! Environment contract and the CartPole balancing task.

mod cart_pole;

pub use cart_pole::{CartPole, CartPoleConfig};

use rand::Rng;

use crate::error::EnvError;

/// Flat observation vector emitted by an environment.
pub type Observation = Vec<f32>;

/// Auxiliary per-step information.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepInfo {
    /// Steps taken since the last reset.
    pub elapsed_steps: usize,
}

/// Outcome of a single environment step.
#[derive(Debug, Clone)]
pub struct Step {
    pub observation: Observation,
    pub reward: f32,
    pub terminated: bool,
    pub truncated: bool,
    pub info: StepInfo,
}

impl Step {
    /// True when the episode ended, by failure or by time limit.
    pub fn is_done(&self) -> bool {
        self.terminated || self.truncated
    }
}

/// Action space of an environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionSpace {
    Discrete(usize),
}

impl ActionSpace {
    pub fn num_actions(&self) -> usize {
        match self {
            ActionSpace::Discrete(n) => *n,
        }
    }

    pub fn contains(&self, action: usize) -> bool {
        action < self.num_actions()
    }

    /// Draw a uniformly random action.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> usize {
        rng.random_range(0..self.num_actions())
    }
}

/// A simulated control task with a discrete action space.
pub trait Environment {
    /// Start a new episode.
    fn reset(&mut self) -> (Observation, StepInfo);

    /// Advance the simulation by one action.
    fn step(&mut self, action: usize) -> Result<Step, EnvError>;

    fn action_space(&self) -> ActionSpace;

    fn observation_size(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_discrete_sample_in_range() {
        let space = ActionSpace::Discrete(3);
        let mut rng = StdRng::seed_from_u64(7);
        let mut seen = [false; 3];
        for _ in 0..200 {
            let a = space.sample(&mut rng);
            assert!(space.contains(a));
            seen[a] = true;
        }
        assert!(seen.iter().all(|&s| s), "all actions should be drawn: {:?}", seen);
    }

    #[test]
    fn test_step_is_done() {
        let step = Step {
            observation: vec![0.0; 4],
            reward: 1.0,
            terminated: false,
            truncated: true,
            info: StepInfo::default(),
        };
        assert!(step.is_done());
    }
}
