use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{ActionSpace, Environment, Observation, Step, StepInfo};
use crate::error::EnvError;

const GRAVITY: f32 = 9.8;
const CART_MASS: f32 = 1.0;
const POLE_MASS: f32 = 0.1;
const TOTAL_MASS: f32 = CART_MASS + POLE_MASS;
/// Half the pole's length.
const POLE_HALF_LENGTH: f32 = 0.5;
const POLE_MASS_LENGTH: f32 = POLE_MASS * POLE_HALF_LENGTH;
const FORCE_MAG: f32 = 10.0;
/// Seconds between state updates.
const TAU: f32 = 0.02;

const X_THRESHOLD: f32 = 2.4;
const THETA_THRESHOLD_RADIANS: f32 = 12.0 * 2.0 * std::f32::consts::PI / 360.0;
const RESET_BOUND: f32 = 0.05;

/// CartPole settings.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CartPoleConfig {
    /// Episodes are truncated after this many steps.
    pub max_episode_steps: usize,
}

impl Default for CartPoleConfig {
    fn default() -> Self {
        CartPoleConfig {
            max_episode_steps: 500,
        }
    }
}

/// Pole balanced on a cart moving along a frictionless track.
///
/// State is `[x, x_dot, theta, theta_dot]`. Action 0 pushes the cart left,
/// action 1 pushes it right. Every step yields a reward of 1.0, including the
/// step on which the pole falls or the cart leaves the track.
pub struct CartPole {
    config: CartPoleConfig,
    state: [f32; 4],
    elapsed_steps: usize,
    needs_reset: bool,
    rng: StdRng,
}

impl CartPole {
    pub fn new(config: CartPoleConfig) -> Self {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    pub fn with_seed(config: CartPoleConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: CartPoleConfig, rng: StdRng) -> Self {
        CartPole {
            config,
            state: [0.0; 4],
            elapsed_steps: 0,
            needs_reset: true,
            rng,
        }
    }

    /// Current physical state.
    pub fn state(&self) -> [f32; 4] {
        self.state
    }

    fn is_failed(&self) -> bool {
        let [x, _, theta, _] = self.state;
        !(-X_THRESHOLD..=X_THRESHOLD).contains(&x)
            || !(-THETA_THRESHOLD_RADIANS..=THETA_THRESHOLD_RADIANS).contains(&theta)
    }

    fn integrate(&mut self, force: f32) {
        let [x, x_dot, theta, theta_dot] = self.state;
        let (sin_theta, cos_theta) = theta.sin_cos();

        let temp = (force + POLE_MASS_LENGTH * theta_dot * theta_dot * sin_theta) / TOTAL_MASS;
        let theta_acc = (GRAVITY * sin_theta - cos_theta * temp)
            / (POLE_HALF_LENGTH * (4.0 / 3.0 - POLE_MASS * cos_theta * cos_theta / TOTAL_MASS));
        let x_acc = temp - POLE_MASS_LENGTH * theta_acc * cos_theta / TOTAL_MASS;

        // Explicit Euler
        self.state = [
            x + TAU * x_dot,
            x_dot + TAU * x_acc,
            theta + TAU * theta_dot,
            theta_dot + TAU * theta_acc,
        ];
    }
}

impl Environment for CartPole {
    fn reset(&mut self) -> (Observation, StepInfo) {
        for v in self.state.iter_mut() {
            *v = self.rng.random_range(-RESET_BOUND..RESET_BOUND);
        }
        self.elapsed_steps = 0;
        self.needs_reset = false;
        (self.state.to_vec(), StepInfo { elapsed_steps: 0 })
    }

    fn step(&mut self, action: usize) -> Result<Step, EnvError> {
        if self.needs_reset {
            return Err(EnvError::NeedsReset);
        }
        let space = self.action_space();
        if !space.contains(action) {
            return Err(EnvError::InvalidAction {
                action,
                num_actions: space.num_actions(),
            });
        }

        let force = if action == 1 { FORCE_MAG } else { -FORCE_MAG };
        self.integrate(force);
        self.elapsed_steps += 1;

        let terminated = self.is_failed();
        let truncated = self.elapsed_steps >= self.config.max_episode_steps;
        self.needs_reset = terminated || truncated;

        Ok(Step {
            observation: self.state.to_vec(),
            reward: 1.0,
            terminated,
            truncated,
            info: StepInfo {
                elapsed_steps: self.elapsed_steps,
            },
        })
    }

    fn action_space(&self) -> ActionSpace {
        ActionSpace::Discrete(2)
    }

    fn observation_size(&self) -> usize {
        4
    }
}
