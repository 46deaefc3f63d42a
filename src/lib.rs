//! # cartpole-rl
//!
//! Deep Q-Network and REINFORCE agents for the CartPole balancing task,
//! trained on the Burn ML framework's NdArray CPU backend.
//!
//! ## Modules
//!
//! - [`env`]: environment contract and the CartPole simulation
//! - [`ai`]: agent traits, DQN and REINFORCE, networks, exploration, returns
//! - [`training`]: episode rollouts, trainer loop, replay buffer, run history
//! - [`checkpoint`]: model persistence and pruning
//! - [`ui`]: terminal reward/loss charts
//! - [`config`]: TOML configuration loading and validation
//! - [`error`]: structured error types

#![recursion_limit = "256"]

pub mod ai;
pub mod checkpoint;
pub mod config;
pub mod env;
pub mod error;
pub mod training;
pub mod ui;
