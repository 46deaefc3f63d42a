mod dqn;
mod reinforce;

pub use dqn::{DqnAgent, DqnConfig};
pub use reinforce::{ReinforceAgent, ReinforceConfig};
