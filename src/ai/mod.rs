mod agent;
pub mod algorithms;
pub mod encoding;
pub mod exploration;
pub mod networks;
mod random;
pub mod returns;

pub use agent::{Agent, TrainableAgent, Transition, UpdateMetrics};
pub use algorithms::{DqnAgent, DqnConfig, ReinforceAgent, ReinforceConfig};
pub use random::RandomAgent;
