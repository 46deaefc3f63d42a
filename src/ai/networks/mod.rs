mod mlp;
mod policy_network;
mod q_network;

pub use mlp::{Mlp, MlpConfig};
pub use policy_network::{PolicyNetwork, PolicyNetworkConfig, ValueNetwork, ValueNetworkConfig};
pub use q_network::{QNetwork, QNetworkConfig};
