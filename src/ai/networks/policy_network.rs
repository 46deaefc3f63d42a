use burn::prelude::*;
use burn::tensor::activation::{log_softmax, softmax};

use super::mlp::{Mlp, MlpConfig};

/// Stochastic policy: observation -> action probabilities.
///
/// ```text
/// Input:  [batch, 4]
/// FC1:    4 -> 16, ReLU
/// FC2:    16 -> 16, ReLU
/// FC3:    16 -> 2, softmax
/// ```
#[derive(Module, Debug)]
pub struct PolicyNetwork<B: Backend> {
    mlp: Mlp<B>,
}

#[derive(Config, Debug)]
pub struct PolicyNetworkConfig {
    pub observation_size: usize,
    pub num_actions: usize,
    #[config(default = "vec![16, 16]")]
    pub hidden_sizes: Vec<usize>,
}

impl PolicyNetworkConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> PolicyNetwork<B> {
        PolicyNetwork {
            mlp: MlpConfig::new(
                self.observation_size,
                self.hidden_sizes.clone(),
                self.num_actions,
            )
            .init(device),
        }
    }
}

impl<B: Backend> PolicyNetwork<B> {
    /// Action probabilities, [batch, num_actions], rows sum to one.
    pub fn forward(&self, observations: Tensor<B, 2>) -> Tensor<B, 2> {
        softmax(self.mlp.forward(observations), 1)
    }

    /// Log action probabilities, computed from the logits for stability.
    pub fn log_probs(&self, observations: Tensor<B, 2>) -> Tensor<B, 2> {
        log_softmax(self.mlp.forward(observations), 1)
    }
}

/// State-value baseline: observation -> scalar estimate of the return.
#[derive(Module, Debug)]
pub struct ValueNetwork<B: Backend> {
    mlp: Mlp<B>,
}

#[derive(Config, Debug)]
pub struct ValueNetworkConfig {
    pub observation_size: usize,
    #[config(default = "vec![16, 16]")]
    pub hidden_sizes: Vec<usize>,
}

impl ValueNetworkConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ValueNetwork<B> {
        ValueNetwork {
            mlp: MlpConfig::new(self.observation_size, self.hidden_sizes.clone(), 1).init(device),
        }
    }
}

impl<B: Backend> ValueNetwork<B> {
    /// Forward pass: [batch, obs] -> [batch, 1].
    pub fn forward(&self, observations: Tensor<B, 2>) -> Tensor<B, 2> {
        self.mlp.forward(observations)
    }
}
