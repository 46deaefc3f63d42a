use burn::prelude::*;

use super::mlp::{Mlp, MlpConfig};

/// Action-value network: observation -> one Q-value per action.
#[derive(Module, Debug)]
pub struct QNetwork<B: Backend> {
    mlp: Mlp<B>,
}

#[derive(Config, Debug)]
pub struct QNetworkConfig {
    pub observation_size: usize,
    pub num_actions: usize,
    #[config(default = "vec![128, 64, 32, 64, 128]")]
    pub hidden_sizes: Vec<usize>,
}

impl QNetworkConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> QNetwork<B> {
        QNetwork {
            mlp: MlpConfig::new(
                self.observation_size,
                self.hidden_sizes.clone(),
                self.num_actions,
            )
            .init(device),
        }
    }
}

impl<B: Backend> QNetwork<B> {
    /// Forward pass: [batch, obs] -> [batch, num_actions] Q-values.
    pub fn forward(&self, observations: Tensor<B, 2>) -> Tensor<B, 2> {
        self.mlp.forward(observations)
    }

    pub fn flat_parameters(&self) -> Vec<f32> {
        self.mlp.flat_parameters()
    }
}
