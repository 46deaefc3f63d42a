use burn::nn::{Linear, LinearConfig, Relu};
use burn::prelude::*;

/// Fully-connected stack: every hidden layer is followed by ReLU, the output
/// layer is left raw.
///
/// ```text
/// Input:   [batch, input_size]
/// Hidden:  input_size -> h0 -> h1 -> ... -> hN, ReLU after each
/// Output:  hN -> output_size
/// ```
#[derive(Module, Debug)]
pub struct Mlp<B: Backend> {
    hidden: Vec<Linear<B>>,
    output: Linear<B>,
    relu: Relu,
}

#[derive(Config, Debug)]
pub struct MlpConfig {
    pub input_size: usize,
    pub hidden_sizes: Vec<usize>,
    pub output_size: usize,
}

impl MlpConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Mlp<B> {
        let mut hidden = Vec::with_capacity(self.hidden_sizes.len());
        let mut fan_in = self.input_size;
        for &size in &self.hidden_sizes {
            hidden.push(LinearConfig::new(fan_in, size).init(device));
            fan_in = size;
        }
        Mlp {
            hidden,
            output: LinearConfig::new(fan_in, self.output_size).init(device),
            relu: Relu::new(),
        }
    }
}

impl<B: Backend> Mlp<B> {
    /// Forward pass: [batch, input_size] -> [batch, output_size].
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let mut x = input;
        for layer in &self.hidden {
            x = self.relu.forward(layer.forward(x));
        }
        self.output.forward(x)
    }

    /// All weights and biases flattened in layer order.
    pub fn flat_parameters(&self) -> Vec<f32> {
        let mut params = Vec::new();
        for layer in self.hidden.iter().chain(std::iter::once(&self.output)) {
            push_tensor(&mut params, layer.weight.val());
            if let Some(bias) = &layer.bias {
                push_tensor(&mut params, bias.val());
            }
        }
        params
    }
}

fn push_tensor<B: Backend, const D: usize>(out: &mut Vec<f32>, tensor: Tensor<B, D>) {
    if let Ok(values) = tensor.into_data().to_vec::<f32>() {
        out.extend(values);
    }
}
