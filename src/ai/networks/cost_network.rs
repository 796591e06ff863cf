use burn::nn::{Linear, LinearConfig, Relu};
use burn::prelude::*;

/// Cost-to-go network for the N-puzzle.
///
/// ```text
/// Input:   [batch, cells * cells]   one-hot tile positions
/// Hidden:  num_hidden_layers x (Linear -> ReLU), width hidden_size
/// Output:  [batch, 1]               estimated moves to goal
/// ```
#[derive(Module, Debug)]
pub struct CostNetwork<B: Backend> {
    hidden: Vec<Linear<B>>,
    head: Linear<B>,
    relu: Relu,
}

#[derive(Config, Debug)]
pub struct CostNetworkConfig {
    pub input_size: usize,
    #[config(default = 256)]
    pub hidden_size: usize,
    #[config(default = 2)]
    pub num_hidden_layers: usize,
}

impl CostNetworkConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> CostNetwork<B> {
        let mut hidden = Vec::with_capacity(self.num_hidden_layers);
        let mut width = self.input_size;
        for _ in 0..self.num_hidden_layers {
            hidden.push(LinearConfig::new(width, self.hidden_size).init(device));
            width = self.hidden_size;
        }
        CostNetwork {
            hidden,
            head: LinearConfig::new(width, 1).init(device),
            relu: Relu::new(),
        }
    }
}

impl<B: Backend> CostNetwork<B> {
    /// Forward pass: input [batch, input_size] -> output [batch, 1].
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let mut x = input;
        for layer in &self.hidden {
            x = self.relu.forward(layer.forward(x));
        }
        self.head.forward(x)
    }
}
