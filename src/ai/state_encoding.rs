use burn::prelude::*;
use burn::tensor::TensorData;

use crate::puzzle::Environment;

/// Encode states into a flat row-major buffer of `states.len() * env.encoded_len()`.
pub fn encode_states_flat<E: Environment>(env: &E, states: &[E::State]) -> Vec<f32> {
    let mut flat = Vec::with_capacity(states.len() * env.encoded_len());
    for state in states {
        env.encode_into(state, &mut flat);
    }
    flat
}

/// Build a `[rows, features]` tensor from a flat row-major buffer.
pub fn rows_to_tensor<B: Backend>(
    flat: Vec<f32>,
    features: usize,
    device: &B::Device,
) -> Tensor<B, 2> {
    let rows = if features == 0 { 0 } else { flat.len() / features };
    Tensor::from_data(TensorData::new(flat, [rows, features]), device)
}
