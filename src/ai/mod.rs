//! Networks and the pieces that read or write their parameters: state
//! encoding, target-network labeling, and target synchronization.

use burn::backend::Autodiff;
use burn::prelude::Backend;

pub mod labels;
pub mod networks;
pub mod state_encoding;
pub mod sync;

pub use labels::label_states;
pub use networks::{CostNetwork, CostNetworkConfig};
pub use sync::{hard_copy, soft_update};

#[cfg(not(feature = "wgpu"))]
pub type InferBackend = burn::backend::NdArray<f32>;
#[cfg(feature = "wgpu")]
pub type InferBackend = burn::backend::Wgpu<f32, i32>;

pub type TrainBackend = Autodiff<InferBackend>;

pub type Device = <InferBackend as Backend>::Device;
