mod cost_network;

pub use cost_network::{CostNetwork, CostNetworkConfig};
