//! Periodic persistence of the live network.

mod manager;

pub use manager::{
    load_network, should_save, CheckpointManager, CheckpointOutcome, CheckpointStore,
    FileCheckpointStore,
};
