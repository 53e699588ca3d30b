pub mod sensay;
pub mod types;

pub use sensay::SensayClient;
pub use types::{LlmSettings, NewReplica, Replica, TrainingItem, TrainingUpdate};
