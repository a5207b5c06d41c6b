//! Training collaborator: produces the weights file the server loads.

pub mod checkpointing;
pub mod data;
pub mod trainer;

pub use checkpointing::Checkpointer;
pub use data::{DigitBatch, DigitBatcher};
pub use trainer::{train, EpochStats, TrainingSummary};
