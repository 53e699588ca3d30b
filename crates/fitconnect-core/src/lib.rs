pub mod ai;
pub mod config;
pub mod language;
pub mod replica;
pub mod session;
pub mod state;
pub mod training;

// Re-export main types for convenience
pub use ai::{Replica, SensayClient, TrainingItem, TrainingUpdate};
pub use config::Config;
pub use language::Language;
pub use session::{ChatBackend, ChatSession, FileStore, ReplicaChat, SessionError};
pub use state::{ChatMessage, Sender, UserProfile};
