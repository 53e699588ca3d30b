pub mod manager;
pub mod store;

pub use manager::{
    age_on, conversation_context, ChatBackend, ChatSession, PendingReply, ReplicaChat,
    SessionError,
};
pub use store::{FileStore, MemoryStore, SessionStore, MESSAGES_KEY, PROFILE_KEY};
