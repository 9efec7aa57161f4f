//! Doctor directory and patient/doctor chat, both backed by injected storage.

pub mod chat;
pub mod directory;
pub mod router;

pub use chat::{
    seed_conversations, ChatError, ChatMessage, ChatRepository, Conversation, Participant,
    SenderRole, CHATS_KEY,
};
pub use directory::{Doctor, DoctorDirectory, ALL_SPECIALIZATIONS};
pub use router::{consult_router, ConsultService};
