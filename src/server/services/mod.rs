pub mod chat;
pub mod conversation;
pub mod openai;
pub mod session_store;
