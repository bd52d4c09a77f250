pub mod chat;

pub use chat::{Role, Session, Turn};
