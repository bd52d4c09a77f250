pub mod service;
pub mod types;

pub use service::OpenAiService;
pub use types::ChatMessage;
