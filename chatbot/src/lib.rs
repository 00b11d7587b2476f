pub mod models;
pub mod config;
pub mod document_processor;
pub mod gemini_service;
pub mod chat_session;
#[cfg(any(test, feature = "test-util"))]
pub mod test_support;

pub use models::*;
pub use config::Config;
pub use document_processor::DocumentProcessor;
pub use gemini_service::GeminiService;
pub use chat_session::{AttachmentTicket, ChatError, ChatSession, Exchange};
