use chatbot::{Attachment, Message};
use serde::Serialize;
use uuid::Uuid;

#[derive(Serialize)]
pub struct CreatedSession {
    pub session_id: Uuid,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub messages: Vec<Message>,
    pub is_typing: bool,
    pub attachment: Attachment,
}
