use crate::document_processor::{DocumentProcessor, PDF_CONTENT_TYPE};
use crate::gemini_service::GeminiService;
use crate::models::*;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message is empty")]
    EmptyMessage,
    #[error("a reply is already being generated")]
    Busy,
    #[error("{0}")]
    UnsupportedFile(String),
}

/// A submitted user message and the bot message appended for it.
#[derive(Debug, Clone, Serialize)]
pub struct Exchange {
    pub user_message: Message,
    pub reply: Message,
}

/// Handle returned when an upload starts parsing; stale tickets are ignored on finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentTicket(u64);

/// Conversation state for one user: the transcript, the attached PDF and the typing flag.
pub struct ChatSession {
    gemini: Arc<GeminiService>,
    processor: DocumentProcessor,
    messages: Mutex<Vec<Message>>,
    awaiting_reply: AtomicBool,
    attachment: watch::Sender<Attachment>,
    uploads: AtomicU64,
}

struct TypingGuard<'a>(&'a AtomicBool);

impl Drop for TypingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ChatSession {
    pub fn new(gemini: Arc<GeminiService>) -> Self {
        let (attachment, _) = watch::channel(Attachment::None);
        Self {
            gemini,
            processor: DocumentProcessor::new(),
            messages: Mutex::new(Vec::new()),
            awaiting_reply: AtomicBool::new(false),
            attachment,
            uploads: AtomicU64::new(0),
        }
    }

    pub fn messages(&self) -> Vec<Message> {
        self.lock_messages().clone()
    }

    pub fn attachment(&self) -> Attachment {
        self.attachment.borrow().clone()
    }

    pub fn is_typing(&self) -> bool {
        self.awaiting_reply.load(Ordering::Acquire)
    }

    /// Appends the user message, asks Gemini and appends the reply.
    ///
    /// Waits for a PDF that is still parsing. Any failure of the Gemini call is
    /// turned into the fixed fallback reply, so on success exactly two messages
    /// are appended in order.
    pub async fn send(&self, input: &str) -> Result<Exchange, ChatError> {
        let text = input.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        if self
            .awaiting_reply
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ChatError::Busy);
        }
        let _typing = TypingGuard(&self.awaiting_reply);

        let user_message = self.append(Sender::User, text.to_string());

        let attachment = self.wait_for_attachment().await;
        let history = self.messages();

        let reply_text = match self
            .gemini
            .generate_reply(&history, attachment.ready_text())
            .await
        {
            Ok(reply) => {
                log::info!("Received reply ({} characters)", reply.chars().count());
                reply
            }
            Err(e) => {
                log::error!("Failed to fetch reply: {e:#}");
                FALLBACK_REPLY.to_string()
            }
        };

        let reply = self.append(Sender::Bot, reply_text);
        Ok(Exchange {
            user_message,
            reply,
        })
    }

    /// Resolves once no PDF is being parsed and returns the settled attachment.
    pub async fn wait_for_attachment(&self) -> Attachment {
        let mut rx = self.attachment.subscribe();
        let settled = match rx.wait_for(|a| !a.is_parsing()).await {
            Ok(attachment) => attachment.clone(),
            // Only possible once the sender is dropped, i.e. never while `self` is alive.
            Err(_) => Attachment::None,
        };
        settled
    }

    /// Validates the upload and marks it as parsing, replacing any earlier attachment.
    pub fn begin_attachment(
        &self,
        file_name: &str,
        content_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<AttachmentTicket, ChatError> {
        self.processor
            .validate(file_name, content_type, bytes)
            .map_err(|e| ChatError::UnsupportedFile(e.to_string()))?;

        let ticket = AttachmentTicket(self.uploads.fetch_add(1, Ordering::AcqRel) + 1);
        self.attachment.send_replace(Attachment::Parsing {
            file_name: file_name.to_string(),
        });
        log::info!("Parsing PDF {file_name}");
        Ok(ticket)
    }

    /// Extracts the text and publishes the result, unless a newer upload has started meanwhile.
    pub async fn finish_attachment(
        &self,
        ticket: AttachmentTicket,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Attachment {
        let outcome = match self
            .processor
            .extract(file_name, Some(PDF_CONTENT_TYPE), bytes)
            .await
        {
            Ok(text) => Attachment::Ready {
                file_name: file_name.to_string(),
                text,
            },
            Err(e) => {
                log::warn!("Could not parse {file_name}: {e:#}");
                Attachment::Failed {
                    file_name: file_name.to_string(),
                    reason: e.to_string(),
                }
            }
        };

        self.attachment.send_if_modified(|current| {
            if self.uploads.load(Ordering::Acquire) == ticket.0 {
                *current = outcome.clone();
                true
            } else {
                false
            }
        });
        outcome
    }

    pub async fn attach_pdf(
        &self,
        file_name: &str,
        content_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<Attachment, ChatError> {
        let ticket = self.begin_attachment(file_name, content_type, &bytes)?;
        Ok(self.finish_attachment(ticket, file_name, bytes).await)
    }

    fn append(&self, sender: Sender, text: String) -> Message {
        let mut messages = self.lock_messages();
        let now = chrono::Utc::now().timestamp_millis();
        let id = match messages.last() {
            Some(last) => now.max(last.id + 1),
            None => now,
        };
        let message = Message { id, sender, text };
        messages.push(message.clone());
        message
    }

    fn lock_messages(&self) -> MutexGuard<'_, Vec<Message>> {
        // The transcript is only ever pushed to, so a poisoned lock still holds a valid list.
        self.messages.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
