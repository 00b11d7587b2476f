use serde::{Deserialize, Serialize};

pub const NO_RESPONSE: &str = "(No response)";
pub const FALLBACK_REPLY: &str = "Failed to fetch response. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

impl Sender {
    /// Role name Gemini expects for this sender.
    pub fn gemini_role(self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Bot => "model",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub sender: Sender,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum Attachment {
    None,
    Parsing { file_name: String },
    Ready { file_name: String, text: String },
    Failed { file_name: String, reason: String },
}

impl Attachment {
    pub fn file_name(&self) -> Option<&str> {
        match self {
            Attachment::None => None,
            Attachment::Parsing { file_name }
            | Attachment::Ready { file_name, .. }
            | Attachment::Failed { file_name, .. } => Some(file_name),
        }
    }

    pub fn is_parsing(&self) -> bool {
        matches!(self, Attachment::Parsing { .. })
    }

    /// Extracted text, only when parsing finished and produced something.
    pub fn ready_text(&self) -> Option<&str> {
        match self {
            Attachment::Ready { text, .. } if !text.is_empty() => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
    pub contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeminiPart {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

impl GeminiGenerationConfig {
    /// `None` when neither knob is set, so the request leaves generation to the model defaults.
    pub fn from_parts(temperature: Option<f32>, max_output_tokens: Option<u32>) -> Option<Self> {
        if temperature.is_none() && max_output_tokens.is_none() {
            return None;
        }
        Some(Self {
            temperature,
            max_output_tokens,
        })
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiCandidate {
    #[serde(default)]
    pub content: Option<GeminiContent>,
}

impl GeminiResponse {
    /// Text of the first part of the first candidate, or the placeholder.
    pub fn reply_text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .and_then(|c| c.parts.first())
            .map(|p| p.text.as_str())
            .filter(|t| !t.is_empty())
            .unwrap_or(NO_RESPONSE)
            .to_string()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sender_maps_to_gemini_roles() {
        assert_eq!(Sender::User.gemini_role(), "user");
        assert_eq!(Sender::Bot.gemini_role(), "model");
    }

    #[test]
    fn message_serializes_sender_lowercase() {
        let msg = Message {
            id: 7,
            sender: Sender::Bot,
            text: "hi".to_string(),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value, json!({"id": 7, "sender": "bot", "text": "hi"}));
    }

    #[test]
    fn reply_text_reads_first_candidate() {
        let response: GeminiResponse = serde_json::from_value(json!({
            "candidates": [
                {"content": {"role": "model", "parts": [{"text": "first"}, {"text": "second"}]}},
                {"content": {"role": "model", "parts": [{"text": "other"}]}}
            ]
        }))
        .unwrap();
        assert_eq!(response.reply_text(), "first");
    }

    #[test]
    fn reply_text_falls_back_on_missing_pieces() {
        let cases = [
            json!({}),
            json!({"candidates": []}),
            json!({"candidates": [{}]}),
            json!({"candidates": [{"content": {"parts": []}}]}),
            json!({"candidates": [{"content": {"parts": [{"text": ""}]}}]}),
            json!({"error": {"code": 400, "message": "bad"}}),
        ];
        for case in cases {
            let response: GeminiResponse = serde_json::from_value(case.clone()).unwrap();
            assert_eq!(response.reply_text(), NO_RESPONSE, "case: {case}");
        }
    }

    #[test]
    fn request_omits_missing_generation_config() {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: "hello".to_string(),
                }],
            }],
            generation_config: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({"contents": [{"role": "user", "parts": [{"text": "hello"}]}]})
        );
    }

    #[test]
    fn generation_config_uses_camel_case_keys() {
        let request = GeminiRequest {
            contents: Vec::new(),
            generation_config: GeminiGenerationConfig::from_parts(Some(0.5), Some(256)),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({"contents": [], "generationConfig": {"temperature": 0.5, "maxOutputTokens": 256}})
        );

        let only_tokens = GeminiGenerationConfig::from_parts(None, Some(64));
        assert_eq!(
            serde_json::to_value(only_tokens).unwrap(),
            json!({"maxOutputTokens": 64})
        );
        assert_eq!(GeminiGenerationConfig::from_parts(None, None), None);
    }

    #[test]
    fn attachment_ready_text_ignores_empty_and_pending() {
        let parsing = Attachment::Parsing {
            file_name: "a.pdf".to_string(),
        };
        assert!(parsing.is_parsing());
        assert_eq!(parsing.ready_text(), None);
        assert_eq!(parsing.file_name(), Some("a.pdf"));

        let empty = Attachment::Ready {
            file_name: "a.pdf".to_string(),
            text: String::new(),
        };
        assert_eq!(empty.ready_text(), None);

        let ready = Attachment::Ready {
            file_name: "a.pdf".to_string(),
            text: "body".to_string(),
        };
        assert_eq!(ready.ready_text(), Some("body"));
        assert_eq!(Attachment::None.file_name(), None);
    }

    #[test]
    fn attachment_serializes_with_state_tag() {
        let value = serde_json::to_value(Attachment::Parsing {
            file_name: "doc.pdf".to_string(),
        })
        .unwrap();
        assert_eq!(value, json!({"state": "parsing", "file_name": "doc.pdf"}));
        assert_eq!(
            serde_json::to_value(Attachment::None).unwrap(),
            json!({"state": "none"})
        );
    }
}
