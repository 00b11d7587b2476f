use crate::config::Config;
use crate::models::*;
use anyhow::Result;
use reqwest::Client;

pub struct GeminiService {
    client: Client,
    api_key: String,
    url: String,
    generation_config: Option<GeminiGenerationConfig>,
}

impl GeminiService {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            url: config.generate_url(),
            generation_config: GeminiGenerationConfig::from_parts(
                config.temperature,
                config.max_output_tokens,
            ),
        })
    }

    /// Sends the whole conversation, plus the attached PDF text if any, and returns the reply text.
    pub async fn generate_reply(&self, history: &[Message], pdf_text: Option<&str>) -> Result<String> {
        let request = GeminiRequest {
            contents: build_contents(history, pdf_text),
            generation_config: self.generation_config,
        };

        log::debug!("Calling Gemini with {} contents", request.contents.len());

        let response = self
            .client
            .post(&self.url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(anyhow::anyhow!("Gemini API error ({}): {}", status, error_text));
        }

        let gemini_response: GeminiResponse = response.json().await?;
        Ok(gemini_response.reply_text())
    }
}

/// One content per message in transcript order; the PDF text goes last as an extra user turn.
pub fn build_contents(history: &[Message], pdf_text: Option<&str>) -> Vec<GeminiContent> {
    let mut contents: Vec<GeminiContent> = history
        .iter()
        .map(|msg| text_content(msg.sender.gemini_role(), &msg.text))
        .collect();

    if let Some(text) = pdf_text.filter(|t| !t.is_empty()) {
        contents.push(text_content(Sender::User.gemini_role(), text));
    }

    contents
}

fn text_content(role: &str, text: &str) -> GeminiContent {
    GeminiContent {
        role: Some(role.to_string()),
        parts: vec![GeminiPart {
            text: text.to_string(),
        }],
    }
}
