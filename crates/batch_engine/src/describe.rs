use std::fmt;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{json, Value};

/// Field-specific instruction sent with the image, with a cap on the
/// reply length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub text: String,
    pub max_output_tokens: u32,
}

impl Prompt {
    pub fn title(language: &str) -> Self {
        Self {
            text: format!(
                "Generate the response in {language}. Analyze this image and generate a \
                 concise, descriptive title (5-10 words) suitable for this image as an \
                 attachment title on a website. Be specific and avoid generic phrases. \
                 Provide ONLY the final title, without explanations or introductory text."
            ),
            max_output_tokens: 50,
        }
    }

    pub fn alt_text(language: &str) -> Self {
        Self {
            text: format!(
                "Generate the response in {language}. Analyze this image and generate \
                 concise, descriptive alt text (maximum 125 characters) useful for \
                 accessibility and SEO. Do not use phrases like \"image of\" or \
                 \"picture of\". Provide ONLY the final alt text, without explanations \
                 or introductory text."
            ),
            max_output_tokens: 60,
        }
    }

    pub fn caption(language: &str) -> Self {
        Self {
            text: format!(
                "Generate the response in {language}. Analyze this image and generate a \
                 brief, descriptive caption (1-2 short sentences) that provides \
                 interesting context or information about the image to display below \
                 it. Provide ONLY the final caption, without explanations or \
                 introductory text."
            ),
            max_output_tokens: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribeError {
    pub kind: DescribeFailure,
    pub message: String,
}

impl DescribeError {
    pub(crate) fn new(kind: DescribeFailure, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for DescribeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for DescribeError {}

/// Describer failure taxonomy. `Blocked` and `Empty` are the model
/// failing closed; they are distinct from network-level trouble.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescribeFailure {
    /// The model returned no candidates (safety block or refusal).
    Blocked,
    /// A candidate arrived but carried no usable text.
    Empty,
    HttpStatus(u16),
    Timeout,
    Network,
    InvalidResponse,
}

impl fmt::Display for DescribeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DescribeFailure::Blocked => write!(f, "blocked by model"),
            DescribeFailure::Empty => write!(f, "empty reply"),
            DescribeFailure::HttpStatus(code) => write!(f, "http status {code}"),
            DescribeFailure::Timeout => write!(f, "timeout"),
            DescribeFailure::Network => write!(f, "network error"),
            DescribeFailure::InvalidResponse => write!(f, "invalid response"),
        }
    }
}

/// Vision-model seam: one image plus one prompt in, one cleaned line of
/// text out.
#[async_trait::async_trait]
pub trait Describer: Send + Sync {
    async fn describe(
        &self,
        image: &[u8],
        mime: &str,
        prompt: &Prompt,
    ) -> Result<String, DescribeError>;
}

#[derive(Debug, Clone)]
pub struct DescriberSettings {
    pub api_key: String,
    pub model: String,
    /// Base URL up to and including the models segment.
    pub api_base: String,
    pub request_timeout: Duration,
    pub temperature: f64,
}

impl Default for DescriberSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gemini-1.5-flash-latest".to_string(),
            api_base: "https://generativelanguage.googleapis.com/v1beta/models/".to_string(),
            request_timeout: Duration::from_secs(90),
            temperature: 0.7,
        }
    }
}

/// Describer speaking the `generateContent` inline-data protocol.
#[derive(Debug, Clone)]
pub struct GeminiDescriber {
    settings: DescriberSettings,
    client: reqwest::Client,
}

impl GeminiDescriber {
    pub fn new(settings: DescriberSettings) -> Result<Self, DescribeError> {
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| DescribeError::new(DescribeFailure::Network, err.to_string()))?;
        Ok(Self { settings, client })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}{}:generateContent?key={}",
            self.settings.api_base, self.settings.model, self.settings.api_key
        )
    }
}

#[async_trait::async_trait]
impl Describer for GeminiDescriber {
    async fn describe(
        &self,
        image: &[u8],
        mime: &str,
        prompt: &Prompt,
    ) -> Result<String, DescribeError> {
        let body = json!({
            "contents": [{
                "parts": [
                    { "text": prompt.text },
                    { "inline_data": { "mime_type": mime, "data": BASE64.encode(image) } },
                ],
            }],
            "generationConfig": {
                "temperature": self.settings.temperature,
                "maxOutputTokens": prompt.max_output_tokens,
            },
        });

        let response = self
            .client
            .post(self.endpoint())
            .json(&body)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        let reply: Value = response.json().await.map_err(|err| {
            DescribeError::new(DescribeFailure::InvalidResponse, err.to_string())
        })?;

        if !status.is_success() {
            let message = reply
                .pointer("/error/message")
                .and_then(Value::as_str)
                .unwrap_or("request failed");
            return Err(DescribeError::new(
                DescribeFailure::HttpStatus(status.as_u16()),
                message,
            ));
        }

        let candidates = reply
            .get("candidates")
            .and_then(Value::as_array)
            .filter(|candidates| !candidates.is_empty());
        let Some(candidates) = candidates else {
            // No candidates means the model failed closed.
            let reason = reply
                .pointer("/promptFeedback/blockReason")
                .and_then(Value::as_str)
                .unwrap_or("unknown reason");
            return Err(DescribeError::new(
                DescribeFailure::Blocked,
                format!("no candidates returned: {reason}"),
            ));
        };

        let text = candidates[0]
            .pointer("/content/parts/0/text")
            .and_then(Value::as_str);
        let Some(text) = text else {
            let finish = candidates[0]
                .get("finishReason")
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            return Err(DescribeError::new(
                DescribeFailure::Empty,
                format!("no text in reply, finish reason {finish}"),
            ));
        };

        let cleaned = clean_model_reply(text);
        if cleaned.is_empty() {
            return Err(DescribeError::new(
                DescribeFailure::Empty,
                "reply empty after cleaning",
            ));
        }
        Ok(cleaned)
    }
}

fn map_send_error(err: reqwest::Error) -> DescribeError {
    let kind = if err.is_timeout() {
        DescribeFailure::Timeout
    } else {
        DescribeFailure::Network
    };
    DescribeError::new(kind, err.to_string())
}

/// Strips chat framing the model tends to wrap around the requested line:
/// lead-in clauses ("Here is the alt text: ..."), markdown bold markers,
/// and surrounding quotes.
pub fn clean_model_reply(text: &str) -> String {
    let mut cleaned = text.trim();

    if let Some(colon) = cleaned.find(':') {
        let head = cleaned[..colon].to_ascii_lowercase();
        let lead_in = ["here", "title", "alt", "caption", "description", "sure"]
            .iter()
            .any(|marker| head.contains(marker));
        if colon < 64 && lead_in {
            cleaned = cleaned[colon + 1..].trim_start();
        }
    }

    let without_bold = cleaned.replace("**", "");
    without_bold
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .to_string()
}
