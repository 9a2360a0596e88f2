//! OpenAI-compatible oracle client

use async_trait::async_trait;
use mixit_domain::Element;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::infrastructure::config::OracleConfig;
use crate::infrastructure::ports::{OracleClient, OracleError, RawOracleResponse};

/// System prompt sent with every combination request.
const SYSTEM_PROMPT: &str = "We are playing an element-combination game and you are the engine.\n\
\n\
You are always given two elements. They may be identical or different.\n\
Combine them creatively into exactly one new element.\n\
Answer with a single JSON object and nothing else:\n\
{\"name\": \"<element name>\", \"icon\": \"<exactly one fitting emoji>\"}\n\
No explanations, no additional text.";

/// Prompt for an arcade goal. `{excluded}` is replaced with recent goals.
const GOAL_PROMPT: &str = "We are playing an element-combination game. \
The starter elements are Water, Earth, Fire and Air.\n\
\n\
Pick one goal word that a player can reach from the starters in 5 to 15 \
minutes of play: medium difficulty, neither trivial nor cryptic, no proper \
names or brands.\n\
\n\
Answer only with a comma-separated list:\n\
<goal word>, <variant 1>, <variant 2>, ...\n\
\n\
Rules:\n\
- The first entry is exactly the goal word that is shown to the player.\n\
- Then 3 to 7 names for the same thing: true synonyms, singular/plural \
forms, or common compounds with the goal word as head.\n\
- No umbrella terms, neighbouring objects, parts, materials or containers.\n\
- No explanations, no emoji, no quotes, no trailing period.\n\
- No duplicates, exactly one space after each comma.\n\
- The goal word must not be one of: {excluded}\n\
\n\
Example:\n\
Candle, Candles, Wax candle";

/// Client for OpenAI-compatible chat completion APIs
#[derive(Clone)]
pub struct OpenAiOracle {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiOracle {
    pub fn new(base_url: &str, model: &str, api_key: Option<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
        }
    }

    pub fn from_config(config: &OracleConfig) -> Self {
        Self::new(
            &config.base_url,
            &config.model,
            config.api_key.clone(),
            config.timeout,
        )
    }

    fn message(role: &str, content: String) -> ChatMessage {
        ChatMessage {
            role: role.to_string(),
            content: Some(content),
        }
    }

    /// Send one chat completion and return the first choice's non-empty text.
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String, OracleError> {
        let api_request = ChatRequest {
            model: self.model.clone(),
            messages,
            temperature: Some(0.7),
        };

        let mut builder = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .json(&api_request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(OracleError::status(status.as_u16(), error_text));
        }

        // A stalled or dropped body is a transport failure; only bytes that
        // arrived intact and fail to parse are the model's fault.
        let body = response.bytes().await.map_err(transport_error)?;
        let api_response: ChatResponse = serde_json::from_slice(&body)
            .map_err(|e| OracleError::validation(format!("Malformed completion body: {e}")))?;

        let content = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| OracleError::validation("No choices in oracle response"))?
            .message
            .content
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(OracleError::validation("Empty content in oracle response"));
        }

        Ok(content)
    }
}

#[async_trait]
impl OracleClient for OpenAiOracle {
    async fn synthesize(
        &self,
        element_a: &Element,
        element_b: &Element,
    ) -> Result<RawOracleResponse, OracleError> {
        let content = self
            .complete(vec![
                Self::message("system", SYSTEM_PROMPT.to_string()),
                Self::message(
                    "user",
                    format!("{} + {}", element_a.label(), element_b.label()),
                ),
            ])
            .await?;

        Ok(parse_content(&content))
    }

    async fn propose_goal(&self, excluded: &[String]) -> Result<String, OracleError> {
        let excluded = if excluded.is_empty() {
            "(none)".to_string()
        } else {
            excluded.join(", ")
        };

        self.complete(vec![Self::message(
            "system",
            GOAL_PROMPT.replace("{excluded}", &excluded),
        )])
        .await
    }
}

fn transport_error(e: reqwest::Error) -> OracleError {
    if e.is_timeout() {
        OracleError::timeout(e.to_string())
    } else if let Some(status) = e.status() {
        OracleError::status(status.as_u16(), e.to_string())
    } else {
        OracleError::connection(e.to_string())
    }
}

/// Extract name and icon from the model's text.
///
/// Accepts the JSON object the prompt asks for, optionally wrapped in a code
/// fence, and the legacy `<icon> <name>` line format. Anything else leaves
/// the fields empty for validation to reject.
pub fn parse_content(content: &str) -> RawOracleResponse {
    let body = strip_code_fence(content.trim());

    if let Ok(payload) = serde_json::from_str::<ElementPayload>(body) {
        return RawOracleResponse {
            name: payload.name,
            icon: payload.icon,
        };
    }

    let Some(line) = body.lines().map(str::trim).find(|l| !l.is_empty()) else {
        return RawOracleResponse::default();
    };

    match line.split_once(char::is_whitespace) {
        Some((icon, name)) if !icon.chars().any(char::is_alphanumeric) => RawOracleResponse {
            name: Some(name.trim().to_string()),
            icon: Some(icon.to_string()),
        },
        _ => RawOracleResponse {
            name: Some(line.to_string()),
            icon: None,
        },
    }
}

fn strip_code_fence(body: &str) -> &str {
    let Some(rest) = body.strip_prefix("```") else {
        return body;
    };
    // Drop the info string (e.g. "json") on the opening line.
    let rest = rest.split_once('\n').map(|(_, r)| r).unwrap_or("");
    rest.trim_end().trim_end_matches("```").trim()
}

// =============================================================================
// OpenAI API types
// =============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize, Default)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ElementPayload {
    name: Option<String>,
    #[serde(alias = "emoji")]
    icon: Option<String>,
}
