//! Gemini gateway implementation for PWICE
//!
//! Opens chat sessions against the Gemini `streamGenerateContent` endpoint
//! and streams replies as Server-Sent Events. The REST protocol is
//! stateless, so each session keeps the turns exchanged so far and sends
//! them with every request; a turn is only recorded once its reply has
//! streamed to completion.

use crate::catalog::Character;
use crate::config::GatewayConfig;
use crate::error::{PwiceError, Result};
use crate::gateway::sse::SseDecoder;
use crate::gateway::{ChatGateway, ChatSession, FragmentStream};

use futures::StreamExt;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Keyring service holding the stored credential
pub const KEYRING_SERVICE: &str = "pwice";
/// Keyring user holding the stored credential
pub const KEYRING_USER: &str = "gemini";

/// Gemini API gateway
///
/// # Examples
///
/// ```no_run
/// use pwice::catalog::Catalog;
/// use pwice::config::GatewayConfig;
/// use pwice::gateway::{ChatGateway, GeminiGateway};
///
/// # fn example() -> pwice::error::Result<()> {
/// let catalog = Catalog::embedded()?;
/// let gateway = GeminiGateway::new(GatewayConfig {
///     api_key: Some("key".to_string()),
///     ..Default::default()
/// })?;
/// let session = gateway.open(catalog.find_character("jo-jun-jae")?)?;
/// # Ok(())
/// # }
/// ```
pub struct GeminiGateway {
    client: Client,
    config: GatewayConfig,
    keyring_fallback: bool,
}

/// Request body for `streamGenerateContent`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn text(role: Option<&str>, text: &str) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![Part {
                text: Some(text.to_string()),
            }],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
}

/// One SSE payload of a streamed reply
#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: Option<u16>,
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Error envelope of a non-success HTTP response
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

impl GeminiGateway {
    /// Create a new gateway
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .user_agent(concat!("pwice/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            config,
            keyring_fallback: true,
        })
    }

    /// Do not consult the system keyring when no key is configured
    pub fn without_keyring(mut self) -> Self {
        self.keyring_fallback = false;
        self
    }

    /// Streaming endpoint for the configured model
    pub fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.config.api_base.trim_end_matches('/'),
            self.config.model
        )
    }

    fn resolve_api_key(&self) -> Result<String> {
        let key = match &self.config.api_key {
            Some(key) => Some(key.clone()),
            None if self.keyring_fallback => read_keyring(),
            None => None,
        };

        let key = key.ok_or_else(|| PwiceError::MissingCredentials("gemini".to_string()))?;
        if key.trim().is_empty() || key.chars().any(char::is_whitespace) {
            return Err(PwiceError::Config("Gemini API key is malformed".to_string()).into());
        }
        Ok(key)
    }
}

fn read_keyring() -> Option<String> {
    match keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER).and_then(|e| e.get_password()) {
        Ok(key) => {
            tracing::debug!("Using model credential from keyring");
            Some(key)
        }
        Err(keyring::Error::NoEntry) => None,
        Err(e) => {
            tracing::debug!("Keyring unavailable: {}", e);
            None
        }
    }
}

/// Store the model credential in the system keyring
///
/// # Errors
///
/// Returns `PwiceError::Keyring` if the platform store rejects the write
pub fn store_api_key(key: &str) -> Result<()> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER).map_err(PwiceError::from)?;
    entry.set_password(key).map_err(PwiceError::from)?;
    Ok(())
}

impl ChatGateway for GeminiGateway {
    fn open(&self, character: &Character) -> Result<Box<dyn ChatSession>> {
        let api_key = self.resolve_api_key()?;
        tracing::info!(character = %character.id, model = %self.config.model, "Opening chat session");

        Ok(Box::new(GeminiSession {
            client: self.client.clone(),
            endpoint: self.endpoint(),
            api_key,
            character_id: character.id.clone(),
            system_instruction: Content::text(None, &character.persona),
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
                top_k: self.config.top_k,
                top_p: self.config.top_p,
            },
            history: Arc::new(Mutex::new(Vec::new())),
        }))
    }
}

/// A Gemini conversation bound to one persona
pub struct GeminiSession {
    client: Client,
    endpoint: String,
    api_key: String,
    character_id: String,
    system_instruction: Content,
    generation_config: GenerationConfig,
    history: Arc<Mutex<Vec<Content>>>,
}

impl GeminiSession {
    fn build_request(&self, text: &str) -> GenerateRequest {
        let mut contents = self
            .history
            .lock()
            .map(|h| h.clone())
            .unwrap_or_default();
        contents.push(Content::text(Some("user"), text));

        GenerateRequest {
            system_instruction: self.system_instruction.clone(),
            contents,
            generation_config: self.generation_config,
        }
    }
}

impl ChatSession for GeminiSession {
    fn character_id(&self) -> &str {
        &self.character_id
    }

    fn send(&mut self, text: &str) -> FragmentStream {
        let request = self.build_request(text);
        let (tx, rx) = mpsc::unbounded_channel();
        let reply = ReplyRequest {
            client: self.client.clone(),
            endpoint: self.endpoint.clone(),
            api_key: self.api_key.clone(),
            user_text: text.to_string(),
            history: Arc::clone(&self.history),
        };

        tokio::spawn(async move {
            if let Err(e) = reply.run(request, &tx).await {
                tracing::warn!("Reply stream failed: {}", e);
                let _ = tx.send(Err(e));
            }
        });

        Box::pin(UnboundedReceiverStream::new(rx))
    }
}

/// Everything the background reply task needs
struct ReplyRequest {
    client: Client,
    endpoint: String,
    api_key: String,
    user_text: String,
    history: Arc<Mutex<Vec<Content>>>,
}

impl ReplyRequest {
    /// Perform the request and forward fragments until the reply ends
    ///
    /// Returns early without error when the receiver is dropped. A reply
    /// nobody received is not added to the history.
    async fn run(
        self,
        request: GenerateRequest,
        tx: &mpsc::UnboundedSender<Result<String>>,
    ) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| PwiceError::Transport(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body).into());
        }

        let mut decoder = SseDecoder::new();
        let mut reply = String::new();
        let mut bytes = response.bytes_stream();

        while let Some(chunk) = bytes.next().await {
            let chunk = chunk.map_err(|e| PwiceError::Transport(format!("stream read failed: {}", e)))?;
            for payload in decoder.push(&chunk) {
                if let Some(fragment) = parse_fragment(&payload)? {
                    reply.push_str(&fragment);
                    if tx.send(Ok(fragment)).is_err() {
                        tracing::debug!("Reply receiver dropped, abandoning stream");
                        return Ok(());
                    }
                }
            }
        }

        if let Some(payload) = decoder.finish() {
            if let Some(fragment) = parse_fragment(&payload)? {
                reply.push_str(&fragment);
                if tx.send(Ok(fragment)).is_err() {
                    return Ok(());
                }
            }
        }

        if tx.is_closed() {
            tracing::debug!("Reply receiver dropped before completion, turn not recorded");
            return Ok(());
        }
        if let Ok(mut history) = self.history.lock() {
            history.push(Content::text(Some("user"), &self.user_text));
            history.push(Content::text(Some("model"), &reply));
        }
        tracing::debug!(chars = reply.chars().count(), "Reply complete");
        Ok(())
    }
}

/// Text carried by one SSE payload, `None` when it carries none
fn parse_fragment(payload: &str) -> Result<Option<String>> {
    let chunk: StreamChunk = serde_json::from_str(payload)
        .map_err(|e| PwiceError::Transport(format!("malformed stream payload: {}", e)))?;

    if let Some(error) = chunk.error {
        return Err(PwiceError::Transport(describe(&error)).into());
    }

    let text: String = chunk
        .candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .collect()
        })
        .unwrap_or_default();

    Ok(if text.is_empty() { None } else { Some(text) })
}

fn status_error(status: StatusCode, body: &str) -> PwiceError {
    let detail = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|env| describe(&env.error))
        .unwrap_or_else(|_| body.trim().chars().take(200).collect());

    let invalid_key = body.contains("API_KEY_INVALID");
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PwiceError::Authentication(detail),
        _ if invalid_key => PwiceError::Authentication(detail),
        _ => PwiceError::Transport(format!("HTTP {}: {}", status.as_u16(), detail)),
    }
}

fn describe(error: &ApiError) -> String {
    match (&error.status, error.code) {
        (Some(status), Some(code)) => format!("{} ({}): {}", status, code, error.message),
        (Some(status), None) => format!("{}: {}", status, error.message),
        _ => error.message.clone(),
    }
}
