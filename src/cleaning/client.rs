use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::cleaning::config::CleanConfig;
use crate::cleaning::constants::*;
use crate::cleaning::error::{CleanError, Result};

/// Seam between the orchestrator and the remote completion endpoint, so the
/// row loop can run against a scripted stand-in under test.
#[async_trait]
pub trait Completion: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Client for the remote assistant completion endpoint. Requests are
/// streamed; the emitted deltas are reassembled into one raw text answer.
pub struct CompletionClient {
    client: reqwest::Client,
    config: CleanConfig,
    credential: Option<String>,
}

impl CompletionClient {
    pub fn new(config: CleanConfig, credential: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            config,
            credential,
        })
    }

    fn credential(&self) -> Result<&str> {
        self.credential
            .as_deref()
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| CleanError::Auth("Missing bearer credential".to_string()))
    }

    /// Lightweight authenticated probe against the assistants listing.
    /// Network failures and non-success statuses both read as "invalid";
    /// this never errors back to the caller.
    pub async fn validate_credential(&self) -> bool {
        let token = match self.credential() {
            Ok(token) => token,
            Err(_) => return false,
        };

        let url = self.config.endpoint(ASSISTANTS_PATH);
        match self.client.get(&url).bearer_auth(token).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Credential validation request failed: {}", e);
                false
            }
        }
    }

    async fn read_stream(&self, mut response: reqwest::Response) -> Result<String> {
        let mut buffer = String::new();
        let mut assembled = String::new();
        let mut done = false;

        while !done {
            let chunk = match response.chunk().await? {
                Some(chunk) => chunk,
                None => break,
            };
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            while let Some(pos) = buffer.find('\n') {
                let mut line = buffer[..pos].to_string();
                buffer.drain(..=pos);
                if line.ends_with('\r') {
                    line.pop();
                }
                if append_stream_line(&line, &mut assembled) {
                    done = true;
                    break;
                }
            }
        }

        // Flush whatever remains after the last newline
        if !done && !buffer.is_empty() {
            append_stream_line(&buffer, &mut assembled);
        }

        Ok(assembled.trim().to_string())
    }
}

#[async_trait]
impl Completion for CompletionClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let token = self.credential()?.to_string();
        let url = self.config.endpoint(COMPLETIONS_PATH);

        let body = json!({
            "messages": [{
                "role": "user",
                "content": [{
                    "type": "text",
                    "text": prompt
                }]
            }],
            "assistantId": self.config.assistant_id,
            "temperature": self.config.temperature,
            "stream": true,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CleanError::Http {
                status: status.as_u16(),
                message,
            });
        }

        self.read_stream(response).await
    }
}

/// Handles one server-sent-event line. Content deltas and complete messages
/// are appended to `out`; malformed lines are skipped, never fatal. Returns
/// true when the stream terminator was seen.
pub fn append_stream_line(line: &str, out: &mut String) -> bool {
    let trimmed = line.trim();
    let Some(payload) = trimmed.strip_prefix(STREAM_DATA_PREFIX) else {
        return false;
    };
    let payload = payload.trim();

    if payload == STREAM_DONE_MARKER {
        return true;
    }

    let Ok(parsed) = serde_json::from_str::<Value>(payload) else {
        if !payload.is_empty() {
            debug!("Skipping unparsable stream line: {}", payload);
        }
        return false;
    };

    let choice = &parsed["choices"][0];
    if let Some(content) = choice["delta"]["content"].as_str() {
        out.push_str(content);
    } else if let Some(content) = choice["message"]["content"].as_str() {
        out.push_str(content);
    }

    false
}
