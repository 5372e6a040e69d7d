// assistant/generator.rs — text-generation backend boundary.
//
// The assistant treats generation as an opaque two-call contract: one
// acquisition step that reports 0-100 progress through a callback, then a
// generate call per message. Any local or remote backend can sit behind the
// trait; the default talks to an Ollama-compatible server.

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::config::AssistantConfig;

/// Fixed decoding parameters applied to every generate call.
#[derive(Debug, Clone)]
pub struct GenerateParams {
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub repetition_penalty: f32,
}

impl From<&AssistantConfig> for GenerateParams {
    fn from(cfg: &AssistantConfig) -> Self {
        Self {
            max_new_tokens: cfg.max_new_tokens,
            temperature: cfg.temperature,
            repetition_penalty: cfg.repetition_penalty,
        }
    }
}

#[async_trait]
pub trait Generator: Send + Sync {
    /// Make the model usable, reporting acquisition progress (0-100) through
    /// `progress`. Must complete before `generate` is called.
    async fn acquire(&self, progress: &(dyn Fn(u8) + Send + Sync)) -> Result<()>;

    /// Produce a reply for `prompt` with the given decoding parameters.
    async fn generate(&self, prompt: &str, params: &GenerateParams) -> Result<String>;
}

// ─── Ollama backend ──────────────────────────────────────────────────────────

/// Generator backed by an Ollama-compatible HTTP server.
///
/// Acquisition is a streaming `/api/pull` — each JSON line carries
/// `completed`/`total` byte counts for the layer being downloaded, which map
/// directly onto the 0-100 progress contract. Generation is a non-streaming
/// `/api/generate`.
pub struct OllamaGenerator {
    base_url: String,
    model: String,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct PullChunk {
    #[serde(default)]
    completed: Option<u64>,
    #[serde(default)]
    total: Option<u64>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaGenerator {
    pub fn new(cfg: &AssistantConfig) -> Self {
        Self {
            base_url: cfg.base_url.clone(),
            model: cfg.model.clone(),
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    async fn acquire(&self, progress: &(dyn Fn(u8) + Send + Sync)) -> Result<()> {
        let mut response = self
            .http
            .post(format!("{}/api/pull", self.base_url))
            .json(&json!({ "name": self.model, "stream": true }))
            .send()
            .await
            .context("model pull request failed")?
            .error_for_status()?;

        // The pull stream is newline-delimited JSON; chunks may split lines.
        let mut buf = String::new();
        while let Some(chunk) = response.chunk().await? {
            buf.push_str(&String::from_utf8_lossy(&chunk));
            while let Some(pos) = buf.find('\n') {
                let line: String = buf.drain(..=pos).collect();
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if let Ok(p) = serde_json::from_str::<PullChunk>(line) {
                    if let (Some(completed), Some(total)) = (p.completed, p.total) {
                        if total > 0 {
                            let pct = (completed.saturating_mul(100) / total).min(100) as u8;
                            progress(pct);
                        }
                    }
                }
            }
        }

        progress(100);
        Ok(())
    }

    async fn generate(&self, prompt: &str, params: &GenerateParams) -> Result<String> {
        let body = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "num_predict": params.max_new_tokens,
                "temperature": params.temperature,
                "repeat_penalty": params.repetition_penalty,
            },
        });

        let resp: GenerateResponse = self
            .http
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .await
            .context("generate request failed")?
            .error_for_status()?
            .json()
            .await
            .context("malformed generate response")?;

        Ok(resp.response)
    }
}
