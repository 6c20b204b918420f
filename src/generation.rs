//! Text generation providers.
//!
//! Answers are produced by one external model, picked from the
//! environment in priority order:
//!
//! | Variable | Provider | Model |
//! |---|---|---|
//! | `OLLAMA_MODEL` | [`OllamaGenerator`] (`OLLAMA_HOST`, default `http://localhost:11434`) | the variable's value |
//! | `OPENAI_API_KEY` | [`OpenAiGenerator`] | `OPENAI_MODEL`, default `gpt-4o-mini` |
//! | `ANTHROPIC_API_KEY` | [`AnthropicGenerator`] | `ANTHROPIC_MODEL`, default `claude-3-haiku-20240307` |
//!
//! With none set, [`resolve_generator`] returns [`RagError::NoProvider`].
//! The prompt is sent as a single user message.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::GenerationConfig;
use crate::error::{RagError, Result};

const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-haiku-20240307";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[async_trait]
pub trait Generator: Send + Sync {
    /// Provider name for logs (`"ollama"`, `"openai"`, `"anthropic"`).
    fn name(&self) -> &str;
    fn model(&self) -> &str;
    /// Complete `prompt` and return the trimmed answer text.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Pick the first configured provider from the process environment.
pub fn generator_from_env(config: &GenerationConfig) -> Result<Arc<dyn Generator>> {
    resolve_generator(config, |key| std::env::var(key).ok())
}

/// Pick the first configured provider, reading variables through `lookup`.
pub fn resolve_generator<F>(config: &GenerationConfig, lookup: F) -> Result<Arc<dyn Generator>>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
    let client = http_client(config)?;

    let generator: Arc<dyn Generator> = if let Some(model) = var("OLLAMA_MODEL") {
        Arc::new(OllamaGenerator {
            host: var("OLLAMA_HOST").unwrap_or_else(|| DEFAULT_OLLAMA_HOST.to_string()),
            model,
            temperature: config.temperature,
            client,
        })
    } else if let Some(api_key) = var("OPENAI_API_KEY") {
        Arc::new(OpenAiGenerator {
            api_key,
            model: var("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            temperature: config.temperature,
            client,
        })
    } else if let Some(api_key) = var("ANTHROPIC_API_KEY") {
        Arc::new(AnthropicGenerator {
            api_key,
            model: var("ANTHROPIC_MODEL").unwrap_or_else(|| DEFAULT_ANTHROPIC_MODEL.to_string()),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client,
        })
    } else {
        return Err(RagError::NoProvider);
    };

    info!(provider = generator.name(), model = generator.model(), "generation provider selected");
    Ok(generator)
}

fn http_client(config: &GenerationConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| RagError::Generation(format!("cannot build HTTP client: {}", e)))
}

/// POST `body` and return the JSON response, failing on non-2xx.
async fn post_json(
    provider: &str,
    request: reqwest::RequestBuilder,
    body: &Value,
) -> Result<Value> {
    let response = request
        .json(body)
        .send()
        .await
        .map_err(|e| RagError::Generation(format!("{} request failed: {}", provider, e)))?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(RagError::Generation(format!(
            "{} API error {}: {}",
            provider, status, text
        )));
    }

    response
        .json()
        .await
        .map_err(|e| RagError::Generation(format!("{} returned invalid JSON: {}", provider, e)))
}

fn missing(provider: &str, what: &str) -> RagError {
    RagError::Generation(format!("{} response missing {}", provider, what))
}

// ============ Ollama ============

/// Local Ollama chat via `POST {host}/api/chat`.
pub struct OllamaGenerator {
    host: String,
    model: String,
    temperature: f32,
    client: reqwest::Client,
}

#[async_trait]
impl Generator for OllamaGenerator {
    fn name(&self) -> &str {
        "ollama"
    }
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/chat", self.host.trim_end_matches('/'));
        let body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "stream": false,
            "options": {"temperature": self.temperature},
        });
        debug!(url = %url, "calling ollama");
        let json = post_json("Ollama", self.client.post(&url), &body).await?;
        parse_ollama(&json)
    }
}

fn parse_ollama(json: &Value) -> Result<String> {
    json["message"]["content"]
        .as_str()
        .map(|s| s.trim().to_string())
        .ok_or_else(|| missing("Ollama", "message.content"))
}

// ============ OpenAI ============

/// OpenAI chat completions via `POST /v1/chat/completions`.
pub struct OpenAiGenerator {
    api_key: String,
    model: String,
    temperature: f32,
    client: reqwest::Client,
}

#[async_trait]
impl Generator for OpenAiGenerator {
    fn name(&self) -> &str {
        "openai"
    }
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": self.temperature,
        });
        let request = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", self.api_key));
        let json = post_json("OpenAI", request, &body).await?;
        parse_openai(&json)
    }
}

fn parse_openai(json: &Value) -> Result<String> {
    json["choices"][0]["message"]["content"]
        .as_str()
        .map(|s| s.trim().to_string())
        .ok_or_else(|| missing("OpenAI", "choices[0].message.content"))
}

// ============ Anthropic ============

/// Anthropic messages API via `POST /v1/messages`.
pub struct AnthropicGenerator {
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    client: reqwest::Client,
}

#[async_trait]
impl Generator for AnthropicGenerator {
    fn name(&self) -> &str {
        "anthropic"
    }
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "messages": [{"role": "user", "content": prompt}],
        });
        let request = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION);
        let json = post_json("Anthropic", request, &body).await?;
        parse_anthropic(&json)
    }
}

/// Concatenate the `text` blocks of the response content.
fn parse_anthropic(json: &Value) -> Result<String> {
    let blocks = json["content"]
        .as_array()
        .ok_or_else(|| missing("Anthropic", "content"))?;
    let text: String = blocks
        .iter()
        .filter(|b| b["type"] == "text")
        .filter_map(|b| b["text"].as_str())
        .collect();
    Ok(text.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn resolve(vars: &[(&str, &str)]) -> Result<Arc<dyn Generator>> {
        let env: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        resolve_generator(&GenerationConfig::default(), |k| env.get(k).cloned())
    }

    #[test]
    fn ollama_wins_over_keys() {
        let g = resolve(&[
            ("OLLAMA_MODEL", "llama3"),
            ("OPENAI_API_KEY", "sk-x"),
            ("ANTHROPIC_API_KEY", "ak-x"),
        ])
        .unwrap();
        assert_eq!(g.name(), "ollama");
        assert_eq!(g.model(), "llama3");
    }

    #[test]
    fn openai_before_anthropic_with_default_model() {
        let g = resolve(&[("OPENAI_API_KEY", "sk-x"), ("ANTHROPIC_API_KEY", "ak-x")]).unwrap();
        assert_eq!(g.name(), "openai");
        assert_eq!(g.model(), "gpt-4o-mini");
    }

    #[test]
    fn anthropic_model_override() {
        let g = resolve(&[
            ("ANTHROPIC_API_KEY", "ak-x"),
            ("ANTHROPIC_MODEL", "claude-3-5-sonnet-latest"),
        ])
        .unwrap();
        assert_eq!(g.name(), "anthropic");
        assert_eq!(g.model(), "claude-3-5-sonnet-latest");
    }

    #[test]
    fn nothing_configured_is_no_provider() {
        let err = resolve(&[("OLLAMA_MODEL", "  ")]).err().unwrap();
        assert!(matches!(err, RagError::NoProvider));
    }

    #[test]
    fn parses_provider_responses() {
        let ollama = json!({"message": {"role": "assistant", "content": " hola \n"}});
        assert_eq!(parse_ollama(&ollama).unwrap(), "hola");

        let openai = json!({"choices": [{"message": {"content": "5 years."}}]});
        assert_eq!(parse_openai(&openai).unwrap(), "5 years.");
        assert!(parse_openai(&json!({"choices": []})).is_err());

        let anthropic = json!({"content": [
            {"type": "text", "text": "Ana has "},
            {"type": "tool_use", "id": "x"},
            {"type": "text", "text": "5 years."}
        ]});
        assert_eq!(parse_anthropic(&anthropic).unwrap(), "Ana has 5 years.");
    }
}
