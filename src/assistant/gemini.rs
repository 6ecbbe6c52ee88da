use crate::assistant::{CompletionService, ImageInput};
use crate::config::AssistantConfig;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

const FALLBACK_MODEL: &str = "models/gemini-pro";

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider responded {0}: {1}")]
    Status(u16, String),
    #[error("response contained no text")]
    Empty,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

pub struct GeminiClient {
    api_key: Option<String>,
    base_url: String,
    client: Client,
}

impl GeminiClient {
    pub fn new(cfg: &AssistantConfig) -> Result<Self, AssistantError> {
        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;
        Ok(Self {
            api_key: cfg.api_key.clone().filter(|k| !k.trim().is_empty()),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub async fn list_models(&self) -> Result<Vec<ModelInfo>, AssistantError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("key", self.api_key.as_deref().unwrap_or_default())])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AssistantError::Status(status.as_u16(), body));
        }
        Ok(response.json::<ModelList>().await?.models)
    }

    /// Asks the provider which models exist and picks one; falls back to a
    /// fixed model name when the listing fails.
    pub async fn best_model(&self) -> String {
        match self.list_models().await {
            Ok(models) => choose_model(&models),
            Err(e) => {
                warn!("Model listing failed: {}", e);
                "gemini-pro".to_string()
            }
        }
    }

    async fn generate(&self, model: &str, prompt: &str, images: &[ImageInput]) -> Result<String, AssistantError> {
        let model_path = if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{}", model)
        };
        let url = format!("{}/{}:generateContent", self.base_url, model_path);

        let mut parts = vec![json!({ "text": prompt })];
        for image in images {
            parts.push(json!({
                "inline_data": {
                    "mime_type": image.mime_type,
                    "data": STANDARD.encode(&image.data),
                }
            }));
        }
        let body = json!({ "contents": [{ "parts": parts }] });

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_deref().unwrap_or_default())])
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AssistantError::Status(status.as_u16(), text));
        }
        let value: Value = response.json().await?;
        extract_text(&value).ok_or(AssistantError::Empty)
    }
}

#[async_trait::async_trait]
impl CompletionService for GeminiClient {
    async fn complete(&self, prompt: &str, images: &[ImageInput]) -> String {
        if self.api_key.is_none() {
            return "API key is not configured.".to_string();
        }
        let model = self.best_model().await;
        info!("Completion with {} ({} images)", model, images.len());
        match self.generate(&model, prompt, images).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Completion failed: {}", e);
                format!("AI error ({}): {}", model, e)
            }
        }
    }
}

/// First "flash" model, else the first non-vision "pro", else whatever comes
/// first. Only models that support content generation are considered.
pub fn choose_model(models: &[ModelInfo]) -> String {
    let available: Vec<&str> = models
        .iter()
        .filter(|m| m.supported_generation_methods.iter().any(|g| g == "generateContent"))
        .map(|m| m.name.as_str())
        .collect();

    if let Some(m) = available.iter().find(|m| m.to_lowercase().contains("flash")) {
        return m.to_string();
    }
    if let Some(m) = available.iter().find(|m| {
        let lower = m.to_lowercase();
        lower.contains("pro") && !lower.contains("vision")
    }) {
        return m.to_string();
    }
    available
        .first()
        .map(|m| m.to_string())
        .unwrap_or_else(|| FALLBACK_MODEL.to_string())
}

fn extract_text(response: &Value) -> Option<String> {
    let parts = response["candidates"][0]["content"]["parts"].as_array()?;
    let text: String = parts.iter().filter_map(|p| p["text"].as_str()).collect();
    (!text.is_empty()).then_some(text)
}
