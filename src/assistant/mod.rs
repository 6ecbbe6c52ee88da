// Assistant module: generative text completion used by the copywriting and
// briefing panels. Ingestion never depends on it.

pub mod gemini;

pub use gemini::GeminiClient;

#[derive(Debug, Clone)]
pub struct ImageInput {
    pub mime_type: String,
    pub data: Vec<u8>,
}

#[async_trait::async_trait]
pub trait CompletionService: Send + Sync {
    /// Completion text, or a human-readable failure message. Never errors.
    async fn complete(&self, prompt: &str, images: &[ImageInput]) -> String;
}
