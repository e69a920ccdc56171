//! Enhancement service seam.
//!
//! The worker holds an `Arc<dyn ResumeEnhancer>`; the production backend is
//! `LlmResumeEnhancer`. Retrying is the worker's concern.

use async_trait::async_trait;

use crate::llm_client::prompts::{
    build_enhance_prompt, RESUME_ENHANCER_MAX_TOKENS, RESUME_ENHANCER_SYSTEM,
};
use crate::llm_client::{LlmClient, LlmError};

#[async_trait]
pub trait ResumeEnhancer: Send + Sync {
    /// One enhancement request for the given resume text.
    async fn enhance(&self, resume_text: &str) -> Result<String, LlmError>;
}

/// Enhancer backed by the Claude Messages API.
pub struct LlmResumeEnhancer(pub LlmClient);

#[async_trait]
impl ResumeEnhancer for LlmResumeEnhancer {
    async fn enhance(&self, resume_text: &str) -> Result<String, LlmError> {
        let prompt = build_enhance_prompt(resume_text);
        self.0
            .call_text(&prompt, RESUME_ENHANCER_SYSTEM, RESUME_ENHANCER_MAX_TOKENS)
            .await
    }
}
