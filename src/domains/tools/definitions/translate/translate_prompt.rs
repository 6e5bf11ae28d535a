//! Prompt translation for image generation models.
//!
//! Prompts containing CJK ideographs are translated from Chinese to English;
//! anything else is returned as is. A provider failure does not fail the
//! call: the original prompt comes back flagged as a fallback.

use async_trait::async_trait;
use rmcp::model::{CallToolResult, JsonObject, Tool};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::client::BaiduTranslator;
use crate::domains::tools::{ToolError, ToolHandler, describe, parse_params, structured_result};

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct TranslatePromptParams {
    /// Prompt to translate to English.
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct TranslatePromptResult {
    pub prompt: String,
    /// Whether the provider was called.
    pub translated: bool,
    /// True when translation failed and `prompt` is the untranslated input.
    pub fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

/// CJK Unified Ideographs block.
pub fn contains_chinese(text: &str) -> bool {
    text.chars().any(|c| ('\u{4e00}'..='\u{9fff}').contains(&c))
}

pub struct TranslatePromptTool {
    translator: BaiduTranslator,
}

impl TranslatePromptTool {
    pub const NAME: &'static str = "translate_prompt";

    pub const DESCRIPTION: &'static str = "Translate a Chinese image-generation prompt to English. Prompts without Chinese characters are returned unchanged. If translation fails the original prompt is returned with fallback set to true.";

    pub fn new(translator: BaiduTranslator) -> Self {
        Self { translator }
    }

    #[instrument(skip_all)]
    pub async fn execute(&self, params: TranslatePromptParams) -> TranslatePromptResult {
        let prompt = params.prompt;
        if prompt.trim().is_empty() || !contains_chinese(&prompt) {
            return TranslatePromptResult {
                prompt,
                translated: false,
                fallback: false,
                fallback_reason: None,
            };
        }

        match self.translator.translate(&prompt, "zh", "en").await {
            Ok(translation) => {
                info!("Prompt translated");
                TranslatePromptResult {
                    prompt: translation.text,
                    translated: true,
                    fallback: false,
                    fallback_reason: None,
                }
            }
            Err(e) => {
                warn!("Prompt translation failed, returning original: {}", e);
                TranslatePromptResult {
                    prompt,
                    translated: false,
                    fallback: true,
                    fallback_reason: Some(e.to_string()),
                }
            }
        }
    }
}

#[async_trait]
impl ToolHandler for TranslatePromptTool {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn tool(&self) -> Tool {
        describe::<TranslatePromptParams, TranslatePromptResult>(Self::NAME, Self::DESCRIPTION)
    }

    async fn call(&self, arguments: JsonObject) -> Result<CallToolResult, ToolError> {
        let params: TranslatePromptParams = parse_params(arguments)?;
        let result = self.execute(params).await;
        let summary = match &result.fallback_reason {
            Some(reason) => format!(
                "{}\n(translation failed, original prompt returned: {})",
                result.prompt, reason
            ),
            None => result.prompt.clone(),
        };
        structured_result(summary, &result)
    }
}
