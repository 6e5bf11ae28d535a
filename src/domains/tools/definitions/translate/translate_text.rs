//! Free text translation.

use async_trait::async_trait;
use rmcp::model::{CallToolResult, JsonObject, Tool};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::client::{AUTO, BaiduTranslator};
use super::languages::is_supported;
use crate::domains::tools::{
    ToolError, ToolHandler, describe, parse_params, require_non_empty, structured_result,
};

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct TranslateTextParams {
    /// Text to translate.
    pub text: String,

    /// Target language code, e.g. "en" or "zh" (see get_supported_languages).
    pub to_lang: String,

    /// Source language code; omit or use "auto" to detect.
    #[serde(default)]
    pub from_lang: Option<String>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct TranslateTextResult {
    pub translated_text: String,
    /// Source language used (detected when "auto" was requested).
    pub detected_language: String,
    pub to_lang: String,
}

pub struct TranslateTextTool {
    translator: BaiduTranslator,
}

impl TranslateTextTool {
    pub const NAME: &'static str = "translate_text";

    pub const DESCRIPTION: &'static str = "Translate text with Baidu Translate. The source language is detected automatically unless from_lang is given.";

    pub fn new(translator: BaiduTranslator) -> Self {
        Self { translator }
    }

    #[instrument(skip_all, fields(to = %params.to_lang))]
    pub async fn execute(
        &self,
        params: TranslateTextParams,
    ) -> Result<TranslateTextResult, ToolError> {
        let text = require_non_empty("text", &params.text)?;
        let to = require_non_empty("to_lang", &params.to_lang)?;
        if !is_supported(to) {
            return Err(ToolError::invalid_arguments(format!(
                "unsupported target language '{}'",
                to
            )));
        }

        let from = params
            .from_lang
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .unwrap_or(AUTO);
        if from != AUTO && !is_supported(from) {
            return Err(ToolError::invalid_arguments(format!(
                "unsupported source language '{}'",
                from
            )));
        }

        info!(from, "Translating text");
        let translation = self.translator.translate(text, from, to).await?;
        Ok(TranslateTextResult {
            translated_text: translation.text,
            detected_language: translation.from,
            to_lang: translation.to,
        })
    }
}

#[async_trait]
impl ToolHandler for TranslateTextTool {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn tool(&self) -> Tool {
        describe::<TranslateTextParams, TranslateTextResult>(Self::NAME, Self::DESCRIPTION)
    }

    async fn call(&self, arguments: JsonObject) -> Result<CallToolResult, ToolError> {
        let params: TranslateTextParams = parse_params(arguments)?;
        let result = self.execute(params).await?;
        structured_result(result.translated_text.clone(), &result)
    }
}
