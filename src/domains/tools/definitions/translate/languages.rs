//! Languages accepted by the translation API.

use async_trait::async_trait;
use rmcp::model::{CallToolResult, JsonObject, Tool};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::domains::tools::{ToolError, ToolHandler, describe, parse_params, structured_result};

/// `(code, name)` pairs in provider order.
pub const SUPPORTED_LANGUAGES: &[(&str, &str)] = &[
    ("zh", "Chinese"),
    ("en", "English"),
    ("yue", "Cantonese"),
    ("wyw", "Classical Chinese"),
    ("jp", "Japanese"),
    ("kor", "Korean"),
    ("fra", "French"),
    ("spa", "Spanish"),
    ("th", "Thai"),
    ("ara", "Arabic"),
    ("ru", "Russian"),
    ("pt", "Portuguese"),
    ("de", "German"),
    ("it", "Italian"),
    ("el", "Greek"),
    ("nl", "Dutch"),
    ("pl", "Polish"),
    ("bul", "Bulgarian"),
    ("est", "Estonian"),
    ("dan", "Danish"),
    ("fin", "Finnish"),
    ("cs", "Czech"),
    ("rom", "Romanian"),
    ("slo", "Slovenian"),
    ("swe", "Swedish"),
    ("hu", "Hungarian"),
    ("cht", "Traditional Chinese"),
    ("vie", "Vietnamese"),
];

pub fn is_supported(code: &str) -> bool {
    SUPPORTED_LANGUAGES.iter().any(|(c, _)| *c == code)
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct SupportedLanguagesParams {}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct Language {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SupportedLanguages {
    pub languages: Vec<Language>,
}

pub struct SupportedLanguagesTool;

impl SupportedLanguagesTool {
    pub const NAME: &'static str = "get_supported_languages";

    pub const DESCRIPTION: &'static str =
        "List the language codes accepted by translate_text.";
}

#[async_trait]
impl ToolHandler for SupportedLanguagesTool {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn tool(&self) -> Tool {
        describe::<SupportedLanguagesParams, SupportedLanguages>(Self::NAME, Self::DESCRIPTION)
    }

    async fn call(&self, arguments: JsonObject) -> Result<CallToolResult, ToolError> {
        let _: SupportedLanguagesParams = parse_params(arguments)?;
        let languages: Vec<Language> = SUPPORTED_LANGUAGES
            .iter()
            .map(|(code, name)| Language {
                code: code.to_string(),
                name: name.to_string(),
            })
            .collect();
        let summary = languages
            .iter()
            .map(|l| format!("{}: {}", l.code, l.name))
            .collect::<Vec<_>>()
            .join("\n");
        structured_result(summary, &SupportedLanguages { languages })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert!(is_supported("en"));
        assert!(is_supported("cht"));
        assert!(!is_supported("auto"));
        assert!(!is_supported("klingon"));
    }

    #[tokio::test]
    async fn test_lists_every_language() {
        let result = SupportedLanguagesTool.call(JsonObject::new()).await.unwrap();
        let data = result.structured_content.unwrap();
        assert_eq!(
            data["languages"].as_array().unwrap().len(),
            SUPPORTED_LANGUAGES.len()
        );
        assert_eq!(data["languages"][0]["code"], "zh");
    }
}
