//! Translation toolset (Baidu general translation API).
//!
//! - `client`: signed API client shared by the tools
//! - `translate_text`: arbitrary language pairs
//! - `languages`: supported language table
//! - `translate_prompt`: Chinese to English with explicit fallback

pub mod client;
pub mod languages;
pub mod translate_prompt;
pub mod translate_text;

use std::sync::Arc;

pub use client::{BaiduTranslator, Translation};
pub use languages::{SUPPORTED_LANGUAGES, SupportedLanguagesTool};
pub use translate_prompt::TranslatePromptTool;
pub use translate_text::TranslateTextTool;

use crate::core::error::Result;
use crate::domains::tools::{ToolContext, ToolHandler};

pub fn handlers(ctx: &ToolContext) -> Result<Vec<Arc<dyn ToolHandler>>> {
    let credentials = &ctx.config.credentials;
    let translator = BaiduTranslator::new(
        ctx.http.clone(),
        ctx.config.endpoints.baidu_translate_url.clone(),
        credentials.require("BAIDU_TRANSLATE_APP_ID")?,
        credentials.require("BAIDU_TRANSLATE_APP_KEY")?,
    );

    let handlers: Vec<Arc<dyn ToolHandler>> = vec![
        Arc::new(TranslateTextTool::new(translator.clone())),
        Arc::new(SupportedLanguagesTool),
        Arc::new(TranslatePromptTool::new(translator)),
    ];
    Ok(handlers)
}
