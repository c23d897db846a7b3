use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

mod google;

pub use google::GoogleTranslate;

pub type TranslateFuture = Pin<Box<dyn Future<Output = Result<String>> + Send>>;

pub trait Translator: Send + Sync {
    /// Translate one text fragment into the target language. May fail for
    /// empty or unsupported input; callers decide the failure policy.
    fn translate(&self, text: &str, target_lang: &str) -> TranslateFuture;
}

#[derive(Debug, Clone, Serialize)]
pub struct TranslationResult {
    pub source: String,
    pub translated: String,
    pub target_lang: String,
}

/// Per-run memo so identical fragments hit the backend once. The target
/// language is fixed for a run, so entries key on the source text alone.
#[derive(Debug, Default)]
pub struct TranslationMemo {
    entries: HashMap<String, String>,
}

impl TranslationMemo {
    pub async fn translate<T: Translator>(
        &mut self,
        translator: &T,
        text: &str,
        target_lang: &str,
    ) -> Result<String> {
        if let Some(hit) = self.entries.get(text) {
            return Ok(hit.clone());
        }
        let translated = translator.translate(text, target_lang).await?;
        self.entries.insert(text.to_string(), translated.clone());
        Ok(translated)
    }
}
