use anyhow::{Context, Result, anyhow};
use std::time::Duration;

use super::{TranslateFuture, Translator};

const DEFAULT_BASE_URL: &str = "https://translate.googleapis.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Translation backend speaking the public `translate_a/single` endpoint.
#[derive(Debug, Clone)]
pub struct GoogleTranslate {
    client: reqwest::Client,
    base_url: String,
    source_lang: String,
}

impl GoogleTranslate {
    pub fn new(endpoint: Option<&str>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url(endpoint),
            source_lang: "auto".to_string(),
        }
    }

    pub fn with_source_lang(mut self, lang: impl Into<String>) -> Self {
        let lang = lang.into();
        if !lang.trim().is_empty() {
            self.source_lang = lang;
        }
        self
    }
}

fn base_url(endpoint: Option<&str>) -> String {
    if let Ok(url) = std::env::var("TRANSLATE_BASE_URL") {
        if !url.trim().is_empty() {
            return url;
        }
    }
    endpoint
        .map(|value| value.to_string())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
}

impl Translator for GoogleTranslate {
    fn translate(&self, text: &str, target_lang: &str) -> TranslateFuture {
        let client = self.client.clone();
        let url = format!("{}/translate_a/single", self.base_url);
        let text = text.to_string();
        let target = target_lang.to_string();
        let source = self.source_lang.clone();

        Box::pin(async move {
            if text.trim().is_empty() {
                return Err(anyhow!("nothing to translate"));
            }
            let response = client
                .get(&url)
                .query(&[
                    ("client", "gtx"),
                    ("sl", source.as_str()),
                    ("tl", target.as_str()),
                    ("dt", "t"),
                    ("q", text.as_str()),
                ])
                .timeout(REQUEST_TIMEOUT)
                .send()
                .await
                .with_context(|| "translation request failed")?;

            let status = response.status();
            let body = response
                .text()
                .await
                .with_context(|| "failed to read translation response")?;
            if !status.is_success() {
                return Err(anyhow!(
                    "translation endpoint returned {}: {}",
                    status,
                    body.trim()
                ));
            }
            parse_response(&body)
        })
    }
}

/// The endpoint answers with a nested array; element 0 holds the translated
/// segments, each segment's element 0 the translated text.
fn parse_response(body: &str) -> Result<String> {
    let value: serde_json::Value =
        serde_json::from_str(body).with_context(|| "failed to parse translation response")?;
    let segments = value
        .get(0)
        .and_then(|segments| segments.as_array())
        .ok_or_else(|| anyhow!("unexpected translation response shape"))?;

    let mut translated = String::new();
    for segment in segments {
        if let Some(piece) = segment.get(0).and_then(|piece| piece.as_str()) {
            translated.push_str(piece);
        }
    }
    if translated.is_empty() {
        return Err(anyhow!("translation response contained no text"));
    }
    Ok(translated)
}
