//! Google Translate and DeepL provider implementations
//!
//! Both speak JSON over HTTPS. Google wants lowercase target codes,
//! DeepL uppercase; callers pass the canonical lowercase code and each
//! provider adjusts. Base URLs are overridable for tests.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::{TranslationError, TranslationProvider};

const GOOGLE_API_BASE: &str = "https://translation.googleapis.com/language/translate/v2";
const DEEPL_API_BASE: &str = "https://api-free.deepl.com/v2/translate";

/// Google Cloud Translation v2 client
pub struct GoogleProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Deserialize)]
struct GoogleResponse {
    data: GoogleData,
}

#[derive(Deserialize)]
struct GoogleData {
    translations: Vec<GoogleTranslation>,
}

#[derive(Deserialize)]
struct GoogleTranslation {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

impl GoogleProvider {
    pub fn new(
        api_key: &str,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, TranslationError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: GOOGLE_API_BASE.to_string(),
        })
    }

    /// Point the provider at a different endpoint (tests)
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }
}

#[async_trait]
impl TranslationProvider for GoogleProvider {
    fn name(&self) -> &'static str {
        "google"
    }

    async fn translate(&self, text: &str, target: &str) -> Result<String, TranslationError> {
        let response = self
            .client
            .post(&self.base_url)
            .query(&[("key", self.api_key.as_str())])
            .json(&json!({
                "q": text,
                "target": target.to_lowercase(),
                "format": "text",
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TranslationError::Api {
                provider: self.name(),
                status: status.as_u16(),
            });
        }

        let body: GoogleResponse = response.json().await?;
        body.data
            .translations
            .into_iter()
            .next()
            .map(|t| t.translated_text)
            .ok_or(TranslationError::MalformedResponse {
                provider: "google",
            })
    }
}

/// DeepL API client
pub struct DeeplProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Deserialize)]
struct DeeplResponse {
    translations: Vec<DeeplTranslation>,
}

#[derive(Deserialize)]
struct DeeplTranslation {
    text: String,
}

impl DeeplProvider {
    pub fn new(
        api_key: &str,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, TranslationError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: DEEPL_API_BASE.to_string(),
        })
    }

    /// Point the provider at a different endpoint (tests)
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }
}

#[async_trait]
impl TranslationProvider for DeeplProvider {
    fn name(&self) -> &'static str {
        "deepl"
    }

    async fn translate(&self, text: &str, target: &str) -> Result<String, TranslationError> {
        let response = self
            .client
            .post(&self.base_url)
            .header("Authorization", format!("DeepL-Auth-Key {}", self.api_key))
            .json(&json!({
                "text": [text],
                "target_lang": target.to_uppercase(),
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TranslationError::Api {
                provider: self.name(),
                status: status.as_u16(),
            });
        }

        let body: DeeplResponse = response.json().await?;
        body.translations
            .into_iter()
            .next()
            .map(|t| t.text)
            .ok_or(TranslationError::MalformedResponse { provider: "deepl" })
    }
}
