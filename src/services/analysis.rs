use crate::config::AppConfig;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Longest prefix of the extracted text sent to the analysis service.
const MAX_ANALYSIS_CHARS: usize = 2000;

const ANALYSIS_PROMPT: &str = "You are an AI-content authenticity analyst. Analyze the text below \
and respond with a single JSON object, no markdown, using exactly these keys: \
ai_percentage (0-100 number), human_percentage (0-100 number), summary (short string), \
detailed_explanation (string), analysis_details (string), metadata_score (0-100 number), \
linguistic_score (0-100 number), pixel_inconsistency_score (0-100 number), \
source (array of the most AI-suspicious tokens).\n\nTEXT:\n";

/// Scores and explanations returned by the content-analysis service.
/// Every field is optional; normalization happens in the orchestrator.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalysisReport {
    pub ai_percentage: Option<f64>,
    pub human_percentage: Option<f64>,
    pub summary: Option<String>,
    pub detailed_explanation: Option<String>,
    pub analysis_details: Option<String>,
    pub metadata_score: Option<f64>,
    pub linguistic_score: Option<f64>,
    pub pixel_inconsistency_score: Option<f64>,
    pub source: Option<Value>,
}

impl AnalysisReport {
    /// Zeroed fallback used when the analysis service fails. The request
    /// still succeeds with this report in place of real scores.
    pub fn unavailable() -> Self {
        Self {
            ai_percentage: Some(0.0),
            human_percentage: Some(0.0),
            detailed_explanation: Some(
                "Analysis unavailable: the content analysis service could not be reached."
                    .to_string(),
            ),
            ..Default::default()
        }
    }

    /// Suspicious-token list flattened to text for storage and display.
    pub fn source_text(&self) -> Option<String> {
        match &self.source {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        }
    }
}

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("analysis request timed out")]
    Timeout,

    #[error("analysis request failed: {0}")]
    Http(reqwest::Error),

    #[error("analysis service returned an unusable response: {0}")]
    BadResponse(String),

    #[error("analysis service is not configured")]
    Disabled,
}

impl From<reqwest::Error> for AnalysisError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            AnalysisError::Timeout
        } else {
            AnalysisError::Http(e)
        }
    }
}

/// Trait for content-analysis implementations
#[async_trait::async_trait]
pub trait AnalysisClient: Send + Sync {
    /// Score extracted text for authenticity signals
    async fn analyze(&self, text: &str) -> Result<AnalysisReport, AnalysisError>;
}

/// Client for the Gemini generateContent endpoint.
pub struct GeminiClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_url: String, api_key: String, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_url,
            api_key,
        })
    }
}

#[async_trait::async_trait]
impl AnalysisClient for GeminiClient {
    async fn analyze(&self, text: &str) -> Result<AnalysisReport, AnalysisError> {
        let snippet: String = text.chars().take(MAX_ANALYSIS_CHARS).collect();
        let prompt = format!("{ANALYSIS_PROMPT}{snippet}");

        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": { "response_mime_type": "application/json" }
        });

        let response = self
            .http
            .post(&self.api_url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?
            .error_for_status()
            .map_err(AnalysisError::from)?;

        let payload: GenerateContentResponse = response.json().await?;
        parse_model_reply(&payload)
    }
}

/// Placeholder client used when no API key is configured. Every call
/// fails, which the orchestrator degrades to `AnalysisReport::unavailable`.
pub struct DisabledClient;

#[async_trait::async_trait]
impl AnalysisClient for DisabledClient {
    async fn analyze(&self, _text: &str) -> Result<AnalysisReport, AnalysisError> {
        Err(AnalysisError::Disabled)
    }
}

/// Factory function to create the analysis client based on config
pub fn create_analyzer(config: &AppConfig) -> anyhow::Result<Arc<dyn AnalysisClient>> {
    match &config.gemini_api_key {
        Some(key) => Ok(Arc::new(GeminiClient::new(
            config.gemini_api_url.clone(),
            key.clone(),
            Duration::from_secs(config.analysis_timeout_secs),
        )?)),
        None => {
            tracing::warn!("GEMINI_API_KEY not set; analysis will degrade to zeroed results");
            Ok(Arc::new(DisabledClient))
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

fn parse_model_reply(payload: &GenerateContentResponse) -> Result<AnalysisReport, AnalysisError> {
    let reply = payload
        .candidates
        .first()
        .and_then(|c| c.content.parts.first())
        .and_then(|p| p.text.as_deref())
        .ok_or_else(|| AnalysisError::BadResponse("empty candidate list".to_string()))?;

    // Models sometimes wrap JSON in a markdown fence despite the mime hint.
    let stripped = reply
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    serde_json::from_str::<AnalysisReport>(stripped)
        .map_err(|e| AnalysisError::BadResponse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap_reply(reply: &str) -> GenerateContentResponse {
        serde_json::from_value(json!({
            "candidates": [{ "content": { "parts": [{ "text": reply }] } }]
        }))
        .unwrap()
    }

    #[test]
    fn test_parse_model_reply_plain_json() {
        let payload = wrap_reply(
            r#"{"ai_percentage": 87.5, "human_percentage": 12.5, "summary": "mostly AI",
                "linguistic_score": 70, "source": ["delve", "tapestry"]}"#,
        );
        let report = parse_model_reply(&payload).unwrap();
        assert_eq!(report.ai_percentage, Some(87.5));
        assert_eq!(report.summary.as_deref(), Some("mostly AI"));
        assert_eq!(report.source_text().as_deref(), Some(r#"["delve","tapestry"]"#));
    }

    #[test]
    fn test_parse_model_reply_fenced_json() {
        let payload = wrap_reply("```json\n{\"ai_percentage\": 10}\n```");
        let report = parse_model_reply(&payload).unwrap();
        assert_eq!(report.ai_percentage, Some(10.0));
    }

    #[test]
    fn test_parse_model_reply_empty_candidates() {
        let payload: GenerateContentResponse =
            serde_json::from_value(json!({ "candidates": [] })).unwrap();
        assert!(matches!(
            parse_model_reply(&payload),
            Err(AnalysisError::BadResponse(_))
        ));
    }

    #[test]
    fn test_unavailable_report_has_placeholder() {
        let report = AnalysisReport::unavailable();
        assert_eq!(report.ai_percentage, Some(0.0));
        assert!(report.detailed_explanation.is_some());
    }

    #[tokio::test]
    async fn test_disabled_client_errors() {
        let client = DisabledClient;
        assert!(matches!(
            client.analyze("text").await,
            Err(AnalysisError::Disabled)
        ));
    }
}
