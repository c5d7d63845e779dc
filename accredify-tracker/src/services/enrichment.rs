//! Text enrichment collaborator
//!
//! Fills in descriptions, frequencies and scores for checklist sketches. The
//! remote service is a black box; [`FallbackEnricher`] guarantees callers
//! always get an answer, if necessary their own input back.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::models::{Frequency, DEFAULT_SCORE};

const USER_AGENT: &str = concat!("accredify-tracker/", env!("CARGO_PKG_VERSION"));

/// Default request timeout for remote enrichment
pub const DEFAULT_TIMEOUT_MS: u64 = 15_000;

#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Enrichment service returned {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Timed out after {0} ms")]
    Timeout(u128),
}

/// Checklist item as sent to / returned from enrichment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorSketch {
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub standard: Option<String>,
    pub indicator: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default)]
    pub score: Option<i64>,
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

/// Something that can enrich indicator sketches
#[async_trait]
pub trait TextEnricher: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Enriched copies, one per input, in input order
    async fn enrich(&self, sketches: Vec<IndicatorSketch>) -> Result<Vec<IndicatorSketch>, EnrichmentError>;
}

/// Deterministic local enrichment used when no service is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineEnricher;

#[async_trait]
impl TextEnricher for OfflineEnricher {
    fn name(&self) -> &'static str {
        "offline"
    }

    async fn enrich(&self, sketches: Vec<IndicatorSketch>) -> Result<Vec<IndicatorSketch>, EnrichmentError> {
        Ok(sketches
            .into_iter()
            .map(|mut sketch| {
                if is_blank(&sketch.description) {
                    sketch.description = Some(format!("Compliance requirement for {}", sketch.indicator));
                }
                if is_blank(&sketch.frequency) {
                    sketch.frequency = Some(Frequency::OneTime.as_str().to_string());
                }
                if sketch.score.is_none() {
                    sketch.score = Some(DEFAULT_SCORE);
                }
                sketch
            })
            .collect())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct EnrichmentPayload {
    indicators: Vec<IndicatorSketch>,
}

/// Remote enrichment over HTTP
///
/// POSTs `{"indicators": [...]}` and expects the same shape back.
pub struct HttpEnricher {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpEnricher {
    pub fn new(endpoint: String, api_key: Option<String>, timeout: Duration) -> Result<Self, EnrichmentError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| EnrichmentError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint,
            api_key,
        })
    }
}

#[async_trait]
impl TextEnricher for HttpEnricher {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn enrich(&self, sketches: Vec<IndicatorSketch>) -> Result<Vec<IndicatorSketch>, EnrichmentError> {
        tracing::debug!(endpoint = %self.endpoint, count = sketches.len(), "Requesting enrichment");

        let mut request = self
            .http_client
            .post(&self.endpoint)
            .json(&EnrichmentPayload { indicators: sketches });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| EnrichmentError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EnrichmentError::ApiError(status.as_u16(), body));
        }

        let payload: EnrichmentPayload = response
            .json()
            .await
            .map_err(|e| EnrichmentError::ParseError(e.to_string()))?;

        Ok(payload.indicators)
    }
}

/// Decorator that never fails
///
/// Errors, timeouts and responses with the wrong number of items all yield
/// the caller's input unchanged, with a warning logged.
#[derive(Clone)]
pub struct FallbackEnricher {
    inner: Arc<dyn TextEnricher>,
    timeout: Duration,
}

impl FallbackEnricher {
    pub fn new(inner: Arc<dyn TextEnricher>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    /// Offline enrichment with the default timeout
    pub fn offline() -> Self {
        Self::new(Arc::new(OfflineEnricher), Duration::from_millis(DEFAULT_TIMEOUT_MS))
    }

    pub fn inner_name(&self) -> &'static str {
        self.inner.name()
    }

    pub async fn enrich(&self, sketches: Vec<IndicatorSketch>) -> Vec<IndicatorSketch> {
        let expected = sketches.len();

        let outcome = match tokio::time::timeout(self.timeout, self.inner.enrich(sketches.clone())).await {
            Ok(result) => result,
            Err(_) => Err(EnrichmentError::Timeout(self.timeout.as_millis())),
        };

        match outcome {
            Ok(enriched) if enriched.len() == expected => enriched,
            Ok(enriched) => {
                tracing::warn!(
                    enricher = self.inner.name(),
                    expected,
                    received = enriched.len(),
                    "Enrichment returned wrong number of items, using input unchanged"
                );
                sketches
            }
            Err(e) => {
                tracing::warn!(
                    enricher = self.inner.name(),
                    error = %e,
                    "Enrichment failed, using input unchanged"
                );
                sketches
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingEnricher;

    #[async_trait]
    impl TextEnricher for FailingEnricher {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn enrich(&self, _: Vec<IndicatorSketch>) -> Result<Vec<IndicatorSketch>, EnrichmentError> {
            Err(EnrichmentError::ApiError(503, "unavailable".to_string()))
        }
    }

    struct SlowEnricher;

    #[async_trait]
    impl TextEnricher for SlowEnricher {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn enrich(&self, sketches: Vec<IndicatorSketch>) -> Result<Vec<IndicatorSketch>, EnrichmentError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(sketches)
        }
    }

    struct DroppingEnricher;

    #[async_trait]
    impl TextEnricher for DroppingEnricher {
        fn name(&self) -> &'static str {
            "dropping"
        }

        async fn enrich(&self, mut sketches: Vec<IndicatorSketch>) -> Result<Vec<IndicatorSketch>, EnrichmentError> {
            sketches.pop();
            Ok(sketches)
        }
    }

    fn sketches() -> Vec<IndicatorSketch> {
        vec![
            IndicatorSketch {
                indicator: "Fire drill".to_string(),
                ..IndicatorSketch::default()
            },
            IndicatorSketch {
                indicator: "Board minutes".to_string(),
                description: Some("Approved minutes".to_string()),
                frequency: Some("Quarterly".to_string()),
                score: Some(5),
                ..IndicatorSketch::default()
            },
        ]
    }

    #[tokio::test]
    async fn test_offline_fills_only_missing_fields() {
        let enriched = OfflineEnricher.enrich(sketches()).await.unwrap();

        assert_eq!(enriched[0].description.as_deref(), Some("Compliance requirement for Fire drill"));
        assert_eq!(enriched[0].frequency.as_deref(), Some("One-time"));
        assert_eq!(enriched[0].score, Some(DEFAULT_SCORE));

        assert_eq!(enriched[1], sketches()[1]);
    }

    #[tokio::test]
    async fn test_fallback_returns_input_on_error() {
        let enricher = FallbackEnricher::new(Arc::new(FailingEnricher), Duration::from_secs(1));
        assert_eq!(enricher.enrich(sketches()).await, sketches());
    }

    #[tokio::test]
    async fn test_fallback_returns_input_on_timeout() {
        let enricher = FallbackEnricher::new(Arc::new(SlowEnricher), Duration::from_millis(20));
        assert_eq!(enricher.enrich(sketches()).await, sketches());
    }

    #[tokio::test]
    async fn test_fallback_returns_input_on_length_mismatch() {
        let enricher = FallbackEnricher::new(Arc::new(DroppingEnricher), Duration::from_secs(1));
        assert_eq!(enricher.enrich(sketches()).await, sketches());
    }

    #[tokio::test]
    async fn test_fallback_passes_good_results_through() {
        let enricher = FallbackEnricher::offline();
        let enriched = enricher.enrich(sketches()).await;
        assert_eq!(enriched.len(), 2);
        assert!(enriched[0].description.is_some());
    }
}
