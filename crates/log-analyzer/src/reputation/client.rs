//! Domain reputation service abstraction.
//!
//! The [`ReputationClient`] trait abstracts the external reputation API so the
//! enricher can use [`VirusTotalClient`] in production and a mock in tests.
//!
//! ```text
//!   ReputationEnricher ──► RateLimiter
//!          │
//!          ▼
//!   ReputationClient (trait)
//!        │       │
//!        ▼       ▼
//!   VirusTotal  Mock
//! ```
//!
//! # Error Handling
//!
//! A lookup never returns an error. Every failure is folded into
//! [`ReputationVerdict::Failed`]:
//! - **non-2xx status**: `status: Some(code)`, raw body kept
//! - **transport error**: `status: None`, error text kept
//! - **undecodable body**: `status: Some(code)`, raw body kept

use std::future::Future;

use serde::Deserialize;

use logscope_core::types::ReputationVerdict;

use crate::config::ReputationParams;
use crate::error::AnalyzerError;

/// Performs one reputation lookup per domain.
pub trait ReputationClient: Send + Sync {
    /// Looks up a single domain.
    ///
    /// The caller is responsible for rate limiting.
    fn lookup(&self, domain: &str) -> impl Future<Output = ReputationVerdict> + Send;
}

/// VirusTotal v3 `GET /domains/{domain}` client.
pub struct VirusTotalClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl VirusTotalClient {
    /// Creates a client from reputation settings.
    ///
    /// # Errors
    ///
    /// Returns `AnalyzerError::ReputationClient` if the HTTP client cannot be built.
    pub fn new(params: &ReputationParams) -> Result<Self, AnalyzerError> {
        let http = reqwest::Client::builder()
            .timeout(params.timeout())
            .user_agent(concat!("logscope/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AnalyzerError::ReputationClient(e.to_string()))?;

        Ok(Self {
            http,
            base_url: params.base_url.trim_end_matches('/').to_owned(),
            api_key: params.api_key.clone(),
        })
    }

    fn domain_url(&self, domain: &str) -> String {
        format!("{}/domains/{}", self.base_url, domain)
    }
}

impl ReputationClient for VirusTotalClient {
    async fn lookup(&self, domain: &str) -> ReputationVerdict {
        let response = match self
            .http
            .get(self.domain_url(domain))
            .header("x-apikey", &self.api_key)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return failed(domain, None, e.to_string()),
        };

        let status = response.status().as_u16();
        let success = response.status().is_success();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return failed(domain, Some(status), e.to_string()),
        };

        if !success {
            return failed(domain, Some(status), body);
        }
        verdict_from_body(domain, status, &body)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DomainReport {
    data: DomainData,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DomainData {
    attributes: DomainAttributes,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DomainAttributes {
    last_analysis_stats: AnalysisStats,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AnalysisStats {
    harmless: u64,
    malicious: u64,
    suspicious: u64,
    undetected: u64,
}

/// Maps a successful response body to a verdict.
///
/// Missing objects or counters count as zero. A body that is not a JSON
/// object becomes a `Failed` verdict carrying the raw text.
pub fn verdict_from_body(domain: &str, status: u16, body: &str) -> ReputationVerdict {
    match serde_json::from_str::<DomainReport>(body) {
        Ok(report) => {
            let stats = report.data.attributes.last_analysis_stats;
            ReputationVerdict::Scored {
                domain: domain.to_owned(),
                harmless: stats.harmless,
                malicious: stats.malicious,
                suspicious: stats.suspicious,
                undetected: stats.undetected,
            }
        }
        Err(_) => failed(domain, Some(status), body.to_owned()),
    }
}

fn failed(domain: &str, status: Option<u16>, raw_response: String) -> ReputationVerdict {
    ReputationVerdict::Failed {
        domain: domain.to_owned(),
        status,
        raw_response,
    }
}

/// 테스트용 Mock 평판 클라이언트
///
/// 호출 시각과 도메인을 기록하고, 설정된 지연 후 응답합니다.
#[cfg(test)]
#[derive(Default)]
pub struct MockReputationClient {
    /// (도메인, 호출 시각) 기록
    pub calls: std::sync::Mutex<Vec<(String, tokio::time::Instant)>>,
    /// 응답 지연
    pub latency: std::time::Duration,
    /// 실패로 응답할 도메인
    pub failing: Vec<String>,
}

#[cfg(test)]
impl MockReputationClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(mut self, latency: std::time::Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_failing(mut self, domain: &str) -> Self {
        self.failing.push(domain.to_owned());
        self
    }

    pub fn call_log(&self) -> Vec<(String, tokio::time::Instant)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
impl ReputationClient for MockReputationClient {
    async fn lookup(&self, domain: &str) -> ReputationVerdict {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((domain.to_owned(), tokio::time::Instant::now()));
        }
        tokio::time::sleep(self.latency).await;

        if self.failing.iter().any(|d| d == domain) {
            return failed(domain, Some(429), "{\"error\":{\"code\":\"QuotaExceededError\"}}".to_owned());
        }
        ReputationVerdict::Scored {
            domain: domain.to_owned(),
            harmless: 70,
            malicious: 0,
            suspicious: 0,
            undetected: 20,
        }
    }
}
