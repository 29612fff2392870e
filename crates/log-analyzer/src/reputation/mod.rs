//! 도메인 평판 조회 모듈
//!
//! [`ReputationEnricher`]는 도메인 목록을 받아 외부 평판 서비스에 도메인마다 한 번씩
//! 조회하고, 결과를 [`ReputationVerdict`] 목록으로 반환합니다.
//!
//! # 동작 규칙
//! - 입력 도메인은 처음 나타난 순서를 유지하며 중복을 제거합니다.
//! - 모든 조회는 공유 [`RateLimiter`]를 거치므로 연속 호출 간격이 항상 보장됩니다.
//! - 실패는 도메인별 `Failed` 판정으로 기록되고 배치는 계속 진행됩니다. 재시도는 없습니다.
//! - 취소는 호출 사이에서만 관찰됩니다. 진행 중인 호출은 끝까지 기다리고,
//!   이후 호출은 하지 않습니다.

pub mod client;
pub mod limiter;

pub use client::{ReputationClient, VirusTotalClient, verdict_from_body};
pub use limiter::{LimiterRegistry, RateLimiter};

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use logscope_core::metrics as m;
use logscope_core::types::ReputationVerdict;

/// 평판 조회 배치 결과
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentReport {
    /// 조회한 도메인의 판정 (입력 순서)
    pub verdicts: Vec<ReputationVerdict>,
    /// 배치가 취소되었는지 여부
    pub cancelled: bool,
    /// 취소로 조회하지 못한 도메인
    pub skipped: Vec<String>,
}

impl EnrichmentReport {
    /// 성공한 판정 수
    pub fn scored_count(&self) -> usize {
        self.verdicts.iter().filter(|v| v.is_scored()).count()
    }

    /// 실패한 판정 수
    pub fn failed_count(&self) -> usize {
        self.verdicts.len() - self.scored_count()
    }
}

/// 속도 제한이 적용된 도메인 평판 조회기
pub struct ReputationEnricher<C> {
    client: C,
    limiter: Arc<RateLimiter>,
}

impl<C: ReputationClient> ReputationEnricher<C> {
    /// 조회기를 생성합니다.
    ///
    /// 같은 API 키를 쓰는 조회기끼리는 `limiter`를 공유해야 합니다.
    pub fn new(client: C, limiter: Arc<RateLimiter>) -> Self {
        Self { client, limiter }
    }

    /// 공유 제한기
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// 도메인 목록을 조회합니다.
    pub async fn enrich<I, S>(&self, domains: I, cancel: &CancellationToken) -> EnrichmentReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let queue: Vec<String> = domains
            .into_iter()
            .map(|d| d.as_ref().trim().to_owned())
            .filter(|d| !d.is_empty() && seen.insert(d.clone()))
            .collect();

        info!(
            domains = queue.len(),
            interval_secs = self.limiter.interval().as_secs_f64(),
            "starting reputation enrichment"
        );

        let mut report = EnrichmentReport::default();
        for (idx, domain) in queue.iter().enumerate() {
            let waited = if cancel.is_cancelled() {
                None
            } else {
                self.limiter.acquire(cancel).await
            };

            let Some(waited) = waited else {
                warn!(
                    remaining = queue.len() - idx,
                    "reputation enrichment cancelled"
                );
                report.cancelled = true;
                report.skipped = queue[idx..].to_vec();
                break;
            };
            metrics::histogram!(m::REPUTATION_WAIT_DURATION_SECONDS).record(waited.as_secs_f64());

            let verdict = self.client.lookup(domain).await;
            let result = if verdict.is_scored() { "scored" } else { "failed" };
            debug!(domain = domain.as_str(), result, "reputation lookup finished");
            metrics::counter!(m::REPUTATION_LOOKUPS_TOTAL, m::LABEL_RESULT => result).increment(1);

            report.verdicts.push(verdict);
        }

        info!(
            scored = report.scored_count(),
            failed = report.failed_count(),
            skipped = report.skipped.len(),
            "reputation enrichment finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::Instant;

    use super::client::MockReputationClient;
    use super::*;

    const DELAY: Duration = Duration::from_secs(15);

    fn enricher(client: MockReputationClient) -> ReputationEnricher<MockReputationClient> {
        ReputationEnricher::new(client, Arc::new(RateLimiter::new(DELAY)))
    }

    fn gaps(calls: &[(String, Instant)]) -> Vec<Duration> {
        calls.windows(2).map(|w| w[1].1 - w[0].1).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn three_domains_are_spaced_by_delay() {
        let enricher = enricher(MockReputationClient::new());
        let report = enricher
            .enrich(["a.example", "b.example", "c.example"], &CancellationToken::new())
            .await;

        assert_eq!(report.verdicts.len(), 3);
        assert!(!report.cancelled);
        let calls = enricher.client.call_log();
        assert_eq!(calls.len(), 3);
        for gap in gaps(&calls) {
            assert!(gap >= DELAY, "gap {gap:?} shorter than delay");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn spacing_holds_regardless_of_call_latency() {
        for latency in [Duration::ZERO, Duration::from_secs(3), Duration::from_secs(40)] {
            let enricher = enricher(MockReputationClient::new().with_latency(latency));
            enricher
                .enrich(["a.example", "b.example", "c.example"], &CancellationToken::new())
                .await;
            for gap in gaps(&enricher.client.call_log()) {
                assert!(gap >= DELAY);
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_enrichers_share_the_limiter() {
        let limiter = Arc::new(RateLimiter::new(DELAY));
        let first = Arc::new(ReputationEnricher::new(
            MockReputationClient::new(),
            Arc::clone(&limiter),
        ));
        let second = Arc::new(ReputationEnricher::new(
            MockReputationClient::new(),
            Arc::clone(&limiter),
        ));

        let cancel = CancellationToken::new();
        let (a, b) = tokio::join!(
            first.enrich(["a1.example", "a2.example"], &cancel),
            second.enrich(["b1.example", "b2.example"], &cancel),
        );
        assert_eq!(a.verdicts.len() + b.verdicts.len(), 4);

        let mut calls = first.client.call_log();
        calls.extend(second.client.call_log());
        calls.sort_by_key(|(_, at)| *at);
        for gap in gaps(&calls) {
            assert!(gap >= DELAY);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn duplicates_and_blanks_are_removed() {
        let enricher = enricher(MockReputationClient::new());
        let report = enricher
            .enrich(
                ["a.example", " a.example ", "", "b.example", "a.example"],
                &CancellationToken::new(),
            )
            .await;
        let domains: Vec<&str> = report.verdicts.iter().map(|v| v.domain()).collect();
        assert_eq!(domains, vec!["a.example", "b.example"]);
    }

    #[tokio::test(start_paused = true)]
    async fn failures_do_not_abort_the_batch() {
        let enricher = enricher(MockReputationClient::new().with_failing("b.example"));
        let report = enricher
            .enrich(["a.example", "b.example", "c.example"], &CancellationToken::new())
            .await;
        assert_eq!(report.scored_count(), 2);
        assert_eq!(report.failed_count(), 1);
        assert!(matches!(
            &report.verdicts[1],
            ReputationVerdict::Failed { status: Some(429), .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_further_calls() {
        let enricher = Arc::new(enricher(MockReputationClient::new()));
        let cancel = CancellationToken::new();

        let task = {
            let enricher = Arc::clone(&enricher);
            let cancel = cancel.clone();
            tokio::spawn(async move {
                enricher
                    .enrich(["a.example", "b.example", "c.example"], &cancel)
                    .await
            })
        };

        // 첫 호출 직후, 두 번째 슬롯을 기다리는 동안 취소
        tokio::time::sleep(Duration::from_secs(5)).await;
        cancel.cancel();

        let report = task.await.unwrap();
        assert!(report.cancelled);
        assert_eq!(report.verdicts.len(), 1);
        assert_eq!(report.skipped, vec!["b.example", "c.example"]);
        assert_eq!(enricher.client.call_log().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_call_completes_after_cancel() {
        let enricher = Arc::new(enricher(
            MockReputationClient::new().with_latency(Duration::from_secs(10)),
        ));
        let cancel = CancellationToken::new();

        let task = {
            let enricher = Arc::clone(&enricher);
            let cancel = cancel.clone();
            tokio::spawn(async move { enricher.enrich(["a.example", "b.example"], &cancel).await })
        };

        tokio::time::sleep(Duration::from_secs(2)).await;
        cancel.cancel();

        let report = task.await.unwrap();
        assert_eq!(report.verdicts.len(), 1);
        assert!(report.verdicts[0].is_scored());
        assert_eq!(report.skipped, vec!["b.example"]);
    }

    #[tokio::test(start_paused = true)]
    async fn pre_cancelled_token_issues_no_calls() {
        let enricher = enricher(MockReputationClient::new());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let report = enricher.enrich(["a.example"], &cancel).await;
        assert!(report.cancelled);
        assert!(report.verdicts.is_empty());
        assert_eq!(enricher.client.call_log().len(), 0);
    }
}
