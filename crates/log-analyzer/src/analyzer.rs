//! 분석 오케스트레이션 -- 파싱/집계/탐지/요약/평판 조회의 전체 흐름을 관리합니다.
//!
//! # 내부 흐름
//! ```text
//! Parser -> RecordStore -> { Aggregators, Detectors (spawn_blocking) } -> Summary
//!                                   \-> referer domains -> ReputationEnricher
//! ```
//!
//! 탐지기는 `Arc<RecordStore>`의 읽기 전용 뷰를 공유하며 블로킹 스레드 풀에서 동시에 실행됩니다.
//! 실행 사이에 공유하는 상태는 없습니다.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use logscope_core::metrics as m;
use logscope_core::pipeline::IpDetector;
use logscope_core::types::{
    Column, DomainCount, ExfiltrationEvent, Finding, FlaggedIp, PageCount, TimelineBucket,
    TrafficCount,
};

use crate::aggregate;
use crate::config::AnalyzerConfig;
use crate::detect::{self, BurstDetector, StatusThresholdDetector};
use crate::error::AnalyzerError;
use crate::parser::CombinedLogParser;
use crate::reputation::{
    EnrichmentReport, LimiterRegistry, RateLimiter, ReputationClient, ReputationEnricher,
    VirusTotalClient,
};
use crate::store::RecordStore;
use crate::summary::SummaryCorrelator;

/// 한 번의 분석 실행 결과
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// 실행 ID (UUID v4)
    pub run_id: String,
    /// 생성 시각
    pub generated_at: DateTime<Utc>,
    /// 레코드 수
    pub total_records: usize,
    /// 문법 불일치로 건너뛴 라인 수
    pub skipped_lines: usize,
    /// 레코드 집합이 보유한 컬럼
    pub columns: Vec<Column>,
    pub top_pages: Vec<PageCount>,
    pub top_referer_domains: Vec<DomainCount>,
    pub traffic: Vec<TrafficCount>,
    pub timeline: Vec<TimelineBucket>,
    pub endpoint_scanning: Vec<FlaggedIp>,
    pub rate_limit_abuse: Vec<FlaggedIp>,
    pub burst_activity: Vec<FlaggedIp>,
    pub exfiltration: Vec<ExfiltrationEvent>,
    pub findings: Vec<Finding>,
    /// 평판 조회 결과 (요청한 경우)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrichment: Option<EnrichmentReport>,
}

/// 접근 로그 분석기
///
/// # 사용 예시
/// ```ignore
/// use logscope_log_analyzer::{AnalyzerBuilder, AnalyzerConfig};
///
/// let analyzer = AnalyzerBuilder::new()
///     .config(AnalyzerConfig::default())
///     .build()?;
///
/// let report = analyzer.analyze_file("/var/log/nginx/access.log").await?;
/// for finding in &report.findings {
///     println!("{finding}");
/// }
/// ```
pub struct Analyzer<C = VirusTotalClient> {
    config: AnalyzerConfig,
    parser: CombinedLogParser,
    summary: SummaryCorrelator,
    enricher: Option<ReputationEnricher<C>>,
}

impl<C: ReputationClient> Analyzer<C> {
    /// 분석 설정
    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// 로그 파서
    pub fn parser(&self) -> &CombinedLogParser {
        &self.parser
    }

    /// 평판 조회가 구성되었는지 여부
    pub fn has_enricher(&self) -> bool {
        self.enricher.is_some()
    }

    /// 메모리의 로그 본문을 파싱하고 분석합니다.
    pub async fn analyze_str(&self, text: &str) -> Result<AnalysisReport, AnalyzerError> {
        let outcome = self.parser.parse_str(text)?;
        self.analyze(RecordStore::from_outcome(outcome)).await
    }

    /// 로그 파일을 파싱하고 분석합니다.
    pub async fn analyze_file(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<AnalysisReport, AnalyzerError> {
        let outcome = self.parser.parse_file(path).await?;
        self.analyze(RecordStore::from_outcome(outcome)).await
    }

    /// 레코드 집합에 모든 집계와 탐지를 실행합니다.
    pub async fn analyze(&self, store: RecordStore) -> Result<AnalysisReport, AnalyzerError> {
        let started = Instant::now();
        let run_id = Uuid::new_v4().to_string();
        let store = Arc::new(store);

        info!(
            run_id = run_id.as_str(),
            records = store.len(),
            skipped = store.skipped(),
            "starting analysis run"
        );

        // 집계와 탐지기는 블로킹 풀에서 동시에 실행
        let scan = spawn_ip_detector(
            Arc::clone(&store),
            StatusThresholdDetector::endpoint_scanning(self.config.scan_404_threshold),
        );
        let abuse = spawn_ip_detector(
            Arc::clone(&store),
            StatusThresholdDetector::rate_limit_abuse(self.config.abuse_429_threshold),
        );
        let burst = spawn_ip_detector(
            Arc::clone(&store),
            BurstDetector::new(self.config.burst.clone()),
        );
        let exfil = {
            let store = Arc::clone(&store);
            let params = self.config.exfiltration.clone();
            tokio::task::spawn_blocking(move || detect::detect_exfiltration(&store, &params))
        };

        let aggregates = {
            let store = Arc::clone(&store);
            let top_n = self.config.top_n;
            let bucket_secs = self.config.timeline_bucket_secs;
            tokio::task::spawn_blocking(move || run_aggregators(&store, top_n, bucket_secs))
        };

        // 하나가 실패해도 모든 작업이 끝난 뒤에 에러를 반환
        let (aggregates, scan, abuse, burst, exfil) =
            tokio::join!(aggregates, scan, abuse, burst, exfil);
        let Aggregates {
            top_pages,
            top_referer_domains,
            traffic,
            timeline,
        } = aggregates.map_err(task_error)??;
        debug!(
            run_id = run_id.as_str(),
            pages = top_pages.len(),
            domains = top_referer_domains.len(),
            buckets = timeline.len(),
            "aggregators finished"
        );
        let endpoint_scanning = scan.map_err(task_error)??;
        let rate_limit_abuse = abuse.map_err(task_error)??;
        let burst_activity = burst.map_err(task_error)??;
        let exfiltration = exfil.map_err(task_error)??;

        let flagged: Vec<FlaggedIp> = endpoint_scanning
            .iter()
            .chain(rate_limit_abuse.iter())
            .cloned()
            .collect();
        let findings = self.summary.correlate(&exfiltration, &flagged, &store)?;

        let elapsed = started.elapsed();
        metrics::counter!(m::ANALYSIS_RUNS_TOTAL).increment(1);
        metrics::histogram!(m::ANALYSIS_DURATION_SECONDS).record(elapsed.as_secs_f64());

        info!(
            run_id = run_id.as_str(),
            scanning = endpoint_scanning.len(),
            abuse = rate_limit_abuse.len(),
            burst = burst_activity.len(),
            exfiltration = exfiltration.len(),
            findings = findings.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "analysis run finished"
        );

        Ok(AnalysisReport {
            run_id,
            generated_at: Utc::now(),
            total_records: store.len(),
            skipped_lines: store.skipped(),
            columns: store.columns().iter().copied().collect(),
            top_pages,
            top_referer_domains,
            traffic,
            timeline,
            endpoint_scanning,
            rate_limit_abuse,
            burst_activity,
            exfiltration,
            findings,
            enrichment: None,
        })
    }

    /// 도메인 목록의 평판을 조회합니다.
    ///
    /// 평판 조회가 구성되지 않았으면 설정 에러를 반환합니다.
    pub async fn enrich<I, S>(
        &self,
        domains: I,
        cancel: &CancellationToken,
    ) -> Result<EnrichmentReport, AnalyzerError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let enricher = self.enricher.as_ref().ok_or_else(|| AnalyzerError::Config {
            field: "reputation.enabled".to_owned(),
            reason: "reputation lookups are not configured".to_owned(),
        })?;
        Ok(enricher.enrich(domains, cancel).await)
    }

    /// 보고서의 상위 Referer 도메인(최대 `max_domains`개)을 조회해 보고서에 붙입니다.
    pub async fn enrich_report(
        &self,
        report: &mut AnalysisReport,
        cancel: &CancellationToken,
    ) -> Result<(), AnalyzerError> {
        let domains: Vec<String> = report
            .top_referer_domains
            .iter()
            .take(self.config.reputation.max_domains)
            .map(|d| d.domain.clone())
            .collect();
        report.enrichment = Some(self.enrich(&domains, cancel).await?);
        Ok(())
    }
}

struct Aggregates {
    top_pages: Vec<PageCount>,
    top_referer_domains: Vec<DomainCount>,
    traffic: Vec<TrafficCount>,
    timeline: Vec<TimelineBucket>,
}

fn run_aggregators(
    store: &RecordStore,
    top_n: usize,
    bucket_secs: u64,
) -> Result<Aggregates, AnalyzerError> {
    Ok(Aggregates {
        top_pages: aggregate::top_requested_pages(store, top_n)?,
        top_referer_domains: aggregate::top_referer_domains(store, top_n)?,
        traffic: aggregate::traffic_summary(store)?,
        timeline: aggregate::activity_timeline(store, bucket_secs)?,
    })
}

fn spawn_ip_detector<D>(
    store: Arc<RecordStore>,
    detector: D,
) -> JoinHandle<Result<Vec<FlaggedIp>, AnalyzerError>>
where
    D: IpDetector + 'static,
{
    tokio::task::spawn_blocking(move || detect::run_detector(&detector, &store))
}

fn task_error(err: JoinError) -> AnalyzerError {
    AnalyzerError::Task(err.to_string())
}

/// 분석기 빌더
pub struct AnalyzerBuilder<C = VirusTotalClient> {
    config: AnalyzerConfig,
    client: Option<C>,
    limiter: Option<Arc<RateLimiter>>,
}

impl AnalyzerBuilder<VirusTotalClient> {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: AnalyzerConfig::default(),
            client: None,
            limiter: None,
        }
    }

    /// 설정의 평판 조회 매개변수로 VirusTotal 클라이언트를 구성합니다.
    pub fn with_virustotal(mut self) -> Result<Self, AnalyzerError> {
        self.client = Some(VirusTotalClient::new(&self.config.reputation)?);
        Ok(self)
    }
}

impl Default for AnalyzerBuilder<VirusTotalClient> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: ReputationClient> AnalyzerBuilder<C> {
    /// 분석 설정을 지정합니다.
    pub fn config(mut self, config: AnalyzerConfig) -> Self {
        self.config = config;
        self
    }

    /// 평판 조회 클라이언트를 지정합니다.
    pub fn reputation_client<D: ReputationClient>(self, client: D) -> AnalyzerBuilder<D> {
        AnalyzerBuilder {
            config: self.config,
            client: Some(client),
            limiter: self.limiter,
        }
    }

    /// 제한기를 직접 지정합니다.
    ///
    /// 지정하지 않으면 전역 [`LimiterRegistry`]에서 `reputation.api_key`의 제한기를
    /// 가져옵니다. API 키가 비어 있으면 이 분석기 전용 제한기를 만듭니다.
    pub fn shared_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// 분석기를 빌드합니다.
    pub fn build(self) -> Result<Analyzer<C>, AnalyzerError> {
        self.config.validate()?;

        let parser = CombinedLogParser::new()?.with_max_line_len(self.config.max_line_len);
        let summary = SummaryCorrelator::new(&self.config.summary)?;

        let reputation = &self.config.reputation;
        let enricher = self.client.map(|client| {
            let limiter = self.limiter.unwrap_or_else(|| {
                if reputation.api_key.is_empty() {
                    Arc::new(RateLimiter::new(reputation.delay()))
                } else {
                    LimiterRegistry::global().limiter_for(&reputation.api_key, reputation.delay())
                }
            });
            ReputationEnricher::new(client, limiter)
        });

        Ok(Analyzer {
            config: self.config,
            parser,
            summary,
            enricher,
        })
    }
}
