//! 분석 엔진 설정
//!
//! [`AnalyzerConfig`]는 core의 [`LogscopeConfig`](logscope_core::config::LogscopeConfig)에서
//! 분석 엔진이 사용하는 값만 골라 탐지기별 매개변수로 묶은 설정입니다.
//!
//! # 사용 예시
//! ```ignore
//! use logscope_core::config::LogscopeConfig;
//! use logscope_log_analyzer::config::AnalyzerConfig;
//!
//! let core_config = LogscopeConfig::default();
//! let config = AnalyzerConfig::from_core(&core_config);
//! ```

use std::time::Duration;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use logscope_core::config::{DomainMatch, LogscopeConfig, MAX_BURST_WINDOW_MINUTES};

use crate::error::AnalyzerError;

/// 폭주 탐지 매개변수
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurstParams {
    /// 대상 상태 코드
    pub status_code: u16,
    /// 시간 창 안에 있어야 하는 이벤트 수
    pub threshold: usize,
    /// 시간 창 길이 (분)
    pub window_minutes: u64,
}

impl BurstParams {
    /// 시간 창 길이
    pub fn window(&self) -> TimeDelta {
        i64::try_from(self.window_minutes)
            .ok()
            .and_then(TimeDelta::try_minutes)
            .unwrap_or(TimeDelta::MAX)
    }
}

impl Default for BurstParams {
    fn default() -> Self {
        Self {
            status_code: 404,
            threshold: 5,
            window_minutes: 1,
        }
    }
}

/// 데이터 유출 탐지 매개변수
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExfiltrationParams {
    /// 이 크기(바이트)를 초과하는 쓰기 요청만 대상
    pub size_threshold: u64,
    /// 알려진 목적지 도메인 허용 목록
    pub known_domains: Vec<String>,
    /// 허용 목록 매칭 방식
    pub domain_match: DomainMatch,
}

impl Default for ExfiltrationParams {
    fn default() -> Self {
        Self {
            size_threshold: 10_000,
            known_domains: Vec::new(),
            domain_match: DomainMatch::Substring,
        }
    }
}

/// 요약 매개변수
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryParams {
    /// 요약에 포함할 POST 유출 이벤트의 최소 크기 (초과)
    pub exfil_size_threshold: u64,
    /// 의심 다운로드 확장자
    pub suspicious_extensions: Vec<String>,
}

impl Default for SummaryParams {
    fn default() -> Self {
        Self {
            exfil_size_threshold: 1_000_000,
            suspicious_extensions: vec![".exe".to_owned()],
        }
    }
}

/// 평판 조회 매개변수
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReputationParams {
    /// 활성화 여부
    pub enabled: bool,
    /// API 기본 URL
    pub base_url: String,
    /// API 키
    #[serde(skip_serializing, default)]
    pub api_key: String,
    /// 연속 호출 사이 최소 간격 (초)
    pub delay_secs: u64,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
    /// 한 번에 조회할 최대 도메인 수
    pub max_domains: usize,
}

impl ReputationParams {
    /// 연속 호출 사이 최소 간격
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }

    /// 요청 타임아웃
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl std::fmt::Debug for ReputationParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReputationParams")
            .field("enabled", &self.enabled)
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("delay_secs", &self.delay_secs)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_domains", &self.max_domains)
            .finish()
    }
}

impl Default for ReputationParams {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "https://www.virustotal.com/api/v3".to_owned(),
            api_key: String::new(),
            delay_secs: 15,
            timeout_secs: 30,
            max_domains: 10,
        }
    }
}

/// 분석 엔진 설정
///
/// core의 `LogscopeConfig`에서 파생되며, 탐지기별 매개변수를 타입으로 묶습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// 상위 N개 페이지/도메인
    pub top_n: usize,
    /// 활동 타임라인 버킷 크기 (초)
    pub timeline_bucket_secs: u64,
    /// 한 줄 최대 길이 (바이트)
    pub max_line_len: usize,
    /// 경로 탐색 판정 404 응답 수
    pub scan_404_threshold: usize,
    /// 속도 제한 남용 판정 429 응답 수
    pub abuse_429_threshold: usize,
    /// 폭주 탐지
    pub burst: BurstParams,
    /// 데이터 유출 탐지
    pub exfiltration: ExfiltrationParams,
    /// 요약
    pub summary: SummaryParams,
    /// 평판 조회
    pub reputation: ReputationParams,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            top_n: 10,
            timeline_bucket_secs: 60,
            max_line_len: 64 * 1024,
            scan_404_threshold: 10,
            abuse_429_threshold: 5,
            burst: BurstParams::default(),
            exfiltration: ExfiltrationParams::default(),
            summary: SummaryParams::default(),
            reputation: ReputationParams::default(),
        }
    }
}

impl AnalyzerConfig {
    /// core의 `LogscopeConfig`에서 분석 엔진 설정을 생성합니다.
    pub fn from_core(core: &LogscopeConfig) -> Self {
        Self {
            top_n: core.analysis.top_n,
            timeline_bucket_secs: core.analysis.timeline_bucket_secs,
            max_line_len: core.analysis.max_line_len,
            scan_404_threshold: core.detection.scan_404_threshold,
            abuse_429_threshold: core.detection.abuse_429_threshold,
            burst: BurstParams {
                status_code: core.detection.burst_status_code,
                threshold: core.detection.burst_threshold,
                window_minutes: core.detection.burst_window_minutes,
            },
            exfiltration: ExfiltrationParams {
                size_threshold: core.detection.exfil_size_threshold,
                known_domains: core.detection.known_domains.clone(),
                domain_match: core.detection.domain_match,
            },
            summary: SummaryParams {
                exfil_size_threshold: core.summary.exfil_size_threshold,
                suspicious_extensions: core.summary.suspicious_extensions.clone(),
            },
            reputation: ReputationParams {
                enabled: core.reputation.enabled,
                base_url: core.reputation.base_url.clone(),
                api_key: core.reputation.api_key.clone(),
                delay_secs: core.reputation.delay_secs,
                timeout_secs: core.reputation.timeout_secs,
                max_domains: core.reputation.max_domains,
            },
        }
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), AnalyzerError> {
        non_zero("top_n", self.top_n)?;
        non_zero("timeline_bucket_secs", self.timeline_bucket_secs as usize)?;
        non_zero("max_line_len", self.max_line_len)?;
        non_zero("scan_404_threshold", self.scan_404_threshold)?;
        non_zero("abuse_429_threshold", self.abuse_429_threshold)?;
        non_zero("burst.threshold", self.burst.threshold)?;

        if !(100..=599).contains(&self.burst.status_code) {
            return Err(config_error(
                "burst.status_code",
                "must be an HTTP status code (100-599)",
            ));
        }

        // 0분 창은 같은 시각의 이벤트만 묶음
        if self.burst.window_minutes > MAX_BURST_WINDOW_MINUTES {
            return Err(config_error(
                "burst.window_minutes",
                format!("must be 0-{MAX_BURST_WINDOW_MINUTES}"),
            ));
        }

        if self.exfiltration.known_domains.iter().any(|d| d.is_empty()) {
            return Err(config_error(
                "exfiltration.known_domains",
                "entries must not be empty",
            ));
        }

        if self
            .summary
            .suspicious_extensions
            .iter()
            .any(|ext| ext.trim_start_matches('.').is_empty())
        {
            return Err(config_error(
                "summary.suspicious_extensions",
                "entries must not be empty",
            ));
        }

        if self.reputation.enabled {
            if self.reputation.api_key.is_empty() {
                return Err(config_error(
                    "reputation.api_key",
                    "must not be empty when reputation lookups are enabled",
                ));
            }
            non_zero("reputation.timeout_secs", self.reputation.timeout_secs as usize)?;
            non_zero("reputation.max_domains", self.reputation.max_domains)?;
        }

        Ok(())
    }
}

fn config_error(field: &str, reason: impl Into<String>) -> AnalyzerError {
    AnalyzerError::Config {
        field: field.to_owned(),
        reason: reason.into(),
    }
}

fn non_zero(field: &str, value: usize) -> Result<(), AnalyzerError> {
    if value == 0 {
        return Err(config_error(field, "must be greater than 0"));
    }
    Ok(())
}

/// 분석 엔진 설정 빌더
#[derive(Default)]
pub struct AnalyzerConfigBuilder {
    config: AnalyzerConfig,
}

impl AnalyzerConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 상위 N개 개수를 설정합니다.
    pub fn top_n(mut self, top_n: usize) -> Self {
        self.config.top_n = top_n;
        self
    }

    /// 타임라인 버킷 크기(초)를 설정합니다.
    pub fn timeline_bucket_secs(mut self, secs: u64) -> Self {
        self.config.timeline_bucket_secs = secs;
        self
    }

    /// 404 경로 탐색 임계값을 설정합니다.
    pub fn scan_404_threshold(mut self, threshold: usize) -> Self {
        self.config.scan_404_threshold = threshold;
        self
    }

    /// 429 속도 제한 남용 임계값을 설정합니다.
    pub fn abuse_429_threshold(mut self, threshold: usize) -> Self {
        self.config.abuse_429_threshold = threshold;
        self
    }

    /// 폭주 탐지 매개변수를 설정합니다.
    pub fn burst(mut self, burst: BurstParams) -> Self {
        self.config.burst = burst;
        self
    }

    /// 데이터 유출 크기 임계값을 설정합니다.
    pub fn exfil_size_threshold(mut self, bytes: u64) -> Self {
        self.config.exfiltration.size_threshold = bytes;
        self
    }

    /// 알려진 목적지 도메인 목록을 설정합니다.
    pub fn known_domains(mut self, domains: Vec<String>) -> Self {
        self.config.exfiltration.known_domains = domains;
        self
    }

    /// 허용 목록 매칭 방식을 설정합니다.
    pub fn domain_match(mut self, mode: DomainMatch) -> Self {
        self.config.exfiltration.domain_match = mode;
        self
    }

    /// 의심 다운로드 확장자를 설정합니다.
    pub fn suspicious_extensions(mut self, extensions: Vec<String>) -> Self {
        self.config.summary.suspicious_extensions = extensions;
        self
    }

    /// 평판 조회 매개변수를 설정합니다.
    pub fn reputation(mut self, reputation: ReputationParams) -> Self {
        self.config.reputation = reputation;
        self
    }

    /// 설정을 검증하고 `AnalyzerConfig`를 생성합니다.
    pub fn build(self) -> Result<AnalyzerConfig, AnalyzerError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
