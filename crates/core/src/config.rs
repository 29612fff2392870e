//! 설정 관리 — logscope.toml 파싱 및 런타임 설정
//!
//! [`LogscopeConfig`]는 모든 모듈의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`LOGSCOPE_DETECTION_SCAN_404_THRESHOLD=20` 형식)
//! 3. 설정 파일 (`logscope.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), logscope_core::error::LogscopeError> {
//! use logscope_core::config::LogscopeConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = LogscopeConfig::load("logscope.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = LogscopeConfig::parse("[detection]\nscan_404_threshold = 20")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, LogscopeError};

/// Logscope 통합 설정
///
/// `logscope.toml` 파일의 최상위 구조를 나타냅니다.
/// 각 모듈은 자기 섹션만 읽어 사용합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogscopeConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 집계 설정
    #[serde(default)]
    pub analysis: AnalysisConfig,
    /// 탐지기 설정
    #[serde(default)]
    pub detection: DetectionConfig,
    /// 요약 설정
    #[serde(default)]
    pub summary: SummaryConfig,
    /// 도메인 평판 조회 설정
    #[serde(default)]
    pub reputation: ReputationConfig,
}

impl LogscopeConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    ///
    /// 설정 로딩 순서:
    /// 1. TOML 파일 파싱
    /// 2. 환경변수 오버라이드 적용
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, LogscopeError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, LogscopeError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LogscopeError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                LogscopeError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, LogscopeError> {
        toml::from_str(toml_str).map_err(|e| {
            LogscopeError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `LOGSCOPE_{SECTION}_{FIELD}`
    /// 예: `LOGSCOPE_REPUTATION_API_KEY=...`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "LOGSCOPE_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "LOGSCOPE_GENERAL_LOG_FORMAT");

        // Analysis
        override_usize(&mut self.analysis.top_n, "LOGSCOPE_ANALYSIS_TOP_N");
        override_u64(
            &mut self.analysis.timeline_bucket_secs,
            "LOGSCOPE_ANALYSIS_TIMELINE_BUCKET_SECS",
        );
        override_usize(
            &mut self.analysis.max_line_len,
            "LOGSCOPE_ANALYSIS_MAX_LINE_LEN",
        );

        // Detection
        override_usize(
            &mut self.detection.scan_404_threshold,
            "LOGSCOPE_DETECTION_SCAN_404_THRESHOLD",
        );
        override_usize(
            &mut self.detection.abuse_429_threshold,
            "LOGSCOPE_DETECTION_ABUSE_429_THRESHOLD",
        );
        override_u16(
            &mut self.detection.burst_status_code,
            "LOGSCOPE_DETECTION_BURST_STATUS_CODE",
        );
        override_usize(
            &mut self.detection.burst_threshold,
            "LOGSCOPE_DETECTION_BURST_THRESHOLD",
        );
        override_u64(
            &mut self.detection.burst_window_minutes,
            "LOGSCOPE_DETECTION_BURST_WINDOW_MINUTES",
        );
        override_u64(
            &mut self.detection.exfil_size_threshold,
            "LOGSCOPE_DETECTION_EXFIL_SIZE_THRESHOLD",
        );
        override_csv(
            &mut self.detection.known_domains,
            "LOGSCOPE_DETECTION_KNOWN_DOMAINS",
        );
        if let Ok(val) = std::env::var("LOGSCOPE_DETECTION_DOMAIN_MATCH") {
            match DomainMatch::from_str_loose(&val) {
                Some(mode) => self.detection.domain_match = mode,
                None => warn!(
                    env_key = "LOGSCOPE_DETECTION_DOMAIN_MATCH",
                    value = val.as_str(),
                    "unknown domain match mode in env var, ignoring"
                ),
            }
        }

        // Summary
        override_u64(
            &mut self.summary.exfil_size_threshold,
            "LOGSCOPE_SUMMARY_EXFIL_SIZE_THRESHOLD",
        );
        override_csv(
            &mut self.summary.suspicious_extensions,
            "LOGSCOPE_SUMMARY_SUSPICIOUS_EXTENSIONS",
        );

        // Reputation
        override_bool(&mut self.reputation.enabled, "LOGSCOPE_REPUTATION_ENABLED");
        override_string(&mut self.reputation.base_url, "LOGSCOPE_REPUTATION_BASE_URL");
        override_string(&mut self.reputation.api_key, "LOGSCOPE_REPUTATION_API_KEY");
        override_u64(
            &mut self.reputation.delay_secs,
            "LOGSCOPE_REPUTATION_DELAY_SECS",
        );
        override_u64(
            &mut self.reputation.timeout_secs,
            "LOGSCOPE_REPUTATION_TIMEOUT_SECS",
        );
        override_usize(
            &mut self.reputation.max_domains,
            "LOGSCOPE_REPUTATION_MAX_DOMAINS",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), LogscopeError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if self.analysis.top_n == 0 {
            return Err(invalid("analysis.top_n", "must be greater than 0"));
        }
        if self.analysis.timeline_bucket_secs == 0 {
            return Err(invalid(
                "analysis.timeline_bucket_secs",
                "must be greater than 0",
            ));
        }
        if self.analysis.max_line_len == 0 {
            return Err(invalid("analysis.max_line_len", "must be greater than 0"));
        }

        if self.detection.scan_404_threshold == 0 {
            return Err(invalid(
                "detection.scan_404_threshold",
                "must be greater than 0",
            ));
        }
        if self.detection.abuse_429_threshold == 0 {
            return Err(invalid(
                "detection.abuse_429_threshold",
                "must be greater than 0",
            ));
        }
        if self.detection.burst_threshold == 0 {
            return Err(invalid(
                "detection.burst_threshold",
                "must be greater than 0",
            ));
        }
        if self.detection.burst_window_minutes > MAX_BURST_WINDOW_MINUTES {
            return Err(invalid(
                "detection.burst_window_minutes",
                format!("must be 0-{MAX_BURST_WINDOW_MINUTES}"),
            ));
        }
        if !(100..=599).contains(&self.detection.burst_status_code) {
            return Err(invalid(
                "detection.burst_status_code",
                "must be an HTTP status code (100-599)",
            ));
        }
        if self.detection.known_domains.iter().any(|d| d.is_empty()) {
            // 빈 항목은 부분 문자열 매칭에서 모든 도메인과 일치하므로 허용하지 않음
            return Err(invalid(
                "detection.known_domains",
                "entries must not be empty",
            ));
        }

        if self
            .summary
            .suspicious_extensions
            .iter()
            .any(|ext| ext.trim_start_matches('.').is_empty())
        {
            return Err(invalid(
                "summary.suspicious_extensions",
                "entries must not be empty",
            ));
        }

        if self.reputation.enabled {
            if self.reputation.api_key.is_empty() {
                return Err(invalid(
                    "reputation.api_key",
                    "api key must not be empty when reputation lookups are enabled",
                ));
            }
            if !self.reputation.base_url.starts_with("http://")
                && !self.reputation.base_url.starts_with("https://")
            {
                return Err(invalid(
                    "reputation.base_url",
                    "must start with http:// or https://",
                ));
            }
            if self.reputation.timeout_secs == 0 {
                return Err(invalid(
                    "reputation.timeout_secs",
                    "must be greater than 0",
                ));
            }
            if self.reputation.max_domains == 0 {
                return Err(invalid(
                    "reputation.max_domains",
                    "must be greater than 0",
                ));
            }
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> LogscopeError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.into(),
    }
    .into()
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// 집계 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// 상위 N개 페이지/도메인
    pub top_n: usize,
    /// 활동 타임라인 버킷 크기 (초)
    pub timeline_bucket_secs: u64,
    /// 한 줄 최대 길이 (바이트), 초과하면 잘못된 라인으로 취급
    pub max_line_len: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            top_n: 10,
            timeline_bucket_secs: 60,
            max_line_len: 64 * 1024, // 64KB
        }
    }
}

/// 목적지 도메인 허용 목록 매칭 방식
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainMatch {
    /// 허용 항목이 목적지 도메인의 부분 문자열이면 허용 (기본값)
    #[default]
    Substring,
    /// 정확히 같거나 `.{항목}`으로 끝나면 허용
    Suffix,
}

impl DomainMatch {
    /// 문자열에서 매칭 방식을 파싱합니다. 대소문자를 구분하지 않습니다.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "substring" => Some(Self::Substring),
            "suffix" => Some(Self::Suffix),
            _ => None,
        }
    }
}

/// 폭주 탐지 시간 창의 최대 길이 (1주)
pub const MAX_BURST_WINDOW_MINUTES: u64 = 7 * 24 * 60;

/// 탐지기 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// 경로 탐색 판정 404 응답 수
    pub scan_404_threshold: usize,
    /// 속도 제한 남용 판정 429 응답 수
    pub abuse_429_threshold: usize,
    /// 폭주 탐지 대상 상태 코드
    pub burst_status_code: u16,
    /// 폭주 판정 이벤트 수
    pub burst_threshold: usize,
    /// 폭주 판정 시간 창 (분)
    pub burst_window_minutes: u64,
    /// 데이터 유출 판정 응답 크기 (바이트, 초과)
    pub exfil_size_threshold: u64,
    /// 알려진 목적지 도메인 허용 목록
    pub known_domains: Vec<String>,
    /// 허용 목록 매칭 방식
    pub domain_match: DomainMatch,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            scan_404_threshold: 10,
            abuse_429_threshold: 5,
            burst_status_code: 404,
            burst_threshold: 5,
            burst_window_minutes: 1,
            exfil_size_threshold: 10_000,
            known_domains: Vec::new(),
            domain_match: DomainMatch::Substring,
        }
    }
}

/// 요약 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    /// 요약에 포함할 유출 이벤트의 최소 크기 (바이트, 초과)
    pub exfil_size_threshold: u64,
    /// 의심 다운로드 확장자 (대소문자 무시)
    pub suspicious_extensions: Vec<String>,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            exfil_size_threshold: 1_000_000,
            suspicious_extensions: vec![".exe".to_owned()],
        }
    }
}

/// 도메인 평판 조회 설정
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReputationConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 평판 서비스 API 기본 URL
    pub base_url: String,
    /// API 키 (`x-apikey` 헤더)
    pub api_key: String,
    /// 연속 호출 사이 최소 간격 (초)
    pub delay_secs: u64,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
    /// 한 번에 조회할 최대 도메인 수
    pub max_domains: usize,
}

impl Default for ReputationConfig {
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

impl std::fmt::Debug for ReputationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReputationConfig")
            .field("enabled", &self.enabled)
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("delay_secs", &self.delay_secs)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_domains", &self.max_domains)
            .finish()
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    override_parsed(target, env_key, "bool");
}

fn override_usize(target: &mut usize, env_key: &str) {
    override_parsed(target, env_key, "usize");
}

fn override_u16(target: &mut u16, env_key: &str) {
    override_parsed(target, env_key, "u16");
}

fn override_u64(target: &mut u64, env_key: &str) {
    override_parsed(target, env_key, "u64");
}

fn override_parsed<T: std::str::FromStr>(target: &mut T, env_key: &str, type_name: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<T>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                expected = type_name,
                "failed to parse env var, ignoring"
            ),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();
    }
}
