//! 도메인 타입 — 분석 엔진 전역에서 사용되는 공통 타입
//!
//! 파서가 만든 [`LogRecord`]부터 집계/탐지/평판 조회/요약 결과까지
//! 모든 모듈이 공유하는 데이터 구조를 정의합니다.
//! 엔진 자체는 직렬화 형식에 무관하며, 모든 타입은 `serde`로 직렬화할 수 있습니다.

use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// 접근 로그 레코드
///
/// 접근 로그 한 줄을 파싱한 결과입니다. 파서가 한 번 생성한 뒤에는 변경되지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    /// 클라이언트 IP (로그에 기록된 토큰 그대로)
    pub ip: String,
    /// 요청 시각 (타임존 오프셋 포함)
    pub timestamp: DateTime<FixedOffset>,
    /// HTTP 메서드 (대문자)
    pub method: String,
    /// 요청 경로
    pub request_path: String,
    /// HTTP 버전 (예: HTTP/1.1)
    pub http_version: String,
    /// 응답 상태 코드
    pub status_code: u16,
    /// 응답 크기 (바이트)
    pub size: u64,
    /// Referer 헤더 (Common Log Format 라인에는 없음)
    pub referrer: Option<String>,
    /// User-Agent 헤더 (Common Log Format 라인에는 없음)
    pub user_agent: Option<String>,
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] \"{} {} {}\" {} {}",
            self.ip,
            self.timestamp.format("%d/%b/%Y:%H:%M:%S %z"),
            self.method,
            self.request_path,
            self.http_version,
            self.status_code,
            self.size,
        )
    }
}

/// 레코드 컬럼
///
/// 레코드 집합이 실제로 보유한 필드를 표현합니다. 파서가 만든 집합은 항상
/// 모든 컬럼을 가지며, 외부에서 가져온 표 형식 집합은 일부가 빠질 수 있습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Ip,
    Timestamp,
    Method,
    RequestPath,
    HttpVersion,
    StatusCode,
    Size,
    Referrer,
    UserAgent,
}

impl Column {
    /// 모든 컬럼 (레코드 필드 순서)
    pub const ALL: [Column; 9] = [
        Column::Ip,
        Column::Timestamp,
        Column::Method,
        Column::RequestPath,
        Column::HttpVersion,
        Column::StatusCode,
        Column::Size,
        Column::Referrer,
        Column::UserAgent,
    ];

    /// 직렬화 시 사용하는 필드 이름
    pub fn name(self) -> &'static str {
        match self {
            Self::Ip => "ip",
            Self::Timestamp => "timestamp",
            Self::Method => "method",
            Self::RequestPath => "request_path",
            Self::HttpVersion => "http_version",
            Self::StatusCode => "status_code",
            Self::Size => "size",
            Self::Referrer => "referrer",
            Self::UserAgent => "user_agent",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 요청 경로별 요청 수
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageCount {
    pub page: String,
    pub count: usize,
}

/// Referer 도메인별 요청 수
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainCount {
    pub domain: String,
    pub count: usize,
}

/// 트래픽 분류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrafficClass {
    /// 200, 302
    Allowed,
    /// 401, 403
    Blocked,
    /// 500, 502, 503, 504
    ServerError,
    /// 나머지 전부
    Other,
}

impl fmt::Display for TrafficClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allowed => write!(f, "Allowed"),
            Self::Blocked => write!(f, "Blocked"),
            Self::ServerError => write!(f, "Server Error"),
            Self::Other => write!(f, "Other"),
        }
    }
}

/// 트래픽 분류별 요청 수
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficCount {
    pub class: TrafficClass,
    pub count: usize,
}

/// 시간 버킷별 요청 수
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineBucket {
    /// 버킷 시작 시각
    pub start: DateTime<FixedOffset>,
    pub count: usize,
}

/// IP가 플래그된 사유
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlagReason {
    /// 404 응답 반복 (경로 탐색)
    EndpointScanning,
    /// 429 응답 반복 (스크래핑/무차별 대입)
    RateLimitAbuse,
    /// 짧은 시간 창 안의 동일 상태 코드 폭주
    BurstActivity,
}

impl fmt::Display for FlagReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EndpointScanning => write!(f, "endpoint scanning"),
            Self::RateLimitAbuse => write!(f, "rate-limit abuse"),
            Self::BurstActivity => write!(f, "burst activity"),
        }
    }
}

/// 탐지기가 플래그한 IP
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlaggedIp {
    pub ip: String,
    /// 판단 근거가 된 이벤트 수
    pub metric_count: usize,
    pub reason: FlagReason,
}

impl fmt::Display for FlaggedIp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, count={})", self.ip, self.reason, self.metric_count)
    }
}

/// 데이터 유출 의심 이벤트
///
/// 집계하지 않은 레코드의 부분 집합입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExfiltrationEvent {
    pub ip: String,
    pub timestamp: DateTime<FixedOffset>,
    pub method: String,
    pub request_path: String,
    pub size: u64,
    /// 요청 경로(또는 referrer)에서 추출한 목적지 도메인, 없으면 빈 문자열
    pub destination_domain: String,
}

/// 도메인 평판 조회 결과
///
/// 조회 실패는 성공 형태로 변환하지 않고 [`ReputationVerdict::Failed`]로 남깁니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReputationVerdict {
    /// 분석 통계 조회 성공
    Scored {
        domain: String,
        harmless: u64,
        malicious: u64,
        suspicious: u64,
        undetected: u64,
    },
    /// 조회 실패
    Failed {
        domain: String,
        /// HTTP 상태 코드 (전송 단계 실패 시 `None`)
        status: Option<u16>,
        /// 서비스 응답 본문 또는 전송 에러 메시지
        raw_response: String,
    },
}

impl ReputationVerdict {
    /// 조회 대상 도메인
    pub fn domain(&self) -> &str {
        match self {
            Self::Scored { domain, .. } | Self::Failed { domain, .. } => domain,
        }
    }

    /// 조회 성공 여부
    pub fn is_scored(&self) -> bool {
        matches!(self, Self::Scored { .. })
    }
}

impl fmt::Display for ReputationVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scored {
                domain,
                harmless,
                malicious,
                suspicious,
                undetected,
            } => write!(
                f,
                "{domain}: harmless={harmless} malicious={malicious} suspicious={suspicious} undetected={undetected}"
            ),
            Self::Failed { domain, status, .. } => match status {
                Some(code) => write!(f, "{domain}: lookup failed (HTTP {code})"),
                None => write!(f, "{domain}: lookup failed (transport)"),
            },
        }
    }
}

/// 요약 발견 사항 분류 (출력 순서와 같음)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum FindingCategory {
    Exfiltration,
    EndpointScanning,
    RateLimitAbuse,
    SuspiciousDownload,
}

/// SOC 분석가용 요약 문장 하나
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub category: FindingCategory,
    pub message: String,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
