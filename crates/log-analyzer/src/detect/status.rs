//! 상태 코드 임계값 탐지기
//!
//! 특정 상태 코드 응답을 `threshold`번 이상 받은 IP를 플래그합니다.
//! - 404 반복: 자동화된 경로 탐색 (endpoint scanning)
//! - 429 반복: 스크래핑 또는 무차별 대입 (rate-limit abuse)

use logscope_core::error::LogscopeError;
use logscope_core::pipeline::IpDetector;
use logscope_core::types::{Column, FlagReason, FlaggedIp, LogRecord};

use crate::aggregate::count_stable;

const REQUIRED_COLUMNS: &[Column] = &[Column::Ip, Column::StatusCode];

/// 상태 코드 임계값 탐지기
#[derive(Debug, Clone)]
pub struct StatusThresholdDetector {
    name: &'static str,
    status_code: u16,
    threshold: usize,
    reason: FlagReason,
}

impl StatusThresholdDetector {
    /// 404 경로 탐색 탐지기 (기본 임계값 10)
    pub fn endpoint_scanning(threshold: usize) -> Self {
        Self {
            name: "endpoint_scanning",
            status_code: 404,
            threshold,
            reason: FlagReason::EndpointScanning,
        }
    }

    /// 429 속도 제한 남용 탐지기 (기본 임계값 5)
    pub fn rate_limit_abuse(threshold: usize) -> Self {
        Self {
            name: "rate_limit_abuse",
            status_code: 429,
            threshold,
            reason: FlagReason::RateLimitAbuse,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }
}

impl IpDetector for StatusThresholdDetector {
    fn name(&self) -> &str {
        self.name
    }

    fn reason(&self) -> FlagReason {
        self.reason
    }

    fn required_columns(&self) -> &[Column] {
        REQUIRED_COLUMNS
    }

    /// 결과는 이벤트 수 내림차순, 같은 수는 처음 나타난 순서입니다.
    fn detect(&self, records: &[LogRecord]) -> Result<Vec<FlaggedIp>, LogscopeError> {
        let matching = records
            .iter()
            .filter(|r| r.status_code == self.status_code)
            .map(|r| r.ip.as_str());

        Ok(count_stable(matching)
            .into_iter()
            .filter(|(_, count)| *count >= self.threshold)
            .map(|(ip, count)| FlaggedIp {
                ip: ip.to_owned(),
                metric_count: count,
                reason: self.reason,
            })
            .collect())
    }
}
