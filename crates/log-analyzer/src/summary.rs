//! 요약 -- 탐지 결과를 SOC 분석가용 문장으로 변환합니다.
//!
//! 발견 사항 순서: 데이터 유출, 경로 탐색, 속도 제한 남용, 의심 다운로드.
//! 같은 분류 안에서는 입력 순서를 유지합니다. 폭주 활동은 요약에 포함하지 않습니다.

use regex::Regex;

use logscope_core::types::{
    Column, ExfiltrationEvent, Finding, FindingCategory, FlagReason, FlaggedIp, LogRecord,
};

use crate::config::SummaryParams;
use crate::error::AnalyzerError;
use crate::store::RecordStore;

const TIMESTAMP_FORMAT: &str = "%d/%b/%Y:%H:%M:%S %z";

/// 탐지 결과 요약기
#[derive(Debug, Clone)]
pub struct SummaryCorrelator {
    exfil_size_threshold: u64,
    /// 의심 확장자 패턴 (대소문자 무시, 경로 끝)
    suspicious: Option<Regex>,
}

impl SummaryCorrelator {
    /// 요약 매개변수로 요약기를 생성합니다.
    pub fn new(params: &SummaryParams) -> Result<Self, AnalyzerError> {
        let alternatives: Vec<String> = params
            .suspicious_extensions
            .iter()
            .map(|ext| ext.trim().trim_start_matches('.'))
            .filter(|ext| !ext.is_empty())
            .map(|ext| regex::escape(&format!(".{ext}")))
            .collect();

        let suspicious = if alternatives.is_empty() {
            None
        } else {
            Some(Regex::new(&format!("(?i)(?:{})$", alternatives.join("|")))?)
        };

        Ok(Self {
            exfil_size_threshold: params.exfil_size_threshold,
            suspicious,
        })
    }

    /// 요청 경로가 의심 확장자로 끝나는지 확인합니다. 쿼리와 프래그먼트는 무시합니다.
    pub fn is_suspicious_path(&self, request_path: &str) -> bool {
        let path = request_path
            .split(['?', '#'])
            .next()
            .unwrap_or(request_path);
        self.suspicious
            .as_ref()
            .is_some_and(|pattern| pattern.is_match(path))
    }

    /// 탐지 결과를 발견 사항 목록으로 변환합니다.
    ///
    /// `flagged`에서는 경로 탐색과 속도 제한 남용 사유만 사용합니다.
    pub fn correlate(
        &self,
        exfiltration: &[ExfiltrationEvent],
        flagged: &[FlaggedIp],
        store: &RecordStore,
    ) -> Result<Vec<Finding>, AnalyzerError> {
        store.require("summary", &[Column::Ip, Column::RequestPath])?;

        let mut findings: Vec<Finding> = Vec::new();

        findings.extend(
            exfiltration
                .iter()
                .filter(|e| e.method.eq_ignore_ascii_case("POST") && e.size > self.exfil_size_threshold)
                .map(exfiltration_finding),
        );

        findings.extend(flagged.iter().filter_map(flag_finding));

        findings.extend(
            store
                .iter()
                .filter(|r| self.is_suspicious_path(&r.request_path))
                .map(|r| download_finding(r, store.has_column(Column::Timestamp))),
        );

        // 분류 순서로 안정 정렬 (같은 분류는 입력 순서 유지)
        findings.sort_by_key(|f| f.category);
        Ok(findings)
    }
}

fn exfiltration_finding(event: &ExfiltrationEvent) -> Finding {
    let destination = if event.destination_domain.is_empty() {
        "an unknown destination"
    } else {
        event.destination_domain.as_str()
    };
    Finding {
        category: FindingCategory::Exfiltration,
        message: format!(
            "Possible data exfiltration: {} sent {} {} ({} bytes) to {} at {}",
            event.ip,
            event.method,
            event.request_path,
            event.size,
            destination,
            event.timestamp.format(TIMESTAMP_FORMAT),
        ),
    }
}

fn flag_finding(flag: &FlaggedIp) -> Option<Finding> {
    let (category, message) = match flag.reason {
        FlagReason::EndpointScanning => (
            FindingCategory::EndpointScanning,
            format!(
                "Endpoint scanning: {} received {} 404 responses, suggesting automated path probing",
                flag.ip, flag.metric_count
            ),
        ),
        FlagReason::RateLimitAbuse => (
            FindingCategory::RateLimitAbuse,
            format!(
                "Rate-limit abuse: {} received {} 429 responses, suggesting scraping or brute force",
                flag.ip, flag.metric_count
            ),
        ),
        FlagReason::BurstActivity => return None,
    };
    Some(Finding { category, message })
}

fn download_finding(record: &LogRecord, with_time: bool) -> Finding {
    let message = if with_time {
        format!(
            "Suspicious download: {} requested {} at {}",
            record.ip,
            record.request_path,
            record.timestamp.format(TIMESTAMP_FORMAT),
        )
    } else {
        format!(
            "Suspicious download: {} requested {}",
            record.ip, record.request_path
        )
    };
    Finding {
        category: FindingCategory::SuspiciousDownload,
        message,
    }
}
