//! 폭주 활동 탐지기
//!
//! IP별로 대상 상태 코드 이벤트의 타임스탬프를 정렬한 뒤, 연속한 `threshold`개
//! 이벤트의 처음과 끝이 시간 창 이내인 구간이 하나라도 있으면 플래그합니다.
//! 한 번 플래그된 IP의 나머지 구간은 검사하지 않습니다.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};

use logscope_core::error::{ConfigError, LogscopeError};
use logscope_core::pipeline::IpDetector;
use logscope_core::types::{Column, FlagReason, FlaggedIp, LogRecord};

use crate::config::BurstParams;

const REQUIRED_COLUMNS: &[Column] = &[Column::Ip, Column::StatusCode, Column::Timestamp];

/// 폭주 활동 탐지기
#[derive(Debug, Clone)]
pub struct BurstDetector {
    params: BurstParams,
}

impl BurstDetector {
    pub fn new(params: BurstParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &BurstParams {
        &self.params
    }
}

impl IpDetector for BurstDetector {
    fn name(&self) -> &str {
        "burst_activity"
    }

    fn reason(&self) -> FlagReason {
        FlagReason::BurstActivity
    }

    fn required_columns(&self) -> &[Column] {
        REQUIRED_COLUMNS
    }

    /// 결과는 IP 오름차순이며, `metric_count`는 해당 IP의 대상 상태 코드 이벤트 수입니다.
    fn detect(&self, records: &[LogRecord]) -> Result<Vec<FlaggedIp>, LogscopeError> {
        let threshold = self.params.threshold;
        if threshold == 0 {
            return Err(ConfigError::InvalidValue {
                field: "burst.threshold".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }
        let window = self.params.window();

        let mut by_ip: BTreeMap<&str, Vec<DateTime<FixedOffset>>> = BTreeMap::new();
        for record in records
            .iter()
            .filter(|r| r.status_code == self.params.status_code)
        {
            by_ip
                .entry(record.ip.as_str())
                .or_default()
                .push(record.timestamp);
        }

        let mut flagged = Vec::new();
        for (ip, mut times) in by_ip {
            times.sort();
            let bursting = times
                .windows(threshold)
                .any(|run| run[threshold - 1] - run[0] <= window);

            if bursting {
                flagged.push(FlaggedIp {
                    ip: ip.to_owned(),
                    metric_count: times.len(),
                    reason: FlagReason::BurstActivity,
                });
            }
        }

        Ok(flagged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn base() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2024-01-15T12:00:00+00:00").unwrap()
    }

    fn event(ip: &str, status: u16, at: DateTime<FixedOffset>) -> LogRecord {
        LogRecord {
            ip: ip.to_owned(),
            timestamp: at,
            method: "GET".to_owned(),
            request_path: "/missing".to_owned(),
            http_version: "HTTP/1.1".to_owned(),
            status_code: status,
            size: 0,
            referrer: None,
            user_agent: None,
        }
    }

    fn detector(threshold: usize, window_minutes: u64) -> BurstDetector {
        BurstDetector::new(BurstParams {
            status_code: 404,
            threshold,
            window_minutes,
        })
    }

    #[test]
    fn five_events_within_forty_seconds_are_flagged() {
        let records: Vec<_> = (0..5)
            .map(|i| event("10.0.0.9", 404, base() + TimeDelta::seconds(10 * i)))
            .collect();
        let flagged = detector(5, 1).detect(&records).unwrap();
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].ip, "10.0.0.9");
        assert_eq!(flagged[0].metric_count, 5);
        assert_eq!(flagged[0].reason, FlagReason::BurstActivity);
    }

    #[test]
    fn events_twenty_minutes_apart_are_not_flagged() {
        let records: Vec<_> = (0..5)
            .map(|i| event("10.0.0.9", 404, base() + TimeDelta::minutes(20 * i)))
            .collect();
        assert!(detector(5, 1).detect(&records).unwrap().is_empty());
    }

    #[test]
    fn window_boundary_is_inclusive() {
        let records = vec![
            event("10.0.0.1", 404, base()),
            event("10.0.0.1", 404, base() + TimeDelta::seconds(60)),
        ];
        assert_eq!(detector(2, 1).detect(&records).unwrap().len(), 1);

        let records = vec![
            event("10.0.0.1", 404, base()),
            event("10.0.0.1", 404, base() + TimeDelta::seconds(61)),
        ];
        assert!(detector(2, 1).detect(&records).unwrap().is_empty());
    }

    #[test]
    fn zero_window_groups_identical_timestamps_only() {
        let records = vec![
            event("10.0.0.6", 404, base()),
            event("10.0.0.6", 404, base()),
            event("10.0.0.7", 404, base()),
            event("10.0.0.7", 404, base() + TimeDelta::seconds(1)),
        ];
        let flagged = detector(2, 0).detect(&records).unwrap();
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].ip, "10.0.0.6");
    }

    #[test]
    fn unsorted_input_is_sorted_per_ip() {
        let offsets = [300, 0, 30, 600, 10, 20];
        let records: Vec<_> = offsets
            .iter()
            .map(|s| event("10.0.0.2", 404, base() + TimeDelta::seconds(*s)))
            .collect();
        // 0, 10, 20, 30 -> 4개가 30초 이내
        let flagged = detector(4, 1).detect(&records).unwrap();
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].metric_count, 6);
    }

    #[test]
    fn other_status_codes_are_ignored() {
        let records: Vec<_> = (0..10)
            .map(|i| event("10.0.0.3", 200, base() + TimeDelta::seconds(i)))
            .collect();
        assert!(detector(5, 1).detect(&records).unwrap().is_empty());
    }

    #[test]
    fn output_is_ordered_by_ip() {
        let mut records = Vec::new();
        for ip in ["10.0.0.9", "10.0.0.1", "10.0.0.5"] {
            records.extend((0..3).map(|i| event(ip, 404, base() + TimeDelta::seconds(i))));
        }
        let ips: Vec<String> = detector(3, 1)
            .detect(&records)
            .unwrap()
            .into_iter()
            .map(|f| f.ip)
            .collect();
        assert_eq!(ips, vec!["10.0.0.1", "10.0.0.5", "10.0.0.9"]);
    }

    #[test]
    fn fewer_events_than_threshold_are_not_flagged() {
        let records: Vec<_> = (0..4)
            .map(|i| event("10.0.0.4", 404, base() + TimeDelta::seconds(i)))
            .collect();
        assert!(detector(5, 1).detect(&records).unwrap().is_empty());
    }

    #[test]
    fn zero_threshold_is_rejected() {
        let records = vec![event("10.0.0.1", 404, base())];
        assert!(matches!(
            detector(0, 1).detect(&records),
            Err(LogscopeError::Config(_))
        ));
    }

    #[test]
    fn mixed_offsets_compare_by_instant() {
        let utc = base();
        let shifted = DateTime::parse_from_rfc3339("2024-01-15T14:00:30+02:00").unwrap();
        let records = vec![event("10.0.0.7", 404, utc), event("10.0.0.7", 404, shifted)];
        assert_eq!(detector(2, 1).detect(&records).unwrap().len(), 1);
    }
}
