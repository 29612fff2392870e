//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::histogram!()`
//! 매크로를 호출합니다. 레코더(exporter) 설치는 호출 측 책임이며,
//! 설치되지 않은 경우 매크로 호출은 아무 일도 하지 않습니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `logscope_`
//! - 모듈명: `parser_`, `detector_`, `reputation_`, `analysis_`
//! - 접미어: `_total` (counter), `_seconds` (histogram)

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 탐지기 이름 레이블 키
pub const LABEL_DETECTOR: &str = "detector";

/// 결과 레이블 키 (scored, failed)
pub const LABEL_RESULT: &str = "result";

// ─── Parser 메트릭 ─────────────────────────────────────────────────

/// Parser: 파싱된 레코드 수 (counter)
pub const PARSER_RECORDS_TOTAL: &str = "logscope_parser_records_total";

/// Parser: 문법 불일치로 건너뛴 라인 수 (counter)
pub const PARSER_SKIPPED_LINES_TOTAL: &str = "logscope_parser_skipped_lines_total";

// ─── Detector 메트릭 ───────────────────────────────────────────────

/// Detector: 플래그된 IP 또는 레코드 수 (counter, label: detector)
pub const DETECTOR_FLAGS_TOTAL: &str = "logscope_detector_flags_total";

// ─── Reputation 메트릭 ─────────────────────────────────────────────

/// Reputation: 외부 평판 조회 수 (counter, label: result)
pub const REPUTATION_LOOKUPS_TOTAL: &str = "logscope_reputation_lookups_total";

/// Reputation: 속도 제한 대기 시간 (histogram, 초)
pub const REPUTATION_WAIT_DURATION_SECONDS: &str = "logscope_reputation_wait_duration_seconds";

// ─── Analysis 메트릭 ───────────────────────────────────────────────

/// Analysis: 완료된 분석 실행 수 (counter)
pub const ANALYSIS_RUNS_TOTAL: &str = "logscope_analysis_runs_total";

/// Analysis: 분석 실행 소요 시간 (histogram, 초)
pub const ANALYSIS_DURATION_SECONDS: &str = "logscope_analysis_duration_seconds";

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_histogram};

    describe_counter!(
        PARSER_RECORDS_TOTAL,
        "Total number of access-log lines parsed into records"
    );
    describe_counter!(
        PARSER_SKIPPED_LINES_TOTAL,
        "Total number of lines skipped because they did not match the log grammar"
    );
    describe_counter!(
        DETECTOR_FLAGS_TOTAL,
        "Total number of IPs or records flagged, per detector"
    );
    describe_counter!(
        REPUTATION_LOOKUPS_TOTAL,
        "Total number of external domain reputation lookups, per result"
    );
    describe_histogram!(
        REPUTATION_WAIT_DURATION_SECONDS,
        "Time spent waiting for a reputation rate-limiter slot in seconds"
    );
    describe_counter!(ANALYSIS_RUNS_TOTAL, "Total number of completed analysis runs");
    describe_histogram!(
        ANALYSIS_DURATION_SECONDS,
        "Time to run aggregators and detectors over one record store in seconds"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_METRIC_NAMES: &[&str] = &[
        PARSER_RECORDS_TOTAL,
        PARSER_SKIPPED_LINES_TOTAL,
        DETECTOR_FLAGS_TOTAL,
        REPUTATION_LOOKUPS_TOTAL,
        REPUTATION_WAIT_DURATION_SECONDS,
        ANALYSIS_RUNS_TOTAL,
        ANALYSIS_DURATION_SECONDS,
    ];

    #[test]
    fn all_metrics_start_with_logscope_prefix() {
        for name in ALL_METRIC_NAMES {
            assert!(
                name.starts_with("logscope_"),
                "Metric '{}' does not start with 'logscope_' prefix",
                name
            );
        }
    }

    #[test]
    fn metric_suffixes_follow_convention() {
        for name in ALL_METRIC_NAMES {
            assert!(
                name.ends_with("_total") || name.ends_with("_seconds"),
                "Metric '{}' must end with _total or _seconds",
                name
            );
        }
    }

    #[test]
    fn describe_all_does_not_panic() {
        describe_all();
    }

    #[test]
    fn label_keys_are_lowercase() {
        for label in [LABEL_DETECTOR, LABEL_RESULT] {
            assert_eq!(label.to_lowercase(), label);
        }
    }
}
