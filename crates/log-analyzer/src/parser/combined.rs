//! Apache Combined / Common Log Format 파서
//!
//! # 라인 형식
//! ```text
//! IP IDENT USER [dd/Mon/yyyy:HH:mm:ss ±HHMM] "METHOD PATH VERSION" STATUS SIZE "REFERRER" "USER-AGENT"
//! ```
//!
//! 끝의 `"REFERRER" "USER-AGENT"` 쌍은 선택 사항입니다. 쌍이 없는 Common Log Format
//! 라인은 `referrer`/`user_agent`가 `None`인 레코드가 됩니다.
//!
//! # 사용 예시
//! ```ignore
//! use logscope_log_analyzer::parser::CombinedLogParser;
//!
//! let parser = CombinedLogParser::new()?;
//! let outcome = parser.parse_str(
//!     r#"10.0.0.1 - - [10/Oct/2024:13:55:36 +0000] "GET /index.html HTTP/1.1" 200 512 "-" "curl/8.0""#,
//! )?;
//! assert_eq!(outcome.records.len(), 1);
//! ```

use std::path::Path;

use chrono::DateTime;
use regex::{Captures, Regex};
use tracing::debug;

use logscope_core::error::LogscopeError;
use logscope_core::metrics as m;
use logscope_core::pipeline::LogParser;
use logscope_core::types::LogRecord;

use super::ParseOutcome;
use crate::error::AnalyzerError;

/// 접근 로그 라인 문법
const COMBINED_PATTERN: &str = r#"^(?P<ip>\S+) \S+ \S+ \[(?P<timestamp>[^\]]*)\] "(?P<method>\S+) (?P<request_path>\S+) (?P<http_version>[^"]+)" (?P<status_code>\d+) (?P<size>\d+)(?: "(?P<referrer>[^"]*)" "(?P<user_agent>[^"]*)")?"#;

/// 타임스탬프 형식 (예: `10/Oct/2024:13:55:36 -0700`)
const TIMESTAMP_FORMAT: &str = "%d/%b/%Y:%H:%M:%S %z";

/// 기본 최대 라인 길이 (바이트)
const DEFAULT_MAX_LINE_LEN: usize = 64 * 1024;

/// Combined Log Format 파서
///
/// core의 [`LogParser`] trait을 구현합니다. 문법에 맞지 않는 라인은 건너뛰고,
/// 문법에는 맞지만 타임스탬프나 숫자 필드를 해석할 수 없는 라인은 배치 전체를
/// 실패시킵니다.
pub struct CombinedLogParser {
    pattern: Regex,
    /// 최대 허용 라인 길이 (바이트), 초과 라인은 잘못된 라인으로 취급
    max_line_len: usize,
}

impl CombinedLogParser {
    /// 기본 설정으로 새 파서를 생성합니다.
    pub fn new() -> Result<Self, AnalyzerError> {
        Ok(Self {
            pattern: Regex::new(COMBINED_PATTERN)?,
            max_line_len: DEFAULT_MAX_LINE_LEN,
        })
    }

    /// 최대 라인 길이를 설정합니다.
    pub fn with_max_line_len(mut self, len: usize) -> Self {
        self.max_line_len = len;
        self
    }

    /// 설정된 최대 라인 길이
    pub fn max_line_len(&self) -> usize {
        self.max_line_len
    }

    /// 한 줄을 파싱합니다.
    ///
    /// - 문법 불일치 (또는 길이 초과): `Ok(None)`
    /// - 필드 해석 실패: `Err(AnalyzerError::Parse)`
    pub fn parse_record(
        &self,
        line_no: usize,
        line: &str,
    ) -> Result<Option<LogRecord>, AnalyzerError> {
        if line.len() > self.max_line_len {
            return Ok(None);
        }

        let Some(caps) = self.pattern.captures(line) else {
            return Ok(None);
        };

        let raw_ts = field(&caps, "timestamp");
        let timestamp = DateTime::parse_from_str(raw_ts, TIMESTAMP_FORMAT).map_err(|e| {
            AnalyzerError::Parse {
                line: line_no,
                reason: format!("invalid timestamp '{raw_ts}': {e}"),
            }
        })?;

        let status_code = parse_number::<u16>(&caps, "status_code", line_no)?;
        let size = parse_number::<u64>(&caps, "size", line_no)?;

        Ok(Some(LogRecord {
            ip: field(&caps, "ip").to_owned(),
            timestamp,
            method: field(&caps, "method").to_uppercase(),
            request_path: field(&caps, "request_path").to_owned(),
            http_version: field(&caps, "http_version").to_owned(),
            status_code,
            size,
            referrer: caps.name("referrer").map(|m| m.as_str().to_owned()),
            user_agent: caps.name("user_agent").map(|m| m.as_str().to_owned()),
        }))
    }

    /// 여러 라인을 파싱합니다.
    ///
    /// 공백뿐인 라인은 무시합니다. 로그 라인이 하나도 없으면 `EmptyInput`을 반환합니다.
    /// 라인 번호는 입력 순서 기준 1부터 시작합니다.
    pub fn parse_lines<'a, I>(&self, lines: I) -> Result<ParseOutcome, AnalyzerError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut records = Vec::new();
        let mut skipped = 0usize;
        let mut seen = 0usize;

        for (idx, line) in lines.into_iter().enumerate() {
            let line = line.trim_end_matches(['\r', '\n']);
            if line.trim().is_empty() {
                continue;
            }
            seen += 1;

            match self.parse_record(idx + 1, line)? {
                Some(record) => records.push(record),
                None => {
                    skipped += 1;
                    debug!(line = idx + 1, len = line.len(), "skipping malformed log line");
                }
            }
        }

        if seen == 0 {
            return Err(AnalyzerError::EmptyInput);
        }

        metrics::counter!(m::PARSER_RECORDS_TOTAL).increment(records.len() as u64);
        metrics::counter!(m::PARSER_SKIPPED_LINES_TOTAL).increment(skipped as u64);

        Ok(ParseOutcome { records, skipped })
    }

    /// 메모리의 로그 본문을 파싱합니다.
    pub fn parse_str(&self, text: &str) -> Result<ParseOutcome, AnalyzerError> {
        self.parse_lines(text.lines())
    }

    /// 로그 파일을 읽어 파싱합니다.
    ///
    /// 파일을 읽을 수 없거나 UTF-8이 아니면 I/O 에러를 반환합니다.
    pub async fn parse_file(&self, path: impl AsRef<Path>) -> Result<ParseOutcome, AnalyzerError> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path).await?;
        debug!(path = %path.display(), bytes = text.len(), "read log file");
        self.parse_str(&text)
    }
}

impl LogParser for CombinedLogParser {
    fn format_name(&self) -> &str {
        "combined"
    }

    fn parse_line(&self, line_no: usize, line: &str) -> Result<Option<LogRecord>, LogscopeError> {
        self.parse_record(line_no, line).map_err(LogscopeError::from)
    }
}

fn field<'h>(caps: &Captures<'h>, name: &str) -> &'h str {
    caps.name(name).map_or("", |m| m.as_str())
}

fn parse_number<T: std::str::FromStr>(
    caps: &Captures<'_>,
    name: &str,
    line_no: usize,
) -> Result<T, AnalyzerError> {
    let raw = field(caps, name);
    raw.parse::<T>().map_err(|_| AnalyzerError::Parse {
        line: line_no,
        reason: format!("{name} '{raw}' is out of range"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use logscope_core::error::ParseError;

    const COMBINED: &str = r#"192.168.1.10 - - [10/Oct/2024:13:55:36 -0700] "GET /index.html HTTP/1.1" 200 2326 "http://www.example.com/start.html" "Mozilla/5.0""#;
    const COMMON: &str =
        r#"10.0.0.5 - frank [10/Oct/2024:13:55:36 +0000] "POST /upload HTTP/1.0" 201 512"#;

    fn parser() -> CombinedLogParser {
        CombinedLogParser::new().unwrap()
    }

    #[test]
    fn parses_combined_line() {
        let record = parser().parse_record(1, COMBINED).unwrap().unwrap();
        assert_eq!(record.ip, "192.168.1.10");
        assert_eq!(record.method, "GET");
        assert_eq!(record.request_path, "/index.html");
        assert_eq!(record.http_version, "HTTP/1.1");
        assert_eq!(record.status_code, 200);
        assert_eq!(record.size, 2326);
        assert_eq!(
            record.referrer.as_deref(),
            Some("http://www.example.com/start.html")
        );
        assert_eq!(record.user_agent.as_deref(), Some("Mozilla/5.0"));
        assert_eq!(record.timestamp.offset().local_minus_utc(), -7 * 3600);
    }

    #[test]
    fn parses_common_log_format_without_referrer() {
        let record = parser().parse_record(1, COMMON).unwrap().unwrap();
        assert_eq!(record.method, "POST");
        assert_eq!(record.status_code, 201);
        assert!(record.referrer.is_none());
        assert!(record.user_agent.is_none());
    }

    #[test]
    fn empty_quoted_fields_are_some_empty() {
        let line = r#"1.2.3.4 - - [01/Jan/2024:00:00:00 +0000] "GET / HTTP/1.1" 200 0 "" """#;
        let record = parser().parse_record(1, line).unwrap().unwrap();
        assert_eq!(record.referrer.as_deref(), Some(""));
        assert_eq!(record.user_agent.as_deref(), Some(""));
    }

    #[test]
    fn method_is_uppercased() {
        let line = r#"1.2.3.4 - - [01/Jan/2024:00:00:00 +0000] "post /x HTTP/1.1" 200 10 "-" "ua""#;
        let record = parser().parse_record(1, line).unwrap().unwrap();
        assert_eq!(record.method, "POST");
    }

    #[test]
    fn malformed_line_is_skipped() {
        assert!(parser().parse_record(1, "not a log line").unwrap().is_none());
        assert!(
            parser()
                .parse_record(1, r#"1.2.3.4 - - [01/Jan/2024:00:00:00 +0000] "GET /" 200 10"#)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn invalid_timestamp_is_fatal() {
        let line = r#"1.2.3.4 - - [99/Foo/2024:00:00:00 +0000] "GET / HTTP/1.1" 200 10 "-" "ua""#;
        let err = parser().parse_record(7, line).unwrap_err();
        match err {
            AnalyzerError::Parse { line, reason } => {
                assert_eq!(line, 7);
                assert!(reason.contains("timestamp"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn overflowing_status_is_fatal() {
        let line = r#"1.2.3.4 - - [01/Jan/2024:00:00:00 +0000] "GET / HTTP/1.1" 99999 10 "-" "ua""#;
        assert!(matches!(
            parser().parse_record(1, line),
            Err(AnalyzerError::Parse { .. })
        ));
    }

    #[test]
    fn oversized_line_is_skipped() {
        let parser = parser().with_max_line_len(32);
        assert!(parser.parse_record(1, COMBINED).unwrap().is_none());
    }

    #[test]
    fn parse_str_counts_skipped_lines() {
        let text = format!("{COMBINED}\ngarbage line\n\n{COMMON}\r\nanother bad one\n");
        let outcome = parser().parse_str(&text).unwrap();
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.skipped, 2);
    }

    #[test]
    fn parse_str_all_malformed_yields_empty_outcome() {
        let outcome = parser().parse_str("foo\nbar\n").unwrap();
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.skipped, 2);
    }

    #[test]
    fn parse_str_blank_input_is_error() {
        assert!(matches!(
            parser().parse_str(""),
            Err(AnalyzerError::EmptyInput)
        ));
        assert!(matches!(
            parser().parse_str("\n  \n\t\n"),
            Err(AnalyzerError::EmptyInput)
        ));
    }

    #[test]
    fn fatal_error_reports_physical_line_number() {
        let bad = r#"1.2.3.4 - - [32/Jan/2024:00:00:00 +0000] "GET / HTTP/1.1" 200 10 "-" "ua""#;
        let text = format!("{COMBINED}\n\n{bad}\n");
        match parser().parse_str(&text) {
            Err(AnalyzerError::Parse { line, .. }) => assert_eq!(line, 3),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn log_parser_trait_maps_errors() {
        let p = parser();
        let dyn_parser: &dyn LogParser = &p;
        assert_eq!(dyn_parser.format_name(), "combined");
        let line = r#"1.2.3.4 - - [99/Foo/2024:00:00:00 +0000] "GET / HTTP/1.1" 200 10"#;
        let err = dyn_parser.parse_line(1, line).unwrap_err();
        assert!(matches!(
            err,
            LogscopeError::Parse(ParseError::Failed { line: 1, .. })
        ));
    }

    #[tokio::test]
    async fn parse_file_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("access.log");
        tokio::fs::write(&path, format!("{COMBINED}\n{COMMON}\n"))
            .await
            .unwrap();

        let outcome = parser().parse_file(&path).await.unwrap();
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.skipped, 0);
    }

    #[tokio::test]
    async fn parse_file_missing_is_io_error() {
        let result = parser().parse_file("/nonexistent/access.log").await;
        assert!(matches!(result, Err(AnalyzerError::Io(_))));
    }

    // Property-based tests using proptest
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        const METHODS: &[&str] = &["GET", "POST", "PUT", "DELETE", "HEAD", "PATCH"];

        proptest! {
            #[test]
            fn well_formed_line_roundtrips_key_fields(
                a in 0u8..=255, b in 0u8..=255, c in 0u8..=255, d in 0u8..=255,
                method_idx in 0usize..6,
                path in "/[a-zA-Z0-9_./-]{0,40}",
                status in 100u16..=599,
                size in any::<u64>(),
            ) {
                let ip = format!("{a}.{b}.{c}.{d}");
                let method = METHODS[method_idx];
                let line = format!(
                    r#"{ip} - - [15/Jan/2024:12:00:00 +0000] "{method} {path} HTTP/1.1" {status} {size} "-" "proptest""#
                );
                let record = parser().parse_record(1, &line).unwrap().unwrap();
                prop_assert_eq!(record.ip, ip);
                prop_assert_eq!(record.method, method);
                prop_assert_eq!(record.status_code, status);
                prop_assert_eq!(record.size, size);
            }

            #[test]
            fn arbitrary_text_does_not_panic(line in "\\PC{0,300}") {
                let _ = parser().parse_record(1, &line);
            }

            #[test]
            fn lines_without_brackets_never_produce_records(line in "[^\\[\\]\n]{0,200}") {
                let outcome = parser().parse_lines([line.as_str()]);
                if let Ok(outcome) = outcome {
                    prop_assert!(outcome.records.is_empty());
                }
            }
        }
    }
}
