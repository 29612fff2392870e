//! 레코드 저장소 -- 한 번의 분석 실행 동안 메모리에 유지되는 레코드 집합
//!
//! [`RecordStore`]는 레코드와 함께 실제로 보유한 컬럼 집합을 기록합니다.
//! 파서가 만든 저장소는 항상 모든 컬럼을 가지며, 외부 표 형식 데이터에서 가져온
//! 저장소는 일부 컬럼이 빠질 수 있습니다. 집계/탐지 연산은 [`RecordStore::require`]로
//! 필요한 컬럼을 먼저 확인하고, 없으면 스키마 위반 에러를 반환합니다.
//!
//! # 영속화 경계
//! JSON Lines 형식(한 줄에 레코드 하나)으로 쓰고 읽을 수 있습니다.
//! 보유하지 않은 컬럼은 쓰지 않으므로, 다시 읽으면 같은 컬럼 집합이 복원됩니다.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::{DateTime, FixedOffset};
use serde_json::{Map, Value};
use tracing::debug;

use logscope_core::types::{Column, LogRecord};

use crate::error::AnalyzerError;
use crate::parser::ParseOutcome;

/// JSON 행 하나
pub type JsonRow = Map<String, Value>;

/// 한 번의 분석 실행에서 사용하는 레코드 집합
#[derive(Debug, Clone)]
pub struct RecordStore {
    records: Vec<LogRecord>,
    columns: BTreeSet<Column>,
    skipped: usize,
}

impl RecordStore {
    /// 파싱 결과로 저장소를 생성합니다. 모든 컬럼을 보유합니다.
    pub fn from_outcome(outcome: ParseOutcome) -> Self {
        Self {
            records: outcome.records,
            columns: Column::ALL.into_iter().collect(),
            skipped: outcome.skipped,
        }
    }

    /// 레코드 목록으로 저장소를 생성합니다. 모든 컬럼을 보유합니다.
    pub fn from_records(records: Vec<LogRecord>) -> Self {
        Self {
            records,
            columns: Column::ALL.into_iter().collect(),
            skipped: 0,
        }
    }

    /// 외부 표 형식 데이터(JSON 객체 배열)에서 저장소를 생성합니다.
    ///
    /// 컬럼 집합은 모든 행에 공통으로 있는 키의 교집합입니다. 빠진 컬럼의 값은
    /// 채워 두지만 [`has_column`](Self::has_column)이 `false`를 반환하므로
    /// 하류 연산이 읽지 않습니다. 존재하는 컬럼의 값 형식이 잘못되면
    /// [`AnalyzerError::InvalidValue`]를 반환합니다.
    pub fn from_json_rows(rows: &[JsonRow]) -> Result<Self, AnalyzerError> {
        let columns: BTreeSet<Column> = Column::ALL
            .into_iter()
            .filter(|c| !rows.is_empty() && rows.iter().all(|row| row.contains_key(c.name())))
            .collect();

        let records = rows
            .iter()
            .enumerate()
            .map(|(idx, row)| decode_row(idx, row, &columns))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            rows = records.len(),
            columns = columns.len(),
            "imported tabular record set"
        );

        Ok(Self {
            records,
            columns,
            skipped: 0,
        })
    }

    /// JSON 배열 문자열에서 저장소를 생성합니다.
    pub fn from_json_str(text: &str) -> Result<Self, AnalyzerError> {
        let rows: Vec<JsonRow> = serde_json::from_str(text)?;
        Self::from_json_rows(&rows)
    }

    /// 레코드 슬라이스
    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    /// 레코드 반복자
    pub fn iter(&self) -> std::slice::Iter<'_, LogRecord> {
        self.records.iter()
    }

    /// 레코드 수
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// 레코드가 없는지 여부
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 파싱 중 건너뛴 라인 수
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// 보유한 컬럼 집합
    pub fn columns(&self) -> &BTreeSet<Column> {
        &self.columns
    }

    /// 컬럼 보유 여부
    pub fn has_column(&self, column: Column) -> bool {
        self.columns.contains(&column)
    }

    /// 연산에 필요한 컬럼이 모두 있는지 확인합니다.
    pub fn require(&self, operation: &str, required: &[Column]) -> Result<(), AnalyzerError> {
        let missing: Vec<Column> = required
            .iter()
            .copied()
            .filter(|c| !self.has_column(*c))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AnalyzerError::Schema {
                operation: operation.to_owned(),
                missing,
            })
        }
    }

    /// JSON Lines 문자열로 직렬화합니다. 보유한 컬럼만 씁니다.
    pub fn to_json_lines(&self) -> Result<String, AnalyzerError> {
        let mut out = String::new();
        for record in &self.records {
            let mut row = match serde_json::to_value(record)? {
                Value::Object(map) => map,
                _ => JsonRow::new(),
            };
            row.retain(|key, _| {
                Column::ALL
                    .iter()
                    .any(|c| c.name() == key && self.has_column(*c))
            });
            out.push_str(&serde_json::to_string(&row)?);
            out.push('\n');
        }
        Ok(out)
    }

    /// JSON Lines 문자열에서 저장소를 생성합니다. 빈 줄은 무시합니다.
    pub fn from_json_lines(text: &str) -> Result<Self, AnalyzerError> {
        let rows = text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(serde_json::from_str::<JsonRow>)
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_json_rows(&rows)
    }

    /// JSON Lines 파일로 저장합니다.
    pub async fn write_json_lines(&self, path: impl AsRef<Path>) -> Result<(), AnalyzerError> {
        let path = path.as_ref();
        let body = self.to_json_lines()?;
        tokio::fs::write(path, body).await?;
        debug!(path = %path.display(), records = self.len(), "wrote record set");
        Ok(())
    }

    /// JSON Lines 파일에서 저장소를 읽습니다.
    pub async fn read_json_lines(path: impl AsRef<Path>) -> Result<Self, AnalyzerError> {
        let text = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::from_json_lines(&text)
    }
}

impl<'a> IntoIterator for &'a RecordStore {
    type Item = &'a LogRecord;
    type IntoIter = std::slice::Iter<'a, LogRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

fn decode_row(
    row_idx: usize,
    row: &JsonRow,
    columns: &BTreeSet<Column>,
) -> Result<LogRecord, AnalyzerError> {
    let reader = RowReader {
        idx: row_idx,
        row,
        columns,
    };

    let timestamp = match reader.get(Column::Timestamp) {
        None => DateTime::<FixedOffset>::default(),
        Some(Value::String(s)) => parse_timestamp(s).ok_or_else(|| {
            reader.invalid(
                Column::Timestamp,
                "expected RFC 3339 or access-log timestamp",
            )
        })?,
        Some(_) => return Err(reader.invalid(Column::Timestamp, "expected string")),
    };

    let status_code = u16::try_from(reader.integer(Column::StatusCode)?)
        .map_err(|_| reader.invalid(Column::StatusCode, "status code out of range"))?;

    Ok(LogRecord {
        ip: reader.string(Column::Ip)?,
        timestamp,
        method: reader.string(Column::Method)?,
        request_path: reader.string(Column::RequestPath)?,
        http_version: reader.string(Column::HttpVersion)?,
        status_code,
        size: reader.integer(Column::Size)?,
        referrer: reader.optional_string(Column::Referrer)?,
        user_agent: reader.optional_string(Column::UserAgent)?,
    })
}

/// 보유한 컬럼만 읽는 행 디코더. 빠진 컬럼은 빈 값으로 채웁니다.
struct RowReader<'r> {
    idx: usize,
    row: &'r JsonRow,
    columns: &'r BTreeSet<Column>,
}

impl<'r> RowReader<'r> {
    fn get(&self, column: Column) -> Option<&'r Value> {
        if self.columns.contains(&column) {
            self.row.get(column.name())
        } else {
            None
        }
    }

    fn invalid(&self, column: Column, reason: &str) -> AnalyzerError {
        AnalyzerError::InvalidValue {
            row: self.idx,
            column,
            reason: reason.to_owned(),
        }
    }

    fn string(&self, column: Column) -> Result<String, AnalyzerError> {
        match self.get(column) {
            None => Ok(String::new()),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(_) => Err(self.invalid(column, "expected string")),
        }
    }

    fn optional_string(&self, column: Column) -> Result<Option<String>, AnalyzerError> {
        match self.get(column) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(self.invalid(column, "expected string or null")),
        }
    }

    fn integer(&self, column: Column) -> Result<u64, AnalyzerError> {
        let parsed = match self.get(column) {
            None => Some(0),
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
            Some(_) => None,
        };
        parsed.ok_or_else(|| self.invalid(column, "expected non-negative integer"))
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%d/%b/%Y:%H:%M:%S %z"))
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%:z"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(ip: &str, status: u16) -> LogRecord {
        LogRecord {
            ip: ip.to_owned(),
            timestamp: DateTime::parse_from_rfc3339("2024-01-15T12:00:00+00:00").unwrap(),
            method: "GET".to_owned(),
            request_path: "/".to_owned(),
            http_version: "HTTP/1.1".to_owned(),
            status_code: status,
            size: 100,
            referrer: Some("-".to_owned()),
            user_agent: None,
        }
    }

    fn rows(values: Vec<Value>) -> Vec<JsonRow> {
        values
            .into_iter()
            .map(|v| match v {
                Value::Object(map) => map,
                other => panic!("not an object: {other}"),
            })
            .collect()
    }

    #[test]
    fn from_outcome_has_all_columns() {
        let store = RecordStore::from_outcome(ParseOutcome {
            records: vec![record("1.1.1.1", 200)],
            skipped: 4,
        });
        assert_eq!(store.len(), 1);
        assert_eq!(store.skipped(), 4);
        assert_eq!(store.columns().len(), Column::ALL.len());
        store.require("anything", &Column::ALL).unwrap();
    }

    #[test]
    fn require_reports_all_missing_columns() {
        let store = RecordStore::from_json_rows(&rows(vec![json!({"ip": "1.1.1.1"})])).unwrap();
        let err = store
            .require("detect_burst_activity", &[Column::Ip, Column::StatusCode, Column::Timestamp])
            .unwrap_err();
        match err {
            AnalyzerError::Schema { operation, missing } => {
                assert_eq!(operation, "detect_burst_activity");
                assert_eq!(missing, vec![Column::StatusCode, Column::Timestamp]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn from_json_rows_uses_column_intersection() {
        let store = RecordStore::from_json_rows(&rows(vec![
            json!({"ip": "1.1.1.1", "status_code": 404, "referrer": "http://a.example/"}),
            json!({"ip": "2.2.2.2", "status_code": "429"}),
        ]))
        .unwrap();
        assert!(store.has_column(Column::Ip));
        assert!(store.has_column(Column::StatusCode));
        assert!(!store.has_column(Column::Referrer));
        assert_eq!(store.records()[1].status_code, 429);
    }

    #[test]
    fn from_json_rows_rejects_wrong_types() {
        let result = RecordStore::from_json_rows(&rows(vec![json!({"ip": "1.1.1.1", "size": "big"})]));
        assert!(matches!(
            result,
            Err(AnalyzerError::InvalidValue {
                row: 0,
                column: Column::Size,
                ..
            })
        ));

        let result = RecordStore::from_json_rows(&rows(vec![json!({"status_code": 70000})]));
        assert!(matches!(result, Err(AnalyzerError::InvalidValue { .. })));
    }

    #[test]
    fn from_json_rows_accepts_access_log_timestamp() {
        let store = RecordStore::from_json_rows(&rows(vec![
            json!({"timestamp": "10/Oct/2024:13:55:36 -0700"}),
        ]))
        .unwrap();
        assert_eq!(
            store.records()[0].timestamp.offset().local_minus_utc(),
            -7 * 3600
        );
    }

    #[test]
    fn empty_rows_have_no_columns() {
        let store = RecordStore::from_json_rows(&[]).unwrap();
        assert!(store.is_empty());
        assert!(store.columns().is_empty());
    }

    #[test]
    fn json_lines_roundtrip_preserves_records() {
        let store = RecordStore::from_records(vec![record("1.1.1.1", 200), record("2.2.2.2", 404)]);
        let text = store.to_json_lines().unwrap();
        assert_eq!(text.lines().count(), 2);

        let restored = RecordStore::from_json_lines(&text).unwrap();
        assert_eq!(restored.records(), store.records());
        assert_eq!(restored.columns(), store.columns());
    }

    #[test]
    fn json_lines_preserves_partial_column_set() {
        let store = RecordStore::from_json_rows(&rows(vec![
            json!({"ip": "1.1.1.1", "status_code": 404}),
        ]))
        .unwrap();
        let text = store.to_json_lines().unwrap();
        assert!(!text.contains("timestamp"));
        let restored = RecordStore::from_json_lines(&text).unwrap();
        assert_eq!(restored.columns(), store.columns());
    }

    #[tokio::test]
    async fn write_and_read_json_lines_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.jsonl");
        let store = RecordStore::from_records(vec![record("1.1.1.1", 200)]);

        store.write_json_lines(&path).await.unwrap();
        let restored = RecordStore::read_json_lines(&path).await.unwrap();
        assert_eq!(restored.records(), store.records());
    }
}
