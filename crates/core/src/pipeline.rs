//! 분석 trait — 모듈 확장 포인트 정의

use crate::error::LogscopeError;
use crate::types::{Column, FlagReason, FlaggedIp, LogRecord};

/// 로그 파서 trait
///
/// 새로운 접근 로그 형식을 지원하려면 이 trait을 구현합니다.
pub trait LogParser: Send + Sync {
    /// 지원하는 로그 형식 이름
    fn format_name(&self) -> &str;

    /// 한 줄을 파싱합니다.
    ///
    /// 문법에 맞지 않는 라인은 `Ok(None)`을 반환합니다 (건너뛸 대상).
    /// 문법에는 맞지만 필드를 해석할 수 없으면 에러를 반환합니다.
    fn parse_line(&self, line_no: usize, line: &str) -> Result<Option<LogRecord>, LogscopeError>;
}

/// IP 단위 탐지기 trait
///
/// 레코드 집합 전체를 읽고 의심스러운 IP 목록을 반환합니다.
/// 매칭이 없으면 빈 목록을 반환하며, 에러가 아닙니다.
pub trait IpDetector: Send + Sync {
    /// 탐지기 이름
    fn name(&self) -> &str;

    /// 플래그 사유
    fn reason(&self) -> FlagReason;

    /// 탐지에 필요한 컬럼
    fn required_columns(&self) -> &[Column];

    /// 레코드 집합을 분석합니다.
    fn detect(&self, records: &[LogRecord]) -> Result<Vec<FlaggedIp>, LogscopeError>;
}
