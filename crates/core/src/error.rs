//! 에러 타입 — 도메인별 에러 정의
//!
//! 에러 분류는 호출자(HTTP 레이어 등)가 응답 코드를 결정할 수 있도록
//! [`ErrorClass`]로 노출됩니다.
//!
//! - 스키마 위반: 호출자가 잘못된 형태의 레코드 집합을 전달함 -> [`ErrorClass::Client`]
//! - 그 외 (I/O, 치명적 파싱 실패, 설정 오류 등) -> [`ErrorClass::Server`]

use serde::Serialize;

/// 에러 분류
///
/// 외부 서비스 레이어가 4xx / 5xx 응답을 고를 때 사용합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// 호출자 계약 위반 (4xx 상당)
    Client,
    /// 내부 처리 실패 (5xx 상당)
    Server,
}

/// Logscope 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum LogscopeError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 로그 파싱 에러
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// 분석(집계/탐지) 에러
    #[error("analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl LogscopeError {
    /// 에러 분류를 반환합니다.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Analysis(AnalysisError::SchemaViolation { .. }) => ErrorClass::Client,
            _ => ErrorClass::Server,
        }
    }
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 파싱 에러
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// 로그 라인이 하나도 없음
    #[error("no log lines in input")]
    EmptyInput,

    /// 문법에는 맞지만 필드 값을 해석할 수 없음 (타임스탬프 등)
    #[error("parse failed at line {line}: {reason}")]
    Failed { line: usize, reason: String },
}

/// 분석 에러
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// 필수 컬럼이 레코드 집합에 없음
    #[error("'{operation}' requires missing column(s): {missing}")]
    SchemaViolation { operation: String, missing: String },

    /// 그 외 내부 처리 실패 (태스크 join, 직렬화 등)
    #[error("internal error: {0}")]
    Internal(String),
}
