//! 로그 분석 에러 타입
//!
//! [`AnalyzerError`]는 분석 엔진 내부에서 발생하는 모든 에러를 표현합니다.
//! `From<AnalyzerError> for LogscopeError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.
//!
//! 잘못된 라인(문법 불일치)은 에러가 아니라 건너뛰는 대상이며,
//! 외부 평판 조회 실패는 도메인별 [`ReputationVerdict::Failed`]로 기록됩니다.
//!
//! [`ReputationVerdict::Failed`]: logscope_core::types::ReputationVerdict::Failed

use logscope_core::error::{
    AnalysisError, ConfigError, ErrorClass, LogscopeError, ParseError,
};
use logscope_core::types::Column;

/// 분석 엔진 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    /// 문법에는 맞지만 필드를 해석할 수 없는 라인 (배치 전체 실패)
    #[error("parse error at line {line}: {reason}")]
    Parse {
        /// 1부터 시작하는 라인 번호
        line: usize,
        /// 실패 사유
        reason: String,
    },

    /// 로그 라인이 하나도 없음
    #[error("input contains no log lines")]
    EmptyInput,

    /// 필수 컬럼이 레코드 집합에 없음
    #[error("schema violation: '{operation}' requires column(s) {}", join_columns(.missing))]
    Schema {
        /// 요청된 연산 이름
        operation: String,
        /// 누락된 컬럼
        missing: Vec<Column>,
    },

    /// 외부에서 가져온 레코드의 값 형식이 잘못됨
    #[error("invalid value in row {row}, column '{column}': {reason}")]
    InvalidValue {
        /// 0부터 시작하는 행 번호
        row: usize,
        /// 문제가 된 컬럼
        column: Column,
        /// 사유
        reason: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 평판 조회 클라이언트 초기화 실패
    #[error("reputation client error: {0}")]
    ReputationClient(String),

    /// 백그라운드 탐지 태스크 실패
    #[error("task error: {0}")]
    Task(String),

    /// core 에러 (trait 경계에서 전달됨)
    #[error(transparent)]
    Core(#[from] LogscopeError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON 직렬화 에러
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// 정규식 컴파일 에러
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl AnalyzerError {
    /// 에러 분류를 반환합니다.
    ///
    /// 호출자가 잘못된 형태의 레코드 집합을 넘긴 경우만 클라이언트 에러입니다.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Schema { .. } | Self::InvalidValue { .. } => ErrorClass::Client,
            Self::Core(inner) => inner.class(),
            _ => ErrorClass::Server,
        }
    }
}

fn join_columns(columns: &[Column]) -> String {
    columns
        .iter()
        .map(|c| c.name())
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<AnalyzerError> for LogscopeError {
    fn from(err: AnalyzerError) -> Self {
        match err {
            AnalyzerError::Parse { line, reason } => {
                LogscopeError::Parse(ParseError::Failed { line, reason })
            }
            AnalyzerError::EmptyInput => LogscopeError::Parse(ParseError::EmptyInput),
            AnalyzerError::Schema { operation, missing } => {
                LogscopeError::Analysis(AnalysisError::SchemaViolation {
                    operation,
                    missing: join_columns(&missing),
                })
            }
            err @ AnalyzerError::InvalidValue { .. } => {
                LogscopeError::Analysis(AnalysisError::SchemaViolation {
                    operation: "import".to_owned(),
                    missing: err.to_string(),
                })
            }
            AnalyzerError::Config { field, reason } => {
                LogscopeError::Config(ConfigError::InvalidValue { field, reason })
            }
            AnalyzerError::Core(inner) => inner,
            AnalyzerError::Io(e) => LogscopeError::Io(e),
            other => LogscopeError::Analysis(AnalysisError::Internal(other.to_string())),
        }
    }
}
