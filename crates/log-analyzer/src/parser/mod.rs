//! 로그 파싱 모듈 -- 원시 접근 로그 라인을 [`LogRecord`]로 변환합니다.
//!
//! 각 파서는 core의 [`LogParser`](logscope_core::pipeline::LogParser) trait을 구현합니다.
//!
//! # 지원 형식
//! - Apache Combined / Common Log Format ([`CombinedLogParser`])
//!
//! # 에러 정책
//! - 문법에 맞지 않는 라인: 건너뛰고 [`ParseOutcome::skipped`]에 집계
//! - 타임스탬프 등 필드 해석 실패: 배치 전체 실패
//! - 로그 라인이 하나도 없음: [`AnalyzerError::EmptyInput`](crate::error::AnalyzerError::EmptyInput)

pub mod combined;

pub use combined::CombinedLogParser;

use logscope_core::types::LogRecord;

/// 배치 파싱 결과
#[derive(Debug, Clone, Default)]
pub struct ParseOutcome {
    /// 파싱된 레코드 (입력 순서)
    pub records: Vec<LogRecord>,
    /// 문법 불일치로 건너뛴 라인 수
    pub skipped: usize,
}

impl ParseOutcome {
    /// 로그 라인 수 (파싱 성공 + 건너뜀)
    pub fn total_lines(&self) -> usize {
        self.records.len() + self.skipped
    }
}
