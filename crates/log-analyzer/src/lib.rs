//! Logscope 접근 로그 분석 엔진
//!
//! Apache/Nginx "combined" 형식 접근 로그를 레코드로 파싱하고, 트래픽 집계와
//! IP 단위 위협 탐지, 도메인 평판 조회, 분석가용 요약을 제공합니다.
//!
//! # 모듈 구성
//!
//! - [`parser`]: combined 형식 라인 파서
//! - [`store`]: 컬럼 정보를 가진 레코드 집합, JSON Lines 입출력
//! - [`aggregate`]: 상위 페이지/Referer 도메인, 트래픽 분류, 활동 타임라인
//! - [`detect`]: 경로 탐색, 속도 제한 남용, 폭주 활동, 데이터 유출 탐지
//! - [`reputation`]: 속도 제한이 적용된 도메인 평판 조회
//! - [`summary`]: 탐지 결과를 발견 사항 문장으로 변환
//! - [`analyzer`]: 전체 분석 오케스트레이션
//! - [`config`]: 분석 설정 (core 설정 확장)
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! access.log -> CombinedLogParser -> RecordStore -> Aggregators
//!                                        |       -> Detectors -> SummaryCorrelator
//!                                        |
//!                                 referer domains -> ReputationEnricher -> RateLimiter
//! ```

pub mod aggregate;
pub mod analyzer;
pub mod config;
pub mod detect;
pub mod error;
pub mod parser;
pub mod reputation;
pub mod store;
pub mod summary;

// --- 주요 타입 re-export ---

// 오케스트레이션
pub use analyzer::{AnalysisReport, Analyzer, AnalyzerBuilder};

// 설정
pub use config::{
    AnalyzerConfig, AnalyzerConfigBuilder, BurstParams, ExfiltrationParams, ReputationParams,
    SummaryParams,
};

// 에러
pub use error::AnalyzerError;

// 파서
pub use parser::{CombinedLogParser, ParseOutcome};

// 레코드 집합
pub use store::{JsonRow, RecordStore};

// 탐지기
pub use detect::{BurstDetector, StatusThresholdDetector};

// 평판 조회
pub use reputation::{
    EnrichmentReport, LimiterRegistry, RateLimiter, ReputationClient, ReputationEnricher,
    VirusTotalClient,
};

// 요약
pub use summary::SummaryCorrelator;
