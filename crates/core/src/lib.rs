//! Logscope 공통 크레이트
//!
//! 접근 로그 분석 엔진의 모든 크레이트가 공유하는 타입, trait, 에러, 설정,
//! 메트릭 이름을 정의합니다.
//!
//! # 모듈 구성
//!
//! - [`types`]: 레코드, 집계, 탐지, 평판, 요약 결과 타입
//! - [`pipeline`]: 파서/탐지기 확장 trait
//! - [`error`]: 에러 타입과 클라이언트/서버 에러 분류
//! - [`config`]: `logscope.toml` 설정
//! - [`metrics`]: 메트릭 이름 상수

pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod types;

// --- 주요 타입 re-export ---

// 에러
pub use error::{AnalysisError, ConfigError, ErrorClass, LogscopeError, ParseError};

// 설정
pub use config::LogscopeConfig;

// 파이프라인 trait
pub use pipeline::{IpDetector, LogParser};

// 도메인 타입
pub use types::{
    Column, DomainCount, ExfiltrationEvent, Finding, FindingCategory, FlagReason, FlaggedIp,
    LogRecord, PageCount, ReputationVerdict, TimelineBucket, TrafficClass, TrafficCount,
};
