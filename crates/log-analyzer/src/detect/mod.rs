//! 위협 탐지 모듈
//!
//! IP 단위 탐지기는 core의 [`IpDetector`] trait을 구현하며, [`run_detector`]가
//! 필요한 컬럼을 확인한 뒤 실행합니다. 데이터 유출 탐지는 IP가 아닌 개별 레코드를
//! 반환하므로 별도 함수([`detect_exfiltration`])로 제공합니다.
//!
//! # 탐지기
//! - [`StatusThresholdDetector`]: 404 경로 탐색, 429 속도 제한 남용
//! - [`BurstDetector`]: 짧은 시간 창 안의 동일 상태 코드 폭주
//! - [`detect_exfiltration`]: 알 수 없는 목적지로의 대용량 쓰기 요청
//!
//! 매칭이 없으면 빈 목록을 반환하며, 에러가 아닙니다.

pub mod burst;
pub mod exfil;
pub mod status;

pub use burst::BurstDetector;
pub use exfil::{destination_domain, detect_exfiltration, is_known_domain};
pub use status::StatusThresholdDetector;

use tracing::debug;

use logscope_core::metrics as m;
use logscope_core::pipeline::IpDetector;
use logscope_core::types::FlaggedIp;

use crate::config::BurstParams;
use crate::error::AnalyzerError;
use crate::store::RecordStore;

/// 필요한 컬럼을 확인하고 탐지기를 실행합니다.
pub fn run_detector(
    detector: &dyn IpDetector,
    store: &RecordStore,
) -> Result<Vec<FlaggedIp>, AnalyzerError> {
    store.require(detector.name(), detector.required_columns())?;

    let flagged = detector.detect(store.records())?;

    debug!(
        detector = detector.name(),
        records = store.len(),
        flagged = flagged.len(),
        "detector finished"
    );
    metrics::counter!(m::DETECTOR_FLAGS_TOTAL, m::LABEL_DETECTOR => detector.name().to_owned())
        .increment(flagged.len() as u64);

    Ok(flagged)
}

/// 404 응답이 `threshold`번 이상인 IP를 찾습니다.
pub fn detect_endpoint_scanning(
    store: &RecordStore,
    threshold: usize,
) -> Result<Vec<FlaggedIp>, AnalyzerError> {
    run_detector(&StatusThresholdDetector::endpoint_scanning(threshold), store)
}

/// 429 응답이 `threshold`번 이상인 IP를 찾습니다.
pub fn detect_rate_limit_abuse(
    store: &RecordStore,
    threshold: usize,
) -> Result<Vec<FlaggedIp>, AnalyzerError> {
    run_detector(&StatusThresholdDetector::rate_limit_abuse(threshold), store)
}

/// 시간 창 안에서 같은 상태 코드가 폭주한 IP를 찾습니다.
pub fn detect_burst_activity(
    store: &RecordStore,
    params: &BurstParams,
) -> Result<Vec<FlaggedIp>, AnalyzerError> {
    run_detector(&BurstDetector::new(params.clone()), store)
}
