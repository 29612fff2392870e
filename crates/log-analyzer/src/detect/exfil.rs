//! 데이터 유출 탐지
//!
//! 다음 조건을 모두 만족하는 개별 레코드를 반환합니다.
//! - 메서드가 `POST` 또는 `PUT`
//! - 응답 크기가 `size_threshold` 초과
//! - 목적지 도메인이 허용 목록에 없음
//!
//! 목적지 도메인은 `request_path` 컬럼이 있으면 그 값에서, 없으면 `referrer`에서
//! 추출한 네트워크 위치(소문자)이며, 둘 다 없으면 빈 문자열입니다.
//! 허용 목록이 비어 있으면 조건을 만족하는 모든 레코드가 플래그됩니다.

use tracing::debug;

use logscope_core::config::DomainMatch;
use logscope_core::metrics as m;
use logscope_core::types::{Column, ExfiltrationEvent, LogRecord};

use crate::aggregate::extract_netloc;
use crate::config::ExfiltrationParams;
use crate::error::AnalyzerError;
use crate::store::RecordStore;

const WRITE_METHODS: &[&str] = &["POST", "PUT"];

/// 레코드의 목적지 도메인을 계산합니다.
pub fn destination_domain(store: &RecordStore, record: &LogRecord) -> String {
    let source = if store.has_column(Column::RequestPath) {
        Some(record.request_path.as_str())
    } else if store.has_column(Column::Referrer) {
        record.referrer.as_deref()
    } else {
        None
    };

    source
        .and_then(extract_netloc)
        .map(str::to_lowercase)
        .unwrap_or_default()
}

/// 목적지 도메인이 허용 목록에 있는지 확인합니다.
///
/// - [`DomainMatch::Substring`]: 항목이 도메인의 부분 문자열이면 허용
///   (`a.com` 항목은 `data.company.net`도 허용함)
/// - [`DomainMatch::Suffix`]: 포트를 뗀 호스트가 항목과 같거나 `.{항목}`으로 끝나면 허용
pub fn is_known_domain(domain: &str, known_domains: &[String], mode: DomainMatch) -> bool {
    match mode {
        DomainMatch::Substring => known_domains.iter().any(|known| domain.contains(known.as_str())),
        DomainMatch::Suffix => {
            let host = strip_port(domain);
            known_domains.iter().any(|known| {
                let known = known.to_lowercase();
                host == known
                    || host
                        .strip_suffix(known.as_str())
                        .is_some_and(|prefix| prefix.ends_with('.'))
            })
        }
    }
}

fn strip_port(netloc: &str) -> &str {
    let host = netloc.rsplit_once('@').map_or(netloc, |(_, host)| host);
    match host.rsplit_once(':') {
        Some((name, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => name,
        _ => host,
    }
}

/// 알 수 없는 목적지로의 대용량 쓰기 요청을 찾습니다.
///
/// 결과는 입력 순서를 유지합니다.
pub fn detect_exfiltration(
    store: &RecordStore,
    params: &ExfiltrationParams,
) -> Result<Vec<ExfiltrationEvent>, AnalyzerError> {
    store.require(
        "data_exfiltration",
        &[Column::Ip, Column::Timestamp, Column::Method, Column::Size],
    )?;

    let events: Vec<ExfiltrationEvent> = store
        .iter()
        .filter(|r| WRITE_METHODS.contains(&r.method.to_uppercase().as_str()))
        .filter(|r| r.size > params.size_threshold)
        .filter_map(|r| {
            let domain = destination_domain(store, r);
            if is_known_domain(&domain, &params.known_domains, params.domain_match) {
                return None;
            }
            Some(ExfiltrationEvent {
                ip: r.ip.clone(),
                timestamp: r.timestamp,
                method: r.method.clone(),
                request_path: r.request_path.clone(),
                size: r.size,
                destination_domain: domain,
            })
        })
        .collect();

    debug!(
        records = store.len(),
        flagged = events.len(),
        known_domains = params.known_domains.len(),
        "exfiltration detector finished"
    );
    metrics::counter!(m::DETECTOR_FLAGS_TOTAL, m::LABEL_DETECTOR => "data_exfiltration")
        .increment(events.len() as u64);

    Ok(events)
}
