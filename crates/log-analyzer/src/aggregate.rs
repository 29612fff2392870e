//! 집계 -- 요청 페이지, Referer 도메인, 트래픽 분류, 활동 타임라인
//!
//! 모든 집계 함수는 순수 함수이며 같은 입력에 대해 항상 같은 결과를 반환합니다.
//! 빈도 순 정렬은 안정 정렬이므로 같은 빈도는 입력에서 처음 나타난 순서를 유지합니다.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use chrono::{DateTime, FixedOffset, TimeZone};

use logscope_core::types::{
    Column, DomainCount, PageCount, TimelineBucket, TrafficClass, TrafficCount,
};

use crate::error::AnalyzerError;
use crate::store::RecordStore;

/// 값별 출현 횟수를 빈도 내림차순으로 반환합니다. 같은 빈도는 처음 나타난 순서를 유지합니다.
pub(crate) fn count_stable<K, I>(items: I) -> Vec<(K, usize)>
where
    K: Eq + Hash + Clone,
    I: IntoIterator<Item = K>,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut counts: Vec<(K, usize)> = Vec::new();

    for item in items {
        match index.get(&item) {
            Some(&slot) => counts[slot].1 += 1,
            None => {
                index.insert(item.clone(), counts.len());
                counts.push((item, 1));
            }
        }
    }

    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

/// URL에서 네트워크 위치(호스트[:포트]) 부분을 추출합니다.
///
/// `scheme://netloc/path?query#fragment` 형태에서 `netloc`만 반환합니다.
/// 스킴이 없거나 `//`가 뒤따르지 않으면 `None`입니다.
pub fn extract_netloc(url: &str) -> Option<&str> {
    let (scheme, rest) = url.split_once(':')?;
    let valid_scheme = scheme
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if !valid_scheme {
        return None;
    }

    let rest = rest.strip_prefix("//")?;
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let netloc = &rest[..end];
    if netloc.is_empty() { None } else { Some(netloc) }
}

/// 가장 많이 요청된 경로 상위 `top_n`개
pub fn top_requested_pages(
    store: &RecordStore,
    top_n: usize,
) -> Result<Vec<PageCount>, AnalyzerError> {
    store.require("top_requested_pages", &[Column::RequestPath])?;

    Ok(count_stable(store.iter().map(|r| r.request_path.as_str()))
        .into_iter()
        .take(top_n)
        .map(|(page, count)| PageCount {
            page: page.to_owned(),
            count,
        })
        .collect())
}

/// 가장 많이 나타난 외부 Referer 도메인 상위 `top_n`개
///
/// `http`로 시작하는 Referer만 대상으로 하며, 도메인을 추출할 수 없는 값은 버립니다.
pub fn top_referer_domains(
    store: &RecordStore,
    top_n: usize,
) -> Result<Vec<DomainCount>, AnalyzerError> {
    store.require("top_referer_domains", &[Column::Referrer])?;

    let domains = store
        .iter()
        .filter_map(|r| r.referrer.as_deref())
        .filter(|referrer| referrer.starts_with("http"))
        .filter_map(extract_netloc);

    Ok(count_stable(domains)
        .into_iter()
        .take(top_n)
        .map(|(domain, count)| DomainCount {
            domain: domain.to_owned(),
            count,
        })
        .collect())
}

/// 상태 코드를 트래픽 분류로 매핑합니다.
pub fn classify_traffic(status_code: u16) -> TrafficClass {
    match status_code {
        200 | 302 => TrafficClass::Allowed,
        401 | 403 => TrafficClass::Blocked,
        500 | 502 | 503 | 504 => TrafficClass::ServerError,
        _ => TrafficClass::Other,
    }
}

/// 트래픽 분류별 요청 수 (빈도 내림차순)
pub fn traffic_summary(store: &RecordStore) -> Result<Vec<TrafficCount>, AnalyzerError> {
    store.require("traffic_summary", &[Column::StatusCode])?;

    Ok(
        count_stable(store.iter().map(|r| classify_traffic(r.status_code)))
            .into_iter()
            .map(|(class, count)| TrafficCount { class, count })
            .collect(),
    )
}

/// 고정 폭 시간 버킷별 요청 수 (버킷 시작 시각 오름차순)
///
/// 버킷은 각 레코드의 타임존 오프셋 기준으로 epoch에 정렬됩니다.
pub fn activity_timeline(
    store: &RecordStore,
    bucket_secs: u64,
) -> Result<Vec<TimelineBucket>, AnalyzerError> {
    store.require("activity_timeline", &[Column::Timestamp])?;

    if bucket_secs == 0 {
        return Err(AnalyzerError::Config {
            field: "timeline_bucket_secs".to_owned(),
            reason: "must be greater than 0".to_owned(),
        });
    }
    let width = i64::try_from(bucket_secs).unwrap_or(i64::MAX);

    let mut buckets: BTreeMap<i64, (DateTime<FixedOffset>, usize)> = BTreeMap::new();
    for record in store {
        let offset = *record.timestamp.offset();
        let local_secs = record.timestamp.timestamp() + i64::from(offset.local_minus_utc());
        let start_utc = local_secs - local_secs.rem_euclid(width) - i64::from(offset.local_minus_utc());

        let Some(start) = offset.timestamp_opt(start_utc, 0).single() else {
            continue;
        };
        buckets.entry(start_utc).or_insert((start, 0)).1 += 1;
    }

    Ok(buckets
        .into_values()
        .map(|(start, count)| TimelineBucket { start, count })
        .collect())
}
