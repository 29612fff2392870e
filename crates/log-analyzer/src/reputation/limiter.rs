//! 호출 간격 제한기
//!
//! [`RateLimiter`]는 크기 1의 토큰 버킷입니다. 같은 제한기를 공유하는 모든 호출자는
//! 내부 뮤텍스를 통해 직렬화되며, 두 출발 시각 사이의 간격은 항상 `interval` 이상입니다.
//!
//! 같은 API 키를 쓰는 조회는 하나의 제한기를 공유해야 합니다. [`LimiterRegistry`]는
//! 자격 증명마다 제한기를 하나씩 보관하며, [`LimiterRegistry::global`]은 프로세스 전역
//! 레지스트리입니다. 분석기를 몇 개 만들든 같은 키의 호출은 같은 제한기를 거칩니다.
//!
//! 시간은 `tokio::time`을 사용하므로 테스트에서 멈춘 시계(`start_paused`)로
//! 대기 없이 검증할 수 있습니다.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

static GLOBAL_REGISTRY: LazyLock<LimiterRegistry> = LazyLock::new(LimiterRegistry::new);

/// 최소 호출 간격을 강제하는 단일 슬롯 제한기
#[derive(Debug)]
pub struct RateLimiter {
    /// 최소 간격 (나노초). 늘어날 수만 있습니다.
    interval_nanos: AtomicU64,
    /// 마지막 출발 시각
    last_departure: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// 새 제한기를 생성합니다. 첫 호출은 즉시 출발합니다.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval_nanos: AtomicU64::new(duration_nanos(interval)),
            last_departure: Mutex::new(None),
        }
    }

    /// 최소 호출 간격
    pub fn interval(&self) -> Duration {
        Duration::from_nanos(self.interval_nanos.load(Ordering::Acquire))
    }

    /// 간격을 `interval` 이상으로 늘립니다. 더 짧은 값은 무시합니다.
    pub fn widen(&self, interval: Duration) {
        self.interval_nanos
            .fetch_max(duration_nanos(interval), Ordering::AcqRel);
    }

    /// 다음 출발 슬롯을 기다립니다.
    ///
    /// 슬롯을 얻으면 대기한 시간을 반환합니다. 대기 중(뮤텍스 대기 포함) 취소되면
    /// 슬롯을 소비하지 않고 `None`을 반환합니다.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Option<Duration> {
        let started = Instant::now();

        let mut last = tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            guard = self.last_departure.lock() => guard,
        };

        if let Some(prev) = *last {
            let ready_at = prev + self.interval();
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return None,
                _ = tokio::time::sleep_until(ready_at) => {}
            }
        }

        let now = Instant::now();
        *last = Some(now);
        Some(now.duration_since(started))
    }
}

fn duration_nanos(interval: Duration) -> u64 {
    u64::try_from(interval.as_nanos()).unwrap_or(u64::MAX)
}

/// 자격 증명별 제한기 레지스트리
///
/// 같은 키로 요청하면 항상 같은 제한기를 돌려줍니다. 요청한 간격이 기존 제한기보다
/// 길면 제한기의 간격을 늘리므로, 모든 호출자의 최소 간격이 함께 지켜집니다.
#[derive(Debug, Default)]
pub struct LimiterRegistry {
    limiters: std::sync::Mutex<HashMap<String, Arc<RateLimiter>>>,
}

impl LimiterRegistry {
    /// 빈 레지스트리를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 프로세스 전역 레지스트리
    pub fn global() -> &'static LimiterRegistry {
        &GLOBAL_REGISTRY
    }

    /// `credential`의 제한기를 반환합니다. 없으면 `interval` 간격으로 새로 만듭니다.
    pub fn limiter_for(&self, credential: &str, interval: Duration) -> Arc<RateLimiter> {
        let mut limiters = self
            .limiters
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let limiter = limiters
            .entry(credential.to_owned())
            .or_insert_with(|| {
                debug!(interval_secs = interval.as_secs_f64(), "registering rate limiter");
                Arc::new(RateLimiter::new(interval))
            });
        limiter.widen(interval);
        Arc::clone(limiter)
    }

    /// 등록된 자격 증명 수
    pub fn len(&self) -> usize {
        self.limiters
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// 등록된 제한기가 없는지 여부
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
