//! 트래픽 통계 집계
//!
//! 매칭된 레코드를 받아 전체 요청 수, 상태 코드 히스토그램, 경로
//! 히스토그램을 인메모리로 유지합니다. 상태는 프로세스 생명주기 동안만
//! 유지되며 재시작 시 초기화됩니다 (영속화 없음).
//!
//! # 단일 작성자 모델
//!
//! 집계기의 변경자는 테일 루프 하나뿐입니다. [`SharedStats`]는 데몬의
//! 헬스/노출 레이어가 동시에 스냅샷을 읽을 수 있도록 `RwLock`으로
//! 감싸며, 스냅샷은 세 카운터에 대해 all-or-nothing으로 일관됩니다.
//!
//! 경로 히스토그램에는 상한이 없습니다 — 경로 카디널리티가 높은
//! 트래픽에서는 메모리가 증가합니다.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tailstat_core::types::{AccessRecord, StatsSnapshot};

/// 통계 집계기
///
/// 레코드 하나당 세 카운터가 각각 정확히 1씩 증가합니다.
///
/// 불변식: `status_codes` 값의 합 == `path_counts` 값의 합 == `total_requests`
#[derive(Debug, Default)]
pub struct StatsAggregator {
    /// 매칭된 전체 요청 수 (단조 증가)
    total_requests: u64,
    /// 상태 코드별 요청 수
    status_codes: HashMap<String, u64>,
    /// 경로별 요청 수 (상한 없음)
    path_counts: HashMap<String, u64>,
}

impl StatsAggregator {
    /// 빈 집계기를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 레코드 하나를 집계합니다.
    pub fn record(&mut self, record: &AccessRecord) {
        self.total_requests += 1;
        *self
            .status_codes
            .entry(record.status.clone())
            .or_insert(0) += 1;
        *self.path_counts.entry(record.path.clone()).or_insert(0) += 1;
    }

    /// 매칭된 전체 요청 수를 반환합니다.
    pub fn total_requests(&self) -> u64 {
        self.total_requests
    }

    /// 특정 시점의 일관된 스냅샷을 반환합니다.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_requests: self.total_requests,
            status_codes: self.status_codes.clone(),
            path_counts: self.path_counts.clone(),
        }
    }

    /// 모든 카운터를 초기화합니다 (테스트/재사용 훅).
    pub fn reset(&mut self) {
        self.total_requests = 0;
        self.status_codes.clear();
        self.path_counts.clear();
    }
}

/// 공유 통계 핸들
///
/// 테일 루프(유일한 작성자)와 스냅샷 소비자가 공유하는 집계기
/// 핸들입니다. 전역 상태 대신 빌더를 통해 주입됩니다.
#[derive(Debug, Clone, Default)]
pub struct SharedStats {
    inner: Arc<RwLock<StatsAggregator>>,
}

impl SharedStats {
    /// 빈 집계기를 감싸는 새 핸들을 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 레코드 하나를 집계합니다.
    pub fn record(&self, record: &AccessRecord) {
        let mut guard = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.record(record);
    }

    /// 특정 시점의 일관된 스냅샷을 반환합니다.
    ///
    /// 작성자와 잠금을 공유하므로 부분 업데이트가 보이지 않습니다.
    pub fn snapshot(&self) -> StatsSnapshot {
        let guard = self
            .inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.snapshot()
    }

    /// 매칭된 전체 요청 수를 반환합니다.
    pub fn total_requests(&self) -> u64 {
        let guard = self
            .inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.total_requests()
    }

    /// 모든 카운터를 초기화합니다 (테스트/재사용 훅).
    pub fn reset(&self) {
        let mut guard = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(status: &str, path: &str) -> AccessRecord {
        AccessRecord {
            client_addr: "10.0.0.1".to_owned(),
            method: "GET".to_owned(),
            path: path.to_owned(),
            status: status.to_owned(),
        }
    }

    fn histogram_sum(histogram: &HashMap<String, u64>) -> u64 {
        histogram.values().sum()
    }

    #[test]
    fn new_aggregator_is_empty() {
        let aggregator = StatsAggregator::new();
        assert_eq!(aggregator.total_requests(), 0);
        assert!(aggregator.snapshot().is_empty());
    }

    #[test]
    fn record_increments_all_three_counters() {
        let mut aggregator = StatsAggregator::new();
        aggregator.record(&record("200", "/home"));

        let snapshot = aggregator.snapshot();
        assert_eq!(snapshot.total_requests, 1);
        assert_eq!(snapshot.status_codes.get("200"), Some(&1));
        assert_eq!(snapshot.path_counts.get("/home"), Some(&1));
    }

    #[test]
    fn keys_appear_on_first_occurrence() {
        let mut aggregator = StatsAggregator::new();
        aggregator.record(&record("200", "/home"));
        aggregator.record(&record("404", "/missing"));
        aggregator.record(&record("200", "/home"));

        let snapshot = aggregator.snapshot();
        assert_eq!(snapshot.status_codes.len(), 2);
        assert_eq!(snapshot.status_codes.get("200"), Some(&2));
        assert_eq!(snapshot.status_codes.get("404"), Some(&1));
        assert_eq!(snapshot.path_counts.get("/home"), Some(&2));
        assert_eq!(snapshot.path_counts.get("/missing"), Some(&1));
    }

    #[test]
    fn histograms_always_sum_to_total() {
        let mut aggregator = StatsAggregator::new();
        let records = [
            record("200", "/a"),
            record("200", "/b"),
            record("301", "/a"),
            record("404", "/c"),
            record("500", "/a"),
        ];
        for r in &records {
            aggregator.record(r);
        }

        let snapshot = aggregator.snapshot();
        assert_eq!(snapshot.total_requests, records.len() as u64);
        assert_eq!(histogram_sum(&snapshot.status_codes), snapshot.total_requests);
        assert_eq!(histogram_sum(&snapshot.path_counts), snapshot.total_requests);
    }

    #[test]
    fn snapshot_is_idempotent_without_records() {
        let mut aggregator = StatsAggregator::new();
        aggregator.record(&record("200", "/home"));

        let first = aggregator.snapshot();
        let second = aggregator.snapshot();
        assert_eq!(first, second);
    }

    #[test]
    fn snapshot_is_detached_copy() {
        let mut aggregator = StatsAggregator::new();
        aggregator.record(&record("200", "/home"));
        let snapshot = aggregator.snapshot();

        aggregator.record(&record("404", "/other"));
        // 이전 스냅샷은 이후 변경의 영향을 받지 않음
        assert_eq!(snapshot.total_requests, 1);
        assert!(!snapshot.status_codes.contains_key("404"));
    }

    #[test]
    fn reset_clears_all_counters() {
        let mut aggregator = StatsAggregator::new();
        aggregator.record(&record("200", "/home"));
        aggregator.reset();

        assert_eq!(aggregator.total_requests(), 0);
        assert!(aggregator.snapshot().is_empty());
    }

    #[test]
    fn shared_stats_clone_views_same_aggregator() {
        let stats = SharedStats::new();
        let view = stats.clone();

        stats.record(&record("200", "/home"));
        assert_eq!(view.total_requests(), 1);
        assert_eq!(view.snapshot().status_codes.get("200"), Some(&1));
    }

    #[test]
    fn shared_stats_concurrent_snapshot_is_consistent() {
        let stats = SharedStats::new();
        let writer = stats.clone();

        let handle = std::thread::spawn(move || {
            for i in 0..1000 {
                let status = if i % 2 == 0 { "200" } else { "404" };
                writer.record(&record(status, "/load"));
            }
        });

        // 작성 중에도 스냅샷의 세 카운터는 항상 서로 일치해야 함
        for _ in 0..100 {
            let snapshot = stats.snapshot();
            assert_eq!(
                histogram_sum(&snapshot.status_codes),
                snapshot.total_requests
            );
            assert_eq!(histogram_sum(&snapshot.path_counts), snapshot.total_requests);
        }

        handle.join().expect("writer thread panicked");
        assert_eq!(stats.total_requests(), 1000);
    }
}
