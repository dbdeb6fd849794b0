//! 테일 루프 — 폴링/매칭/집계를 구동하는 상태 머신
//!
//! ```text
//! Starting ──open ok──> Polling ──no data──> Idle ──wake──> Polling
//!    ^                     │                   │
//!    │                  io error            io error
//!    └──backoff── Recovering <────────────────┘
//! ```
//!
//! `Stopped`는 취소 토큰에 의해서만 도달하는 종료 상태입니다.
//! 그 외의 모든 에러는 루프 안에 갇히며 프로세스를 종료시키지
//! 않습니다 — 루프는 영원히 실행되도록 설계된 자가 복구
//! 사이드카입니다 (무제한 재시도).
//!
//! 유휴 대기(기본 5초)와 복구 백오프(기본 10초)가 유일한 중단
//! 지점이며, 두 지점 모두 취소 토큰으로 즉시 깨어납니다.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use metrics::counter;
use tokio_util::sync::CancellationToken;

use tailstat_core::metrics as m;
use tailstat_core::pipeline::LineMatcher;

use crate::bootstrap;
use crate::config::AnalyzerConfig;
use crate::cursor::FileCursor;
use crate::stats::SharedStats;

/// 테일 루프 상태
///
/// `Polling`/`Idle`은 열린 커서를 소유하며, 상태 전이와 함께
/// 커서 소유권이 이동합니다.
enum TailState {
    /// 부트스트랩 후 커서 열기 시도
    Starting,
    /// 새 라인을 읽어 처리 중
    Polling(FileCursor),
    /// 따라잡음 — 폴링 간격만큼 대기
    Idle(FileCursor),
    /// I/O 실패 — 백오프 후 Starting으로 복귀
    Recovering,
    /// 명시적 종료 (취소 토큰)
    Stopped,
}

/// 테일 루프
///
/// 커서에서 라인을 당겨 매처에 통과시키고, 매칭된 레코드를 집계기에
/// 반영한 뒤 라인당 관측 이벤트를 동기적으로 내보냅니다.
pub(crate) struct TailLoop {
    config: AnalyzerConfig,
    matcher: Arc<dyn LineMatcher>,
    stats: SharedStats,
    /// 읽어들인 원시 라인 수 (매칭 여부 무관)
    lines_seen: Arc<AtomicU64>,
    /// 매칭 실패 라인 수
    unmatched: Arc<AtomicU64>,
    cancel: CancellationToken,
}

impl TailLoop {
    pub(crate) fn new(
        config: AnalyzerConfig,
        matcher: Arc<dyn LineMatcher>,
        stats: SharedStats,
        lines_seen: Arc<AtomicU64>,
        unmatched: Arc<AtomicU64>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            matcher,
            stats,
            lines_seen,
            unmatched,
            cancel,
        }
    }

    /// 루프를 실행합니다. 취소 토큰이 취소될 때까지 반환하지 않습니다.
    ///
    /// `tokio::spawn`으로 별도 태스크에서 호출하세요.
    pub(crate) async fn run(mut self) {
        let mut state = TailState::Starting;
        loop {
            if self.cancel.is_cancelled() {
                state = TailState::Stopped;
            }
            state = match state {
                TailState::Starting => self.start().await,
                TailState::Polling(cursor) => self.poll(cursor).await,
                TailState::Idle(cursor) => self.idle(cursor).await,
                TailState::Recovering => self.recover().await,
                TailState::Stopped => {
                    tracing::info!("tail loop stopped");
                    return;
                }
            };
        }
    }

    /// 부트스트랩 후 커서를 파일 끝에 엽니다.
    async fn start(&mut self) -> TailState {
        if let Err(e) = bootstrap::ensure_log_file(&self.config.log_path).await {
            tracing::warn!(error = %e, "bootstrap failed, will retry");
            return TailState::Recovering;
        }

        match FileCursor::open_at_end(&self.config.log_path, self.config.max_line_length).await {
            Ok(cursor) => {
                tracing::info!(
                    path = %cursor.path().display(),
                    offset = cursor.offset(),
                    "tailing from end of file"
                );
                TailState::Polling(cursor)
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to open log file, will retry");
                TailState::Recovering
            }
        }
    }

    /// 사용 가능한 라인을 읽어 처리합니다.
    ///
    /// 한 번의 폴링에서 `max_lines_per_poll`개까지만 처리하여 대량
    /// 쓰기가 취소 확인을 지연시키지 않도록 합니다.
    async fn poll(&mut self, mut cursor: FileCursor) -> TailState {
        for _ in 0..self.config.max_lines_per_poll {
            if self.cancel.is_cancelled() {
                return TailState::Stopped;
            }
            match cursor.read_line().await {
                Ok(Some(line)) => self.process_line(&line),
                Ok(None) => return TailState::Idle(cursor),
                Err(e) => {
                    tracing::warn!(error = %e, "read failed");
                    return TailState::Recovering;
                }
            }
        }
        TailState::Polling(cursor)
    }

    /// 라인 하나를 매칭/집계하고 관측 이벤트를 내보냅니다.
    ///
    /// 매칭 실패는 조용히 건너뜁니다 (원시 라인 카운터에만 반영).
    fn process_line(&self, line: &str) {
        self.lines_seen.fetch_add(1, Ordering::Relaxed);
        counter!(m::ANALYZER_LINES_TOTAL).increment(1);

        match self.matcher.match_line(line) {
            Some(record) => {
                self.stats.record(&record);
                counter!(m::ANALYZER_REQUESTS_TOTAL).increment(1);
                counter!(
                    m::ANALYZER_STATUS_REQUESTS_TOTAL,
                    m::LABEL_STATUS => record.status.clone()
                )
                .increment(1);
                tracing::info!(
                    path = %record.path,
                    status = %record.status,
                    method = %record.method,
                    client = %record.client_addr,
                    "request observed"
                );
            }
            None => {
                self.unmatched.fetch_add(1, Ordering::Relaxed);
                counter!(m::ANALYZER_UNMATCHED_LINES_TOTAL).increment(1);
            }
        }
    }

    /// 폴링 간격만큼 대기한 뒤 로테이션을 재확인합니다.
    async fn idle(&mut self, mut cursor: FileCursor) -> TailState {
        tokio::select! {
            _ = self.cancel.cancelled() => return TailState::Stopped,
            _ = tokio::time::sleep(Duration::from_secs(self.config.poll_interval_secs)) => {}
        }

        match cursor.check_rotation().await {
            Ok(true) => {
                counter!(m::ANALYZER_ROTATIONS_TOTAL).increment(1);
                tracing::info!(
                    path = %cursor.path().display(),
                    "log rotation detected, reading from start of new file"
                );
                TailState::Polling(cursor)
            }
            Ok(false) => TailState::Polling(cursor),
            Err(e) => {
                tracing::warn!(error = %e, "rotation check failed");
                TailState::Recovering
            }
        }
    }

    /// 백오프 후 Starting으로 복귀합니다.
    async fn recover(&mut self) -> TailState {
        counter!(m::ANALYZER_RECOVERIES_TOTAL).increment(1);
        tracing::warn!(
            backoff_secs = self.config.recover_backoff_secs,
            "recovering, will reattempt after backoff"
        );
        tokio::select! {
            _ = self.cancel.cancelled() => TailState::Stopped,
            _ = tokio::time::sleep(Duration::from_secs(self.config.recover_backoff_secs)) => {
                TailState::Starting
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::CommonLogMatcher;

    fn test_loop(stats: SharedStats, lines: Arc<AtomicU64>, unmatched: Arc<AtomicU64>) -> TailLoop {
        TailLoop::new(
            AnalyzerConfig::default(),
            Arc::new(CommonLogMatcher::new()),
            stats,
            lines,
            unmatched,
            CancellationToken::new(),
        )
    }

    #[test]
    fn process_line_aggregates_matched_line() {
        let stats = SharedStats::new();
        let lines = Arc::new(AtomicU64::new(0));
        let unmatched = Arc::new(AtomicU64::new(0));
        let tail = test_loop(stats.clone(), lines.clone(), unmatched.clone());

        tail.process_line(r#"10.0.0.1 - - [x] "GET /home HTTP/1.1" 200 512"#);

        assert_eq!(lines.load(Ordering::Relaxed), 1);
        assert_eq!(unmatched.load(Ordering::Relaxed), 0);
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total_requests, 1);
        assert_eq!(snapshot.path_counts.get("/home"), Some(&1));
    }

    #[test]
    fn process_line_skips_unmatched_line() {
        let stats = SharedStats::new();
        let lines = Arc::new(AtomicU64::new(0));
        let unmatched = Arc::new(AtomicU64::new(0));
        let tail = test_loop(stats.clone(), lines.clone(), unmatched.clone());

        tail.process_line("this is not an access log line");

        assert_eq!(lines.load(Ordering::Relaxed), 1);
        assert_eq!(unmatched.load(Ordering::Relaxed), 1);
        assert!(stats.snapshot().is_empty());
    }

    #[tokio::test]
    async fn run_exits_promptly_on_cancellation() {
        let dir = tempfile::tempdir().unwrap();
        let config = crate::config::AnalyzerConfigBuilder::new()
            .log_path(dir.path().join("access.log"))
            .build()
            .unwrap();

        let cancel = CancellationToken::new();
        let tail = TailLoop::new(
            config,
            Arc::new(CommonLogMatcher::new()),
            SharedStats::new(),
            Arc::new(AtomicU64::new(0)),
            Arc::new(AtomicU64::new(0)),
            cancel.clone(),
        );

        let task = tokio::spawn(tail.run());
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("tail loop should exit after cancellation")
            .expect("tail loop task panicked");
    }
}
