//! 분석기 파이프라인 — 테일 루프의 생명주기 관리
//!
//! [`LogAnalyzer`]는 core의 [`Pipeline`](tailstat_core::pipeline::Pipeline)
//! trait을 구현하여 `tailstat-daemon`에서 start/stop/health_check
//! 생명주기로 관리됩니다.
//!
//! # 사용 예시
//! ```ignore
//! use tailstat_log_analyzer::{LogAnalyzerBuilder, SharedStats};
//!
//! let stats = SharedStats::new();
//! let mut analyzer = LogAnalyzerBuilder::new()
//!     .config(config)
//!     .stats(stats.clone())   // 집계기 주입 (스냅샷 소비자와 공유)
//!     .build()?;
//!
//! analyzer.start().await?;
//! let snapshot = stats.snapshot();
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio_util::sync::CancellationToken;

use tailstat_core::error::{PipelineError, TailstatError};
use tailstat_core::pipeline::{HealthStatus, LineMatcher, Pipeline};
use tailstat_core::types::StatsSnapshot;

use crate::config::AnalyzerConfig;
use crate::error::LogAnalyzerError;
use crate::matcher::CommonLogMatcher;
use crate::stats::SharedStats;
use crate::tailer::TailLoop;
use crate::bootstrap;

/// 분석기 실행 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AnalyzerState {
    /// 초기화됨, 아직 시작하지 않음
    Initialized,
    /// 실행 중
    Running,
    /// 정지됨
    Stopped,
}

/// 로그 분석기 — 테일 루프를 소유하고 생명주기를 관리합니다.
///
/// `start()`는 첫 부트스트랩을 수행한 뒤 테일 루프를 별도 태스크로
/// 스폰합니다. 첫 부트스트랩 실패만 에러로 전파되며 (치명적 설정
/// 오류), 그 이후의 모든 I/O 실패는 루프 내부에서 복구됩니다.
pub struct LogAnalyzer {
    /// 분석기 설정
    config: AnalyzerConfig,
    /// 현재 상태
    state: AnalyzerState,
    /// 라인 매처 (기본: common log format)
    matcher: Arc<dyn LineMatcher>,
    /// 주입된 공유 집계기
    stats: SharedStats,
    /// 읽어들인 원시 라인 수
    lines_seen: Arc<AtomicU64>,
    /// 매칭 실패 라인 수
    unmatched: Arc<AtomicU64>,
    /// 테일 루프 취소 토큰 (실행 중에만 존재)
    cancel: Option<CancellationToken>,
    /// 테일 루프 태스크 핸들
    task: Option<tokio::task::JoinHandle<()>>,
}

impl LogAnalyzer {
    /// 현재 상태 이름을 반환합니다.
    pub fn state_name(&self) -> &str {
        match self.state {
            AnalyzerState::Initialized => "initialized",
            AnalyzerState::Running => "running",
            AnalyzerState::Stopped => "stopped",
        }
    }

    /// 집계 통계의 특정 시점 스냅샷을 반환합니다.
    pub fn snapshot(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// 읽어들인 원시 라인 수를 반환합니다 (매칭 여부 무관).
    pub fn lines_seen_count(&self) -> u64 {
        self.lines_seen.load(Ordering::Relaxed)
    }

    /// 매칭 실패한 라인 수를 반환합니다.
    pub fn unmatched_count(&self) -> u64 {
        self.unmatched.load(Ordering::Relaxed)
    }

    /// 분석기 설정에 대한 참조를 반환합니다.
    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }
}

impl Pipeline for LogAnalyzer {
    async fn start(&mut self) -> Result<(), TailstatError> {
        if self.state == AnalyzerState::Running {
            return Err(PipelineError::AlreadyRunning.into());
        }

        tracing::info!(path = %self.config.log_path.display(), "starting log analyzer");

        // 첫 부트스트랩 실패는 치명적 — 데몬이 비정상 종료 코드로 끝나
        // 오케스트레이터(systemd, k8s)가 재시작하도록 함
        bootstrap::ensure_log_file(&self.config.log_path)
            .await
            .map_err(TailstatError::from)?;

        let cancel = CancellationToken::new();
        let tail = TailLoop::new(
            self.config.clone(),
            Arc::clone(&self.matcher),
            self.stats.clone(),
            Arc::clone(&self.lines_seen),
            Arc::clone(&self.unmatched),
            cancel.clone(),
        );

        self.task = Some(tokio::spawn(tail.run()));
        self.cancel = Some(cancel);
        self.state = AnalyzerState::Running;

        tracing::info!("log analyzer started");
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), TailstatError> {
        if self.state != AnalyzerState::Running {
            return Err(PipelineError::NotRunning.into());
        }

        tracing::info!("stopping log analyzer");

        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        if let Some(task) = self.task.take() {
            task.await
                .map_err(|e| PipelineError::TaskJoin(e.to_string()))?;
        }

        self.state = AnalyzerState::Stopped;
        tracing::info!("log analyzer stopped");
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        match self.state {
            AnalyzerState::Running => HealthStatus::Healthy,
            AnalyzerState::Initialized => HealthStatus::Unhealthy("not started".to_owned()),
            AnalyzerState::Stopped => HealthStatus::Unhealthy("stopped".to_owned()),
        }
    }
}

/// 로그 분석기 빌더
///
/// 설정을 검증하고 공유 집계기를 주입합니다.
pub struct LogAnalyzerBuilder {
    config: AnalyzerConfig,
    matcher: Arc<dyn LineMatcher>,
    stats: Option<SharedStats>,
}

impl LogAnalyzerBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: AnalyzerConfig::default(),
            matcher: Arc::new(CommonLogMatcher::new()),
            stats: None,
        }
    }

    /// 분석기 설정을 지정합니다.
    pub fn config(mut self, config: AnalyzerConfig) -> Self {
        self.config = config;
        self
    }

    /// 라인 매처를 교체합니다 (기본: [`CommonLogMatcher`]).
    pub fn matcher(mut self, matcher: Arc<dyn LineMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    /// 공유 집계기를 주입합니다.
    ///
    /// 지정하지 않으면 빌더가 새 집계기를 생성합니다. 스냅샷을
    /// 외부에서 소비하려면 같은 핸들의 클론을 보관하세요.
    pub fn stats(mut self, stats: SharedStats) -> Self {
        self.stats = Some(stats);
        self
    }

    /// 분석기를 빌드합니다.
    pub fn build(self) -> Result<LogAnalyzer, LogAnalyzerError> {
        self.config.validate()?;

        Ok(LogAnalyzer {
            config: self.config,
            state: AnalyzerState::Initialized,
            matcher: self.matcher,
            stats: self.stats.unwrap_or_default(),
            lines_seen: Arc::new(AtomicU64::new(0)),
            unmatched: Arc::new(AtomicU64::new(0)),
            cancel: None,
            task: None,
        })
    }
}

impl Default for LogAnalyzerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalyzerConfigBuilder;

    fn temp_config(dir: &tempfile::TempDir) -> AnalyzerConfig {
        AnalyzerConfigBuilder::new()
            .log_path(dir.path().join("logs").join("access.log"))
            .poll_interval_secs(1)
            .build()
            .unwrap()
    }

    #[test]
    fn builder_creates_initialized_analyzer() {
        let analyzer = LogAnalyzerBuilder::new().build().unwrap();
        assert_eq!(analyzer.state_name(), "initialized");
        assert_eq!(analyzer.lines_seen_count(), 0);
        assert_eq!(analyzer.unmatched_count(), 0);
        assert!(analyzer.snapshot().is_empty());
    }

    #[test]
    fn builder_rejects_invalid_config() {
        let config = AnalyzerConfig {
            poll_interval_secs: 0,
            ..Default::default()
        };
        let result = LogAnalyzerBuilder::new().config(config).build();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn lifecycle_start_stop() {
        let dir = tempfile::tempdir().unwrap();
        let mut analyzer = LogAnalyzerBuilder::new()
            .config(temp_config(&dir))
            .build()
            .unwrap();

        assert!(analyzer.health_check().await.is_unhealthy());

        analyzer.start().await.unwrap();
        assert_eq!(analyzer.state_name(), "running");
        assert!(analyzer.health_check().await.is_healthy());

        analyzer.stop().await.unwrap();
        assert_eq!(analyzer.state_name(), "stopped");
        assert!(analyzer.health_check().await.is_unhealthy());
    }

    #[tokio::test]
    async fn start_creates_missing_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = temp_config(&dir);
        let log_path = config.log_path.clone();

        let mut analyzer = LogAnalyzerBuilder::new().config(config).build().unwrap();
        analyzer.start().await.unwrap();

        assert!(log_path.exists());
        analyzer.stop().await.unwrap();
    }

    #[tokio::test]
    async fn double_start_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut analyzer = LogAnalyzerBuilder::new()
            .config(temp_config(&dir))
            .build()
            .unwrap();

        analyzer.start().await.unwrap();
        let err = analyzer.start().await.unwrap_err();
        assert!(err.to_string().contains("already running"));

        analyzer.stop().await.unwrap();
    }

    #[tokio::test]
    async fn stop_before_start_fails() {
        let mut analyzer = LogAnalyzerBuilder::new().build().unwrap();
        let err = analyzer.stop().await.unwrap_err();
        assert!(err.to_string().contains("not running"));
    }

    #[tokio::test]
    async fn restart_after_stop_is_supported() {
        let dir = tempfile::tempdir().unwrap();
        let mut analyzer = LogAnalyzerBuilder::new()
            .config(temp_config(&dir))
            .build()
            .unwrap();

        analyzer.start().await.unwrap();
        analyzer.stop().await.unwrap();
        analyzer.start().await.unwrap();
        assert_eq!(analyzer.state_name(), "running");
        analyzer.stop().await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn first_bootstrap_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();

        let config = AnalyzerConfigBuilder::new()
            .log_path(blocker.join("logs").join("access.log"))
            .build()
            .unwrap();

        let mut analyzer = LogAnalyzerBuilder::new().config(config).build().unwrap();
        let result = analyzer.start().await;
        assert!(result.is_err());
        assert_eq!(analyzer.state_name(), "initialized");
    }

    #[tokio::test]
    async fn injected_stats_handle_sees_aggregates() {
        let dir = tempfile::tempdir().unwrap();
        let stats = SharedStats::new();
        let analyzer = LogAnalyzerBuilder::new()
            .config(temp_config(&dir))
            .stats(stats.clone())
            .build()
            .unwrap();

        // 주입된 핸들과 분석기가 같은 집계기를 공유
        stats.record(&tailstat_core::types::AccessRecord {
            client_addr: "10.0.0.1".to_owned(),
            method: "GET".to_owned(),
            path: "/".to_owned(),
            status: "200".to_owned(),
        });
        assert_eq!(analyzer.snapshot().total_requests, 1);
    }
}
