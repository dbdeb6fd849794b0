//! 로그 분석기 설정
//!
//! [`AnalyzerConfig`]는 core의 [`AnalyzerConfig`](tailstat_core::config::AnalyzerConfig)를
//! 기반으로 분석기 전용 설정을 제공합니다.
//!
//! # 사용 예시
//! ```ignore
//! use tailstat_core::config::TailstatConfig;
//! use tailstat_log_analyzer::config::AnalyzerConfig;
//!
//! let core_config = TailstatConfig::default();
//! let config = AnalyzerConfig::from_core(&core_config.analyzer);
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::LogAnalyzerError;

/// 로그 분석기 설정
///
/// core의 `AnalyzerConfig`에서 파생되며, 분석기 내부에서
/// 사용하는 추가 설정을 포함합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 감시할 액세스 로그 파일 경로
    pub log_path: PathBuf,
    /// 새 데이터가 없을 때 대기 간격 (초)
    pub poll_interval_secs: u64,
    /// 복구 재시도 대기 간격 (초)
    pub recover_backoff_secs: u64,

    // --- 확장 설정 (core에 없는 추가 필드) ---
    /// 최대 라인 길이 (바이트) — 초과분은 잘라냄
    pub max_line_length: usize,
    /// 한 번의 폴링에서 처리할 최대 라인 수
    pub max_lines_per_poll: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_path: PathBuf::from("logs/access.log"),
            poll_interval_secs: 5,
            recover_backoff_secs: 10,
            max_line_length: 64 * 1024, // 64KB
            max_lines_per_poll: 1000,
        }
    }
}

impl AnalyzerConfig {
    /// core의 `AnalyzerConfig`에서 분석기 설정을 생성합니다.
    ///
    /// core 설정에 없는 확장 필드는 기본값이 적용됩니다.
    pub fn from_core(core: &tailstat_core::config::AnalyzerConfig) -> Self {
        Self {
            enabled: core.enabled,
            log_path: PathBuf::from(&core.log_path),
            poll_interval_secs: core.poll_interval_secs,
            recover_backoff_secs: core.recover_backoff_secs,
            ..Self::default()
        }
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), LogAnalyzerError> {
        const MAX_LINE_LENGTH_LIMIT: usize = 16 * 1024 * 1024; // 16MB
        const MAX_POLL_INTERVAL_SECS: u64 = 3600; // 1 hour

        if self.log_path.as_os_str().is_empty() {
            return Err(LogAnalyzerError::Config {
                field: "log_path".to_owned(),
                reason: "log path must not be empty".to_owned(),
            });
        }

        if self.poll_interval_secs == 0 || self.poll_interval_secs > MAX_POLL_INTERVAL_SECS {
            return Err(LogAnalyzerError::Config {
                field: "poll_interval_secs".to_owned(),
                reason: format!("must be 1-{}", MAX_POLL_INTERVAL_SECS),
            });
        }

        if self.recover_backoff_secs == 0 || self.recover_backoff_secs > MAX_POLL_INTERVAL_SECS {
            return Err(LogAnalyzerError::Config {
                field: "recover_backoff_secs".to_owned(),
                reason: format!("must be 1-{}", MAX_POLL_INTERVAL_SECS),
            });
        }

        if self.max_line_length == 0 || self.max_line_length > MAX_LINE_LENGTH_LIMIT {
            return Err(LogAnalyzerError::Config {
                field: "max_line_length".to_owned(),
                reason: format!("must be 1-{}", MAX_LINE_LENGTH_LIMIT),
            });
        }

        if self.max_lines_per_poll == 0 {
            return Err(LogAnalyzerError::Config {
                field: "max_lines_per_poll".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        Ok(())
    }
}

/// 분석기 설정 빌더
#[derive(Default)]
pub struct AnalyzerConfigBuilder {
    config: AnalyzerConfig,
}

impl AnalyzerConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 활성화 여부를 설정합니다.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.config.enabled = enabled;
        self
    }

    /// 감시할 로그 파일 경로를 설정합니다.
    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.log_path = path.into();
        self
    }

    /// 폴링 간격(초)을 설정합니다.
    pub fn poll_interval_secs(mut self, secs: u64) -> Self {
        self.config.poll_interval_secs = secs;
        self
    }

    /// 복구 백오프 간격(초)을 설정합니다.
    pub fn recover_backoff_secs(mut self, secs: u64) -> Self {
        self.config.recover_backoff_secs = secs;
        self
    }

    /// 최대 라인 길이를 설정합니다.
    pub fn max_line_length(mut self, bytes: usize) -> Self {
        self.config.max_line_length = bytes;
        self
    }

    /// 폴링당 최대 라인 수를 설정합니다.
    pub fn max_lines_per_poll(mut self, lines: usize) -> Self {
        self.config.max_lines_per_poll = lines;
        self
    }

    /// 설정을 검증하고 `AnalyzerConfig`를 생성합니다.
    pub fn build(self) -> Result<AnalyzerConfig, LogAnalyzerError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
