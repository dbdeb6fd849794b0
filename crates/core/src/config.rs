//! 설정 관리 — tailstat.toml 파싱 및 런타임 설정
//!
//! [`TailstatConfig`]는 모든 모듈의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`TAILSTAT_ANALYZER_LOG_PATH=/var/log/nginx/access.log` 형식)
//! 3. 설정 파일 (`tailstat.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), tailstat_core::error::TailstatError> {
//! use tailstat_core::config::TailstatConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = TailstatConfig::load("tailstat.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = TailstatConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, TailstatError};

/// Tailstat 통합 설정
///
/// `tailstat.toml` 파일의 최상위 구조를 나타냅니다.
/// 각 모듈은 자기 섹션만 읽어 사용합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TailstatConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 로그 분석기 설정
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
    /// 메트릭 엔드포인트 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl TailstatConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    ///
    /// 설정 로딩 순서:
    /// 1. TOML 파일 파싱
    /// 2. 환경변수 오버라이드 적용
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, TailstatError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, TailstatError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TailstatError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                TailstatError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, TailstatError> {
        toml::from_str(toml_str).map_err(|e| {
            TailstatError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `TAILSTAT_{SECTION}_{FIELD}`
    /// 예: `TAILSTAT_ANALYZER_LOG_PATH=/var/log/nginx/access.log`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "TAILSTAT_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "TAILSTAT_GENERAL_LOG_FORMAT");
        override_string(&mut self.general.pid_file, "TAILSTAT_GENERAL_PID_FILE");

        // Analyzer
        override_bool(&mut self.analyzer.enabled, "TAILSTAT_ANALYZER_ENABLED");
        override_string(&mut self.analyzer.log_path, "TAILSTAT_ANALYZER_LOG_PATH");
        override_u64(
            &mut self.analyzer.poll_interval_secs,
            "TAILSTAT_ANALYZER_POLL_INTERVAL_SECS",
        );
        override_u64(
            &mut self.analyzer.recover_backoff_secs,
            "TAILSTAT_ANALYZER_RECOVER_BACKOFF_SECS",
        );

        // Metrics
        override_bool(&mut self.metrics.enabled, "TAILSTAT_METRICS_ENABLED");
        override_string(
            &mut self.metrics.listen_addr,
            "TAILSTAT_METRICS_LISTEN_ADDR",
        );
        override_u16(&mut self.metrics.port, "TAILSTAT_METRICS_PORT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), TailstatError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        // analyzer 검증
        if self.analyzer.enabled {
            if self.analyzer.log_path.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "analyzer.log_path".to_owned(),
                    reason: "log_path must not be empty when analyzer is enabled".to_owned(),
                }
                .into());
            }

            if self.analyzer.poll_interval_secs == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "analyzer.poll_interval_secs".to_owned(),
                    reason: "must be greater than 0".to_owned(),
                }
                .into());
            }

            if self.analyzer.recover_backoff_secs == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "analyzer.recover_backoff_secs".to_owned(),
                    reason: "must be greater than 0".to_owned(),
                }
                .into());
            }
        }

        // metrics 검증
        if self.metrics.enabled && self.metrics.endpoint != "/metrics" {
            return Err(ConfigError::InvalidValue {
                field: "metrics.endpoint".to_owned(),
                reason: "only '/metrics' is currently supported".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
    /// PID 파일 경로 (빈 문자열이면 비활성화)
    pub pid_file: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
            pid_file: String::new(),
        }
    }
}

/// 로그 분석기 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 감시할 액세스 로그 파일 경로 (상대 경로는 작업 디렉토리 기준)
    pub log_path: String,
    /// 새 데이터가 없을 때 대기 간격 (초)
    pub poll_interval_secs: u64,
    /// 복구 재시도 대기 간격 (초)
    pub recover_backoff_secs: u64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_path: "logs/access.log".to_owned(),
            poll_interval_secs: 5,
            recover_backoff_secs: 10,
        }
    }
}

/// 메트릭 엔드포인트 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 수신 주소
    pub listen_addr: String,
    /// 수신 포트
    pub port: u16,
    /// 스크레이프 경로
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9184,
            endpoint: "/metrics".to_owned(),
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
