//! 로그 분석기 에러 타입
//!
//! [`LogAnalyzerError`]는 로그 분석기 내부에서 발생하는 모든 에러를 표현합니다.
//! `From<LogAnalyzerError> for TailstatError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.
//!
//! 매칭 실패(NoMatch)와 새 데이터 없음(NoneAvailable)은 에러가 아니라
//! 정상 결과이므로 여기에 포함되지 않습니다 — 각각 `Option`으로 표현됩니다.

use std::path::PathBuf;

use tailstat_core::error::{PipelineError, TailstatError};

/// 로그 분석기 도메인 에러
///
/// 파일 열기/읽기, 부트스트랩, 설정 등 분석기 내부의 복구 가능/불가능
/// 에러 상황을 포괄합니다.
#[derive(Debug, thiserror::Error)]
pub enum LogAnalyzerError {
    /// 감시 대상 파일이 존재하지 않음 (복구 가능 — 호출자가 백오프 후 재시도)
    #[error("log file absent: {path}")]
    FileAbsent {
        /// 감시 대상 경로
        path: PathBuf,
    },

    /// 로그 파일/디렉토리 생성 실패 (시작 시점에는 치명적)
    #[error("bootstrap failed for {path}: {reason}")]
    Bootstrap {
        /// 생성하려던 경로
        path: PathBuf,
        /// 실패 사유
        reason: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// I/O 에러 (권한, 디바이스 등 — 복구 가능, 백오프 후 재시도)
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LogAnalyzerError> for TailstatError {
    fn from(err: LogAnalyzerError) -> Self {
        TailstatError::Pipeline(PipelineError::InitFailed(err.to_string()))
    }
}
