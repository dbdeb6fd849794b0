//! 부트스트랩 — 테일링 시작 전 로그 파일 준비
//!
//! 감시 대상 파일과 부모 디렉토리가 없으면 생성합니다. 로그 볼륨이
//! 먼저 마운트되고 웹서버가 아직 첫 라인을 쓰지 않은 상태에서도
//! 테일링이 시작될 수 있어야 합니다.

use std::path::Path;

use crate::error::LogAnalyzerError;

/// 로그 파일과 부모 디렉토리의 존재를 보장합니다.
///
/// 멱등 연산입니다 — 이미 존재하면 아무것도 하지 않습니다.
/// 테일 루프의 첫 시작 전에 한 번 호출되고, 루프가 복구 재시작할
/// 때마다 다시 호출됩니다.
///
/// # Errors
///
/// 디렉토리 또는 빈 파일을 생성할 수 없으면
/// [`LogAnalyzerError::Bootstrap`]을 반환합니다. 첫 시작 시점의 이
/// 실패는 호출자(데몬)에서 치명적 오류로 처리됩니다.
pub async fn ensure_log_file(path: impl AsRef<Path>) -> Result<(), LogAnalyzerError> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LogAnalyzerError::Bootstrap {
                    path: parent.to_path_buf(),
                    reason: e.to_string(),
                })?;
        }
    }

    // append 모드의 create는 기존 내용을 건드리지 않음
    tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| LogAnalyzerError::Bootstrap {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    Ok(())
}
