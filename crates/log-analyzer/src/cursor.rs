//! 파일 커서 — 오프셋 추적과 로테이션 감지
//!
//! 액세스 로그 파일에 대한 열린 핸들과 바이트 오프셋을 관리하며
//! "다음 완성 라인 또는 아직 없음"을 제공합니다.
//! `tail -f`와 유사한 동작을 비동기 방식으로 구현합니다.
//!
//! # 로테이션 감지
//! - inode 변경 감지 (logrotate 등에 의한 파일 교체, Unix 전용)
//! - 파일 크기 축소 감지 (truncation)
//! - 감지 시 핸들을 새로 열고 오프셋을 0으로 리셋
//!
//! # 불변식
//! - 오프셋은 현재 파일 크기를 초과하지 않음
//! - 개행으로 끝나지 않은 바이트는 carry 버퍼에 보관되어
//!   다음 읽기에서 라인의 앞부분으로 사용됨

use std::path::{Path, PathBuf};

use bytes::BytesMut;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, SeekFrom};

use crate::error::LogAnalyzerError;

/// 한 번에 읽는 청크 크기 (바이트)
const READ_CHUNK_BYTES: usize = 8 * 1024;

/// 파일 커서
///
/// 하나의 로그 파일에 대한 열린 핸들, 추적 오프셋, 부분 라인 버퍼를
/// 소유합니다. 생명주기는 열린 핸들 하나와 같으며, 로테이션 감지 시
/// 내부적으로 핸들을 교체합니다.
#[derive(Debug)]
pub struct FileCursor {
    /// 감시 대상 경로 (불변)
    path: PathBuf,
    /// 현재 열린 파일 핸들
    file: File,
    /// 마지막 읽기 위치 (바이트 오프셋)
    offset: u64,
    /// 현재 파일의 inode (Unix 전용)
    #[cfg(unix)]
    inode: u64,
    /// 마지막 개행 이후의 미완성 라인 바이트
    partial: BytesMut,
    /// 완성 라인의 최대 길이 (초과분은 잘라냄)
    max_line_length: usize,
}

impl FileCursor {
    /// 파일을 열고 커서를 파일 끝에 위치시킵니다.
    ///
    /// 시작 이후에 추가된 라인만 관찰합니다 — 기존 내용은 건너뜁니다.
    ///
    /// # Errors
    ///
    /// 파일이 존재하지 않으면 [`LogAnalyzerError::FileAbsent`]를 반환합니다.
    /// 재시도(백오프)는 호출자의 책임입니다.
    pub async fn open_at_end(
        path: impl Into<PathBuf>,
        max_line_length: usize,
    ) -> Result<Self, LogAnalyzerError> {
        let path = path.into();
        let mut file = open_existing(&path).await?;
        let offset = file.seek(SeekFrom::End(0)).await?;

        #[cfg(unix)]
        let inode = {
            use std::os::unix::fs::MetadataExt;
            file.metadata().await?.ino()
        };

        Ok(Self {
            path,
            file,
            offset,
            #[cfg(unix)]
            inode,
            partial: BytesMut::new(),
            max_line_length,
        })
    }

    /// 감시 대상 경로를 반환합니다.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 현재 추적 중인 바이트 오프셋을 반환합니다.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// 다음 완성 라인을 읽습니다.
    ///
    /// 오프셋 이후에 완성된 라인이 아직 없으면 `Ok(None)`을 반환합니다.
    /// 이것은 에러가 아니라 "따라잡음" 상태이며, 호출자는 대기 후
    /// 다시 폴링합니다. 개행 없이 끝나는 바이트는 carry 버퍼에 남아
    /// 다음 호출에서 이어집니다.
    pub async fn read_line(&mut self) -> Result<Option<String>, LogAnalyzerError> {
        loop {
            if let Some(line) = self.take_complete_line() {
                return Ok(Some(line));
            }

            let mut chunk = [0u8; READ_CHUNK_BYTES];
            let n = self.file.read(&mut chunk).await?;
            if n == 0 {
                return Ok(None);
            }
            self.offset += n as u64;
            self.partial.extend_from_slice(&chunk[..n]);
        }
    }

    /// 파일 교체/절단 여부를 확인하고, 감지 시 커서를 재설정합니다.
    ///
    /// 디스크상의 파일 identity(inode)와 크기를 추적 상태와 비교합니다.
    /// 파일이 교체되었거나 추적 오프셋보다 작게 잘렸으면 핸들을 닫고
    /// 경로를 새로 열어 오프셋 0부터 읽습니다. carry 버퍼의 미완성
    /// 바이트는 이전 파일의 것이므로 함께 버립니다.
    ///
    /// 유휴 상태에서도 주기적으로 호출해야 합니다 — 로테이션은 성공적인
    /// 읽기 사이에도 발생할 수 있습니다.
    ///
    /// # Errors
    ///
    /// 경로에 파일이 없으면 [`LogAnalyzerError::FileAbsent`]를 반환합니다.
    pub async fn check_rotation(&mut self) -> Result<bool, LogAnalyzerError> {
        let metadata = match tokio::fs::metadata(&self.path).await {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(LogAnalyzerError::FileAbsent {
                    path: self.path.clone(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        #[cfg(unix)]
        let replaced = {
            use std::os::unix::fs::MetadataExt;
            metadata.ino() != self.inode
        };
        #[cfg(not(unix))]
        let replaced = false;

        let truncated = metadata.len() < self.offset;
        if !replaced && !truncated {
            return Ok(false);
        }

        let file = open_existing(&self.path).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            self.inode = file.metadata().await?.ino();
        }

        self.file = file;
        self.offset = 0;
        self.partial.clear();
        Ok(true)
    }

    /// carry 버퍼에서 완성 라인 하나를 꺼냅니다.
    ///
    /// 개행을 제거하고 CRLF의 CR도 함께 제거합니다. 최대 라인 길이를
    /// 초과하는 라인은 잘라냅니다.
    fn take_complete_line(&mut self) -> Option<String> {
        let newline = self.partial.iter().position(|&b| b == b'\n')?;
        let mut line = self.partial.split_to(newline + 1);
        line.truncate(line.len() - 1);
        if line.last() == Some(&b'\r') {
            line.truncate(line.len() - 1);
        }
        if line.len() > self.max_line_length {
            line.truncate(self.max_line_length);
        }
        Some(String::from_utf8_lossy(&line).into_owned())
    }
}

/// 경로의 기존 파일을 엽니다.
///
/// 존재하지 않으면 `FileAbsent`로 매핑합니다.
async fn open_existing(path: &Path) -> Result<File, LogAnalyzerError> {
    match File::open(path).await {
        Ok(file) => Ok(file),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(LogAnalyzerError::FileAbsent {
            path: path.to_path_buf(),
        }),
        Err(e) => Err(e.into()),
    }
}
