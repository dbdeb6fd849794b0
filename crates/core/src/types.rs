//! 도메인 타입 — 시스템 전역에서 사용되는 공통 타입
//!
//! 로그 분석기와 데몬이 공유하는 데이터 구조를 정의합니다.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// 액세스 로그 레코드
///
/// 매처가 한 라인에서 추출한 구조화된 요청 정보입니다.
/// 매처에서 생성되어 즉시 집계기로 전달되는 일시적 값입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRecord {
    /// 클라이언트 주소 (IPv4/IPv6 문자열, 검증하지 않음)
    pub client_addr: String,
    /// HTTP 메서드 토큰 (GET, POST 등 — 알려진 동사인지 검증하지 않음)
    pub method: String,
    /// 요청 경로 (쿼리 스트링 제외)
    pub path: String,
    /// 상태 코드 — 항상 ASCII 숫자 3자리
    pub status: String,
}

impl fmt::Display for AccessRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} -> {}",
            self.client_addr, self.method, self.path, self.status,
        )
    }
}

/// 집계 통계 스냅샷
///
/// 집계기의 특정 시점 일관된 복사본입니다. 세 카운터는 항상 함께 복사되므로
/// 부분 업데이트가 보이지 않습니다.
///
/// 불변식: `status_codes` 값의 합 == `path_counts` 값의 합 == `total_requests`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// 매칭된 전체 요청 수
    pub total_requests: u64,
    /// 상태 코드별 요청 수 (첫 등장 시 키 생성)
    pub status_codes: HashMap<String, u64>,
    /// 경로별 요청 수 (첫 등장 시 키 생성, 상한 없음)
    pub path_counts: HashMap<String, u64>,
}

impl StatsSnapshot {
    /// 스냅샷이 아무 요청도 담고 있지 않은지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.total_requests == 0
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "total={} statuses={} paths={}",
            self.total_requests,
            self.status_codes.len(),
            self.path_counts.len(),
        )
    }
}
