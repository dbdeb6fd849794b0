//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`
//! 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `tailstat_`
//! - 모듈명: `analyzer_`, `daemon_`
//! - 접미어: `_total` (counter), `_seconds` (gauge, 시간), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(tailstat_core::metrics::ANALYZER_REQUESTS_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 상태 코드 레이블 키 ("200", "404" 등)
pub const LABEL_STATUS: &str = "status";

/// HTTP 메서드 레이블 키 (GET, POST 등)
pub const LABEL_METHOD: &str = "method";

// ─── Log Analyzer 메트릭 ────────────────────────────────────────────

/// Analyzer: 읽어들인 전체 원시 라인 수 (counter, 매칭 여부 무관)
pub const ANALYZER_LINES_TOTAL: &str = "tailstat_analyzer_lines_total";

/// Analyzer: 매칭되어 집계된 요청 수 (counter)
pub const ANALYZER_REQUESTS_TOTAL: &str = "tailstat_analyzer_requests_total";

/// Analyzer: 매칭 실패한 라인 수 (counter)
pub const ANALYZER_UNMATCHED_LINES_TOTAL: &str = "tailstat_analyzer_unmatched_lines_total";

/// Analyzer: 상태 코드별 요청 수 (counter, label: status)
pub const ANALYZER_STATUS_REQUESTS_TOTAL: &str = "tailstat_analyzer_status_requests_total";

/// Analyzer: 감지된 로그 로테이션 수 (counter)
pub const ANALYZER_ROTATIONS_TOTAL: &str = "tailstat_analyzer_rotations_total";

/// Analyzer: 복구 시도 수 (counter)
pub const ANALYZER_RECOVERIES_TOTAL: &str = "tailstat_analyzer_recoveries_total";

// ─── Daemon 메트릭 ──────────────────────────────────────────────────

/// Daemon: 가동 시간 (gauge, 초)
pub const DAEMON_UPTIME_SECONDS: &str = "tailstat_daemon_uptime_seconds";

/// Daemon: 빌드 정보 (gauge, 항상 1, label: version)
pub const DAEMON_BUILD_INFO: &str = "tailstat_daemon_build_info";

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// `metrics::describe_counter!()`, `describe_gauge!()`를 호출하여
/// Prometheus HELP 텍스트를 설정합니다.
///
/// 이 함수는 전역 레코더 설치 후 한 번만 호출해야 합니다.
/// 일반적으로 `tailstat-daemon`의 시작 시점에서 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge};

    // Log Analyzer
    describe_counter!(
        ANALYZER_LINES_TOTAL,
        "Total number of raw lines read from the access log"
    );
    describe_counter!(
        ANALYZER_REQUESTS_TOTAL,
        "Total number of access log lines matched and aggregated"
    );
    describe_counter!(
        ANALYZER_UNMATCHED_LINES_TOTAL,
        "Total number of lines that did not match the access log shape"
    );
    describe_counter!(
        ANALYZER_STATUS_REQUESTS_TOTAL,
        "Requests aggregated per HTTP status code"
    );
    describe_counter!(
        ANALYZER_ROTATIONS_TOTAL,
        "Total number of log rotations detected"
    );
    describe_counter!(
        ANALYZER_RECOVERIES_TOTAL,
        "Total number of recovery attempts after an I/O failure"
    );

    // Daemon
    describe_gauge!(DAEMON_UPTIME_SECONDS, "Tailstat daemon uptime in seconds");
    describe_gauge!(
        DAEMON_BUILD_INFO,
        "Build information (always 1, with version label)"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_METRIC_NAMES: &[&str] = &[
        ANALYZER_LINES_TOTAL,
        ANALYZER_REQUESTS_TOTAL,
        ANALYZER_UNMATCHED_LINES_TOTAL,
        ANALYZER_STATUS_REQUESTS_TOTAL,
        ANALYZER_ROTATIONS_TOTAL,
        ANALYZER_RECOVERIES_TOTAL,
        DAEMON_UPTIME_SECONDS,
        DAEMON_BUILD_INFO,
    ];

    #[test]
    fn all_metrics_start_with_tailstat_prefix() {
        for name in ALL_METRIC_NAMES {
            assert!(
                name.starts_with("tailstat_"),
                "Metric '{}' does not start with 'tailstat_' prefix",
                name
            );
        }
    }

    #[test]
    fn counter_names_end_with_total() {
        let counters = &ALL_METRIC_NAMES[..6];
        for name in counters {
            assert!(
                name.ends_with("_total"),
                "Counter '{}' should end with '_total'",
                name
            );
        }
    }

    #[test]
    fn describe_all_does_not_panic() {
        // 레코더가 설치되지 않아도 describe_all()은 패닉하지 않아야 함
        describe_all();
    }

    #[test]
    fn label_keys_are_lowercase() {
        for label in [LABEL_STATUS, LABEL_METHOD] {
            assert_eq!(
                label.to_lowercase(),
                label,
                "Label key '{}' should be lowercase",
                label
            );
        }
    }
}
