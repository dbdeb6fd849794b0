#![no_main]

use libfuzzer_sys::fuzz_target;
use tailstat_core::pipeline::LineMatcher;
use tailstat_log_analyzer::CommonLogMatcher;

fuzz_target!(|data: &[u8]| {
    if let Ok(line) = std::str::from_utf8(data) {
        let matcher = CommonLogMatcher::new();
        if let Some(record) = matcher.match_line(line) {
            // 매칭된 레코드의 형식 불변식 검증
            assert_eq!(record.status.len(), 3);
            assert!(record.status.bytes().all(|b| b.is_ascii_digit()));
            assert!(!record.path.contains('?'));
        }
    }
});
