//! Common log format 라인 매처
//!
//! 액세스 로그 한 라인에서 클라이언트 주소, HTTP 메서드, 요청 경로,
//! 상태 코드를 추출합니다.
//!
//! # 라인 형식
//! ```text
//! <client> ... "<METHOD> <PATH[?query]> [HTTP/version]" ... <3-digit status> ...
//! ```
//!
//! 단일 정규식 대신 명시적 토크나이저로 구현되어 있어 각 단계
//! (클라이언트 토큰, 따옴표 구간, 메서드/경로 분리, 상태 코드 탐색)를
//! 독립적으로 테스트할 수 있습니다. IPv6 클라이언트 주소, 복수의 따옴표
//! 구간 같은 엣지 케이스가 토크나이저 단계별로 검증됩니다.
//!
//! 매칭은 순수한 구문 패턴 추출입니다 — 메서드가 알려진 동사인지,
//! 상태 코드가 등록된 코드인지 검증하지 않습니다. 형식에 맞지 않는
//! 라인은 `None`(NoMatch)이며, 이는 에러가 아니라 정상 결과입니다.

use tailstat_core::pipeline::LineMatcher;
use tailstat_core::types::AccessRecord;

/// Common log format 매처
///
/// core의 [`LineMatcher`] trait을 구현하여 원시 라인을 [`AccessRecord`]로
/// 변환합니다.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommonLogMatcher;

impl CommonLogMatcher {
    /// 새 매처를 생성합니다.
    pub fn new() -> Self {
        Self
    }
}

impl LineMatcher for CommonLogMatcher {
    fn format_name(&self) -> &str {
        "common"
    }

    fn match_line(&self, line: &str) -> Option<AccessRecord> {
        let (client_addr, rest) = client_address(line)?;
        let (request, after_request) = quoted_section(rest)?;
        let (method, path) = request_parts(request)?;
        let status = status_token(after_request)?;

        Some(AccessRecord {
            client_addr: client_addr.to_owned(),
            method: method.to_owned(),
            path: path.to_owned(),
            status: status.to_owned(),
        })
    }
}

/// 라인 선두의 클라이언트 주소 토큰과 나머지를 분리합니다.
///
/// 토큰은 공백이 아닌 문자의 연속이며, 라인은 공백으로 시작할 수 없습니다.
/// IPv4/IPv6/호스트명 모두 하나의 토큰으로 취급합니다.
fn client_address(line: &str) -> Option<(&str, &str)> {
    let first = line.chars().next()?;
    if first.is_whitespace() {
        return None;
    }
    let end = line.find(char::is_whitespace)?;
    Some((&line[..end], &line[end..]))
}

/// 첫 번째 따옴표 구간의 내용과 닫는 따옴표 이후의 나머지를 분리합니다.
///
/// 닫는 따옴표가 없으면 (잘린 라인) `None`을 반환합니다.
fn quoted_section(s: &str) -> Option<(&str, &str)> {
    let open = s.find('"')?;
    let inner = &s[open + 1..];
    let close = inner.find('"')?;
    Some((&inner[..close], &inner[close + 1..]))
}

/// 따옴표 구간에서 메서드 토큰과 쿼리 제거된 경로를 추출합니다.
///
/// `METHOD SP TARGET [SP ...]` 형태를 기대하며, TARGET 이후
/// (`HTTP/1.1` 등)는 무시합니다. 메서드는 단어 문자로만 구성되어야 합니다.
fn request_parts(request: &str) -> Option<(&str, &str)> {
    let mut tokens = request.split_whitespace();
    let method = tokens.next()?;
    if !is_word_token(method) {
        return None;
    }
    let target = tokens.next()?;
    Some((method, strip_query(target)))
}

/// 요청 대상에서 `?query` 접미사를 제거합니다.
fn strip_query(target: &str) -> &str {
    match target.find('?') {
        Some(idx) => &target[..idx],
        None => target,
    }
}

/// 닫는 따옴표 이후에서 첫 번째 3자리 숫자 토큰을 찾습니다.
fn status_token(after_quote: &str) -> Option<&str> {
    after_quote
        .split_whitespace()
        .find(|token| is_status_shape(token))
}

/// 토큰이 정확히 ASCII 숫자 3자리인지 확인합니다.
fn is_status_shape(token: &str) -> bool {
    token.len() == 3 && token.bytes().all(|b| b.is_ascii_digit())
}

/// 토큰이 단어 문자(영숫자, 밑줄)로만 구성되어 있는지 확인합니다.
fn is_word_token(token: &str) -> bool {
    !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}
