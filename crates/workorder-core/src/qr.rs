// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! QR payload convention.
//!
//! Labels printed for a work carry the token `workid:<id>`. Scanners accept
//! the token anywhere in the decoded text, with an optional `#` before the
//! digits and in any letter case:
//!
//! | Payload | Result |
//! |---------|--------|
//! | `workid:123` | `123` |
//! | `workid:#123` | `123` |
//! | `WORKID:123` | `123` |
//! | `workid:` | rejected |
//! | `workid:abc` | rejected |

use std::sync::LazyLock;

use regex::Regex;

static WORK_ID_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)workid:#?(\d+)").expect("work id pattern is valid"));

/// Reasons a payload does not identify a work.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    /// No `workid:<digits>` token in the payload.
    #[error("payload does not contain a work id token")]
    MissingToken,

    /// Token digits do not fit a work id.
    #[error("work id `{0}` is out of range")]
    OutOfRange(String)
}

/// Extract the digits of the first `workid:` token.
pub fn extract_work_token(payload: &str) -> Option<&str> {
    WORK_ID_TOKEN
        .captures(payload)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Parse the work id carried by a payload.
pub fn parse_payload(payload: &str) -> Result<i64, PayloadError> {
    let digits = extract_work_token(payload).ok_or(PayloadError::MissingToken)?;
    digits
        .parse()
        .map_err(|_| PayloadError::OutOfRange(digits.to_string()))
}

/// Payload to print on the label of work `id`.
pub fn encode_payload(id: i64) -> String {
    format!("workid:{id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_documented_forms() {
        assert_eq!(extract_work_token("workid:123"), Some("123"));
        assert_eq!(extract_work_token("workid:#123"), Some("123"));
        assert_eq!(extract_work_token("WORKID:123"), Some("123"));
        assert_eq!(extract_work_token("WorkId:#0042"), Some("0042"));
    }

    #[test]
    fn rejects_malformed_payloads() {
        assert_eq!(extract_work_token("workid:"), None);
        assert_eq!(extract_work_token("workid:abc"), None);
        assert_eq!(extract_work_token(""), None);
        assert_eq!(extract_work_token("workid:##1"), None);
        assert_eq!(extract_work_token("work:123"), None);
    }

    #[test]
    fn token_may_be_embedded() {
        assert_eq!(extract_work_token("https://example.test/?q=workid:77&x=1"), Some("77"));
        assert_eq!(parse_payload("label workid:#9 batch 3"), Ok(9));
    }

    #[test]
    fn parse_reports_reason() {
        assert_eq!(parse_payload("nothing here"), Err(PayloadError::MissingToken));
        assert_eq!(
            parse_payload("workid:99999999999999999999"),
            Err(PayloadError::OutOfRange("99999999999999999999".into()))
        );
    }

    #[test]
    fn encoded_payload_parses_back() {
        assert_eq!(encode_payload(123), "workid:123");
        assert_eq!(parse_payload(&encode_payload(123)), Ok(123));
    }
}
