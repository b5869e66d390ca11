//! ElevenLabs webhook signature verification.
//!
//! ElevenLabs signs webhook requests using HMAC-SHA256 and sends the result in
//! the `elevenlabs-signature` header, formatted as `t=<unix-seconds>,v0=<hex>`.
//! The signed message is `"{timestamp}.{raw body}"`.
//!
//! Verification is strict: every failure path yields a named
//! [`SignatureRejection`], never a panic.

use std::time::{SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the ElevenLabs signature.
pub const SIGNATURE_HEADER: &str = "elevenlabs-signature";

/// Maximum age in seconds of a signed timestamp (30 minutes).
pub const TIMESTAMP_TOLERANCE_SECS: i64 = 30 * 60;

const TIMESTAMP_PREFIX: &str = "t=";
const SIGNATURE_PREFIX: &str = "v0=";

/// Why a signature was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SignatureRejection {
    #[error("Missing elevenlabs-signature header")]
    MissingHeader,
    #[error("Webhook secret is not configured")]
    MissingSecret,
    #[error("Malformed elevenlabs-signature header")]
    MalformedHeader,
    #[error("Webhook timestamp is too old")]
    TimestampTooOld,
    #[error("Invalid webhook signature")]
    SignatureMismatch,
}

impl SignatureRejection {
    /// Short machine-readable code used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            SignatureRejection::MissingHeader => "missing_header",
            SignatureRejection::MissingSecret => "missing_secret",
            SignatureRejection::MalformedHeader => "malformed_header",
            SignatureRejection::TimestampTooOld => "timestamp_too_old",
            SignatureRejection::SignatureMismatch => "signature_mismatch",
        }
    }
}

/// Outcome of verifying a signed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationResult {
    Accepted,
    Rejected(SignatureRejection),
}

impl VerificationResult {
    pub fn is_accepted(&self) -> bool {
        matches!(self, VerificationResult::Accepted)
    }

    /// Convert into a `Result` so callers can use `?`.
    pub fn into_result(self) -> Result<(), SignatureRejection> {
        match self {
            VerificationResult::Accepted => Ok(()),
            VerificationResult::Rejected(reason) => Err(reason),
        }
    }
}

/// Verify an ElevenLabs webhook signature against the current wall clock.
///
/// # Arguments
///
/// * `body` - The raw request body, exactly as received
/// * `signature_header` - The `elevenlabs-signature` header value, if present
/// * `secret` - The webhook secret shared with ElevenLabs
pub fn verify_elevenlabs_signature(
    body: &[u8],
    signature_header: Option<&str>,
    secret: Option<&str>,
) -> VerificationResult {
    verify_elevenlabs_signature_at(body, signature_header, secret, unix_now())
}

/// Verify an ElevenLabs webhook signature at the given Unix time (seconds).
///
/// Timestamps older than `now - TIMESTAMP_TOLERANCE_SECS` are rejected.
/// Timestamps in the future are accepted.
pub fn verify_elevenlabs_signature_at(
    body: &[u8],
    signature_header: Option<&str>,
    secret: Option<&str>,
    now: i64,
) -> VerificationResult {
    let result = check_signature(body, signature_header, secret, now);

    if let VerificationResult::Rejected(reason) = result {
        warn!(
            reason = reason.code(),
            body_length = body.len(),
            has_header = signature_header.is_some_and(|h| !h.is_empty()),
            "elevenlabs_signature_rejected"
        );
    }

    result
}

fn check_signature(
    body: &[u8],
    signature_header: Option<&str>,
    secret: Option<&str>,
    now: i64,
) -> VerificationResult {
    use VerificationResult::Rejected;

    let secret = match secret {
        Some(s) if !s.is_empty() => s,
        _ => return Rejected(SignatureRejection::MissingSecret),
    };

    let header = match signature_header {
        Some(h) if !h.is_empty() => h,
        _ => return Rejected(SignatureRejection::MissingHeader),
    };

    let (timestamp_text, provided_signature) = match parse_signature_header(header) {
        Some(parts) => parts,
        None => return Rejected(SignatureRejection::MalformedHeader),
    };

    let timestamp: i64 = match timestamp_text.parse() {
        Ok(t) => t,
        Err(_) => return Rejected(SignatureRejection::MalformedHeader),
    };

    // No upper bound: ElevenLabs clocks ahead of ours are tolerated.
    if timestamp < now.saturating_sub(TIMESTAMP_TOLERANCE_SECS) {
        return Rejected(SignatureRejection::TimestampTooOld);
    }

    let body_text = match std::str::from_utf8(body) {
        Ok(text) => text,
        Err(_) => return Rejected(SignatureRejection::MalformedHeader),
    };

    let expected_signature = match compute_elevenlabs_signature(body_text, secret, timestamp_text)
    {
        Some(sig) => sig,
        None => return Rejected(SignatureRejection::SignatureMismatch),
    };

    if constant_time_compare(&expected_signature, provided_signature) {
        VerificationResult::Accepted
    } else {
        Rejected(SignatureRejection::SignatureMismatch)
    }
}

/// Split a header into its timestamp text and `v0=`-prefixed signature.
///
/// Fields beyond the second are ignored. Returns `None` when there are fewer
/// than two fields or the first field lacks the `t=` tag.
fn parse_signature_header(header: &str) -> Option<(&str, &str)> {
    let mut fields = header.split(',');
    let timestamp = fields.next()?.strip_prefix(TIMESTAMP_PREFIX)?;
    let signature = fields.next()?;
    Some((timestamp, signature))
}

/// Compute the `v0=`-prefixed signature ElevenLabs would send for `body`.
///
/// `timestamp` is used verbatim, exactly as it appears after `t=`.
pub fn compute_elevenlabs_signature(body: &str, secret: &str, timestamp: &str) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(body.as_bytes());

    Some(format!(
        "{}{}",
        SIGNATURE_PREFIX,
        hex::encode(mac.finalize().into_bytes())
    ))
}

/// Format an `elevenlabs-signature` header value.
pub fn format_signature_header(timestamp: i64, signature: &str) -> String {
    format!("{}{},{}", TIMESTAMP_PREFIX, timestamp, signature)
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    constant_time_compare_inspecting(a.as_bytes(), b.as_bytes(), || {})
}

/// Compare two byte strings without short-circuiting on the first mismatch.
///
/// `on_byte` runs once per inspected byte pair.
fn constant_time_compare_inspecting(a: &[u8], b: &[u8], mut on_byte: impl FnMut()) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b) {
        on_byte();
        result |= x ^ y;
    }
    result == 0
}

/// Check if ElevenLabs signature verification is enabled.
pub fn is_signature_verification_enabled(secret: &Option<String>) -> bool {
    secret
        .as_ref()
        .map(|s| !s.trim().is_empty())
        .unwrap_or(false)
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "wsec_test_secret";
    const NOW: i64 = 1_730_000_000;
    const BODY: &str = r#"{"type":"post_call_transcription","data":{"agent_id":"agent_1"}}"#;

    fn signed_header(body: &str, secret: &str, timestamp: i64) -> String {
        let signature =
            compute_elevenlabs_signature(body, secret, &timestamp.to_string()).unwrap();
        format_signature_header(timestamp, &signature)
    }

    fn verify(body: &[u8], header: Option<&str>, secret: Option<&str>) -> VerificationResult {
        verify_elevenlabs_signature_at(body, header, secret, NOW)
    }

    #[test]
    fn test_valid_signature_round_trip() {
        for timestamp in [NOW, NOW - 60, NOW - TIMESTAMP_TOLERANCE_SECS] {
            let header = signed_header(BODY, SECRET, timestamp);
            assert_eq!(
                verify(BODY.as_bytes(), Some(&header), Some(SECRET)),
                VerificationResult::Accepted
            );
        }
    }

    #[test]
    fn test_valid_signature_with_wall_clock() {
        let header = signed_header(BODY, SECRET, unix_now());
        assert!(verify_elevenlabs_signature(BODY.as_bytes(), Some(&header), Some(SECRET))
            .is_accepted());
    }

    #[test]
    fn test_signature_covers_exact_whitespace() {
        let body = "{ \"type\" : \"ping\" }\n";
        let header = signed_header(body, SECRET, NOW);
        assert!(verify(body.as_bytes(), Some(&header), Some(SECRET)).is_accepted());

        let reencoded = r#"{"type":"ping"}"#;
        assert_eq!(
            verify(reencoded.as_bytes(), Some(&header), Some(SECRET)),
            VerificationResult::Rejected(SignatureRejection::SignatureMismatch)
        );
    }

    #[test]
    fn test_any_single_byte_mutation_is_rejected() {
        let header = signed_header(BODY, SECRET, NOW);

        for i in 0..BODY.len() {
            let mut mutated = BODY.as_bytes().to_vec();
            // Flipping bit 0 keeps ASCII bytes ASCII, so the body stays UTF-8.
            mutated[i] ^= 0x01;
            assert_eq!(
                verify(&mutated, Some(&header), Some(SECRET)),
                VerificationResult::Rejected(SignatureRejection::SignatureMismatch),
                "mutation at byte {} was accepted",
                i
            );
        }
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let header = signed_header(BODY, "other-secret", NOW);
        assert_eq!(
            verify(BODY.as_bytes(), Some(&header), Some(SECRET)),
            VerificationResult::Rejected(SignatureRejection::SignatureMismatch)
        );
    }

    #[test]
    fn test_empty_secret_always_missing_secret() {
        let header = signed_header(BODY, SECRET, NOW);
        let expected = VerificationResult::Rejected(SignatureRejection::MissingSecret);

        assert_eq!(verify(BODY.as_bytes(), Some(&header), Some("")), expected);
        assert_eq!(verify(BODY.as_bytes(), None, Some("")), expected);
        assert_eq!(verify(b"\xff\xfe", Some("garbage"), Some("")), expected);
        assert_eq!(verify(BODY.as_bytes(), Some(&header), None), expected);
    }

    #[test]
    fn test_missing_header() {
        let expected = VerificationResult::Rejected(SignatureRejection::MissingHeader);
        assert_eq!(verify(BODY.as_bytes(), None, Some(SECRET)), expected);
        assert_eq!(verify(BODY.as_bytes(), Some(""), Some(SECRET)), expected);
    }

    #[test]
    fn test_header_without_comma_is_malformed() {
        let expected = VerificationResult::Rejected(SignatureRejection::MalformedHeader);
        assert_eq!(
            verify(BODY.as_bytes(), Some("t=1730000000"), Some(SECRET)),
            expected
        );
        assert_eq!(
            verify(BODY.as_bytes(), Some("t=1730000000 v0=abcdef"), Some(SECRET)),
            expected
        );
    }

    #[test]
    fn test_malformed_timestamp() {
        let expected = VerificationResult::Rejected(SignatureRejection::MalformedHeader);
        for header in ["t=,v0=abc", "t=soon,v0=abc", "x=1730000000,v0=abc", "1730000000,v0=abc"] {
            assert_eq!(
                verify(BODY.as_bytes(), Some(header), Some(SECRET)),
                expected,
                "header {:?}",
                header
            );
        }
    }

    #[test]
    fn test_extra_header_fields_are_ignored() {
        let header = format!("{},v1=unused,extra", signed_header(BODY, SECRET, NOW));
        assert!(verify(BODY.as_bytes(), Some(&header), Some(SECRET)).is_accepted());
    }

    #[test]
    fn test_freshness_window_boundary() {
        let boundary = NOW - TIMESTAMP_TOLERANCE_SECS;

        let at_boundary = signed_header(BODY, SECRET, boundary);
        assert!(verify(BODY.as_bytes(), Some(&at_boundary), Some(SECRET)).is_accepted());

        let one_second_older = signed_header(BODY, SECRET, boundary - 1);
        assert_eq!(
            verify(BODY.as_bytes(), Some(&one_second_older), Some(SECRET)),
            VerificationResult::Rejected(SignatureRejection::TimestampTooOld)
        );
    }

    #[test]
    fn test_future_timestamp_is_accepted() {
        let header = signed_header(BODY, SECRET, NOW + 24 * 60 * 60);
        assert!(verify(BODY.as_bytes(), Some(&header), Some(SECRET)).is_accepted());
    }

    #[test]
    fn test_stale_timestamp_checked_before_signature() {
        // Year 2000, with a signature that would not match anyway.
        assert_eq!(
            verify(BODY.as_bytes(), Some("t=946684800,v0=deadbeef"), Some(SECRET)),
            VerificationResult::Rejected(SignatureRejection::TimestampTooOld)
        );
    }

    #[test]
    fn test_invalid_utf8_body_is_malformed() {
        let header = format_signature_header(NOW, "v0=00");
        assert_eq!(
            verify(b"{\"type\":\"\xc3\x28\"}", Some(&header), Some(SECRET)),
            VerificationResult::Rejected(SignatureRejection::MalformedHeader)
        );
    }

    #[test]
    fn test_signature_without_prefix_is_rejected() {
        let signature = compute_elevenlabs_signature(BODY, SECRET, &NOW.to_string()).unwrap();
        let bare = signature.trim_start_matches(SIGNATURE_PREFIX);
        let header = format!("t={},{}", NOW, bare);
        assert_eq!(
            verify(BODY.as_bytes(), Some(&header), Some(SECRET)),
            VerificationResult::Rejected(SignatureRejection::SignatureMismatch)
        );
    }

    #[test]
    fn test_compute_signature_format() {
        let signature = compute_elevenlabs_signature("{}", SECRET, "1").unwrap();
        assert!(signature.starts_with("v0="));
        assert_eq!(signature.len(), 3 + 64);
        assert!(signature[3..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "abcd"));
    }

    #[test]
    fn test_compare_work_independent_of_mismatch_position() {
        let expected = compute_elevenlabs_signature(BODY, SECRET, "1").unwrap();
        let count_for = |provided: &[u8]| {
            let mut inspected = 0usize;
            constant_time_compare_inspecting(expected.as_bytes(), provided, || inspected += 1);
            inspected
        };

        let mut first_differs = expected.clone().into_bytes();
        first_differs[0] = b'x';
        let mut last_differs = expected.clone().into_bytes();
        let last = last_differs.len() - 1;
        last_differs[last] = b'x';
        let mut middle_differs = expected.clone().into_bytes();
        middle_differs[30] = b'x';

        let baseline = count_for(expected.as_bytes());
        assert_eq!(baseline, expected.len());
        assert_eq!(count_for(&first_differs[..]), baseline);
        assert_eq!(count_for(&middle_differs[..]), baseline);
        assert_eq!(count_for(&last_differs[..]), baseline);
    }

    #[test]
    fn test_rejection_codes_are_distinct() {
        let codes = [
            SignatureRejection::MissingHeader.code(),
            SignatureRejection::MissingSecret.code(),
            SignatureRejection::MalformedHeader.code(),
            SignatureRejection::TimestampTooOld.code(),
            SignatureRejection::SignatureMismatch.code(),
        ];
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_into_result() {
        assert_eq!(VerificationResult::Accepted.into_result(), Ok(()));
        assert_eq!(
            VerificationResult::Rejected(SignatureRejection::MissingHeader).into_result(),
            Err(SignatureRejection::MissingHeader)
        );
    }

    #[test]
    fn test_is_signature_verification_enabled() {
        assert!(!is_signature_verification_enabled(&None));
        assert!(!is_signature_verification_enabled(&Some("".to_string())));
        assert!(!is_signature_verification_enabled(&Some("   ".to_string())));
        assert!(is_signature_verification_enabled(&Some(
            "wsec_123".to_string()
        )));
    }
}
