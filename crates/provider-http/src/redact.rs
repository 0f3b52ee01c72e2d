//! Redaction helpers for anything that may end up in a caller-facing message or a log line.
//!
//! Provider error bodies sometimes echo request headers or query strings back. Every message that
//! leaves an adapter goes through [`redact_secrets`] with the credentials the adapter holds.

use url::Url;

/// Replacement used for every redacted secret.
pub const REDACTED: &str = "[REDACTED]";

#[must_use]
pub fn redact_url(url: &Url) -> String {
    let mut u = url.clone();
    // Best-effort: drop credentials + query + fragment.
    let _ = u.set_username("");
    let _ = u.set_password(None);
    u.set_query(None);
    u.set_fragment(None);
    u.to_string()
}

#[must_use]
pub fn sanitize_reqwest_error(e: &reqwest::Error) -> String {
    let mut msg = e.to_string();
    if let Some(u) = e.url() {
        msg = msg.replace(u.as_str(), &redact_url(u));
    }
    msg
}

/// Replace every occurrence of each non-empty secret in `message` with [`REDACTED`].
///
/// Longer secrets go first so a secret that contains another is never left half-redacted.
#[must_use]
pub fn redact_secrets<S: AsRef<str>>(message: &str, secrets: &[S]) -> String {
    let mut ordered: Vec<&str> = secrets
        .iter()
        .map(AsRef::as_ref)
        .filter(|s| !s.is_empty())
        .collect();
    ordered.sort_by_key(|s| std::cmp::Reverse(s.len()));

    let mut out = message.to_string();
    for secret in ordered {
        out = out.replace(secret, REDACTED);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redact_url_drops_query_and_userinfo() {
        let url = Url::parse("https://user:pw@api.example.com/v2/user?teamId=t&token=abc#frag")
            .expect("url");
        assert_eq!(redact_url(&url), "https://api.example.com/v2/user");
    }

    #[test]
    fn redact_secrets_replaces_every_occurrence() {
        let msg = "401: bad token tok_12345 (Authorization: Bearer tok_12345)";
        let out = redact_secrets(msg, &["tok_12345"]);
        assert!(!out.contains("tok_12345"));
        assert_eq!(out.matches(REDACTED).count(), 2);
    }

    #[test]
    fn short_secrets_are_redacted_too() {
        let out = redact_secrets("401: token 'k9' rejected", &["k9"]);
        assert_eq!(out, "401: token '[REDACTED]' rejected");
    }

    #[test]
    fn empty_secrets_are_skipped_and_longest_goes_first() {
        let out = redact_secrets("bad abc123", &["", "abc", "abc123"]);
        assert_eq!(out, "bad [REDACTED]");
    }
}
