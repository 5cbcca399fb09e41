//! Failure classification for chain and protocol errors.
//!
//! Everything the capability layer can throw — provider errors, protocol
//! reverts, malformed responses, timeouts — is funneled through
//! [`classify`] before it reaches a caller. The result is a
//! [`ClassifiedError`] carrying an [`ErrorKind`], a retryability flag and a
//! backoff hint, so callers never have to pattern-match raw error strings
//! themselves.
//!
//! Classification walks an ordered rule table; the first matching rule
//! wins. Unmatched input falls back to [`ErrorKind::Unknown`],
//! non-retryable. The function is total: it never panics, whatever the
//! input looks like.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Ceiling for exponential backoff suggestions.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Category of a classified failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Sender cannot cover value + fees on the source chain.
    InsufficientFunds,
    /// Transaction ran out of gas or the gas limit was too low.
    InsufficientGas,
    /// The user declined a wallet prompt, or an action on their side
    /// (e.g. an approval) is still outstanding.
    UserRejected,
    /// A network round trip exceeded its deadline.
    NetworkTimeout,
    /// The RPC endpoint refused or dropped the connection.
    RpcUnavailable,
    /// Nonce collision with another in-flight transaction.
    NonceConflict,
    /// The contract reverted; carries the decoded reason when one was
    /// present in the raw error.
    ContractRevert(String),
    /// No peer contract is configured for the destination endpoint.
    PeerNotConfigured,
    /// The quoted fee was no longer sufficient at submission time.
    QuoteStale,
    /// Nothing in the rule table matched.
    Unknown,
}

impl ErrorKind {
    /// Whether recovering needs a new user action (re-approving a prompt,
    /// funding the account) rather than a plain network retry.
    pub fn requires_user_action(&self) -> bool {
        matches!(
            self,
            Self::UserRejected | Self::InsufficientFunds | Self::InsufficientGas
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientFunds => write!(f, "InsufficientFunds"),
            Self::InsufficientGas => write!(f, "InsufficientGas"),
            Self::UserRejected => write!(f, "UserRejected"),
            Self::NetworkTimeout => write!(f, "NetworkTimeout"),
            Self::RpcUnavailable => write!(f, "RpcUnavailable"),
            Self::NonceConflict => write!(f, "NonceConflict"),
            Self::ContractRevert(reason) => write!(f, "ContractRevert({reason})"),
            Self::PeerNotConfigured => write!(f, "PeerNotConfigured"),
            Self::QuoteStale => write!(f, "QuoteStale"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// A normalized failure with retry guidance.
///
/// Immutable once created. `raw_cause` preserves the stringified original
/// error for logging and support; callers should branch on `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    /// Human-readable description, suitable for surfacing to a user.
    pub message: String,
    /// Whether an automatic retry (without new user action) can succeed.
    pub retryable: bool,
    /// How many automatic retries the classifier recommends at most.
    pub max_retries: u32,
    /// Base delay for exponential backoff; `None` when retrying is not
    /// delay-sensitive (or not recommended at all).
    pub base_delay: Option<Duration>,
    /// Stringified original failure.
    pub raw_cause: String,
}

impl ClassifiedError {
    /// Builds a classified error directly from a known kind, applying the
    /// same retry policy the rule table would.
    pub fn from_kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        let (retryable, max_retries, base_delay) = policy_for(&kind);
        Self {
            kind,
            raw_cause: message.clone(),
            message,
            retryable,
            max_retries,
            base_delay,
        }
    }

    /// Suggested delay before retry number `attempt` (zero-based):
    /// `base * 2^attempt`, capped at 30 seconds.
    pub fn suggested_delay(&self, attempt: u32) -> Option<Duration> {
        let base = self.base_delay?;
        let factor = 2u32.saturating_pow(attempt);
        Some(base.checked_mul(factor).map_or(MAX_BACKOFF, |delay| delay.min(MAX_BACKOFF)))
    }
}

/// Kind template for one classification rule. Mirrors [`ErrorKind`] minus
/// payloads, so the table can live in a `const`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleKind {
    InsufficientFunds,
    InsufficientGas,
    UserRejected,
    NetworkTimeout,
    RpcUnavailable,
    NonceConflict,
    ContractRevert,
    PeerNotConfigured,
    QuoteStale,
}

struct Rule {
    kind: RuleKind,
    /// Lowercase substrings; any hit matches the rule.
    needles: &'static [&'static str],
    retryable: bool,
    max_retries: u32,
    base_delay_ms: Option<u64>,
}

/// Ordered classification table; first match wins. Specific user/funds
/// conditions come before the generic revert catch-all.
const RULES: &[Rule] = &[
    Rule {
        kind: RuleKind::UserRejected,
        needles: &[
            "user rejected",
            "user denied",
            "rejected by user",
            "request rejected",
            "approval required",
        ],
        retryable: false,
        max_retries: 0,
        base_delay_ms: None,
    },
    Rule {
        kind: RuleKind::InsufficientFunds,
        needles: &[
            "insufficient funds",
            "insufficient balance",
            "transfer amount exceeds balance",
        ],
        retryable: false,
        max_retries: 0,
        base_delay_ms: None,
    },
    Rule {
        kind: RuleKind::InsufficientGas,
        needles: &[
            "out of gas",
            "intrinsic gas too low",
            "gas required exceeds allowance",
            "insufficient gas",
        ],
        retryable: false,
        max_retries: 0,
        base_delay_ms: None,
    },
    Rule {
        kind: RuleKind::NonceConflict,
        needles: &[
            "nonce too low",
            "nonce too high",
            "replacement transaction underpriced",
            "already known",
        ],
        retryable: true,
        max_retries: 3,
        base_delay_ms: Some(500),
    },
    Rule {
        kind: RuleKind::QuoteStale,
        needles: &[
            "insufficient fee",
            "fee too low",
            "quote stale",
            "not enough native for fees",
        ],
        retryable: true,
        max_retries: 2,
        base_delay_ms: Some(250),
    },
    Rule {
        kind: RuleKind::PeerNotConfigured,
        needles: &["nopeer", "no peer", "peer not set", "onlypeer"],
        retryable: false,
        max_retries: 0,
        base_delay_ms: None,
    },
    Rule {
        kind: RuleKind::NetworkTimeout,
        needles: &["timeout", "timed out", "deadline exceeded"],
        retryable: true,
        max_retries: 3,
        base_delay_ms: Some(1000),
    },
    Rule {
        kind: RuleKind::RpcUnavailable,
        needles: &[
            "connection refused",
            "connection reset",
            "econnrefused",
            "rate limit",
            "too many requests",
            "service unavailable",
            "bad gateway",
        ],
        retryable: true,
        max_retries: 5,
        base_delay_ms: Some(2000),
    },
    Rule {
        kind: RuleKind::ContractRevert,
        needles: &["execution reverted", "revert"],
        retryable: false,
        max_retries: 0,
        base_delay_ms: None,
    },
];

/// Retry policy the rule table assigns to a kind; `Unknown` and anything
/// user-actionable is never auto-retried.
fn policy_for(kind: &ErrorKind) -> (bool, u32, Option<Duration>) {
    let template = match kind {
        ErrorKind::InsufficientFunds => RuleKind::InsufficientFunds,
        ErrorKind::InsufficientGas => RuleKind::InsufficientGas,
        ErrorKind::UserRejected => RuleKind::UserRejected,
        ErrorKind::NetworkTimeout => RuleKind::NetworkTimeout,
        ErrorKind::RpcUnavailable => RuleKind::RpcUnavailable,
        ErrorKind::NonceConflict => RuleKind::NonceConflict,
        ErrorKind::ContractRevert(_) => RuleKind::ContractRevert,
        ErrorKind::PeerNotConfigured => RuleKind::PeerNotConfigured,
        ErrorKind::QuoteStale => RuleKind::QuoteStale,
        ErrorKind::Unknown => return (false, 0, None),
    };

    let rule = RULES.iter().find(|rule| rule.kind == template);

    match rule {
        Some(rule) => (
            rule.retryable,
            rule.max_retries,
            rule.base_delay_ms.map(Duration::from_millis),
        ),
        None => (false, 0, None),
    }
}

/// Classifies any error, walking its `source()` chain so wrapped causes
/// still match. Never panics.
pub fn classify(raw: &dyn std::error::Error) -> ClassifiedError {
    let mut haystack = raw.to_string();
    let mut cause = raw.source();
    while let Some(err) = cause {
        haystack.push_str(": ");
        haystack.push_str(&err.to_string());
        cause = err.source();
    }
    classify_message(&haystack)
}

/// Classifies a raw failure message against the rule table.
pub fn classify_message(raw: &str) -> ClassifiedError {
    // ASCII lowercasing keeps byte offsets aligned with `raw`, which
    // `revert_reason` relies on to slice the original message. All
    // needles are ASCII, so nothing is lost.
    let lowered = raw.to_ascii_lowercase();

    for rule in RULES {
        if rule.needles.iter().any(|needle| lowered.contains(needle)) {
            let kind = materialize(rule.kind, raw, &lowered);
            return ClassifiedError {
                message: display_message(&kind, raw),
                kind,
                retryable: rule.retryable,
                max_retries: rule.max_retries,
                base_delay: rule.base_delay_ms.map(Duration::from_millis),
                raw_cause: raw.to_string(),
            };
        }
    }

    ClassifiedError {
        kind: ErrorKind::Unknown,
        message: raw.to_string(),
        retryable: false,
        max_retries: 0,
        base_delay: None,
        raw_cause: raw.to_string(),
    }
}

fn materialize(kind: RuleKind, raw: &str, lowered: &str) -> ErrorKind {
    match kind {
        RuleKind::InsufficientFunds => ErrorKind::InsufficientFunds,
        RuleKind::InsufficientGas => ErrorKind::InsufficientGas,
        RuleKind::UserRejected => ErrorKind::UserRejected,
        RuleKind::NetworkTimeout => ErrorKind::NetworkTimeout,
        RuleKind::RpcUnavailable => ErrorKind::RpcUnavailable,
        RuleKind::NonceConflict => ErrorKind::NonceConflict,
        RuleKind::PeerNotConfigured => ErrorKind::PeerNotConfigured,
        RuleKind::QuoteStale => ErrorKind::QuoteStale,
        RuleKind::ContractRevert => ErrorKind::ContractRevert(revert_reason(raw, lowered)),
    }
}

/// Pulls the human reason out of an `execution reverted: <reason>` style
/// message; falls back to the whole message.
fn revert_reason(raw: &str, lowered: &str) -> String {
    const MARKER: &str = "execution reverted";

    let Some(index) = lowered.find(MARKER) else {
        return raw.trim().to_string();
    };

    // `index` is a byte offset into the ASCII-lowercased copy; the checked
    // slice keeps this total even if a caller hands in a haystack whose
    // offsets drifted from `raw`.
    let Some(tail) = raw.get(index + MARKER.len()..) else {
        return raw.trim().to_string();
    };
    let tail = tail.trim_start_matches([':', ' ']);
    if tail.is_empty() {
        raw.trim().to_string()
    } else {
        tail.trim().to_string()
    }
}

fn display_message(kind: &ErrorKind, raw: &str) -> String {
    match kind {
        ErrorKind::InsufficientFunds => "insufficient funds to cover value and fees".to_string(),
        ErrorKind::InsufficientGas => "transaction gas was insufficient".to_string(),
        ErrorKind::UserRejected => "the request was rejected or needs user approval".to_string(),
        ErrorKind::NetworkTimeout => "network request timed out".to_string(),
        ErrorKind::RpcUnavailable => "RPC endpoint unavailable".to_string(),
        ErrorKind::NonceConflict => "nonce conflict with an in-flight transaction".to_string(),
        ErrorKind::ContractRevert(reason) => format!("contract reverted: {reason}"),
        ErrorKind::PeerNotConfigured => {
            "no peer configured for the destination endpoint".to_string()
        }
        ErrorKind::QuoteStale => "fee quote went stale before submission".to_string(),
        ErrorKind::Unknown => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("rpc call failed")]
    struct Outer {
        #[source]
        source: Inner,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("request timed out after 30s")]
    struct Inner;

    #[test]
    fn classifies_timeout_as_retryable() {
        let classified = classify_message("request timed out after 30s");

        assert_eq!(classified.kind, ErrorKind::NetworkTimeout);
        assert!(classified.retryable);
        assert!(classified.suggested_delay(0).unwrap() > Duration::ZERO);
    }

    #[test]
    fn classifies_through_source_chain() {
        let err = Outer { source: Inner };

        let classified = classify(&err);

        assert_eq!(classified.kind, ErrorKind::NetworkTimeout);
    }

    #[test]
    fn classifies_insufficient_funds_as_non_retryable_user_action() {
        let classified =
            classify_message("insufficient funds for gas * price + value: have 0 want 21000");

        assert_eq!(classified.kind, ErrorKind::InsufficientFunds);
        assert!(!classified.retryable);
        assert!(classified.kind.requires_user_action());
    }

    #[test]
    fn classifies_nonce_conflicts() {
        let classified = classify_message("nonce too low: next nonce 42, tx nonce 41");

        assert_eq!(classified.kind, ErrorKind::NonceConflict);
        assert!(classified.retryable);
    }

    #[test]
    fn extracts_revert_reason() {
        let classified = classify_message("execution reverted: ERC721: caller is not token owner");

        assert_eq!(
            classified.kind,
            ErrorKind::ContractRevert("ERC721: caller is not token owner".to_string())
        );
        assert!(!classified.retryable);
    }

    #[test]
    fn bare_revert_keeps_whole_message_as_reason() {
        let classified = classify_message("execution reverted");

        let ErrorKind::ContractRevert(reason) = &classified.kind else {
            panic!("expected ContractRevert, got {:?}", classified.kind);
        };
        assert_eq!(reason, "execution reverted");
    }

    #[test]
    fn revert_after_non_ascii_prefix_does_not_panic() {
        // U+0130 grows by a byte under full Unicode lowercasing, which
        // would desynchronize byte offsets between the haystack and the
        // original message.
        let classified = classify_message("\u{130}execution reverted");

        assert!(matches!(classified.kind, ErrorKind::ContractRevert(_)));
    }

    #[test]
    fn revert_reason_survives_non_ascii_text() {
        let classified =
            classify_message("İİİ execution reverted: Ünicode tökens not allowed");

        assert_eq!(
            classified.kind,
            ErrorKind::ContractRevert("Ünicode tökens not allowed".to_string())
        );
    }

    #[test]
    fn specific_rules_win_over_generic_revert() {
        // A revert whose reason names a funds problem classifies as the
        // funds problem, not as a generic revert.
        let classified =
            classify_message("execution reverted: ERC20: transfer amount exceeds balance");

        assert_eq!(classified.kind, ErrorKind::InsufficientFunds);
    }

    #[test]
    fn classifies_missing_peer() {
        let classified = classify_message("execution reverted: NoPeer(30184)");

        // UserRejected/funds rules don't match, peer rule fires before the
        // generic revert catch-all.
        assert_eq!(classified.kind, ErrorKind::PeerNotConfigured);
    }

    #[test]
    fn unmatched_input_falls_back_to_unknown() {
        let classified = classify_message("zorp gleeb");

        assert_eq!(classified.kind, ErrorKind::Unknown);
        assert!(!classified.retryable);
        assert_eq!(classified.suggested_delay(0), None);
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let classified = classify_message("request timed out");
        let base = classified.base_delay.unwrap();

        assert_eq!(classified.suggested_delay(0), Some(base));
        assert_eq!(classified.suggested_delay(1), Some(base * 2));
        assert_eq!(classified.suggested_delay(2), Some(base * 4));
        assert_eq!(classified.suggested_delay(30), Some(MAX_BACKOFF));
        // Absurd attempt counts must not overflow.
        assert_eq!(classified.suggested_delay(u32::MAX), Some(MAX_BACKOFF));
    }

    #[test]
    fn from_kind_applies_table_policy() {
        let timeout = ClassifiedError::from_kind(ErrorKind::NetworkTimeout, "quote timed out");
        assert!(timeout.retryable);
        assert_eq!(timeout.max_retries, 3);

        let peer = ClassifiedError::from_kind(ErrorKind::PeerNotConfigured, "no peer for 30184");
        assert!(!peer.retryable);

        let unknown = ClassifiedError::from_kind(ErrorKind::Unknown, "???");
        assert!(!unknown.retryable);
        assert_eq!(unknown.base_delay, None);
    }

    proptest! {
        #[test]
        fn classify_is_total_and_always_sets_a_kind(raw in ".{0,256}") {
            let classified = classify_message(&raw);

            // Display never panics and the kind is always materialized.
            let _ = classified.to_string();
            prop_assert!(!classified.retryable || classified.base_delay.is_some() || classified.max_retries > 0);
        }

        #[test]
        fn revert_messages_classify_under_any_prefix(prefix in "\\PC{0,16}") {
            // Must never panic, whatever surrounds the marker.
            let classified = classify_message(&format!("{prefix}execution reverted: fail"));

            let _ = classified.to_string();
        }

        #[test]
        fn classify_is_idempotent(raw in ".{0,256}") {
            prop_assert_eq!(classify_message(&raw), classify_message(&raw));
        }

        #[test]
        fn retryable_errors_always_suggest_a_delay_under_the_cap(
            raw in ".{0,256}",
            attempt in 0u32..64,
        ) {
            let classified = classify_message(&raw);
            if let Some(delay) = classified.suggested_delay(attempt) {
                prop_assert!(delay <= MAX_BACKOFF);
            }
        }
    }
}
