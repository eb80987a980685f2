// Subject Identity
//
// A tracked subject is either an authenticated member or an anonymous
// guest. A connection maps to exactly one identity at a time: once it
// authenticates, the tracker removes its guest record so the subject is
// not counted twice.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Key namespace for member records.
pub const MEMBER_KEY_PREFIX: &str = "member:";
/// Key namespace for guest records.
pub const GUEST_KEY_PREFIX: &str = "guest:";

/// Guest fingerprints are truncated to this many hex characters.
const FINGERPRINT_LEN: usize = 16;

/// Stable id of an authenticated member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberId(pub u64);

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The subject being tracked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Identity {
    Member(MemberId),
    Guest(String),
}

impl Identity {
    /// Store key for this subject, e.g. `member:42` or `guest:a1b2c3d4e5f6a1b2`.
    pub fn key(&self) -> String {
        match self {
            Self::Member(id) => format!("{}{}", MEMBER_KEY_PREFIX, id),
            Self::Guest(fingerprint) => format!("{}{}", GUEST_KEY_PREFIX, fingerprint),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Member(id) => write!(f, "member {}", id),
            Self::Guest(fingerprint) => write!(f, "guest {}", fingerprint),
        }
    }
}

/// Derive a guest fingerprint for a connection.
///
/// Prefers the transport's session token when one exists; otherwise hashes
/// client ip and user-agent into a fixed-length string. Guests behind the
/// same NAT with the same user-agent collide into one fingerprint — an
/// accepted approximation, the count treats them as a single guest.
pub fn derive_fingerprint(
    session_token: Option<&str>,
    client_ip: &str,
    user_agent: &str,
) -> String {
    if let Some(token) = session_token {
        if !token.trim().is_empty() {
            return token.to_string();
        }
    }
    let digest = Sha256::digest(format!("{}:{}", client_ip, user_agent).as_bytes());
    hex::encode(digest)[..FINGERPRINT_LEN].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_key() {
        assert_eq!(Identity::Member(MemberId(42)).key(), "member:42");
    }

    #[test]
    fn test_guest_key() {
        let identity = Identity::Guest("a1b2c3d4e5f6a1b2".to_string());
        assert_eq!(identity.key(), "guest:a1b2c3d4e5f6a1b2");
    }

    #[test]
    fn test_fingerprint_is_stable_and_fixed_length() {
        let a = derive_fingerprint(None, "203.0.113.7", "Mozilla/5.0");
        let b = derive_fingerprint(None, "203.0.113.7", "Mozilla/5.0");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_fingerprint_differs_by_input() {
        let a = derive_fingerprint(None, "203.0.113.7", "Mozilla/5.0");
        let b = derive_fingerprint(None, "203.0.113.8", "Mozilla/5.0");
        let c = derive_fingerprint(None, "203.0.113.7", "curl/8.0");
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_fingerprint_prefers_session_token() {
        let fp = derive_fingerprint(Some("sess-abc123"), "203.0.113.7", "Mozilla/5.0");
        assert_eq!(fp, "sess-abc123");
    }

    #[test]
    fn test_fingerprint_ignores_blank_session_token() {
        let fp = derive_fingerprint(Some("   "), "203.0.113.7", "Mozilla/5.0");
        assert_eq!(fp.len(), 16);
    }
}
