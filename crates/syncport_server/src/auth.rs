//! Shared-secret authentication.
//!
//! The orchestrator passes the secret as the `secret` query parameter. The
//! comparison runs over HMAC-SHA256 tags under a per-process random key, so it
//! takes the same time whatever the provided value looks like.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Query parameter carrying the secret.
pub const SECRET_PARAM: &str = "secret";

/// A configured shared secret.
#[derive(Clone)]
pub struct SharedSecret {
    key: [u8; 16],
    expected: Vec<u8>,
}

impl SharedSecret {
    /// Creates a validator for `secret`.
    pub fn new(secret: &str) -> Self {
        let key = *Uuid::new_v4().as_bytes();
        let expected = tag(&key, secret.as_bytes()).unwrap_or_default();
        Self { key, expected }
    }

    /// Returns true if `provided` matches the configured secret.
    pub fn verify(&self, provided: Option<&str>) -> bool {
        let Some(provided) = provided else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(&self.key) else {
            return false;
        };
        mac.update(provided.as_bytes());
        mac.verify_slice(&self.expected).is_ok()
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SharedSecret(<redacted>)")
    }
}

fn tag(key: &[u8], data: &[u8]) -> Option<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key).ok()?;
    mac.update(data);
    Some(mac.finalize().into_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_only_the_secret() {
        let secret = SharedSecret::new("shared-secret");

        assert!(secret.verify(Some("shared-secret")));
        assert!(!secret.verify(Some("shared-secre")));
        assert!(!secret.verify(Some("shared-secret ")));
        assert!(!secret.verify(Some("")));
        assert!(!secret.verify(None));
    }

    #[test]
    fn debug_is_redacted() {
        let secret = SharedSecret::new("hunter2");
        assert!(!format!("{secret:?}").contains("hunter2"));
    }
}
