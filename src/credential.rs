use base64::{Engine, engine::general_purpose};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Credential
///
/// The bearer value carried in the `hdb-token` header. It is the standard base64
/// encoding of `username:password`, passed verbatim to the record store's Basic auth.
/// Reversible by construction: this is an encoding, not a secret.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

/// encode
///
/// Derives the credential for a username/password pair. Never fails.
pub fn encode(username: &str, password: &str) -> Credential {
    Credential(general_purpose::STANDARD.encode(format!("{username}:{password}")))
}

impl Credential {
    /// Wraps a token received from a client without inspecting it.
    pub fn from_token(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value for the store's `authorization` header.
    pub fn basic_auth(&self) -> String {
        format!("Basic {}", self.0)
    }

    /// decode
    ///
    /// Recovers the `(username, password)` pair. Returns `None` when the token is not
    /// valid base64, not UTF-8, or has no `:` separator. The username ends at the first `:`.
    pub fn decode(&self) -> Option<(String, String)> {
        let bytes = general_purpose::STANDARD.decode(&self.0).ok()?;
        let text = String::from_utf8(bytes).ok()?;
        let (username, password) = text.split_once(':')?;
        Some((username.to_string(), password.to_string()))
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Debug output must not leak the reversible token into logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_username_and_password_as_base64() {
        assert_eq!(encode("alice", "pw1").as_str(), "YWxpY2U6cHcx");
    }

    #[test]
    fn encoding_is_deterministic() {
        assert_eq!(encode("bob", "hunter2"), encode("bob", "hunter2"));
    }

    #[test]
    fn differing_pairs_yield_differing_credentials() {
        let pairs = [("alice", "pw1"), ("alice", "pw2"), ("alicE", "pw1"), ("al", "ice:pw1")];
        for (i, a) in pairs.iter().enumerate() {
            for b in pairs.iter().skip(i + 1) {
                assert_ne!(encode(a.0, a.1), encode(b.0, b.1), "{a:?} vs {b:?}");
            }
        }
    }

    #[test]
    fn decode_reverses_encode() {
        let credential = encode("carol", "p:a:ss");
        assert_eq!(
            credential.decode(),
            Some(("carol".to_string(), "p:a:ss".to_string()))
        );
    }

    #[test]
    fn decode_rejects_garbage() {
        assert_eq!(Credential::from_token("not base64!").decode(), None);
        // "nocolon" base64-encoded
        assert_eq!(Credential::from_token("bm9jb2xvbg==").decode(), None);
    }

    #[test]
    fn basic_auth_prefixes_the_token() {
        assert_eq!(encode("alice", "pw1").basic_auth(), "Basic YWxpY2U6cHcx");
    }

    #[test]
    fn debug_hides_the_token() {
        assert_eq!(format!("{:?}", encode("alice", "pw1")), "Credential(***)");
    }
}
