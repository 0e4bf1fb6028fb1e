//! Credential wrapper that zeroizes its memory on drop.
//!
//! Connector passwords and data-source credentials travel through the
//! controller as `SecureString` so they never show up in `Debug` output or
//! log lines.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::Zeroizing;

/// A string holding a secret, cleared from memory when dropped.
///
/// # Example
///
/// ```
/// use dsc_connectors::SecureString;
///
/// let password = SecureString::new("changeit".to_string());
/// assert_eq!(password.expose_secret(), "changeit");
/// assert_eq!(format!("{:?}", password), "SecureString([REDACTED])");
/// ```
#[derive(Clone)]
pub struct SecureString(Zeroizing<String>);

impl SecureString {
    /// Wraps `s`; its buffer is zeroized when the wrapper is dropped.
    pub fn new(s: String) -> Self {
        Self(Zeroizing::new(s))
    }

    /// Borrows the secret. Copies made from the returned slice are not zeroized.
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for SecureString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecureString {
    fn from(s: &str) -> Self {
        Self::new(s.to_string())
    }
}

impl Default for SecureString {
    fn default() -> Self {
        Self::new(String::new())
    }
}

impl fmt::Debug for SecureString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecureString([REDACTED])")
    }
}

impl fmt::Display for SecureString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl PartialEq for SecureString {
    fn eq(&self, other: &Self) -> bool {
        use subtle::ConstantTimeEq;
        self.0.as_bytes().ct_eq(other.0.as_bytes()).into()
    }
}

impl Eq for SecureString {}

impl Serialize for SecureString {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SecureString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecureString::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_is_redacted_in_formatting() {
        let password = SecureString::from("admin-password");
        assert!(!format!("{:?}", password).contains("admin-password"));
        assert_eq!(password.to_string(), "[REDACTED]");
        assert_eq!(password.expose_secret(), "admin-password");
    }

    #[test]
    fn test_equality_compares_contents() {
        assert_eq!(SecureString::from("same"), SecureString::from("same"));
        assert_ne!(SecureString::from("same"), SecureString::from("other"));
    }

    #[test]
    fn test_default_is_empty() {
        assert!(SecureString::default().is_empty());
        assert!(!SecureString::from("pw").is_empty());
    }

    #[test]
    fn test_deserializes_from_plain_string() {
        let secret: SecureString = serde_json::from_str("\"password\"").unwrap();
        assert_eq!(secret.expose_secret(), "password");
        assert_eq!(serde_json::to_string(&secret).unwrap(), "\"password\"");
    }
}
