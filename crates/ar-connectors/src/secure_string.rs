//! Credential wrapper with automatic memory zeroization.
//!
//! Both API credentials (the inventory token and the MDM account password)
//! ride through configuration as `SecureString`, so they never appear in
//! `Debug` output and are cleared from memory on drop.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::Zeroizing;

/// A string whose contents are zeroized when dropped.
///
/// # Example
///
/// ```
/// use ar_connectors::SecureString;
///
/// let secret = SecureString::new("api-token".to_string());
/// assert_eq!(secret.expose_secret(), "api-token");
/// ```
#[derive(Clone)]
pub struct SecureString(Zeroizing<String>);

impl SecureString {
    /// Wraps a `String`; its memory is zeroized when the wrapper drops.
    pub fn new(s: String) -> Self {
        Self(Zeroizing::new(s))
    }

    /// Exposes the secret for use. Avoid copying the returned value; copies
    /// are not zeroized.
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
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
        let s = String::deserialize(deserializer)?;
        Ok(SecureString::new(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expose_secret() {
        let secret = SecureString::new("my-secret-key".to_string());
        assert_eq!(secret.expose_secret(), "my-secret-key");
    }

    #[test]
    fn test_debug_and_display_redacted() {
        let secret = SecureString::new("super-secret".to_string());
        assert!(!format!("{:?}", secret).contains("super-secret"));
        assert!(!format!("{}", secret).contains("super-secret"));
    }

    #[test]
    fn test_empty_default() {
        let secret = SecureString::default();
        assert!(secret.is_empty());
        assert_eq!(secret.len(), 0);
    }

    #[test]
    fn test_serde_round_trip() {
        let original = SecureString::new("serializable".to_string());
        let json = serde_json::to_string(&original).unwrap();
        assert!(json.contains("serializable"));
        let back: SecureString = serde_json::from_str(&json).unwrap();
        assert_eq!(back.expose_secret(), "serializable");
    }
}
