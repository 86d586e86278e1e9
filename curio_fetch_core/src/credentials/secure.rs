//! Secure string with automatic memory zeroing
//!
//! Holds API keys, tokens, and passwords. The backing bytes are zeroed on
//! drop and the Debug implementation never prints the value.

use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecureString {
    inner: Vec<u8>,
}

impl SecureString {
    pub fn new(s: impl Into<String>) -> Self {
        Self {
            inner: s.into().into_bytes(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.inner
    }

    /// Borrow the secret as a str.
    pub fn to_str(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.inner)
    }

    /// Copy the secret into a plain String.
    ///
    /// The copy is not zeroed on drop; keep its lifetime short.
    pub fn expose_secret(&self) -> String {
        String::from_utf8_lossy(&self.inner).into_owned()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Constant-time comparison
    pub fn constant_time_eq(&self, other: &Self) -> bool {
        if self.inner.len() != other.inner.len() {
            return false;
        }

        let mut result = 0u8;
        for (a, b) in self.inner.iter().zip(other.inner.iter()) {
            result |= a ^ b;
        }
        result == 0
    }
}

impl From<String> for SecureString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecureString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl fmt::Debug for SecureString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecureString(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_never_leaks() {
        let secret = SecureString::new("hunter2");
        let debug = format!("{secret:?}");
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_constant_time_eq() {
        let a = SecureString::new("same");
        let b = SecureString::new("same");
        let c = SecureString::new("different");

        assert!(a.constant_time_eq(&b));
        assert!(!a.constant_time_eq(&c));
    }

    #[test]
    fn test_expose_round_trip() {
        let secret = SecureString::new("api-key-123");
        assert_eq!(secret.expose_secret(), "api-key-123");
        assert_eq!(secret.to_str().unwrap(), "api-key-123");
    }
}
