//! In-memory secret material.

use std::fmt;

use zeroize::Zeroizing;

/// Secret bytes that are wiped on drop and never printed.
///
/// Holds signing keys, certificate passwords and private keys once they have been
/// loaded from their source. There is no way to recover the path or environment
/// variable a secret came from.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(Zeroizing<Vec<u8>>);

impl Secret {
    /// Wraps raw secret bytes.
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(Zeroizing::new(bytes))
    }

    /// Returns the secret bytes.
    #[must_use]
    pub fn expose(&self) -> &[u8] {
        &self.0
    }

    /// Returns the secret as UTF-8 text, if it is valid UTF-8.
    #[must_use]
    pub fn expose_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    /// Drops trailing ASCII whitespace, such as the newline editors append to key files.
    #[must_use]
    pub fn trim_end(mut self) -> Self {
        let len = self.0.trim_ascii_end().len();
        self.0.truncate(len);
        self
    }

    /// Returns `true` when the secret holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self::new(value.as_bytes().to_vec())
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self::new(value.into_bytes())
    }
}

impl From<Vec<u8>> for Secret {
    fn from(value: Vec<u8>) -> Self {
        Self::new(value)
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret([REDACTED; {} bytes])", self.0.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_never_prints_contents() {
        let secret = Secret::from("192006250b4c09247ec02edce69f6a2d");
        let debug = format!("{secret:?}");
        assert!(!debug.contains("1920"));
        assert!(debug.contains("REDACTED"));
        assert!(debug.contains("32 bytes"));
    }

    #[test]
    fn test_trim_end() {
        assert_eq!(Secret::from("key\r\n").trim_end().expose(), b"key");
        assert_eq!(Secret::from(" key \t").trim_end().expose(), b" key");
        assert!(Secret::from("\n").trim_end().is_empty());
    }

    #[test]
    fn test_expose_str() {
        assert_eq!(Secret::from("key").expose_str(), Some("key"));
        assert_eq!(Secret::new(vec![0xff, 0xfe]).expose_str(), None);
    }

    #[test]
    fn test_is_empty() {
        assert!(Secret::new(Vec::new()).is_empty());
        assert!(!Secret::from("x").is_empty());
    }
}
