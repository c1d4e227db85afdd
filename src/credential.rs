//! The API key used to authenticate with the provider.

use std::fmt;

use crate::{Error, Result};

/// An opaque bearer credential.
///
/// The key is trimmed on construction and never printed in full by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Create a credential from user input.
    ///
    /// # Errors
    ///
    /// Returns an authentication error if the key is empty after trimming.
    pub fn new(key: impl AsRef<str>) -> Result<Self> {
        let key = key.as_ref().trim();
        if key.is_empty() {
            return Err(Error::authentication("API key is empty"));
        }
        Ok(Self(key.to_string()))
    }

    /// Returns the raw key, for the request header and the durable store only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tail: String = self
            .0
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        write!(f, "Credential(...{tail})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_input() {
        let credential = Credential::new("  AIzaSyExample  ").unwrap();
        assert_eq!(credential.expose(), "AIzaSyExample");
    }

    #[test]
    fn rejects_blank() {
        assert!(Credential::new("   ").unwrap_err().is_authentication());
    }

    #[test]
    fn debug_redacts() {
        let credential = Credential::new("AIzaSySecretKey1234").unwrap();
        let debug = format!("{credential:?}");
        assert_eq!(debug, "Credential(...1234)");
        assert!(!debug.contains("Secret"));
    }
}
