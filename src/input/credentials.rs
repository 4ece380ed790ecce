//! API credential pool
//!
//! Credentials are loaded once, validated for emptiness and uniqueness, and then
//! handed out by position: the job at slot `k` of a batch always receives
//! credential `k`, so jobs running side by side never share a token.

use crate::ConfigError;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Number of leading characters shown when a credential is displayed
const VISIBLE_PREFIX: usize = 20;

/// An opaque API token
///
/// `Debug` and `Display` only ever show the masked form.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token for use in an authorization header
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns a display-safe label for logs and reports
    pub fn masked(&self) -> String {
        mask_token(&self.0)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&self.masked()).finish()
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
    }
}

fn mask_token(token: &str) -> String {
    let char_count = token.chars().count();
    if char_count > VISIBLE_PREFIX {
        let prefix: String = token.chars().take(VISIBLE_PREFIX).collect();
        format!("{}...", prefix)
    } else {
        // Short tokens would be shown whole, so keep only a quarter of them
        let prefix: String = token.chars().take(char_count / 4).collect();
        format!("{}...", prefix)
    }
}

/// Fixed, ordered pool of credentials
#[derive(Debug, Clone)]
pub struct CredentialPool {
    credentials: Vec<Credential>,
}

impl CredentialPool {
    /// Builds a pool from an ordered list of tokens
    ///
    /// # Errors
    ///
    /// * `ConfigError::EmptyCredentials` - no tokens were given
    /// * `ConfigError::DuplicateCredential` - the same token appears twice
    ///   (line numbers are 1-based positions in the list)
    pub fn new<I, S>(tokens: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let credentials: Vec<Credential> = tokens.into_iter().map(Credential::new).collect();

        if credentials.is_empty() {
            return Err(ConfigError::EmptyCredentials);
        }

        let mut seen: HashMap<&str, usize> = HashMap::new();
        for (index, credential) in credentials.iter().enumerate() {
            if let Some(first) = seen.insert(credential.expose(), index) {
                return Err(ConfigError::DuplicateCredential {
                    first: first + 1,
                    duplicate: index + 1,
                });
            }
        }

        Ok(Self { credentials })
    }

    /// Parses a credential file: one token per line, blank lines and `#` comments skipped
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Self::new(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#')),
        )
    }

    /// Loads a credential file from disk
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Number of credentials, which is also the batch size
    pub fn size(&self) -> usize {
        self.credentials.len()
    }

    /// Returns the credential at `index`, if it exists
    pub fn get(&self, index: usize) -> Option<&Credential> {
        self.credentials.get(index)
    }

    /// Returns the masked label of the credential at `index`
    pub fn masked(&self, index: usize) -> Option<String> {
        self.get(index).map(Credential::masked)
    }
}
