//! Proxied domain set.
//!
//! The combined set is the fixed default list followed by the user's custom
//! list. Only the custom list is mutable, and every mutation is persisted
//! before it is reported back.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::store::{persist_with_retry, SettingsStore};

/// Domains proxied for every user. Not editable.
pub const DEFAULT_PROXIED_DOMAINS: &[&str] = &[
    "trello.com",
    "telegram.org",
    "x.com",
    "gemini.google.com",
    "chatgpt.com",
    "openai.com",
    "youtube.com",
    "googlevideo.com",
    "ytimg.com",
    "twimg.com",
    "pbs.twimg.com",
];

const MAX_DOMAIN_LEN: usize = 253;

static HOSTNAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?)*$")
        .expect("hostname pattern is valid")
});

/// Which list a domain belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Built-in default list.
    Default,
    /// User-owned custom list.
    Custom,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Domain input and membership errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// Nothing left after normalization.
    #[error("domain is empty")]
    Empty,

    /// Not a hostname.
    #[error("invalid domain: {0}")]
    Invalid(String),

    /// Already proxied.
    #[error("domain is already in the {0} list")]
    AlreadyPresent(Origin),
}

impl DomainError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Empty => "domain_empty",
            Self::Invalid(_) => "domain_invalid",
            Self::AlreadyPresent(Origin::Default) => "already_default",
            Self::AlreadyPresent(Origin::Custom) => "already_custom",
        }
    }
}

/// A normalized hostname: lowercase, no scheme, path, port or leading `www.`,
/// with at least two labels.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Domain(String);

impl Domain {
    /// Normalizes user input into a domain.
    ///
    /// ```
    /// use pacgate_core::domains::Domain;
    ///
    /// let d = Domain::parse("https://www.Example.com:8443/path?q=1").unwrap();
    /// assert_eq!(d.as_str(), "example.com");
    /// ```
    pub fn parse(input: &str) -> std::result::Result<Self, DomainError> {
        let trimmed = input.trim();
        let mut host = trimmed.to_ascii_lowercase();

        if let Some(idx) = host.find("://") {
            host.drain(..idx + 3);
        }
        if let Some(idx) = host.find(['/', '?', '#']) {
            host.truncate(idx);
        }
        if let Some(idx) = host.rfind(':') {
            if host[idx + 1..].chars().all(|c| c.is_ascii_digit()) {
                host.truncate(idx);
            }
        }

        let host = host.trim_end_matches('.');
        let host = host.strip_prefix("www.").unwrap_or(host);

        if host.is_empty() {
            return Err(DomainError::Empty);
        }
        // A bare label would match every host under that TLD.
        if host.len() > MAX_DOMAIN_LEN || !host.contains('.') || !HOSTNAME.is_match(host) {
            return Err(DomainError::Invalid(trimmed.to_string()));
        }

        Ok(Self(host.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Domain {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Returns true if `domain` is one of the built-in defaults.
pub fn is_default(domain: &str) -> bool {
    DEFAULT_PROXIED_DOMAINS.contains(&domain)
}

/// Default list plus the persisted custom list.
pub struct DomainSet<S> {
    store: Arc<S>,
    custom: Vec<Domain>,
}

impl<S: SettingsStore> DomainSet<S> {
    /// Loads the custom list from the store.
    ///
    /// A missing key yields an empty list. Stored entries that no longer
    /// normalize, or that duplicate an earlier entry, are skipped.
    pub fn load(store: Arc<S>) -> Result<Self> {
        let stored = store.load_custom_domains()?.unwrap_or_default();
        let mut custom: Vec<Domain> = Vec::with_capacity(stored.len());

        for raw in stored {
            match Domain::parse(&raw) {
                Ok(domain) if is_default(domain.as_str()) || custom.contains(&domain) => {
                    debug!(domain = %domain, "Skipping duplicate stored domain");
                }
                Ok(domain) => custom.push(domain),
                Err(e) => warn!(value = %raw, error = %e, "Skipping invalid stored domain"),
            }
        }

        Ok(Self { store, custom })
    }

    /// The built-in default list.
    pub fn defaults(&self) -> &'static [&'static str] {
        DEFAULT_PROXIED_DOMAINS
    }

    /// The user's custom list, in insertion order.
    pub fn custom(&self) -> &[Domain] {
        &self.custom
    }

    /// Defaults followed by the custom list; input to the PAC generator.
    pub fn combined(&self) -> Vec<String> {
        DEFAULT_PROXIED_DOMAINS
            .iter()
            .map(|d| d.to_string())
            .chain(self.custom.iter().map(|d| d.as_str().to_string()))
            .collect()
    }

    /// Which list already holds `domain`, if any.
    pub fn origin_of(&self, domain: &Domain) -> Option<Origin> {
        if is_default(domain.as_str()) {
            Some(Origin::Default)
        } else if self.custom.contains(domain) {
            Some(Origin::Custom)
        } else {
            None
        }
    }

    /// Normalizes and appends a custom domain, then persists the list.
    pub fn add(&mut self, input: &str) -> Result<Domain> {
        let domain = Domain::parse(input)?;
        if let Some(origin) = self.origin_of(&domain) {
            return Err(DomainError::AlreadyPresent(origin).into());
        }

        self.custom.push(domain.clone());
        if let Err(e) = self.persist() {
            self.custom.pop();
            return Err(e);
        }

        info!(domain = %domain, "Added custom domain");
        Ok(domain)
    }

    /// Removes a custom domain and persists the list.
    ///
    /// Returns whether anything was removed. Defaults are never removed.
    pub fn remove(&mut self, input: &str) -> Result<bool> {
        let domain = Domain::parse(input)?;
        let previous = self.custom.clone();
        self.custom.retain(|d| d != &domain);
        let removed = self.custom.len() != previous.len();

        if let Err(e) = self.persist() {
            self.custom = previous;
            return Err(e);
        }

        if removed {
            info!(domain = %domain, "Removed custom domain");
        } else {
            debug!(domain = %domain, "Domain not in custom list");
        }
        Ok(removed)
    }

    fn persist(&self) -> Result<()> {
        let values: Vec<String> = self.custom.iter().map(|d| d.as_str().to_string()).collect();
        persist_with_retry("custom domains", || self.store.save_custom_domains(&values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::store::MemoryStore;

    fn empty_set() -> DomainSet<MemoryStore> {
        DomainSet::load(Arc::new(MemoryStore::new())).unwrap()
    }

    // ==================== Domain::parse ====================

    #[test]
    fn parse_strips_www() {
        assert_eq!(Domain::parse("www.example.com").unwrap().as_str(), "example.com");
    }

    #[test]
    fn parse_strips_scheme_path_and_port() {
        let d = Domain::parse("  HTTPS://Sub.Example.COM:443/a/b?c#d ").unwrap();
        assert_eq!(d.as_str(), "sub.example.com");
    }

    #[test]
    fn parse_strips_trailing_dot() {
        assert_eq!(Domain::parse("example.com.").unwrap().as_str(), "example.com");
    }

    #[test]
    fn parse_rejects_empty() {
        assert_eq!(Domain::parse("").unwrap_err(), DomainError::Empty);
        assert_eq!(Domain::parse("   ").unwrap_err(), DomainError::Empty);
        assert_eq!(Domain::parse("https://").unwrap_err(), DomainError::Empty);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(
            Domain::parse("exa mple.com"),
            Err(DomainError::Invalid(_))
        ));
        assert!(matches!(Domain::parse("-bad.com"), Err(DomainError::Invalid(_))));
        assert!(matches!(
            Domain::parse("quote\".com"),
            Err(DomainError::Invalid(_))
        ));
    }

    #[test]
    fn parse_rejects_single_label() {
        assert!(matches!(Domain::parse("www.com"), Err(DomainError::Invalid(_))));
        assert!(matches!(Domain::parse("com"), Err(DomainError::Invalid(_))));
        assert!(matches!(
            Domain::parse("https://localhost:8080/"),
            Err(DomainError::Invalid(_))
        ));
        assert_eq!(Domain::parse("www.co.uk").unwrap().as_str(), "co.uk");
    }

    #[test]
    fn single_label_is_not_added() {
        let mut set = empty_set();

        let err = set.add("www.com").unwrap_err();
        assert!(matches!(err, CoreError::Domain(DomainError::Invalid(_))));
        assert!(set.custom().is_empty());
    }

    // ==================== DomainSet ====================

    #[test]
    fn load_without_stored_list_is_empty() {
        let set = empty_set();
        assert!(set.custom().is_empty());
        assert_eq!(set.combined().len(), DEFAULT_PROXIED_DOMAINS.len());
    }

    #[test]
    fn load_skips_invalid_and_duplicate_entries() {
        let store = Arc::new(MemoryStore::new());
        store
            .save_custom_domains(&[
                "example.com".into(),
                "not a domain".into(),
                "www.example.com".into(),
                "telegram.org".into(),
                "rust-lang.org".into(),
            ])
            .unwrap();

        let set = DomainSet::load(store).unwrap();
        let custom: Vec<&str> = set.custom().iter().map(|d| d.as_str()).collect();
        assert_eq!(custom, vec!["example.com", "rust-lang.org"]);
    }

    #[test]
    fn add_default_domain_is_rejected() {
        let mut set = empty_set();
        let err = set.add("telegram.org").unwrap_err();
        assert!(matches!(
            err,
            CoreError::Domain(DomainError::AlreadyPresent(Origin::Default))
        ));
        assert!(set.custom().is_empty());
    }

    #[test]
    fn add_existing_custom_domain_is_rejected() {
        let mut set = empty_set();
        set.add("example.com").unwrap();
        let err = set.add("www.example.com").unwrap_err();
        assert!(matches!(
            err,
            CoreError::Domain(DomainError::AlreadyPresent(Origin::Custom))
        ));
        assert_eq!(set.custom().len(), 1);
    }

    #[test]
    fn add_persists_list() {
        let store = Arc::new(MemoryStore::new());
        let mut set = DomainSet::load(store.clone()).unwrap();
        set.add("example.com").unwrap();

        assert_eq!(
            store.load_custom_domains().unwrap(),
            Some(vec!["example.com".to_string()])
        );
    }

    #[test]
    fn combined_is_defaults_then_custom() {
        let mut set = empty_set();
        set.add("example.com").unwrap();

        let combined = set.combined();
        assert_eq!(combined.first().map(String::as_str), Some("trello.com"));
        assert_eq!(combined.last().map(String::as_str), Some("example.com"));
        assert_eq!(combined.len(), DEFAULT_PROXIED_DOMAINS.len() + 1);
    }

    #[test]
    fn remove_after_add_restores_list() {
        let mut set = empty_set();
        set.add("a.example").unwrap();
        let before: Vec<Domain> = set.custom().to_vec();

        set.add("b.example").unwrap();
        assert!(set.remove("b.example").unwrap());
        assert_eq!(set.custom(), before.as_slice());
    }

    #[test]
    fn remove_absent_is_noop_but_persists() {
        let store = Arc::new(MemoryStore::new());
        let mut set = DomainSet::load(store.clone()).unwrap();

        assert!(!set.remove("example.com").unwrap());
        assert_eq!(store.load_custom_domains().unwrap(), Some(vec![]));
    }

    #[test]
    fn remove_default_domain_does_nothing() {
        let mut set = empty_set();
        assert!(!set.remove("telegram.org").unwrap());
        assert!(set.combined().iter().any(|d| d == "telegram.org"));
    }

    #[test]
    fn error_codes_distinguish_lists() {
        assert_eq!(
            DomainError::AlreadyPresent(Origin::Default).code(),
            "already_default"
        );
        assert_eq!(
            DomainError::AlreadyPresent(Origin::Custom).code(),
            "already_custom"
        );
    }
}
