//! Site-name to URL lookup
//!
//! Navigation-only goals ("open 네이버") can be answered without a page
//! snapshot when the named site is known.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};
use url::Url;

/// Resolves a free-text site reference to a destination URL
pub trait SiteLookup: Send + Sync {
    /// URL for `query`, if a known site is named
    fn lookup(&self, query: &str) -> Option<String>;
}

/// Fixed name to URL table
#[derive(Debug, Clone, Default)]
pub struct StaticSiteLookup {
    // Insertion order matters: the first matching entry wins.
    entries: Vec<(String, String)>,
}

const DEFAULT_SITES: &[(&str, &str)] = &[
    ("국가교통정보센터", "https://www.its.go.kr"),
    ("정부24", "https://www.gov.kr"),
    ("국세청", "https://www.nts.go.kr"),
    ("건강보험공단", "https://www.nhis.or.kr"),
    ("한국은행", "https://www.bok.or.kr"),
    ("네이버", "https://naver.com"),
    ("다음", "https://daum.net"),
    ("naver", "https://naver.com"),
    ("daum", "https://daum.net"),
];

impl StaticSiteLookup {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with the built-in public-service and portal sites
    pub fn with_defaults() -> Self {
        let mut lookup = Self::new();
        for (name, url) in DEFAULT_SITES {
            lookup.entries.push((name.to_string(), url.to_string()));
        }
        lookup
    }

    /// Add an entry, rejecting URLs that do not parse
    pub fn insert(&mut self, name: impl Into<String>, url: impl Into<String>) -> Result<()> {
        let name = name.into();
        let url = url.into();
        Url::parse(&url).map_err(|e| Error::generic(format!("Invalid URL for site {}: {}", name, e)))?;
        self.entries.retain(|(existing, _)| existing != &name);
        self.entries.push((name, url));
        Ok(())
    }

    /// Load a JSON object of `name -> url` on top of the defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Parse a JSON object of `name -> url` on top of the defaults
    pub fn from_json_str(content: &str) -> Result<Self> {
        let table: BTreeMap<String, String> = serde_json::from_str(content)?;
        let mut lookup = Self::with_defaults();
        for (name, url) in table {
            lookup.insert(name, url)?;
        }
        info!("Loaded {} site entries", lookup.len());
        Ok(lookup)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SiteLookup for StaticSiteLookup {
    fn lookup(&self, query: &str) -> Option<String> {
        let q = query.trim().to_lowercase();
        if q.is_empty() {
            return None;
        }

        let found = self.entries.iter().find(|(name, _)| {
            let name = name.to_lowercase();
            q.contains(&name) || name.contains(&q)
        });

        match found {
            Some((name, url)) => {
                info!("Site mapping found: {} -> {} ({})", query, url, name);
                Some(url.clone())
            }
            None => {
                warn!("No site mapping for: {}", query);
                None
            }
        }
    }
}
