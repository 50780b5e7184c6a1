//! Emote catalog: the fixed set of 7TV emote ids the pool may hand out.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Opaque identifier of one emote on 7TV (a ULID in practice).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmoteId(String);

impl EmoteId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EmoteId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("emote catalog is empty")]
    Empty,
    #[error("failed to read emote catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Candidate emote ids, fixed at startup.
///
/// Order is the order of first appearance; duplicates are dropped.
#[derive(Debug, Clone)]
pub struct EmoteCatalog {
    ids: Vec<EmoteId>,
}

impl EmoteCatalog {
    pub fn new<I, T>(ids: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = T>,
        T: Into<EmoteId>,
    {
        let mut seen = HashSet::new();
        let mut unique = Vec::new();
        for id in ids {
            let id = id.into();
            if id.as_str().is_empty() {
                continue;
            }
            if seen.insert(id.clone()) {
                unique.push(id);
            } else {
                tracing::debug!(emote = %id, "Dropping duplicate catalog entry");
            }
        }

        if unique.is_empty() {
            return Err(CatalogError::Empty);
        }
        Ok(Self { ids: unique })
    }

    /// Parse a comma and/or whitespace separated list, as found in `EMOTE_IDS`.
    pub fn parse_list(list: &str) -> Result<Self, CatalogError> {
        Self::new(
            list.split(|c: char| c == ',' || c.is_whitespace())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(EmoteId::from),
        )
    }

    /// Load from a file with one id per line. `#` starts a comment.
    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;

        Self::new(
            contents
                .lines()
                .map(|line| line.split('#').next().unwrap_or("").trim())
                .filter(|line| !line.is_empty())
                .map(EmoteId::from),
        )
    }

    pub fn ids(&self) -> &[EmoteId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: &EmoteId) -> bool {
        self.ids.contains(id)
    }
}

impl IntoIterator for EmoteCatalog {
    type Item = EmoteId;
    type IntoIter = std::vec::IntoIter<EmoteId>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.into_iter()
    }
}
