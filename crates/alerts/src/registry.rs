//! File-backed coin registry.
//!
//! A JSON array of `{symbol, owner}` objects, rewritten in full on every
//! mutation. An absent or unreadable file is an empty registry, never an
//! error to the caller.

use coinwatch_core::{CoinBook, CoinEntry};
use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("coin {0} is already in the list")]
    Duplicate(String),
    #[error("coin {0} not found")]
    NotFound(String),
    #[error("failed to persist coin registry: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode coin registry: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Persistent registry of watched coins.
pub struct CoinRegistry {
    path: PathBuf,
    book: CoinBook,
}

impl CoinRegistry {
    /// Open the registry at `path`, loading whatever is readable.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let book = load_book(&path);
        Self { path, book }
    }

    pub fn book(&self) -> &CoinBook {
        &self.book
    }

    /// Add a coin and persist; the symbol is case-normalized first.
    pub fn add(&mut self, symbol: &str, owner: &str) -> Result<(), RegistryError> {
        let entry = CoinEntry::new(symbol, owner);
        let canonical = entry.symbol.to_string();
        if !self.book.insert(entry) {
            return Err(RegistryError::Duplicate(canonical));
        }
        self.save()
    }

    /// Remove a coin and persist.
    pub fn remove(&mut self, symbol: &str) -> Result<CoinEntry, RegistryError> {
        let removed = self
            .book
            .remove(symbol)
            .ok_or_else(|| RegistryError::NotFound(symbol.trim().to_uppercase()))?;
        self.save()?;
        Ok(removed)
    }

    pub fn owners(&self) -> BTreeSet<String> {
        self.book.owners()
    }

    /// Write the full entry list to a sibling temp file, then rename over
    /// the target so readers never observe a partial write.
    fn save(&self) -> Result<(), RegistryError> {
        let bytes = serde_json::to_vec_pretty(self.book.entries())?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn load_book(path: &Path) -> CoinBook {
    match fs::read(path) {
        Ok(bytes) => match serde_json::from_slice::<Vec<CoinEntry>>(&bytes) {
            Ok(entries) => CoinBook::from_entries(entries),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "coin registry is malformed, starting empty");
                CoinBook::new()
            }
        },
        Err(e) if e.kind() == ErrorKind::NotFound => CoinBook::new(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "coin registry is unreadable, starting empty");
            CoinBook::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn registry_in(dir: &tempfile::TempDir) -> CoinRegistry {
        CoinRegistry::open(dir.path().join("coins.json"))
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry_in(&dir);
        assert!(registry.book().is_empty());
    }

    #[test]
    fn test_malformed_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coins.json");
        fs::write(&path, b"{ not json").unwrap();
        let registry = CoinRegistry::open(&path);
        assert!(registry.book().is_empty());
    }

    #[test]
    fn test_add_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coins.json");

        let mut registry = CoinRegistry::open(&path);
        registry.add("eth", "alice").unwrap();

        let reloaded = CoinRegistry::open(&path);
        assert_eq!(reloaded.book().len(), 1);
        assert_eq!(reloaded.book().owner_of("ETH"), Some("alice"));
    }

    #[test]
    fn test_duplicate_add_leaves_registry_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = registry_in(&dir);

        registry.add("eth", "alice").unwrap();
        let err = registry.add("ETH", "bob").unwrap_err();
        assert!(matches!(err, RegistryError::Duplicate(ref s) if s == "ETH"));
        assert_eq!(registry.book().len(), 1);
        assert_eq!(registry.book().owner_of("ETH"), Some("alice"));
    }

    #[test]
    fn test_remove_missing_reports_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = registry_in(&dir);
        let err = registry.remove("btc").unwrap_err();
        assert!(matches!(err, RegistryError::NotFound(ref s) if s == "BTC"));
    }

    #[test]
    fn test_save_load_round_trip_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coins.json");

        let mut registry = CoinRegistry::open(&path);
        registry.add("BTC", "alice").unwrap();
        registry.add("ETH", "bob").unwrap();
        registry.remove("btc").unwrap();

        let first = CoinRegistry::open(&path);
        let second = CoinRegistry::open(&path);
        assert_eq!(first.book(), second.book());
        assert_eq!(first.book().len(), 1);
        assert_eq!(first.book().owner_of("ETH"), Some("bob"));
    }
}
