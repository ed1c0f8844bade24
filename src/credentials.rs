//! File-backed credential lookups for the improvement loop.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use improve_loop::CredentialStore;
use tracing::warn;

/// Credential store over a YAML map of service name to key.
///
/// The file is re-read on every lookup, so a key added while a run is blocked
/// on `awaiting-credential` unblocks it on the next poll without a restart.
/// A missing or unreadable file simply reports every key as absent.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn read_keys(&self) -> Option<BTreeMap<String, String>> {
        let content = tokio::fs::read_to_string(&self.path).await.ok()?;
        match serde_yaml::from_str(&content) {
            Ok(keys) => Some(keys),
            Err(error) => {
                warn!(
                    path = %self.path.display(),
                    %error,
                    "credentials file is not a flat YAML map, treating as empty"
                );
                None
            }
        }
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn present(&self, service: &str) -> bool {
        match self.read_keys().await {
            // A key with a blank value is a placeholder row, not a credential.
            Some(keys) => keys
                .get(service)
                .map(|value| !value.trim().is_empty())
                .unwrap_or(false),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn missing_file_reports_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("keys.yaml"));
        assert!(!store.present("stripe").await);
    }

    #[tokio::test]
    async fn keys_are_read_per_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.yaml");
        let store = FileCredentialStore::new(&path);
        assert!(!store.present("stripe").await);

        std::fs::write(&path, "stripe: sk_test_123\n").unwrap();
        assert!(store.present("stripe").await);
        assert!(!store.present("slack").await);

        // Appending a key is picked up without rebuilding the store.
        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "slack: xoxb-1").unwrap();
        assert!(store.present("slack").await);
    }

    #[tokio::test]
    async fn blank_values_do_not_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.yaml");
        std::fs::write(&path, "openai: \"\"\ntwilio: \"  \"\n").unwrap();
        let store = FileCredentialStore::new(&path);
        assert!(!store.present("openai").await);
        assert!(!store.present("twilio").await);
    }

    #[tokio::test]
    async fn malformed_yaml_reports_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.yaml");
        std::fs::write(&path, "- just\n- a\n- list\n").unwrap();
        let store = FileCredentialStore::new(&path);
        assert!(!store.present("stripe").await);
    }
}
