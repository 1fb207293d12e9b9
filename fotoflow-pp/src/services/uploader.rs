//! Per-person upload orchestration
//!
//! Phase 2 hands each person's photo set to the orchestrator, which owns the
//! find-or-create folder step, per-file upload with failure isolation, and
//! the share link. The remote backend hides behind `ObjectStore` so tests
//! run against an in-memory store.

use fotoflow_common::Result;
use std::path::PathBuf;

use crate::models::Registration;

/// A folder on the remote object store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFolder {
    pub id: String,
    pub name: String,
}

/// Remote storage operations needed by delivery
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Look up a folder by name under an optional parent
    async fn find_folder(&self, name: &str, parent: Option<&str>) -> Result<Option<RemoteFolder>>;

    /// Create a folder under an optional parent
    async fn create_folder(&self, name: &str, parent: Option<&str>) -> Result<RemoteFolder>;

    /// Upload one file's bytes into a folder
    async fn upload_file(&self, folder_id: &str, filename: &str, bytes: Vec<u8>) -> Result<()>;

    /// Make a folder link-shareable and return the link
    async fn share_folder(&self, folder_id: &str) -> Result<String>;
}

/// Outcome of delivering one person's photos
#[derive(Debug, Clone)]
pub struct PersonUploadReport {
    pub success: bool,
    pub folder_id: Option<String>,
    pub folder_name: String,
    pub share_link: Option<String>,
    pub uploaded: i64,
    pub failed: i64,
    pub error: Option<String>,
}

/// Drives one person's folder, uploads, and share link
pub struct UploadOrchestrator<'a> {
    store: &'a dyn ObjectStore,
    parent_folder: Option<String>,
}

impl<'a> UploadOrchestrator<'a> {
    pub fn new(store: &'a dyn ObjectStore, parent_folder: Option<String>) -> Self {
        Self {
            store,
            parent_folder,
        }
    }

    /// Remote folder name for a person: `First_Last`, filesystem-safe
    pub fn folder_name(registration: &Registration) -> String {
        let raw = format!("{} {}", registration.first_name, registration.last_name);
        raw.chars()
            .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '-' || *c == '_')
            .collect::<String>()
            .trim()
            .replace(' ', "_")
    }

    /// Upload one person's files, named `(remote filename, local path)`.
    ///
    /// Individual file failures are isolated; the person only fails outright
    /// when nothing at all uploaded.
    pub async fn upload_person(
        &self,
        registration: &Registration,
        files: &[(String, PathBuf)],
    ) -> PersonUploadReport {
        let folder_name = Self::folder_name(registration);

        let folder = match self.find_or_create_folder(&folder_name).await {
            Ok(folder) => folder,
            Err(err) => {
                return PersonUploadReport {
                    success: false,
                    folder_id: None,
                    folder_name,
                    share_link: None,
                    uploaded: 0,
                    failed: files.len() as i64,
                    error: Some(format!("folder setup failed: {err}")),
                };
            }
        };

        let mut uploaded = 0i64;
        let mut failed = 0i64;
        for (filename, path) in files {
            let bytes = match std::fs::read(path) {
                Ok(bytes) => bytes,
                Err(err) => {
                    tracing::warn!(
                        file = %path.display(),
                        "Skipping unreadable file: {err}"
                    );
                    failed += 1;
                    continue;
                }
            };
            match self.store.upload_file(&folder.id, filename, bytes).await {
                Ok(()) => uploaded += 1,
                Err(err) => {
                    tracing::warn!(file = filename, "Upload failed: {err}");
                    failed += 1;
                }
            }
        }

        if uploaded == 0 && failed > 0 {
            return PersonUploadReport {
                success: false,
                folder_id: Some(folder.id),
                folder_name,
                share_link: None,
                uploaded,
                failed,
                error: Some("no files uploaded".to_string()),
            };
        }

        // Delivery still counts without a link; the review UI flags it.
        let share_link = match self.store.share_folder(&folder.id).await {
            Ok(link) => Some(link),
            Err(err) => {
                tracing::warn!(folder = %folder.name, "Share link failed: {err}");
                None
            }
        };

        PersonUploadReport {
            success: true,
            folder_id: Some(folder.id),
            folder_name,
            share_link,
            uploaded,
            failed,
            error: None,
        }
    }

    async fn find_or_create_folder(&self, name: &str) -> Result<RemoteFolder> {
        let parent = self.parent_folder.as_deref();
        if let Some(existing) = self.store.find_folder(name, parent).await? {
            tracing::debug!(folder = name, id = %existing.id, "Reusing remote folder");
            return Ok(existing);
        }
        let created = self.store.create_folder(name, parent).await?;
        tracing::debug!(folder = name, id = %created.id, "Created remote folder");
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fotoflow_common::Error;
    use std::collections::HashMap;
    use std::sync::Mutex;

    fn registration(first: &str, last: &str) -> Registration {
        Registration {
            id: 1,
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: format!("{}@example.com", first.to_lowercase()),
            qr_token: "tok".to_string(),
            photo_count: 0,
            remote_folder_id: None,
            share_link: None,
            created_at: Utc::now(),
        }
    }

    /// In-memory store; filenames listed in `fail_uploads` reject the
    /// upload, folder names in `fail_folders` reject creation
    #[derive(Default)]
    struct MockStore {
        folders: Mutex<Vec<RemoteFolder>>,
        uploads: Mutex<HashMap<String, Vec<String>>>,
        fail_uploads: Vec<String>,
        fail_folders: Vec<String>,
        fail_share: bool,
    }

    #[async_trait::async_trait]
    impl ObjectStore for MockStore {
        async fn find_folder(
            &self,
            name: &str,
            _parent: Option<&str>,
        ) -> Result<Option<RemoteFolder>> {
            Ok(self
                .folders
                .lock()
                .unwrap()
                .iter()
                .find(|f| f.name == name)
                .cloned())
        }

        async fn create_folder(&self, name: &str, _parent: Option<&str>) -> Result<RemoteFolder> {
            if self.fail_folders.iter().any(|f| f == name) {
                return Err(Error::Remote(format!("cannot create {name}")));
            }
            let folder = RemoteFolder {
                id: format!("folder-{name}"),
                name: name.to_string(),
            };
            self.folders.lock().unwrap().push(folder.clone());
            Ok(folder)
        }

        async fn upload_file(&self, folder_id: &str, filename: &str, _bytes: Vec<u8>) -> Result<()> {
            if self.fail_uploads.iter().any(|f| f == filename) {
                return Err(Error::Remote(format!("rejected {filename}")));
            }
            self.uploads
                .lock()
                .unwrap()
                .entry(folder_id.to_string())
                .or_default()
                .push(filename.to_string());
            Ok(())
        }

        async fn share_folder(&self, folder_id: &str) -> Result<String> {
            if self.fail_share {
                return Err(Error::Remote("sharing disabled".to_string()));
            }
            Ok(format!("https://share.example.com/{folder_id}"))
        }
    }

    fn temp_files(dir: &tempfile::TempDir, names: &[&str]) -> Vec<(String, PathBuf)> {
        names
            .iter()
            .map(|name| {
                let path = dir.path().join(name);
                std::fs::write(&path, b"jpeg bytes").unwrap();
                (name.to_string(), path)
            })
            .collect()
    }

    #[test]
    fn folder_name_is_sanitized() {
        let reg = registration("Mary Jane", "O'Connor");
        assert_eq!(UploadOrchestrator::folder_name(&reg), "Mary_Jane_OConnor");
    }

    #[tokio::test]
    async fn uploads_all_files_and_shares() {
        let dir = tempfile::tempdir().unwrap();
        let store = MockStore::default();
        let orchestrator = UploadOrchestrator::new(&store, None);
        let files = temp_files(&dir, &["a.jpg", "b.jpg", "c.jpg"]);

        let report = orchestrator
            .upload_person(&registration("Alice", "Smith"), &files)
            .await;

        assert!(report.success);
        assert_eq!(report.uploaded, 3);
        assert_eq!(report.failed, 0);
        assert_eq!(
            report.share_link.as_deref(),
            Some("https://share.example.com/folder-Alice_Smith")
        );
    }

    #[tokio::test]
    async fn partial_failure_still_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let store = MockStore {
            fail_uploads: vec!["b.jpg".to_string(), "d.jpg".to_string()],
            ..Default::default()
        };
        let orchestrator = UploadOrchestrator::new(&store, None);
        let files = temp_files(&dir, &["a.jpg", "b.jpg", "c.jpg", "d.jpg", "e.jpg"]);

        let report = orchestrator
            .upload_person(&registration("Alice", "Smith"), &files)
            .await;

        assert!(report.success);
        assert_eq!(report.uploaded, 3);
        assert_eq!(report.failed, 2);
        assert!(report.share_link.is_some());
    }

    #[tokio::test]
    async fn total_failure_fails_the_person() {
        let dir = tempfile::tempdir().unwrap();
        let store = MockStore {
            fail_uploads: vec!["a.jpg".to_string(), "b.jpg".to_string()],
            ..Default::default()
        };
        let orchestrator = UploadOrchestrator::new(&store, None);
        let files = temp_files(&dir, &["a.jpg", "b.jpg"]);

        let report = orchestrator
            .upload_person(&registration("Bob", "Jones"), &files)
            .await;

        assert!(!report.success);
        assert_eq!(report.uploaded, 0);
        assert_eq!(report.failed, 2);
        assert!(report.share_link.is_none());
    }

    #[tokio::test]
    async fn reuses_existing_folder() {
        let dir = tempfile::tempdir().unwrap();
        let store = MockStore::default();
        store.folders.lock().unwrap().push(RemoteFolder {
            id: "preexisting".to_string(),
            name: "Alice_Smith".to_string(),
        });
        let orchestrator = UploadOrchestrator::new(&store, None);
        let files = temp_files(&dir, &["a.jpg"]);

        let report = orchestrator
            .upload_person(&registration("Alice", "Smith"), &files)
            .await;

        assert_eq!(report.folder_id.as_deref(), Some("preexisting"));
        assert_eq!(store.folders.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn person_failure_is_isolated_and_order_independent() {
        let dir = tempfile::tempdir().unwrap();
        let alice = registration("Alice", "Smith");
        let bob = Registration {
            id: 2,
            first_name: "Bob".to_string(),
            last_name: "Jones".to_string(),
            email: "bob@example.com".to_string(),
            qr_token: "tok-bob".to_string(),
            photo_count: 0,
            remote_folder_id: None,
            share_link: None,
            created_at: Utc::now(),
        };
        let alice_files = temp_files(&dir, &["a1.jpg", "a2.jpg"]);
        let bob_files = temp_files(&dir, &["b1.jpg"]);

        // Alice's folder cannot be created; Bob's can
        async fn deliver_in_order(
            order: &[(&Registration, &[(String, PathBuf)])],
        ) -> Vec<(i64, bool, i64, i64)> {
            let store = MockStore {
                fail_folders: vec!["Alice_Smith".to_string()],
                ..Default::default()
            };
            let orchestrator = UploadOrchestrator::new(&store, None);
            let mut results = Vec::new();
            for (person, files) in order {
                let report = orchestrator.upload_person(person, files).await;
                results.push((person.id, report.success, report.uploaded, report.failed));
            }
            results.sort();
            results
        }

        let forward =
            deliver_in_order(&[(&alice, alice_files.as_slice()), (&bob, bob_files.as_slice())])
                .await;
        let reversed =
            deliver_in_order(&[(&bob, bob_files.as_slice()), (&alice, alice_files.as_slice())])
                .await;

        // One person's total failure never leaks into the other, and the
        // per-person outcomes do not depend on processing order
        assert_eq!(forward, reversed);
        assert_eq!(forward, vec![(1, false, 0, 2), (2, true, 1, 0)]);
    }

    #[tokio::test]
    async fn share_failure_keeps_delivery_successful() {
        let dir = tempfile::tempdir().unwrap();
        let store = MockStore {
            fail_share: true,
            ..Default::default()
        };
        let orchestrator = UploadOrchestrator::new(&store, None);
        let files = temp_files(&dir, &["a.jpg"]);

        let report = orchestrator
            .upload_person(&registration("Alice", "Smith"), &files)
            .await;

        assert!(report.success);
        assert!(report.share_link.is_none());
    }
}
