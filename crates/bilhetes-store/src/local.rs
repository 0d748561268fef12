use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;

use crate::{default_objects_dir, is_valid_key, ObjectStore, StoreConfig, StoreError};

/// Objects as plain files under a base directory, served back by the server's
/// `/files/` route.
pub struct LocalStore {
    base_dir: PathBuf,
    public_base_url: String,
}

impl LocalStore {
    pub fn new(config: &StoreConfig) -> Self {
        let base_dir = config
            .local_data_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(default_objects_dir);
        let public_base_url = config
            .public_base_url
            .as_deref()
            .unwrap_or_default()
            .trim_end_matches('/')
            .to_string();
        Self {
            base_dir,
            public_base_url,
        }
    }

    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, StoreError> {
        if !is_valid_key(key) {
            return Err(StoreError::NotFound(key.to_string()));
        }
        Ok(self.base_dir.join(key))
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn put(&self, key: &str, data: Bytes) -> Result<(), StoreError> {
        if !is_valid_key(key) {
            return Err(StoreError::Internal(format!("invalid key {key:?}")));
        }
        let path = self.base_dir.join(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Internal(format!("mkdir: {e}")))?;
        }
        tokio::fs::write(&path, &data)
            .await
            .map_err(|e| StoreError::Internal(format!("write {}: {e}", path.display())))
    }

    async fn get(&self, key: &str) -> Result<Bytes, StoreError> {
        let path = self.resolve(key)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(key.to_string()))
            }
            Err(e) => Err(StoreError::Internal(format!(
                "read {}: {e}",
                path.display()
            ))),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let Ok(path) = self.resolve(key) else {
            return Ok(());
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Internal(format!(
                "delete {}: {e}",
                path.display()
            ))),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let Ok(dir) = self.resolve(prefix) else {
            return Ok(vec![]);
        };
        let mut keys = Vec::new();
        let mut stack = vec![dir];
        while let Some(current) = stack.pop() {
            let mut entries = match tokio::fs::read_dir(&current).await {
                Ok(e) => e,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(StoreError::Internal(format!(
                        "list {}: {e}",
                        current.display()
                    )))
                }
            };
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| StoreError::Internal(format!("read_dir entry: {e}")))?
            {
                let path = entry.path();
                let ft = entry
                    .file_type()
                    .await
                    .map_err(|e| StoreError::Internal(format!("file_type: {e}")))?;
                if ft.is_dir() {
                    stack.push(path);
                } else if let Ok(rel) = path.strip_prefix(&self.base_dir) {
                    // Keys always use forward slashes.
                    let key = rel
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy())
                        .collect::<Vec<_>>()
                        .join("/");
                    keys.push(key);
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/files/{key}", self.public_base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store(dir: &std::path::Path) -> LocalStore {
        LocalStore::new(&StoreConfig {
            local_data_dir: Some(dir.to_string_lossy().to_string()),
            public_base_url: Some("http://127.0.0.1:3710/".into()),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn put_then_get_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let store = test_store(tmp.path());

        let png = Bytes::from_static(&[0x89, b'P', b'N', b'G', 0, 1, 2]);
        store.put("tickets/abc/1-foto.png", png.clone()).await.unwrap();
        let data = store.get("tickets/abc/1-foto.png").await.unwrap();
        assert_eq!(data, png);
    }

    #[tokio::test]
    async fn get_missing_returns_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let store = test_store(tmp.path());

        let err = store.get("tickets/x/1-none.png").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn traversal_keys_never_reach_the_filesystem() {
        let tmp = tempfile::tempdir().unwrap();
        let inner = tmp.path().join("objects");
        std::fs::write(tmp.path().join("secret.txt"), "nope").unwrap();
        let store = test_store(&inner);

        let err = store.get("../secret.txt").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert!(store.put("../escape.txt", Bytes::from("x")).await.is_err());
        assert!(!tmp.path().join("escape.txt").exists());
    }

    #[tokio::test]
    async fn put_overwrites_and_delete_removes() {
        let tmp = tempfile::tempdir().unwrap();
        let store = test_store(tmp.path());

        store.put("key", Bytes::from("first")).await.unwrap();
        store.put("key", Bytes::from("second")).await.unwrap();
        assert_eq!(store.get("key").await.unwrap().as_ref(), b"second");

        store.delete("key").await.unwrap();
        assert!(matches!(
            store.get("key").await.unwrap_err(),
            StoreError::NotFound(_)
        ));
        // Deleting again is fine.
        store.delete("key").await.unwrap();
    }

    #[tokio::test]
    async fn list_returns_keys_with_prefix() {
        let tmp = tempfile::tempdir().unwrap();
        let store = test_store(tmp.path());

        for key in [
            "tickets/a/1-x.png",
            "tickets/a/2-y.png",
            "tickets/b/3-z.png",
        ] {
            store.put(key, Bytes::from("img")).await.unwrap();
        }

        let keys = store.list("tickets/a").await.unwrap();
        assert_eq!(keys, vec!["tickets/a/1-x.png", "tickets/a/2-y.png"]);
        assert_eq!(store.list("tickets").await.unwrap().len(), 3);
        assert!(store.list("tickets/none").await.unwrap().is_empty());
    }

    #[test]
    fn public_url_points_at_files_route() {
        let tmp = tempfile::tempdir().unwrap();
        let store = test_store(tmp.path());
        assert_eq!(
            store.public_url("tickets/a/1-x.png"),
            "http://127.0.0.1:3710/files/tickets/a/1-x.png"
        );

        let relative = LocalStore::new(&StoreConfig::default());
        assert_eq!(relative.public_url("k"), "/files/k");
    }
}
