use super::{
    collection_key, object_key, parent_collection, Avu, AvuCatalog, CollectionStore, Lookup,
};
use crate::core::checksum::{encode_native_checksum, CHUNK_SIZE};
use crate::error::StoreError;
use async_trait::async_trait;
use opendal::{ErrorKind, Operator};
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncReadExt;
use tracing::debug;

/// 基于 opendal 的集合存储：数据走 Operator，元数据走 AVU 目录
pub struct OpendalStore {
    operator: Operator,
    catalog: AvuCatalog,
    name: String,
}

impl OpendalStore {
    pub fn new(operator: Operator, catalog: AvuCatalog, name: impl Into<String>) -> Self {
        Self {
            operator,
            catalog,
            name: name.into(),
        }
    }

    pub fn catalog(&self) -> &AvuCatalog {
        &self.catalog
    }

    /// 流式读取对象并计算 SHA-256
    async fn digest_object(&self, key: &str, size: u64) -> Result<[u8; 32], opendal::Error> {
        let mut hasher = Sha256::new();
        let mut offset = 0u64;

        while offset < size {
            let end = (offset + CHUNK_SIZE as u64).min(size);
            let data = self.operator.read_with(key).range(offset..end).await?;
            hasher.update(data.to_vec());
            offset = end;
        }

        Ok(hasher.finalize().into())
    }
}

#[async_trait]
impl CollectionStore for OpendalStore {
    async fn get_collection(&self, path: &str) -> Lookup<()> {
        match self.operator.stat(&collection_key(path)).await {
            Ok(meta) if meta.is_dir() => Lookup::Found(()),
            Ok(_) => Lookup::NotFound,
            Err(e) if e.kind() == ErrorKind::NotFound => Lookup::NotFound,
            Err(e) => Lookup::Error(e.into()),
        }
    }

    async fn create_collection(&self, path: &str) -> Result<(), StoreError> {
        if let Some(parent) = parent_collection(path) {
            match self.get_collection(parent).await {
                Lookup::Found(()) => {}
                Lookup::NotFound => return Err(StoreError::ParentMissing(parent.to_string())),
                Lookup::Error(e) => return Err(e),
            }
        }

        self.operator.create_dir(&collection_key(path)).await?;
        Ok(())
    }

    async fn data_object_size(&self, path: &str) -> Lookup<u64> {
        match self.operator.stat(&object_key(path)).await {
            Ok(meta) if meta.is_file() => Lookup::Found(meta.content_length()),
            Ok(_) => Lookup::NotFound,
            Err(e) if e.kind() == ErrorKind::NotFound => Lookup::NotFound,
            Err(e) => Lookup::Error(e.into()),
        }
    }

    async fn data_object_checksum(&self, path: &str) -> Lookup<Option<String>> {
        let key = object_key(path);
        let size = match self.data_object_size(path).await {
            Lookup::Found(size) => size,
            Lookup::NotFound => return Lookup::NotFound,
            Lookup::Error(e) => return Lookup::Error(e),
        };

        match self.digest_object(&key, size).await {
            Ok(digest) => Lookup::Found(Some(encode_native_checksum(&digest))),
            Err(e) if e.kind() == ErrorKind::NotFound => Lookup::NotFound,
            Err(e) => Lookup::Error(e.into()),
        }
    }

    async fn put(&self, local_path: &Path, remote_path: &str) -> Result<(), StoreError> {
        let key = object_key(remote_path);
        let mut file = fs::File::open(local_path).await?;
        let mut writer = self.operator.writer(&key).await?;
        let mut buffer = vec![0u8; CHUNK_SIZE];

        loop {
            let n = file.read(&mut buffer).await?;
            if n == 0 {
                break;
            }
            writer.write(buffer[..n].to_vec()).await?;
        }

        writer.close().await?;
        debug!("写入完成: {}", remote_path);
        Ok(())
    }

    async fn attach_metadata(&self, path: &str, avus: &[Avu]) -> Result<(), StoreError> {
        self.catalog.attach(&self.name, path, avus).await
    }

    async fn remove_metadata(&self, path: &str) -> Result<u64, StoreError> {
        self.catalog.remove_tree(&self.name, path).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opendal::services::Fs;
    use tempfile::TempDir;

    async fn setup() -> (OpendalStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().to_string_lossy().to_string();
        let operator = Operator::new(Fs::default().root(&root)).unwrap().finish();
        let catalog = AvuCatalog::in_memory().await.unwrap();
        (OpendalStore::new(operator, catalog, "test"), temp_dir)
    }

    #[tokio::test]
    async fn test_create_collection_requires_parent() {
        let (store, _dir) = setup().await;

        let err = store.create_collection("/zone/home").await.unwrap_err();
        assert!(matches!(err, StoreError::ParentMissing(p) if p == "/zone"));

        store.create_collection("/zone").await.unwrap();
        store.create_collection("/zone/home").await.unwrap();
        assert!(store.get_collection("/zone/home").await.is_found());
    }

    #[tokio::test]
    async fn test_missing_object_is_not_found() {
        let (store, _dir) = setup().await;

        assert!(matches!(store.data_object_size("/zone/nope.txt").await, Lookup::NotFound));
        assert!(matches!(
            store.data_object_checksum("/zone/nope.txt").await,
            Lookup::NotFound
        ));
        assert!(matches!(store.get_collection("/zone").await, Lookup::NotFound));
    }

    #[tokio::test]
    async fn test_put_then_size_and_checksum() {
        let (store, dir) = setup().await;
        store.create_collection("/zone").await.unwrap();

        let local = dir.path().join("local.txt");
        std::fs::write(&local, b"hello world").unwrap();
        store.put(&local, "/zone/hello.txt").await.unwrap();

        assert_eq!(store.data_object_size("/zone/hello.txt").await.found(), Some(11));

        let checksum = store
            .data_object_checksum("/zone/hello.txt")
            .await
            .found()
            .flatten()
            .unwrap();
        assert!(checksum.starts_with("sha2:"));
    }
}
