//! AVU 元数据目录 - 基于 SQLite

use super::Avu;
use crate::error::StoreError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// 数据库行
#[derive(Debug, sqlx::FromRow)]
struct AvuRow {
    attribute: String,
    value: String,
    unit: String,
}

impl From<AvuRow> for Avu {
    fn from(row: AvuRow) -> Self {
        Avu {
            attribute: row.attribute,
            value: row.value,
            unit: row.unit,
        }
    }
}

/// 元数据目录
#[derive(Clone)]
pub struct AvuCatalog {
    db: SqlitePool,
}

impl AvuCatalog {
    /// 打开（或创建）目录数据库并运行迁移
    pub async fn open(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        // SQLite 单文件，内存库必须只用一个连接
        let db = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&db).await?;

        Ok(Self { db })
    }

    /// 内存目录，用于测试和临时会话
    pub async fn in_memory() -> Result<Self, StoreError> {
        Self::open("sqlite::memory:").await
    }

    /// 在一个事务中写入对象的全部元数据
    pub async fn attach(&self, store: &str, path: &str, avus: &[Avu]) -> Result<(), StoreError> {
        let now = chrono::Utc::now().timestamp();
        let mut tx = self.db.begin().await?;

        for avu in avus {
            sqlx::query(
                "INSERT INTO avus (store, path, attribute, value, unit, created_at) VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(store)
            .bind(path)
            .bind(&avu.attribute)
            .bind(&avu.value)
            .bind(&avu.unit)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!("已附加 {} 条元数据: {}", avus.len(), path);
        Ok(())
    }

    /// 读取对象的全部元数据
    pub async fn list(&self, store: &str, path: &str) -> Result<Vec<Avu>, StoreError> {
        let rows = sqlx::query_as::<_, AvuRow>(
            "SELECT attribute, value, unit FROM avus WHERE store = ? AND path = ? ORDER BY id",
        )
        .bind(store)
        .bind(path)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Avu::from).collect())
    }

    /// 删除对象本身及其子路径上的全部元数据
    pub async fn remove_tree(&self, store: &str, path: &str) -> Result<u64, StoreError> {
        let path = path.trim_end_matches('/');
        let result = sqlx::query(
            "DELETE FROM avus WHERE store = ? AND (path = ? OR substr(path, 1, length(?) + 1) = ? || '/')",
        )
        .bind(store)
        .bind(path)
        .bind(path)
        .bind(path)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected())
    }

    /// 关闭连接池
    pub async fn close(&self) {
        self.db.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_attach_and_list() {
        let catalog = AvuCatalog::in_memory().await.unwrap();
        let avus = vec![
            Avu::new("original_modify_time", "2024-01-01T00:00:00+00:00"),
            Avu::new("size", "10").with_unit("bytes"),
        ];

        catalog.attach("test", "/zone/a.txt", &avus).await.unwrap();

        let listed = catalog.list("test", "/zone/a.txt").await.unwrap();
        assert_eq!(listed, avus);
        assert!(catalog.list("other", "/zone/a.txt").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_attach_rolls_back_on_partial_failure() {
        let catalog = AvuCatalog::in_memory().await.unwrap();
        sqlx::query(
            "CREATE TRIGGER reject_second BEFORE INSERT ON avus WHEN NEW.attribute = 'second'
             BEGIN SELECT RAISE(ABORT, 'rejected'); END",
        )
        .execute(&catalog.db)
        .await
        .unwrap();
        let avus = vec![Avu::new("first", "1"), Avu::new("second", "2")];

        let err = catalog.attach("test", "/zone/a.txt", &avus).await.unwrap_err();

        assert!(matches!(err, StoreError::Catalog(_)));
        assert!(catalog.list("test", "/zone/a.txt").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_tree_keeps_siblings() {
        let catalog = AvuCatalog::in_memory().await.unwrap();
        let avu = [Avu::new("k", "v")];
        catalog.attach("test", "/zone/dir/a.txt", &avu).await.unwrap();
        catalog.attach("test", "/zone/dir/sub/b.txt", &avu).await.unwrap();
        catalog.attach("test", "/zone/dir2/c.txt", &avu).await.unwrap();

        let removed = catalog.remove_tree("test", "/zone/dir").await.unwrap();

        assert_eq!(removed, 2);
        assert_eq!(catalog.list("test", "/zone/dir2/c.txt").await.unwrap().len(), 1);
    }
}
