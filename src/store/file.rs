use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tokio::fs;
use tracing::warn;

use crate::config::AppConfig;
use crate::models::{PackageRow, PackingRecord, PickingLine, SeparationRecord};

use super::{StoreResult, TableStore};

/// JSON snapshot store: one file per table, replaced wholesale on save.
///
/// A missing snapshot reads as an empty table; an unreadable one is logged
/// and treated as empty rather than failing the caller, matching the
/// tolerance of the upstream sync pipeline. Saves go through a sibling temp
/// file and a rename so a crashed write never leaves a half-written table.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    picking_path: PathBuf,
    packages_path: PathBuf,
    separations_path: PathBuf,
    packing_path: PathBuf,
}

impl JsonFileStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            picking_path: config.picking_path(),
            packages_path: config.packages_path(),
            separations_path: config.separations_path(),
            packing_path: config.packing_path(),
        }
    }

    async fn load_table<T: DeserializeOwned>(&self, path: &Path) -> StoreResult<Vec<T>> {
        let bytes = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                warn!(path = %path.display(), %err, "table snapshot unreadable, treating as empty");
                return Ok(Vec::new());
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(rows) => Ok(rows),
            Err(err) => {
                warn!(path = %path.display(), %err, "table snapshot corrupt, treating as empty");
                Ok(Vec::new())
            }
        }
    }

    async fn save_table<T: Serialize>(&self, path: &Path, rows: &[T]) -> StoreResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let bytes = serde_json::to_vec_pretty(rows)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, &bytes).await?;
        fs::rename(&tmp, path).await?;
        Ok(())
    }
}

#[async_trait]
impl TableStore for JsonFileStore {
    async fn load_picking(&self) -> StoreResult<Vec<PickingLine>> {
        self.load_table(&self.picking_path).await
    }

    async fn load_packages(&self) -> StoreResult<Vec<PackageRow>> {
        self.load_table(&self.packages_path).await
    }

    async fn save_packages(&self, rows: &[PackageRow]) -> StoreResult<()> {
        self.save_table(&self.packages_path, rows).await
    }

    async fn load_separations(&self) -> StoreResult<Vec<SeparationRecord>> {
        self.load_table(&self.separations_path).await
    }

    async fn save_separations(&self, rows: &[SeparationRecord]) -> StoreResult<()> {
        self.save_table(&self.separations_path, rows).await
    }

    async fn load_packing(&self) -> StoreResult<Vec<PackingRecord>> {
        self.load_table(&self.packing_path).await
    }

    async fn save_packing(&self, rows: &[PackingRecord]) -> StoreResult<()> {
        self.save_table(&self.packing_path, rows).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn store_in(dir: &Path) -> JsonFileStore {
        let config = AppConfig::new(dir);
        JsonFileStore::new(&config)
    }

    #[tokio::test]
    async fn missing_snapshot_reads_as_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        assert!(store.load_picking().await.unwrap().is_empty());
        assert!(store.load_separations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_replaces_the_whole_table() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());

        let first = vec![SeparationRecord {
            order_id: 1,
            location: "A1".into(),
            user: "ana@example.com".into(),
            start_time: Utc::now(),
            end_time: None,
            discrepancy_log: String::new(),
            discrepancy_report: String::new(),
        }];
        store.save_separations(&first).await.unwrap();

        let second = vec![SeparationRecord {
            order_id: 2,
            ..first[0].clone()
        }];
        store.save_separations(&second).await.unwrap();

        let loaded = store.load_separations().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].order_id, 2);
    }

    #[tokio::test]
    async fn corrupt_snapshot_reads_as_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        std::fs::write(dir.path().join("packages.json"), b"not json").unwrap();
        assert!(store.load_packages().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn package_rows_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let rows = vec![PackageRow {
            order_id: 100,
            location: "A1".into(),
            package_id: 1,
            weight: dec!(5.5),
            item_code: "X".into(),
            item_name: "Item X".into(),
            quantity: dec!(10),
            report: "fragile".into(),
            sub_location: "DOCK-2".into(),
        }];
        store.save_packages(&rows).await.unwrap();
        assert_eq!(store.load_packages().await.unwrap(), rows);
    }
}
