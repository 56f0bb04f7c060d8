use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::models::{PackageRow, PackingRecord, PickingLine, SeparationRecord};

use super::{StoreError, StoreResult, TableStore};

#[derive(Debug, Default)]
struct Tables {
    picking: Vec<PickingLine>,
    packages: Vec<PackageRow>,
    separations: Vec<SeparationRecord>,
    packing: Vec<PackingRecord>,
}

/// In-memory table store with the same whole-table-replace contract as the
/// file store. Used by tests and by embedders that bring their own
/// persistence.
///
/// `set_fail_saves` makes every subsequent save fail, which is how the
/// retry-after-persistence-failure behavior is exercised.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    fail_saves: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed_picking(&self, lines: Vec<PickingLine>) {
        self.tables.write().await.picking = lines;
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    fn check_save(&self) -> StoreResult<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Io(io::Error::new(
                io::ErrorKind::Other,
                "injected save failure",
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl TableStore for InMemoryStore {
    async fn load_picking(&self) -> StoreResult<Vec<PickingLine>> {
        Ok(self.tables.read().await.picking.clone())
    }

    async fn load_packages(&self) -> StoreResult<Vec<PackageRow>> {
        Ok(self.tables.read().await.packages.clone())
    }

    async fn save_packages(&self, rows: &[PackageRow]) -> StoreResult<()> {
        self.check_save()?;
        self.tables.write().await.packages = rows.to_vec();
        Ok(())
    }

    async fn load_separations(&self) -> StoreResult<Vec<SeparationRecord>> {
        Ok(self.tables.read().await.separations.clone())
    }

    async fn save_separations(&self, rows: &[SeparationRecord]) -> StoreResult<()> {
        self.check_save()?;
        self.tables.write().await.separations = rows.to_vec();
        Ok(())
    }

    async fn load_packing(&self) -> StoreResult<Vec<PackingRecord>> {
        Ok(self.tables.read().await.packing.clone())
    }

    async fn save_packing(&self, rows: &[PackingRecord]) -> StoreResult<()> {
        self.check_save()?;
        self.tables.write().await.packing = rows.to_vec();
        Ok(())
    }
}
