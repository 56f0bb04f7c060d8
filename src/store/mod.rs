//! Persistence layer: whole-table load/save for the four logical tables.
//!
//! The contract is deliberately coarse. `load_*` returns every row of a
//! table (an empty vector when the backing store does not exist yet);
//! `save_*` replaces the entire table atomically. There is no partial-row
//! update primitive; callers do read-modify-write cycles on the whole
//! table, under the single-writer assumption documented in DESIGN.md. A
//! stricter backend (row-versioned, compare-and-swap) can be substituted
//! behind this trait without touching the services.

pub mod file;
pub mod memory;

use async_trait::async_trait;

use crate::models::{PackageRow, PackingRecord, PickingLine, SeparationRecord};

pub use file::JsonFileStore;
pub use memory::InMemoryStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Typed table access. Picking is reference data maintained by an external
/// sync process and is read-only here.
#[async_trait]
pub trait TableStore: Send + Sync {
    async fn load_picking(&self) -> StoreResult<Vec<PickingLine>>;

    async fn load_packages(&self) -> StoreResult<Vec<PackageRow>>;
    async fn save_packages(&self, rows: &[PackageRow]) -> StoreResult<()>;

    async fn load_separations(&self) -> StoreResult<Vec<SeparationRecord>>;
    async fn save_separations(&self, rows: &[SeparationRecord]) -> StoreResult<()>;

    async fn load_packing(&self) -> StoreResult<Vec<PackingRecord>>;
    async fn save_packing(&self, rows: &[PackingRecord]) -> StoreResult<()>;
}
