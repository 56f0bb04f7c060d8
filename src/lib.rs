//! Warehouse separation & packing core
//!
//! Tracks order fulfillment from picking line items through weighed
//! packages (separation) to verified dispatch (packing), and derives one
//! consistent status per (order, location) from the three stateful tables.
//! The web layer, authentication, and the order sync that feeds the
//! picking table are external collaborators wired on top of [`AppServices`].
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod errors;
pub mod logging;
pub mod models;
pub mod services;
pub mod store;

use std::sync::Arc;

use services::packing::PackingService;
use services::separation::SeparationService;
use services::session::SessionRegistry;
use services::status::StatusService;
use store::TableStore;

pub use crate::config::{load_config, AppConfig};
pub use crate::errors::ServiceError;

/// Bundled service handles sharing one table store; the seam the
/// (external) web layer wires against.
#[derive(Clone)]
pub struct AppServices {
    pub status: StatusService,
    pub separation: SeparationService,
    pub packing: PackingService,
}

impl AppServices {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        let sessions = Arc::new(SessionRegistry::default());
        Self {
            status: StatusService::new(store.clone()),
            separation: SeparationService::new(store.clone(), sessions),
            packing: PackingService::new(store),
        }
    }

    /// Convenience constructor over the JSON snapshot store.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(Arc::new(store::JsonFileStore::new(config)))
    }
}
