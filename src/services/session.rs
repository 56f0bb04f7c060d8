use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::errors::ServiceError;
use crate::models::Package;

/// Identity of an in-progress separation session. One operator works one
/// (order, location) at a time; the registry is keyed by all three so a
/// session is never shared across users.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub order_id: i64,
    pub location: String,
    pub user: String,
}

impl SessionKey {
    pub fn new(order_id: i64, location: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            order_id,
            location: location.into(),
            user: user.into(),
        }
    }
}

/// Working-set state for one operator building packages for one
/// (order, location). Lives outside the persisted tables until
/// `finalize_separation` commits it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeparationSession {
    pub order_id: i64,
    pub location: String,
    pub user: String,
    pub start_time: DateTime<Utc>,
    pub packages: Vec<Package>,
}

impl SeparationSession {
    /// Total quantity of an item already allocated across all packages.
    pub fn packed_quantity(&self, item_code: &str) -> Decimal {
        self.quantity_where(item_code, |_| true)
    }

    /// Total quantity of an item allocated outside one package, used as
    /// the validation baseline when that package is being edited.
    pub fn packed_quantity_excluding(&self, item_code: &str, package_id: u32) -> Decimal {
        self.quantity_where(item_code, |id| id != package_id)
    }

    pub fn next_package_id(&self) -> u32 {
        self.packages.len() as u32 + 1
    }

    /// Package ids stay contiguous from 1 after any removal.
    pub(crate) fn renumber(&mut self) {
        for (index, package) in self.packages.iter_mut().enumerate() {
            package.id = index as u32 + 1;
        }
    }

    fn quantity_where(&self, item_code: &str, keep: impl Fn(u32) -> bool) -> Decimal {
        self.packages
            .iter()
            .filter(|package| keep(package.id))
            .flat_map(|package| &package.items)
            .filter(|item| item.item_code == item_code)
            .map(|item| item.quantity)
            .sum()
    }
}

/// Registry of live separation sessions.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<SessionKey, SeparationSession>,
}

impl SessionRegistry {
    /// Open a fresh session for the key, replacing any previous one held
    /// by the same operator.
    pub fn open(&self, key: &SessionKey, start_time: DateTime<Utc>) -> SeparationSession {
        let session = SeparationSession {
            order_id: key.order_id,
            location: key.location.clone(),
            user: key.user.clone(),
            start_time,
            packages: Vec::new(),
        };
        self.sessions.insert(key.clone(), session.clone());
        session
    }

    pub fn get(&self, key: &SessionKey) -> Option<SeparationSession> {
        self.sessions.get(key).map(|entry| entry.clone())
    }

    pub fn discard(&self, key: &SessionKey) -> Option<SeparationSession> {
        self.sessions.remove(key).map(|(_, session)| session)
    }

    /// Run a mutation against the session, failing if none is open.
    pub(crate) fn update<T>(
        &self,
        key: &SessionKey,
        mutate: impl FnOnce(&mut SeparationSession) -> Result<T, ServiceError>,
    ) -> Result<T, ServiceError> {
        let mut entry = self.sessions.get_mut(key).ok_or_else(|| {
            ServiceError::not_found(format!(
                "No separation in progress for order {} at {}",
                key.order_id, key.location
            ))
        })?;
        mutate(&mut entry)
    }
}
