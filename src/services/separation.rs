use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use crate::errors::ServiceError;
use crate::models::{Package, PackageItem, PickingLine, SeparationRecord};
use crate::store::TableStore;

use super::session::{SeparationSession, SessionKey, SessionRegistry};

/// Requested quantity of one item for a package.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemQuantity {
    pub item_code: String,
    pub quantity: Decimal,
}

/// Operator input for creating or editing a package.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageInput {
    pub weight: Decimal,
    pub sub_location: String,
    pub report: String,
    pub items: Vec<ItemQuantity>,
}

/// Separation workflow: open a session per (order, location, user), build
/// packages against the picking quantities, and commit the result.
#[derive(Clone)]
pub struct SeparationService {
    store: Arc<dyn TableStore>,
    sessions: Arc<SessionRegistry>,
}

impl SeparationService {
    pub fn new(store: Arc<dyn TableStore>, sessions: Arc<SessionRegistry>) -> Self {
        Self { store, sessions }
    }

    /// Open (or reopen) the separation for a key and start a fresh session.
    ///
    /// Rejected with `Conflict` when another user holds the key open; the
    /// same user starting again resets their own work. Reopening a
    /// finalized separation clears its end time and both log fields.
    #[instrument(skip(self))]
    pub async fn start_separation(
        &self,
        order_id: i64,
        location: &str,
        user: &str,
    ) -> Result<DateTime<Utc>, ServiceError> {
        let mut records = self.store.load_separations().await?;

        if let Some(existing) = records.iter().find(|r| r.matches(order_id, location)) {
            if existing.is_open() && existing.user != user {
                warn!(holder = %existing.user, "separation already open by another user");
                return Err(ServiceError::conflict(format!(
                    "Separation for order {order_id} at {location} is already open by {}",
                    existing.user
                )));
            }
        }

        let start_time = Utc::now();
        match records.iter_mut().find(|r| r.matches(order_id, location)) {
            Some(record) => {
                record.user = user.to_string();
                record.start_time = start_time;
                record.end_time = None;
                record.discrepancy_log.clear();
                record.discrepancy_report.clear();
            }
            None => records.push(SeparationRecord {
                order_id,
                location: location.to_string(),
                user: user.to_string(),
                start_time,
                end_time: None,
                discrepancy_log: String::new(),
                discrepancy_report: String::new(),
            }),
        }
        self.store.save_separations(&records).await?;

        let key = SessionKey::new(order_id, location, user);
        self.sessions.open(&key, start_time);
        info!("separation started");
        Ok(start_time)
    }

    /// The live session for a key, if the operator has one open.
    pub fn session(&self, key: &SessionKey) -> Option<SeparationSession> {
        self.sessions.get(key)
    }

    /// Abandon a session without persisting anything. The separation
    /// record stays open until someone finalizes or restarts it.
    pub fn discard_session(&self, key: &SessionKey) -> Option<SeparationSession> {
        self.sessions.discard(key)
    }

    /// Add a package to the session. The package is rejected wholesale on
    /// the first invalid item; zero-quantity entries are dropped, and a
    /// package left with no items is never stored.
    #[instrument(skip(self, input), fields(order_id = key.order_id, location = %key.location))]
    pub async fn add_package(
        &self,
        key: &SessionKey,
        input: PackageInput,
    ) -> Result<SeparationSession, ServiceError> {
        let lines = self.picking_for(key.order_id, &key.location).await?;
        validate_weight(input.weight)?;

        self.sessions.update(key, |session| {
            let items = validate_items(&lines, session, None, &input.items)?;
            session.packages.push(Package {
                id: session.next_package_id(),
                weight: input.weight,
                sub_location: input.sub_location,
                report: input.report,
                items,
            });
            Ok(session.clone())
        })
    }

    /// Replace a package's contents. Cumulative validation uses the other
    /// packages as the baseline. Editing every item down to zero deletes
    /// the package and renumbers the rest.
    #[instrument(skip(self, input), fields(order_id = key.order_id, location = %key.location))]
    pub async fn edit_package(
        &self,
        key: &SessionKey,
        package_id: u32,
        input: PackageInput,
    ) -> Result<SeparationSession, ServiceError> {
        let lines = self.picking_for(key.order_id, &key.location).await?;
        validate_weight(input.weight)?;

        self.sessions.update(key, |session| {
            let position = session
                .packages
                .iter()
                .position(|p| p.id == package_id)
                .ok_or_else(|| {
                    ServiceError::not_found(format!("Package {package_id} not found"))
                })?;

            match validate_items(&lines, session, Some(package_id), &input.items) {
                Ok(items) => {
                    let package = &mut session.packages[position];
                    package.weight = input.weight;
                    package.sub_location = input.sub_location;
                    package.report = input.report;
                    package.items = items;
                }
                Err(ServiceError::EmptyPackage) => {
                    session.packages.remove(position);
                    session.renumber();
                }
                Err(err) => return Err(err),
            }
            Ok(session.clone())
        })
    }

    /// Remove a package and renumber the remaining ones contiguously.
    #[instrument(skip(self), fields(order_id = key.order_id, location = %key.location))]
    pub async fn delete_package(
        &self,
        key: &SessionKey,
        package_id: u32,
    ) -> Result<SeparationSession, ServiceError> {
        self.sessions.update(key, |session| {
            let position = session
                .packages
                .iter()
                .position(|p| p.id == package_id)
                .ok_or_else(|| {
                    ServiceError::not_found(format!("Package {package_id} not found"))
                })?;
            session.packages.remove(position);
            session.renumber();
            Ok(session.clone())
        })
    }

    /// Close the separation: record ordered-vs-packed discrepancies,
    /// replace the key's package rows, and stamp the separation record.
    ///
    /// A discrepancy never blocks finalization; it only routes the key to
    /// the incomplete state downstream. The two table writes are not
    /// atomic with each other (single-writer assumption); on any save
    /// failure the session is kept so the operator can retry.
    #[instrument(skip(self, report_text), fields(order_id = key.order_id, location = %key.location))]
    pub async fn finalize_separation(
        &self,
        key: &SessionKey,
        report_text: &str,
    ) -> Result<(), ServiceError> {
        let session = self.sessions.get(key).ok_or_else(|| {
            ServiceError::not_found(format!(
                "No separation in progress for order {} at {}",
                key.order_id, key.location
            ))
        })?;

        let lines = self.picking_for(key.order_id, &key.location).await?;
        let discrepancy_log = discrepancy_log(&lines, &session);

        let mut package_rows = self.store.load_packages().await?;
        package_rows.retain(|row| !row.matches(key.order_id, &key.location));
        for package in &session.packages {
            package_rows.extend(package.to_rows(key.order_id, &key.location));
        }
        self.store.save_packages(&package_rows).await?;

        let end_time = Utc::now();
        let mut records = self.store.load_separations().await?;
        match records
            .iter_mut()
            .find(|r| r.matches(key.order_id, &key.location))
        {
            Some(record) => {
                record.end_time = Some(end_time);
                record.discrepancy_log = discrepancy_log.clone();
                record.discrepancy_report = report_text.to_string();
            }
            // The record can be missing if the separation table was reset
            // underneath the session; recreate it from session state.
            None => records.push(SeparationRecord {
                order_id: key.order_id,
                location: key.location.clone(),
                user: session.user.clone(),
                start_time: session.start_time,
                end_time: Some(end_time),
                discrepancy_log: discrepancy_log.clone(),
                discrepancy_report: report_text.to_string(),
            }),
        }
        self.store.save_separations(&records).await?;

        self.sessions.discard(key);
        if discrepancy_log.is_empty() {
            info!("separation finalized");
        } else {
            info!(%discrepancy_log, "separation finalized with discrepancies");
        }
        Ok(())
    }

    async fn picking_for(
        &self,
        order_id: i64,
        location: &str,
    ) -> Result<Vec<PickingLine>, ServiceError> {
        Ok(self
            .store
            .load_picking()
            .await?
            .into_iter()
            .filter(|line| line.matches(order_id, location))
            .collect())
    }
}

fn validate_weight(weight: Decimal) -> Result<(), ServiceError> {
    if weight <= Decimal::ZERO {
        return Err(ServiceError::validation(
            "Package weight must be a positive number",
        ));
    }
    Ok(())
}

/// Check requested quantities against the picking lines and what the
/// session has already allocated. `exclude` removes one package from the
/// baseline when that package is being edited.
fn validate_items(
    lines: &[PickingLine],
    session: &SeparationSession,
    exclude: Option<u32>,
    items: &[ItemQuantity],
) -> Result<Vec<PackageItem>, ServiceError> {
    let mut accepted = Vec::new();

    for requested in items {
        if requested.quantity < Decimal::ZERO {
            return Err(ServiceError::validation(format!(
                "Quantity for item {} must be a positive number",
                requested.item_code
            )));
        }
        if requested.quantity.is_zero() {
            continue;
        }

        let line = lines
            .iter()
            .find(|l| l.item_code == requested.item_code)
            .ok_or_else(|| {
                ServiceError::validation(format!(
                    "Item {} is not part of this picking",
                    requested.item_code
                ))
            })?;

        if !line.allows_fractional() && !requested.quantity.fract().is_zero() {
            return Err(ServiceError::validation(format!(
                "Item {} is measured in {}; quantity must be a whole number",
                requested.item_code, line.unit_of_measure
            )));
        }

        // An input may list the same item more than once; quantities
        // already accepted from it count against the ordered total too.
        let pending: Decimal = accepted
            .iter()
            .filter(|item: &&PackageItem| item.item_code == requested.item_code)
            .map(|item| item.quantity)
            .sum();
        let already_packed = pending
            + match exclude {
                Some(package_id) => {
                    session.packed_quantity_excluding(&requested.item_code, package_id)
                }
                None => session.packed_quantity(&requested.item_code),
            };
        if already_packed + requested.quantity > line.ordered_quantity {
            return Err(ServiceError::validation(format!(
                "Quantity for item {} exceeds the ordered quantity ({} of {} already separated)",
                requested.item_code, already_packed, line.ordered_quantity
            )));
        }

        accepted.push(PackageItem {
            item_code: requested.item_code.clone(),
            item_name: line.item_name.clone(),
            quantity: requested.quantity,
        });
    }

    if accepted.is_empty() {
        return Err(ServiceError::EmptyPackage);
    }
    Ok(accepted)
}

/// One log line per item whose packed total differs from the ordered
/// quantity, in picking-line order.
fn discrepancy_log(lines: &[PickingLine], session: &SeparationSession) -> String {
    let entries: Vec<String> = lines
        .iter()
        .filter_map(|line| {
            let packed = session.packed_quantity(&line.item_code);
            if packed != line.ordered_quantity {
                Some(format!(
                    "Item {}: Pedido={}, Separado={}",
                    line.item_code, line.ordered_quantity, packed
                ))
            } else {
                None
            }
        })
        .collect();
    entries.join(" | ")
}
