use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use tracing::{info, instrument};

use crate::errors::ServiceError;
use crate::models::{group_rows, PackageItem, PackageRow, PackingRecord};
use crate::store::TableStore;

use super::packing_finalized_keys;

/// Allowed relative divergence between declared and measured weight.
pub const WEIGHT_TOLERANCE: Decimal = dec!(0.05);

/// Packing-side status of a package's key on the work queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
pub enum PackingStatus {
    #[serde(rename = "Aguardando Início")]
    #[strum(serialize = "Aguardando Início")]
    AguardandoInicio,
    #[serde(rename = "Finalizado")]
    #[strum(serialize = "Finalizado")]
    Finalizado,
}

/// One row on the packing queue: a package awaiting (or done with)
/// verification, with its declared weight for operator reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackingQueueEntry {
    pub order_id: i64,
    pub location: String,
    pub package_id: u32,
    pub weight: Decimal,
    pub status: PackingStatus,
}

/// A package as presented on the verification screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerifiablePackage {
    pub package_id: u32,
    pub declared_weight: Decimal,
    pub items: Vec<PackageItem>,
}

/// Operator input for one package during verification. `measured_weight`
/// is `None` when the scale reading was missing or not a number, which is
/// always a blocking error.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageCheck {
    pub package_id: u32,
    pub confirmed: bool,
    pub measured_weight: Option<Decimal>,
}

/// Packing reconciliation: re-weigh and confirm the packages a separation
/// produced, recording weight anomalies against the packing log.
#[derive(Clone)]
pub struct PackingService {
    store: Arc<dyn TableStore>,
}

impl PackingService {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }

    /// Every package whose key has been separated without discrepancy, one
    /// row per package. Keys already fully verified are included with the
    /// `Finalizado` status so callers can filter either way.
    #[instrument(skip(self))]
    pub async fn list_ready_for_packing(&self) -> Result<Vec<PackingQueueEntry>, ServiceError> {
        let packages = self.store.load_packages().await?;
        if packages.is_empty() {
            return Ok(Vec::new());
        }
        let separations = self.store.load_separations().await?;
        let packing = self.store.load_packing().await?;

        let incomplete: HashSet<(i64, String)> = separations
            .iter()
            .filter(|r| r.has_discrepancy())
            .map(|r| (r.order_id, r.location.clone()))
            .collect();
        let finalized = packing_finalized_keys(&packages, &packing);

        let mut entries: Vec<PackingQueueEntry> = Vec::new();
        let mut seen: HashSet<(i64, String, u32)> = HashSet::new();
        for row in &packages {
            let key = (row.order_id, row.location.clone());
            if incomplete.contains(&key) {
                continue;
            }
            if !seen.insert((row.order_id, row.location.clone(), row.package_id)) {
                continue;
            }
            let status = if finalized.contains(&key) {
                PackingStatus::Finalizado
            } else {
                PackingStatus::AguardandoInicio
            };
            entries.push(PackingQueueEntry {
                order_id: row.order_id,
                location: row.location.clone(),
                package_id: row.package_id,
                weight: row.weight,
                status,
            });
        }
        Ok(entries)
    }

    /// The key's packages grouped for the verification screen; empty when
    /// the key has no packages.
    #[instrument(skip(self))]
    pub async fn packages_for_verification(
        &self,
        order_id: i64,
        location: &str,
    ) -> Result<Vec<VerifiablePackage>, ServiceError> {
        let rows: Vec<PackageRow> = self
            .store
            .load_packages()
            .await?
            .into_iter()
            .filter(|row| row.matches(order_id, location))
            .collect();

        Ok(group_rows(&rows)
            .into_iter()
            .map(|package| VerifiablePackage {
                package_id: package.id,
                declared_weight: package.weight,
                items: package.items,
            })
            .collect())
    }

    /// Verify every package of a key and write its packing records.
    ///
    /// Each package needs an explicit confirmation and a numeric measured
    /// weight; any miss is a blocking error and nothing is written. A
    /// weight outside the tolerance is advisory: it is recorded as an
    /// anomaly note on that package's record and finalization proceeds.
    /// Returns the blocking error messages, empty on success.
    /// Re-finalizing a key replaces its previous records.
    #[instrument(skip(self, checks))]
    pub async fn verify_and_finalize(
        &self,
        order_id: i64,
        location: &str,
        checks: &[PackageCheck],
        user: &str,
    ) -> Result<Vec<String>, ServiceError> {
        let rows: Vec<PackageRow> = self
            .store
            .load_packages()
            .await?
            .into_iter()
            .filter(|row| row.matches(order_id, location))
            .collect();
        let packages = group_rows(&rows);
        if packages.is_empty() {
            return Err(ServiceError::not_found(format!(
                "No packages for order {order_id} at {location}"
            )));
        }

        let mut errors: Vec<String> = Vec::new();
        let mut anomalies: HashMap<u32, String> = HashMap::new();

        for package in &packages {
            let check = checks.iter().find(|c| c.package_id == package.id);
            let Some(check) = check.filter(|c| c.confirmed) else {
                errors.push(format!("Package {} must be confirmed", package.id));
                continue;
            };

            match check.measured_weight {
                None => errors.push(format!(
                    "Measured weight for package {} is not a valid number",
                    package.id
                )),
                Some(measured) => {
                    let declared = package.weight;
                    if (measured - declared).abs() > declared * WEIGHT_TOLERANCE {
                        anomalies.insert(
                            package.id,
                            format!(
                                "Divergência de peso no Pacote {}. Registrado: {} kg, Conferido: {} kg.",
                                package.id,
                                declared.round_dp(2),
                                measured.round_dp(2)
                            ),
                        );
                    }
                }
            }
        }

        if !errors.is_empty() {
            return Ok(errors);
        }

        let now = Utc::now();
        let anomaly_count = anomalies.len();
        let mut records = self.store.load_packing().await?;
        records.retain(|record| !record.matches(order_id, location));
        for package in &packages {
            records.push(PackingRecord {
                order_id,
                location: location.to_string(),
                package_id: package.id,
                user: user.to_string(),
                start_time: now,
                end_time: now,
                anomaly_notes: anomalies.remove(&package.id).unwrap_or_default(),
            });
        }
        self.store.save_packing(&records).await?;

        info!(
            packages = packages.len(),
            anomalies = anomaly_count,
            "packing finalized"
        );
        Ok(Vec::new())
    }
}
