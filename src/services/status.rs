use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::instrument;

use crate::errors::ServiceError;
use crate::models::{PickingLine, SeparationRecord, DELIVERY_TYPE_PICKUP};
use crate::store::TableStore;

use super::packing_finalized_keys;

/// The five-state status machine for one (order, location), highest
/// priority first. Serialized and displayed with the canonical names the
/// downstream screens filter on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display,
)]
pub enum LocationStatus {
    #[serde(rename = "Em separação")]
    #[strum(serialize = "Em separação")]
    EmSeparacao,
    #[serde(rename = "Picking Incompleto")]
    #[strum(serialize = "Picking Incompleto")]
    PickingIncompleto,
    #[serde(rename = "Packing Finalizado")]
    #[strum(serialize = "Packing Finalizado")]
    PackingFinalizado,
    #[serde(rename = "Aguardando Packing")]
    #[strum(serialize = "Aguardando Packing")]
    AguardandoPacking,
    #[serde(rename = "Pendente")]
    #[strum(serialize = "Pendente")]
    Pendente,
}

/// Status of one of an order's locations, with the operator currently
/// separating it when one is active.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationProgress {
    pub location: String,
    pub status: LocationStatus,
    pub active_user: Option<String>,
}

/// An order with the per-location statuses derived from the three stateful
/// tables. Locations progress independently; their statuses are never
/// collapsed into one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderSummary {
    pub order_id: i64,
    pub customer_name: String,
    pub delivery_type: String,
    pub locations: Vec<LocationProgress>,
}

/// An order's picking lines grouped by location, for the detail screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PickingDetails {
    pub order_id: i64,
    pub customer_name: String,
    pub locations: BTreeMap<String, Vec<PickingLine>>,
}

/// Order-level status on the customer-pickup board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
pub enum PickupStatus {
    #[serde(rename = "Pendente")]
    #[strum(serialize = "Pendente")]
    Pendente,
    #[serde(rename = "Em Separação")]
    #[strum(serialize = "Em Separação")]
    EmSeparacao,
    #[serde(rename = "Aguardando Retirada")]
    #[strum(serialize = "Aguardando Retirada")]
    AguardandoRetirada,
}

/// One row on the pickup board: order progress plus where the customer
/// collects the packages once separation is done.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PickupPanelEntry {
    pub order_id: i64,
    pub customer_name: String,
    pub status: PickupStatus,
    pub percent: u32,
    pub pickup_location: String,
}

/// Status Resolution Engine: joins the stateful tables into one status per
/// (order, location). Read-only; never mutates any table.
#[derive(Clone)]
pub struct StatusService {
    store: Arc<dyn TableStore>,
}

impl StatusService {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }

    /// One status per distinct (order, location) in the picking table,
    /// grouped by order. Blank-location rows are malformed and skipped.
    /// Orders and locations keep the first-seen order of the picking
    /// snapshot, so identical snapshots always resolve identically.
    #[instrument(skip(self))]
    pub async fn resolve_statuses(&self) -> Result<Vec<OrderSummary>, ServiceError> {
        let picking = self.store.load_picking().await?;
        if picking.is_empty() {
            return Ok(Vec::new());
        }
        let separations = self.store.load_separations().await?;
        let packing = self.store.load_packing().await?;
        let packages = self.store.load_packages().await?;

        let finalized = packing_finalized_keys(&packages, &packing);
        let separation_index: HashMap<(i64, &str), &SeparationRecord> = separations
            .iter()
            .map(|record| ((record.order_id, record.location.as_str()), record))
            .collect();

        let mut orders: Vec<OrderSummary> = Vec::new();
        let mut order_position: HashMap<i64, usize> = HashMap::new();
        let mut seen_keys: HashSet<(i64, String)> = HashSet::new();

        for line in picking.iter().filter(|l| l.has_location()) {
            let key = (line.order_id, line.location.clone());
            if !seen_keys.insert(key.clone()) {
                continue;
            }

            let (status, active_user) =
                match separation_index.get(&(line.order_id, line.location.as_str())) {
                    None => (LocationStatus::Pendente, None),
                    Some(record) if record.is_open() => {
                        (LocationStatus::EmSeparacao, Some(record.user.clone()))
                    }
                    Some(record) if record.has_discrepancy() => {
                        (LocationStatus::PickingIncompleto, None)
                    }
                    Some(_) if finalized.contains(&key) => {
                        (LocationStatus::PackingFinalizado, None)
                    }
                    Some(_) => (LocationStatus::AguardandoPacking, None),
                };

            let index = *order_position.entry(line.order_id).or_insert_with(|| {
                orders.push(OrderSummary {
                    order_id: line.order_id,
                    customer_name: line.customer_name.clone(),
                    delivery_type: line.delivery_type.clone(),
                    locations: Vec::new(),
                });
                orders.len() - 1
            });
            orders[index].locations.push(LocationProgress {
                location: line.location.clone(),
                status,
                active_user,
            });
        }

        Ok(orders)
    }

    /// All of an order's picking lines grouped by location, or `None` for
    /// an unknown order.
    #[instrument(skip(self))]
    pub async fn picking_details(
        &self,
        order_id: i64,
    ) -> Result<Option<PickingDetails>, ServiceError> {
        let lines: Vec<PickingLine> = self
            .store
            .load_picking()
            .await?
            .into_iter()
            .filter(|line| line.order_id == order_id)
            .collect();

        let Some(first) = lines.first() else {
            return Ok(None);
        };
        let customer_name = first.customer_name.clone();

        let mut locations: BTreeMap<String, Vec<PickingLine>> = BTreeMap::new();
        for line in lines {
            locations.entry(line.location.clone()).or_default().push(line);
        }

        Ok(Some(PickingDetails {
            order_id,
            customer_name,
            locations,
        }))
    }

    /// The customer-pickup board: progress per pickup order, sorted by
    /// customer name. Orders leave the board once packing is finalized.
    #[instrument(skip(self))]
    pub async fn pickup_panel(&self) -> Result<Vec<PickupPanelEntry>, ServiceError> {
        let picking = self.store.load_picking().await?;
        let separations = self.store.load_separations().await?;
        let packages = self.store.load_packages().await?;
        let packing = self.store.load_packing().await?;

        let packed_orders: HashSet<i64> = packing.iter().map(|r| r.order_id).collect();
        let started_orders: HashSet<i64> = separations.iter().map(|r| r.order_id).collect();
        let finished_orders: HashSet<i64> = separations
            .iter()
            .filter(|r| !r.is_open())
            .map(|r| r.order_id)
            .collect();

        let mut entries: Vec<PickupPanelEntry> = Vec::new();
        let mut seen_orders: HashSet<i64> = HashSet::new();

        for line in picking
            .iter()
            .filter(|l| l.delivery_type == DELIVERY_TYPE_PICKUP)
        {
            if !seen_orders.insert(line.order_id) || packed_orders.contains(&line.order_id) {
                continue;
            }

            let entry = if finished_orders.contains(&line.order_id) {
                let mut pickup_spots: Vec<String> = Vec::new();
                for row in packages.iter().filter(|r| r.order_id == line.order_id) {
                    let spot = row.sub_location.trim();
                    if !spot.is_empty() && !pickup_spots.iter().any(|s| s == spot) {
                        pickup_spots.push(spot.to_string());
                    }
                }
                PickupPanelEntry {
                    order_id: line.order_id,
                    customer_name: line.customer_name.clone(),
                    status: PickupStatus::AguardandoRetirada,
                    percent: 100,
                    pickup_location: pickup_spots.join(", "),
                }
            } else if started_orders.contains(&line.order_id) {
                let ordered: Decimal = picking
                    .iter()
                    .filter(|l| l.order_id == line.order_id)
                    .map(|l| l.ordered_quantity)
                    .sum();
                let separated: Decimal = packages
                    .iter()
                    .filter(|r| r.order_id == line.order_id)
                    .map(|r| r.quantity)
                    .sum();
                let percent = if ordered > Decimal::ZERO {
                    (separated / ordered * Decimal::from(100))
                        .round()
                        .to_u32()
                        .unwrap_or(0)
                        .min(100)
                } else {
                    0
                };
                PickupPanelEntry {
                    order_id: line.order_id,
                    customer_name: line.customer_name.clone(),
                    status: PickupStatus::EmSeparacao,
                    percent,
                    pickup_location: String::new(),
                }
            } else {
                PickupPanelEntry {
                    order_id: line.order_id,
                    customer_name: line.customer_name.clone(),
                    status: PickupStatus::Pendente,
                    percent: 0,
                    pickup_location: String::new(),
                }
            };
            entries.push(entry);
        }

        entries.sort_by(|a, b| a.customer_name.cmp(&b.customer_name));
        Ok(entries)
    }
}
