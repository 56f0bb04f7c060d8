use std::sync::Arc;

use rust_decimal::Decimal;

use fulfillment_core::models::PickingLine;
use fulfillment_core::services::session::SessionKey;
use fulfillment_core::services::separation::{ItemQuantity, PackageInput};
use fulfillment_core::store::InMemoryStore;
use fulfillment_core::AppServices;

/// Test harness: the full service bundle over an in-memory table store
/// seeded with picking lines.
pub struct TestApp {
    pub services: AppServices,
    pub store: Arc<InMemoryStore>,
}

impl TestApp {
    pub async fn with_picking(lines: Vec<PickingLine>) -> Self {
        let store = Arc::new(InMemoryStore::new());
        store.seed_picking(lines).await;
        let services = AppServices::new(store.clone());
        Self { services, store }
    }
}

#[allow(dead_code)]
pub fn picking_line(
    order_id: i64,
    item_code: &str,
    location: &str,
    ordered_quantity: Decimal,
    unit_of_measure: &str,
) -> PickingLine {
    PickingLine {
        order_id,
        item_code: item_code.to_string(),
        item_name: format!("Item {item_code}"),
        location: location.to_string(),
        customer_name: format!("Customer {order_id}"),
        delivery_type: "01".to_string(),
        ordered_quantity,
        unit_of_measure: unit_of_measure.to_string(),
        unit_weight: Decimal::ONE,
    }
}

#[allow(dead_code)]
pub fn session_key(order_id: i64, location: &str, user: &str) -> SessionKey {
    SessionKey::new(order_id, location, user)
}

#[allow(dead_code)]
pub fn package_of(weight: Decimal, items: &[(&str, Decimal)]) -> PackageInput {
    PackageInput {
        weight,
        sub_location: String::new(),
        report: String::new(),
        items: items
            .iter()
            .map(|(code, quantity)| ItemQuantity {
                item_code: (*code).to_string(),
                quantity: *quantity,
            })
            .collect(),
    }
}
