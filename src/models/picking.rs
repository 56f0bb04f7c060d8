use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Delivery type code for customer-pickup orders.
pub const DELIVERY_TYPE_PICKUP: &str = "02";

/// Units of measure that legitimately carry fractional quantities (weights
/// and lengths). Everything else (pieces, boxes, bundles) must be
/// separated in whole numbers.
const FRACTIONAL_UNITS: &[&str] = &["KG", "G", "TON", "MT", "M", "CM", "MM"];

/// One ordered (item, quantity) requirement for an order at a warehouse
/// location. Picking lines are reference data: they are refreshed wholesale
/// by an external sync and never mutated here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickingLine {
    #[serde(rename = "OrderID")]
    pub order_id: i64,
    #[serde(rename = "ItemCode")]
    pub item_code: String,
    #[serde(rename = "ItemName", default)]
    pub item_name: String,
    #[serde(rename = "Location")]
    pub location: String,
    #[serde(rename = "CustomerName")]
    pub customer_name: String,
    #[serde(rename = "DeliveryType", default)]
    pub delivery_type: String,
    #[serde(rename = "OrderedQuantity")]
    pub ordered_quantity: Decimal,
    #[serde(rename = "UnitOfMeasure", default)]
    pub unit_of_measure: String,
    #[serde(rename = "UnitWeight", default)]
    pub unit_weight: Decimal,
}

impl PickingLine {
    /// Whether this line's unit of measure admits fractional quantities.
    pub fn allows_fractional(&self) -> bool {
        let uom = self.unit_of_measure.trim().to_uppercase();
        FRACTIONAL_UNITS.iter().any(|unit| *unit == uom)
    }

    /// Lines with a blank location are malformed source data and are
    /// excluded from status resolution.
    pub fn has_location(&self) -> bool {
        !self.location.trim().is_empty()
    }

    pub fn matches(&self, order_id: i64, location: &str) -> bool {
        self.order_id == order_id && self.location == location
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(uom: &str) -> PickingLine {
        PickingLine {
            order_id: 1,
            item_code: "A".into(),
            item_name: "Item A".into(),
            location: "L1".into(),
            customer_name: "Customer".into(),
            delivery_type: "01".into(),
            ordered_quantity: dec!(10),
            unit_of_measure: uom.into(),
            unit_weight: dec!(1.5),
        }
    }

    #[test]
    fn weight_and_length_units_allow_fractions() {
        assert!(line("KG").allows_fractional());
        assert!(line("mt").allows_fractional());
        assert!(line(" M ").allows_fractional());
    }

    #[test]
    fn unit_counts_are_integral() {
        assert!(!line("UN").allows_fractional());
        assert!(!line("CX").allows_fractional());
        assert!(!line("").allows_fractional());
    }

    #[test]
    fn blank_location_is_flagged() {
        let mut l = line("UN");
        l.location = "  ".into();
        assert!(!l.has_location());
    }
}
