use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One item allocation inside a package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageItem {
    pub item_code: String,
    pub item_name: String,
    pub quantity: Decimal,
}

/// A physical package assembled during a separation session: a weighed
/// container holding a subset of the ordered items, plus an optional
/// staging sub-location and operator note.
///
/// Package ids are sequential within a session and renumbered contiguously
/// when a package is removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    pub id: u32,
    pub weight: Decimal,
    pub sub_location: String,
    pub report: String,
    pub items: Vec<PackageItem>,
}

impl Package {
    /// Flatten into the persisted columnar layout, one row per item.
    pub fn to_rows(&self, order_id: i64, location: &str) -> Vec<PackageRow> {
        self.items
            .iter()
            .map(|item| PackageRow {
                order_id,
                location: location.to_string(),
                package_id: self.id,
                weight: self.weight,
                item_code: item.item_code.clone(),
                item_name: item.item_name.clone(),
                quantity: item.quantity,
                report: self.report.clone(),
                sub_location: self.sub_location.clone(),
            })
            .collect()
    }
}

/// Persisted representation of a package: one row per (package, item),
/// matching the columnar package snapshot table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageRow {
    #[serde(rename = "OrderID")]
    pub order_id: i64,
    #[serde(rename = "Location")]
    pub location: String,
    #[serde(rename = "PackageID")]
    pub package_id: u32,
    #[serde(rename = "Weight")]
    pub weight: Decimal,
    #[serde(rename = "ItemCode")]
    pub item_code: String,
    #[serde(rename = "ItemName", default)]
    pub item_name: String,
    #[serde(rename = "PackedQuantity")]
    pub quantity: Decimal,
    #[serde(rename = "Report", default)]
    pub report: String,
    #[serde(rename = "SubLocation", default)]
    pub sub_location: String,
}

impl PackageRow {
    pub fn matches(&self, order_id: i64, location: &str) -> bool {
        self.order_id == order_id && self.location == location
    }
}

/// Regroup flat rows into packages, preserving the first-seen package
/// order of the input rows.
pub fn group_rows(rows: &[PackageRow]) -> Vec<Package> {
    let mut packages: Vec<Package> = Vec::new();
    for row in rows {
        let position = match packages.iter().position(|p| p.id == row.package_id) {
            Some(position) => position,
            None => {
                packages.push(Package {
                    id: row.package_id,
                    weight: row.weight,
                    sub_location: row.sub_location.clone(),
                    report: row.report.clone(),
                    items: Vec::new(),
                });
                packages.len() - 1
            }
        };
        packages[position].items.push(PackageItem {
            item_code: row.item_code.clone(),
            item_name: row.item_name.clone(),
            quantity: row.quantity,
        });
    }
    packages
}
