use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Verification record for one package of a (order, location) key.
///
/// A key is packing-finalized when every package id in its current package
/// set has one of these records. Re-finalizing a key replaces all of its
/// prior records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackingRecord {
    #[serde(rename = "OrderID")]
    pub order_id: i64,
    #[serde(rename = "Location")]
    pub location: String,
    #[serde(rename = "PackageID")]
    pub package_id: u32,
    #[serde(rename = "User")]
    pub user: String,
    #[serde(rename = "StartTime")]
    pub start_time: DateTime<Utc>,
    #[serde(rename = "EndTime")]
    pub end_time: DateTime<Utc>,
    #[serde(rename = "AnomalyNotes", default)]
    pub anomaly_notes: String,
}

impl PackingRecord {
    pub fn matches(&self, order_id: i64, location: &str) -> bool {
        self.order_id == order_id && self.location == location
    }
}
