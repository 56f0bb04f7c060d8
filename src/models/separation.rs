use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// State of a separation for one (order, location): who opened it, when it
/// was closed, and what mismatches were recorded at close time.
///
/// `end_time` is `None` exactly while the separation is open. Reopening a
/// finalized separation resets `end_time` and clears both log fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeparationRecord {
    #[serde(rename = "OrderID")]
    pub order_id: i64,
    #[serde(rename = "Location")]
    pub location: String,
    #[serde(rename = "User")]
    pub user: String,
    #[serde(rename = "StartTime")]
    pub start_time: DateTime<Utc>,
    #[serde(rename = "EndTime")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(rename = "DiscrepancyLog", default)]
    pub discrepancy_log: String,
    #[serde(rename = "DiscrepancyReport", default)]
    pub discrepancy_report: String,
}

impl SeparationRecord {
    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    /// A closed separation whose log is non-empty left the picking
    /// incomplete; the key must be redone before packing.
    pub fn has_discrepancy(&self) -> bool {
        !self.discrepancy_log.is_empty()
    }

    pub fn matches(&self, order_id: i64, location: &str) -> bool {
        self.order_id == order_id && self.location == location
    }
}
