// Core services
pub mod packing;
pub mod separation;
pub mod session;
pub mod status;

use std::collections::{HashMap, HashSet};

use crate::models::{PackageRow, PackingRecord};

/// Keys whose every current package id has a packing record. A key with no
/// packages is never considered finalized.
pub(crate) fn packing_finalized_keys(
    packages: &[PackageRow],
    packing: &[PackingRecord],
) -> HashSet<(i64, String)> {
    let mut package_ids: HashMap<(i64, String), HashSet<u32>> = HashMap::new();
    for row in packages {
        package_ids
            .entry((row.order_id, row.location.clone()))
            .or_default()
            .insert(row.package_id);
    }

    let mut verified_ids: HashMap<(i64, String), HashSet<u32>> = HashMap::new();
    for record in packing {
        verified_ids
            .entry((record.order_id, record.location.clone()))
            .or_default()
            .insert(record.package_id);
    }

    package_ids
        .into_iter()
        .filter(|(key, ids)| {
            verified_ids
                .get(key)
                .is_some_and(|verified| ids.is_subset(verified))
        })
        .map(|(key, _)| key)
        .collect()
}
