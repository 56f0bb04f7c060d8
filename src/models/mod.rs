// Typed rows for the four logical tables, plus the session-shaped package
// records built during separation.
pub mod package;
pub mod packing;
pub mod picking;
pub mod separation;

pub use package::{group_rows, Package, PackageItem, PackageRow};
pub use packing::PackingRecord;
pub use picking::{PickingLine, DELIVERY_TYPE_PICKUP};
pub use separation::SeparationRecord;
