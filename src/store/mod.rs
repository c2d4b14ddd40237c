//! deduplicating content store for distributable files

mod materialize;
mod naming;
mod plan;

pub use materialize::materialize;
pub use naming::{base_name, storage_name};
pub use plan::{plan_storage, BlobMapping, StoragePlan};
