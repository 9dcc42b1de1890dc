pub mod store;
pub use store::{Collection, NewRow, Record, RecordStore, SharedStore};
pub mod repository;
pub use repository::Repository;
pub mod memory_store;
pub use memory_store::MemoryStore;
pub mod pg_store;
pub use pg_store::PgStore;
pub mod ledger;
pub use ledger::{NotificationLedger, SharedLedger, StoreLedger};
pub mod seed;
