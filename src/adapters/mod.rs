// Adapters layer: concrete stores behind the RecordSource / Destination ports.

pub mod memory;
pub mod mongo;
pub mod mysql;

pub use memory::{MemoryDestination, MemorySource};
pub use mongo::{MongoDestination, MongoSource, MongoStore};
pub use mysql::{MySqlDestination, MySqlEntity, MySqlStore};
