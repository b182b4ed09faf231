pub mod collector;
pub mod coordinator;
pub mod transform;

pub use crate::domain::model::{CanonicalRecord, NaturalKey, Outcome, OutcomeKind, RawRecord, RunState, RunSummary};
pub use crate::domain::ports::{ConfigProvider, Destination, Migration, RecordSource};
pub use crate::utils::error::Result;
pub use coordinator::{RunCoordinator, RunOptions, RunReport};
