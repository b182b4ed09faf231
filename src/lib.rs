pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use app::{run_service, Service, ServiceFailure, ServiceOptions};
pub use config::MigrationConfig;
pub use core::{RunCoordinator, RunOptions, RunReport};
pub use utils::error::{MigrateError, Result};
