pub mod migrations;
pub mod services;

pub use services::{run_service, MigrationKind, Service, ServiceFailure, ServiceOptions};
