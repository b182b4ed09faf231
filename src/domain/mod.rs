// Domain layer: record model and the ports the coordinator drives.

pub mod model;
pub mod ports;
