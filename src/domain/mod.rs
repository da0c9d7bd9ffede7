// Domain layer: payload models and ports (interfaces) over the cloud services.

pub mod model;
pub mod ports;
