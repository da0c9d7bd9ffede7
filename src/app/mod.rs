// Application layer: wires configuration and AWS adapters into the core tasks.

#[cfg(feature = "cli")]
pub mod commands;
