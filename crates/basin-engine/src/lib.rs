//! Basin Engine
//!
//! Registry of built wells for an embedding host. Wells are keyed by the hash
//! of their configuration and each one is guarded by its own lock.

pub mod registry;
pub mod telemetry;

pub use registry::{RegistryError, WellRegistry, WellSnapshot};
pub use telemetry::{env_filter, init_tracing, log_directives};
