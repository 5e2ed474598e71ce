//! # Monokit Core
//!
//! The component registry shared by the CLI, the daemon and the plugin host,
//! plus small utilities used by builtin components and the alarm engine.

pub mod detect;
pub mod error;
pub mod registry;
pub mod throttle;

pub use error::RegistryError;
pub use registry::ComponentRegistry;
pub use throttle::{ActionThrottle, ThrottleDecision, ThrottlePolicy, ThrottleRecord};
