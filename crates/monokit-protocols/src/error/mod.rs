//! Error types shared across Monokit crates.

mod component;
mod provider;

pub use component::ComponentError;
pub use provider::ProviderError;
