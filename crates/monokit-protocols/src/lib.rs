//! # Monokit Protocols
//!
//! Core protocol definitions (traits) for the Monokit agent.
//! Contains only interface definitions and plain descriptors.
//!
//! ## Core Traits
//!
//! - [`Provider`] - A single health check, in-process or behind a plugin
//! - [`EntryPoint`] - The invocable action stored in a [`Component`]
//! - [`ComponentRegistryAccess`] - Registration callback used by the plugin host

pub mod component;
pub mod error;
pub mod provider;

pub use component::{
    AutoDetect, Component, ComponentInfo, ComponentRegistryAccess, ComponentSource, EntryPoint,
    InvokeContext, Platform, ProviderEntryPoint,
};
pub use error::{ComponentError, ProviderError};
pub use provider::{Provider, ProviderResult};
