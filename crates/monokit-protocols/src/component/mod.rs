//! Component descriptors and the registration seam.

mod access;
mod descriptor;
mod entry;
mod platform;

pub use access::ComponentRegistryAccess;
pub use descriptor::{AutoDetect, Component, ComponentInfo, ComponentSource};
pub use entry::{EntryPoint, InvokeContext, ProviderEntryPoint};
pub use platform::Platform;
