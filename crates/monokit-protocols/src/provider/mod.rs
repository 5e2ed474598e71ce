//! Health check provider protocol.

mod result;
mod traits;

pub use result::ProviderResult;
pub use traits::Provider;
