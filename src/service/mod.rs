pub mod container;
pub mod provider;

pub use container::{Capability, Container, Resolver};
pub use provider::{Provider, ProviderRegistry, ProviderTable};
