//! Transferred resources.

mod resource;
mod store;

pub use resource::Resource;
pub use store::{InMemoryResourceStore, PostgresResourceStore, ResourceStore};
