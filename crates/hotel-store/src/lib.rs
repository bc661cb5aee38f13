//! Document store and identity directory implementations.

mod directory;
mod memory;
mod timed;

#[cfg(feature = "test-util")]
mod faulty;

pub use directory::InMemoryDirectory;
pub use hotel_types::{DocumentStore, IdentityDirectory, StoreError, StoreQuery};
pub use memory::{InMemoryDocumentStore, DEFAULT_MAX_IN_VALUES};
pub use timed::Timed;

#[cfg(feature = "test-util")]
pub use faulty::FaultyStore;
