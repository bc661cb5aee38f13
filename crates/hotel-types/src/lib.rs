//! Core types and traits for the hotel back-office access and history core.
//!
//! Documents are loosely typed bags of fields ([`Snapshot`]); everything that
//! talks to storage goes through [`DocumentStore`] and [`IdentityDirectory`].

mod access;
mod dto;
mod entity;
mod history;
mod query;
mod traits;
mod value;

pub use access::*;
pub use dto::*;
pub use entity::*;
pub use history::*;
pub use query::*;
pub use traits::*;
pub use value::*;
