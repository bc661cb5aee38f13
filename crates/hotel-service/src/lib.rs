//! Entity services for incidents, interventions, and lost items.
//!
//! Every read is planned against the caller's access scope; every write is
//! checked against the entity's hotel and followed by a history append.

mod error;
mod ops;
mod service;

pub use error::ServiceError;
pub use ops::HotelOps;
pub use service::EntityService;
