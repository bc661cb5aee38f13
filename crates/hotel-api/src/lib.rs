//! HTTP surface for hotel operations: scoped entity CRUD, stats, and history.

pub mod config;
pub mod server;
