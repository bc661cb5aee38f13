//! Audit trail for entity mutations.
//!
//! - [`diff`]: field-level diff between two snapshots.
//! - [`HistoryLog`]: append-only log stored in a document collection, read
//!   back newest-first whichever payload shape a record was written in.
//! - [`Formatter`]: renders entries as labelled before/after lines.

mod config;
mod diff;
mod format;
mod log;
mod record;

pub use config::HistoryConfig;
pub use diff::{diff, field_changes};
pub use format::{
    field_label, is_valid_date_format, EntryHeader, FormattedChange, FormattedEntry, Formatter,
    FormatterOptions, DETAILS_UNAVAILABLE, NOT_SET,
};
pub use log::{AppendRequest, HistoryLog};
pub use record::{changed_fields, last_known_state, normalize_changes};

use hotel_types::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("history storage: {0}")]
    Store(#[from] StoreError),
    #[error("cannot encode history record: {0}")]
    Encode(String),
}
