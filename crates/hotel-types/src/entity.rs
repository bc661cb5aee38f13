//! Entity kinds managed by the back office and their well-known fields.

use serde::{Deserialize, Serialize};

/// Field names shared by every entity document.
pub mod fields {
    pub const ID: &str = "id";
    /// Owning organizational unit.
    pub const HOTEL_ID: &str = "hotelId";
    pub const STATUS: &str = "status";
    pub const CREATED_AT: &str = "createdAt";
    pub const UPDATED_AT: &str = "updatedAt";
    pub const CREATED_BY: &str = "createdBy";
    pub const UPDATED_BY: &str = "updatedBy";
}

/// Kind of back-office entity. All three share the same shape as far as
/// access control and history are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Incident,
    Intervention,
    LostItem,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [
        EntityKind::Incident,
        EntityKind::Intervention,
        EntityKind::LostItem,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Incident => "incident",
            EntityKind::Intervention => "intervention",
            EntityKind::LostItem => "lost_item",
        }
    }

    /// Storage collection holding documents of this kind.
    pub fn collection(self) -> &'static str {
        match self {
            EntityKind::Incident => "incidents",
            EntityKind::Intervention => "interventions",
            EntityKind::LostItem => "lost_items",
        }
    }

    /// Status given to new documents that do not set one.
    pub fn default_status(self) -> &'static str {
        match self {
            EntityKind::Incident => "open",
            EntityKind::Intervention => "pending",
            EntityKind::LostItem => "stored",
        }
    }

    /// Lenient parse: accepts singular/plural, dashes, and underscores.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase().replace(['-', '_', ' '], "");
        match normalized.as_str() {
            "incident" | "incidents" => Some(EntityKind::Incident),
            "intervention" | "interventions" | "maintenance" => Some(EntityKind::Intervention),
            "lostitem" | "lostitems" | "lostandfound" => Some(EntityKind::LostItem),
            _ => None,
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_common_spellings() {
        assert_eq!(EntityKind::parse("lost-items"), Some(EntityKind::LostItem));
        assert_eq!(EntityKind::parse("Incidents"), Some(EntityKind::Incident));
        assert_eq!(EntityKind::parse("intervention"), Some(EntityKind::Intervention));
        assert_eq!(EntityKind::parse("guest"), None);
    }
}
