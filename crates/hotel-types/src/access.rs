//! Users, roles, and resolved access scopes.

use serde::{Deserialize, Serialize};

/// Sentinel a caller sends to ask for every unit it may see.
pub const ALL_UNITS: &str = "all";

/// Role of a back-office user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Standard,
    SystemAdmin,
}

/// User as provisioned in the identity directory. Read-only to this core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub role: Role,
    /// Hotels (organizational units) explicitly granted to the user.
    #[serde(default)]
    pub hotels: Vec<String>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::SystemAdmin
    }

    /// Name shown in audit trails: display name, else email.
    pub fn display_label(&self) -> String {
        match self.display_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self.email.clone(),
        }
    }

    /// True when `identity` is this user's id or email.
    pub fn matches_identity(&self, identity: &str) -> bool {
        self.id == identity || self.email.eq_ignore_ascii_case(identity)
    }
}

/// Units a user may access, resolved per request.
///
/// `Units` is never empty and keeps the order of the user's grant list with
/// duplicates removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessScope {
    /// Unrestricted (administrators).
    All,
    Units(Vec<String>),
    /// No access at all.
    Empty,
}

impl AccessScope {
    pub fn from_units<I, S>(units: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for unit in units {
            let unit = unit.into();
            let unit = unit.trim();
            if unit.is_empty() || out.iter().any(|u| u == unit) {
                continue;
            }
            out.push(unit.to_string());
        }
        if out.is_empty() {
            AccessScope::Empty
        } else {
            AccessScope::Units(out)
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, AccessScope::All)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, AccessScope::Empty)
    }

    pub fn contains(&self, unit: &str) -> bool {
        match self {
            AccessScope::All => true,
            AccessScope::Units(units) => units.iter().any(|u| u == unit),
            AccessScope::Empty => false,
        }
    }

    /// Explicit units; empty for `All` and `Empty`.
    pub fn units(&self) -> &[String] {
        match self {
            AccessScope::Units(units) => units,
            _ => &[],
        }
    }
}

/// Unit filter requested by a caller: one hotel, or everything in scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitFilter {
    All,
    Unit(String),
}

impl UnitFilter {
    /// `None`, blank, and `"all"` (any case) all mean [`UnitFilter::All`].
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => UnitFilter::All,
            Some(s) if s.eq_ignore_ascii_case(ALL_UNITS) => UnitFilter::All,
            Some(s) => UnitFilter::Unit(s.to_string()),
        }
    }
}
