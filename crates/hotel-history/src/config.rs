use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HistoryConfig {
    /// Collection holding history records.
    pub collection: String,
    /// Most entries returned per entity. Applied after the newest-first sort,
    /// so only the oldest entries are dropped.
    pub scan_limit: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            collection: "history".to_string(),
            scan_limit: 1000,
        }
    }
}
