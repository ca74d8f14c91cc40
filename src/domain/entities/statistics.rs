use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Aggregate counters shown above the conversation list.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChatStatistics {
    /// Number of conversations visible to the operator.
    pub total_conversations: u64,
    /// Unread remote messages across all conversations.
    pub unread_count: u64,
    /// Messages exchanged today.
    pub today_messages: u64,
    /// Additional named counters (per zone, per status, ...).
    pub breakdowns: BTreeMap<String, u64>,
}
