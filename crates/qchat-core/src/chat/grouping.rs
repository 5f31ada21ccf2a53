use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};

use crate::chat::ConversationRecord;

/// Conversations bucketed by age for the sidebar.
///
/// Each record lands in exactly one bucket; order within a bucket follows the
/// input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatGroups {
    pub yesterday: Vec<ConversationRecord>,
    pub last_7_days: Vec<ConversationRecord>,
    pub last_30_days: Vec<ConversationRecord>,
    /// Keyed by `YYYY-MM`.
    pub older: BTreeMap<String, Vec<ConversationRecord>>,
}

impl ChatGroups {
    pub fn is_empty(&self) -> bool {
        self.yesterday.is_empty()
            && self.last_7_days.is_empty()
            && self.last_30_days.is_empty()
            && self.older.is_empty()
    }

    /// Buckets paired with display labels, newest first. Empty buckets are skipped.
    pub fn labelled(&self) -> Vec<(String, &[ConversationRecord])> {
        let mut sections: Vec<(String, &[ConversationRecord])> = Vec::new();
        for (label, chats) in [
            ("Yesterday", &self.yesterday),
            ("Previous 7 days", &self.last_7_days),
            ("Previous 30 days", &self.last_30_days),
        ] {
            if !chats.is_empty() {
                sections.push((label.to_string(), chats.as_slice()));
            }
        }
        for (month, chats) in self.older.iter().rev() {
            sections.push((month.clone(), chats.as_slice()));
        }
        sections
    }
}

/// Groups conversations by how long ago they were created relative to `now`.
///
/// Boundaries are inclusive: a chat exactly one day old is "yesterday".
/// Anything older than 30 days is keyed by its creation month.
pub fn group_by_date(chats: &[ConversationRecord], now: DateTime<Utc>) -> ChatGroups {
    let one_day_ago = now - TimeDelta::days(1);
    let seven_days_ago = now - TimeDelta::days(7);
    let thirty_days_ago = now - TimeDelta::days(30);

    let mut groups = ChatGroups::default();
    for chat in chats {
        let created = chat.created_at;
        if created >= one_day_ago {
            groups.yesterday.push(chat.clone());
        } else if created >= seven_days_ago {
            groups.last_7_days.push(chat.clone());
        } else if created >= thirty_days_ago {
            groups.last_30_days.push(chat.clone());
        } else {
            groups
                .older
                .entry(created.format("%Y-%m").to_string())
                .or_default()
                .push(chat.clone());
        }
    }
    groups
}
