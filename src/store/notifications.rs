use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use crate::models::notification::{Notification, NotificationKind, ReadStatus};

/// Durable ledger of operator alerts. Rows are appended, flipped to read, and
/// never deleted; unread accounting is always derived from the rows here,
/// never from a running counter.
pub struct NotificationStore {
    rows: DashMap<Uuid, Notification>,
}

impl NotificationStore {
    pub fn new() -> Self {
        Self {
            rows: DashMap::new(),
        }
    }

    pub fn append(&self, kind: NotificationKind, message: String, subject_id: Uuid) -> Notification {
        let row = Notification {
            id: Uuid::new_v4(),
            kind,
            message,
            subject_id,
            status: ReadStatus::Unread,
            created_at: Utc::now(),
        };
        self.rows.insert(row.id, row.clone());
        row
    }

    /// Flips one row to read. Already-read rows are a no-op success.
    pub fn mark_read(&self, id: Uuid) -> Option<Notification> {
        let mut entry = self.rows.get_mut(&id)?;
        entry.value_mut().status = ReadStatus::Read;
        Some(entry.value().clone())
    }

    /// Flips every unread row. Returns how many rows actually changed, so a
    /// repeat call reports zero.
    pub fn mark_all_read(&self) -> usize {
        let mut flipped = 0;
        for mut entry in self.rows.iter_mut() {
            if entry.value().status == ReadStatus::Unread {
                entry.value_mut().status = ReadStatus::Read;
                flipped += 1;
            }
        }
        flipped
    }

    /// Full ledger partitioned into unread and read, newest first. This is
    /// what consoles reconcile against after a reconnect.
    pub fn fetch(&self) -> (Vec<Notification>, Vec<Notification>) {
        let mut unread = Vec::new();
        let mut read = Vec::new();
        for entry in self.rows.iter() {
            match entry.value().status {
                ReadStatus::Unread => unread.push(entry.value().clone()),
                ReadStatus::Read => read.push(entry.value().clone()),
            }
        }
        unread.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        read.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        (unread, read)
    }

    pub fn unread_count(&self) -> usize {
        self.rows
            .iter()
            .filter(|entry| entry.value().status == ReadStatus::Unread)
            .count()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Default for NotificationStore {
    fn default() -> Self {
        Self::new()
    }
}
