use rusqlite::{params, Connection};

use super::{new_id, Storage, StorageResult};
use crate::db::models::{NewNotification, Notification};

/// Insert a notification on an existing connection or transaction, so
/// fan-out commits together with the action that caused it.
pub(crate) fn insert_notification(
    conn: &Connection,
    notification: &NewNotification,
) -> StorageResult<Notification> {
    let id = new_id();
    conn.execute(
        "INSERT INTO notifications (id, user_id, type, title, message, from_user_id, post_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            id,
            notification.user_id,
            notification.kind,
            notification.title,
            notification.message,
            notification.from_user_id,
            notification.post_id
        ],
    )?;

    Ok(conn.query_row(
        &format!("SELECT {} FROM notifications WHERE id = ?1", Notification::COLUMNS),
        params![id],
        Notification::from_row,
    )?)
}

impl Storage {
    /// Newest first.
    pub fn notifications_for(&self, user_id: &str) -> StorageResult<Vec<Notification>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM notifications WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC",
            Notification::COLUMNS
        ))?;
        let notifications = stmt
            .query_map(params![user_id], Notification::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(notifications)
    }

    pub fn create_notification(&self, notification: NewNotification) -> StorageResult<Notification> {
        let conn = self.conn()?;
        insert_notification(&conn, &notification)
    }

    /// Marks the notification read only if it belongs to `user_id`.
    pub fn mark_notification_read(&self, id: &str, user_id: &str) -> StorageResult<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE notifications SET is_read = 1 WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        Ok(changed > 0)
    }

    pub fn mark_all_notifications_read(&self, user_id: &str) -> StorageResult<usize> {
        let conn = self.conn()?;
        Ok(conn.execute(
            "UPDATE notifications SET is_read = 1 WHERE user_id = ?1 AND is_read = 0",
            params![user_id],
        )?)
    }

    pub fn unread_notification_count(&self, user_id: &str) -> StorageResult<i64> {
        let conn = self.conn()?;
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND is_read = 0",
            params![user_id],
            |row| row.get(0),
        )?)
    }
}
