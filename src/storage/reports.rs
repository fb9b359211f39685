use rusqlite::{params, Connection};

use super::{new_id, posts, Storage, StorageError, StorageResult};
use crate::db::models::{NewReport, Report};
use crate::domain::ReportStatus;

fn report_by_id(conn: &Connection, id: &str) -> StorageResult<Report> {
    Ok(conn.query_row(
        &format!("SELECT {} FROM reports WHERE id = ?1", Report::COLUMNS),
        params![id],
        Report::from_row,
    )?)
}

impl Storage {
    /// File a report against a post; new reports are `pending`.
    pub fn create_report(&self, new_report: NewReport) -> StorageResult<Report> {
        let conn = self.conn()?;
        if posts::post_by_id(&conn, &new_report.post_id)?.is_none() {
            return Err(StorageError::NotFound("Post"));
        }

        let id = new_id();
        conn.execute(
            "INSERT INTO reports (id, post_id, reporter_id, reason, status) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                id,
                new_report.post_id,
                new_report.reporter_id,
                new_report.reason,
                ReportStatus::Pending.as_str()
            ],
        )?;
        tracing::info!(report_id = %id, post_id = %new_report.post_id, "Post reported");
        report_by_id(&conn, &id)
    }

    pub fn list_reports(&self) -> StorageResult<Vec<Report>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM reports ORDER BY created_at DESC, rowid DESC",
            Report::COLUMNS
        ))?;
        let reports = stmt
            .query_map([], Report::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(reports)
    }

    pub fn update_report_status(&self, id: &str, status: ReportStatus) -> StorageResult<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE reports SET status = ?2 WHERE id = ?1",
            params![id, status.as_str()],
        )?;
        Ok(changed > 0)
    }
}
