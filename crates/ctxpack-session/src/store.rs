//! SQLite persistence for session stacks and active profiles

use crate::snapshot::Snapshot;
use anyhow::{Context, Result};
use ctxpack_core::ContextProfile;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

pub struct SnapshotDb {
    conn: Connection,
}

impl SnapshotDb {
    pub fn new(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let conn = Connection::open(db_path)?;
        Self::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self { conn })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS snapshots (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                session_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                payload TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_snapshot_session ON snapshots(session_id);
            CREATE TABLE IF NOT EXISTS active_profiles (
                session_id TEXT PRIMARY KEY,
                updated_at TEXT NOT NULL,
                payload TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    /// Push a snapshot on top of its session's stack
    pub fn push(&self, snapshot: &Snapshot) -> Result<()> {
        self.conn.execute(
            "INSERT INTO snapshots (id, session_id, created_at, payload) VALUES (?, ?, ?, ?)",
            params![
                snapshot.id(),
                snapshot.session_id(),
                snapshot.created_at().to_rfc3339(),
                serde_json::to_string(snapshot)?,
            ],
        )?;
        Ok(())
    }

    /// Delete a snapshot; returns whether it existed
    pub fn remove(&self, id: &str) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM snapshots WHERE id = ?", params![id])?;
        Ok(deleted > 0)
    }

    /// A session's stack, bottom first
    pub fn stack(&self, session_id: &str) -> Result<Vec<Snapshot>> {
        let mut stmt = self
            .conn
            .prepare("SELECT payload FROM snapshots WHERE session_id = ? ORDER BY seq")?;
        let rows = stmt.query_map(params![session_id], |row| row.get::<_, String>(0))?;

        let mut stack = Vec::new();
        for payload in rows {
            let payload = payload?;
            let snapshot: Snapshot =
                serde_json::from_str(&payload).context("decoding stored snapshot")?;
            stack.push(snapshot);
        }
        Ok(stack)
    }

    pub fn set_active(&self, session_id: &str, profile: &ContextProfile) -> Result<()> {
        self.conn.execute(
            "INSERT INTO active_profiles (session_id, updated_at, payload) VALUES (?1, ?2, ?3)
             ON CONFLICT(session_id) DO UPDATE SET updated_at = ?2, payload = ?3",
            params![
                session_id,
                chrono::Utc::now().to_rfc3339(),
                serde_json::to_string(profile)?,
            ],
        )?;
        Ok(())
    }

    pub fn active(&self, session_id: &str) -> Result<Option<ContextProfile>> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT payload FROM active_profiles WHERE session_id = ?",
                params![session_id],
                |row| row.get(0),
            )
            .optional()?;
        match payload {
            Some(payload) => Ok(Some(
                serde_json::from_str(&payload).context("decoding stored profile")?,
            )),
            None => Ok(None),
        }
    }

    /// Forget everything stored for a session
    pub fn clear_session(&self, session_id: &str) -> Result<()> {
        self.conn.execute(
            "DELETE FROM snapshots WHERE session_id = ?",
            params![session_id],
        )?;
        self.conn.execute(
            "DELETE FROM active_profiles WHERE session_id = ?",
            params![session_id],
        )?;
        Ok(())
    }

    /// Every session with stored state
    pub fn sessions(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT session_id FROM snapshots UNION SELECT session_id FROM active_profiles
             ORDER BY session_id",
        )?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(row?);
        }
        Ok(sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::tests::profile;
    use crate::snapshot::ResumeNotes;
    use tempfile::TempDir;

    #[test]
    fn test_stack_order_and_remove() {
        let db = SnapshotDb::in_memory().unwrap();
        let first = Snapshot::capture("s1", profile("first"), ResumeNotes::new());
        let second = Snapshot::capture("s1", profile("second"), ResumeNotes::new());
        let other = Snapshot::capture("s2", profile("other"), ResumeNotes::new());
        db.push(&first).unwrap();
        db.push(&second).unwrap();
        db.push(&other).unwrap();

        assert_eq!(db.stack("s1").unwrap(), vec![first.clone(), second.clone()]);
        assert!(db.remove(first.id()).unwrap());
        assert!(!db.remove(first.id()).unwrap());
        assert_eq!(db.stack("s1").unwrap(), vec![second]);
        assert_eq!(db.sessions().unwrap(), vec!["s1", "s2"]);
    }

    #[test]
    fn test_active_profile_persists_across_connections() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join("snapshots.db");
        let active = profile("current");
        {
            let db = SnapshotDb::new(&path).unwrap();
            db.set_active("s1", &profile("older")).unwrap();
            db.set_active("s1", &active).unwrap();
        }
        let db = SnapshotDb::new(&path).unwrap();
        assert_eq!(db.active("s1").unwrap(), Some(active));
        assert_eq!(db.active("nobody").unwrap(), None);

        db.clear_session("s1").unwrap();
        assert_eq!(db.active("s1").unwrap(), None);
        assert!(db.sessions().unwrap().is_empty());
    }
}
