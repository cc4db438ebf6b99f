use crate::database::models::ThreadRecord;
use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeSet;

pub(super) struct SqliteThreadRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

/// Columns as stored, before the like set is attached.
struct ThreadRow {
    id: String,
    owner_id: String,
    caption: String,
    created_at: i64,
    like_count: i64,
}

impl ThreadRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            caption: row.get(2)?,
            created_at: row.get(3)?,
            like_count: row.get(4)?,
        })
    }
}

impl<'conn> SqliteThreadRepository<'conn> {
    fn likes_for(&self, thread_id: &str) -> Result<BTreeSet<String>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT user_id
            FROM thread_likes
            WHERE thread_id = ?1
            "#,
        )?;
        let rows = stmt.query_map(params![thread_id], |row| row.get::<_, String>(0))?;
        let mut liked_by = BTreeSet::new();
        for row in rows {
            liked_by.insert(row?);
        }
        Ok(liked_by)
    }

    fn hydrate_row(&self, row: ThreadRow) -> Result<ThreadRecord> {
        let created_at = DateTime::<Utc>::from_timestamp_micros(row.created_at)
            .ok_or_else(|| anyhow!("thread {} has out-of-range timestamp", row.id))?;
        let liked_by = self.likes_for(&row.id)?;
        Ok(ThreadRecord {
            thread_id: row.id,
            owner_id: row.owner_id,
            caption: row.caption,
            created_at,
            liked_by,
            like_count: row.like_count.max(0) as u64,
        })
    }

    fn collect(&self, rows: Vec<ThreadRow>) -> Result<Vec<ThreadRecord>> {
        rows.into_iter().map(|row| self.hydrate_row(row)).collect()
    }
}

impl<'conn> super::ThreadRepository for SqliteThreadRepository<'conn> {
    fn create(&self, record: &ThreadRecord) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            r#"
            INSERT INTO threads (id, owner_id, caption, created_at, like_count)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                record.thread_id,
                record.owner_id,
                record.caption,
                record.created_at.timestamp_micros(),
                record.like_count as i64,
            ],
        )?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT OR IGNORE INTO thread_likes (thread_id, user_id)
                VALUES (?1, ?2)
                "#,
            )?;
            for user_id in &record.liked_by {
                stmt.execute(params![record.thread_id, user_id])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<ThreadRecord>> {
        let row = self
            .conn
            .query_row(
                r#"
                SELECT id, owner_id, caption, created_at, like_count
                FROM threads
                WHERE id = ?1
                "#,
                params![id],
                ThreadRow::from_row,
            )
            .optional()?;
        row.map(|row| self.hydrate_row(row)).transpose()
    }

    fn list_recent(&self) -> Result<Vec<ThreadRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, owner_id, caption, created_at, like_count
            FROM threads
            ORDER BY created_at DESC, rowid DESC
            "#,
        )?;
        let rows = stmt
            .query_map([], ThreadRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        self.collect(rows)
    }

    fn list_by_owner(&self, owner_id: &str) -> Result<Vec<ThreadRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, owner_id, caption, created_at, like_count
            FROM threads
            WHERE owner_id = ?1
            ORDER BY created_at DESC, rowid DESC
            "#,
        )?;
        let rows = stmt
            .query_map(params![owner_id], ThreadRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        self.collect(rows)
    }

    fn replace_likes(
        &self,
        thread_id: &str,
        liked_by: &BTreeSet<String>,
        like_count: u64,
    ) -> Result<bool> {
        let tx = self.conn.unchecked_transaction()?;
        let updated = tx.execute(
            r#"
            UPDATE threads
            SET like_count = ?1
            WHERE id = ?2
            "#,
            params![like_count as i64, thread_id],
        )?;
        if updated == 0 {
            return Ok(false);
        }
        tx.execute(
            "DELETE FROM thread_likes WHERE thread_id = ?1",
            params![thread_id],
        )?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO thread_likes (thread_id, user_id)
                VALUES (?1, ?2)
                "#,
            )?;
            for user_id in liked_by {
                stmt.execute(params![thread_id, user_id])?;
            }
        }
        tx.commit()?;
        tracing::debug!(thread_id, like_count, "like state replaced");
        Ok(true)
    }
}
