use crate::database::models::{ProfileUpdate, UserProfile};
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeSet;

pub(super) struct SqliteUserRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

fn profile_from_row(row: &Row<'_>) -> rusqlite::Result<UserProfile> {
    Ok(UserProfile {
        user_id: row.get(0)?,
        username: row.get(1)?,
        display_name: row.get(2)?,
        email: row.get(3)?,
        bio: row.get(4)?,
        avatar_url: row.get(5)?,
        followers: BTreeSet::new(),
        following: BTreeSet::new(),
    })
}

impl<'conn> SqliteUserRepository<'conn> {
    fn edge_set(&self, sql: &str, user_id: &str) -> Result<BTreeSet<String>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params![user_id], |row| row.get::<_, String>(0))?;
        let mut ids = BTreeSet::new();
        for row in rows {
            ids.insert(row?);
        }
        Ok(ids)
    }

    fn with_edges(&self, mut profile: UserProfile) -> Result<UserProfile> {
        profile.followers = self.edge_set(
            "SELECT follower_id FROM follows WHERE followee_id = ?1",
            &profile.user_id,
        )?;
        profile.following = self.edge_set(
            "SELECT followee_id FROM follows WHERE follower_id = ?1",
            &profile.user_id,
        )?;
        Ok(profile)
    }
}

impl<'conn> super::UserRepository for SqliteUserRepository<'conn> {
    fn upsert(&self, record: &UserProfile) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO users (id, username, display_name, email, bio, avatar_url)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                username = excluded.username,
                display_name = excluded.display_name,
                email = excluded.email,
                bio = excluded.bio,
                avatar_url = excluded.avatar_url
            "#,
            params![
                record.user_id,
                record.username,
                record.display_name,
                record.email,
                record.bio,
                record.avatar_url
            ],
        )?;
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<UserProfile>> {
        let row = self
            .conn
            .query_row(
                r#"
                SELECT id, username, display_name, email, bio, avatar_url
                FROM users
                WHERE id = ?1
                "#,
                params![id],
                profile_from_row,
            )
            .optional()?;
        row.map(|profile| self.with_edges(profile)).transpose()
    }

    fn get_many(&self, ids: &[String]) -> Result<Vec<UserProfile>> {
        let mut profiles = Vec::with_capacity(ids.len());
        let mut seen = BTreeSet::new();
        for id in ids {
            if !seen.insert(id.as_str()) {
                continue;
            }
            if let Some(profile) = self.get(id)? {
                profiles.push(profile);
            }
        }
        Ok(profiles)
    }

    fn list(&self) -> Result<Vec<UserProfile>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, username, display_name, email, bio, avatar_url
            FROM users
            ORDER BY username ASC
            "#,
        )?;
        let rows = stmt
            .query_map([], profile_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter()
            .map(|profile| self.with_edges(profile))
            .collect()
    }

    fn find_by_username(&self, username: &str) -> Result<Option<UserProfile>> {
        let row = self
            .conn
            .query_row(
                r#"
                SELECT id, username, display_name, email, bio, avatar_url
                FROM users
                WHERE username = ?1
                "#,
                params![username],
                profile_from_row,
            )
            .optional()?;
        row.map(|profile| self.with_edges(profile)).transpose()
    }

    fn search_prefix(&self, term: &str) -> Result<Vec<UserProfile>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, username, display_name, email, bio, avatar_url
            FROM users
            WHERE substr(username, 1, length(?1)) = ?1
               OR substr(display_name, 1, length(?1)) = ?1
            ORDER BY username ASC
            "#,
        )?;
        let rows = stmt
            .query_map(params![term], profile_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter()
            .map(|profile| self.with_edges(profile))
            .collect()
    }

    fn update_details(&self, id: &str, update: &ProfileUpdate) -> Result<bool> {
        let updated = self.conn.execute(
            r#"
            UPDATE users
            SET display_name = ?1, username = ?2, bio = ?3
            WHERE id = ?4
            "#,
            params![update.display_name, update.username, update.bio, id],
        )?;
        Ok(updated > 0)
    }

    fn follow(&self, follower_id: &str, followee_id: &str) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT OR IGNORE INTO follows (follower_id, followee_id)
            VALUES (?1, ?2)
            "#,
            params![follower_id, followee_id],
        )?;
        Ok(())
    }

    fn unfollow(&self, follower_id: &str, followee_id: &str) -> Result<()> {
        self.conn.execute(
            "DELETE FROM follows WHERE follower_id = ?1 AND followee_id = ?2",
            params![follower_id, followee_id],
        )?;
        Ok(())
    }
}
