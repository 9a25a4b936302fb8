//! Usage counter repository

use super::DbPool;
use crate::{Error, Result};

/// Persisted request totals for one user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserMetrics {
    /// Telegram user id
    pub user_id: i64,
    /// Lifetime cheap-tier request total
    pub count: i64,
    /// Lifetime pro-tier request total
    pub count_pro: i64,
}

/// Repository for persisted usage counters
#[derive(Debug, Clone)]
pub struct MetricsRepo {
    pool: DbPool,
}

impl MetricsRepo {
    /// Create a new repository
    #[must_use]
    pub const fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Add one flush cycle's deltas to a user's persisted totals
    ///
    /// A single upsert: inserts the row on first sight, otherwise adds the
    /// deltas to the existing columns.
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn accumulate(&self, user_id: i64, cheap: u32, pro: u32) -> Result<()> {
        let conn = self.pool.get().map_err(|e| Error::Database(e.to_string()))?;

        conn.execute(
            r"INSERT INTO user_metrics (user_id, count, count_pro, updated_at)
              VALUES (?1, ?2, ?3, datetime('now'))
              ON CONFLICT(user_id) DO UPDATE SET
                count = count + excluded.count,
                count_pro = count_pro + excluded.count_pro,
                updated_at = datetime('now')",
            rusqlite::params![user_id, i64::from(cheap), i64::from(pro)],
        )?;

        Ok(())
    }

    /// Get persisted totals for one user
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn get(&self, user_id: i64) -> Result<Option<UserMetrics>> {
        let conn = self.pool.get().map_err(|e| Error::Database(e.to_string()))?;

        let result = conn.query_row(
            "SELECT user_id, count, count_pro FROM user_metrics WHERE user_id = ?1",
            [user_id],
            |row| {
                Ok(UserMetrics {
                    user_id: row.get(0)?,
                    count: row.get(1)?,
                    count_pro: row.get(2)?,
                })
            },
        );

        match result {
            Ok(metrics) => Ok(Some(metrics)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// List all persisted totals
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn list(&self) -> Result<Vec<UserMetrics>> {
        let conn = self.pool.get().map_err(|e| Error::Database(e.to_string()))?;

        let mut stmt = conn.prepare(
            "SELECT user_id, count, count_pro FROM user_metrics ORDER BY user_id",
        )?;

        let metrics = stmt
            .query_map([], |row| {
                Ok(UserMetrics {
                    user_id: row.get(0)?,
                    count: row.get(1)?,
                    count_pro: row.get(2)?,
                })
            })?
            .flatten()
            .collect();

        Ok(metrics)
    }
}
