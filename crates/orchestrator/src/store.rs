use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use volume_bot_core::state::TradeState;
use volume_bot_core::traits::StateStore;

/// `SQLite`-backed durable store for the single trade-state record.
///
/// The record is upserted atomically after every cycle and read once at
/// startup; it is never deleted.
#[derive(Clone)]
pub struct SqliteStateStore {
    pool: SqlitePool,
}

impl SqliteStateStore {
    /// Creates a new connection pool and runs migrations.
    ///
    /// # Arguments
    ///
    /// * `database_url` - `SQLite` database path (e.g., `sqlite://state.db?mode=rwc`)
    ///
    /// # Errors
    ///
    /// Returns error if connection fails or migrations fail.
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .context("failed to open state database")?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to run state database migrations")?;

        Ok(Self { pool })
    }

    /// Creates an in-memory database for testing.
    ///
    /// # Errors
    ///
    /// Returns error if connection fails.
    #[cfg(test)]
    pub async fn new_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect("sqlite::memory:")
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl StateStore for SqliteStateStore {
    async fn load(&self) -> Result<Option<TradeState>> {
        let row = sqlx::query_as::<_, (Option<String>, Option<String>, i64)>(
            "SELECT previous_trade, next_trade, trade_count FROM trade_state WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await
        .context("failed to load trade state")?;

        let Some((previous, next, count)) = row else {
            return Ok(None);
        };

        Ok(Some(TradeState {
            previous_trade: parse_timestamp(previous.as_deref())?,
            next_trade: parse_timestamp(next.as_deref())?,
            trade_count: u64::try_from(count).context("negative trade count in store")?,
        }))
    }

    async fn save(&self, state: &TradeState) -> Result<()> {
        let count = i64::try_from(state.trade_count).context("trade count overflows storage")?;

        sqlx::query(
            r"
            INSERT INTO trade_state (id, previous_trade, next_trade, trade_count)
            VALUES (1, ?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                previous_trade = excluded.previous_trade,
                next_trade = excluded.next_trade,
                trade_count = excluded.trade_count
            ",
        )
        .bind(state.previous_trade.map(|t| t.to_rfc3339()))
        .bind(state.next_trade.map(|t| t.to_rfc3339()))
        .bind(count)
        .execute(&self.pool)
        .await
        .context("failed to persist trade state")?;

        Ok(())
    }
}

fn parse_timestamp(raw: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let parsed = DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("invalid stored timestamp: {raw}"))?;
    Ok(Some(parsed.with_timezone(&Utc)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn load_returns_none_before_first_persist() {
        let store = SqliteStateStore::new_in_memory().await.unwrap();
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn state_round_trips_through_storage() {
        let store = SqliteStateStore::new_in_memory().await.unwrap();
        let now = Utc::now();
        let state = TradeState {
            previous_trade: Some(now - Duration::minutes(90)),
            next_trade: Some(now + Duration::minutes(75)),
            trade_count: 7,
        };

        store.save(&state).await.unwrap();
        let loaded = store.load().await.unwrap().unwrap();

        assert_eq!(loaded.trade_count, 7);
        // RFC 3339 keeps nanosecond precision, so the timestamps survive.
        assert_eq!(loaded.previous_trade, state.previous_trade);
        assert_eq!(loaded.next_trade, state.next_trade);
    }

    #[tokio::test]
    async fn save_overwrites_the_single_record() {
        let store = SqliteStateStore::new_in_memory().await.unwrap();
        for count in 1..=3u64 {
            let state = TradeState {
                previous_trade: Some(Utc::now()),
                next_trade: None,
                trade_count: count,
            };
            store.save(&state).await.unwrap();
        }

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.trade_count, 3);
        assert_eq!(loaded.next_trade, None);
    }
}
