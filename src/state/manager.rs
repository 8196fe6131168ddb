//! SQLite state manager

use super::{IntentStore, SettlementOutcome};
use crate::config::DatabaseConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::intent::{decode_chain, encode_chain, Intent, IntentId, IntentSnapshot, NewIntent, Settlement};
use crate::matching::{ChainRejection, ChainValidator};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePool, SqlitePoolOptions,
    SqliteRow,
};
use sqlx::Row;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

const INTENT_COLUMNS: &str = "id, actor, offer, want, deadline, is_open, created_at";

/// How long a writer waits for the database lock before giving up
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// State manager for SQLite persistence
pub struct StateManager {
    pool: SqlitePool,
}

impl StateManager {
    /// Create a new state manager
    pub async fn new(config: &DatabaseConfig) -> ServiceResult<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> ServiceResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS intents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                actor TEXT NOT NULL,
                offer TEXT NOT NULL,
                want TEXT NOT NULL,
                deadline TEXT,
                is_open BOOLEAN NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_intents_open ON intents (is_open)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_intents_want ON intents (want)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS settlements (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                chain TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        info!("Database migrations complete");
        Ok(())
    }

    async fn fetch_intent(
        conn: &mut SqliteConnection,
        id: IntentId,
    ) -> ServiceResult<Option<Intent>> {
        let row = sqlx::query(&format!("SELECT {} FROM intents WHERE id = ?", INTENT_COLUMNS))
            .bind(id)
            .fetch_optional(conn)
            .await?;

        row.as_ref().map(intent_from_row).transpose()
    }

    /// Validate and apply a settlement on a connection already holding the
    /// write lock. The caller commits or rolls back.
    async fn settle_locked(
        conn: &mut SqliteConnection,
        chain: &[IntentId],
    ) -> ServiceResult<SettlementOutcome> {
        let mut current = IntentSnapshot::new();
        for &id in chain {
            if let Some(intent) = Self::fetch_intent(&mut *conn, id).await? {
                current.insert(intent);
            }
        }

        if let Err(rejection) = ChainValidator::check(chain, &current) {
            return Ok(SettlementOutcome::Rejected(rejection));
        }

        // Only flip intents that are still open so no intent closes twice
        for &id in chain {
            let result = sqlx::query("UPDATE intents SET is_open = 0 WHERE id = ? AND is_open = 1")
                .bind(id)
                .execute(&mut *conn)
                .await?;

            if result.rows_affected() != 1 {
                warn!("Intent {} closed during settlement, rolling back", id);
                return Ok(SettlementOutcome::Rejected(ChainRejection::Closed { id }));
            }
        }

        let created_at = Utc::now();
        let result = sqlx::query("INSERT INTO settlements (chain, created_at) VALUES (?, ?)")
            .bind(encode_chain(chain))
            .bind(created_at)
            .execute(&mut *conn)
            .await?;

        Ok(SettlementOutcome::Committed(Settlement {
            id: result.last_insert_rowid(),
            chain: chain.to_vec(),
            created_at,
        }))
    }
}

fn intent_from_row(row: &SqliteRow) -> ServiceResult<Intent> {
    Ok(Intent {
        id: row.try_get("id")?,
        actor: row.try_get("actor")?,
        offer: row.try_get("offer")?,
        want: row.try_get("want")?,
        deadline: row.try_get("deadline")?,
        is_open: row.try_get("is_open")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

fn settlement_from_row(row: &SqliteRow) -> ServiceResult<Settlement> {
    let chain: String = row.try_get("chain")?;
    Ok(Settlement {
        id: row.try_get("id")?,
        chain: decode_chain(&chain)?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

#[async_trait]
impl IntentStore for StateManager {
    async fn create_intent(&self, intent: NewIntent) -> ServiceResult<Intent> {
        let created_at = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO intents (actor, offer, want, deadline, is_open, created_at)
            VALUES (?, ?, ?, ?, 1, ?)
            "#,
        )
        .bind(&intent.actor)
        .bind(&intent.offer)
        .bind(&intent.want)
        .bind(intent.deadline.as_deref())
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        debug!("Stored intent {} from {}", id, intent.actor);

        Ok(Intent {
            id,
            actor: intent.actor,
            offer: intent.offer,
            want: intent.want,
            deadline: intent.deadline,
            is_open: true,
            created_at,
        })
    }

    async fn get_intent(&self, id: IntentId) -> ServiceResult<Option<Intent>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_intent(&mut *conn, id).await
    }

    async fn list_intents(&self) -> ServiceResult<Vec<Intent>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM intents ORDER BY id DESC",
            INTENT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(intent_from_row).collect()
    }

    async fn cancel_intent(&self, id: IntentId) -> ServiceResult<bool> {
        let result = sqlx::query("UPDATE intents SET is_open = 0 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn open_snapshot(&self) -> ServiceResult<IntentSnapshot> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM intents WHERE is_open = 1 ORDER BY id ASC",
            INTENT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(intent_from_row).collect()
    }

    async fn commit_settlement(&self, chain: &[IntentId]) -> ServiceResult<SettlementOutcome> {
        let mut conn = self.pool.acquire().await?;

        // Take the write lock before reading so concurrent commits queue on
        // the busy timeout instead of failing to upgrade a read lock
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

        let outcome = Self::settle_locked(&mut *conn, chain).await;
        let finish = match &outcome {
            Ok(SettlementOutcome::Committed(_)) => "COMMIT",
            _ => "ROLLBACK",
        };

        if let Err(err) = sqlx::query(finish).execute(&mut *conn).await {
            // Never hand a connection with an open transaction back to the pool
            warn!("Settlement {} failed: {}", finish, err);
            drop(conn.detach());
            return Err(err.into());
        }

        outcome
    }

    async fn list_settlements(&self) -> ServiceResult<Vec<Settlement>> {
        let rows = sqlx::query("SELECT id, chain, created_at FROM settlements ORDER BY id DESC")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(settlement_from_row).collect()
    }

    async fn health_check(&self) -> ServiceResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(ServiceError::Database)?;
        Ok(())
    }
}
