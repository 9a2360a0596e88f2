//! SQLite-backed element, combination and inventory storage.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mixit_domain::{
    CanonicalKey, Combination, Discovery, Element, ElementIcon, ElementId, ElementName, OwnerId,
};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};

use crate::infrastructure::ports::{CombinationRepo, ElementRepo, InventoryRepo, RepoError};

const SCHEMA: [&str; 6] = [
    r#"
    CREATE TABLE IF NOT EXISTS elements (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        normalized_name TEXT NOT NULL UNIQUE,
        icon TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS combinations (
        key TEXT NOT NULL UNIQUE,
        first_element_id TEXT NOT NULL REFERENCES elements(id),
        second_element_id TEXT NOT NULL REFERENCES elements(id),
        result_element_id TEXT NOT NULL REFERENCES elements(id),
        created_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_combinations_result ON combinations(result_element_id)",
    r#"
    CREATE TABLE IF NOT EXISTS discoveries (
        owner_id TEXT NOT NULL,
        element_id TEXT NOT NULL REFERENCES elements(id),
        discovered_at TEXT NOT NULL,
        UNIQUE (owner_id, element_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_discoveries_owner ON discoveries(owner_id, discovered_at)",
    r#"
    CREATE TABLE IF NOT EXISTS owner_stats (
        owner_id TEXT PRIMARY KEY,
        combinations_made INTEGER NOT NULL DEFAULT 0
    )
    "#,
];

/// SQLite implementation of the element catalog, combination store and inventory.
///
/// All three ports share one pool, so the element + combination write can run
/// in a single transaction.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) a file-backed store and ensure the schema.
    pub async fn connect(url: &str) -> Result<Self, RepoError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| RepoError::database("connect", e))?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| RepoError::database("connect", e))?;

        Self::with_pool(pool).await
    }

    /// Private in-memory database. A single connection, since every SQLite
    /// memory connection is its own database.
    pub async fn in_memory() -> Result<Self, RepoError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| RepoError::database("connect", e))?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| RepoError::database("connect", e))?;

        Self::with_pool(pool).await
    }

    pub async fn with_pool(pool: SqlitePool) -> Result<Self, RepoError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(|e| RepoError::database("schema", e))?;
        }
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

// =============================================================================
// Row mapping
// =============================================================================

fn parse_time(raw: &str) -> Result<DateTime<Utc>, RepoError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(RepoError::serialization)
}

fn row_to_element(row: &SqliteRow) -> Result<Element, RepoError> {
    let id: String = row.try_get("id").map_err(RepoError::serialization)?;
    let name: String = row.try_get("name").map_err(RepoError::serialization)?;
    let icon: String = row.try_get("icon").map_err(RepoError::serialization)?;
    let created_at: String = row.try_get("created_at").map_err(RepoError::serialization)?;

    Ok(Element {
        id: ElementId::from_str(&id).map_err(RepoError::serialization)?,
        name: ElementName::new(name).map_err(RepoError::serialization)?,
        icon: ElementIcon::new(icon).map_err(RepoError::serialization)?,
        created_at: parse_time(&created_at)?,
    })
}

fn row_to_combination(row: &SqliteRow) -> Result<Combination, RepoError> {
    let key: String = row.try_get("key").map_err(RepoError::serialization)?;
    let result: String = row
        .try_get("result_element_id")
        .map_err(RepoError::serialization)?;
    let created_at: String = row.try_get("created_at").map_err(RepoError::serialization)?;

    Ok(Combination {
        key: CanonicalKey::from_str(&key).map_err(RepoError::serialization)?,
        result_element_id: ElementId::from_str(&result).map_err(RepoError::serialization)?,
        created_at: parse_time(&created_at)?,
    })
}

const ELEMENT_COLUMNS: &str = "id, name, icon, created_at";
const COMBINATION_COLUMNS: &str = "key, result_element_id, created_at";

// =============================================================================
// ElementRepo
// =============================================================================

#[async_trait]
impl ElementRepo for SqliteStore {
    async fn get(&self, id: ElementId) -> Result<Option<Element>, RepoError> {
        let row = sqlx::query(&format!("SELECT {ELEMENT_COLUMNS} FROM elements WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::database("get_element", e))?;

        row.as_ref().map(row_to_element).transpose()
    }

    async fn find_by_name(&self, name: &ElementName) -> Result<Option<Element>, RepoError> {
        let row = sqlx::query(&format!(
            "SELECT {ELEMENT_COLUMNS} FROM elements WHERE normalized_name = ?"
        ))
        .bind(name.normalized())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::database("find_element_by_name", e))?;

        row.as_ref().map(row_to_element).transpose()
    }

    async fn list_all(&self) -> Result<Vec<Element>, RepoError> {
        let rows = sqlx::query(&format!(
            "SELECT {ELEMENT_COLUMNS} FROM elements ORDER BY created_at, rowid"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::database("list_elements", e))?;

        rows.iter().map(row_to_element).collect()
    }

    async fn insert_if_absent(&self, element: &Element) -> Result<bool, RepoError> {
        let result = sqlx::query(
            r#"
            INSERT INTO elements (id, name, normalized_name, icon, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(element.id.to_string())
        .bind(element.name.as_str())
        .bind(element.normalized_name())
        .bind(element.icon.as_str())
        .bind(element.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::database("insert_element", e))?;

        Ok(result.rows_affected() > 0)
    }
}

// =============================================================================
// CombinationRepo
// =============================================================================

#[async_trait]
impl CombinationRepo for SqliteStore {
    async fn get(&self, key: CanonicalKey) -> Result<Option<Combination>, RepoError> {
        let row = sqlx::query(&format!(
            "SELECT {COMBINATION_COLUMNS} FROM combinations WHERE key = ?"
        ))
        .bind(key.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::database("get_combination", e))?;

        row.as_ref().map(row_to_combination).transpose()
    }

    async fn create_element_and_combination(
        &self,
        key: CanonicalKey,
        candidate: &Element,
        created_at: DateTime<Utc>,
    ) -> Result<(Element, Combination), RepoError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::database("begin", e))?;

        // Write first so the transaction takes the write lock up front.
        sqlx::query(
            r#"
            INSERT INTO elements (id, name, normalized_name, icon, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(candidate.id.to_string())
        .bind(candidate.name.as_str())
        .bind(candidate.normalized_name())
        .bind(candidate.icon.as_str())
        .bind(candidate.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(|e| RepoError::database("insert_element", e))?;

        let row = sqlx::query(&format!(
            "SELECT {ELEMENT_COLUMNS} FROM elements WHERE normalized_name = ?"
        ))
        .bind(candidate.normalized_name())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepoError::database("find_element_by_name", e))?;
        let element = row_to_element(&row)?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO combinations
                (key, first_element_id, second_element_id, result_element_id, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(key) DO NOTHING
            "#,
        )
        .bind(key.to_string())
        .bind(key.first().to_string())
        .bind(key.second().to_string())
        .bind(element.id.to_string())
        .bind(created_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(|e| RepoError::database("insert_combination", e))?;

        if inserted.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(|e| RepoError::database("rollback", e))?;
            return Err(RepoError::conflict("Combination", key));
        }

        tx.commit()
            .await
            .map_err(|e| RepoError::database("commit", e))?;

        let combination = Combination::new(key, element.id, created_at);
        Ok((element, combination))
    }

    async fn create_combination(
        &self,
        key: CanonicalKey,
        result_element_id: ElementId,
        created_at: DateTime<Utc>,
    ) -> Result<Combination, RepoError> {
        // The EXISTS guard turns a dangling reference into zero rows instead
        // of a foreign key error, so it can be told apart from a duplicate key.
        let inserted = sqlx::query(
            r#"
            INSERT INTO combinations
                (key, first_element_id, second_element_id, result_element_id, created_at)
            SELECT ?, ?, ?, ?, ?
            WHERE EXISTS (SELECT 1 FROM elements WHERE id = ?)
            ON CONFLICT(key) DO NOTHING
            "#,
        )
        .bind(key.to_string())
        .bind(key.first().to_string())
        .bind(key.second().to_string())
        .bind(result_element_id.to_string())
        .bind(created_at.to_rfc3339())
        .bind(result_element_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::database("insert_combination", e))?;

        if inserted.rows_affected() == 0 {
            return match CombinationRepo::get(self, key).await? {
                Some(_) => Err(RepoError::conflict("Combination", key)),
                None => Err(RepoError::not_found("Element", result_element_id)),
            };
        }

        Ok(Combination::new(key, result_element_id, created_at))
    }

    async fn list_producing(&self, element_id: ElementId) -> Result<Vec<Combination>, RepoError> {
        let rows = sqlx::query(&format!(
            "SELECT {COMBINATION_COLUMNS} FROM combinations \
             WHERE result_element_id = ? ORDER BY created_at, rowid"
        ))
        .bind(element_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::database("list_producing", e))?;

        rows.iter().map(row_to_combination).collect()
    }

    async fn count(&self) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM combinations")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepoError::database("count_combinations", e))?;
        Ok(count.max(0) as u64)
    }
}

// =============================================================================
// InventoryRepo
// =============================================================================

#[async_trait]
impl InventoryRepo for SqliteStore {
    async fn record(&self, discovery: &Discovery) -> Result<bool, RepoError> {
        let result = sqlx::query(
            r#"
            INSERT INTO discoveries (owner_id, element_id, discovered_at)
            SELECT ?, ?, ?
            WHERE EXISTS (SELECT 1 FROM elements WHERE id = ?)
            ON CONFLICT(owner_id, element_id) DO NOTHING
            "#,
        )
        .bind(discovery.owner_id.to_string())
        .bind(discovery.element_id.to_string())
        .bind(discovery.discovered_at.to_rfc3339())
        .bind(discovery.element_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::database("record_discovery", e))?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }
        if self.contains(discovery.owner_id, discovery.element_id).await? {
            Ok(false)
        } else {
            Err(RepoError::not_found("Element", discovery.element_id))
        }
    }

    async fn list_elements(&self, owner_id: OwnerId) -> Result<Vec<Element>, RepoError> {
        let rows = sqlx::query(
            r#"
            SELECT e.id, e.name, e.icon, e.created_at
            FROM discoveries d
            JOIN elements e ON e.id = d.element_id
            WHERE d.owner_id = ?
            ORDER BY d.discovered_at, d.rowid
            "#,
        )
        .bind(owner_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::database("list_inventory", e))?;

        rows.iter().map(row_to_element).collect()
    }

    async fn contains(&self, owner_id: OwnerId, element_id: ElementId) -> Result<bool, RepoError> {
        let found: Option<i64> = sqlx::query_scalar(
            "SELECT 1 FROM discoveries WHERE owner_id = ? AND element_id = ?",
        )
        .bind(owner_id.to_string())
        .bind(element_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::database("contains_discovery", e))?;

        Ok(found.is_some())
    }

    async fn count_combination(&self, owner_id: OwnerId) -> Result<u64, RepoError> {
        let total: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO owner_stats (owner_id, combinations_made) VALUES (?, 1)
            ON CONFLICT(owner_id) DO UPDATE SET combinations_made = combinations_made + 1
            RETURNING combinations_made
            "#,
        )
        .bind(owner_id.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepoError::database("count_combination", e))?;

        Ok(total.max(0) as u64)
    }

    async fn combinations_made(&self, owner_id: OwnerId) -> Result<u64, RepoError> {
        let total: Option<i64> =
            sqlx::query_scalar("SELECT combinations_made FROM owner_stats WHERE owner_id = ?")
                .bind(owner_id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| RepoError::database("combinations_made", e))?;

        Ok(total.unwrap_or(0).max(0) as u64)
    }
}
