//! Database layer — migrations, appends, and reads over the audit log.

use bursary_workflow::AuditEntry;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tracing::info;

use crate::errors::Result;

/// A stored audit row as read back from the database.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, sqlx::FromRow)]
pub struct AuditRow {
    pub id: i64,
    pub actor: String,
    pub target: String,
    /// JSON array of capability strings granted by the update.
    pub added: String,
    /// JSON array of capability strings revoked by the update.
    pub removed: String,
    pub recorded_at: String,
    pub created_at: i64,
}

/// Establish a SQLite connection pool and run pending migrations.
pub async fn init_pool(database_url: &str) -> Result<SqlitePool> {
    // Make sure the file is created if it doesn't exist yet.
    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite:{database_url}")
    };

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations applied successfully");
    Ok(pool)
}

// ─────────────────────────────────────────────────────────
// Appends
// ─────────────────────────────────────────────────────────

/// Append one audit entry. Entries sharing the same
/// `(actor, target, recorded_at)` tuple are silently ignored so that
/// redelivery from the workflow is idempotent.
///
/// Returns `true` when a new row was written.
pub async fn append_entry(pool: &SqlitePool, entry: &AuditEntry) -> Result<bool> {
    let added = serde_json::to_string(&entry.added)?;
    let removed = serde_json::to_string(&entry.removed)?;
    let rows_affected = sqlx::query(
        r#"
        INSERT OR IGNORE INTO audit_log (actor, target, added, removed, recorded_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(entry.actor.to_string())
    .bind(entry.target.to_string())
    .bind(added)
    .bind(removed)
    .bind(entry.recorded_at.to_rfc3339())
    .execute(pool)
    .await?
    .rows_affected();

    Ok(rows_affected > 0)
}

// ─────────────────────────────────────────────────────────
// Reads
// ─────────────────────────────────────────────────────────

/// Fetch every entry where `user` appears as actor or target, in insertion
/// order.
pub async fn get_entries_for_user(pool: &SqlitePool, user: &str) -> Result<Vec<AuditRow>> {
    let rows = sqlx::query_as::<_, AuditRow>(
        r#"
        SELECT id, actor, target, added, removed, recorded_at, created_at
        FROM   audit_log
        WHERE  actor = ?1 OR target = ?1
        ORDER  BY id ASC
        "#,
    )
    .bind(user)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Fetch all entries, in insertion order.
pub async fn get_all_entries(pool: &SqlitePool) -> Result<Vec<AuditRow>> {
    let rows = sqlx::query_as::<_, AuditRow>(
        r#"
        SELECT id, actor, target, added, removed, recorded_at, created_at
        FROM   audit_log
        ORDER  BY id ASC
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
