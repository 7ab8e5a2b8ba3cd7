use sqlx::PgPool;
use tracing::info;

/// Ordered schema migrations; each runs at most once, tracked in
/// `schema_version`. Append new entries, never edit shipped ones.
const MIGRATIONS: &[(i32, &str)] = &[
    (1, include_str!("../../sql/0001_world.sql")),
    (2, include_str!("../../sql/0002_relations.sql")),
];

/// Bring the database up to the current schema version.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INT PRIMARY KEY,
            applied_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )",
    )
    .execute(pool)
    .await?;

    for &(version, ddl) in MIGRATIONS {
        let applied: Option<(i32,)> =
            sqlx::query_as("SELECT version FROM schema_version WHERE version = $1")
                .bind(version)
                .fetch_optional(pool)
                .await?;
        if applied.is_some() {
            continue;
        }
        sqlx::raw_sql(ddl).execute(pool).await?;
        sqlx::query("INSERT INTO schema_version (version) VALUES ($1)")
            .bind(version)
            .execute(pool)
            .await?;
        info!(version, "applied schema migration");
    }
    Ok(())
}
