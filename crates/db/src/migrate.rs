use sqlx::SqlitePool;
use tracing::{debug, info};

const MIGRATIONS: &[(&str, &str)] = &[(
    "001_initial_schema",
    include_str!("../migrations/001_initial_schema.sql"),
)];

/// Apply forward-only migrations, each in its own transaction, and record them
/// in `_migrations`. Returns how many were applied.
pub async fn run(pool: &SqlitePool) -> Result<usize, sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS _migrations (
            name TEXT PRIMARY KEY,
            applied_ts INTEGER NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    let applied: Vec<(String,)> = sqlx::query_as("SELECT name FROM _migrations")
        .fetch_all(pool)
        .await?;

    let mut count = 0;
    for (name, sql) in MIGRATIONS {
        if applied.iter().any(|(done,)| done == name) {
            debug!(migration = name, "already applied");
            continue;
        }

        let mut tx = pool.begin().await?;
        // Files are split on `;`, so statements must not contain one elsewhere
        for statement in sql.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        sqlx::query("INSERT INTO _migrations (name, applied_ts) VALUES (?, ?)")
            .bind(name)
            .bind(chrono::Utc::now().timestamp())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(migration = name, "migration applied");
        count += 1;
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_run_applies_nothing() {
        let pool = crate::connect(crate::IN_MEMORY).await.unwrap();
        assert_eq!(run(&pool).await.unwrap(), MIGRATIONS.len());
        assert_eq!(run(&pool).await.unwrap(), 0);

        let tables: Vec<(String,)> =
            sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table' AND name LIKE 'tv_%' ORDER BY name")
                .fetch_all(&pool)
                .await
                .unwrap();
        assert_eq!(tables, vec![("tv_episode".to_string(),), ("tv_show".to_string(),)]);
    }
}
