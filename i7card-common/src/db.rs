//! Database access shared by the importer and the standalone tools
//!
//! Opens the SQLite database and creates the relation catalog on first use.
//! Tests connect to `sqlite::memory:` and call [`init_tables`] directly.

use crate::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize database connection pool, creating the file and tables if missing
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // mode=rwc: read, write, create
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    init_tables(&pool).await?;

    Ok(pool)
}

/// Connect in read-only mode; used by the verifier
///
/// mode=ro prevents any write; the database must already exist.
pub async fn connect_readonly(db_path: &Path) -> Result<SqlitePool> {
    if !db_path.exists() {
        return Err(crate::Error::Config(format!(
            "Database not found: {}\nRun an import first to create it.",
            db_path.display()
        )));
    }

    let db_url = format!("sqlite://{}?mode=ro", db_path.display());
    let pool = SqlitePool::connect(&db_url).await?;
    Ok(pool)
}

/// Create every target relation if it does not exist yet
///
/// Card relations share the card id as primary key; `skill_details` rows are
/// keyed by (card_id, skill_level) and are replaced wholesale per card on
/// each import, so the table carries no surrogate uniqueness beyond that
/// pair. `team_compositions` is keyed by the song it was scored against so
/// re-imports reconcile instead of appending.
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS cards (
            id INTEGER PRIMARY KEY,
            card_id INTEGER NOT NULL,
            cardname TEXT,
            name TEXT,
            name_other TEXT,
            groupname TEXT,
            rarity TEXT,
            get_type TEXT,
            story TEXT,
            awakening_item INTEGER
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS card_stats (
            id INTEGER PRIMARY KEY REFERENCES cards(id),
            attribute INTEGER,
            shout_min INTEGER,
            shout_max INTEGER,
            beat_min INTEGER,
            beat_max INTEGER,
            melody_min INTEGER,
            melody_max INTEGER
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS card_skills (
            id INTEGER PRIMARY KEY REFERENCES cards(id),
            ap_skill_type TEXT,
            ap_skill_req INTEGER,
            ap_skill_name TEXT,
            ct_skill INTEGER,
            comment TEXT,
            sp_time INTEGER,
            sp_value INTEGER
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS skill_details (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            card_id INTEGER NOT NULL REFERENCES cards(id),
            skill_level INTEGER NOT NULL,
            count INTEGER,
            per INTEGER,
            value INTEGER,
            rate INTEGER,
            UNIQUE(card_id, skill_level)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS release_info (
            id INTEGER PRIMARY KEY REFERENCES cards(id),
            year INTEGER,
            month INTEGER,
            day INTEGER,
            event TEXT,
            createtime TEXT,
            updatetime TEXT,
            listview INTEGER DEFAULT 1
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS broach_info (
            id INTEGER PRIMARY KEY REFERENCES cards(id),
            broach_shout INTEGER,
            broach_beat INTEGER,
            broach_melody INTEGER,
            broach_req INTEGER
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS skill_guess (
            id INTEGER PRIMARY KEY REFERENCES cards(id),
            ap_skill_1_guess INTEGER,
            ap_skill_2_guess INTEGER,
            ap_skill_3_guess INTEGER,
            ap_skill_4_guess INTEGER,
            ap_skill_5_guess INTEGER
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS songs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            song_id INTEGER UNIQUE,
            category TEXT,
            artist_name TEXT,
            song_name TEXT,
            song_type TEXT,
            song_category TEXT,
            difficulty TEXT,
            star_rating INTEGER,
            shout_percentage REAL,
            beat_percentage REAL,
            melody_percentage REAL,
            notes_count INTEGER,
            duration_seconds INTEGER,
            update_date TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS group_cards (
            id INTEGER PRIMARY KEY,
            card_id INTEGER,
            cardname TEXT,
            group_name TEXT,
            members TEXT,
            shout_value INTEGER,
            beat_value INTEGER,
            melody_value INTEGER,
            attribute INTEGER,
            idol_type TEXT,
            group_type TEXT,
            auto_score INTEGER,
            song_score INTEGER,
            score_limit INTEGER,
            broach_type TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS team_compositions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            song_id INTEGER UNIQUE REFERENCES songs(id),
            position1_card_id INTEGER,
            position2_card_id INTEGER,
            position3_card_id INTEGER,
            position4_card_id INTEGER,
            position5_card_id INTEGER,
            position6_card_id INTEGER,
            attribute_score INTEGER,
            scoreup_skill_score INTEGER,
            reduction_skill_score INTEGER,
            live_end_score INTEGER,
            final_result_score INTEGER,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn init_tables_is_reentrant() {
        let pool = SqlitePool::connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");

        init_tables(&pool).await.expect("first init");
        init_tables(&pool).await.expect("second init");

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM cards")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count.0, 0);
    }

    #[tokio::test]
    async fn every_catalog_relation_exists() {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        init_tables(&pool).await.unwrap();

        for relation in crate::catalog::TargetRelation::ALL {
            let query = format!("SELECT COUNT(*) FROM {}", relation.table_name());
            let count: (i64,) = sqlx::query_as(&query).fetch_one(&pool).await.unwrap();
            assert_eq!(count.0, 0, "{relation} should exist and be empty");
        }
    }
}
