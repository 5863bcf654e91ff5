//! Database initialization
//!
//! Opens (or creates) the SQLite database and creates every table the admin
//! service needs. All statements are idempotent, so this runs on every start.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Applied to every pooled connection, not just the first one
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        // Cascades on card_instances and SET NULL on side_deck_parent depend on this
        .foreign_keys(true)
        // WAL lets readers proceed while a ledger transaction holds the write lock
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(5000));

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_tables(&pool).await?;

    Ok(pool)
}

/// Create all tables and indexes
///
/// Exposed separately so tests can build a schema on a pool they opened themselves.
pub async fn create_tables(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_sets_table(pool).await?;
    create_cards_table(pool).await?;
    create_locations_table(pool).await?;
    create_card_instances_table(pool).await?;
    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (1)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the sets table
///
/// One row per external set code; rows are never refreshed by the sync.
pub async fn create_sets_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            set_code TEXT NOT NULL UNIQUE,
            set_name TEXT NOT NULL,
            set_svg_url TEXT,
            set_release_date TEXT,
            set_type TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the cards table
///
/// Single-face columns (type_line, mana_cost, oracle_text) and face-pair
/// columns (cfl_*, cfr_*) are mutually exclusive per row.
pub async fn create_cards_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS cards (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            scryfall_id TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            layout TEXT NOT NULL,
            lang TEXT NOT NULL DEFAULT 'en',
            type_line TEXT,
            mana_cost TEXT,
            oracle_text TEXT,
            cfl_name TEXT,
            cfl_mana_cost TEXT,
            cfl_type_line TEXT,
            cfl_oracle_text TEXT,
            cfr_name TEXT,
            cfr_mana_cost TEXT,
            cfr_type_line TEXT,
            cfr_oracle_text TEXT,
            image_uri TEXT,
            cfl_image_uri TEXT,
            cfr_image_uri TEXT,
            scryfall_json TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_cards_name ON cards(name)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_cards_lang_layout ON cards(lang, layout)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the locations table
///
/// The partial unique index on is_default keeps at most one default row.
pub async fn create_locations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS locations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            location_type TEXT NOT NULL,
            deck_type TEXT,
            is_default INTEGER NOT NULL DEFAULT 0,
            commander TEXT,
            side_deck_parent INTEGER REFERENCES locations(id) ON DELETE SET NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_locations_single_default \
         ON locations(is_default) WHERE is_default = 1",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_locations_type ON locations(location_type)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the card_instances table
///
/// Quantity rows are never deleted by the ledger; only the cascades from
/// cards or locations remove them.
pub async fn create_card_instances_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS card_instances (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            scryfall_id TEXT NOT NULL
                REFERENCES cards(scryfall_id) ON UPDATE CASCADE ON DELETE CASCADE,
            location_id INTEGER NOT NULL
                REFERENCES locations(id) ON UPDATE CASCADE ON DELETE CASCADE,
            quantity INTEGER NOT NULL DEFAULT 1 CHECK (quantity >= 0),
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (scryfall_id, location_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_card_instances_location ON card_instances(location_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
