use chrono::Utc;
use rusqlite::{params, Connection};

use super::SqliteResultExt;
use crate::DbError;

pub fn run(conn: &Connection) -> Result<(), DbError> {
    // grupo/tipo stay free text so rows written by older clients still load;
    // unknown values read back as None.
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS tickets (
            id          TEXT PRIMARY KEY,
            titulo      TEXT NOT NULL,
            descricao   TEXT NOT NULL DEFAULT '',
            responsavel TEXT NOT NULL,
            tipo        TEXT,
            status      TEXT NOT NULL DEFAULT 'aberto'
                            CHECK(status IN ('aberto', 'em_andamento', 'em andamento', 'fechado')),
            criadoem    TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_tickets_criadoem ON tickets(criadoem);

        CREATE TABLE IF NOT EXISTS schema_version (
            version    INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        );
        ",
    )
    .to_db()?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |r| r.get(0),
        )
        .unwrap_or(0);

    let has_column = |table: &str, col: &str| -> bool {
        conn.prepare(&format!("SELECT {col} FROM {table} LIMIT 0"))
            .is_ok()
    };

    if current_version < 1 {
        // v1: routing group, added after the first deployments
        if !has_column("tickets", "grupo") {
            conn.execute_batch("ALTER TABLE tickets ADD COLUMN grupo TEXT;")
                .to_db()?;
        }
        conn.execute_batch("CREATE INDEX IF NOT EXISTS idx_tickets_grupo ON tickets(grupo);")
            .to_db()?;
        record_version(conn, 1)?;
    }

    if current_version < 2 {
        // v2: explicit ticket -> image relation
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS ticket_images (
                id          TEXT PRIMARY KEY,
                ticket_id   TEXT NOT NULL REFERENCES tickets(id) ON DELETE CASCADE,
                filename    TEXT NOT NULL,
                store_key   TEXT NOT NULL UNIQUE,
                size_bytes  INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_ticket_images_ticket ON ticket_images(ticket_id);",
        )
        .to_db()?;
        record_version(conn, 2)?;
    }

    Ok(())
}

fn record_version(conn: &Connection, version: i64) -> Result<(), DbError> {
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?1, ?2)",
        params![version, Utc::now()],
    )
    .to_db()?;
    tracing::debug!(version, "applied schema migration");
    Ok(())
}
