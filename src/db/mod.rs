//! SQLite connection helpers for the relational export.

use std::path::Path;
use std::time::Duration;

use rusqlite::Connection;

/// Open a connection with the engine's pragmas applied. Connections are
/// scoped: callers open, use, and drop them; nothing is held across a run. A
/// transiently busy database file is retried once.
pub fn open(path: &Path) -> Result<Connection, rusqlite::Error> {
    let conn = match Connection::open(path) {
        Ok(conn) => conn,
        Err(rusqlite::Error::SqliteFailure(err, message))
            if err.code == rusqlite::ErrorCode::DatabaseBusy
                || err.code == rusqlite::ErrorCode::DatabaseLocked =>
        {
            tracing::warn!(?message, "database busy on open, retrying once");
            std::thread::sleep(Duration::from_millis(250));
            Connection::open(path)?
        }
        Err(other) => return Err(other),
    };

    // 30 second busy timeout to ride out concurrent readers
    let _ = conn.execute("PRAGMA busy_timeout = 30000;", []);

    // WAL only needs to succeed once per database file
    let _ = conn.execute("PRAGMA journal_mode = WAL;", []);

    // NORMAL sync is safe with WAL mode
    let _ = conn.execute("PRAGMA synchronous = NORMAL;", []);

    Ok(conn)
}

#[cfg(test)]
pub fn new_test_connection() -> Connection {
    let conn = Connection::open_in_memory().expect("failed to create in-memory database");
    crate::endpoint::db::create_tables_if_not_exists(&conn).expect("failed to create tables");
    conn
}
