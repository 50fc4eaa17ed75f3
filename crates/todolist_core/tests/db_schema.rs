use rusqlite::Connection;
use todolist_core::db::schema::{apply_schema_version, current_user_version, SCHEMA_VERSION};
use todolist_core::db::{open_db, open_db_in_memory, DbError, DATABASE_NAME, TABLE_NAME};

#[test]
fn open_db_in_memory_creates_table() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(current_user_version(&conn).unwrap(), SCHEMA_VERSION);
    assert_table_exists(&conn, TABLE_NAME);
}

#[test]
fn reopening_keeps_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(DATABASE_NAME);

    let conn = open_db(&path).unwrap();
    conn.execute("INSERT INTO todo_items (task) VALUES ('keep me');", [])
        .unwrap();
    drop(conn);

    let conn = open_db(&path).unwrap();
    assert_eq!(row_count(&conn), 1);
}

#[test]
fn task_column_rejects_null() {
    let conn = open_db_in_memory().unwrap();
    let err = conn
        .execute("INSERT INTO todo_items (task) VALUES (NULL);", [])
        .unwrap_err();
    assert!(err.to_string().contains("NOT NULL"));
}

#[test]
fn ids_are_not_reused_after_delete() {
    let conn = open_db_in_memory().unwrap();
    conn.execute("INSERT INTO todo_items (task) VALUES ('a');", [])
        .unwrap();
    let first = conn.last_insert_rowid();
    conn.execute("DELETE FROM todo_items;", []).unwrap();
    conn.execute("INSERT INTO todo_items (task) VALUES ('b');", [])
        .unwrap();
    assert!(conn.last_insert_rowid() > first);
}

#[test]
fn version_bump_drops_and_recreates_table() {
    let mut conn = open_db_in_memory().unwrap();
    conn.execute("INSERT INTO todo_items (task) VALUES ('old data');", [])
        .unwrap();

    apply_schema_version(&mut conn, SCHEMA_VERSION + 1).unwrap();

    assert_eq!(current_user_version(&conn).unwrap(), SCHEMA_VERSION + 1);
    assert_table_exists(&conn, TABLE_NAME);
    assert_eq!(row_count(&conn), 0);
}

#[test]
fn same_version_is_a_no_op() {
    let mut conn = open_db_in_memory().unwrap();
    conn.execute("INSERT INTO todo_items (task) VALUES ('stay');", [])
        .unwrap();

    apply_schema_version(&mut conn, SCHEMA_VERSION).unwrap();
    assert_eq!(row_count(&conn), 1);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, SCHEMA_VERSION);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn unversioned_foreign_table_fails_the_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("foreign.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("CREATE TABLE todo_items (id INTEGER PRIMARY KEY, title TEXT);")
        .unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::Sqlite(err) => assert!(err.to_string().contains("already exists")),
        other => panic!("unexpected error: {other}"),
    }

    let conn = Connection::open(&path).unwrap();
    assert_eq!(current_user_version(&conn).unwrap(), 0);
}

fn row_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM todo_items;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
