//! Tests for the Migration descriptor.

use crate::migration::{BoxError, Migration};
use duckdb::Connection;

fn conn() -> Connection {
    Connection::open_in_memory().unwrap()
}

#[test]
fn id_accessor() {
    let m = Migration::new("20240320000001", |_: &Connection| {
        Ok::<(), BoxError>(())
    });
    assert_eq!(m.id(), "20240320000001");
}

#[test]
fn debug_shows_id_only() {
    let m = Migration::from_sql("20240320000001", "SELECT 1;");
    let repr = format!("{m:?}");
    assert!(repr.contains("20240320000001"), "unexpected debug: {repr}");
    assert!(!repr.contains("SELECT"), "unexpected debug: {repr}");
}

#[test]
fn new_invokes_procedure_with_connection() {
    let conn = conn();
    let m = Migration::new("20240320000001", |conn: &Connection| {
        conn.execute_batch("CREATE TABLE t (id INTEGER);")
    });

    m.run(&conn).unwrap();

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM t", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn new_converts_procedure_error() {
    let conn = conn();
    let m = Migration::new("20240320000001", |_: &Connection| -> Result<(), BoxError> {
        Err("schema drift detected".into())
    });

    let err = m.run(&conn).unwrap_err();
    assert!(err.to_string().contains("schema drift detected"));
}

#[test]
fn from_sql_executes_multiple_statements() {
    let conn = conn();
    let m = Migration::from_sql(
        "20240320000001",
        "CREATE TABLE a (id INTEGER);
         CREATE TABLE b (id INTEGER);
         INSERT INTO a VALUES (1);",
    );

    m.run(&conn).unwrap();

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM a", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn from_sql_surfaces_sql_errors() {
    let conn = conn();
    let m = Migration::from_sql("20240320000001", "CREATE TABLE a (id NOSUCHTYPE);");
    assert!(m.run(&conn).is_err());
}
