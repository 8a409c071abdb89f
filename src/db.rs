use std::fmt;
use std::path::Path;

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use serde::Serialize;

use crate::diagnostics::Diagnostics;
use crate::error::{EtlError, EtlResult};
use crate::model::{EnrichedBankRecord, COLUMNS};

pub fn connect(path: &Path) -> rusqlite::Result<Connection> {
    Connection::open(path)
}

/// Read-only handle for ad-hoc queries; statements cannot modify the store.
pub fn connect_read_only(path: &Path) -> rusqlite::Result<Connection> {
    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
}

pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

// ── Load ──

/// Drops and recreates `table`, then inserts `records` in order, all in one
/// transaction.
pub fn replace_table(
    conn: &Connection,
    table: &str,
    records: &[EnrichedBankRecord],
) -> rusqlite::Result<usize> {
    let ident = quote_ident(table);
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(&format!(
        "DROP TABLE IF EXISTS {ident};
         CREATE TABLE {ident} (
            {}  TEXT,
            {}  REAL,
            {}  REAL,
            {}  REAL,
            {}  REAL
         );",
        COLUMNS[0], COLUMNS[1], COLUMNS[2], COLUMNS[3], COLUMNS[4],
    ))?;

    let mut count = 0;
    {
        let mut stmt = tx.prepare(&format!(
            "INSERT INTO {ident} ({}) VALUES (?1, ?2, ?3, ?4, ?5)",
            COLUMNS.join(", ")
        ))?;
        for r in records {
            count += stmt.execute(rusqlite::params![
                r.name,
                r.market_cap_usd_billion,
                r.market_cap_gbp_billion,
                r.market_cap_eur_billion,
                r.market_cap_inr_billion,
            ])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

/// Opens the store at `db_path`, replaces `table` with `records`, closes it.
pub fn persist_table(
    records: &[EnrichedBankRecord],
    db_path: &Path,
    table: &str,
    diag: &dyn Diagnostics,
) -> EtlResult<()> {
    let result = connect(db_path).and_then(|conn| {
        let n = replace_table(&conn, table, records)?;
        conn.close().map_err(|(_, e)| e)?;
        Ok(n)
    });

    match result {
        Ok(n) => {
            diag.info(&format!("Data saved to database table {} ({} rows).", table, n));
            Ok(())
        }
        Err(e) => {
            diag.error(&format!("Error saving data to database: {}", e));
            Err(EtlError::persistence(table, e))
        }
    }
}

// ── Query ──

/// A single column value as SQLite returned it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl From<ValueRef<'_>> for Cell {
    fn from(v: ValueRef<'_>) -> Self {
        match v {
            ValueRef::Null => Cell::Null,
            ValueRef::Integer(i) => Cell::Integer(i),
            ValueRef::Real(f) => Cell::Real(f),
            ValueRef::Text(t) => Cell::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Cell::Blob(b.to_vec()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => write!(f, "None"),
            Cell::Integer(i) => write!(f, "{}", i),
            Cell::Real(x) => write!(f, "{:?}", x),
            Cell::Text(s) => write!(f, "'{}'", s.replace('\'', "\\'")),
            Cell::Blob(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

pub type Row = Vec<Cell>;

/// Renders a row as a tuple, e.g. `('JPMorgan Chase', 432.92)`.
pub fn format_row(row: &Row) -> String {
    let cells: Vec<String> = row.iter().map(Cell::to_string).collect();
    if cells.len() == 1 {
        format!("({},)", cells[0])
    } else {
        format!("({})", cells.join(", "))
    }
}

pub fn query_rows(conn: &Connection, statement: &str) -> rusqlite::Result<Vec<Row>> {
    let mut stmt = conn.prepare(statement)?;
    let width = stmt.column_count();
    let mut rows = stmt.query([])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut cells = Vec::with_capacity(width);
        for i in 0..width {
            cells.push(Cell::from(row.get_ref(i)?));
        }
        out.push(cells);
    }
    Ok(out)
}

/// Runs `statement` verbatim against the store and returns every row.
///
/// The statement is not inspected; callers must not pass untrusted text.
pub fn run_query(statement: &str, db_path: &Path, diag: &dyn Diagnostics) -> EtlResult<Vec<Row>> {
    let result = connect_read_only(db_path).and_then(|conn| query_rows(&conn, statement));
    match result {
        Ok(rows) => {
            diag.info(&format!("Query executed successfully: {}", statement));
            Ok(rows)
        }
        Err(e) => {
            diag.error(&format!("Error running query: {}", e));
            Err(EtlError::QueryExecution(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Recorder;

    fn bank(name: &str, usd: f64) -> EnrichedBankRecord {
        EnrichedBankRecord {
            name: name.to_string(),
            market_cap_usd_billion: usd,
            market_cap_gbp_billion: usd * 0.8,
            market_cap_eur_billion: usd * 0.9,
            market_cap_inr_billion: usd * 80.0,
        }
    }

    fn dump(conn: &Connection, table: &str) -> Vec<Row> {
        query_rows(conn, &format!("SELECT * FROM {}", quote_ident(table))).unwrap()
    }

    #[test]
    fn replace_table_creates_columns_and_rows() {
        let conn = Connection::open_in_memory().unwrap();
        let n = replace_table(&conn, "Largest_banks", &[bank("Bank A", 1000.5), bank("Bank B", 2.0)]).unwrap();
        assert_eq!(n, 2);

        let mut stmt = conn.prepare("SELECT * FROM Largest_banks").unwrap();
        let names: Vec<&str> = stmt.column_names();
        assert_eq!(names, COLUMNS.to_vec());
        drop(stmt);

        let rows = dump(&conn, "Largest_banks");
        assert_eq!(rows[0][0], Cell::Text("Bank A".into()));
        assert_eq!(rows[0][1], Cell::Real(1000.5));
        assert_eq!(rows[1][0], Cell::Text("Bank B".into()));
    }

    #[test]
    fn replace_table_is_full_replace() {
        let conn = Connection::open_in_memory().unwrap();
        replace_table(&conn, "t", &[bank("Old 1", 1.0), bank("Old 2", 2.0), bank("Old 3", 3.0)]).unwrap();
        replace_table(&conn, "t", &[bank("New", 9.0)]).unwrap();
        let rows = dump(&conn, "t");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0], Cell::Text("New".into()));
    }

    #[test]
    fn replace_table_replaces_foreign_schema() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY, other TEXT); INSERT INTO t VALUES (1, 'x');")
            .unwrap();
        replace_table(&conn, "t", &[bank("A", 1.0)]).unwrap();
        let rows = dump(&conn, "t");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), 5);
    }

    #[test]
    fn odd_table_names_are_quoted() {
        let conn = Connection::open_in_memory().unwrap();
        replace_table(&conn, "largest \"banks\"", &[bank("A", 1.0)]).unwrap();
        assert_eq!(dump(&conn, "largest \"banks\"").len(), 1);
    }

    #[test]
    fn persist_twice_yields_identical_table() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("Banks.db");
        let records = vec![bank("Bank A", 1000.5), bank("Bank B", 2.0)];
        let diag = Recorder::default();

        persist_table(&records, &db, "Largest_banks", &diag).unwrap();
        let first = run_query("SELECT * FROM Largest_banks", &db, &diag).unwrap();
        persist_table(&records, &db, "Largest_banks", &diag).unwrap();
        let second = run_query("SELECT * FROM Largest_banks", &db, &diag).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn average_gbp_for_single_row() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("Banks.db");
        let diag = Recorder::default();
        persist_table(&[bank("Bank A", 1000.5)], &db, "Largest_banks", &diag).unwrap();

        let rows = run_query("SELECT AVG(Market_Cap_GBP_Billion) FROM Largest_banks", &db, &diag).unwrap();
        assert_eq!(rows.len(), 1);
        match rows[0][0] {
            Cell::Real(avg) => assert!((avg - 800.4).abs() < 1e-9),
            ref other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn query_preserves_insertion_order() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("Banks.db");
        let diag = Recorder::default();
        let names = ["Zeta", "Alpha", "Mu", "Beta", "Omega", "Gamma"];
        let records: Vec<_> = names.iter().map(|n| bank(n, 1.0)).collect();
        persist_table(&records, &db, "Largest_banks", &diag).unwrap();

        let rows = run_query("SELECT Name FROM Largest_banks LIMIT 5", &db, &diag).unwrap();
        let got: Vec<Cell> = rows.into_iter().map(|mut r| r.remove(0)).collect();
        let want: Vec<Cell> = names[..5].iter().map(|n| Cell::Text(n.to_string())).collect();
        assert_eq!(got, want);
    }

    #[test]
    fn bad_query_reports_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("Banks.db");
        let diag = Recorder::default();
        persist_table(&[bank("A", 1.0)], &db, "Largest_banks", &diag).unwrap();

        match run_query("SELECT * FROM no_such_table", &db, &diag) {
            Err(EtlError::QueryExecution(msg)) => assert!(msg.contains("no_such_table")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn queries_cannot_write() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("Banks.db");
        let diag = Recorder::default();
        persist_table(&[bank("A", 1.0)], &db, "Largest_banks", &diag).unwrap();

        assert!(run_query("DROP TABLE Largest_banks", &db, &diag).is_err());
        assert_eq!(run_query("SELECT * FROM Largest_banks", &db, &diag).unwrap().len(), 1);
    }

    #[test]
    fn persist_to_unopenable_path_names_table() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("missing").join("Banks.db");
        match persist_table(&[bank("A", 1.0)], &db, "Largest_banks", &Recorder::default()) {
            Err(EtlError::Persistence { target, .. }) => assert_eq!(target, "Largest_banks"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn row_formatting() {
        assert_eq!(format_row(&vec![Cell::Real(800.4)]), "(800.4,)");
        assert_eq!(
            format_row(&vec![Cell::Text("JPMorgan Chase".into()), Cell::Real(432.92), Cell::Null]),
            "('JPMorgan Chase', 432.92, None)"
        );
        assert_eq!(
            serde_json::to_string(&vec![Cell::Text("A".into()), Cell::Integer(3), Cell::Null]).unwrap(),
            r#"["A",3,null]"#
        );
    }
}
