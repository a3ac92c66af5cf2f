use crate::error::{EtlError, Result, SinkError};
use crate::process::load::Dataset;
use crate::sink::row_groups;
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type, Int64Type};
use arrow::record_batch::RecordBatch;
use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{params_from_iter, Connection};
use std::fs;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, instrument};

/// Declared SQLite column affinity for an arrow type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Integer,
    Real,
    Text,
}

impl SqlType {
    pub fn for_arrow(data_type: &DataType) -> Self {
        match data_type {
            DataType::Boolean
            | DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64 => SqlType::Integer,
            DataType::Float16 | DataType::Float32 | DataType::Float64 => SqlType::Real,
            _ => SqlType::Text,
        }
    }

    fn as_sql(self) -> &'static str {
        match self {
            SqlType::Integer => "INTEGER",
            SqlType::Real => "REAL",
            SqlType::Text => "TEXT",
        }
    }

    fn arrow_type(self) -> DataType {
        match self {
            SqlType::Integer => DataType::Int64,
            SqlType::Real => DataType::Float64,
            SqlType::Text => DataType::Utf8,
        }
    }
}

/// Replace table `table` in the database at `db_path` with the contents of
/// `dataset`, inserting `batch_size` rows per transaction. The connection is
/// closed before returning.
#[instrument(level = "info", skip(dataset, db_path), fields(db = %db_path.as_ref().display()))]
pub fn write_table<P: AsRef<Path>>(
    dataset: &Dataset,
    db_path: P,
    table: &str,
    batch_size: usize,
) -> Result<()> {
    let db_path = db_path.as_ref();
    let start = Instant::now();
    write_inner(dataset, db_path, table, batch_size).map_err(|source| EtlError::SqlSink {
        path: db_path.to_path_buf(),
        table: table.to_string(),
        source,
    })?;
    info!(
        rows = dataset.num_rows(),
        table,
        elapsed = ?start.elapsed(),
        "exported table"
    );
    Ok(())
}

fn write_inner(
    dataset: &Dataset,
    db_path: &Path,
    table: &str,
    batch_size: usize,
) -> std::result::Result<(), SinkError> {
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut conn = Connection::open(db_path)?;

    let schema = dataset.schema();
    let columns: Vec<(String, SqlType)> = schema
        .fields()
        .iter()
        .map(|f| (f.name().clone(), SqlType::for_arrow(f.data_type())))
        .collect();

    let tx = conn.transaction()?;
    tx.execute(&format!("DROP TABLE IF EXISTS {}", quote_ident(table)), [])?;
    tx.execute(&create_table_sql(table, &columns), [])?;
    tx.commit()?;

    let insert = insert_sql(table, columns.len());
    for (idx, group) in row_groups(dataset.batch(), batch_size).enumerate() {
        let typed = typed_columns(&group, &columns)?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(&insert)?;
            for row in 0..group.num_rows() {
                stmt.execute(params_from_iter(typed.iter().map(|c| sql_value(c, row))))?;
            }
        }
        tx.commit()?;
        debug!(chunk = idx, rows = group.num_rows(), "inserted rows");
    }

    conn.close().map_err(|(_, e)| e)?;
    Ok(())
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn create_table_sql(table: &str, columns: &[(String, SqlType)]) -> String {
    let cols = columns
        .iter()
        .map(|(name, ty)| format!("{} {}", quote_ident(name), ty.as_sql()))
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE {} ({})", quote_ident(table), cols)
}

fn insert_sql(table: &str, n: usize) -> String {
    let placeholders = vec!["?"; n].join(", ");
    format!("INSERT INTO {} VALUES ({})", quote_ident(table), placeholders)
}

/// Cast each column to the arrow type backing its SQL affinity.
fn typed_columns(
    batch: &RecordBatch,
    columns: &[(String, SqlType)],
) -> std::result::Result<Vec<(SqlType, ArrayRef)>, SinkError> {
    batch
        .columns()
        .iter()
        .zip(columns)
        .map(|(array, (_, ty))| -> std::result::Result<_, SinkError> {
            Ok((*ty, cast(array, &ty.arrow_type())?))
        })
        .collect()
}

/// Bind value for one cell, borrowing text straight from the arrow buffer.
fn sql_value((ty, array): &(SqlType, ArrayRef), row: usize) -> ToSqlOutput<'_> {
    let value = if array.is_null(row) {
        ValueRef::Null
    } else {
        match ty {
            SqlType::Integer => ValueRef::Integer(array.as_primitive::<Int64Type>().value(row)),
            SqlType::Real => ValueRef::Real(array.as_primitive::<Float64Type>().value(row)),
            SqlType::Text => ValueRef::Text(array.as_string::<i32>().value(row).as_bytes()),
        }
    };
    ToSqlOutput::Borrowed(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{BooleanArray, Float64Array, Int64Array, StringArray};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn lifters() -> Dataset {
        let name: ArrayRef = Arc::new(StringArray::from(vec![Some("Ann"), Some("Bo"), None]));
        let age: ArrayRef = Arc::new(Int64Array::from(vec![Some(24), None, Some(40)]));
        let total: ArrayRef = Arc::new(Float64Array::from(vec![Some(402.5), Some(310.0), None]));
        let tested: ArrayRef = Arc::new(BooleanArray::from(vec![Some(true), Some(false), None]));
        Dataset::new(
            RecordBatch::try_from_iter(vec![
                ("Name", name),
                ("Age", age),
                ("TotalKg", total),
                ("Tested", tested),
            ])
            .unwrap(),
        )
    }

    type Row = (Option<String>, Option<i64>, Option<f64>, Option<i64>);

    fn read_rows(db: &Path, table: &str) -> Vec<Row> {
        let conn = Connection::open(db).unwrap();
        let mut stmt = conn
            .prepare(&format!("SELECT * FROM {} ORDER BY rowid", quote_ident(table)))
            .unwrap();
        let rows = stmt
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)))
            .unwrap()
            .collect::<rusqlite::Result<Vec<_>>>()
            .unwrap();
        rows
    }

    #[test]
    fn writes_rows_with_nulls_across_batches() {
        let dir = tempdir().unwrap();
        let db = dir.path().join("powerlifting_data.sqlite");
        write_table(&lifters(), &db, "powerlifting", 2).unwrap();

        assert_eq!(
            read_rows(&db, "powerlifting"),
            vec![
                (Some("Ann".into()), Some(24), Some(402.5), Some(1)),
                (Some("Bo".into()), None, Some(310.0), Some(0)),
                (None, Some(40), None, None),
            ]
        );
    }

    #[test]
    fn declares_column_types() {
        let dir = tempdir().unwrap();
        let db = dir.path().join("out.sqlite");
        write_table(&lifters(), &db, "powerlifting", 100_000).unwrap();

        let conn = Connection::open(&db).unwrap();
        let mut stmt = conn
            .prepare("SELECT name, type FROM pragma_table_info('powerlifting')")
            .unwrap();
        let cols: Vec<(String, String)> = stmt
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();
        assert_eq!(
            cols,
            vec![
                ("Name".to_string(), "TEXT".to_string()),
                ("Age".to_string(), "INTEGER".to_string()),
                ("TotalKg".to_string(), "REAL".to_string()),
                ("Tested".to_string(), "INTEGER".to_string()),
            ]
        );
    }

    #[test]
    fn replaces_instead_of_appending() {
        let dir = tempdir().unwrap();
        let db = dir.path().join("out.sqlite");
        {
            let conn = Connection::open(&db).unwrap();
            conn.execute("CREATE TABLE powerlifting (legacy TEXT)", []).unwrap();
            conn.execute("INSERT INTO powerlifting VALUES ('x')", []).unwrap();
        }

        write_table(&lifters(), &db, "powerlifting", 100_000).unwrap();
        write_table(&lifters(), &db, "powerlifting", 100_000).unwrap();
        assert_eq!(read_rows(&db, "powerlifting").len(), 3);
    }

    #[test]
    fn quotes_awkward_identifiers() {
        let dir = tempdir().unwrap();
        let db = dir.path().join("out.sqlite");
        let col: ArrayRef = Arc::new(StringArray::from(vec!["a"]));
        let ds = Dataset::new(RecordBatch::try_from_iter(vec![("Weight \"Class\"", col)]).unwrap());
        write_table(&ds, &db, "my table", 10).unwrap();

        let conn = Connection::open(&db).unwrap();
        let v: String = conn
            .query_row("SELECT \"Weight \"\"Class\"\"\" FROM \"my table\"", [], |r| r.get(0))
            .unwrap();
        assert_eq!(v, "a");
    }

    #[test]
    fn repeated_header_names_load_into_the_table() {
        let dir = tempdir().unwrap();
        let csv = dir.path().join("lifters.csv");
        fs::write(&csv, "Name,Name,Age\nAnn,X,23.4\nBo,,\n").unwrap();
        let loaded = crate::process::load::load_csv(&csv, 10).unwrap();
        let ds = crate::process::normalize::normalize_age(loaded).unwrap().dataset;

        let db = dir.path().join("out.sqlite");
        write_table(&ds, &db, "powerlifting", 10).unwrap();

        let conn = Connection::open(&db).unwrap();
        let mut stmt = conn
            .prepare("SELECT \"Name\", \"Name.1\", \"Age\" FROM powerlifting ORDER BY rowid")
            .unwrap();
        let rows: Vec<(String, Option<String>, Option<i64>)> = stmt
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();
        assert_eq!(
            rows,
            vec![
                ("Ann".to_string(), Some("X".to_string()), Some(24)),
                ("Bo".to_string(), None, None),
            ]
        );
    }

    #[test]
    fn long_text_survives_binding() {
        let dir = tempdir().unwrap();
        let db = dir.path().join("out.sqlite");
        let long = "Ä".repeat(5_000);
        let col: ArrayRef = Arc::new(StringArray::from(vec![Some(long.as_str()), Some(""), None]));
        let ds = Dataset::new(RecordBatch::try_from_iter(vec![("MeetName", col)]).unwrap());
        write_table(&ds, &db, "powerlifting", 2).unwrap();

        let conn = Connection::open(&db).unwrap();
        let mut stmt = conn
            .prepare("SELECT MeetName FROM powerlifting ORDER BY rowid")
            .unwrap();
        let values: Vec<Option<String>> = stmt
            .query_map([], |r| r.get(0))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();
        assert_eq!(values, vec![Some(long.clone()), Some(String::new()), None]);
    }

    #[test]
    fn empty_table_is_created() {
        let dir = tempdir().unwrap();
        let db = dir.path().join("out.sqlite");
        let empty = Dataset::new(lifters().batch().slice(0, 0));
        write_table(&empty, &db, "powerlifting", 10).unwrap();
        assert!(read_rows(&db, "powerlifting").is_empty());
    }
}
