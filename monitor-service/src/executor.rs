//! Diagnostic query execution and result rendering.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use common::errors::{AppError, AppResult};
use common::models::query::ResultTable;
use sqlx::mysql::MySqlRow;
use sqlx::postgres::PgRow;
use sqlx::sqlite::SqliteRow;
use sqlx::types::{BigDecimal, JsonValue, Uuid};
use sqlx::{Column, ColumnIndex, Decode, Executor, Row, Statement, Type, TypeInfo, ValueRef};

use crate::driver::LiveConnection;

/// Query run when a connection has no custom diagnostic query.
pub const DEFAULT_PROBE_QUERY: &str = "SELECT 1 as test_value";

/// Text used for SQL NULL cells.
const NULL_CELL: &str = "null";

/// Picks the custom query, or the default probe when it is absent or blank.
pub fn probe_query(custom: Option<&str>) -> &str {
    custom
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .unwrap_or(DEFAULT_PROBE_QUERY)
}

/// Runs `query` (or the default probe) and renders the rows as fixed-width text.
///
/// No retry. Driver errors come back as `AppError::QueryFailure`.
pub async fn execute(conn: &mut LiveConnection, query: Option<&str>, width: usize) -> AppResult<String> {
    let table = run_query(conn, probe_query(query)).await?;
    Ok(table.to_text(width))
}

// Prepares first so the header is known even when no rows come back.
macro_rules! fetch_table {
    ($conn:expr, $sql:expr) => {{
        let stmt = (&mut *$conn).prepare($sql).await.map_err(query_failure)?;
        let columns = stmt
            .columns()
            .iter()
            .map(|column| column.name().to_string())
            .collect::<Vec<_>>();
        let rows = stmt.query().fetch_all(&mut *$conn).await.map_err(query_failure)?;
        ResultTable::new(columns, rows.iter().map(render_row).collect())
    }};
}

/// Runs `sql` and collects every row, in the order the database returns them.
pub async fn run_query(conn: &mut LiveConnection, sql: &str) -> AppResult<ResultTable> {
    let table = match conn {
        LiveConnection::Sqlite(c) => fetch_table!(c, sql),
        LiveConnection::MySql(c) => fetch_table!(c, sql),
        LiveConnection::Postgres(c) => fetch_table!(c, sql),
    };
    tracing::debug!(rows = table.row_count(), "Diagnostic query finished");
    Ok(table)
}

/// Cell types only some drivers can decode, tried after the shared ones.
trait DriverCells: Row {
    fn render_specific(&self, idx: usize) -> Option<String>;
}

macro_rules! try_render {
    ($row:expr, $idx:expr, $($ty:ty),+ $(,)?) => {
        $(
            if let Ok(value) = $row.try_get::<$ty, _>($idx) {
                return Some(value.to_string());
            }
        )+
    };
}

impl DriverCells for SqliteRow {
    fn render_specific(&self, idx: usize) -> Option<String> {
        self.try_get::<Vec<u8>, _>(idx).ok().map(|bytes| render_bytes(&bytes))
    }
}

impl DriverCells for MySqlRow {
    fn render_specific(&self, idx: usize) -> Option<String> {
        try_render!(self, idx, BigDecimal, JsonValue);
        self.try_get::<Vec<u8>, _>(idx).ok().map(|bytes| render_bytes(&bytes))
    }
}

impl DriverCells for PgRow {
    fn render_specific(&self, idx: usize) -> Option<String> {
        try_render!(self, idx, BigDecimal, Uuid, JsonValue);
        self.try_get::<Vec<u8>, _>(idx).ok().map(|bytes| render_bytes(&bytes))
    }
}

/// Binary cells print as text when they hold UTF-8, as `0x` hex otherwise.
fn render_bytes(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => format!("0x{}", hex::encode(bytes)),
    }
}

fn render_row<R>(row: &R) -> Vec<String>
where
    R: DriverCells,
    usize: ColumnIndex<R>,
    for<'r> String: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> i64: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> i32: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> i16: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> f64: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> f32: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> bool: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> DateTime<Utc>: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> NaiveDateTime: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> NaiveDate: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> NaiveTime: Decode<'r, R::Database> + Type<R::Database>,
{
    (0..row.len()).map(|idx| render_cell(row, idx)).collect()
}

/// Renders one cell as the first type it decodes to; the type name otherwise.
fn render_cell<R>(row: &R, idx: usize) -> String
where
    R: DriverCells,
    usize: ColumnIndex<R>,
    for<'r> String: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> i64: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> i32: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> i16: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> f64: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> f32: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> bool: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> DateTime<Utc>: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> NaiveDateTime: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> NaiveDate: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> NaiveTime: Decode<'r, R::Database> + Type<R::Database>,
{
    let type_name = match row.try_get_raw(idx) {
        Ok(value) if value.is_null() => return NULL_CELL.to_string(),
        Ok(value) => value.type_info().name().to_string(),
        Err(err) => return format!("<{}>", err),
    };

    macro_rules! first_decodable {
        ($($ty:ty),+ $(,)?) => {
            $(
                if let Ok(value) = row.try_get::<$ty, _>(idx) {
                    return value.to_string();
                }
            )+
        };
    }
    first_decodable!(
        String,
        i64,
        i32,
        i16,
        f64,
        f32,
        bool,
        DateTime<Utc>,
        NaiveDateTime,
        NaiveDate,
        NaiveTime,
    );
    if let Some(text) = row.render_specific(idx) {
        return text;
    }

    format!("<{}>", type_name)
}

fn query_failure(err: sqlx::Error) -> AppError {
    AppError::QueryFailure(err.to_string())
}
