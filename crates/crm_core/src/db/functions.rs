//! Application-defined SQL functions registered on every CRM connection.

use super::DbResult;
use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;

/// Unicode-aware lowercase fold used by contact search.
///
/// SQLite's built-in `LIKE` and `lower()` only fold ASCII letters.
pub const CASEFOLD_FUNCTION: &str = "casefold";

/// Registers the CRM scalar functions on `conn`.
///
/// Safe to call more than once; a later registration replaces the earlier.
pub fn register_sql_functions(conn: &Connection) -> DbResult<()> {
    conn.create_scalar_function(
        CASEFOLD_FUNCTION,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text = ctx.get::<Option<String>>(0)?;
            Ok(text.map(|value| value.to_lowercase()))
        },
    )?;
    Ok(())
}
