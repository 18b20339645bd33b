//! # odbc-dyn
//!
//! Drives ODBC statements, parameters and cursors with dynamically typed values. Every column is
//! decoded into a [`Value`] and every parameter is bound from one, which makes this crate a fit
//! for applications which only learn about the shape of their data at runtime, e.g. scripting
//! language bindings or generic database tools.
//!
//! ```no_run
//! use odbc_dyn::{Environment, Execution, FetchMode, Value};
//!
//! let env = Environment::new()?;
//! let (conn, _) = env.connect_with_connection_string("Driver={SQLite3};Database=my.db;")?;
//!
//! let mut insert = conn.prepare("INSERT INTO Birthdays (name, year) VALUES (?, ?)")?;
//! insert.bind_str(1, "Ada")?;
//! insert.bind_number(2, 1815.)?;
//! insert.execute()?;
//!
//! if let Execution::ResultSet(mut cursor) = conn.execute("SELECT name, year FROM Birthdays")? {
//!     cursor.for_each(FetchMode::Named, true, |row| {
//!         println!("{:?} {:?}", row.by_name("name"), row.by_name("year"));
//!         Ok::<_, odbc_dyn::Error>(None::<()>)
//!     })?;
//! }
//! # Ok::<(), odbc_dyn::Error>(())
//! ```

mod attributes;
mod capabilities;
mod catalog;
mod column_info;
mod connection;
mod cursor;
mod decode;
mod driver_info;
mod environment;
mod error;
mod execute;
mod lifecycle;
mod parameter;
mod statement;
mod value;

#[cfg(test)]
mod fake;

pub mod handles;

pub use self::{
    attributes::{
        CONN_ACCESS_MODE, CONN_AUTOCOMMIT, CONN_CURRENT_CATALOG, CONN_LOGIN_TIMEOUT, CONN_TRACE,
        CONN_TRACEFILE, CONN_TXN_ISOLATION, ENV_ODBC_VERSION, STMT_MAX_LENGTH, STMT_MAX_ROWS,
        STMT_NOSCAN, STMT_QUERY_TIMEOUT, TransactionIsolation,
    },
    capabilities::{CAPABILITIES, Capability, Concurrency, Decoder, ResultSetType, RowChange},
    catalog::{RowIdScope, SpecialColumns},
    connection::Connection,
    cursor::{Cursor, FetchMode, Row},
    driver_info::{CursorType, DriverInfo},
    environment::{DataSourceInfo, Environment, InstalledDriver, OdbcVersion},
    error::Error,
    parameter::CallbackError,
    statement::{Execution, Statement},
    value::{Value, ValueKind},
};
// Reexports
/// Reexports `odbc-sys` as sys to enable applications to always use the same version as this crate.
pub use odbc_sys as sys;
