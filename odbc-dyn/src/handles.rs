//! Thin wrappers around valid (i.e. allocated) ODBC handles.
//!
//! Two decisions are already baked into this module:
//!
//! * Treat warnings by logging them with `log`.
//! * Use the narrow (`u8`) variants of the ODBC API. Text is handed to the driver manager as is
//!   and interpreted according to the system locale, which is usually UTF-8 on the platforms we
//!   care about.
//!
//! Functions in here return [`SqlResult`] and never the crate level error type. Turning results
//! into diagnostics is the business of the layers above.

mod as_handle;
mod buffer;
mod column_description;
mod connection;
mod diagnostics;
mod environment;
mod ffi;
mod logging;
mod sql_result;
mod statement;

pub use {
    as_handle::{AsHandle, Free},
    column_description::ColumnDescription,
    connection::{Connection, FUNCTION_BITMAP_SIZE},
    diagnostics::{DiagnosticResult, Diagnostics, Record, State},
    environment::Environment,
    logging::log_diagnostics,
    sql_result::{ExtSqlReturn, SqlResult},
    statement::{InputBinding, Statement, StatementImpl},
};

pub(crate) use buffer::{
    clamp_int, clamp_small_int, fill_text, mut_buf_ptr, optional_text, text_ptr,
};

use odbc_sys::{Handle, HandleType, SQLFreeHandle, SqlReturn};
use std::thread::panicking;

/// Frees a handle and panics on errors, unless we are already unwinding from another panic. Used
/// by the `Drop` implementations. Use [`Free::free`] to learn about errors instead.
unsafe fn drop_handle(handle: Handle, handle_type: HandleType) {
    match unsafe { SQLFreeHandle(handle_type, handle) } {
        SqlReturn::SUCCESS => (),
        other => {
            // Avoid panicking, if we already have a panic. We don't want to mask the original
            // error.
            if !panicking() {
                panic!("Unexpected return value of SQLFreeHandle: {other:?}")
            }
        }
    }
}
