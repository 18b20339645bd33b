use std::{collections::TryReserveError, fmt::Write};

use thiserror::Error as ThisError;

use crate::handles::{Diagnostics, Record as DiagnosticRecord, SqlResult, log_diagnostics};

/// Error type of this crate. Driver errors carry the diagnostic records reported by the driver
/// manager. Usage errors are detected by this crate and never carry an SQLSTATE.
#[derive(Debug, ThisError)]
pub enum Error {
    /// Allocating the environment itself fails. Further diagnostics are not available, as they
    /// would be retrieved using the envirorment handle. Exclusively emitted by
    /// [`crate::Environment::new`].
    #[error("Failed to allocate ODBC Environment.")]
    FailedAllocatingEnvironment,
    /// This should never happen, given that ODBC driver manager and ODBC driver do not have any
    /// Bugs. Since we may link vs a bunch of these, better to be on the safe side.
    #[error(
        "No Diagnostics available. The ODBC function call to {} returned an error. Sadly neither \
        the ODBC driver manager, nor the driver were polite enough to leave a diagnostic record \
        specifying what exactly went wrong.",
        function
    )]
    NoDiagnostics {
        /// ODBC API call which returned error without producing a diagnostic record.
        function: &'static str,
    },
    /// SQL Error had been returned by a low level ODBC function call. All diagnostic records
    /// associated with the handle are part of the error.
    #[error("ODBC emitted an error calling '{function}':\n{}", format_records(.records))]
    Diagnostics {
        /// ODBC API call which produced the diagnostic records
        function: &'static str,
        /// Diagnostic records in the order reported by the driver manager. Never empty.
        records: Vec<DiagnosticRecord>,
    },
    /// Growing a parameter buffer or other scratch memory failed.
    #[error("Not enough memory to allocate a buffer: {0}")]
    OutOfMemory(#[from] TryReserveError),
    /// Parameter indices start at `1`. If the number of placeholders of a prepared statement is
    /// known, the index must not exceed it.
    #[error("Invalid parameter index {index}.")]
    InvalidParameterIndex { index: u16 },
    #[error("There is an open cursor. Close it before executing or preparing the statement.")]
    CursorAlreadyOpen,
    #[error("There is no open cursor.")]
    NoOpenCursor,
    /// `execute` without SQL text on a statement which has not been prepared.
    #[error("The statement is not prepared and no SQL text has been provided.")]
    NotPrepared,
    #[error("The statement has been destroyed.")]
    StatementDestroyed,
    /// Operation on an environment, connection or cursor which has already been closed.
    #[error("The {0} is closed.")]
    Closed(&'static str),
    /// Refusing to close an environment with open connections, or a connection with open
    /// statements or cursors.
    #[error("There are {count} open children. Close them before closing the {parent}.")]
    OpenChildren { parent: &'static str, count: usize },
    /// A value could not be converted into the type a parameter is bound as.
    #[error("Can not use {value} as a value of type {expected}.")]
    InvalidValue {
        expected: &'static str,
        value: String,
    },
    #[error("Unknown capability '{0}'.")]
    UnknownCapability(String),
    /// A connection string attribute key or value contained a character which can not be
    /// represented in a connection string.
    #[error("Invalid connection string attribute '{0}'.")]
    InvalidConnectionAttribute(String),
    /// A close which completed, yet not all of the native calls involved succeeded.
    #[error("Closing completed with errors:\n{}", format_errors(.0))]
    Teardown(Vec<Error>),
    /// The driver reported `SQL_STILL_EXECUTING`, although no statement is executed
    /// asynchronously.
    #[error("ODBC function '{function}' is still executing.")]
    StillExecuting { function: &'static str },
    /// A callback supplying a parameter at execution time failed. The execution is cancelled.
    #[error("Callback supplying a parameter at execution time failed: {0}")]
    Callback(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// All diagnostic records carried by this error, including these of errors accumulated during
    /// teardown.
    pub fn records(&self) -> Vec<&DiagnosticRecord> {
        match self {
            Error::Diagnostics { records, .. } => records.iter().collect(),
            Error::Teardown(errors) => errors.iter().flat_map(Error::records).collect(),
            _ => Vec::new(),
        }
    }

    /// First SQLSTATE of a driver error.
    pub fn state(&self) -> Option<&str> {
        self.records().first().map(|record| record.state.as_str())
    }
}

/// One record per line: message, then SQLSTATE.
fn format_records(records: &[DiagnosticRecord]) -> String {
    let mut out = String::new();
    for (index, record) in records.iter().enumerate() {
        if index != 0 {
            out.push('\n');
        }
        let _ = write!(out, "{}\n{}", record.message(), record.state.as_str());
    }
    out
}

fn format_errors(errors: &[Error]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

impl SqlResult<()> {
    /// Use this instead of [`Self::into_result`] if you expect [`SqlResult::NoData`] to be a
    /// valid value. [`SqlResult::NoData`] is mapped to `Ok(false)`, all other success values are
    /// `Ok(true)`.
    pub fn into_result_bool(self, handle: &(impl Diagnostics + ?Sized)) -> Result<bool, Error> {
        self.on_success(|| true)
            .into_result_with(handle, Some(false), None)
    }
}

// Define that here rather than in `sql_result` mod to keep the `handles` module entirely agnostic
// about the top level `Error` type.
impl<T> SqlResult<T> {
    /// [`Self::Success`] and [`Self::SuccessWithInfo`] are mapped to Ok. In case of
    /// [`Self::SuccessWithInfo`] any diagnostics are logged. [`Self::Error`] is mapped to error.
    pub fn into_result(self, handle: &(impl Diagnostics + ?Sized)) -> Result<T, Error> {
        self.into_result_with(handle, None, None)
    }

    /// Like [`Self::into_result`], but [`SqlResult::NoData`] is mapped to `None`, and any success
    /// is mapped to `Some`.
    pub fn into_result_option(
        self,
        handle: &(impl Diagnostics + ?Sized),
    ) -> Result<Option<T>, Error> {
        self.map(Some).into_result_with(handle, Some(None), None)
    }

    /// Most flexible way of converting an `SqlResult` to an idiomatic `Result`.
    /// [`SqlResult::StillExecuting`] is always an error.
    ///
    /// # Parameters
    ///
    /// * `handle`: This handle is used to extract diagnostics in case `self` is
    ///   [`SqlResult::SuccessWithInfo`] or [`SqlResult::Error`].
    /// * `no_data`: Controls the behaviour for [`SqlResult::NoData`]. `None` indicates that the
    ///   result is never expected to be [`SqlResult::NoData`] and would panic in that case.
    ///   `Some(value)` would cause [`SqlResult::NoData`] to be mapped to `Ok(value)`.
    /// * `need_data`: Controls the behaviour for [`SqlResult::NeedData`]. `None` indicates that the
    ///   result is never expected to be [`SqlResult::NeedData`] and would panic in that case.
    ///   `Some(value)` would cause [`SqlResult::NeedData`] to be mapped to `Ok(value)`.
    pub fn into_result_with(
        self,
        handle: &(impl Diagnostics + ?Sized),
        no_data: Option<T>,
        need_data: Option<T>,
    ) -> Result<T, Error> {
        match self {
            // The function has been executed successfully. Holds result.
            SqlResult::Success(value) => Ok(value),
            // The function has been executed successfully. There have been warnings. Holds result.
            SqlResult::SuccessWithInfo(value) => {
                log_diagnostics(handle);
                Ok(value)
            }
            SqlResult::Error { function } => Err(diagnostics_error(handle, function)),
            SqlResult::NoData => {
                Ok(no_data.expect("Unexpected SQL_NO_DATA returned by ODBC function"))
            }
            SqlResult::NeedData => {
                Ok(need_data.expect("Unexpected SQL_NEED_DATA returned by ODBC function"))
            }
            SqlResult::StillExecuting { function } => Err(Error::StillExecuting { function }),
        }
    }
}

/// Error for a call to `function` which failed on `handle`, carrying the entire chain of
/// diagnostic records.
pub(crate) fn diagnostics_error(
    handle: &(impl Diagnostics + ?Sized),
    function: &'static str,
) -> Error {
    let records = DiagnosticRecord::collect_all(handle);
    if records.is_empty() {
        // Anecdotal ways to reach this code paths:
        //
        // * Specifying invalid drivers (e.g. missing .so the driver itself depends on)
        Error::NoDiagnostics { function }
    } else {
        Error::Diagnostics { function, records }
    }
}

/// Collects the failures of a teardown sequence, which continues after each failing step.
#[derive(Default)]
pub(crate) struct Teardown {
    errors: Vec<Error>,
}

impl Teardown {
    /// Remembers the error of a failed step, if any.
    pub fn step(&mut self, result: Result<(), Error>) {
        if let Err(error) = result {
            self.errors.push(error);
        }
    }

    /// `value` if every step succeeded.
    pub fn finish<T>(self, value: T) -> Result<T, Error> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(Error::Teardown(self.errors))
        }
    }
}
