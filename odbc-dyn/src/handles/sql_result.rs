use odbc_sys::SqlReturn;

/// Outcome of a single native call. Unlike [`SqlReturn`] it is an exhaustive enum and may carry
/// the output of the call. Diagnostics are not fetched yet, this is left to the caller which still
/// holds the handle.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SqlResult<T> {
    /// `SQL_SUCCESS`
    Success(T),
    /// `SQL_SUCCESS_WITH_INFO`. The handle holds warnings.
    SuccessWithInfo(T),
    /// `SQL_NO_DATA`, e.g. at the end of a result set, or for a searched update without matches.
    NoData,
    /// `SQL_NEED_DATA`. A parameter bound for execution time is waiting to be sent.
    NeedData,
    /// `SQL_STILL_EXECUTING`. No handle is put into asynchronous mode, yet a driver may still
    /// report it.
    StillExecuting {
        /// Native function which has not completed.
        function: &'static str,
    },
    /// `SQL_ERROR`. The handle holds diagnostics.
    Error {
        /// Native function which failed, e.g. `"SQLExecDirect"`. Kept for the error message.
        function: &'static str,
    },
}

impl SqlResult<()> {
    /// Attaches the output of a successful call, which is only valid to read after the call
    /// succeeded.
    pub fn on_success<F, T>(self, f: F) -> SqlResult<T>
    where
        F: FnOnce() -> T,
    {
        self.map(|()| f())
    }
}

impl<T> SqlResult<T> {
    pub fn is_err(&self) -> bool {
        matches!(self, SqlResult::Error { .. })
    }

    /// Transforms the output of `Success` and `SuccessWithInfo`. Other variants are passed on.
    pub fn map<U, F>(self, f: F) -> SqlResult<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            SqlResult::Success(value) => SqlResult::Success(f(value)),
            SqlResult::SuccessWithInfo(value) => SqlResult::SuccessWithInfo(f(value)),
            SqlResult::NoData => SqlResult::NoData,
            SqlResult::NeedData => SqlResult::NeedData,
            SqlResult::StillExecuting { function } => SqlResult::StillExecuting { function },
            SqlResult::Error { function } => SqlResult::Error { function },
        }
    }
}

/// Names the native function a return code originates from.
pub trait ExtSqlReturn {
    fn into_sql_result(self, function: &'static str) -> SqlResult<()>;
}

impl ExtSqlReturn for SqlReturn {
    fn into_sql_result(self, function: &'static str) -> SqlResult<()> {
        match self {
            SqlReturn::SUCCESS => SqlResult::Success(()),
            SqlReturn::SUCCESS_WITH_INFO => SqlResult::SuccessWithInfo(()),
            SqlReturn::NO_DATA => SqlResult::NoData,
            SqlReturn::NEED_DATA => SqlResult::NeedData,
            SqlReturn::STILL_EXECUTING => SqlResult::StillExecuting { function },
            SqlReturn::ERROR => SqlResult::Error { function },
            // SQL_INVALID_HANDLE. A bug in this crate, not something an application could handle.
            other => panic!("Unexpected return value '{other:?}' of '{function}'"),
        }
    }
}
