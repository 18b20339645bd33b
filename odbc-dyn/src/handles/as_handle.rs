use odbc_sys::{Handle, HandleType, SQLFreeHandle};

use super::{Diagnostics, ExtSqlReturn, SqlResult};

/// Provides access to the raw underlying ODBC handle.
///
/// # Safety
///
/// The handle provided by `as_handle` must be valid and match the type returned by `handle_type`.
pub unsafe trait AsHandle {
    /// The raw underlying ODBC handle used to talk to the ODBC C API. The handle must be valid.
    fn as_handle(&self) -> Handle;

    /// The type of the ODBC handle returned by `as_handle`. This is a method rather than a constant
    /// in order to make the type object safe.
    fn handle_type(&self) -> HandleType;
}

/// A handle which can be released explicitly, so the caller learns about a failing
/// `SQLFreeHandle` rather than having `drop` panic.
pub trait Free: Diagnostics {
    /// Releases the handle.
    ///
    /// # Safety
    ///
    /// On success the handle is dangling. The caller must neither use nor drop `self` afterwards,
    /// i.e. it should be wrapped in a `ManuallyDrop`. In case of an error the handle remains valid
    /// and can be used to extract diagnostics.
    unsafe fn free(&mut self) -> SqlResult<()>;
}

/// Shared implementation of [`Free`] for the handle wrappers of this crate.
pub(super) unsafe fn free_as_handle(handle: &impl AsHandle) -> SqlResult<()> {
    unsafe { SQLFreeHandle(handle.handle_type(), handle.as_handle()) }
        .into_sql_result("SQLFreeHandle")
}
