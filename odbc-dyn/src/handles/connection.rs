use super::{
    as_handle::{AsHandle, Free, free_as_handle},
    buffer::{clamp_int, clamp_small_int, fill_text, mut_buf_ptr, optional_text, text_ptr},
    drop_handle, ffi,
    sql_result::{ExtSqlReturn, SqlResult},
    statement::StatementImpl,
};
use odbc_sys::{
    CompletionType, DriverConnectOption, HDbc, Handle, HandleType, Pointer,
    SQLAllocHandle, SQLConnect, SQLDisconnect, SQLDriverConnect, SQLEndTran, };
use std::{mem::size_of, ptr::null_mut};

/// `SQL_API_ODBC3_ALL_FUNCTIONS`. Asks `SQLGetFunctions` for the entire bitmap.
const API_ODBC3_ALL_FUNCTIONS: u16 = 999;

/// Number of 16 Bit elements in the bitmap returned for [`API_ODBC3_ALL_FUNCTIONS`].
pub const FUNCTION_BITMAP_SIZE: usize = 250;

/// The connection handle references storage of all information about the connection to the data
/// source, including status, transaction state, and error information.
#[derive(Debug)]
pub struct Connection {
    handle: HDbc,
}

unsafe impl AsHandle for Connection {
    fn as_handle(&self) -> Handle {
        self.handle.as_handle()
    }

    fn handle_type(&self) -> HandleType {
        HandleType::Dbc
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        unsafe {
            drop_handle(self.handle.as_handle(), HandleType::Dbc);
        }
    }
}

impl Free for Connection {
    unsafe fn free(&mut self) -> SqlResult<()> {
        unsafe { free_as_handle(self) }
    }
}

impl Connection {
    /// # Safety
    ///
    /// Call this method only with a valid (successfully allocated) ODBC connection handle.
    pub unsafe fn new(handle: HDbc) -> Self {
        Self { handle }
    }

    /// Establishes connections to a driver and a data source.
    ///
    /// * See [Connecting with SQLConnect][1]
    /// * See [SQLConnectFunction][2]
    ///
    /// # Arguments
    ///
    /// * `data_source_name` - Data source name. The data might be located on the same computer as
    ///   the program, or on another computer somewhere on a network.
    /// * `user` - User identifier.
    /// * `pwd` - Authentication string (typically the password).
    ///
    /// [1]: https://docs.microsoft.com//sql/odbc/reference/develop-app/connecting-with-sqlconnect
    /// [2]: https://docs.microsoft.com/sql/odbc/reference/syntax/sqlconnect-function
    pub fn connect(
        &mut self,
        data_source_name: &str,
        user: Option<&str>,
        pwd: Option<&str>,
    ) -> SqlResult<()> {
        let (user_ptr, user_len) = optional_text(user);
        let (pwd_ptr, pwd_len) = optional_text(pwd);
        unsafe {
            SQLConnect(
                self.handle,
                text_ptr(data_source_name),
                clamp_small_int(data_source_name.len()),
                user_ptr,
                user_len,
                pwd_ptr,
                pwd_len,
            )
        }
        .into_sql_result("SQLConnect")
    }

    /// An alternative to `connect`. It supports data sources that require more connection
    /// information than the three arguments in `connect` and data sources that are not defined in
    /// the system information. The driver manager never prompts the user.
    ///
    /// `completed_connection_string` is filled with the connection string the driver actually
    /// used. Its entire capacity is handed to the driver. A longer completed string is truncated.
    pub fn driver_connect(
        &mut self,
        connection_string: &str,
        completed_connection_string: &mut Vec<u8>,
    ) -> SqlResult<()> {
        completed_connection_string.resize(completed_connection_string.capacity(), 0);
        let mut actual_len: i16 = 0;
        let result = unsafe {
            SQLDriverConnect(
                self.handle,
                null_mut(),
                text_ptr(connection_string),
                clamp_small_int(connection_string.len()),
                mut_buf_ptr(completed_connection_string),
                clamp_small_int(completed_connection_string.len()),
                &mut actual_len,
                DriverConnectOption::NoPrompt,
            )
        }
        .into_sql_result("SQLDriverConnect");
        let actual_len = usize::try_from(actual_len)
            .unwrap_or(0)
            .min(completed_connection_string.len().saturating_sub(1));
        completed_connection_string.truncate(actual_len);
        result
    }

    /// Disconnect from an ODBC data source.
    pub fn disconnect(&mut self) -> SqlResult<()> {
        unsafe { SQLDisconnect(self.handle) }.into_sql_result("SQLDisconnect")
    }

    /// Allocate a new statement handle. The `Statement` must not outlive the `Connection`.
    pub fn allocate_statement(&self) -> SqlResult<StatementImpl> {
        let mut out = Handle::null();
        unsafe {
            SQLAllocHandle(HandleType::Stmt, self.as_handle(), &mut out)
                .into_sql_result("SQLAllocHandle")
                .on_success(|| StatementImpl::new(out.as_hstmt()))
        }
    }

    /// To commit a transaction in manual-commit mode.
    pub fn commit(&self) -> SqlResult<()> {
        unsafe { SQLEndTran(HandleType::Dbc, self.as_handle(), CompletionType::Commit) }
            .into_sql_result("SQLEndTran")
    }

    /// Roll back a transaction in manual-commit mode.
    pub fn rollback(&self) -> SqlResult<()> {
        unsafe { SQLEndTran(HandleType::Dbc, self.as_handle(), CompletionType::Rollback) }
            .into_sql_result("SQLEndTran")
    }

    /// Sets an integer connection attribute identified by its raw attribute id.
    pub fn set_attribute_u32(&self, attribute: i32, value: u32) -> SqlResult<()> {
        unsafe {
            ffi::SQLSetConnectAttr(
                self.handle,
                attribute,
                value as usize as Pointer,
                0, // will be ignored according to ODBC spec
            )
        }
        .into_sql_result("SQLSetConnectAttr")
    }

    /// Reads an integer connection attribute identified by its raw attribute id.
    pub fn attribute_u32(&self, attribute: i32) -> SqlResult<u32> {
        let mut value: u32 = 0;
        unsafe {
            ffi::SQLGetConnectAttr(
                self.handle,
                attribute,
                &mut value as *mut u32 as Pointer,
                0,
                null_mut(),
            )
        }
        .into_sql_result("SQLGetConnectAttr")
        .on_success(|| value)
    }

    /// Sets a string connection attribute, e.g. the current catalog.
    pub fn set_attribute_str(&self, attribute: i32, value: &str) -> SqlResult<()> {
        unsafe {
            ffi::SQLSetConnectAttr(
                self.handle,
                attribute,
                value.as_ptr() as Pointer,
                clamp_int(value.len()),
            )
        }
        .into_sql_result("SQLSetConnectAttr")
    }

    /// Reads a string connection attribute into `buf`. Uses the entire capacity of `buf` and
    /// grows it if necessary.
    pub fn attribute_str(&self, attribute: i32, buf: &mut Vec<u8>) -> SqlResult<()> {
        fill_text(buf, |chunk| {
            let mut string_length: i32 = 0;
            unsafe {
                ffi::SQLGetConnectAttr(
                    self.handle,
                    attribute,
                    mut_buf_ptr(chunk) as Pointer,
                    clamp_int(chunk.len()),
                    &mut string_length,
                )
            }
            .into_sql_result("SQLGetConnectAttr")
            .on_success(|| string_length as isize)
        })
    }

    /// `SQLGetInfo` for information types returning a 32 Bit integer or bitmask.
    pub fn info_u32(&self, info_type: u16) -> SqlResult<u32> {
        let mut value = 0u32;
        unsafe {
            ffi::SQLGetInfo(
                self.handle,
                info_type,
                &mut value as *mut u32 as Pointer,
                // Buffer length should not be required in this case, yet some drivers (such as
                // Microsoft Access) return an error without diagnostics if it is missing.
                size_of::<u32>() as i16,
                null_mut(),
            )
        }
        .into_sql_result("SQLGetInfo")
        .on_success(|| value)
    }

    /// `SQLGetInfo` for information types returning a 16 Bit integer.
    pub fn info_u16(&self, info_type: u16) -> SqlResult<u16> {
        let mut value = 0u16;
        unsafe {
            ffi::SQLGetInfo(
                self.handle,
                info_type,
                &mut value as *mut u16 as Pointer,
                size_of::<u16>() as i16,
                null_mut(),
            )
        }
        .into_sql_result("SQLGetInfo")
        .on_success(|| value)
    }

    /// `SQLGetInfo` for information types returning text. Uses the entire capacity of `buf` and
    /// grows it if necessary.
    pub fn info_string(&self, info_type: u16, buf: &mut Vec<u8>) -> SqlResult<()> {
        fill_text(buf, |chunk| {
            let mut string_length: i16 = 0;
            unsafe {
                ffi::SQLGetInfo(
                    self.handle,
                    info_type,
                    mut_buf_ptr(chunk) as Pointer,
                    clamp_small_int(chunk.len()),
                    &mut string_length,
                )
            }
            .into_sql_result("SQLGetInfo")
            .on_success(|| string_length as isize)
        })
    }

    /// `true` if the driver supports the ODBC function with the `SQL_API_*` identifier
    /// `function_id`.
    pub fn function_supported(&self, function_id: u16) -> SqlResult<bool> {
        let mut supported: u16 = 0;
        unsafe { ffi::SQLGetFunctions(self.handle, function_id, &mut supported) }
            .into_sql_result("SQLGetFunctions")
            .on_success(|| supported != 0)
    }

    /// Fills `bitmap` with the ODBC 3 supported function bitmap.
    pub fn supported_functions(
        &self,
        bitmap: &mut [u16; FUNCTION_BITMAP_SIZE],
    ) -> SqlResult<()> {
        unsafe {
            ffi::SQLGetFunctions(self.handle, API_ODBC3_ALL_FUNCTIONS, bitmap.as_mut_ptr())
        }
        .into_sql_result("SQLGetFunctions")
    }
}
