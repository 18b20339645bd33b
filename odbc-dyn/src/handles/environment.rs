use super::{
    as_handle::{AsHandle, Free, free_as_handle},
    buffer::{clamp_int, clamp_small_int, fill_text, mut_buf_ptr},
    connection::Connection,
    drop_handle, ffi,
    logging::log_diagnostics,
    sql_result::{ExtSqlReturn, SqlResult},
};
use log::debug;
use odbc_sys::{
    FetchOrientation, HEnv, Handle, HandleType, Pointer, SQLAllocHandle,
    SQLDataSources, SQLDrivers,
};
use std::ptr::null_mut;

/// Attribute identifier of `SQL_ATTR_ODBC_VERSION`.
const ATTR_ODBC_VERSION: i32 = 200;

/// An `Environment` is a global context, in which to access data.
///
/// Associated with an `Environment` is any information that is global in nature, such as:
///
/// * The `Environment`'s state
/// * The current environment-level diagnostics
/// * The handles of connections currently allocated on the environment
/// * The current stetting of each environment attribute
#[derive(Debug)]
pub struct Environment {
    /// Invariant: Should always point to a valid ODBC Environment
    handle: HEnv,
}

unsafe impl AsHandle for Environment {
    fn as_handle(&self) -> Handle {
        self.handle.as_handle()
    }

    fn handle_type(&self) -> HandleType {
        HandleType::Env
    }
}

impl Drop for Environment {
    fn drop(&mut self) {
        unsafe {
            drop_handle(self.handle.as_handle(), HandleType::Env);
        }
    }
}

impl Free for Environment {
    unsafe fn free(&mut self) -> SqlResult<()> {
        unsafe { free_as_handle(self) }
    }
}

impl Environment {
    /// An allocated ODBC Environment handle.
    ///
    /// # Safety
    ///
    /// Take care using this function in unit tests, as these run in parallel by default in Rust.
    /// Some driver managers do not cope well with several environments in the same process.
    pub unsafe fn new() -> SqlResult<Self> {
        let mut handle = Handle::null();
        let ret = unsafe { SQLAllocHandle(HandleType::Env, Handle::null(), &mut handle) };
        // There is no handle yet we could obtain diagnostics from, in case of an error.
        let result = ret.into_sql_result("SQLAllocHandle");
        if result.is_err() {
            return SqlResult::Error {
                function: "SQLAllocHandle",
            };
        }

        debug!("ODBC Environment created.");

        let env = Environment {
            handle: handle.as_henv(),
        };
        if matches!(result, SqlResult::SuccessWithInfo(())) {
            log_diagnostics(&env);
        }
        result.on_success(|| env)
    }

    /// Declares which Version of the ODBC API we want to use. This is the first thing that should
    /// be done with any ODBC environment. `version` is the raw value of `SQL_ATTR_ODBC_VERSION`,
    /// e.g. `3` or `380`.
    pub fn declare_version(&self, version: u32) -> SqlResult<()> {
        self.set_attribute_u32(ATTR_ODBC_VERSION, version)
    }

    /// Sets an integer environment attribute identified by its raw attribute id.
    pub fn set_attribute_u32(&self, attribute: i32, value: u32) -> SqlResult<()> {
        unsafe { ffi::SQLSetEnvAttr(self.handle, attribute, value as usize as Pointer, 0) }
            .into_sql_result("SQLSetEnvAttr")
    }

    /// Reads an integer environment attribute identified by its raw attribute id.
    pub fn attribute_u32(&self, attribute: i32) -> SqlResult<u32> {
        let mut value: u32 = 0;
        unsafe {
            ffi::SQLGetEnvAttr(
                self.handle,
                attribute,
                &mut value as *mut u32 as Pointer,
                0,
                null_mut(),
            )
        }
        .into_sql_result("SQLGetEnvAttr")
        .on_success(|| value)
    }

    /// Sets a string environment attribute.
    pub fn set_attribute_str(&self, attribute: i32, value: &str) -> SqlResult<()> {
        unsafe {
            ffi::SQLSetEnvAttr(
                self.handle,
                attribute,
                value.as_ptr() as Pointer,
                clamp_int(value.len()),
            )
        }
        .into_sql_result("SQLSetEnvAttr")
    }

    /// Reads a string environment attribute into `buf`, growing it if necessary.
    pub fn attribute_str(&self, attribute: i32, buf: &mut Vec<u8>) -> SqlResult<()> {
        fill_text(buf, |chunk| {
            let mut string_length: i32 = 0;
            unsafe {
                ffi::SQLGetEnvAttr(
                    self.handle,
                    attribute,
                    mut_buf_ptr(chunk) as Pointer,
                    clamp_int(chunk.len()),
                    &mut string_length,
                )
            }
            .into_sql_result("SQLGetEnvAttr")
            .on_success(|| string_length as isize)
        })
    }

    /// Allocate a new connection handle. The `Connection` must not outlive the `Environment`.
    pub fn allocate_connection(&self) -> SqlResult<Connection> {
        let mut handle = Handle::null();
        unsafe {
            SQLAllocHandle(HandleType::Dbc, self.as_handle(), &mut handle)
                .into_sql_result("SQLAllocHandle")
                .on_success(|| Connection::new(handle.as_hdbc()))
        }
    }

    /// Use together with [`Environment::drivers_buffer_fill`] to list drivers descriptions and
    /// driver attribute keywords.
    ///
    /// # Return
    ///
    /// `(driver description length, attribute length)` in bytes, excluding the terminating zero.
    /// `NoData` once the list is exhausted.
    ///
    /// See [SQLDrivers][1]
    ///
    /// [1]: https://docs.microsoft.com/sql/odbc/reference/syntax/sqldrivers-function
    pub fn drivers_buffer_len(&self, direction: FetchOrientation) -> SqlResult<(i16, i16)> {
        let mut length_description: i16 = 0;
        let mut length_attributes: i16 = 0;
        unsafe {
            SQLDrivers(
                self.handle,
                direction,
                null_mut(),
                0,
                &mut length_description,
                null_mut(),
                0,
                &mut length_attributes,
            )
        }
        .into_sql_result("SQLDrivers")
        .on_success(|| (length_description, length_attributes))
    }

    /// List drivers descriptions and driver attribute keywords. `buffer_attributes` is filled with
    /// a list of key value attributes. E.g.: `"key1=value1\0key2=value2\0\0"`.
    ///
    /// The entire capacity of the buffers is used. Use [`Environment::drivers_buffer_len`] to
    /// determine buffer lengths. Buffers are truncated to the length of the returned text.
    pub fn drivers_buffer_fill(
        &self,
        direction: FetchOrientation,
        buffer_description: &mut Vec<u8>,
        buffer_attributes: &mut Vec<u8>,
    ) -> SqlResult<()> {
        buffer_description.resize(buffer_description.capacity(), 0);
        buffer_attributes.resize(buffer_attributes.capacity(), 0);
        let mut length_description: i16 = 0;
        let mut length_attributes: i16 = 0;

        let result = unsafe {
            SQLDrivers(
                self.handle,
                direction,
                mut_buf_ptr(buffer_description),
                clamp_small_int(buffer_description.len()),
                &mut length_description,
                mut_buf_ptr(buffer_attributes),
                clamp_small_int(buffer_attributes.len()),
                &mut length_attributes,
            )
        }
        .into_sql_result("SQLDrivers");

        truncate_to(buffer_description, length_description);
        truncate_to(buffer_attributes, length_attributes);
        result
    }

    /// Use together with [`Environment::data_source_buffer_fill`] to list data source names and
    /// descriptions.
    ///
    /// # Return
    ///
    /// `(server name length, description length)` in bytes, excluding the terminating zero.
    pub fn data_source_buffer_len(&self, direction: FetchOrientation) -> SqlResult<(i16, i16)> {
        let mut length_name: i16 = 0;
        let mut length_description: i16 = 0;
        unsafe {
            SQLDataSources(
                self.handle,
                direction,
                null_mut(),
                0,
                &mut length_name,
                null_mut(),
                0,
                &mut length_description,
            )
        }
        .into_sql_result("SQLDataSources")
        .on_success(|| (length_name, length_description))
    }

    /// List data source names and descriptions (i.e. driver names). Use
    /// [`Environment::data_source_buffer_len`] to determine buffer lengths.
    pub fn data_source_buffer_fill(
        &self,
        direction: FetchOrientation,
        buffer_name: &mut Vec<u8>,
        buffer_description: &mut Vec<u8>,
    ) -> SqlResult<()> {
        buffer_name.resize(buffer_name.capacity(), 0);
        buffer_description.resize(buffer_description.capacity(), 0);
        let mut length_name: i16 = 0;
        let mut length_description: i16 = 0;

        let result = unsafe {
            SQLDataSources(
                self.handle,
                direction,
                mut_buf_ptr(buffer_name),
                clamp_small_int(buffer_name.len()),
                &mut length_name,
                mut_buf_ptr(buffer_description),
                clamp_small_int(buffer_description.len()),
                &mut length_description,
            )
        }
        .into_sql_result("SQLDataSources");

        truncate_to(buffer_name, length_name);
        truncate_to(buffer_description, length_description);
        result
    }
}

/// Cuts `buffer` to the text length reported by the driver manager, leaving out the terminating
/// zero. Lengths larger than the buffer indicate truncation and leave the buffer as is, minus the
/// terminating zero.
fn truncate_to(buffer: &mut Vec<u8>, reported: i16) {
    let len = usize::try_from(reported).unwrap_or(0);
    let len = len.min(buffer.len().saturating_sub(1));
    buffer.truncate(len);
}
