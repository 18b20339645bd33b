use super::{
    as_handle::{AsHandle, Free, free_as_handle},
    buffer::{clamp_int, clamp_small_int, fill_text, mut_buf_ptr, optional_text, text_ptr},
    column_description::ColumnDescription,
    diagnostics::Diagnostics,
    drop_handle, ffi,
    sql_result::{ExtSqlReturn, SqlResult},
};
use odbc_sys::{
    CDataType, FreeStmtOption, HStmt, Handle, HandleType, Len, ParamType, Pointer,
    SQLBindParameter, SQLCancel, SQLCloseCursor, SQLColumns, SQLDescribeCol, SQLExecDirect,
    SQLExecute, SQLFetch, SQLForeignKeys, SQLFreeStmt, SQLGetData, SQLMoreResults, SQLNumParams,
    SQLNumResultCols, SQLParamData, SQLPrepare, SQLPrimaryKeys, SQLPutData, SQLRowCount,
    SQLTables, SqlDataType, SqlReturn, ULen, };
use std::ptr::null_mut;

/// Everything `SQLBindParameter` needs to know about an input parameter.
///
/// The pointers must stay valid for as long as the parameter is bound, i.e. until the statement is
/// executed the last time, parameters are reset or the statement is freed.
#[derive(Debug, Clone, Copy)]
pub struct InputBinding {
    /// Type of the value in the application buffer.
    pub value_type: CDataType,
    /// Type of the parameter as sent to the data source.
    pub parameter_type: SqlDataType,
    pub column_size: ULen,
    pub decimal_digits: i16,
    /// Application buffer. For parameters supplied at execution time an application defined token
    /// which is handed back by `SQLParamData`.
    pub value: Pointer,
    pub buffer_length: Len,
    /// Length of the value, `NULL_DATA`, or an indicator for data supplied at execution time.
    pub indicator: *mut Len,
}

/// An ODBC statement handle. In this crate it is implemented by [`self::StatementImpl`]. The
/// trait exists so the state machine driving statements and cursors could also be exercised
/// against a scripted handle rather than a live driver.
pub trait Statement: Diagnostics + Free {
    /// Executes a preparable statement. This is the fastest way to submit an SQL statement for
    /// one-time execution.
    ///
    /// # Return
    ///
    /// `NoData` if a searched update or delete statement did not affect any rows at the data
    /// source. `NeedData` if parameters are supplied at execution time.
    fn exec_direct(&mut self, statement_text: &str) -> SqlResult<()>;

    /// Send an SQL statement to the data source for preparation. The application can include one
    /// or more parameter markers in the SQL statement. To include a parameter marker, the
    /// application embeds a question mark (?) into the SQL string at the appropriate position.
    fn prepare(&mut self, statement_text: &str) -> SqlResult<()>;

    /// Executes a statement prepared by `prepare`. Same return values as `exec_direct`.
    fn execute(&mut self) -> SqlResult<()>;

    /// Number of columns in result set. Can also be used to see whether executing a prepared
    /// Statement ([`Statement::execute`]) would yield a result set, as this would return `0` if
    /// it does not.
    fn num_result_cols(&self) -> SqlResult<i16>;

    /// Number of placeholders of a prepared query.
    fn num_params(&self) -> SqlResult<u16>;

    /// Fetch a column description using the column index.
    ///
    /// # Parameters
    ///
    /// * `column_number`: Column index. `0` is the bookmark column. The other column indices
    ///   start with `1`.
    /// * `column_description`: Holds the description of the column after the call. This method
    ///   does not provide strong exception safety as the value of this argument is undefined in
    ///   case of an error.
    fn describe_col(
        &self,
        column_number: u16,
        column_description: &mut ColumnDescription,
    ) -> SqlResult<()>;

    /// Number of rows affected by an `UPDATE`, `INSERT`, or `DELETE` statement.
    fn row_count(&self) -> SqlResult<isize>;

    /// Fetch the next row. `NoData` once the result set is consumed.
    fn fetch(&mut self) -> SqlResult<()>;

    /// Retrieves data for a single column in the current row. Variable sized values are
    /// retrieved in parts by calling this repeatedly. `indicator` receives the length of the
    /// remaining value, `NULL_DATA` or `NO_TOTAL`.
    fn get_data(
        &mut self,
        column_number: u16,
        target_type: CDataType,
        target: &mut [u8],
        indicator: &mut Len,
    ) -> SqlResult<()>;

    /// Move to the next result set. `NoData` if there is none.
    fn more_results(&mut self) -> SqlResult<()>;

    /// Close an open cursor.
    fn close_cursor(&mut self) -> SqlResult<()>;

    /// Discards all pending results, whether or not a cursor is open. `SQLFreeStmt` with
    /// `SQL_CLOSE`.
    fn discard_results(&mut self) -> SqlResult<()>;

    /// Cancels the processing of the statement, e.g. an execution waiting for parameter data.
    fn cancel(&mut self) -> SqlResult<()>;

    /// Release all column buffers bound by `bind_col`.
    fn unbind_cols(&mut self) -> SqlResult<()>;

    /// Release all parameter buffers bound to the statement.
    fn reset_parameters(&mut self) -> SqlResult<()>;

    /// Binds an input parameter to a parameter marker in an SQL statement.
    ///
    /// # Safety
    ///
    /// The pointers in `binding` must stay valid for as long as they are bound, see
    /// [`InputBinding`].
    unsafe fn bind_input_parameter(
        &mut self,
        parameter_number: u16,
        binding: &InputBinding,
    ) -> SqlResult<()>;

    /// Asks the driver which parameter it requires next. The returned value is the application
    /// defined token bound to that parameter. `None` once the statement is executed.
    fn param_data(&mut self) -> SqlResult<Option<Pointer>>;

    /// Sends part or all of the parameter the driver asked for via `param_data`.
    fn put_data(&mut self, data: &[u8]) -> SqlResult<()>;

    /// Sets an integer statement attribute identified by its raw attribute id.
    fn set_attribute_usize(&mut self, attribute: i32, value: usize) -> SqlResult<()>;

    /// Reads an integer statement attribute identified by its raw attribute id.
    fn attribute_usize(&self, attribute: i32) -> SqlResult<usize>;

    /// Sets a string statement attribute.
    fn set_attribute_str(&mut self, attribute: i32, value: &str) -> SqlResult<()>;

    /// Reads a string statement attribute into `buf`, growing it if necessary.
    fn attribute_str(&self, attribute: i32, buf: &mut Vec<u8>) -> SqlResult<()>;
}

/// Wraps a valid (i.e. successfully allocated) ODBC statement handle.
#[derive(Debug)]
pub struct StatementImpl {
    handle: HStmt,
}

unsafe impl AsHandle for StatementImpl {
    fn as_handle(&self) -> Handle {
        self.handle.as_handle()
    }

    fn handle_type(&self) -> HandleType {
        HandleType::Stmt
    }
}

impl Drop for StatementImpl {
    fn drop(&mut self) {
        unsafe {
            drop_handle(self.handle.as_handle(), HandleType::Stmt);
        }
    }
}

impl Free for StatementImpl {
    unsafe fn free(&mut self) -> SqlResult<()> {
        unsafe { free_as_handle(self) }
    }
}

impl StatementImpl {
    /// # Safety
    ///
    /// `handle` must be a valid (successfully allocated) statement handle.
    pub unsafe fn new(handle: HStmt) -> Self {
        Self { handle }
    }

    /// List tables, catalogs, schemas or table types. `None` does not filter on that argument.
    pub fn tables(
        &mut self,
        catalog_name: Option<&str>,
        schema_name: Option<&str>,
        table_name: Option<&str>,
        table_type: Option<&str>,
    ) -> SqlResult<()> {
        let (catalog, catalog_len) = optional_text(catalog_name);
        let (schema, schema_len) = optional_text(schema_name);
        let (table, table_len) = optional_text(table_name);
        let (types, types_len) = optional_text(table_type);
        unsafe {
            SQLTables(
                self.handle,
                catalog,
                catalog_len,
                schema,
                schema_len,
                table,
                table_len,
                types,
                types_len,
            )
        }
        .into_sql_result("SQLTables")
    }

    /// Column details of the tables matching the arguments.
    pub fn columns(
        &mut self,
        catalog_name: Option<&str>,
        schema_name: Option<&str>,
        table_name: Option<&str>,
        column_name: Option<&str>,
    ) -> SqlResult<()> {
        let (catalog, catalog_len) = optional_text(catalog_name);
        let (schema, schema_len) = optional_text(schema_name);
        let (table, table_len) = optional_text(table_name);
        let (column, column_len) = optional_text(column_name);
        unsafe {
            SQLColumns(
                self.handle,
                catalog,
                catalog_len,
                schema,
                schema_len,
                table,
                table_len,
                column,
                column_len,
            )
        }
        .into_sql_result("SQLColumns")
    }

    /// Statistics and indices of a single table. `unique` restricts the result to unique
    /// indices, `quick` allows the driver to report cardinality and pages only if readily
    /// available.
    pub fn statistics(
        &mut self,
        catalog_name: Option<&str>,
        schema_name: Option<&str>,
        table_name: Option<&str>,
        unique: bool,
        quick: bool,
    ) -> SqlResult<()> {
        // SQL_INDEX_UNIQUE = 0, SQL_INDEX_ALL = 1, SQL_QUICK = 0, SQL_ENSURE = 1
        let unique = if unique { 0 } else { 1 };
        let reserved = if quick { 0 } else { 1 };
        let (catalog, catalog_len) = optional_text(catalog_name);
        let (schema, schema_len) = optional_text(schema_name);
        let (table, table_len) = optional_text(table_name);
        unsafe {
            ffi::SQLStatistics(
                self.handle,
                catalog,
                catalog_len,
                schema,
                schema_len,
                table,
                table_len,
                unique,
                reserved,
            )
        }
        .into_sql_result("SQLStatistics")
    }

    /// Privileges associated with the tables matching the arguments.
    pub fn table_privileges(
        &mut self,
        catalog_name: Option<&str>,
        schema_name: Option<&str>,
        table_name: Option<&str>,
    ) -> SqlResult<()> {
        let (catalog, catalog_len) = optional_text(catalog_name);
        let (schema, schema_len) = optional_text(schema_name);
        let (table, table_len) = optional_text(table_name);
        unsafe {
            ffi::SQLTablePrivileges(
                self.handle,
                catalog,
                catalog_len,
                schema,
                schema_len,
                table,
                table_len,
            )
        }
        .into_sql_result("SQLTablePrivileges")
    }

    /// Privileges associated with the columns of a single table.
    pub fn column_privileges(
        &mut self,
        catalog_name: Option<&str>,
        schema_name: Option<&str>,
        table_name: Option<&str>,
        column_name: Option<&str>,
    ) -> SqlResult<()> {
        let (catalog, catalog_len) = optional_text(catalog_name);
        let (schema, schema_len) = optional_text(schema_name);
        let (table, table_len) = optional_text(table_name);
        let (column, column_len) = optional_text(column_name);
        unsafe {
            ffi::SQLColumnPrivileges(
                self.handle,
                catalog,
                catalog_len,
                schema,
                schema_len,
                table,
                table_len,
                column,
                column_len,
            )
        }
        .into_sql_result("SQLColumnPrivileges")
    }

    /// Column names making up the primary key of a table.
    pub fn primary_keys(
        &mut self,
        catalog_name: Option<&str>,
        schema_name: Option<&str>,
        table_name: Option<&str>,
    ) -> SqlResult<()> {
        let (catalog, catalog_len) = optional_text(catalog_name);
        let (schema, schema_len) = optional_text(schema_name);
        let (table, table_len) = optional_text(table_name);
        unsafe {
            SQLPrimaryKeys(
                self.handle,
                catalog,
                catalog_len,
                schema,
                schema_len,
                table,
                table_len,
            )
        }
        .into_sql_result("SQLPrimaryKeys")
    }

    /// Foreign keys of the foreign table referencing the primary key of the primary table.
    #[allow(clippy::too_many_arguments)]
    pub fn foreign_keys(
        &mut self,
        pk_catalog_name: Option<&str>,
        pk_schema_name: Option<&str>,
        pk_table_name: Option<&str>,
        fk_catalog_name: Option<&str>,
        fk_schema_name: Option<&str>,
        fk_table_name: Option<&str>,
    ) -> SqlResult<()> {
        let (pk_catalog, pk_catalog_len) = optional_text(pk_catalog_name);
        let (pk_schema, pk_schema_len) = optional_text(pk_schema_name);
        let (pk_table, pk_table_len) = optional_text(pk_table_name);
        let (fk_catalog, fk_catalog_len) = optional_text(fk_catalog_name);
        let (fk_schema, fk_schema_len) = optional_text(fk_schema_name);
        let (fk_table, fk_table_len) = optional_text(fk_table_name);
        unsafe {
            SQLForeignKeys(
                self.handle,
                pk_catalog,
                pk_catalog_len,
                pk_schema,
                pk_schema_len,
                pk_table,
                pk_table_len,
                fk_catalog,
                fk_catalog_len,
                fk_schema,
                fk_schema_len,
                fk_table,
                fk_table_len,
            )
        }
        .into_sql_result("SQLForeignKeys")
    }

    /// Procedure names stored in the data source.
    pub fn procedures(
        &mut self,
        catalog_name: Option<&str>,
        schema_name: Option<&str>,
        procedure_name: Option<&str>,
    ) -> SqlResult<()> {
        let (catalog, catalog_len) = optional_text(catalog_name);
        let (schema, schema_len) = optional_text(schema_name);
        let (procedure, procedure_len) = optional_text(procedure_name);
        unsafe {
            ffi::SQLProcedures(
                self.handle,
                catalog,
                catalog_len,
                schema,
                schema_len,
                procedure,
                procedure_len,
            )
        }
        .into_sql_result("SQLProcedures")
    }

    /// Input and output parameters and result columns of procedures.
    pub fn procedure_columns(
        &mut self,
        catalog_name: Option<&str>,
        schema_name: Option<&str>,
        procedure_name: Option<&str>,
        column_name: Option<&str>,
    ) -> SqlResult<()> {
        let (catalog, catalog_len) = optional_text(catalog_name);
        let (schema, schema_len) = optional_text(schema_name);
        let (procedure, procedure_len) = optional_text(procedure_name);
        let (column, column_len) = optional_text(column_name);
        unsafe {
            ffi::SQLProcedureColumns(
                self.handle,
                catalog,
                catalog_len,
                schema,
                schema_len,
                procedure,
                procedure_len,
                column,
                column_len,
            )
        }
        .into_sql_result("SQLProcedureColumns")
    }

    /// Optimal set of columns identifying a row, or columns updated automatically.
    /// `identifier_type`, `scope` and `nullable` are passed through as raw ODBC values.
    pub fn special_columns(
        &mut self,
        identifier_type: u16,
        catalog_name: Option<&str>,
        schema_name: Option<&str>,
        table_name: Option<&str>,
        scope: u16,
        nullable: u16,
    ) -> SqlResult<()> {
        let (catalog, catalog_len) = optional_text(catalog_name);
        let (schema, schema_len) = optional_text(schema_name);
        let (table, table_len) = optional_text(table_name);
        unsafe {
            ffi::SQLSpecialColumns(
                self.handle,
                identifier_type,
                catalog,
                catalog_len,
                schema,
                schema_len,
                table,
                table_len,
                scope,
                nullable,
            )
        }
        .into_sql_result("SQLSpecialColumns")
    }

    /// Information about the data types supported by the data source. `data_type` is the raw
    /// `SQL_*` type code, `0` (`SQL_ALL_TYPES`) lists all of them.
    pub fn type_info(&mut self, data_type: i16) -> SqlResult<()> {
        unsafe { ffi::SQLGetTypeInfo(self.handle, data_type) }.into_sql_result("SQLGetTypeInfo")
    }
}

impl Statement for StatementImpl {
    fn exec_direct(&mut self, statement_text: &str) -> SqlResult<()> {
        unsafe {
            SQLExecDirect(
                self.handle,
                text_ptr(statement_text),
                clamp_int(statement_text.len()),
            )
        }
        .into_sql_result("SQLExecDirect")
    }

    fn prepare(&mut self, statement_text: &str) -> SqlResult<()> {
        unsafe {
            SQLPrepare(
                self.handle,
                text_ptr(statement_text),
                clamp_int(statement_text.len()),
            )
        }
        .into_sql_result("SQLPrepare")
    }

    fn execute(&mut self) -> SqlResult<()> {
        unsafe { SQLExecute(self.handle) }.into_sql_result("SQLExecute")
    }

    fn num_result_cols(&self) -> SqlResult<i16> {
        let mut out: i16 = 0;
        unsafe { SQLNumResultCols(self.handle, &mut out) }
            .into_sql_result("SQLNumResultCols")
            .on_success(|| out)
    }

    fn num_params(&self) -> SqlResult<u16> {
        let mut out: i16 = 0;
        unsafe { SQLNumParams(self.handle, &mut out) }
            .into_sql_result("SQLNumParams")
            .on_success(|| out.try_into().unwrap_or(0))
    }

    fn describe_col(
        &self,
        column_number: u16,
        column_description: &mut ColumnDescription,
    ) -> SqlResult<()> {
        let ColumnDescription {
            name,
            data_type,
            column_size,
            decimal_digits,
        } = column_description;
        // Use maximum available capacity.
        name.resize(name.capacity().max(1), 0);
        let mut name_length: i16 = 0;

        let mut describe = |name: &mut Vec<u8>, name_length: &mut i16| unsafe {
            SQLDescribeCol(
                self.handle,
                column_number,
                mut_buf_ptr(name),
                clamp_small_int(name.len()),
                name_length,
                data_type,
                column_size,
                decimal_digits,
                null_mut(),
            )
            .into_sql_result("SQLDescribeCol")
        };

        let mut result = describe(name, &mut name_length);
        if result.is_err() {
            return result;
        }
        // Name did not fit into the buffer. Resize (+1 for terminating zero) and try again.
        if name_length as usize >= name.len() {
            name.resize(name_length as usize + 1, 0);
            result = describe(name, &mut name_length);
        }
        let name_length = usize::try_from(name_length).unwrap_or(0);
        name.truncate(name_length.min(name.len().saturating_sub(1)));
        result
    }

    fn row_count(&self) -> SqlResult<isize> {
        let mut ret: Len = 0;
        unsafe { SQLRowCount(self.handle, &mut ret) }
            .into_sql_result("SQLRowCount")
            .on_success(|| ret)
    }

    fn fetch(&mut self) -> SqlResult<()> {
        unsafe { SQLFetch(self.handle) }.into_sql_result("SQLFetch")
    }

    fn get_data(
        &mut self,
        column_number: u16,
        target_type: CDataType,
        target: &mut [u8],
        indicator: &mut Len,
    ) -> SqlResult<()> {
        unsafe {
            SQLGetData(
                self.handle,
                column_number,
                target_type,
                mut_buf_ptr(target) as Pointer,
                target.len().try_into().unwrap_or(Len::MAX),
                indicator,
            )
        }
        .into_sql_result("SQLGetData")
    }

    fn more_results(&mut self) -> SqlResult<()> {
        unsafe { SQLMoreResults(self.handle) }.into_sql_result("SQLMoreResults")
    }

    fn close_cursor(&mut self) -> SqlResult<()> {
        unsafe { SQLCloseCursor(self.handle) }.into_sql_result("SQLCloseCursor")
    }

    fn discard_results(&mut self) -> SqlResult<()> {
        unsafe { SQLFreeStmt(self.handle, FreeStmtOption::Close) }.into_sql_result("SQLFreeStmt")
    }

    fn cancel(&mut self) -> SqlResult<()> {
        unsafe { SQLCancel(self.handle) }.into_sql_result("SQLCancel")
    }

    fn unbind_cols(&mut self) -> SqlResult<()> {
        unsafe { SQLFreeStmt(self.handle, FreeStmtOption::Unbind) }.into_sql_result("SQLFreeStmt")
    }

    fn reset_parameters(&mut self) -> SqlResult<()> {
        unsafe { SQLFreeStmt(self.handle, FreeStmtOption::ResetParams) }
            .into_sql_result("SQLFreeStmt")
    }

    unsafe fn bind_input_parameter(
        &mut self,
        parameter_number: u16,
        binding: &InputBinding,
    ) -> SqlResult<()> {
        unsafe {
            SQLBindParameter(
                self.handle,
                parameter_number,
                ParamType::Input,
                binding.value_type,
                binding.parameter_type,
                binding.column_size,
                binding.decimal_digits,
                binding.value,
                binding.buffer_length,
                binding.indicator,
            )
        }
        .into_sql_result("SQLBindParameter")
    }

    fn param_data(&mut self) -> SqlResult<Option<Pointer>> {
        let mut param_id: Pointer = null_mut();
        // `SQL_NO_DATA` ends an execution which affected no rows and is passed on.
        // `SQL_PARAM_DATA_AVAILABLE` requires streamed output parameters, which are never bound.
        match unsafe { SQLParamData(self.handle, &mut param_id as *mut Pointer) } {
            SqlReturn::NEED_DATA => SqlResult::Success(Some(param_id)),
            other => other.into_sql_result("SQLParamData").on_success(|| None),
        }
    }

    fn put_data(&mut self, data: &[u8]) -> SqlResult<()> {
        unsafe {
            SQLPutData(
                self.handle,
                data.as_ptr() as Pointer,
                data.len().try_into().unwrap_or(Len::MAX),
            )
        }
        .into_sql_result("SQLPutData")
    }

    fn set_attribute_usize(&mut self, attribute: i32, value: usize) -> SqlResult<()> {
        unsafe { ffi::SQLSetStmtAttr(self.handle, attribute, value as Pointer, 0) }
            .into_sql_result("SQLSetStmtAttr")
    }

    fn attribute_usize(&self, attribute: i32) -> SqlResult<usize> {
        let mut value: usize = 0;
        unsafe {
            ffi::SQLGetStmtAttr(
                self.handle,
                attribute,
                &mut value as *mut usize as Pointer,
                0,
                null_mut(),
            )
        }
        .into_sql_result("SQLGetStmtAttr")
        .on_success(|| value)
    }

    fn set_attribute_str(&mut self, attribute: i32, value: &str) -> SqlResult<()> {
        unsafe {
            ffi::SQLSetStmtAttr(
                self.handle,
                attribute,
                value.as_ptr() as Pointer,
                clamp_int(value.len()),
            )
        }
        .into_sql_result("SQLSetStmtAttr")
    }

    fn attribute_str(&self, attribute: i32, buf: &mut Vec<u8>) -> SqlResult<()> {
        fill_text(buf, |chunk| {
            let mut string_length: i32 = 0;
            unsafe {
                ffi::SQLGetStmtAttr(
                    self.handle,
                    attribute,
                    mut_buf_ptr(chunk) as Pointer,
                    clamp_int(chunk.len()),
                    &mut string_length,
                )
            }
            .into_sql_result("SQLGetStmtAttr")
            .on_success(|| string_length as isize)
        })
    }
}
