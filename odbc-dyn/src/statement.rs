use std::{fmt, rc::Rc};

use log::{debug, warn};
use odbc_sys::{CDataType, Pointer, SqlDataType};

use crate::{
    Error, Value, ValueKind,
    attributes::{
        NOSCAN_OFF, NOSCAN_ON, STMT_MAX_LENGTH, STMT_MAX_ROWS, STMT_NOSCAN, STMT_QUERY_TIMEOUT,
    },
    column_info::ColumnInfo,
    cursor::{close_results, CursorState, FetchMode, Row},
    error::Teardown,
    execute::DataAtExecution,
    handles::{self, InputBinding, SqlResult, Statement as _, StatementImpl},
    lifecycle::{Parent, free_handle},
    parameter::{CallbackError, ParameterSlot, ParameterSlots},
};

/// Outcome of executing a statement.
#[derive(Debug)]
pub enum Execution<C> {
    /// The statement produced a result set, which can be fetched from `C`.
    ResultSet(C),
    /// Number of rows affected by the statement. `-1` if the driver does not know.
    RowCount(isize),
}

impl<C> Execution<C> {
    pub fn row_count(&self) -> Option<isize> {
        match self {
            Execution::RowCount(count) => Some(*count),
            Execution::ResultSet(_) => None,
        }
    }

    pub fn into_result_set(self) -> Option<C> {
        match self {
            Execution::ResultSet(cursor) => Some(cursor),
            Execution::RowCount(_) => None,
        }
    }
}

/// A statement handle which can be prepared, bound and executed repeatedly. Its result sets are
/// fetched from the statement itself.
///
/// The statement holds on to the connection it has been allocated on, and counts as one of its
/// children until it is destroyed.
pub struct Statement<S: handles::Statement = StatementImpl> {
    cursor: CursorState<S>,
    parent: Rc<dyn Parent>,
    prepared: bool,
    /// Number of placeholders reported by the driver. `None` if unknown.
    num_params: Option<u16>,
    slots: ParameterSlots,
    /// Zero based index of the current result set.
    result_set_number: usize,
}

impl<S> fmt::Debug for Statement<S>
where
    S: handles::Statement,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Statement")
            .field("cursor", &self.cursor)
            .field("prepared", &self.prepared)
            .field("num_params", &self.num_params)
            .field("slots", &self.slots)
            .field("result_set_number", &self.result_set_number)
            .finish_non_exhaustive()
    }
}

impl<S> Statement<S>
where
    S: handles::Statement,
{
    pub(crate) fn new(handle: S, parent: Rc<dyn Parent>) -> Self {
        parent.children().register();
        Self {
            cursor: CursorState::new(handle, ColumnInfo::default(), false, false),
            parent,
            prepared: false,
            num_params: None,
            slots: ParameterSlots::default(),
            result_set_number: 0,
        }
    }

    fn ensure_alive(&self) -> Result<(), Error> {
        if self.cursor.handle.is_some() {
            Ok(())
        } else {
            Err(Error::StatementDestroyed)
        }
    }

    /// Prepares `sql` for repeated execution. Column information and, if the driver implements
    /// `SQLNumParams`, the number of placeholders are known afterwards. Previously bound
    /// parameters are unbound, yet their slots and buffers are kept.
    pub fn prepare(&mut self, sql: &str) -> Result<(), Error> {
        self.ensure_alive()?;
        if self.cursor.has_rows() {
            return Err(Error::CursorAlreadyOpen);
        }
        self.cursor.close_cursor()?;
        self.clear_info();
        let stmt = self
            .cursor
            .handle
            .as_mut()
            .ok_or(Error::StatementDestroyed)?;
        stmt.prepare(sql).into_result(&*stmt)?;
        self.prepared = true;
        self.cursor.columns = ColumnInfo::describe(&*stmt)?;

        if self.parent.supports_num_params() {
            match stmt.num_params() {
                SqlResult::Success(num_params) | SqlResult::SuccessWithInfo(num_params) => {
                    self.num_params = Some(num_params);
                    if num_params > 0 {
                        if let Err(error) = self.slots.ensure_nth(num_params) {
                            self.clear_info();
                            return Err(error);
                        }
                    }
                }
                // Number of parameters stays unknown. Slots are created on demand by binding.
                _ => debug!("SQLNumParams failed. Number of parameters is unknown."),
            }
        }
        Ok(())
    }

    /// Executes the prepared statement.
    pub fn execute(&mut self) -> Result<Execution<&mut Self>, Error> {
        self.execute_impl(None)
    }

    /// Executes `sql` directly, unless the statement is prepared, in which case the prepared
    /// statement is executed and `sql` is ignored.
    pub fn execute_direct(&mut self, sql: &str) -> Result<Execution<&mut Self>, Error> {
        self.execute_impl(Some(sql))
    }

    fn execute_impl(&mut self, sql: Option<&str>) -> Result<Execution<&mut Self>, Error> {
        match self.run(sql)? {
            Some(row_count) => Ok(Execution::RowCount(row_count)),
            None => Ok(Execution::ResultSet(self)),
        }
    }

    /// Row count, or `None` if the execution produced a result set.
    fn run(&mut self, sql: Option<&str>) -> Result<Option<isize>, Error> {
        let Self {
            cursor,
            parent,
            prepared,
            slots,
            result_set_number,
            ..
        } = self;
        if cursor.has_rows() {
            return Err(Error::CursorAlreadyOpen);
        }
        // Pending results after a result set without columns.
        cursor.close_cursor()?;
        let stmt = cursor.handle.as_mut().ok_or(Error::StatementDestroyed)?;

        let result = if *prepared {
            let result = stmt.execute();
            // Column information still describes a later result set of the last execution.
            if *result_set_number != 0 {
                cursor.columns.clear();
                *result_set_number = 0;
            }
            result
        } else {
            let sql = sql.ok_or(Error::NotPrepared)?;
            cursor.columns.clear();
            stmt.exec_direct(sql)
        };

        let no_data = match result {
            SqlResult::NeedData => DataAtExecution::new(stmt, slots).run()?,
            SqlResult::NoData => true,
            other => {
                other.into_result(&*stmt)?;
                false
            }
        };

        if cursor.columns.is_empty() {
            cursor.columns = ColumnInfo::describe(&*stmt)?;
        }
        if !cursor.columns.is_empty() {
            cursor.open = true;
            return Ok(None);
        }
        // ODBC 3 drivers report that a searched update or delete affected no rows with
        // `SQL_NO_DATA`. ODBC 2 drivers still expect `SQLRowCount` to be called.
        if no_data && parent.odbc_version().is_odbc3() {
            return Ok(Some(0));
        }
        let row_count = stmt.row_count().into_result(&*stmt)?;
        Ok(Some(row_count))
    }

    /// Advances to the next result set. `false` if there is none.
    pub fn more_results(&mut self) -> Result<bool, Error> {
        self.ensure_alive()?;
        let advanced = self.cursor.more_results()?;
        if advanced {
            self.result_set_number += 1;
        }
        Ok(advanced)
    }

    /// Unbinds all parameters and forgets about the prepared statement, closing the cursor first
    /// if it is open. Parameter slots, and therefore their buffers, are kept for reuse.
    pub fn reset(&mut self) -> Result<(), Error> {
        self.ensure_alive()?;
        if self.cursor.open {
            self.cursor.close_cursor()?;
        }
        self.clear_info();
        Ok(())
    }

    /// Forgets the column information, so it is described anew after the next execution.
    pub fn reset_column_info(&mut self) -> Result<(), Error> {
        self.ensure_alive()?;
        self.cursor.columns.clear();
        Ok(())
    }

    /// Driver errors are logged rather than reported, the statement is usable afterwards in
    /// either case.
    fn clear_info(&mut self) {
        if let Some(stmt) = self.cursor.handle.as_mut() {
            if let Err(error) = stmt.reset_parameters().into_result(&*stmt) {
                warn!("Error resetting parameters: {error}");
            }
            if !self.cursor.columns.is_empty() {
                if let Err(error) = stmt.unbind_cols().into_result(&*stmt) {
                    warn!("Error unbinding columns: {error}");
                }
            }
        }
        self.slots.clear_callbacks();
        self.num_params = None;
        self.prepared = false;
        self.result_set_number = 0;
        self.cursor.columns.clear();
    }

    /// Closes the cursor if it is open, frees the handle and releases all parameter buffers.
    /// Calling this on a destroyed statement does nothing. Failures of the individual steps are
    /// reported together, the statement is destroyed in any case.
    pub fn destroy(&mut self) -> Result<(), Error> {
        let Some(mut handle) = self.cursor.handle.take() else {
            return Ok(());
        };
        let mut teardown = Teardown::default();
        if self.cursor.open {
            self.cursor.open = false;
            teardown.step(close_results(&mut handle, !self.cursor.columns.is_empty()));
        }
        teardown.step(free_handle(handle));
        self.parent.children().release();
        self.slots.clear();
        self.cursor.columns.clear();
        self.prepared = false;
        self.num_params = None;
        debug!("Statement destroyed.");
        teardown.finish(())
    }

    pub fn is_destroyed(&self) -> bool {
        self.cursor.handle.is_none()
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    /// `true` while results of the last execution are pending, even if the current result set
    /// has no columns.
    pub fn is_open(&self) -> bool {
        self.cursor.open
    }

    /// Number of placeholders of the prepared statement. `None` if the statement is not prepared
    /// or the driver can not tell.
    pub fn parameter_count(&self) -> Option<u16> {
        self.num_params
    }

    pub fn column_names(&self) -> &[String] {
        self.cursor.columns.names()
    }

    pub fn column_kinds(&self) -> &[ValueKind] {
        self.cursor.columns.kinds()
    }

    /// `false` by default for statements.
    pub fn autoclose(&self) -> bool {
        self.cursor.autoclose
    }

    pub fn set_autoclose(&mut self, autoclose: bool) {
        self.cursor.autoclose = autoclose;
    }

    /// Values of the next row in column order. `None` once the result set is consumed.
    pub fn fetch(&mut self) -> Result<Option<Vec<Value>>, Error> {
        let mut row = Row::new();
        Ok(self
            .fetch_into(&mut row, FetchMode::Positional)?
            .then(|| row.into_values()))
    }

    pub fn fetch_into(&mut self, row: &mut Row, mode: FetchMode) -> Result<bool, Error> {
        self.ensure_alive()?;
        let has_row = self.cursor.fetch_into(row, mode)?;
        if !has_row && self.cursor.autoclose {
            self.close()?;
        }
        Ok(has_row)
    }

    /// Invokes `f` for every remaining row, see [`crate::Cursor::for_each`]. Closing only closes
    /// the cursor, the statement can be executed again.
    pub fn for_each<B, E, F>(&mut self, mode: FetchMode, autoclose: bool, f: F) -> Result<Option<B>, E>
    where
        E: From<Error>,
        F: FnMut(&Row) -> Result<Option<B>, E>,
    {
        self.ensure_alive()?;
        let result = self.cursor.for_each(mode, f);
        if !autoclose {
            return result;
        }
        let closed = self.close();
        match (result, closed) {
            (Ok(value), Ok(_)) => Ok(value),
            (Ok(_), Err(error)) => Err(error.into()),
            (Err(error), closed) => {
                if let Err(close_error) = closed {
                    warn!("Error closing cursor after iteration failed: {close_error}");
                }
                Err(error)
            }
        }
    }

    /// Closes the cursor of the current result set. `false` if it is not open.
    pub fn close(&mut self) -> Result<bool, Error> {
        self.ensure_alive()?;
        self.cursor.close_cursor()
    }

    /// Checks the one based parameter `index` and returns its slot, creating it if the number of
    /// parameters is unknown.
    fn slot(&mut self, index: u16) -> Result<&mut ParameterSlot, Error> {
        self.ensure_alive()?;
        if index == 0 || self.num_params.is_some_and(|num_params| index > num_params) {
            return Err(Error::InvalidParameterIndex { index });
        }
        self.slots.ensure_nth(index)
    }

    /// Configures the slot of the parameter and binds it to the statement. Any callback of the
    /// slot is dropped. If anything fails the slot is restored to its previous binding, which the
    /// driver still refers to.
    fn bind_slot(
        &mut self,
        index: u16,
        configure: impl FnOnce(&mut ParameterSlot) -> Result<InputBinding, Error>,
    ) -> Result<(), Error> {
        self.slot(index)?;
        let Self { cursor, slots, .. } = self;
        let stmt = cursor.handle.as_mut().ok_or(Error::StatementDestroyed)?;
        let slot = slots
            .nth_mut(usize::from(index))
            .ok_or(Error::InvalidParameterIndex { index })?;
        let snapshot = slot.snapshot();
        let result = configure(&mut *slot).and_then(|binding| {
            // Safety: `binding` points into a boxed slot owned by `self`. Slots are only released
            // after the handle has been freed, and any change to a slot is followed by binding it
            // again or restoring it.
            unsafe { stmt.bind_input_parameter(index, &binding) }.into_result(&*stmt)
        });
        match result {
            Ok(()) => {
                slot.release_retired();
                Ok(())
            }
            Err(error) => {
                slot.restore(snapshot);
                Err(error)
            }
        }
    }

    /// Binds `value` as the type the parameter is currently bound as. Parameters which have not
    /// been bound yet are bound as text. `Value::Null` binds `NULL`.
    pub fn bind(&mut self, index: u16, value: &Value) -> Result<(), Error> {
        if value.is_null() {
            return self.bind_null(index);
        }
        match self.slot(index)?.kind() {
            ValueKind::Number => self.bind_number(index, value.to_number()?),
            ValueKind::Boolean => self.bind_bool(index, value.to_bool()?),
            ValueKind::Text => {
                let bytes = value.to_bytes(ValueKind::Text)?;
                self.bind_text_bytes(index, &bytes)
            }
            ValueKind::Binary => self.bind_binary(index, &value.to_bytes(ValueKind::Binary)?),
        }
    }

    pub fn bind_number(&mut self, index: u16, number: f64) -> Result<(), Error> {
        self.bind_slot(index, |slot| {
            slot.set_type(SqlDataType::DOUBLE, 0, 0, 0)?;
            slot.set_number(number);
            Ok(slot.binding(CDataType::Double))
        })
    }

    pub fn bind_bool(&mut self, index: u16, boolean: bool) -> Result<(), Error> {
        self.bind_slot(index, |slot| {
            slot.set_type(SqlDataType::EXT_BIT, 0, 0, 0)?;
            slot.set_bool(boolean);
            Ok(slot.binding(CDataType::Bit))
        })
    }

    pub fn bind_str(&mut self, index: u16, text: &str) -> Result<(), Error> {
        self.bind_text_bytes(index, text.as_bytes())
    }

    fn bind_text_bytes(&mut self, index: u16, text: &[u8]) -> Result<(), Error> {
        self.bind_slot(index, |slot| {
            slot.set_type(SqlDataType::CHAR, text.len().max(1), 0, text.len() + 1)?;
            slot.set_bytes(text, true);
            Ok(slot.binding(CDataType::Char))
        })
    }

    pub fn bind_binary(&mut self, index: u16, bytes: &[u8]) -> Result<(), Error> {
        self.bind_slot(index, |slot| {
            let len = bytes.len().max(1);
            slot.set_type(SqlDataType::EXT_BINARY, len, 0, len)?;
            slot.set_bytes(bytes, false);
            Ok(slot.binding(CDataType::Binary))
        })
    }

    /// Binds `NULL` without changing the type of the parameter.
    pub fn bind_null(&mut self, index: u16) -> Result<(), Error> {
        self.bind_slot(index, |slot| {
            slot.set_null();
            Ok(slot.indicator_binding())
        })
    }

    /// Lets a procedure use the default value of the parameter.
    pub fn bind_default(&mut self, index: u16) -> Result<(), Error> {
        self.bind_slot(index, |slot| {
            slot.set_default();
            Ok(slot.indicator_binding())
        })
    }

    /// Supplies the parameter at execution time by invoking `callback` once.
    pub fn bind_number_at_exec(
        &mut self,
        index: u16,
        callback: impl FnMut(Option<usize>) -> Result<Value, CallbackError> + 'static,
    ) -> Result<(), Error> {
        self.bind_at_exec(index, SqlDataType::DOUBLE, CDataType::Double, 0, callback)
    }

    /// Supplies the parameter at execution time by invoking `callback` once.
    pub fn bind_bool_at_exec(
        &mut self,
        index: u16,
        callback: impl FnMut(Option<usize>) -> Result<Value, CallbackError> + 'static,
    ) -> Result<(), Error> {
        self.bind_at_exec(index, SqlDataType::EXT_BIT, CDataType::Bit, 0, callback)
    }

    /// Streams text to the driver at execution time. With a declared `length` of `N > 0` bytes
    /// the callback is invoked with the number of bytes still expected, until `N` bytes have been
    /// sent. Any excess is cut off. With a `length` of `0` the callback is invoked with `None`.
    /// Either way an empty value or `NULL` ends the stream.
    pub fn bind_str_at_exec(
        &mut self,
        index: u16,
        length: usize,
        callback: impl FnMut(Option<usize>) -> Result<Value, CallbackError> + 'static,
    ) -> Result<(), Error> {
        self.bind_at_exec(index, SqlDataType::CHAR, CDataType::Char, length, callback)
    }

    /// Streams binary data to the driver at execution time, see [`Self::bind_str_at_exec`].
    pub fn bind_binary_at_exec(
        &mut self,
        index: u16,
        length: usize,
        callback: impl FnMut(Option<usize>) -> Result<Value, CallbackError> + 'static,
    ) -> Result<(), Error> {
        self.bind_at_exec(
            index,
            SqlDataType::EXT_BINARY,
            CDataType::Binary,
            length,
            callback,
        )
    }

    fn bind_at_exec(
        &mut self,
        index: u16,
        sql_type: SqlDataType,
        value_type: CDataType,
        length: usize,
        callback: impl FnMut(Option<usize>) -> Result<Value, CallbackError> + 'static,
    ) -> Result<(), Error> {
        self.bind_slot(index, |slot| {
            slot.set_type(sql_type, length, 0, 0)?;
            slot.set_deferred(length, Box::new(callback));
            // The driver hands the parameter number back to us, once it asks for the value.
            let token = usize::from(index) as Pointer;
            Ok(slot.deferred_binding(value_type, token))
        })
    }

    pub fn set_attribute_usize(&mut self, attribute: i32, value: usize) -> Result<(), Error> {
        let stmt = self
            .cursor
            .handle
            .as_mut()
            .ok_or(Error::StatementDestroyed)?;
        stmt.set_attribute_usize(attribute, value)
            .into_result(&*stmt)
    }

    pub fn attribute_usize(&self, attribute: i32) -> Result<usize, Error> {
        let stmt = self
            .cursor
            .handle
            .as_ref()
            .ok_or(Error::StatementDestroyed)?;
        stmt.attribute_usize(attribute).into_result(stmt)
    }

    pub fn set_attribute_str(&mut self, attribute: i32, value: &str) -> Result<(), Error> {
        let stmt = self
            .cursor
            .handle
            .as_mut()
            .ok_or(Error::StatementDestroyed)?;
        stmt.set_attribute_str(attribute, value).into_result(&*stmt)
    }

    pub fn attribute_str(&self, attribute: i32) -> Result<String, Error> {
        let stmt = self
            .cursor
            .handle
            .as_ref()
            .ok_or(Error::StatementDestroyed)?;
        let mut buf = Vec::new();
        stmt.attribute_str(attribute, &mut buf).into_result(stmt)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Seconds to wait for a statement to execute. `0` means no timeout.
    pub fn query_timeout(&self) -> Result<usize, Error> {
        self.attribute_usize(STMT_QUERY_TIMEOUT)
    }

    pub fn set_query_timeout(&mut self, seconds: usize) -> Result<(), Error> {
        self.set_attribute_usize(STMT_QUERY_TIMEOUT, seconds)
    }

    /// Maximum number of rows returned for a query. `0` means all rows.
    pub fn max_rows(&self) -> Result<usize, Error> {
        self.attribute_usize(STMT_MAX_ROWS)
    }

    pub fn set_max_rows(&mut self, max_rows: usize) -> Result<(), Error> {
        self.set_attribute_usize(STMT_MAX_ROWS, max_rows)
    }

    /// Maximum number of bytes returned for a character or binary column. `0` means no limit.
    pub fn max_field_size(&self) -> Result<usize, Error> {
        self.attribute_usize(STMT_MAX_LENGTH)
    }

    pub fn set_max_field_size(&mut self, max_field_size: usize) -> Result<(), Error> {
        self.set_attribute_usize(STMT_MAX_LENGTH, max_field_size)
    }

    /// `true` if the driver scans SQL strings for escape sequences.
    pub fn escape_processing(&self) -> Result<bool, Error> {
        Ok(self.attribute_usize(STMT_NOSCAN)? == NOSCAN_OFF)
    }

    pub fn set_escape_processing(&mut self, enabled: bool) -> Result<(), Error> {
        let no_scan = if enabled { NOSCAN_OFF } else { NOSCAN_ON };
        self.set_attribute_usize(STMT_NOSCAN, no_scan)
    }
}

impl<S> Drop for Statement<S>
where
    S: handles::Statement,
{
    fn drop(&mut self) {
        if let Err(error) = self.destroy() {
            warn!("Error destroying statement: {error}");
        }
    }
}
