use std::{collections::HashMap, fmt, rc::Rc};

use log::warn;

use crate::{
    Error, Value, ValueKind,
    error::Teardown,
    column_info::ColumnInfo,
    decode::{DEFAULT_CHUNK_SIZE, decode_column},
    handles::{self, SqlResult, Statement as _, StatementImpl},
    lifecycle::{Parent, free_handle},
};

/// Shape of the rows produced by [`Cursor::fetch_into`] and [`Cursor::for_each`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchMode {
    /// Values in column order.
    #[default]
    Positional,
    /// Values by column name.
    Named,
    /// Both of the above.
    Both,
}

impl FetchMode {
    /// Interprets an option string. `a` (alphanumeric) selects access by column name, `n`
    /// (numeric) together with `a` selects both. Anything else is positional.
    ///
    /// ```
    /// use odbc_dyn::FetchMode;
    ///
    /// assert_eq!(FetchMode::Named, FetchMode::from_options("a"));
    /// assert_eq!(FetchMode::Both, FetchMode::from_options("an"));
    /// assert_eq!(FetchMode::Positional, FetchMode::from_options("n"));
    /// ```
    pub fn from_options(options: &str) -> Self {
        match (options.contains('a'), options.contains('n')) {
            (true, true) => FetchMode::Both,
            (true, false) => FetchMode::Named,
            (false, _) => FetchMode::Positional,
        }
    }
}

/// One fetched row. Can be reused across fetches to avoid allocations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: Vec<Value>,
    named: HashMap<String, Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Values in column order. Empty unless fetched positional.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Zero based column access.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Values by column name. Empty unless fetched named.
    pub fn named(&self) -> &HashMap<String, Value> {
        &self.named
    }

    pub fn by_name(&self, name: &str) -> Option<&Value> {
        self.named.get(name)
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    fn clear(&mut self) {
        self.values.clear();
        self.named.clear();
    }
}

/// Result set state shared by [`Cursor`] and [`crate::Statement`]: the handle, whether the cursor
/// is open, and the description of the columns.
pub(crate) struct CursorState<S> {
    /// `None` once the handle has been freed.
    pub handle: Option<S>,
    pub open: bool,
    pub columns: ColumnInfo,
    pub autoclose: bool,
    /// Scratch buffer for chunked retrieval of text and binary values.
    chunk: Vec<u8>,
}

// Handles are opaque, only whether one is still allocated is of interest.
impl<S> fmt::Debug for CursorState<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CursorState")
            .field("allocated", &self.handle.is_some())
            .field("open", &self.open)
            .field("columns", &self.columns)
            .field("autoclose", &self.autoclose)
            .finish_non_exhaustive()
    }
}

impl<S> CursorState<S>
where
    S: handles::Statement,
{
    pub fn new(handle: S, columns: ColumnInfo, open: bool, autoclose: bool) -> Self {
        Self {
            handle: Some(handle),
            open,
            columns,
            autoclose,
            chunk: vec![0; DEFAULT_CHUNK_SIZE],
        }
    }

    /// Fetches the next row into `row`. `false` once the result set is consumed.
    pub fn fetch_into(&mut self, row: &mut Row, mode: FetchMode) -> Result<bool, Error> {
        let Self {
            handle,
            open,
            columns,
            chunk,
            ..
        } = self;
        let stmt = match handle {
            Some(stmt) if *open && !columns.is_empty() => stmt,
            _ => return Err(Error::NoOpenCursor),
        };
        match stmt.fetch() {
            SqlResult::NoData => return Ok(false),
            other => other.into_result(&*stmt)?,
        }
        row.clear();
        for (index, (&kind, name)) in columns.kinds().iter().zip(columns.names()).enumerate() {
            let value = decode_column(stmt, column_number(index), kind, chunk)?;
            match mode {
                FetchMode::Positional => row.values.push(value),
                FetchMode::Named => {
                    row.named.insert(name.clone(), value);
                }
                FetchMode::Both => {
                    row.named.insert(name.clone(), value.clone());
                    row.values.push(value);
                }
            }
        }
        Ok(true)
    }

    /// Calls `f` with each remaining row until the result set is consumed, `f` returns a value
    /// or anything fails. Does not close the cursor.
    pub fn for_each<B, E, F>(&mut self, mode: FetchMode, mut f: F) -> Result<Option<B>, E>
    where
        E: From<Error>,
        F: FnMut(&Row) -> Result<Option<B>, E>,
    {
        let mut row = Row::new();
        while self.fetch_into(&mut row, mode)? {
            if let Some(value) = f(&row)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    /// `SQLCloseCursor`. The cursor counts as closed afterwards, even if the driver reports an
    /// error. `false` if it has not been open.
    ///
    /// A result set without columns, e.g. the row count of an update between two queries, holds
    /// no cursor. Its pending results are discarded instead.
    pub fn close_cursor(&mut self) -> Result<bool, Error> {
        if !self.open {
            return Ok(false);
        }
        self.open = false;
        let stmt = self.handle.as_mut().ok_or(Error::NoOpenCursor)?;
        close_results(stmt, !self.columns.is_empty())?;
        Ok(true)
    }

    /// `true` if the current result set has columns to fetch from.
    pub fn has_rows(&self) -> bool {
        self.open && !self.columns.is_empty()
    }

    /// Advances to the next result set. `false` if there is none, in which case the cursor is no
    /// longer open. The next result set may lack columns, yet more results can follow it.
    pub fn more_results(&mut self) -> Result<bool, Error> {
        let Self {
            handle,
            open,
            columns,
            ..
        } = self;
        let stmt = match handle {
            Some(stmt) if *open => stmt,
            _ => return Err(Error::NoOpenCursor),
        };
        match stmt.more_results() {
            SqlResult::NoData => {
                *open = false;
                return Ok(false);
            }
            other => other.into_result(&*stmt)?,
        }
        columns.clear();
        *columns = ColumnInfo::describe(&*stmt)?;
        Ok(true)
    }
}

/// Ends the results of the last execution. `SQLCloseCursor` fails without a cursor, so a result
/// set without columns is discarded with `SQLFreeStmt(SQL_CLOSE)`.
pub(crate) fn close_results<S>(stmt: &mut S, has_columns: bool) -> Result<(), Error>
where
    S: handles::Statement,
{
    if has_columns {
        stmt.close_cursor().into_result(&*stmt)
    } else {
        stmt.discard_results().into_result(&*stmt)
    }
}

/// Column numbers are one based.
fn column_number(index: usize) -> u16 {
    (index + 1).try_into().unwrap_or(u16::MAX)
}

/// Result set of a direct execution or catalog call. Owns its statement handle, which is freed
/// once the cursor is closed.
pub struct Cursor<S: handles::Statement = StatementImpl> {
    state: CursorState<S>,
    parent: Rc<dyn Parent>,
}

impl<S> Cursor<S>
where
    S: handles::Statement,
{
    /// Takes ownership of a statement handle which has just been executed, and counts as a child
    /// of `parent` until closed.
    pub(crate) fn new(handle: S, columns: ColumnInfo, parent: Rc<dyn Parent>) -> Self {
        parent.children().register();
        Self {
            state: CursorState::new(handle, columns, true, true),
            parent,
        }
    }

    fn ensure_alive(&self) -> Result<(), Error> {
        if self.state.handle.is_some() {
            Ok(())
        } else {
            Err(Error::Closed("cursor"))
        }
    }

    /// Values of the next row in column order. `None` once the result set is consumed, in which
    /// case the cursor is closed if autoclose is set.
    pub fn fetch(&mut self) -> Result<Option<Vec<Value>>, Error> {
        let mut row = Row::new();
        if self.fetch_into(&mut row, FetchMode::Positional)? {
            Ok(Some(row.into_values()))
        } else {
            Ok(None)
        }
    }

    /// Fetches the next row into `row`, which can be reused between calls. `false` once the result
    /// set is consumed, in which case the cursor is closed if autoclose is set.
    pub fn fetch_into(&mut self, row: &mut Row, mode: FetchMode) -> Result<bool, Error> {
        self.ensure_alive()?;
        let has_row = self.state.fetch_into(row, mode)?;
        if !has_row && self.state.autoclose {
            self.close()?;
        }
        Ok(has_row)
    }

    /// Invokes `f` for every remaining row. Iteration stops early if `f` returns a value, which is
    /// then returned, or an error. With `autoclose` the cursor is closed however the iteration
    /// ends. Without it the cursor is left open, even if it is exhausted.
    pub fn for_each<B, E, F>(&mut self, mode: FetchMode, autoclose: bool, f: F) -> Result<Option<B>, E>
    where
        E: From<Error>,
        F: FnMut(&Row) -> Result<Option<B>, E>,
    {
        self.ensure_alive()?;
        let result = self.state.for_each(mode, f);
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

    /// Advances to the next result set. `false` if there is none.
    pub fn more_results(&mut self) -> Result<bool, Error> {
        self.ensure_alive()?;
        self.state.more_results()
    }

    pub fn column_names(&self) -> &[String] {
        self.state.columns.names()
    }

    pub fn column_kinds(&self) -> &[ValueKind] {
        self.state.columns.kinds()
    }

    /// `true` until the cursor is closed or the last result set is consumed.
    pub fn is_open(&self) -> bool {
        self.state.handle.is_some() && self.state.open
    }

    pub fn autoclose(&self) -> bool {
        self.state.autoclose
    }

    /// Whether exhausting the result set with [`Self::fetch`] closes the cursor.
    pub fn set_autoclose(&mut self, autoclose: bool) {
        self.state.autoclose = autoclose;
    }

    pub fn set_attribute_usize(&mut self, attribute: i32, value: usize) -> Result<(), Error> {
        let stmt = self.state.handle.as_mut().ok_or(Error::Closed("cursor"))?;
        stmt.set_attribute_usize(attribute, value).into_result(&*stmt)
    }

    pub fn attribute_usize(&self, attribute: i32) -> Result<usize, Error> {
        let stmt = self.state.handle.as_ref().ok_or(Error::Closed("cursor"))?;
        stmt.attribute_usize(attribute).into_result(stmt)
    }

    pub fn set_attribute_str(&mut self, attribute: i32, value: &str) -> Result<(), Error> {
        let stmt = self.state.handle.as_mut().ok_or(Error::Closed("cursor"))?;
        stmt.set_attribute_str(attribute, value).into_result(&*stmt)
    }

    pub fn attribute_str(&self, attribute: i32) -> Result<String, Error> {
        let stmt = self.state.handle.as_ref().ok_or(Error::Closed("cursor"))?;
        let mut buf = Vec::new();
        stmt.attribute_str(attribute, &mut buf).into_result(stmt)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Closes the cursor and frees its handle. Both steps are attempted, failures of either are
    /// reported together as [`Error::Teardown`]. `false` if the cursor has already been closed.
    pub fn close(&mut self) -> Result<bool, Error> {
        let Some(mut handle) = self.state.handle.take() else {
            return Ok(false);
        };
        let mut teardown = Teardown::default();
        if self.state.open {
            self.state.open = false;
            teardown.step(close_results(&mut handle, !self.state.columns.is_empty()));
        }
        teardown.step(free_handle(handle));
        self.parent.children().release();
        teardown.finish(true)
    }
}

impl<S> fmt::Debug for Cursor<S>
where
    S: handles::Statement,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<S> Drop for Cursor<S>
where
    S: handles::Statement,
{
    fn drop(&mut self) {
        if let Err(error) = self.close() {
            warn!("Error closing cursor: {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use crate::{
        Error, OdbcVersion, Value,
        column_info::ColumnInfo,
        fake::{FakeConnection, FakeStatement, Script},
    };

    use super::{Cursor, FetchMode, Row};

    fn cursor(script: Script) -> (Cursor<FakeStatement>, Rc<FakeConnection>) {
        let stmt = FakeStatement::new(script);
        let columns = ColumnInfo::describe(&stmt).unwrap();
        let connection = FakeConnection::new(OdbcVersion::Odbc3);
        let cursor = Cursor::new(stmt, columns, connection.clone());
        (cursor, connection)
    }

    fn two_rows() -> Script {
        Script::default().with_result_set(
            vec![
                ("id".to_owned(), odbc_sys::SqlDataType::INTEGER),
                ("name".to_owned(), odbc_sys::SqlDataType::VARCHAR),
            ],
            vec![
                vec![Value::from(1), Value::from("one")],
                vec![Value::from(2), Value::from("two")],
            ],
        )
    }

    #[derive(Debug)]
    enum TestError {
        Callback,
        Odbc(Error),
    }

    impl From<Error> for TestError {
        fn from(error: Error) -> Self {
            TestError::Odbc(error)
        }
    }

    #[test]
    fn fetch_mode_from_options() {
        assert_eq!(FetchMode::Positional, FetchMode::from_options(""));
        assert_eq!(FetchMode::Named, FetchMode::from_options("a"));
        assert_eq!(FetchMode::Both, FetchMode::from_options("na"));
        assert_eq!(FetchMode::Positional, FetchMode::from_options("n"));
    }

    #[test]
    fn fetch_until_exhausted_closes_cursor() {
        let (mut cursor, connection) = cursor(two_rows());
        let calls = cursor.state.handle.as_ref().unwrap().calls();
        assert_eq!(1, connection.children.count());

        assert_eq!(
            Some(vec![Value::from(1), Value::from("one")]),
            cursor.fetch().unwrap()
        );
        assert_eq!(
            Some(vec![Value::from(2), Value::from("two")]),
            cursor.fetch().unwrap()
        );
        assert_eq!(None, cursor.fetch().unwrap());

        assert!(!cursor.is_open());
        assert_eq!(0, connection.children.count());
        assert_eq!(1, calls.borrow().freed);
        assert!(matches!(cursor.fetch(), Err(Error::Closed("cursor"))));
    }

    #[test]
    fn fetch_without_autoclose_keeps_cursor() {
        let (mut cursor, connection) = cursor(two_rows());
        cursor.set_autoclose(false);

        while cursor.fetch().unwrap().is_some() {}

        assert!(cursor.is_open());
        assert_eq!(1, connection.children.count());
    }

    #[test]
    fn fetch_named_and_both() {
        let (mut cursor, _connection) = cursor(two_rows());
        let mut row = Row::new();

        cursor.fetch_into(&mut row, FetchMode::Named).unwrap();
        assert!(row.values().is_empty());
        assert_eq!(Some(&Value::from("one")), row.by_name("name"));

        cursor.fetch_into(&mut row, FetchMode::Both).unwrap();
        assert_eq!(Some(&Value::from(2)), row.get(0));
        assert_eq!(Some(&Value::from(2)), row.by_name("id"));
    }

    #[test]
    fn for_each_stops_at_first_value() {
        let (mut cursor, _connection) = cursor(two_rows());

        let found: Option<f64> = cursor
            .for_each(FetchMode::Named, true, |row| {
                Ok::<_, Error>(row.by_name("id").and_then(Value::as_f64))
            })
            .unwrap();

        assert_eq!(Some(1.), found);
        assert!(!cursor.is_open());
    }

    #[test]
    fn for_each_with_autoclose_closes_after_failing_callback() {
        let (mut cursor, connection) = cursor(two_rows());

        let result: Result<Option<()>, TestError> =
            cursor.for_each(FetchMode::Positional, true, |_row| Err(TestError::Callback));

        assert!(matches!(result, Err(TestError::Callback)));
        assert!(!cursor.is_open());
        assert_eq!(0, connection.children.count());
    }

    #[test]
    fn for_each_without_autoclose_leaves_cursor_open_after_failing_callback() {
        let (mut cursor, connection) = cursor(two_rows());

        let result: Result<Option<()>, TestError> =
            cursor.for_each(FetchMode::Positional, false, |_row| Err(TestError::Callback));

        assert!(matches!(result, Err(TestError::Callback)));
        assert!(cursor.is_open());
        assert_eq!(1, connection.children.count());
        // The cursor is still usable
        assert_eq!(
            Some(vec![Value::from(2), Value::from("two")]),
            cursor.fetch().unwrap()
        );
    }

    #[test]
    fn closing_after_result_set_without_columns() {
        let stmt = FakeStatement::new(two_rows().with_result_set(Vec::new(), Vec::new()));
        let calls = stmt.calls();
        let columns = ColumnInfo::describe(&stmt).unwrap();
        let connection = FakeConnection::new(OdbcVersion::Odbc3);
        let mut cursor = Cursor::new(stmt, columns, connection.clone());

        assert!(cursor.more_results().unwrap());
        assert!(cursor.column_names().is_empty());
        assert!(cursor.close().unwrap());

        assert_eq!(0, connection.children.count());
        let calls = calls.borrow();
        assert_eq!(1, calls.count("SQLFreeStmt(CLOSE)"));
        assert_eq!(0, calls.count("SQLCloseCursor"));
    }

    #[test]
    fn debug_output_describes_state() {
        let (cursor, _connection) = cursor(two_rows());

        let debug = format!("{cursor:?}");

        assert!(debug.starts_with("Cursor { state: CursorState { allocated: true, open: true"));
    }

    #[test]
    fn for_each_reports_fetch_error_after_closing() {
        let (mut cursor, connection) = cursor(
            two_rows().fail("SQLFetch", "Communication link failure", *b"08S01"),
        );

        let result: Result<Option<()>, TestError> =
            cursor.for_each(FetchMode::Positional, true, |_row| Ok(None));

        let Err(TestError::Odbc(error)) = result else {
            panic!("Expected ODBC error")
        };
        assert_eq!(Some("08S01"), error.state());
        assert_eq!(0, connection.children.count());
    }

    #[test]
    fn callback_error_type_may_wrap_anything() {
        let (mut cursor, _connection) = cursor(two_rows());

        let result: Result<Option<()>, anyhow::Error> =
            cursor.for_each(FetchMode::Positional, true, |_row| {
                Err(anyhow::anyhow!("Callback failed"))
            });

        assert_eq!("Callback failed", result.unwrap_err().to_string());
    }

    #[test]
    fn close_accumulates_diagnostics_of_close_and_free() {
        let (mut cursor, connection) = cursor(
            two_rows()
                .fail("SQLCloseCursor", "Invalid cursor state", *b"24000")
                .fail("SQLFreeHandle", "Function sequence error", *b"HY010"),
        );

        let error = cursor.close().unwrap_err();

        let Error::Teardown(errors) = &error else {
            panic!("Expected teardown error, got {error}")
        };
        assert_eq!(2, errors.len());
        let states: Vec<_> = error.records().iter().map(|r| r.state.as_str().to_owned()).collect();
        assert_eq!(vec!["24000", "HY010"], states);
        // The cursor is gone nevertheless
        assert_eq!(0, connection.children.count());
        assert!(!cursor.close().unwrap());
    }

    #[test]
    fn more_results_advances_and_reports_the_end() {
        let (mut cursor, _connection) = cursor(
            two_rows().with_rows(vec![vec![Value::from(true)]]),
        );

        assert!(cursor.more_results().unwrap());
        assert_eq!(&["c1".to_owned()], cursor.column_names());
        assert_eq!(Some(vec![Value::from(true)]), cursor.fetch().unwrap());

        assert!(!cursor.more_results().unwrap());
        assert!(!cursor.is_open());
        // Closing skips SQLCloseCursor, but still frees the handle
        let calls = cursor.state.handle.as_ref().unwrap().calls();
        assert!(cursor.close().unwrap());
        assert_eq!(0, calls.borrow().count("SQLCloseCursor"));
        assert_eq!(1, calls.borrow().freed);
    }
}
