use std::{
    cell::{Cell, RefCell},
    rc::Rc,
    thread::panicking,
};

use log::{debug, warn};
use odbc_sys::SqlDataType;

use crate::{
    Concurrency, Cursor, DriverInfo, Error, Execution, OdbcVersion, ResultSetType, RowChange,
    Statement, TransactionIsolation, Value,
    attributes::{
        AUTOCOMMIT_OFF, AUTOCOMMIT_ON, CONN_ACCESS_MODE, CONN_AUTOCOMMIT, CONN_CURRENT_CATALOG,
        CONN_LOGIN_TIMEOUT, CONN_TRACE, CONN_TRACEFILE, CONN_TXN_ISOLATION, MODE_READ_ONLY,
        MODE_READ_WRITE, OPT_TRACE_OFF, OPT_TRACE_ON,
    },
    capabilities::{self, InfoSource, TC_NONE, TXN_CAPABLE},
    column_info::ColumnInfo,
    environment::EnvironmentInner,
    error::Teardown,
    handles::{self, FUNCTION_BITMAP_SIZE, SqlResult, State, StatementImpl},
    lifecycle::{OpenChildren, Parent, free_handle},
};

/// `SQL_ATTR_CONNECTION_DEAD`
const CONN_CONNECTION_DEAD: i32 = 1209;
/// `SQL_CD_FALSE`
const CD_FALSE: u32 = 0;

// Function identifiers for `SQLGetFunctions`
const API_SQLPREPARE: u16 = 19;
const API_SQLNUMPARAMS: u16 = 63;
const API_SQLBINDPARAMETER: u16 = 72;

// Info types
const DRIVER_NAME: u16 = 6;
const DRIVER_VER: u16 = 7;
const DBMS_NAME: u16 = 17;
const DBMS_VER: u16 = 18;
const DRIVER_ODBC_VER: u16 = 77;

/// Minimum size of the buffer for the completed connection string.
const COMPLETED_CONNECTION_STRING_LEN: usize = 1024;

/// State shared between a [`Connection`] and the statements and cursors allocated on it.
#[derive(Debug)]
pub(crate) struct ConnectionInner {
    /// `None` once closed.
    handle: RefCell<Option<handles::Connection>>,
    connected: Cell<bool>,
    environment: Rc<EnvironmentInner>,
    children: OpenChildren,
    supports_prepare: Cell<bool>,
    supports_bind_parameter: Cell<bool>,
    supports_num_params: Cell<bool>,
    supports_transactions: Cell<bool>,
    driver_info: RefCell<Option<DriverInfo>>,
}

impl ConnectionInner {
    fn with_handle<T>(
        &self,
        f: impl FnOnce(&handles::Connection) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let handle = self.handle.borrow();
        let handle = handle.as_ref().ok_or(Error::Closed("connection"))?;
        f(handle)
    }

    fn with_handle_mut<T>(
        &self,
        f: impl FnOnce(&mut handles::Connection) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let mut handle = self.handle.borrow_mut();
        let handle = handle.as_mut().ok_or(Error::Closed("connection"))?;
        f(handle)
    }
}

impl Parent for ConnectionInner {
    fn children(&self) -> &OpenChildren {
        &self.children
    }

    fn odbc_version(&self) -> OdbcVersion {
        self.environment.version()
    }

    fn supports_num_params(&self) -> bool {
        self.supports_num_params.get()
    }
}

impl InfoSource for ConnectionInner {
    fn info_u16(&self, info_type: u16) -> Result<u16, Error> {
        self.with_handle(|conn| conn.info_u16(info_type).into_result(conn))
    }

    fn info_u32(&self, info_type: u16) -> Result<u32, Error> {
        self.with_handle(|conn| conn.info_u32(info_type).into_result(conn))
    }

    fn info_string(&self, info_type: u16) -> Result<String, Error> {
        self.with_handle(|conn| {
            let mut buf = Vec::new();
            conn.info_string(info_type, &mut buf).into_result(conn)?;
            Ok(String::from_utf8_lossy(&buf).into_owned())
        })
    }

    fn supported_functions(&self) -> Result<Vec<u16>, Error> {
        self.with_handle(|conn| {
            let mut bitmap = [0u16; FUNCTION_BITMAP_SIZE];
            conn.supported_functions(&mut bitmap).into_result(conn)?;
            Ok(bitmap.to_vec())
        })
    }
}

impl Drop for ConnectionInner {
    fn drop(&mut self) {
        let Some(mut handle) = self.handle.get_mut().take() else {
            return;
        };
        if self.connected.get() {
            if let Err(e) = disconnect_rolling_back(&mut handle) {
                // Avoid panicking, if we already have a panic. We don't want to mask the original
                // error.
                if !panicking() {
                    panic!("Unexpected error disconnecting: {e:?}")
                }
            }
        }
        drop(handle);
        self.environment.connections.release();
    }
}

/// Disconnects. A transaction still in progress is rolled back first.
fn disconnect_rolling_back(handle: &mut handles::Connection) -> Result<(), Error> {
    match handle.disconnect().into_result(&*handle) {
        Err(error) if error.state() == Some(State::INVALID_STATE_TRANSACTION.as_str()) => {
            debug!("Rolling back open transaction before disconnecting.");
            handle.rollback().into_result(&*handle)?;
            handle.disconnect().into_result(&*handle)
        }
        other => other,
    }
}

/// A connection to a data source. Allocated through [`crate::Environment::connection`], possibly
/// still unconnected, or connected right away by [`crate::Environment::connect`].
///
/// Statements and cursors hold on to the connection. Dropping the `Connection` while they are
/// still alive disconnects only after the last of them is gone.
#[derive(Debug)]
pub struct Connection {
    inner: Rc<ConnectionInner>,
}

impl Connection {
    pub(crate) fn allocate(environment: Rc<EnvironmentInner>) -> Result<Self, Error> {
        let handle = environment
            .with_handle(|env| env.allocate_connection().into_result(env))?;
        if let Some(seconds) = environment.login_timeout() {
            handle
                .set_attribute_u32(CONN_LOGIN_TIMEOUT, seconds)
                .into_result(&handle)?;
        }
        environment.connections.register();
        debug!("Connection handle allocated.");
        Ok(Self {
            inner: Rc::new(ConnectionInner {
                handle: RefCell::new(Some(handle)),
                connected: Cell::new(false),
                environment,
                children: OpenChildren::default(),
                supports_prepare: Cell::new(false),
                supports_bind_parameter: Cell::new(false),
                supports_num_params: Cell::new(false),
                supports_transactions: Cell::new(false),
                driver_info: RefCell::new(None),
            }),
        })
    }

    fn parent(&self) -> Rc<dyn Parent> {
        self.inner.clone()
    }

    /// Connects to a data source configured in the driver manager.
    pub fn connect(
        &mut self,
        data_source_name: &str,
        user: Option<&str>,
        pwd: Option<&str>,
    ) -> Result<(), Error> {
        self.inner.with_handle_mut(|conn| {
            conn.connect(data_source_name, user, pwd)
                .into_result(&*conn)
        })?;
        self.after_connect();
        Ok(())
    }

    /// Connects using a connection string. Returns the completed connection string reported by
    /// the driver.
    pub fn connect_with_connection_string(
        &mut self,
        connection_string: &str,
    ) -> Result<String, Error> {
        let completed = self.inner.with_handle_mut(|conn| {
            let mut completed = Vec::with_capacity(COMPLETED_CONNECTION_STRING_LEN);
            conn.driver_connect(connection_string, &mut completed)
                .into_result(&*conn)?;
            Ok(completed)
        })?;
        self.after_connect();
        Ok(String::from_utf8_lossy(&completed).into_owned())
    }

    /// Learns what the driver is capable of. Unanswered questions count as unsupported. If the
    /// data source supports transactions autocommit is switched on.
    fn after_connect(&mut self) {
        let inner = &self.inner;
        inner.connected.set(true);
        inner.driver_info.replace(None);
        let result = inner.with_handle(|conn| {
            let supported = |function_id| match conn.function_supported(function_id) {
                SqlResult::Success(supported) | SqlResult::SuccessWithInfo(supported) => supported,
                _ => false,
            };
            inner.supports_prepare.set(supported(API_SQLPREPARE));
            inner.supports_bind_parameter.set(supported(API_SQLBINDPARAMETER));
            inner.supports_num_params.set(supported(API_SQLNUMPARAMS));

            let transactions = match conn.info_u16(TXN_CAPABLE) {
                SqlResult::Success(capable) | SqlResult::SuccessWithInfo(capable) => {
                    capable != TC_NONE
                }
                _ => false,
            };
            inner.supports_transactions.set(transactions);
            if transactions {
                if let SqlResult::Error { .. } =
                    conn.set_attribute_u32(CONN_AUTOCOMMIT, AUTOCOMMIT_ON)
                {
                    warn!("Could not switch on autocommit mode.");
                }
            }
            Ok(())
        });
        if let Err(error) = result {
            warn!("Could not query driver capabilities: {error}");
        }
    }

    /// Disconnects from the data source. The connection may be connected again afterwards.
    /// Fails with [`Error::OpenChildren`] while statements or cursors are open.
    pub fn disconnect(&mut self) -> Result<(), Error> {
        self.inner.children.ensure_none("connection")?;
        if !self.inner.connected.get() {
            return Ok(());
        }
        self.inner
            .with_handle_mut(|conn| conn.disconnect().into_result(&*conn))?;
        self.inner.connected.set(false);
        self.inner.driver_info.replace(None);
        Ok(())
    }

    /// `true` if connected and the driver does not consider the connection dead.
    pub fn is_connected(&self) -> Result<bool, Error> {
        if !self.inner.connected.get() {
            return Ok(false);
        }
        let dead = self.u32_attribute(CONN_CONNECTION_DEAD)?;
        Ok(dead == CD_FALSE)
    }

    fn allocate_statement(&self) -> Result<StatementImpl, Error> {
        self.inner
            .with_handle(|conn| conn.allocate_statement().into_result(conn))
    }

    /// Executes `sql` once. Returns a cursor if the statement produced a result set, or the number
    /// of affected rows otherwise.
    pub fn execute(&self, sql: &str) -> Result<Execution<Cursor>, Error> {
        let stmt = self.allocate_statement()?;
        execute_direct(stmt, sql, self.parent())
    }

    /// Allocates a statement which can be prepared, bound and executed repeatedly.
    pub fn statement(&self) -> Result<Statement, Error> {
        let stmt = self.allocate_statement()?;
        Ok(Statement::new(stmt, self.parent()))
    }

    /// Allocates a statement and prepares `sql`.
    pub fn prepare(&self, sql: &str) -> Result<Statement, Error> {
        let mut stmt = self.statement()?;
        stmt.prepare(sql)?;
        Ok(stmt)
    }

    /// Runs a catalog function on a fresh statement handle.
    pub(crate) fn run_catalog(
        &self,
        call: impl FnOnce(&mut StatementImpl) -> SqlResult<()>,
    ) -> Result<Execution<Cursor>, Error> {
        let mut stmt = self.allocate_statement()?;
        let no_data = match call(&mut stmt) {
            SqlResult::NoData => true,
            other => {
                other.into_result(&stmt)?;
                false
            }
        };
        into_execution(stmt, no_data, self.parent())
    }

    pub fn commit(&self) -> Result<(), Error> {
        self.inner.with_handle(|conn| conn.commit().into_result(conn))
    }

    pub fn rollback(&self) -> Result<(), Error> {
        self.inner.with_handle(|conn| conn.rollback().into_result(conn))
    }

    pub fn set_autocommit(&self, enabled: bool) -> Result<(), Error> {
        let value = if enabled { AUTOCOMMIT_ON } else { AUTOCOMMIT_OFF };
        self.set_u32_attribute(CONN_AUTOCOMMIT, value)
    }

    pub fn is_autocommit(&self) -> Result<bool, Error> {
        Ok(self.u32_attribute(CONN_AUTOCOMMIT)? == AUTOCOMMIT_ON)
    }

    /// Current catalog (database) of the connection.
    pub fn catalog_name(&self) -> Result<String, Error> {
        self.str_attribute(CONN_CURRENT_CATALOG)
    }

    pub fn set_catalog_name(&self, catalog: &str) -> Result<(), Error> {
        self.set_str_attribute(CONN_CURRENT_CATALOG, catalog)
    }

    pub fn set_read_only(&self, read_only: bool) -> Result<(), Error> {
        let value = if read_only {
            MODE_READ_ONLY
        } else {
            MODE_READ_WRITE
        };
        self.set_u32_attribute(CONN_ACCESS_MODE, value)
    }

    pub fn is_read_only(&self) -> Result<bool, Error> {
        Ok(self.u32_attribute(CONN_ACCESS_MODE)? == MODE_READ_ONLY)
    }

    /// Switches tracing of ODBC calls by the driver manager on or off.
    pub fn set_trace(&self, enabled: bool) -> Result<(), Error> {
        let value = if enabled { OPT_TRACE_ON } else { OPT_TRACE_OFF };
        self.set_u32_attribute(CONN_TRACE, value)
    }

    pub fn trace(&self) -> Result<bool, Error> {
        Ok(self.u32_attribute(CONN_TRACE)? == OPT_TRACE_ON)
    }

    pub fn set_trace_file(&self, path: &str) -> Result<(), Error> {
        self.set_str_attribute(CONN_TRACEFILE, path)
    }

    pub fn trace_file(&self) -> Result<String, Error> {
        self.str_attribute(CONN_TRACEFILE)
    }

    /// `None` if the data source does not support transactions, or reports a level unknown to
    /// [`TransactionIsolation`].
    pub fn transaction_isolation(&self) -> Result<Option<TransactionIsolation>, Error> {
        if !self.inner.supports_transactions.get() {
            return Ok(None);
        }
        let level = self.u32_attribute(CONN_TXN_ISOLATION)?;
        Ok(TransactionIsolation::from_u32(level))
    }

    pub fn set_transaction_isolation(&self, level: TransactionIsolation) -> Result<(), Error> {
        if !self.inner.supports_transactions.get() {
            return Err(Error::InvalidValue {
                expected: "transaction isolation level of a data source supporting transactions",
                value: format!("{level:?}"),
            });
        }
        self.set_u32_attribute(CONN_TXN_ISOLATION, level.as_u32())
    }

    /// Login timeout in seconds. `0` means no timeout.
    pub fn login_timeout(&self) -> Result<u32, Error> {
        self.u32_attribute(CONN_LOGIN_TIMEOUT)
    }

    pub fn set_login_timeout(&self, seconds: u32) -> Result<(), Error> {
        self.set_u32_attribute(CONN_LOGIN_TIMEOUT, seconds)
    }

    pub fn set_u32_attribute(&self, attribute: i32, value: u32) -> Result<(), Error> {
        self.inner
            .with_handle(|conn| conn.set_attribute_u32(attribute, value).into_result(conn))
    }

    pub fn u32_attribute(&self, attribute: i32) -> Result<u32, Error> {
        self.inner
            .with_handle(|conn| conn.attribute_u32(attribute).into_result(conn))
    }

    pub fn set_str_attribute(&self, attribute: i32, value: &str) -> Result<(), Error> {
        self.inner
            .with_handle(|conn| conn.set_attribute_str(attribute, value).into_result(conn))
    }

    pub fn str_attribute(&self, attribute: i32) -> Result<String, Error> {
        self.inner.with_handle(|conn| {
            let mut buf = Vec::new();
            conn.attribute_str(attribute, &mut buf).into_result(conn)?;
            Ok(String::from_utf8_lossy(&buf).into_owned())
        })
    }

    /// `SQLGetInfo` for info types answered with a 32 Bit integer or bitmask.
    pub fn u32_info(&self, info_type: u16) -> Result<u32, Error> {
        self.inner.info_u32(info_type)
    }

    pub fn u16_info(&self, info_type: u16) -> Result<u16, Error> {
        self.inner.info_u16(info_type)
    }

    pub fn string_info(&self, info_type: u16) -> Result<String, Error> {
        self.inner.info_string(info_type)
    }

    /// Answers one of the questions listed in [`crate::CAPABILITIES`] by name.
    ///
    /// ```no_run
    /// # fn check(conn: &odbc_dyn::Connection) -> Result<(), odbc_dyn::Error> {
    /// let quote = conn.capability("identifier_quote_string")?;
    /// let outer_joins = conn.capability("supports_outer_joins")?;
    /// # Ok(()) }
    /// ```
    pub fn capability(&self, name: &str) -> Result<Value, Error> {
        let capability = capabilities::find(name)?;
        capability
            .decoder
            .decode(&*self.inner, capability.info_type)
    }

    pub fn dbms_name(&self) -> Result<String, Error> {
        self.string_info(DBMS_NAME)
    }

    pub fn dbms_version(&self) -> Result<String, Error> {
        self.string_info(DBMS_VER)
    }

    pub fn driver_name(&self) -> Result<String, Error> {
        self.string_info(DRIVER_NAME)
    }

    pub fn driver_version(&self) -> Result<String, Error> {
        self.string_info(DRIVER_VER)
    }

    /// Version of the ODBC API implemented by the driver, e.g. `"03.80"`.
    pub fn odbc_version(&self) -> Result<String, Error> {
        self.string_info(DRIVER_ODBC_VER)
    }

    /// Snapshot of the driver capabilities. Queried on first use and kept until disconnect.
    pub fn driver_info(&self) -> Result<DriverInfo, Error> {
        if let Some(info) = self.inner.driver_info.borrow().as_ref() {
            return Ok(info.clone());
        }
        let info = DriverInfo::query(&*self.inner)?;
        self.inner.driver_info.replace(Some(info.clone()));
        Ok(info)
    }

    /// Whether the data source can run transactions at the isolation `level`.
    pub fn supports_transaction_isolation_level(
        &self,
        level: TransactionIsolation,
    ) -> Result<bool, Error> {
        capabilities::supports_isolation_level(&*self.inner, level)
    }

    pub fn supports_result_set_type(&self, result_set_type: ResultSetType) -> Result<bool, Error> {
        Ok(capabilities::supports_result_set_type(
            &self.driver_info()?,
            result_set_type,
        ))
    }

    /// `false` if the result set type itself is not supported.
    pub fn supports_result_set_concurrency(
        &self,
        result_set_type: ResultSetType,
        concurrency: Concurrency,
    ) -> Result<bool, Error> {
        Ok(capabilities::supports_result_set_concurrency(
            &self.driver_info()?,
            result_set_type,
            concurrency,
        ))
    }

    /// Whether a result set of the type sees the changes made through itself.
    pub fn own_changes_are_visible(
        &self,
        result_set_type: ResultSetType,
        change: RowChange,
    ) -> Result<bool, Error> {
        let info = self.driver_info()?;
        capabilities::own_changes_visible(&*self.inner, &info, result_set_type, change)
    }

    /// Whether a result set of the type sees changes made by others. The same for every kind of
    /// change.
    pub fn others_changes_are_visible(
        &self,
        result_set_type: ResultSetType,
        _change: RowChange,
    ) -> Result<bool, Error> {
        Ok(capabilities::others_changes_visible(
            &self.driver_info()?,
            result_set_type,
        ))
    }

    /// Whether a changed row of a result set of the type can be told apart from unchanged ones.
    pub fn changes_are_detected(
        &self,
        result_set_type: ResultSetType,
        change: RowChange,
    ) -> Result<bool, Error> {
        let info = self.driver_info()?;
        capabilities::changes_detected(&*self.inner, &info, result_set_type, change)
    }

    /// Whether the `CONVERT` scalar function converts values of type `from` into type `to`.
    /// Fails for data types without conversion info, e.g. intervals.
    pub fn supports_convert(&self, from: SqlDataType, to: SqlDataType) -> Result<bool, Error> {
        capabilities::supports_convert(&*self.inner, from, to)
    }

    pub fn supports_prepare(&self) -> bool {
        self.inner.supports_prepare.get()
    }

    pub fn supports_bind_parameter(&self) -> bool {
        self.inner.supports_bind_parameter.get()
    }

    pub fn supports_transactions(&self) -> bool {
        self.inner.supports_transactions.get()
    }

    /// Statements and cursors allocated on this connection which are still open.
    pub fn open_children(&self) -> usize {
        self.inner.children.count()
    }

    /// Disconnects and frees the connection handle. Fails with [`Error::OpenChildren`] while
    /// statements or cursors are open. `false` if the connection has already been closed.
    pub fn close(&self) -> Result<bool, Error> {
        if self.inner.handle.borrow().is_none() {
            return Ok(false);
        }
        self.inner.children.ensure_none("connection")?;
        let Some(mut handle) = self.inner.handle.borrow_mut().take() else {
            return Ok(false);
        };
        let mut teardown = Teardown::default();
        if self.inner.connected.replace(false) {
            teardown.step(handle.disconnect().into_result(&handle));
        }
        teardown.step(free_handle(handle));
        self.inner.driver_info.replace(None);
        self.inner.environment.connections.release();
        debug!("Connection closed.");
        teardown.finish(true)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.handle.borrow().is_none()
    }
}

/// Executes `sql` on a fresh statement handle, which is owned by the returned cursor, or freed if
/// there is no result set.
pub(crate) fn execute_direct<S>(
    mut stmt: S,
    sql: &str,
    parent: Rc<dyn Parent>,
) -> Result<Execution<Cursor<S>>, Error>
where
    S: handles::Statement,
{
    let no_data = match stmt.exec_direct(sql) {
        SqlResult::NoData => true,
        other => {
            other.into_result(&stmt)?;
            false
        }
    };
    into_execution(stmt, no_data, parent)
}

fn into_execution<S>(
    stmt: S,
    no_data: bool,
    parent: Rc<dyn Parent>,
) -> Result<Execution<Cursor<S>>, Error>
where
    S: handles::Statement,
{
    let columns = ColumnInfo::describe(&stmt)?;
    if !columns.is_empty() {
        return Ok(Execution::ResultSet(Cursor::new(stmt, columns, parent)));
    }
    let row_count = if no_data && parent.odbc_version().is_odbc3() {
        0
    } else {
        stmt.row_count().into_result(&stmt)?
    };
    free_handle(stmt)?;
    Ok(Execution::RowCount(row_count))
}

/// Assembles a connection string from `key=value` pairs. Values containing characters with a
/// meaning in connection strings are enclosed in braces.
pub(crate) fn connection_string(attributes: &[(&str, &str)]) -> Result<String, Error> {
    let mut out = String::new();
    for &(key, value) in attributes {
        if key.is_empty() || key.contains(['=', ';', '{', '}']) {
            return Err(Error::InvalidConnectionAttribute(key.to_string()));
        }
        out.push_str(key);
        out.push('=');
        if value.contains([';', '{', '}']) || value.starts_with(' ') || value.ends_with(' ') {
            out.push('{');
            out.push_str(&value.replace('}', "}}"));
            out.push('}');
        } else {
            out.push_str(value);
        }
        out.push(';');
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use crate::{
        Error, Execution, OdbcVersion, Value,
        fake::{FakeConnection, FakeStatement, Script},
    };

    use super::{connection_string, execute_direct};

    #[test]
    fn plain_connection_string() {
        let text = connection_string(&[("Driver", "SQLite3"), ("Database", "my.db")]).unwrap();
        assert_eq!("Driver=SQLite3;Database=my.db;", text);
    }

    #[test_case("my;secret", "{my;secret}"; "semicolon")]
    #[test_case("a}b", "{a}}b}"; "closing brace")]
    #[test_case(" padded", "{ padded}"; "leading space")]
    fn values_are_braced(value: &str, expected: &str) {
        let text = connection_string(&[("Pwd", value)]).unwrap();
        assert_eq!(format!("Pwd={expected};"), text);
    }

    #[test_case(""; "empty")]
    #[test_case("Pw=d"; "equals sign")]
    #[test_case("Pw;d"; "semicolon")]
    fn invalid_keys(key: &str) {
        let result = connection_string(&[(key, "value")]);
        assert!(matches!(result, Err(Error::InvalidConnectionAttribute(k)) if k == key));
    }

    #[test]
    fn direct_execution_with_result_set_opens_cursor() {
        let connection = FakeConnection::new(OdbcVersion::Odbc3);
        let stmt = FakeStatement::new(Script::default().with_rows(vec![vec![Value::from(42)]]));
        let calls = stmt.calls();

        let execution = execute_direct(stmt, "SELECT 42", connection.clone()).unwrap();
        let mut cursor = execution.into_result_set().unwrap();

        assert_eq!(1, connection.children.count());
        assert_eq!(Some(vec![Value::Number(42.0)]), cursor.fetch().unwrap());
        drop(cursor);
        assert_eq!(0, connection.children.count());
        assert_eq!(1, calls.borrow().freed);
    }

    #[test]
    fn direct_execution_without_result_set_frees_handle() {
        let connection = FakeConnection::new(OdbcVersion::Odbc3);
        let stmt = FakeStatement::new(Script::default().with_row_count(3));
        let calls = stmt.calls();

        let execution = execute_direct(stmt, "DELETE FROM t", connection.clone()).unwrap();

        assert!(matches!(execution, Execution::RowCount(3)));
        assert_eq!(0, connection.children.count());
        assert_eq!(1, calls.borrow().freed);
    }

    #[test_case(OdbcVersion::Odbc3, 0, 0; "odbc 3 skips row count")]
    #[test_case(OdbcVersion::Odbc2, 5, 1; "odbc 2 asks for row count")]
    fn direct_execution_without_affected_rows(
        version: OdbcVersion,
        expected: isize,
        row_count_calls: usize,
    ) {
        let connection = FakeConnection::new(version);
        let stmt = FakeStatement::new(Script::default().exec_no_data().with_row_count(5));
        let calls = stmt.calls();

        let execution = execute_direct(stmt, "UPDATE t SET a = 1 WHERE 1 = 0", connection).unwrap();

        assert_eq!(Some(expected), execution.row_count());
        assert_eq!(row_count_calls, calls.borrow().count("SQLRowCount"));
    }

    #[test]
    fn failing_direct_execution_carries_diagnostics() {
        let connection = FakeConnection::new(OdbcVersion::Odbc3);
        let stmt = FakeStatement::new(Script::default().fail(
            "SQLExecDirect",
            "syntax error",
            *b"42000",
        ));

        let error = execute_direct(stmt, "SELEC 1", connection.clone()).unwrap_err();

        assert_eq!(Some("42000"), error.state());
        assert_eq!(0, connection.children.count());
    }
}
