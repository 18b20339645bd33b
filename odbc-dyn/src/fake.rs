//! Scripted statement handle, so the statement and cursor state machines can be tested without a
//! driver. Bound parameters are read through the pointers handed to `bind_input_parameter` at
//! execution time, just like a driver would.

use std::{
    cell::RefCell,
    collections::{BTreeMap, HashMap, VecDeque},
    rc::Rc,
    slice,
};

use odbc_sys::{CDataType, Len, NO_TOTAL, NULL_DATA, Pointer, SqlDataType};

use crate::{
    OdbcVersion, Value,
    handles::{
        ColumnDescription, DiagnosticResult, Diagnostics, Free, InputBinding, SqlResult, State,
        Statement,
    },
    lifecycle::{OpenChildren, Parent},
};

#[derive(Debug, Clone, Default)]
pub struct ScriptedResultSet {
    pub columns: Vec<(String, SqlDataType)>,
    pub rows: Vec<Vec<Value>>,
}

/// Describes how the fake statement behaves.
#[derive(Debug, Clone, Default)]
pub struct Script {
    result_sets: Vec<ScriptedResultSet>,
    row_count: isize,
    exec_no_data: bool,
    num_params: Option<u16>,
    /// Function name, message and SQLSTATE. Each failure is returned once, by the next call to
    /// the function.
    failures: Vec<(&'static str, String, [u8; 5])>,
    hide_total_length: bool,
}

impl Script {
    /// Adds a result set with columns `c1`, `c2`, ... typed after the values in the first row.
    pub fn with_rows(self, rows: Vec<Vec<Value>>) -> Self {
        let columns = rows
            .first()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .map(|(index, value)| (format!("c{}", index + 1), sql_type_of(value)))
                    .collect()
            })
            .unwrap_or_default();
        self.with_result_set(columns, rows)
    }

    pub fn with_result_set(
        mut self,
        columns: Vec<(String, SqlDataType)>,
        rows: Vec<Vec<Value>>,
    ) -> Self {
        self.result_sets.push(ScriptedResultSet { columns, rows });
        self
    }

    pub fn with_row_count(mut self, row_count: isize) -> Self {
        self.row_count = row_count;
        self
    }

    /// Execution reports `SQL_NO_DATA`, like a searched update without matching rows.
    pub fn exec_no_data(mut self) -> Self {
        self.exec_no_data = true;
        self
    }

    /// Without this `SQLNumParams` fails.
    pub fn with_num_params(mut self, num_params: u16) -> Self {
        self.num_params = Some(num_params);
        self
    }

    pub fn fail(mut self, function: &'static str, message: &str, state: [u8; 5]) -> Self {
        self.failures.push((function, message.to_owned(), state));
        self
    }

    /// Truncated chunks report `SQL_NO_TOTAL` instead of the remaining length.
    pub fn hide_total_length(mut self) -> Self {
        self.hide_total_length = true;
        self
    }
}

fn sql_type_of(value: &Value) -> SqlDataType {
    match value {
        Value::Number(_) => SqlDataType::DOUBLE,
        Value::Boolean(_) => SqlDataType::EXT_BIT,
        Value::Binary(_) => SqlDataType::EXT_VAR_BINARY,
        Value::Text(_) | Value::Null => SqlDataType::VARCHAR,
    }
}

/// A parameter value as seen by the fake driver at execution time.
#[derive(Debug, Clone, PartialEq)]
pub enum Bound {
    Null,
    Default,
    AtExecution,
    Number(f64),
    Bit(u8),
    Bytes(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub value_type: CDataType,
    pub parameter_type: SqlDataType,
    pub column_size: usize,
}

/// Everything the fake statement has been asked to do. Shared, so tests can inspect it after the
/// fake has been moved into a statement or cursor.
#[derive(Debug, Default)]
pub struct Calls {
    pub functions: Vec<&'static str>,
    pub bindings: BTreeMap<u16, Binding>,
    /// Parameters at each execution, by parameter number.
    pub executions: Vec<Vec<(u16, Bound)>>,
    /// Data sent with `SQLPutData`, by parameter number.
    pub put_data: Vec<(u16, Vec<u8>)>,
    pub freed: usize,
}

impl Calls {
    pub fn count(&self, function: &str) -> usize {
        self.functions.iter().filter(|&&f| f == function).count()
    }
}

pub struct FakeStatement {
    script: Script,
    calls: Rc<RefCell<Calls>>,
    bound: BTreeMap<u16, InputBinding>,
    result_set: usize,
    row: Option<usize>,
    /// Bytes already retrieved for each column of the current row.
    delivered: HashMap<u16, usize>,
    pending: VecDeque<u16>,
    current_parameter: Option<u16>,
    diagnostics: Vec<(String, [u8; 5])>,
    attributes: HashMap<i32, usize>,
    string_attributes: HashMap<i32, String>,
}

impl FakeStatement {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            calls: Rc::default(),
            bound: BTreeMap::new(),
            result_set: 0,
            row: None,
            delivered: HashMap::new(),
            pending: VecDeque::new(),
            current_parameter: None,
            diagnostics: Vec::new(),
            attributes: HashMap::new(),
            string_attributes: HashMap::new(),
        }
    }

    pub fn calls(&self) -> Rc<RefCell<Calls>> {
        self.calls.clone()
    }

    /// Fails the next call to `function`, like [`Script::fail`] does for statements which are not
    /// created yet.
    pub fn fail_next(&mut self, function: &'static str, message: &str, state: [u8; 5]) {
        self.script
            .failures
            .push((function, message.to_owned(), state));
    }

    /// Records the call and fails it, if the script says so.
    fn check(&mut self, function: &'static str) -> SqlResult<()> {
        self.calls.borrow_mut().functions.push(function);
        self.diagnostics.clear();
        match self.script.failures.iter().position(|f| f.0 == function) {
            Some(index) => {
                let (_, message, state) = self.script.failures.remove(index);
                self.diagnostics.push((message, state));
                SqlResult::Error { function }
            }
            None => SqlResult::Success(()),
        }
    }

    fn current_result_set(&self) -> Option<&ScriptedResultSet> {
        self.script.result_sets.get(self.result_set)
    }

    fn start_execution(&mut self, function: &'static str) -> SqlResult<()> {
        if let SqlResult::Error { function } = self.check(function) {
            return SqlResult::Error { function };
        }
        let snapshot: Vec<_> = self
            .bound
            .iter()
            .map(|(&number, binding)| (number, unsafe { read_bound(binding) }))
            .collect();
        self.pending = snapshot
            .iter()
            .filter(|(_, bound)| *bound == Bound::AtExecution)
            .map(|&(number, _)| number)
            .collect();
        self.calls.borrow_mut().executions.push(snapshot);
        if self.pending.is_empty() {
            self.finish_execution()
        } else {
            SqlResult::NeedData
        }
    }

    fn finish_execution(&mut self) -> SqlResult<()> {
        self.result_set = 0;
        self.row = None;
        if self.script.exec_no_data {
            SqlResult::NoData
        } else {
            SqlResult::Success(())
        }
    }
}

/// # Safety
///
/// The pointers in `binding` must still be valid.
unsafe fn read_bound(binding: &InputBinding) -> Bound {
    let indicator = unsafe { *binding.indicator };
    match indicator {
        NULL_DATA => Bound::Null,
        -5 => Bound::Default,
        i if i <= -100 => Bound::AtExecution,
        len => match binding.value_type {
            CDataType::Double => Bound::Number(unsafe { *(binding.value as *const f64) }),
            CDataType::Bit => Bound::Bit(unsafe { *(binding.value as *const u8) }),
            _ => Bound::Bytes(
                unsafe { slice::from_raw_parts(binding.value as *const u8, len as usize) }
                    .to_vec(),
            ),
        },
    }
}

impl Diagnostics for FakeStatement {
    fn diagnostic_record(
        &self,
        rec_number: i16,
        message_text: &mut [u8],
    ) -> Option<DiagnosticResult> {
        let (message, state) = self.diagnostics.get(usize::try_from(rec_number - 1).ok()?)?;
        let len = message.len().min(message_text.len());
        message_text[..len].copy_from_slice(&message.as_bytes()[..len]);
        Some(DiagnosticResult {
            state: State(*state),
            native_error: 0,
            text_length: message.len() as i16,
        })
    }
}

impl Free for FakeStatement {
    unsafe fn free(&mut self) -> SqlResult<()> {
        let result = self.check("SQLFreeHandle");
        if !result.is_err() {
            self.calls.borrow_mut().freed += 1;
        }
        result
    }
}

impl Statement for FakeStatement {
    fn exec_direct(&mut self, _statement_text: &str) -> SqlResult<()> {
        self.start_execution("SQLExecDirect")
    }

    fn prepare(&mut self, _statement_text: &str) -> SqlResult<()> {
        self.check("SQLPrepare")
    }

    fn execute(&mut self) -> SqlResult<()> {
        self.start_execution("SQLExecute")
    }

    fn num_result_cols(&self) -> SqlResult<i16> {
        let num_cols = self
            .current_result_set()
            .map(|result_set| result_set.columns.len())
            .unwrap_or(0);
        SqlResult::Success(num_cols as i16)
    }

    fn num_params(&self) -> SqlResult<u16> {
        match self.script.num_params {
            Some(num_params) => SqlResult::Success(num_params),
            None => SqlResult::Error {
                function: "SQLNumParams",
            },
        }
    }

    fn describe_col(
        &self,
        column_number: u16,
        column_description: &mut ColumnDescription,
    ) -> SqlResult<()> {
        let (name, data_type) =
            &self.current_result_set().unwrap().columns[usize::from(column_number) - 1];
        column_description.name = name.as_bytes().to_vec();
        column_description.data_type = *data_type;
        SqlResult::Success(())
    }

    fn row_count(&self) -> SqlResult<isize> {
        self.calls.borrow_mut().functions.push("SQLRowCount");
        SqlResult::Success(self.script.row_count)
    }

    fn fetch(&mut self) -> SqlResult<()> {
        if let SqlResult::Error { function } = self.check("SQLFetch") {
            return SqlResult::Error { function };
        }
        let num_rows = self
            .current_result_set()
            .map(|result_set| result_set.rows.len())
            .unwrap_or(0);
        let next = self.row.map(|row| row + 1).unwrap_or(0);
        self.row = Some(next.min(num_rows));
        self.delivered.clear();
        if next < num_rows {
            SqlResult::Success(())
        } else {
            SqlResult::NoData
        }
    }

    fn get_data(
        &mut self,
        column_number: u16,
        target_type: CDataType,
        target: &mut [u8],
        indicator: &mut Len,
    ) -> SqlResult<()> {
        if let SqlResult::Error { function } = self.check("SQLGetData") {
            return SqlResult::Error { function };
        }
        let value = self.current_result_set().unwrap().rows[self.row.unwrap()]
            [usize::from(column_number) - 1]
            .clone();
        if value.is_null() {
            *indicator = NULL_DATA;
            return SqlResult::Success(());
        }
        match target_type {
            CDataType::Double => {
                let number = value.as_f64().unwrap_or(0.);
                target[..8].copy_from_slice(&number.to_ne_bytes());
                *indicator = 8;
                SqlResult::Success(())
            }
            CDataType::Bit => {
                target[0] = value.as_bool().map(u8::from).unwrap_or(0);
                *indicator = 1;
                SqlResult::Success(())
            }
            _ => {
                let bytes = value.as_bytes().unwrap_or_default();
                let terminator = usize::from(target_type == CDataType::Char);
                let offset = self.delivered.get(&column_number).copied();
                if offset.is_some_and(|offset| offset >= bytes.len()) {
                    return SqlResult::NoData;
                }
                let remaining = &bytes[offset.unwrap_or(0)..];
                let capacity = target.len() - terminator;
                let len = remaining.len().min(capacity);
                target[..len].copy_from_slice(&remaining[..len]);
                if terminator == 1 {
                    target[len] = 0;
                }
                let truncated = remaining.len() > capacity;
                *indicator = if truncated && self.script.hide_total_length {
                    NO_TOTAL
                } else {
                    remaining.len() as Len
                };
                *self.delivered.entry(column_number).or_insert(0) += len;
                if truncated {
                    SqlResult::SuccessWithInfo(())
                } else {
                    SqlResult::Success(())
                }
            }
        }
    }

    fn more_results(&mut self) -> SqlResult<()> {
        if let SqlResult::Error { function } = self.check("SQLMoreResults") {
            return SqlResult::Error { function };
        }
        self.row = None;
        if self.result_set + 1 < self.script.result_sets.len() {
            self.result_set += 1;
            SqlResult::Success(())
        } else {
            self.result_set = self.script.result_sets.len();
            SqlResult::NoData
        }
    }

    fn close_cursor(&mut self) -> SqlResult<()> {
        self.check("SQLCloseCursor")
    }

    fn discard_results(&mut self) -> SqlResult<()> {
        self.row = None;
        self.result_set = self.script.result_sets.len();
        self.check("SQLFreeStmt(CLOSE)")
    }

    fn cancel(&mut self) -> SqlResult<()> {
        self.pending.clear();
        self.current_parameter = None;
        self.check("SQLCancel")
    }

    fn unbind_cols(&mut self) -> SqlResult<()> {
        self.check("SQLFreeStmt(UNBIND)")
    }

    fn reset_parameters(&mut self) -> SqlResult<()> {
        self.bound.clear();
        self.check("SQLFreeStmt(RESET_PARAMS)")
    }

    unsafe fn bind_input_parameter(
        &mut self,
        parameter_number: u16,
        binding: &InputBinding,
    ) -> SqlResult<()> {
        if let SqlResult::Error { function } = self.check("SQLBindParameter") {
            return SqlResult::Error { function };
        }
        self.bound.insert(parameter_number, *binding);
        self.calls.borrow_mut().bindings.insert(
            parameter_number,
            Binding {
                value_type: binding.value_type,
                parameter_type: binding.parameter_type,
                column_size: binding.column_size,
            },
        );
        SqlResult::Success(())
    }

    fn param_data(&mut self) -> SqlResult<Option<Pointer>> {
        if let SqlResult::Error { function } = self.check("SQLParamData") {
            return SqlResult::Error { function };
        }
        match self.pending.pop_front() {
            Some(number) => {
                self.current_parameter = Some(number);
                SqlResult::Success(Some(self.bound[&number].value))
            }
            None => {
                self.current_parameter = None;
                self.finish_execution().map(|()| None)
            }
        }
    }

    fn put_data(&mut self, data: &[u8]) -> SqlResult<()> {
        if let SqlResult::Error { function } = self.check("SQLPutData") {
            return SqlResult::Error { function };
        }
        let number = self.current_parameter.unwrap_or(0);
        self.calls.borrow_mut().put_data.push((number, data.to_vec()));
        SqlResult::Success(())
    }

    fn set_attribute_usize(&mut self, attribute: i32, value: usize) -> SqlResult<()> {
        self.attributes.insert(attribute, value);
        self.check("SQLSetStmtAttr")
    }

    fn attribute_usize(&self, attribute: i32) -> SqlResult<usize> {
        SqlResult::Success(self.attributes.get(&attribute).copied().unwrap_or(0))
    }

    fn set_attribute_str(&mut self, attribute: i32, value: &str) -> SqlResult<()> {
        self.string_attributes.insert(attribute, value.to_owned());
        self.check("SQLSetStmtAttr")
    }

    fn attribute_str(&self, attribute: i32, buf: &mut Vec<u8>) -> SqlResult<()> {
        buf.clear();
        if let Some(value) = self.string_attributes.get(&attribute) {
            buf.extend_from_slice(value.as_bytes());
        }
        SqlResult::Success(())
    }
}

/// Stands in for a connection.
#[derive(Debug)]
pub struct FakeConnection {
    pub children: OpenChildren,
    pub version: OdbcVersion,
    pub num_params: bool,
}

impl FakeConnection {
    pub fn new(version: OdbcVersion) -> Rc<Self> {
        Rc::new(Self {
            children: OpenChildren::default(),
            version,
            num_params: true,
        })
    }

    /// Connection to a driver without `SQLNumParams`.
    pub fn without_num_params() -> Rc<Self> {
        Rc::new(Self {
            children: OpenChildren::default(),
            version: OdbcVersion::Odbc3,
            num_params: false,
        })
    }
}

impl Parent for FakeConnection {
    fn children(&self) -> &OpenChildren {
        &self.children
    }

    fn odbc_version(&self) -> OdbcVersion {
        self.version
    }

    fn supports_num_params(&self) -> bool {
        self.num_params
    }
}
