use std::{borrow::Cow, fmt};

use odbc_sys::SqlDataType;

use crate::Error;

/// A dynamically typed value, as exchanged with the host. Column values are decoded into it and
/// parameters are bound from it.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Number(f64),
    Boolean(bool),
    Text(String),
    Binary(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Kind of the value. `None` for [`Value::Null`].
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Value::Null => None,
            Value::Number(_) => Some(ValueKind::Number),
            Value::Boolean(_) => Some(ValueKind::Boolean),
            Value::Text(_) => Some(ValueKind::Text),
            Value::Binary(_) => Some(ValueKind::Binary),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(number) => Some(*number),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(boolean) => Some(*boolean),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Binary(bytes) => Some(bytes),
            Value::Text(text) => Some(text.as_bytes()),
            _ => None,
        }
    }

    /// Coerces the value into a number. Text is accepted if it parses as one.
    pub(crate) fn to_number(&self) -> Result<f64, Error> {
        match self {
            Value::Number(number) => Ok(*number),
            Value::Text(text) => text
                .trim()
                .parse()
                .map_err(|_| self.invalid(ValueKind::Number)),
            _ => Err(self.invalid(ValueKind::Number)),
        }
    }

    /// Coerces the value into a boolean. Numbers are `true` unless zero.
    pub(crate) fn to_bool(&self) -> Result<bool, Error> {
        match self {
            Value::Boolean(boolean) => Ok(*boolean),
            Value::Number(number) => Ok(*number != 0.),
            _ => Err(self.invalid(ValueKind::Boolean)),
        }
    }

    /// Byte representation of the value as sent for text and binary parameters. Numbers are
    /// formatted.
    pub(crate) fn to_bytes(&self, expected: ValueKind) -> Result<Cow<'_, [u8]>, Error> {
        match self {
            Value::Text(text) => Ok(Cow::Borrowed(text.as_bytes())),
            Value::Binary(bytes) => Ok(Cow::Borrowed(bytes)),
            Value::Number(number) => Ok(Cow::Owned(number.to_string().into_bytes())),
            _ => Err(self.invalid(expected)),
        }
    }

    fn invalid(&self, expected: ValueKind) -> Error {
        Error::InvalidValue {
            expected: expected.as_str(),
            value: format!("{self:?}"),
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(value.into())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Value::Binary(value.to_vec())
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Binary(value)
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

/// The host level type a result column decodes into, or a parameter is bound as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Number,
    Boolean,
    Text,
    Binary,
}

impl ValueKind {
    /// Maps the data type a driver reports for a column or parameter to the kind of value it is
    /// exchanged as. Unlisted types, including driver specific ones, are exchanged as text.
    pub fn from_sql_type(data_type: SqlDataType) -> Self {
        match data_type.0 {
            // NUMERIC, DECIMAL, INTEGER, SMALLINT, FLOAT, REAL, DOUBLE
            2..=8
            // BIGINT, TINYINT
            | -5 | -6
            // SQL_INTERVAL_YEAR ..= SQL_INTERVAL_MINUTE_TO_SECOND
            | 101..=113 => ValueKind::Number,
            // BIT
            -7 => ValueKind::Boolean,
            // BINARY, VARBINARY, LONGVARBINARY
            -2 | -3 | -4 => ValueKind::Binary,
            // CHAR, VARCHAR, LONGVARCHAR, WCHAR, WVARCHAR, WLONGVARCHAR, DATE, TIME, TIMESTAMP,
            // GUID, the generic INTERVAL, UNKNOWN and everything else.
            _ => ValueKind::Text,
        }
    }

    /// `true` for kinds which are bound through a byte buffer.
    pub fn is_buffered(self) -> bool {
        matches!(self, ValueKind::Text | ValueKind::Binary)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ValueKind::Number => "number",
            ValueKind::Boolean => "boolean",
            ValueKind::Text => "string",
            ValueKind::Binary => "binary",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
