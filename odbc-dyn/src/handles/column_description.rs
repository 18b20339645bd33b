use odbc_sys::SqlDataType;

/// Describes the type and attributes of a column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnDescription {
    /// Column name. May be empty if unavailable. Narrow text as reported by the driver, without
    /// terminating zero.
    pub name: Vec<u8>,
    /// Type of the column
    pub data_type: SqlDataType,
    /// Size of the column in characters or bytes, depending on the type.
    pub column_size: usize,
    /// Number of digits after the decimal point, for exact numeric types.
    pub decimal_digits: i16,
}

impl Default for ColumnDescription {
    fn default() -> Self {
        Self {
            name: Vec::new(),
            data_type: SqlDataType::UNKNOWN_TYPE,
            column_size: 0,
            decimal_digits: 0,
        }
    }
}

impl ColumnDescription {
    /// Column name as a string. Invalid UTF-8 is replaced.
    pub fn name_to_string(&self) -> String {
        String::from_utf8_lossy(&self.name).into_owned()
    }
}
