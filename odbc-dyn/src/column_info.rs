use crate::{
    Error, ValueKind,
    handles::{ColumnDescription, Statement},
};

/// Names and value kinds of the columns of the current result set. Computed once per result set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ColumnInfo {
    names: Vec<String>,
    kinds: Vec<ValueKind>,
}

impl ColumnInfo {
    /// Asks the statement for the number of result columns and describes each of them. An empty
    /// info is returned for statements without a result set.
    pub fn describe(stmt: &impl Statement) -> Result<Self, Error> {
        let num_cols = stmt.num_result_cols().into_result(stmt)?;
        let num_cols = u16::try_from(num_cols).unwrap_or(0);
        let mut info = ColumnInfo {
            names: Vec::with_capacity(num_cols.into()),
            kinds: Vec::with_capacity(num_cols.into()),
        };
        let mut description = ColumnDescription::default();
        for column_number in 1..=num_cols {
            stmt.describe_col(column_number, &mut description)
                .into_result(stmt)?;
            info.names.push(description.name_to_string());
            info.kinds
                .push(ValueKind::from_sql_type(description.data_type));
        }
        Ok(info)
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn kinds(&self) -> &[ValueKind] {
        &self.kinds
    }

    pub fn clear(&mut self) {
        self.names.clear();
        self.kinds.clear();
    }
}
