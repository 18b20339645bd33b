//! Catalog functions of a [`Connection`]. Each runs on a statement handle of its own and returns a
//! cursor over the result set described in the ODBC reference for the function.
//!
//! Name arguments of `None` are passed as null pointers. Depending on the function and the
//! `SQL_ATTR_METADATA_ID` statement attribute, drivers treat them as wildcards, or require them.

use odbc_sys::SqlDataType;

use crate::{Connection, Cursor, Error, Execution};

/// Which columns [`Connection::special_columns`] asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialColumns {
    /// Optimal set of columns to uniquely identify a row (`SQL_BEST_ROWID`).
    BestRowId,
    /// Columns updated automatically by the data source if any value in the row is updated
    /// (`SQL_ROWVER`).
    RowVersion,
}

/// How long a row identifier returned by [`Connection::special_columns`] must stay valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowIdScope {
    /// Only while positioned on the row (`SQL_SCOPE_CURROW`).
    CurrentRow,
    /// For the remainder of the transaction (`SQL_SCOPE_TRANSACTION`).
    Transaction,
    /// For the remainder of the session (`SQL_SCOPE_SESSION`).
    Session,
}

impl Connection {
    /// Tables, views and other table like objects in the data source.
    ///
    /// ```no_run
    /// # fn list(conn: &odbc_dyn::Connection) -> Result<(), odbc_dyn::Error> {
    /// use odbc_dyn::FetchMode;
    ///
    /// if let Some(mut cursor) = conn.tables(None, None, Some("%"), Some("TABLE"))?.into_result_set() {
    ///     cursor.for_each(FetchMode::Named, true, |row| {
    ///         println!("{:?}", row.by_name("TABLE_NAME"));
    ///         Ok::<_, odbc_dyn::Error>(None::<()>)
    ///     })?;
    /// }
    /// # Ok(()) }
    /// ```
    pub fn tables(
        &self,
        catalog: Option<&str>,
        schema: Option<&str>,
        table: Option<&str>,
        table_type: Option<&str>,
    ) -> Result<Execution<Cursor>, Error> {
        self.run_catalog(|stmt| stmt.tables(catalog, schema, table, table_type))
    }

    pub fn columns(
        &self,
        catalog: Option<&str>,
        schema: Option<&str>,
        table: Option<&str>,
        column: Option<&str>,
    ) -> Result<Execution<Cursor>, Error> {
        self.run_catalog(|stmt| stmt.columns(catalog, schema, table, column))
    }

    /// Statistics about a table and its indices.
    ///
    /// * `unique`: Only unique indices if `true`, all indices otherwise.
    /// * `quick`: Allows the driver to report cardinality and pages only if readily available.
    pub fn statistics(
        &self,
        catalog: Option<&str>,
        schema: Option<&str>,
        table: Option<&str>,
        unique: bool,
        quick: bool,
    ) -> Result<Execution<Cursor>, Error> {
        self.run_catalog(|stmt| stmt.statistics(catalog, schema, table, unique, quick))
    }

    pub fn table_privileges(
        &self,
        catalog: Option<&str>,
        schema: Option<&str>,
        table: Option<&str>,
    ) -> Result<Execution<Cursor>, Error> {
        self.run_catalog(|stmt| stmt.table_privileges(catalog, schema, table))
    }

    pub fn column_privileges(
        &self,
        catalog: Option<&str>,
        schema: Option<&str>,
        table: Option<&str>,
        column: Option<&str>,
    ) -> Result<Execution<Cursor>, Error> {
        self.run_catalog(|stmt| stmt.column_privileges(catalog, schema, table, column))
    }

    pub fn primary_keys(
        &self,
        catalog: Option<&str>,
        schema: Option<&str>,
        table: Option<&str>,
    ) -> Result<Execution<Cursor>, Error> {
        self.run_catalog(|stmt| stmt.primary_keys(catalog, schema, table))
    }

    /// Foreign keys referencing the primary key of the first table, foreign keys of the second
    /// table, or, if both are given, the foreign keys of the second table referencing the first
    /// one.
    #[allow(clippy::too_many_arguments)]
    pub fn foreign_keys(
        &self,
        pk_catalog: Option<&str>,
        pk_schema: Option<&str>,
        pk_table: Option<&str>,
        fk_catalog: Option<&str>,
        fk_schema: Option<&str>,
        fk_table: Option<&str>,
    ) -> Result<Execution<Cursor>, Error> {
        self.run_catalog(|stmt| {
            stmt.foreign_keys(pk_catalog, pk_schema, pk_table, fk_catalog, fk_schema, fk_table)
        })
    }

    pub fn procedures(
        &self,
        catalog: Option<&str>,
        schema: Option<&str>,
        procedure: Option<&str>,
    ) -> Result<Execution<Cursor>, Error> {
        self.run_catalog(|stmt| stmt.procedures(catalog, schema, procedure))
    }

    /// Input and output parameters, as well as the result columns of procedures.
    pub fn procedure_columns(
        &self,
        catalog: Option<&str>,
        schema: Option<&str>,
        procedure: Option<&str>,
        column: Option<&str>,
    ) -> Result<Execution<Cursor>, Error> {
        self.run_catalog(|stmt| stmt.procedure_columns(catalog, schema, procedure, column))
    }

    /// Columns identifying a row, or columns updated automatically with any update of the row.
    ///
    /// * `nullable`: Whether columns which may be `NULL` are reported, too.
    pub fn special_columns(
        &self,
        kind: SpecialColumns,
        catalog: Option<&str>,
        schema: Option<&str>,
        table: Option<&str>,
        scope: RowIdScope,
        nullable: bool,
    ) -> Result<Execution<Cursor>, Error> {
        let identifier_type = match kind {
            SpecialColumns::BestRowId => 1,
            SpecialColumns::RowVersion => 2,
        };
        let scope = match scope {
            RowIdScope::CurrentRow => 0,
            RowIdScope::Transaction => 1,
            RowIdScope::Session => 2,
        };
        let nullable = u16::from(nullable);
        self.run_catalog(|stmt| {
            stmt.special_columns(identifier_type, catalog, schema, table, scope, nullable)
        })
    }

    /// Data types supported by the data source. `None` lists all of them.
    pub fn type_info(&self, data_type: Option<SqlDataType>) -> Result<Execution<Cursor>, Error> {
        // SQL_ALL_TYPES
        let data_type = data_type.map_or(0, |data_type| data_type.0);
        self.run_catalog(|stmt| stmt.type_info(data_type))
    }
}
