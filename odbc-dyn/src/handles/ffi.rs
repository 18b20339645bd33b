//! Declarations of ODBC functions which take plain integers for their attribute, information type
//! or function id arguments. `odbc-sys` models these arguments as enums with a closed set of
//! variants, yet the passthrough getters and setters must accept any identifier a driver
//! understands. The symbols resolve against the driver manager `odbc-sys` links.
//!
//! Also declares the catalog functions which are not part of `odbc-sys`.
#![allow(clashing_extern_declarations)]

use odbc_sys::{HDbc, HEnv, HStmt, Pointer, SqlReturn};

unsafe extern "system" {
    pub fn SQLGetInfo(
        connection_handle: HDbc,
        info_type: u16,
        info_value_ptr: Pointer,
        buffer_length: i16,
        string_length_ptr: *mut i16,
    ) -> SqlReturn;

    pub fn SQLGetFunctions(
        connection_handle: HDbc,
        function_id: u16,
        supported_ptr: *mut u16,
    ) -> SqlReturn;

    pub fn SQLGetEnvAttr(
        environment_handle: HEnv,
        attribute: i32,
        value_ptr: Pointer,
        buffer_length: i32,
        string_length: *mut i32,
    ) -> SqlReturn;

    pub fn SQLSetEnvAttr(
        environment_handle: HEnv,
        attribute: i32,
        value: Pointer,
        string_length: i32,
    ) -> SqlReturn;

    pub fn SQLGetConnectAttr(
        connection_handle: HDbc,
        attribute: i32,
        value_ptr: Pointer,
        buffer_length: i32,
        string_length_ptr: *mut i32,
    ) -> SqlReturn;

    pub fn SQLSetConnectAttr(
        connection_handle: HDbc,
        attribute: i32,
        value_ptr: Pointer,
        string_length: i32,
    ) -> SqlReturn;

    pub fn SQLGetStmtAttr(
        statement_handle: HStmt,
        attribute: i32,
        value_ptr: Pointer,
        buffer_length: i32,
        string_length: *mut i32,
    ) -> SqlReturn;

    pub fn SQLSetStmtAttr(
        statement_handle: HStmt,
        attribute: i32,
        value: Pointer,
        string_length: i32,
    ) -> SqlReturn;

    pub fn SQLGetTypeInfo(statement_handle: HStmt, data_type: i16) -> SqlReturn;

    pub fn SQLStatistics(
        statement_handle: HStmt,
        catalog_name: *const u8,
        name_length_1: i16,
        schema_name: *const u8,
        name_length_2: i16,
        table_name: *const u8,
        name_length_3: i16,
        unique: u16,
        reserved: u16,
    ) -> SqlReturn;

    pub fn SQLTablePrivileges(
        statement_handle: HStmt,
        catalog_name: *const u8,
        name_length_1: i16,
        schema_name: *const u8,
        name_length_2: i16,
        table_name: *const u8,
        name_length_3: i16,
    ) -> SqlReturn;

    pub fn SQLColumnPrivileges(
        statement_handle: HStmt,
        catalog_name: *const u8,
        name_length_1: i16,
        schema_name: *const u8,
        name_length_2: i16,
        table_name: *const u8,
        name_length_3: i16,
        column_name: *const u8,
        name_length_4: i16,
    ) -> SqlReturn;

    pub fn SQLProcedures(
        statement_handle: HStmt,
        catalog_name: *const u8,
        name_length_1: i16,
        schema_name: *const u8,
        name_length_2: i16,
        proc_name: *const u8,
        name_length_3: i16,
    ) -> SqlReturn;

    pub fn SQLProcedureColumns(
        statement_handle: HStmt,
        catalog_name: *const u8,
        name_length_1: i16,
        schema_name: *const u8,
        name_length_2: i16,
        proc_name: *const u8,
        name_length_3: i16,
        column_name: *const u8,
        name_length_4: i16,
    ) -> SqlReturn;

    pub fn SQLSpecialColumns(
        statement_handle: HStmt,
        identifier_type: u16,
        catalog_name: *const u8,
        name_length_1: i16,
        schema_name: *const u8,
        name_length_2: i16,
        table_name: *const u8,
        name_length_3: i16,
        scope: u16,
        nullable: u16,
    ) -> SqlReturn;
}
