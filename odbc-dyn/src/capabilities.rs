//! Named capabilities of a data source, answered by `SQLGetInfo`.
//!
//! Each entry of [`CAPABILITIES`] names an info type and describes how to turn the raw answer of
//! the driver into a [`Value`]. Flags derived from enumerations or bitmasks become
//! [`Value::Boolean`], counts and masks [`Value::Number`] and strings [`Value::Text`].

use odbc_sys::SqlDataType;

use crate::{CursorType, DriverInfo, Error, TransactionIsolation, Value};

/// Access to `SQLGetInfo`. Implemented by connections, and by fakes in tests.
pub(crate) trait InfoSource {
    fn info_u16(&self, info_type: u16) -> Result<u16, Error>;

    fn info_u32(&self, info_type: u16) -> Result<u32, Error>;

    fn info_string(&self, info_type: u16) -> Result<String, Error>;

    /// `SQLGetFunctions` with `SQL_API_ODBC3_ALL_FUNCTIONS`.
    fn supported_functions(&self) -> Result<Vec<u16>, Error>;
}

/// How the answer to an info type is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoder {
    /// Character string.
    Text,
    /// 16 Bit integer, reported as number.
    U16,
    /// 32 Bit integer or bitmask, reported as number.
    U32,
    /// `true` if the 16 Bit answer equals the value.
    U16Equals(u16),
    /// `true` unless the 16 Bit answer equals the value.
    U16NotEquals(u16),
    /// `true` if any of the bits is set in the 32 Bit answer.
    U32Mask(u32),
    /// `true` if the string answer starts with the character, usually `'Y'`.
    CharEquals(u8),
    /// `true` unless the string answer starts with the character.
    CharNotEquals(u8),
    /// Comma separated names of the bits set in the 32 Bit answer, e.g. `"ABS,FLOOR"`.
    Names(&'static [(u32, &'static str)]),
    /// Answered without asking the driver.
    Constant(bool),
}

impl Decoder {
    pub(crate) fn decode(self, source: &impl InfoSource, info_type: u16) -> Result<Value, Error> {
        let value = match self {
            Decoder::Text => Value::Text(source.info_string(info_type)?),
            Decoder::U16 => Value::Number(source.info_u16(info_type)?.into()),
            Decoder::U32 => Value::Number(source.info_u32(info_type)?.into()),
            Decoder::U16Equals(expected) => Value::Boolean(source.info_u16(info_type)? == expected),
            Decoder::U16NotEquals(expected) => {
                Value::Boolean(source.info_u16(info_type)? != expected)
            }
            Decoder::U32Mask(bits) => Value::Boolean(source.info_u32(info_type)? & bits != 0),
            Decoder::CharEquals(expected) => Value::Boolean(
                source.info_string(info_type)?.as_bytes().first() == Some(&expected),
            ),
            Decoder::CharNotEquals(expected) => Value::Boolean(
                source.info_string(info_type)?.as_bytes().first() != Some(&expected),
            ),
            Decoder::Names(names) => {
                let mask = source.info_u32(info_type)?;
                let set: Vec<_> = names
                    .iter()
                    .filter(|(bit, _)| mask & bit != 0)
                    .map(|(_, name)| *name)
                    .collect();
                Value::Text(set.join(","))
            }
            Decoder::Constant(answer) => Value::Boolean(answer),
        };
        Ok(value)
    }
}

/// A named question about the data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capability {
    pub name: &'static str,
    /// `SQL_*` info type passed to `SQLGetInfo`.
    pub info_type: u16,
    pub decoder: Decoder,
}

const fn cap(name: &'static str, info_type: u16, decoder: Decoder) -> Capability {
    Capability {
        name,
        info_type,
        decoder,
    }
}

// Info types
const MAX_DRIVER_CONNECTIONS: u16 = 0;
const MAX_CONCURRENT_ACTIVITIES: u16 = 1;
const ACCESSIBLE_TABLES: u16 = 19;
const ACCESSIBLE_PROCEDURES: u16 = 20;
const DATA_SOURCE_NAME: u16 = 2;
const SERVER_NAME: u16 = 13;
const SEARCH_PATTERN_ESCAPE: u16 = 14;
const ODBC_SQL_CONFORMANCE: u16 = 15;
const DATABASE_NAME: u16 = 16;
const PROCEDURES: u16 = 21;
const CONCAT_NULL_BEHAVIOR: u16 = 22;
const CURSOR_COMMIT_BEHAVIOR: u16 = 23;
const CURSOR_ROLLBACK_BEHAVIOR: u16 = 24;
const DATA_SOURCE_READ_ONLY: u16 = 25;
const DEFAULT_TXN_ISOLATION: u16 = 26;
const EXPRESSIONS_IN_ORDERBY: u16 = 27;
const IDENTIFIER_CASE: u16 = 28;
const IDENTIFIER_QUOTE_CHAR: u16 = 29;
const MAX_COLUMN_NAME_LEN: u16 = 30;
const MAX_CURSOR_NAME_LEN: u16 = 31;
const MAX_SCHEMA_NAME_LEN: u16 = 32;
const MAX_PROCEDURE_NAME_LEN: u16 = 33;
const MAX_CATALOG_NAME_LEN: u16 = 34;
const MAX_TABLE_NAME_LEN: u16 = 35;
const MULT_RESULT_SETS: u16 = 36;
const MULTIPLE_ACTIVE_TXN: u16 = 37;
const SCHEMA_TERM: u16 = 39;
const PROCEDURE_TERM: u16 = 40;
const CATALOG_NAME_SEPARATOR: u16 = 41;
const CATALOG_TERM: u16 = 42;
const TABLE_TERM: u16 = 45;
pub(crate) const TXN_CAPABLE: u16 = 46;
const USER_NAME: u16 = 47;
const CONVERT_FUNCTIONS: u16 = 48;
const NUMERIC_FUNCTIONS: u16 = 49;
const STRING_FUNCTIONS: u16 = 50;
const SYSTEM_FUNCTIONS: u16 = 51;
const TIMEDATE_FUNCTIONS: u16 = 52;
const TXN_ISOLATION_OPTION: u16 = 72;
const CORRELATION_NAME: u16 = 74;
const NON_NULLABLE_COLUMNS: u16 = 75;
const STATIC_SENSITIVITY: u16 = 83;
const FILE_USAGE: u16 = 84;
const NULL_COLLATION: u16 = 85;
const ALTER_TABLE: u16 = 86;
const COLUMN_ALIAS: u16 = 87;
const GROUP_BY: u16 = 88;
const KEYWORDS: u16 = 89;
const ORDER_BY_COLUMNS_IN_SELECT: u16 = 90;
const SCHEMA_USAGE: u16 = 91;
const CATALOG_USAGE: u16 = 92;
const QUOTED_IDENTIFIER_CASE: u16 = 93;
const SPECIAL_CHARACTERS: u16 = 94;
const SUBQUERIES: u16 = 95;
const UNION: u16 = 96;
const MAX_COLUMNS_IN_GROUP_BY: u16 = 97;
const MAX_COLUMNS_IN_INDEX: u16 = 98;
const MAX_COLUMNS_IN_ORDER_BY: u16 = 99;
const MAX_COLUMNS_IN_SELECT: u16 = 100;
const MAX_COLUMNS_IN_TABLE: u16 = 101;
const MAX_INDEX_SIZE: u16 = 102;
const MAX_ROW_SIZE_INCLUDES_LONG: u16 = 103;
const MAX_ROW_SIZE: u16 = 104;
const MAX_STATEMENT_LEN: u16 = 105;
const MAX_TABLES_IN_SELECT: u16 = 106;
const MAX_USER_NAME_LEN: u16 = 107;
const MAX_CHAR_LITERAL_LEN: u16 = 108;
const MAX_BINARY_LITERAL_LEN: u16 = 112;
const LIKE_ESCAPE_CLAUSE: u16 = 113;
const CATALOG_LOCATION: u16 = 114;
const OJ_CAPABILITIES: u16 = 115;
const SQL_CONFORMANCE: u16 = 118;
const CATALOG_NAME: u16 = 10003;

// SQL_TXN_CAPABLE
pub(crate) const TC_NONE: u16 = 0;
const TC_DML: u16 = 1;
const TC_ALL: u16 = 2;
const TC_DDL_COMMIT: u16 = 3;
const TC_DDL_IGNORE: u16 = 4;

// SQL_CATALOG_USAGE, SQL_SCHEMA_USAGE
const USAGE_DML_STATEMENTS: u32 = 0x01;
const USAGE_PROCEDURE_INVOCATION: u32 = 0x02;
const USAGE_TABLE_DEFINITION: u32 = 0x04;
const USAGE_INDEX_DEFINITION: u32 = 0x08;
const USAGE_PRIVILEGE_DEFINITION: u32 = 0x10;

// SQL_GROUP_BY
const GB_NOT_SUPPORTED: u16 = 0;
const GB_GROUP_BY_CONTAINS_SELECT: u16 = 2;
const GB_NO_RELATION: u16 = 3;

// SQL_OJ_CAPABILITIES
const OJ_LEFT: u32 = 0x01;
const OJ_RIGHT: u32 = 0x02;
const OJ_FULL: u32 = 0x04;
const OJ_NESTED: u32 = 0x08;

// SQL_SUBQUERIES
const SQ_COMPARISON: u32 = 0x01;
const SQ_EXISTS: u32 = 0x02;
const SQ_IN: u32 = 0x04;
const SQ_QUANTIFIED: u32 = 0x08;
const SQ_CORRELATED_SUBQUERIES: u32 = 0x10;

// SQL_NULL_COLLATION
const NC_HIGH: u16 = 0;
const NC_LOW: u16 = 1;
const NC_START: u16 = 2;
const NC_END: u16 = 4;

// SQL_CURSOR_COMMIT_BEHAVIOR, SQL_CURSOR_ROLLBACK_BEHAVIOR
const CB_PRESERVE: u16 = 2;

// SQL_CONCAT_NULL_BEHAVIOR
const CB_NULL: u16 = 0;

// SQL_IDENTIFIER_CASE, SQL_QUOTED_IDENTIFIER_CASE
const IC_UPPER: u16 = 1;
const IC_LOWER: u16 = 2;
const IC_SENSITIVE: u16 = 3;
const IC_MIXED: u16 = 4;

// SQL_CORRELATION_NAME
const CN_NONE: u16 = 0;
const CN_DIFFERENT: u16 = 1;

// SQL_ODBC_SQL_CONFORMANCE
const OSC_MINIMUM: u16 = 0;
const OSC_EXTENDED: u16 = 2;

// SQL_SQL_CONFORMANCE
const SC_SQL92_ENTRY: u32 = 0x01;
const SC_FIPS127_2_TRANSITIONAL: u32 = 0x02;
const SC_SQL92_INTERMEDIATE: u32 = 0x04;
const SC_SQL92_FULL: u32 = 0x08;

// SQL_ALTER_TABLE
const AT_ADD_COLUMN: u32 = 0x01;
const AT_DROP_COLUMN: u32 = 0x02;

// SQL_CONVERT_FUNCTIONS
const FN_CVT_CONVERT: u32 = 0x01;

// SQL_TXN_ISOLATION_OPTION. Versioning is the ODBC 2 name of serializable isolation.
const TXN_VERSIONING: u32 = 0x10;

// SQL_STATIC_SENSITIVITY
const SS_ADDITIONS: u32 = 0x01;
const SS_DELETIONS: u32 = 0x02;
const SS_UPDATES: u32 = 0x04;

// SQL_*_CURSOR_ATTRIBUTES2
const CA2_SENSITIVITY_ADDITIONS: u32 = 0x10;
const CA2_SENSITIVITY_DELETIONS: u32 = 0x20;
const CA2_SENSITIVITY_UPDATES: u32 = 0x40;

static NUMERIC_FUNCTION_NAMES: &[(u32, &str)] = &[
    (0x01, "ABS"),
    (0x02, "ACOS"),
    (0x04, "ASIN"),
    (0x08, "ATAN"),
    (0x10, "ATAN2"),
    (0x20, "CEILING"),
    (0x40, "COS"),
    (0x80, "COT"),
    (0x100, "EXP"),
    (0x200, "FLOOR"),
    (0x400, "LOG"),
    (0x800, "MOD"),
    (0x1000, "SIGN"),
    (0x2000, "SIN"),
    (0x4000, "SQRT"),
    (0x8000, "TAN"),
    (0x10000, "PI"),
    (0x20000, "RAND"),
    (0x40000, "DEGREES"),
    (0x80000, "LOG10"),
    (0x100000, "POWER"),
    (0x200000, "RADIANS"),
    (0x400000, "ROUND"),
    (0x800000, "TRUNCATE"),
];

static STRING_FUNCTION_NAMES: &[(u32, &str)] = &[
    (0x01, "CONCAT"),
    (0x02, "INSERT"),
    (0x04, "LEFT"),
    (0x08, "LTRIM"),
    (0x10, "LENGTH"),
    (0x20, "LOCATE"),
    (0x40, "LCASE"),
    (0x80, "REPEAT"),
    (0x100, "REPLACE"),
    (0x200, "RIGHT"),
    (0x400, "RTRIM"),
    (0x800, "SUBSTRING"),
    (0x1000, "UCASE"),
    (0x2000, "ASCII"),
    (0x4000, "CHAR"),
    (0x8000, "DIFFERENCE"),
    (0x10000, "LOCATE_2"),
    (0x20000, "SOUNDEX"),
    (0x40000, "SPACE"),
    (0x80000, "BIT_LENGTH"),
    (0x100000, "CHAR_LENGTH"),
    (0x200000, "CHARACTER_LENGTH"),
    (0x400000, "OCTET_LENGTH"),
    (0x800000, "POSITION"),
];

static SYSTEM_FUNCTION_NAMES: &[(u32, &str)] =
    &[(0x01, "USERNAME"), (0x02, "DBNAME"), (0x04, "IFNULL")];

static TIMEDATE_FUNCTION_NAMES: &[(u32, &str)] = &[
    (0x01, "NOW"),
    (0x02, "CURDATE"),
    (0x04, "DAYOFMONTH"),
    (0x08, "DAYOFWEEK"),
    (0x10, "DAYOFYEAR"),
    (0x20, "MONTH"),
    (0x40, "QUARTER"),
    (0x80, "WEEK"),
    (0x100, "YEAR"),
    (0x200, "CURTIME"),
    (0x400, "HOUR"),
    (0x800, "MINUTE"),
    (0x1000, "SECOND"),
    (0x2000, "TIMESTAMPADD"),
    (0x4000, "TIMESTAMPDIFF"),
    (0x8000, "DAYNAME"),
    (0x10000, "MONTHNAME"),
    (0x20000, "CURRENT_DATE"),
    (0x40000, "CURRENT_TIME"),
    (0x80000, "CURRENT_TIMESTAMP"),
    (0x100000, "EXTRACT"),
];

/// Every capability known to [`crate::Connection::capability`].
pub static CAPABILITIES: &[Capability] = &[
    // Names and terms
    cap("data_source_name", DATA_SOURCE_NAME, Decoder::Text),
    cap("server_name", SERVER_NAME, Decoder::Text),
    cap("database_name", DATABASE_NAME, Decoder::Text),
    cap("user_name", USER_NAME, Decoder::Text),
    cap("identifier_quote_string", IDENTIFIER_QUOTE_CHAR, Decoder::Text),
    cap("search_string_escape", SEARCH_PATTERN_ESCAPE, Decoder::Text),
    cap("extra_name_characters", SPECIAL_CHARACTERS, Decoder::Text),
    cap("catalog_term", CATALOG_TERM, Decoder::Text),
    cap("schema_term", SCHEMA_TERM, Decoder::Text),
    cap("table_term", TABLE_TERM, Decoder::Text),
    cap("procedure_term", PROCEDURE_TERM, Decoder::Text),
    cap("catalog_separator", CATALOG_NAME_SEPARATOR, Decoder::Text),
    cap("sql_keywords", KEYWORDS, Decoder::Text),
    cap("is_catalog_name", CATALOG_NAME, Decoder::CharEquals(b'Y')),
    cap("is_catalog_at_start", CATALOG_LOCATION, Decoder::U16Equals(1)),
    // Transactions
    cap("supports_transactions", TXN_CAPABLE, Decoder::U16NotEquals(TC_NONE)),
    cap(
        "supports_data_definition_and_data_manipulation_transactions",
        TXN_CAPABLE,
        Decoder::U16Equals(TC_ALL),
    ),
    cap(
        "supports_data_manipulation_transactions_only",
        TXN_CAPABLE,
        Decoder::U16Equals(TC_DML),
    ),
    cap(
        "data_definition_causes_transaction_commit",
        TXN_CAPABLE,
        Decoder::U16Equals(TC_DDL_COMMIT),
    ),
    cap(
        "data_definition_ignored_in_transactions",
        TXN_CAPABLE,
        Decoder::U16Equals(TC_DDL_IGNORE),
    ),
    cap("default_transaction_isolation", DEFAULT_TXN_ISOLATION, Decoder::U32),
    cap("transaction_isolation_options", TXN_ISOLATION_OPTION, Decoder::U32),
    cap(
        "supports_open_cursors_across_commit",
        CURSOR_COMMIT_BEHAVIOR,
        Decoder::U16Equals(CB_PRESERVE),
    ),
    cap(
        "supports_open_statements_across_commit",
        CURSOR_COMMIT_BEHAVIOR,
        Decoder::U16Equals(CB_PRESERVE),
    ),
    cap(
        "supports_open_cursors_across_rollback",
        CURSOR_ROLLBACK_BEHAVIOR,
        Decoder::U16Equals(CB_PRESERVE),
    ),
    cap(
        "supports_open_statements_across_rollback",
        CURSOR_ROLLBACK_BEHAVIOR,
        Decoder::U16Equals(CB_PRESERVE),
    ),
    cap("supports_multiple_transactions", MULTIPLE_ACTIVE_TXN, Decoder::CharEquals(b'Y')),
    // Catalog and schema usage
    cap(
        "supports_catalogs_in_data_manipulation",
        CATALOG_USAGE,
        Decoder::U32Mask(USAGE_DML_STATEMENTS),
    ),
    cap(
        "supports_catalogs_in_procedure_calls",
        CATALOG_USAGE,
        Decoder::U32Mask(USAGE_PROCEDURE_INVOCATION),
    ),
    cap(
        "supports_catalogs_in_table_definitions",
        CATALOG_USAGE,
        Decoder::U32Mask(USAGE_TABLE_DEFINITION),
    ),
    cap(
        "supports_catalogs_in_index_definitions",
        CATALOG_USAGE,
        Decoder::U32Mask(USAGE_INDEX_DEFINITION),
    ),
    cap(
        "supports_catalogs_in_privilege_definitions",
        CATALOG_USAGE,
        Decoder::U32Mask(USAGE_PRIVILEGE_DEFINITION),
    ),
    cap(
        "supports_schemas_in_data_manipulation",
        SCHEMA_USAGE,
        Decoder::U32Mask(USAGE_DML_STATEMENTS),
    ),
    cap(
        "supports_schemas_in_procedure_calls",
        SCHEMA_USAGE,
        Decoder::U32Mask(USAGE_PROCEDURE_INVOCATION),
    ),
    cap(
        "supports_schemas_in_table_definitions",
        SCHEMA_USAGE,
        Decoder::U32Mask(USAGE_TABLE_DEFINITION),
    ),
    cap(
        "supports_schemas_in_index_definitions",
        SCHEMA_USAGE,
        Decoder::U32Mask(USAGE_INDEX_DEFINITION),
    ),
    cap(
        "supports_schemas_in_privilege_definitions",
        SCHEMA_USAGE,
        Decoder::U32Mask(USAGE_PRIVILEGE_DEFINITION),
    ),
    // SQL grammar
    cap("supports_group_by", GROUP_BY, Decoder::U16NotEquals(GB_NOT_SUPPORTED)),
    cap("supports_group_by_unrelated", GROUP_BY, Decoder::U16Equals(GB_NO_RELATION)),
    cap(
        "supports_group_by_beyond_select",
        GROUP_BY,
        Decoder::U16Equals(GB_GROUP_BY_CONTAINS_SELECT),
    ),
    cap("supports_union", UNION, Decoder::U32Mask(0x01)),
    cap("supports_union_all", UNION, Decoder::U32Mask(0x02)),
    cap(
        "supports_outer_joins",
        OJ_CAPABILITIES,
        Decoder::U32Mask(OJ_LEFT | OJ_RIGHT | OJ_FULL | OJ_NESTED),
    ),
    cap(
        "supports_full_outer_joins",
        OJ_CAPABILITIES,
        Decoder::U32Mask(OJ_FULL | OJ_NESTED),
    ),
    cap(
        "supports_limited_outer_joins",
        OJ_CAPABILITIES,
        Decoder::U32Mask(OJ_LEFT | OJ_RIGHT | OJ_FULL | OJ_NESTED),
    ),
    cap(
        "supports_correlated_subqueries",
        SUBQUERIES,
        Decoder::U32Mask(SQ_CORRELATED_SUBQUERIES),
    ),
    cap("supports_subqueries_in_comparisons", SUBQUERIES, Decoder::U32Mask(SQ_COMPARISON)),
    cap("supports_subqueries_in_exists", SUBQUERIES, Decoder::U32Mask(SQ_EXISTS)),
    cap("supports_subqueries_in_ins", SUBQUERIES, Decoder::U32Mask(SQ_IN)),
    cap("supports_subqueries_in_quantifieds", SUBQUERIES, Decoder::U32Mask(SQ_QUANTIFIED)),
    cap(
        "supports_table_correlation_names",
        CORRELATION_NAME,
        Decoder::U16NotEquals(CN_NONE),
    ),
    cap(
        "supports_different_table_correlation_names",
        CORRELATION_NAME,
        Decoder::U16Equals(CN_DIFFERENT),
    ),
    cap("supports_column_aliasing", COLUMN_ALIAS, Decoder::CharEquals(b'Y')),
    cap(
        "supports_order_by_unrelated",
        ORDER_BY_COLUMNS_IN_SELECT,
        Decoder::CharNotEquals(b'Y'),
    ),
    cap(
        "supports_alter_table_with_add_column",
        ALTER_TABLE,
        Decoder::U32Mask(AT_ADD_COLUMN),
    ),
    cap(
        "supports_alter_table_with_drop_column",
        ALTER_TABLE,
        Decoder::U32Mask(AT_DROP_COLUMN),
    ),
    cap("supports_convert_fn", CONVERT_FUNCTIONS, Decoder::U32Mask(FN_CVT_CONVERT)),
    cap("supports_stored_procedures", PROCEDURES, Decoder::CharEquals(b'Y')),
    cap(
        "null_plus_non_null_is_null",
        CONCAT_NULL_BEHAVIOR,
        Decoder::U16Equals(CB_NULL),
    ),
    cap(
        "supports_expressions_in_order_by",
        EXPRESSIONS_IN_ORDERBY,
        Decoder::CharEquals(b'Y'),
    ),
    cap("supports_like_escape_clause", LIKE_ESCAPE_CLAUSE, Decoder::CharEquals(b'Y')),
    cap("supports_multiple_result_sets", MULT_RESULT_SETS, Decoder::CharEquals(b'Y')),
    cap("supports_non_nullable_columns", NON_NULLABLE_COLUMNS, Decoder::U16Equals(1)),
    cap("supports_minimum_sql_grammar", ODBC_SQL_CONFORMANCE, Decoder::Constant(true)),
    cap(
        "supports_core_sql_grammar",
        ODBC_SQL_CONFORMANCE,
        Decoder::U16NotEquals(OSC_MINIMUM),
    ),
    cap(
        "supports_extended_sql_grammar",
        ODBC_SQL_CONFORMANCE,
        Decoder::U16Equals(OSC_EXTENDED),
    ),
    cap(
        "supports_ansi92_entry_level_sql",
        SQL_CONFORMANCE,
        Decoder::U32Mask(
            SC_SQL92_ENTRY | SC_FIPS127_2_TRANSITIONAL | SC_SQL92_INTERMEDIATE | SC_SQL92_FULL,
        ),
    ),
    cap(
        "supports_ansi92_intermediate_sql",
        SQL_CONFORMANCE,
        Decoder::U32Mask(SC_SQL92_INTERMEDIATE | SC_SQL92_FULL),
    ),
    cap("supports_ansi92_full_sql", SQL_CONFORMANCE, Decoder::U32Mask(SC_SQL92_FULL)),
    // Identifiers
    cap("stores_upper_case_identifiers", IDENTIFIER_CASE, Decoder::U16Equals(IC_UPPER)),
    cap("stores_lower_case_identifiers", IDENTIFIER_CASE, Decoder::U16Equals(IC_LOWER)),
    cap("stores_mixed_case_identifiers", IDENTIFIER_CASE, Decoder::U16Equals(IC_MIXED)),
    cap(
        "supports_mixed_case_identifiers",
        IDENTIFIER_CASE,
        Decoder::U16Equals(IC_SENSITIVE),
    ),
    cap(
        "stores_upper_case_quoted_identifiers",
        QUOTED_IDENTIFIER_CASE,
        Decoder::U16Equals(IC_UPPER),
    ),
    cap(
        "stores_lower_case_quoted_identifiers",
        QUOTED_IDENTIFIER_CASE,
        Decoder::U16Equals(IC_LOWER),
    ),
    cap(
        "stores_mixed_case_quoted_identifiers",
        QUOTED_IDENTIFIER_CASE,
        Decoder::U16Equals(IC_MIXED),
    ),
    cap(
        "supports_mixed_case_quoted_identifiers",
        QUOTED_IDENTIFIER_CASE,
        Decoder::U16Equals(IC_SENSITIVE),
    ),
    // Scalar functions
    cap("numeric_functions", NUMERIC_FUNCTIONS, Decoder::Names(NUMERIC_FUNCTION_NAMES)),
    cap("string_functions", STRING_FUNCTIONS, Decoder::Names(STRING_FUNCTION_NAMES)),
    cap("system_functions", SYSTEM_FUNCTIONS, Decoder::Names(SYSTEM_FUNCTION_NAMES)),
    cap("time_date_functions", TIMEDATE_FUNCTIONS, Decoder::Names(TIMEDATE_FUNCTION_NAMES)),
    // Storage and sorting
    cap("uses_local_file_per_table", FILE_USAGE, Decoder::U16Equals(1)),
    cap("uses_local_files", FILE_USAGE, Decoder::U16NotEquals(0)),
    cap("nulls_are_sorted_high", NULL_COLLATION, Decoder::U16Equals(NC_HIGH)),
    cap("nulls_are_sorted_low", NULL_COLLATION, Decoder::U16Equals(NC_LOW)),
    cap("nulls_are_sorted_at_start", NULL_COLLATION, Decoder::U16Equals(NC_START)),
    cap("nulls_are_sorted_at_end", NULL_COLLATION, Decoder::U16Equals(NC_END)),
    cap("all_procedures_are_callable", ACCESSIBLE_PROCEDURES, Decoder::CharEquals(b'Y')),
    cap("all_tables_are_selectable", ACCESSIBLE_TABLES, Decoder::CharEquals(b'Y')),
    cap("is_read_only", DATA_SOURCE_READ_ONLY, Decoder::CharEquals(b'Y')),
    // Limits, `0` if there is none or it is unknown
    cap("max_binary_literal_length", MAX_BINARY_LITERAL_LEN, Decoder::U32),
    cap("max_char_literal_length", MAX_CHAR_LITERAL_LEN, Decoder::U32),
    cap("max_column_name_length", MAX_COLUMN_NAME_LEN, Decoder::U16),
    cap("max_columns_in_group_by", MAX_COLUMNS_IN_GROUP_BY, Decoder::U16),
    cap("max_columns_in_index", MAX_COLUMNS_IN_INDEX, Decoder::U16),
    cap("max_columns_in_order_by", MAX_COLUMNS_IN_ORDER_BY, Decoder::U16),
    cap("max_columns_in_select", MAX_COLUMNS_IN_SELECT, Decoder::U16),
    cap("max_columns_in_table", MAX_COLUMNS_IN_TABLE, Decoder::U16),
    cap("max_cursor_name_length", MAX_CURSOR_NAME_LEN, Decoder::U16),
    cap("max_index_length", MAX_INDEX_SIZE, Decoder::U32),
    cap("max_schema_name_length", MAX_SCHEMA_NAME_LEN, Decoder::U16),
    cap("max_procedure_name_length", MAX_PROCEDURE_NAME_LEN, Decoder::U16),
    cap("max_catalog_name_length", MAX_CATALOG_NAME_LEN, Decoder::U16),
    cap("max_table_name_length", MAX_TABLE_NAME_LEN, Decoder::U16),
    cap("max_tables_in_select", MAX_TABLES_IN_SELECT, Decoder::U16),
    cap("max_user_name_length", MAX_USER_NAME_LEN, Decoder::U16),
    cap("max_connections", MAX_DRIVER_CONNECTIONS, Decoder::U16),
    cap("max_statements", MAX_CONCURRENT_ACTIVITIES, Decoder::U16),
    cap("max_row_size", MAX_ROW_SIZE, Decoder::U32),
    cap(
        "does_max_row_size_include_blobs",
        MAX_ROW_SIZE_INCLUDES_LONG,
        Decoder::CharEquals(b'Y'),
    ),
    cap("max_statement_length", MAX_STATEMENT_LEN, Decoder::U32),
];

/// Result set types as seen by an application. Each is backed by one of the cursor types of the
/// driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultSetType {
    ForwardOnly,
    /// Scrollable, does not reflect changes to the underlying rows.
    ScrollInsensitive,
    /// Scrollable, reflects changes to the underlying rows.
    ScrollSensitive,
}

impl ResultSetType {
    pub fn cursor_type(self, info: &DriverInfo) -> CursorType {
        match self {
            ResultSetType::ForwardOnly => CursorType::ForwardOnly,
            ResultSetType::ScrollInsensitive => CursorType::Static,
            ResultSetType::ScrollSensitive => info.scroll_sensitive_cursor(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Concurrency {
    ReadOnly,
    Updatable,
}

/// Kind of change made to the rows underlying an open result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowChange {
    Updates,
    Deletes,
    Inserts,
}

pub(crate) fn supports_isolation_level(
    source: &impl InfoSource,
    level: TransactionIsolation,
) -> Result<bool, Error> {
    let options = source.info_u32(TXN_ISOLATION_OPTION)?;
    let mut bits = level.as_u32();
    if level == TransactionIsolation::Serializable {
        bits |= TXN_VERSIONING;
    }
    Ok(options & bits != 0)
}

pub(crate) fn supports_result_set_type(info: &DriverInfo, result_set_type: ResultSetType) -> bool {
    match result_set_type {
        ResultSetType::ForwardOnly => info.supports_forward_only(),
        ResultSetType::ScrollInsensitive => info.supports_static(),
        ResultSetType::ScrollSensitive => info.supports_scroll_sensitive(),
    }
}

pub(crate) fn supports_result_set_concurrency(
    info: &DriverInfo,
    result_set_type: ResultSetType,
    concurrency: Concurrency,
) -> bool {
    if !supports_result_set_type(info, result_set_type) {
        return false;
    }
    // Forward only cursors are read only.
    if result_set_type == ResultSetType::ForwardOnly {
        return concurrency == Concurrency::ReadOnly;
    }
    let cursor = result_set_type.cursor_type(info);
    match concurrency {
        Concurrency::ReadOnly => info.supports_read_only(cursor),
        Concurrency::Updatable => info.supports_updatable(cursor),
    }
}

/// Whether a result set sees the changes made through itself. ODBC 3 drivers report this per
/// cursor type. For ODBC 2 drivers forward only cursors never and dynamic cursors always see
/// them, static and keyset driven cursors report their sensitivity.
pub(crate) fn own_changes_visible(
    source: &impl InfoSource,
    info: &DriverInfo,
    result_set_type: ResultSetType,
    change: RowChange,
) -> Result<bool, Error> {
    let cursor = result_set_type.cursor_type(info);
    if info.major_version >= 3 {
        let bit = match change {
            RowChange::Updates => CA2_SENSITIVITY_UPDATES,
            RowChange::Deletes => CA2_SENSITIVITY_DELETIONS,
            RowChange::Inserts => CA2_SENSITIVITY_ADDITIONS,
        };
        return Ok(info.attributes2(cursor) & bit != 0);
    }
    match cursor {
        CursorType::ForwardOnly => Ok(false),
        CursorType::Dynamic => Ok(true),
        CursorType::Static | CursorType::KeysetDriven => {
            let bit = match change {
                RowChange::Updates => SS_UPDATES,
                RowChange::Deletes => SS_DELETIONS,
                RowChange::Inserts => SS_ADDITIONS,
            };
            Ok(source.info_u32(STATIC_SENSITIVITY)? & bit != 0)
        }
    }
}

/// Only dynamic cursors see changes made by others.
pub(crate) fn others_changes_visible(info: &DriverInfo, result_set_type: ResultSetType) -> bool {
    result_set_type.cursor_type(info) == CursorType::Dynamic
}

/// Forward only result sets never detect changes. Scrollable ones always detect updates, and
/// detect deletions and insertions if they are visible to them.
pub(crate) fn changes_detected(
    source: &impl InfoSource,
    info: &DriverInfo,
    result_set_type: ResultSetType,
    change: RowChange,
) -> Result<bool, Error> {
    match (result_set_type, change) {
        (ResultSetType::ForwardOnly, _) => Ok(false),
        (_, RowChange::Updates) => Ok(true),
        _ => own_changes_visible(source, info, result_set_type, change),
    }
}

/// Whether `CONVERT` turns values of type `from` into values of type `to`.
pub(crate) fn supports_convert(
    source: &impl InfoSource,
    from: SqlDataType,
    to: SqlDataType,
) -> Result<bool, Error> {
    let (info_type, _) = conversion(from)?;
    let (_, bit) = conversion(to)?;
    Ok(source.info_u32(info_type)? & bit != 0)
}

/// `SQL_CONVERT_*` info type listing the targets of a data type, and its `SQL_CVT_*` bit.
fn conversion(data_type: SqlDataType) -> Result<(u16, u32), Error> {
    let entry = match data_type {
        SqlDataType::EXT_BIG_INT => (53, 0x4000),
        SqlDataType::EXT_BINARY => (54, 0x400),
        SqlDataType::EXT_BIT => (55, 0x1000),
        SqlDataType::CHAR => (56, 0x01),
        SqlDataType::DATE => (57, 0x8000),
        SqlDataType::DECIMAL => (58, 0x04),
        SqlDataType::DOUBLE => (59, 0x80),
        SqlDataType::FLOAT => (60, 0x20),
        SqlDataType::INTEGER => (61, 0x08),
        SqlDataType::EXT_LONG_VARCHAR => (62, 0x200),
        SqlDataType::NUMERIC => (63, 0x02),
        SqlDataType::REAL => (64, 0x40),
        SqlDataType::SMALLINT => (65, 0x10),
        SqlDataType::TIME => (66, 0x10000),
        SqlDataType::TIMESTAMP => (67, 0x20000),
        SqlDataType::EXT_TINY_INT => (68, 0x2000),
        SqlDataType::EXT_VAR_BINARY => (69, 0x800),
        SqlDataType::VARCHAR => (70, 0x100),
        SqlDataType::EXT_LONG_VAR_BINARY => (71, 0x40000),
        SqlDataType::EXT_W_CHAR => (122, 0x200000),
        SqlDataType::EXT_W_LONG_VARCHAR => (125, 0x400000),
        SqlDataType::EXT_W_VARCHAR => (126, 0x800000),
        other => {
            return Err(Error::InvalidValue {
                expected: "SQL data type with conversion info",
                value: format!("{other:?}"),
            });
        }
    };
    Ok(entry)
}

/// Entry of [`CAPABILITIES`] with the given name.
pub fn find(name: &str) -> Result<&'static Capability, Error> {
    CAPABILITIES
        .iter()
        .find(|capability| capability.name == name)
        .ok_or_else(|| Error::UnknownCapability(name.to_string()))
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::{HashMap, HashSet};

    use test_case::test_case;

    use odbc_sys::SqlDataType;

    use crate::{CursorType, DriverInfo, Error, TransactionIsolation, Value};

    use super::{
        CAPABILITIES, Concurrency, InfoSource, ResultSetType, RowChange, changes_detected, find,
        others_changes_visible, own_changes_visible, supports_convert, supports_isolation_level,
        supports_result_set_concurrency, supports_result_set_type,
    };

    /// Answers `SQLGetInfo` from maps. Unknown info types fail like an optional feature the
    /// driver does not implement.
    #[derive(Default)]
    pub struct FakeInfo {
        pub numbers: HashMap<u16, u32>,
        pub strings: HashMap<u16, String>,
        pub functions: Vec<u16>,
    }

    impl FakeInfo {
        fn missing(&self) -> Error {
            Error::NoDiagnostics {
                function: "SQLGetInfo",
            }
        }
    }

    impl InfoSource for FakeInfo {
        fn info_u16(&self, info_type: u16) -> Result<u16, Error> {
            self.numbers
                .get(&info_type)
                .map(|&n| n as u16)
                .ok_or_else(|| self.missing())
        }

        fn info_u32(&self, info_type: u16) -> Result<u32, Error> {
            self.numbers
                .get(&info_type)
                .copied()
                .ok_or_else(|| self.missing())
        }

        fn info_string(&self, info_type: u16) -> Result<String, Error> {
            self.strings
                .get(&info_type)
                .cloned()
                .ok_or_else(|| self.missing())
        }

        fn supported_functions(&self) -> Result<Vec<u16>, Error> {
            Ok(self.functions.clone())
        }
    }

    fn decode(name: &str, info: &FakeInfo) -> Value {
        let capability = find(name).unwrap();
        capability
            .decoder
            .decode(info, capability.info_type)
            .unwrap()
    }

    fn with_number(name: &str, answer: u32) -> FakeInfo {
        let mut info = FakeInfo::default();
        info.numbers.insert(find(name).unwrap().info_type, answer);
        info
    }

    fn with_string(name: &str, answer: &str) -> FakeInfo {
        let mut info = FakeInfo::default();
        info.strings
            .insert(find(name).unwrap().info_type, answer.to_string());
        info
    }

    /// ODBC 3 driver with forward only (0x01), keyset driven (0x02) and static (0x10) cursors.
    fn odbc_3_driver() -> DriverInfo {
        DriverInfo {
            major_version: 3,
            minor_version: 80,
            getdata_extensions: 0,
            scroll_options: 0x01 | 0x02 | 0x10,
            // Read only
            forward_only_attributes2: 0x01,
            // Read only, sees own deletions
            static_attributes2: 0x01 | 0x20,
            // Lock concurrency, sees own updates and insertions
            keyset_attributes2: 0x02 | 0x40 | 0x10,
            dynamic_attributes2: 0,
            scroll_concurrency: 0,
            supported_functions: Some(Vec::new()),
        }
    }

    /// ODBC 2 driver with forward only (0x01) and dynamic (0x04) cursors, read only concurrency.
    fn odbc_2_driver() -> DriverInfo {
        DriverInfo {
            major_version: 2,
            minor_version: 50,
            getdata_extensions: 0,
            scroll_options: 0x01 | 0x04,
            forward_only_attributes2: 0,
            static_attributes2: 0,
            keyset_attributes2: 0,
            dynamic_attributes2: 0,
            scroll_concurrency: 0x01,
            supported_functions: None,
        }
    }

    #[test]
    fn capability_names_are_unique() {
        let names: HashSet<_> = CAPABILITIES.iter().map(|c| c.name).collect();
        assert_eq!(CAPABILITIES.len(), names.len());
    }

    #[test]
    fn unknown_capability() {
        let result = find("supports_time_travel");
        assert!(matches!(result, Err(Error::UnknownCapability(name)) if name == "supports_time_travel"));
    }

    #[test_case("supports_transactions", 0, false; "no transactions")]
    #[test_case("supports_transactions", 2, true; "all transactions")]
    #[test_case("supports_data_manipulation_transactions_only", 1, true; "dml only")]
    #[test_case("supports_outer_joins", 0x08, true; "nested outer joins")]
    #[test_case("supports_full_outer_joins", 0x01, false; "left outer joins only")]
    #[test_case("nulls_are_sorted_high", 0, true; "nulls high")]
    fn numeric_flags(name: &str, answer: u32, expected: bool) {
        let capability = find(name).unwrap();
        let mut info = FakeInfo::default();
        info.numbers.insert(capability.info_type, answer);

        let value = capability.decoder.decode(&info, capability.info_type).unwrap();

        assert_eq!(Value::Boolean(expected), value);
    }

    #[test]
    fn character_flag() {
        let capability = find("supports_multiple_result_sets").unwrap();
        let mut info = FakeInfo::default();
        info.strings.insert(capability.info_type, "Y".to_string());

        let value = capability.decoder.decode(&info, capability.info_type).unwrap();

        assert_eq!(Value::Boolean(true), value);
    }

    #[test]
    fn text_and_number() {
        let mut info = FakeInfo::default();
        let quote = find("identifier_quote_string").unwrap();
        let max_len = find("max_column_name_length").unwrap();
        info.strings.insert(quote.info_type, "\"".to_string());
        info.numbers.insert(max_len.info_type, 128);

        assert_eq!(
            Value::Text("\"".to_string()),
            quote.decoder.decode(&info, quote.info_type).unwrap()
        );
        assert_eq!(
            Value::Number(128.0),
            max_len.decoder.decode(&info, max_len.info_type).unwrap()
        );
    }

    #[test_case("supports_order_by_unrelated", "N", true; "order by columns need not be selected")]
    #[test_case("supports_order_by_unrelated", "Y", false; "order by columns must be selected")]
    #[test_case("does_max_row_size_include_blobs", "Y", true; "row size includes long data")]
    #[test_case("supports_stored_procedures", "N", false; "no procedures")]
    fn character_flags(name: &str, answer: &str, expected: bool) {
        assert_eq!(Value::Boolean(expected), decode(name, &with_string(name, answer)));
    }

    // SQL_IC_UPPER = 1, SQL_IC_LOWER = 2, SQL_IC_SENSITIVE = 3, SQL_IC_MIXED = 4
    #[test_case("stores_upper_case_identifiers", 1, true; "upper")]
    #[test_case("stores_upper_case_identifiers", 2, false; "upper but lower")]
    #[test_case("stores_lower_case_identifiers", 2, true; "lower")]
    #[test_case("stores_mixed_case_identifiers", 4, true; "mixed")]
    #[test_case("stores_mixed_case_identifiers", 3, false; "mixed but sensitive")]
    #[test_case("supports_mixed_case_identifiers", 3, true; "sensitive")]
    #[test_case("stores_upper_case_quoted_identifiers", 1, true; "quoted upper")]
    #[test_case("stores_lower_case_quoted_identifiers", 4, false; "quoted lower but mixed")]
    #[test_case("stores_mixed_case_quoted_identifiers", 4, true; "quoted mixed")]
    #[test_case("supports_mixed_case_quoted_identifiers", 3, true; "quoted sensitive")]
    fn identifier_case(name: &str, answer: u32, expected: bool) {
        assert_eq!(Value::Boolean(expected), decode(name, &with_number(name, answer)));
    }

    #[test_case("supports_open_cursors_across_commit", 2, true; "cursors preserved on commit")]
    #[test_case("supports_open_statements_across_rollback", 1, false; "cursors closed on rollback")]
    #[test_case("null_plus_non_null_is_null", 0, true; "concatenating null is null")]
    #[test_case("null_plus_non_null_is_null", 1, false; "concatenating null is not null")]
    #[test_case("supports_different_table_correlation_names", 1, true; "different names")]
    #[test_case("supports_different_table_correlation_names", 2, false; "any names")]
    #[test_case("supports_alter_table_with_drop_column", 0x01, false; "only add column")]
    #[test_case("supports_limited_outer_joins", 0x01, true; "left outer joins")]
    #[test_case("supports_extended_sql_grammar", 2, true; "extended grammar")]
    #[test_case("supports_ansi92_entry_level_sql", 0x04, true; "intermediate implies entry")]
    #[test_case("supports_ansi92_full_sql", 0x04, false; "intermediate is not full")]
    fn numeric_answers(name: &str, answer: u32, expected: bool) {
        assert_eq!(Value::Boolean(expected), decode(name, &with_number(name, answer)));
    }

    #[test]
    fn limits_are_numbers() {
        assert_eq!(
            Value::Number(32.0),
            decode("max_columns_in_index", &with_number("max_columns_in_index", 32))
        );
        assert_eq!(
            Value::Number(8000.0),
            decode(
                "max_binary_literal_length",
                &with_number("max_binary_literal_length", 8000)
            )
        );
    }

    #[test]
    fn function_names_follow_bitmask() {
        // ABS, FLOOR and PI
        let info = with_number("numeric_functions", 0x01 | 0x200 | 0x10000);

        assert_eq!(
            Value::Text("ABS,FLOOR,PI".to_string()),
            decode("numeric_functions", &info)
        );
        assert_eq!(
            Value::Text(String::new()),
            decode("system_functions", &with_number("system_functions", 0))
        );
    }

    #[test]
    fn minimum_grammar_is_answered_without_driver() {
        assert_eq!(
            Value::Boolean(true),
            decode("supports_minimum_sql_grammar", &FakeInfo::default())
        );
    }

    #[test_case(TransactionIsolation::ReadCommitted, 0x02, true; "read committed")]
    #[test_case(TransactionIsolation::RepeatableRead, 0x02, false; "only read committed")]
    #[test_case(TransactionIsolation::Serializable, 0x08, true; "serializable")]
    #[test_case(TransactionIsolation::Serializable, 0x10, true; "versioning")]
    fn isolation_levels(level: TransactionIsolation, options: u32, expected: bool) {
        let info = with_number("transaction_isolation_options", options);

        assert_eq!(expected, supports_isolation_level(&info, level).unwrap());
    }

    #[test]
    fn result_set_types() {
        let odbc3 = odbc_3_driver();
        let odbc2 = odbc_2_driver();

        assert!(supports_result_set_type(&odbc3, ResultSetType::ScrollInsensitive));
        assert!(supports_result_set_type(&odbc3, ResultSetType::ScrollSensitive));
        assert!(!supports_result_set_type(&odbc2, ResultSetType::ScrollInsensitive));
        assert_eq!(
            CursorType::KeysetDriven,
            ResultSetType::ScrollSensitive.cursor_type(&odbc3)
        );
        assert_eq!(
            CursorType::Dynamic,
            ResultSetType::ScrollSensitive.cursor_type(&odbc2)
        );
    }

    #[test_case(ResultSetType::ForwardOnly, Concurrency::ReadOnly, true; "forward only read only")]
    #[test_case(ResultSetType::ForwardOnly, Concurrency::Updatable, false; "forward only updatable")]
    #[test_case(ResultSetType::ScrollInsensitive, Concurrency::Updatable, false; "static updatable")]
    #[test_case(ResultSetType::ScrollSensitive, Concurrency::Updatable, true; "keyset updatable")]
    #[test_case(ResultSetType::ScrollSensitive, Concurrency::ReadOnly, false; "keyset read only")]
    fn result_set_concurrency(
        result_set_type: ResultSetType,
        concurrency: Concurrency,
        expected: bool,
    ) {
        assert_eq!(
            expected,
            supports_result_set_concurrency(&odbc_3_driver(), result_set_type, concurrency)
        );
    }

    #[test]
    fn unsupported_result_set_type_has_no_concurrency() {
        assert!(!supports_result_set_concurrency(
            &odbc_2_driver(),
            ResultSetType::ScrollInsensitive,
            Concurrency::ReadOnly
        ));
    }

    #[test_case(ResultSetType::ScrollInsensitive, RowChange::Deletes, true; "static deletes")]
    #[test_case(ResultSetType::ScrollInsensitive, RowChange::Updates, false; "static updates")]
    #[test_case(ResultSetType::ScrollSensitive, RowChange::Updates, true; "keyset updates")]
    #[test_case(ResultSetType::ScrollSensitive, RowChange::Inserts, true; "keyset inserts")]
    #[test_case(ResultSetType::ForwardOnly, RowChange::Inserts, false; "forward only inserts")]
    fn own_changes_of_odbc_3_driver(
        result_set_type: ResultSetType,
        change: RowChange,
        expected: bool,
    ) {
        let info = FakeInfo::default();

        let visible =
            own_changes_visible(&info, &odbc_3_driver(), result_set_type, change).unwrap();

        assert_eq!(expected, visible);
    }

    #[test]
    fn own_changes_of_odbc_2_driver() {
        let mut driver = odbc_2_driver();
        let mut info = FakeInfo::default();
        // SQL_STATIC_SENSITIVITY: updates only
        info.numbers.insert(83, 0x04);

        let forward_only =
            own_changes_visible(&info, &driver, ResultSetType::ForwardOnly, RowChange::Updates);
        let dynamic =
            own_changes_visible(&info, &driver, ResultSetType::ScrollSensitive, RowChange::Deletes);
        // Static cursors instead of dynamic ones
        driver.scroll_options = 0x01 | 0x10;
        let updates = own_changes_visible(
            &info,
            &driver,
            ResultSetType::ScrollInsensitive,
            RowChange::Updates,
        );
        let inserts = own_changes_visible(
            &info,
            &driver,
            ResultSetType::ScrollInsensitive,
            RowChange::Inserts,
        );

        assert!(!forward_only.unwrap());
        assert!(dynamic.unwrap());
        assert!(updates.unwrap());
        assert!(!inserts.unwrap());
    }

    #[test]
    fn others_changes_need_dynamic_cursor() {
        assert!(!others_changes_visible(&odbc_3_driver(), ResultSetType::ScrollSensitive));
        assert!(others_changes_visible(&odbc_2_driver(), ResultSetType::ScrollSensitive));
        assert!(!others_changes_visible(&odbc_2_driver(), ResultSetType::ForwardOnly));
    }

    #[test_case(ResultSetType::ForwardOnly, RowChange::Updates, false; "forward only")]
    #[test_case(ResultSetType::ScrollInsensitive, RowChange::Updates, true; "updates always")]
    #[test_case(ResultSetType::ScrollInsensitive, RowChange::Deletes, true; "visible deletes")]
    #[test_case(ResultSetType::ScrollInsensitive, RowChange::Inserts, false; "invisible inserts")]
    fn detected_changes(result_set_type: ResultSetType, change: RowChange, expected: bool) {
        let info = FakeInfo::default();

        let detected = changes_detected(&info, &odbc_3_driver(), result_set_type, change).unwrap();

        assert_eq!(expected, detected);
    }

    #[test]
    fn conversions() {
        let mut info = FakeInfo::default();
        // SQL_CONVERT_INTEGER: to SQL_CVT_CHAR and SQL_CVT_VARCHAR
        info.numbers.insert(61, 0x01 | 0x100);

        assert!(supports_convert(&info, SqlDataType::INTEGER, SqlDataType::VARCHAR).unwrap());
        assert!(!supports_convert(&info, SqlDataType::INTEGER, SqlDataType::DATE).unwrap());
        assert!(matches!(
            supports_convert(&info, SqlDataType::UNKNOWN_TYPE, SqlDataType::CHAR),
            Err(Error::InvalidValue { .. })
        ));
    }

    #[test]
    fn driver_error_is_propagated() {
        let capability = find("sql_keywords").unwrap();
        let info = FakeInfo::default();

        let result = capability.decoder.decode(&info, capability.info_type);

        assert!(matches!(result, Err(Error::NoDiagnostics { .. })));
    }
}
