//! Numeric identifiers of the attributes which have named accessors. Any other attribute can be
//! reached through the numeric passthrough methods of [`crate::Environment`],
//! [`crate::Connection`], [`crate::Statement`] and [`crate::Cursor`].

/// `SQL_ATTR_ODBC_VERSION`
pub const ENV_ODBC_VERSION: i32 = 200;

/// `SQL_ATTR_ACCESS_MODE`
pub const CONN_ACCESS_MODE: i32 = 101;
/// `SQL_ATTR_AUTOCOMMIT`
pub const CONN_AUTOCOMMIT: i32 = 102;
/// `SQL_ATTR_LOGIN_TIMEOUT`
pub const CONN_LOGIN_TIMEOUT: i32 = 103;
/// `SQL_ATTR_TRACE`
pub const CONN_TRACE: i32 = 104;
/// `SQL_ATTR_TRACEFILE`
pub const CONN_TRACEFILE: i32 = 105;
/// `SQL_ATTR_TXN_ISOLATION`
pub const CONN_TXN_ISOLATION: i32 = 108;
/// `SQL_ATTR_CURRENT_CATALOG`
pub const CONN_CURRENT_CATALOG: i32 = 109;

/// `SQL_ATTR_QUERY_TIMEOUT`
pub const STMT_QUERY_TIMEOUT: i32 = 0;
/// `SQL_ATTR_MAX_ROWS`
pub const STMT_MAX_ROWS: i32 = 1;
/// `SQL_ATTR_NOSCAN`. Escape processing is enabled if this is `SQL_NOSCAN_OFF`.
pub const STMT_NOSCAN: i32 = 2;
/// `SQL_ATTR_MAX_LENGTH`
pub const STMT_MAX_LENGTH: i32 = 3;

pub(crate) const NOSCAN_OFF: usize = 0;
pub(crate) const NOSCAN_ON: usize = 1;

pub(crate) const AUTOCOMMIT_OFF: u32 = 0;
pub(crate) const AUTOCOMMIT_ON: u32 = 1;

pub(crate) const MODE_READ_WRITE: u32 = 0;
pub(crate) const MODE_READ_ONLY: u32 = 1;

pub(crate) const OPT_TRACE_OFF: u32 = 0;
pub(crate) const OPT_TRACE_ON: u32 = 1;

/// Transaction isolation levels, as used by `SQL_ATTR_TXN_ISOLATION` and the
/// `SQL_TXN_ISOLATION_OPTION` bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionIsolation {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl TransactionIsolation {
    pub fn as_u32(self) -> u32 {
        match self {
            TransactionIsolation::ReadUncommitted => 1,
            TransactionIsolation::ReadCommitted => 2,
            TransactionIsolation::RepeatableRead => 4,
            TransactionIsolation::Serializable => 8,
        }
    }

    /// `None` for `0` (transactions not supported) and driver specific levels.
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(TransactionIsolation::ReadUncommitted),
            2 => Some(TransactionIsolation::ReadCommitted),
            4 => Some(TransactionIsolation::RepeatableRead),
            8 => Some(TransactionIsolation::Serializable),
            _ => None,
        }
    }
}
