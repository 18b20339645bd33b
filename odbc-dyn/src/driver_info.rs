use atoi::FromRadix10;

use crate::{Error, capabilities::InfoSource};

const DRIVER_ODBC_VER: u16 = 77;
const GETDATA_EXTENSIONS: u16 = 81;
const SCROLL_OPTIONS: u16 = 44;
const SCROLL_CONCURRENCY: u16 = 43;
const FORWARD_ONLY_CURSOR_ATTRIBUTES2: u16 = 147;
const STATIC_CURSOR_ATTRIBUTES2: u16 = 168;
const KEYSET_CURSOR_ATTRIBUTES2: u16 = 151;
const DYNAMIC_CURSOR_ATTRIBUTES2: u16 = 145;

// SQL_SCROLL_OPTIONS
const SO_FORWARD_ONLY: u32 = 0x01;
const SO_KEYSET_DRIVEN: u32 = 0x02;
const SO_DYNAMIC: u32 = 0x04;
const SO_STATIC: u32 = 0x10;

// SQL_SCROLL_CONCURRENCY
const SCCO_READ_ONLY: u32 = 0x01;
const SCCO_LOCK: u32 = 0x02;
const SCCO_OPT_ROWVER: u32 = 0x04;
const SCCO_OPT_VALUES: u32 = 0x08;

// SQL_*_CURSOR_ATTRIBUTES2
const CA2_READ_ONLY_CONCURRENCY: u32 = 0x01;
const CA2_LOCK_CONCURRENCY: u32 = 0x02;
const CA2_OPT_ROWVER_CONCURRENCY: u32 = 0x04;
const CA2_OPT_VALUES_CONCURRENCY: u32 = 0x08;

// SQL_GETDATA_EXTENSIONS
const GD_ANY_COLUMN: u32 = 0x01;
const GD_ANY_ORDER: u32 = 0x02;
const GD_BLOCK: u32 = 0x04;
const GD_BOUND: u32 = 0x08;

/// Cursor types implemented by drivers, `SQL_CURSOR_*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorType {
    ForwardOnly,
    Static,
    KeysetDriven,
    Dynamic,
}

/// Snapshot of what the driver of a connection is capable of. Queried once per connection, see
/// [`crate::Connection::driver_info`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverInfo {
    /// Major version of the ODBC API implemented by the driver.
    pub major_version: u16,
    pub minor_version: u16,
    /// `SQL_GETDATA_EXTENSIONS` bitmask.
    pub getdata_extensions: u32,
    /// `SQL_SCROLL_OPTIONS` bitmask.
    pub scroll_options: u32,
    /// `SQL_FORWARD_ONLY_CURSOR_ATTRIBUTES2`. Only reported by ODBC 3 drivers.
    pub forward_only_attributes2: u32,
    pub static_attributes2: u32,
    pub keyset_attributes2: u32,
    pub dynamic_attributes2: u32,
    /// `SQL_SCROLL_CONCURRENCY`. Only queried from ODBC 2 drivers.
    pub scroll_concurrency: u32,
    /// Bitmap returned by `SQLGetFunctions` for `SQL_API_ODBC3_ALL_FUNCTIONS`. `None` for ODBC 2
    /// drivers.
    pub supported_functions: Option<Vec<u16>>,
}

impl DriverInfo {
    pub(crate) fn query(source: &impl InfoSource) -> Result<Self, Error> {
        let version = source.info_string(DRIVER_ODBC_VER)?;
        let (major_version, minor_version) =
            parse_odbc_version(&version).ok_or_else(|| Error::InvalidValue {
                expected: "driver ODBC version",
                value: version.clone(),
            })?;

        let getdata_extensions = source.info_u32(GETDATA_EXTENSIONS)?;
        let scroll_options = source.info_u32(SCROLL_OPTIONS)?;

        let mut info = DriverInfo {
            major_version,
            minor_version,
            getdata_extensions,
            scroll_options,
            forward_only_attributes2: 0,
            static_attributes2: 0,
            keyset_attributes2: 0,
            dynamic_attributes2: 0,
            scroll_concurrency: 0,
            supported_functions: None,
        };

        if major_version >= 3 {
            let attributes2 = |mask: u32, info_type: u16| -> Result<u32, Error> {
                if scroll_options & mask != 0 {
                    source.info_u32(info_type)
                } else {
                    Ok(0)
                }
            };
            info.forward_only_attributes2 =
                attributes2(SO_FORWARD_ONLY, FORWARD_ONLY_CURSOR_ATTRIBUTES2)?;
            info.static_attributes2 = attributes2(SO_STATIC, STATIC_CURSOR_ATTRIBUTES2)?;
            info.keyset_attributes2 = attributes2(SO_KEYSET_DRIVEN, KEYSET_CURSOR_ATTRIBUTES2)?;
            info.dynamic_attributes2 = attributes2(SO_DYNAMIC, DYNAMIC_CURSOR_ATTRIBUTES2)?;
            info.supported_functions = Some(source.supported_functions()?);
        } else {
            info.scroll_concurrency = source.info_u32(SCROLL_CONCURRENCY)?;
        }
        Ok(info)
    }

    pub fn supports_forward_only(&self) -> bool {
        self.scroll_options & SO_FORWARD_ONLY != 0
    }

    pub fn supports_static(&self) -> bool {
        self.scroll_options & SO_STATIC != 0
    }

    pub fn supports_keyset_driven(&self) -> bool {
        self.scroll_options & SO_KEYSET_DRIVEN != 0
    }

    pub fn supports_dynamic(&self) -> bool {
        self.scroll_options & SO_DYNAMIC != 0
    }

    /// Dynamic or keyset driven cursors, which reflect changes to the underlying rows.
    pub fn supports_scroll_sensitive(&self) -> bool {
        self.supports_dynamic() || self.supports_keyset_driven()
    }

    /// Cursor type backing scroll sensitive result sets: dynamic if supported, keyset driven
    /// otherwise.
    pub fn scroll_sensitive_cursor(&self) -> CursorType {
        if self.supports_dynamic() {
            CursorType::Dynamic
        } else {
            CursorType::KeysetDriven
        }
    }

    /// `SQL_*_CURSOR_ATTRIBUTES2` of the cursor type. `0` for ODBC 2 drivers and cursor types
    /// the driver does not support.
    pub fn attributes2(&self, cursor: CursorType) -> u32 {
        match cursor {
            CursorType::ForwardOnly => self.forward_only_attributes2,
            CursorType::Static => self.static_attributes2,
            CursorType::KeysetDriven => self.keyset_attributes2,
            CursorType::Dynamic => self.dynamic_attributes2,
        }
    }

    /// ODBC 2 drivers report concurrency for all cursor types at once.
    fn supports_concurrency(&self, cursor: CursorType, odbc3_bits: u32, odbc2_bits: u32) -> bool {
        if self.major_version >= 3 {
            self.attributes2(cursor) & odbc3_bits != 0
        } else {
            self.scroll_concurrency & odbc2_bits != 0
        }
    }

    pub fn supports_read_only(&self, cursor: CursorType) -> bool {
        self.supports_concurrency(cursor, CA2_READ_ONLY_CONCURRENCY, SCCO_READ_ONLY)
    }

    /// Locking, or optimistic concurrency based on row versions or values.
    pub fn supports_updatable(&self, cursor: CursorType) -> bool {
        self.supports_concurrency(
            cursor,
            CA2_LOCK_CONCURRENCY | CA2_OPT_ROWVER_CONCURRENCY | CA2_OPT_VALUES_CONCURRENCY,
            SCCO_LOCK | SCCO_OPT_ROWVER | SCCO_OPT_VALUES,
        )
    }

    /// `SQLGetData` may be called for any unbound column, not just these after the last bound one.
    pub fn getdata_any_column(&self) -> bool {
        self.getdata_extensions & GD_ANY_COLUMN != 0
    }

    /// `SQLGetData` may be called for columns in any order.
    pub fn getdata_any_order(&self) -> bool {
        self.getdata_extensions & GD_ANY_ORDER != 0
    }

    pub fn getdata_block(&self) -> bool {
        self.getdata_extensions & GD_BLOCK != 0
    }

    pub fn getdata_bound(&self) -> bool {
        self.getdata_extensions & GD_BOUND != 0
    }

    /// Whether the driver implements the function with the `SQL_API_*` identifier. `None` if the
    /// bitmap is not known.
    pub fn supports_function(&self, function_id: u16) -> Option<bool> {
        let bitmap = self.supported_functions.as_ref()?;
        let word = bitmap.get(usize::from(function_id >> 4))?;
        Some(word & (1 << (function_id & 0x000F)) != 0)
    }
}

/// Parses versions reported as `"MM.mm"`, e.g. `"03.80"`.
pub(crate) fn parse_odbc_version(text: &str) -> Option<(u16, u16)> {
    let bytes = text.as_bytes();
    if bytes.len() != 5 || bytes[2] != b'.' {
        return None;
    }
    let (major, major_digits) = u16::from_radix_10(&bytes[..2]);
    let (minor, minor_digits) = u16::from_radix_10(&bytes[3..]);
    if major_digits != 2 || minor_digits != 2 {
        return None;
    }
    Some((major, minor))
}
