//! Per position parameter descriptors of a statement. Each slot owns the memory bound to its
//! placeholder, so the addresses handed to the driver stay valid until the statement is reset,
//! rebound or destroyed.

use std::{fmt, mem, ptr::null_mut};

use odbc_sys::{CDataType, Len, NULL_DATA, Pointer, SqlDataType, len_data_at_exec};

use crate::{Error, Value, ValueKind, handles::InputBinding};

/// Smallest buffer allocated for a text or binary parameter.
pub const MIN_BUFFER_SIZE: usize = 64;

/// `SQL_DEFAULT_PARAM`. Indicates the procedure should use the default value of a parameter.
const DEFAULT_PARAM: Len = -5;

/// Error raised by a callback supplying a parameter at execution time.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

/// Supplies the value of a parameter at execution time. Invoked with the number of bytes still
/// expected for text and binary parameters with a declared length, `None` otherwise.
pub type ParameterCallback = Box<dyn FnMut(Option<usize>) -> Result<Value, CallbackError>>;

/// Storage of a slot. Text and binary parameters are bound through an owned buffer, numbers and
/// booleans through the scalar itself.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SlotValue {
    /// Freshly created slot, which has not been bound yet.
    Unknown,
    Number(f64),
    Boolean(u8),
    Bytes(Vec<u8>),
}

/// Descriptor of one parameter placeholder.
pub(crate) struct ParameterSlot {
    value: SlotValue,
    sql_type: SqlDataType,
    column_size: usize,
    decimal_digits: i16,
    /// Length of the value, `NULL_DATA`, `DEFAULT_PARAM` or a data at execution marker. Bound by
    /// address.
    indicator: Len,
    /// Declared total length of a parameter supplied at execution time. `0` means unknown.
    declared_length: usize,
    callback: Option<ParameterCallback>,
    /// Buffer replaced by [`Self::set_type`] while rebinding. The driver may still point to it
    /// until the new binding succeeded.
    retired: Option<Vec<u8>>,
}

/// State of a slot as it has been bound last. Restored if binding the slot anew fails, since the
/// driver keeps the previous binding in that case.
pub(crate) struct Snapshot {
    /// Scalar value, `None` for text and binary slots.
    scalar: Option<SlotValue>,
    sql_type: SqlDataType,
    column_size: usize,
    decimal_digits: i16,
    indicator: Len,
    declared_length: usize,
    callback: Option<ParameterCallback>,
}

impl fmt::Debug for ParameterSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterSlot")
            .field("value", &self.value)
            .field("sql_type", &self.sql_type)
            .field("column_size", &self.column_size)
            .field("decimal_digits", &self.decimal_digits)
            .field("indicator", &self.indicator)
            .field("declared_length", &self.declared_length)
            .field("callback", &self.callback.is_some())
            .field("retired", &self.retired.as_ref().map(Vec::capacity))
            .finish()
    }
}

impl Default for ParameterSlot {
    fn default() -> Self {
        Self {
            value: SlotValue::Unknown,
            sql_type: SqlDataType::UNKNOWN_TYPE,
            column_size: 0,
            decimal_digits: 0,
            indicator: 0,
            declared_length: 0,
            callback: None,
            retired: None,
        }
    }
}

impl ParameterSlot {
    /// Kind of value the slot is currently bound as. Unknown slots are bound as text.
    pub fn kind(&self) -> ValueKind {
        ValueKind::from_sql_type(self.sql_type)
    }

    pub fn value(&self) -> &SlotValue {
        &self.value
    }

    pub fn sql_type(&self) -> SqlDataType {
        self.sql_type
    }

    pub fn declared_length(&self) -> usize {
        self.declared_length
    }

    /// Capacity of the buffer of text and binary slots, `0` for everything else.
    pub fn capacity(&self) -> usize {
        match &self.value {
            SlotValue::Bytes(buffer) => buffer.capacity(),
            _ => 0,
        }
    }

    pub fn callback_mut(&mut self) -> Option<&mut ParameterCallback> {
        self.callback.as_mut()
    }

    pub fn clear_callback(&mut self) {
        self.callback = None;
    }

    /// Remembers the current binding before the slot is changed. Takes the callback, so a
    /// successful rebind drops it.
    pub fn snapshot(&mut self) -> Snapshot {
        let scalar = match &self.value {
            SlotValue::Bytes(_) => None,
            other => Some(other.clone()),
        };
        Snapshot {
            scalar,
            sql_type: self.sql_type,
            column_size: self.column_size,
            decimal_digits: self.decimal_digits,
            indicator: self.indicator,
            declared_length: self.declared_length,
            callback: self.callback.take(),
        }
    }

    /// Reverts the slot to `snapshot`, including any buffer retired in the meantime.
    pub fn restore(&mut self, snapshot: Snapshot) {
        if let Some(buffer) = self.retired.take() {
            self.value = SlotValue::Bytes(buffer);
        } else if let Some(scalar) = snapshot.scalar {
            self.value = scalar;
        }
        self.sql_type = snapshot.sql_type;
        self.column_size = snapshot.column_size;
        self.decimal_digits = snapshot.decimal_digits;
        self.indicator = snapshot.indicator;
        self.declared_length = snapshot.declared_length;
        self.callback = snapshot.callback;
    }

    /// Frees the buffer of the previous binding, once the driver no longer refers to it.
    pub fn release_retired(&mut self) {
        self.retired = None;
    }

    /// Changes the representation of the slot to match `sql_type`.
    ///
    /// Text and binary slots keep their buffer and only replace it if its capacity is smaller than
    /// `buffer_hint`, in which case at least [`MIN_BUFFER_SIZE`] bytes are allocated. Any other
    /// type gives up the buffer. A replaced buffer is retired rather than freed, see
    /// [`Self::release_retired`]. On allocation failure the slot is left unchanged.
    pub fn set_type(
        &mut self,
        sql_type: SqlDataType,
        column_size: usize,
        decimal_digits: i16,
        buffer_hint: usize,
    ) -> Result<(), Error> {
        match ValueKind::from_sql_type(sql_type) {
            ValueKind::Text | ValueKind::Binary => {
                if let SlotValue::Bytes(buffer) = &mut self.value {
                    if buffer.capacity() < buffer_hint {
                        let fresh = allocate(buffer_hint)?;
                        self.retired = Some(mem::replace(buffer, fresh));
                    }
                } else {
                    self.value = SlotValue::Bytes(allocate(buffer_hint)?);
                }
            }
            ValueKind::Number => {
                if !matches!(self.value, SlotValue::Number(_)) {
                    self.replace_value(SlotValue::Number(0.));
                }
            }
            ValueKind::Boolean => {
                if !matches!(self.value, SlotValue::Boolean(_)) {
                    self.replace_value(SlotValue::Boolean(0));
                }
            }
        }
        self.sql_type = sql_type;
        self.column_size = column_size;
        self.decimal_digits = decimal_digits;
        Ok(())
    }

    fn replace_value(&mut self, value: SlotValue) {
        if let SlotValue::Bytes(buffer) = mem::replace(&mut self.value, value) {
            self.retired = Some(buffer);
        }
    }

    pub fn set_number(&mut self, number: f64) {
        self.value = SlotValue::Number(number);
        self.indicator = 0;
    }

    pub fn set_bool(&mut self, boolean: bool) {
        self.value = SlotValue::Boolean(boolean.into());
        self.indicator = 0;
    }

    /// Copies `bytes` into the buffer. The caller must have reserved enough capacity using
    /// [`Self::set_type`] so the buffer is not reallocated. Text is terminated with a zero, which
    /// is not part of the indicated length.
    pub fn set_bytes(&mut self, bytes: &[u8], terminate: bool) {
        if let SlotValue::Bytes(buffer) = &mut self.value {
            buffer.clear();
            buffer.extend_from_slice(bytes);
            if terminate {
                buffer.push(0);
            }
        }
        self.indicator = bytes.len().try_into().unwrap_or(Len::MAX);
    }

    /// Marks the value as `NULL`.
    pub fn set_null(&mut self) {
        self.indicator = NULL_DATA;
    }

    /// Marks the value as the default value of a procedure parameter.
    pub fn set_default(&mut self) {
        self.indicator = DEFAULT_PARAM;
    }

    /// Remembers `callback` to supply the value at execution time. `declared_length` is the total
    /// length in bytes for text and binary values, `0` if unknown.
    pub fn set_deferred(&mut self, declared_length: usize, callback: ParameterCallback) {
        self.declared_length = declared_length;
        self.indicator = len_data_at_exec(declared_length.try_into().unwrap_or(Len::MAX));
        self.callback = Some(callback);
    }

    /// Arguments for `SQLBindParameter`, pointing into this slot.
    pub fn binding(&mut self, value_type: CDataType) -> InputBinding {
        let (value, buffer_length) = match &mut self.value {
            SlotValue::Number(number) => (number as *mut f64 as Pointer, 0),
            SlotValue::Boolean(boolean) => (boolean as *mut u8 as Pointer, 0),
            SlotValue::Bytes(buffer) => (
                buffer.as_mut_ptr() as Pointer,
                buffer.len().try_into().unwrap_or(Len::MAX),
            ),
            SlotValue::Unknown => (null_mut(), 0),
        };
        InputBinding {
            value_type,
            parameter_type: self.sql_type,
            column_size: self.column_size,
            decimal_digits: self.decimal_digits,
            value,
            buffer_length,
            indicator: &mut self.indicator,
        }
    }

    /// Binding of a `NULL` or default value. Does not point to any value.
    pub fn indicator_binding(&mut self) -> InputBinding {
        InputBinding {
            value_type: CDataType::Char,
            parameter_type: SqlDataType::CHAR,
            column_size: 0,
            decimal_digits: 0,
            value: null_mut(),
            buffer_length: 0,
            indicator: &mut self.indicator,
        }
    }

    /// Binding of a parameter supplied at execution time. `token` is handed back by
    /// `SQLParamData` once the driver asks for the value.
    pub fn deferred_binding(&mut self, value_type: CDataType, token: Pointer) -> InputBinding {
        InputBinding {
            value_type,
            parameter_type: self.sql_type,
            column_size: self.column_size,
            decimal_digits: self.decimal_digits,
            value: token,
            buffer_length: 0,
            indicator: &mut self.indicator,
        }
    }
}

/// Empty buffer with room for at least `hint` bytes. Nothing is allocated for a `hint` of `0`.
fn allocate(hint: usize) -> Result<Vec<u8>, Error> {
    let mut buffer = Vec::new();
    if hint > 0 {
        buffer.try_reserve_exact(hint.max(MIN_BUFFER_SIZE))?;
    }
    Ok(buffer)
}

/// Ordered parameter slots of a statement, created on demand. Slots are boxed, so their
/// addresses remain stable while the sequence grows.
#[derive(Debug, Default)]
pub(crate) struct ParameterSlots {
    slots: Vec<Box<ParameterSlot>>,
}

impl ParameterSlots {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Ensures there are at least `n` slots and returns the `n`th one (one based). On allocation
    /// failure every slot created so far is kept.
    pub fn ensure_nth(&mut self, n: u16) -> Result<&mut ParameterSlot, Error> {
        let n = usize::from(n);
        if n == 0 {
            return Err(Error::InvalidParameterIndex { index: 0 });
        }
        if self.slots.len() < n {
            self.slots.try_reserve(n - self.slots.len())?;
            self.slots.resize_with(n, Box::default);
        }
        Ok(&mut self.slots[n - 1])
    }

    /// Slot at the one based `index`, if it exists.
    pub fn nth_mut(&mut self, index: usize) -> Option<&mut ParameterSlot> {
        index
            .checked_sub(1)
            .and_then(|i| self.slots.get_mut(i))
            .map(|slot| &mut **slot)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParameterSlot> {
        self.slots.iter().map(|slot| &**slot)
    }

    pub fn clear_callbacks(&mut self) {
        for slot in &mut self.slots {
            slot.clear_callback();
        }
    }

    /// Releases all slots and their buffers.
    pub fn clear(&mut self) {
        self.slots.clear();
    }
}
