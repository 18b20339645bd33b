use std::{mem::size_of, slice};

use odbc_sys::{CDataType, NO_TOTAL, NULL_DATA};

use crate::{
    Error, Value, ValueKind,
    handles::{SqlResult, Statement},
};

/// Size of the scratch buffer variable length values are fetched into, one chunk at a time.
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// Fetches the value of a single column of the current row, converting it to `kind`.
///
/// Text and binary values are retrieved in chunks of `chunk.len()` bytes (at least two) and
/// concatenated. `chunk` is scratch space and can be reused between calls.
pub(crate) fn decode_column(
    stmt: &mut impl Statement,
    column_number: u16,
    kind: ValueKind,
    chunk: &mut Vec<u8>,
) -> Result<Value, Error> {
    match kind {
        ValueKind::Number => {
            let mut value = [0f64];
            // Safety: The slice covers exactly the memory of `value`, which outlives it.
            let target = unsafe {
                slice::from_raw_parts_mut(value.as_mut_ptr() as *mut u8, size_of::<f64>())
            };
            let is_null = fetch_fixed(stmt, column_number, CDataType::Double, target)?;
            Ok(if is_null {
                Value::Null
            } else {
                Value::Number(value[0])
            })
        }
        ValueKind::Boolean => {
            let mut value = [0u8];
            let is_null = fetch_fixed(stmt, column_number, CDataType::Bit, &mut value)?;
            Ok(if is_null {
                Value::Null
            } else {
                Value::Boolean(value[0] != 0)
            })
        }
        ValueKind::Text => Ok(
            fetch_variadic(stmt, column_number, CDataType::Char, 1, chunk)?
                .map(|bytes| Value::Text(into_string(bytes)))
                .unwrap_or(Value::Null),
        ),
        ValueKind::Binary => Ok(
            fetch_variadic(stmt, column_number, CDataType::Binary, 0, chunk)?
                .map(Value::Binary)
                .unwrap_or(Value::Null),
        ),
    }
}

/// `true` if the value is `NULL`.
fn fetch_fixed(
    stmt: &mut impl Statement,
    column_number: u16,
    target_type: CDataType,
    target: &mut [u8],
) -> Result<bool, Error> {
    let mut indicator = 0;
    stmt.get_data(column_number, target_type, target, &mut indicator)
        .into_result(&*stmt)?;
    Ok(indicator == NULL_DATA)
}

/// Concatenates the chunks of a variable length value. `terminator` is the number of bytes a
/// complete chunk reserves for the terminating zero. `None` if the value is `NULL`.
fn fetch_variadic(
    stmt: &mut impl Statement,
    column_number: u16,
    target_type: CDataType,
    terminator: usize,
    chunk: &mut Vec<u8>,
) -> Result<Option<Vec<u8>>, Error> {
    let chunk_size = chunk.len().max(2);
    chunk.resize(chunk_size, 0);

    let mut value = Vec::new();
    let mut indicator = 0;
    let mut result = stmt.get_data(column_number, target_type, chunk, &mut indicator);
    if !result.is_err() && indicator == NULL_DATA {
        return Ok(None);
    }
    loop {
        match result {
            // More data is available. The driver reports truncation with a warning.
            SqlResult::SuccessWithInfo(()) => {
                let len = chunk_len(indicator, chunk_size, terminator);
                value.extend_from_slice(&chunk[..len]);
                result = stmt.get_data(column_number, target_type, chunk, &mut indicator);
            }
            SqlResult::Success(()) => {
                let len = chunk_len(indicator, chunk_size, terminator);
                value.extend_from_slice(&chunk[..len]);
                break;
            }
            // The entire value has already been retrieved.
            SqlResult::NoData => break,
            other => {
                other.into_result(&*stmt)?;
                break;
            }
        }
    }
    Ok(Some(value))
}

/// Number of bytes of the value in the scratch buffer. A length the buffer could not hold, or
/// an unknown length, means the buffer has been filled completely.
fn chunk_len(indicator: isize, chunk_size: usize, terminator: usize) -> usize {
    match usize::try_from(indicator) {
        Ok(len) if len < chunk_size => len,
        Ok(_) => chunk_size - terminator,
        Err(_) if indicator == NO_TOTAL => chunk_size - terminator,
        Err(_) => 0,
    }
}

fn into_string(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes)
        .unwrap_or_else(|error| String::from_utf8_lossy(error.as_bytes()).into_owned())
}
