use super::SqlResult;
use std::{
    cmp::min,
    ptr::{null, null_mut},
};

/// Clamps a usize between `0` and `i16::MAX`.
pub fn clamp_small_int(n: usize) -> i16 {
    min(n, i16::MAX as usize) as i16
}

/// Clamps a usize between `0` and `i32::MAX`.
pub fn clamp_int(n: usize) -> i32 {
    min(n, i32::MAX as usize) as i32
}

/// Returns a pointer suitable to be passed as an output buffer to ODBC functions. Most notably it
/// will return NULL for empty buffers.
pub fn mut_buf_ptr<T>(buffer: &mut [T]) -> *mut T {
    if buffer.is_empty() {
        null_mut()
    } else {
        buffer.as_mut_ptr()
    }
}

/// Calls `fill` with the entire capacity of `buffer` (at least one byte). `fill` reports the length
/// of the text in bytes. Should the text not fit, the buffer is grown and `fill` is called once
/// more. Afterwards `buffer` holds the text without terminating zero.
pub fn fill_text<F>(buffer: &mut Vec<u8>, mut fill: F) -> SqlResult<()>
where
    F: FnMut(&mut [u8]) -> SqlResult<isize>,
{
    buffer.resize(buffer.capacity().max(1), 0);
    let mut result = fill(buffer);
    if let SqlResult::Success(len) | SqlResult::SuccessWithInfo(len) = result {
        let len = usize::try_from(len).unwrap_or(0);
        if len >= buffer.len() {
            // +1 for the terminating zero
            buffer.resize(len + 1, 0);
            result = fill(buffer);
        }
    }
    result.map(|len| {
        let len = usize::try_from(len).unwrap_or(0);
        let len = len.min(buffer.len().saturating_sub(1));
        buffer.truncate(len);
    })
}

/// Pointer to narrow text handed to the driver manager. Empty text is passed as an empty, not as a
/// `NULL` string, since some catalog functions treat the two differently.
pub fn text_ptr(text: &str) -> *const u8 {
    text.as_ptr()
}

/// Pointer and length for an optional text argument of catalog functions. `None` is passed as a
/// `NULL` pointer with zero length, which ODBC interprets as "do not filter on this argument".
pub fn optional_text(text: Option<&str>) -> (*const u8, i16) {
    match text {
        Some(text) => (text_ptr(text), clamp_small_int(text.len())),
        None => (null(), 0),
    }
}
