use super::{
    as_handle::AsHandle,
    buffer::{clamp_small_int, mut_buf_ptr},
};
use odbc_sys::{SQLGetDiagRec, SQLSTATE_SIZE, SqlReturn};
use std::{borrow::Cow, fmt};

/// A buffer large enough to hold an `SQLState` for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct State(pub [u8; SQLSTATE_SIZE]);

impl State {
    /// Invalid transaction state. Returned by `SQLDisconnect` while a transaction is open.
    pub const INVALID_STATE_TRANSACTION: State = State(*b"25000");

    /// Drops terminating zero
    pub fn from_chars_with_nul(code: &[u8; SQLSTATE_SIZE + 1]) -> Self {
        let mut ascii = [0; SQLSTATE_SIZE];
        ascii.copy_from_slice(&code[..SQLSTATE_SIZE]);
        State(ascii)
    }

    /// View status code as string slice for displaying. ODBC status codes always consist of ASCII
    /// characters, yet a misbehaving driver could leave garbage in the buffer.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or("?????")
    }
}

/// Result of [`Diagnostics::diagnostic_record`].
#[derive(Debug, Clone, Copy)]
pub struct DiagnosticResult {
    /// Five character SQLSTATE. Class first, then subclass.
    pub state: State,
    /// Native error code specific to the data source.
    pub native_error: i32,
    /// The length of the diagnostic message reported by ODBC (excluding the terminating zero).
    pub text_length: i16,
}

/// Access to the diagnostic records left behind by the last native call on a handle.
pub trait Diagnostics {
    /// Fetches record `rec_number` (one based) into `message_text`, truncating the message if the
    /// buffer is too small. `text_length` of the result always reports the full length. `None` if
    /// there is no such record.
    ///
    /// See: [Diagnostic Messages][1]
    ///
    /// [1]: https://docs.microsoft.com/sql/odbc/reference/develop-app/diagnostic-messages
    fn diagnostic_record(&self, rec_number: i16, message_text: &mut [u8])
    -> Option<DiagnosticResult>;

    /// Like [`Self::diagnostic_record`], but grows the message buffer and asks again, if the
    /// message does not fit.
    fn diagnostic_record_vec(
        &self,
        rec_number: i16,
        message_text: &mut Vec<u8>,
    ) -> Option<DiagnosticResult> {
        // Use all the memory available in the buffer, but don't allocate any extra.
        let cap = message_text.capacity();
        message_text.resize(cap, 0);

        self.diagnostic_record(rec_number, message_text)
            .and_then(|mut result| {
                let mut text_length = usize::try_from(result.text_length).unwrap_or(0);

                if text_length >= message_text.len() {
                    // Resize with +1 to account for terminating zero
                    message_text.resize(text_length + 1, 0);
                    // Should be a success this time if driver isn't buggy.
                    result = self.diagnostic_record(rec_number, message_text)?;
                }

                // Some drivers pad the message with null-chars (which is still a valid C string,
                // but not a valid Rust string).
                text_length = text_length.min(message_text.len());
                while text_length > 0 && message_text[text_length - 1] == 0 {
                    text_length -= 1;
                }
                message_text.truncate(text_length);

                Some(result)
            })
    }
}

impl<T: AsHandle + ?Sized> Diagnostics for T {
    fn diagnostic_record(
        &self,
        rec_number: i16,
        message_text: &mut [u8],
    ) -> Option<DiagnosticResult> {
        // Diagnostic records in ODBC are indexed starting with 1
        assert!(rec_number > 0);

        let mut text_length = 0;
        let mut state = [0; SQLSTATE_SIZE + 1];
        let mut native_error = 0;
        let ret = unsafe {
            SQLGetDiagRec(
                self.handle_type(),
                self.as_handle(),
                rec_number,
                state.as_mut_ptr(),
                &mut native_error,
                mut_buf_ptr(message_text),
                clamp_small_int(message_text.len()),
                &mut text_length,
            )
        };

        let result = DiagnosticResult {
            state: State::from_chars_with_nul(&state),
            native_error,
            text_length,
        };

        match ret {
            SqlReturn::SUCCESS | SqlReturn::SUCCESS_WITH_INFO => Some(result),
            SqlReturn::NO_DATA => None,
            SqlReturn::ERROR => panic!("rec_number argument of diagnostics must be > 0."),
            unexpected => panic!("SQLGetDiagRec returned: {unexpected:?}"),
        }
    }
}

/// ODBC Diagnostic Record
///
/// `Display` shows state, native error and message. Use [`Record::message`] for the text only.
#[derive(Default, Clone, PartialEq, Eq)]
pub struct Record {
    pub state: State,
    /// Error code returned by Driver manager or driver
    pub native_error: i32,
    /// Buffer containing the error message. The buffer already has the correct size, and there is
    /// no terminating zero at the end.
    pub message: Vec<u8>,
}

impl Record {
    /// Empty record. Most messages fit into `capacity` bytes, sparing a second `SQLGetDiagRec`.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            message: Vec::with_capacity(capacity),
            ..Default::default()
        }
    }

    /// Overwrites this record with record `record_number` of `handle`. `false` if there is none.
    pub fn fill_from(&mut self, handle: &(impl Diagnostics + ?Sized), record_number: i16) -> bool {
        match handle.diagnostic_record_vec(record_number, &mut self.message) {
            Some(result) => {
                self.state = result.state;
                self.native_error = result.native_error;
                true
            }
            None => false,
        }
    }

    /// Every diagnostic record currently associated with `handle`, in order.
    pub fn collect_all(handle: &(impl Diagnostics + ?Sized)) -> Vec<Record> {
        let mut records = Vec::new();
        let mut rec_number = 1;
        loop {
            let mut record = Record::with_capacity(512);
            if !record.fill_from(handle, rec_number) {
                break;
            }
            records.push(record);
            if rec_number == i16::MAX {
                break;
            }
            rec_number += 1;
        }
        records
    }

    /// Message text. Narrow messages are interpreted as UTF-8, invalid sequences are replaced.
    pub fn message(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.message)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "State: {}, Native error: {}, Message: {}",
            self.state.as_str(),
            self.native_error,
            self.message(),
        )
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
