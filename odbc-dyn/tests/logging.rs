//! Test for logging is isolated in its own module to avoid messing with the global settings of
//! other, non-logging related tests.
use log::Level;
use odbc_dyn::{
    Error,
    handles::{DiagnosticResult, Diagnostics, SqlResult, State, log_diagnostics},
};

/// Handle which reports two diagnostic records.
struct DiagnosticStub;

impl DiagnosticStub {
    fn write_message(text: &[u8], buf: &mut [u8]) -> DiagnosticResult {
        let len = text.len().min(buf.len());
        buf[..len].copy_from_slice(&text[..len]);
        DiagnosticResult {
            state: State(*b"01000"),
            native_error: 0,
            text_length: text.len() as i16,
        }
    }
}

impl Diagnostics for DiagnosticStub {
    fn diagnostic_record(&self, rec_number: i16, message_text: &mut [u8]) -> Option<DiagnosticResult> {
        match rec_number {
            1 => Some(Self::write_message(b"first diagnostic", message_text)),
            2 => Some(Self::write_message(b"second diagnostic", message_text)),
            _ => None,
        }
    }
}

#[test]
fn emit_a_warning_for_each_diagnostic() {
    testing_logger::setup();

    // When logging the diagnostics of the handle
    log_diagnostics(&DiagnosticStub);

    // Both diagnostics are logged as warnings
    testing_logger::validate(|captured_logs| {
        assert_eq!(captured_logs.len(), 2);
        assert_eq!(captured_logs[0].level, Level::Warn);
        assert!(captured_logs[0].body.contains("first diagnostic"));
        assert_eq!(captured_logs[1].level, Level::Warn);
        assert!(captured_logs[1].body.contains("second diagnostic"));
    });
}

#[test]
fn success_with_info_logs_and_succeeds() {
    testing_logger::setup();

    let result = SqlResult::SuccessWithInfo(42).into_result(&DiagnosticStub);

    assert_eq!(42, result.unwrap());
    testing_logger::validate(|captured_logs| {
        assert_eq!(captured_logs.len(), 2);
        assert!(captured_logs.iter().all(|log| log.level == Level::Warn));
    });
}

#[test]
fn error_collects_all_records_without_logging_them() {
    testing_logger::setup();

    let result: Result<(), Error> = SqlResult::Error {
        function: "SQLExecDirect",
    }
    .into_result(&DiagnosticStub);

    let error = result.unwrap_err();
    assert_eq!(2, error.records().len());
    assert_eq!(Some("01000"), error.state());
    assert_eq!(
        "ODBC emitted an error calling 'SQLExecDirect':\nfirst diagnostic\n01000\nsecond diagnostic\n01000",
        error.to_string()
    );
    testing_logger::validate(|captured_logs| assert!(captured_logs.is_empty()));
}
