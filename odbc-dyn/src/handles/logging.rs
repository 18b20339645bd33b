use super::{Diagnostics, Record};
use log::{Level, warn};

/// Logs every diagnostic record of `handle` as a warning, in the order reported. Called whenever a
/// native call returns `SQL_SUCCESS_WITH_INFO`.
pub fn log_diagnostics(handle: &(impl Diagnostics + ?Sized)) {
    if log::max_level() < Level::Warn {
        return;
    }

    let mut rec = Record::with_capacity(512);
    let mut rec_number = 1;

    while rec.fill_from(handle, rec_number) {
        log_record(&rec);
        // A statement touching many rows may leave a warning for each of them.
        if rec_number == i16::MAX {
            warn!("Too many diagnostic records were generated. Not all could be logged.");
            break;
        }
        rec_number += 1;
    }
}

#[cfg(not(feature = "structured_logging"))]
fn log_record(rec: &Record) {
    warn!("{rec}");
}

#[cfg(feature = "structured_logging")]
fn log_record(rec: &Record) {
    warn!(
        state = rec.state.as_str(),
        native_error = rec.native_error;
        "{}",
        rec.message()
    );
}
