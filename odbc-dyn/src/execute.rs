use log::{debug, warn};

use crate::{
    Error, ValueKind,
    handles::{SqlResult, Statement},
    parameter::ParameterSlots,
};

/// Drives the data at execution protocol of a statement whose execution returned
/// `SQL_NEED_DATA`. The driver asks for one parameter at a time with `SQLParamData` and the
/// value is streamed to it with `SQLPutData`, pulling it from the callback bound to the slot.
pub(crate) struct DataAtExecution<'a, S> {
    stmt: &'a mut S,
    slots: &'a mut ParameterSlots,
    /// Set once `SQLParamData` reported `SQL_NO_DATA` as the result of the execution.
    no_data: bool,
}

impl<'a, S> DataAtExecution<'a, S>
where
    S: Statement,
{
    pub fn new(stmt: &'a mut S, slots: &'a mut ParameterSlots) -> Self {
        Self {
            stmt,
            slots,
            no_data: false,
        }
    }

    /// Supplies parameters until the driver is done executing.
    ///
    /// # Return
    ///
    /// `true` if the execution completed with `SQL_NO_DATA`, e.g. a searched update which did
    /// not affect any rows.
    pub fn run(mut self) -> Result<bool, Error> {
        while let Some(parameter_number) = self.next_needed_parameter()? {
            if let Err(error) = self.supply(parameter_number) {
                self.cancel();
                return Err(error);
            }
        }
        Ok(self.no_data)
    }

    /// Leaves the need data state, so the statement can be executed again.
    fn cancel(&mut self) {
        if let Err(error) = self.stmt.cancel().into_result(&*self.stmt) {
            warn!("Error cancelling execution after supplying a parameter failed: {error}");
        }
    }

    /// One based number of the parameter the driver asks for. `None` once the statement has been
    /// executed.
    pub fn next_needed_parameter(&mut self) -> Result<Option<usize>, Error> {
        match self.stmt.param_data() {
            SqlResult::NoData => {
                self.no_data = true;
                Ok(None)
            }
            // Parameters are bound with their number as token.
            other => Ok(other
                .into_result(&*self.stmt)?
                .map(|token| token as usize)),
        }
    }

    /// Invokes the callback of the parameter and sends its value to the driver.
    pub fn supply(&mut self, parameter_number: usize) -> Result<(), Error> {
        let Self { stmt, slots, .. } = self;
        let invalid = || Error::InvalidParameterIndex {
            index: parameter_number.try_into().unwrap_or(u16::MAX),
        };
        let slot = slots.nth_mut(parameter_number).ok_or_else(invalid)?;
        let kind = slot.kind();
        let declared_length = slot.declared_length();
        let callback = slot.callback_mut().ok_or_else(invalid)?;
        debug!("Supplying parameter {parameter_number} at execution time.");

        match kind {
            ValueKind::Text | ValueKind::Binary => {
                let mut remaining = declared_length;
                while declared_length == 0 || remaining > 0 {
                    let quota = (declared_length != 0).then_some(remaining);
                    let value = callback(quota).map_err(Error::Callback)?;
                    if value.is_null() {
                        break;
                    }
                    let bytes = value.to_bytes(kind)?;
                    if bytes.is_empty() {
                        break;
                    }
                    let len = if declared_length == 0 {
                        bytes.len()
                    } else {
                        let len = bytes.len().min(remaining);
                        remaining -= len;
                        len
                    };
                    stmt.put_data(&bytes[..len]).into_result(&**stmt)?;
                }
            }
            ValueKind::Number => {
                let number = callback(None).map_err(Error::Callback)?.to_number()?;
                stmt.put_data(&number.to_ne_bytes())
                    .into_result(&**stmt)?;
            }
            ValueKind::Boolean => {
                let boolean = callback(None).map_err(Error::Callback)?.to_bool()?;
                stmt.put_data(&[u8::from(boolean)])
                    .into_result(&**stmt)?;
            }
        }
        Ok(())
    }
}
