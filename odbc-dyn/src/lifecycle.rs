use std::{cell::Cell, mem::ManuallyDrop};

use crate::{Error, OdbcVersion, handles::Free};

/// Hand maintained count of the live children of an environment or connection. A parent refuses
/// to close as long as it is not zero.
#[derive(Debug, Default)]
pub(crate) struct OpenChildren {
    count: Cell<usize>,
}

impl OpenChildren {
    pub fn count(&self) -> usize {
        self.count.get()
    }

    pub fn register(&self) {
        self.count.set(self.count.get() + 1);
    }

    pub fn release(&self) {
        self.count.set(self.count.get().saturating_sub(1));
    }

    /// Fails with [`Error::OpenChildren`] if any child is still alive.
    pub fn ensure_none(&self, parent: &'static str) -> Result<(), Error> {
        match self.count() {
            0 => Ok(()),
            count => Err(Error::OpenChildren { parent, count }),
        }
    }
}

/// What statements and cursors need to know about the connection they have been allocated on.
/// They keep the connection alive by holding on to it.
pub(crate) trait Parent {
    /// Statements and cursors currently open on this connection.
    fn children(&self) -> &OpenChildren;

    /// Version of the ODBC API declared by the environment.
    fn odbc_version(&self) -> OdbcVersion;

    /// `true` if the driver implements `SQLNumParams`.
    fn supports_num_params(&self) -> bool;
}

/// Frees the handle, reporting failures instead of panicking in `drop`. In case of an error the
/// handle is leaked after its diagnostics have been collected.
pub(crate) fn free_handle<H: Free>(handle: H) -> Result<(), Error> {
    let mut handle = ManuallyDrop::new(handle);
    // Safety: `handle` is never used or dropped after a successful `free`.
    unsafe { handle.free() }.into_result(&*handle)
}
