use core::fmt::{Display, Formatter};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Error {
    /// Pulse width requested before the echo falling edge was captured.
    StaleRead,
    /// Shared ranger used before `init()`.
    Uninitialized,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.pad(match *self {
            Error::StaleRead => "no completed measurement",
            Error::Uninitialized => "ranger not initialized",
        })
    }
}
