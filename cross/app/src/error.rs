#![deny(unsafe_code)]

#[derive(Debug)]
pub enum Error {
    Ranger(ranger::Error),
    InvalidClock,
    Uninitialized,
}

impl From<ranger::Error> for Error {
    fn from(ranger_error: ranger::Error) -> Self {
        Error::Ranger(ranger_error)
    }
}
